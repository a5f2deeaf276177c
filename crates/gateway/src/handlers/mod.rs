//! HTTP request handlers

pub mod health;
pub mod papers;
pub mod search;
