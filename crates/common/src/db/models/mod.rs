//! SeaORM entity models

mod paper;

pub use paper::{
    ActiveModel as PaperActiveModel, Column as PaperColumn, Entity as PaperEntity, Model as Paper,
    PaperStatus, StringList, VerificationEntry, VerificationHistory,
};
