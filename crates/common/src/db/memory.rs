//! In-memory paper store
//!
//! A `Mutex<HashMap>` implementation of [`PaperStore`] for tests and local
//! development. The status check inside `update_if_status` happens under the
//! lock, giving the same one-winner guarantee as the Postgres conditional
//! update.

use crate::db::models::{Paper, PaperStatus};
use crate::db::store::{PaperOrder, PaperPage, PaperQuery, PaperStore};
use crate::errors::Result;
use async_trait::async_trait;
use std::cmp::Ordering;
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

/// In-memory store, safe to share across tasks
#[derive(Default)]
pub struct MemoryStore {
    papers: Mutex<HashMap<Uuid, Paper>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn matches_text(paper: &Paper, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        let hit = |field: &str| field.to_lowercase().contains(&needle);

        hit(&paper.title)
            || hit(&paper.abstract_text)
            || hit(&paper.author_name)
            || paper.keywords.iter().any(|k| hit(k))
            || paper.authors.iter().any(|a| hit(a))
    }

    fn compare(order: PaperOrder, a: &Paper, b: &Paper) -> Ordering {
        let by_updated = b.updated_at.cmp(&a.updated_at);
        match order {
            PaperOrder::UpdatedOnly => by_updated,
            PaperOrder::PublishedThenUpdated => match (a.published_at, b.published_at) {
                (Some(pa), Some(pb)) => pb.cmp(&pa).then(by_updated),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => by_updated,
            },
        }
    }
}

#[async_trait]
impl PaperStore for MemoryStore {
    async fn insert(&self, paper: Paper) -> Result<Paper> {
        let mut papers = self.papers.lock().await;
        papers.insert(paper.id, paper.clone());
        Ok(paper)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Paper>> {
        let papers = self.papers.lock().await;
        Ok(papers.get(&id).cloned())
    }

    async fn update_if_status(&self, paper: &Paper, expected: PaperStatus) -> Result<bool> {
        let mut papers = self.papers.lock().await;
        match papers.get_mut(&paper.id) {
            Some(stored) if stored.paper_status() == expected => {
                *stored = paper.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<bool> {
        let mut papers = self.papers.lock().await;
        Ok(papers.remove(&id).is_some())
    }

    async fn query(&self, query: &PaperQuery) -> Result<PaperPage> {
        let papers = self.papers.lock().await;

        let mut matched: Vec<Paper> = papers
            .values()
            .filter(|p| {
                query
                    .status
                    .map(|s| p.paper_status() == s)
                    .unwrap_or(true)
            })
            .filter(|p| query.author_id.map(|a| p.author_id == a).unwrap_or(true))
            .filter(|p| match query.text.as_deref() {
                Some(text) if !text.is_empty() => Self::matches_text(p, text),
                _ => true,
            })
            .cloned()
            .collect();

        matched.sort_by(|a, b| Self::compare(query.order, a, b));

        let page_size = query.page_size.max(1);
        let page = query.page.max(1);
        let total = matched.len() as u64;
        let skip = usize::try_from((page - 1).saturating_mul(page_size)).unwrap_or(usize::MAX);

        let papers = matched
            .into_iter()
            .skip(skip)
            .take(page_size as usize)
            .collect();

        Ok(PaperPage {
            papers,
            total,
            page,
            page_size,
        })
    }
}
