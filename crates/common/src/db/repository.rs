//! Postgres implementation of the paper store
//!
//! Repository pattern over SeaORM. Transitions rely on a conditional
//! `UPDATE ... WHERE id = $1 AND status = $2`, so the database is the sole
//! arbiter of a paper's current state and racing writers resolve to exactly
//! one winner.

use crate::db::models::{Paper, PaperActiveModel, PaperColumn, PaperEntity, PaperStatus};
use crate::db::store::{PaperOrder, PaperPage, PaperQuery, PaperStore};
use crate::db::DbPool;
use crate::errors::Result;
use async_trait::async_trait;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::sea_query::{Expr, NullOrdering};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, Order,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

/// Repository for paper persistence
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn read_conn(&self) -> &DatabaseConnection {
        self.pool.read()
    }

    fn write_conn(&self) -> &DatabaseConnection {
        self.pool.write()
    }

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    fn text_condition(text: &str) -> Condition {
        let pattern = format!("%{}%", text);
        Condition::any()
            .add(Expr::col(PaperColumn::Title).ilike(pattern.clone()))
            .add(Expr::col(PaperColumn::AbstractText).ilike(pattern.clone()))
            .add(Expr::col(PaperColumn::AuthorName).ilike(pattern.clone()))
            // JSONB arrays are matched through their text form, mirroring the
            // regex-over-array search the dashboards expect
            .add(Expr::cust_with_values(
                "keywords::text ILIKE $1",
                [pattern.clone()],
            ))
            .add(Expr::cust_with_values("authors::text ILIKE $1", [pattern]))
    }
}

#[async_trait]
impl PaperStore for Repository {
    async fn insert(&self, paper: Paper) -> Result<Paper> {
        let model = PaperActiveModel {
            id: Set(paper.id),
            title: Set(paper.title),
            abstract_text: Set(paper.abstract_text),
            author_id: Set(paper.author_id),
            author_name: Set(paper.author_name),
            author_email: Set(paper.author_email),
            status: Set(paper.status),
            pdf_url: Set(paper.pdf_url),
            pdf_filename: Set(paper.pdf_filename),
            link: Set(paper.link),
            link_verified: Set(paper.link_verified),
            keywords: Set(paper.keywords),
            authors: Set(paper.authors),
            doi: Set(paper.doi),
            verification_history: Set(paper.verification_history),
            created_at: Set(paper.created_at),
            updated_at: Set(paper.updated_at),
            published_at: Set(paper.published_at),
        };

        model.insert(self.write_conn()).await.map_err(Into::into)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Paper>> {
        PaperEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    async fn update_if_status(&self, paper: &Paper, expected: PaperStatus) -> Result<bool> {
        // Immutable columns (id, author snapshot, created_at) are left unset.
        let model = PaperActiveModel {
            title: Set(paper.title.clone()),
            abstract_text: Set(paper.abstract_text.clone()),
            status: Set(paper.status.clone()),
            pdf_url: Set(paper.pdf_url.clone()),
            pdf_filename: Set(paper.pdf_filename.clone()),
            link: Set(paper.link.clone()),
            link_verified: Set(paper.link_verified),
            keywords: Set(paper.keywords.clone()),
            authors: Set(paper.authors.clone()),
            doi: Set(paper.doi.clone()),
            verification_history: Set(paper.verification_history.clone()),
            updated_at: Set(paper.updated_at),
            published_at: Set(paper.published_at),
            ..Default::default()
        };

        let result = PaperEntity::update_many()
            .set(model)
            .filter(PaperColumn::Id.eq(paper.id))
            .filter(PaperColumn::Status.eq(expected.as_str()))
            .exec(self.write_conn())
            .await?;

        Ok(result.rows_affected > 0)
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<bool> {
        let result = PaperEntity::delete_by_id(id)
            .exec(self.write_conn())
            .await?;

        Ok(result.rows_affected > 0)
    }

    async fn query(&self, query: &PaperQuery) -> Result<PaperPage> {
        let mut select = PaperEntity::find();

        if let Some(status) = query.status {
            select = select.filter(PaperColumn::Status.eq(status.as_str()));
        }

        if let Some(author_id) = query.author_id {
            select = select.filter(PaperColumn::AuthorId.eq(author_id));
        }

        if let Some(ref text) = query.text {
            if !text.is_empty() {
                select = select.filter(Self::text_condition(text));
            }
        }

        select = match query.order {
            PaperOrder::PublishedThenUpdated => select
                .order_by_with_nulls(PaperColumn::PublishedAt, Order::Desc, NullOrdering::Last)
                .order_by_desc(PaperColumn::UpdatedAt),
            PaperOrder::UpdatedOnly => select.order_by_desc(PaperColumn::UpdatedAt),
        };

        let page_size = query.page_size.max(1);
        let page = query.page.max(1);

        let paginator = select.paginate(self.read_conn(), page_size);
        let total = paginator.num_items().await?;
        let papers = paginator.fetch_page(page - 1).await?;

        Ok(PaperPage {
            papers,
            total,
            page,
            page_size,
        })
    }
}
