use crate::error::RepositoryError;
use crate::models::{CreateMenuItemRequest, MenuItem, NewUser, Report, SubmitReportRequest, UpdateMenuItemRequest, User};
use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

/// Repository Trait
///
/// Abstract contract for all persistence operations. Handlers and the auth gate
/// only see `Arc<dyn Repository>`, so tests can swap in an in-memory implementation.
///
/// **Send + Sync + async_trait** are required to share the trait object across
/// Axum's request tasks.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, RepositoryError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError>;
    // Returns `RepositoryError::Conflict` when the email is already registered.
    async fn create_user(&self, user: NewUser) -> Result<User, RepositoryError>;

    // --- Menu ---
    // New items are always stored unapproved.
    async fn create_menu_item(&self, req: CreateMenuItemRequest, created_by: Uuid) -> Result<MenuItem, RepositoryError>;
    async fn list_menu_items(&self, only_approved: bool) -> Result<Vec<MenuItem>, RepositoryError>;
    // Partial update; `None` when the item does not exist.
    async fn update_menu_item(&self, id: i64, req: UpdateMenuItemRequest) -> Result<Option<MenuItem>, RepositoryError>;
    // `true` if a row was removed.
    async fn delete_menu_item(&self, id: i64) -> Result<bool, RepositoryError>;
    async fn approve_menu_item(&self, id: i64, approved_by: Uuid) -> Result<Option<MenuItem>, RepositoryError>;

    // --- Reports ---
    async fn create_report(&self, req: SubmitReportRequest, submitted_by: Uuid) -> Result<Report, RepositoryError>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

const MENU_ITEM_COLUMNS: &str = "id, name, description, price, category, is_approved, approved_by, created_by, created_at, updated_at";

/// PostgresRepository
///
/// `Repository` backed by a PostgreSQL connection pool. Schema lives in `migrations/`.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, name, email, password_hash, role, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, name, email, password_hash, role, created_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    /// create_user
    ///
    /// Inserts the account. The unique index on `email` turns a duplicate
    /// registration into `RepositoryError::Conflict`.
    async fn create_user(&self, user: NewUser) -> Result<User, RepositoryError> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, name, email, password_hash, role, created_at)
            VALUES ($1, $2, $3, $4, $5, NOW())
            RETURNING id, name, email, password_hash, role, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                RepositoryError::Conflict(format!("email {} is already registered", user.email))
            }
            other => RepositoryError::Database(other),
        })
    }

    async fn create_menu_item(&self, req: CreateMenuItemRequest, created_by: Uuid) -> Result<MenuItem, RepositoryError> {
        let query = format!(
            r#"
            INSERT INTO menu_items (name, description, price, category, is_approved, created_by, created_at, updated_at)
            VALUES ($1, $2, $3, $4, false, $5, NOW(), NOW())
            RETURNING {MENU_ITEM_COLUMNS}
            "#
        );
        let item = sqlx::query_as::<_, MenuItem>(&query)
            .bind(req.name)
            .bind(req.description)
            .bind(req.price)
            .bind(req.category)
            .bind(created_by)
            .fetch_one(&self.pool)
            .await?;
        Ok(item)
    }

    async fn list_menu_items(&self, only_approved: bool) -> Result<Vec<MenuItem>, RepositoryError> {
        let query = format!(
            "SELECT {MENU_ITEM_COLUMNS} FROM menu_items WHERE ($1 = false OR is_approved = true) ORDER BY category NULLS LAST, name"
        );
        let items = sqlx::query_as::<_, MenuItem>(&query)
            .bind(only_approved)
            .fetch_all(&self.pool)
            .await?;
        Ok(items)
    }

    /// update_menu_item
    ///
    /// Uses `COALESCE` so only the fields present in `req` are written.
    async fn update_menu_item(&self, id: i64, req: UpdateMenuItemRequest) -> Result<Option<MenuItem>, RepositoryError> {
        let query = format!(
            r#"
            UPDATE menu_items
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                price = COALESCE($4, price),
                category = COALESCE($5, category),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {MENU_ITEM_COLUMNS}
            "#
        );
        let item = sqlx::query_as::<_, MenuItem>(&query)
            .bind(id)
            .bind(req.name)
            .bind(req.description)
            .bind(req.price)
            .bind(req.category)
            .fetch_optional(&self.pool)
            .await?;
        Ok(item)
    }

    async fn delete_menu_item(&self, id: i64) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM menu_items WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn approve_menu_item(&self, id: i64, approved_by: Uuid) -> Result<Option<MenuItem>, RepositoryError> {
        let query = format!(
            r#"
            UPDATE menu_items
            SET is_approved = true, approved_by = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {MENU_ITEM_COLUMNS}
            "#
        );
        let item = sqlx::query_as::<_, MenuItem>(&query)
            .bind(id)
            .bind(approved_by)
            .fetch_optional(&self.pool)
            .await?;
        Ok(item)
    }

    async fn create_report(&self, req: SubmitReportRequest, submitted_by: Uuid) -> Result<Report, RepositoryError> {
        let report = sqlx::query_as::<_, Report>(
            r#"
            INSERT INTO reports (submitted_by, title, content, created_at)
            VALUES ($1, $2, $3, NOW())
            RETURNING id, submitted_by, title, content, created_at
            "#,
        )
        .bind(submitted_by)
        .bind(req.title)
        .bind(req.content)
        .fetch_one(&self.pool)
        .await?;
        Ok(report)
    }
}
