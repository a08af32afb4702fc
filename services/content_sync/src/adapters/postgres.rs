//! services/content_sync/src/adapters/postgres.rs
//!
//! This module contains the content store adapter, which is the concrete implementation
//! of the `RemoteContentStore` port from the core crate. It handles all interactions
//! with the `content_items` table in PostgreSQL using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use party_content_core::domain::{ContentId, ContentItem, ContentKind, ContentPayload, UserId};
use party_content_core::ownership::OwnerFilter;
use party_content_core::ports::{ContentFilter, RemoteContentStore, StoreError, StoreResult};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

const COLUMNS: &str = "id, kind, is_custom, created_by, payload, created_at";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A content store adapter that implements the `RemoteContentStore` port.
#[derive(Clone)]
pub struct PgContentStore {
    pool: PgPool,
}

impl PgContentStore {
    /// Creates a new `PgContentStore`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

//=========================================================================================
// "Impure" Database Record Struct
//=========================================================================================

#[derive(FromRow)]
struct ContentRecord {
    id: Uuid,
    kind: String,
    is_custom: bool,
    created_by: Option<Uuid>,
    payload: Json<ContentPayload>,
    created_at: DateTime<Utc>,
}

impl ContentRecord {
    fn to_domain(self) -> StoreResult<ContentItem> {
        let payload = self.payload.0;
        if ContentKind::parse(&self.kind) != Some(payload.kind()) {
            return Err(StoreError::Unknown(format!(
                "row {} has kind '{}' but a {} payload",
                self.id,
                self.kind,
                payload.kind()
            )));
        }
        Ok(ContentItem {
            id: ContentId::new(self.id.to_string()),
            is_custom: self.is_custom,
            owner_id: self.created_by.map(|id| UserId::new(id.to_string())),
            payload,
            created_at: self.created_at,
        })
    }
}

//=========================================================================================
// Query Construction and Error Mapping
//=========================================================================================

pub(crate) fn parse_user(id: &UserId) -> StoreResult<Uuid> {
    Uuid::parse_str(id.as_str())
        .map_err(|_| StoreError::Unknown(format!("user id '{}' is not a UUID", id)))
}

fn push_owner(builder: &mut QueryBuilder<'_, Postgres>, owner: &OwnerFilter) -> StoreResult<()> {
    match owner {
        OwnerFilter::MatchesUser(id) => {
            builder.push(" AND created_by = ").push_bind(parse_user(id)?);
        }
        OwnerFilter::MatchesNull => {
            builder.push(" AND created_by IS NULL");
        }
    }
    Ok(())
}

fn push_filters(
    builder: &mut QueryBuilder<'_, Postgres>,
    kind: ContentKind,
    filter: &ContentFilter,
) -> StoreResult<()> {
    builder.push(" WHERE kind = ").push_bind(kind.as_str());
    if let Some(is_custom) = filter.is_custom {
        builder.push(" AND is_custom = ").push_bind(is_custom);
    }
    if let Some(owner) = &filter.owner {
        push_owner(builder, owner)?;
    }
    if let Some(name) = &filter.name {
        builder.push(" AND name = ").push_bind(name.clone());
    }
    Ok(())
}

fn select_query(kind: ContentKind, filter: &ContentFilter) -> StoreResult<QueryBuilder<'static, Postgres>> {
    let mut builder = QueryBuilder::new(format!("SELECT {COLUMNS} FROM content_items"));
    push_filters(&mut builder, kind, filter)?;
    builder.push(" ORDER BY created_at ASC");
    Ok(builder)
}

fn count_query(kind: ContentKind, filter: &ContentFilter) -> StoreResult<QueryBuilder<'static, Postgres>> {
    let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM content_items");
    push_filters(&mut builder, kind, filter)?;
    Ok(builder)
}

fn delete_query(
    kind: ContentKind,
    id: Uuid,
    owner: &OwnerFilter,
) -> StoreResult<QueryBuilder<'static, Postgres>> {
    let mut builder = QueryBuilder::new("DELETE FROM content_items WHERE id = ");
    builder
        .push_bind(id)
        .push(" AND kind = ")
        .push_bind(kind.as_str())
        .push(" AND is_custom = TRUE");
    push_owner(&mut builder, owner)?;
    Ok(builder)
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}

fn map_sqlx_error(e: sqlx::Error) -> StoreError {
    match e {
        sqlx::Error::RowNotFound => StoreError::NotFound("row not found".to_string()),
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => StoreError::Unreachable(e.to_string()),
        // insufficient_privilege, raised by row-level security policies
        sqlx::Error::Database(ref db) if db.code().as_deref() == Some("42501") => {
            StoreError::PermissionDenied
        }
        _ => StoreError::Unknown(e.to_string()),
    }
}

//=========================================================================================
// `RemoteContentStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl RemoteContentStore for PgContentStore {
    async fn probe(&self) -> StoreResult<()> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM content_items LIMIT 1)")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn query(&self, kind: ContentKind, filter: &ContentFilter) -> StoreResult<Vec<ContentItem>> {
        let mut builder = select_query(kind, filter)?;
        let records = builder
            .build_query_as::<ContentRecord>()
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        records.into_iter().map(ContentRecord::to_domain).collect()
    }

    async fn count(&self, kind: ContentKind, filter: &ContentFilter) -> StoreResult<usize> {
        let mut builder = count_query(kind, filter)?;
        let count = builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    async fn insert(&self, payload: &ContentPayload, owner: Option<&UserId>) -> StoreResult<ContentItem> {
        let owner = owner.map(parse_user).transpose()?;
        let name = payload.name();
        let record = sqlx::query_as::<_, ContentRecord>(&format!(
            "INSERT INTO content_items (kind, is_custom, created_by, name, payload) \
             VALUES ($1, TRUE, $2, $3, $4) RETURNING {COLUMNS}"
        ))
        .bind(payload.kind().as_str())
        .bind(owner)
        .bind(name)
        .bind(Json(payload))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::DuplicateName(name.unwrap_or_default().to_string())
            } else {
                map_sqlx_error(e)
            }
        })?;

        record.to_domain()
    }

    async fn delete(&self, kind: ContentKind, id: &ContentId, owner: &OwnerFilter) -> StoreResult<()> {
        let row_id = Uuid::parse_str(id.as_str())
            .map_err(|_| StoreError::NotFound(format!("{kind} {id}")))?;

        let mut builder = delete_query(kind, row_id, owner)?;
        let result = builder
            .build()
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        if result.rows_affected() > 0 {
            return Ok(());
        }

        // Nothing deleted: tell a missing row apart from one the filter excluded.
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM content_items WHERE id = $1 AND kind = $2)",
        )
        .bind(row_id)
        .bind(kind.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if exists {
            Err(StoreError::PermissionDenied)
        } else {
            Err(StoreError::NotFound(format!("{kind} {id}")))
        }
    }

    async fn reassign_owner(
        &self,
        kind: ContentKind,
        ids: &[ContentId],
        new_owner: &UserId,
    ) -> StoreResult<Vec<ContentId>> {
        let owner = parse_user(new_owner)?;
        let row_ids: Vec<Uuid> = ids
            .iter()
            .filter_map(|id| Uuid::parse_str(id.as_str()).ok())
            .collect();
        if row_ids.is_empty() {
            return Ok(Vec::new());
        }

        let moved = sqlx::query_scalar::<_, Uuid>(
            "UPDATE content_items SET created_by = $1 \
             WHERE kind = $2 AND is_custom = TRUE AND created_by IS NULL AND id = ANY($3) \
             RETURNING id",
        )
        .bind(owner)
        .bind(kind.as_str())
        .bind(row_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(moved.into_iter().map(|id| ContentId::new(id.to_string())).collect())
    }
}
