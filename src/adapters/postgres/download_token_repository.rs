//! PostgreSQL implementation of DownloadTokenRepository.
//!
//! Redemption is one conditional `UPDATE` carrying the whole usability rule
//! in its `WHERE` clause. Only when it matches no row is the token read back
//! to classify the denial.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::delivery::{DenialReason, DownloadToken, TokenKind, TokenValue};
use crate::domain::foundation::{DomainError, DownloadTokenId, ErrorCode, OrderId, Timestamp};
use crate::ports::{ConsumeResult, DownloadTokenRepository};

const TOKEN_COLUMNS: &str =
    "id, token, order_id, kind, expires_at, max_downloads, download_count, revoked, created_at";

/// PostgreSQL implementation of the DownloadTokenRepository port.
pub struct PostgresDownloadTokenRepository {
    pool: PgPool,
}

impl PostgresDownloadTokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct DownloadTokenRow {
    id: Uuid,
    token: String,
    order_id: Uuid,
    kind: String,
    expires_at: DateTime<Utc>,
    max_downloads: i32,
    download_count: i32,
    revoked: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<DownloadTokenRow> for DownloadToken {
    type Error = DomainError;

    fn try_from(row: DownloadTokenRow) -> Result<Self, Self::Error> {
        let kind = TokenKind::parse(&row.kind).ok_or_else(|| {
            DomainError::database(format!("Invalid token kind: {}", row.kind))
        })?;
        let token = TokenValue::parse(&row.token)
            .ok_or_else(|| DomainError::database("Stored token value is malformed"))?;

        Ok(DownloadToken {
            id: DownloadTokenId::from_uuid(row.id),
            token,
            order_id: OrderId::from_uuid(row.order_id),
            kind,
            expires_at: Timestamp::from_datetime(row.expires_at),
            max_downloads: to_u32("max_downloads", row.max_downloads)?,
            download_count: to_u32("download_count", row.download_count)?,
            revoked: row.revoked,
            created_at: Timestamp::from_datetime(row.created_at),
        })
    }
}

fn to_u32(field: &str, value: i32) -> Result<u32, DomainError> {
    u32::try_from(value)
        .map_err(|_| DomainError::database(format!("Negative {}: {}", field, value)))
}

fn to_i32(field: &str, value: u32) -> Result<i32, DomainError> {
    i32::try_from(value)
        .map_err(|_| DomainError::validation(field, format!("{} is too large", field)))
}

fn query_failed(action: &str, e: sqlx::Error) -> DomainError {
    DomainError::database(format!("Failed to {}: {}", action, e))
}

impl PostgresDownloadTokenRepository {
    async fn insert_row(
        &self,
        token: &DownloadToken,
        on_conflict: &str,
    ) -> Result<Option<DownloadTokenRow>, DomainError> {
        sqlx::query_as(&format!(
            r#"
            INSERT INTO download_tokens (
                id, token, order_id, kind, expires_at,
                max_downloads, download_count, revoked, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            {}
            RETURNING {}
            "#,
            on_conflict, TOKEN_COLUMNS
        ))
        .bind(token.id.as_uuid())
        .bind(token.token.as_str())
        .bind(token.order_id.as_uuid())
        .bind(token.kind.as_str())
        .bind(token.expires_at.as_datetime())
        .bind(to_i32("max_downloads", token.max_downloads)?)
        .bind(to_i32("download_count", token.download_count)?)
        .bind(token.revoked)
        .bind(token.created_at.as_datetime())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| query_failed("insert download token", e))
    }
}

#[async_trait]
impl DownloadTokenRepository for PostgresDownloadTokenRepository {
    async fn insert(&self, token: &DownloadToken) -> Result<(), DomainError> {
        self.insert_row(token, "").await?;
        Ok(())
    }

    async fn insert_initial_if_absent(
        &self,
        token: &DownloadToken,
    ) -> Result<(DownloadToken, bool), DomainError> {
        let mut initial = token.clone();
        initial.kind = TokenKind::Initial;

        let inserted = self
            .insert_row(
                &initial,
                "ON CONFLICT (order_id) WHERE kind = 'initial' DO NOTHING",
            )
            .await?;
        if let Some(row) = inserted {
            return Ok((row.try_into()?, true));
        }

        let row: Option<DownloadTokenRow> = sqlx::query_as(&format!(
            "SELECT {} FROM download_tokens WHERE order_id = $1 AND kind = 'initial'",
            TOKEN_COLUMNS
        ))
        .bind(initial.order_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| query_failed("find initial token", e))?;

        let existing = row.ok_or_else(|| {
            DomainError::new(
                ErrorCode::ConcurrencyConflict,
                "Initial token conflicted on insert but could not be read back",
            )
        })?;
        Ok((existing.try_into()?, false))
    }

    async fn consume(
        &self,
        token: &TokenValue,
        now: Timestamp,
    ) -> Result<ConsumeResult, DomainError> {
        let consumed: Option<DownloadTokenRow> = sqlx::query_as(&format!(
            r#"
            UPDATE download_tokens SET download_count = download_count + 1
            WHERE token = $1
              AND NOT revoked
              AND expires_at > $2
              AND download_count < max_downloads
            RETURNING {}
            "#,
            TOKEN_COLUMNS
        ))
        .bind(token.as_str())
        .bind(now.as_datetime())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| query_failed("consume download token", e))?;

        if let Some(row) = consumed {
            return Ok(ConsumeResult::Consumed(row.try_into()?));
        }

        let Some(stored) = self.find_by_token(token).await? else {
            return Ok(ConsumeResult::Denied(DenialReason::NotFound));
        };
        match stored.check_usable(now) {
            Err(reason) => Ok(ConsumeResult::Denied(reason)),
            // Another request changed the row between the two statements.
            Ok(()) => Err(DomainError::new(
                ErrorCode::ConcurrencyConflict,
                "Download token changed during redemption",
            )),
        }
    }

    async fn revoke(&self, token: &TokenValue) -> Result<bool, DomainError> {
        let result = sqlx::query("UPDATE download_tokens SET revoked = TRUE WHERE token = $1")
            .bind(token.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| query_failed("revoke download token", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_by_token(
        &self,
        token: &TokenValue,
    ) -> Result<Option<DownloadToken>, DomainError> {
        let row: Option<DownloadTokenRow> = sqlx::query_as(&format!(
            "SELECT {} FROM download_tokens WHERE token = $1",
            TOKEN_COLUMNS
        ))
        .bind(token.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| query_failed("find download token", e))?;

        row.map(DownloadToken::try_from).transpose()
    }

    async fn list_for_order(&self, order_id: &OrderId) -> Result<Vec<DownloadToken>, DomainError> {
        let rows: Vec<DownloadTokenRow> = sqlx::query_as(&format!(
            "SELECT {} FROM download_tokens WHERE order_id = $1 ORDER BY created_at",
            TOKEN_COLUMNS
        ))
        .bind(order_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| query_failed("list download tokens", e))?;

        rows.into_iter().map(DownloadToken::try_from).collect()
    }
}
