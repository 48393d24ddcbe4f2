//! Bearer token storage.
//!
//! Tokens are random `sf_`-prefixed strings shown once at issue time. Only
//! their SHA-256 hash is persisted, alongside the principal they resolve to.

use chrono::Utc;
use sha2::{Digest, Sha256};
use sqlx::Row;
use storefront_types::error::RepositoryError;
use storefront_types::principal::{Principal, Role};
use uuid::Uuid;

use super::pool::DatabasePool;

const TOKEN_PREFIX: &str = "sf_";

/// A freshly issued token. `token` is the only copy of the plaintext.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub id: String,
    pub token: String,
    pub principal: Principal,
}

/// SQLite-backed token store.
#[derive(Clone)]
pub struct SqliteTokenStore {
    pool: DatabasePool,
}

impl SqliteTokenStore {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    /// Generate a token for `user_id`/`role` and store its hash.
    pub async fn issue(
        &self,
        user_id: i64,
        role: Role,
        label: &str,
    ) -> Result<IssuedToken, RepositoryError> {
        let bytes: [u8; 32] = rand::random();
        let token = format!(
            "{TOKEN_PREFIX}{}",
            bytes.iter().map(|b| format!("{b:02x}")).collect::<String>()
        );
        let id = Uuid::now_v7().to_string();

        sqlx::query(
            r#"INSERT INTO api_tokens (id, token_hash, user_id, role, label, created_at)
               VALUES (?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&id)
        .bind(hash_token(&token))
        .bind(user_id)
        .bind(role.to_string())
        .bind(label)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        tracing::info!(token_id = %id, user_id, %role, "issued api token");

        Ok(IssuedToken {
            id,
            token,
            principal: Principal { user_id, role },
        })
    }

    /// Look up the principal a plaintext token belongs to.
    pub async fn resolve(&self, token: &str) -> Result<Option<Principal>, RepositoryError> {
        let row = sqlx::query("SELECT id, user_id, role FROM api_tokens WHERE token_hash = ?")
            .bind(hash_token(token))
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let id: String = row
            .try_get("id")
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        let user_id: i64 = row
            .try_get("user_id")
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        let role: String = row
            .try_get("role")
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        let role: Role = role.parse().map_err(RepositoryError::Query)?;

        // Best effort, a failed timestamp update must not reject the request.
        if let Err(e) = sqlx::query("UPDATE api_tokens SET last_used_at = ? WHERE id = ?")
            .bind(Utc::now().to_rfc3339())
            .bind(&id)
            .execute(&self.pool.writer)
            .await
        {
            tracing::debug!(token_id = %id, error = %e, "failed to record token use");
        }

        Ok(Some(Principal { user_id, role }))
    }

    /// Delete the one token whose id is `id_prefix` or starts with it.
    ///
    /// Returns the revoked id, or `None` when nothing matches. A prefix shared
    /// by several tokens is rejected with `Conflict` and nothing is deleted.
    pub async fn revoke(&self, id_prefix: &str) -> Result<Option<String>, RepositoryError> {
        let id_prefix = id_prefix.trim();
        if id_prefix.is_empty() {
            return Err(RepositoryError::Conflict(
                "token id prefix must not be empty".to_string(),
            ));
        }

        let mut tx = self
            .pool
            .writer
            .begin()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let ids: Vec<(String,)> =
            sqlx::query_as("SELECT id FROM api_tokens WHERE substr(id, 1, ?) = ? LIMIT 2")
                .bind(id_prefix.len() as i64)
                .bind(id_prefix)
                .fetch_all(&mut *tx)
                .await
                .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let id = match ids.as_slice() {
            [] => return Ok(None),
            [(id,)] => id.clone(),
            _ => {
                return Err(RepositoryError::Conflict(format!(
                    "'{id_prefix}' matches more than one token; use a longer prefix"
                )));
            }
        };

        sqlx::query("DELETE FROM api_tokens WHERE id = ?")
            .bind(&id)
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        tx.commit()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        tracing::info!(token_id = %id, "revoked api token");
        Ok(Some(id))
    }
}

/// Compute SHA-256 hash of a token (lowercase hex).
pub fn hash_token(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}
