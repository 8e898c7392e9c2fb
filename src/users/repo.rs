use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::ApiError;
use crate::query::{self, filter::FilterCond, pagination::Paginated, FindOptions};

pub const TABLE: &str = "users";
pub const COLUMNS: &str = "id, name, email, password_hash, email_verified_at, \
     email_activation_code, reset_password_token, created_at, updated_at, deleted_at";

/// Fields the listing endpoint allows in `q`/`search` filters.
pub const FILTERABLE_FIELDS: [&str; 1] = ["name"];

/// User record as stored. Secret columns are excluded from serialization as a
/// backstop; handlers only ever return the public projection.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub email_verified_at: Option<OffsetDateTime>,
    #[serde(skip_serializing)]
    pub email_activation_code: Option<String>,
    #[serde(skip_serializing)]
    pub reset_password_token: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub deleted_at: Option<OffsetDateTime>,
}

impl User {
    pub async fn create(
        db: &PgPool,
        name: &str,
        email: &str,
        password_hash: &str,
        activation_code: &str,
    ) -> Result<User, ApiError> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (name, email, password_hash, email_activation_code)
            VALUES ($1, $2, $3, $4)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .bind(activation_code)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    /// Lookup by email regardless of soft-delete state. The auth flow needs
    /// the deleted marker to classify the record itself.
    pub async fn find_by_email_any(db: &PgPool, email: &str) -> Result<Option<User>, ApiError> {
        query::find_one(db, TABLE, COLUMNS, &[FilterCond::eq("email", email)], true).await
    }

    pub async fn find_by_email_and_code(
        db: &PgPool,
        email: &str,
        code: &str,
    ) -> Result<Option<User>, ApiError> {
        query::find_one(
            db,
            TABLE,
            COLUMNS,
            &[
                FilterCond::eq("email", email),
                FilterCond::eq("email_activation_code", code),
            ],
            true,
        )
        .await
    }

    pub async fn find_by_reset_token(db: &PgPool, token: &str) -> Result<Option<User>, ApiError> {
        query::find_one(
            db,
            TABLE,
            COLUMNS,
            &[FilterCond::eq("reset_password_token", token)],
            true,
        )
        .await
    }

    /// Default-policy lookup by id: soft-deleted users are invisible here.
    pub async fn find_by_id_or_throw(db: &PgPool, id: Uuid) -> Result<User, ApiError> {
        query::find_one_or_throw(
            db,
            TABLE,
            COLUMNS,
            &[FilterCond::eq("id::text", id.to_string())],
            false,
        )
        .await
    }

    pub async fn find_paginated(db: &PgPool, opts: &FindOptions) -> Result<Paginated<User>, ApiError> {
        query::find_paginated(db, TABLE, COLUMNS, opts).await
    }

    /// Re-registration of a still-unverified account: refresh name, password
    /// hash and activation code in place.
    pub async fn overwrite_pending(
        db: &PgPool,
        id: Uuid,
        name: &str,
        password_hash: &str,
        activation_code: &str,
    ) -> Result<User, ApiError> {
        let name = name.to_string();
        let password_hash = password_hash.to_string();
        let activation_code = activation_code.to_string();
        query::update_by_id(db, TABLE, COLUMNS, id, true, move |set| {
            set.push("name = ");
            set.push_bind_unseparated(name);
            set.push("password_hash = ");
            set.push_bind_unseparated(password_hash);
            set.push("email_activation_code = ");
            set.push_bind_unseparated(activation_code);
        })
        .await
    }

    /// `Pending -> Verified`: irreversible, consumes the activation code.
    pub async fn mark_verified(db: &PgPool, id: Uuid) -> Result<User, ApiError> {
        query::update_by_id(db, TABLE, COLUMNS, id, true, |set| {
            set.push("email_verified_at = now()");
            set.push("email_activation_code = NULL");
        })
        .await
    }

    pub async fn set_activation_code(db: &PgPool, id: Uuid, code: &str) -> Result<User, ApiError> {
        let code = code.to_string();
        query::update_by_id(db, TABLE, COLUMNS, id, true, move |set| {
            set.push("email_activation_code = ");
            set.push_bind_unseparated(code);
        })
        .await
    }

    pub async fn set_reset_token(db: &PgPool, id: Uuid, token: &str) -> Result<User, ApiError> {
        let token = token.to_string();
        query::update_by_id(db, TABLE, COLUMNS, id, true, move |set| {
            set.push("reset_password_token = ");
            set.push_bind_unseparated(token);
        })
        .await
    }

    /// Consume a reset token: new password hash, token and any stale
    /// activation code cleared in the same statement.
    pub async fn apply_password_reset(
        db: &PgPool,
        id: Uuid,
        password_hash: &str,
    ) -> Result<User, ApiError> {
        let password_hash = password_hash.to_string();
        query::update_by_id(db, TABLE, COLUMNS, id, true, move |set| {
            set.push("password_hash = ");
            set.push_bind_unseparated(password_hash);
            set.push("reset_password_token = NULL");
            set.push("email_activation_code = NULL");
        })
        .await
    }

    /// Soft delete by default; `soft = false` removes the row for good.
    pub async fn delete_by_id(db: &PgPool, id: Uuid, soft: bool) -> Result<(), ApiError> {
        query::delete_by_id(db, TABLE, id, soft).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            name: "Alice".into(),
            email: "alice@example.com".into(),
            password_hash: "$argon2id$v=19$secret".into(),
            email_verified_at: None,
            email_activation_code: Some("123456".into()),
            reset_password_token: Some("tok".into()),
            created_at: OffsetDateTime::now_utc(),
            updated_at: OffsetDateTime::now_utc(),
            deleted_at: None,
        }
    }

    #[test]
    fn secrets_never_serialize() {
        let json = serde_json::to_string(&sample_user()).unwrap();
        assert!(!json.contains("password_hash"));
        assert!(!json.contains("email_activation_code"));
        assert!(!json.contains("reset_password_token"));
        assert!(json.contains("alice@example.com"));
    }
}
