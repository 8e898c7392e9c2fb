use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo::User;

/// Raw query params for the listing endpoint; validated into `Pagination` and
/// a `FilterSet` before any query runs.
#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    pub page: Option<i64>,
    pub size: Option<i64>,
    pub q: Option<String>,
    pub search: Option<String>,
}

/// Internal identifiers and timestamps live in a `metadata` envelope; the
/// soft-delete marker is only visible there and secrets not at all.
#[derive(Debug, Serialize)]
pub struct UserMetadata {
    pub id: Uuid,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub deleted_at: Option<OffsetDateTime>,
}

/// Public projection of a user record.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub name: String,
    pub email: String,
    pub email_verified_at: Option<OffsetDateTime>,
    pub metadata: UserMetadata,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            name: u.name,
            email: u.email,
            email_verified_at: u.email_verified_at,
            metadata: UserMetadata {
                id: u.id,
                created_at: u.created_at,
                updated_at: u.updated_at,
                deleted_at: u.deleted_at,
            },
        }
    }
}
