use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::extractors::AuthUser,
    error::ApiError,
    query::{
        filter::FilterSet,
        pagination::{Paginated, Pagination},
        FindOptions,
    },
    state::AppState,
};

use super::{
    dto::{ListUsersQuery, PublicUser},
    repo::{User, FILTERABLE_FIELDS},
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users/me", get(me))
        .route("/users", get(list_users))
        .route("/users/:id", get(get_user))
}

#[instrument(skip(state))]
async fn me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<PublicUser>, ApiError> {
    let user = User::find_by_id_or_throw(&state.db, user_id)
        .await
        .map_err(|e| match e {
            // a valid token for a missing or soft-deleted user is an auth
            // failure, not a lookup failure
            ApiError::NotFound => ApiError::unauthorized("User not found"),
            other => other,
        })?;
    Ok(Json(user.into()))
}

#[instrument(skip(state))]
async fn list_users(
    State(state): State<AppState>,
    AuthUser(_caller): AuthUser,
    Query(params): Query<ListUsersQuery>,
) -> Result<Json<Paginated<PublicUser>>, ApiError> {
    let pagination = Pagination::from_params(params.page, params.size)?;
    let filter = FilterSet::from_channels(
        params.search.as_deref(),
        params.q.as_deref(),
        &FILTERABLE_FIELDS,
    )?;

    let opts = FindOptions::new(pagination).with_filter(filter);
    let page = User::find_paginated(&state.db, &opts).await?;
    Ok(Json(page.map(PublicUser::from)))
}

#[instrument(skip(state))]
async fn get_user(
    State(state): State<AppState>,
    AuthUser(_caller): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<PublicUser>, ApiError> {
    let user = User::find_by_id_or_throw(&state.db, id).await?;
    Ok(Json(user.into()))
}
