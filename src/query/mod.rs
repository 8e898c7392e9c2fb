//! Generic soft-delete-aware query layer. Resources compose these free
//! functions with their own table name, column list, and filter allow-list
//! instead of extending a base type.

pub mod filter;
pub mod pagination;

use sqlx::{postgres::PgRow, FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::error::ApiError;
use filter::{push_where, FilterCond, FilterSet};
use pagination::{Paginated, Pagination};

/// Options for a paginated lookup. Sort defaults to most-recently-created
/// first; soft-deleted rows are excluded unless explicitly requested.
pub struct FindOptions {
    pub filter: FilterSet,
    pub pagination: Pagination,
    pub sort: &'static str,
    pub fetch_soft_deleted: bool,
}

impl FindOptions {
    pub fn new(pagination: Pagination) -> Self {
        Self {
            filter: FilterSet::default(),
            pagination,
            sort: "created_at DESC",
            fetch_soft_deleted: false,
        }
    }

    pub fn with_filter(mut self, filter: FilterSet) -> Self {
        self.filter = filter;
        self
    }
}

/// Count the full filtered set, then fetch one page of it.
pub async fn find_paginated<T>(
    db: &PgPool,
    table: &str,
    columns: &str,
    opts: &FindOptions,
) -> Result<Paginated<T>, ApiError>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    let mut count_qb =
        QueryBuilder::<Postgres>::new(format!("SELECT COUNT(*) FROM {table} WHERE TRUE"));
    push_where(&mut count_qb, &opts.filter, opts.fetch_soft_deleted);
    let total: i64 = count_qb.build_query_scalar().fetch_one(db).await?;

    let mut qb =
        QueryBuilder::<Postgres>::new(format!("SELECT {columns} FROM {table} WHERE TRUE"));
    push_where(&mut qb, &opts.filter, opts.fetch_soft_deleted);
    qb.push(format!(" ORDER BY {} LIMIT ", opts.sort));
    qb.push_bind(opts.pagination.size);
    qb.push(" OFFSET ");
    qb.push_bind(opts.pagination.skip());

    let list = qb.build_query_as::<T>().fetch_all(db).await?;
    Ok(Paginated::new(opts.pagination.page, total, list))
}

/// Single-row lookup by equality conditions, under the default soft-delete
/// policy unless lifted.
pub async fn find_one<T>(
    db: &PgPool,
    table: &str,
    columns: &str,
    conds: &[FilterCond],
    fetch_soft_deleted: bool,
) -> Result<Option<T>, ApiError>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    let mut qb =
        QueryBuilder::<Postgres>::new(format!("SELECT {columns} FROM {table} WHERE TRUE"));
    let filter = FilterSet {
        any_of: Vec::new(),
        all_of: conds.to_vec(),
    };
    push_where(&mut qb, &filter, fetch_soft_deleted);
    qb.push(" LIMIT 1");

    let row = qb.build_query_as::<T>().fetch_optional(db).await?;
    Ok(row)
}

pub async fn find_one_or_throw<T>(
    db: &PgPool,
    table: &str,
    columns: &str,
    conds: &[FilterCond],
    fetch_soft_deleted: bool,
) -> Result<T, ApiError>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    find_one(db, table, columns, conds, fetch_soft_deleted)
        .await?
        .ok_or(ApiError::NotFound)
}

/// Update a row by id. The caller pushes `SET` assignments through the
/// builder; `updated_at` is always bumped, and the soft-delete marker is not
/// expressible here — `delete_by_id` owns it.
pub async fn update_by_id<T, F>(
    db: &PgPool,
    table: &str,
    columns: &str,
    id: Uuid,
    fetch_soft_deleted: bool,
    set: F,
) -> Result<T, ApiError>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    F: FnOnce(&mut sqlx::query_builder::Separated<'_, '_, Postgres, &'static str>),
{
    let mut qb = QueryBuilder::<Postgres>::new(format!("UPDATE {table} SET "));
    {
        let mut assignments = qb.separated(", ");
        set(&mut assignments);
        assignments.push("updated_at = now()");
    }
    qb.push(" WHERE id = ");
    qb.push_bind(id);
    if !fetch_soft_deleted {
        qb.push(" AND deleted_at IS NULL");
    }
    qb.push(format!(" RETURNING {columns}"));

    let row = qb.build_query_as::<T>().fetch_optional(db).await?;
    row.ok_or(ApiError::NotFound)
}

/// Soft delete by default; `soft = false` removes the row permanently.
/// Existence is verified first under the default read policy, so an already
/// soft-deleted row reports `NotFound`.
pub async fn delete_by_id(
    db: &PgPool,
    table: &str,
    id: Uuid,
    soft: bool,
) -> Result<(), ApiError> {
    let mut exists_qb =
        QueryBuilder::<Postgres>::new(format!("SELECT 1 FROM {table} WHERE TRUE"));
    push_where(&mut exists_qb, &FilterSet::default(), false);
    exists_qb.push(" AND id = ");
    exists_qb.push_bind(id);
    let found: Option<i32> = exists_qb.build_query_scalar().fetch_optional(db).await?;
    if found.is_none() {
        return Err(ApiError::NotFound);
    }

    if soft {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "UPDATE {table} SET deleted_at = now(), updated_at = now() WHERE id = "
        ));
        qb.push_bind(id);
        qb.build().execute(db).await?;
    } else {
        let mut qb = QueryBuilder::<Postgres>::new(format!("DELETE FROM {table} WHERE id = "));
        qb.push_bind(id);
        qb.build().execute(db).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use filter::FilterOp;

    #[test]
    fn find_options_default_to_newest_first_and_hidden_deletes() {
        let opts = FindOptions::new(Pagination::from_params(None, None).unwrap());
        assert_eq!(opts.sort, "created_at DESC");
        assert!(!opts.fetch_soft_deleted);
        assert!(opts.filter.all_of.is_empty());
        assert!(opts.filter.any_of.is_empty());
    }

    #[test]
    fn with_filter_replaces_channels() {
        let filter = FilterSet {
            any_of: vec![FilterCond {
                field: "name".into(),
                op: FilterOp::Like,
                value: "Al".into(),
            }],
            all_of: vec![FilterCond::eq("name", "Alice")],
        };
        let opts =
            FindOptions::new(Pagination::from_params(Some(2), Some(10)).unwrap()).with_filter(filter);
        assert_eq!(opts.filter.any_of.len(), 1);
        assert_eq!(opts.filter.all_of.len(), 1);
        assert_eq!(opts.pagination.skip(), 10);
    }
}
