use sqlx::{Postgres, QueryBuilder};

use crate::error::ApiError;

/// Operators accepted by the `field:operator:value` filter grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
    Like,
}

pub const ALLOWED_OPS: [&str; 3] = ["eq", "like", "ne"];

impl FilterOp {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "eq" => Some(Self::Eq),
            "ne" => Some(Self::Ne),
            "like" => Some(Self::Like),
            _ => None,
        }
    }
}

/// One parsed filter token. `field` is guaranteed to come from the resource's
/// allow-list, which is what makes splicing it into SQL safe; `value` is
/// always bound as a parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterCond {
    pub field: String,
    pub op: FilterOp,
    pub value: String,
}

impl FilterCond {
    pub fn eq(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            op: FilterOp::Eq,
            value: value.into(),
        }
    }
}

/// Parsed conditions from the two filter channels: `search` conditions are
/// OR-ed together, `q` conditions AND-ed, and the channels combine with AND.
#[derive(Debug, Default)]
pub struct FilterSet {
    pub any_of: Vec<FilterCond>,
    pub all_of: Vec<FilterCond>,
}

impl FilterSet {
    pub fn from_channels(
        search: Option<&str>,
        q: Option<&str>,
        allowed_fields: &[&str],
    ) -> Result<Self, ApiError> {
        let any_of = match search {
            Some(raw) => parse_filters(raw, allowed_fields)?,
            None => Vec::new(),
        };
        let all_of = match q {
            Some(raw) => parse_filters(raw, allowed_fields)?,
            None => Vec::new(),
        };
        Ok(Self { any_of, all_of })
    }
}

/// Parse and validate a comma-separated filter list. Rejected tokens name the
/// offending part and the allowed set, before any query runs.
pub fn parse_filters(raw: &str, allowed_fields: &[&str]) -> Result<Vec<FilterCond>, ApiError> {
    let mut conds = Vec::new();
    for token in raw.split(',') {
        let mut parts = token.splitn(3, ':');
        let field = parts.next().unwrap_or_default();
        let sym = parts.next().unwrap_or_default();
        let value = parts.next().unwrap_or_default();

        if !allowed_fields.contains(&field) {
            return Err(ApiError::Validation(vec![format!(
                "{field} is not a valid key. It must be from [{}]",
                allowed_fields.join(", ")
            )]));
        }

        let Some(op) = FilterOp::parse(sym) else {
            return Err(ApiError::Validation(vec![format!(
                "{sym} is not a valid identifier. It must be from [{}]",
                ALLOWED_OPS.join(", ")
            )]));
        };

        conds.push(FilterCond {
            field: field.to_string(),
            op,
            value: value.to_string(),
        });
    }
    Ok(conds)
}

fn push_cond(qb: &mut QueryBuilder<'_, Postgres>, cond: &FilterCond) {
    match cond.op {
        FilterOp::Eq => {
            qb.push(&cond.field);
            qb.push(" = ");
            qb.push_bind(cond.value.clone());
        }
        FilterOp::Ne => {
            qb.push(&cond.field);
            qb.push(" <> ");
            qb.push_bind(cond.value.clone());
        }
        FilterOp::Like => {
            qb.push(&cond.field);
            qb.push(" ILIKE '%' || ");
            qb.push_bind(cond.value.clone());
            qb.push(" || '%'");
        }
    }
}

/// Append the soft-delete policy and both filter channels to a builder whose
/// SQL so far ends in `WHERE TRUE`.
pub(crate) fn push_where(
    qb: &mut QueryBuilder<'_, Postgres>,
    filter: &FilterSet,
    fetch_soft_deleted: bool,
) {
    if !fetch_soft_deleted {
        qb.push(" AND deleted_at IS NULL");
    }

    for cond in &filter.all_of {
        qb.push(" AND ");
        push_cond(qb, cond);
    }

    if !filter.any_of.is_empty() {
        qb.push(" AND (");
        for (i, cond) in filter.any_of.iter().enumerate() {
            if i > 0 {
                qb.push(" OR ");
            }
            push_cond(qb, cond);
        }
        qb.push(")");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALLOWED: [&str; 2] = ["name", "email"];

    #[test]
    fn parses_all_operators() {
        let conds = parse_filters("name:eq:Alice,name:ne:Bob,email:like:x.com", &ALLOWED).unwrap();
        assert_eq!(
            conds,
            vec![
                FilterCond {
                    field: "name".into(),
                    op: FilterOp::Eq,
                    value: "Alice".into()
                },
                FilterCond {
                    field: "name".into(),
                    op: FilterOp::Ne,
                    value: "Bob".into()
                },
                FilterCond {
                    field: "email".into(),
                    op: FilterOp::Like,
                    value: "x.com".into()
                },
            ]
        );
    }

    #[test]
    fn rejects_unknown_field_naming_allowed_set() {
        let err = parse_filters("role:eq:admin", &ALLOWED).unwrap_err();
        match err {
            ApiError::Validation(errors) => assert_eq!(
                errors,
                vec!["role is not a valid key. It must be from [name, email]".to_string()]
            ),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_operator_naming_allowed_set() {
        let err = parse_filters("name:gt:Alice", &ALLOWED).unwrap_err();
        match err {
            ApiError::Validation(errors) => assert_eq!(
                errors,
                vec!["gt is not a valid identifier. It must be from [eq, like, ne]".to_string()]
            ),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_token_without_operator() {
        let err = parse_filters("name", &ALLOWED).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn missing_value_parses_as_empty() {
        let conds = parse_filters("name:eq", &ALLOWED).unwrap();
        assert_eq!(conds[0].value, "");
    }

    #[test]
    fn channels_combine_with_expected_joins() {
        let filter = FilterSet {
            all_of: vec![FilterCond::eq("email", "a@x.com")],
            any_of: vec![
                FilterCond {
                    field: "name".into(),
                    op: FilterOp::Like,
                    value: "Al".into(),
                },
                FilterCond::eq("name", "Bob"),
            ],
        };

        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM users WHERE TRUE");
        push_where(&mut qb, &filter, false);
        assert_eq!(
            qb.sql(),
            "SELECT * FROM users WHERE TRUE AND deleted_at IS NULL \
             AND email = $1 \
             AND (name ILIKE '%' || $2 || '%' OR name = $3)"
        );
    }

    #[test]
    fn soft_delete_filter_can_be_lifted() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM users WHERE TRUE");
        push_where(&mut qb, &FilterSet::default(), true);
        assert_eq!(qb.sql(), "SELECT * FROM users WHERE TRUE");
    }
}
