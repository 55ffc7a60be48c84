//! Query-builder validation for ledger and pool filters.
//!
//! A query is a JSON object that is either empty (no filter) or holds exactly
//! one operator key:
//!
//! - `$and` / `$or`: a non-empty list of sub-queries
//! - `$not`: a single sub-query
//! - `$match`, `$like`, `$lt`, `$lte`, `$gt`, `$gte`, `$exists`, `$in`: a
//!   one-entry object `{field: value}`
//!
//! Validation is structural only. Field names and values are not checked
//! against any ledger schema.

use crate::dynamic::{DynamicMap, DynamicValue};

/// Comparison operators that take a single `{field: value}` entry.
pub const COMPARISON_OPERATORS: &[&str] = &[
    "$match", "$like", "$lt", "$lte", "$gt", "$gte", "$exists", "$in",
];

/// Errors raised when a query does not follow the query-builder grammar.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    /// Query or sub-query is not an object.
    #[error("{path}: query must be an object")]
    NotAnObject { path: String },

    /// Object has more than one operator key.
    #[error("{path}: expected a single operator, found {count} keys")]
    MultipleOperators { path: String, count: usize },

    /// Key is not a known operator.
    #[error("{path}: unknown operator '{operator}'")]
    UnknownOperator { path: String, operator: String },

    /// `$and` / `$or` without a non-empty list.
    #[error("{path}: '{operator}' expects a non-empty list of queries")]
    ExpectedList { path: String, operator: String },

    /// Comparison without exactly one `{field: value}` entry.
    #[error("{path}: '{operator}' expects an object with exactly one field")]
    ExpectedSingleField { path: String, operator: String },

    /// `$in` whose operand is not a list.
    #[error("{path}: '$in' expects a list of values for field '{field}'")]
    ExpectedValues { path: String, field: String },
}

/// Parsed query shape. Only the structure is kept; leaf values stay dynamic.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryExpr {
    /// Empty object: no filter.
    All,
    And(Vec<QueryExpr>),
    Or(Vec<QueryExpr>),
    Not(Box<QueryExpr>),
    Compare {
        operator: String,
        field: String,
        value: DynamicValue,
    },
}

impl QueryExpr {
    /// True when the query does not filter anything.
    pub fn is_empty(&self) -> bool {
        matches!(self, QueryExpr::All)
    }
}

/// Validate `query` against the query-builder grammar.
pub fn parse(query: &DynamicValue) -> Result<QueryExpr, QueryError> {
    parse_at(query, "query")
}

fn parse_at(query: &DynamicValue, path: &str) -> Result<QueryExpr, QueryError> {
    let map = query.as_map().ok_or_else(|| QueryError::NotAnObject {
        path: path.to_string(),
    })?;

    let mut entries = map.iter();
    let (operator, operand) = match (entries.next(), map.len()) {
        (None, _) => return Ok(QueryExpr::All),
        (Some(entry), 1) => entry,
        (Some(_), count) => {
            return Err(QueryError::MultipleOperators {
                path: path.to_string(),
                count,
            });
        }
    };

    let here = format!("{path}.{operator}");
    match operator.as_str() {
        "$and" | "$or" => {
            let items = operand
                .as_list()
                .filter(|items| !items.is_empty())
                .ok_or_else(|| QueryError::ExpectedList {
                    path: path.to_string(),
                    operator: operator.clone(),
                })?;
            let children = items
                .iter()
                .enumerate()
                .map(|(i, item)| parse_at(item, &format!("{here}[{i}]")))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(if operator == "$and" {
                QueryExpr::And(children)
            } else {
                QueryExpr::Or(children)
            })
        }
        "$not" => Ok(QueryExpr::Not(Box::new(parse_at(operand, &here)?))),
        op if COMPARISON_OPERATORS.contains(&op) => parse_comparison(op, operand, path),
        _ => Err(QueryError::UnknownOperator {
            path: path.to_string(),
            operator: operator.clone(),
        }),
    }
}

fn parse_comparison(operator: &str, operand: &DynamicValue, path: &str) -> Result<QueryExpr, QueryError> {
    let single = operand
        .as_map()
        .filter(|m: &&DynamicMap| m.len() == 1)
        .and_then(|m| m.iter().next())
        .ok_or_else(|| QueryError::ExpectedSingleField {
            path: path.to_string(),
            operator: operator.to_string(),
        })?;
    let (field, value) = single;

    if operator == "$in" && value.as_list().is_none() {
        return Err(QueryError::ExpectedValues {
            path: path.to_string(),
            field: field.clone(),
        });
    }

    Ok(QueryExpr::Compare {
        operator: operator.to_string(),
        field: field.clone(),
        value: value.clone(),
    })
}
