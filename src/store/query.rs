//! Search query tree
//!
//! Queries travel on the wire as nested objects tagged by `operator`:
//!
//! ```json
//! {"operator": "and", "queries": [
//!     {"operator": "equal", "attribute": "data.owner", "value": "bjensen"},
//!     {"operator": "equal", "attribute": "data.category", "value": "uma_pat"}
//! ]}
//! ```
//!
//! Attributes are dot paths into the stored document, rooted at `data`.

use rusqlite::types::Value as SqlValue;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CredentialError, Result};

/// A node in a search query tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operator", rename_all = "lowercase")]
pub enum StoreQuery {
    /// Every sub-query matches
    And {
        /// Sub-queries
        queries: Vec<StoreQuery>,
    },
    /// At least one sub-query matches
    Or {
        /// Sub-queries
        queries: Vec<StoreQuery>,
    },
    /// The attribute equals the value
    Equal {
        /// Dot path such as `data.owner`
        attribute: String,
        /// Expected value
        value: Value,
    },
}

impl StoreQuery {
    /// Conjunctive equality query on `data.owner` and `data.category`.
    ///
    /// # Examples
    ///
    /// ```
    /// use umacred::store::StoreQuery;
    /// use serde_json::json;
    ///
    /// let query = StoreQuery::owner_and_category("bjensen", "uma_pat");
    /// assert!(query.matches(&json!({"data": {"owner": "bjensen", "category": "uma_pat"}})));
    /// assert!(!query.matches(&json!({"data": {"owner": "bjensen", "category": "sso_session"}})));
    /// ```
    pub fn owner_and_category(owner: &str, category: &str) -> Self {
        Self::And {
            queries: vec![
                Self::Equal {
                    attribute: "data.owner".to_string(),
                    value: Value::String(owner.to_string()),
                },
                Self::Equal {
                    attribute: "data.category".to_string(),
                    value: Value::String(category.to_string()),
                },
            ],
        }
    }

    /// Evaluate the query against a document `{"uid", "data"}`.
    pub fn matches(&self, document: &Value) -> bool {
        match self {
            Self::And { queries } => queries.iter().all(|q| q.matches(document)),
            Self::Or { queries } => queries.iter().any(|q| q.matches(document)),
            Self::Equal { attribute, value } => attribute
                .split('.')
                .try_fold(document, |node, key| node.get(key))
                .is_some_and(|found| found == value),
        }
    }

    /// Compile the query into a SQL predicate over a `data` JSON column.
    ///
    /// Returns the predicate text and the parameters bound to its `?`
    /// placeholders, in order.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Validation`] for attributes outside `data`,
    /// empty `and`/`or` lists, or non-scalar comparison values.
    pub fn to_sql(&self) -> Result<(String, Vec<SqlValue>)> {
        let mut params = Vec::new();
        let sql = self.compile(&mut params)?;
        Ok((sql, params))
    }

    fn compile(&self, params: &mut Vec<SqlValue>) -> Result<String> {
        match self {
            Self::And { queries } => Self::compile_group(queries, " AND ", params),
            Self::Or { queries } => Self::compile_group(queries, " OR ", params),
            Self::Equal { attribute, value } => {
                let path = attribute
                    .strip_prefix("data.")
                    .filter(|rest| !rest.is_empty())
                    .ok_or_else(|| {
                        CredentialError::Validation(format!(
                            "query attribute must address 'data': {attribute}"
                        ))
                    })?;
                params.push(SqlValue::Text(format!("$.{path}")));
                params.push(scalar_to_sql(value)?);
                Ok("json_extract(data, ?) = ?".to_string())
            }
        }
    }

    fn compile_group(
        queries: &[StoreQuery],
        joiner: &str,
        params: &mut Vec<SqlValue>,
    ) -> Result<String> {
        if queries.is_empty() {
            return Err(CredentialError::Validation(
                "query group has no sub-queries".to_string(),
            ));
        }
        let parts = queries
            .iter()
            .map(|q| q.compile(params))
            .collect::<Result<Vec<_>>>()?;
        Ok(format!("({})", parts.join(joiner)))
    }
}

fn scalar_to_sql(value: &Value) -> Result<SqlValue> {
    match value {
        Value::String(s) => Ok(SqlValue::Text(s.clone())),
        Value::Bool(b) => Ok(SqlValue::Integer(i64::from(*b))),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(SqlValue::Integer(i))
            } else if let Some(f) = n.as_f64() {
                Ok(SqlValue::Real(f))
            } else {
                Err(CredentialError::Validation(format!(
                    "unsupported numeric query value: {n}"
                )))
            }
        }
        other => Err(CredentialError::Validation(format!(
            "query values must be scalars, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_owner_and_category_wire_shape() {
        let query = StoreQuery::owner_and_category("bjensen", "uma_pat");
        let wire = serde_json::to_value(&query).unwrap();
        assert_eq!(
            wire,
            json!({
                "operator": "and",
                "queries": [
                    {"operator": "equal", "attribute": "data.owner", "value": "bjensen"},
                    {"operator": "equal", "attribute": "data.category", "value": "uma_pat"}
                ]
            })
        );
    }

    #[test]
    fn test_parse_or_query() {
        let query: StoreQuery = serde_json::from_value(json!({
            "operator": "or",
            "queries": [
                {"operator": "equal", "attribute": "data.owner", "value": "a"},
                {"operator": "equal", "attribute": "data.owner", "value": "b"}
            ]
        }))
        .unwrap();
        assert!(query.matches(&json!({"data": {"owner": "b"}})));
        assert!(!query.matches(&json!({"data": {"owner": "c"}})));
    }

    #[test]
    fn test_matches_missing_attribute_is_false() {
        let query = StoreQuery::owner_and_category("x", "y");
        assert!(!query.matches(&json!({"uid": "1"})));
    }

    #[test]
    fn test_to_sql_binds_paths_and_values() {
        let (sql, params) = StoreQuery::owner_and_category("bjensen", "uma_pat")
            .to_sql()
            .unwrap();
        assert_eq!(
            sql,
            "(json_extract(data, ?) = ? AND json_extract(data, ?) = ?)"
        );
        assert_eq!(
            params,
            vec![
                SqlValue::Text("$.owner".to_string()),
                SqlValue::Text("bjensen".to_string()),
                SqlValue::Text("$.category".to_string()),
                SqlValue::Text("uma_pat".to_string()),
            ]
        );
    }

    #[test]
    fn test_to_sql_rejects_attribute_outside_data() {
        let query = StoreQuery::Equal {
            attribute: "uid".to_string(),
            value: json!("1"),
        };
        assert!(matches!(
            query.to_sql(),
            Err(CredentialError::Validation(_))
        ));
    }

    #[test]
    fn test_to_sql_rejects_empty_group() {
        let query = StoreQuery::And { queries: vec![] };
        assert!(query.to_sql().is_err());
    }

    #[test]
    fn test_to_sql_rejects_object_values() {
        let query = StoreQuery::Equal {
            attribute: "data.owner".to_string(),
            value: json!({"nested": true}),
        };
        assert!(query.to_sql().is_err());
    }
}
