//! Query types handed from sources to workers

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A typed statement parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "value")]
pub enum QueryArg {
    /// Text value
    Text(String),
    /// 64-bit integer value
    Int(i64),
    /// Timestamp without time zone
    Timestamp(NaiveDateTime),
}

impl From<&str> for QueryArg {
    fn from(value: &str) -> Self {
        QueryArg::Text(value.to_string())
    }
}

impl From<String> for QueryArg {
    fn from(value: String) -> Self {
        QueryArg::Text(value)
    }
}

impl From<i64> for QueryArg {
    fn from(value: i64) -> Self {
        QueryArg::Int(value)
    }
}

impl From<NaiveDateTime> for QueryArg {
    fn from(value: NaiveDateTime) -> Self {
        QueryArg::Timestamp(value)
    }
}

/// A single unit of work: a statement, its arguments, and a routing key
///
/// Queries sharing a routing key are always executed by the same worker, in
/// the order the source produced them. A query is moved from the source to the
/// dispatcher to a worker and is never cloned along the way.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    /// Statement text with positional placeholders
    pub statement: String,

    /// Arguments filling the placeholders, in order
    pub args: Vec<QueryArg>,

    /// Routing key used to pin the query to a worker
    key: String,
}

impl Query {
    /// Create a new query
    pub fn new(statement: impl Into<String>, args: Vec<QueryArg>, key: impl Into<String>) -> Self {
        Self {
            statement: statement.into(),
            args,
            key: key.into(),
        }
    }

    /// Routing key for this query
    pub fn key(&self) -> &str {
        &self.key
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_query_key() {
        let q = Query::new("SELECT 1", vec![], "host_000001");
        assert_eq!(q.key(), "host_000001");
        assert!(q.args.is_empty());
    }

    #[test]
    fn test_query_arg_conversions() {
        let ts = NaiveDate::from_ymd_opt(2017, 1, 1)
            .unwrap()
            .and_hms_opt(8, 59, 22)
            .unwrap();

        assert_eq!(QueryArg::from("a"), QueryArg::Text("a".into()));
        assert_eq!(QueryArg::from(String::from("b")), QueryArg::Text("b".into()));
        assert_eq!(QueryArg::from(42_i64), QueryArg::Int(42));
        assert_eq!(QueryArg::from(ts), QueryArg::Timestamp(ts));
    }

    #[test]
    fn test_query_arg_json_format() {
        let json = serde_json::to_string(&QueryArg::Int(7)).unwrap();
        assert_eq!(json, r#"{"type":"int","value":7}"#);
    }
}
