//! Warehouse query interface.
//!
//! The dashboard reads from two datasets: the web analytics export and the
//! product database replica. A [`QuerySource`] runs SQL text against either
//! and returns untyped JSON rows; [`QuerySourceExt`] decodes them.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;

/// One result row keyed by column name.
pub type Row = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dataset {
    /// Web analytics export (GA4 tables).
    Analytics,
    /// Product database replica.
    Product,
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dataset::Analytics => f.write_str("analytics"),
            Dataset::Product => f.write_str("product"),
        }
    }
}

#[derive(Debug, Error)]
pub enum QueryError {
    /// The warehouse rejected or failed the query
    #[error("{dataset} query failed: {message}")]
    Upstream { dataset: Dataset, message: String },

    /// A row did not match the expected shape
    #[error("failed to decode {dataset} row: {source}")]
    Decode {
        dataset: Dataset,
        #[source]
        source: serde_json::Error,
    },

    #[error("query deadline of {0:?} exceeded")]
    Timeout(Duration),
}

impl QueryError {
    pub fn upstream(dataset: Dataset, message: impl Into<String>) -> Self {
        Self::Upstream {
            dataset,
            message: message.into(),
        }
    }
}

pub type QueryResult<T> = Result<T, QueryError>;

#[async_trait]
pub trait QuerySource: Send + Sync {
    async fn run(&self, dataset: Dataset, query: &str) -> QueryResult<Vec<Row>>;

    /// Cheapest round trip the source supports.
    async fn health_check(&self) -> QueryResult<()> {
        self.run(Dataset::Analytics, "SELECT 1").await.map(|_| ())
    }

    fn name(&self) -> &'static str {
        "warehouse"
    }
}

/// Typed helpers over any [`QuerySource`].
#[async_trait]
pub trait QuerySourceExt: QuerySource {
    async fn run_query<T: DeserializeOwned + Send>(&self, query: &str) -> QueryResult<Vec<T>> {
        decode_rows(Dataset::Analytics, self.run(Dataset::Analytics, query).await?)
    }

    async fn run_product_query<T: DeserializeOwned + Send>(&self, query: &str) -> QueryResult<Vec<T>> {
        decode_rows(Dataset::Product, self.run(Dataset::Product, query).await?)
    }
}

#[async_trait]
impl<S: QuerySource + ?Sized> QuerySourceExt for S {}

fn decode_rows<T: DeserializeOwned>(dataset: Dataset, rows: Vec<Row>) -> QueryResult<Vec<T>> {
    rows.into_iter()
        .map(|row| serde_json::from_value(Value::Object(row)).map_err(|source| QueryError::Decode { dataset, source }))
        .collect()
}

/// The first row, or the zeroed default when the query returned nothing.
pub fn first_or_default<T: Default>(rows: Vec<T>) -> T {
    rows.into_iter().next().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    struct Fixed(Vec<Row>);

    #[async_trait]
    impl QuerySource for Fixed {
        async fn run(&self, dataset: Dataset, _query: &str) -> QueryResult<Vec<Row>> {
            match dataset {
                Dataset::Analytics => Ok(self.0.clone()),
                Dataset::Product => Err(QueryError::upstream(dataset, "table not found")),
            }
        }
    }

    #[derive(Debug, Default, PartialEq, Deserialize)]
    struct Overview {
        total_users: u64,
        #[serde(default)]
        bounce_rate: f64,
    }

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn typed_rows_decode() {
        let source = Fixed(vec![row(json!({"total_users": 12, "bounce_rate": 0.5}))]);
        let rows: Vec<Overview> = source.run_query("SELECT ...").await.unwrap();
        assert_eq!(
            rows,
            vec![Overview {
                total_users: 12,
                bounce_rate: 0.5
            }]
        );
    }

    #[tokio::test]
    async fn decode_failure_names_the_dataset() {
        let source = Fixed(vec![row(json!({"total_users": "many"}))]);
        let err = source.run_query::<Overview>("SELECT ...").await.unwrap_err();
        assert!(matches!(err, QueryError::Decode { dataset: Dataset::Analytics, .. }));
    }

    #[tokio::test]
    async fn upstream_errors_propagate() {
        let source = Fixed(Vec::new());
        let err = source.run_product_query::<Overview>("SELECT ...").await.unwrap_err();
        assert_eq!(err.to_string(), "product query failed: table not found");
    }

    #[tokio::test]
    async fn works_through_trait_objects() {
        let source: Box<dyn QuerySource> = Box::new(Fixed(vec![row(json!({"total_users": 1}))]));
        let rows: Vec<Overview> = source.run_query("SELECT ...").await.unwrap();
        assert_eq!(first_or_default(rows).total_users, 1);
        source.health_check().await.unwrap();
    }

    #[test]
    fn empty_result_yields_defaults() {
        assert_eq!(first_or_default(Vec::<Overview>::new()), Overview::default());
    }
}
