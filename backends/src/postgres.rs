//! PostgreSQL backend

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use dbperf_core::{Backend, BackendError, Query, QueryArg};
use tokio_postgres::types::{ToSql, Type};
use tokio_postgres::{Client, NoTls, Statement};

/// Connection parameters
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Database host
    pub host: String,
    /// Database port
    pub port: u16,
    /// User name
    pub user: String,
    /// Password
    pub password: String,
    /// Database name
    pub dbname: String,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 5432,
            user: "postgres".into(),
            password: "password".into(),
            dbname: "homework".into(),
        }
    }
}

impl ConnectionConfig {
    /// Render as a libpq-style `key=value` connection string
    pub fn connection_string(&self) -> String {
        format!(
            "user={} password={} dbname={} host={} port={} sslmode=disable",
            quote(&self.user),
            quote(&self.password),
            quote(&self.dbname),
            quote(&self.host),
            self.port
        )
    }
}

impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("dbname", &self.dbname)
            .finish()
    }
}

/// Quote a connection string value when it is empty or contains specials
fn quote(value: &str) -> String {
    if !value.is_empty() && !value.contains([' ', '\'', '\\']) {
        return value.to_string();
    }
    let escaped = value.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{escaped}'")
}

/// Backend executing queries over a single pipelined PostgreSQL connection
///
/// `tokio_postgres::Client` is safe to share: concurrent calls from every
/// worker are pipelined over the one connection. Statements are prepared
/// once per distinct statement text and reused.
pub struct PostgresBackend {
    client: Client,
    statements: Mutex<HashMap<String, Statement>>,
}

impl PostgresBackend {
    /// Connect and verify the connection with a ping
    pub async fn connect(config: &ConnectionConfig) -> Result<Self, BackendError> {
        let (client, connection) = tokio_postgres::connect(&config.connection_string(), NoTls)
            .await
            .map_err(|e| BackendError::Connection(e.to_string()))?;

        // Drive the connection until the client is dropped
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!(error = %e, "Database connection closed with error");
            }
        });

        client
            .simple_query("SELECT 1")
            .await
            .map_err(|e| BackendError::Connection(e.to_string()))?;

        tracing::info!(
            host = %config.host,
            port = config.port,
            dbname = %config.dbname,
            "Connected to database"
        );

        Ok(Self {
            client,
            statements: Mutex::new(HashMap::new()),
        })
    }

    async fn prepare(&self, sql: &str) -> Result<Statement, BackendError> {
        let cached = self
            .statements
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(sql)
            .cloned();
        if let Some(statement) = cached {
            return Ok(statement);
        }

        let statement = self
            .client
            .prepare(sql)
            .await
            .map_err(|e| BackendError::Execution(e.to_string()))?;

        tracing::debug!(params = statement.params().len(), "Prepared statement");
        self.statements
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(sql.to_owned(), statement.clone());

        Ok(statement)
    }
}

/// Convert query args to parameters matching the statement's types
///
/// Timestamps are naive; they are sent as UTC when the column is `timestamptz`.
fn bind_params<'a>(
    args: &'a [QueryArg],
    types: &[Type],
) -> Result<Vec<Box<dyn ToSql + Sync + Send + 'a>>, BackendError> {
    if args.len() != types.len() {
        return Err(BackendError::Execution(format!(
            "statement expects {} parameters but {} were given",
            types.len(),
            args.len()
        )));
    }

    Ok(args
        .iter()
        .zip(types)
        .map(|(arg, ty)| -> Box<dyn ToSql + Sync + Send + 'a> {
            match arg {
                QueryArg::Text(value) => Box::new(value.as_str()),
                QueryArg::Int(value) => Box::new(*value),
                QueryArg::Timestamp(value) if *ty == Type::TIMESTAMPTZ => {
                    Box::new(value.and_utc())
                }
                QueryArg::Timestamp(value) => Box::new(*value),
            }
        })
        .collect())
}

#[async_trait]
impl Backend for PostgresBackend {
    fn name(&self) -> &str {
        "postgres"
    }

    async fn execute(&self, query: &Query) -> Result<(), BackendError> {
        let statement = self.prepare(&query.statement).await?;
        let params = bind_params(&query.args, statement.params())?;
        let refs: Vec<&(dyn ToSql + Sync)> = params
            .iter()
            .map(|p| p.as_ref() as &(dyn ToSql + Sync))
            .collect();

        self.client
            .execute(&statement, &refs)
            .await
            .map_err(|e| BackendError::Execution(e.to_string()))?;

        Ok(())
    }
}

impl std::fmt::Debug for PostgresBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresBackend")
            .field("closed", &self.client.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_default_connection_string() {
        let config = ConnectionConfig::default();
        assert_eq!(
            config.connection_string(),
            "user=postgres password=password dbname=homework host=localhost port=5432 sslmode=disable"
        );
    }

    #[test]
    fn test_connection_string_quotes_specials() {
        let config = ConnectionConfig {
            password: "it's secret".into(),
            ..Default::default()
        };
        assert!(config
            .connection_string()
            .contains(r"password='it\'s secret'"));
    }

    #[test]
    fn test_quote_empty() {
        assert_eq!(quote(""), "''");
        assert_eq!(quote("plain"), "plain");
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = ConnectionConfig {
            password: "hunter2".into(),
            ..Default::default()
        };
        let debug = format!("{:?}", config);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("<redacted>"));
        assert!(debug.contains("localhost"));
    }

    #[test]
    fn test_bind_params_count_mismatch() {
        let args = vec![QueryArg::Text("host_1".into())];
        let err = bind_params(&args, &[Type::TEXT, Type::TIMESTAMPTZ]).err().unwrap();
        assert!(err.to_string().contains("expects 2 parameters"));
    }

    #[test]
    fn test_bind_params_accepts_statement_types() {
        let ts = NaiveDate::from_ymd_opt(2017, 1, 1)
            .unwrap()
            .and_hms_opt(8, 59, 22)
            .unwrap();
        let args = vec![
            QueryArg::Text("host_1".into()),
            QueryArg::Timestamp(ts),
            QueryArg::Timestamp(ts),
            QueryArg::Int(7),
        ];
        let types = [Type::TEXT, Type::TIMESTAMPTZ, Type::TIMESTAMP, Type::INT8];

        let params = bind_params(&args, &types).unwrap();
        assert_eq!(params.len(), 4);
    }
}
