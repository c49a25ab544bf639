//! `SqlClient`: a database client wrapping an engine capability.
//!
//! Responsibilities:
//! - Probe the engine on construction and optionally reflect the default schema.
//! - Look up table metadata by name (with `schema.table` dot notation), caching results.
//! - Run tabular reads.
//! - Provide scoped sessions and transactions with guaranteed cleanup.
//!
//! Does NOT handle:
//! - Resolving configuration or credentials (see `sql_connectors_config`).
//! - Memoizing clients per request (see `factory`).
//!
//! Invariants:
//! - Probe failures are returned, never ignored.
//! - Table schema precedence: explicit argument > dotted prefix > client default.
//! - Every session handed out is closed exactly once, on success or failure.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, PoisonError, RwLock};

use sql_connectors_config::ConnectionDescriptor;

use crate::engine::{Engine, Frame, Session, TableMetadata, TableRef};
use crate::error::{EngineError, Result};

/// Client for one resolved connection.
pub struct SqlClient {
    engine: Arc<dyn Engine>,
    descriptor: ConnectionDescriptor,
    default_schema: Option<String>,
    metadata: RwLock<BTreeMap<TableRef, Arc<TableMetadata>>>,
}

impl fmt::Debug for SqlClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqlClient")
            .field("url", &self.descriptor.to_string())
            .field("default_schema", &self.default_schema)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for SqlClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SqlClient({})", self.descriptor)
    }
}

impl SqlClient {
    /// Wraps `engine`, probing it and reflecting `default_schema` when `reflect` is set.
    ///
    /// # Errors
    ///
    /// Returns the engine error if the probe or the reflection fails.
    pub fn connect(
        engine: Arc<dyn Engine>,
        descriptor: ConnectionDescriptor,
        default_schema: Option<String>,
        reflect: bool,
    ) -> Result<Self> {
        engine.probe()?;

        let client = Self {
            engine,
            descriptor,
            default_schema,
            metadata: RwLock::new(BTreeMap::new()),
        };

        if reflect {
            let count = client.reflect_schema(client.default_schema.as_deref())?;
            tracing::debug!(url = %client.descriptor, tables = count, "Reflected default schema");
        }

        Ok(client)
    }

    /// The descriptor this client was built from.
    pub fn descriptor(&self) -> &ConnectionDescriptor {
        &self.descriptor
    }

    pub fn default_schema(&self) -> Option<&str> {
        self.default_schema.as_deref()
    }

    /// The wrapped engine.
    pub fn engine(&self) -> &Arc<dyn Engine> {
        &self.engine
    }

    /// Reflects every table in `schema` into the metadata cache.
    ///
    /// Returns the number of tables reflected.
    pub fn reflect_schema(&self, schema: Option<&str>) -> Result<usize> {
        let tables = self.engine.reflect_schema(schema)?;
        let count = tables.len();

        let mut metadata = self.metadata.write().unwrap_or_else(PoisonError::into_inner);
        for table in tables {
            metadata.insert(table.table.clone(), Arc::new(table));
        }
        Ok(count)
    }

    /// Returns metadata for table `name`, reflecting it on first use.
    ///
    /// `name` may be qualified as `schema.table`. An explicit `schema` wins over
    /// the qualifier, which wins over the client's default schema.
    pub fn get_table(&self, name: &str, schema: Option<&str>) -> Result<Arc<TableMetadata>> {
        let table = parse_table_name(name, schema, self.default_schema.as_deref());

        if let Some(cached) = self
            .metadata
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&table)
        {
            return Ok(Arc::clone(cached));
        }

        let reflected = Arc::new(self.engine.reflect_table(&table)?);
        let mut metadata = self.metadata.write().unwrap_or_else(PoisonError::into_inner);
        Ok(Arc::clone(metadata.entry(table).or_insert(reflected)))
    }

    /// Tables currently held in the metadata cache.
    pub fn tables(&self) -> Vec<TableRef> {
        self.metadata
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    /// Runs `sql` and returns the result as a [`Frame`].
    pub fn read_sql(&self, sql: &str) -> Result<Frame> {
        Ok(self.engine.read_table(sql)?)
    }

    /// Opens a session that is closed when the guard is dropped.
    pub fn create_session(&self) -> Result<SessionGuard> {
        Ok(SessionGuard {
            session: Some(self.engine.open_session()?),
        })
    }

    /// Runs `f` with a session and closes it afterwards, whether `f` succeeds or not.
    ///
    /// An error from `f` takes precedence over an error from closing.
    pub fn with_session<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut dyn Session) -> Result<T>,
    {
        let mut guard = self.create_session()?;
        let outcome = f(&mut *guard);
        let closed = guard.close();

        let value = outcome?;
        closed?;
        Ok(value)
    }

    /// Runs `f` in a transaction: commits on `Ok`, rolls back on `Err`, always closes.
    pub fn with_transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut dyn Session) -> Result<T>,
    {
        self.with_session(|session| match f(&mut *session) {
            Ok(value) => {
                session.commit()?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = session.rollback() {
                    tracing::warn!(error = %rollback_err, "Rollback failed");
                }
                Err(err)
            }
        })
    }
}

/// Splits a possibly dotted table name into a [`TableRef`].
///
/// Everything before the last dot is the schema qualifier.
pub(crate) fn parse_table_name(
    name: &str,
    schema: Option<&str>,
    default_schema: Option<&str>,
) -> TableRef {
    let (qualifier, table) = match name.rsplit_once('.') {
        Some((qualifier, table)) => (Some(qualifier), table),
        None => (None, name),
    };
    TableRef::new(schema.or(qualifier).or(default_schema), table)
}

/// A session that is closed when dropped.
pub struct SessionGuard {
    session: Option<Box<dyn Session>>,
}

impl SessionGuard {
    /// Closes the session now, reporting any error.
    pub fn close(mut self) -> std::result::Result<(), EngineError> {
        match self.session.take() {
            Some(mut session) => session.close(),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for SessionGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionGuard")
            .field("open", &self.session.is_some())
            .finish()
    }
}

impl Deref for SessionGuard {
    type Target = dyn Session;

    fn deref(&self) -> &Self::Target {
        // `session` is only taken by `close`, which consumes the guard.
        match &self.session {
            Some(session) => session.as_ref(),
            None => unreachable!("session guard used after close"),
        }
    }
}

impl DerefMut for SessionGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        match &mut self.session {
            Some(session) => session.as_mut(),
            None => unreachable!("session guard used after close"),
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if let Some(mut session) = self.session.take()
            && let Err(e) = session.close()
        {
            tracing::warn!(error = %e, "Failed to close session");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use crate::testing::{MockEngine, descriptor_for};

    fn client(engine: MockEngine, default_schema: Option<&str>) -> (SqlClient, Arc<MockEngine>) {
        let engine = Arc::new(engine);
        let client = SqlClient::connect(
            engine.clone(),
            descriptor_for("sqlite"),
            default_schema.map(str::to_string),
            false,
        )
        .unwrap();
        (client, engine)
    }

    #[test]
    fn test_parse_table_name_precedence() {
        assert_eq!(
            parse_table_name("orders", None, None),
            TableRef::new(None, "orders")
        );
        assert_eq!(
            parse_table_name("orders", None, Some("public")),
            TableRef::new(Some("public"), "orders")
        );
        assert_eq!(
            parse_table_name("mart.orders", None, Some("public")),
            TableRef::new(Some("mart"), "orders")
        );
        assert_eq!(
            parse_table_name("mart.orders", Some("stage"), Some("public")),
            TableRef::new(Some("stage"), "orders")
        );
        assert_eq!(
            parse_table_name("db.mart.orders", None, None),
            TableRef::new(Some("db.mart"), "orders")
        );
    }

    #[test]
    fn test_probe_failure_surfaces() {
        let engine = Arc::new(MockEngine::new().with_probe_error("connection refused"));

        let err = SqlClient::connect(engine, descriptor_for("postgresql"), None, false).unwrap_err();

        assert!(matches!(
            err,
            ClientError::Engine(EngineError::Connection(ref msg)) if msg == "connection refused"
        ));
    }

    #[test]
    fn test_reflect_on_connect_fills_metadata() {
        let engine = Arc::new(
            MockEngine::new()
                .with_table(Some("mart"), "orders", &["id", "total"])
                .with_table(Some("mart"), "customers", &["id"])
                .with_table(Some("stage"), "raw_orders", &["payload"]),
        );

        let client =
            SqlClient::connect(engine, descriptor_for("postgresql"), Some("mart".into()), true)
                .unwrap();

        assert_eq!(
            client.tables(),
            vec![
                TableRef::new(Some("mart"), "customers"),
                TableRef::new(Some("mart"), "orders"),
            ]
        );
    }

    #[test]
    fn test_get_table_reflects_once() {
        let (client, engine) = client(
            MockEngine::new().with_table(Some("mart"), "orders", &["id", "total"]),
            Some("mart"),
        );

        let first = client.get_table("orders", None).unwrap();
        let second = client.get_table("mart.orders", None).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(engine.reflect_calls(), 1);
        assert!(first.column("total").is_some());
    }

    #[test]
    fn test_get_table_missing() {
        let (client, _) = client(MockEngine::new(), None);

        let err = client.get_table("nowhere", None).unwrap_err();

        assert!(matches!(err, ClientError::Engine(EngineError::TableNotFound(_))));
    }

    #[test]
    fn test_read_sql_returns_frame() {
        let frame = Frame::new(vec!["n".into()], vec![vec![serde_json::json!(1)]]);
        let (client, _) = client(MockEngine::new().with_frame(frame.clone()), None);

        assert_eq!(client.read_sql("select 1 as n").unwrap(), frame);
    }

    #[test]
    fn test_with_session_closes_on_success_and_failure() {
        let (client, engine) = client(MockEngine::new(), None);

        let rows = client
            .with_session(|session| Ok(session.execute("update t set x = 1")?))
            .unwrap();
        assert_eq!(rows, 1);

        let result: Result<()> =
            client.with_session(|session| session.execute("FAIL").map(|_| ()).map_err(Into::into));
        assert!(result.is_err());

        assert_eq!(
            engine.session_log(),
            vec!["execute: update t set x = 1", "close", "execute: FAIL", "close"]
        );
    }

    #[test]
    fn test_with_transaction_commits_or_rolls_back() {
        let (client, engine) = client(MockEngine::new(), None);

        client
            .with_transaction(|session| {
                session.execute("insert into t values (1)")?;
                Ok(())
            })
            .unwrap();

        let err = client
            .with_transaction(|session| -> Result<()> {
                session.execute("insert into t values (2)")?;
                Err(ClientError::UnknownConnection("abort".into()))
            })
            .unwrap_err();
        assert!(matches!(err, ClientError::UnknownConnection(_)));

        assert_eq!(
            engine.session_log(),
            vec![
                "execute: insert into t values (1)",
                "commit",
                "close",
                "execute: insert into t values (2)",
                "rollback",
                "close",
            ]
        );
    }

    #[test]
    fn test_session_guard_closes_on_drop() {
        let (client, engine) = client(MockEngine::new(), None);

        {
            let mut session = client.create_session().unwrap();
            session.execute("select 1").unwrap();
        }

        assert_eq!(engine.session_log(), vec!["execute: select 1", "close"]);
    }
}
