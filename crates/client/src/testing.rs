//! Testing utilities for SQL connectors client tests.
//!
//! In-memory engine, constructor and prompt doubles. Available when running
//! tests or when the `test-utils` feature is enabled.
//!
//! # Example
//! ```ignore
//! use sql_connectors_client::testing::{MockConstructor, MockEngine};
//!
//! let constructor = MockConstructor::new(|| MockEngine::new().with_table(None, "users", &["id"]));
//! ```

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use secrecy::SecretString;
use serde_json::json;
use sql_connectors_config::{
    ConfigError, ConnectionDescriptor, CredentialField, CredentialResolver, Prompt, RawConfig,
    descriptor,
};

use crate::engine::{
    Column, Engine, EngineConstructor, EngineOptions, Frame, Session, TableMetadata, TableRef,
};
use crate::error::EngineError;

/// Statement that makes [`MockEngine`] sessions fail.
pub const FAILING_STATEMENT: &str = "FAIL";

/// In-memory engine with scripted tables and results.
///
/// Session activity is recorded as `execute: <sql>`, `commit`, `rollback` and `close`.
#[derive(Debug, Default)]
pub struct MockEngine {
    tables: BTreeMap<TableRef, TableMetadata>,
    frame: Frame,
    probe_error: Option<String>,
    reflect_calls: AtomicUsize,
    session_log: Arc<Mutex<Vec<String>>>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a table with text columns.
    pub fn with_table(mut self, schema: Option<&str>, name: &str, columns: &[&str]) -> Self {
        let table = TableRef::new(schema, name);
        let metadata = TableMetadata {
            table: table.clone(),
            columns: columns
                .iter()
                .map(|column| Column {
                    name: column.to_string(),
                    data_type: "TEXT".to_string(),
                    nullable: true,
                })
                .collect(),
            is_view: false,
        };
        self.tables.insert(table, metadata);
        self
    }

    /// Result returned by every `read_table` call.
    pub fn with_frame(mut self, frame: Frame) -> Self {
        self.frame = frame;
        self
    }

    /// Makes `probe` fail with [`EngineError::Connection`].
    pub fn with_probe_error(mut self, message: &str) -> Self {
        self.probe_error = Some(message.to_string());
        self
    }

    /// Number of single-table reflections performed.
    pub fn reflect_calls(&self) -> usize {
        self.reflect_calls.load(Ordering::SeqCst)
    }

    pub fn session_log(&self) -> Vec<String> {
        self.session_log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Engine for MockEngine {
    fn probe(&self) -> Result<(), EngineError> {
        match &self.probe_error {
            Some(message) => Err(EngineError::Connection(message.clone())),
            None => Ok(()),
        }
    }

    fn reflect_table(&self, table: &TableRef) -> Result<TableMetadata, EngineError> {
        self.reflect_calls.fetch_add(1, Ordering::SeqCst);
        self.tables
            .get(table)
            .cloned()
            .ok_or_else(|| EngineError::TableNotFound(table.to_string()))
    }

    fn reflect_schema(&self, schema: Option<&str>) -> Result<Vec<TableMetadata>, EngineError> {
        Ok(self
            .tables
            .values()
            .filter(|metadata| metadata.table.schema.as_deref() == schema)
            .cloned()
            .collect())
    }

    fn read_table(&self, _sql: &str) -> Result<Frame, EngineError> {
        Ok(self.frame.clone())
    }

    fn open_session(&self) -> Result<Box<dyn Session>, EngineError> {
        Ok(Box::new(MockSession {
            log: Arc::clone(&self.session_log),
            closed: false,
        }))
    }
}

#[derive(Debug)]
struct MockSession {
    log: Arc<Mutex<Vec<String>>>,
    closed: bool,
}

impl MockSession {
    fn record(&self, event: String) -> Result<(), EngineError> {
        if self.closed {
            return Err(EngineError::Session("session is closed".to_string()));
        }
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
        Ok(())
    }
}

impl Session for MockSession {
    fn execute(&mut self, sql: &str) -> Result<u64, EngineError> {
        self.record(format!("execute: {sql}"))?;
        if sql == FAILING_STATEMENT {
            return Err(EngineError::Query(format!("scripted failure: {sql}")));
        }
        Ok(1)
    }

    fn commit(&mut self) -> Result<(), EngineError> {
        self.record("commit".to_string())
    }

    fn rollback(&mut self) -> Result<(), EngineError> {
        self.record("rollback".to_string())
    }

    fn close(&mut self) -> Result<(), EngineError> {
        self.record("close".to_string())?;
        self.closed = true;
        Ok(())
    }
}

type EngineFn = dyn Fn() -> MockEngine + Send + Sync;

/// Engine constructor that counts constructions and can fail on demand.
pub struct MockConstructor {
    make_engine: Box<EngineFn>,
    constructions: AtomicUsize,
    failures_remaining: AtomicUsize,
    delay: Option<Duration>,
    descriptors: Mutex<Vec<ConnectionDescriptor>>,
    options: Mutex<Vec<EngineOptions>>,
}

impl std::fmt::Debug for MockConstructor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockConstructor")
            .field("constructions", &self.constructions())
            .finish_non_exhaustive()
    }
}

impl Default for MockConstructor {
    fn default() -> Self {
        Self::new(MockEngine::new)
    }
}

impl MockConstructor {
    /// Builds every engine with `make_engine`.
    pub fn new(make_engine: impl Fn() -> MockEngine + Send + Sync + 'static) -> Self {
        Self {
            make_engine: Box::new(make_engine),
            constructions: AtomicUsize::new(0),
            failures_remaining: AtomicUsize::new(0),
            delay: None,
            descriptors: Mutex::new(Vec::new()),
            options: Mutex::new(Vec::new()),
        }
    }

    /// The next `count` constructions fail with [`EngineError::Connection`].
    pub fn failing(self, count: usize) -> Self {
        self.failures_remaining.store(count, Ordering::SeqCst);
        self
    }

    /// Sleeps for `delay` inside every construction.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of `construct` calls, including failed ones.
    pub fn constructions(&self) -> usize {
        self.constructions.load(Ordering::SeqCst)
    }

    /// Descriptors of successful constructions, in order.
    pub fn descriptors(&self) -> Vec<ConnectionDescriptor> {
        self.descriptors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Options of successful constructions, in order.
    pub fn options(&self) -> Vec<EngineOptions> {
        self.options
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl EngineConstructor for MockConstructor {
    fn construct(
        &self,
        descriptor: &ConnectionDescriptor,
        options: &EngineOptions,
    ) -> Result<Arc<dyn Engine>, EngineError> {
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        self.constructions.fetch_add(1, Ordering::SeqCst);

        let should_fail = self
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(EngineError::Connection(format!(
                "scripted failure for {descriptor}"
            )));
        }

        self.descriptors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(descriptor.clone());
        self.options
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(options.clone());
        Ok(Arc::new((self.make_engine)()))
    }
}

/// Prompt that replays scripted answers in order and records what was asked.
#[derive(Debug, Default)]
pub struct ScriptedPrompt {
    answers: Mutex<VecDeque<String>>,
    asked: Mutex<Vec<CredentialField>>,
}

impl ScriptedPrompt {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: Mutex::new(answers.into_iter().map(Into::into).collect()),
            asked: Mutex::new(Vec::new()),
        }
    }

    /// Fields prompted for so far.
    pub fn asked(&self) -> Vec<CredentialField> {
        self.asked
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Prompt for ScriptedPrompt {
    fn ask(&self, field: CredentialField, _prompt: &str) -> Result<SecretString, ConfigError> {
        self.asked
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(field);
        let answer = self
            .answers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .ok_or_else(|| ConfigError::Prompt {
                field: field.to_string(),
                message: "no scripted answer left".to_string(),
            })?;
        Ok(SecretString::new(answer.into()))
    }
}

/// Resolver on host `test-host` that fails any prompt.
pub fn non_interactive_resolver() -> CredentialResolver {
    CredentialResolver::new(
        Some("test-host".to_string()),
        Arc::new(ScriptedPrompt::default()),
    )
}

/// A descriptor for `drivername` with stored test credentials.
pub fn descriptor_for(drivername: &str) -> ConnectionDescriptor {
    let config = json!({
        "drivername": drivername,
        "test": {"username": "tester", "password": "secret", "host": "localhost", "database": "db"}
    });
    let raw = RawConfig::from_value("test", ".", config)
        .unwrap_or_else(|e| panic!("invalid test config: {e}"));
    descriptor::build(&raw, "test", &non_interactive_resolver())
        .unwrap_or_else(|e| panic!("invalid test descriptor: {e}"))
}
