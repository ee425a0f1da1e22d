//! In-process engine backend.
//!
//! `MemoryEngine` implements the engine traits without a server. Databases
//! are names in a shared registry, transactions only track their own state,
//! and statements either loop their parameters back as a single row
//! (`select cast(? as <type>) ... from rdb$database`) or replay a result set
//! registered with [`MemoryEngine::register_query`].

mod cell;
mod metadata;
mod sql;

pub use cell::Cell;
pub use metadata::{FieldSpec, MemoryMetadata, MemoryMetadataBuilder};

use super::{
    AttachmentHandle, Engine, FetchDirection, FetchStatus, FixedOffsetZones, MessageMetadata,
    ResultSetHandle, StatementHandle, TimeZoneRules, TransactionHandle,
};
use crate::error::{Error, Result};
use crate::protocol::constants::*;
use sql::Source;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::trace;

/// A result set replayed for a registered SQL text.
#[derive(Debug, Clone, Default)]
pub struct ScriptedQuery {
    statement_type: Option<u32>,
    inputs: Vec<FieldSpec>,
    columns: Vec<FieldSpec>,
    rows: Vec<Vec<Cell>>,
    plan: Option<String>,
    failing_row: Option<usize>,
}

impl ScriptedQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the statement kind derived from the SQL text.
    pub fn with_statement_type(mut self, statement_type: u32) -> Self {
        self.statement_type = Some(statement_type);
        self
    }

    pub fn with_input(mut self, spec: FieldSpec) -> Self {
        self.inputs.push(spec);
        self
    }

    pub fn with_column(mut self, spec: FieldSpec) -> Self {
        self.columns.push(spec);
        self
    }

    pub fn with_row(mut self, row: Vec<Cell>) -> Self {
        self.rows.push(row);
        self
    }

    pub fn with_plan(mut self, plan: impl Into<String>) -> Self {
        self.plan = Some(plan.into());
        self
    }

    /// Make fetching the 1-based `row` fail with an arithmetic exception.
    pub fn with_failing_fetch(mut self, row: usize) -> Self {
        self.failing_row = Some(row);
        self
    }
}

#[derive(Debug, Default)]
struct State {
    databases: HashSet<String>,
    queries: HashMap<String, ScriptedQuery>,
    open_cursors: usize,
}

/// Engine backend living entirely in process memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryEngine {
    state: Arc<Mutex<State>>,
}

fn lock(state: &Mutex<State>) -> MutexGuard<'_, State> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn io_error(uri: &str, message: &str) -> Error {
    Error::engine(
        vec![ISC_IO_ERROR],
        format!("I/O error during \"{}\" operation for file \"{}\"", message, uri),
    )
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the result set returned by `sql`. Matching ignores case and
    /// whitespace runs outside quotes.
    pub fn register_query(&self, sql: &str, query: ScriptedQuery) {
        lock(&self.state).queries.insert(sql::normalize(sql), query);
    }

    /// Whether a database with this URI exists.
    pub fn database_exists(&self, uri: &str) -> bool {
        lock(&self.state).databases.contains(uri)
    }

    /// Cursors opened and not yet closed, across every attachment.
    pub fn open_cursor_count(&self) -> usize {
        lock(&self.state).open_cursors
    }

    fn check_dpb(dpb: &[u8]) -> Result<()> {
        match dpb.first() {
            None | Some(&ISC_DPB_VERSION1) => Ok(()),
            Some(_) => Err(Error::engine(
                vec![ISC_BAD_DPB_FORM],
                "wrong version of database parameter block",
            )),
        }
    }
}

impl Engine for MemoryEngine {
    fn attach_database(&self, uri: &str, dpb: &[u8]) -> Result<Box<dyn AttachmentHandle>> {
        Self::check_dpb(dpb)?;
        if !self.database_exists(uri) {
            return Err(io_error(uri, "open"));
        }
        Ok(Box::new(MemoryAttachment {
            state: Arc::clone(&self.state),
            uri: uri.to_string(),
        }))
    }

    fn create_database(&self, uri: &str, dpb: &[u8]) -> Result<Box<dyn AttachmentHandle>> {
        Self::check_dpb(dpb)?;
        if !lock(&self.state).databases.insert(uri.to_string()) {
            return Err(io_error(uri, "create"));
        }
        Ok(Box::new(MemoryAttachment {
            state: Arc::clone(&self.state),
            uri: uri.to_string(),
        }))
    }

    fn zone_rules(&self) -> Arc<dyn TimeZoneRules> {
        Arc::new(FixedOffsetZones)
    }
}

struct MemoryAttachment {
    state: Arc<Mutex<State>>,
    uri: String,
}

impl AttachmentHandle for MemoryAttachment {
    fn start_transaction(&self, tpb: &[u8]) -> Result<Box<dyn TransactionHandle>> {
        match tpb.first() {
            None | Some(&ISC_TPB_VERSION3) => Ok(Box::new(MemoryTransaction::default())),
            Some(_) => Err(Error::engine(
                vec![ISC_BAD_TPB_FORM],
                "wrong version of transaction parameter block",
            )),
        }
    }

    fn execute_transaction_command(&self, sql: &str) -> Result<Box<dyn TransactionHandle>> {
        let normalized = sql::normalize(sql);
        if sql::classify(&normalized)? != STMT_START_TRANS {
            return Err(Error::engine(
                vec![ISC_DSQL_ERROR],
                format!("Not a transaction start command: {}", sql),
            ));
        }
        Ok(Box::new(MemoryTransaction::default()))
    }

    fn prepare(
        &self,
        _transaction: &dyn TransactionHandle,
        sql: &str,
        _dialect: u32,
        _flags: u32,
    ) -> Result<Box<dyn StatementHandle>> {
        let normalized = sql::normalize(sql);
        let scripted = lock(&self.state).queries.get(&normalized).cloned();

        let statement = match scripted {
            Some(query) => {
                let statement_type = match query.statement_type {
                    Some(kind) => kind,
                    None => sql::classify(&normalized)?,
                };
                MemoryStatement {
                    state: self.state.clone(),
                    statement_type,
                    input: Arc::new(MemoryMetadata::new(query.inputs)),
                    output: Arc::new(MemoryMetadata::new(query.columns)),
                    body: Body::Rows(query.rows),
                    plan: query.plan,
                    failing_row: query.failing_row,
                    freed: false,
                }
            }
            None => {
                let parsed = sql::parse(&normalized)?;
                let (columns, sources): (Vec<_>, Vec<_>) = parsed.outputs.into_iter().unzip();
                let is_select = !columns.is_empty();
                MemoryStatement {
                    state: self.state.clone(),
                    statement_type: parsed.statement_type,
                    input: Arc::new(MemoryMetadata::new(parsed.inputs)),
                    output: Arc::new(MemoryMetadata::new(columns)),
                    body: Body::Loopback(sources),
                    plan: is_select.then(|| "PLAN (RDB$DATABASE NATURAL)".to_string()),
                    failing_row: None,
                    freed: false,
                }
            }
        };
        trace!(uri = %self.uri, sql, statement_type = statement.statement_type, "memory prepare");
        Ok(Box::new(statement))
    }

    fn detach(&self) -> Result<()> {
        Ok(())
    }

    fn drop_database(&self) -> Result<()> {
        if lock(&self.state).databases.remove(&self.uri) {
            Ok(())
        } else {
            Err(io_error(&self.uri, "remove"))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum TransactionState {
    #[default]
    Active,
    Prepared,
    Finished,
}

#[derive(Debug, Default)]
struct MemoryTransaction {
    state: TransactionState,
}

impl MemoryTransaction {
    fn check_open(&self) -> Result<()> {
        if self.state == TransactionState::Finished {
            return Err(Error::engine(
                vec![ISC_BAD_TRANS_HANDLE],
                "invalid transaction handle (expecting explicit transaction start)",
            ));
        }
        Ok(())
    }

    fn finish(&mut self, retaining: bool) -> Result<()> {
        self.check_open()?;
        self.state = if retaining {
            TransactionState::Active
        } else {
            TransactionState::Finished
        };
        Ok(())
    }
}

impl TransactionHandle for MemoryTransaction {
    fn commit(&mut self) -> Result<()> {
        self.finish(false)
    }

    fn commit_retaining(&mut self) -> Result<()> {
        self.finish(true)
    }

    fn rollback(&mut self) -> Result<()> {
        self.finish(false)
    }

    fn rollback_retaining(&mut self) -> Result<()> {
        self.finish(true)
    }

    fn prepare(&mut self, _message: &[u8]) -> Result<()> {
        self.check_open()?;
        self.state = TransactionState::Prepared;
        Ok(())
    }
}

#[derive(Debug)]
enum Body {
    Loopback(Vec<Source>),
    Rows(Vec<Vec<Cell>>),
}

#[derive(Debug)]
struct MemoryStatement {
    state: Arc<Mutex<State>>,
    statement_type: u32,
    input: Arc<MemoryMetadata>,
    output: Arc<MemoryMetadata>,
    body: Body,
    plan: Option<String>,
    failing_row: Option<usize>,
    freed: bool,
}

impl MemoryStatement {
    fn check_valid(&self) -> Result<()> {
        if self.freed {
            return Err(Error::engine(
                vec![ISC_BAD_STMT_HANDLE],
                "invalid statement handle",
            ));
        }
        Ok(())
    }

    /// Output messages of every row this execution produces.
    fn render_rows(
        &self,
        input_metadata: &dyn MessageMetadata,
        input: &[u8],
        output_metadata: &dyn MessageMetadata,
    ) -> Result<Vec<Vec<u8>>> {
        let len = output_metadata.message_length()? as usize;
        let rows = match &self.body {
            Body::Loopback(sources) => {
                let mut row = Vec::with_capacity(sources.len());
                for source in sources {
                    row.push(match source {
                        Source::Parameter(index) => cell::read_cell(input_metadata, *index, input)?,
                        Source::Literal(cell) => cell.clone(),
                    });
                }
                vec![row]
            }
            Body::Rows(rows) => rows.clone(),
        };

        rows.iter()
            .map(|row| {
                let mut message = vec![0u8; len];
                for (index, cell) in row.iter().enumerate() {
                    cell::write_cell(output_metadata, index, &mut message, cell)?;
                }
                Ok(message)
            })
            .collect()
    }
}

impl StatementHandle for MemoryStatement {
    fn statement_type(&self) -> Result<u32> {
        self.check_valid()?;
        Ok(self.statement_type)
    }

    fn input_metadata(&self) -> Result<Arc<dyn MessageMetadata>> {
        self.check_valid()?;
        Ok(self.input.clone())
    }

    fn output_metadata(&self) -> Result<Arc<dyn MessageMetadata>> {
        self.check_valid()?;
        Ok(self.output.clone())
    }

    fn plan(&self, detailed: bool) -> Result<String> {
        self.check_valid()?;
        let Some(plan) = &self.plan else {
            return Ok(String::new());
        };
        if !detailed {
            return Ok(format!("\n{}", plan));
        }
        let tables: Vec<&str> = plan
            .trim_start_matches("PLAN (")
            .trim_end_matches(')')
            .split(',')
            .filter_map(|item| item.split_whitespace().next())
            .collect();
        let mut detailed = String::from("\nSelect Expression");
        for table in tables {
            detailed.push_str(&format!("\n    -> Table \"{}\" Full Scan", table));
        }
        Ok(detailed)
    }

    fn execute(
        &mut self,
        _transaction: &dyn TransactionHandle,
        input_metadata: &dyn MessageMetadata,
        input: &[u8],
        output_metadata: &dyn MessageMetadata,
        output: &mut [u8],
    ) -> Result<()> {
        self.check_valid()?;
        if output_metadata.count() == 0 {
            return Ok(());
        }
        let rows = self.render_rows(input_metadata, input, output_metadata)?;
        if let Some(first) = rows.first() {
            if first.len() != output.len() {
                return Err(Error::BufferTooSmall {
                    needed: first.len(),
                    available: output.len(),
                    location: std::panic::Location::caller(),
                });
            }
            output.copy_from_slice(first);
        }
        Ok(())
    }

    fn open_cursor(
        &mut self,
        _transaction: &dyn TransactionHandle,
        input_metadata: &dyn MessageMetadata,
        input: &[u8],
        output_metadata: Arc<dyn MessageMetadata>,
        flags: u32,
    ) -> Result<Box<dyn ResultSetHandle>> {
        self.check_valid()?;
        if self.statement_type != STMT_SELECT && self.statement_type != STMT_SELECT_FOR_UPD {
            return Err(Error::engine(
                vec![ISC_DSQL_CURSOR_ERR],
                "Attempt to open a cursor for a statement that does not return rows",
            ));
        }
        let rows = self.render_rows(input_metadata, input, output_metadata.as_ref())?;
        lock(&self.state).open_cursors += 1;
        Ok(Box::new(MemoryResultSet {
            state: self.state.clone(),
            rows,
            position: 0,
            scrollable: flags & CURSOR_TYPE_SCROLLABLE != 0,
            failing_row: self.failing_row,
            closed: false,
        }))
    }

    fn free(&mut self) -> Result<()> {
        self.check_valid()?;
        self.freed = true;
        Ok(())
    }
}

/// Cursor over pre-rendered output messages.
///
/// `position` is 0 before the first row and `rows.len() + 1` after the last.
#[derive(Debug)]
struct MemoryResultSet {
    state: Arc<Mutex<State>>,
    rows: Vec<Vec<u8>>,
    position: i64,
    scrollable: bool,
    failing_row: Option<usize>,
    closed: bool,
}

impl ResultSetHandle for MemoryResultSet {
    fn fetch(&mut self, direction: FetchDirection, output: &mut [u8]) -> Result<FetchStatus> {
        if self.closed {
            return Err(Error::engine(vec![ISC_DSQL_CURSOR_ERR], "Cursor is not open"));
        }
        if !self.scrollable && direction != FetchDirection::Next {
            return Err(Error::engine(
                vec![ISC_INVALID_FETCH_OPTION],
                format!("invalid fetch option {:?} for a forward-only cursor", direction),
            ));
        }

        let count = self.rows.len() as i64;
        let target = match direction {
            FetchDirection::Next => self.position + 1,
            FetchDirection::Prior => self.position - 1,
            FetchDirection::First => 1,
            FetchDirection::Last => count,
            FetchDirection::Absolute(n) if n >= 0 => n as i64,
            FetchDirection::Absolute(n) => count + 1 + n as i64,
            FetchDirection::Relative(n) => self.position + n as i64,
        };

        if target < 1 {
            self.position = 0;
            return Ok(FetchStatus::NoData);
        }
        if target > count {
            self.position = count + 1;
            return Ok(FetchStatus::NoData);
        }

        if self.failing_row == Some(target as usize) {
            return Err(Error::engine(
                vec![ISC_ARITH_EXCEPT],
                "arithmetic exception, numeric overflow, or string truncation",
            ));
        }
        self.position = target;
        let row = &self.rows[(target - 1) as usize];
        if row.len() != output.len() {
            return Err(Error::BufferTooSmall {
                needed: row.len(),
                available: output.len(),
                location: std::panic::Location::caller(),
            });
        }
        output.copy_from_slice(row);
        trace!(position = target, "memory fetch");
        Ok(FetchStatus::Row)
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Err(Error::engine(vec![ISC_DSQL_CURSOR_ERR], "Cursor is not open"));
        }
        self.closed = true;
        let mut state = lock(&self.state);
        state.open_cursors = state.open_cursors.saturating_sub(1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::types::SqlType;

    fn attach() -> Box<dyn AttachmentHandle> {
        let engine = MemoryEngine::new();
        engine.create_database("mem:test", &[]).unwrap()
    }

    #[test]
    fn test_attach_requires_existing_database() {
        let engine = MemoryEngine::new();
        let err = engine.attach_database("mem:missing", &[]).err().expect("attach to missing database should fail");
        assert_eq!(err.codes(), vec![ISC_IO_ERROR]);
        engine.create_database("mem:db", &[]).unwrap();
        assert!(engine.attach_database("mem:db", &[]).is_ok());
        assert!(engine.create_database("mem:db", &[]).is_err());
    }

    #[test]
    fn test_bad_parameter_blocks() {
        let engine = MemoryEngine::new();
        assert!(engine.create_database("mem:db", &[9]).is_err());
        let attachment = engine.create_database("mem:db", &[]).unwrap();
        assert!(attachment.start_transaction(&[1]).is_err());
        assert!(attachment.start_transaction(&[ISC_TPB_VERSION3]).is_ok());
    }

    #[test]
    fn test_transaction_finishes_once() {
        let attachment = attach();
        let mut tx = attachment.start_transaction(&[]).unwrap();
        tx.commit_retaining().unwrap();
        tx.commit().unwrap();
        let err = tx.rollback().unwrap_err();
        assert_eq!(err.codes(), vec![ISC_BAD_TRANS_HANDLE]);
    }

    #[test]
    fn test_loopback_cursor() {
        let attachment = attach();
        let tx = attachment.start_transaction(&[]).unwrap();
        let mut stmt = attachment
            .prepare(tx.as_ref(), "select cast(? as integer) from rdb$database", 3, 0)
            .unwrap();
        assert_eq!(stmt.statement_type().unwrap(), STMT_SELECT);
        let input_metadata = stmt.input_metadata().unwrap();
        let output_metadata = stmt.output_metadata().unwrap();
        let mut input = vec![0u8; input_metadata.message_length().unwrap() as usize];
        input[0..4].copy_from_slice(&42i32.to_ne_bytes());

        let mut cursor = stmt
            .open_cursor(tx.as_ref(), input_metadata.as_ref(), &input, output_metadata.clone(), 0)
            .unwrap();
        let mut output = vec![0u8; output_metadata.message_length().unwrap() as usize];
        assert_eq!(cursor.fetch(FetchDirection::Next, &mut output).unwrap(), FetchStatus::Row);
        assert_eq!(&output[0..4], &42i32.to_ne_bytes());
        assert_eq!(&output[4..6], &0i16.to_ne_bytes());
        assert_eq!(cursor.fetch(FetchDirection::Next, &mut output).unwrap(), FetchStatus::NoData);
        assert!(cursor.fetch(FetchDirection::First, &mut output).is_err());
    }

    #[test]
    fn test_scripted_scrollable_cursor() {
        let engine = MemoryEngine::new();
        engine.register_query(
            "select n from numbers",
            ScriptedQuery::new()
                .with_column(FieldSpec::new(SqlType::Long).with_alias("N"))
                .with_row(vec![Cell::from(1)])
                .with_row(vec![Cell::from(2)])
                .with_row(vec![Cell::from(3)]),
        );
        let attachment = engine.create_database("mem:db", &[]).unwrap();
        let tx = attachment.start_transaction(&[]).unwrap();
        let mut stmt = attachment.prepare(tx.as_ref(), "SELECT n FROM numbers", 3, 0).unwrap();
        let input_metadata = stmt.input_metadata().unwrap();
        let output_metadata = stmt.output_metadata().unwrap();
        let mut cursor = stmt
            .open_cursor(
                tx.as_ref(),
                input_metadata.as_ref(),
                &[],
                output_metadata.clone(),
                CURSOR_TYPE_SCROLLABLE,
            )
            .unwrap();
        let mut output = vec![0u8; output_metadata.message_length().unwrap() as usize];
        let mut fetch = |direction| {
            let status = cursor.fetch(direction, &mut output).unwrap();
            (status, i32::from_ne_bytes(output[0..4].try_into().unwrap()))
        };
        assert_eq!(fetch(FetchDirection::Last), (FetchStatus::Row, 3));
        assert_eq!(fetch(FetchDirection::Prior), (FetchStatus::Row, 2));
        assert_eq!(fetch(FetchDirection::Absolute(1)), (FetchStatus::Row, 1));
        assert_eq!(fetch(FetchDirection::Relative(2)), (FetchStatus::Row, 3));
        assert_eq!(fetch(FetchDirection::Absolute(-2)), (FetchStatus::Row, 2));
        assert_eq!(fetch(FetchDirection::Absolute(0)).0, FetchStatus::NoData);
        assert_eq!(fetch(FetchDirection::Absolute(4)).0, FetchStatus::NoData);
        assert_eq!(fetch(FetchDirection::Prior), (FetchStatus::Row, 3));
    }

    #[test]
    fn test_freed_statement_is_invalid() {
        let attachment = attach();
        let tx = attachment.start_transaction(&[]).unwrap();
        let mut stmt = attachment.prepare(tx.as_ref(), "commit", 3, 0).unwrap();
        stmt.free().unwrap();
        assert_eq!(stmt.statement_type().unwrap_err().codes(), vec![ISC_BAD_STMT_HANDLE]);
    }

    #[test]
    fn test_plans() {
        let attachment = attach();
        let tx = attachment.start_transaction(&[]).unwrap();
        let stmt = attachment
            .prepare(tx.as_ref(), "select cast(1 as integer) from rdb$database", 3, 0)
            .unwrap();
        assert_eq!(stmt.plan(false).unwrap(), "\nPLAN (RDB$DATABASE NATURAL)");
        assert_eq!(
            stmt.plan(true).unwrap(),
            "\nSelect Expression\n    -> Table \"RDB$DATABASE\" Full Scan"
        );
    }
}
