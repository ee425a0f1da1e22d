//! Prepared statements.
//!
//! A [`Statement`] owns the engine statement handle, the open cursor (if
//! any) and one message buffer per direction. Parameters are written into
//! the input buffer through the typed setters, rows are read from the output
//! buffer through the typed getters; both address fields only through the
//! descriptors built at prepare time.
//!
//! # Example
//!
//! ```
//! use fbclient_rs::{
//!     Attachment, AttachmentOptions, Client, ScaledInt64, Statement, StatementOptions,
//!     Transaction, TransactionOptions,
//! };
//!
//! let client = Client::memory();
//! let options = AttachmentOptions::new().with_create_database(true);
//! let attachment = Attachment::connect(&client, "mem:statement-doc", &options).unwrap();
//! let transaction = Transaction::start(&attachment, &TransactionOptions::new()).unwrap();
//!
//! let mut statement = Statement::prepare(
//!     &attachment,
//!     &transaction,
//!     "select cast(? as numeric(18,2)) from rdb$database",
//!     &StatementOptions::new(),
//! )
//! .unwrap();
//! statement.set_scaled_int64(0, ScaledInt64::new(12345, -2)).unwrap();
//! assert!(statement.execute(&transaction).unwrap());
//! assert_eq!(statement.get_string(0).unwrap().as_deref(), Some("123.45"));
//! ```

mod accessors;
pub mod binding;
pub mod variant;

pub use binding::{Decode, Encode, FromField, FromRow, Params};
pub use variant::Variant;

use crate::attachment::Attachment;
use crate::cursor::RowCursor;
use crate::engine::{FetchDirection, FetchStatus, ResultSetHandle, StatementHandle};
use crate::error::{Error, Result, ResultExt};
use crate::protocol::constants::*;
use crate::protocol::layout::{build_layout, MessageLayout};
use crate::protocol::types::{Descriptor, Descriptors};
use crate::transaction::Transaction;
use std::fmt;
use tracing::{debug, error, trace};

/// Statement kind as classified by the engine at prepare time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementType {
    Select,
    Insert,
    Update,
    Delete,
    Ddl,
    GetSegment,
    PutSegment,
    ExecProcedure,
    StartTransaction,
    Commit,
    Rollback,
    SelectForUpdate,
    SetGenerator,
    Savepoint,
}

impl StatementType {
    /// Map an engine statement type code.
    pub fn from_code(code: u32) -> Result<Self> {
        Ok(match code {
            STMT_SELECT => StatementType::Select,
            STMT_INSERT => StatementType::Insert,
            STMT_UPDATE => StatementType::Update,
            STMT_DELETE => StatementType::Delete,
            STMT_DDL => StatementType::Ddl,
            STMT_GET_SEGMENT => StatementType::GetSegment,
            STMT_PUT_SEGMENT => StatementType::PutSegment,
            STMT_EXEC_PROCEDURE => StatementType::ExecProcedure,
            STMT_START_TRANS => StatementType::StartTransaction,
            STMT_COMMIT => StatementType::Commit,
            STMT_ROLLBACK => StatementType::Rollback,
            STMT_SELECT_FOR_UPD => StatementType::SelectForUpdate,
            STMT_SET_GENERATOR => StatementType::SetGenerator,
            STMT_SAVEPOINT => StatementType::Savepoint,
            other => {
                return Err(Error::Unsupported {
                    message: format!("statement type {}", other),
                })
            }
        })
    }

    pub fn code(&self) -> u32 {
        match self {
            StatementType::Select => STMT_SELECT,
            StatementType::Insert => STMT_INSERT,
            StatementType::Update => STMT_UPDATE,
            StatementType::Delete => STMT_DELETE,
            StatementType::Ddl => STMT_DDL,
            StatementType::GetSegment => STMT_GET_SEGMENT,
            StatementType::PutSegment => STMT_PUT_SEGMENT,
            StatementType::ExecProcedure => STMT_EXEC_PROCEDURE,
            StatementType::StartTransaction => STMT_START_TRANS,
            StatementType::Commit => STMT_COMMIT,
            StatementType::Rollback => STMT_ROLLBACK,
            StatementType::SelectForUpdate => STMT_SELECT_FOR_UPD,
            StatementType::SetGenerator => STMT_SET_GENERATOR,
            StatementType::Savepoint => STMT_SAVEPOINT,
        }
    }

    /// Whether executing opens a cursor.
    pub fn returns_rows(&self) -> bool {
        matches!(self, StatementType::Select | StatementType::SelectForUpdate)
    }
}

/// Cursor navigation allowed after execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorType {
    /// Only `fetch_next`.
    #[default]
    ForwardOnly,
    /// Every fetch direction.
    Scrollable,
}

impl CursorType {
    fn flags(&self) -> u32 {
        match self {
            CursorType::ForwardOnly => 0,
            CursorType::Scrollable => CURSOR_TYPE_SCROLLABLE,
        }
    }
}

/// Options used when preparing a statement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatementOptions {
    /// Fetch the legacy plan text during prepare.
    pub prefetch_legacy_plan: bool,
    /// Fetch the structured plan text during prepare.
    pub prefetch_plan: bool,
    pub cursor_type: CursorType,
}

impl StatementOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefetch_legacy_plan(mut self, value: bool) -> Self {
        self.prefetch_legacy_plan = value;
        self
    }

    pub fn with_prefetch_plan(mut self, value: bool) -> Self {
        self.prefetch_plan = value;
        self
    }

    pub fn with_cursor_type(mut self, cursor_type: CursorType) -> Self {
        self.cursor_type = cursor_type;
        self
    }

    fn prepare_flags(&self) -> u32 {
        let mut flags = PREPARE_PREFETCH_METADATA;
        if self.prefetch_legacy_plan {
            flags |= PREPARE_PREFETCH_LEGACY_PLAN;
        }
        if self.prefetch_plan {
            flags |= PREPARE_PREFETCH_DETAILED_PLAN;
        }
        flags
    }
}

/// A prepared statement on one attachment.
///
/// The statement borrows its attachment. A transaction is only needed for
/// prepare and execute, so one statement can run in several transactions
/// over its lifetime. Dropping a statement that was not freed frees it and
/// logs any failure.
pub struct Statement<'a> {
    attachment: &'a Attachment,
    sql: String,
    handle: Option<Box<dyn StatementHandle>>,
    result_set: Option<Box<dyn ResultSetHandle>>,
    statement_type: StatementType,
    cursor_type: CursorType,
    legacy_plan: Option<String>,
    plan: Option<String>,
    input: MessageLayout,
    output: MessageLayout,
}

impl<'a> Statement<'a> {
    /// Prepare `sql` and build the input and output messages.
    ///
    /// # Errors
    /// - `Error::Usage` for SET TRANSACTION, COMMIT and ROLLBACK, which belong
    ///   to [`Transaction`]; the engine statement is freed first.
    /// - `Error::Unsupported` for blob segment statements.
    /// - `Error::Context` wrapping the engine failure otherwise.
    pub fn prepare(
        attachment: &'a Attachment,
        transaction: &Transaction<'_>,
        sql: &str,
        options: &StatementOptions,
    ) -> Result<Self> {
        let mut handle = attachment
            .handle()?
            .prepare(
                transaction.handle()?,
                sql,
                SQL_DIALECT_V6,
                options.prepare_flags(),
            )
            .context("Statement::prepare", sql)?;

        let statement_type =
            StatementType::from_code(handle.statement_type().context("Statement::prepare", sql)?)?;

        let rejection = match statement_type {
            StatementType::StartTransaction => Some(Error::usage(
                "Cannot use SET TRANSACTION command with Statement. Use Transaction::start_with_command",
            )),
            StatementType::Commit => Some(Error::usage(
                "Cannot use COMMIT command with Statement. Use the commit method of Transaction",
            )),
            StatementType::Rollback => Some(Error::usage(
                "Cannot use ROLLBACK command with Statement. Use the rollback method of Transaction",
            )),
            StatementType::GetSegment | StatementType::PutSegment => Some(Error::Unsupported {
                message: "BLOB segment operations".to_string(),
            }),
            _ => None,
        };
        if let Some(rejection) = rejection {
            if let Err(e) = handle.free() {
                error!(sql, error = %e, "failed to free rejected statement");
            }
            return Err(rejection);
        }

        let legacy_plan = if options.prefetch_legacy_plan {
            Some(handle.plan(false).context("Statement::prepare", sql)?)
        } else {
            None
        };
        let plan = if options.prefetch_plan {
            Some(handle.plan(true).context("Statement::prepare", sql)?)
        } else {
            None
        };

        let input = build_layout(handle.input_metadata().context("Statement::prepare", sql)?)
            .context("Statement::prepare", sql)?;
        let output = build_layout(handle.output_metadata().context("Statement::prepare", sql)?)
            .context("Statement::prepare", sql)?;

        debug!(
            sql,
            statement_type = ?statement_type,
            inputs = input.descriptors.len(),
            outputs = output.descriptors.len(),
            "statement prepared"
        );

        Ok(Self {
            attachment,
            sql: sql.to_string(),
            handle: Some(handle),
            result_set: None,
            statement_type,
            cursor_type: options.cursor_type,
            legacy_plan,
            plan,
            input,
            output,
        })
    }

    pub fn attachment(&self) -> &'a Attachment {
        self.attachment
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn statement_type(&self) -> StatementType {
        self.statement_type
    }

    /// Whether the statement still holds an engine handle.
    pub fn is_valid(&self) -> bool {
        self.handle.is_some()
    }

    /// Whether a cursor is open from the last execute.
    pub fn has_cursor(&self) -> bool {
        self.result_set.is_some()
    }

    pub fn input_descriptors(&self) -> &Descriptors {
        &self.input.descriptors
    }

    pub fn output_descriptors(&self) -> &Descriptors {
        &self.output.descriptors
    }

    fn check_valid(&self) -> Result<()> {
        if self.handle.is_none() {
            return Err(Error::usage("Statement is not valid"));
        }
        Ok(())
    }

    fn handle(&self) -> Result<&dyn StatementHandle> {
        self.handle
            .as_deref()
            .ok_or_else(|| Error::usage("Statement is not valid"))
    }

    /// Legacy plan text, e.g. `PLAN (RDB$DATABASE NATURAL)`.
    pub fn legacy_plan(&self) -> Result<String> {
        match &self.legacy_plan {
            Some(plan) if self.is_valid() => Ok(plan.clone()),
            _ => self
                .handle()?
                .plan(false)
                .context("Statement::getLegacyPlan", &self.sql),
        }
    }

    /// Structured plan text.
    pub fn plan(&self) -> Result<String> {
        match &self.plan {
            Some(plan) if self.is_valid() => Ok(plan.clone()),
            _ => self.handle()?.plan(true).context("Statement::getPlan", &self.sql),
        }
    }

    /// Execute with the parameters currently bound.
    ///
    /// Any open cursor is closed and every output field reset to NULL first.
    /// Row-returning statements open a cursor and fetch the first row; the
    /// result tells whether there was one. Other statements return whether
    /// they produced output values.
    pub fn execute(&mut self, transaction: &Transaction<'_>) -> Result<bool> {
        self.check_valid()?;
        let tx = transaction.handle()?;

        if let Some(mut cursor) = self.result_set.take() {
            cursor.close().context("Statement::execute", &self.sql)?;
        }
        for descriptor in &self.output.descriptors {
            self.output.buffer.set_null(descriptor.null_offset as usize, true)?;
        }

        let Some(handle) = self.handle.as_deref_mut() else {
            return Err(Error::usage("Statement is not valid"));
        };
        debug!(sql = %self.sql, statement_type = ?self.statement_type, "execute");

        if self.statement_type.returns_rows() {
            let mut cursor = handle
                .open_cursor(
                    tx,
                    self.input.metadata.as_ref(),
                    self.input.buffer.as_slice(),
                    self.output.metadata.clone(),
                    self.cursor_type.flags(),
                )
                .context("Statement::execute", &self.sql)?;
            let fetched = cursor.fetch(FetchDirection::Next, self.output.buffer.as_mut_slice());
            let status = match fetched {
                Ok(status) => status,
                Err(e) => {
                    if let Err(close) = cursor.close() {
                        error!(sql = %self.sql, error = %close, "failed to close cursor after fetch");
                    }
                    return Err(e).context("Statement::execute", &self.sql);
                }
            };
            self.result_set = Some(cursor);
            Ok(status == FetchStatus::Row)
        } else {
            handle
                .execute(
                    tx,
                    self.input.metadata.as_ref(),
                    self.input.buffer.as_slice(),
                    self.output.metadata.as_ref(),
                    self.output.buffer.as_mut_slice(),
                )
                .context("Statement::execute", &self.sql)?;
            Ok(!self.output.descriptors.is_empty())
        }
    }

    fn fetch(&mut self, direction: FetchDirection) -> Result<bool> {
        self.check_valid()?;
        let Some(cursor) = self.result_set.as_deref_mut() else {
            return Ok(false);
        };
        let status = cursor
            .fetch(direction, self.output.buffer.as_mut_slice())
            .context("Statement::fetch", &self.sql)?;
        trace!(?direction, ?status, "fetch");
        Ok(status == FetchStatus::Row)
    }

    /// Move to the next row. `false` past the last row or without a cursor.
    pub fn fetch_next(&mut self) -> Result<bool> {
        self.fetch(FetchDirection::Next)
    }

    pub fn fetch_prior(&mut self) -> Result<bool> {
        self.fetch(FetchDirection::Prior)
    }

    pub fn fetch_first(&mut self) -> Result<bool> {
        self.fetch(FetchDirection::First)
    }

    pub fn fetch_last(&mut self) -> Result<bool> {
        self.fetch(FetchDirection::Last)
    }

    /// Move to the 1-based row `position`; 0 and positions past the end are "no row".
    pub fn fetch_absolute(&mut self, position: u32) -> Result<bool> {
        let position = i32::try_from(position).unwrap_or(i32::MAX);
        self.fetch(FetchDirection::Absolute(position))
    }

    pub fn fetch_relative(&mut self, offset: i32) -> Result<bool> {
        self.fetch(FetchDirection::Relative(offset))
    }

    /// Close the open cursor, if any, keeping the statement prepared.
    pub fn close_cursor(&mut self) -> Result<()> {
        if let Some(mut cursor) = self.result_set.take() {
            cursor.close().context("Statement::closeCursor", &self.sql)?;
        }
        Ok(())
    }

    /// Close the cursor and release the engine statement. Freeing twice is a no-op.
    pub fn free(&mut self) -> Result<()> {
        if let Some(mut cursor) = self.result_set.take() {
            cursor.close().context("Statement::free", &self.sql)?;
        }
        if let Some(mut handle) = self.handle.take() {
            handle.free().context("Statement::free", &self.sql)?;
            debug!(sql = %self.sql, "statement freed");
        }
        Ok(())
    }

    /// Execute and iterate the rows as `R`.
    ///
    /// The row shape is checked against the output columns before executing.
    pub fn query<R: FromRow>(&mut self, transaction: &Transaction<'_>) -> Result<RowCursor<'_, 'a, R>> {
        self.check_row_shape::<R>()?;
        let has_row = self.execute(transaction)?;
        Ok(RowCursor::new(self, has_row))
    }

    /// Read one output column.
    pub fn get<T: FromField>(&self, index: usize) -> Result<T> {
        T::from_field(self, index)
    }

    /// Bind one parameter; `None` binds NULL.
    pub fn set<T: Encode>(&mut self, index: usize, value: T) -> Result<()> {
        value.encode(self, index)
    }

    /// Read the current row into a tuple or `sql_struct!` type.
    ///
    /// # Errors
    /// `Error::CountMismatch` when the shape has a different number of
    /// elements than the statement has output columns, `Error::NullValue`
    /// when a non-optional element is NULL.
    pub fn row<R: FromRow>(&self) -> Result<R> {
        self.check_row_shape::<R>()?;
        R::from_row(self)
    }

    fn check_row_shape<R: FromRow>(&self) -> Result<()> {
        if R::ARITY != self.output.descriptors.len() {
            return Err(Error::CountMismatch {
                what: R::ELEMENT,
                target: "output column",
                actual: R::ARITY,
                expected: self.output.descriptors.len(),
            });
        }
        Ok(())
    }

    /// Bind every parameter from a tuple or `sql_struct!` type.
    pub fn set_params<P: Params>(&mut self, params: P) -> Result<()> {
        if P::ARITY != self.input.descriptors.len() {
            return Err(Error::CountMismatch {
                what: P::ELEMENT,
                target: "input parameter",
                actual: P::ARITY,
                expected: self.input.descriptors.len(),
            });
        }
        params.bind(self)
    }

    /// Read an output column into a variant type.
    pub fn get_variant<V: Variant>(&self, index: usize) -> Result<V> {
        variant::read(self, index)
    }

    /// Bind the alternative `value` currently holds.
    pub fn set_variant<V: Variant>(&mut self, index: usize, value: &V) -> Result<()> {
        self.set_value(index, value.to_value())
    }

    fn input_descriptor(&self, index: usize) -> Result<&Descriptor> {
        self.check_valid()?;
        self.input
            .descriptors
            .get(index)
            .ok_or(Error::IndexOutOfRange {
                index,
                count: self.input.descriptors.len(),
            })
    }

    fn output_descriptor(&self, index: usize) -> Result<&Descriptor> {
        self.check_valid()?;
        self.output
            .descriptors
            .get(index)
            .ok_or(Error::IndexOutOfRange {
                index,
                count: self.output.descriptors.len(),
            })
    }

    /// Whether output column `index` is NULL in the current row.
    pub fn is_null(&self, index: usize) -> Result<bool> {
        let descriptor = self.output_descriptor(index)?;
        self.output.buffer.is_null(descriptor.null_offset as usize)
    }

    /// Bind NULL to parameter `index`.
    pub fn set_null(&mut self, index: usize) -> Result<()> {
        let null_offset = self.input_descriptor(index)?.null_offset as usize;
        self.input.buffer.set_null(null_offset, true)
    }

    /// Reset every parameter to NULL.
    pub fn clear_parameters(&mut self) -> Result<()> {
        self.check_valid()?;
        for descriptor in &self.input.descriptors {
            self.input.buffer.set_null(descriptor.null_offset as usize, true)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Statement<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Statement")
            .field("sql", &self.sql)
            .field("statement_type", &self.statement_type)
            .field("valid", &self.is_valid())
            .field("cursor", &self.has_cursor())
            .finish()
    }
}

impl Drop for Statement<'_> {
    fn drop(&mut self) {
        if let Some(mut cursor) = self.result_set.take() {
            if let Err(e) = cursor.close() {
                error!(sql = %self.sql, error = %e, "failed to close cursor on drop");
            }
        }
        if let Some(mut handle) = self.handle.take() {
            if let Err(e) = handle.free() {
                error!(sql = %self.sql, error = %e, "failed to free statement on drop");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attachment::AttachmentOptions;
    use crate::client::Client;
    use crate::engine::memory::{Cell, FieldSpec, MemoryEngine, ScriptedQuery};
    use crate::protocol::types::SqlType;
    use crate::transaction::TransactionOptions;

    fn attach(engine: &MemoryEngine, uri: &str) -> Attachment {
        let client = Client::new(engine.clone());
        let options = AttachmentOptions::new().with_create_database(true);
        Attachment::connect(&client, uri, &options).unwrap()
    }

    #[test]
    fn test_statement_type_codes() {
        for code in 1..=14 {
            assert_eq!(StatementType::from_code(code).unwrap().code(), code);
        }
        assert!(matches!(
            StatementType::from_code(99),
            Err(Error::Unsupported { .. })
        ));
        assert!(StatementType::SelectForUpdate.returns_rows());
        assert!(!StatementType::ExecProcedure.returns_rows());
    }

    #[test]
    fn test_prepare_flags() {
        assert_eq!(StatementOptions::new().prepare_flags(), PREPARE_PREFETCH_METADATA);
        let options = StatementOptions::new()
            .with_prefetch_legacy_plan(true)
            .with_prefetch_plan(true);
        assert_eq!(
            options.prepare_flags(),
            PREPARE_PREFETCH_METADATA | PREPARE_PREFETCH_LEGACY_PLAN | PREPARE_PREFETCH_DETAILED_PLAN
        );
    }

    #[test]
    fn test_transaction_control_is_rejected() {
        let engine = MemoryEngine::new();
        let attachment = attach(&engine, "mem:st-reject");
        let transaction = Transaction::start(&attachment, &TransactionOptions::new()).unwrap();
        for sql in ["commit", "rollback", "set transaction"] {
            let err = Statement::prepare(&attachment, &transaction, sql, &StatementOptions::new())
                .unwrap_err();
            assert!(matches!(err, Error::Usage { .. }), "{}", sql);
        }
        let err = Statement::prepare(&attachment, &transaction, "get segment", &StatementOptions::new())
            .unwrap_err();
        assert!(matches!(err, Error::Unsupported { .. }));
    }

    #[test]
    fn test_free_is_idempotent() {
        let engine = MemoryEngine::new();
        let attachment = attach(&engine, "mem:st-free");
        let transaction = Transaction::start(&attachment, &TransactionOptions::new()).unwrap();
        let mut statement = Statement::prepare(
            &attachment,
            &transaction,
            "select cast(? as integer) from rdb$database",
            &StatementOptions::new(),
        )
        .unwrap();
        statement.free().unwrap();
        statement.free().unwrap();
        assert!(!statement.is_valid());
        assert!(matches!(statement.execute(&transaction), Err(Error::Usage { .. })));
        assert!(matches!(statement.set_null(0), Err(Error::Usage { .. })));
    }

    #[test]
    fn test_execute_resets_output_nulls() {
        let engine = MemoryEngine::new();
        engine.register_query(
            "execute procedure p",
            ScriptedQuery::new()
                .with_statement_type(STMT_EXEC_PROCEDURE)
                .with_column(FieldSpec::new(SqlType::Long).with_alias("X"))
                .with_row(vec![Cell::Null]),
        );
        let attachment = attach(&engine, "mem:st-exec");
        let transaction = Transaction::start(&attachment, &TransactionOptions::new()).unwrap();
        let mut statement = Statement::prepare(
            &attachment,
            &transaction,
            "execute procedure p",
            &StatementOptions::new(),
        )
        .unwrap();
        assert!(statement.execute(&transaction).unwrap());
        assert!(statement.is_null(0).unwrap());
        assert!(!statement.fetch_next().unwrap());
    }

    #[test]
    fn test_prefetched_plans() {
        let engine = MemoryEngine::new();
        let attachment = attach(&engine, "mem:st-plan");
        let transaction = Transaction::start(&attachment, &TransactionOptions::new()).unwrap();
        let options = StatementOptions::new()
            .with_prefetch_legacy_plan(true)
            .with_prefetch_plan(true);
        let statement = Statement::prepare(
            &attachment,
            &transaction,
            "select cast(1 as integer) one from rdb$database",
            &options,
        )
        .unwrap();
        assert_eq!(statement.legacy_plan().unwrap(), "\nPLAN (RDB$DATABASE NATURAL)");
        assert!(statement.plan().unwrap().contains("Table \"RDB$DATABASE\" Full Scan"));
        assert_eq!(statement.output_descriptors().aliases(), vec!["ONE"]);
    }

    #[test]
    fn test_index_out_of_range() {
        let engine = MemoryEngine::new();
        let attachment = attach(&engine, "mem:st-index");
        let transaction = Transaction::start(&attachment, &TransactionOptions::new()).unwrap();
        let mut statement = Statement::prepare(
            &attachment,
            &transaction,
            "select cast(? as integer) from rdb$database",
            &StatementOptions::new(),
        )
        .unwrap();
        assert!(matches!(
            statement.set_null(1),
            Err(Error::IndexOutOfRange { index: 1, count: 1 })
        ));
        assert!(matches!(
            statement.is_null(3),
            Err(Error::IndexOutOfRange { index: 3, count: 1 })
        ));
    }
}
