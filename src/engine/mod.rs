//! Engine capability interface.
//!
//! The statement layer never talks to a client library directly. It goes
//! through these traits, which mirror the engine's object interface:
//! attachments prepare statements against transactions, statements describe
//! their messages through [`MessageMetadata`], and cursors refill an output
//! message in place. Any backend implementing them can drive the whole
//! marshaling layer; [`memory::MemoryEngine`] is the in-process one.

pub mod memory;

use crate::error::Result;
use std::fmt;
use std::sync::Arc;

pub use crate::protocol::codec::zone::{FixedOffsetZones, TimeZoneRules};

/// Client library entry point.
pub trait Engine: Send + Sync + fmt::Debug {
    /// Attach to an existing database.
    fn attach_database(&self, uri: &str, dpb: &[u8]) -> Result<Box<dyn AttachmentHandle>>;

    /// Create a database and attach to it.
    fn create_database(&self, uri: &str, dpb: &[u8]) -> Result<Box<dyn AttachmentHandle>>;

    /// Time zone rules used for zoned time conversion.
    fn zone_rules(&self) -> Arc<dyn TimeZoneRules>;
}

/// An attached database.
pub trait AttachmentHandle {
    fn start_transaction(&self, tpb: &[u8]) -> Result<Box<dyn TransactionHandle>>;

    /// Start a transaction from `SET TRANSACTION` text.
    fn execute_transaction_command(&self, sql: &str) -> Result<Box<dyn TransactionHandle>>;

    /// Prepare `sql`. `flags` is a combination of `PREPARE_PREFETCH_*` bits.
    fn prepare(
        &self,
        transaction: &dyn TransactionHandle,
        sql: &str,
        dialect: u32,
        flags: u32,
    ) -> Result<Box<dyn StatementHandle>>;

    fn detach(&self) -> Result<()>;

    fn drop_database(&self) -> Result<()>;
}

/// A started transaction.
pub trait TransactionHandle {
    fn commit(&mut self) -> Result<()>;

    fn commit_retaining(&mut self) -> Result<()>;

    fn rollback(&mut self) -> Result<()>;

    fn rollback_retaining(&mut self) -> Result<()>;

    /// Phase one of a two-phase commit.
    fn prepare(&mut self, message: &[u8]) -> Result<()>;
}

/// A prepared statement.
pub trait StatementHandle {
    /// Statement kind as an engine `isc_info_sql_stmt_*` code.
    fn statement_type(&self) -> Result<u32>;

    fn input_metadata(&self) -> Result<Arc<dyn MessageMetadata>>;

    fn output_metadata(&self) -> Result<Arc<dyn MessageMetadata>>;

    /// Access plan, legacy or detailed form.
    fn plan(&self, detailed: bool) -> Result<String>;

    /// Execute a statement that does not open a cursor. Singleton output, if
    /// any, is written into `output`.
    fn execute(
        &mut self,
        transaction: &dyn TransactionHandle,
        input_metadata: &dyn MessageMetadata,
        input: &[u8],
        output_metadata: &dyn MessageMetadata,
        output: &mut [u8],
    ) -> Result<()>;

    /// Execute and open a cursor. `flags` is `CURSOR_TYPE_SCROLLABLE` or 0.
    fn open_cursor(
        &mut self,
        transaction: &dyn TransactionHandle,
        input_metadata: &dyn MessageMetadata,
        input: &[u8],
        output_metadata: Arc<dyn MessageMetadata>,
        flags: u32,
    ) -> Result<Box<dyn ResultSetHandle>>;

    fn free(&mut self) -> Result<()>;
}

/// Where a fetch positions the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchDirection {
    Next,
    Prior,
    First,
    Last,
    /// 1-based row number; negative counts from the end.
    Absolute(i32),
    /// Signed offset from the current row.
    Relative(i32),
}

/// Outcome of a single fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    Row,
    NoData,
}

/// An open cursor.
pub trait ResultSetHandle {
    /// Fetch a row into `output`, laid out by the output metadata the cursor
    /// was opened with.
    fn fetch(&mut self, direction: FetchDirection, output: &mut [u8]) -> Result<FetchStatus>;

    fn close(&mut self) -> Result<()>;
}

/// Layout and naming of one message.
pub trait MessageMetadata: fmt::Debug {
    fn count(&self) -> usize;

    /// Wire type code, nullable bit cleared.
    fn field_type(&self, index: usize) -> Result<u32>;

    fn scale(&self, index: usize) -> Result<i32>;

    fn length(&self, index: usize) -> Result<u32>;

    fn is_nullable(&self, index: usize) -> Result<bool>;

    fn field(&self, index: usize) -> Result<String>;

    fn alias(&self, index: usize) -> Result<String>;

    fn relation(&self, index: usize) -> Result<String>;

    fn offset(&self, index: usize) -> Result<u32>;

    fn null_offset(&self, index: usize) -> Result<u32>;

    /// Total bytes of one message.
    fn message_length(&self) -> Result<u32>;

    /// Start a builder seeded with this metadata.
    fn builder(&self) -> Result<Box<dyn MetadataBuilder>>;
}

/// Rewrites field types and produces a re-laid-out [`MessageMetadata`].
pub trait MetadataBuilder {
    fn set_type(&mut self, index: usize, sql_type: u32) -> Result<()>;

    fn metadata(&mut self) -> Result<Arc<dyn MessageMetadata>>;
}
