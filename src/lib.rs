//! Firebird client binding for Rust
//!
//! A typed statement layer over the Firebird engine API: prepared statements
//! marshal parameters and columns between Rust values and the engine's raw
//! message buffers, with null tracking, exact scaled-numeric semantics and
//! generic tuple, struct and variant binding.
//!
//! The engine itself sits behind the traits in [`engine`]. The crate ships an
//! in-process backend, [`engine::memory::MemoryEngine`], which lays messages
//! out exactly as the engine does.
//!
//! # Example
//!
//! ```
//! use fbclient_rs::{
//!     Attachment, AttachmentOptions, Client, Result, Statement, StatementOptions, Transaction,
//!     TransactionOptions,
//! };
//!
//! fn main() -> Result<()> {
//!     let client = Client::memory();
//!     let options = AttachmentOptions::new().with_create_database(true);
//!     let attachment = Attachment::connect(&client, "mem:employee", &options)?;
//!     let mut transaction = Transaction::start(&attachment, &TransactionOptions::new())?;
//!
//!     let mut statement = Statement::prepare(
//!         &attachment,
//!         &transaction,
//!         "select cast(? as integer) n, cast(? as varchar(20)) s from rdb$database",
//!         &StatementOptions::new(),
//!     )?;
//!     statement.set_params((42, "hello"))?;
//!     statement.execute(&transaction)?;
//!
//!     let (n, s): (i32, String) = statement.row()?;
//!     assert_eq!((n, s.as_str()), (42, "hello"));
//!
//!     transaction.commit()?;
//!     Ok(())
//! }
//! ```

pub mod attachment;
pub mod client;
pub mod cursor;
pub mod engine;
pub mod error;
pub mod protocol;
pub mod statement;
pub mod transaction;

// Re-export main types
pub use attachment::{Attachment, AttachmentOptions};
pub use client::Client;
pub use cursor::{Cursor, RowCursor};
pub use error::{Error, Result};
pub use protocol::types::{
    AdjustedType, BlobId, DecFloat, DecFloat16, DecFloat34, Descriptor, Descriptors, OpaqueDate,
    OpaqueDecFloat16, OpaqueDecFloat34, OpaqueInt128, OpaqueTime, OpaqueTimeTz, OpaqueTimestamp,
    OpaqueTimestampTz, Scaled, ScaledInt128, ScaledInt16, ScaledInt32, ScaledInt64,
    ScaledOpaqueInt128, SqlType, TimeTz, TimestampTz, Value, ValueKind,
};
pub use statement::{
    CursorType, Decode, Encode, FromField, FromRow, Params, Statement, StatementOptions,
    StatementType, Variant,
};
pub use transaction::{
    AccessMode, IsolationLevel, ReadCommittedMode, Transaction, TransactionOptions,
    TransactionState, WaitMode,
};
