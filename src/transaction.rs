//! Transactions.

use crate::attachment::Attachment;
use crate::engine::TransactionHandle;
use crate::error::{Error, Result, ResultExt};
use crate::protocol::constants::*;
use crate::protocol::xpb::ParameterBlock;
use std::fmt;
use tracing::{debug, error};

/// Lifecycle state of a [`Transaction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Active,
    /// Phase one of a two-phase commit is done.
    Prepared,
    Committed,
    RolledBack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsolationLevel {
    Consistency,
    Snapshot,
    ReadCommitted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadCommittedMode {
    RecordVersion,
    NoRecordVersion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    ReadOnly,
    ReadWrite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitMode {
    Wait,
    NoWait,
}

/// Options used when starting a transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionOptions {
    /// Raw TPB bytes the named options are appended to.
    pub tpb: Vec<u8>,
    pub isolation_level: Option<IsolationLevel>,
    /// Only used with [`IsolationLevel::ReadCommitted`].
    pub read_committed_mode: Option<ReadCommittedMode>,
    pub access_mode: Option<AccessMode>,
    pub wait_mode: Option<WaitMode>,
    pub no_auto_undo: bool,
    pub ignore_limbo: bool,
    pub restart_requests: bool,
    pub auto_commit: bool,
}

impl TransactionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tpb(mut self, tpb: impl Into<Vec<u8>>) -> Self {
        self.tpb = tpb.into();
        self
    }

    pub fn with_isolation_level(mut self, level: IsolationLevel) -> Self {
        self.isolation_level = Some(level);
        self
    }

    pub fn with_read_committed_mode(mut self, mode: ReadCommittedMode) -> Self {
        self.read_committed_mode = Some(mode);
        self
    }

    pub fn with_access_mode(mut self, mode: AccessMode) -> Self {
        self.access_mode = Some(mode);
        self
    }

    pub fn with_wait_mode(mut self, mode: WaitMode) -> Self {
        self.wait_mode = Some(mode);
        self
    }

    pub fn with_no_auto_undo(mut self, value: bool) -> Self {
        self.no_auto_undo = value;
        self
    }

    pub fn with_ignore_limbo(mut self, value: bool) -> Self {
        self.ignore_limbo = value;
        self
    }

    pub fn with_restart_requests(mut self, value: bool) -> Self {
        self.restart_requests = value;
        self
    }

    pub fn with_auto_commit(mut self, value: bool) -> Self {
        self.auto_commit = value;
        self
    }

    /// Render the transaction parameter block.
    pub fn to_tpb(&self) -> Vec<u8> {
        let mut block = if self.tpb.is_empty() {
            ParameterBlock::new(ISC_TPB_VERSION3)
        } else {
            ParameterBlock::from_raw(&self.tpb)
        };

        match self.access_mode {
            Some(AccessMode::ReadOnly) => block.insert_tag(ISC_TPB_READ),
            Some(AccessMode::ReadWrite) => block.insert_tag(ISC_TPB_WRITE),
            None => {}
        }

        match self.wait_mode {
            Some(WaitMode::NoWait) => block.insert_tag(ISC_TPB_NOWAIT),
            Some(WaitMode::Wait) => block.insert_tag(ISC_TPB_WAIT),
            None => {}
        }

        match self.isolation_level {
            Some(IsolationLevel::Consistency) => block.insert_tag(ISC_TPB_CONSISTENCY),
            Some(IsolationLevel::Snapshot) => block.insert_tag(ISC_TPB_CONCURRENCY),
            Some(IsolationLevel::ReadCommitted) => {
                block.insert_tag(ISC_TPB_READ_COMMITTED);
                match self.read_committed_mode {
                    Some(ReadCommittedMode::NoRecordVersion) => {
                        block.insert_tag(ISC_TPB_NO_REC_VERSION)
                    }
                    Some(ReadCommittedMode::RecordVersion) => block.insert_tag(ISC_TPB_REC_VERSION),
                    None => {}
                }
            }
            None => {}
        }

        let flags = [
            (self.no_auto_undo, ISC_TPB_NO_AUTO_UNDO),
            (self.ignore_limbo, ISC_TPB_IGNORE_LIMBO),
            (self.restart_requests, ISC_TPB_RESTART_REQUESTS),
            (self.auto_commit, ISC_TPB_AUTOCOMMIT),
        ];
        for (enabled, tag) in flags {
            if enabled {
                block.insert_tag(tag);
            }
        }

        block.into_vec()
    }
}

/// A transaction on one attachment.
///
/// Dropping an active or prepared transaction rolls it back and logs any
/// failure.
pub struct Transaction<'a> {
    attachment: &'a Attachment,
    handle: Option<Box<dyn TransactionHandle>>,
    state: TransactionState,
}

impl<'a> Transaction<'a> {
    /// Start a transaction with the given options.
    pub fn start(attachment: &'a Attachment, options: &TransactionOptions) -> Result<Self> {
        let tpb = options.to_tpb();
        let handle = attachment
            .handle()?
            .start_transaction(&tpb)
            .context("Transaction::start", attachment.uri())?;
        debug!(uri = attachment.uri(), tpb_len = tpb.len(), "transaction started");
        Ok(Self::from_handle(attachment, handle))
    }

    /// Start a transaction from a `SET TRANSACTION` command.
    pub fn start_with_command(attachment: &'a Attachment, command: &str) -> Result<Self> {
        let handle = attachment
            .handle()?
            .execute_transaction_command(command)
            .context("Transaction::start", command)?;
        debug!(uri = attachment.uri(), command, "transaction started");
        Ok(Self::from_handle(attachment, handle))
    }

    fn from_handle(attachment: &'a Attachment, handle: Box<dyn TransactionHandle>) -> Self {
        Self {
            attachment,
            handle: Some(handle),
            state: TransactionState::Active,
        }
    }

    pub fn attachment(&self) -> &'a Attachment {
        self.attachment
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Whether the transaction still holds an engine handle.
    pub fn is_valid(&self) -> bool {
        self.handle.is_some()
    }

    pub(crate) fn handle(&self) -> Result<&dyn TransactionHandle> {
        self.handle
            .as_deref()
            .ok_or_else(|| Error::usage("Transaction is not valid"))
    }

    fn handle_in(&mut self, allowed: &[TransactionState]) -> Result<&mut Box<dyn TransactionHandle>> {
        let state = self.state;
        match self.handle.as_mut() {
            Some(handle) if allowed.contains(&state) => Ok(handle),
            Some(_) => Err(Error::usage(format!(
                "Transaction is {:?}, operation not allowed",
                state
            ))),
            None => Err(Error::usage("Transaction is not valid")),
        }
    }

    pub fn commit(&mut self) -> Result<()> {
        let attachment = self.attachment;
        let uri = attachment.uri();
        self.handle_in(&[TransactionState::Active, TransactionState::Prepared])?
            .commit()
            .context("Transaction::commit", uri)?;
        self.handle = None;
        self.state = TransactionState::Committed;
        debug!(uri, "transaction committed");
        Ok(())
    }

    /// Commit and keep the transaction context open.
    pub fn commit_retaining(&mut self) -> Result<()> {
        let attachment = self.attachment;
        let uri = attachment.uri();
        self.handle_in(&[TransactionState::Active])?
            .commit_retaining()
            .context("Transaction::commitRetaining", uri)
    }

    pub fn rollback(&mut self) -> Result<()> {
        let attachment = self.attachment;
        let uri = attachment.uri();
        self.handle_in(&[TransactionState::Active, TransactionState::Prepared])?
            .rollback()
            .context("Transaction::rollback", uri)?;
        self.handle = None;
        self.state = TransactionState::RolledBack;
        debug!(uri, "transaction rolled back");
        Ok(())
    }

    /// Roll back and keep the transaction context open.
    pub fn rollback_retaining(&mut self) -> Result<()> {
        let attachment = self.attachment;
        let uri = attachment.uri();
        self.handle_in(&[TransactionState::Active])?
            .rollback_retaining()
            .context("Transaction::rollbackRetaining", uri)
    }

    /// Phase one of a two-phase commit, without a message.
    pub fn prepare(&mut self) -> Result<()> {
        self.prepare_with_message(&[])
    }

    /// Phase one of a two-phase commit, recording `message` for recovery.
    pub fn prepare_with_message(&mut self, message: &[u8]) -> Result<()> {
        let attachment = self.attachment;
        let uri = attachment.uri();
        self.handle_in(&[TransactionState::Active])?
            .prepare(message)
            .context("Transaction::prepare", uri)?;
        self.state = TransactionState::Prepared;
        Ok(())
    }
}

impl fmt::Debug for Transaction<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("uri", &self.attachment.uri())
            .field("state", &self.state)
            .finish()
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            if let Err(e) = handle.rollback() {
                error!(uri = self.attachment.uri(), error = %e, "failed to roll back transaction on drop");
            }
        }
    }
}
