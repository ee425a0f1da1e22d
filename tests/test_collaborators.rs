//! Integration tests for attachments and transactions around statements.

use fbclient_rs::engine::memory::MemoryEngine;
use fbclient_rs::protocol::constants::{ISC_BAD_DPB_FORM, ISC_BAD_TPB_FORM, ISC_IO_ERROR};
use fbclient_rs::{
    AccessMode, Attachment, AttachmentOptions, Client, Error, IsolationLevel, ReadCommittedMode,
    Statement, StatementOptions, Transaction, TransactionOptions, TransactionState, WaitMode,
};

fn create(client: &Client, uri: &str) -> Attachment {
    let options = AttachmentOptions::new().with_create_database(true);
    Attachment::connect(client, uri, &options).unwrap()
}

#[test]
fn test_attach_requires_existing_database() {
    let client = Client::memory();
    let err = Attachment::connect(&client, "mem:missing", &AttachmentOptions::new()).unwrap_err();
    assert!(matches!(
        err,
        Error::Context {
            operation: "Attachment::attach",
            ..
        }
    ));
    assert_eq!(err.codes(), vec![ISC_IO_ERROR]);

    let mut first = create(&client, "mem:existing");
    let second = Attachment::connect(&client, "mem:existing", &AttachmentOptions::new()).unwrap();
    assert!(second.is_valid());
    assert_eq!(second.uri(), "mem:existing");

    let options = AttachmentOptions::new().with_create_database(true);
    assert!(Attachment::connect(&client, "mem:existing", &options).is_err());
    first.disconnect().unwrap();
}

#[test]
fn test_disconnect_and_drop_database() {
    let engine = MemoryEngine::new();
    let client = Client::new(engine.clone());

    let mut attachment = create(&client, "mem:lifecycle");
    attachment.disconnect().unwrap();
    assert!(!attachment.is_valid());
    assert!(matches!(attachment.disconnect(), Err(Error::Usage { .. })));
    assert!(engine.database_exists("mem:lifecycle"));

    let mut attachment =
        Attachment::connect(&client, "mem:lifecycle", &AttachmentOptions::new()).unwrap();
    attachment.drop_database().unwrap();
    assert!(!attachment.is_valid());
    assert!(!engine.database_exists("mem:lifecycle"));
    assert!(matches!(attachment.drop_database(), Err(Error::Usage { .. })));
}

#[test]
fn test_invalid_attachment_rejects_work() {
    let client = Client::memory();
    let mut attachment = create(&client, "mem:closed");
    attachment.disconnect().unwrap();

    let err = Transaction::start(&attachment, &TransactionOptions::new()).unwrap_err();
    assert_eq!(err.to_string(), "Attachment is not valid");
}

#[test]
fn test_parameter_block_versions_are_checked() {
    let client = Client::memory();
    let options = AttachmentOptions::new()
        .with_create_database(true)
        .with_dpb(vec![2]);
    let err = Attachment::connect(&client, "mem:bad-dpb", &options).unwrap_err();
    assert_eq!(err.codes(), vec![ISC_BAD_DPB_FORM]);

    let attachment = create(&client, "mem:bad-tpb");
    let err = Transaction::start(&attachment, &TransactionOptions::new().with_tpb(vec![1])).unwrap_err();
    assert_eq!(err.codes(), vec![ISC_BAD_TPB_FORM]);
}

#[test]
fn test_transaction_options_reach_the_engine() {
    let client = Client::memory();
    let attachment = create(&client, "mem:tpb");
    let options = TransactionOptions::new()
        .with_isolation_level(IsolationLevel::ReadCommitted)
        .with_read_committed_mode(ReadCommittedMode::RecordVersion)
        .with_access_mode(AccessMode::ReadOnly)
        .with_wait_mode(WaitMode::NoWait);
    let mut transaction = Transaction::start(&attachment, &options).unwrap();
    assert_eq!(transaction.state(), TransactionState::Active);
    transaction.rollback().unwrap();
    assert_eq!(transaction.state(), TransactionState::RolledBack);
    assert!(!transaction.is_valid());
}

#[test]
fn test_two_phase_commit() {
    let client = Client::memory();
    let attachment = create(&client, "mem:2pc");
    let mut transaction = Transaction::start(&attachment, &TransactionOptions::new()).unwrap();
    transaction.prepare().unwrap();
    assert_eq!(transaction.state(), TransactionState::Prepared);
    assert!(matches!(transaction.rollback_retaining(), Err(Error::Usage { .. })));
    transaction.commit().unwrap();
    assert_eq!(transaction.state(), TransactionState::Committed);
    assert!(matches!(transaction.commit(), Err(Error::Usage { .. })));
}

#[test]
fn test_retaining_keeps_statements_usable() {
    let client = Client::memory();
    let attachment = create(&client, "mem:retaining");
    let mut transaction = Transaction::start(&attachment, &TransactionOptions::new()).unwrap();
    let mut statement = Statement::prepare(
        &attachment,
        &transaction,
        "select cast(? as integer) from rdb$database",
        &StatementOptions::new(),
    )
    .unwrap();

    statement.set_int32(0, 1).unwrap();
    assert!(statement.execute(&transaction).unwrap());
    transaction.commit_retaining().unwrap();
    transaction.rollback_retaining().unwrap();
    assert_eq!(transaction.state(), TransactionState::Active);

    statement.set_int32(0, 2).unwrap();
    assert!(statement.execute(&transaction).unwrap());
    assert_eq!(statement.get_int32(0).unwrap(), Some(2));

    transaction.commit().unwrap();
    assert!(matches!(statement.execute(&transaction), Err(Error::Usage { .. })));
}

#[test]
fn test_transaction_started_by_command() {
    let client = Client::memory();
    let attachment = create(&client, "mem:command");
    let mut transaction =
        Transaction::start_with_command(&attachment, "set transaction snapshot").unwrap();
    let mut statement = Statement::prepare(
        &attachment,
        &transaction,
        "select cast('ok' as varchar(2)) from rdb$database",
        &StatementOptions::new(),
    )
    .unwrap();
    assert!(statement.execute(&transaction).unwrap());
    assert_eq!(statement.get_string(0).unwrap().as_deref(), Some("ok"));
    statement.free().unwrap();
    transaction.commit().unwrap();
}
