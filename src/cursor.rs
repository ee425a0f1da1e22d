//! Cursors for iterating over query results.
//!
//! The `Cursor` trait defines the common interface, while `RowCursor`
//! reads each fetched row of a [`Statement`] into a [`FromRow`] type.

use crate::error::Result;
use crate::protocol::types::Descriptors;
use crate::statement::{FromRow, Statement};
use std::marker::PhantomData;

/// Base trait for all cursor types.
///
/// A cursor holds a mutable borrow of its statement, so only one cursor can
/// be active on a statement at a time.
///
/// # Example
///
/// ```
/// use fbclient_rs::{Attachment, AttachmentOptions, Client, Cursor, Statement,
///     StatementOptions, Transaction, TransactionOptions};
///
/// // Generic function that works with any cursor type
/// fn count_rows<C: Cursor>(cursor: &mut C) -> u64 {
///     let mut count = 0;
///     while let Some(_) = cursor.next().unwrap() {
///         count += 1;
///     }
///     count
/// }
///
/// let client = Client::memory();
/// let options = AttachmentOptions::new().with_create_database(true);
/// let attachment = Attachment::connect(&client, "mem:cursor-doc", &options).unwrap();
/// let transaction = Transaction::start(&attachment, &TransactionOptions::new()).unwrap();
/// let mut statement = Statement::prepare(
///     &attachment,
///     &transaction,
///     "select cast(1 as integer) from rdb$database",
///     &StatementOptions::new(),
/// )
/// .unwrap();
///
/// let mut cursor = statement.query::<(i32,)>(&transaction).unwrap();
/// assert_eq!(count_rows(&mut cursor), 1);
/// ```
pub trait Cursor {
    /// The type of item this cursor yields.
    type Item;

    /// Output column descriptors of the underlying statement.
    fn descriptors(&self) -> &Descriptors;

    /// Number of rows returned so far.
    fn rowcount(&self) -> u64;

    fn is_closed(&self) -> bool;

    /// Close the cursor and release the engine result set.
    fn close(&mut self) -> Result<()>;

    /// Get the next item, fetching from the engine when needed.
    ///
    /// Returns `Ok(None)` when exhausted, and keeps doing so.
    fn next(&mut self) -> Result<Option<Self::Item>>;

    /// Fetch all remaining items into a vector. The cursor is closed afterwards.
    fn fetch_all(&mut self) -> Result<Vec<Self::Item>> {
        let mut items = Vec::new();
        while let Some(item) = self.next()? {
            items.push(item);
        }
        self.close()?;
        Ok(items)
    }
}

/// Row-by-row cursor over a forward fetch.
///
/// # Lifecycle
///
/// 1. Created by [`Statement::query`], which executes and fetches the first row
/// 2. Iterated via [`Cursor::next`], [`Cursor::fetch_all`] or as an `Iterator`
/// 3. Closed once exhausted or explicitly via [`Cursor::close`]
pub struct RowCursor<'s, 'a, R> {
    statement: &'s mut Statement<'a>,
    /// The first row was already fetched by execute and not yet returned.
    pending: bool,
    rows_fetched: u64,
    closed: bool,
    _row: PhantomData<fn() -> R>,
}

impl<'s, 'a, R: FromRow> RowCursor<'s, 'a, R> {
    pub(crate) fn new(statement: &'s mut Statement<'a>, has_row: bool) -> Self {
        Self {
            statement,
            pending: has_row,
            rows_fetched: 0,
            closed: !has_row,
            _row: PhantomData,
        }
    }

    /// The statement being iterated.
    pub fn statement(&self) -> &Statement<'a> {
        &*self.statement
    }
}

impl<R: FromRow> Cursor for RowCursor<'_, '_, R> {
    type Item = R;

    fn descriptors(&self) -> &Descriptors {
        self.statement.output_descriptors()
    }

    fn rowcount(&self) -> u64 {
        self.rows_fetched
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.closed = true;
            self.pending = false;
            self.statement.close_cursor()?;
        }
        Ok(())
    }

    fn next(&mut self) -> Result<Option<R>> {
        if self.closed {
            return Ok(None);
        }
        if !self.pending && !self.statement.fetch_next()? {
            self.close()?;
            return Ok(None);
        }
        self.pending = false;
        let row = R::from_row(self.statement)?;
        self.rows_fetched += 1;
        Ok(Some(row))
    }
}

impl<R: FromRow> Iterator for RowCursor<'_, '_, R> {
    type Item = Result<R>;

    fn next(&mut self) -> Option<Self::Item> {
        Cursor::next(self).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attachment::{Attachment, AttachmentOptions};
    use crate::client::Client;
    use crate::engine::memory::{Cell, FieldSpec, MemoryEngine, ScriptedQuery};
    use crate::protocol::types::SqlType;
    use crate::statement::StatementOptions;
    use crate::transaction::{Transaction, TransactionOptions};

    const SQL: &str = "select id, name from people";

    fn engine_with_people(rows: usize) -> MemoryEngine {
        let engine = MemoryEngine::new();
        let mut query = ScriptedQuery::new()
            .with_column(FieldSpec::new(SqlType::Long).with_alias("ID"))
            .with_column(FieldSpec::new(SqlType::Varying).with_length(10).with_alias("NAME"));
        for i in 0..rows {
            query = query.with_row(vec![Cell::Integer(i as i128), Cell::Text(format!("p{}", i))]);
        }
        engine.register_query(SQL, query);
        engine
    }

    fn with_cursor_statement(rows: usize, check: impl FnOnce(&mut Statement<'_>, &Transaction<'_>)) {
        let client = Client::new(engine_with_people(rows));
        let options = AttachmentOptions::new().with_create_database(true);
        let attachment = Attachment::connect(&client, "mem:cursor", &options).unwrap();
        let transaction = Transaction::start(&attachment, &TransactionOptions::new()).unwrap();
        let mut statement =
            Statement::prepare(&attachment, &transaction, SQL, &StatementOptions::new()).unwrap();
        check(&mut statement, &transaction);
    }

    #[test]
    fn test_iterates_every_row() {
        with_cursor_statement(3, |statement, transaction| {
            let cursor = statement.query::<(i32, String)>(transaction).unwrap();
            let rows: Vec<_> = cursor.collect::<Result<_>>().unwrap();
            assert_eq!(
                rows,
                vec![(0, "p0".to_string()), (1, "p1".to_string()), (2, "p2".to_string())]
            );
        });
    }

    #[test]
    fn test_exhausted_cursor_stays_exhausted() {
        with_cursor_statement(1, |statement, transaction| {
            let mut cursor = statement.query::<(i64, String)>(transaction).unwrap();
            assert!(Cursor::next(&mut cursor).unwrap().is_some());
            for _ in 0..3 {
                assert!(Cursor::next(&mut cursor).unwrap().is_none());
            }
            assert!(cursor.is_closed());
            assert_eq!(cursor.rowcount(), 1);
        });
    }

    #[test]
    fn test_empty_result() {
        with_cursor_statement(0, |statement, transaction| {
            let mut cursor = statement.query::<(i64, Option<String>)>(transaction).unwrap();
            assert!(cursor.is_closed());
            assert!(cursor.fetch_all().unwrap().is_empty());
        });
    }

    #[test]
    fn test_fetch_all_closes() {
        with_cursor_statement(4, |statement, transaction| {
            let mut cursor = statement.query::<(i64, String)>(transaction).unwrap();
            assert_eq!(cursor.descriptors().len(), 2);
            assert_eq!(cursor.fetch_all().unwrap().len(), 4);
            assert!(cursor.is_closed());
            assert!(!cursor.statement().has_cursor());
        });
    }
}
