//! Generic binding of scalars, tuples and named structs.
//!
//! Scalars implement [`Decode`] and [`Encode`]; both go through the
//! statement's single [`Value`] dispatch table. `Option<T>` absorbs NULL on
//! read and binds NULL on write. Tuples up to sixteen elements and structs
//! declared with [`sql_struct!`](crate::sql_struct) bind positionally, in
//! declaration order.

use super::Statement;
use crate::error::{Error, Result};
use crate::protocol::types::{
    BlobId, DecFloat16, DecFloat34, OpaqueDate, OpaqueDecFloat16, OpaqueDecFloat34, OpaqueInt128,
    OpaqueTime, OpaqueTimeTz, OpaqueTimestamp, OpaqueTimestampTz, ScaledInt128, ScaledInt16,
    ScaledInt32, ScaledInt64, ScaledOpaqueInt128, TimeTz, TimestampTz, Value, ValueKind,
};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

/// A scalar that can be read out of a [`Value`].
pub trait Decode: Sized {
    /// The kind the column is read as.
    const KIND: ValueKind;

    /// Take the payload out of a value of kind [`Self::KIND`].
    fn decode(value: Value) -> Option<Self>;
}

/// Something that can be bound to one parameter.
pub trait Encode {
    fn to_value(&self) -> Value;

    fn encode(&self, statement: &mut Statement<'_>, index: usize) -> Result<()> {
        statement.set_value(index, self.to_value())
    }
}

/// One output column read into a Rust value.
pub trait FromField: Sized {
    fn from_field(statement: &Statement<'_>, index: usize) -> Result<Self>;
}

/// A whole output row.
pub trait FromRow: Sized {
    /// Number of columns the row binds.
    const ARITY: usize;
    /// How an element is named in count mismatch errors.
    const ELEMENT: &'static str;

    fn from_row(statement: &Statement<'_>) -> Result<Self>;
}

/// A whole set of input parameters.
pub trait Params {
    const ARITY: usize;
    const ELEMENT: &'static str;

    fn bind(&self, statement: &mut Statement<'_>) -> Result<()>;
}

fn decode_field<T: Decode>(statement: &Statement<'_>, index: usize) -> Result<Option<T>> {
    match statement.get_value(index, T::KIND)? {
        Value::Null => Ok(None),
        value => {
            let kind = value.kind();
            T::decode(value)
                .map(Some)
                .ok_or_else(|| Error::conversion(kind.to_string(), T::KIND.to_string(), "unexpected value kind"))
        }
    }
}

macro_rules! scalar_impls {
    ($($ty:ty => $kind:ident),+ $(,)?) => {
        $(
            impl Decode for $ty {
                const KIND: ValueKind = ValueKind::$kind;

                fn decode(value: Value) -> Option<Self> {
                    match value {
                        Value::$kind(v) => Some(v),
                        _ => None,
                    }
                }
            }

            impl Encode for $ty {
                fn to_value(&self) -> Value {
                    Value::$kind(self.clone())
                }
            }

            impl FromField for $ty {
                fn from_field(statement: &Statement<'_>, index: usize) -> Result<Self> {
                    decode_field(statement, index)?.ok_or(Error::NullValue { index })
                }
            }

            impl FromField for Option<$ty> {
                fn from_field(statement: &Statement<'_>, index: usize) -> Result<Self> {
                    decode_field(statement, index)
                }
            }
        )+
    };
}

scalar_impls! {
    bool => Boolean,
    i16 => Int16,
    ScaledInt16 => ScaledInt16,
    i32 => Int32,
    ScaledInt32 => ScaledInt32,
    i64 => Int64,
    ScaledInt64 => ScaledInt64,
    i128 => Int128,
    ScaledInt128 => ScaledInt128,
    OpaqueInt128 => OpaqueInt128,
    ScaledOpaqueInt128 => ScaledOpaqueInt128,
    f32 => Float,
    f64 => Double,
    DecFloat16 => DecFloat16,
    OpaqueDecFloat16 => OpaqueDecFloat16,
    DecFloat34 => DecFloat34,
    OpaqueDecFloat34 => OpaqueDecFloat34,
    NaiveDate => Date,
    OpaqueDate => OpaqueDate,
    NaiveTime => Time,
    OpaqueTime => OpaqueTime,
    NaiveDateTime => Timestamp,
    OpaqueTimestamp => OpaqueTimestamp,
    TimeTz => TimeTz,
    OpaqueTimeTz => OpaqueTimeTz,
    TimestampTz => TimestampTz,
    OpaqueTimestampTz => OpaqueTimestampTz,
    String => String,
    BlobId => BlobId,
}

impl Encode for str {
    fn to_value(&self) -> Value {
        Value::String(self.to_string())
    }

    fn encode(&self, statement: &mut Statement<'_>, index: usize) -> Result<()> {
        statement.set_string(index, self)
    }
}

impl<T: Encode + ?Sized> Encode for &T {
    fn to_value(&self) -> Value {
        (**self).to_value()
    }

    fn encode(&self, statement: &mut Statement<'_>, index: usize) -> Result<()> {
        (**self).encode(statement, index)
    }
}

impl<T: Encode> Encode for Option<T> {
    fn to_value(&self) -> Value {
        match self {
            Some(value) => value.to_value(),
            None => Value::Null,
        }
    }

    fn encode(&self, statement: &mut Statement<'_>, index: usize) -> Result<()> {
        match self {
            Some(value) => value.encode(statement, index),
            None => statement.set_null(index),
        }
    }
}

impl Encode for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }
}

impl FromRow for () {
    const ARITY: usize = 0;
    const ELEMENT: &'static str = "Tuple element";

    fn from_row(_statement: &Statement<'_>) -> Result<Self> {
        Ok(())
    }
}

impl Params for () {
    const ARITY: usize = 0;
    const ELEMENT: &'static str = "Tuple element";

    fn bind(&self, _statement: &mut Statement<'_>) -> Result<()> {
        Ok(())
    }
}

impl<P: Params> Params for &P {
    const ARITY: usize = P::ARITY;
    const ELEMENT: &'static str = P::ELEMENT;

    fn bind(&self, statement: &mut Statement<'_>) -> Result<()> {
        (**self).bind(statement)
    }
}

macro_rules! tuple_impls {
    ($($len:literal => ($($idx:tt $T:ident),+))+) => {
        $(
            impl<$($T: FromField),+> FromRow for ($($T,)+) {
                const ARITY: usize = $len;
                const ELEMENT: &'static str = "Tuple element";

                fn from_row(statement: &Statement<'_>) -> Result<Self> {
                    Ok(($($T::from_field(statement, $idx)?,)+))
                }
            }

            impl<$($T: Encode),+> Params for ($($T,)+) {
                const ARITY: usize = $len;
                const ELEMENT: &'static str = "Tuple element";

                fn bind(&self, statement: &mut Statement<'_>) -> Result<()> {
                    $(self.$idx.encode(statement, $idx)?;)+
                    Ok(())
                }
            }
        )+
    };
}

tuple_impls! {
    1 => (0 T0)
    2 => (0 T0, 1 T1)
    3 => (0 T0, 1 T1, 2 T2)
    4 => (0 T0, 1 T1, 2 T2, 3 T3)
    5 => (0 T0, 1 T1, 2 T2, 3 T3, 4 T4)
    6 => (0 T0, 1 T1, 2 T2, 3 T3, 4 T4, 5 T5)
    7 => (0 T0, 1 T1, 2 T2, 3 T3, 4 T4, 5 T5, 6 T6)
    8 => (0 T0, 1 T1, 2 T2, 3 T3, 4 T4, 5 T5, 6 T6, 7 T7)
    9 => (0 T0, 1 T1, 2 T2, 3 T3, 4 T4, 5 T5, 6 T6, 7 T7, 8 T8)
    10 => (0 T0, 1 T1, 2 T2, 3 T3, 4 T4, 5 T5, 6 T6, 7 T7, 8 T8, 9 T9)
    11 => (0 T0, 1 T1, 2 T2, 3 T3, 4 T4, 5 T5, 6 T6, 7 T7, 8 T8, 9 T9, 10 T10)
    12 => (0 T0, 1 T1, 2 T2, 3 T3, 4 T4, 5 T5, 6 T6, 7 T7, 8 T8, 9 T9, 10 T10, 11 T11)
    13 => (0 T0, 1 T1, 2 T2, 3 T3, 4 T4, 5 T5, 6 T6, 7 T7, 8 T8, 9 T9, 10 T10, 11 T11, 12 T12)
    14 => (0 T0, 1 T1, 2 T2, 3 T3, 4 T4, 5 T5, 6 T6, 7 T7, 8 T8, 9 T9, 10 T10, 11 T11, 12 T12, 13 T13)
    15 => (0 T0, 1 T1, 2 T2, 3 T3, 4 T4, 5 T5, 6 T6, 7 T7, 8 T8, 9 T9, 10 T10, 11 T11, 12 T12, 13 T13, 14 T14)
    16 => (0 T0, 1 T1, 2 T2, 3 T3, 4 T4, 5 T5, 6 T6, 7 T7, 8 T8, 9 T9, 10 T10, 11 T11, 12 T12, 13 T13, 14 T14, 15 T15)
}

/// Declare a struct that binds positionally as a row and as parameters.
///
/// Fields map to columns in declaration order. A field of type `Option<T>`
/// absorbs NULL; any other field fails with `Error::NullValue` on NULL.
///
/// ```
/// use fbclient_rs::{sql_struct, Attachment, AttachmentOptions, Client, Statement,
///     StatementOptions, Transaction, TransactionOptions};
///
/// sql_struct! {
///     #[derive(Debug, PartialEq)]
///     pub struct Point {
///         pub x: i32,
///         pub label: Option<String>,
///     }
/// }
///
/// let client = Client::memory();
/// let options = AttachmentOptions::new().with_create_database(true);
/// let attachment = Attachment::connect(&client, "mem:sql-struct", &options).unwrap();
/// let transaction = Transaction::start(&attachment, &TransactionOptions::new()).unwrap();
/// let mut statement = Statement::prepare(
///     &attachment,
///     &transaction,
///     "select cast(? as integer) x, cast(? as varchar(10)) label from rdb$database",
///     &StatementOptions::new(),
/// )
/// .unwrap();
///
/// statement.set_params(Point { x: 7, label: None }).unwrap();
/// statement.execute(&transaction).unwrap();
/// assert_eq!(statement.row::<Point>().unwrap(), Point { x: 7, label: None });
/// ```
#[macro_export]
macro_rules! sql_struct {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $($field_vis:vis $field:ident : $ty:ty),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $($field_vis $field: $ty),+
        }

        impl $crate::FromRow for $name {
            const ARITY: usize = <[&str]>::len(&[$(stringify!($field)),+]);
            const ELEMENT: &'static str = "Struct field";

            fn from_row(statement: &$crate::Statement<'_>) -> $crate::Result<Self> {
                // declaration order gives each field its column index
                #[allow(non_camel_case_types)]
                enum Position {
                    $($field),+
                }
                Ok(Self {
                    $($field: <$ty as $crate::FromField>::from_field(
                        statement,
                        Position::$field as usize,
                    )?),+
                })
            }
        }

        impl $crate::Params for $name {
            const ARITY: usize = <[&str]>::len(&[$(stringify!($field)),+]);
            const ELEMENT: &'static str = "Struct field";

            fn bind(&self, statement: &mut $crate::Statement<'_>) -> $crate::Result<()> {
                #[allow(non_camel_case_types)]
                enum Position {
                    $($field),+
                }
                $($crate::Encode::encode(&self.$field, statement, Position::$field as usize)?;)+
                Ok(())
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attachment::{Attachment, AttachmentOptions};
    use crate::client::Client;
    use crate::statement::StatementOptions;
    use crate::transaction::{Transaction, TransactionOptions};

    crate::sql_struct! {
        #[derive(Debug, PartialEq)]
        struct Pair {
            id: i64,
            name: Option<String>,
        }
    }

    crate::sql_struct! {
        #[derive(Debug, PartialEq)]
        struct Triple {
            first: i32,
            second: i32,
            third: i32,
        }
    }

    const PAIR_SQL: &str =
        "select cast(? as bigint) id, cast(? as varchar(8)) name from rdb$database";

    fn with_statement(uri: &str, sql: &str, check: impl FnOnce(&mut Statement<'_>, &Transaction<'_>)) {
        let client = Client::memory();
        let options = AttachmentOptions::new().with_create_database(true);
        let attachment = Attachment::connect(&client, uri, &options).unwrap();
        let transaction = Transaction::start(&attachment, &TransactionOptions::new()).unwrap();
        let mut statement =
            Statement::prepare(&attachment, &transaction, sql, &StatementOptions::new()).unwrap();
        check(&mut statement, &transaction);
    }

    #[test]
    fn test_struct_arity() {
        assert_eq!(<Pair as FromRow>::ARITY, 2);
        assert_eq!(<Pair as Params>::ELEMENT, "Struct field");
        assert_eq!(<(i32, bool, String) as FromRow>::ARITY, 3);
        assert_eq!(<() as Params>::ARITY, 0);
    }

    #[test]
    fn test_struct_round_trip() {
        with_statement("mem:bind-struct", PAIR_SQL, |statement, transaction| {
            let pair = Pair {
                id: 42,
                name: Some("answer".to_string()),
            };
            statement.set_params(&pair).unwrap();
            assert!(statement.execute(transaction).unwrap());
            assert_eq!(statement.row::<Pair>().unwrap(), pair);
        });
    }

    #[test]
    fn test_struct_fields_bind_in_declaration_order() {
        assert_eq!(<Triple as FromRow>::ARITY, 3);
        let sql = "select cast(? as integer), cast(? as integer), cast(? as integer) \
                   from rdb$database";
        with_statement("mem:bind-order", sql, |statement, transaction| {
            let triple = Triple {
                first: 1,
                second: 20,
                third: 300,
            };
            statement.set_params(&triple).unwrap();
            statement.execute(transaction).unwrap();
            assert_eq!(statement.get_int32(0).unwrap(), Some(1));
            assert_eq!(statement.get_int32(1).unwrap(), Some(20));
            assert_eq!(statement.get_int32(2).unwrap(), Some(300));
            assert_eq!(statement.row::<Triple>().unwrap(), triple);
        });
    }

    #[test]
    fn test_tuple_null_handling() {
        with_statement("mem:bind-tuple", PAIR_SQL, |statement, transaction| {
            statement.set_params((5i64, None::<&str>)).unwrap();
            statement.execute(transaction).unwrap();

            let (id, name): (i64, Option<String>) = statement.row().unwrap();
            assert_eq!((id, name), (5, None));

            let err = statement.row::<(i64, String)>().unwrap_err();
            assert!(matches!(err, Error::NullValue { index: 1 }));
            assert_eq!(
                err.to_string(),
                "Null value encountered for non-optional field at index 1"
            );
        });
    }

    #[test]
    fn test_count_mismatch_both_directions() {
        with_statement("mem:bind-count", PAIR_SQL, |statement, transaction| {
            let err = statement.set_params((1i64,)).unwrap_err();
            assert_eq!(
                err.to_string(),
                "Tuple element count (1) does not match input parameter count (2)"
            );
            statement.set_params((1i64, "x")).unwrap();
            statement.execute(transaction).unwrap();
            let err = statement.row::<(i64, String, bool)>().unwrap_err();
            assert_eq!(
                err.to_string(),
                "Tuple element count (3) does not match output column count (2)"
            );
        });
    }

    #[test]
    fn test_scalar_get_and_set() {
        with_statement("mem:bind-scalar", PAIR_SQL, |statement, transaction| {
            statement.set(0, 9i64).unwrap();
            statement.set(1, "nine").unwrap();
            statement.execute(transaction).unwrap();
            assert_eq!(statement.get::<i64>(0).unwrap(), 9);
            assert_eq!(statement.get::<i32>(0).unwrap(), 9);
            assert_eq!(statement.get::<String>(0).unwrap(), "9");
            assert_eq!(statement.get::<Option<String>>(1).unwrap().as_deref(), Some("nine"));
        });
    }
}
