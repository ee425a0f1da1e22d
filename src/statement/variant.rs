//! Variant binding: one column read into whichever alternative fits best.
//!
//! Resolution for a non-NULL column first offers the column's natural kinds
//! (engine-native passthrough first, then widening scaled integers for
//! scaled columns, then the plain kind), and only then walks the declared
//! alternatives in order through the ordinary conversions. Opaque
//! alternatives are never used as conversion targets.

use super::Statement;
use crate::error::{Error, Result};
use crate::protocol::types::{AdjustedType, Descriptor, Value, ValueKind};

/// A closed set of alternatives a column can be read into.
///
/// Implemented with [`sql_variant!`](crate::sql_variant).
pub trait Variant: Sized {
    /// Kinds of the declared alternatives, in declaration order.
    const ALTERNATIVES: &'static [ValueKind];

    /// The alternative standing for NULL, if one is declared.
    fn null() -> Option<Self>;

    /// Wrap `value` in the first alternative of the same kind.
    fn from_value(value: Value) -> Option<Self>;

    fn to_value(&self) -> Value;
}

fn natural_kinds(descriptor: &Descriptor) -> Vec<ValueKind> {
    use ValueKind::*;

    let scaled = descriptor.scale != 0;
    let widening: &[ValueKind] = match descriptor.adjusted_type {
        AdjustedType::Int16 => &[ScaledInt16, ScaledInt32, ScaledInt64, ScaledInt128],
        AdjustedType::Int32 => &[ScaledInt32, ScaledInt64, ScaledInt128],
        AdjustedType::Int64 => &[ScaledInt64, ScaledInt128],
        _ => &[],
    };

    let mut kinds = Vec::new();
    match descriptor.adjusted_type {
        AdjustedType::Boolean => kinds.push(Boolean),
        AdjustedType::Int16 | AdjustedType::Int32 | AdjustedType::Int64 => {
            if scaled {
                kinds.extend_from_slice(widening);
            }
            kinds.push(match descriptor.adjusted_type {
                AdjustedType::Int16 => Int16,
                AdjustedType::Int32 => Int32,
                _ => Int64,
            });
        }
        AdjustedType::Int128 => {
            kinds.push(ScaledOpaqueInt128);
            if scaled {
                kinds.push(ScaledInt128);
            } else {
                kinds.push(OpaqueInt128);
                kinds.push(Int128);
            }
        }
        AdjustedType::Float => kinds.push(Float),
        AdjustedType::Double => kinds.push(Double),
        AdjustedType::DecFloat16 => kinds.extend([OpaqueDecFloat16, DecFloat16]),
        AdjustedType::DecFloat34 => kinds.extend([OpaqueDecFloat34, DecFloat34]),
        AdjustedType::Date => kinds.extend([OpaqueDate, Date]),
        AdjustedType::Time => kinds.extend([OpaqueTime, Time]),
        AdjustedType::Timestamp => kinds.extend([OpaqueTimestamp, Timestamp]),
        AdjustedType::TimeTz => kinds.extend([OpaqueTimeTz, TimeTz]),
        AdjustedType::TimestampTz => kinds.extend([OpaqueTimestampTz, TimestampTz]),
        AdjustedType::String => kinds.push(String),
        AdjustedType::Blob => kinds.push(BlobId),
        AdjustedType::Null => {}
    }
    kinds
}

fn no_alternative(index: usize) -> Error {
    Error::usage(format!(
        "Cannot convert SQL type to any variant alternative at index {}",
        index
    ))
}

pub(crate) fn read<V: Variant>(statement: &Statement<'_>, index: usize) -> Result<V> {
    if statement.is_null(index)? {
        return V::null().ok_or_else(|| {
            Error::usage(format!(
                "NULL value encountered but variant does not contain a null alternative at index {}",
                index
            ))
        });
    }

    let descriptor = statement.output_descriptor(index)?;
    for kind in natural_kinds(descriptor) {
        if V::ALTERNATIVES.contains(&kind) {
            let value = statement.get_value(index, kind)?;
            return V::from_value(value).ok_or_else(|| no_alternative(index));
        }
    }

    for &kind in V::ALTERNATIVES {
        if kind.is_opaque() || kind == ValueKind::Null {
            continue;
        }
        // A failed conversion moves on to the next alternative.
        if let Ok(value) = statement.get_value(index, kind) {
            if let Some(variant) = V::from_value(value) {
                return Ok(variant);
            }
        }
    }

    Err(no_alternative(index))
}

/// Declare an enum usable as a variant column type.
///
/// Every alternative but the first must wrap one scalar. When the first
/// alternative is a unit variant it stands for NULL: reads of NULL produce it
/// and binding it sets the parameter to NULL.
///
/// ```
/// use fbclient_rs::{sql_variant, ScaledInt32, ScaledInt64};
///
/// sql_variant! {
///     #[derive(Debug, PartialEq)]
///     pub enum Amount {
///         Missing,
///         Exact(ScaledInt32),
///         Wide(ScaledInt64),
///         Text(String),
///     }
/// }
/// ```
#[macro_export]
macro_rules! sql_variant {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $null:ident,
            $($alt:ident($ty:ty)),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis enum $name {
            $null,
            $($alt($ty)),+
        }

        $crate::sql_variant!(@impl $name [$null] $($alt($ty)),+);
    };
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($alt:ident($ty:ty)),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis enum $name {
            $($alt($ty)),+
        }

        $crate::sql_variant!(@impl $name [] $($alt($ty)),+);
    };
    (@impl $name:ident [$($null:ident)?] $($alt:ident($ty:ty)),+) => {
        impl $crate::Variant for $name {
            const ALTERNATIVES: &'static [$crate::ValueKind] =
                &[$(<$ty as $crate::Decode>::KIND),+];

            fn null() -> ::std::option::Option<Self> {
                ::std::option::Option::<Self>::None $(.or(Some($name::$null)))?
            }

            fn from_value(value: $crate::Value) -> ::std::option::Option<Self> {
                let kind = value.kind();
                $(
                    if kind == <$ty as $crate::Decode>::KIND {
                        return <$ty as $crate::Decode>::decode(value).map($name::$alt);
                    }
                )+
                None
            }

            fn to_value(&self) -> $crate::Value {
                match self {
                    $($name::$null => $crate::Value::Null,)?
                    $($name::$alt(value) => $crate::Encode::to_value(value),)+
                }
            }
        }

        impl $crate::FromField for $name {
            fn from_field(statement: &$crate::Statement<'_>, index: usize) -> $crate::Result<Self> {
                statement.get_variant(index)
            }
        }

        impl $crate::Encode for $name {
            fn to_value(&self) -> $crate::Value {
                $crate::Variant::to_value(self)
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attachment::{Attachment, AttachmentOptions};
    use crate::client::Client;
    use crate::protocol::types::{OpaqueInt128, ScaledInt32, ScaledInt64};
    use crate::statement::StatementOptions;
    use crate::transaction::{Transaction, TransactionOptions};

    crate::sql_variant! {
        #[derive(Debug, PartialEq)]
        enum Amount {
            Missing,
            Wide(ScaledInt64),
            Exact(ScaledInt32),
            Text(String),
        }
    }

    crate::sql_variant! {
        #[derive(Debug, PartialEq)]
        enum Strict {
            Flag(bool),
            Number(i64),
        }
    }

    crate::sql_variant! {
        #[derive(Debug, PartialEq)]
        enum Huge {
            Native(OpaqueInt128),
            Plain(i128),
        }
    }

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
    fn test_alternatives_and_null() {
        assert_eq!(
            Amount::ALTERNATIVES,
            &[ValueKind::ScaledInt64, ValueKind::ScaledInt32, ValueKind::String]
        );
        assert_eq!(Amount::null(), Some(Amount::Missing));
        assert_eq!(Strict::null(), None);
        assert_eq!(Amount::Missing.to_value(), Value::Null);
    }

    #[test]
    fn test_scale_matching_alternative_wins() {
        with_statement(
            "mem:variant-scale",
            "select cast(? as numeric(9,2)) from rdb$database",
            |statement, transaction| {
                statement.set_string(0, "12.34").unwrap();
                statement.execute(transaction).unwrap();
                assert_eq!(
                    statement.get_variant::<Amount>(0).unwrap(),
                    Amount::Exact(ScaledInt32::new(1234, -2))
                );
            },
        );
    }

    #[test]
    fn test_null_dispatch() {
        with_statement(
            "mem:variant-null",
            "select cast(? as integer) from rdb$database",
            |statement, transaction| {
                statement.set_null(0).unwrap();
                statement.execute(transaction).unwrap();
                assert_eq!(statement.get_variant::<Amount>(0).unwrap(), Amount::Missing);
                let err = statement.get_variant::<Strict>(0).unwrap_err();
                assert_eq!(
                    err.to_string(),
                    "NULL value encountered but variant does not contain a null alternative at index 0"
                );
            },
        );
    }

    #[test]
    fn test_fallback_in_declaration_order() {
        with_statement(
            "mem:variant-fallback",
            "select cast(? as double precision), cast(? as date) from rdb$database",
            |statement, transaction| {
                statement.set_double(0, 2.75).unwrap();
                statement.set_string(1, "2024-02-29").unwrap();
                statement.execute(transaction).unwrap();

                // BOOLEAN cannot be read from DOUBLE, so the next alternative is used.
                assert_eq!(statement.get_variant::<Strict>(0).unwrap(), Strict::Number(3));
                assert_eq!(
                    statement.get_variant::<Strict>(1).unwrap_err().to_string(),
                    "Cannot convert SQL type to any variant alternative at index 1"
                );
            },
        );
    }

    #[test]
    fn test_opaque_preferred_for_native_column() {
        with_statement(
            "mem:variant-opaque",
            "select cast(? as int128) from rdb$database",
            |statement, transaction| {
                statement.set_int128(0, -5).unwrap();
                statement.execute(transaction).unwrap();
                assert_eq!(
                    statement.get_variant::<Huge>(0).unwrap(),
                    Huge::Native(OpaqueInt128::from_i128(-5))
                );
            },
        );
    }

    #[test]
    fn test_set_variant() {
        with_statement(
            "mem:variant-set",
            "select cast(? as numeric(9,2)) from rdb$database",
            |statement, transaction| {
                statement.set_variant(0, &Amount::Text("1.5".to_string())).unwrap();
                statement.execute(transaction).unwrap();
                assert_eq!(statement.get_string(0).unwrap().as_deref(), Some("1.50"));

                statement.set_variant(0, &Amount::Missing).unwrap();
                statement.execute(transaction).unwrap();
                assert!(statement.is_null(0).unwrap());
            },
        );
    }
}
