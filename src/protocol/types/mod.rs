//! Value and metadata types for message fields.

mod blob;
mod decfloat;
mod descriptor;
mod opaque;
mod scaled;
mod sql_type;
mod temporal;
mod value;

pub use blob::BlobId;
pub use decfloat::{DecFloat, DecFloat16, DecFloat34};
pub use descriptor::{Descriptor, Descriptors};
pub use opaque::{
    OpaqueDate, OpaqueDecFloat16, OpaqueDecFloat34, OpaqueInt128, OpaqueTime, OpaqueTimeTz,
    OpaqueTimestamp, OpaqueTimestampTz,
};
pub use scaled::{
    Scaled, ScaledInt128, ScaledInt16, ScaledInt32, ScaledInt64, ScaledOpaqueInt128,
};
pub use sql_type::{AdjustedType, SqlType};
pub use temporal::{TimeTz, TimestampTz};
pub use value::{Value, ValueKind};
