//! Message-level machinery: engine constants, message buffers and layout,
//! parameter blocks, scalar codecs and the value types they convert.

pub mod buffer;
pub mod codec;
pub mod constants;
pub mod layout;
pub mod types;
pub mod xpb;

pub use buffer::MessageBuffer;
pub use layout::{build_layout, MessageLayout};
pub use types::{AdjustedType, Descriptor, Descriptors, SqlType, Value, ValueKind};
pub use xpb::ParameterBlock;
