//! Descriptor building from engine message metadata.

use super::buffer::MessageBuffer;
use super::types::{Descriptor, Descriptors, SqlType};
use crate::engine::MessageMetadata;
use crate::error::Result;
use std::sync::Arc;

/// One direction of a prepared statement: the metadata the engine will be
/// handed, the descriptors built from it and a message buffer sized for it.
#[derive(Debug)]
pub struct MessageLayout {
    pub metadata: Arc<dyn MessageMetadata>,
    pub descriptors: Descriptors,
    pub buffer: MessageBuffer,
}

/// Build the descriptors of one message.
///
/// Fixed-length text is rewritten to VARYING and the extended zoned types to
/// their plain forms. When any field is rewritten the builder re-lays out the
/// whole message and every offset is read again from the new metadata.
pub fn build_layout(metadata: Arc<dyn MessageMetadata>) -> Result<MessageLayout> {
    let count = metadata.count();
    let mut descriptors = Vec::with_capacity(count);
    let mut builder = None;

    for index in 0..count {
        let original_type = SqlType::from_raw(metadata.field_type(index)?)?;

        if let Some(rewritten) = original_type.normalized() {
            if builder.is_none() {
                builder = Some(metadata.builder()?);
            }
            if let Some(builder) = builder.as_mut() {
                builder.set_type(index, rewritten.code())?;
            }
        }

        descriptors.push(Descriptor {
            original_type,
            adjusted_type: original_type.adjusted(),
            scale: metadata.scale(index)?,
            length: metadata.length(index)?,
            offset: 0,
            null_offset: 0,
            is_nullable: metadata.is_nullable(index)?,
            field: metadata.field(index)?,
            alias: metadata.alias(index)?,
            relation: metadata.relation(index)?,
        });
    }

    let metadata = match builder {
        Some(mut builder) => builder.metadata()?,
        None => metadata,
    };

    for (index, descriptor) in descriptors.iter_mut().enumerate() {
        descriptor.offset = metadata.offset(index)?;
        descriptor.null_offset = metadata.null_offset(index)?;
    }

    let mut buffer = MessageBuffer::new(metadata.message_length()? as usize);
    for descriptor in &descriptors {
        buffer.set_null(descriptor.null_offset as usize, true)?;
    }

    Ok(MessageLayout {
        metadata,
        descriptors: Descriptors::new(descriptors),
        buffer,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::memory::{FieldSpec, MemoryMetadata};
    use crate::protocol::types::AdjustedType;

    #[test]
    fn test_plain_layout_keeps_offsets() {
        let metadata = MemoryMetadata::new(vec![
            FieldSpec::new(SqlType::Short),
            FieldSpec::new(SqlType::Int64).with_scale(-2),
        ]);
        let layout = build_layout(Arc::new(metadata)).unwrap();
        let d = &layout.descriptors;
        assert_eq!(d.len(), 2);
        assert_eq!((d.descriptors[0].offset, d.descriptors[0].null_offset), (0, 2));
        assert_eq!((d.descriptors[1].offset, d.descriptors[1].null_offset), (8, 16));
        assert_eq!(d.descriptors[1].scale, -2);
        assert_eq!(layout.buffer.len(), 18);
    }

    #[test]
    fn test_text_is_rewritten_and_relaid_out() {
        let metadata = MemoryMetadata::new(vec![
            FieldSpec::new(SqlType::Text).with_length(3),
            FieldSpec::new(SqlType::Long),
        ]);
        let layout = build_layout(Arc::new(metadata)).unwrap();
        let first = &layout.descriptors.descriptors[0];
        assert_eq!(first.original_type, SqlType::Text);
        assert_eq!(first.adjusted_type, AdjustedType::String);
        assert_eq!(layout.metadata.field_type(0).unwrap(), SqlType::Varying.code());
        // VARYING(3): 2 + 3 bytes, null at 6, LONG aligned to 8.
        assert_eq!(first.null_offset, 6);
        assert_eq!(layout.descriptors.descriptors[1].offset, 8);
    }

    #[test]
    fn test_null_flags_start_null() {
        let metadata = MemoryMetadata::new(vec![
            FieldSpec::new(SqlType::Boolean),
            FieldSpec::new(SqlType::TimeTzEx),
        ]);
        let layout = build_layout(Arc::new(metadata)).unwrap();
        assert_eq!(layout.descriptors.descriptors[1].adjusted_type, AdjustedType::TimeTz);
        for d in &layout.descriptors {
            assert!(layout.buffer.is_null(d.null_offset as usize).unwrap());
        }
    }

    #[test]
    fn test_empty_message() {
        let layout = build_layout(Arc::new(MemoryMetadata::new(Vec::new()))).unwrap();
        assert!(layout.descriptors.is_empty());
        assert!(layout.buffer.is_empty());
    }
}
