//! Message metadata with the engine's layout rules.

use crate::engine::{MessageMetadata, MetadataBuilder};
use crate::error::{Error, Result};
use crate::protocol::types::SqlType;
use std::sync::Arc;

/// Declared shape of one message field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub sql_type: SqlType,
    pub scale: i32,
    /// Payload bytes; for text types the declared character length.
    pub length: u32,
    pub nullable: bool,
    pub field: String,
    pub alias: String,
    pub relation: String,
}

impl FieldSpec {
    pub fn new(sql_type: SqlType) -> Self {
        Self {
            sql_type,
            scale: 0,
            length: match sql_type {
                SqlType::Text | SqlType::Varying => 0,
                other => other.wire_size(0),
            },
            nullable: true,
            field: String::new(),
            alias: String::new(),
            relation: String::new(),
        }
    }

    pub fn with_scale(mut self, scale: i32) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_length(mut self, length: u32) -> Self {
        self.length = length;
        self
    }

    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = field.into();
        self
    }

    /// Set the alias, and the field name too when it is still empty.
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = alias.into();
        if self.field.is_empty() {
            self.field = self.alias.clone();
        }
        self
    }

    pub fn with_relation(mut self, relation: impl Into<String>) -> Self {
        self.relation = relation.into();
        self
    }
}

#[derive(Debug, Clone)]
struct PlacedField {
    spec: FieldSpec,
    offset: u32,
    null_offset: u32,
}

/// Metadata of one message laid out like the engine does it.
#[derive(Debug, Clone)]
pub struct MemoryMetadata {
    fields: Vec<PlacedField>,
    length: u32,
}

fn align(offset: u32, alignment: u32) -> u32 {
    (offset + alignment - 1) / alignment * alignment
}

impl MemoryMetadata {
    /// Lay out the fields: each value aligned to its type, then a 2-byte
    /// null indicator aligned to 2.
    pub fn new(specs: Vec<FieldSpec>) -> Self {
        let mut offset = 0;
        let mut fields = Vec::with_capacity(specs.len());
        for spec in specs {
            offset = align(offset, spec.sql_type.alignment());
            let value_offset = offset;
            offset += spec.sql_type.wire_size(spec.length);
            offset = align(offset, 2);
            let null_offset = offset;
            offset += 2;
            fields.push(PlacedField {
                spec,
                offset: value_offset,
                null_offset,
            });
        }
        Self {
            fields,
            length: offset,
        }
    }

    pub fn specs(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().map(|f| &f.spec)
    }

    fn placed(&self, index: usize) -> Result<&PlacedField> {
        self.fields.get(index).ok_or(Error::IndexOutOfRange {
            index,
            count: self.fields.len(),
        })
    }
}

impl MessageMetadata for MemoryMetadata {
    fn count(&self) -> usize {
        self.fields.len()
    }

    fn field_type(&self, index: usize) -> Result<u32> {
        Ok(self.placed(index)?.spec.sql_type.code())
    }

    fn scale(&self, index: usize) -> Result<i32> {
        Ok(self.placed(index)?.spec.scale)
    }

    fn length(&self, index: usize) -> Result<u32> {
        Ok(self.placed(index)?.spec.length)
    }

    fn is_nullable(&self, index: usize) -> Result<bool> {
        Ok(self.placed(index)?.spec.nullable)
    }

    fn field(&self, index: usize) -> Result<String> {
        Ok(self.placed(index)?.spec.field.clone())
    }

    fn alias(&self, index: usize) -> Result<String> {
        Ok(self.placed(index)?.spec.alias.clone())
    }

    fn relation(&self, index: usize) -> Result<String> {
        Ok(self.placed(index)?.spec.relation.clone())
    }

    fn offset(&self, index: usize) -> Result<u32> {
        Ok(self.placed(index)?.offset)
    }

    fn null_offset(&self, index: usize) -> Result<u32> {
        Ok(self.placed(index)?.null_offset)
    }

    fn message_length(&self) -> Result<u32> {
        Ok(self.length)
    }

    fn builder(&self) -> Result<Box<dyn MetadataBuilder>> {
        Ok(Box::new(MemoryMetadataBuilder {
            specs: self.specs().cloned().collect(),
        }))
    }
}

/// Builder over a copy of the field specs.
#[derive(Debug)]
pub struct MemoryMetadataBuilder {
    specs: Vec<FieldSpec>,
}

impl MetadataBuilder for MemoryMetadataBuilder {
    fn set_type(&mut self, index: usize, sql_type: u32) -> Result<()> {
        let count = self.specs.len();
        let spec = self
            .specs
            .get_mut(index)
            .ok_or(Error::IndexOutOfRange { index, count })?;
        spec.sql_type = SqlType::from_raw(sql_type)?;
        Ok(())
    }

    fn metadata(&mut self) -> Result<Arc<dyn MessageMetadata>> {
        Ok(Arc::new(MemoryMetadata::new(self.specs.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_alignment() {
        let metadata = MemoryMetadata::new(vec![
            FieldSpec::new(SqlType::Boolean),
            FieldSpec::new(SqlType::Int128),
            FieldSpec::new(SqlType::Varying).with_length(5),
            FieldSpec::new(SqlType::TimestampTz),
        ]);
        // BOOLEAN at 0, null at 2; INT128 at 8, null at 24;
        // VARYING(5) at 26, null at 34; TIMESTAMP_TZ at 36, null at 48.
        assert_eq!(metadata.offset(0).unwrap(), 0);
        assert_eq!(metadata.null_offset(0).unwrap(), 2);
        assert_eq!(metadata.offset(1).unwrap(), 8);
        assert_eq!(metadata.null_offset(1).unwrap(), 24);
        assert_eq!(metadata.offset(2).unwrap(), 26);
        assert_eq!(metadata.null_offset(2).unwrap(), 34);
        assert_eq!(metadata.offset(3).unwrap(), 36);
        assert_eq!(metadata.null_offset(3).unwrap(), 48);
        assert_eq!(metadata.message_length().unwrap(), 50);
    }

    #[test]
    fn test_builder_rewrites_type() {
        let metadata = MemoryMetadata::new(vec![FieldSpec::new(SqlType::Text).with_length(4)]);
        let mut builder = metadata.builder().unwrap();
        builder.set_type(0, SqlType::Varying.code()).unwrap();
        assert!(builder.set_type(1, SqlType::Varying.code()).is_err());
        let rebuilt = builder.metadata().unwrap();
        assert_eq!(rebuilt.field_type(0).unwrap(), SqlType::Varying.code());
        assert_eq!(rebuilt.length(0).unwrap(), 4);
        assert_eq!(rebuilt.message_length().unwrap(), 8);
    }
}
