//! Descriptor and Descriptors types for message fields.
//!
//! A descriptor is built once per parameter or column when a statement is
//! prepared, from the metadata the engine reports, and never changes
//! afterwards.

use super::sql_type::{AdjustedType, SqlType};

/// One input parameter or output column.
#[derive(Debug, Clone, PartialEq)]
pub struct Descriptor {
    /// Wire type as the engine reported it at prepare time.
    pub original_type: SqlType,
    /// Type accessors dispatch on.
    pub adjusted_type: AdjustedType,
    /// Decimal scale (0 for unscaled types).
    pub scale: i32,
    /// Declared byte length of the value payload.
    pub length: u32,
    /// Byte offset of the value in the message.
    pub offset: u32,
    /// Byte offset of the 2-byte null indicator.
    pub null_offset: u32,
    pub is_nullable: bool,
    pub field: String,
    pub alias: String,
    pub relation: String,
}

/// Descriptors of one message direction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Descriptors {
    pub descriptors: Vec<Descriptor>,
}

impl Descriptors {
    /// Create new descriptors from a list.
    pub fn new(descriptors: Vec<Descriptor>) -> Self {
        Self { descriptors }
    }

    /// Get the number of fields.
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Check if there are no fields.
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Get descriptor by index.
    pub fn get(&self, index: usize) -> Option<&Descriptor> {
        self.descriptors.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Descriptor> {
        self.descriptors.iter()
    }

    /// Get field aliases.
    pub fn aliases(&self) -> Vec<&str> {
        self.descriptors.iter().map(|d| d.alias.as_str()).collect()
    }

    /// Find field index by alias (case-insensitive).
    pub fn find_by_alias(&self, alias: &str) -> Option<usize> {
        let alias_upper = alias.to_uppercase();
        self.descriptors
            .iter()
            .position(|d| d.alias.to_uppercase() == alias_upper)
    }
}

impl<'a> IntoIterator for &'a Descriptors {
    type Item = &'a Descriptor;
    type IntoIter = std::slice::Iter<'a, Descriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.descriptors.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(alias: &str, ty: SqlType) -> Descriptor {
        Descriptor {
            original_type: ty,
            adjusted_type: ty.adjusted(),
            scale: 0,
            length: ty.wire_size(0),
            offset: 0,
            null_offset: 0,
            is_nullable: true,
            field: alias.to_string(),
            alias: alias.to_string(),
            relation: String::new(),
        }
    }

    #[test]
    fn test_find_by_alias() {
        let descriptors = Descriptors::new(vec![
            descriptor("ID", SqlType::Long),
            descriptor("NAME", SqlType::Varying),
        ]);
        assert_eq!(descriptors.len(), 2);
        assert_eq!(descriptors.find_by_alias("name"), Some(1));
        assert_eq!(descriptors.find_by_alias("missing"), None);
        assert_eq!(descriptors.aliases(), vec!["ID", "NAME"]);
    }
}
