use std::fmt;

use crate::{constant_pool::CpInfo, ConstantPool};

/// A named, length-prefixed attribute whose payload is kept opaque.
#[derive(Clone, PartialEq, Eq)]
pub struct Attribute {
    pub attribute_name_index: u16,
    pub info: Vec<u8>,
}
impl Attribute {
    /// Encoded size: name index (2) + length field (4) + payload.
    pub fn byte_length(&self) -> usize {
        6 + self.info.len()
    }
}
impl fmt::Debug for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attribute")
            .field("attribute_name_index", &self.attribute_name_index)
            .field("info", &format!("({} bytes)", self.info.len()))
            .finish()
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Attributes(pub Vec<Attribute>);
impl Attributes {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Attribute> {
        self.0.iter()
    }

    pub fn byte_length(&self) -> usize {
        self.0.iter().map(Attribute::byte_length).sum()
    }

    pub fn find_by_name(&self, name: &str, constant_pool: &ConstantPool) -> Option<&Attribute> {
        self.0.iter().find(|a| {
            matches!(
                constant_pool.entry_at(a.attribute_name_index),
                Some(CpInfo::Utf8(s)) if s == name
            )
        })
    }
}
impl<'a> IntoIterator for &'a Attributes {
    type Item = &'a Attribute;
    type IntoIter = std::slice::Iter<'a, Attribute>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
