use std::{fmt, sync::Arc};

use crate::{
    attributes::Attributes, constant_pool::ClassInfo, matches_cp_info, parser::Parser,
    ClassAccessFlags, ConstantPool, FieldAccessFlags, LookupError, MajorVersion,
    MethodAccessFlags, Result,
};

/// A decoded class file. Only obtainable through a successful decode, and immutable
/// afterwards.
#[derive(Clone, PartialEq)]
pub struct ClassFile {
    pub(crate) bytes: Arc<[u8]>,
    pub(crate) minor_version: u16,
    pub(crate) major_version: MajorVersion,
    pub(crate) constant_pool: ConstantPool,
    pub(crate) access_flags: ClassAccessFlags,
    pub(crate) this_class: u16,
    pub(crate) super_class: u16,
    pub(crate) interfaces: InterfaceTable,
    pub(crate) fields: Vec<FieldInfo>,
    pub(crate) methods: Vec<MethodInfo>,
    /// Offset of the first byte after the method table.
    pub(crate) remainder_offset: usize,
}
impl ClassFile {
    pub fn parse(bytes: &[u8]) -> Result<ClassFile> {
        Parser::new(bytes).parse()
    }

    pub fn minor_version(&self) -> u16 {
        self.minor_version
    }

    pub fn major_version(&self) -> MajorVersion {
        self.major_version
    }

    pub fn constant_pool(&self) -> &ConstantPool {
        &self.constant_pool
    }

    pub fn access_flags(&self) -> ClassAccessFlags {
        self.access_flags
    }

    pub fn this_class(&self) -> u16 {
        self.this_class
    }

    pub fn super_class(&self) -> u16 {
        self.super_class
    }

    pub fn interfaces(&self) -> &InterfaceTable {
        &self.interfaces
    }

    pub fn fields(&self) -> &[FieldInfo] {
        &self.fields
    }

    pub fn methods(&self) -> &[MethodInfo] {
        &self.methods
    }

    /// The complete input the class file was decoded from, for handing to a class loader.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Everything after the method table, left undecoded.
    pub fn remainder(&self) -> &[u8] {
        &self.bytes[self.remainder_offset..]
    }

    /// Decodes the remainder as the class-level attribute table.
    pub fn trailing_attributes(&self) -> Result<Attributes> {
        let (attributes, _) = Parser::new(&self.bytes).parse_attributes(self.remainder_offset)?;
        Ok(attributes)
    }

    pub fn class_name(&self) -> Result<&str, LookupError> {
        // this_class must point at a Class entry for the class or interface defined here.
        let ClassInfo { name_index } =
            matches_cp_info!(self.constant_pool, self.this_class, Class)?;

        Ok(matches_cp_info!(self.constant_pool, *name_index, Utf8)?.as_str())
    }

    /// `None` when super_class is zero, which only `java/lang/Object` may declare.
    pub fn super_class_name(&self) -> Result<Option<&str>, LookupError> {
        if self.super_class == 0 {
            return Ok(None);
        }

        let ClassInfo { name_index } =
            matches_cp_info!(self.constant_pool, self.super_class, Class)?;

        Ok(Some(
            matches_cp_info!(self.constant_pool, *name_index, Utf8)?.as_str(),
        ))
    }

    pub fn interface_names(&self) -> Result<Vec<&str>, LookupError> {
        self.interfaces
            .indices()
            .iter()
            .map(|&index| -> Result<&str, LookupError> {
                let ClassInfo { name_index } =
                    matches_cp_info!(self.constant_pool, index, Class)?;
                Ok(matches_cp_info!(self.constant_pool, *name_index, Utf8)?.as_str())
            })
            .collect()
    }

    pub fn member_name<F>(&self, member: &MemberInfo<F>) -> Result<&str, LookupError> {
        Ok(matches_cp_info!(self.constant_pool, member.name_index, Utf8)?.as_str())
    }

    pub fn member_descriptor<F>(&self, member: &MemberInfo<F>) -> Result<&str, LookupError> {
        Ok(matches_cp_info!(self.constant_pool, member.descriptor_index, Utf8)?.as_str())
    }
}
impl fmt::Debug for ClassFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassFile")
            .field("bytes", &format!("({} bytes)", self.bytes.len()))
            .field("minor_version", &self.minor_version)
            .field("major_version", &self.major_version)
            .field("constant_pool", &self.constant_pool)
            .field("access_flags", &self.access_flags)
            .field("this_class", &self.this_class)
            .field("super_class", &self.super_class)
            .field("interfaces", &self.interfaces)
            .field("fields", &self.fields)
            .field("methods", &self.methods)
            .field("remainder", &format!("({} bytes)", self.remainder().len()))
            .finish()
    }
}

/// Constant pool indices of the directly implemented interfaces.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InterfaceTable(pub(crate) Vec<u16>);
impl InterfaceTable {
    pub fn indices(&self) -> &[u16] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Count field plus two bytes per index.
    pub fn byte_length(&self) -> usize {
        2 + self.0.len() * 2
    }
}

/// A row of the field or method table. `F` is the access flag vocabulary of the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberInfo<F> {
    pub access_flags: F,
    /// The flags as stored, including bits `F` has no name for.
    pub access_flags_bits: u16,
    pub name_index: u16,
    pub descriptor_index: u16,
    pub attributes: Attributes,
}
impl<F> MemberInfo<F> {
    pub fn byte_length(&self) -> usize {
        8 + self.attributes.byte_length()
    }
}

pub type FieldInfo = MemberInfo<FieldAccessFlags>;
pub type MethodInfo = MemberInfo<MethodAccessFlags>;
