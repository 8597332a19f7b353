use std::fmt;

/// The decoded constant pool.
///
/// Indexing is 1-based as in the class file: index 0 is never valid, and the slot following
/// a `Long` or `Double` holds [`CpInfo::Unusable`].
#[derive(Debug, Clone, PartialEq)]
pub struct ConstantPool {
    cp_infos: Vec<CpInfo>,
}
impl ConstantPool {
    /// `cp_infos` holds every slot, fillers included, so at most `u16::MAX - 1` entries.
    pub(crate) fn new(cp_infos: Vec<CpInfo>) -> Self {
        Self { cp_infos }
    }

    /// The `constant_pool_count` field as stored on disk, one more than the slot count.
    pub fn declared_count(&self) -> u16 {
        (self.cp_infos.len() + 1) as u16
    }

    /// Encoded size of the pool including its count field.
    pub fn byte_length(&self) -> usize {
        2 + self.cp_infos.iter().map(CpInfo::byte_length).sum::<usize>()
    }

    pub fn len(&self) -> usize {
        self.cp_infos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cp_infos.is_empty()
    }

    /// Bounds-checked lookup. Returns `None` for index 0, indices past the end and the
    /// unusable second slot of a `Long`/`Double`.
    pub fn entry_at(&self, index: u16) -> Option<&CpInfo> {
        let slot = (index as usize).checked_sub(1)?;
        match self.cp_infos.get(slot)? {
            CpInfo::Unusable => None,
            cp_info => Some(cp_info),
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CpInfo> {
        self.cp_infos.iter()
    }
}
impl<'a> IntoIterator for &'a ConstantPool {
    type Item = &'a CpInfo;
    type IntoIter = std::slice::Iter<'a, CpInfo>;

    fn into_iter(self) -> Self::IntoIter {
        self.cp_infos.iter()
    }
}

#[macro_export]
macro_rules! matches_cp_info {
    ($cp:expr, $index:expr, $i:ident) => {{
        let index: u16 = $index;
        match $cp.entry_at(index) {
            Some($crate::constant_pool::CpInfo::$i(n)) => Ok(n),
            Some(c) => Err($crate::LookupError::UnexpectedConstantPoolEntry(
                stringify!($i),
                c.clone(),
            )),
            None => Err($crate::LookupError::InvalidIndex(index)),
        }
    }};
}

/// The one-byte discriminator in front of every constant pool entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CpTag {
    Utf8 = 1,
    Integer = 3,
    Float = 4,
    Long = 5,
    Double = 6,
    Class = 7,
    String = 8,
    FieldRef = 9,
    MethodRef = 10,
    InterfaceMethodRef = 11,
    NameAndType = 12,
    MethodHandle = 15,
    MethodType = 16,
    Dynamic = 17,
    InvokeDynamic = 18,
    Module = 19,
    Package = 20,
}
impl CpTag {
    pub fn value(self) -> u8 {
        self as u8
    }

    /// Size of the payload following the tag byte. `None` for `Utf8`, whose size comes
    /// from its own length prefix.
    pub fn payload_size(self) -> Option<usize> {
        match self {
            CpTag::Utf8 => None,
            CpTag::Class
            | CpTag::String
            | CpTag::MethodType
            | CpTag::Module
            | CpTag::Package => Some(2),
            CpTag::MethodHandle => Some(3),
            CpTag::Integer
            | CpTag::Float
            | CpTag::FieldRef
            | CpTag::MethodRef
            | CpTag::InterfaceMethodRef
            | CpTag::NameAndType
            | CpTag::Dynamic
            | CpTag::InvokeDynamic => Some(4),
            CpTag::Long | CpTag::Double => Some(8),
        }
    }

    /// Number of pool slots an entry with this tag occupies.
    pub fn slot_size(self) -> usize {
        match self {
            CpTag::Long | CpTag::Double => 2,
            _ => 1,
        }
    }

    /// First class file major version in which the tag may appear.
    pub fn min_major_version(self) -> u16 {
        match self {
            CpTag::MethodHandle | CpTag::MethodType | CpTag::InvokeDynamic => 51,
            CpTag::Module | CpTag::Package => 53,
            CpTag::Dynamic => 55,
            _ => 45,
        }
    }
}
impl TryFrom<u8> for CpTag {
    type Error = u8;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            1 => Ok(CpTag::Utf8),
            3 => Ok(CpTag::Integer),
            4 => Ok(CpTag::Float),
            5 => Ok(CpTag::Long),
            6 => Ok(CpTag::Double),
            7 => Ok(CpTag::Class),
            8 => Ok(CpTag::String),
            9 => Ok(CpTag::FieldRef),
            10 => Ok(CpTag::MethodRef),
            11 => Ok(CpTag::InterfaceMethodRef),
            12 => Ok(CpTag::NameAndType),
            15 => Ok(CpTag::MethodHandle),
            16 => Ok(CpTag::MethodType),
            17 => Ok(CpTag::Dynamic),
            18 => Ok(CpTag::InvokeDynamic),
            19 => Ok(CpTag::Module),
            20 => Ok(CpTag::Package),
            _ => Err(value),
        }
    }
}

#[derive(Debug, Clone)]
pub enum CpInfo {
    Utf8(Utf8Info),
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    Class(ClassInfo),
    String { string_index: u16 },
    FieldRef(RefInfo),
    MethodRef(RefInfo),
    InterfaceMethodRef(RefInfo),
    NameAndType(NameAndTypeInfo),
    MethodHandle(MethodHandleInfo),
    MethodType(MethodTypeInfo),
    Dynamic(DynamicInfo),
    InvokeDynamic(DynamicInfo),
    Module(NamedInfo),
    Package(NamedInfo),
    Unusable,
}
impl CpInfo {
    /// `None` only for the [`CpInfo::Unusable`] filler slot.
    pub fn tag(&self) -> Option<CpTag> {
        Some(match self {
            CpInfo::Utf8(_) => CpTag::Utf8,
            CpInfo::Integer(_) => CpTag::Integer,
            CpInfo::Float(_) => CpTag::Float,
            CpInfo::Long(_) => CpTag::Long,
            CpInfo::Double(_) => CpTag::Double,
            CpInfo::Class(_) => CpTag::Class,
            CpInfo::String { .. } => CpTag::String,
            CpInfo::FieldRef(_) => CpTag::FieldRef,
            CpInfo::MethodRef(_) => CpTag::MethodRef,
            CpInfo::InterfaceMethodRef(_) => CpTag::InterfaceMethodRef,
            CpInfo::NameAndType(_) => CpTag::NameAndType,
            CpInfo::MethodHandle(_) => CpTag::MethodHandle,
            CpInfo::MethodType(_) => CpTag::MethodType,
            CpInfo::Dynamic(_) => CpTag::Dynamic,
            CpInfo::InvokeDynamic(_) => CpTag::InvokeDynamic,
            CpInfo::Module(_) => CpTag::Module,
            CpInfo::Package(_) => CpTag::Package,
            CpInfo::Unusable => return None,
        })
    }

    /// Encoded size including the tag byte. The unusable slot has no bytes of its own.
    pub fn byte_length(&self) -> usize {
        match self {
            CpInfo::Utf8(utf8) => 1 + 2 + utf8.length as usize,
            CpInfo::Unusable => 0,
            c => c.tag().and_then(CpTag::payload_size).map_or(0, |size| size + 1),
        }
    }
}
// Floating point constants compare by bit pattern so that a NaN constant equals itself.
impl PartialEq for CpInfo {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (CpInfo::Utf8(a), CpInfo::Utf8(b)) => a == b,
            (CpInfo::Integer(a), CpInfo::Integer(b)) => a == b,
            (CpInfo::Float(a), CpInfo::Float(b)) => a.to_bits() == b.to_bits(),
            (CpInfo::Long(a), CpInfo::Long(b)) => a == b,
            (CpInfo::Double(a), CpInfo::Double(b)) => a.to_bits() == b.to_bits(),
            (CpInfo::Class(a), CpInfo::Class(b)) => a == b,
            (CpInfo::String { string_index: a }, CpInfo::String { string_index: b }) => a == b,
            (CpInfo::FieldRef(a), CpInfo::FieldRef(b)) => a == b,
            (CpInfo::MethodRef(a), CpInfo::MethodRef(b)) => a == b,
            (CpInfo::InterfaceMethodRef(a), CpInfo::InterfaceMethodRef(b)) => a == b,
            (CpInfo::NameAndType(a), CpInfo::NameAndType(b)) => a == b,
            (CpInfo::MethodHandle(a), CpInfo::MethodHandle(b)) => a == b,
            (CpInfo::MethodType(a), CpInfo::MethodType(b)) => a == b,
            (CpInfo::Dynamic(a), CpInfo::Dynamic(b)) => a == b,
            (CpInfo::InvokeDynamic(a), CpInfo::InvokeDynamic(b)) => a == b,
            (CpInfo::Module(a), CpInfo::Module(b)) => a == b,
            (CpInfo::Package(a), CpInfo::Package(b)) => a == b,
            (CpInfo::Unusable, CpInfo::Unusable) => true,
            _ => false,
        }
    }
}
impl Eq for CpInfo {}

impl fmt::Display for CpInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CpInfo::Utf8(utf8) => write!(f, "Utf8 {:?}", utf8.as_str()),
            CpInfo::Integer(v) => write!(f, "Integer {}", v),
            CpInfo::Float(v) => write!(f, "Float {}", v),
            CpInfo::Long(v) => write!(f, "Long {}", v),
            CpInfo::Double(v) => write!(f, "Double {}", v),
            CpInfo::Class(c) => write!(f, "Class #{}", c.name_index),
            CpInfo::String { string_index } => write!(f, "String #{}", string_index),
            CpInfo::FieldRef(r) => write!(f, "Fieldref {}", r),
            CpInfo::MethodRef(r) => write!(f, "Methodref {}", r),
            CpInfo::InterfaceMethodRef(r) => write!(f, "InterfaceMethodref {}", r),
            CpInfo::NameAndType(nt) => write!(
                f,
                "NameAndType #{}:#{}",
                nt.name_index, nt.descriptor_index
            ),
            CpInfo::MethodHandle(mh) => write!(
                f,
                "MethodHandle {}:#{}",
                mh.reference_kind, mh.reference_index
            ),
            CpInfo::MethodType(mt) => write!(f, "MethodType #{}", mt.descriptor_index),
            CpInfo::Dynamic(d) => write!(f, "Dynamic {}", d),
            CpInfo::InvokeDynamic(d) => write!(f, "InvokeDynamic {}", d),
            CpInfo::Module(m) => write!(f, "Module #{}", m.name_index),
            CpInfo::Package(p) => write!(f, "Package #{}", p.name_index),
            CpInfo::Unusable => f.write_str("(unusable)"),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Utf8Info {
    /// Length prefix as stored, in encoded bytes.
    pub length: u16,
    pub text: String,
}
impl Utf8Info {
    pub fn as_str(&self) -> &str {
        &self.text
    }
}
impl PartialEq<str> for Utf8Info {
    fn eq(&self, other: &str) -> bool {
        self.text == other
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct RefInfo {
    pub class_index: u16,
    pub name_and_type_index: u16,
}
impl fmt::Display for RefInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}.#{}", self.class_index, self.name_and_type_index)
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ClassInfo {
    // Must point at a Utf8 entry holding a binary class or interface name in internal form.
    pub name_index: u16,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct NameAndTypeInfo {
    pub name_index: u16,
    pub descriptor_index: u16,
}

/// Payload shared by `Dynamic` and `InvokeDynamic`.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct DynamicInfo {
    pub bootstrap_method_attr_index: u16,
    pub name_and_type_index: u16,
}
impl fmt::Display for DynamicInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{}:#{}",
            self.bootstrap_method_attr_index, self.name_and_type_index
        )
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct MethodHandleInfo {
    pub reference_kind: u8,
    pub reference_index: u16,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct MethodTypeInfo {
    pub descriptor_index: u16,
}

/// Payload shared by `Module` and `Package`.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct NamedInfo {
    pub name_index: u16,
}
