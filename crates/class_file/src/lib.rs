// https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-4.html

#[macro_use]
pub mod constant_pool;
mod access_flags;
pub mod attributes;
mod class_file;
mod error;
mod parser;
mod reader;
mod version;

pub use self::class_file::{ClassFile, FieldInfo, InterfaceTable, MemberInfo, MethodInfo};
pub use access_flags::{ClassAccessFlags, FieldAccessFlags, MethodAccessFlags};
pub use constant_pool::{ConstantPool, CpInfo, CpTag};
pub use error::{DecodeError, LookupError};
pub use parser::{Parser, ParserOptions};
pub use reader::ByteReader;
pub use version::MajorVersion;

pub type Result<T, E = DecodeError> = std::result::Result<T, E>;

/// Decodes a complete class file held in memory. Either the whole file decodes or an
/// error describing the first problem is returned.
pub fn decode(bytes: &[u8]) -> Result<ClassFile> {
    Parser::new(bytes).parse()
}
