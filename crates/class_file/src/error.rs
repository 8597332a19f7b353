use thiserror::Error;

use crate::constant_pool;

/// Reasons a buffer is rejected as a class file. Every variant is terminal for the decode
/// that produced it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Invalid magic identifier: 0x{found:08X}")]
    InvalidMagic { found: u32 },
    #[error("Unrecognized constant pool tag {tag} at offset {offset}")]
    UnrecognizedTag { offset: usize, tag: u8 },
    #[error("Truncated input at offset {offset}: needed {needed} bytes, {available} available")]
    TruncatedInput {
        offset: usize,
        needed: usize,
        available: usize,
    },
    #[error(
        "Inconsistent length at offset {offset}: declared {declared}, {available} available"
    )]
    InconsistentLength {
        offset: usize,
        declared: usize,
        available: usize,
    },
    #[error("Constant pool tag {tag} at offset {offset} requires major version {required}, class declares {declared}")]
    UnsupportedTag {
        offset: usize,
        tag: u8,
        required: u16,
        declared: u16,
    },
}

#[derive(Error, Debug)]
pub enum LookupError {
    #[error("Invalid constant pool index: {0}")]
    InvalidIndex(u16),
    #[error("Expected {0}, found {1:?}")]
    UnexpectedConstantPoolEntry(&'static str, constant_pool::CpInfo),
}
