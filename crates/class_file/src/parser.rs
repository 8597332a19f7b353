use std::sync::Arc;

use byteorder::{BigEndian, ByteOrder};

use crate::{
    attributes::{Attribute, Attributes},
    class_file::{InterfaceTable, MemberInfo},
    constant_pool::{
        ClassInfo, CpInfo, CpTag, DynamicInfo, MethodHandleInfo, MethodTypeInfo, NameAndTypeInfo,
        NamedInfo, RefInfo, Utf8Info,
    },
    reader::ByteReader,
    *,
};

type Endian = BigEndian;

const MAGIC_IDENTIFIER: u32 = 0xCAFEBABE;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParserOptions {
    /// Reject constant pool tags introduced after the class file's declared major version.
    pub check_tag_versions: bool,
}

/// Single-pass decoder over an immutable buffer.
///
/// Every `parse_*` method takes the absolute offset its section starts at and returns the
/// decoded value together with the number of bytes it consumed. The caller advances by
/// exactly that amount before decoding the next section.
pub struct Parser<'a> {
    buf: &'a [u8],
    r: ByteReader<'a>,
    options: ParserOptions,
}
impl<'a> Parser<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            r: ByteReader::new(buf),
            options: ParserOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ParserOptions) -> Self {
        self.options = options;
        self
    }

    pub fn parse(&self) -> Result<ClassFile> {
        let mut offset = self.parse_magic_identifier()?;

        let (minor_version, major_version) = self.parse_version(offset)?;
        offset += 4;

        let (constant_pool, length) = self.parse_constant_pool(offset, major_version)?;
        offset += length;

        let access_flags = ClassAccessFlags::from_bits_truncate(self.r.read_u16(offset)?);
        let this_class = self.r.read_u16(offset + 2)?;
        let super_class = self.r.read_u16(offset + 4)?;
        offset += 6;

        let (interfaces, length) = self.parse_interfaces(offset)?;
        offset += length;

        let (fields, length) = self.parse_members(offset, FieldAccessFlags::from_bits_truncate)?;
        offset += length;

        let (methods, length) =
            self.parse_members(offset, MethodAccessFlags::from_bits_truncate)?;
        offset += length;

        log::debug!(
            "decoded class file ({}): {} constant pool slots, {} interfaces, {} fields, {} methods, {} trailing bytes",
            MajorVersion(major_version),
            constant_pool.len(),
            interfaces.len(),
            fields.len(),
            methods.len(),
            self.r.remaining(offset),
        );

        Ok(ClassFile {
            bytes: Arc::from(self.buf),
            minor_version,
            major_version: MajorVersion(major_version),
            constant_pool,
            access_flags,
            this_class,
            super_class,
            interfaces,
            fields,
            methods,
            remainder_offset: offset,
        })
    }

    /// Returns the offset just past the magic identifier.
    fn parse_magic_identifier(&self) -> Result<usize> {
        match self.r.read_u32(0)? {
            MAGIC_IDENTIFIER => Ok(4),
            found => Err(DecodeError::InvalidMagic { found }),
        }
    }

    /// Returns `(minor, major)`.
    fn parse_version(&self, offset: usize) -> Result<(u16, u16)> {
        let minor = self.r.read_u16(offset)?;
        let major = self.r.read_u16(offset + 2)?;
        Ok((minor, major))
    }

    /// Decodes `constant_pool_count - 1` slots starting at the count field.
    ///
    /// `major_version` is only consulted when [`ParserOptions::check_tag_versions`] is set.
    pub fn parse_constant_pool(
        &self,
        offset: usize,
        major_version: u16,
    ) -> Result<(ConstantPool, usize)> {
        let declared_count = self.r.read_u16(offset)?;
        let mut count = (declared_count as usize).checked_sub(1).ok_or(
            DecodeError::InconsistentLength {
                offset,
                declared: 0,
                available: self.r.remaining(offset + 2),
            },
        )?;

        let mut at = offset + 2;
        // Every slot but a wide entry's filler takes at least three bytes.
        let mut res = Vec::with_capacity(count.min(self.r.remaining(at)));
        while count > 0 {
            let (cp_info, length) = self.parse_cp_info(at)?;
            if let Some(tag) = cp_info.tag() {
                self.check_tag_version(at, tag, major_version)?;
            }

            let slot_size = cp_info.tag().map_or(1, CpTag::slot_size);
            if slot_size > count {
                // A Long or Double starting in the last slot would spill past the pool.
                return Err(DecodeError::InconsistentLength {
                    offset: at,
                    declared: slot_size,
                    available: count,
                });
            }

            log::trace!("constant pool #{} @{}: {}", res.len() + 1, at, cp_info);

            res.push(cp_info);
            (0..slot_size - 1).for_each(|_| res.push(CpInfo::Unusable));

            count -= slot_size;
            at += length;
        }

        Ok((ConstantPool::new(res), at - offset))
    }

    /// Decodes the single entry whose tag byte sits at `offset`.
    pub fn parse_cp_info(&self, offset: usize) -> Result<(CpInfo, usize)> {
        let tag = self.r.read_u8(offset)?;
        let tag =
            CpTag::try_from(tag).map_err(|tag| DecodeError::UnrecognizedTag { offset, tag })?;

        let at = offset + 1;
        if let Some(payload_size) = tag.payload_size() {
            self.r.slice(at, payload_size)?;
        }

        let cp_info = match tag {
            CpTag::Utf8 => CpInfo::Utf8(self.parse_utf8(at)?),
            CpTag::Integer => CpInfo::Integer(self.r.read_i32(at)?),
            CpTag::Float => CpInfo::Float(self.r.read_f32(at)?),
            CpTag::Long => CpInfo::Long(self.r.read_i64(at)?),
            CpTag::Double => CpInfo::Double(self.r.read_f64(at)?),
            CpTag::Class => CpInfo::Class(ClassInfo {
                name_index: self.r.read_u16(at)?,
            }),
            CpTag::String => CpInfo::String {
                string_index: self.r.read_u16(at)?,
            },
            CpTag::FieldRef => CpInfo::FieldRef(self.parse_ref_info(at)?),
            CpTag::MethodRef => CpInfo::MethodRef(self.parse_ref_info(at)?),
            CpTag::InterfaceMethodRef => CpInfo::InterfaceMethodRef(self.parse_ref_info(at)?),
            CpTag::NameAndType => CpInfo::NameAndType(NameAndTypeInfo {
                name_index: self.r.read_u16(at)?,
                descriptor_index: self.r.read_u16(at + 2)?,
            }),
            CpTag::MethodHandle => CpInfo::MethodHandle(MethodHandleInfo {
                reference_kind: self.r.read_u8(at)?,
                reference_index: self.r.read_u16(at + 1)?,
            }),
            CpTag::MethodType => CpInfo::MethodType(MethodTypeInfo {
                descriptor_index: self.r.read_u16(at)?,
            }),
            CpTag::Dynamic => CpInfo::Dynamic(self.parse_dynamic_info(at)?),
            CpTag::InvokeDynamic => CpInfo::InvokeDynamic(self.parse_dynamic_info(at)?),
            CpTag::Module => CpInfo::Module(NamedInfo {
                name_index: self.r.read_u16(at)?,
            }),
            CpTag::Package => CpInfo::Package(NamedInfo {
                name_index: self.r.read_u16(at)?,
            }),
        };

        let length = cp_info.byte_length();
        Ok((cp_info, length))
    }

    fn parse_utf8(&self, offset: usize) -> Result<Utf8Info> {
        let length = self.r.read_u16(offset)?;
        let available = self.r.remaining(offset + 2);
        if length as usize > available {
            return Err(DecodeError::InconsistentLength {
                offset,
                declared: length as usize,
                available,
            });
        }

        let bytes = self.r.slice(offset + 2, length as usize)?;
        let text = match cesu8::from_java_cesu8(bytes) {
            Ok(text) => text.into_owned(),
            Err(_) => {
                log::warn!("Utf8 constant at offset {} is not modified UTF-8", offset);
                String::from_utf8_lossy(bytes).into_owned()
            }
        };

        Ok(Utf8Info { length, text })
    }

    fn parse_ref_info(&self, offset: usize) -> Result<RefInfo> {
        Ok(RefInfo {
            class_index: self.r.read_u16(offset)?,
            name_and_type_index: self.r.read_u16(offset + 2)?,
        })
    }

    fn parse_dynamic_info(&self, offset: usize) -> Result<DynamicInfo> {
        Ok(DynamicInfo {
            bootstrap_method_attr_index: self.r.read_u16(offset)?,
            name_and_type_index: self.r.read_u16(offset + 2)?,
        })
    }

    fn check_tag_version(&self, offset: usize, tag: CpTag, major_version: u16) -> Result<()> {
        let required = tag.min_major_version();
        if self.options.check_tag_versions && major_version < required {
            return Err(DecodeError::UnsupportedTag {
                offset,
                tag: tag.value(),
                required,
                declared: major_version,
            });
        }
        Ok(())
    }

    pub fn parse_interfaces(&self, offset: usize) -> Result<(InterfaceTable, usize)> {
        let interfaces_count = self.r.read_u16(offset)? as usize;
        let bytes = self.r.slice(offset + 2, interfaces_count * 2)?;

        let mut interfaces = vec![0u16; interfaces_count];
        Endian::read_u16_into(bytes, &mut interfaces);

        log::trace!("interfaces @{}: {:?}", offset, interfaces);

        let table = InterfaceTable(interfaces);
        let length = table.byte_length();
        Ok((table, length))
    }

    /// Decodes a member table (fields or methods), converting each member's raw access
    /// flags with `access_flags`.
    pub fn parse_members<F>(
        &self,
        offset: usize,
        access_flags: fn(u16) -> F,
    ) -> Result<(Vec<MemberInfo<F>>, usize)> {
        let members_count = self.r.read_u16(offset)?;

        let mut at = offset + 2;
        let mut members =
            Vec::with_capacity((members_count as usize).min(self.r.remaining(at) / 8));
        for _ in 0..members_count {
            let (member, length) = self.parse_member_info(at, access_flags)?;
            members.push(member);
            at += length;
        }

        Ok((members, at - offset))
    }

    fn parse_member_info<F>(
        &self,
        offset: usize,
        access_flags: fn(u16) -> F,
    ) -> Result<(MemberInfo<F>, usize)> {
        let access_flags_bits = self.r.read_u16(offset)?;
        let name_index = self.r.read_u16(offset + 2)?;
        let descriptor_index = self.r.read_u16(offset + 4)?;
        let (attributes, length) = self.parse_attributes(offset + 6)?;

        log::trace!(
            "member @{}: flags 0x{:04x}, name #{}, descriptor #{}, {} attributes",
            offset,
            access_flags_bits,
            name_index,
            descriptor_index,
            attributes.len()
        );

        Ok((
            MemberInfo {
                access_flags: access_flags(access_flags_bits),
                access_flags_bits,
                name_index,
                descriptor_index,
                attributes,
            },
            6 + length,
        ))
    }

    /// Decodes an attribute count followed by that many attribute blocks.
    pub fn parse_attributes(&self, offset: usize) -> Result<(Attributes, usize)> {
        let attributes_count = self.r.read_u16(offset)?;

        let mut at = offset + 2;
        let mut attributes =
            Vec::with_capacity((attributes_count as usize).min(self.r.remaining(at) / 6));
        for _ in 0..attributes_count {
            let (attribute, length) = self.parse_attribute(at)?;
            attributes.push(attribute);
            at += length;
        }

        Ok((Attributes(attributes), at - offset))
    }

    pub fn parse_attribute(&self, offset: usize) -> Result<(Attribute, usize)> {
        let attribute_name_index = self.r.read_u16(offset)?;
        let attribute_length = self.r.read_u32(offset + 2)? as usize;

        let available = self.r.remaining(offset + 6);
        if attribute_length > available {
            return Err(DecodeError::InconsistentLength {
                offset,
                declared: attribute_length,
                available,
            });
        }
        let info = self.r.slice(offset + 6, attribute_length)?.to_vec();

        let attribute = Attribute {
            attribute_name_index,
            info,
        };
        let length = attribute.byte_length();
        Ok((attribute, length))
    }
}

#[cfg(test)]
mod parse_magic_identifier_tests {
    use super::*;

    #[test]
    fn it_should_be_able_to_parse_the_correct_identifier() {
        assert_eq!(
            Parser::new(&[0xca, 0xfe, 0xba, 0xbe])
                .parse_magic_identifier()
                .unwrap(),
            4
        );
    }

    #[test]
    fn it_should_fail_if_there_is_not_enough_data() {
        assert!(matches!(
            Parser::new(&[0xca, 0xfe, 0xba]).parse_magic_identifier(),
            Err(DecodeError::TruncatedInput { .. })
        ));
    }

    #[test]
    fn it_should_fail_if_the_magic_identifier_is_incorrect() {
        assert_eq!(
            Parser::new(&[0x00, 0x00, 0x00, 0x00]).parse(),
            Err(DecodeError::InvalidMagic { found: 0 })
        );
        assert_eq!(
            Parser::new(&[0xca, 0xfe, 0xba, 0xbf, 0x00, 0x00, 0x00, 0x34]).parse(),
            Err(DecodeError::InvalidMagic { found: 0xcafebabf })
        );
    }
}


#[cfg(test)]
mod parse_cp_info_tests {
    use super::*;

    #[test]
    fn it_should_parse_a_utf8_entry() {
        let (cp_info, length) = Parser::new(&[0x01, 0x00, 0x05, b'h', b'e', b'l', b'l', b'o'])
            .parse_cp_info(0)
            .unwrap();

        assert_eq!(
            cp_info,
            CpInfo::Utf8(Utf8Info {
                length: 5,
                text: "hello".into()
            })
        );
        assert_eq!(length, 8);
    }

    #[test]
    fn it_should_read_the_utf8_length_as_a_full_u16() {
        let mut bytes = vec![0x01, 0x01, 0x00];
        bytes.extend(std::iter::repeat(b'a').take(256));

        let (cp_info, length) = Parser::new(&bytes).parse_cp_info(0).unwrap();

        assert_eq!(length, 259);
        assert!(matches!(cp_info, CpInfo::Utf8(ref s) if s.text.len() == 256));
    }

    #[test]
    fn it_should_decode_modified_utf8() {
        let (cp_info, _) = Parser::new(&[0x01, 0x00, 0x03, b'a', 0xc0, 0x80])
            .parse_cp_info(0)
            .unwrap();

        assert!(matches!(cp_info, CpInfo::Utf8(ref s) if s.as_str() == "a\0"));
    }

    #[test]
    fn it_should_fail_if_the_utf8_length_exceeds_the_buffer() {
        assert_eq!(
            Parser::new(&[0x01, 0x00, 0x05, b'h', b'i']).parse_cp_info(0),
            Err(DecodeError::InconsistentLength {
                offset: 1,
                declared: 5,
                available: 2
            })
        );
    }

    #[test]
    fn it_should_parse_an_integer_entry() {
        assert_eq!(
            Parser::new(&[0x03, 0x00, 0x00, 0x00, 0x2a])
                .parse_cp_info(0)
                .unwrap(),
            (CpInfo::Integer(42), 5)
        );
    }

    #[test]
    fn it_should_parse_wide_entries() {
        assert_eq!(
            Parser::new(&[0x05, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xfe])
                .parse_cp_info(0)
                .unwrap(),
            (CpInfo::Long(-2), 9)
        );
        assert_eq!(
            Parser::new(&[0x06, 0x3f, 0xf8, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00])
                .parse_cp_info(0)
                .unwrap(),
            (CpInfo::Double(1.5), 9)
        );
        assert_eq!(
            Parser::new(&[0x04, 0x40, 0x49, 0x0f, 0xdb])
                .parse_cp_info(0)
                .unwrap(),
            (CpInfo::Float(std::f32::consts::PI), 5)
        );
    }

    #[test]
    fn it_should_parse_reference_entries() {
        assert_eq!(
            Parser::new(&[0x0a, 0x00, 0x03, 0x01, 0x02])
                .parse_cp_info(0)
                .unwrap(),
            (
                CpInfo::MethodRef(RefInfo {
                    class_index: 3,
                    name_and_type_index: 0x0102
                }),
                5
            )
        );
        assert_eq!(
            Parser::new(&[0x0f, 0x06, 0x01, 0x00])
                .parse_cp_info(0)
                .unwrap(),
            (
                CpInfo::MethodHandle(MethodHandleInfo {
                    reference_kind: 6,
                    reference_index: 0x0100
                }),
                4
            )
        );
        assert_eq!(
            Parser::new(&[0x11, 0x00, 0x00, 0x00, 0x07])
                .parse_cp_info(0)
                .unwrap(),
            (
                CpInfo::Dynamic(DynamicInfo {
                    bootstrap_method_attr_index: 0,
                    name_and_type_index: 7
                }),
                5
            )
        );
        assert_eq!(
            Parser::new(&[0x14, 0x00, 0x09]).parse_cp_info(0).unwrap(),
            (CpInfo::Package(NamedInfo { name_index: 9 }), 3)
        );
    }

    #[test]
    fn it_should_fail_if_the_payload_is_truncated() {
        assert_eq!(
            Parser::new(&[0x0a, 0x00, 0x03]).parse_cp_info(0),
            Err(DecodeError::TruncatedInput {
                offset: 1,
                needed: 4,
                available: 2
            })
        );
    }

    #[test]
    fn it_should_fail_on_an_unrecognized_tag() {
        assert_eq!(
            Parser::new(&[0x00, 0x00, 0xff, 0x00, 0x00]).parse_cp_info(2),
            Err(DecodeError::UnrecognizedTag {
                offset: 2,
                tag: 255
            })
        );
    }
}

#[cfg(test)]
mod parse_constant_pool_tests {
    use super::*;

    #[test]
    fn it_should_parse_an_empty_pool() {
        let (pool, length) = Parser::new(&[0x00, 0x01])
            .parse_constant_pool(0, 52)
            .unwrap();

        assert!(pool.is_empty());
        assert_eq!(pool.declared_count(), 1);
        assert_eq!(length, 2);
    }

    #[test]
    fn it_should_reserve_a_slot_after_wide_entries() {
        #[rustfmt::skip]
        let bytes = [
            0x00, 0x04,
            0x05, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x07,
            0x03, 0x00, 0x00, 0x00, 0x2a,
        ];
        let (pool, length) = Parser::new(&bytes).parse_constant_pool(0, 52).unwrap();

        assert_eq!(pool.len(), pool.declared_count() as usize - 1);
        assert_eq!(pool.entry_at(1), Some(&CpInfo::Long(7)));
        assert_eq!(pool.entry_at(2), None);
        assert_eq!(pool.entry_at(3), Some(&CpInfo::Integer(42)));
        assert_eq!(length, bytes.len());
        assert_eq!(pool.byte_length(), length);
    }

    #[test]
    fn it_should_fail_if_a_wide_entry_occupies_the_last_slot() {
        #[rustfmt::skip]
        let bytes = [
            0x00, 0x02,
            0x05, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x07,
        ];

        assert!(matches!(
            Parser::new(&bytes).parse_constant_pool(0, 52),
            Err(DecodeError::InconsistentLength { offset: 2, .. })
        ));
    }

    #[test]
    fn it_should_fail_on_a_count_larger_than_the_input() {
        assert_eq!(
            Parser::new(&[0xff, 0xff, 0x01, 0x00, 0x05, b'h']).parse_constant_pool(0, 52),
            Err(DecodeError::InconsistentLength {
                offset: 3,
                declared: 5,
                available: 1
            })
        );
        assert!(matches!(
            Parser::new(&[0x00, 0xff, 0xff]).parse_members(0, FieldAccessFlags::from_bits_truncate),
            Err(DecodeError::TruncatedInput { offset: 2, .. })
        ));
        assert!(matches!(
            Parser::new(&[0xff, 0xff]).parse_attributes(0),
            Err(DecodeError::TruncatedInput { offset: 2, .. })
        ));
    }

    #[test]
    fn it_should_fail_on_a_zero_count() {
        assert!(matches!(
            Parser::new(&[0x00, 0x00]).parse_constant_pool(0, 52),
            Err(DecodeError::InconsistentLength { offset: 0, .. })
        ));
    }

    #[test]
    fn it_should_propagate_the_first_entry_failure() {
        #[rustfmt::skip]
        let bytes = [
            0x00, 0x03,
            0x07, 0x00, 0x02,
            0xff,
        ];

        assert_eq!(
            Parser::new(&bytes).parse_constant_pool(0, 52),
            Err(DecodeError::UnrecognizedTag {
                offset: 5,
                tag: 255
            })
        );
    }

    #[test]
    fn it_should_only_check_tag_versions_when_asked_to() {
        let bytes = [0x00, 0x02, 0x10, 0x00, 0x01];

        assert!(Parser::new(&bytes).parse_constant_pool(0, 50).is_ok());
        assert_eq!(
            Parser::new(&bytes)
                .with_options(ParserOptions {
                    check_tag_versions: true
                })
                .parse_constant_pool(0, 50),
            Err(DecodeError::UnsupportedTag {
                offset: 2,
                tag: 16,
                required: 51,
                declared: 50
            })
        );
        assert!(Parser::new(&bytes)
            .with_options(ParserOptions {
                check_tag_versions: true
            })
            .parse_constant_pool(0, 51)
            .is_ok());
    }
}

#[cfg(test)]
mod parse_interfaces_tests {
    use super::*;

    #[test]
    fn it_should_be_able_to_parse_interfaces() {
        let (interfaces, length) = Parser::new(&[0x00, 0x02, 0x00, 0x03, 0x01, 0x05])
            .parse_interfaces(0)
            .unwrap();

        assert_eq!(interfaces.indices(), &[3, 0x0105]);
        assert_eq!(length, 6);
    }

    #[test]
    fn it_should_fail_if_there_are_not_enough_indices() {
        assert_eq!(
            Parser::new(&[0x00, 0x02, 0x00, 0x03]).parse_interfaces(0),
            Err(DecodeError::TruncatedInput {
                offset: 2,
                needed: 4,
                available: 2
            })
        );
    }
}

#[cfg(test)]
mod parse_attribute_tests {
    use super::*;

    #[test]
    fn it_should_be_able_to_parse_an_attribute() {
        let (attribute, length) =
            Parser::new(&[0x00, 0x0d, 0x00, 0x00, 0x00, 0x02, 0xab, 0xcd, 0xff])
                .parse_attribute(0)
                .unwrap();

        assert_eq!(attribute.attribute_name_index, 13);
        assert_eq!(attribute.info, vec![0xab, 0xcd]);
        assert_eq!(length, 8);
    }

    #[test]
    fn it_should_fail_if_the_declared_length_exceeds_the_buffer() {
        assert_eq!(
            Parser::new(&[0x00, 0x0d, 0x00, 0x00, 0x00, 0x0a, 0xab, 0xcd]).parse_attribute(0),
            Err(DecodeError::InconsistentLength {
                offset: 0,
                declared: 10,
                available: 2
            })
        );
    }

    #[test]
    fn it_should_fail_if_the_header_is_truncated() {
        assert!(matches!(
            Parser::new(&[0x00, 0x0d, 0x00]).parse_attribute(0),
            Err(DecodeError::TruncatedInput { .. })
        ));
    }
}
