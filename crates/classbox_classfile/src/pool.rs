//! Typed constant-pool model with per-entry byte spans.
//!
//! The pool is parsed once into typed [`Constant`] entries. Each entry keeps
//! the byte range it occupied in the original container, which is what lets
//! the rewriter splice replacements without disturbing anything else.
//!
//! Pool indices are 1-based; `Long` and `Double` entries occupy two index
//! slots, so the entry table is sparse.

use std::ops::Range;

use classbox_foundation::{Error, Result};

use crate::mutf8;
use crate::reader::ByteReader;

/// Constant tag for `CONSTANT_Utf8`.
pub const TAG_UTF8: u8 = 1;
const TAG_INTEGER: u8 = 3;
const TAG_FLOAT: u8 = 4;
const TAG_LONG: u8 = 5;
const TAG_DOUBLE: u8 = 6;
const TAG_CLASS: u8 = 7;
const TAG_STRING: u8 = 8;
const TAG_FIELDREF: u8 = 9;
const TAG_METHODREF: u8 = 10;
const TAG_INTERFACE_METHODREF: u8 = 11;
const TAG_NAME_AND_TYPE: u8 = 12;
const TAG_METHOD_HANDLE: u8 = 15;
const TAG_METHOD_TYPE: u8 = 16;
const TAG_DYNAMIC: u8 = 17;
const TAG_INVOKE_DYNAMIC: u8 = 18;
const TAG_MODULE: u8 = 19;
const TAG_PACKAGE: u8 = 20;

/// A single constant-pool entry.
#[derive(Clone, Debug, PartialEq)]
pub enum Constant {
    /// Modified UTF-8 text, decoded.
    Utf8(String),
    /// 32-bit integer.
    Integer(i32),
    /// 32-bit float.
    Float(f32),
    /// 64-bit integer (occupies two pool slots).
    Long(i64),
    /// 64-bit float (occupies two pool slots).
    Double(f64),
    /// Class reference; the index points at the Utf8 internal name.
    Class {
        /// Pool index of the internal name.
        name_index: u16,
    },
    /// String literal; the index points at the Utf8 content.
    String {
        /// Pool index of the content.
        string_index: u16,
    },
    /// Field reference.
    Fieldref {
        /// Pool index of the owning [`Constant::Class`].
        class_index: u16,
        /// Pool index of the [`Constant::NameAndType`].
        name_and_type_index: u16,
    },
    /// Method reference.
    Methodref {
        /// Pool index of the owning [`Constant::Class`].
        class_index: u16,
        /// Pool index of the [`Constant::NameAndType`].
        name_and_type_index: u16,
    },
    /// Interface method reference.
    InterfaceMethodref {
        /// Pool index of the owning [`Constant::Class`].
        class_index: u16,
        /// Pool index of the [`Constant::NameAndType`].
        name_and_type_index: u16,
    },
    /// Name-and-descriptor pair.
    NameAndType {
        /// Pool index of the name.
        name_index: u16,
        /// Pool index of the descriptor.
        descriptor_index: u16,
    },
    /// Method handle (kept opaque; the interpreter rejects it at use).
    MethodHandle {
        /// Reference kind byte.
        reference_kind: u8,
        /// Pool index of the referenced member.
        reference_index: u16,
    },
    /// Method type.
    MethodType {
        /// Pool index of the descriptor.
        descriptor_index: u16,
    },
    /// Dynamically computed constant.
    Dynamic {
        /// Index into the bootstrap-methods attribute.
        bootstrap_method_attr_index: u16,
        /// Pool index of the [`Constant::NameAndType`].
        name_and_type_index: u16,
    },
    /// `invokedynamic` call site.
    InvokeDynamic {
        /// Index into the bootstrap-methods attribute.
        bootstrap_method_attr_index: u16,
        /// Pool index of the [`Constant::NameAndType`].
        name_and_type_index: u16,
    },
    /// Module reference.
    Module {
        /// Pool index of the module name.
        name_index: u16,
    },
    /// Package reference.
    Package {
        /// Pool index of the package name.
        name_index: u16,
    },
}

/// One parsed entry plus the byte range it occupied in the container.
#[derive(Clone, Debug)]
struct PoolEntry {
    constant: Constant,
    span: Range<usize>,
}

/// The constant pool of one class file.
#[derive(Clone, Debug)]
pub struct ConstantPool {
    /// Sparse entry table; slot 0 and the shadow slots after `Long`/`Double`
    /// are `None`.
    entries: Vec<Option<PoolEntry>>,
    /// Byte offset just past the last pool entry.
    end_offset: usize,
}

impl ConstantPool {
    /// Parses the constant pool from a reader positioned at
    /// `constant_pool_count`.
    ///
    /// # Errors
    /// Returns a malformed-class error on truncation, unknown tags, or
    /// invalid modified UTF-8.
    pub fn parse(r: &mut ByteReader<'_>) -> Result<Self> {
        let count = r.u16()?;
        if count == 0 {
            return Err(Error::malformed(
                "constant pool count must be at least 1",
                r.position() - 2,
            ));
        }
        let mut entries: Vec<Option<PoolEntry>> = vec![None; count as usize];
        let mut index = 1u16;
        while index < count {
            let start = r.position();
            let tag = r.u8()?;
            let (constant, wide) = Self::parse_entry(r, tag, start)?;
            let span = start..r.position();
            entries[index as usize] = Some(PoolEntry { constant, span });
            index += if wide { 2 } else { 1 };
        }
        if index != count {
            // A Long/Double in the last slot overran the declared count.
            return Err(Error::malformed(
                "constant pool entry overruns declared count",
                r.position(),
            ));
        }
        Ok(Self {
            entries,
            end_offset: r.position(),
        })
    }

    fn parse_entry(r: &mut ByteReader<'_>, tag: u8, start: usize) -> Result<(Constant, bool)> {
        let constant = match tag {
            TAG_UTF8 => {
                let length = r.u16()? as usize;
                let content_offset = r.position();
                let raw = r.bytes(length)?;
                Constant::Utf8(mutf8::decode(raw, content_offset)?)
            }
            TAG_INTEGER => Constant::Integer(r.u32()? as i32),
            TAG_FLOAT => Constant::Float(f32::from_bits(r.u32()?)),
            TAG_LONG => Constant::Long(r.u64()? as i64),
            TAG_DOUBLE => Constant::Double(f64::from_bits(r.u64()?)),
            TAG_CLASS => Constant::Class { name_index: r.u16()? },
            TAG_STRING => Constant::String {
                string_index: r.u16()?,
            },
            TAG_FIELDREF => Constant::Fieldref {
                class_index: r.u16()?,
                name_and_type_index: r.u16()?,
            },
            TAG_METHODREF => Constant::Methodref {
                class_index: r.u16()?,
                name_and_type_index: r.u16()?,
            },
            TAG_INTERFACE_METHODREF => Constant::InterfaceMethodref {
                class_index: r.u16()?,
                name_and_type_index: r.u16()?,
            },
            TAG_NAME_AND_TYPE => Constant::NameAndType {
                name_index: r.u16()?,
                descriptor_index: r.u16()?,
            },
            TAG_METHOD_HANDLE => Constant::MethodHandle {
                reference_kind: r.u8()?,
                reference_index: r.u16()?,
            },
            TAG_METHOD_TYPE => Constant::MethodType {
                descriptor_index: r.u16()?,
            },
            TAG_DYNAMIC => Constant::Dynamic {
                bootstrap_method_attr_index: r.u16()?,
                name_and_type_index: r.u16()?,
            },
            TAG_INVOKE_DYNAMIC => Constant::InvokeDynamic {
                bootstrap_method_attr_index: r.u16()?,
                name_and_type_index: r.u16()?,
            },
            TAG_MODULE => Constant::Module { name_index: r.u16()? },
            TAG_PACKAGE => Constant::Package { name_index: r.u16()? },
            _ => {
                return Err(Error::malformed(
                    format!("unknown constant tag {tag}"),
                    start,
                ));
            }
        };
        let wide = matches!(constant, Constant::Long(_) | Constant::Double(_));
        Ok((constant, wide))
    }

    /// Declared `constant_pool_count` (number of slots plus one).
    #[must_use]
    pub fn count(&self) -> u16 {
        self.entries.len() as u16
    }

    /// Byte offset just past the last pool entry.
    #[must_use]
    pub fn end_offset(&self) -> usize {
        self.end_offset
    }

    /// Looks up an entry by 1-based index.
    ///
    /// # Errors
    /// Returns a malformed-class error for index 0, out-of-range indices, and
    /// the shadow slot after a `Long`/`Double`.
    pub fn get(&self, index: u16) -> Result<&Constant> {
        self.entries
            .get(index as usize)
            .and_then(|slot| slot.as_ref())
            .map(|entry| &entry.constant)
            .ok_or_else(|| {
                Error::malformed(format!("invalid constant pool index {index}"), self.end_offset)
            })
    }

    /// Resolves a `Utf8` entry to its text.
    ///
    /// # Errors
    /// Fails if the index is invalid or the entry is not `Utf8`.
    pub fn utf8(&self, index: u16) -> Result<&str> {
        match self.get(index)? {
            Constant::Utf8(text) => Ok(text),
            other => Err(Error::malformed(
                format!("constant {index} is not Utf8 (found {})", tag_name(other)),
                self.end_offset,
            )),
        }
    }

    /// Resolves a `Class` entry to its internal name.
    ///
    /// # Errors
    /// Fails if the index is invalid or does not reference a class.
    pub fn class_name(&self, index: u16) -> Result<&str> {
        match self.get(index)? {
            Constant::Class { name_index } => self.utf8(*name_index),
            other => Err(Error::malformed(
                format!("constant {index} is not Class (found {})", tag_name(other)),
                self.end_offset,
            )),
        }
    }

    /// Resolves a `NameAndType` entry to `(name, descriptor)`.
    ///
    /// # Errors
    /// Fails if the index is invalid or does not reference a name-and-type.
    pub fn name_and_type(&self, index: u16) -> Result<(&str, &str)> {
        match self.get(index)? {
            Constant::NameAndType {
                name_index,
                descriptor_index,
            } => Ok((self.utf8(*name_index)?, self.utf8(*descriptor_index)?)),
            other => Err(Error::malformed(
                format!(
                    "constant {index} is not NameAndType (found {})",
                    tag_name(other)
                ),
                self.end_offset,
            )),
        }
    }

    /// Resolves a field or method reference to
    /// `(class_name, member_name, descriptor)`.
    ///
    /// # Errors
    /// Fails if the index does not reference a member.
    pub fn member_ref(&self, index: u16) -> Result<(&str, &str, &str)> {
        let (class_index, nat_index) = match self.get(index)? {
            Constant::Fieldref {
                class_index,
                name_and_type_index,
            }
            | Constant::Methodref {
                class_index,
                name_and_type_index,
            }
            | Constant::InterfaceMethodref {
                class_index,
                name_and_type_index,
            } => (*class_index, *name_and_type_index),
            other => Err(Error::malformed(
                format!(
                    "constant {index} is not a member reference (found {})",
                    tag_name(other)
                ),
                self.end_offset,
            ))?,
        };
        let class = self.class_name(class_index)?;
        let (name, descriptor) = self.name_and_type(nat_index)?;
        Ok((class, name, descriptor))
    }

    /// Iterates over `Utf8` entries as `(index, text, byte span)`.
    pub fn utf8_entries(&self) -> impl Iterator<Item = (u16, &str, Range<usize>)> {
        self.entries.iter().enumerate().filter_map(|(i, slot)| {
            slot.as_ref().and_then(|entry| match &entry.constant {
                Constant::Utf8(text) => Some((i as u16, text.as_str(), entry.span.clone())),
                _ => None,
            })
        })
    }

    /// Counts `Utf8` entries whose text equals `needle` exactly.
    #[must_use]
    pub fn count_utf8(&self, needle: &str) -> usize {
        self.utf8_entries()
            .filter(|(_, text, _)| *text == needle)
            .count()
    }
}

fn tag_name(constant: &Constant) -> &'static str {
    match constant {
        Constant::Utf8(_) => "Utf8",
        Constant::Integer(_) => "Integer",
        Constant::Float(_) => "Float",
        Constant::Long(_) => "Long",
        Constant::Double(_) => "Double",
        Constant::Class { .. } => "Class",
        Constant::String { .. } => "String",
        Constant::Fieldref { .. } => "Fieldref",
        Constant::Methodref { .. } => "Methodref",
        Constant::InterfaceMethodref { .. } => "InterfaceMethodref",
        Constant::NameAndType { .. } => "NameAndType",
        Constant::MethodHandle { .. } => "MethodHandle",
        Constant::MethodType { .. } => "MethodType",
        Constant::Dynamic { .. } => "Dynamic",
        Constant::InvokeDynamic { .. } => "InvokeDynamic",
        Constant::Module { .. } => "Module",
        Constant::Package { .. } => "Package",
    }
}
