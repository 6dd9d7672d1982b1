//! Full class-file container parse.
//!
//! Parses everything after the constant pool: access flags, the class and
//! super-class references, interfaces, fields, methods, and attributes. The
//! `Code` attribute (bytecode, limits, exception table) is decoded on demand
//! because only method bodies the interpreter actually runs need it.

use classbox_foundation::{Error, Result};

use crate::pool::ConstantPool;
use crate::reader::ByteReader;
use crate::MAGIC;

/// `public` access flag.
pub const ACC_PUBLIC: u16 = 0x0001;
/// `private` access flag.
pub const ACC_PRIVATE: u16 = 0x0002;
/// `protected` access flag.
pub const ACC_PROTECTED: u16 = 0x0004;
/// `static` access flag.
pub const ACC_STATIC: u16 = 0x0008;
/// `final` access flag.
pub const ACC_FINAL: u16 = 0x0010;
/// `super` access flag (historical, set on classes).
pub const ACC_SUPER: u16 = 0x0020;
/// `native` access flag.
pub const ACC_NATIVE: u16 = 0x0100;
/// `abstract` access flag.
pub const ACC_ABSTRACT: u16 = 0x0400;

/// A parsed class file.
#[derive(Clone, Debug)]
pub struct ClassFile {
    /// Minor format version.
    pub minor_version: u16,
    /// Major format version.
    pub major_version: u16,
    /// The constant pool.
    pub pool: ConstantPool,
    /// Class access flags.
    pub access_flags: u16,
    /// Pool index of this class.
    pub this_class: u16,
    /// Pool index of the super class (0 only for `java/lang/Object`).
    pub super_class: u16,
    /// Pool indices of implemented interfaces.
    pub interfaces: Vec<u16>,
    /// Declared fields.
    pub fields: Vec<MemberInfo>,
    /// Declared methods.
    pub methods: Vec<MemberInfo>,
    /// Class-level attributes.
    pub attributes: Vec<AttributeInfo>,
}

/// A field or method declaration.
#[derive(Clone, Debug)]
pub struct MemberInfo {
    /// Member access flags.
    pub access_flags: u16,
    /// Pool index of the member name.
    pub name_index: u16,
    /// Pool index of the member descriptor.
    pub descriptor_index: u16,
    /// Member attributes.
    pub attributes: Vec<AttributeInfo>,
}

/// A raw attribute: name index plus undecoded payload.
#[derive(Clone, Debug)]
pub struct AttributeInfo {
    /// Pool index of the attribute name.
    pub name_index: u16,
    /// Raw attribute payload.
    pub info: Vec<u8>,
}

/// A decoded `Code` attribute.
#[derive(Clone, Debug)]
pub struct Code {
    /// Maximum operand-stack depth.
    pub max_stack: u16,
    /// Number of local-variable slots.
    pub max_locals: u16,
    /// Raw bytecode.
    pub bytecode: Vec<u8>,
    /// Exception handlers, in dispatch order.
    pub exception_table: Vec<ExceptionHandler>,
}

/// One exception-table entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExceptionHandler {
    /// Start of the protected range (inclusive).
    pub start_pc: u16,
    /// End of the protected range (exclusive).
    pub end_pc: u16,
    /// Handler entry point.
    pub handler_pc: u16,
    /// Pool index of the caught class, or 0 for catch-all.
    pub catch_type: u16,
}

impl ClassFile {
    /// Parses a complete class file.
    ///
    /// # Errors
    /// Returns a malformed-class error on a bad magic number, truncation, or
    /// an inconsistent constant pool.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let mut r = ByteReader::new(bytes);
        let magic = r.u32()?;
        if magic != MAGIC {
            return Err(Error::malformed(
                format!("bad magic number {magic:#010x}"),
                0,
            ));
        }
        let minor_version = r.u16()?;
        let major_version = r.u16()?;
        let pool = ConstantPool::parse(&mut r)?;
        let access_flags = r.u16()?;
        let this_class = r.u16()?;
        let super_class = r.u16()?;

        let interface_count = r.u16()?;
        let mut interfaces = Vec::with_capacity(interface_count as usize);
        for _ in 0..interface_count {
            interfaces.push(r.u16()?);
        }

        let fields = Self::parse_members(&mut r)?;
        let methods = Self::parse_members(&mut r)?;
        let attributes = Self::parse_attributes(&mut r)?;

        if !r.is_at_end() {
            return Err(Error::malformed(
                format!("{} trailing bytes after class attributes", r.remaining()),
                r.position(),
            ));
        }

        // The class reference must resolve, otherwise nothing downstream can
        // name this class.
        let cf = Self {
            minor_version,
            major_version,
            pool,
            access_flags,
            this_class,
            super_class,
            interfaces,
            fields,
            methods,
            attributes,
        };
        cf.pool.class_name(cf.this_class)?;
        if cf.super_class != 0 {
            cf.pool.class_name(cf.super_class)?;
        }
        Ok(cf)
    }

    fn parse_members(r: &mut ByteReader<'_>) -> Result<Vec<MemberInfo>> {
        let count = r.u16()?;
        let mut members = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let access_flags = r.u16()?;
            let name_index = r.u16()?;
            let descriptor_index = r.u16()?;
            let attributes = Self::parse_attributes(r)?;
            members.push(MemberInfo {
                access_flags,
                name_index,
                descriptor_index,
                attributes,
            });
        }
        Ok(members)
    }

    fn parse_attributes(r: &mut ByteReader<'_>) -> Result<Vec<AttributeInfo>> {
        let count = r.u16()?;
        let mut attributes = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let name_index = r.u16()?;
            let length = r.u32()? as usize;
            let info = r.bytes(length)?.to_vec();
            attributes.push(AttributeInfo { name_index, info });
        }
        Ok(attributes)
    }

    /// Internal name of this class.
    ///
    /// # Errors
    /// Fails if the pool reference is inconsistent.
    pub fn this_class_name(&self) -> Result<&str> {
        self.pool.class_name(self.this_class)
    }

    /// Internal name of the super class, or `None` at the root.
    ///
    /// # Errors
    /// Fails if the pool reference is inconsistent.
    pub fn super_class_name(&self) -> Result<Option<&str>> {
        if self.super_class == 0 {
            Ok(None)
        } else {
            self.pool.class_name(self.super_class).map(Some)
        }
    }
}

impl MemberInfo {
    /// Member name, resolved through the pool.
    ///
    /// # Errors
    /// Fails if the pool reference is inconsistent.
    pub fn name<'a>(&self, pool: &'a ConstantPool) -> Result<&'a str> {
        pool.utf8(self.name_index)
    }

    /// Member descriptor, resolved through the pool.
    ///
    /// # Errors
    /// Fails if the pool reference is inconsistent.
    pub fn descriptor<'a>(&self, pool: &'a ConstantPool) -> Result<&'a str> {
        pool.utf8(self.descriptor_index)
    }

    /// Returns true if the `static` flag is set.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.access_flags & ACC_STATIC != 0
    }

    /// Returns true if the `public` flag is set.
    #[must_use]
    pub fn is_public(&self) -> bool {
        self.access_flags & ACC_PUBLIC != 0
    }

    /// Decodes this member's `Code` attribute, if present.
    ///
    /// Nested attributes inside `Code` (line numbers, stack-map frames) are
    /// skipped, not preserved.
    ///
    /// # Errors
    /// Fails if the attribute payload is truncated.
    pub fn code(&self, pool: &ConstantPool) -> Result<Option<Code>> {
        for attribute in &self.attributes {
            if pool.utf8(attribute.name_index)? != "Code" {
                continue;
            }
            let mut r = ByteReader::new(&attribute.info);
            let max_stack = r.u16()?;
            let max_locals = r.u16()?;
            let code_length = r.u32()? as usize;
            let bytecode = r.bytes(code_length)?.to_vec();
            let handler_count = r.u16()?;
            let mut exception_table = Vec::with_capacity(handler_count as usize);
            for _ in 0..handler_count {
                exception_table.push(ExceptionHandler {
                    start_pc: r.u16()?,
                    end_pc: r.u16()?,
                    handler_pc: r.u16()?,
                    catch_type: r.u16()?,
                });
            }
            return Ok(Some(Code {
                max_stack,
                max_locals,
                bytecode,
                exception_table,
            }));
        }
        Ok(None)
    }
}
