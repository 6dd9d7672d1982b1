//! Runtime views over parsed class files.
//!
//! A [`LoadedClass`] resolves the member names, descriptors, and code bodies
//! of a parsed container once, up front, so the interpreter never touches
//! pool indices for its own members during execution. The constant pool is
//! retained for operand resolution (`ldc`, member references).

use std::rc::Rc;

use classbox_classfile::{ClassFile, Code, ConstantPool};
use classbox_foundation::{Error, Result};

/// Name of the conventional entry point.
pub const ENTRY_NAME: &str = "main";
/// Descriptor of the conventional entry point: one string-array parameter,
/// void return.
pub const ENTRY_DESCRIPTOR: &str = "([Ljava/lang/String;)V";

/// A field declaration.
#[derive(Clone, Debug)]
pub struct FieldDecl {
    /// Field name.
    pub name: String,
    /// Field descriptor.
    pub descriptor: String,
    /// Access flags.
    pub access_flags: u16,
}

impl FieldDecl {
    /// Returns true if the `static` flag is set.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.access_flags & classbox_classfile::ACC_STATIC != 0
    }
}

/// A method declaration with its resolved body.
#[derive(Clone, Debug)]
pub struct Method {
    /// Method name.
    pub name: String,
    /// Method descriptor.
    pub descriptor: String,
    /// Access flags.
    pub access_flags: u16,
    /// Decoded body; `None` for abstract and native methods.
    pub code: Option<Rc<Code>>,
}

impl Method {
    /// Returns true if the `static` flag is set.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.access_flags & classbox_classfile::ACC_STATIC != 0
    }

    /// Returns true if the `public` flag is set.
    #[must_use]
    pub fn is_public(&self) -> bool {
        self.access_flags & classbox_classfile::ACC_PUBLIC != 0
    }
}

/// One class admitted into an execution context.
#[derive(Clone, Debug)]
pub struct LoadedClass {
    name: String,
    super_name: Option<String>,
    fields: Vec<FieldDecl>,
    methods: Vec<Method>,
    pool: ConstantPool,
}

impl LoadedClass {
    /// Resolves a parsed class file into a runtime view.
    ///
    /// # Errors
    /// Fails if any member name or descriptor does not resolve through the
    /// constant pool.
    pub fn from_class_file(cf: ClassFile) -> Result<Self> {
        let name = cf.this_class_name()?.to_string();
        let super_name = cf.super_class_name()?.map(str::to_string);

        let mut fields = Vec::with_capacity(cf.fields.len());
        for field in &cf.fields {
            fields.push(FieldDecl {
                name: field.name(&cf.pool)?.to_string(),
                descriptor: field.descriptor(&cf.pool)?.to_string(),
                access_flags: field.access_flags,
            });
        }

        let mut methods = Vec::with_capacity(cf.methods.len());
        for method in &cf.methods {
            methods.push(Method {
                name: method.name(&cf.pool)?.to_string(),
                descriptor: method.descriptor(&cf.pool)?.to_string(),
                access_flags: method.access_flags,
                code: method.code(&cf.pool)?.map(Rc::new),
            });
        }

        Ok(Self {
            name,
            super_name,
            fields,
            methods,
            pool: cf.pool,
        })
    }

    /// Internal name of this class.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Internal name of the super class, or `None` at the root.
    #[must_use]
    pub fn super_name(&self) -> Option<&str> {
        self.super_name.as_deref()
    }

    /// The constant pool, for operand resolution.
    #[must_use]
    pub fn pool(&self) -> &ConstantPool {
        &self.pool
    }

    /// Looks up a method by name and descriptor.
    #[must_use]
    pub fn method(&self, name: &str, descriptor: &str) -> Option<&Method> {
        self.methods
            .iter()
            .find(|m| m.name == name && m.descriptor == descriptor)
    }

    /// Looks up a field declaration by name.
    #[must_use]
    pub fn field_decl(&self, name: &str) -> Option<&FieldDecl> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Locates the conventional entry point.
    ///
    /// # Errors
    /// Returns an entry-point error when no method is named `main`, when the
    /// signature differs from the fixed contract, or when the method is not
    /// `public static` with a body.
    pub fn entry_point(&self) -> Result<&Method> {
        let named: Vec<&Method> = self
            .methods
            .iter()
            .filter(|m| m.name == ENTRY_NAME)
            .collect();
        if named.is_empty() {
            return Err(Error::entry_point(&self.name, "no method named main"));
        }
        let Some(method) = named.iter().find(|m| m.descriptor == ENTRY_DESCRIPTOR) else {
            return Err(Error::entry_point(
                &self.name,
                format!(
                    "main has the wrong signature (found {})",
                    named[0].descriptor
                ),
            ));
        };
        if !method.is_public() {
            return Err(Error::entry_point(&self.name, "main is not public"));
        }
        if !method.is_static() {
            return Err(Error::entry_point(&self.name, "main is not static"));
        }
        if method.code.is_none() {
            return Err(Error::entry_point(&self.name, "main has no body"));
        }
        Ok(method)
    }
}

/// A parameter or return kind, reduced to slot shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TypeKind {
    /// `boolean`, `byte`, `char`, `short`, `int`.
    Int,
    /// `long`.
    Long,
    /// `float`.
    Float,
    /// `double`.
    Double,
    /// Any object or array reference.
    Reference,
}

/// Parses a method descriptor into parameter kinds and a return kind
/// (`None` for void).
///
/// # Errors
/// Fails on malformed descriptors.
pub fn parse_method_descriptor(descriptor: &str) -> Result<(Vec<TypeKind>, Option<TypeKind>)> {
    let bytes = descriptor.as_bytes();
    if bytes.first() != Some(&b'(') {
        return Err(bad_descriptor(descriptor));
    }
    let mut params = Vec::new();
    let mut i = 1;
    while i < bytes.len() && bytes[i] != b')' {
        let (kind, next) = parse_field_type(bytes, i).ok_or_else(|| bad_descriptor(descriptor))?;
        params.push(kind);
        i = next;
    }
    if i >= bytes.len() {
        return Err(bad_descriptor(descriptor));
    }
    i += 1; // ')'
    let ret = match bytes.get(i) {
        Some(b'V') if i + 1 == bytes.len() => None,
        Some(_) => {
            let (kind, next) =
                parse_field_type(bytes, i).ok_or_else(|| bad_descriptor(descriptor))?;
            if next != bytes.len() {
                return Err(bad_descriptor(descriptor));
            }
            Some(kind)
        }
        None => return Err(bad_descriptor(descriptor)),
    };
    Ok((params, ret))
}

fn parse_field_type(bytes: &[u8], at: usize) -> Option<(TypeKind, usize)> {
    match bytes.get(at)? {
        b'B' | b'C' | b'S' | b'Z' | b'I' => Some((TypeKind::Int, at + 1)),
        b'J' => Some((TypeKind::Long, at + 1)),
        b'F' => Some((TypeKind::Float, at + 1)),
        b'D' => Some((TypeKind::Double, at + 1)),
        b'L' => {
            let end = bytes[at..].iter().position(|b| *b == b';')?;
            Some((TypeKind::Reference, at + end + 1))
        }
        b'[' => {
            let (_, next) = parse_field_type(bytes, at + 1)?;
            Some((TypeKind::Reference, next))
        }
        _ => None,
    }
}

fn bad_descriptor(descriptor: &str) -> Error {
    Error::load(format!("malformed method descriptor {descriptor}"))
}
