//! Interpreter value model.
//!
//! One [`Value`] occupies one operand-stack or local slot. References are
//! cheap clones: strings share their backing storage, builders and
//! throwables are shared cells so aliased references observe mutation.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use classbox_foundation::to_dotted_name;

use crate::sink::ConsoleHandle;

/// A single interpreter value.
#[derive(Clone, Debug)]
pub enum Value {
    /// The null reference.
    Null,
    /// 32-bit integer (also carries `boolean`, `byte`, `short`, `char`).
    Int(i32),
    /// 64-bit integer.
    Long(i64),
    /// 32-bit float.
    Float(f32),
    /// 64-bit float.
    Double(f64),
    /// Immutable string.
    Str(Rc<str>),
    /// The capture stream standing in for a print stream.
    Stream(ConsoleHandle),
    /// A string builder.
    Builder(Rc<RefCell<String>>),
    /// A throwable object.
    Throwable(Rc<Throwable>),
}

impl Value {
    /// Creates a string value.
    #[must_use]
    pub fn string(text: impl AsRef<str>) -> Self {
        Self::Str(Rc::from(text.as_ref()))
    }

    /// Short type name for diagnostics.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Int(_) => "int",
            Self::Long(_) => "long",
            Self::Float(_) => "float",
            Self::Double(_) => "double",
            Self::Str(_) => "string",
            Self::Stream(_) => "stream",
            Self::Builder(_) => "string-builder",
            Self::Throwable(_) => "throwable",
        }
    }

    /// The default value for a field descriptor (zero or null).
    #[must_use]
    pub fn default_for_descriptor(descriptor: &str) -> Self {
        match descriptor.as_bytes().first() {
            Some(b'B' | b'C' | b'S' | b'Z' | b'I') => Self::Int(0),
            Some(b'J') => Self::Long(0),
            Some(b'F') => Self::Float(0.0),
            Some(b'D') => Self::Double(0.0),
            _ => Self::Null,
        }
    }
}

impl fmt::Display for Value {
    /// Renders the way console printing renders: `null` for the null
    /// reference, raw content for strings and builders.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Long(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::Str(s) => write!(f, "{s}"),
            Self::Stream(_) => write!(f, "java.io.PrintStream"),
            Self::Builder(b) => write!(f, "{}", b.borrow()),
            Self::Throwable(t) => write!(f, "{t}"),
        }
    }
}

/// A throwable object: a class name plus an optional message.
///
/// The message lives in a cell because construction happens in two steps
/// (`new` allocates, `<init>` fills in the message).
#[derive(Debug)]
pub struct Throwable {
    class_name: String,
    message: RefCell<Option<String>>,
}

impl Throwable {
    /// Allocates a throwable with no message yet.
    #[must_use]
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            message: RefCell::new(None),
        }
    }

    /// Allocates a throwable with a message.
    #[must_use]
    pub fn with_message(class_name: impl Into<String>, message: impl Into<String>) -> Self {
        let t = Self::new(class_name);
        t.set_message(Some(message.into()));
        t
    }

    /// Internal name of the throwable's class.
    #[must_use]
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// The detail message, if set.
    #[must_use]
    pub fn message(&self) -> Option<String> {
        self.message.borrow().clone()
    }

    /// Sets or clears the detail message.
    pub fn set_message(&self, message: Option<String>) {
        *self.message.borrow_mut() = message;
    }
}

impl fmt::Display for Throwable {
    /// `java.lang.RuntimeException: boom`, or just the class name when no
    /// message is set.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", to_dotted_name(&self.class_name))?;
        if let Some(message) = self.message.borrow().as_deref() {
            write!(f, ": {message}")?;
        }
        Ok(())
    }
}
