//! Bytecode interpreter driving one sandboxed execution.
//!
//! The interpreter owns a fresh [`ExecutionContext`] per instance and writes
//! all console traffic through the [`ConsoleHandle`] it was created with.
//! Everything a unit may touch resolves either to its own context (classes
//! it loaded, their statics) or to a small set of builtin receivers (the
//! capture stream, string builders, throwables). References to host classes
//! the VM does not supply fail with typed invocation errors; nothing ever
//! reaches the process's real console.
//!
//! Thrown exceptions unwind through each frame's exception table; an
//! uncaught throwable is rendered as a `Exception in thread "main"` trace
//! into the capture buffer before the typed failure propagates.

#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::too_many_lines)]

use std::cell::RefCell;
use std::rc::Rc;

use classbox_classfile::{ClassFile, Code, Constant, opcode};
use classbox_foundation::{Error, ErrorKind, ExecutionLimit, Result, to_dotted_name};

use crate::class::{ENTRY_DESCRIPTOR, ENTRY_NAME, LoadedClass, parse_method_descriptor};
use crate::context::ExecutionContext;
use crate::sink::ConsoleHandle;
use crate::value::{Throwable, Value};

/// Default bound on the interpreter call depth.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 256;

/// How far a super-class chain is followed before giving up. Guards against
/// containers declaring cyclic hierarchies.
const SUPER_CHAIN_LIMIT: usize = 64;

/// In-flight failure: either a throwable unwinding towards a handler, or a
/// hard fault that aborts the execution.
enum Raised {
    Thrown {
        throwable: Rc<Throwable>,
        frames: Vec<String>,
    },
    Fault(Error),
}

impl From<Error> for Raised {
    fn from(error: Error) -> Self {
        Self::Fault(error)
    }
}

type Exec<T> = std::result::Result<T, Raised>;

fn fault(message: impl Into<String>) -> Raised {
    Raised::Fault(Error::invocation(message, String::new()))
}

enum Control {
    Next,
    Return(Option<Value>),
}

/// The bytecode interpreter for one execution.
pub struct Interpreter {
    context: ExecutionContext,
    console: ConsoleHandle,
    console_class: String,
    max_call_depth: usize,
    instruction_budget: Option<u64>,
    executed: u64,
    /// Call chain as `Dotted.method` labels, outermost first.
    frames: Vec<String>,
}

impl Interpreter {
    /// Creates an interpreter writing console traffic through `console`,
    /// with a fresh, empty context.
    #[must_use]
    pub fn new(console: ConsoleHandle) -> Self {
        Self {
            context: ExecutionContext::new(),
            console,
            console_class: crate::sink::CONSOLE_CLASS.to_string(),
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            instruction_budget: None,
            executed: 0,
            frames: Vec::new(),
        }
    }

    /// Overrides the internal name whose `out`/`err` fields resolve to the
    /// capture stream.
    pub fn set_console_class(&mut self, name: impl Into<String>) {
        self.console_class = name.into();
    }

    /// Overrides the call-depth bound.
    pub fn set_max_call_depth(&mut self, limit: usize) {
        self.max_call_depth = limit;
    }

    /// Sets or clears the opt-in instruction budget.
    pub fn set_instruction_budget(&mut self, limit: Option<u64>) {
        self.instruction_budget = limit;
    }

    /// The execution context.
    #[must_use]
    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    /// Instructions executed so far across all frames.
    #[must_use]
    pub fn instructions_executed(&self) -> u64 {
        self.executed
    }

    /// Parses a container and admits it into this interpreter's context.
    ///
    /// # Errors
    /// Returns malformed-class errors for unparseable containers and load
    /// errors for duplicate definitions.
    pub fn load(&mut self, bytes: &[u8]) -> Result<Rc<LoadedClass>> {
        let cf = ClassFile::parse(bytes)?;
        let class = LoadedClass::from_class_file(cf)?;
        self.context.define(class)
    }

    /// Locates and invokes the entry point of a loaded class.
    ///
    /// The entry point is invoked with a null argument array. On failure the
    /// diagnostic trace is written to the capture buffer first, and the
    /// invocation error carries everything captured.
    ///
    /// # Errors
    /// Entry-point errors for a missing or mis-shaped `main`; invocation
    /// errors for runtime failures; limit errors when the instruction budget
    /// runs out.
    pub fn run_main(&mut self, class: &Rc<LoadedClass>) -> Result<()> {
        class.entry_point()?;
        match self.call_static(class, ENTRY_NAME, ENTRY_DESCRIPTOR, vec![Value::Null]) {
            Ok(_) => Ok(()),
            Err(raised) => Err(self.raised_to_error(raised)),
        }
    }

    fn raised_to_error(&mut self, raised: Raised) -> Error {
        match raised {
            Raised::Thrown { throwable, frames } => {
                let mut trace = format!("Exception in thread \"main\" {throwable}\n");
                for frame in frames.iter().rev() {
                    trace.push_str(&format!("\tat {frame}(Unknown Source)\n"));
                }
                self.console.write_str(&trace);
                Error::invocation(
                    format!("uncaught exception: {throwable}"),
                    self.console.drain_to_string(),
                )
            }
            Raised::Fault(error) => match error.kind {
                ErrorKind::Invocation { message, .. } => {
                    self.console.write_str(&format!("classbox: {message}\n"));
                    Error::invocation(message, self.console.drain_to_string())
                }
                kind => Error::new(kind),
            },
        }
    }

    fn call_static(
        &mut self,
        class: &Rc<LoadedClass>,
        name: &str,
        descriptor: &str,
        args: Vec<Value>,
    ) -> Exec<Option<Value>> {
        self.ensure_initialized(class)?;
        let (is_static, code) = match class.method(name, descriptor) {
            Some(method) => (method.is_static(), method.code.clone()),
            None => {
                return Err(fault(format!(
                    "unresolved method {}.{name}{descriptor}",
                    class.name()
                )));
            }
        };
        if !is_static {
            return Err(fault(format!(
                "method {}.{name} is not static",
                class.name()
            )));
        }
        let Some(code) = code else {
            return Err(fault(format!(
                "method {}.{name} has no body",
                class.name()
            )));
        };
        self.run_method(class, name, &code, args)
    }

    fn run_method(
        &mut self,
        class: &Rc<LoadedClass>,
        method_name: &str,
        code: &Code,
        args: Vec<Value>,
    ) -> Exec<Option<Value>> {
        if self.frames.len() >= self.max_call_depth {
            return Err(self.throw("java/lang/StackOverflowError", None));
        }
        let mut locals = vec![Value::Null; (code.max_locals as usize).max(args.len())];
        for (slot, arg) in args.into_iter().enumerate() {
            locals[slot] = arg;
        }
        self.frames
            .push(format!("{}.{method_name}", to_dotted_name(class.name())));
        let result = self.exec_frame(class, code, &mut locals);
        self.frames.pop();
        result
    }

    fn exec_frame(
        &mut self,
        class: &Rc<LoadedClass>,
        code: &Code,
        locals: &mut [Value],
    ) -> Exec<Option<Value>> {
        let mut stack: Vec<Value> = Vec::with_capacity(code.max_stack as usize);
        let mut pc: usize = 0;
        loop {
            if pc >= code.bytecode.len() {
                return Err(fault("execution fell off the end of the bytecode"));
            }
            if let Some(limit) = self.instruction_budget {
                if self.executed >= limit {
                    return Err(Raised::Fault(Error::limit_exceeded(
                        ExecutionLimit::MaxInstructions { limit },
                    )));
                }
            }
            self.executed += 1;
            let op_pc = pc;
            match self.execute_op(class, code, locals, &mut stack, &mut pc) {
                Ok(Control::Next) => {}
                Ok(Control::Return(value)) => return Ok(value),
                Err(Raised::Thrown { throwable, frames }) => {
                    match self.find_handler(class, code, op_pc, &throwable)? {
                        Some(handler_pc) => {
                            stack.clear();
                            stack.push(Value::Throwable(Rc::clone(&throwable)));
                            pc = handler_pc;
                        }
                        None => return Err(Raised::Thrown { throwable, frames }),
                    }
                }
                Err(other) => return Err(other),
            }
        }
    }

    fn find_handler(
        &self,
        class: &Rc<LoadedClass>,
        code: &Code,
        at_pc: usize,
        throwable: &Rc<Throwable>,
    ) -> Exec<Option<usize>> {
        for handler in &code.exception_table {
            if at_pc < handler.start_pc as usize || at_pc >= handler.end_pc as usize {
                continue;
            }
            if handler.catch_type == 0 {
                return Ok(Some(handler.handler_pc as usize));
            }
            let catch_name = class.pool().class_name(handler.catch_type)?;
            if self.is_assignable(throwable.class_name(), catch_name) {
                return Ok(Some(handler.handler_pc as usize));
            }
        }
        Ok(None)
    }

    fn execute_op(
        &mut self,
        class: &Rc<LoadedClass>,
        code: &Code,
        locals: &mut [Value],
        stack: &mut Vec<Value>,
        pc: &mut usize,
    ) -> Exec<Control> {
        let op_pc = *pc;
        let op = code.bytecode[*pc];
        *pc += 1;
        match op {
            opcode::NOP => {}
            opcode::ACONST_NULL => stack.push(Value::Null),
            opcode::ICONST_M1..=opcode::ICONST_5 => {
                stack.push(Value::Int(i32::from(op) - i32::from(opcode::ICONST_0)));
            }
            opcode::LCONST_0 => stack.push(Value::Long(0)),
            opcode::LCONST_1 => stack.push(Value::Long(1)),
            opcode::BIPUSH => {
                let v = read_u8(code, pc)? as i8;
                stack.push(Value::Int(i32::from(v)));
            }
            opcode::SIPUSH => {
                let v = read_u16(code, pc)? as i16;
                stack.push(Value::Int(i32::from(v)));
            }
            opcode::LDC => {
                let index = u16::from(read_u8(code, pc)?);
                stack.push(ldc_value(class, index)?);
            }
            opcode::LDC_W => {
                let index = read_u16(code, pc)?;
                stack.push(ldc_value(class, index)?);
            }
            opcode::LDC2_W => {
                let index = read_u16(code, pc)?;
                stack.push(ldc2_value(class, index)?);
            }
            opcode::ILOAD | opcode::ALOAD => {
                let slot = read_u8(code, pc)? as usize;
                stack.push(load_local(locals, slot)?);
            }
            opcode::ILOAD_0..=opcode::ILOAD_3 => {
                let slot = (op - opcode::ILOAD_0) as usize;
                stack.push(load_local(locals, slot)?);
            }
            opcode::ALOAD_0..=opcode::ALOAD_3 => {
                let slot = (op - opcode::ALOAD_0) as usize;
                stack.push(load_local(locals, slot)?);
            }
            opcode::ISTORE | opcode::ASTORE => {
                let slot = read_u8(code, pc)? as usize;
                let value = pop(stack)?;
                store_local(locals, slot, value)?;
            }
            opcode::ISTORE_0..=opcode::ISTORE_3 => {
                let slot = (op - opcode::ISTORE_0) as usize;
                let value = pop(stack)?;
                store_local(locals, slot, value)?;
            }
            opcode::ASTORE_0..=opcode::ASTORE_3 => {
                let slot = (op - opcode::ASTORE_0) as usize;
                let value = pop(stack)?;
                store_local(locals, slot, value)?;
            }
            opcode::POP => {
                pop(stack)?;
            }
            opcode::DUP => {
                let top = stack
                    .last()
                    .cloned()
                    .ok_or_else(|| fault("operand stack underflow"))?;
                stack.push(top);
            }
            opcode::SWAP => {
                let b = pop(stack)?;
                let a = pop(stack)?;
                stack.push(b);
                stack.push(a);
            }
            opcode::IADD | opcode::ISUB | opcode::IMUL => {
                let b = pop_int(stack)?;
                let a = pop_int(stack)?;
                let v = match op {
                    opcode::IADD => a.wrapping_add(b),
                    opcode::ISUB => a.wrapping_sub(b),
                    _ => a.wrapping_mul(b),
                };
                stack.push(Value::Int(v));
            }
            opcode::IDIV | opcode::IREM => {
                let b = pop_int(stack)?;
                let a = pop_int(stack)?;
                if b == 0 {
                    return Err(self.throw("java/lang/ArithmeticException", Some("/ by zero")));
                }
                let v = if op == opcode::IDIV {
                    a.wrapping_div(b)
                } else {
                    a.wrapping_rem(b)
                };
                stack.push(Value::Int(v));
            }
            opcode::INEG => {
                let a = pop_int(stack)?;
                stack.push(Value::Int(a.wrapping_neg()));
            }
            opcode::IINC => {
                let slot = read_u8(code, pc)? as usize;
                let delta = read_u8(code, pc)? as i8;
                match locals.get_mut(slot) {
                    Some(Value::Int(v)) => *v = v.wrapping_add(i32::from(delta)),
                    Some(other) => {
                        return Err(fault(format!(
                            "iinc on non-int local ({})",
                            other.type_name()
                        )));
                    }
                    None => return Err(fault(format!("local slot {slot} out of range"))),
                }
            }
            opcode::IFEQ..=opcode::IFLE => {
                let offset = read_u16(code, pc)? as i16;
                let v = pop_int(stack)?;
                let jump = match op {
                    opcode::IFEQ => v == 0,
                    opcode::IFNE => v != 0,
                    opcode::IFLT => v < 0,
                    opcode::IFGE => v >= 0,
                    opcode::IFGT => v > 0,
                    _ => v <= 0,
                };
                if jump {
                    *pc = branch_target(code, op_pc, offset)?;
                }
            }
            opcode::IF_ICMPEQ..=opcode::IF_ICMPLE => {
                let offset = read_u16(code, pc)? as i16;
                let b = pop_int(stack)?;
                let a = pop_int(stack)?;
                let jump = match op {
                    opcode::IF_ICMPEQ => a == b,
                    opcode::IF_ICMPNE => a != b,
                    opcode::IF_ICMPLT => a < b,
                    opcode::IF_ICMPGE => a >= b,
                    opcode::IF_ICMPGT => a > b,
                    _ => a <= b,
                };
                if jump {
                    *pc = branch_target(code, op_pc, offset)?;
                }
            }
            opcode::IFNULL | opcode::IFNONNULL => {
                let offset = read_u16(code, pc)? as i16;
                let is_null = matches!(pop(stack)?, Value::Null);
                if is_null == (op == opcode::IFNULL) {
                    *pc = branch_target(code, op_pc, offset)?;
                }
            }
            opcode::GOTO => {
                let offset = read_u16(code, pc)? as i16;
                *pc = branch_target(code, op_pc, offset)?;
            }
            opcode::IRETURN | opcode::LRETURN | opcode::ARETURN => {
                let value = pop(stack)?;
                return Ok(Control::Return(Some(value)));
            }
            opcode::RETURN => return Ok(Control::Return(None)),
            opcode::GETSTATIC => {
                let index = read_u16(code, pc)?;
                let (owner, field, _descriptor) = member_strings(class, index)?;
                if owner == self.console_class {
                    match field.as_str() {
                        "out" | "err" => stack.push(Value::Stream(self.console.clone())),
                        _ => return Err(fault(format!("unknown console field {field}"))),
                    }
                } else if let Some(target) = self.context.get(&owner) {
                    self.ensure_initialized(&target)?;
                    let value = match self.context.get_static(&owner, &field) {
                        Some(value) => value,
                        None => match target.field_decl(&field) {
                            Some(decl) => Value::default_for_descriptor(&decl.descriptor),
                            None => {
                                return Err(fault(format!("unresolved field {owner}.{field}")));
                            }
                        },
                    };
                    stack.push(value);
                } else {
                    return Err(fault(format!("unresolved host class {owner}")));
                }
            }
            opcode::PUTSTATIC => {
                let index = read_u16(code, pc)?;
                let (owner, field, _descriptor) = member_strings(class, index)?;
                let value = pop(stack)?;
                if owner == self.console_class {
                    return Err(fault(format!("console field {field} is read-only")));
                }
                let Some(target) = self.context.get(&owner) else {
                    return Err(fault(format!("unresolved host class {owner}")));
                };
                self.ensure_initialized(&target)?;
                match target.field_decl(&field) {
                    Some(decl) if decl.is_static() => {
                        self.context.set_static(&owner, &field, value);
                    }
                    Some(_) => {
                        return Err(fault(format!("field {owner}.{field} is not static")));
                    }
                    None => return Err(fault(format!("unresolved field {owner}.{field}"))),
                }
            }
            opcode::INVOKEVIRTUAL => {
                let index = read_u16(code, pc)?;
                let (_owner, name, descriptor) = member_strings(class, index)?;
                let (params, _) = parse_method_descriptor(&descriptor)?;
                let mut args = Vec::with_capacity(params.len());
                for _ in &params {
                    args.push(pop(stack)?);
                }
                args.reverse();
                let receiver = pop(stack)?;
                if let Some(value) = self.dispatch_virtual(receiver, &name, &descriptor, args)? {
                    stack.push(value);
                }
            }
            opcode::INVOKESPECIAL => {
                let index = read_u16(code, pc)?;
                let (_owner, name, descriptor) = member_strings(class, index)?;
                if name != "<init>" {
                    return Err(fault("invokespecial is limited to constructors"));
                }
                let (params, _) = parse_method_descriptor(&descriptor)?;
                let mut args = Vec::with_capacity(params.len());
                for _ in &params {
                    args.push(pop(stack)?);
                }
                args.reverse();
                let receiver = pop(stack)?;
                construct(&receiver, &descriptor, &args)?;
            }
            opcode::INVOKESTATIC => {
                let index = read_u16(code, pc)?;
                let (owner, name, descriptor) = member_strings(class, index)?;
                let Some(target) = self.context.get(&owner) else {
                    return Err(fault(format!("unresolved host method {owner}.{name}")));
                };
                let (params, _) = parse_method_descriptor(&descriptor)?;
                let mut args = Vec::with_capacity(params.len());
                for _ in &params {
                    args.push(pop(stack)?);
                }
                args.reverse();
                if let Some(value) = self.call_static(&target, &name, &descriptor, args)? {
                    stack.push(value);
                }
            }
            opcode::NEW => {
                let index = read_u16(code, pc)?;
                let name = class.pool().class_name(index)?.to_string();
                if name == "java/lang/StringBuilder" {
                    stack.push(Value::Builder(Rc::new(RefCell::new(String::new()))));
                } else if self.is_throwable_class(&name) {
                    stack.push(Value::Throwable(Rc::new(Throwable::new(name))));
                } else if self.context.contains(&name) {
                    return Err(fault(
                        "object instantiation is limited to builtin and throwable classes",
                    ));
                } else {
                    return Err(fault(format!("unresolved host class {name}")));
                }
            }
            opcode::ATHROW => match pop(stack)? {
                Value::Throwable(throwable) => {
                    return Err(Raised::Thrown {
                        throwable,
                        frames: self.frames.clone(),
                    });
                }
                Value::Null => {
                    return Err(self.throw("java/lang/NullPointerException", Some("athrow on null")));
                }
                other => {
                    return Err(fault(format!(
                        "athrow on non-throwable ({})",
                        other.type_name()
                    )));
                }
            },
            other => {
                return Err(fault(format!(
                    "unsupported instruction {} (0x{other:02x})",
                    opcode::mnemonic(other)
                )));
            }
        }
        Ok(Control::Next)
    }

    fn dispatch_virtual(
        &mut self,
        receiver: Value,
        name: &str,
        descriptor: &str,
        args: Vec<Value>,
    ) -> Exec<Option<Value>> {
        match receiver {
            Value::Stream(handle) => stream_method(&handle, name, descriptor, &args),
            Value::Builder(cell) => builder_method(&cell, name, descriptor, &args),
            Value::Str(s) => string_method(&s, name, descriptor, &args),
            Value::Throwable(t) => throwable_method(&t, name, descriptor),
            Value::Null => Err(self.throw(
                "java/lang/NullPointerException",
                Some(&format!("cannot invoke {name} on a null reference")),
            )),
            other => Err(fault(format!(
                "invokevirtual on unsupported receiver ({})",
                other.type_name()
            ))),
        }
    }

    fn ensure_initialized(&mut self, class: &Rc<LoadedClass>) -> Exec<()> {
        if !self.context.begin_initialization(class.name()) {
            return Ok(());
        }
        if let Some(super_name) = class.super_name().map(str::to_string) {
            if let Some(superclass) = self.context.get(&super_name) {
                self.ensure_initialized(&superclass)?;
            }
        }
        let clinit = class
            .method("<clinit>", "()V")
            .and_then(|m| m.code.clone());
        if let Some(code) = clinit {
            self.run_method(class, "<clinit>", &code, Vec::new())?;
        }
        self.context.finish_initialization(class.name());
        Ok(())
    }

    fn throw(&self, class_name: &str, message: Option<&str>) -> Raised {
        let throwable = match message {
            Some(message) => Throwable::with_message(class_name, message),
            None => Throwable::new(class_name),
        };
        Raised::Thrown {
            throwable: Rc::new(throwable),
            frames: self.frames.clone(),
        }
    }

    fn superclass_of(&self, name: &str) -> Option<String> {
        if let Some(builtin) = builtin_superclass(name) {
            return Some(builtin.to_string());
        }
        self.context
            .get(name)
            .and_then(|class| class.super_name().map(str::to_string))
    }

    fn is_assignable(&self, thrown: &str, target: &str) -> bool {
        let mut current = thrown.to_string();
        for _ in 0..SUPER_CHAIN_LIMIT {
            if current == target {
                return true;
            }
            match self.superclass_of(&current) {
                Some(superclass) => current = superclass,
                None => return false,
            }
        }
        false
    }

    fn is_throwable_class(&self, name: &str) -> bool {
        self.is_assignable(name, "java/lang/Throwable")
    }
}

fn stream_method(
    handle: &ConsoleHandle,
    name: &str,
    descriptor: &str,
    args: &[Value],
) -> Exec<Option<Value>> {
    let newline = match name {
        "println" => true,
        "print" => false,
        "flush" if descriptor == "()V" => return Ok(None),
        _ => {
            return Err(fault(format!(
                "unsupported stream method {name}{descriptor}"
            )));
        }
    };
    let text = match descriptor {
        "()V" if newline => String::new(),
        "(Ljava/lang/String;)V" | "(Ljava/lang/Object;)V" => render_reference(&args[0]),
        "(I)V" => pop_arg_int(args)?.to_string(),
        "(J)V" => match &args[0] {
            Value::Long(v) => v.to_string(),
            other => return Err(type_fault("long", other)),
        },
        "(Z)V" => {
            let v = pop_arg_int(args)?;
            if v == 0 { "false" } else { "true" }.to_string()
        }
        "(C)V" => {
            let v = pop_arg_int(args)?;
            char::from_u32(v as u32).unwrap_or('\u{FFFD}').to_string()
        }
        _ => {
            return Err(fault(format!(
                "unsupported stream method {name}{descriptor}"
            )));
        }
    };
    if newline {
        handle.write_line(&text);
    } else {
        handle.write_str(&text);
    }
    Ok(None)
}

fn construct(receiver: &Value, descriptor: &str, args: &[Value]) -> Exec<()> {
    match receiver {
        Value::Builder(cell) => match descriptor {
            "()V" => Ok(()),
            "(Ljava/lang/String;)V" => {
                *cell.borrow_mut() = render_reference(&args[0]);
                Ok(())
            }
            _ => Err(fault(format!(
                "unsupported string builder constructor {descriptor}"
            ))),
        },
        Value::Throwable(t) => match descriptor {
            "()V" => Ok(()),
            "(Ljava/lang/String;)V" => {
                let message = match &args[0] {
                    Value::Null => None,
                    other => Some(render_reference(other)),
                };
                t.set_message(message);
                Ok(())
            }
            _ => Err(fault(format!(
                "unsupported throwable constructor {descriptor}"
            ))),
        },
        other => Err(fault(format!(
            "invokespecial on unsupported receiver ({})",
            other.type_name()
        ))),
    }
}

fn builtin_superclass(name: &str) -> Option<&'static str> {
    match name {
        "java/lang/Exception" | "java/lang/Error" => Some("java/lang/Throwable"),
        "java/lang/RuntimeException" => Some("java/lang/Exception"),
        "java/lang/ArithmeticException"
        | "java/lang/NullPointerException"
        | "java/lang/IllegalArgumentException"
        | "java/lang/IllegalStateException"
        | "java/lang/UnsupportedOperationException" => Some("java/lang/RuntimeException"),
        "java/lang/VirtualMachineError" => Some("java/lang/Error"),
        "java/lang/StackOverflowError" => Some("java/lang/VirtualMachineError"),
        "java/lang/Throwable" => Some("java/lang/Object"),
        _ => None,
    }
}

fn builder_method(
    cell: &Rc<RefCell<String>>,
    name: &str,
    descriptor: &str,
    args: &[Value],
) -> Exec<Option<Value>> {
    match (name, descriptor) {
        ("append", "(Ljava/lang/String;)Ljava/lang/StringBuilder;")
        | ("append", "(Ljava/lang/Object;)Ljava/lang/StringBuilder;") => {
            cell.borrow_mut().push_str(&render_reference(&args[0]));
            Ok(Some(Value::Builder(Rc::clone(cell))))
        }
        ("append", "(I)Ljava/lang/StringBuilder;") => {
            let v = pop_arg_int(args)?;
            cell.borrow_mut().push_str(&v.to_string());
            Ok(Some(Value::Builder(Rc::clone(cell))))
        }
        ("append", "(J)Ljava/lang/StringBuilder;") => match &args[0] {
            Value::Long(v) => {
                cell.borrow_mut().push_str(&v.to_string());
                Ok(Some(Value::Builder(Rc::clone(cell))))
            }
            other => Err(type_fault("long", other)),
        },
        ("append", "(Z)Ljava/lang/StringBuilder;") => {
            let v = pop_arg_int(args)?;
            cell.borrow_mut()
                .push_str(if v == 0 { "false" } else { "true" });
            Ok(Some(Value::Builder(Rc::clone(cell))))
        }
        ("append", "(C)Ljava/lang/StringBuilder;") => {
            let v = pop_arg_int(args)?;
            cell.borrow_mut()
                .push(char::from_u32(v as u32).unwrap_or('\u{FFFD}'));
            Ok(Some(Value::Builder(Rc::clone(cell))))
        }
        ("toString", "()Ljava/lang/String;") => Ok(Some(Value::string(cell.borrow().as_str()))),
        ("length", "()I") => Ok(Some(Value::Int(
            cell.borrow().encode_utf16().count() as i32
        ))),
        _ => Err(fault(format!(
            "unsupported string builder method {name}{descriptor}"
        ))),
    }
}

fn string_method(s: &Rc<str>, name: &str, descriptor: &str, args: &[Value]) -> Exec<Option<Value>> {
    match (name, descriptor) {
        ("length", "()I") => Ok(Some(Value::Int(s.encode_utf16().count() as i32))),
        ("isEmpty", "()Z") => Ok(Some(Value::Int(i32::from(s.is_empty())))),
        ("equals", "(Ljava/lang/Object;)Z") => {
            let equal = matches!(&args[0], Value::Str(other) if **other == **s);
            Ok(Some(Value::Int(i32::from(equal))))
        }
        ("toString", "()Ljava/lang/String;") => Ok(Some(Value::Str(Rc::clone(s)))),
        _ => Err(fault(format!(
            "unsupported string method {name}{descriptor}"
        ))),
    }
}

fn throwable_method(t: &Rc<Throwable>, name: &str, descriptor: &str) -> Exec<Option<Value>> {
    match (name, descriptor) {
        ("getMessage", "()Ljava/lang/String;") => Ok(Some(
            t.message().map_or(Value::Null, Value::string),
        )),
        ("toString", "()Ljava/lang/String;") => Ok(Some(Value::string(t.to_string()))),
        _ => Err(fault(format!(
            "unsupported throwable method {name}{descriptor}"
        ))),
    }
}

/// Renders a reference argument the way console printing does.
fn render_reference(value: &Value) -> String {
    value.to_string()
}

fn pop_arg_int(args: &[Value]) -> Exec<i32> {
    match args.first() {
        Some(Value::Int(v)) => Ok(*v),
        Some(other) => Err(type_fault("int", other)),
        None => Err(fault("missing argument")),
    }
}

fn type_fault(expected: &str, found: &Value) -> Raised {
    fault(format!(
        "expected {expected} on operand stack, found {}",
        found.type_name()
    ))
}

fn member_strings(class: &LoadedClass, index: u16) -> Exec<(String, String, String)> {
    let (owner, name, descriptor) = class.pool().member_ref(index)?;
    Ok((owner.to_string(), name.to_string(), descriptor.to_string()))
}

fn ldc_value(class: &LoadedClass, index: u16) -> Exec<Value> {
    match class.pool().get(index)? {
        Constant::Integer(v) => Ok(Value::Int(*v)),
        Constant::Float(v) => Ok(Value::Float(*v)),
        Constant::String { string_index } => Ok(Value::string(class.pool().utf8(*string_index)?)),
        Constant::Long(_) | Constant::Double(_) => {
            Err(fault("ldc cannot load wide constants (use ldc2_w)"))
        }
        _ => Err(fault("ldc of this constant kind is unsupported")),
    }
}

fn ldc2_value(class: &LoadedClass, index: u16) -> Exec<Value> {
    match class.pool().get(index)? {
        Constant::Long(v) => Ok(Value::Long(*v)),
        Constant::Double(v) => Ok(Value::Double(*v)),
        _ => Err(fault("ldc2_w requires a wide constant")),
    }
}

fn pop(stack: &mut Vec<Value>) -> Exec<Value> {
    stack.pop().ok_or_else(|| fault("operand stack underflow"))
}

fn pop_int(stack: &mut Vec<Value>) -> Exec<i32> {
    match pop(stack)? {
        Value::Int(v) => Ok(v),
        other => Err(type_fault("int", &other)),
    }
}

fn load_local(locals: &[Value], slot: usize) -> Exec<Value> {
    locals
        .get(slot)
        .cloned()
        .ok_or_else(|| fault(format!("local slot {slot} out of range")))
}

fn store_local(locals: &mut [Value], slot: usize, value: Value) -> Exec<()> {
    match locals.get_mut(slot) {
        Some(target) => {
            *target = value;
            Ok(())
        }
        None => Err(fault(format!("local slot {slot} out of range"))),
    }
}

fn read_u8(code: &Code, pc: &mut usize) -> Exec<u8> {
    let b = *code
        .bytecode
        .get(*pc)
        .ok_or_else(|| fault("bytecode ends mid-instruction"))?;
    *pc += 1;
    Ok(b)
}

fn read_u16(code: &Code, pc: &mut usize) -> Exec<u16> {
    let hi = read_u8(code, pc)?;
    let lo = read_u8(code, pc)?;
    Ok(u16::from_be_bytes([hi, lo]))
}

fn branch_target(code: &Code, op_pc: usize, offset: i16) -> Exec<usize> {
    let target = op_pc as i64 + i64::from(offset);
    if target < 0 || target as usize >= code.bytecode.len() {
        return Err(fault("branch target out of range"));
    }
    Ok(target as usize)
}
