//! The bytecode interpreter: a stack machine that walks a `Chunk`'s
//! instruction stream one opcode at a time.

use std::io::Write;

use tracing::trace;
use wisp_core::{Chunk, Interner, ObjRef, OpCode, Table, Value, format_number, is_falsey, values_equal};
use wisp_compiler::compile;

use crate::config::VmConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterpretError {
    /// Compilation failed; carries every diagnostic gathered by the
    /// compiler's panic-mode recovery.
    Compile(Vec<String>),
    /// A runtime fault, already formatted with its `[line L] in script`
    /// trailer the way `original_source/vm.c`'s `runtimeError` renders it.
    Runtime(String),
}

impl std::fmt::Display for InterpretError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InterpretError::Compile(errors) => {
                for (i, e) in errors.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{e}")?;
                }
                Ok(())
            }
            InterpretError::Runtime(message) => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for InterpretError {}

/// A stack-based bytecode VM. Owns the global-variable table and the
/// string intern pool directly, rather than reaching into a file-scope
/// singleton the way `original_source/vm.c`'s `VM vm;` does — see
/// `reset_stack`, which this ownership split makes correct by construction.
pub struct Vm {
    chunk: Chunk,
    ip: usize,
    stack: Vec<Value>,
    stack_max: usize,
    globals: Table,
    interner: Interner,
    config: VmConfig,
    output: Box<dyn Write>,
}

impl Vm {
    pub fn new(config: VmConfig) -> Self {
        Vm::with_output(config, Box::new(std::io::stdout()))
    }

    /// Same as `new`, but `PRINT` writes to `output` instead of stdout —
    /// the hook tests use to capture and assert on exact printed text
    /// (spec §8's end-to-end scenarios are defined by literal stdout, not
    /// just success/failure).
    pub fn with_output(config: VmConfig, output: Box<dyn Write>) -> Self {
        Vm {
            chunk: Chunk::new(),
            ip: 0,
            stack: Vec::with_capacity(config.stack_max),
            stack_max: config.stack_max,
            globals: Table::new(),
            interner: Interner::new(),
            config,
            output,
        }
    }

    /// Compile `source` and run it to completion, printing any `print`
    /// statement output to stdout.
    pub fn interpret(&mut self, source: &str) -> Result<(), InterpretError> {
        let chunk = compile(source, &mut self.interner)
            .map_err(|errors| InterpretError::Compile(errors.into_iter().map(|e| e.message).collect()))?;
        self.chunk = chunk;
        self.ip = 0;
        self.run()
    }

    /// Clear the operand stack without disturbing the intern pool or
    /// globals. `original_source/vm.c`'s `resetStack` is a single pointer
    /// reset on the whole `VM` struct, which is harmless there only because
    /// `vm.strings`/`vm.globals` are separate fields it doesn't touch
    /// either — the bug this fixes is a design drift in a reimplementation
    /// that folds the stack into the same owner as the intern table, not a
    /// bug in the original layout. We keep it as an explicit no-op-on-those
    /// fields by construction: this method only ever clears `self.stack`.
    fn reset_stack(&mut self) {
        self.stack.clear();
    }

    fn push(&mut self, value: Value) -> Result<(), InterpretError> {
        if self.stack.len() >= self.stack_max {
            return Err(self.runtime_error("Stack overflow."));
        }
        self.stack.push(value);
        Ok(())
    }

    fn pop(&mut self) -> Value {
        self.stack
            .pop()
            .expect("compiler-emitted bytecode must keep the stack balanced")
    }

    fn peek(&self, distance: usize) -> Value {
        self.stack[self.stack.len() - 1 - distance]
    }

    fn runtime_error(&mut self, message: &str) -> InterpretError {
        let line = if self.ip == 0 {
            self.chunk.lines.first().copied().unwrap_or(0)
        } else {
            self.chunk.lines.get(self.ip - 1).copied().unwrap_or(0)
        };
        let rendered = format!("{message}\n[line {line}] in script");
        eprintln!("{rendered}");
        self.reset_stack();
        InterpretError::Runtime(rendered)
    }

    fn read_byte(&mut self) -> u8 {
        let byte = self.chunk.code[self.ip];
        self.ip += 1;
        byte
    }

    fn read_constant(&mut self) -> Value {
        let idx = self.read_byte();
        self.chunk.constants[idx as usize]
    }

    fn stringify(&self, value: Value) -> String {
        match value {
            // `original_source/value.c`'s `value_print` writes the literal
            // `True`/`False`, not Rust's lowercase `bool::to_string()`.
            Value::Bool(b) => if b { "True" } else { "False" }.to_string(),
            Value::None => "None".to_string(),
            Value::Number(n) => format_number(n),
            Value::Obj(r) => self.interner.resolve(r).as_str().to_string(),
        }
    }

    fn global_key(&self, name_ref: ObjRef) -> (ObjRef, u32) {
        (name_ref, self.interner.resolve(name_ref).hash)
    }

    fn run(&mut self) -> Result<(), InterpretError> {
        loop {
            if self.config.trace {
                trace!(ip = self.ip, stack = ?self.stack, "dispatch");
            }
            let byte = self.read_byte();
            let Some(op) = OpCode::from_u8(byte) else {
                return Err(self.runtime_error("Invalid opcode."));
            };
            match op {
                OpCode::Constant => {
                    let value = self.read_constant();
                    self.push(value)?;
                }
                OpCode::None => self.push(Value::None)?,
                OpCode::True => self.push(Value::Bool(true))?,
                OpCode::False => self.push(Value::Bool(false))?,
                OpCode::Pop => {
                    self.pop();
                }
                OpCode::DefineGlobal => {
                    let name_ref = self
                        .read_constant()
                        .as_obj()
                        .expect("DefineGlobal operand must be an interned name");
                    let (key, hash) = self.global_key(name_ref);
                    let value = self.pop();
                    self.globals.set(key, hash, value);
                }
                OpCode::GetGlobal => {
                    let name_ref = self
                        .read_constant()
                        .as_obj()
                        .expect("GetGlobal operand must be an interned name");
                    let (key, hash) = self.global_key(name_ref);
                    match self.globals.get(key, hash) {
                        Some(value) => self.push(value)?,
                        Option::None => {
                            let name = self.interner.resolve(name_ref).as_str().to_string();
                            return Err(self.runtime_error(&format!("Undefined variable '{name}'.")));
                        }
                    }
                }
                OpCode::Equal => {
                    let b = self.pop();
                    let a = self.pop();
                    self.push(Value::Bool(values_equal(a, b)))?;
                }
                OpCode::Greater => self.binary_comparison(|a, b| a > b)?,
                OpCode::Less => self.binary_comparison(|a, b| a < b)?,
                OpCode::Add => self.add()?,
                OpCode::Subtract => self.binary_number(|a, b| a - b)?,
                OpCode::Multiply => self.binary_number(|a, b| a * b)?,
                OpCode::Divide => self.binary_number(|a, b| a / b)?,
                OpCode::Not => {
                    let value = self.pop();
                    self.push(Value::Bool(is_falsey(value)))?;
                }
                OpCode::Negate => {
                    let value = self.peek(0);
                    let Some(n) = value.as_number() else {
                        return Err(self.runtime_error("Operand must be a number."));
                    };
                    self.pop();
                    self.push(Value::Number(-n))?;
                }
                OpCode::Print => {
                    let value = self.pop();
                    let rendered = self.stringify(value);
                    let _ = writeln!(self.output, "{rendered}");
                    let _ = self.output.flush();
                }
                OpCode::Return => return Ok(()),
            }
        }
    }

    fn binary_number(&mut self, f: impl Fn(f64, f64) -> f64) -> Result<(), InterpretError> {
        let (Some(b), Some(a)) = (self.peek(0).as_number(), self.peek(1).as_number()) else {
            return Err(self.runtime_error("Operands must be numbers."));
        };
        self.pop();
        self.pop();
        self.push(Value::Number(f(a, b)))
    }

    fn binary_comparison(&mut self, f: impl Fn(f64, f64) -> bool) -> Result<(), InterpretError> {
        let (Some(b), Some(a)) = (self.peek(0).as_number(), self.peek(1).as_number()) else {
            return Err(self.runtime_error("Operands must be numbers."));
        };
        self.pop();
        self.pop();
        self.push(Value::Bool(f(a, b)))
    }

    fn add(&mut self) -> Result<(), InterpretError> {
        let b = self.peek(0);
        let a = self.peek(1);
        if let (Some(x), Some(y)) = (a.as_number(), b.as_number()) {
            self.pop();
            self.pop();
            return self.push(Value::Number(x + y));
        }
        if a.is_obj() && b.is_obj() {
            let a_ref = a.as_obj().unwrap();
            let b_ref = b.as_obj().unwrap();
            let concatenated = format!(
                "{}{}",
                self.interner.resolve(a_ref).as_str(),
                self.interner.resolve(b_ref).as_str()
            );
            self.pop();
            self.pop();
            let r = self.interner.take_string(concatenated);
            return self.push(Value::Obj(r));
        }
        Err(self.runtime_error("Operands must be two numbers or two strings."))
    }
}

impl Default for Vm {
    fn default() -> Self {
        Vm::new(VmConfig::default())
    }
}

#[cfg(test)]
/// A `Write` sink backed by a shared buffer, so a test can keep a handle to
/// read back exactly what a `Vm` printed after the fact.
#[derive(Clone, Default)]
struct CapturedOutput(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

#[cfg(test)]
impl Write for CapturedOutput {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.0.lock().unwrap().flush()
    }
}

#[cfg(test)]
impl CapturedOutput {
    fn text(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).expect("printed output is valid UTF-8")
    }
}

#[cfg(test)]
fn vm_with_capture() -> (Vm, CapturedOutput) {
    let capture = CapturedOutput::default();
    let vm = Vm::with_output(VmConfig::default(), Box::new(capture.clone()));
    (vm, capture)
}
