use std::collections::HashMap;
use std::io::{self, Stdout, Write};

use log::{debug, trace};

pub mod builtins;
pub mod chunk;
pub mod compiler;
pub mod disassembler;
pub mod instruction;
pub mod value;

pub use chunk::{Chunk, Lookup, Program};
pub use compiler::{compile, CompileError, MAIN};
pub use instruction::{Instruction, StoringCtx};
pub use value::{ArithmeticError, ArithmeticMode, TypeError, Value};

use builtins::BuiltinError;
use value::{ArithOp, CompareOp, EmptyEnv, ExecutionContext};

/// Default operand stack capacity.
pub const STACK_MAX: usize = 256;
/// Default call chain capacity.
pub const FRAMES_MAX: usize = 256;

#[derive(Debug, thiserror::Error)]
pub enum VmError {
    #[error("undefined chunk: {name}")]
    UndefinedChunk { name: String },
    #[error("undefined variable: {name}")]
    UndefinedVariable { name: String },
    #[error("'{name}' is already declared in this scope")]
    AlreadyDeclared { name: String },
    #[error("cannot assign to immutable binding '{name}'")]
    ImmutableAssignment { name: String },
    #[error("'{op}' {source}")]
    Type { op: &'static str, source: TypeError },
    #[error(transparent)]
    Arithmetic(#[from] ArithmeticError),
    #[error(transparent)]
    Builtin(#[from] BuiltinError),
    #[error("operand stack overflow (capacity {capacity})")]
    StackOverflow { capacity: usize },
    #[error("operand stack underflow in '{chunk}'")]
    StackUnderflow { chunk: String },
    #[error("call depth limit of {limit} exceeded calling '{name}'")]
    CallDepthExceeded { name: String, limit: usize },
    #[error("jump out of range in '{chunk}' at {ip}")]
    BadJump { chunk: String, ip: usize },
    #[error("scope underflow in '{chunk}'")]
    ScopeUnderflow { chunk: String },
    #[error("output error: {0}")]
    Io(#[from] io::Error),
}

type VmResult<T> = Result<T, VmError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VmConfig {
    pub stack_capacity: usize,
    pub max_call_depth: usize,
    pub arithmetic: ArithmeticMode,
}

impl Default for VmConfig {
    fn default() -> Self {
        VmConfig { stack_capacity: STACK_MAX, max_call_depth: FRAMES_MAX, arithmetic: ArithmeticMode::Checked }
    }
}

#[derive(Debug, Clone)]
struct Binding {
    value: Value,
    immutable: bool,
}

/// Variables of one activation: block scopes over the bound arguments.
#[derive(Debug)]
struct Frame {
    scopes: Vec<HashMap<String, Binding>>,
    args: HashMap<String, Value>,
}

impl Frame {
    fn new() -> Self {
        Frame { scopes: vec![HashMap::new()], args: HashMap::new() }
    }

    fn lookup(&self, name: &str) -> Option<&Value> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name).map(|b| &b.value))
            .or_else(|| self.args.get(name))
    }

    fn declare(&mut self, name: &str, value: Value, immutable: bool) -> VmResult<()> {
        let Some(scope) = self.scopes.last_mut() else {
            return Err(VmError::UndefinedVariable { name: name.to_string() });
        };
        if scope.contains_key(name) {
            return Err(VmError::AlreadyDeclared { name: name.to_string() });
        }
        scope.insert(name.to_string(), Binding { value, immutable });
        Ok(())
    }

    fn assign(&mut self, name: &str, value: Value) -> VmResult<()> {
        if let Some(binding) = self.scopes.iter_mut().rev().find_map(|scope| scope.get_mut(name)) {
            if binding.immutable {
                return Err(VmError::ImmutableAssignment { name: name.to_string() });
            }
            binding.value = value;
            return Ok(());
        }
        match self.args.get_mut(name) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(VmError::UndefinedVariable { name: name.to_string() }),
        }
    }
}

/// Where to resume a caller, with the caller's variables.
#[derive(Debug)]
struct CallChainEntry<'p> {
    chunk: &'p Chunk,
    ip: usize,
    frame: Frame,
}

/// Stack machine executing a compiled [`Program`] from its `main` chunk.
pub struct Vm<'p, W: Write = Stdout> {
    program: &'p Program,
    config: VmConfig,
    chunk: &'p Chunk,
    ip: usize,
    stack: Vec<Value>,
    frame: Frame,
    call_chain: Vec<CallChainEntry<'p>>,
    out: W,
}

impl<'p> Vm<'p, Stdout> {
    pub fn new(program: &'p Program) -> VmResult<Self> {
        Vm::with_output(program, VmConfig::default(), io::stdout())
    }
}

impl<'p, W: Write> Vm<'p, W> {
    pub fn with_output(program: &'p Program, config: VmConfig, out: W) -> VmResult<Self> {
        let chunk = program.lookup_chunk(MAIN, Lookup::Abort)?;
        Ok(Vm {
            program,
            config,
            chunk,
            ip: 0,
            stack: Vec::with_capacity(config.stack_capacity),
            frame: Frame::new(),
            call_chain: Vec::with_capacity(config.max_call_depth.min(FRAMES_MAX)),
            out,
        })
    }

    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }

    /// Current call chain depth; zero while executing `main`.
    pub fn nesting_level(&self) -> usize {
        self.call_chain.len()
    }

    /// Look up a variable visible in the current activation.
    pub fn local(&self, name: &str) -> Option<&Value> {
        self.frame.lookup(name)
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    pub fn into_output(self) -> W {
        self.out
    }

    fn push(&mut self, value: Value) -> VmResult<()> {
        if self.stack.len() >= self.config.stack_capacity {
            return Err(VmError::StackOverflow { capacity: self.config.stack_capacity });
        }
        self.stack.push(value);
        Ok(())
    }

    fn pop(&mut self) -> VmResult<Value> {
        self.stack.pop().ok_or_else(|| VmError::StackUnderflow { chunk: self.chunk.name.clone() })
    }

    fn pop_bool(&mut self, op: &'static str) -> VmResult<bool> {
        self.pop()?.as_bool().map_err(|source| VmError::Type { op, source })
    }

    fn jump(&mut self, offset: isize) -> VmResult<()> {
        let target = self.ip as isize + offset;
        if target < 0 || target as usize > self.chunk.code.len() {
            return Err(VmError::BadJump { chunk: self.chunk.name.clone(), ip: self.ip - 1 });
        }
        self.ip = target as usize;
        Ok(())
    }

    fn arith(&mut self, op: ArithOp) -> VmResult<()> {
        let rhs = self.pop()?;
        let lhs = self.pop()?;
        let result = match self.config.arithmetic {
            ArithmeticMode::Checked => {
                value::arith(op, &lhs, &rhs, &EmptyEnv, ExecutionContext::Vm, ArithmeticMode::Checked)?
            }
            ArithmeticMode::Permissive => {
                value::arith_permissive(op, &lhs, &rhs, &EmptyEnv, ExecutionContext::Vm)
            }
        };
        self.push(result)
    }

    fn compare(&mut self, op: CompareOp) -> VmResult<()> {
        let rhs = self.pop()?;
        let lhs = self.pop()?;
        let holds = value::compare(op, &lhs, &rhs)?;
        self.push(Value::Bool(holds))
    }

    fn logical(&mut self, op: &'static str, f: fn(bool, bool) -> bool) -> VmResult<()> {
        let rhs = self.pop_bool(op)?;
        let lhs = self.pop_bool(op)?;
        self.push(Value::Bool(f(lhs, rhs)))
    }

    fn call(&mut self, func: &str, arg_names: &[String]) -> VmResult<()> {
        if let Some(builtin) = builtins::lookup(func) {
            let n = builtin.params.len();
            if self.stack.len() < n {
                return Err(VmError::StackUnderflow { chunk: self.chunk.name.clone() });
            }
            let args = self.stack.split_off(self.stack.len() - n);
            let result = builtins::call(builtin, &args, &mut self.out)?;
            if builtin.returns != crate::ast::Type::Unit {
                self.push(result)?;
            }
            return Ok(());
        }

        let program: &'p Program = self.program;
        let callee = program.lookup_chunk(func, Lookup::Abort)?;
        if self.call_chain.len() >= self.config.max_call_depth {
            return Err(VmError::CallDepthExceeded { name: func.to_string(), limit: self.config.max_call_depth });
        }

        let mut frame = Frame::new();
        for name in arg_names.iter().rev() {
            let value = self.pop()?;
            frame.args.insert(name.clone(), value);
        }

        let caller = std::mem::replace(&mut self.frame, frame);
        self.call_chain.push(CallChainEntry { chunk: self.chunk, ip: self.ip, frame: caller });
        debug!("call '{}' (depth {})", callee.name, self.call_chain.len());
        self.chunk = callee;
        self.ip = 0;
        Ok(())
    }

    /// Returns `false` once the program has finished.
    fn ret(&mut self) -> VmResult<bool> {
        let Some(entry) = self.call_chain.pop() else {
            return Ok(false);
        };
        if self.chunk.does_return {
            // The return value must be on top for the caller.
            let value = self.pop()?;
            self.push(value)?;
        }
        debug!("return from '{}' to '{}' (depth {})", self.chunk.name, entry.chunk.name, self.call_chain.len());
        self.chunk = entry.chunk;
        self.ip = entry.ip;
        self.frame = entry.frame;
        Ok(true)
    }

    /// Run until `main` returns or runs off the end of its code.
    pub fn run(&mut self) -> VmResult<()> {
        debug!("run '{}' ({} chunks)", self.chunk.name, self.program.len());
        loop {
            let chunk: &'p Chunk = self.chunk;
            let Some(instr) = chunk.code.get(self.ip) else {
                // Falling off the end behaves like `Return`.
                if self.ret()? {
                    continue;
                }
                break;
            };
            trace!("{:>12} {:04} {}", chunk.name, self.ip, instr);
            self.ip += 1;

            match instr {
                Instruction::Add => self.arith(ArithOp::Add)?,
                Instruction::Sub => self.arith(ArithOp::Sub)?,
                Instruction::Mul => self.arith(ArithOp::Mul)?,
                Instruction::Div => self.arith(ArithOp::Div)?,
                Instruction::Mod => self.arith(ArithOp::Mod)?,
                Instruction::Negate => {
                    let v = self.pop()?;
                    let negated = match value::negate(&v, self.config.arithmetic) {
                        Ok(n) => n,
                        Err(_) if self.config.arithmetic == ArithmeticMode::Permissive => Value::Undefined,
                        Err(e) => return Err(e.into()),
                    };
                    self.push(negated)?;
                }

                Instruction::LogicalAnd => self.logical("&&", |a, b| a && b)?,
                Instruction::LogicalOr => self.logical("||", |a, b| a || b)?,
                Instruction::LogicalNot => {
                    let b = self.pop_bool("!")?;
                    self.push(Value::Bool(!b))?;
                }

                Instruction::GreaterThan => self.compare(CompareOp::GreaterThan)?,
                Instruction::GreaterThanOrEqual => self.compare(CompareOp::GreaterThanOrEqual)?,
                Instruction::LessThan => self.compare(CompareOp::LessThan)?,
                Instruction::LessThanOrEqual => self.compare(CompareOp::LessThanOrEqual)?,
                Instruction::Equal => self.compare(CompareOp::Equal)?,
                Instruction::NotEqual => self.compare(CompareOp::NotEqual)?,

                Instruction::LoadImm(v) => self.push(v.clone())?,
                Instruction::True => self.push(Value::Bool(true))?,
                Instruction::False => self.push(Value::Bool(false))?,
                Instruction::Null => self.push(Value::Null)?,

                Instruction::LoadRef(name) => {
                    let v = self
                        .frame
                        .lookup(name)
                        .cloned()
                        .ok_or_else(|| VmError::UndefinedVariable { name: name.clone() })?;
                    self.push(v)?;
                }
                Instruction::SetLocal { name, ctx, immutable } => {
                    let v = self.pop()?;
                    match ctx {
                        StoringCtx::Declare => self.frame.declare(name, v, *immutable)?,
                        StoringCtx::Assign => self.frame.assign(name, v)?,
                    }
                }

                Instruction::EnterScope => self.frame.scopes.push(HashMap::new()),
                Instruction::ExitScope => {
                    if self.frame.scopes.len() <= 1 {
                        return Err(VmError::ScopeUnderflow { chunk: chunk.name.clone() });
                    }
                    self.frame.scopes.pop();
                }

                Instruction::Jmp(offset) => self.jump(*offset)?,
                Instruction::JmpIfFalse(offset) => {
                    if !self.pop_bool("if")? {
                        self.jump(*offset)?;
                    }
                }
                Instruction::Call { func, arg_names } => self.call(func, arg_names)?,
                Instruction::Return => {
                    if !self.ret()? {
                        break;
                    }
                }
                Instruction::Pop => {
                    self.pop()?;
                }
            }
        }
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile_src(source: &str) -> Program {
        let tokens = crate::lexer::lex(source).unwrap();
        let ast = crate::parser::parse(tokens).unwrap();
        compile(&ast).unwrap()
    }

    fn run_with(source: &str, config: VmConfig) -> (VmResult<()>, String, usize, usize) {
        let program = compile_src(source);
        let mut vm = Vm::with_output(&program, config, Vec::<u8>::new()).unwrap();
        let result = vm.run();
        let (depth, nesting) = (vm.stack_depth(), vm.nesting_level());
        let out = String::from_utf8(vm.into_output()).unwrap();
        (result, out, depth, nesting)
    }

    fn run_ok(source: &str) -> String {
        let (result, out, _, _) = run_with(source, VmConfig::default());
        result.unwrap();
        out
    }

    fn run_err(source: &str) -> VmError {
        run_with(source, VmConfig::default()).0.unwrap_err()
    }

    /// Run and return the value bound to `name` in `main` afterwards.
    fn local_after(source: &str, name: &str) -> Option<Value> {
        let program = compile_src(source);
        let mut vm = Vm::with_output(&program, VmConfig::default(), Vec::<u8>::new()).unwrap();
        vm.run().unwrap();
        vm.local(name).cloned()
    }

    #[test]
    fn add_scenario_prints_five() {
        let out = run_ok("def add(x: Int, y: Int): Int { return x + y }\nprint(to_string(add(2, 3)))");
        assert_eq!(out, "5");
    }

    #[test]
    fn argument_binding_order() {
        let src = "def f(a: Int, b: Int): Int { return a - b }\nval r = f(10, 3)";
        assert_eq!(local_after(src, "r"), Some(Value::Int(7)));
    }

    #[test]
    fn while_loop_leaves_three() {
        assert_eq!(local_after("var i = 0\nwhile (i < 3) { i = i + 1 }", "i"), Some(Value::Int(3)));
    }

    #[test]
    fn if_false_skips_assignment() {
        let src = "var x = 0\nvar after = 0\nif (false) { x = 1 }\nafter = 1";
        assert_eq!(local_after(src, "x"), Some(Value::Int(0)));
        assert_eq!(local_after(src, "after"), Some(Value::Int(1)));
    }

    #[test]
    fn if_false_leaves_block_binding_unbound() {
        let src = "if (false) { val x = 1 }\nval done = true";
        assert_eq!(local_after(src, "x"), None);
        assert_eq!(local_after(src, "done"), Some(Value::Bool(true)));
    }

    #[test]
    fn else_branch_runs() {
        let src = "var x = 0\nif (1 > 2) { x = 1 } else if (2 > 1) { x = 2 } else { x = 3 }";
        assert_eq!(local_after(src, "x"), Some(Value::Int(2)));
    }

    #[test]
    fn recursion_keeps_stack_balanced() {
        let src = "def fact(n: Int): Int { if (n <= 1) { return 1 } else { return n * fact(n - 1) } }\n\
                   val r = fact(10)\nfact(4)\nfact(2)";
        let (result, _, depth, nesting) = run_with(src, VmConfig::default());
        result.unwrap();
        assert_eq!(depth, 0);
        assert_eq!(nesting, 0);
        assert_eq!(local_after(src, "r"), Some(Value::Int(3_628_800)));
    }

    #[test]
    fn recursive_calls_keep_their_own_locals() {
        let src = "def sum(n: Int): Int { val here = n\n if (n == 0) { return 0 }\n val rest = sum(n - 1)\n return here + rest }\n\
                   val r = sum(5)";
        assert_eq!(local_after(src, "r"), Some(Value::Int(15)));
    }

    #[test]
    fn declare_inside_loop_body_each_iteration() {
        let src = "var i = 0\nvar total = 0\nwhile (i < 4) { val sq = i * i\n total = total + sq\n i = i + 1 }";
        assert_eq!(local_after(src, "total"), Some(Value::Int(14)));
    }

    #[test]
    fn assignment_to_parameter() {
        let src = "def dec(n: Int): Int { n = n - 1\n return n }\nval r = dec(5)";
        assert_eq!(local_after(src, "r"), Some(Value::Int(4)));
    }

    #[test]
    fn division_and_mixed_arithmetic() {
        assert_eq!(local_after("val d = 7 / 2", "d"), Some(Value::Float(3.5)));
        assert_eq!(local_after("val m = 2 * 1.5 + 1", "m"), Some(Value::Float(4.0)));
        assert_eq!(local_after("val s = \"ab\" + \"cd\"", "s"), Some(Value::Str("abcd".into())));
        assert_eq!(local_after("val n = -(3 % 2)", "n"), Some(Value::Int(-1)));
    }

    #[test]
    fn comparisons_and_logic() {
        let src = "val a = 1 < 2.5 && !(3 == 4)\nval b = \"x\" != \"x\" || false";
        assert_eq!(local_after(src, "a"), Some(Value::Bool(true)));
        assert_eq!(local_after(src, "b"), Some(Value::Bool(false)));
    }

    #[test]
    fn explicit_main_entry() {
        let out = run_ok("def greet(name: String): Unit { print(\"hi \" + name) }\ndef main(): Unit { greet(\"bob\") }");
        assert_eq!(out, "hi bob");
    }

    #[test]
    fn top_level_return_terminates() {
        let out = run_ok("print(\"a\")\nreturn;\nprint(\"b\")");
        assert_eq!(out, "a");
    }

    #[test]
    fn arrays_through_builtins() {
        let src = "val a = array_new(3, \"Int\")\nvar i = 0\n\
                   while (i < array_size(a)) { array_set(a, i, i * 10)\n i = i + 1 }\n\
                   print(to_string(array_get(a, 2)))";
        assert_eq!(run_ok(src), "20");
    }

    #[test]
    fn arrays_are_shared_with_callees() {
        let src = "def fill(a: Array): Unit { array_set(a, 0, \"x\") }\n\
                   val a = array_new(1, \"String\")\nfill(a)\nprint(array_get(a, 0))";
        assert_eq!(run_ok(src), "x");
    }

    #[test]
    fn division_by_zero_checked() {
        assert!(matches!(run_err("val x = 1 / 0"), VmError::Arithmetic(ArithmeticError::DivisionByZero)));
    }

    #[test]
    fn permissive_mode_yields_undefined() {
        // Skips the verifier: the compiler trusts its input.
        let src = "val x = \"a\" - 1";
        let program = compile_src(src);
        let config = VmConfig { arithmetic: ArithmeticMode::Permissive, ..VmConfig::default() };
        let mut vm = Vm::with_output(&program, config, Vec::<u8>::new()).unwrap();
        vm.run().unwrap();
        assert_eq!(vm.local("x"), Some(&Value::Undefined));
        assert!(matches!(run_err(src), VmError::Arithmetic(ArithmeticError::IncompatibleOperands { .. })));
    }

    #[test]
    fn assigning_val_fails_at_runtime() {
        assert!(matches!(run_err("val x = 1\nx = 2"), VmError::ImmutableAssignment { ref name } if name == "x"));
    }

    #[test]
    fn redeclare_fails_at_runtime() {
        assert!(matches!(run_err("var x = 1\nvar x = 2"), VmError::AlreadyDeclared { .. }));
    }

    #[test]
    fn undefined_variable_fails() {
        assert!(matches!(run_err("print(y)"), VmError::UndefinedVariable { ref name } if name == "y"));
    }

    #[test]
    fn unbounded_recursion_hits_depth_limit() {
        let src = "def down(n: Int): Int { return down(n + 1) }\nval r = down(0)";
        let config = VmConfig { max_call_depth: 32, ..VmConfig::default() };
        let (result, _, _, _) = run_with(src, config);
        assert!(matches!(result, Err(VmError::CallDepthExceeded { limit: 32, .. })));
    }

    #[test]
    fn stack_capacity_is_enforced() {
        let config = VmConfig { stack_capacity: 2, ..VmConfig::default() };
        let (result, _, _, _) = run_with("val x = 1 + (2 + 3)", config);
        assert!(matches!(result, Err(VmError::StackOverflow { capacity: 2 })));
    }

    #[test]
    fn condition_type_error() {
        assert!(matches!(run_err("if (1) { }"), VmError::Type { op: "if", .. }));
    }

    #[test]
    fn missing_main_is_error() {
        let program = Program::new();
        assert!(matches!(Vm::new(&program), Err(VmError::UndefinedChunk { ref name }) if name == MAIN));
    }

    #[test]
    fn falling_off_main_is_normal_exit() {
        let mut program = Program::new();
        let mut main = Chunk::new(MAIN, vec![], false);
        main.code = vec![Instruction::LoadImm(Value::Int(1)), Instruction::Pop];
        program.insert(main);
        let mut vm = Vm::with_output(&program, VmConfig::default(), Vec::<u8>::new()).unwrap();
        vm.run().unwrap();
        assert_eq!(vm.stack_depth(), 0);
    }

    #[test]
    fn bad_jump_is_error() {
        let mut program = Program::new();
        let mut main = Chunk::new(MAIN, vec![], false);
        main.code = vec![Instruction::Jmp(-5)];
        program.insert(main);
        let mut vm = Vm::with_output(&program, VmConfig::default(), Vec::<u8>::new()).unwrap();
        assert!(matches!(vm.run(), Err(VmError::BadJump { ip: 0, .. })));
    }
}
