use log::debug;

use crate::ast::{self, BinOp, Block, Expr, Literal, Span, Spanned, Stmt, Type, UnaryOp};

use super::builtins::BUILTINS;
use super::chunk::{Chunk, Lookup, Program};
use super::instruction::{Instruction, StoringCtx};
use super::value::Value;

/// Name of the entry chunk.
pub const MAIN: &str = "main";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompileError {
    #[error("undefined function: {name}")]
    UndefinedFunction { name: String, span: Span },
    #[error("duplicate function definition: {name}")]
    DuplicateFunction { name: String, span: Span },
    #[error("'{name}' is a builtin and cannot be redefined")]
    BuiltinRedefined { name: String, span: Span },
    #[error("nested function definition: {name}")]
    NestedFunction { name: String, span: Span },
    #[error("arity mismatch: '{name}' expects {expected} args, got {found}")]
    ArityMismatch { name: String, expected: usize, found: usize, span: Span },
    #[error("top-level statements cannot be mixed with an explicit 'main' function")]
    MainConflict { span: Span, main_span: Span },
    #[error("'main' must take no parameters and return Unit")]
    MainSignature { span: Span },
}

impl CompileError {
    pub fn span(&self) -> Span {
        match self {
            CompileError::UndefinedFunction { span, .. }
            | CompileError::DuplicateFunction { span, .. }
            | CompileError::BuiltinRedefined { span, .. }
            | CompileError::NestedFunction { span, .. }
            | CompileError::ArityMismatch { span, .. }
            | CompileError::MainConflict { span, .. }
            | CompileError::MainSignature { span } => *span,
        }
    }
}

struct Compiler {
    program: Program,
    code: Vec<Instruction>,
    errors: Vec<CompileError>,
}

impl Compiler {
    fn new() -> Self {
        Compiler { program: Program::new(), code: Vec::new(), errors: Vec::new() }
    }

    fn emit(&mut self, instr: Instruction) -> usize {
        let pos = self.code.len();
        self.code.push(instr);
        pos
    }

    /// Point the jump at `pos` to the next instruction to be emitted.
    fn patch_jump(&mut self, pos: usize) {
        let offset = (self.code.len() - pos - 1) as isize;
        match &mut self.code[pos] {
            Instruction::Jmp(o) | Instruction::JmpIfFalse(o) => *o = offset,
            other => debug_assert!(false, "patch_jump on {other}"),
        }
    }

    /// Emit a backward jump to `target`.
    fn emit_loop(&mut self, target: usize) {
        let offset = target as isize - (self.code.len() as isize + 1);
        self.emit(Instruction::Jmp(offset));
    }

    fn compile_program(mut self, ast: &ast::Program) -> Result<Program, CompileError> {
        for b in BUILTINS {
            let mut chunk = Chunk::new(b.name, b.arg_names.iter().map(|n| n.to_string()).collect(), b.returns != Type::Unit);
            chunk.builtin = true;
            self.program.insert(chunk);
        }

        // Pass 1: signatures, so calls resolve regardless of declaration order.
        let mut loose: Vec<&Spanned<Stmt>> = Vec::new();
        for stmt in &ast.stmts {
            match &stmt.node {
                Stmt::DefDecl { name, params, return_type, .. } => {
                    if name == MAIN && (!params.is_empty() || *return_type != Type::Unit) {
                        self.errors.push(CompileError::MainSignature { span: stmt.span });
                    }
                    let existing = self.program.get(name).map(|c| c.builtin);
                    match existing {
                        Some(true) => self.errors.push(CompileError::BuiltinRedefined { name: name.clone(), span: stmt.span }),
                        Some(false) => self.errors.push(CompileError::DuplicateFunction { name: name.clone(), span: stmt.span }),
                        None => {
                            let arg_names = params.iter().map(|p| p.name.clone()).collect();
                            self.program.insert(Chunk::new(name.clone(), arg_names, *return_type != Type::Unit));
                        }
                    }
                }
                _ => loose.push(stmt),
            }
        }

        let explicit_main = ast
            .stmts
            .iter()
            .find(|s| matches!(&s.node, Stmt::DefDecl { name, .. } if name == MAIN))
            .map(|s| s.span);
        if let Some(main_span) = explicit_main {
            if let Some(first) = loose.first() {
                self.errors.push(CompileError::MainConflict { span: first.span, main_span });
            }
        } else {
            self.program.insert(Chunk::new(MAIN, Vec::new(), false));
        }

        // Pass 2: bodies.
        let mut compiled: Vec<&str> = Vec::new();
        for stmt in &ast.stmts {
            if let Stmt::DefDecl { name, body, .. } = &stmt.node {
                if compiled.contains(&name.as_str()) || self.program.get(name).is_some_and(|c| c.builtin) {
                    continue;
                }
                compiled.push(name);
                self.compile_stmts(&body.stmts);
                self.finish_chunk(name);
            }
        }
        if explicit_main.is_none() {
            for stmt in loose {
                self.compile_stmt(stmt);
            }
            self.finish_chunk(MAIN);
        }

        match self.errors.into_iter().next() {
            Some(e) => Err(e),
            None => Ok(self.program),
        }
    }

    /// Seal the current buffer into `name`'s chunk, guaranteeing a trailing `Return`.
    fn finish_chunk(&mut self, name: &str) {
        if self.code.last() != Some(&Instruction::Return) {
            self.emit(Instruction::Return);
        }
        let code = std::mem::take(&mut self.code);
        debug!("compiled chunk '{name}' ({} instructions)", code.len());
        if let Some(chunk) = self.program.get_mut(name) {
            chunk.code = code;
        }
    }

    fn compile_stmts(&mut self, stmts: &[Spanned<Stmt>]) {
        for stmt in stmts {
            self.compile_stmt(stmt);
        }
    }

    fn compile_scoped_block(&mut self, block: &Block) {
        self.emit(Instruction::EnterScope);
        self.compile_stmts(&block.stmts);
        self.emit(Instruction::ExitScope);
    }

    fn compile_stmt(&mut self, stmt: &Spanned<Stmt>) {
        match &stmt.node {
            Stmt::VarDecl { name, value } => self.compile_set(name, value, StoringCtx::Declare, false),
            Stmt::ValDecl { name, value } => self.compile_set(name, value, StoringCtx::Declare, true),
            Stmt::Assignment { name, value } => self.compile_set(name, value, StoringCtx::Assign, false),
            Stmt::DefDecl { name, .. } => {
                self.errors.push(CompileError::NestedFunction { name: name.clone(), span: stmt.span });
            }
            Stmt::If { cond, then_body, else_body } => {
                self.compile_expr(cond);
                let skip_then = self.emit(Instruction::JmpIfFalse(0));
                self.compile_scoped_block(then_body);
                match else_body {
                    Some(else_body) => {
                        let skip_else = self.emit(Instruction::Jmp(0));
                        self.patch_jump(skip_then);
                        match &else_body.node {
                            Stmt::Block(block) => self.compile_scoped_block(block),
                            _ => self.compile_stmt(else_body),
                        }
                        self.patch_jump(skip_else);
                    }
                    None => self.patch_jump(skip_then),
                }
            }
            Stmt::While { cond, body } => {
                let loop_start = self.code.len();
                self.compile_expr(cond);
                let exit = self.emit(Instruction::JmpIfFalse(0));
                self.compile_scoped_block(body);
                self.emit_loop(loop_start);
                self.patch_jump(exit);
            }
            Stmt::Block(block) => self.compile_scoped_block(block),
            Stmt::Return(value) => {
                if let Some(value) = value {
                    self.compile_expr(value);
                }
                self.emit(Instruction::Return);
            }
            Stmt::Expr(expr) => {
                if self.compile_expr(expr) {
                    self.emit(Instruction::Pop);
                }
            }
        }
    }

    fn compile_set(&mut self, name: &str, value: &Spanned<Expr>, ctx: StoringCtx, immutable: bool) {
        self.compile_expr(value);
        self.emit(Instruction::SetLocal { name: name.to_string(), ctx, immutable });
    }

    /// Emit code for `expr` in post-order. Returns whether a value is left on the stack.
    fn compile_expr(&mut self, expr: &Spanned<Expr>) -> bool {
        match &expr.node {
            Expr::Literal(lit) => {
                let instr = match lit {
                    Literal::Int(n) => Instruction::LoadImm(Value::Int(*n)),
                    Literal::Float(n) => Instruction::LoadImm(Value::Float(*n)),
                    Literal::String(s) => Instruction::LoadImm(Value::Str(s.clone())),
                    Literal::Bool(true) => Instruction::True,
                    Literal::Bool(false) => Instruction::False,
                    Literal::Null => Instruction::Null,
                };
                self.emit(instr);
                true
            }
            Expr::Name(name) => {
                self.emit(Instruction::LoadRef(name.clone()));
                true
            }
            Expr::Operation { op, lhs, rhs } => {
                self.compile_expr(lhs);
                self.compile_expr(rhs);
                self.emit(binop_instruction(*op));
                true
            }
            Expr::Unary { op, operand } => {
                self.compile_expr(operand);
                self.emit(match op {
                    UnaryOp::Negate => Instruction::Negate,
                    UnaryOp::Not => Instruction::LogicalNot,
                });
                true
            }
            Expr::Call { callee, args } => self.compile_call(callee, args, expr.span),
        }
    }

    fn compile_call(&mut self, callee: &str, args: &[Spanned<Expr>], span: Span) -> bool {
        let (arg_names, does_return) = match self.program.lookup_chunk(callee, Lookup::Sentinel) {
            Ok(chunk) if !chunk.is_sentinel() => (chunk.arg_names.clone(), chunk.does_return),
            _ => {
                self.errors.push(CompileError::UndefinedFunction { name: callee.to_string(), span });
                return false;
            }
        };
        if args.len() != arg_names.len() {
            self.errors.push(CompileError::ArityMismatch {
                name: callee.to_string(),
                expected: arg_names.len(),
                found: args.len(),
                span,
            });
            return false;
        }
        for arg in args {
            self.compile_expr(arg);
        }
        self.emit(Instruction::Call { func: callee.to_string(), arg_names });
        does_return
    }
}

fn binop_instruction(op: BinOp) -> Instruction {
    match op {
        BinOp::Add => Instruction::Add,
        BinOp::Sub => Instruction::Sub,
        BinOp::Mul => Instruction::Mul,
        BinOp::Div => Instruction::Div,
        BinOp::Mod => Instruction::Mod,
        BinOp::Equal => Instruction::Equal,
        BinOp::NotEqual => Instruction::NotEqual,
        BinOp::GreaterThan => Instruction::GreaterThan,
        BinOp::GreaterThanOrEqual => Instruction::GreaterThanOrEqual,
        BinOp::LessThan => Instruction::LessThan,
        BinOp::LessThanOrEqual => Instruction::LessThanOrEqual,
        BinOp::LogicalAnd => Instruction::LogicalAnd,
        BinOp::LogicalOr => Instruction::LogicalOr,
    }
}

/// Compile a parsed program into a chunk store. All errors are collected;
/// the first one is returned.
pub fn compile(ast: &ast::Program) -> Result<Program, CompileError> {
    Compiler::new().compile_program(ast)
}
