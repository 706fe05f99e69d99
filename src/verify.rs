use std::collections::HashMap;

use crate::ast::*;
use crate::vm::{builtins, MAIN};

/// Function name used in errors for top-level statements.
pub const TOP_LEVEL: &str = "<main>";

#[derive(Debug, Clone)]
pub struct VerifyError {
    pub code: &'static str,
    pub function: String,
    pub message: String,
    pub hint: Option<String>,
}

impl std::fmt::Display for VerifyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "verify: {} in '{}'", self.message, self.function)?;
        if let Some(hint) = &self.hint {
            write!(f, "\n  hint: {hint}")?;
        }
        Ok(())
    }
}

struct FuncSig {
    params: Vec<(String, Type)>,
    return_type: Type,
}

#[derive(Clone, Copy)]
struct Binding {
    ty: Type,
    immutable: bool,
}

struct VerifyContext {
    functions: HashMap<String, FuncSig>,
    errors: Vec<VerifyError>,
}

type Scope = Vec<HashMap<String, Binding>>;

fn scope_lookup(scope: &Scope, name: &str) -> Option<Binding> {
    for frame in scope.iter().rev() {
        if let Some(binding) = frame.get(name) {
            return Some(*binding);
        }
    }
    None
}

/// `Any` stands in for "already reported" as well as the builtin wildcard,
/// so it is compatible with everything.
fn compatible(expected: Type, actual: Type) -> bool {
    expected == Type::Any || actual == Type::Any || expected == actual
}

fn is_numeric(ty: Type) -> bool {
    matches!(ty, Type::Int | Type::Float)
}

/// Result type of `lhs op rhs`, or `None` when the operand types don't combine.
fn binary_result(op: BinOp, lhs: Type, rhs: Type) -> Option<Type> {
    use BinOp::*;
    if lhs == Type::Any || rhs == Type::Any {
        return Some(match op {
            Div => Type::Float,
            Mod => Type::Int,
            _ if op.is_comparison() => Type::Bool,
            LogicalAnd | LogicalOr => Type::Bool,
            _ => Type::Any,
        });
    }
    match op {
        Add if lhs == Type::String && rhs == Type::String => Some(Type::String),
        Add | Sub | Mul if is_numeric(lhs) && is_numeric(rhs) => {
            if lhs == Type::Int && rhs == Type::Int {
                Some(Type::Int)
            } else {
                Some(Type::Float)
            }
        }
        Div if is_numeric(lhs) && is_numeric(rhs) => Some(Type::Float),
        Mod if lhs == Type::Int && rhs == Type::Int => Some(Type::Int),
        GreaterThan | GreaterThanOrEqual | LessThan | LessThanOrEqual => {
            let ok = (is_numeric(lhs) && is_numeric(rhs)) || (lhs == Type::String && rhs == Type::String);
            ok.then_some(Type::Bool)
        }
        Equal | NotEqual => {
            let ok = (is_numeric(lhs) && is_numeric(rhs))
                || (lhs == rhs && matches!(lhs, Type::String | Type::Bool | Type::Null));
            ok.then_some(Type::Bool)
        }
        LogicalAnd | LogicalOr if lhs == Type::Bool && rhs == Type::Bool => Some(Type::Bool),
        _ => None,
    }
}

fn closest_match<'a>(name: &str, candidates: impl Iterator<Item = &'a String>) -> Option<String> {
    let mut best: Option<(String, usize)> = None;
    for candidate in candidates {
        let dist = levenshtein(name, candidate);
        if dist <= 3 && best.as_ref().is_none_or(|(_, d)| dist < *d) {
            best = Some((candidate.clone(), dist));
        }
    }
    best.map(|(s, _)| s)
}

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (m, n) = (a.len(), b.len());
    let mut dp = vec![vec![0usize; n + 1]; m + 1];
    for (i, row) in dp.iter_mut().enumerate().take(m + 1) { row[0] = i; }
    for (j, val) in dp[0].iter_mut().enumerate().take(n + 1) { *val = j; }
    for i in 1..=m {
        for j in 1..=n {
            let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
            dp[i][j] = (dp[i - 1][j] + 1)
                .min(dp[i][j - 1] + 1)
                .min(dp[i - 1][j - 1] + cost);
        }
    }
    dp[m][n]
}

/// A block definitely returns if its last statement is a `return`, a nested
/// block that definitely returns, or an `if` whose branches all do.
fn block_returns(block: &Block) -> bool {
    block.stmts.last().is_some_and(|s| stmt_returns(s))
}

fn stmt_returns(stmt: &Stmt) -> bool {
    match stmt {
        Stmt::Return(_) => true,
        Stmt::Block(block) => block_returns(block),
        Stmt::If { then_body, else_body: Some(else_body), .. } => {
            block_returns(then_body) && stmt_returns(else_body)
        }
        _ => false,
    }
}

impl VerifyContext {
    fn new() -> Self {
        Self {
            functions: HashMap::new(),
            errors: Vec::new(),
        }
    }

    fn err(&mut self, code: &'static str, function: &str, message: String, hint: Option<String>) {
        self.errors.push(VerifyError {
            code,
            function: function.to_string(),
            message,
            hint,
        });
    }

    /// Phase 1: collect every function signature so calls may refer forward.
    fn collect_declarations(&mut self, program: &Program) {
        for stmt in &program.stmts {
            let Stmt::DefDecl { name, params, return_type, .. } = &stmt.node else {
                continue;
            };
            if builtins::is_builtin(name) {
                self.err("MS-T001", TOP_LEVEL, format!("'{name}' is a builtin and cannot be redefined"), None);
                continue;
            }
            if self.functions.contains_key(name) {
                self.err("MS-T002", TOP_LEVEL, format!("duplicate function definition '{name}'"), None);
                continue;
            }
            if name == MAIN && (!params.is_empty() || *return_type != Type::Unit) {
                self.err(
                    "MS-T018",
                    MAIN,
                    "'main' must take no parameters and return Unit".to_string(),
                    Some("declare it as 'def main(): Unit'".to_string()),
                );
            }
            let mut seen: Vec<&str> = Vec::new();
            for p in params {
                if seen.contains(&p.name.as_str()) {
                    self.err("MS-T003", name, format!("duplicate parameter '{}'", p.name), None);
                }
                if p.ty == Type::Unit {
                    self.err("MS-T017", name, format!("parameter '{}' cannot have type Unit", p.name), None);
                }
                seen.push(&p.name);
            }
            let params = params.iter().map(|p| (p.name.clone(), p.ty)).collect();
            self.functions.insert(name.clone(), FuncSig { params, return_type: *return_type });
        }
    }

    /// Phase 2: function bodies, then loose top-level statements.
    fn verify_bodies(&mut self, program: &Program) {
        for stmt in &program.stmts {
            if let Stmt::DefDecl { name, params, return_type, body } = &stmt.node {
                let mut frame = HashMap::new();
                for p in params {
                    frame.insert(p.name.clone(), Binding { ty: p.ty, immutable: false });
                }
                let mut scope: Scope = vec![frame, HashMap::new()];
                self.verify_block_in(name, *return_type, &mut scope, body);

                if *return_type != Type::Unit && !block_returns(body) {
                    self.err(
                        "MS-T004",
                        name,
                        format!("missing return: function returns {return_type} but not every path returns a value"),
                        Some("end the body with 'return <value>'".to_string()),
                    );
                }
            }
        }

        let mut scope: Scope = vec![HashMap::new()];
        for stmt in &program.stmts {
            if !matches!(stmt.node, Stmt::DefDecl { .. }) {
                self.verify_stmt(TOP_LEVEL, Type::Unit, &mut scope, stmt);
            }
        }
    }

    /// Verify a block's statements in the current innermost scope.
    fn verify_block_in(&mut self, func: &str, ret: Type, scope: &mut Scope, block: &Block) {
        for stmt in &block.stmts {
            self.verify_stmt(func, ret, scope, stmt);
        }
    }

    fn verify_nested_block(&mut self, func: &str, ret: Type, scope: &mut Scope, block: &Block) {
        scope.push(HashMap::new());
        self.verify_block_in(func, ret, scope, block);
        scope.pop();
    }

    fn verify_stmt(&mut self, func: &str, ret: Type, scope: &mut Scope, stmt: &Stmt) {
        match stmt {
            Stmt::VarDecl { name, value } => self.declare(func, scope, name, value, false),
            Stmt::ValDecl { name, value } => self.declare(func, scope, name, value, true),
            Stmt::DefDecl { name, .. } => {
                self.err(
                    "MS-T005",
                    func,
                    format!("nested function definition '{name}'"),
                    Some("functions can only be defined at the top level".to_string()),
                );
            }
            Stmt::If { cond, then_body, else_body } => {
                self.expect_condition(func, scope, cond, "if");
                self.verify_nested_block(func, ret, scope, then_body);
                if let Some(else_body) = else_body {
                    match &else_body.node {
                        Stmt::Block(block) => self.verify_nested_block(func, ret, scope, block),
                        other => self.verify_stmt(func, ret, scope, other),
                    }
                }
            }
            Stmt::While { cond, body } => {
                self.expect_condition(func, scope, cond, "while");
                self.verify_nested_block(func, ret, scope, body);
            }
            Stmt::Assignment { name, value } => {
                let value_ty = self.infer_expr(func, scope, value);
                match scope_lookup(scope, name) {
                    None => {
                        let hint = self.variable_hint(scope, name);
                        self.err("MS-T006", func, format!("assignment to undefined variable '{name}'"), hint);
                    }
                    Some(binding) if binding.immutable => {
                        self.err(
                            "MS-T007",
                            func,
                            format!("cannot assign to '{name}': it is a val"),
                            Some(format!("declare it with 'var {name}' to make it mutable")),
                        );
                    }
                    Some(_) if value_ty == Type::Unit => {
                        self.unit_value(func, format!("assigned to '{name}'"));
                    }
                    Some(binding) => {
                        if !compatible(binding.ty, value_ty) {
                            self.err(
                                "MS-T008",
                                func,
                                format!("type mismatch: '{name}' is {}, got {value_ty}", binding.ty),
                                None,
                            );
                        }
                    }
                }
            }
            Stmt::Block(block) => self.verify_nested_block(func, ret, scope, block),
            Stmt::Return(value) => match value {
                None if ret != Type::Unit => {
                    self.err("MS-T009", func, format!("missing return value: expected {ret}"), None);
                }
                None => {}
                Some(expr) => {
                    let ty = self.infer_expr(func, scope, expr);
                    if ret == Type::Unit {
                        self.err("MS-T009", func, format!("unexpected return value of type {ty} in a Unit function"), None);
                    } else if ty == Type::Unit {
                        self.unit_value(func, "returned".to_string());
                    } else if !compatible(ret, ty) {
                        self.err("MS-T009", func, format!("return type mismatch: expected {ret}, got {ty}"), None);
                    }
                }
            },
            Stmt::Expr(expr) => {
                self.infer_expr(func, scope, expr);
            }
        }
    }

    fn declare(&mut self, func: &str, scope: &mut Scope, name: &str, value: &Expr, immutable: bool) {
        let ty = self.infer_expr(func, scope, value);
        if ty == Type::Unit {
            self.err("MS-T010", func, format!("cannot bind '{name}' to a Unit value"), None);
        }
        let Some(frame) = scope.last_mut() else { return };
        if frame.contains_key(name) {
            self.err("MS-T011", func, format!("'{name}' is already declared in this scope"), None);
            return;
        }
        frame.insert(name.to_string(), Binding { ty, immutable });
    }

    fn unit_value(&mut self, func: &str, usage: String) {
        self.err(
            "MS-T016",
            func,
            format!("a Unit value cannot be {usage}"),
            Some("only functions with a declared return type produce a value".to_string()),
        );
    }

    fn expect_condition(&mut self, func: &str, scope: &mut Scope, cond: &Expr, keyword: &str) {
        let ty = self.infer_expr(func, scope, cond);
        if !compatible(Type::Bool, ty) {
            self.err("MS-T012", func, format!("'{keyword}' condition must be Bool, got {ty}"), None);
        }
    }

    fn variable_hint(&self, scope: &Scope, name: &str) -> Option<String> {
        let candidates: Vec<String> = scope.iter().flat_map(|frame| frame.keys().cloned()).collect();
        closest_match(name, candidates.iter()).map(|s| format!("did you mean '{s}'?"))
    }

    fn infer_expr(&mut self, func: &str, scope: &mut Scope, expr: &Expr) -> Type {
        match expr {
            Expr::Literal(lit) => match lit {
                Literal::Int(_) => Type::Int,
                Literal::Float(_) => Type::Float,
                Literal::String(_) => Type::String,
                Literal::Bool(_) => Type::Bool,
                Literal::Null => Type::Null,
            },

            Expr::Name(name) => {
                if let Some(binding) = scope_lookup(scope, name) {
                    binding.ty
                } else {
                    let hint = if self.functions.contains_key(name) || builtins::is_builtin(name) {
                        Some(format!("'{name}' is a function; call it with '{name}(...)'"))
                    } else {
                        self.variable_hint(scope, name)
                    };
                    self.err("MS-T006", func, format!("undefined variable '{name}'"), hint);
                    Type::Any
                }
            }

            Expr::Call { callee, args } => {
                let arg_types: Vec<Type> = args.iter().map(|a| self.infer_expr(func, scope, a)).collect();

                let (params, ret): (Vec<(String, Type)>, Type) = if let Some(b) = builtins::lookup(callee) {
                    let params = b
                        .arg_names
                        .iter()
                        .zip(b.params)
                        .map(|(n, t)| (n.to_string(), *t))
                        .collect();
                    (params, b.returns)
                } else if let Some(sig) = self.functions.get(callee) {
                    (sig.params.clone(), sig.return_type)
                } else {
                    let mut candidates: Vec<String> = self.functions.keys().cloned().collect();
                    candidates.extend(builtins::BUILTINS.iter().map(|b| b.name.to_string()));
                    let hint = closest_match(callee, candidates.iter())
                        .map(|s| format!("did you mean '{s}'?"));
                    self.err("MS-T013", func, format!("undefined function '{callee}'"), hint);
                    return Type::Any;
                };

                if args.len() != params.len() {
                    self.err(
                        "MS-T014",
                        func,
                        format!("arity mismatch: '{callee}' expects {} args, got {}", params.len(), args.len()),
                        None,
                    );
                    return ret;
                }
                for ((param_name, param_ty), arg_ty) in params.iter().zip(arg_types) {
                    if arg_ty == Type::Unit {
                        self.unit_value(func, format!("passed as param '{param_name}' of '{callee}'"));
                    } else if !compatible(*param_ty, arg_ty) {
                        self.err(
                            "MS-T008",
                            func,
                            format!("type mismatch: param '{param_name}' of '{callee}' expects {param_ty}, got {arg_ty}"),
                            None,
                        );
                    }
                }
                ret
            }

            Expr::Unary { op, operand } => {
                let ty = self.infer_expr(func, scope, operand);
                if ty == Type::Unit {
                    let symbol = match op {
                        UnaryOp::Negate => "-",
                        UnaryOp::Not => "!",
                    };
                    self.unit_value(func, format!("used as the operand of '{symbol}'"));
                    return Type::Any;
                }
                match op {
                    UnaryOp::Negate if is_numeric(ty) || ty == Type::Any => ty,
                    UnaryOp::Not if ty == Type::Bool || ty == Type::Any => Type::Bool,
                    UnaryOp::Negate => {
                        self.err("MS-T015", func, format!("unary '-' expects Int or Float, got {ty}"), None);
                        Type::Any
                    }
                    UnaryOp::Not => {
                        self.err("MS-T015", func, format!("'!' expects Bool, got {ty}"), None);
                        Type::Any
                    }
                }
            }

            Expr::Operation { op, lhs, rhs } => {
                let lhs_ty = self.infer_expr(func, scope, lhs);
                let rhs_ty = self.infer_expr(func, scope, rhs);
                if lhs_ty == Type::Unit || rhs_ty == Type::Unit {
                    self.unit_value(func, format!("used as an operand of '{}'", op.symbol()));
                    return Type::Any;
                }
                match binary_result(*op, lhs_ty, rhs_ty) {
                    Some(ty) => ty,
                    None => {
                        let hint = (*op == BinOp::Mod).then(|| "'%' only works on Int operands".to_string());
                        self.err(
                            "MS-T015",
                            func,
                            format!("'{}' cannot combine {lhs_ty} and {rhs_ty}", op.symbol()),
                            hint,
                        );
                        Type::Any
                    }
                }
            }
        }
    }
}

/// Run static verification on a parsed program.
/// Returns Ok(()) if valid, Err(errors) if problems found.
pub fn verify(program: &Program) -> Result<(), Vec<VerifyError>> {
    let mut ctx = VerifyContext::new();

    // Phase 1: collect declarations
    ctx.collect_declarations(program);

    // Phase 2: verify function bodies and top-level code
    ctx.verify_bodies(program);

    if ctx.errors.is_empty() {
        Ok(())
    } else {
        Err(ctx.errors)
    }
}
