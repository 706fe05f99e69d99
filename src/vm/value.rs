use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::ast::Type;

/// Backing store of an array value. Shared between every binding that holds it.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayObject {
    pub element_type: Type,
    pub items: Vec<Value>,
}

pub type ArrayRef = Rc<RefCell<ArrayObject>>;

/// A runtime value. Everything except `Array` is copied on clone.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Float(f64),
    Int(i64),
    Str(String),
    Bool(bool),
    /// Reference to a chunk by name.
    Function(String),
    /// Unresolved variable name, only meaningful to the tree-walking context.
    Ref(String),
    Array(ArrayRef),
    Null,
    Undefined,
    Unit,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("expected {expected}, found {found}")]
pub struct TypeError {
    pub expected: &'static str,
    pub found: &'static str,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ArithmeticError {
    #[error("'{op}' cannot combine {lhs} and {rhs}")]
    IncompatibleOperands { op: &'static str, lhs: &'static str, rhs: &'static str },
    #[error("'{op}' cannot be applied to {operand}")]
    IncompatibleOperand { op: &'static str, operand: &'static str },
    #[error("division by zero")]
    DivisionByZero,
    #[error("integer overflow in '{op}'")]
    Overflow { op: &'static str },
    #[error("unresolved reference '{name}'")]
    UnresolvedRef { name: String },
}

/// How arithmetic treats operands it cannot combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArithmeticMode {
    /// Mismatches, overflow and division by zero are errors.
    #[default]
    Checked,
    /// Mismatches produce `Undefined`; integers wrap; float division by zero is infinite.
    Permissive,
}

/// Who is asking for arithmetic. The tree-walking context may hand over `Ref`
/// operands that still need a name lookup; the VM resolves names at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionContext {
    TreeWalk,
    Vm,
}

/// Variable lookup used to resolve `Ref` operands.
pub trait Environment {
    fn lookup_local(&self, name: &str) -> Option<Value>;

    fn lookup_global(&self, _name: &str) -> Option<Value> {
        None
    }

    fn resolve(&self, name: &str) -> Option<Value> {
        self.lookup_local(name).or_else(|| self.lookup_global(name))
    }
}

impl Environment for HashMap<String, Value> {
    fn lookup_local(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }
}

/// An environment with nothing in it, for callers in the VM context.
pub struct EmptyEnv;

impl Environment for EmptyEnv {
    fn lookup_local(&self, _name: &str) -> Option<Value> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl ArithOp {
    pub fn symbol(self) -> &'static str {
        match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
            ArithOp::Mod => "%",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    Equal,
    NotEqual,
}

impl CompareOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::GreaterThan => ">",
            CompareOp::GreaterThanOrEqual => ">=",
            CompareOp::LessThan => "<",
            CompareOp::LessThanOrEqual => "<=",
            CompareOp::Equal => "==",
            CompareOp::NotEqual => "!=",
        }
    }

    fn holds(self, ord: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering::*;
        match self {
            CompareOp::GreaterThan => ord == Greater,
            CompareOp::GreaterThanOrEqual => ord != Less,
            CompareOp::LessThan => ord == Less,
            CompareOp::LessThanOrEqual => ord != Greater,
            CompareOp::Equal => ord == Equal,
            CompareOp::NotEqual => ord != Equal,
        }
    }

    fn is_equality(self) -> bool {
        matches!(self, CompareOp::Equal | CompareOp::NotEqual)
    }
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Float(_) => "Float",
            Value::Int(_) => "Int",
            Value::Str(_) => "String",
            Value::Bool(_) => "Bool",
            Value::Function(_) => "Function",
            Value::Ref(_) => "Ref",
            Value::Array(_) => "Array",
            Value::Null => "Null",
            Value::Undefined => "Undefined",
            Value::Unit => "Unit",
        }
    }

    /// Source-level type of the value, if it has one.
    pub fn ty(&self) -> Option<Type> {
        match self {
            Value::Float(_) => Some(Type::Float),
            Value::Int(_) => Some(Type::Int),
            Value::Str(_) => Some(Type::String),
            Value::Bool(_) => Some(Type::Bool),
            Value::Array(_) => Some(Type::Array),
            Value::Null => Some(Type::Null),
            Value::Unit => Some(Type::Unit),
            Value::Function(_) | Value::Ref(_) | Value::Undefined => None,
        }
    }

    /// Zero value an array slot of type `ty` starts with.
    pub fn default_for(ty: Type) -> Value {
        match ty {
            Type::Int => Value::Int(0),
            Type::Float => Value::Float(0.0),
            Type::String => Value::Str(String::new()),
            Type::Bool => Value::Bool(false),
            Type::Unit => Value::Unit,
            Type::Array | Type::Null | Type::Any => Value::Null,
        }
    }

    pub fn new_array(element_type: Type, len: usize) -> Value {
        let items = vec![Value::default_for(element_type); len];
        Value::Array(Rc::new(RefCell::new(ArrayObject { element_type, items })))
    }

    fn mismatch(&self, expected: &'static str) -> TypeError {
        TypeError { expected, found: self.type_name() }
    }

    pub fn as_float(&self) -> Result<f64, TypeError> {
        match self {
            Value::Float(f) => Ok(*f),
            other => Err(other.mismatch("Float")),
        }
    }

    pub fn as_int(&self) -> Result<i64, TypeError> {
        match self {
            Value::Int(i) => Ok(*i),
            other => Err(other.mismatch("Int")),
        }
    }

    pub fn as_str(&self) -> Result<&str, TypeError> {
        match self {
            Value::Str(s) => Ok(s),
            other => Err(other.mismatch("String")),
        }
    }

    pub fn as_bool(&self) -> Result<bool, TypeError> {
        match self {
            Value::Bool(b) => Ok(*b),
            other => Err(other.mismatch("Bool")),
        }
    }

    pub fn as_function(&self) -> Result<&str, TypeError> {
        match self {
            Value::Function(name) => Ok(name),
            other => Err(other.mismatch("Function")),
        }
    }

    pub fn as_array(&self) -> Result<&ArrayRef, TypeError> {
        match self {
            Value::Array(arr) => Ok(arr),
            other => Err(other.mismatch("Array")),
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Value::Float(_))
    }

    pub fn is_int(&self) -> bool {
        matches!(self, Value::Int(_))
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Value::Str(_))
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, Value::Bool(_))
    }

    pub fn is_function(&self) -> bool {
        matches!(self, Value::Function(_))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn is_ref(&self) -> bool {
        matches!(self, Value::Ref(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    pub fn is_zero(&self) -> bool {
        match self {
            Value::Int(i) => *i == 0,
            Value::Float(f) => *f == 0.0,
            _ => false,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // f64's Display already drops a zero fraction and keeps the sign of -0.
            Value::Float(n) => write!(f, "{}", n),
            Value::Int(i) => write!(f, "{}", i),
            Value::Str(s) => write!(f, "{}", s),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Function(name) => write!(f, "<fn {}>", name),
            Value::Ref(name) => write!(f, "{}", name),
            Value::Array(arr) => {
                write!(f, "[")?;
                for (i, item) in arr.borrow().items.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Null => write!(f, "null"),
            Value::Undefined => write!(f, "undefined"),
            Value::Unit => write!(f, "()"),
        }
    }
}

// ---- Arithmetic ----

fn resolve(value: &Value, env: &dyn Environment, ctx: ExecutionContext) -> Result<Value, ArithmeticError> {
    match value {
        Value::Ref(name) if ctx == ExecutionContext::TreeWalk => env
            .resolve(name)
            .ok_or_else(|| ArithmeticError::UnresolvedRef { name: name.clone() }),
        other => Ok(other.clone()),
    }
}

fn int_op(op: ArithOp, a: i64, b: i64, mode: ArithmeticMode) -> Result<Value, ArithmeticError> {
    let overflow = || ArithmeticError::Overflow { op: op.symbol() };
    let checked = mode == ArithmeticMode::Checked;
    let n = match op {
        ArithOp::Add if checked => a.checked_add(b).ok_or_else(overflow)?,
        ArithOp::Sub if checked => a.checked_sub(b).ok_or_else(overflow)?,
        ArithOp::Mul if checked => a.checked_mul(b).ok_or_else(overflow)?,
        ArithOp::Add => a.wrapping_add(b),
        ArithOp::Sub => a.wrapping_sub(b),
        ArithOp::Mul => a.wrapping_mul(b),
        ArithOp::Mod => {
            if b == 0 {
                return Err(ArithmeticError::DivisionByZero);
            }
            if checked {
                a.checked_rem(b).ok_or_else(overflow)?
            } else {
                a.wrapping_rem(b)
            }
        }
        ArithOp::Div => return float_op(op, a as f64, b as f64, mode),
    };
    Ok(Value::Int(n))
}

fn float_op(op: ArithOp, a: f64, b: f64, mode: ArithmeticMode) -> Result<Value, ArithmeticError> {
    let n = match op {
        ArithOp::Add => a + b,
        ArithOp::Sub => a - b,
        ArithOp::Mul => a * b,
        ArithOp::Div => {
            if b == 0.0 && mode == ArithmeticMode::Checked {
                return Err(ArithmeticError::DivisionByZero);
            }
            a / b
        }
        ArithOp::Mod => {
            return Err(ArithmeticError::IncompatibleOperands { op: "%", lhs: "Float", rhs: "Float" });
        }
    };
    Ok(Value::Float(n))
}

/// Numeric tower: Int⊕Int stays Int (except `/`, which is always Float), any
/// Float operand widens the other side, and String+String concatenates.
pub fn arith(
    op: ArithOp,
    v1: &Value,
    v2: &Value,
    env: &dyn Environment,
    ctx: ExecutionContext,
    mode: ArithmeticMode,
) -> Result<Value, ArithmeticError> {
    let lhs = resolve(v1, env, ctx)?;
    let rhs = resolve(v2, env, ctx)?;
    let incompatible = || ArithmeticError::IncompatibleOperands {
        op: op.symbol(),
        lhs: lhs.type_name(),
        rhs: rhs.type_name(),
    };
    match (&lhs, &rhs) {
        (Value::Int(a), Value::Int(b)) => int_op(op, *a, *b, mode),
        (Value::Float(_), Value::Float(_)) | (Value::Int(_), Value::Float(_)) | (Value::Float(_), Value::Int(_))
            if op == ArithOp::Mod =>
        {
            Err(incompatible())
        }
        (Value::Float(a), Value::Float(b)) => float_op(op, *a, *b, mode),
        (Value::Int(a), Value::Float(b)) => float_op(op, *a as f64, *b, mode),
        (Value::Float(a), Value::Int(b)) => float_op(op, *a, *b as f64, mode),
        (Value::Str(a), Value::Str(b)) if op == ArithOp::Add => Ok(Value::Str(format!("{a}{b}"))),
        _ => Err(incompatible()),
    }
}

/// Permissive arithmetic: anything that cannot be computed yields `Undefined`.
pub fn arith_permissive(op: ArithOp, v1: &Value, v2: &Value, env: &dyn Environment, ctx: ExecutionContext) -> Value {
    arith(op, v1, v2, env, ctx, ArithmeticMode::Permissive).unwrap_or(Value::Undefined)
}

pub fn add(v1: &Value, v2: &Value, env: &dyn Environment, ctx: ExecutionContext) -> Value {
    arith_permissive(ArithOp::Add, v1, v2, env, ctx)
}

pub fn sub(v1: &Value, v2: &Value, env: &dyn Environment, ctx: ExecutionContext) -> Value {
    arith_permissive(ArithOp::Sub, v1, v2, env, ctx)
}

pub fn mul(v1: &Value, v2: &Value, env: &dyn Environment, ctx: ExecutionContext) -> Value {
    arith_permissive(ArithOp::Mul, v1, v2, env, ctx)
}

pub fn div(v1: &Value, v2: &Value, env: &dyn Environment, ctx: ExecutionContext) -> Value {
    arith_permissive(ArithOp::Div, v1, v2, env, ctx)
}

pub fn modulo(v1: &Value, v2: &Value, env: &dyn Environment, ctx: ExecutionContext) -> Value {
    arith_permissive(ArithOp::Mod, v1, v2, env, ctx)
}

pub fn negate(value: &Value, mode: ArithmeticMode) -> Result<Value, ArithmeticError> {
    match value {
        Value::Int(i) if mode == ArithmeticMode::Checked => {
            i.checked_neg().map(Value::Int).ok_or(ArithmeticError::Overflow { op: "-" })
        }
        Value::Int(i) => Ok(Value::Int(i.wrapping_neg())),
        Value::Float(f) => Ok(Value::Float(-f)),
        other => Err(ArithmeticError::IncompatibleOperand { op: "-", operand: other.type_name() }),
    }
}

/// Compare two values. Numbers compare across Int/Float in either order;
/// strings compare lexicographically; Bool and Null only support equality.
pub fn compare(op: CompareOp, lhs: &Value, rhs: &Value) -> Result<bool, ArithmeticError> {
    let ord = match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
        (Value::Int(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
        (Value::Float(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) if op.is_equality() => Some(a.cmp(b)),
        (Value::Null, Value::Null) if op.is_equality() => Some(std::cmp::Ordering::Equal),
        _ => {
            return Err(ArithmeticError::IncompatibleOperands {
                op: op.symbol(),
                lhs: lhs.type_name(),
                rhs: rhs.type_name(),
            });
        }
    };
    // NaN is unordered: only `!=` holds.
    Ok(match ord {
        Some(ord) => op.holds(ord),
        None => op == CompareOp::NotEqual,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const VM: ExecutionContext = ExecutionContext::Vm;

    fn checked(op: ArithOp, a: Value, b: Value) -> Result<Value, ArithmeticError> {
        arith(op, &a, &b, &EmptyEnv, VM, ArithmeticMode::Checked)
    }

    #[test]
    fn int_plus_float_commutes_and_widens() {
        for (a, b) in [(3i64, 0.5f64), (-7, 2.25), (0, -1.5)] {
            let ab = add(&Value::Int(a), &Value::Float(b), &EmptyEnv, VM);
            let ba = add(&Value::Float(b), &Value::Int(a), &EmptyEnv, VM);
            assert_eq!(ab, ba);
            assert_eq!(ab, Value::Float(a as f64 + b));
        }
    }

    #[test]
    fn mixed_sub_mul_widen() {
        assert_eq!(sub(&Value::Int(5), &Value::Float(0.5), &EmptyEnv, VM), Value::Float(4.5));
        assert_eq!(mul(&Value::Float(1.5), &Value::Int(2), &EmptyEnv, VM), Value::Float(3.0));
    }

    #[test]
    fn int_division_is_true_division() {
        assert_eq!(div(&Value::Int(7), &Value::Int(2), &EmptyEnv, VM), Value::Float(3.5));
        assert_eq!(checked(ArithOp::Div, Value::Int(6), Value::Int(3)), Ok(Value::Float(2.0)));
    }

    #[test]
    fn int_ops_stay_int() {
        assert_eq!(add(&Value::Int(2), &Value::Int(3), &EmptyEnv, VM), Value::Int(5));
        assert_eq!(modulo(&Value::Int(7), &Value::Int(3), &EmptyEnv, VM), Value::Int(1));
    }

    #[test]
    fn string_concat_only_for_add() {
        let a = Value::Str("ab".into());
        let b = Value::Str("cd".into());
        assert_eq!(add(&a, &b, &EmptyEnv, VM), Value::Str("abcd".into()));
        assert_eq!(sub(&a, &b, &EmptyEnv, VM), Value::Undefined);
    }

    #[test]
    fn incompatible_is_undefined_or_error() {
        let s = Value::Str("x".into());
        assert_eq!(add(&s, &Value::Int(1), &EmptyEnv, VM), Value::Undefined);
        assert_eq!(
            checked(ArithOp::Add, s, Value::Int(1)),
            Err(ArithmeticError::IncompatibleOperands { op: "+", lhs: "String", rhs: "Int" })
        );
    }

    #[test]
    fn mod_rejects_floats() {
        assert_eq!(modulo(&Value::Float(7.0), &Value::Int(2), &EmptyEnv, VM), Value::Undefined);
    }

    #[test]
    fn checked_division_by_zero() {
        assert_eq!(checked(ArithOp::Div, Value::Int(1), Value::Int(0)), Err(ArithmeticError::DivisionByZero));
        assert_eq!(checked(ArithOp::Mod, Value::Int(1), Value::Int(0)), Err(ArithmeticError::DivisionByZero));
        assert_eq!(div(&Value::Int(1), &Value::Int(0), &EmptyEnv, VM), Value::Float(f64::INFINITY));
    }

    #[test]
    fn checked_overflow_vs_wrapping() {
        assert_eq!(
            checked(ArithOp::Add, Value::Int(i64::MAX), Value::Int(1)),
            Err(ArithmeticError::Overflow { op: "+" })
        );
        assert_eq!(add(&Value::Int(i64::MAX), &Value::Int(1), &EmptyEnv, VM), Value::Int(i64::MIN));
    }

    #[test]
    fn tree_walk_resolves_refs() {
        let mut env: HashMap<String, Value> = HashMap::new();
        env.insert("x".into(), Value::Int(40));
        let r = Value::Ref("x".into());
        assert_eq!(add(&r, &Value::Int(2), &env, ExecutionContext::TreeWalk), Value::Int(42));
        // The VM never resolves names during arithmetic.
        assert_eq!(add(&r, &Value::Int(2), &env, VM), Value::Undefined);
    }

    struct Layered {
        local: HashMap<String, Value>,
        global: HashMap<String, Value>,
    }

    impl Environment for Layered {
        fn lookup_local(&self, name: &str) -> Option<Value> {
            self.local.get(name).cloned()
        }

        fn lookup_global(&self, name: &str) -> Option<Value> {
            self.global.get(name).cloned()
        }
    }

    #[test]
    fn tree_walk_falls_back_to_global() {
        let env = Layered {
            local: HashMap::from([("a".to_string(), Value::Int(1))]),
            global: HashMap::from([("a".to_string(), Value::Int(100)), ("g".to_string(), Value::Float(0.5))]),
        };
        let ctx = ExecutionContext::TreeWalk;
        assert_eq!(add(&Value::Ref("a".into()), &Value::Ref("g".into()), &env, ctx), Value::Float(1.5));
        assert_eq!(
            arith(ArithOp::Add, &Value::Ref("zz".into()), &Value::Int(1), &env, ctx, ArithmeticMode::Checked),
            Err(ArithmeticError::UnresolvedRef { name: "zz".into() })
        );
    }

    #[test]
    fn negate_numbers() {
        assert_eq!(negate(&Value::Int(3), ArithmeticMode::Checked), Ok(Value::Int(-3)));
        assert_eq!(negate(&Value::Float(1.5), ArithmeticMode::Checked), Ok(Value::Float(-1.5)));
        assert!(negate(&Value::Int(i64::MIN), ArithmeticMode::Checked).is_err());
        assert!(negate(&Value::Bool(true), ArithmeticMode::Permissive).is_err());
    }

    #[test]
    fn compare_all_numeric_orderings() {
        assert_eq!(compare(CompareOp::GreaterThan, &Value::Int(3), &Value::Int(2)), Ok(true));
        assert_eq!(compare(CompareOp::GreaterThan, &Value::Int(3), &Value::Float(3.5)), Ok(false));
        assert_eq!(compare(CompareOp::GreaterThan, &Value::Float(3.5), &Value::Int(3)), Ok(true));
        assert_eq!(compare(CompareOp::LessThanOrEqual, &Value::Float(2.0), &Value::Float(2.0)), Ok(true));
        assert_eq!(compare(CompareOp::Equal, &Value::Int(2), &Value::Float(2.0)), Ok(true));
    }

    #[test]
    fn compare_strings_bools_nulls() {
        let a = Value::Str("apple".into());
        let b = Value::Str("banana".into());
        assert_eq!(compare(CompareOp::LessThan, &a, &b), Ok(true));
        assert_eq!(compare(CompareOp::NotEqual, &Value::Bool(true), &Value::Bool(false)), Ok(true));
        assert_eq!(compare(CompareOp::Equal, &Value::Null, &Value::Null), Ok(true));
        assert!(compare(CompareOp::LessThan, &Value::Bool(true), &Value::Bool(false)).is_err());
        assert!(compare(CompareOp::Equal, &Value::Int(1), &Value::Str("1".into())).is_err());
    }

    #[test]
    fn nan_is_only_not_equal() {
        let nan = Value::Float(f64::NAN);
        assert_eq!(compare(CompareOp::Equal, &nan, &nan), Ok(false));
        assert_eq!(compare(CompareOp::NotEqual, &nan, &nan), Ok(true));
    }

    #[test]
    fn accessors_report_type_errors() {
        assert_eq!(Value::Int(4).as_int(), Ok(4));
        assert_eq!(Value::Str("s".into()).as_str(), Ok("s"));
        assert_eq!(
            Value::Int(4).as_bool(),
            Err(TypeError { expected: "Bool", found: "Int" })
        );
        assert_eq!(Value::Function("f".into()).as_function(), Ok("f"));
        assert!(Value::Undefined.as_float().is_err());
    }

    #[test]
    fn predicates() {
        assert!(Value::Int(0).is_zero());
        assert!(Value::Float(0.0).is_zero());
        assert!(!Value::Str(String::new()).is_zero());
        assert!(Value::Null.is_null());
        assert!(Value::Undefined.is_undefined());
        assert!(Value::Ref("x".into()).is_ref());
        assert!(Value::Function("f".into()).is_function());
    }

    #[test]
    fn display_formats() {
        assert_eq!(Value::Float(5.0).to_string(), "5");
        assert_eq!(Value::Float(3.5).to_string(), "3.5");
        assert_eq!(Value::Float(9223372036854775808.0).to_string(), "9223372036854775808");
        assert_eq!(Value::Float(-0.0).to_string(), "-0");
        assert_eq!(Value::Float(f64::INFINITY).to_string(), "inf");
        assert_eq!(Value::Int(-2).to_string(), "-2");
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::Null.to_string(), "null");
        let arr = Value::new_array(Type::Int, 2);
        assert_eq!(arr.to_string(), "[0, 0]");
    }

    #[test]
    fn arrays_are_shared_handles() {
        let a = Value::new_array(Type::String, 1);
        let b = a.clone();
        a.as_array().unwrap().borrow_mut().items[0] = Value::Str("hi".into());
        assert_eq!(b.as_array().unwrap().borrow().items[0], Value::Str("hi".into()));
    }
}
