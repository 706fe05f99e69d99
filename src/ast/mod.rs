use serde::{Deserialize, Serialize};

pub mod source_map;
pub use source_map::SourceMap;

// ---- Span infrastructure ----

/// Byte range within source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub const UNKNOWN: Span = Span { start: 0, end: 0 };

    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// Wraps a node with its source span. Transparent to serde (serializes as inner node only).
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Spanned { node, span }
    }

    pub fn unknown(node: T) -> Self {
        Spanned { node, span: Span::UNKNOWN }
    }
}

impl<T> std::ops::Deref for Spanned<T> {
    type Target = T;
    fn deref(&self) -> &T {
        &self.node
    }
}

impl<T: Serialize> Serialize for Spanned<T> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.node.serialize(serializer)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Spanned<T> {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        T::deserialize(deserializer).map(|node| Spanned { node, span: Span::UNKNOWN })
    }
}

// ---- Core AST types ----

/// Source-level type names: `Int`, `Float`, `String`, `Bool`, `Unit`, `Array`.
/// `Null` is the type of the `null` literal; `Any` only appears in builtin signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    Int,
    Float,
    String,
    Bool,
    Unit,
    Array,
    Null,
    Any,
}

impl Type {
    pub fn from_name(name: &str) -> Option<Type> {
        match name {
            "Int" => Some(Type::Int),
            "Float" => Some(Type::Float),
            "String" => Some(Type::String),
            "Bool" => Some(Type::Bool),
            "Unit" => Some(Type::Unit),
            "Array" => Some(Type::Array),
            "Null" => Some(Type::Null),
            "Any" => Some(Type::Any),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Type::Int => "Int",
            Type::Float => "Float",
            Type::String => "String",
            Type::Bool => "Bool",
            Type::Unit => "Unit",
            Type::Array => "Array",
            Type::Null => "Null",
            Type::Any => "Any",
        }
    }
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A parameter: `name: Type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub ty: Type,
}

/// `{ stmts }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub stmts: Vec<Spanned<Stmt>>,
}

/// Statements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    /// `var name = value`
    VarDecl { name: String, value: Spanned<Expr> },

    /// `val name = value`, an immutable binding
    ValDecl { name: String, value: Spanned<Expr> },

    /// `def name(params): return_type { body }`
    DefDecl {
        name: String,
        params: Vec<Param>,
        return_type: Type,
        body: Block,
    },

    /// `if (cond) { then_body } else ...`; `else_body` is a block or a nested `if`
    If {
        cond: Spanned<Expr>,
        then_body: Block,
        else_body: Option<Box<Spanned<Stmt>>>,
    },

    /// `while (cond) { body }`
    While { cond: Spanned<Expr>, body: Block },

    /// `name = value`
    Assignment { name: String, value: Spanned<Expr> },

    Block(Block),

    /// `return` or `return value`
    Return(Option<Spanned<Expr>>),

    /// Expression as statement (only calls are accepted by the parser)
    Expr(Spanned<Expr>),
}

/// Expressions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Literal(Literal),

    /// Variable reference
    Name(String),

    /// `callee(args...)`
    Call {
        callee: String,
        args: Vec<Spanned<Expr>>,
    },

    /// Infix binary operation
    Operation {
        op: BinOp,
        lhs: Box<Spanned<Expr>>,
        rhs: Box<Spanned<Expr>>,
    },

    /// `-expr` or `!expr`
    Unary {
        op: UnaryOp,
        operand: Box<Spanned<Expr>>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Int(i64),
    Float(f64),
    String(String),
    Bool(bool),
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Equal,
    NotEqual,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    LogicalAnd,
    LogicalOr,
}

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Equal => "==",
            BinOp::NotEqual => "!=",
            BinOp::GreaterThan => ">",
            BinOp::GreaterThanOrEqual => ">=",
            BinOp::LessThan => "<",
            BinOp::LessThanOrEqual => "<=",
            BinOp::LogicalAnd => "&&",
            BinOp::LogicalOr => "||",
        }
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinOp::Equal
                | BinOp::NotEqual
                | BinOp::GreaterThan
                | BinOp::GreaterThanOrEqual
                | BinOp::LessThan
                | BinOp::LessThanOrEqual
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Negate,
    Not,
}

/// A complete program is a list of top-level statements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub stmts: Vec<Spanned<Stmt>>,
    #[serde(skip)]
    pub source: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_unknown_is_zero() {
        assert_eq!(Span::UNKNOWN, Span { start: 0, end: 0 });
    }

    #[test]
    fn span_merge_takes_extremes() {
        let a = Span { start: 5, end: 10 };
        let b = Span { start: 2, end: 15 };
        assert_eq!(a.merge(b), Span { start: 2, end: 15 });
    }

    #[test]
    fn span_merge_non_overlapping() {
        let a = Span { start: 0, end: 5 };
        let b = Span { start: 10, end: 20 };
        assert_eq!(a.merge(b), Span { start: 0, end: 20 });
    }

    #[test]
    fn spanned_deref() {
        let s = Spanned::new(42, Span { start: 0, end: 2 });
        assert_eq!(*s, 42);
    }

    #[test]
    fn spanned_serialize_transparent() {
        let s = Spanned::new(42i32, Span { start: 5, end: 10 });
        let json = serde_json::to_string(&s).unwrap();
        assert_eq!(json, "42");
    }

    #[test]
    fn spanned_deserialize_transparent() {
        let s: Spanned<i32> = serde_json::from_str("42").unwrap();
        assert_eq!(s.node, 42);
        assert_eq!(s.span, Span::UNKNOWN);
    }

    #[test]
    fn type_names_round_trip() {
        for ty in [Type::Int, Type::Float, Type::String, Type::Bool, Type::Unit, Type::Array] {
            assert_eq!(Type::from_name(ty.name()), Some(ty));
        }
        assert_eq!(Type::from_name("Integer"), None);
    }

    #[test]
    fn comparison_ops() {
        assert!(BinOp::LessThanOrEqual.is_comparison());
        assert!(BinOp::NotEqual.is_comparison());
        assert!(!BinOp::Add.is_comparison());
        assert!(!BinOp::LogicalAnd.is_comparison());
    }

    #[test]
    fn program_source_not_serialized() {
        let prog = Program {
            stmts: vec![Spanned::unknown(Stmt::Expr(Spanned::unknown(Expr::Call {
                callee: "print".to_string(),
                args: vec![Spanned::unknown(Expr::Literal(Literal::String("hi".into())))],
            })))],
            source: Some("print(\"hi\")".to_string()),
        };
        let json = serde_json::to_string(&prog).unwrap();
        assert!(!json.contains("source"));
        assert!(json.contains("print"));
    }

    #[test]
    fn program_json_round_trip() {
        let prog = Program {
            stmts: vec![Spanned::new(
                Stmt::DefDecl {
                    name: "id".to_string(),
                    params: vec![Param { name: "x".to_string(), ty: Type::Int }],
                    return_type: Type::Int,
                    body: Block {
                        stmts: vec![Spanned::unknown(Stmt::Return(Some(Spanned::unknown(
                            Expr::Name("x".to_string()),
                        ))))],
                    },
                },
                Span { start: 0, end: 30 },
            )],
            source: None,
        };
        let json = serde_json::to_string_pretty(&prog).unwrap();
        let back: Program = serde_json::from_str(&json).unwrap();
        assert_eq!(back.stmts.len(), 1);
        assert_eq!(back.stmts[0].span, Span::UNKNOWN);
        assert!(matches!(&back.stmts[0].node, Stmt::DefDecl { name, .. } if name == "id"));
    }
}
