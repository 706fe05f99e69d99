use super::value::Value;

/// Whether a `SetLocal` introduces a binding or overwrites an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoringCtx {
    Declare,
    Assign,
}

/// One VM instruction. Jumps are relative to the instruction after the jump;
/// calls refer to chunks by name.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    // Arithmetic: pop 2, push 1 (Negate: pop 1, push 1)
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Negate,

    LogicalAnd,
    LogicalOr,
    LogicalNot,

    // Comparison: pop 2, push Bool
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    Equal,
    NotEqual,

    LoadImm(Value),
    True,
    False,
    Null,

    LoadRef(String),
    SetLocal { name: String, ctx: StoringCtx, immutable: bool },

    EnterScope,
    ExitScope,

    Jmp(isize),
    JmpIfFalse(isize),
    Call { func: String, arg_names: Vec<String> },
    Return,
    /// Discard the top of stack.
    Pop,
}

impl Instruction {
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Instruction::Add => "ADD",
            Instruction::Sub => "SUB",
            Instruction::Mul => "MUL",
            Instruction::Div => "DIV",
            Instruction::Mod => "MOD",
            Instruction::Negate => "NEG",
            Instruction::LogicalAnd => "AND",
            Instruction::LogicalOr => "OR",
            Instruction::LogicalNot => "NOT",
            Instruction::GreaterThan => "GT",
            Instruction::GreaterThanOrEqual => "GE",
            Instruction::LessThan => "LT",
            Instruction::LessThanOrEqual => "LE",
            Instruction::Equal => "EQ",
            Instruction::NotEqual => "NE",
            Instruction::LoadImm(_) => "LOADIMM",
            Instruction::True => "TRUE",
            Instruction::False => "FALSE",
            Instruction::Null => "NULL",
            Instruction::LoadRef(_) => "LOADREF",
            Instruction::SetLocal { .. } => "SETLOCAL",
            Instruction::EnterScope => "ENTER",
            Instruction::ExitScope => "EXIT",
            Instruction::Jmp(_) => "JMP",
            Instruction::JmpIfFalse(_) => "JMPF",
            Instruction::Call { .. } => "CALL",
            Instruction::Return => "RET",
            Instruction::Pop => "POP",
        }
    }
}

impl std::fmt::Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let m = self.mnemonic();
        match self {
            Instruction::LoadImm(Value::Str(s)) => write!(f, "{m:<8} {s:?}"),
            Instruction::LoadImm(v) => write!(f, "{m:<8} {v}"),
            Instruction::LoadRef(name) => write!(f, "{m:<8} {name}"),
            Instruction::SetLocal { name, ctx, immutable } => {
                let ctx = match ctx {
                    StoringCtx::Declare => "declare",
                    StoringCtx::Assign => "assign",
                };
                write!(f, "{m:<8} {name} {ctx}")?;
                if *immutable {
                    write!(f, " val")?;
                }
                Ok(())
            }
            Instruction::Jmp(off) | Instruction::JmpIfFalse(off) => write!(f, "{m:<8} {off:+}"),
            Instruction::Call { func, arg_names } => write!(f, "{m:<8} {func}({})", arg_names.join(", ")),
            _ => f.write_str(m),
        }
    }
}
