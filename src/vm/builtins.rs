//! Runtime functions that bypass the call chain.

use std::io::Write;

use crate::ast::Type;

use super::value::Value;

pub struct Builtin {
    pub name: &'static str,
    pub arg_names: &'static [&'static str],
    pub params: &'static [Type],
    pub returns: Type,
}

pub const BUILTINS: &[Builtin] = &[
    Builtin { name: "print", arg_names: &["value"], params: &[Type::Any], returns: Type::Unit },
    Builtin { name: "to_string", arg_names: &["value"], params: &[Type::Any], returns: Type::String },
    Builtin {
        name: "array_new",
        arg_names: &["count", "element_type"],
        params: &[Type::Int, Type::String],
        returns: Type::Array,
    },
    Builtin {
        name: "array_set",
        arg_names: &["array", "index", "value"],
        params: &[Type::Array, Type::Int, Type::Any],
        returns: Type::Unit,
    },
    Builtin { name: "array_get", arg_names: &["array", "index"], params: &[Type::Array, Type::Int], returns: Type::Any },
    Builtin { name: "array_size", arg_names: &["array"], params: &[Type::Array], returns: Type::Int },
];

pub fn lookup(name: &str) -> Option<&'static Builtin> {
    BUILTINS.iter().find(|b| b.name == name)
}

pub fn is_builtin(name: &str) -> bool {
    lookup(name).is_some()
}

#[derive(Debug, thiserror::Error)]
pub enum BuiltinError {
    #[error("'{func}' argument '{arg}' expects {expected}, got {found}")]
    BadArgument { func: &'static str, arg: &'static str, expected: &'static str, found: &'static str },
    #[error("'{func}' expects {expected} arguments, got {found}")]
    Arity { func: &'static str, expected: usize, found: usize },
    #[error("unknown element type '{0}' for array_new")]
    UnknownElementType(String),
    #[error("array_new needs a non-negative count, got {0}")]
    NegativeCount(i64),
    #[error("index {index} out of bounds for array of size {size}")]
    IndexOutOfBounds { index: i64, size: usize },
    #[error("array of {expected} cannot hold a {found}")]
    ElementType { expected: Type, found: &'static str },
    #[error("builtin '{0}' has no handler")]
    Unhandled(&'static str),
    #[error("output error: {0}")]
    Io(#[from] std::io::Error),
}

fn arg_as<'v, T>(
    builtin: &Builtin,
    args: &'v [Value],
    i: usize,
    get: impl FnOnce(&'v Value) -> Result<T, super::value::TypeError>,
) -> Result<T, BuiltinError> {
    get(&args[i]).map_err(|e| BuiltinError::BadArgument {
        func: builtin.name,
        arg: builtin.arg_names[i],
        expected: e.expected,
        found: e.found,
    })
}

fn index_in(index: i64, size: usize) -> Result<usize, BuiltinError> {
    usize::try_from(index)
        .ok()
        .filter(|&i| i < size)
        .ok_or(BuiltinError::IndexOutOfBounds { index, size })
}

/// Run a builtin with arguments in declaration order. Returns `Value::Unit`
/// for builtins with no result.
pub fn call<W: Write>(builtin: &'static Builtin, args: &[Value], out: &mut W) -> Result<Value, BuiltinError> {
    if args.len() != builtin.params.len() {
        return Err(BuiltinError::Arity { func: builtin.name, expected: builtin.params.len(), found: args.len() });
    }
    match builtin.name {
        "print" => {
            write!(out, "{}", args[0])?;
            Ok(Value::Unit)
        }
        "to_string" => Ok(Value::Str(args[0].to_string())),
        "array_new" => {
            let count = arg_as(builtin, args, 0, Value::as_int)?;
            let ty_name = arg_as(builtin, args, 1, Value::as_str)?;
            let element_type = Type::from_name(ty_name)
                .filter(|t| *t != Type::Unit)
                .ok_or_else(|| BuiltinError::UnknownElementType(ty_name.to_string()))?;
            let len = usize::try_from(count).map_err(|_| BuiltinError::NegativeCount(count))?;
            Ok(Value::new_array(element_type, len))
        }
        "array_set" => {
            let array = arg_as(builtin, args, 0, Value::as_array)?;
            let index = arg_as(builtin, args, 1, Value::as_int)?;
            let value = &args[2];
            let mut array = array.borrow_mut();
            let slot = index_in(index, array.items.len())?;
            if array.element_type != Type::Any && value.ty() != Some(array.element_type) {
                return Err(BuiltinError::ElementType { expected: array.element_type, found: value.type_name() });
            }
            array.items[slot] = value.clone();
            Ok(Value::Unit)
        }
        "array_get" => {
            let array = arg_as(builtin, args, 0, Value::as_array)?;
            let index = arg_as(builtin, args, 1, Value::as_int)?;
            let array = array.borrow();
            let slot = index_in(index, array.items.len())?;
            Ok(array.items[slot].clone())
        }
        "array_size" => {
            let array = arg_as(builtin, args, 0, Value::as_array)?;
            let size = array.borrow().items.len();
            Ok(Value::Int(size as i64))
        }
        other => Err(BuiltinError::Unhandled(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(name: &str, args: &[Value]) -> Result<Value, BuiltinError> {
        let mut out: Vec<u8> = Vec::new();
        call(lookup(name).unwrap(), args, &mut out)
    }

    #[test]
    fn print_writes_without_newline() {
        let mut out: Vec<u8> = Vec::new();
        let result = call(lookup("print").unwrap(), &[Value::Str("hi".into())], &mut out).unwrap();
        assert_eq!(result, Value::Unit);
        assert_eq!(out, b"hi");
    }

    #[test]
    fn to_string_formats_values() {
        assert_eq!(run("to_string", &[Value::Int(5)]).unwrap(), Value::Str("5".into()));
        assert_eq!(run("to_string", &[Value::Float(3.5)]).unwrap(), Value::Str("3.5".into()));
        assert_eq!(run("to_string", &[Value::Bool(false)]).unwrap(), Value::Str("false".into()));
    }

    #[test]
    fn array_lifecycle() {
        let arr = run("array_new", &[Value::Int(3), Value::Str("Int".into())]).unwrap();
        assert_eq!(run("array_size", &[arr.clone()]).unwrap(), Value::Int(3));
        run("array_set", &[arr.clone(), Value::Int(1), Value::Int(42)]).unwrap();
        assert_eq!(run("array_get", &[arr.clone(), Value::Int(1)]).unwrap(), Value::Int(42));
        assert_eq!(run("array_get", &[arr, Value::Int(0)]).unwrap(), Value::Int(0));
    }

    #[test]
    fn array_set_checks_element_type() {
        let arr = run("array_new", &[Value::Int(1), Value::Str("Int".into())]).unwrap();
        let err = run("array_set", &[arr, Value::Int(0), Value::Str("x".into())]).unwrap_err();
        assert!(matches!(err, BuiltinError::ElementType { expected: Type::Int, found: "String" }));
    }

    #[test]
    fn array_index_bounds() {
        let arr = run("array_new", &[Value::Int(2), Value::Str("Float".into())]).unwrap();
        assert!(matches!(
            run("array_get", &[arr.clone(), Value::Int(2)]),
            Err(BuiltinError::IndexOutOfBounds { index: 2, size: 2 })
        ));
        assert!(matches!(
            run("array_get", &[arr, Value::Int(-1)]),
            Err(BuiltinError::IndexOutOfBounds { index: -1, .. })
        ));
    }

    #[test]
    fn array_new_rejects_bad_input() {
        assert!(matches!(
            run("array_new", &[Value::Int(1), Value::Str("Widget".into())]),
            Err(BuiltinError::UnknownElementType(_))
        ));
        assert!(matches!(
            run("array_new", &[Value::Int(-1), Value::Str("Int".into())]),
            Err(BuiltinError::NegativeCount(-1))
        ));
        assert!(matches!(
            run("array_size", &[Value::Int(1)]),
            Err(BuiltinError::BadArgument { func: "array_size", arg: "array", .. })
        ));
    }

    #[test]
    fn signatures_are_consistent() {
        for b in BUILTINS {
            assert_eq!(b.arg_names.len(), b.params.len(), "{}", b.name);
        }
        assert!(is_builtin("print"));
        assert!(!is_builtin("main"));
    }
}
