/// An entry in the error code registry.
pub struct ErrorEntry {
    pub code: &'static str,
    pub short: &'static str,  // brief description for --explain headers and tooling
    pub long: &'static str,   // full explanation for --explain
}

/// All stable error codes for miniscala.
pub static REGISTRY: &[ErrorEntry] = &[
    // ── Lexer ──────────────────────────────────────────────────────────────────────
    ErrorEntry {
        code: "MS-L001",
        short: "unexpected character",
        long: r#"## MS-L001: unexpected character

A character was encountered that is not part of miniscala.

**Example:**

    val x = 1 & 2

A single `&` is not an operator. Use `&&` for logical and, `||` for
logical or. Strings use double quotes, never single quotes.
"#,
    },
    ErrorEntry {
        code: "MS-L002",
        short: "unterminated or invalid string literal",
        long: r#"## MS-L002: unterminated or invalid string literal

A string literal was not closed on the same line, or it contains an
escape sequence the lexer does not know.

**Example:**

    print("hello)

Valid escapes are `\n`, `\t`, `\r`, `\"` and `\\`.
"#,
    },
    // ── Parser ─────────────────────────────────────────────────────────────────────
    ErrorEntry {
        code: "MS-P001",
        short: "unexpected token",
        long: r#"## MS-P001: unexpected token

The parser expected one token and found another.

**Example:**

    def f(x: Int: Int { return x }

The parameter list is missing its closing `)`.
"#,
    },
    ErrorEntry {
        code: "MS-P002",
        short: "unexpected end of input",
        long: r#"## MS-P002: unexpected end of input

The source ended in the middle of a statement or expression.

**Example:**

    val x = 1 +

Finish the expression or remove the dangling operator.
"#,
    },
    ErrorEntry {
        code: "MS-P003",
        short: "expected identifier",
        long: r#"## MS-P003: expected identifier

A name was required here, such as after `val`, `var` or `def`, or as
a parameter name.

**Example:**

    val 1 = 2
"#,
    },
    ErrorEntry {
        code: "MS-P004",
        short: "unknown type name",
        long: r#"## MS-P004: unknown type name

Type annotations must name one of the built-in types: `Int`, `Float`,
`String`, `Bool`, `Unit` or `Array`.

**Example:**

    def f(x: Integer): Int { return x }

**Fix:**

    def f(x: Int): Int { return x }
"#,
    },
    ErrorEntry {
        code: "MS-P005",
        short: "identifier statement is neither a call nor an assignment",
        long: r#"## MS-P005: identifier statement is neither a call nor an assignment

A statement that starts with a name must either assign to it or call it.

**Example:**

    x + 1

Bare expressions are not statements. Bind the value with `val`, or
assign it with `x = x + 1`.
"#,
    },
    ErrorEntry {
        code: "MS-P006",
        short: "expected a statement",
        long: r#"## MS-P006: expected a statement

The token cannot start a statement. Statements are `val`, `var`, `def`,
`if`, `while`, `return`, a block `{ ... }`, an assignment or a call.
"#,
    },
    ErrorEntry {
        code: "MS-P007",
        short: "missing return type",
        long: r#"## MS-P007: missing return type

Every function declares its return type after the parameter list.

**Example:**

    def greet(name: String) { print(name) }

**Fix:**

    def greet(name: String): Unit { print(name) }
"#,
    },
    ErrorEntry {
        code: "MS-P008",
        short: "unclosed block",
        long: r#"## MS-P008: unclosed block

A `{` was opened but the source ended before the matching `}`.
"#,
    },
    ErrorEntry {
        code: "MS-P009",
        short: "expected an expression",
        long: r#"## MS-P009: expected an expression

The token cannot start an expression. Expressions are literals, names,
calls, parenthesised expressions and unary `-` or `!` applied to one.

**Example:**

    val x = * 2
"#,
    },
    // ── Verifier ───────────────────────────────────────────────────────────────────
    ErrorEntry {
        code: "MS-T001",
        short: "builtin cannot be redefined",
        long: r#"## MS-T001: builtin cannot be redefined

A function was declared with the name of a builtin (`print`,
`to_string`, `array_new`, `array_set`, `array_get`, `array_size`).
Pick another name.
"#,
    },
    ErrorEntry {
        code: "MS-T002",
        short: "duplicate function definition",
        long: r#"## MS-T002: duplicate function definition

Two top-level functions share a name. Function names must be unique;
there is no overloading.
"#,
    },
    ErrorEntry {
        code: "MS-T003",
        short: "duplicate parameter",
        long: r#"## MS-T003: duplicate parameter

Two parameters of the same function share a name.

**Example:**

    def f(a: Int, a: Int): Int { return a }
"#,
    },
    ErrorEntry {
        code: "MS-T004",
        short: "missing return",
        long: r#"## MS-T004: missing return

A function with a non-`Unit` return type has a path that falls off the
end of the body without returning a value.

**Example:**

    def sign(x: Int): Int {
        if (x > 0) { return 1 }
    }

**Fix:** return on every path, e.g. add an `else` branch or a final
`return 0`.
"#,
    },
    ErrorEntry {
        code: "MS-T005",
        short: "nested function definition",
        long: r#"## MS-T005: nested function definition

Functions can only be defined at the top level of a program, not
inside another function, block or loop.
"#,
    },
    ErrorEntry {
        code: "MS-T006",
        short: "undefined variable",
        long: r#"## MS-T006: undefined variable

A name was read or assigned before it was declared, or it is not
visible from here. Functions only see their own parameters and locals,
never top-level variables.

**Example:**

    val limit = 10
    def f(): Int { return limit }

Pass the value as a parameter instead.
"#,
    },
    ErrorEntry {
        code: "MS-T007",
        short: "assignment to a val",
        long: r#"## MS-T007: assignment to a val

`val` bindings are immutable.

**Example:**

    val x = 1
    x = 2

**Fix:** declare it with `var x = 1`.
"#,
    },
    ErrorEntry {
        code: "MS-T008",
        short: "type mismatch",
        long: r#"## MS-T008: type mismatch

A value of one type was assigned to a variable, or passed to a
parameter, of a different type. `Int` does not widen to `Float` on
assignment; write `1.0` instead of `1` where a `Float` is expected.
"#,
    },
    ErrorEntry {
        code: "MS-T009",
        short: "return value mismatch",
        long: r#"## MS-T009: return value mismatch

A `return` does not agree with the function's declared return type:
the value has the wrong type, a value is missing, or a `Unit` function
returns one.

Note that statements are not newline-terminated: a bare `return`
followed by an expression on the next line returns that expression.
Write `return;` to return nothing.
"#,
    },
    ErrorEntry {
        code: "MS-T010",
        short: "binding a Unit value",
        long: r#"## MS-T010: binding a Unit value

The right-hand side produces no value, so there is nothing to bind.

**Example:**

    val x = print("hi")
"#,
    },
    ErrorEntry {
        code: "MS-T011",
        short: "already declared in this scope",
        long: r#"## MS-T011: already declared in this scope

A `val` or `var` with this name already exists in the same scope.
Inner blocks may shadow outer names, but a scope cannot declare the
same name twice.
"#,
    },
    ErrorEntry {
        code: "MS-T012",
        short: "condition is not Bool",
        long: r#"## MS-T012: condition is not Bool

`if` and `while` conditions must be `Bool`. There is no truthiness.

**Example:**

    while (1) { }

**Fix:**

    while (true) { }
"#,
    },
    ErrorEntry {
        code: "MS-T013",
        short: "undefined function",
        long: r#"## MS-T013: undefined function

A call names a function that is neither declared in the program nor a
builtin.
"#,
    },
    ErrorEntry {
        code: "MS-T014",
        short: "arity mismatch",
        long: r#"## MS-T014: arity mismatch

A call passes a different number of arguments than the function
declares.
"#,
    },
    ErrorEntry {
        code: "MS-T015",
        short: "invalid operand types",
        long: r#"## MS-T015: invalid operand types

An operator was applied to operand types it does not support.

- `+` works on numbers and on two strings
- `-`, `*`, `/` work on numbers; `/` always yields `Float`
- `%` works on two `Int`s
- `<`, `<=`, `>`, `>=` work on numbers or on two strings
- `&&`, `||`, `!` work on `Bool`
"#,
    },
    ErrorEntry {
        code: "MS-T016",
        short: "Unit value used as a value",
        long: r#"## MS-T016: Unit value used as a value

A call to a function that returns `Unit` produces no value, so its result
cannot be passed as an argument, returned, assigned or used as an operand.

**Example:**

    def log(): Unit { print("x") }
    print(to_string(log()))

**Fix:** call the function as a statement, or give it a return type.
"#,
    },
    ErrorEntry {
        code: "MS-T017",
        short: "Unit parameter",
        long: r#"## MS-T017: Unit parameter

A parameter was declared with type `Unit`. No expression produces a
`Unit` value, so such a function could never be called.

**Fix:** use a value type for the parameter, or remove it.
"#,
    },
    ErrorEntry {
        code: "MS-T018",
        short: "invalid main signature",
        long: r#"## MS-T018: invalid main signature

An explicit entry point must be declared exactly as `def main(): Unit`.
It is entered with no arguments and its result is discarded.

**Example:**

    def main(n: Int): Int { return n + 1 }

**Fix:** declare it as `def main(): Unit` and move the logic into a helper.
"#,
    },
    // ── Compiler ───────────────────────────────────────────────────────────────────
    ErrorEntry {
        code: "MS-C001",
        short: "compile error: undefined function",
        long: r#"## MS-C001: compile error: undefined function

The bytecode compiler met a call to an unknown function. Normally
caught earlier by the verifier (MS-T013); seen with `--no-verify`.
"#,
    },
    ErrorEntry {
        code: "MS-C002",
        short: "compile error: duplicate function",
        long: r#"## MS-C002: compile error: duplicate function

The bytecode compiler met two functions with the same name. Normally
caught earlier by the verifier (MS-T002).
"#,
    },
    ErrorEntry {
        code: "MS-C003",
        short: "compile error: builtin redefined",
        long: r#"## MS-C003: compile error: builtin redefined

The bytecode compiler met a function named after a builtin. Normally
caught earlier by the verifier (MS-T001).
"#,
    },
    ErrorEntry {
        code: "MS-C004",
        short: "compile error: nested function",
        long: r#"## MS-C004: compile error: nested function

The bytecode compiler met a `def` that is not at the top level.
Normally caught earlier by the verifier (MS-T005).
"#,
    },
    ErrorEntry {
        code: "MS-C005",
        short: "compile error: arity mismatch",
        long: r#"## MS-C005: compile error: arity mismatch

The bytecode compiler met a call with the wrong number of arguments.
Normally caught earlier by the verifier (MS-T014).
"#,
    },
    ErrorEntry {
        code: "MS-C006",
        short: "explicit main mixed with top-level statements",
        long: r#"## MS-C006: explicit main mixed with top-level statements

A program either declares `def main(): Unit { ... }` or has loose
top-level statements that become the entry point. It cannot do both.

Move the top-level statements into `main`, or remove `main`.
"#,
    },
    ErrorEntry {
        code: "MS-C007",
        short: "invalid main signature",
        long: r#"## MS-C007: invalid main signature

Reported by the compiler when verification is skipped and `main` is
declared with parameters or a return type. The entry point must be
`def main(): Unit`. See MS-T018.
"#,
    },
    // ── Runtime ────────────────────────────────────────────────────────────────────
    ErrorEntry {
        code: "MS-R001",
        short: "undefined chunk",
        long: r#"## MS-R001: undefined chunk

The VM could not find a chunk by name, most often because the program
has no entry point.
"#,
    },
    ErrorEntry {
        code: "MS-R002",
        short: "runtime: undefined variable",
        long: r#"## MS-R002: runtime: undefined variable

A variable was read that is not bound in the current frame. Normally
caught by the verifier (MS-T006).
"#,
    },
    ErrorEntry {
        code: "MS-R003",
        short: "runtime: already declared",
        long: r#"## MS-R003: runtime: already declared

A declaration targeted a name already bound in the innermost scope.
Normally caught by the verifier (MS-T011).
"#,
    },
    ErrorEntry {
        code: "MS-R004",
        short: "runtime: assignment to immutable binding",
        long: r#"## MS-R004: runtime: assignment to immutable binding

An assignment targeted a `val`. Normally caught by the verifier
(MS-T007).
"#,
    },
    ErrorEntry {
        code: "MS-R005",
        short: "runtime: operand type error",
        long: r#"## MS-R005: runtime: operand type error

An instruction received an operand of the wrong type, for example a
non-`Bool` condition for a conditional jump.
"#,
    },
    ErrorEntry {
        code: "MS-R006",
        short: "runtime: incompatible operands",
        long: r#"## MS-R006: runtime: incompatible operands

An arithmetic or comparison instruction received operands it cannot
combine. With `--permissive`, arithmetic yields `Undefined` instead of
failing; comparisons always fail.
"#,
    },
    ErrorEntry {
        code: "MS-R007",
        short: "division by zero",
        long: r#"## MS-R007: division by zero

An `Int` division or modulo by zero. `Float` division by zero is also
an error unless `--permissive` is given, in which case it yields an
infinity.
"#,
    },
    ErrorEntry {
        code: "MS-R008",
        short: "integer overflow",
        long: r#"## MS-R008: integer overflow

An `Int` operation overflowed 64 bits. Arithmetic is checked by default;
`--permissive` wraps instead.
"#,
    },
    ErrorEntry {
        code: "MS-R009",
        short: "unresolved reference",
        long: r#"## MS-R009: unresolved reference

An arithmetic operand was a reference that could not be resolved in the
current environment.
"#,
    },
    ErrorEntry {
        code: "MS-R010",
        short: "builtin argument error",
        long: r#"## MS-R010: builtin argument error

A builtin received an argument it cannot use: a value of the wrong
type, a negative `array_new` count, or an unknown element type name.
Element types are `Int`, `Float`, `String`, `Bool` and `Array`.
"#,
    },
    ErrorEntry {
        code: "MS-R011",
        short: "array index out of bounds",
        long: r#"## MS-R011: array index out of bounds

`array_get` or `array_set` was called with an index below zero or at
least the array's size. Check with `array_size` first.
"#,
    },
    ErrorEntry {
        code: "MS-R012",
        short: "array element type mismatch",
        long: r#"## MS-R012: array element type mismatch

`array_set` stored a value whose type differs from the element type the
array was created with.

**Example:**

    val a = array_new(2, "Int")
    array_set(a, 0, "x")
"#,
    },
    ErrorEntry {
        code: "MS-R013",
        short: "operand stack overflow",
        long: r#"## MS-R013: operand stack overflow

The operand stack exceeded its capacity. Raise it with `--stack-size`.
"#,
    },
    ErrorEntry {
        code: "MS-R014",
        short: "operand stack underflow",
        long: r#"## MS-R014: operand stack underflow

An instruction popped from an empty operand stack. This indicates a
compiler bug, not a user error.
"#,
    },
    ErrorEntry {
        code: "MS-R015",
        short: "call depth exceeded",
        long: r#"## MS-R015: call depth exceeded

The call chain grew past its limit, usually through recursion without
a reachable base case. Raise the limit with `--max-depth`.
"#,
    },
    ErrorEntry {
        code: "MS-R016",
        short: "jump out of range",
        long: r#"## MS-R016: jump out of range

A jump targeted an offset outside its chunk. This indicates a compiler
bug, not a user error.
"#,
    },
    ErrorEntry {
        code: "MS-R017",
        short: "scope underflow",
        long: r#"## MS-R017: scope underflow

A scope exit had no matching scope entry. This indicates a compiler bug,
not a user error.
"#,
    },
    ErrorEntry {
        code: "MS-R018",
        short: "output error",
        long: r#"## MS-R018: output error

Writing program output failed, for example because stdout was closed.
"#,
    },
];

/// Look up an error entry by code (e.g. `"MS-T006"`). Case-insensitive.
pub fn lookup(code: &str) -> Option<&'static ErrorEntry> {
    REGISTRY.iter().find(|e| e.code.eq_ignore_ascii_case(code))
}
