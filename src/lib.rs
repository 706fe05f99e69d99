//! miniscala: a small statically typed scripting language.
//!
//! Source goes through [`lexer`], [`parser`] and [`verify`], then
//! [`vm::compile`] lowers it to one bytecode chunk per function and
//! [`vm::Vm`] runs the `main` chunk on an operand stack.

pub mod ast;
pub mod diagnostic;
pub mod lexer;
pub mod parser;
pub mod verify;
pub mod vm;

use diagnostic::Diagnostic;

/// Lex and parse, collecting every parse error the parser recovers from.
pub fn parse_source(source: &str) -> Result<ast::Program, Vec<Diagnostic>> {
    let tokens = lexer::lex(source).map_err(|e| vec![Diagnostic::from(&e).with_source(source)])?;
    let (mut program, errors) = parser::Parser::new(tokens).parse_program();
    if !errors.is_empty() {
        return Err(errors.iter().map(|e| Diagnostic::from(e).with_source(source)).collect());
    }
    program.source = Some(source.to_string());
    Ok(program)
}

pub fn verify_program(program: &ast::Program) -> Result<(), Vec<Diagnostic>> {
    verify::verify(program).map_err(|errors| errors.iter().map(Diagnostic::from).collect())
}

/// Parse, optionally verify, and compile to a chunk store.
pub fn compile_source(source: &str, verify: bool) -> Result<vm::Program, Vec<Diagnostic>> {
    let program = parse_source(source)?;
    if verify {
        verify_program(&program)?;
    }
    vm::compile(&program).map_err(|e| vec![Diagnostic::from(&e).with_source(source)])
}
