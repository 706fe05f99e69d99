//! Bytecode listing for `--emit bytecode`.

use std::fmt::Write;

use super::chunk::{Chunk, Program};
use super::instruction::Instruction;

/// Disassemble every compiled chunk, in program order. Builtin markers are skipped.
pub fn disassemble(program: &Program) -> String {
    let mut output = String::new();
    for (i, chunk) in program.functions().enumerate() {
        if i > 0 {
            output.push('\n');
        }
        output.push_str(&disassemble_chunk(chunk));
    }
    output
}

pub fn disassemble_chunk(chunk: &Chunk) -> String {
    let mut output = String::new();
    let _ = write!(output, "== {}", chunk.name);
    if !chunk.arg_names.is_empty() {
        let _ = write!(output, " (args: {})", chunk.arg_names.join(", "));
    }
    if chunk.does_return {
        output.push_str(" returns");
    }
    output.push_str(" ==\n");

    for (offset, instr) in chunk.code.iter().enumerate() {
        let _ = write!(output, "{offset:04} {instr}");
        if let Instruction::Jmp(delta) | Instruction::JmpIfFalse(delta) = instr {
            let target = offset as isize + 1 + delta;
            let _ = write!(output, "  -> {target:04}");
        }
        output.push('\n');
    }
    output
}
