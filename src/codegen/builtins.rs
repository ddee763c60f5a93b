//! Inline expansion of builtin functions (`spec.md` §4.C), grounded on
//! `original_source/lang/codegen.py`'s `builtin_functions` dispatch table
//! and its `_generate_*` methods — each builtin lowers straight to a short
//! instruction sequence rather than a `CALL`.

use super::ast::Node;
use super::{CodeGenerator, INPUT_PORT, OUTPUT_PORT};

use crate::constants::{INT_DISABLE, INT_ENABLE, INT_INSTALL_HANDLER};
use crate::error::CodeGenError;
use crate::opcode::Opcode;

const BUILTIN_NAMES: &[&str] = &[
    "print",
    "print_number",
    "read",
    "readInt",
    "readLine",
    "readLineBuf",
    "alloc",
    "len",
    "chr",
    "putc",
    "v_load",
    "v_add",
    "v_dot",
    "v_store",
    "v_sum",
    "set_interrupt_handler",
    "enable_interrupts",
    "disable_interrupts",
];

pub fn is_builtin(name: &str) -> bool {
    BUILTIN_NAMES.contains(&name)
}

fn arity_check(name: &'static str, expected: usize, got: usize) -> Result<(), CodeGenError> {
    if expected == got {
        Ok(())
    } else {
        Err(CodeGenError::ArityMismatch { builtin: name, expected, got })
    }
}

impl CodeGenerator {
    pub(super) fn generate_builtin(
        &mut self,
        name: &str,
        arguments: &[Node],
    ) -> Result<(), CodeGenError> {
        match name {
            "print" => {
                arity_check("print", 1, arguments.len())?;
                self.visit(&arguments[0])?;
                self.emit(Opcode::Out, OUTPUT_PORT);
            }
            "print_number" => {
                arity_check("print_number", 1, arguments.len())?;
                self.visit(&arguments[0])?;
                self.emit(Opcode::Out, INPUT_PORT);
            }
            "read" => {
                arity_check("read", 0, arguments.len())?;
                self.emit(Opcode::In, INPUT_PORT);
            }
            "readInt" => {
                arity_check("readInt", 0, arguments.len())?;
                self.emit(Opcode::In, INPUT_PORT);
            }
            "readLine" => {
                arity_check("readLine", 0, arguments.len())?;
                self.generate_read_line();
            }
            "readLineBuf" => {
                arity_check("readLineBuf", 2, arguments.len())?;
                self.generate_read_line_buf(&arguments[0], &arguments[1])?;
            }
            "alloc" => {
                arity_check("alloc", 1, arguments.len())?;
                self.generate_alloc(&arguments[0])?;
            }
            "len" => {
                arity_check("len", 1, arguments.len())?;
                self.visit(&arguments[0])?;
                self.emit(Opcode::Load, 0);
            }
            "chr" => {
                arity_check("chr", 1, arguments.len())?;
                self.visit(&arguments[0])?;
            }
            "putc" => {
                arity_check("putc", 1, arguments.len())?;
                self.visit(&arguments[0])?;
                self.emit(Opcode::Out, 2);
            }
            "v_load" => {
                arity_check("v_load", 3, arguments.len())?;
                // Stack order: addr, length, reg.
                self.visit(&arguments[0])?;
                self.visit(&arguments[1])?;
                self.visit(&arguments[2])?;
                self.emit(Opcode::VLoad, 0);
            }
            "v_add" => {
                arity_check("v_add", 3, arguments.len())?;
                // Stack order: reg1, reg2, result_reg.
                self.visit(&arguments[0])?;
                self.visit(&arguments[1])?;
                self.visit(&arguments[2])?;
                self.emit(Opcode::VAdd, 0);
            }
            "v_dot" => {
                arity_check("v_dot", 2, arguments.len())?;
                self.visit(&arguments[0])?;
                self.visit(&arguments[1])?;
                self.emit(Opcode::VDot, 0);
            }
            "v_store" => {
                arity_check("v_store", 2, arguments.len())?;
                // Stack order: addr, reg (reversed from the argument order).
                self.visit(&arguments[1])?;
                self.visit(&arguments[0])?;
                self.emit(Opcode::VStore, 0);
            }
            "v_sum" => {
                arity_check("v_sum", 1, arguments.len())?;
                self.visit(&arguments[0])?;
                self.emit(Opcode::VSum, 0);
            }
            "set_interrupt_handler" => {
                arity_check("set_interrupt_handler", 2, arguments.len())?;
                self.visit(&arguments[0])?;
                self.visit(&arguments[1])?;
                self.emit(Opcode::Int, INT_INSTALL_HANDLER);
            }
            "enable_interrupts" => {
                arity_check("enable_interrupts", 0, arguments.len())?;
                self.emit(Opcode::Int, INT_ENABLE);
            }
            "disable_interrupts" => {
                arity_check("disable_interrupts", 0, arguments.len())?;
                self.emit(Opcode::Int, INT_DISABLE);
            }
            _ => unreachable!("is_builtin gated this call"),
        }
        Ok(())
    }

    /// Reads bytes via port 0 until NUL or `\n`, echoing each via port 1,
    /// then leaves 0 on the stack.
    fn generate_read_line(&mut self) {
        let loop_start = self.here();
        self.emit(Opcode::In, INPUT_PORT);
        self.emit(Opcode::Dup, 0);
        self.emit(Opcode::Push, 0);
        self.emit(Opcode::Eq, 0);
        let j0 = self.emit(Opcode::Jnz, 0);
        self.emit(Opcode::Dup, 0);
        self.emit(Opcode::Push, 10);
        self.emit(Opcode::Eq, 0);
        let j1 = self.emit(Opcode::Jnz, 0);
        self.emit(Opcode::Out, OUTPUT_PORT);
        self.emit(Opcode::Jmp, loop_start);
        let end = self.here();
        self.patch(j0, end);
        self.patch(j1, end);
        self.emit(Opcode::Pop, 0);
        self.emit(Opcode::Push, 0);
    }

    /// `readLineBuf(bufAddr, maxLen)`: reads a NUL-terminated line into a
    /// caller buffer without overrunning `maxLen`.
    fn generate_read_line_buf(&mut self, buf: &Node, max_len: &Node) -> Result<(), CodeGenError> {
        let p_addr = self.machine_code.add_word(0);
        self.visit(buf)?;
        self.emit(Opcode::Push, p_addr);
        self.emit(Opcode::Store, 0);

        let loop_start = self.here();
        self.emit(Opcode::Push, p_addr);
        self.emit(Opcode::Load, 0);
        self.visit(buf)?;
        self.emit(Opcode::Sub, 0);
        self.visit(max_len)?;
        self.emit(Opcode::Push, 1);
        self.emit(Opcode::Sub, 0);
        self.emit(Opcode::Ge, 0);
        let j_full = self.emit(Opcode::Jnz, 0);

        self.emit(Opcode::In, INPUT_PORT);
        self.emit(Opcode::Dup, 0);
        self.emit(Opcode::Push, 0);
        self.emit(Opcode::Eq, 0);
        let j_zero = self.emit(Opcode::Jnz, 0);
        self.emit(Opcode::Dup, 0);
        self.emit(Opcode::Push, 10);
        self.emit(Opcode::Eq, 0);
        let j_nl = self.emit(Opcode::Jnz, 0);

        self.emit(Opcode::Push, p_addr);
        self.emit(Opcode::Load, 0);
        self.emit(Opcode::Storeb, 0);

        self.emit(Opcode::Push, p_addr);
        self.emit(Opcode::Load, 0);
        self.emit(Opcode::Push, 1);
        self.emit(Opcode::Add, 0);
        self.emit(Opcode::Push, p_addr);
        self.emit(Opcode::Store, 0);
        self.emit(Opcode::Jmp, loop_start);

        let end = self.here();
        self.patch(j_full, end);
        self.patch(j_zero, end);
        self.patch(j_nl, end);

        self.emit(Opcode::Push, p_addr);
        self.emit(Opcode::Load, 0);
        self.emit(Opcode::Push, 0);
        self.emit(Opcode::Swap, 0);
        self.emit(Opcode::Storeb, 0);
        Ok(())
    }

    /// `alloc(size)`: reserves a zeroed block in the data segment. `size`
    /// must be a compile-time integer literal.
    fn generate_alloc(&mut self, size_arg: &Node) -> Result<(), CodeGenError> {
        let size = match size_arg {
            Node::NumberLiteral(value) if value.fract() == 0.0 && *value >= 0.0 => *value as usize,
            _ => return Err(CodeGenError::NonLiteralAllocSize),
        };
        let addr = self.machine_code.add_data(&vec![0u8; size]);
        self.emit(Opcode::Push, addr);
        Ok(())
    }
}
