//! Hand-rolled error enums, matching the teacher's idiom (`vasm/src/error.rs`):
//! one enum per concern, manual `Display`/`Error` impls, no `thiserror`.

use std::error::Error;
use std::fmt;

/// A fatal runtime fault (`spec.md` §7). Never propagated as a Rust error to
/// the host — the processor catches it at the site of detection and
/// transitions to `State::Halted`, recording the fault in the run result.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Fault {
    StackUnderflow,
    StackOverflow,
    BadMemoryAddress { address: u32 },
    DivideByZero,
    UnknownOpcode(u8),
    UnbalancedIret,
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Fault::StackUnderflow => write!(f, "stack underflow"),
            Fault::StackOverflow => write!(f, "stack overflow"),
            Fault::BadMemoryAddress { address } => {
                write!(f, "bad memory address: {:#010x}", address)
            }
            Fault::DivideByZero => write!(f, "divide by zero"),
            Fault::UnknownOpcode(byte) => write!(f, "unknown opcode: {:#04x}", byte),
            Fault::UnbalancedIret => write!(f, "IRET with empty call stack"),
        }
    }
}

impl Error for Fault {}

/// A compile-time error raised by the code generator (`spec.md` §4.C/§7).
/// Aborts code generation; no partial image is produced.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum CodeGenError {
    UnknownIdentifier(String),
    ConstReassignment(String),
    ArityMismatch { builtin: &'static str, expected: usize, got: usize },
    NonLiteralAllocSize,
    UnsupportedOperator(String),
    UnknownFunction(String),
}

impl fmt::Display for CodeGenError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CodeGenError::UnknownIdentifier(name) => write!(f, "unknown identifier: {}", name),
            CodeGenError::ConstReassignment(name) => {
                write!(f, "cannot assign to const binding: {}", name)
            }
            CodeGenError::ArityMismatch { builtin, expected, got } => write!(
                f,
                "{} expects {} argument(s), got {}",
                builtin, expected, got
            ),
            CodeGenError::NonLiteralAllocSize => {
                write!(f, "alloc() requires a compile-time constant integer size")
            }
            CodeGenError::UnsupportedOperator(op) => write!(f, "unsupported operator: {}", op),
            CodeGenError::UnknownFunction(name) => write!(f, "undefined function: {}", name),
        }
    }
}

impl Error for CodeGenError {}
