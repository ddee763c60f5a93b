//! `vexvm`: a cycle-accurate stack virtual machine with vector extensions
//! and interrupt-driven I/O, plus a tree-walking code generator that
//! targets it. See `SPEC_FULL.md` for the full component breakdown.

extern crate num;
#[macro_use]
extern crate num_derive;

pub mod codegen;
pub mod constants;
pub mod error;
pub mod instruction;
pub mod io;
pub mod machine_code;
pub mod memory;
pub mod opcode;
pub mod processor;
pub mod vector;

pub use crate::error::{CodeGenError, Fault};
pub use crate::instruction::Instruction;
pub use crate::io::IoController;
pub use crate::machine_code::MachineCode;
pub use crate::memory::{Memory, Storage, StorageMut};
pub use crate::opcode::Opcode;
pub use crate::processor::{Processor, RunResult, State};
pub use crate::vector::VectorUnit;
