//! An in-progress program image under construction: an instruction stream
//! plus a data segment, with interned string/word helpers and a debug
//! listing. Grounded on `original_source/isa/machine_code.py`'s
//! `MachineCode` class, restructured in the teacher's builder style (return
//! the address written, accumulate into `Vec`s, serialize on demand rather
//! than writing straight to a file handle).

use std::fmt::Write as _;

use crate::instruction::Instruction;

#[derive(Debug, Default)]
pub struct MachineCode {
    instructions: Vec<Instruction>,
    data: Vec<u8>,
}

impl MachineCode {
    pub fn new() -> MachineCode {
        MachineCode::default()
    }

    pub fn emit(&mut self, instruction: Instruction) -> u32 {
        let address = self.instructions.len() as u32;
        self.instructions.push(instruction);
        address
    }

    /// Overwrites a previously emitted instruction's operand, used to
    /// backpatch forward jumps once their target address is known.
    pub fn patch_operand(&mut self, address: u32, operand: u32) {
        self.instructions[address as usize].operand = operand;
    }

    pub fn instruction_at(&self, address: u32) -> Instruction {
        self.instructions[address as usize]
    }

    pub fn next_instruction_address(&self) -> u32 {
        self.instructions.len() as u32
    }

    pub fn add_data(&mut self, bytes: &[u8]) -> u32 {
        let address = self.data.len() as u32;
        self.data.extend_from_slice(bytes);
        address
    }

    pub fn add_word(&mut self, value: u32) -> u32 {
        self.add_data(&value.to_le_bytes())
    }

    pub fn add_cstring(&mut self, text: &str) -> u32 {
        let mut bytes = text.as_bytes().to_vec();
        bytes.push(0);
        self.add_data(&bytes)
    }

    /// Adds a length-prefixed vector literal: one word holding the element
    /// count, followed by the elements themselves (`spec.md` §4.A, `V_LOAD`).
    pub fn add_vector_literal(&mut self, elements: &[u32]) -> u32 {
        let address = self.add_word(elements.len() as u32);
        for &element in elements {
            self.add_word(element);
        }
        address
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn to_instruction_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.instructions.len() * 4);
        for instr in &self.instructions {
            bytes.extend_from_slice(&instr.to_bytes());
        }
        bytes
    }

    pub fn to_data_bytes(&self) -> Vec<u8> {
        self.data.clone()
    }

    pub fn into_image(self) -> vexfile::Image {
        vexfile::Image::from(self.data, self.to_instruction_bytes())
    }

    /// A human-readable disassembly-style listing, grounded on
    /// `MachineCode.save_debug_listing` in the original.
    pub fn debug_listing(&self) -> String {
        let mut out = String::new();
        out.push_str("INSTRUCTION MEMORY:\n");
        out.push_str("Address - Hex Code - Mnemonic\n");
        out.push_str(&"-".repeat(40));
        out.push('\n');

        for (addr, instr) in self.instructions.iter().enumerate() {
            let hex: String = instr.to_bytes().iter().map(|b| format!("{:02X}", b)).collect();
            let _ = writeln!(out, "{:04X} - {} - {}", addr, hex, instr);
        }

        out.push_str("\nDATA MEMORY:\n");
        out.push_str("Address - Hex Dump - ASCII\n");
        out.push_str(&"-".repeat(40));
        out.push('\n');

        for (row, chunk) in self.data.chunks(16).enumerate() {
            let hex_dump = chunk.iter().map(|b| format!("{:02X}", b)).collect::<Vec<_>>().join(" ");
            let ascii_dump: String = chunk
                .iter()
                .map(|&b| if (32..=126).contains(&b) { b as char } else { '.' })
                .collect();
            let _ = writeln!(out, "{:04X} - {:<48} - {}", row * 16, hex_dump, ascii_dump);
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcode::Opcode;

    #[test]
    fn emit_returns_sequential_addresses() {
        let mut mc = MachineCode::new();
        let a = mc.emit(Instruction::new(Opcode::Push, 1));
        let b = mc.emit(Instruction::new(Opcode::Push, 2));
        assert_eq!((a, b), (0, 1));
    }

    #[test]
    fn patch_operand_rewrites_a_previously_emitted_jump() {
        let mut mc = MachineCode::new();
        let jmp = mc.emit(Instruction::new(Opcode::Jmp, 0));
        mc.emit(Instruction::new(Opcode::Nop, 0));
        let target = mc.next_instruction_address();
        mc.patch_operand(jmp, target);
        assert_eq!(mc.instruction_at(jmp).operand, target);
    }

    #[test]
    fn cstring_is_nul_terminated() {
        let mut mc = MachineCode::new();
        let addr = mc.add_cstring("hi");
        assert_eq!(&mc.data()[addr as usize..], b"hi\0");
    }

    #[test]
    fn vector_literal_is_length_prefixed() {
        let mut mc = MachineCode::new();
        let addr = mc.add_vector_literal(&[1, 2, 3]);
        assert_eq!(&mc.data()[addr as usize..addr as usize + 4], &3u32.to_le_bytes());
    }

    #[test]
    fn to_instruction_bytes_is_four_bytes_per_instruction() {
        let mut mc = MachineCode::new();
        mc.emit(Instruction::new(Opcode::Push, 5));
        mc.emit(Instruction::new(Opcode::Halt, 0));
        assert_eq!(mc.to_instruction_bytes().len(), 8);
    }
}
