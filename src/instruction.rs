//! A single (opcode, operand) pair and its 32-bit word encoding
//! (`spec.md` §3–§4.A).

use byteorder::{ByteOrder, LittleEndian};
use num_traits::{FromPrimitive, ToPrimitive};

use crate::constants::{OPCODE_MASK, OPERAND_OFFSET};
use crate::opcode::Opcode;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Instruction {
    pub opcode: Opcode,
    pub operand: u32,
}

impl Instruction {
    pub fn new(opcode: Opcode, operand: u32) -> Instruction {
        Instruction { opcode, operand }
    }

    /// Packs into `operand << 8 | opcode`.
    pub fn to_word(self) -> u32 {
        let opcode_byte = self.opcode.to_u32().unwrap();
        (self.operand << OPERAND_OFFSET) | (opcode_byte & OPCODE_MASK)
    }

    /// Unpacks a word. `None` if the low byte is not a known opcode.
    pub fn from_word(word: u32) -> Option<Instruction> {
        let opcode_byte = (word & OPCODE_MASK) as u8;
        let operand = word >> OPERAND_OFFSET;
        Opcode::from_u8(opcode_byte).map(|opcode| Instruction { opcode, operand })
    }

    pub fn to_bytes(self) -> [u8; 4] {
        let mut buf = [0u8; 4];
        LittleEndian::write_u32(&mut buf, self.to_word());
        buf
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<Instruction> {
        if bytes.len() < 4 {
            return None;
        }
        Instruction::from_word(LittleEndian::read_u32(bytes))
    }
}

impl std::fmt::Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}({:06X})", self.opcode, self.operand)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_encoding() {
        for (op, operand) in &[
            (Opcode::Push, 0x00_0000u32),
            (Opcode::Push, 0xFF_FFFFu32),
            (Opcode::Add, 0),
            (Opcode::Jz, 0x12_3456),
            (Opcode::VDot, 7),
        ] {
            let instr = Instruction::new(*op, *operand);
            let word = instr.to_word();
            assert_eq!(Instruction::from_word(word), Some(instr));
        }
    }

    #[test]
    fn unknown_opcode_byte_fails_to_decode() {
        // 0x0F is not assigned in the stack-manipulation family.
        assert_eq!(Instruction::from_word(0x0F), None);
    }

    #[test]
    fn byte_serialization_is_little_endian() {
        let instr = Instruction::new(Opcode::Push, 5);
        assert_eq!(instr.to_bytes(), [0x00, 0x05, 0x00, 0x00]);
    }
}
