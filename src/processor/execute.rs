//! Per-opcode semantics (`spec.md` §4.F), applied atomically once an
//! instruction's cycle budget reaches zero. Grounded on
//! `original_source/comp/processor.py::StackProcessor.execute_instruction`,
//! restructured as a free function returning `Result<(), Fault>` instead of
//! raising — the same shape as the teacher's `processor::logic::tick`.

use crate::error::Fault;
use crate::instruction::Instruction;
use crate::io::PORT_OUTPUT_STRING;
use crate::memory::{Storage, StorageMut};
use crate::opcode::Opcode;

use super::{Processor, State};

pub(super) fn execute(p: &mut Processor, instr: Instruction) -> Result<(), Fault> {
    use Opcode::*;

    let operand = instr.operand;
    let mut jumped = false;

    match instr.opcode {
        Push => p.push(operand)?,
        Pop => {
            p.pop()?;
        }
        Dup => {
            let top = *p.stack.last().ok_or(Fault::StackUnderflow)?;
            p.push(top)?;
        }
        Swap => {
            let len = p.stack.len();
            if len < 2 {
                return Err(Fault::StackUnderflow);
            }
            p.stack.swap(len - 1, len - 2);
        }
        Drop => {
            p.pop()?;
        }

        Add => binop(p, u32::wrapping_add)?,
        Sub => binop(p, u32::wrapping_sub)?,
        Mul => binop(p, u32::wrapping_mul)?,
        Div => {
            let b = p.pop()?;
            let a = p.pop()?;
            if b == 0 {
                return Err(Fault::DivideByZero);
            }
            p.push(a.wrapping_div(b))?;
        }
        Mod => {
            let b = p.pop()?;
            let a = p.pop()?;
            if b == 0 {
                return Err(Fault::DivideByZero);
            }
            p.push(a.wrapping_rem(b))?;
        }
        Neg => {
            let a = p.pop()?;
            p.push(a.wrapping_neg())?;
        }

        And => binop(p, |a, b| a & b)?,
        Or => binop(p, |a, b| a | b)?,
        Xor => binop(p, |a, b| a ^ b)?,
        Not => {
            let a = p.pop()?;
            p.push(!a)?;
        }

        Eq => binop(p, |a, b| (a == b) as u32)?,
        Ne => binop(p, |a, b| (a != b) as u32)?,
        Lt => binop(p, |a, b| (a < b) as u32)?,
        Le => binop(p, |a, b| (a <= b) as u32)?,
        Gt => binop(p, |a, b| (a > b) as u32)?,
        Ge => binop(p, |a, b| (a >= b) as u32)?,

        Jmp => {
            p.pc = operand;
            jumped = true;
        }
        Jz => {
            let cond = p.pop()?;
            if cond == 0 {
                p.pc = operand;
                jumped = true;
            }
        }
        Jnz => {
            let cond = p.pop()?;
            if cond != 0 {
                p.pc = operand;
                jumped = true;
            }
        }
        Call => {
            p.push_call(p.pc + 1)?;
            p.pc = operand;
            jumped = true;
        }
        Ret => match p.call_stack.pop() {
            Some(addr) => {
                p.pc = addr;
                jumped = true;
            }
            None => p.state = State::Halted,
        },

        Load => {
            let address = p.pop()?;
            let value = p
                .memory
                .read_word(address)
                .map_err(|()| Fault::BadMemoryAddress { address })?;
            p.push(value)?;
        }
        Store => {
            let address = p.pop()?;
            let value = p.pop()?;
            p.memory
                .write_word(address, value)
                .map_err(|()| Fault::BadMemoryAddress { address })?;
        }
        LoadI => {
            let value = p
                .memory
                .read_word(operand)
                .map_err(|()| Fault::BadMemoryAddress { address: operand })?;
            p.push(value)?;
        }
        Loadb => {
            let address = p.pop()?;
            let value = p
                .memory
                .read_byte(address)
                .map_err(|()| Fault::BadMemoryAddress { address })?;
            p.push(u32::from(value))?;
        }
        Storeb => {
            let address = p.pop()?;
            let value = p.pop()?;
            p.memory
                .write_byte(address, value as u8)
                .map_err(|()| Fault::BadMemoryAddress { address })?;
        }

        In => {
            let value = p.io.read_port(operand);
            p.push(value)?;
        }
        Out => {
            let value = p.pop()?;
            p.io.write_port(operand, value, &p.memory);
        }

        Halt => p.state = State::Halted,
        Nop => {}
        Int => p.handle_software_interrupt(operand)?,
        Iret => {
            let addr = p.call_stack.pop().ok_or(Fault::UnbalancedIret)?;
            p.pc = addr;
            p.in_interrupt = false;
            if p.state == State::InInterrupt {
                p.state = State::Running;
            }
            jumped = true;
        }

        VLoad => {
            let reg = p.pop()?;
            let length = p.pop()?;
            let address = p.pop()?;
            let len = (length as usize).min(crate::constants::VECTOR_MAX_LEN);
            let mut words = Vec::with_capacity(len);
            for i in 0..len {
                let addr = address + 4 + (i as u32) * 4;
                let word = p
                    .memory
                    .read_word(addr)
                    .map_err(|()| Fault::BadMemoryAddress { address: addr })?;
                words.push(word);
            }
            p.vector.load(reg, &words);
        }
        VStore => {
            let reg = p.pop()?;
            let address = p.pop()?;
            for (i, word) in p.vector.get(reg).into_iter().enumerate() {
                let addr = address + (i as u32) * 4;
                p.memory
                    .write_word(addr, word)
                    .map_err(|()| Fault::BadMemoryAddress { address: addr })?;
            }
        }
        VAdd => vecop(p, |v, a, b, dest| v.add(a, b, dest))?,
        VSub => vecop(p, |v, a, b, dest| v.sub(a, b, dest))?,
        VMul => vecop(p, |v, a, b, dest| v.mul(a, b, dest))?,
        VDiv => vecop(p, |v, a, b, dest| v.div(a, b, dest))?,
        VCmp => {
            let b = p.pop()?;
            let a = p.pop()?;
            let result = (p.vector.get(a) == p.vector.get(b)) as u32;
            p.push(result)?;
        }
        VDot => {
            let b = p.pop()?;
            let a = p.pop()?;
            p.push(p.vector.dot(a, b))?;
        }
        VNorm => {
            let reg = p.pop()?;
            p.push(p.vector.norm(reg))?;
        }
        VMax => {
            let reg = p.pop()?;
            p.push(p.vector.max(reg))?;
        }
        VMin => {
            let reg = p.pop()?;
            p.push(p.vector.min(reg))?;
        }
        VSum => {
            let reg = p.pop()?;
            p.push(p.vector.sum(reg))?;
        }
        VAvg => {
            let reg = p.pop()?;
            p.push(p.vector.avg(reg))?;
        }
        VScale => {
            let dest = p.pop()?;
            let scalar = p.pop()?;
            let reg = p.pop()?;
            p.vector.scale(reg, scalar, dest);
        }
        VCopy => {
            let dest = p.pop()?;
            let src = p.pop()?;
            p.vector.copy(src, dest);
        }
        VSet => {
            let value = p.pop()?;
            let reg = p.pop()?;
            p.vector.set(reg, operand, value);
        }
    }

    if !jumped && p.state != State::Halted {
        p.pc += 1;
    }

    Ok(())
}

fn binop(p: &mut Processor, op: fn(u32, u32) -> u32) -> Result<(), Fault> {
    let b = p.pop()?;
    let a = p.pop()?;
    p.push(op(a, b))
}

fn vecop(
    p: &mut Processor,
    op: fn(&mut crate::vector::VectorUnit, u32, u32, u32),
) -> Result<(), Fault> {
    let dest = p.pop()?;
    let b = p.pop()?;
    let a = p.pop()?;
    op(&mut p.vector, a, b, dest);
    Ok(())
}

// INT's system vector 0x00 prints via port 1; kept here so `handle_software_interrupt`
// in `interrupts.rs` and `execute` agree on the port constant without re-exporting it.
#[allow(dead_code)]
const _: u32 = PORT_OUTPUT_STRING;
