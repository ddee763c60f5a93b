//! The scheduled I/O controller (`spec.md` §4.D): input/output FIFOs, a
//! time-sorted schedule of input events, and port routing. Grounded on
//! `original_source/comp/processor.py`'s `IOController`, folding its
//! port-register dict into the same struct rather than splitting port
//! semantics across two collaborators as the Python original did.

use std::collections::VecDeque;

use crate::memory::Storage;

/// Numeric interrupt-type codes, reproduced from `original_source`'s
/// `InterruptType` enum. Only `InputReady` is ever actually raised by this
/// controller; the others document the original's reserved numbering.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum InterruptKind {
    InputReady = 0,
    OutputRequest = 1,
    Timer = 2,
    Software = 3,
}

pub const PORT_INPUT: u32 = 0;
pub const PORT_OUTPUT_STRING: u32 = 1;
pub const PORT_OUTPUT_BYTE: u32 = 2;

#[derive(Default)]
pub struct IoController {
    input_buffer: VecDeque<u8>,
    output_buffer: Vec<u8>,
    schedule: Vec<(u64, u8)>,
    ports: std::collections::HashMap<u32, u32>,
}

impl IoController {
    pub fn new() -> IoController {
        Default::default()
    }

    pub fn output(&self) -> &[u8] {
        &self.output_buffer
    }

    /// Adds a scheduled input byte, keeping `schedule` sorted by cycle; ties
    /// keep insertion order (`spec.md` §5, ordering guarantee iii).
    pub fn schedule_input(&mut self, cycle: u64, data: u8) {
        let index = self
            .schedule
            .iter()
            .position(|(c, _)| *c > cycle)
            .unwrap_or(self.schedule.len());
        self.schedule.insert(index, (cycle, data));
    }

    /// Drains every scheduled event with `cycle <= current_cycle` into the
    /// input buffer, returning one pending `InputReady` interrupt request
    /// per event drained, in schedule order.
    pub fn drain_ready(&mut self, current_cycle: u64) -> Vec<(InterruptKind, u32)> {
        let mut fired = Vec::new();
        while let Some(&(cycle, data)) = self.schedule.first() {
            if cycle > current_cycle {
                break;
            }
            self.schedule.remove(0);
            self.input_buffer.push_back(data);
            fired.push((InterruptKind::InputReady, u32::from(data)));
        }
        fired
    }

    /// `IN port` (§4.D). Port 0 dequeues one byte from the input buffer, or
    /// 0 if empty (non-blocking). Ports >= 3 read back the last value
    /// written to that port register, or 0 if never written.
    pub fn read_port(&mut self, port: u32) -> u32 {
        if port == PORT_INPUT {
            self.input_buffer.pop_front().map(u32::from).unwrap_or(0)
        } else {
            *self.ports.get(&port).unwrap_or(&0)
        }
    }

    /// `OUT port` (§4.D). `memory` is needed to walk the NUL-terminated
    /// string for port 1.
    pub fn write_port(&mut self, port: u32, value: u32, memory: &dyn Storage) {
        match port {
            PORT_INPUT => self.write_decimal(value),
            PORT_OUTPUT_STRING => self.write_cstring(value, memory),
            PORT_OUTPUT_BYTE => self.output_buffer.push((value & 0xFF) as u8),
            k => {
                self.ports.insert(k, value);
            }
        }
    }

    fn write_decimal(&mut self, value: u32) {
        for byte in value.to_string().into_bytes() {
            self.output_buffer.push(byte);
        }
    }

    fn write_cstring(&mut self, address: u32, memory: &dyn Storage) {
        if memory.read_byte(address).is_err() {
            // Out-of-range starting address: defensive fallback per §4.D.
            self.write_decimal(address);
            return;
        }
        let mut addr = address;
        loop {
            match memory.read_byte(addr) {
                Ok(0) | Err(()) => break,
                Ok(byte) => {
                    self.output_buffer.push(byte);
                    addr += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::Memory;

    #[test]
    fn in_0_is_non_blocking() {
        let mut io = IoController::new();
        assert_eq!(io.read_port(PORT_INPUT), 0);
    }

    #[test]
    fn scheduled_events_drain_in_cycle_order() {
        let mut io = IoController::new();
        io.schedule_input(20, b'Y');
        io.schedule_input(10, b'X');
        io.schedule_input(30, b'Z');

        assert_eq!(io.drain_ready(15), vec![(InterruptKind::InputReady, u32::from(b'X'))]);
        assert_eq!(io.read_port(PORT_INPUT), u32::from(b'X'));

        let fired = io.drain_ready(30);
        assert_eq!(
            fired,
            vec![
                (InterruptKind::InputReady, u32::from(b'Y')),
                (InterruptKind::InputReady, u32::from(b'Z')),
            ]
        );
    }

    #[test]
    fn out_1_walks_a_nul_terminated_string() {
        use crate::memory::StorageMut;
        let mut mem = Memory::new(16);
        for (i, byte) in b"Hello\0".iter().enumerate() {
            mem.write_byte(i as u32, *byte).unwrap();
        }
        let mut io = IoController::new();
        io.write_port(PORT_OUTPUT_STRING, 0, &mem);
        assert_eq!(io.output(), b"Hello");
    }

    #[test]
    fn out_of_range_port_1_address_falls_back_to_decimal() {
        let mem = Memory::new(4);
        let mut io = IoController::new();
        io.write_port(PORT_OUTPUT_STRING, 100, &mem);
        assert_eq!(io.output(), b"100");
    }

    #[test]
    fn port_k_registers_round_trip() {
        let mem = Memory::new(0);
        let mut io = IoController::new();
        assert_eq!(io.read_port(5), 0);
        io.write_port(5, 42, &mem);
        assert_eq!(io.read_port(5), 42);
    }
}
