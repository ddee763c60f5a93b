//! The cycle-accurate stack processor core (`spec.md` §4.F, §5).
//!
//! Grounded on `original_source/comp/processor.py::StackProcessor` for the
//! tick/step/run algorithm, restructured the way the teacher's
//! `processor::logic` module structures an otherwise exception-driven
//! original: semantics live in a free function returning a typed `Result`
//! rather than throwing, and a fatal `Err` is caught at exactly one site
//! (`step`) and turned into a `State::Halted` transition — never
//! propagated to the caller as a Rust error.

mod execute;
mod interrupts;
#[cfg(test)]
mod tests;

use std::collections::{HashMap, VecDeque};

use log::{debug, trace, warn};

use crate::constants::{DEFAULT_DATA_MEMORY_SIZE, DEFAULT_STACK_CAPACITY, EXECUTION_LOG_LIMIT};
use crate::error::Fault;
use crate::instruction::Instruction;
use crate::io::{InterruptKind, IoController};
use crate::memory::Memory;
use crate::vector::VectorUnit;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum State {
    Running,
    Halted,
    WaitingForInterrupt,
    InInterrupt,
}

/// An instruction whose cycle cost has not yet fully elapsed.
struct Pending {
    instruction: Instruction,
    remaining_cycles: u32,
}

pub struct Processor {
    instructions: Vec<Instruction>,
    memory: Memory,
    stack: Vec<u32>,
    stack_capacity: usize,
    call_stack: Vec<u32>,
    pc: u32,
    state: State,
    cycle_count: u64,
    instruction_count: u64,
    vector: VectorUnit,
    io: IoController,
    interrupts_enabled: bool,
    in_interrupt: bool,
    interrupt_handlers: HashMap<u32, u32>,
    pending_interrupts: VecDeque<(u32, u32)>,
    execution_log: Vec<String>,
    current: Option<Pending>,
    fault: Option<Fault>,
}

/// The outcome of a bounded `run`, per `spec.md` §5's `run(max_cycles)`.
#[derive(Debug)]
pub struct RunResult {
    pub state: State,
    pub instructions_executed: u64,
    pub cycles_executed: u64,
    pub final_pc: u32,
    pub output: Vec<u8>,
    pub fault: Option<Fault>,
}

impl Processor {
    pub fn new(data_memory_size: u32, stack_capacity: usize) -> Processor {
        Processor {
            instructions: Vec::new(),
            memory: Memory::new(data_memory_size),
            stack: Vec::new(),
            stack_capacity,
            call_stack: Vec::new(),
            pc: 0,
            state: State::Running,
            cycle_count: 0,
            instruction_count: 0,
            vector: VectorUnit::default(),
            io: IoController::new(),
            interrupts_enabled: false,
            in_interrupt: false,
            interrupt_handlers: HashMap::new(),
            pending_interrupts: VecDeque::new(),
            execution_log: Vec::new(),
            current: None,
            fault: None,
        }
    }

    pub fn with_defaults() -> Processor {
        Processor::new(DEFAULT_DATA_MEMORY_SIZE, DEFAULT_STACK_CAPACITY)
    }

    pub fn load_program(&mut self, instructions: Vec<Instruction>) {
        self.instructions = instructions;
    }

    pub fn load_data(&mut self, data: &[u8], offset: u32) -> Result<(), Fault> {
        self.memory
            .load(data, offset)
            .map_err(|()| Fault::BadMemoryAddress { address: offset })
    }

    pub fn schedule_input_event(&mut self, cycle: u64, data: u8) {
        self.io.schedule_input(cycle, data);
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn program_counter(&self) -> u32 {
        self.pc
    }

    pub fn cycle_count(&self) -> u64 {
        self.cycle_count
    }

    pub fn instruction_count(&self) -> u64 {
        self.instruction_count
    }

    pub fn stack(&self) -> &[u32] {
        &self.stack
    }

    pub fn output(&self) -> &[u8] {
        self.io.output()
    }

    pub fn execution_log(&self) -> &[String] {
        &self.execution_log
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn push(&mut self, value: u32) -> Result<(), Fault> {
        if self.stack.len() >= self.stack_capacity {
            return Err(Fault::StackOverflow);
        }
        self.stack.push(value);
        Ok(())
    }

    pub fn pop(&mut self) -> Result<u32, Fault> {
        self.stack.pop().ok_or(Fault::StackUnderflow)
    }

    fn push_call(&mut self, address: u32) -> Result<(), Fault> {
        if self.call_stack.len() >= self.stack_capacity {
            return Err(Fault::StackOverflow);
        }
        self.call_stack.push(address);
        Ok(())
    }

    /// Advances simulated time by one cycle. Returns `true` while the
    /// processor should keep running, `false` once `Halted`.
    pub fn step(&mut self) -> bool {
        if self.state == State::Halted {
            return false;
        }

        for (kind, data) in self.io.drain_ready(self.cycle_count) {
            if kind == InterruptKind::InputReady {
                self.pending_interrupts.push_back((kind as u32, data));
            }
        }

        if self.current.is_none() {
            self.try_enter_interrupt();

            if self.pc as usize >= self.instructions.len() {
                self.state = State::Halted;
                return false;
            }

            let instruction = self.instructions[self.pc as usize];
            self.current = Some(Pending {
                instruction,
                remaining_cycles: instruction.opcode.cycle_cost(),
            });
        }

        let finished = {
            let pending = self.current.as_mut().unwrap();
            pending.remaining_cycles -= 1;
            pending.remaining_cycles == 0
        };
        self.cycle_count += 1;

        if finished {
            let instruction = self.current.take().unwrap().instruction;
            self.log_execution(instruction);

            match execute::execute(self, instruction) {
                Ok(()) => {
                    self.instruction_count += 1;
                    self.state != State::Halted
                }
                Err(fault) => {
                    warn!("fault at pc={}: {}", self.pc, fault);
                    self.fault = Some(fault);
                    self.state = State::Halted;
                    false
                }
            }
        } else {
            true
        }
    }

    /// Runs until `Halted` or `max_cycles` simulated cycles have elapsed,
    /// whichever comes first. Exceeding the budget is not an error — it
    /// returns control with the current (typically still `Running`) state,
    /// allowing resumable execution (`spec.md` §5).
    pub fn run(&mut self, max_cycles: u64) -> RunResult {
        debug!("run starting at pc={}, budget={}", self.pc, max_cycles);
        let start_cycle = self.cycle_count;
        while self.cycle_count.wrapping_sub(start_cycle) < max_cycles {
            if !self.step() {
                break;
            }
        }
        trace!("run stopped: state={:?}, cycles={}", self.state, self.cycle_count);

        RunResult {
            state: self.state,
            instructions_executed: self.instruction_count,
            cycles_executed: self.cycle_count.wrapping_sub(start_cycle),
            final_pc: self.pc,
            output: self.io.output().to_vec(),
            fault: self.fault.clone(),
        }
    }

    fn log_execution(&mut self, instruction: Instruction) {
        let top = self.stack.last().copied().unwrap_or(0);
        self.execution_log.push(format!(
            "Cycle {:06}: PC={:04X} {}({:06X}) Stack[{}] {}",
            self.cycle_count,
            self.pc,
            instruction.opcode,
            instruction.operand,
            self.stack.len(),
            top,
        ));
        if self.execution_log.len() > EXECUTION_LOG_LIMIT {
            let keep_from = self.execution_log.len() / 2;
            self.execution_log.drain(0..keep_from);
        }
    }
}
