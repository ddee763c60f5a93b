//! Per-opcode behavioral tests, adapted from the teacher's
//! `src/test/instructions/<mnemonic>.rs` layout: the teacher's harness
//! plants register values and asserts register outcomes, ours assembles a
//! short instruction stream and asserts stack/memory/output outcomes, since
//! the machine is stack- rather than register-operand.

use crate::instruction::Instruction;
use crate::opcode::Opcode;

use super::{Processor, State};

fn run(instructions: Vec<Instruction>) -> Processor {
    let mut p = Processor::with_defaults();
    p.load_program(instructions);
    p.run(100_000);
    p
}

fn i(opcode: Opcode, operand: u32) -> Instruction {
    Instruction::new(opcode, operand)
}

mod stack_ops {
    use super::*;

    #[test]
    fn push_then_halt_leaves_value_on_stack() {
        let p = run(vec![i(Opcode::Push, 42), i(Opcode::Halt, 0)]);
        assert_eq!(p.stack(), &[42]);
        assert_eq!(p.state(), State::Halted);
    }

    #[test]
    fn dup_duplicates_top_of_stack() {
        let p = run(vec![i(Opcode::Push, 7), i(Opcode::Dup, 0), i(Opcode::Halt, 0)]);
        assert_eq!(p.stack(), &[7, 7]);
    }

    #[test]
    fn swap_exchanges_top_two() {
        let p = run(vec![
            i(Opcode::Push, 1),
            i(Opcode::Push, 2),
            i(Opcode::Swap, 0),
            i(Opcode::Halt, 0),
        ]);
        assert_eq!(p.stack(), &[2, 1]);
    }

    #[test]
    fn pop_on_empty_stack_faults_and_halts() {
        let p = run(vec![i(Opcode::Pop, 0)]);
        assert_eq!(p.state(), State::Halted);
    }
}

mod arithmetic {
    use super::*;

    #[test]
    fn add_wraps_on_overflow() {
        let p = run(vec![
            i(Opcode::Push, u32::MAX),
            i(Opcode::Push, 2),
            i(Opcode::Add, 0),
            i(Opcode::Halt, 0),
        ]);
        assert_eq!(p.stack(), &[1]);
    }

    #[test]
    fn sub_preserves_operand_order() {
        let p = run(vec![
            i(Opcode::Push, 10),
            i(Opcode::Push, 3),
            i(Opcode::Sub, 0),
            i(Opcode::Halt, 0),
        ]);
        assert_eq!(p.stack(), &[7]);
    }

    #[test]
    fn divide_by_zero_halts_with_a_fault() {
        let p = run(vec![
            i(Opcode::Push, 10),
            i(Opcode::Push, 0),
            i(Opcode::Div, 0),
        ]);
        assert_eq!(p.state(), State::Halted);
        assert!(p.stack().is_empty() || p.stack().len() == 2);
    }

    #[test]
    fn mod_preserves_operand_order() {
        let p = run(vec![
            i(Opcode::Push, 10),
            i(Opcode::Push, 3),
            i(Opcode::Mod, 0),
            i(Opcode::Halt, 0),
        ]);
        assert_eq!(p.stack(), &[1]);
    }

    #[test]
    fn neg_wraps() {
        let p = run(vec![i(Opcode::Push, 1), i(Opcode::Neg, 0), i(Opcode::Halt, 0)]);
        assert_eq!(p.stack(), &[u32::MAX]);
    }
}

mod comparisons {
    use super::*;

    #[test]
    fn lt_pushes_one_when_true() {
        let p = run(vec![
            i(Opcode::Push, 3),
            i(Opcode::Push, 5),
            i(Opcode::Lt, 0),
            i(Opcode::Halt, 0),
        ]);
        assert_eq!(p.stack(), &[1]);
    }

    #[test]
    fn eq_pushes_zero_when_false() {
        let p = run(vec![
            i(Opcode::Push, 3),
            i(Opcode::Push, 5),
            i(Opcode::Eq, 0),
            i(Opcode::Halt, 0),
        ]);
        assert_eq!(p.stack(), &[0]);
    }
}

mod control_flow {
    use super::*;

    #[test]
    fn jz_skips_when_condition_is_zero() {
        let p = run(vec![
            i(Opcode::Push, 0),
            i(Opcode::Jz, 4),
            i(Opcode::Push, 111),
            i(Opcode::Halt, 0),
            i(Opcode::Push, 222),
            i(Opcode::Halt, 0),
        ]);
        assert_eq!(p.stack(), &[222]);
    }

    #[test]
    fn jnz_falls_through_when_condition_is_zero() {
        let p = run(vec![
            i(Opcode::Push, 0),
            i(Opcode::Jnz, 4),
            i(Opcode::Push, 111),
            i(Opcode::Halt, 0),
            i(Opcode::Push, 222),
            i(Opcode::Halt, 0),
        ]);
        assert_eq!(p.stack(), &[111]);
    }

    #[test]
    fn call_and_ret_round_trip() {
        let p = run(vec![
            i(Opcode::Call, 3),
            i(Opcode::Push, 1),
            i(Opcode::Halt, 0),
            i(Opcode::Push, 99),
            i(Opcode::Ret, 0),
        ]);
        assert_eq!(p.stack(), &[99, 1]);
    }

    #[test]
    fn ret_with_empty_call_stack_halts() {
        let p = run(vec![i(Opcode::Ret, 0)]);
        assert_eq!(p.state(), State::Halted);
    }
}

mod memory_ops {
    use super::*;

    #[test]
    fn store_then_load_round_trips() {
        let p = run(vec![
            i(Opcode::Push, 0xABCD),
            i(Opcode::Push, 100),
            i(Opcode::Store, 0),
            i(Opcode::Push, 100),
            i(Opcode::Load, 0),
            i(Opcode::Halt, 0),
        ]);
        assert_eq!(p.stack(), &[0xABCD]);
    }

    #[test]
    fn load_immediate_reads_a_literal_address() {
        let p = run(vec![
            i(Opcode::Push, 0x55),
            i(Opcode::Push, 200),
            i(Opcode::Store, 0),
            i(Opcode::LoadI, 200),
            i(Opcode::Halt, 0),
        ]);
        assert_eq!(p.stack(), &[0x55]);
    }

    #[test]
    fn storeb_then_loadb_round_trips_a_single_byte() {
        let p = run(vec![
            i(Opcode::Push, 0xFF),
            i(Opcode::Push, 50),
            i(Opcode::Storeb, 0),
            i(Opcode::Push, 50),
            i(Opcode::Loadb, 0),
            i(Opcode::Halt, 0),
        ]);
        assert_eq!(p.stack(), &[0xFF]);
    }

    #[test]
    fn out_of_range_address_faults() {
        let p = run(vec![i(Opcode::Push, 9_999_999), i(Opcode::Load, 0)]);
        assert_eq!(p.state(), State::Halted);
    }
}

mod io_ops {
    use super::*;

    #[test]
    fn out_port_2_appends_a_raw_byte() {
        let p = run(vec![i(Opcode::Push, b'A' as u32), i(Opcode::Out, 2), i(Opcode::Halt, 0)]);
        assert_eq!(p.output(), b"A");
    }

    #[test]
    fn in_port_0_is_non_blocking_when_nothing_scheduled() {
        let p = run(vec![i(Opcode::In, 0), i(Opcode::Halt, 0)]);
        assert_eq!(p.stack(), &[0]);
    }

    #[test]
    fn scheduled_input_arrives_via_interrupt_queue() {
        let mut p = Processor::with_defaults();
        p.schedule_input_event(0, b'Z');
        p.load_program(vec![i(Opcode::In, 0), i(Opcode::Halt, 0)]);
        p.run(100_000);
        assert_eq!(p.stack(), &[u32::from(b'Z')]);
    }
}

mod vector_ops {
    use super::*;

    #[test]
    fn vset_then_vsum() {
        // V_SET can only overwrite an element within a register's existing
        // length, so reg 0 needs a prior load (directly through the vector
        // unit here, the way `vector.rs`'s own inline tests do).
        let mut p = Processor::with_defaults();
        p.vector.load(0, &[1, 1]);
        p.load_program(vec![
            i(Opcode::Push, 0),  // reg
            i(Opcode::Push, 5),  // value
            i(Opcode::VSet, 0),  // reg[0] = 5
            i(Opcode::Push, 0),
            i(Opcode::VSum, 0),
            i(Opcode::Halt, 0),
        ]);
        p.run(100_000);
        assert_eq!(p.stack(), &[6]);
    }

    #[test]
    fn vadd_then_vsum() {
        let mut p = Processor::with_defaults();
        p.vector.load(0, &[2]);
        p.vector.load(1, &[3]);
        p.load_program(vec![
            // reg2 = reg0 + reg1
            i(Opcode::Push, 0),
            i(Opcode::Push, 1),
            i(Opcode::Push, 2),
            i(Opcode::VAdd, 0),
            i(Opcode::Push, 2),
            i(Opcode::VSum, 0),
            i(Opcode::Halt, 0),
        ]);
        p.run(100_000);
        assert_eq!(p.stack(), &[5]);
    }
}

mod interrupts_and_cycles {
    use super::*;
    use crate::constants::{INT_ENABLE, INT_INSTALL_HANDLER};

    #[test]
    fn cycle_count_accumulates_by_opcode_cost() {
        let p = run(vec![i(Opcode::Nop, 0), i(Opcode::Halt, 0)]);
        assert_eq!(p.cycle_count(), Opcode::Nop.cycle_cost() as u64 + Opcode::Halt.cycle_cost() as u64);
    }

    #[test]
    fn software_interrupt_handler_install_and_dispatch() {
        let program = vec![
            // install handler for irq 0 at address 6
            i(Opcode::Push, 0),
            i(Opcode::Push, 6),
            i(Opcode::Int, INT_INSTALL_HANDLER),
            i(Opcode::Int, INT_ENABLE),
            i(Opcode::Push, 1),
            i(Opcode::Halt, 0),
            // handler body at pc=6
            i(Opcode::Push, 77),
            i(Opcode::Iret, 0),
        ];
        let mut p = Processor::with_defaults();
        p.schedule_input_event(0, 9);
        p.load_program(program);
        p.run(100_000);
        assert!(p.stack().contains(&77));
    }
}
