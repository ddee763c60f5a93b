//! `vex`: runs a compiled `.vex` image on the stack virtual machine.

#[macro_use]
extern crate clap;

use std::fs;
use std::process;

use clap::Arg;
use log::info;
use serde::Deserialize;

use vexvm::{Processor, State};

#[derive(Debug)]
enum Error {
    Io(std::io::Error),
    Clap(clap::Error),
    Schedule(serde_json::Error),
    Fault(vexvm::Fault),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Error {
        Error::Io(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Error {
        Error::Schedule(e)
    }
}

impl From<vexvm::Fault> for Error {
    fn from(e: vexvm::Fault) -> Error {
        Error::Fault(e)
    }
}

/// One scheduled input byte, given in an `--input-schedule` JSON file as
/// `[{"cycle": 10, "byte": 65}, ...]`.
#[derive(Deserialize)]
struct ScheduledInput {
    cycle: u64,
    byte: u8,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("vex: {:?}", e);
        process::exit(1);
    }
}

fn run() -> Result<(), Error> {
    env_logger::init();

    let matches = app_from_crate!()
        .arg(
            Arg::with_name("IMAGE")
                .help("The compiled .vex image to run")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::with_name("memory")
                .short("m")
                .long("memory")
                .takes_value(true)
                .value_name("BYTES")
                .default_value("65536")
                .help("Size of data memory in bytes"),
        )
        .arg(
            Arg::with_name("stack")
                .short("s")
                .long("stack")
                .takes_value(true)
                .value_name("WORDS")
                .default_value("1024")
                .help("Capacity of the data and call stacks"),
        )
        .arg(
            Arg::with_name("max-cycles")
                .long("max-cycles")
                .takes_value(true)
                .value_name("CYCLES")
                .default_value("10000000")
                .help("Stops the run once this many cycles have elapsed"),
        )
        .arg(
            Arg::with_name("input-schedule")
                .long("input-schedule")
                .takes_value(true)
                .value_name("FILE")
                .help("JSON file of scheduled input bytes: [{\"cycle\":N,\"byte\":B}, ...]"),
        )
        .arg(
            Arg::with_name("log")
                .short("l")
                .long("log")
                .help("Print the execution log after the run finishes"),
        )
        .get_matches();

    let image_path = matches.value_of("IMAGE").unwrap();
    let mem_size = value_t!(matches.value_of("memory"), u32).map_err(Error::Clap)?;
    let stack_capacity = value_t!(matches.value_of("stack"), usize).map_err(Error::Clap)?;
    let max_cycles = value_t!(matches.value_of("max-cycles"), u64).map_err(Error::Clap)?;

    let image = vexfile::read_file(image_path)?;
    info!(
        "loaded {} ({} bytes instructions, {} bytes data)",
        image_path,
        image.instructions().len(),
        image.data().len()
    );

    let mut processor = Processor::new(mem_size, stack_capacity);
    processor.load_data(image.data(), 0)?;

    let mut instructions = Vec::with_capacity(image.instructions().len() / 4);
    for chunk in image.instructions().chunks(4) {
        match vexvm::Instruction::from_bytes(chunk) {
            Some(instruction) => instructions.push(instruction),
            None => {
                let opcode_byte = chunk.first().copied().unwrap_or(0);
                return Err(Error::from(vexvm::Fault::UnknownOpcode(opcode_byte)));
            }
        }
    }
    processor.load_program(instructions);

    if let Some(path) = matches.value_of("input-schedule") {
        let contents = fs::read_to_string(path)?;
        let events: Vec<ScheduledInput> = serde_json::from_str(&contents)?;
        for event in events {
            processor.schedule_input_event(event.cycle, event.byte);
        }
    }

    let result = processor.run(max_cycles);

    print!("{}", String::from_utf8_lossy(&result.output));
    eprintln!(
        "\n--- state={:?} instructions={} cycles={} pc={:04X}{}",
        result.state,
        result.instructions_executed,
        result.cycles_executed,
        result.final_pc,
        match &result.fault {
            Some(f) => format!(" fault={}", f),
            None => String::new(),
        },
    );

    if matches.is_present("log") {
        for line in processor.execution_log() {
            eprintln!("{}", line);
        }
    }

    if result.state == State::Halted && result.fault.is_some() {
        process::exit(1);
    }

    Ok(())
}
