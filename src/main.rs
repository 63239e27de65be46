//! IntCode runner.
//!
//! Loads a program file and runs it alone, as an amplifier pipeline, as an
//! interactive ASCII console, or as a NAT packet network.
//!
//! # Usage
//! ```text
//! intcode <PROGRAM> [run|amplify|console|network] [OPTIONS]
//! ```
//!
//! # Examples
//! ```text
//! intcode day5.txt run --input 5
//! intcode day2.txt --patch 1=12 --patch 2=2
//! intcode day7.txt amplify --phases 9,8,7,6,5 --feedback
//! intcode day23.txt network --nodes 50
//! ```

use intcode::network::ascii;
use intcode::network::console::Console;
use intcode::network::nat::{Network, NetworkConfig};
use intcode::network::pipeline::Pipeline;
use intcode::virtual_machine::isa::Word;
use intcode::virtual_machine::program::Program;
use intcode::virtual_machine::vm::{Status, VM, VmConfig};
use intcode::{error, info, warn};
use std::env;
use std::error::Error;
use std::io::{self, BufRead};
use std::process;
use std::thread;

/// Harness selected on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Run { inputs: Vec<Word>, ascii: bool },
    Amplify {
        phases: Vec<Word>,
        feedback: bool,
        signal: Word,
    },
    Console,
    Network { nodes: usize, nat: Word },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Options {
    program: String,
    command: Command,
    patches: Vec<(Word, Word)>,
    trace: bool,
}

#[tokio::main]
async fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage(&args[0]);
        process::exit(if args.len() < 2 { 1 } else { 0 });
    }

    let options = parse_args(&args[1..]).unwrap_or_else(|e| {
        error!("{}\n", e);
        print_usage(&args[0]);
        process::exit(1);
    });

    let program = Program::load_file(&options.program)
        .and_then(|p| p.patched(options.patches.iter().copied()))
        .unwrap_or_else(|e| {
            error!("Failed to load {}: {}", options.program, e);
            process::exit(1);
        });

    let trace = options.trace || VmConfig::from_env().trace;
    let result = match options.command {
        Command::Run { inputs, ascii } => run(program, inputs, ascii, trace),
        Command::Amplify {
            phases,
            feedback,
            signal,
        } => amplify(program, phases, feedback, signal, trace).await,
        Command::Console => console(program, trace).await,
        Command::Network { nodes, nat } => network(program, nodes, nat, trace).await,
    };

    if let Err(e) = result {
        error!("{}", e);
        process::exit(1);
    }
}

fn run(
    program: Program,
    inputs: Vec<Word>,
    as_ascii: bool,
    trace: bool,
) -> Result<(), Box<dyn Error>> {
    let mut vm = VM::with_config(program, VmConfig::new().with_trace(trace));
    let (outputs, status) = vm.run_with_inputs(inputs)?;

    if as_ascii {
        for frame in ascii::frames(&outputs) {
            println!("{}", frame);
        }
    } else {
        for value in &outputs {
            println!("{}", value);
        }
    }
    if status == Status::BlockedOnInput {
        warn!("Program stopped waiting for more input at pc {}", vm.pc());
    }
    info!(
        "Halted after {} outputs, cell 0 = {}",
        outputs.len(),
        vm.program_mut().read(0)?
    );
    Ok(())
}

async fn amplify(
    program: Program,
    phases: Vec<Word>,
    feedback: bool,
    signal: Word,
    trace: bool,
) -> Result<(), Box<dyn Error>> {
    let value = Pipeline::new(program, phases)
        .with_feedback(feedback)
        .with_trace(trace)
        .run(signal)
        .await?;
    println!("{}", value);
    Ok(())
}

async fn console(program: Program, trace: bool) -> Result<(), Box<dyn Error>> {
    let mut console = Console::start(program, VmConfig::new().with_trace(trace));

    // Blocking reads stay off the runtime; the thread is never joined.
    let input = console.input();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            let sent = ascii::encode_line(&line)
                .into_iter()
                .all(|word| input.send(word));
            if !sent {
                break;
            }
        }
        input.close();
    });

    while let Some(frame) = console.read_line().await {
        println!("{}", frame);
    }
    console.wait().await?;
    Ok(())
}

async fn network(
    program: Program,
    nodes: usize,
    nat: Word,
    trace: bool,
) -> Result<(), Box<dyn Error>> {
    let config = NetworkConfig {
        nodes,
        nat_address: nat,
        trace,
        ..NetworkConfig::default()
    };
    let report = Network::new(program, config).run().await?;

    info!("{}", report);
    println!("{}", report.first.y);
    println!("{}", report.repeated.y);
    Ok(())
}

/// Parses everything after the executable name.
fn parse_args(args: &[String]) -> Result<Options, String> {
    let program = args.first().ok_or("missing program file")?.clone();

    let mut rest = &args[1..];
    let mode = match rest.first() {
        Some(arg) if !arg.starts_with('-') => {
            rest = &rest[1..];
            arg.as_str()
        }
        _ => "run",
    };
    if !matches!(mode, "run" | "amplify" | "console" | "network") {
        return Err(format!("Unknown command: {}", mode));
    }

    let mut inputs = Vec::new();
    let mut patches = Vec::new();
    let mut phases = vec![0, 1, 2, 3, 4];
    let mut feedback = false;
    let mut signal = 0;
    let mut nodes = NetworkConfig::default().nodes;
    let mut nat = NetworkConfig::default().nat_address;
    let mut trace = false;
    let mut ascii = false;

    let mut i = 0;
    while i < rest.len() {
        let flag = rest[i].as_str();
        let mut value = || {
            i += 1;
            rest.get(i)
                .map(String::as_str)
                .ok_or_else(|| format!("{} requires an argument", flag))
        };

        match flag {
            "--input" | "-i" => inputs.extend(parse_words(value()?)?),
            "--patch" | "-p" => patches.push(parse_patch(value()?)?),
            "--phases" => phases = parse_words(value()?)?,
            "--signal" => signal = parse_number(value()?)?,
            "--nodes" => nodes = parse_number(value()?)?,
            "--nat" => nat = parse_number(value()?)?,
            "--feedback" => feedback = true,
            "--trace" => trace = true,
            "--ascii" => ascii = true,
            other => return Err(format!("Unexpected argument: {}", other)),
        }
        i += 1;
    }

    let command = match mode {
        "amplify" => Command::Amplify {
            phases,
            feedback,
            signal,
        },
        "console" => Command::Console,
        "network" => Command::Network { nodes, nat },
        _ => Command::Run { inputs, ascii },
    };

    Ok(Options {
        program,
        command,
        patches,
        trace,
    })
}

fn parse_number<T: std::str::FromStr>(text: &str) -> Result<T, String> {
    text.trim()
        .parse()
        .map_err(|_| format!("Invalid number: '{}'", text))
}

/// Parses a comma separated list of words.
fn parse_words(text: &str) -> Result<Vec<Word>, String> {
    text.split(',').map(parse_number).collect()
}

/// Parses `ADDR=VALUE`.
fn parse_patch(text: &str) -> Result<(Word, Word), String> {
    let (addr, value) = text
        .split_once('=')
        .ok_or_else(|| format!("Invalid patch '{}', expected ADDR=VALUE", text))?;
    let addr: Word = parse_number(addr)?;
    if addr < 0 {
        return Err(format!("Invalid patch address: {}", addr));
    }
    Ok((addr, parse_number(value)?))
}

fn print_usage(program: &str) {
    eprintln!("{}", USAGE.replace("{program}", program));
}

const USAGE: &str = "\
IntCode Runner

USAGE:
    {program} <PROGRAM> [COMMAND] [OPTIONS]

ARGS:
    <PROGRAM>    File holding comma separated IntCode

COMMANDS:
    run        Run a single machine (default)
    amplify    Run an amplifier pipeline and print the last signal
    console    Connect stdin and stdout to the machine as ASCII lines
    network    Run a NAT packet network and print the first and repeated y values

OPTIONS:
    -i, --input <A,B,..>       Input values for run (repeatable)
    -p, --patch <ADDR=VALUE>   Overwrite a cell before running (repeatable)
    --ascii                    Print run output as ASCII lines
    --phases <A,B,..>          Amplifier phases (default 0,1,2,3,4)
    --feedback                 Connect the last amplifier back to the first
    --signal <N>               Initial amplifier signal (default 0)
    --nodes <N>                Network size (default 50)
    --nat <ADDR>               NAT address (default 255)
    --trace                    Log every executed instruction
    -h, --help                 Print this help message

ENVIRONMENT:
    INTCODE_TRACE    Enable tracing when set to 1 or true

EXAMPLES:
    # Run with patched noun and verb
    {program} day2.txt --patch 1=12 --patch 2=2

    # Diagnostic program with one input
    {program} day5.txt run --input 5

    # Feedback loop
    {program} day7.txt amplify --phases 9,8,7,6,5 --feedback
";
