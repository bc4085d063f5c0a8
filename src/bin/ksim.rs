use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::Parser;

use kestrel::exec::{self, Halt, Step};
use kestrel::machine::Machine;
use kestrel::mc;

/// RV32IM single-cycle simulator over a machine-code listing.
#[derive(Parser, Debug)]
#[command(name = "ksim", version)]
struct Opts {
    /// Input machine-code listing
    input: PathBuf,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Cmd {
    Next,
    Run,
    Exit,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let opts = Opts::try_parse().unwrap_or_else(|e| {
        let _ = e.print();
        process::exit(1);
    });
    if let Err(e) = run(&opts) {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn run(opts: &Opts) -> Result<()> {
    let mut machine = Machine::new();
    mc::load_listing(&opts.input, &mut machine.mem)
        .with_context(|| format!("cannot open {}", opts.input.display()))?;

    // Checkpoint files reflect the loaded image even before cycle 0.
    mc::write_checkpoints(&machine, Path::new("."))?;

    println!("Initial state (before cycle 0):");
    print_registers(&machine);

    let mut run_all = match prompt()? {
        Cmd::Exit => {
            println!("Exiting at user request.");
            return Ok(());
        }
        Cmd::Run => true,
        Cmd::Next => false,
    };

    loop {
        let pc = machine.pc;
        println!("Clock Cycle: {}", machine.cycles);
        match exec::step(&mut machine) {
            Step::Halted(Halt::FetchMiss(pc)) => {
                println!("[Fetch] no instruction at PC=0x{pc:08x}, stopping.");
                break;
            }
            Step::Halted(Halt::Sentinel(pc)) => {
                println!("[Fetch] end-of-program word at PC=0x{pc:08x}, stopping.");
                break;
            }
            Step::Retired(d) => {
                println!("[Fetch] PC=0x{:08x} IR=0x{:08x}", pc, machine.ir);
                println!(
                    "[Decode] opcode=0x{:02x} rd={} rs1={} rs2={} funct3=0x{:x} funct7=0x{:02x} imm={}",
                    d.opcode, d.rd, d.rs1, d.rs2, d.funct3, d.funct7, d.imm
                );
                println!(
                    "[Execute] RZ={} RY={} MDR={} nextPC=0x{:08x}",
                    machine.rz, machine.ry, machine.mdr, machine.pc
                );
                print_registers(&machine);
                // On-disk checkpoints must match the retired state before
                // the next fetch.
                mc::write_checkpoints(&machine, Path::new("."))?;
            }
        }
        if !run_all {
            match prompt()? {
                Cmd::Exit => {
                    println!("Exiting at user request.");
                    break;
                }
                Cmd::Run => run_all = true,
                Cmd::Next => {}
            }
        }
    }

    println!("Simulation finished after {} cycles.", machine.cycles);
    Ok(())
}

fn print_registers(m: &Machine) {
    println!("Register File:");
    for i in 0..32 {
        print!("R[{i:2}] = {:10}   ", m.regs[i]);
        if (i + 1) % 4 == 0 {
            println!();
        }
    }
    println!("-------------------------------------");
    println!("PC = 0x{:x}  IR = 0x{:x}", m.pc, m.ir);
    println!("RA = {}  RB = {}  RM = {}", m.ra, m.rb, m.rm);
    println!("RZ = {}  RY = {}  MDR = {}", m.rz, m.ry, m.mdr);
    println!("===========================================");
}

/// One character from stdin: N steps, R runs to completion, E exits.
/// End of input behaves like R so piped runs finish on their own.
fn prompt() -> Result<Cmd> {
    let stdin = io::stdin();
    loop {
        print!("Enter N for next, R for remainder, E to exit: ");
        io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            println!();
            return Ok(Cmd::Run);
        }
        match line.trim().chars().next() {
            Some('n' | 'N') => return Ok(Cmd::Next),
            Some('r' | 'R') => return Ok(Cmd::Run),
            Some('e' | 'E') => return Ok(Cmd::Exit),
            _ => continue,
        }
    }
}
