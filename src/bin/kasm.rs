use std::fs;
use std::io::BufWriter;
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::Parser;

use kestrel::asm;

/// RV32IM assembler: translate an assembly source into a machine-code
/// listing.
#[derive(Parser, Debug)]
#[command(name = "kasm", version)]
struct Opts {
    /// Input assembly source
    input: PathBuf,
    /// Output machine-code listing
    output: PathBuf,
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
    let source = fs::read_to_string(&opts.input)
        .with_context(|| format!("cannot open {}", opts.input.display()))?;

    // Best-effort: diagnostics have already been reported per line and the
    // listing still comes out aligned, so a bad source is not a bad exit.
    let assembly = asm::assemble(&source);
    if !assembly.errors.is_empty() {
        eprintln!("{} line(s) failed to assemble", assembly.errors.len());
    }

    let file = fs::File::create(&opts.output)
        .with_context(|| format!("cannot create {}", opts.output.display()))?;
    let mut out = BufWriter::new(file);
    asm::write_listing(&mut out, &assembly)
        .with_context(|| format!("cannot write {}", opts.output.display()))?;

    println!("Assembly complete. See {}", opts.output.display());
    Ok(())
}
