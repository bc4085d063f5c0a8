//! Machine-code listing I/O: loading a `.mc` listing into the segments and
//! rewriting the per-cycle checkpoint files.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use log::warn;

use crate::machine::Machine;
use crate::memory::{region_of, Memory, Region};

/// Parse a listing file and populate the three segments.
pub fn load_listing(path: &Path, mem: &mut Memory) -> io::Result<()> {
    let file = File::open(path)?;
    for line in BufReader::new(file).lines() {
        load_line(&line?, mem);
    }
    Ok(())
}

/// Same as [`load_listing`] for in-memory text.
pub fn load_listing_text(text: &str, mem: &mut Memory) {
    for line in text.lines() {
        load_line(line, mem);
    }
}

fn load_line(raw: &str, mem: &mut Memory) {
    let line = raw.split('#').next().unwrap_or("");
    let mut tokens = line.split_whitespace();
    let (addr_tok, data_tok) = match (tokens.next(), tokens.next()) {
        (Some(a), Some(d)) => (a, d),
        _ => return,
    };
    // The end-of-text sentinel and legacy tag tokens carry no word.
    if data_tok.starts_with('<') || data_tok.starts_with('t') {
        return;
    }
    let data_tok = data_tok.trim_end_matches(',');
    let (addr, word) = match (parse_hex(addr_tok), parse_hex(data_tok)) {
        (Some(a), Some(w)) => (a, w),
        _ => {
            warn!("skipping malformed listing line: {raw}");
            return;
        }
    };
    match region_of(addr) {
        Region::Instruction => {
            mem.instr.insert(addr, word);
        }
        Region::Data => mem.data.write_word(addr, word),
        Region::Stack => mem.stack.write_word(addr, word),
    }
}

fn parse_hex(token: &str) -> Option<u32> {
    let t = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
        .unwrap_or(token);
    u32::from_str_radix(t, 16).ok()
}

/// Rewrite `instruction.mc`, `data.mc` and `stack.mc` under `dir` from the
/// machine's current segments. Files are replaced whole and flushed so the
/// on-disk state always matches the last retired instruction.
pub fn write_checkpoints(m: &Machine, dir: &Path) -> io::Result<()> {
    dump_words(&dir.join("instruction.mc"), m.mem.instr.iter().map(|(&a, &w)| (a, w)))?;
    dump_words(&dir.join("data.mc"), m.mem.data.words().into_iter())?;
    dump_words(&dir.join("stack.mc"), m.mem.stack.words().into_iter())?;
    Ok(())
}

fn dump_words(path: &Path, words: impl Iterator<Item = (u32, u32)>) -> io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    for (addr, word) in words {
        writeln!(out, "0x{addr:08x}  0x{word:08x}")?;
    }
    out.flush()
}
