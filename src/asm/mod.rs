//! Two-pass symbolic assembler.
//!
//! Pass 1 walks the source once, interning labels and materializing data
//! directives; pass 2 encodes every collected instruction line against the
//! finished symbol table and renders the listing. Assembly is best-effort:
//! a bad line is reported, emits a zero word, and never stops the run, so
//! the listing always carries one word per instruction line.

mod encode;
mod errors;
#[cfg(test)]
mod tests;
mod utils;

pub use errors::AsmError;

use std::collections::{BTreeMap, HashMap};
use std::io::{self, Write};

use log::error;

use crate::arch::{DATA_BASE, TEXT_BASE};

use encode::InstrLine;
use utils::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Text,
    Data,
}

/// One executable line of the listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    pub addr: u32,
    pub word: u32,
    pub text: String,
    pub comment: String,
}

/// The result of assembling one source file.
#[derive(Debug, Clone, Default)]
pub struct Assembly {
    pub text: Vec<ListingEntry>,
    /// First address past the last instruction; the sentinel line's address.
    pub end_of_text: u32,
    /// Data segment bytes keyed by absolute address.
    pub data: BTreeMap<u32, u8>,
    pub symbols: HashMap<String, u32>,
    pub errors: Vec<AsmError>,
}

pub fn assemble(source: &str) -> Assembly {
    let mut asm = Assembly::default();
    let instructions = pass1(source, &mut asm);
    pass2(&instructions, &mut asm);
    asm
}

/// Labels, sections, data directives, and the instruction-line stream.
fn pass1(source: &str, asm: &mut Assembly) -> Vec<InstrLine> {
    let mut section = Section::Text;
    let mut text_addr = TEXT_BASE;
    let mut data_addr = DATA_BASE;
    let mut instructions = Vec::new();

    for (idx, raw) in source.lines().enumerate() {
        let line_no = idx + 1;
        let mut line = strip_comment(raw).trim();
        if line.is_empty() {
            continue;
        }

        if let Some(colon) = line.find(':') {
            let label = line[..colon].trim();
            let addr = match section {
                Section::Text => text_addr,
                Section::Data => data_addr,
            };
            asm.symbols.insert(label.to_string(), addr);
            line = line[colon + 1..].trim();
            if line.is_empty() {
                continue;
            }
        }

        if line.starts_with('.') {
            directive(line, line_no, &mut section, &mut data_addr, asm);
            continue;
        }

        // Anything else is an instruction and lives in text.
        section = Section::Text;
        let tokens = split_tokens(line);
        if tokens.is_empty() {
            continue;
        }
        instructions.push(InstrLine {
            addr: text_addr,
            mnemonic: tokens[0].clone(),
            operands: tokens[1..].to_vec(),
            line: line_no,
        });
        text_addr = text_addr.wrapping_add(4);
    }

    asm.end_of_text = text_addr;
    instructions
}

fn directive(
    line: &str,
    line_no: usize,
    section: &mut Section,
    data_addr: &mut u32,
    asm: &mut Assembly,
) {
    let tokens = split_tokens(line);
    let name = tokens[0].as_str();
    match name {
        ".text" => *section = Section::Text,
        ".data" => *section = Section::Data,
        ".byte" | ".half" | ".word" | ".dword" | ".asciz" => {
            *section = Section::Data;
            emit_data(line, line_no, name, &tokens[1..], data_addr, asm);
        }
        // Unrecognized directives are ignored, like the rest of the
        // best-effort policy: the line count of the text segment is
        // unaffected either way.
        _ => {}
    }
}

fn emit_data(
    line: &str,
    line_no: usize,
    name: &str,
    values: &[String],
    data_addr: &mut u32,
    asm: &mut Assembly,
) {
    let data = &mut asm.data;
    let errors = &mut asm.errors;
    let mut push = |addr: &mut u32, byte: u8| {
        data.insert(*addr, byte);
        *addr = addr.wrapping_add(1);
    };
    match name {
        ".byte" | ".half" | ".word" => {
            let width = match name {
                ".byte" => 1,
                ".half" => 2,
                _ => 4,
            };
            for value in values {
                match parse_imm(value) {
                    Some(v) => {
                        for i in 0..width {
                            push(data_addr, ((v as u32) >> (8 * i)) as u8);
                        }
                    }
                    None => {
                        let e = AsmError::new(line_no, format!("invalid {name} value: {value}"));
                        error!("{e}");
                        errors.push(e);
                    }
                }
            }
        }
        ".dword" => {
            for value in values {
                match parse_imm64(value) {
                    Some(v) => {
                        for i in 0..8 {
                            push(data_addr, ((v as u64) >> (8 * i)) as u8);
                        }
                    }
                    None => {
                        let e = AsmError::new(line_no, format!("invalid .dword value: {value}"));
                        error!("{e}");
                        errors.push(e);
                    }
                }
            }
        }
        ".asciz" => {
            // Take the string from the raw line so embedded spaces survive.
            let rest = &line[".asciz".len()..];
            match parse_str_lit(rest) {
                Some(s) => {
                    for b in s.bytes() {
                        push(data_addr, b);
                    }
                    push(data_addr, 0);
                }
                None => {
                    let e = AsmError::new(line_no, format!("invalid .asciz string: {rest}"));
                    error!("{e}");
                    errors.push(e);
                }
            }
        }
        _ => unreachable!("caller filters directive names"),
    }
}

/// Encode every instruction line; failures are reported and leave a zero
/// placeholder word so addresses stay aligned.
fn pass2(instructions: &[InstrLine], asm: &mut Assembly) {
    for inst in instructions {
        let entry = match encode::encode_line(inst, &asm.symbols) {
            Ok((word, comment)) => ListingEntry {
                addr: inst.addr,
                word,
                text: inst.display_text(),
                comment,
            },
            Err(e) => {
                error!("{e}");
                asm.errors.push(e);
                ListingEntry {
                    addr: inst.addr,
                    word: 0,
                    text: inst.display_text(),
                    comment: "NULL".into(),
                }
            }
        };
        asm.text.push(entry);
    }
}

/// Render the listing: executable lines, the end-of-text sentinel, a blank
/// separator, then one line per data byte in address order.
pub fn write_listing(out: &mut impl Write, asm: &Assembly) -> io::Result<()> {
    for e in &asm.text {
        writeln!(out, "0x{:x} 0x{:08X} , {} # {}", e.addr, e.word, e.text, e.comment)?;
    }
    writeln!(out, "0x{:x} <END_OF_TEXT>", asm.end_of_text)?;
    writeln!(out)?;
    for (addr, byte) in &asm.data {
        writeln!(out, "0x{addr:x} 0x{byte:02x}")?;
    }
    Ok(())
}

/// Convenience for callers that want the listing as text.
pub fn listing_to_string(asm: &Assembly) -> String {
    let mut buf = Vec::new();
    write_listing(&mut buf, asm).expect("writing to a Vec cannot fail");
    String::from_utf8(buf).expect("listing is ASCII")
}
