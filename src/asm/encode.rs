//! Per-mnemonic dispatch: one collected instruction line in, one encoded
//! word and its bit-breakdown comment out.

use std::collections::HashMap;

use crate::arch::*;
use crate::encoder::*;

use super::errors::AsmError;
use super::utils::*;

/// An instruction line collected by pass 1.
#[derive(Debug, Clone)]
pub(super) struct InstrLine {
    pub addr: u32,
    pub mnemonic: String,
    pub operands: Vec<String>,
    pub line: usize,
}

impl InstrLine {
    /// The disassembly column of the listing: `MNEMONIC op,op,op`.
    pub fn display_text(&self) -> String {
        if self.operands.is_empty() {
            self.mnemonic.clone()
        } else {
            format!("{} {}", self.mnemonic, self.operands.join(","))
        }
    }
}

pub(super) fn encode_line(
    inst: &InstrLine,
    symbols: &HashMap<String, u32>,
) -> Result<(u32, String), AsmError> {
    let mnemonic = inst.mnemonic.to_uppercase();
    let (mnemonic, operands) = expand_pseudo(&mnemonic, &inst.operands, inst.line)?;
    dispatch(inst, &mnemonic, &operands, symbols)
}

/// One-to-one pseudo-instructions; each stays a single word so the listing
/// keeps its line-per-instruction alignment.
fn expand_pseudo(
    mnemonic: &str,
    operands: &[String],
    line: usize,
) -> Result<(String, Vec<String>), AsmError> {
    let want = |n: usize, form: &str| {
        if operands.len() != n {
            Err(AsmError::new(line, format!("{mnemonic}: expected '{form}'")))
        } else {
            Ok(())
        }
    };
    Ok(match mnemonic {
        "NOP" => {
            want(0, "")?;
            ("ADDI".into(), vec!["x0".into(), "x0".into(), "0".into()])
        }
        "MV" => {
            want(2, "rd, rs")?;
            ("ADDI".into(), vec![operands[0].clone(), operands[1].clone(), "0".into()])
        }
        "LI" => {
            want(2, "rd, imm")?;
            ("ADDI".into(), vec![operands[0].clone(), "x0".into(), operands[1].clone()])
        }
        "J" => {
            want(1, "label")?;
            ("JAL".into(), vec!["x0".into(), operands[0].clone()])
        }
        "JR" => {
            want(1, "rs")?;
            ("JALR".into(), vec!["x0".into(), format!("0({})", operands[0])])
        }
        "RET" => {
            want(0, "")?;
            ("JALR".into(), vec!["x0".into(), "0(x1)".into()])
        }
        _ => (mnemonic.to_string(), operands.to_vec()),
    })
}

fn dispatch(
    inst: &InstrLine,
    mnemonic: &str,
    operands: &[String],
    symbols: &HashMap<String, u32>,
) -> Result<(u32, String), AsmError> {
    let line = inst.line;

    match mnemonic {
        "ADD" | "SUB" | "AND" | "OR" | "XOR" | "SLL" | "SRL" | "SRA" | "SLT" | "MUL" | "DIV"
        | "REM" => {
            expect_operands(line, mnemonic, operands, 3, "rd, rs1, rs2")?;
            let (funct3, funct7) = rtype_functs(mnemonic);
            let rd = reg(line, &operands[0])?;
            let rs1 = reg(line, &operands[1])?;
            let rs2 = reg(line, &operands[2])?;
            let word = encode_r(OPC_RTYPE, funct3, funct7, rd, rs1, rs2);
            Ok((word, comment_r(OPC_RTYPE, funct3, funct7, rd, rs1, rs2)))
        }

        "ADDI" | "ANDI" | "ORI" | "XORI" | "SLTI" => {
            expect_operands(line, mnemonic, operands, 3, "rd, rs1, imm")?;
            let funct3 = match mnemonic {
                "ADDI" => 0x0,
                "ANDI" => 0x7,
                "ORI" => 0x6,
                "XORI" => 0x4,
                _ => 0x2,
            };
            let rd = reg(line, &operands[0])?;
            let rs1 = reg(line, &operands[1])?;
            let imm = absolute(line, &operands[2], symbols)?;
            let word = encode_i(OPC_OPIMM, funct3, rd, rs1, imm);
            Ok((word, comment_i(OPC_OPIMM, funct3, rd, rs1, imm)))
        }

        "SLLI" | "SRLI" | "SRAI" => {
            expect_operands(line, mnemonic, operands, 3, "rd, rs1, shamt")?;
            let funct3 = if mnemonic == "SLLI" { 0x1 } else { 0x5 };
            let rd = reg(line, &operands[0])?;
            let rs1 = reg(line, &operands[1])?;
            let shamt = absolute(line, &operands[2], symbols)?;
            // SRAI is distinguished from SRLI by bits 11:5 of the immediate
            let imm = if mnemonic == "SRAI" { (shamt & 0x1F) | (0x20 << 5) } else { shamt };
            let word = encode_i(OPC_OPIMM, funct3, rd, rs1, imm);
            Ok((word, comment_i(OPC_OPIMM, funct3, rd, rs1, imm)))
        }

        "LB" | "LH" | "LW" | "LD" => {
            expect_operands(line, mnemonic, operands, 2, "rd, imm(rs1)")?;
            let funct3 = match mnemonic {
                "LB" => 0x0,
                "LH" => 0x1,
                "LW" => 0x2,
                _ => 0x3,
            };
            let rd = reg(line, &operands[0])?;
            let (imm, rs1) = memop(line, &operands[1], symbols)?;
            let word = encode_i(OPC_LOAD, funct3, rd, rs1, imm);
            Ok((word, comment_i(OPC_LOAD, funct3, rd, rs1, imm)))
        }

        "JALR" => {
            expect_operands(line, mnemonic, operands, 2, "rd, imm(rs1)")?;
            let rd = reg(line, &operands[0])?;
            let (imm, rs1) = memop(line, &operands[1], symbols)?;
            let word = encode_i(OPC_JALR, 0x0, rd, rs1, imm);
            Ok((word, comment_i(OPC_JALR, 0x0, rd, rs1, imm)))
        }

        "SB" | "SH" | "SW" | "SD" => {
            expect_operands(line, mnemonic, operands, 2, "rs2, imm(rs1)")?;
            let funct3 = match mnemonic {
                "SB" => 0x0,
                "SH" => 0x1,
                "SW" => 0x2,
                _ => 0x3,
            };
            let rs2 = reg(line, &operands[0])?;
            let (imm, rs1) = memop(line, &operands[1], symbols)?;
            let word = encode_s(OPC_STORE, funct3, rs1, rs2, imm);
            Ok((word, comment_s(OPC_STORE, funct3, rs1, rs2, imm)))
        }

        "BEQ" | "BNE" | "BLT" | "BGE" => {
            expect_operands(line, mnemonic, operands, 3, "rs1, rs2, label")?;
            let funct3 = match mnemonic {
                "BEQ" => 0x0,
                "BNE" => 0x1,
                "BLT" => 0x4,
                _ => 0x5,
            };
            let rs1 = reg(line, &operands[0])?;
            let rs2 = reg(line, &operands[1])?;
            let imm = pc_relative(line, &operands[2], inst.addr, symbols)?;
            let word = encode_sb(OPC_BRANCH, funct3, rs1, rs2, imm);
            Ok((word, comment_sb(OPC_BRANCH, funct3, rs1, rs2, imm)))
        }

        "LUI" | "AUIPC" => {
            expect_operands(line, mnemonic, operands, 2, "rd, imm")?;
            let opcode = if mnemonic == "LUI" { OPC_LUI } else { OPC_AUIPC };
            let rd = reg(line, &operands[0])?;
            let imm = absolute(line, &operands[1], symbols)?;
            let word = encode_u(opcode, rd, imm);
            Ok((word, comment_u(opcode, rd, imm)))
        }

        "JAL" => {
            expect_operands(line, mnemonic, operands, 2, "rd, label")?;
            let rd = reg(line, &operands[0])?;
            let imm = pc_relative(line, &operands[1], inst.addr, symbols)?;
            let word = encode_uj(OPC_JAL, rd, imm);
            Ok((word, comment_uj(OPC_JAL, rd, imm)))
        }

        other => Err(AsmError::new(line, format!("unknown instruction: {other}"))),
    }
}

fn rtype_functs(mnemonic: &str) -> (u32, u32) {
    match mnemonic {
        "ADD" => (0x0, 0x00),
        "SUB" => (0x0, 0x20),
        "MUL" => (0x0, 0x01),
        "XOR" => (0x4, 0x00),
        "DIV" => (0x4, 0x01),
        "OR" => (0x6, 0x00),
        "REM" => (0x6, 0x01),
        "AND" => (0x7, 0x00),
        "SLL" => (0x1, 0x00),
        "SLT" => (0x2, 0x00),
        "SRL" => (0x5, 0x00),
        _ => (0x5, 0x20), // SRA
    }
}

fn expect_operands(
    line: usize,
    mnemonic: &str,
    operands: &[String],
    n: usize,
    form: &str,
) -> Result<(), AsmError> {
    if operands.len() != n {
        return Err(AsmError::new(line, format!("{mnemonic}: expected '{form}'")));
    }
    Ok(())
}

fn reg(line: usize, token: &str) -> Result<u32, AsmError> {
    parse_reg(token).ok_or_else(|| AsmError::new(line, format!("invalid register: {token}")))
}

/// A label resolves to its absolute address; anything else must parse as a
/// literal. No PC-relativization happens here.
fn absolute(line: usize, token: &str, symbols: &HashMap<String, u32>) -> Result<i32, AsmError> {
    if let Some(&addr) = symbols.get(token) {
        return Ok(addr as i32);
    }
    parse_imm(token).ok_or_else(|| AsmError::new(line, format!("invalid immediate: {token}")))
}

/// A label resolves to the byte offset from this instruction's address; a
/// literal is taken as the offset directly.
fn pc_relative(
    line: usize,
    token: &str,
    addr: u32,
    symbols: &HashMap<String, u32>,
) -> Result<i32, AsmError> {
    if let Some(&target) = symbols.get(token) {
        return Ok((target as i64 - addr as i64) as i32);
    }
    parse_imm(token)
        .ok_or_else(|| AsmError::new(line, format!("undefined label or bad offset: {token}")))
}

fn memop(
    line: usize,
    operand: &str,
    symbols: &HashMap<String, u32>,
) -> Result<(i32, u32), AsmError> {
    let (imm_tok, reg_tok) = split_memop(operand).map_err(|m| AsmError::new(line, m))?;
    let imm = absolute(line, imm_tok, symbols)?;
    let rs1 = reg(line, reg_tok)?;
    Ok((imm, rs1))
}

// Bit-breakdown comments for the listing, dash-joined fields with NULL
// standing in for fields a format does not have.

fn comment_r(opcode: u32, funct3: u32, funct7: u32, rd: u32, rs1: u32, rs2: u32) -> String {
    format!(
        "{}-{}-{}-{}-{}-{}-NULL",
        to_binary(opcode, 7),
        to_binary(funct3, 3),
        to_binary(funct7, 7),
        to_binary(rd, 5),
        to_binary(rs1, 5),
        to_binary(rs2, 5)
    )
}

fn comment_i(opcode: u32, funct3: u32, rd: u32, rs1: u32, imm: i32) -> String {
    format!(
        "{}-{}-NULL-{}-{}-{}",
        to_binary(opcode, 7),
        to_binary(funct3, 3),
        to_binary(rd, 5),
        to_binary(rs1, 5),
        to_binary(imm as u32 & 0xFFF, 12)
    )
}

fn comment_s(opcode: u32, funct3: u32, rs1: u32, rs2: u32, imm: i32) -> String {
    format!(
        "{}-{}-NULL-{}-{}-{}",
        to_binary(opcode, 7),
        to_binary(funct3, 3),
        to_binary(rs1, 5),
        to_binary(rs2, 5),
        to_binary(imm as u32 & 0xFFF, 12)
    )
}

fn comment_sb(opcode: u32, funct3: u32, rs1: u32, rs2: u32, imm: i32) -> String {
    format!(
        "{}-{}-NULL-{}-{}-{}",
        to_binary(opcode, 7),
        to_binary(funct3, 3),
        to_binary(rs1, 5),
        to_binary(rs2, 5),
        to_binary((imm as u32 >> 1) & 0xFFF, 12)
    )
}

fn comment_u(opcode: u32, rd: u32, imm: i32) -> String {
    format!(
        "{}-NULL-NULL-{}-{}",
        to_binary(opcode, 7),
        to_binary(rd, 5),
        to_binary(imm as u32 & 0xFFFFF, 20)
    )
}

fn comment_uj(opcode: u32, rd: u32, imm: i32) -> String {
    format!(
        "{}-NULL-NULL-{}-{}",
        to_binary(opcode, 7),
        to_binary(rd, 5),
        to_binary((imm as u32 >> 1) & 0xFFFFF, 20)
    )
}
