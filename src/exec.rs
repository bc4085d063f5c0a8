//! The fetch / decode / operand-select / execute / writeback loop.
//!
//! One call to [`step`] retires at most one instruction and advances the PC.
//! Memory faults and unimplemented encodings never abort the loop; they are
//! logged and the cycle completes without the offending effect.

use log::warn;

use crate::arch::*;
use crate::decoder::{self, Decoded};
use crate::machine::Machine;
use crate::memory::{MemError, Memory};

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Halt {
    /// No instruction mapped at the current PC.
    FetchMiss(u32),
    /// The all-zero end-of-program word.
    Sentinel(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Retired(Decoded),
    Halted(Halt),
}

pub fn step(m: &mut Machine) -> Step {
    let pc = m.pc;
    let word = match m.mem.instr.get(&pc) {
        Some(&w) => w,
        None => return Step::Halted(Halt::FetchMiss(pc)),
    };
    if word == 0 {
        return Step::Halted(Halt::Sentinel(pc));
    }
    m.ir = word;
    let d = decoder::decode(word);

    // Operand select. RB doubles as the immediate for the I/S/U families;
    // RM keeps the live rs2 value because branches and stores read it after
    // RB has been overwritten.
    m.ra = m.read_reg(d.rs1);
    m.rb = match d.opcode {
        OPC_OPIMM | OPC_LOAD | OPC_JALR | OPC_LUI | OPC_STORE => d.imm,
        OPC_AUIPC => {
            m.ra = pc as i32;
            d.imm
        }
        _ => m.read_reg(d.rs2),
    };
    m.rm = m.read_reg(d.rs2);

    let mut next_pc = pc.wrapping_add(4);
    m.rz = 0;
    m.ry = 0;

    match d.opcode {
        OPC_RTYPE => {
            m.rz = alu_rtype(&d, m.ra, m.rb);
            m.ry = m.rz;
        }
        OPC_OPIMM => {
            m.rz = alu_opimm(&d, m.ra, m.rb);
            m.ry = m.rz;
        }
        OPC_LOAD => {
            let addr = (m.ra.wrapping_add(d.imm)) as u32;
            m.rz = addr as i32;
            match load_value(&m.mem, addr, d.funct3) {
                Ok(v) => {
                    m.mdr = v;
                    m.ry = m.mdr;
                }
                Err(e) => warn!("load at pc=0x{pc:08x} skipped: {e}"),
            }
        }
        OPC_STORE => {
            let addr = (m.ra.wrapping_add(d.imm)) as u32;
            m.rz = addr as i32;
            if let Err(e) = store_value(&mut m.mem, addr, d.funct3, m.rm) {
                warn!("store at pc=0x{pc:08x} skipped: {e}");
            }
        }
        OPC_BRANCH => {
            let taken = match d.funct3 {
                0x0 => m.ra == m.rm,
                0x1 => m.ra != m.rm,
                0x4 => m.ra < m.rm,
                0x5 => m.ra >= m.rm,
                other => {
                    warn!("unimplemented branch funct3 {other} at pc=0x{pc:08x}");
                    false
                }
            };
            if taken {
                next_pc = pc.wrapping_add(d.imm as u32);
            }
        }
        OPC_JAL => {
            m.rz = pc.wrapping_add(4) as i32;
            next_pc = pc.wrapping_add(d.imm as u32);
            m.ry = m.rz;
        }
        OPC_JALR => {
            m.rz = pc.wrapping_add(4) as i32;
            next_pc = (m.ra.wrapping_add(d.imm) as u32) & !1;
            m.ry = m.rz;
        }
        OPC_LUI => {
            m.rz = d.imm;
            m.ry = m.rz;
        }
        OPC_AUIPC => {
            m.rz = (pc as i32).wrapping_add(d.imm);
            m.ry = m.rz;
        }
        other => warn!("unimplemented opcode 0x{other:02x} at pc=0x{pc:08x}"),
    }

    // Writeback. Stores and branches update no register.
    if matches!(
        d.opcode,
        OPC_RTYPE | OPC_OPIMM | OPC_AUIPC | OPC_LUI | OPC_LOAD | OPC_JAL | OPC_JALR
    ) {
        m.write_reg(d.rd, m.ry);
    }
    m.regs[0] = 0;
    m.pc = next_pc;
    m.cycles += 1;
    Step::Retired(d)
}

/// Steps until the machine halts. Only safe for programs known to
/// terminate; interactive callers drive [`step`] themselves.
pub fn run(m: &mut Machine) -> Halt {
    loop {
        if let Step::Halted(h) = step(m) {
            return h;
        }
    }
}

/// Steps at most `max_steps` times; `None` means the budget ran out first.
pub fn run_bounded(m: &mut Machine, max_steps: u64) -> Option<Halt> {
    for _ in 0..max_steps {
        if let Step::Halted(h) = step(m) {
            return Some(h);
        }
    }
    None
}

fn alu_rtype(d: &Decoded, ra: i32, rb: i32) -> i32 {
    match (d.funct3, d.funct7) {
        (0x0, 0x00) => ra.wrapping_add(rb),
        (0x0, 0x20) => ra.wrapping_sub(rb),
        (0x0, 0x01) => ra.wrapping_mul(rb),
        (0x4, 0x00) => ra ^ rb,
        (0x4, 0x01) => {
            if rb == 0 {
                warn!("divide by zero");
                0
            } else {
                ra.wrapping_div(rb)
            }
        }
        (0x6, 0x00) => ra | rb,
        (0x6, 0x01) => {
            if rb == 0 {
                warn!("remainder by zero");
                0
            } else {
                ra.wrapping_rem(rb)
            }
        }
        (0x7, _) => ra & rb,
        (0x1, _) => ((ra as u32) << (rb & 0x1F)) as i32,
        (0x2, _) => (ra < rb) as i32,
        (0x5, 0x00) => ((ra as u32) >> (rb & 0x1F)) as i32,
        (0x5, 0x20) => ra >> (rb & 0x1F),
        (f3, f7) => {
            warn!("unimplemented R-type funct3/funct7 {f3}/0x{f7:02x}");
            0
        }
    }
}

fn alu_opimm(d: &Decoded, ra: i32, rb: i32) -> i32 {
    match d.funct3 {
        0x0 => ra.wrapping_add(rb),
        0x7 => ra & rb,
        0x6 => ra | rb,
        0x4 => ra ^ rb,
        0x2 => (ra < rb) as i32,
        0x1 => ((ra as u32) << (rb & 0x1F)) as i32,
        0x5 => {
            // SRLI vs SRAI live in the immediate's upper bits
            let shamt = rb & 0x1F;
            match (rb >> 5) & 0x7F {
                0x00 => ((ra as u32) >> shamt) as i32,
                0x20 => ra >> shamt,
                other => {
                    warn!("unknown shift-immediate variant 0x{other:02x}");
                    0
                }
            }
        }
        f3 => {
            warn!("unimplemented I-type funct3 {f3}");
            0
        }
    }
}

fn load_value(mem: &Memory, addr: u32, funct3: u32) -> Result<i32, MemError> {
    Ok(match funct3 {
        0x0 => mem.load_byte(addr)? as i8 as i32,
        0x1 => mem.load_half(addr)? as i16 as i32,
        0x2 => mem.load_word(addr)? as i32,
        f3 => {
            warn!("unimplemented load funct3 {f3}");
            0
        }
    })
}

fn store_value(mem: &mut Memory, addr: u32, funct3: u32, rm: i32) -> Result<(), MemError> {
    match funct3 {
        0x0 => mem.store_byte(addr, rm as u8)?,
        0x1 => mem.store_half(addr, rm as u16)?,
        0x2 => mem.store_word(addr, rm as u32)?,
        f3 => warn!("unimplemented store funct3 {f3}"),
    }
    Ok(())
}
