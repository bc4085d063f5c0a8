//! Opcode numbers and the memory map shared by the assembler and the
//! simulator.

pub const OPC_RTYPE: u32 = 0x33;
pub const OPC_OPIMM: u32 = 0x13;
pub const OPC_LOAD: u32 = 0x03;
pub const OPC_STORE: u32 = 0x23;
pub const OPC_BRANCH: u32 = 0x63;
pub const OPC_JAL: u32 = 0x6F;
pub const OPC_JALR: u32 = 0x67;
pub const OPC_LUI: u32 = 0x37;
pub const OPC_AUIPC: u32 = 0x17;

/// Start of the text segment; the `.text` counter and the reset PC.
pub const TEXT_BASE: u32 = 0x0000_0000;
/// First data address; everything below it is instruction memory.
pub const DATA_BASE: u32 = 0x1000_0000;
/// First stack address; the data segment ends here.
pub const STACK_BASE: u32 = 0x5000_0000;
/// Value of x2 (sp) at reset. The stack grows downward from here.
pub const SP_INIT: u32 = 0x7FFF_FFFC;

pub const NUM_REGS: usize = 32;
/// Register index of the stack pointer.
pub const SP: usize = 2;
