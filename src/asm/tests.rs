use super::*;
use crate::arch::*;
use crate::encoder::*;

#[test]
fn labels_resolve_per_section() {
    let asm = assemble(
        ".data\nW: .word 1\n.text\nSTART: addi x1, x0, 1\nNEXT: addi x2, x0, 2\n",
    );
    assert!(asm.errors.is_empty());
    assert_eq!(asm.symbols["W"], 0x1000_0000);
    assert_eq!(asm.symbols["START"], 0x0);
    assert_eq!(asm.symbols["NEXT"], 0x4);
}

#[test]
fn default_section_is_text() {
    let asm = assemble("entry: addi x1, x0, 1\n");
    assert_eq!(asm.symbols["entry"], 0x0);
    assert_eq!(asm.text.len(), 1);
}

#[test]
fn label_shares_line_with_instruction() {
    let asm = assemble("loop: addi x1, x1, -1\nbne x1, x0, loop\n");
    assert!(asm.errors.is_empty());
    assert_eq!(asm.symbols["loop"], 0x0);
    assert_eq!(asm.text.len(), 2);
}

#[test]
fn comments_and_blank_lines_are_skipped() {
    let asm = assemble("# header\n\naddi x1, x0, 1 # trailing\n   \n");
    assert!(asm.errors.is_empty());
    assert_eq!(asm.text.len(), 1);
    assert_eq!(asm.end_of_text, 4);
}

#[test]
fn data_directives_emit_little_endian_bytes() {
    let asm = assemble(
        ".data\n.byte 1, 2\n.half 0x1234\n.word 0xDEADBEEF\n.dword 0x1122334455667788\n",
    );
    assert!(asm.errors.is_empty());
    let bytes: Vec<u8> = asm.data.values().copied().collect();
    assert_eq!(
        bytes,
        vec![
            1, 2, // .byte
            0x34, 0x12, // .half
            0xEF, 0xBE, 0xAD, 0xDE, // .word
            0x88, 0x77, 0x66, 0x55, 0x44, 0x33, 0x22, 0x11, // .dword
        ]
    );
    let addrs: Vec<u32> = asm.data.keys().copied().collect();
    assert_eq!(addrs[0], 0x1000_0000);
    assert_eq!(*addrs.last().unwrap(), 0x1000_000F);
}

#[test]
fn asciz_keeps_spaces_and_appends_nul() {
    let asm = assemble(".data\nmsg: .asciz \"hi there\"\n");
    assert!(asm.errors.is_empty());
    let bytes: Vec<u8> = asm.data.values().copied().collect();
    assert_eq!(bytes, b"hi there\0");
}

#[test]
fn r_type_encodings() {
    let asm = assemble("add x3, x1, x2\nsub x3, x1, x2\nmul x3, x1, x2\nsra x3, x1, x2\n");
    assert!(asm.errors.is_empty());
    assert_eq!(asm.text[0].word, encode_r(OPC_RTYPE, 0x0, 0x00, 3, 1, 2));
    assert_eq!(asm.text[1].word, encode_r(OPC_RTYPE, 0x0, 0x20, 3, 1, 2));
    assert_eq!(asm.text[2].word, encode_r(OPC_RTYPE, 0x0, 0x01, 3, 1, 2));
    assert_eq!(asm.text[3].word, encode_r(OPC_RTYPE, 0x5, 0x20, 3, 1, 2));
}

#[test]
fn shift_immediates_encode_the_variant_bits() {
    let asm = assemble("slli x1, x1, 3\nsrli x2, x1, 3\nsrai x3, x1, 3\n");
    assert!(asm.errors.is_empty());
    assert_eq!(asm.text[0].word, encode_i(OPC_OPIMM, 0x1, 1, 1, 3));
    assert_eq!(asm.text[1].word, encode_i(OPC_OPIMM, 0x5, 2, 1, 3));
    assert_eq!(asm.text[2].word, encode_i(OPC_OPIMM, 0x5, 3, 1, 3 | (0x20 << 5)));
}

#[test]
fn load_store_memory_operands() {
    let asm = assemble("lw x2, 8(x1)\nsw x2, -4(x1)\nlb x3, 0(x1)\n");
    assert!(asm.errors.is_empty());
    assert_eq!(asm.text[0].word, encode_i(OPC_LOAD, 0x2, 2, 1, 8));
    assert_eq!(asm.text[1].word, encode_s(OPC_STORE, 0x2, 1, 2, -4));
    assert_eq!(asm.text[2].word, encode_i(OPC_LOAD, 0x0, 3, 1, 0));
}

#[test]
fn immediate_label_is_absolute_not_pc_relative() {
    let asm = assemble(".data\nV: .word 7\n.text\naddi x1, x0, V\nlw x2, V(x0)\n");
    assert!(asm.errors.is_empty());
    // 0x10000000 truncates to 0 in a 12-bit field; the point is that no
    // PC subtraction happened before masking.
    assert_eq!(asm.text[0].word, encode_i(OPC_OPIMM, 0x0, 1, 0, 0x1000_0000u32 as i32));
    assert_eq!(asm.text[1].word, encode_i(OPC_LOAD, 0x2, 2, 0, 0x1000_0000u32 as i32));
}

#[test]
fn branch_offsets_are_target_minus_branch_address() {
    let asm = assemble("start: addi x1, x1, -1\nbne x1, x0, start\nbeq x0, x0, end\nend: nop\n");
    assert!(asm.errors.is_empty());
    // bne at 0x4 back to 0x0
    assert_eq!(asm.text[1].word, encode_sb(OPC_BRANCH, 0x1, 1, 0, -4));
    // beq at 0x8 forward to 0xc
    assert_eq!(asm.text[2].word, encode_sb(OPC_BRANCH, 0x0, 0, 0, 4));
}

#[test]
fn jal_offset_and_link_register() {
    let asm = assemble("jal x1, skip\nnop\nskip: nop\n");
    assert!(asm.errors.is_empty());
    assert_eq!(asm.text[0].word, encode_uj(OPC_JAL, 1, 8));
}

#[test]
fn jalr_uses_offset_register_form() {
    let asm = assemble("jalr x1, 4(x5)\n");
    assert!(asm.errors.is_empty());
    assert_eq!(asm.text[0].word, encode_i(OPC_JALR, 0x0, 1, 5, 4));
}

#[test]
fn u_type_takes_raw_field() {
    let asm = assemble("lui x1, 0x12345\nauipc x2, 0x1\n");
    assert!(asm.errors.is_empty());
    assert_eq!(asm.text[0].word, 0x1234_50B7);
    assert_eq!(asm.text[1].word, encode_u(OPC_AUIPC, 2, 1));
}

#[test]
fn abi_register_names_are_accepted() {
    let a = assemble("addi sp, sp, -16\nadd a0, a1, t0\n");
    let b = assemble("addi x2, x2, -16\nadd x10, x11, x5\n");
    assert!(a.errors.is_empty());
    assert_eq!(a.text[0].word, b.text[0].word);
    assert_eq!(a.text[1].word, b.text[1].word);
}

#[test]
fn pseudo_instructions_expand_to_one_word() {
    let asm = assemble("nop\nmv x1, x2\nli x3, 42\nj fin\njr x1\nret\nfin: nop\n");
    assert!(asm.errors.is_empty(), "{:?}", asm.errors);
    assert_eq!(asm.text[0].word, encode_i(OPC_OPIMM, 0x0, 0, 0, 0));
    assert_eq!(asm.text[1].word, encode_i(OPC_OPIMM, 0x0, 1, 2, 0));
    assert_eq!(asm.text[2].word, encode_i(OPC_OPIMM, 0x0, 3, 0, 42));
    assert_eq!(asm.text[3].word, encode_uj(OPC_JAL, 0, 12));
    assert_eq!(asm.text[4].word, encode_i(OPC_JALR, 0x0, 0, 1, 0));
    assert_eq!(asm.text[5].word, encode_i(OPC_JALR, 0x0, 0, 1, 0));
}

#[test]
fn unknown_mnemonic_emits_zero_and_continues() {
    let asm = assemble("frobnicate x1, x2\naddi x1, x0, 5\n");
    assert_eq!(asm.errors.len(), 1);
    assert!(asm.errors[0].msg.contains("unknown instruction"));
    assert_eq!(asm.text.len(), 2);
    assert_eq!(asm.text[0].word, 0);
    assert_eq!(asm.text[1].word, encode_i(OPC_OPIMM, 0x0, 1, 0, 5));
    assert_eq!(asm.text[1].addr, 4);
}

#[test]
fn operand_count_and_register_errors() {
    let asm = assemble("add x1, x2\naddi x1, q7, 5\n");
    assert_eq!(asm.errors.len(), 2);
    assert!(asm.errors[0].msg.contains("expected"));
    assert!(asm.errors[1].msg.contains("invalid register"));
}

#[test]
fn malformed_memory_operand_errors() {
    let asm = assemble("lw x1, 8x2)\nsw x1, 8(x2\n");
    assert_eq!(asm.errors.len(), 2);
    assert!(asm.errors[0].msg.contains("malformed memory operand"));
    assert!(asm.errors[1].msg.contains("missing ')'"));
}

#[test]
fn undefined_branch_label_errors() {
    let asm = assemble("beq x0, x0, nowhere\n");
    assert_eq!(asm.errors.len(), 1);
    assert!(asm.errors[0].msg.contains("undefined label"));
    assert_eq!(asm.text[0].word, 0);
}

#[test]
fn listing_format() {
    let asm = assemble("addi x1, x0, 5\n.data\n.byte 0xAB\n");
    let listing = listing_to_string(&asm);
    let mut lines = listing.lines();
    let first = lines.next().unwrap();
    assert!(first.starts_with("0x0 0x00500093 , addi x1,x0,5 # "), "got: {first}");
    assert_eq!(lines.next().unwrap(), "0x4 <END_OF_TEXT>");
    assert_eq!(lines.next().unwrap(), "");
    assert_eq!(lines.next().unwrap(), "0x10000000 0xab");
}

#[test]
fn listing_word_column_is_uppercase_padded() {
    let asm = assemble("lui x1, 0x12345\n");
    let listing = listing_to_string(&asm);
    assert!(listing.starts_with("0x0 0x123450B7 , "), "got: {listing}");
}

#[test]
fn bit_breakdown_column_shape() {
    let asm = assemble("add x3, x1, x2\n");
    // opcode-funct3-funct7-rd-rs1-rs2-NULL
    assert_eq!(asm.text[0].comment, "0110011-000-0000000-00011-00001-00010-NULL");
}
