//! Lexical helpers shared by both assembler passes.

/// Cut the line at the first `#`.
pub(crate) fn strip_comment(line: &str) -> &str {
    line.split('#').next().unwrap_or("")
}

/// Split on whitespace and commas, dropping empty pieces.
pub(crate) fn split_tokens(line: &str) -> Vec<String> {
    line.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// `x0`..`x31`, or one of the standard ABI names.
pub(crate) fn parse_reg(token: &str) -> Option<u32> {
    let t = token.trim().to_lowercase();
    if let Some(rest) = t.strip_prefix('x') {
        if let Ok(n) = rest.parse::<u32>() {
            return (n < 32).then_some(n);
        }
    }
    let n = match t.as_str() {
        "zero" => 0,
        "ra" => 1,
        "sp" => 2,
        "gp" => 3,
        "tp" => 4,
        "t0" => 5,
        "t1" => 6,
        "t2" => 7,
        "s0" | "fp" => 8,
        "s1" => 9,
        "a0" => 10,
        "a1" => 11,
        "a2" => 12,
        "a3" => 13,
        "a4" => 14,
        "a5" => 15,
        "a6" => 16,
        "a7" => 17,
        "s2" => 18,
        "s3" => 19,
        "s4" => 20,
        "s5" => 21,
        "s6" => 22,
        "s7" => 23,
        "s8" => 24,
        "s9" => 25,
        "s10" => 26,
        "s11" => 27,
        "t3" => 28,
        "t4" => 29,
        "t5" => 30,
        "t6" => 31,
        _ => return None,
    };
    Some(n)
}

/// Decimal or `0x`/`0X` hex, optionally negative. Full-range unsigned hex
/// words (`0xDEADBEEF`) wrap to the i32 bit pattern.
pub(crate) fn parse_imm(token: &str) -> Option<i32> {
    parse_imm64(token).map(|v| v as i32)
}

pub(crate) fn parse_imm64(token: &str) -> Option<i64> {
    let t = token.trim();
    let (negative, t) = match t.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, t),
    };
    let magnitude = if let Some(hex) = t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16).ok()? as i64
    } else {
        t.parse::<u64>().ok()? as i64
    };
    Some(if negative { magnitude.wrapping_neg() } else { magnitude })
}

/// Split an `imm(reg)` memory operand into its two raw pieces; the
/// immediate part may still be a label.
pub(crate) fn split_memop(op: &str) -> Result<(&str, &str), String> {
    let (imm, rest) = op
        .split_once('(')
        .ok_or_else(|| format!("malformed memory operand: {op}"))?;
    let reg = rest
        .strip_suffix(')')
        .ok_or_else(|| format!("missing ')' in memory operand: {op}"))?;
    Ok((imm.trim(), reg.trim()))
}

/// One double-quoted string literal, for `.asciz`.
pub(crate) fn parse_str_lit(raw: &str) -> Option<String> {
    let s = raw.trim();
    if s.len() >= 2 && s.starts_with('"') && s.ends_with('"') {
        Some(s[1..s.len() - 1].to_string())
    } else {
        None
    }
}

/// MSB-first binary rendering for the listing's bit-breakdown column.
pub(crate) fn to_binary(value: u32, width: u32) -> String {
    (0..width)
        .rev()
        .map(|i| if (value >> i) & 1 == 1 { '1' } else { '0' })
        .collect()
}
