// disasm.rs - V4 bytecode disassembler
//
// A pure function over the output encoding: one line per instruction,
// driven by the opcode-immediate table. Never panics on malformed
// input; truncated immediates consume the rest of the buffer.

use crate::opcodes::{ImmKind, Op};

fn read_i16(code: &[u8], off: usize) -> Option<i16> {
    if off + 2 > code.len() {
        return None;
    }
    Some(i16::from_le_bytes([code[off], code[off + 1]]))
}

fn read_i32(code: &[u8], off: usize) -> Option<i32> {
    if off + 4 > code.len() {
        return None;
    }
    Some(i32::from_le_bytes([
        code[off],
        code[off + 1],
        code[off + 2],
        code[off + 3],
    ]))
}

/// Disassemble the instruction at `pc`. Returns the rendered line and
/// the number of bytes consumed, or `None` when `pc` is past the end.
pub fn disasm_one(code: &[u8], pc: usize) -> Option<(String, usize)> {
    if pc >= code.len() {
        return None;
    }

    let byte = code[pc];
    let (mnemonic, imm) = match Op::from_u8(byte) {
        Some(op) => (op.mnemonic(), op.imm_kind()),
        None => ("???", ImmKind::None),
    };

    let mut line = format!("{:04x}: {:<8}", pc, mnemonic);
    let mut consumed = 1;

    match imm {
        ImmKind::None => {}
        ImmKind::I8 => {
            if pc + 1 < code.len() {
                line.push_str(&format!(" {}", code[pc + 1] as i8));
                consumed += 1;
            } else {
                line.push_str(" <trunc-i8>");
                consumed = code.len() - pc;
            }
        }
        ImmKind::I16 => match read_i16(code, pc + 1) {
            Some(v) => {
                line.push_str(&format!(" {}", v));
                consumed += 2;
            }
            None => {
                line.push_str(" <trunc-i16>");
                consumed = code.len() - pc;
            }
        },
        ImmKind::I32 => match read_i32(code, pc + 1) {
            Some(v) => {
                line.push_str(&format!(" {}", v));
                consumed += 4;
            }
            None => {
                line.push_str(" <trunc-i32>");
                consumed = code.len() - pc;
            }
        },
        ImmKind::Rel16 => match read_i16(code, pc + 1) {
            Some(offset) => {
                let target = (pc as i64 + 3 + offset as i64) as usize;
                let sign = if offset >= 0 { "+" } else { "" };
                line.push_str(&format!(" {}{} ; -> {:04x}", sign, offset, target));
                consumed += 2;
            }
            None => {
                line.push_str(" <trunc-rel16>");
                consumed = code.len() - pc;
            }
        },
        ImmKind::Idx16 => match read_i16(code, pc + 1) {
            Some(idx) => {
                line.push_str(&format!(" @{}", idx as u16));
                consumed += 2;
            }
            None => {
                line.push_str(" <trunc-idx16>");
                consumed = code.len() - pc;
            }
        },
    }

    Some((line, consumed))
}

/// Disassemble a whole buffer into lines.
pub fn disasm_all(code: &[u8]) -> Vec<String> {
    let mut lines = Vec::new();
    let mut pc = 0;
    while let Some((line, consumed)) = disasm_one(code, pc) {
        lines.push(line);
        if consumed == 0 {
            break;
        }
        pc += consumed;
    }
    lines
}
