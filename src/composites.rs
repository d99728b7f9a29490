// composites.rs - Composite word expansions
//
// A composite word is a source-level name that expands to a fixed
// sequence of primitive opcodes at compile time; nothing is stored in
// the dictionary. Branch offsets inside a body are relative, so the
// sequences can be spliced anywhere in a stream. Adding a composite is
// a one-row change.

use crate::opcodes::Op;

pub struct Composite {
    pub name: &'static str,
    pub code: &'static [u8],
}

const LIT: u8 = Op::Lit as u8;
const LIT0: u8 = Op::Lit0 as u8;
const ADD: u8 = Op::Add as u8;
const SUB: u8 = Op::Sub as u8;
const LT: u8 = Op::Lt as u8;
const GT: u8 = Op::Gt as u8;
const DUP: u8 = Op::Dup as u8;
const DROP: u8 = Op::Drop as u8;
const SWAP: u8 = Op::Swap as u8;
const OVER: u8 = Op::Over as u8;
const JMP: u8 = Op::Jmp as u8;
const JZ: u8 = Op::Jz as u8;
const SYS: u8 = Op::Sys as u8;
const TOR: u8 = Op::Tor as u8;
const FROMR: u8 = Op::Fromr as u8;
const RFETCH: u8 = Op::Rfetch as u8;
const LOAD: u8 = Op::Load as u8;
const STORE: u8 = Op::Store as u8;

/// SYS ids of the console composites.
pub const SYS_EMIT: u8 = 0x30;
pub const SYS_KEY: u8 = 0x31;

pub const COMPOSITES: &[Composite] = &[
    // ( a b c -- b c a )
    Composite {
        name: "ROT",
        code: &[TOR, SWAP, FROMR, SWAP],
    },
    // ( a b -- b )
    Composite {
        name: "NIP",
        code: &[SWAP, DROP],
    },
    // ( a b -- b a b )
    Composite {
        name: "TUCK",
        code: &[SWAP, OVER],
    },
    // ( a b -- a b a b )
    Composite {
        name: "2DUP",
        code: &[OVER, OVER],
    },
    // ( a b -- )
    Composite {
        name: "2DROP",
        code: &[DROP, DROP],
    },
    // ( n -- n+1 )
    Composite {
        name: "1+",
        code: &[LIT, 0x01, 0x00, 0x00, 0x00, ADD],
    },
    // ( n -- n-1 )
    Composite {
        name: "1-",
        code: &[LIT, 0x01, 0x00, 0x00, 0x00, SUB],
    },
    // ( n -- -n )
    Composite {
        name: "NEGATE",
        code: &[LIT0, SWAP, SUB],
    },
    // ( n -- |n| ): negate only when n < 0
    Composite {
        name: "ABS",
        code: &[DUP, LIT0, LT, JZ, 0x03, 0x00, LIT0, SWAP, SUB],
    },
    // ( x -- 0 | x x ): duplicate only when nonzero
    Composite {
        name: "?DUP",
        code: &[DUP, DUP, JZ, 0x01, 0x00, DUP, SWAP, DROP],
    },
    // ( a b -- min )
    Composite {
        name: "MIN",
        code: &[OVER, OVER, LT, JZ, 0x04, 0x00, DROP, JMP, 0x02, 0x00, SWAP, DROP],
    },
    // ( a b -- max )
    Composite {
        name: "MAX",
        code: &[OVER, OVER, GT, JZ, 0x04, 0x00, DROP, JMP, 0x02, 0x00, SWAP, DROP],
    },
    // ( n addr -- ): add n to the cell at addr
    Composite {
        name: "+!",
        code: &[SWAP, OVER, LOAD, ADD, SWAP, STORE],
    },
    // ( ch -- ): console output via SYS
    Composite {
        name: "EMIT",
        code: &[LIT, SYS_EMIT, 0x00, 0x00, 0x00, SYS],
    },
    // ( -- ch ): console input via SYS
    Composite {
        name: "KEY",
        code: &[LIT, SYS_KEY, 0x00, 0x00, 0x00, SYS],
    },
    // Innermost loop index: the return-stack top.
    Composite {
        name: "I",
        code: &[RFETCH],
    },
    // Second loop index: duplicate the third return-stack entry and put
    // the stack back the way it was.
    Composite {
        name: "J",
        code: &[FROMR, FROMR, FROMR, DUP, TOR, SWAP, TOR, SWAP, TOR],
    },
    // Third loop index: same dance, five deep.
    Composite {
        name: "K",
        code: &[
            FROMR, FROMR, FROMR, FROMR, FROMR, DUP, TOR, SWAP, TOR, SWAP, TOR, SWAP, TOR, SWAP,
            TOR,
        ],
    },
];

/// Case-insensitive composite lookup.
pub fn lookup_composite(token: &str) -> Option<&'static [u8]> {
    COMPOSITES
        .iter()
        .find(|c| token.eq_ignore_ascii_case(c.name))
        .map(|c| c.code)
}
