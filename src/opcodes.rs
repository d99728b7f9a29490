// opcodes.rs - V4 VM instruction set

// ============================================================================
// IMMEDIATE OPERAND KINDS
// ============================================================================

/// Kind of immediate operand following an opcode in the byte stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImmKind {
    /// No immediate.
    None,
    /// Signed 8-bit value.
    I8,
    /// Signed 16-bit little-endian value.
    I16,
    /// Signed 32-bit little-endian value.
    I32,
    /// Signed 16-bit little-endian branch offset, relative to the byte
    /// following the offset field: target = offset_pos + 2 + offset.
    Rel16,
    /// Unsigned 16-bit little-endian word index.
    Idx16,
}

impl ImmKind {
    /// Number of immediate bytes following the opcode.
    pub fn len(self) -> usize {
        match self {
            ImmKind::None => 0,
            ImmKind::I8 => 1,
            ImmKind::I16 | ImmKind::Rel16 | ImmKind::Idx16 => 2,
            ImmKind::I32 => 4,
        }
    }
}

// ============================================================================
// OPCODES
// ============================================================================

/// V4 VM opcode. Byte values are part of the ABI and must not change.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    // Literals
    Lit = 0x00,
    Lit0 = 0x01,

    // Arithmetic
    Add = 0x10,
    Sub = 0x11,
    Mul = 0x12,
    Div = 0x13,
    Mod = 0x14,

    // Comparison
    Eq = 0x20,
    Ne = 0x21,
    Lt = 0x22,
    Le = 0x23,
    Gt = 0x24,
    Ge = 0x25,

    // Bitwise
    And = 0x30,
    Or = 0x31,
    Xor = 0x32,
    Invert = 0x33,

    // Stack
    Dup = 0x40,
    Drop = 0x41,
    Swap = 0x42,
    Over = 0x43,

    // Control transfer
    Call = 0x50,
    Ret = 0x51,
    Jmp = 0x52,
    Jz = 0x53,
    Jnz = 0x54,

    // System call (id supplied on the data stack)
    Sys = 0x60,

    // Return stack
    Tor = 0x70,
    Fromr = 0x71,
    Rfetch = 0x72,

    // Memory
    Load = 0x77,
    Store = 0x78,

    // Local variable slots
    Lget = 0x79,
    Lset = 0x7A,
    Ltee = 0x7B,
    Lget0 = 0x7C,
    Lget1 = 0x7D,
    Lset0 = 0x7E,
    Lset1 = 0x7F,
    Linc = 0x80,
    Ldec = 0x81,

    // Cooperative tasks
    TaskSpawn = 0x90,
    TaskExit = 0x91,
    TaskSleep = 0x92,
    TaskYield = 0x93,
    CriticalEnter = 0x94,
    CriticalExit = 0x95,
    TaskSend = 0x96,
    TaskReceive = 0x97,
    TaskReceiveBlocking = 0x98,
    TaskSelf = 0x99,
    TaskCount = 0x9A,
}

impl Op {
    /// Decode a byte back into an opcode. Returns `None` for bytes that
    /// are not part of the instruction set.
    pub fn from_u8(byte: u8) -> Option<Op> {
        use Op::*;
        Some(match byte {
            0x00 => Lit,
            0x01 => Lit0,
            0x10 => Add,
            0x11 => Sub,
            0x12 => Mul,
            0x13 => Div,
            0x14 => Mod,
            0x20 => Eq,
            0x21 => Ne,
            0x22 => Lt,
            0x23 => Le,
            0x24 => Gt,
            0x25 => Ge,
            0x30 => And,
            0x31 => Or,
            0x32 => Xor,
            0x33 => Invert,
            0x40 => Dup,
            0x41 => Drop,
            0x42 => Swap,
            0x43 => Over,
            0x50 => Call,
            0x51 => Ret,
            0x52 => Jmp,
            0x53 => Jz,
            0x54 => Jnz,
            0x60 => Sys,
            0x70 => Tor,
            0x71 => Fromr,
            0x72 => Rfetch,
            0x77 => Load,
            0x78 => Store,
            0x79 => Lget,
            0x7A => Lset,
            0x7B => Ltee,
            0x7C => Lget0,
            0x7D => Lget1,
            0x7E => Lset0,
            0x7F => Lset1,
            0x80 => Linc,
            0x81 => Ldec,
            0x90 => TaskSpawn,
            0x91 => TaskExit,
            0x92 => TaskSleep,
            0x93 => TaskYield,
            0x94 => CriticalEnter,
            0x95 => CriticalExit,
            0x96 => TaskSend,
            0x97 => TaskReceive,
            0x98 => TaskReceiveBlocking,
            0x99 => TaskSelf,
            0x9A => TaskCount,
            _ => return None,
        })
    }

    /// Disassembler mnemonic.
    pub fn mnemonic(self) -> &'static str {
        use Op::*;
        match self {
            Lit => "LIT",
            Lit0 => "LIT0",
            Add => "ADD",
            Sub => "SUB",
            Mul => "MUL",
            Div => "DIV",
            Mod => "MOD",
            Eq => "EQ",
            Ne => "NE",
            Lt => "LT",
            Le => "LE",
            Gt => "GT",
            Ge => "GE",
            And => "AND",
            Or => "OR",
            Xor => "XOR",
            Invert => "INVERT",
            Dup => "DUP",
            Drop => "DROP",
            Swap => "SWAP",
            Over => "OVER",
            Call => "CALL",
            Ret => "RET",
            Jmp => "JMP",
            Jz => "JZ",
            Jnz => "JNZ",
            Sys => "SYS",
            Tor => "TOR",
            Fromr => "FROMR",
            Rfetch => "RFETCH",
            Load => "LOAD",
            Store => "STORE",
            Lget => "LGET",
            Lset => "LSET",
            Ltee => "LTEE",
            Lget0 => "LGET0",
            Lget1 => "LGET1",
            Lset0 => "LSET0",
            Lset1 => "LSET1",
            Linc => "LINC",
            Ldec => "LDEC",
            TaskSpawn => "TASK_SPAWN",
            TaskExit => "TASK_EXIT",
            TaskSleep => "TASK_SLEEP",
            TaskYield => "TASK_YIELD",
            CriticalEnter => "CRITICAL_ENTER",
            CriticalExit => "CRITICAL_EXIT",
            TaskSend => "TASK_SEND",
            TaskReceive => "TASK_RECEIVE",
            TaskReceiveBlocking => "TASK_RECEIVE_BLOCKING",
            TaskSelf => "TASK_SELF",
            TaskCount => "TASK_COUNT",
        }
    }

    /// Immediate operand kind for this opcode.
    pub fn imm_kind(self) -> ImmKind {
        use Op::*;
        match self {
            Lit => ImmKind::I32,
            Call => ImmKind::Idx16,
            Jmp | Jz | Jnz => ImmKind::Rel16,
            Lget | Lset | Ltee | Linc | Ldec => ImmKind::I8,
            _ => ImmKind::None,
        }
    }
}

// ============================================================================
// SOURCE-LEVEL PRIMITIVE TABLES
// ============================================================================

/// Named primitives, matched case-insensitively against source tokens.
pub const NAMED_PRIMITIVES: &[(&str, Op)] = &[
    ("DUP", Op::Dup),
    ("DROP", Op::Drop),
    ("SWAP", Op::Swap),
    ("OVER", Op::Over),
    ("MOD", Op::Mod),
    ("AND", Op::And),
    ("OR", Op::Or),
    ("XOR", Op::Xor),
    ("INVERT", Op::Invert),
    ("SYS", Op::Sys),
    (">R", Op::Tor),
    ("R>", Op::Fromr),
    ("R@", Op::Rfetch),
    ("L@0", Op::Lget0),
    ("L@1", Op::Lget1),
    ("L!0", Op::Lset0),
    ("L!1", Op::Lset1),
    ("SPAWN", Op::TaskSpawn),
    ("TASK-EXIT", Op::TaskExit),
    ("SLEEP", Op::TaskSleep),
    ("MS", Op::TaskSleep),
    ("YIELD", Op::TaskYield),
    ("PAUSE", Op::TaskYield),
    ("CRITICAL", Op::CriticalEnter),
    ("UNCRITICAL", Op::CriticalExit),
    ("SEND", Op::TaskSend),
    ("RECEIVE", Op::TaskReceive),
    ("RECEIVE-BLOCKING", Op::TaskReceiveBlocking),
    ("ME", Op::TaskSelf),
    ("TASKS", Op::TaskCount),
];

/// Symbolic operators, matched exactly.
pub const SYMBOLIC_PRIMITIVES: &[(&str, Op)] = &[
    ("+", Op::Add),
    ("-", Op::Sub),
    ("*", Op::Mul),
    ("/", Op::Div),
    ("=", Op::Eq),
    ("==", Op::Eq),
    ("<>", Op::Ne),
    ("!=", Op::Ne),
    ("<", Op::Lt),
    ("<=", Op::Le),
    (">", Op::Gt),
    (">=", Op::Ge),
    ("@", Op::Load),
    ("!", Op::Store),
];

/// Look up a primitive for a source token: symbol map first, then the
/// named table under ASCII case folding.
pub fn lookup_primitive(token: &str) -> Option<Op> {
    for &(symbol, op) in SYMBOLIC_PRIMITIVES {
        if token == symbol {
            return Some(op);
        }
    }
    for &(name, op) in NAMED_PRIMITIVES {
        if token.eq_ignore_ascii_case(name) {
            return Some(op);
        }
    }
    None
}
