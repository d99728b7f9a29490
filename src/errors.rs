// errors.rs - Compilation error taxonomy and diagnostics

use std::fmt;

// ============================================================================
// ERROR KINDS
// ============================================================================

/// Every way a compilation can fail. The `code()` projection is a stable
/// ABI: 0 means success, each kind maps to a fixed negative integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    // Lexical
    UnknownToken,
    InvalidInteger,
    UnterminatedComment,

    // Resources
    OutOfMemory,
    BufferTooSmall,
    ControlDepthExceeded,
    LeaveDepthExceeded,
    DictionaryFull,

    // IF / THEN
    ElseWithoutIf,
    DuplicateElse,
    ThenWithoutIf,
    UnclosedIf,

    // BEGIN loops
    UntilWithoutBegin,
    WhileWithoutBegin,
    DuplicateWhile,
    RepeatWithoutBegin,
    RepeatWithoutWhile,
    UntilAfterWhile,
    AgainWithoutBegin,
    AgainAfterWhile,
    UnclosedBegin,

    // DO loops
    LoopWithoutDo,
    PLoopWithoutDo,
    LeaveWithoutDo,
    UnclosedDo,

    // Definitions
    NestedColon,
    ColonWithoutName,
    SemicolonWithoutColon,
    DuplicateWord,
    UnclosedColon,
    ConstantWithoutValue,
    ConstantWithoutName,
    VariableWithoutName,

    // Locals
    MissingLocalIdx,
    InvalidLocalIdx,

    // Reserved slots, kept for ABI stability; never produced.
    EmptyInput,
    MissingSysId,
    InvalidSysId,
}

impl ErrorKind {
    /// Stable numeric error code. 0 is success; these are all negative.
    pub fn code(self) -> i32 {
        use ErrorKind::*;
        match self {
            UnknownToken => -1,
            InvalidInteger => -2,
            OutOfMemory => -3,
            BufferTooSmall => -4,
            EmptyInput => -5,
            ControlDepthExceeded => -6,
            ElseWithoutIf => -7,
            DuplicateElse => -8,
            ThenWithoutIf => -9,
            UnclosedIf => -10,
            UntilWithoutBegin => -11,
            UnclosedBegin => -12,
            WhileWithoutBegin => -13,
            DuplicateWhile => -14,
            RepeatWithoutBegin => -15,
            RepeatWithoutWhile => -16,
            UntilAfterWhile => -17,
            AgainWithoutBegin => -18,
            AgainAfterWhile => -19,
            LoopWithoutDo => -20,
            PLoopWithoutDo => -21,
            UnclosedDo => -22,
            LeaveWithoutDo => -23,
            LeaveDepthExceeded => -24,
            NestedColon => -25,
            ColonWithoutName => -26,
            SemicolonWithoutColon => -27,
            DuplicateWord => -28,
            UnclosedColon => -29,
            DictionaryFull => -30,
            MissingSysId => -31,
            InvalidSysId => -32,
            MissingLocalIdx => -33,
            InvalidLocalIdx => -34,
            UnterminatedComment => -35,
            ConstantWithoutValue => -36,
            ConstantWithoutName => -37,
            VariableWithoutName => -38,
        }
    }

    /// Stable human-readable message for this kind.
    pub fn message(self) -> &'static str {
        use ErrorKind::*;
        match self {
            UnknownToken => "unknown token",
            InvalidInteger => "invalid integer format",
            OutOfMemory => "out of memory",
            BufferTooSmall => "buffer too small",
            EmptyInput => "empty input",
            ControlDepthExceeded => "control structure nesting too deep",
            ElseWithoutIf => "ELSE without matching IF",
            DuplicateElse => "duplicate ELSE in IF structure",
            ThenWithoutIf => "THEN without matching IF",
            UnclosedIf => "unclosed IF structure",
            UntilWithoutBegin => "UNTIL without matching BEGIN",
            UnclosedBegin => "unclosed BEGIN structure",
            WhileWithoutBegin => "WHILE without matching BEGIN",
            DuplicateWhile => "duplicate WHILE in BEGIN structure",
            RepeatWithoutBegin => "REPEAT without matching BEGIN",
            RepeatWithoutWhile => "REPEAT without matching WHILE",
            UntilAfterWhile => "UNTIL after WHILE (use REPEAT)",
            AgainWithoutBegin => "AGAIN without matching BEGIN",
            AgainAfterWhile => "AGAIN after WHILE (use REPEAT)",
            LoopWithoutDo => "LOOP without matching DO",
            PLoopWithoutDo => "+LOOP without matching DO",
            UnclosedDo => "unclosed DO structure",
            LeaveWithoutDo => "LEAVE outside DO loop",
            LeaveDepthExceeded => "too many LEAVEs in one DO loop",
            NestedColon => "nested colon definition",
            ColonWithoutName => "colon definition without name",
            SemicolonWithoutColon => "semicolon without colon definition",
            DuplicateWord => "duplicate word name",
            UnclosedColon => "unclosed colon definition",
            DictionaryFull => "dictionary full",
            MissingSysId => "SYS without id",
            InvalidSysId => "invalid SYS id",
            MissingLocalIdx => "local op without index",
            InvalidLocalIdx => "invalid local index",
            UnterminatedComment => "unterminated comment",
            ConstantWithoutValue => "CONSTANT without preceding value",
            ConstantWithoutName => "CONSTANT without name",
            VariableWithoutName => "VARIABLE without name",
        }
    }

    /// Map a numeric error code back to its kind.
    pub fn from_code(code: i32) -> Option<ErrorKind> {
        use ErrorKind::*;
        Some(match code {
            -1 => UnknownToken,
            -2 => InvalidInteger,
            -3 => OutOfMemory,
            -4 => BufferTooSmall,
            -5 => EmptyInput,
            -6 => ControlDepthExceeded,
            -7 => ElseWithoutIf,
            -8 => DuplicateElse,
            -9 => ThenWithoutIf,
            -10 => UnclosedIf,
            -11 => UntilWithoutBegin,
            -12 => UnclosedBegin,
            -13 => WhileWithoutBegin,
            -14 => DuplicateWhile,
            -15 => RepeatWithoutBegin,
            -16 => RepeatWithoutWhile,
            -17 => UntilAfterWhile,
            -18 => AgainWithoutBegin,
            -19 => AgainAfterWhile,
            -20 => LoopWithoutDo,
            -21 => PLoopWithoutDo,
            -22 => UnclosedDo,
            -23 => LeaveWithoutDo,
            -24 => LeaveDepthExceeded,
            -25 => NestedColon,
            -26 => ColonWithoutName,
            -27 => SemicolonWithoutColon,
            -28 => DuplicateWord,
            -29 => UnclosedColon,
            -30 => DictionaryFull,
            -31 => MissingSysId,
            -32 => InvalidSysId,
            -33 => MissingLocalIdx,
            -34 => InvalidLocalIdx,
            -35 => UnterminatedComment,
            -36 => ConstantWithoutValue,
            -37 => ConstantWithoutName,
            -38 => VariableWithoutName,
            _ => return None,
        })
    }
}

/// Message string for any error code, success included. Unassigned codes
/// yield "unknown error".
pub fn error_message(code: i32) -> &'static str {
    if code == 0 {
        return "ok";
    }
    match ErrorKind::from_code(code) {
        Some(kind) => kind.message(),
        None => "unknown error",
    }
}

// ============================================================================
// COMPILE ERROR WITH SOURCE DIAGNOSTICS
// ============================================================================

/// A compilation failure with enough source location information to
/// render a useful diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileError {
    pub kind: ErrorKind,
    /// Byte offset of the offending token; source length for errors
    /// reported at end of input.
    pub position: usize,
    /// 1-based line number.
    pub line: u32,
    /// 1-based byte column within the line.
    pub column: u32,
    /// Offending token text; empty for end-of-input errors.
    pub token: String,
    /// Full source line containing the error.
    pub context: String,
}

impl CompileError {
    /// Build an error for a token at a byte offset, deriving line,
    /// column and context line from the source.
    pub fn at(kind: ErrorKind, source: &str, position: usize, token: &str) -> CompileError {
        let bytes = source.as_bytes();
        let pos = position.min(bytes.len());

        let line_start = bytes[..pos]
            .iter()
            .rposition(|&b| b == b'\n')
            .map(|i| i + 1)
            .unwrap_or(0);
        let line_end = bytes[pos..]
            .iter()
            .position(|&b| b == b'\n')
            .map(|i| pos + i)
            .unwrap_or(bytes.len());
        let line = bytes[..pos].iter().filter(|&&b| b == b'\n').count() as u32 + 1;

        CompileError {
            kind,
            position,
            line,
            column: (pos - line_start) as u32 + 1,
            token: token.to_string(),
            context: String::from_utf8_lossy(&bytes[line_start..line_end]).into_owned(),
        }
    }

    /// Build an error reported at end of input.
    pub fn at_end(kind: ErrorKind, source: &str) -> CompileError {
        CompileError::at(kind, source, source.len(), "")
    }

    /// Stable numeric error code.
    pub fn code(&self) -> i32 {
        self.kind.code()
    }

    /// Stable message string.
    pub fn message(&self) -> &'static str {
        self.kind.message()
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Error: {} (line {}, column {})",
            self.kind.message(),
            self.line,
            self.column
        )?;
        if !self.context.is_empty() {
            write!(f, "\n  {}", self.context)?;
            let caret = " ".repeat(self.column.saturating_sub(1) as usize);
            write!(f, "\n  {}^", caret)?;
        }
        Ok(())
    }
}

impl std::error::Error for CompileError {}
