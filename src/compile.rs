// compile.rs - Single-pass compiler: dispatcher, control flow, definitions
//
// One streaming pass over the source: each token is classified and
// either emits bytecode, opens or closes a control structure, or
// creates a dictionary entry. Branch placeholders are backpatched in
// place; patch sites are byte indices, never pointers.

use crate::composites::lookup_composite;
use crate::dict::{clamp_name, find_word, WordEntry, WordKind, DATA_CELL_SIZE, DATA_SPACE_BASE,
                  MAX_DICT_ENTRIES};
use crate::emitter::CodeBuffer;
use crate::errors::{CompileError, ErrorKind};
use crate::lexer::{parse_int, IntParse, Token, Tokenizer};
use crate::opcodes::{lookup_primitive, Op};

/// Maximum nesting of open IF/BEGIN/DO structures.
pub const MAX_CONTROL_DEPTH: usize = 32;

/// Maximum LEAVE sites per DO loop.
pub const MAX_LEAVE_SITES: usize = 8;

// ============================================================================
// OUTPUT HANDLE
// ============================================================================

/// The result of a successful compilation. Owns the main byte stream
/// and every word entry; dropping it releases everything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledProgram {
    pub main: Vec<u8>,
    pub words: Vec<WordEntry>,
}

impl CompiledProgram {
    pub fn word_count(&self) -> usize {
        self.words.len()
    }
}

/// Knobs that rarely move. `data_space_base` is where VARIABLE storage
/// starts in VM data space.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    pub data_space_base: u32,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            data_space_base: DATA_SPACE_BASE,
        }
    }
}

// ============================================================================
// COMPILATION CONTEXT
// ============================================================================

/// Optional cross-call state for incremental compilation. Holds the
/// names and call indices of words compiled earlier; the compiler only
/// reads it, the caller registers new words after each call.
#[derive(Debug, Default, Clone)]
pub struct Context {
    words: Vec<(String, u16)>,
}

impl Context {
    pub fn new() -> Self {
        Context { words: Vec::new() }
    }

    pub fn reset(&mut self) {
        self.words.clear();
    }

    /// Register a word, or update its index if the name (compared
    /// case-insensitively) is already present.
    pub fn register_word(&mut self, name: &str, index: u16) {
        for entry in &mut self.words {
            if entry.0.eq_ignore_ascii_case(name) {
                entry.1 = index;
                return;
            }
        }
        self.words.push((name.to_string(), index));
    }

    pub fn find_word(&self, name: &str) -> Option<u16> {
        self.words
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|&(_, idx)| idx)
    }

    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    pub fn word_name(&self, index: usize) -> Option<&str> {
        self.words.get(index).map(|(n, _)| n.as_str())
    }
}

// ============================================================================
// ENTRY POINTS
// ============================================================================

/// Compile whitespace-separated Forth source into V4 bytecode.
pub fn compile(source: &str) -> Result<CompiledProgram, CompileError> {
    compile_with_options(source, None, &CompileOptions::default())
}

/// Same as `compile`; `name` is reserved for future use.
pub fn compile_named(_name: &str, source: &str) -> Result<CompiledProgram, CompileError> {
    compile_with_options(source, None, &CompileOptions::default())
}

/// Compile against a context of previously defined words.
pub fn compile_with_context(ctx: &Context, source: &str) -> Result<CompiledProgram, CompileError> {
    compile_with_options(source, Some(ctx), &CompileOptions::default())
}

pub fn compile_with_options(
    source: &str,
    ctx: Option<&Context>,
    options: &CompileOptions,
) -> Result<CompiledProgram, CompileError> {
    Compiler::new(source, ctx, options).run()
}

// ============================================================================
// CONTROL FRAMES
// ============================================================================

enum ControlFrame {
    If {
        jz_patch: u32,
        jmp_patch: u32,
        has_else: bool,
    },
    Begin {
        begin_addr: u32,
        while_patch: u32,
        has_while: bool,
    },
    Do {
        do_addr: u32,
        leave_patches: Vec<u32>,
    },
}

impl ControlFrame {
    fn unclosed_error(&self) -> ErrorKind {
        match self {
            ControlFrame::If { .. } => ErrorKind::UnclosedIf,
            ControlFrame::Begin { .. } => ErrorKind::UnclosedBegin,
            ControlFrame::Do { .. } => ErrorKind::UnclosedDo,
        }
    }
}

/// A colon definition between `:` and `;`. Emission is redirected into
/// `buf` while one is open.
struct OpenDef {
    name: String,
    buf: CodeBuffer,
    recurse_patches: Vec<u32>,
    /// Control depth at `:`; frames below this belong to the enclosing
    /// stream and are off limits until the definition is sealed.
    base_depth: usize,
}

// ============================================================================
// COMPILER
// ============================================================================

struct Compiler<'a> {
    source: &'a str,
    ctx: Option<&'a Context>,
    data_base: u32,
    main: CodeBuffer,
    words: Vec<WordEntry>,
    def: Option<OpenDef>,
    control: Vec<ControlFrame>,
    var_count: u32,
    /// Value of the integer literal emitted by the previous token, if
    /// the literal is still the last instruction on the stream.
    last_literal: Option<i32>,
}

impl<'a> Compiler<'a> {
    fn new(source: &'a str, ctx: Option<&'a Context>, options: &CompileOptions) -> Self {
        Compiler {
            source,
            ctx,
            data_base: options.data_space_base,
            main: CodeBuffer::new(),
            words: Vec::new(),
            def: None,
            control: Vec::new(),
            var_count: 0,
            last_literal: None,
        }
    }

    fn run(mut self) -> Result<CompiledProgram, CompileError> {
        let mut tz = Tokenizer::new(self.source);
        while let Some(tok) = self.read_token(&mut tz)? {
            self.dispatch(tok, &mut tz)?;
        }
        self.finish()
    }

    // ------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------

    fn dispatch(&mut self, tok: Token<'a>, tz: &mut Tokenizer<'a>) -> Result<(), CompileError> {
        let text = tok.text;
        let had_literal = self.last_literal.take();

        // 1. Definition brackets
        if text == ":" {
            return self.begin_definition(tok, tz);
        }
        if text == ";" {
            return self.end_definition(tok);
        }

        // 2. Control flow
        if text.eq_ignore_ascii_case("IF") {
            return self.compile_if(tok);
        }
        if text.eq_ignore_ascii_case("ELSE") {
            return self.compile_else(tok);
        }
        if text.eq_ignore_ascii_case("THEN") {
            return self.compile_then(tok);
        }
        if text.eq_ignore_ascii_case("BEGIN") {
            return self.compile_begin(tok);
        }
        if text.eq_ignore_ascii_case("UNTIL") {
            return self.compile_until(tok);
        }
        if text.eq_ignore_ascii_case("WHILE") {
            return self.compile_while(tok);
        }
        if text.eq_ignore_ascii_case("REPEAT") {
            return self.compile_repeat(tok);
        }
        if text.eq_ignore_ascii_case("AGAIN") {
            return self.compile_again(tok);
        }
        if text.eq_ignore_ascii_case("DO") {
            return self.compile_do(tok);
        }
        if text.eq_ignore_ascii_case("LOOP") {
            return self.compile_loop(tok, false);
        }
        if text.eq_ignore_ascii_case("+LOOP") {
            return self.compile_loop(tok, true);
        }
        if text.eq_ignore_ascii_case("LEAVE") {
            return self.compile_leave(tok);
        }
        if text.eq_ignore_ascii_case("EXIT") {
            return self.emit_op_at(Op::Ret, tok);
        }
        if text.eq_ignore_ascii_case("RECURSE") {
            return self.compile_recurse(tok);
        }

        // 3. Defining words
        if text.eq_ignore_ascii_case("CONSTANT") {
            return self.compile_constant(tok, tz, had_literal);
        }
        if text.eq_ignore_ascii_case("VARIABLE") {
            return self.compile_variable(tok, tz);
        }

        // 4. Integer literal
        match parse_int(text) {
            IntParse::Value(value) => {
                self.emit_op_at(Op::Lit, tok)?;
                self.emit_i32_at(value, tok)?;
                self.last_literal = Some(value);
                return Ok(());
            }
            IntParse::Overflow => return Err(self.err(ErrorKind::InvalidInteger, tok)),
            IntParse::NotANumber => {}
        }

        // 5. Dictionary lookup
        if let Some(index) = self.lookup_word(text) {
            self.emit_op_at(Op::Call, tok)?;
            return self.emit_u16_at(index, tok);
        }

        // 6. Primitives (locals take a trailing index operand)
        if let Some(op) = local_prefix_op(text) {
            return self.compile_local(op, tok, tz);
        }
        if let Some(op) = lookup_primitive(text) {
            return self.emit_op_at(op, tok);
        }

        // 7. Composite expansion
        if let Some(code) = lookup_composite(text) {
            return self.emit_bytes_at(code, tok);
        }

        Err(self.err(ErrorKind::UnknownToken, tok))
    }

    fn finish(mut self) -> Result<CompiledProgram, CompileError> {
        if let Some(frame) = self.control.last() {
            return Err(CompileError::at_end(frame.unclosed_error(), self.source));
        }
        if self.def.is_some() {
            return Err(CompileError::at_end(ErrorKind::UnclosedColon, self.source));
        }

        // A trailing RET after AGAIN/REPEAT at end of input would be
        // unreachable; JMP is the only 3-byte unconditional transfer.
        let bytes = self.main.as_slice();
        let ends_in_jmp = bytes.len() >= 3 && bytes[bytes.len() - 3] == Op::Jmp as u8;
        if !ends_in_jmp {
            self.main
                .push_op(Op::Ret)
                .map_err(|kind| CompileError::at_end(kind, self.source))?;
        }

        Ok(CompiledProgram {
            main: self.main.into_bytes(),
            words: self.words,
        })
    }

    // ------------------------------------------------------------------
    // Definitions
    // ------------------------------------------------------------------

    fn begin_definition(
        &mut self,
        tok: Token<'a>,
        tz: &mut Tokenizer<'a>,
    ) -> Result<(), CompileError> {
        if self.def.is_some() {
            return Err(self.err(ErrorKind::NestedColon, tok));
        }

        let name_tok = match self.read_token(tz)? {
            Some(t) => t,
            None => return Err(self.err(ErrorKind::ColonWithoutName, tok)),
        };
        self.check_new_name(name_tok, tok)?;

        self.def = Some(OpenDef {
            name: clamp_name(name_tok.text),
            buf: CodeBuffer::new(),
            recurse_patches: Vec::new(),
            base_depth: self.control.len(),
        });
        Ok(())
    }

    fn end_definition(&mut self, tok: Token<'a>) -> Result<(), CompileError> {
        let mut def = match self.def.take() {
            Some(d) => d,
            None => return Err(self.err(ErrorKind::SemicolonWithoutColon, tok)),
        };

        if let Some(frame) = self.control.last() {
            if self.control.len() > def.base_depth {
                return Err(self.err(frame.unclosed_error(), tok));
            }
        }

        def.buf
            .push_op(Op::Ret)
            .map_err(|kind| self.err(kind, tok))?;

        let index = self.ctx_len() + self.words.len() as u16;
        for pos in &def.recurse_patches {
            def.buf.patch_u16_le(*pos, index);
        }

        self.words.push(WordEntry {
            name: def.name,
            kind: WordKind::Word,
            code: def.buf.into_bytes(),
        });
        Ok(())
    }

    fn compile_recurse(&mut self, tok: Token<'a>) -> Result<(), CompileError> {
        let source = self.source;
        let def = match self.def.as_mut() {
            Some(d) => d,
            // RECURSE has no meaning outside a definition.
            None => {
                return Err(CompileError::at(
                    ErrorKind::UnknownToken,
                    source,
                    tok.offset,
                    tok.text,
                ))
            }
        };

        if let Err(kind) = def.buf.push_op(Op::Call) {
            return Err(CompileError::at(kind, source, tok.offset, tok.text));
        }
        let pos = def.buf.len();
        if let Err(kind) = def.buf.push_u16_le(0) {
            return Err(CompileError::at(kind, source, tok.offset, tok.text));
        }
        def.recurse_patches.push(pos);
        Ok(())
    }

    fn compile_constant(
        &mut self,
        tok: Token<'a>,
        tz: &mut Tokenizer<'a>,
        had_literal: Option<i32>,
    ) -> Result<(), CompileError> {
        let value = match had_literal {
            Some(v) => v,
            None => return Err(self.err(ErrorKind::ConstantWithoutValue, tok)),
        };

        let name_tok = match self.read_token(tz)? {
            Some(t) => t,
            None => return Err(self.err(ErrorKind::ConstantWithoutName, tok)),
        };
        self.check_new_name(name_tok, tok)?;

        // Take back the LIT the value rode in on; the constant's own
        // stream replaces it.
        let len = self.buf().len();
        self.buf().truncate(len - 5);

        let code = entry_body(value).map_err(|kind| self.err(kind, tok))?;
        self.words.push(WordEntry {
            name: clamp_name(name_tok.text),
            kind: WordKind::Constant,
            code,
        });
        Ok(())
    }

    fn compile_variable(
        &mut self,
        tok: Token<'a>,
        tz: &mut Tokenizer<'a>,
    ) -> Result<(), CompileError> {
        let name_tok = match self.read_token(tz)? {
            Some(t) => t,
            None => return Err(self.err(ErrorKind::VariableWithoutName, tok)),
        };
        self.check_new_name(name_tok, tok)?;

        let addr = self.data_base + self.var_count * DATA_CELL_SIZE;
        self.var_count += 1;

        let code = entry_body(addr as i32).map_err(|kind| self.err(kind, tok))?;
        self.words.push(WordEntry {
            name: clamp_name(name_tok.text),
            kind: WordKind::Variable,
            code,
        });
        Ok(())
    }

    /// Uniqueness and capacity checks shared by `:`, CONSTANT, VARIABLE.
    fn check_new_name(&self, name_tok: Token<'a>, tok: Token<'a>) -> Result<(), CompileError> {
        if find_word(&self.words, name_tok.text).is_some()
            || self
                .ctx
                .map(|c| c.find_word(name_tok.text).is_some())
                .unwrap_or(false)
        {
            return Err(self.err(ErrorKind::DuplicateWord, name_tok));
        }
        if self.words.len() >= MAX_DICT_ENTRIES {
            return Err(self.err(ErrorKind::DictionaryFull, tok));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // IF / ELSE / THEN
    // ------------------------------------------------------------------

    fn compile_if(&mut self, tok: Token<'a>) -> Result<(), CompileError> {
        self.check_depth(tok)?;

        self.emit_op_at(Op::Jz, tok)?;
        let jz_patch = self.here();
        self.emit_i16_at(0, tok)?;

        self.control.push(ControlFrame::If {
            jz_patch,
            jmp_patch: 0,
            has_else: false,
        });
        Ok(())
    }

    fn compile_else(&mut self, tok: Token<'a>) -> Result<(), CompileError> {
        let (jz_patch, has_else) = match self.pop_frame() {
            Some(ControlFrame::If {
                jz_patch, has_else, ..
            }) => (jz_patch, has_else),
            _ => return Err(self.err(ErrorKind::ElseWithoutIf, tok)),
        };
        if has_else {
            return Err(self.err(ErrorKind::DuplicateElse, tok));
        }

        self.emit_op_at(Op::Jmp, tok)?;
        let jmp_patch = self.here();
        self.emit_i16_at(0, tok)?;

        // The false branch starts here, just past the JMP.
        self.patch_to_here(jz_patch);

        self.control.push(ControlFrame::If {
            jz_patch,
            jmp_patch,
            has_else: true,
        });
        Ok(())
    }

    fn compile_then(&mut self, tok: Token<'a>) -> Result<(), CompileError> {
        match self.pop_frame() {
            Some(ControlFrame::If {
                jz_patch,
                jmp_patch,
                has_else,
            }) => {
                if has_else {
                    self.patch_to_here(jmp_patch);
                } else {
                    self.patch_to_here(jz_patch);
                }
                Ok(())
            }
            _ => Err(self.err(ErrorKind::ThenWithoutIf, tok)),
        }
    }

    // ------------------------------------------------------------------
    // BEGIN / UNTIL / WHILE / REPEAT / AGAIN
    // ------------------------------------------------------------------

    fn compile_begin(&mut self, tok: Token<'a>) -> Result<(), CompileError> {
        self.check_depth(tok)?;
        self.control.push(ControlFrame::Begin {
            begin_addr: self.here(),
            while_patch: 0,
            has_while: false,
        });
        Ok(())
    }

    fn compile_until(&mut self, tok: Token<'a>) -> Result<(), CompileError> {
        match self.pop_frame() {
            Some(ControlFrame::Begin {
                begin_addr,
                has_while,
                ..
            }) => {
                if has_while {
                    return Err(self.err(ErrorKind::UntilAfterWhile, tok));
                }
                self.emit_branch_back(Op::Jz, begin_addr, tok)
            }
            _ => Err(self.err(ErrorKind::UntilWithoutBegin, tok)),
        }
    }

    fn compile_while(&mut self, tok: Token<'a>) -> Result<(), CompileError> {
        let begin_addr = match self.pop_frame() {
            Some(ControlFrame::Begin {
                begin_addr,
                has_while,
                ..
            }) => {
                if has_while {
                    return Err(self.err(ErrorKind::DuplicateWhile, tok));
                }
                begin_addr
            }
            _ => return Err(self.err(ErrorKind::WhileWithoutBegin, tok)),
        };

        self.emit_op_at(Op::Jz, tok)?;
        let while_patch = self.here();
        self.emit_i16_at(0, tok)?;

        self.control.push(ControlFrame::Begin {
            begin_addr,
            while_patch,
            has_while: true,
        });
        Ok(())
    }

    fn compile_repeat(&mut self, tok: Token<'a>) -> Result<(), CompileError> {
        match self.pop_frame() {
            Some(ControlFrame::Begin {
                begin_addr,
                while_patch,
                has_while,
            }) => {
                if !has_while {
                    return Err(self.err(ErrorKind::RepeatWithoutWhile, tok));
                }
                self.emit_branch_back(Op::Jmp, begin_addr, tok)?;
                self.patch_to_here(while_patch);
                Ok(())
            }
            _ => Err(self.err(ErrorKind::RepeatWithoutBegin, tok)),
        }
    }

    fn compile_again(&mut self, tok: Token<'a>) -> Result<(), CompileError> {
        match self.pop_frame() {
            Some(ControlFrame::Begin {
                begin_addr,
                has_while,
                ..
            }) => {
                if has_while {
                    return Err(self.err(ErrorKind::AgainAfterWhile, tok));
                }
                self.emit_branch_back(Op::Jmp, begin_addr, tok)
            }
            _ => Err(self.err(ErrorKind::AgainWithoutBegin, tok)),
        }
    }

    // ------------------------------------------------------------------
    // DO / LOOP / +LOOP / LEAVE
    // ------------------------------------------------------------------

    fn compile_do(&mut self, tok: Token<'a>) -> Result<(), CompileError> {
        self.check_depth(tok)?;

        // ( limit index -- ), return stack gains limit under index.
        self.emit_op_at(Op::Swap, tok)?;
        self.emit_op_at(Op::Tor, tok)?;
        self.emit_op_at(Op::Tor, tok)?;

        self.control.push(ControlFrame::Do {
            do_addr: self.here(),
            leave_patches: Vec::new(),
        });
        Ok(())
    }

    fn compile_loop(&mut self, tok: Token<'a>, plus_loop: bool) -> Result<(), CompileError> {
        let kind = if plus_loop {
            ErrorKind::PLoopWithoutDo
        } else {
            ErrorKind::LoopWithoutDo
        };
        let (do_addr, leave_patches) = match self.pop_frame() {
            Some(ControlFrame::Do {
                do_addr,
                leave_patches,
            }) => (do_addr, leave_patches),
            _ => return Err(self.err(kind, tok)),
        };

        // Pop (index, limit), bump the index, compare, and either stash
        // the pair back and jump to the body, or fall through to cleanup.
        self.emit_op_at(Op::Fromr, tok)?;
        if !plus_loop {
            self.emit_op_at(Op::Lit, tok)?;
            self.emit_i32_at(1, tok)?;
        }
        self.emit_op_at(Op::Add, tok)?;
        self.emit_op_at(Op::Fromr, tok)?;
        self.emit_op_at(Op::Over, tok)?;
        self.emit_op_at(Op::Over, tok)?;
        self.emit_op_at(Op::Lt, tok)?;

        self.emit_op_at(Op::Jz, tok)?;
        let jz_patch = self.here();
        self.emit_i16_at(0, tok)?;

        self.emit_op_at(Op::Tor, tok)?;
        self.emit_op_at(Op::Tor, tok)?;
        self.emit_branch_back(Op::Jmp, do_addr, tok)?;

        // Exit path: drop the spent (index, limit) copies.
        self.patch_to_here(jz_patch);
        self.emit_op_at(Op::Drop, tok)?;
        self.emit_op_at(Op::Drop, tok)?;

        // LEAVE jumps land after the cleanup; LEAVE already unwound the
        // return stack itself.
        for patch in leave_patches {
            self.patch_to_here(patch);
        }
        Ok(())
    }

    fn compile_leave(&mut self, tok: Token<'a>) -> Result<(), CompileError> {
        let base = self.base_depth();
        let frame_index = (base..self.control.len())
            .rev()
            .find(|&i| matches!(self.control[i], ControlFrame::Do { .. }));
        let frame_index = match frame_index {
            Some(i) => i,
            None => return Err(self.err(ErrorKind::LeaveWithoutDo, tok)),
        };

        if let ControlFrame::Do { leave_patches, .. } = &self.control[frame_index] {
            if leave_patches.len() >= MAX_LEAVE_SITES {
                return Err(self.err(ErrorKind::LeaveDepthExceeded, tok));
            }
        }

        // Unwind this loop's (limit, index) pair, then bail to the
        // patched exit point.
        self.emit_op_at(Op::Fromr, tok)?;
        self.emit_op_at(Op::Fromr, tok)?;
        self.emit_op_at(Op::Drop, tok)?;
        self.emit_op_at(Op::Drop, tok)?;
        self.emit_op_at(Op::Jmp, tok)?;
        let patch = self.here();
        self.emit_i16_at(0, tok)?;

        if let ControlFrame::Do { leave_patches, .. } = &mut self.control[frame_index] {
            leave_patches.push(patch);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Locals
    // ------------------------------------------------------------------

    fn compile_local(
        &mut self,
        op: Op,
        tok: Token<'a>,
        tz: &mut Tokenizer<'a>,
    ) -> Result<(), CompileError> {
        let idx_tok = match self.read_token(tz)? {
            Some(t) => t,
            None => return Err(self.err(ErrorKind::MissingLocalIdx, tok)),
        };
        let index = match parse_int(idx_tok.text) {
            IntParse::Value(v) if (0..=255).contains(&v) => v as u8,
            _ => return Err(self.err(ErrorKind::InvalidLocalIdx, idx_tok)),
        };

        self.emit_op_at(op, tok)?;
        self.emit_u8_at(index, tok)
    }

    // ------------------------------------------------------------------
    // Emission helpers
    // ------------------------------------------------------------------

    fn buf(&mut self) -> &mut CodeBuffer {
        match self.def.as_mut() {
            Some(def) => &mut def.buf,
            None => &mut self.main,
        }
    }

    /// Write cursor of the stream currently receiving code.
    fn here(&self) -> u32 {
        match self.def.as_ref() {
            Some(def) => def.buf.len(),
            None => self.main.len(),
        }
    }

    fn emit_op_at(&mut self, op: Op, tok: Token<'a>) -> Result<(), CompileError> {
        self.buf().push_op(op).map_err(|k| self.err(k, tok))
    }

    fn emit_u8_at(&mut self, value: u8, tok: Token<'a>) -> Result<(), CompileError> {
        self.buf().push_u8(value).map_err(|k| self.err(k, tok))
    }

    fn emit_i16_at(&mut self, value: i16, tok: Token<'a>) -> Result<(), CompileError> {
        self.buf().push_i16_le(value).map_err(|k| self.err(k, tok))
    }

    fn emit_u16_at(&mut self, value: u16, tok: Token<'a>) -> Result<(), CompileError> {
        self.buf().push_u16_le(value).map_err(|k| self.err(k, tok))
    }

    fn emit_i32_at(&mut self, value: i32, tok: Token<'a>) -> Result<(), CompileError> {
        self.buf().push_i32_le(value).map_err(|k| self.err(k, tok))
    }

    fn emit_bytes_at(&mut self, bytes: &[u8], tok: Token<'a>) -> Result<(), CompileError> {
        self.buf().push_bytes(bytes).map_err(|k| self.err(k, tok))
    }

    /// Emit a branch with a backward offset to `target`.
    fn emit_branch_back(&mut self, op: Op, target: u32, tok: Token<'a>) -> Result<(), CompileError> {
        self.emit_op_at(op, tok)?;
        let offset = target as i64 - (self.here() as i64 + 2);
        self.emit_i16_at(offset as i16, tok)
    }

    /// Resolve a forward placeholder: point it at the current cursor.
    fn patch_to_here(&mut self, patch_pos: u32) {
        let offset = self.here() as i64 - (patch_pos as i64 + 2);
        self.buf().patch_i16_le(patch_pos, offset as i16);
    }

    // ------------------------------------------------------------------
    // Frame and lookup helpers
    // ------------------------------------------------------------------

    fn base_depth(&self) -> usize {
        self.def.as_ref().map(|d| d.base_depth).unwrap_or(0)
    }

    /// Pop the innermost frame belonging to the current stream.
    fn pop_frame(&mut self) -> Option<ControlFrame> {
        if self.control.len() > self.base_depth() {
            self.control.pop()
        } else {
            None
        }
    }

    fn check_depth(&self, tok: Token<'a>) -> Result<(), CompileError> {
        if self.control.len() >= MAX_CONTROL_DEPTH {
            Err(self.err(ErrorKind::ControlDepthExceeded, tok))
        } else {
            Ok(())
        }
    }

    /// Call index for a name: locally defined words first (offset past
    /// the context), then the context itself.
    fn lookup_word(&self, name: &str) -> Option<u16> {
        if let Some(local) = find_word(&self.words, name) {
            return Some(self.ctx_len() + local as u16);
        }
        self.ctx.and_then(|c| c.find_word(name))
    }

    fn ctx_len(&self) -> u16 {
        self.ctx.map(|c| c.word_count() as u16).unwrap_or(0)
    }

    fn read_token(&self, tz: &mut Tokenizer<'a>) -> Result<Option<Token<'a>>, CompileError> {
        tz.next_token()
            .map_err(|(kind, offset)| CompileError::at(kind, self.source, offset, "("))
    }

    fn err(&self, kind: ErrorKind, tok: Token<'a>) -> CompileError {
        CompileError::at(kind, self.source, tok.offset, tok.text)
    }
}

/// Body of a CONSTANT or VARIABLE entry: push one value and return.
fn entry_body(value: i32) -> Result<Vec<u8>, ErrorKind> {
    let mut buf = CodeBuffer::new();
    buf.push_op(Op::Lit)?;
    buf.push_i32_le(value)?;
    buf.push_op(Op::Ret)?;
    Ok(buf.into_bytes())
}

/// Local-variable words that read a slot index from the token stream.
fn local_prefix_op(token: &str) -> Option<Op> {
    if token.eq_ignore_ascii_case("L@") {
        Some(Op::Lget)
    } else if token.eq_ignore_ascii_case("L!") {
        Some(Op::Lset)
    } else if token.eq_ignore_ascii_case("L>!") {
        Some(Op::Ltee)
    } else if token.eq_ignore_ascii_case("L++") {
        Some(Op::Linc)
    } else if token.eq_ignore_ascii_case("L--") {
        Some(Op::Ldec)
    } else {
        None
    }
}
