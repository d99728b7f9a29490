use v4front::{compile_with_context, Context, ErrorKind, Op};

#[test]
fn test_empty_context() {
    let ctx = Context::new();
    assert_eq!(ctx.word_count(), 0);
    assert_eq!(ctx.word_name(0), None);
    assert_eq!(ctx.find_word("NONEXISTENT"), None);
}

#[test]
fn test_register_and_find() {
    let mut ctx = Context::new();
    ctx.register_word("SQUARE", 0);

    assert_eq!(ctx.word_count(), 1);
    assert_eq!(ctx.word_name(0), Some("SQUARE"));
    assert_eq!(ctx.find_word("SQUARE"), Some(0));
    assert_eq!(ctx.find_word("square"), Some(0));
    assert_eq!(ctx.find_word("Square"), Some(0));
}

#[test]
fn test_register_multiple() {
    let mut ctx = Context::new();
    ctx.register_word("SQUARE", 0);
    ctx.register_word("DOUBLE", 1);
    ctx.register_word("TRIPLE", 2);

    assert_eq!(ctx.word_count(), 3);
    assert_eq!(ctx.find_word("SQUARE"), Some(0));
    assert_eq!(ctx.find_word("DOUBLE"), Some(1));
    assert_eq!(ctx.find_word("TRIPLE"), Some(2));
}

#[test]
fn test_register_updates_existing() {
    let mut ctx = Context::new();
    ctx.register_word("TEST", 0);
    ctx.register_word("TEST", 5);

    assert_eq!(ctx.word_count(), 1);
    assert_eq!(ctx.find_word("TEST"), Some(5));
}

#[test]
fn test_reset() {
    let mut ctx = Context::new();
    ctx.register_word("SQUARE", 0);
    ctx.register_word("DOUBLE", 1);

    ctx.reset();

    assert_eq!(ctx.word_count(), 0);
    assert_eq!(ctx.find_word("SQUARE"), None);
}

#[test]
fn test_incremental_compilation() {
    let mut ctx = Context::new();

    // First call: define SQUARE.
    let program = compile_with_context(&ctx, ": SQUARE DUP * ;").unwrap();
    assert_eq!(program.word_count(), 1);
    assert_eq!(program.words[0].name, "SQUARE");
    ctx.register_word("SQUARE", 0);

    // Second call: the context resolves SQUARE to a CALL.
    let program = compile_with_context(&ctx, "5 SQUARE").unwrap();
    assert_eq!(program.word_count(), 0);
    assert_eq!(program.main[5], Op::Call as u8);
    assert_eq!(program.main[6], 0);
    assert_eq!(program.main[7], 0);
}

#[test]
fn test_new_words_are_offset_past_the_context() {
    let mut ctx = Context::new();
    compile_with_context(&ctx, ": SQUARE DUP * ;").unwrap();
    ctx.register_word("SQUARE", 0);

    // QUADRUPLE is the second word overall: its calls to SQUARE use the
    // context index, and calls to QUADRUPLE itself would use index 1.
    let program = compile_with_context(&ctx, ": QUADRUPLE SQUARE SQUARE ;").unwrap();
    assert_eq!(program.word_count(), 1);
    assert_eq!(
        program.words[0].code,
        vec![
            Op::Call as u8,
            0,
            0,
            Op::Call as u8,
            0,
            0,
            Op::Ret as u8
        ]
    );
    ctx.register_word("QUADRUPLE", 1);

    let program = compile_with_context(&ctx, "2 SQUARE QUADRUPLE").unwrap();
    assert_eq!(program.main[5], Op::Call as u8);
    assert_eq!(program.main[6], 0);
    assert_eq!(program.main[8], Op::Call as u8);
    assert_eq!(program.main[9], 1);
}

#[test]
fn test_recurse_index_accounts_for_context() {
    let mut ctx = Context::new();
    ctx.register_word("FIRST", 0);
    ctx.register_word("SECOND", 1);

    let program = compile_with_context(&ctx, ": LOOPY DUP IF RECURSE THEN ;").unwrap();
    let code = &program.words[0].code;
    let call_at = code.iter().position(|&b| b == Op::Call as u8).unwrap();
    assert_eq!(u16::from_le_bytes([code[call_at + 1], code[call_at + 2]]), 2);
}

#[test]
fn test_local_words_win_over_context() {
    let mut ctx = Context::new();
    ctx.register_word("THING", 7);

    let program = compile_with_context(&ctx, ": OTHER 1 ; OTHER").unwrap();
    // OTHER is local word 0 offset past the 1-entry context
    assert_eq!(program.main[0], Op::Call as u8);
    assert_eq!(program.main[1], 1);
}

#[test]
fn test_unknown_word_with_context() {
    let mut ctx = Context::new();
    ctx.register_word("SQUARE", 0);

    let err = compile_with_context(&ctx, "5 UNKNOWN").unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnknownToken);
    assert_eq!(err.token, "UNKNOWN");
    assert_eq!(err.position, 2);
}

#[test]
fn test_word_without_context_fails() {
    let mut ctx = Context::new();
    compile_with_context(&ctx, ": SQUARE DUP * ;").unwrap();
    ctx.register_word("SQUARE", 0);

    // A fresh context knows nothing about SQUARE.
    let fresh = Context::new();
    let err = compile_with_context(&fresh, "5 SQUARE").unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnknownToken);
}

#[test]
fn test_duplicate_against_context() {
    let mut ctx = Context::new();
    ctx.register_word("SQUARE", 0);

    let err = compile_with_context(&ctx, ": SQUARE DUP * ;").unwrap_err();
    assert_eq!(err.kind, ErrorKind::DuplicateWord);
}
