use v4front::{compile, ErrorKind, Op};

fn read_i16_le(bytes: &[u8]) -> i16 {
    i16::from_le_bytes([bytes[0], bytes[1]])
}

#[test]
fn test_do_preamble() {
    // LIT 10, LIT 0, SWAP, TOR, TOR ...
    let program = compile("10 0 DO LOOP").unwrap();
    let code = &program.main;
    assert_eq!(code[0], Op::Lit as u8);
    assert_eq!(code[5], Op::Lit as u8);
    assert_eq!(code[10], Op::Swap as u8);
    assert_eq!(code[11], Op::Tor as u8);
    assert_eq!(code[12], Op::Tor as u8);
}

#[test]
fn test_loop_macro_layout() {
    let program = compile("10 0 DO I LOOP").unwrap();
    let code = &program.main;

    // body: I = RFETCH at do_addr
    assert_eq!(code[13], Op::Rfetch as u8);

    // LOOP expansion
    assert_eq!(code[14], Op::Fromr as u8);
    assert_eq!(code[15], Op::Lit as u8); // LIT 1
    assert_eq!(code[20], Op::Add as u8);
    assert_eq!(code[21], Op::Fromr as u8);
    assert_eq!(code[22], Op::Over as u8);
    assert_eq!(code[23], Op::Over as u8);
    assert_eq!(code[24], Op::Lt as u8);
    assert_eq!(code[25], Op::Jz as u8);
    // exit lands on the cleanup DROPs at 33: 33 - 28 = 5
    assert_eq!(read_i16_le(&code[26..28]), 5);
    assert_eq!(code[28], Op::Tor as u8);
    assert_eq!(code[29], Op::Tor as u8);
    assert_eq!(code[30], Op::Jmp as u8);
    // back to do_addr 13 from next_ip 33
    assert_eq!(read_i16_le(&code[31..33]), -20);
    assert_eq!(code[33], Op::Drop as u8);
    assert_eq!(code[34], Op::Drop as u8);
    assert_eq!(code[35], Op::Ret as u8);
    assert_eq!(code.len(), 36);
}

#[test]
fn test_plus_loop_omits_increment_literal() {
    let program = compile("10 0 DO I 2 +LOOP").unwrap();
    let code = &program.main;

    // body: RFETCH, LIT 2
    assert_eq!(code[13], Op::Rfetch as u8);
    assert_eq!(code[14], Op::Lit as u8);
    // +LOOP starts directly with FROMR, ADD (increment comes from stack)
    assert_eq!(code[19], Op::Fromr as u8);
    assert_eq!(code[20], Op::Add as u8);
    assert_eq!(code[21], Op::Fromr as u8);
}

#[test]
fn test_empty_loop_body() {
    assert!(compile("10 0 DO LOOP").is_ok());
    assert!(compile("5 5 DO I LOOP").is_ok());
}

#[test]
fn test_nested_do_loops() {
    assert!(compile("3 0 DO 3 0 DO I LOOP LOOP").is_ok());
    assert!(compile("3 0 DO 3 0 DO I J + LOOP LOOP").is_ok());
    assert!(compile("2 0 DO 2 0 DO 2 0 DO I J K LOOP LOOP LOOP").is_ok());
}

#[test]
fn test_sequential_loops() {
    assert!(compile("10 0 DO I LOOP 10 0 DO I LOOP").is_ok());
}

#[test]
fn test_do_loop_inside_if() {
    assert!(compile("1 IF 10 0 DO I LOOP THEN").is_ok());
    assert!(compile("0 IF 42 ELSE 10 0 DO I LOOP THEN").is_ok());
}

#[test]
fn test_if_inside_do_loop() {
    assert!(compile("10 0 DO I 5 > IF I THEN LOOP").is_ok());
    assert!(compile("10 0 DO I 5 < IF I ELSE 0 THEN LOOP").is_ok());
}

#[test]
fn test_accumulator_patterns() {
    assert!(compile("0 10 0 DO I + LOOP").is_ok());
    assert!(compile("1 5 1 DO I * LOOP").is_ok());
    assert!(compile("10 0 DO 10 0 DO I J * LOOP LOOP").is_ok());
}

#[test]
fn test_leave() {
    let program = compile("10 0 DO I 5 = IF LEAVE THEN LOOP").unwrap();
    let code = &program.main;

    // LEAVE unwinds the return stack before jumping out.
    let mut found = false;
    for i in 0..code.len() - 5 {
        if code[i] == Op::Fromr as u8
            && code[i + 1] == Op::Fromr as u8
            && code[i + 2] == Op::Drop as u8
            && code[i + 3] == Op::Drop as u8
            && code[i + 4] == Op::Jmp as u8
        {
            // The jump lands past the loop's own cleanup, at the RET.
            let offset = read_i16_le(&code[i + 5..i + 7]) as i64;
            let target = (i as i64 + 5) + 2 + offset;
            assert_eq!(target as usize, code.len() - 1);
            assert_eq!(code[target as usize], Op::Ret as u8);
            found = true;
            break;
        }
    }
    assert!(found, "LEAVE sequence not found");
}

#[test]
fn test_multiple_leaves() {
    let source = "10 0 DO I 3 = IF LEAVE THEN I 7 = IF LEAVE THEN LOOP";
    assert!(compile(source).is_ok());
}

#[test]
fn test_leave_limit() {
    // Eight LEAVEs per frame are allowed, the ninth is rejected.
    let eight = format!("10 0 DO {}LOOP", "1 IF LEAVE THEN ".repeat(8));
    assert!(compile(&eight).is_ok());

    let nine = format!("10 0 DO {}LOOP", "1 IF LEAVE THEN ".repeat(9));
    let err = compile(&nine).unwrap_err();
    assert_eq!(err.kind, ErrorKind::LeaveDepthExceeded);
    assert_eq!(err.code(), -24);
}

#[test]
fn test_leave_without_do() {
    let err = compile("LEAVE").unwrap_err();
    assert_eq!(err.kind, ErrorKind::LeaveWithoutDo);
    assert_eq!(err.code(), -23);

    let err = compile("1 IF LEAVE THEN").unwrap_err();
    assert_eq!(err.kind, ErrorKind::LeaveWithoutDo);
}

#[test]
fn test_loop_without_do() {
    let err = compile("10 20 + LOOP").unwrap_err();
    assert_eq!(err.kind, ErrorKind::LoopWithoutDo);
    assert_eq!(err.code(), -20);

    // wrong frame kind on top
    let err = compile("1 IF 42 LOOP").unwrap_err();
    assert_eq!(err.kind, ErrorKind::LoopWithoutDo);
}

#[test]
fn test_plus_loop_without_do() {
    let err = compile("2 +LOOP").unwrap_err();
    assert_eq!(err.kind, ErrorKind::PLoopWithoutDo);
    assert_eq!(err.code(), -21);
}

#[test]
fn test_unclosed_do() {
    let err = compile("10 0 DO I 2 *").unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnclosedDo);
    assert_eq!(err.code(), -22);

    let err = compile("3 0 DO 3 0 DO I LOOP DROP").unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnclosedDo);
}

#[test]
fn test_case_insensitive_do_loop() {
    assert!(compile("10 0 do i loop").is_ok());
    assert!(compile("10 0 Do I Loop").is_ok());
    assert!(compile("10 0 DO I 2 +loop").is_ok());
}

#[test]
fn test_exit_emits_ret() {
    let program = compile("1 EXIT 2").unwrap();
    assert_eq!(program.main[5], Op::Ret as u8);
    // the trailing RET is still appended after the dead LIT 2
    assert_eq!(*program.main.last().unwrap(), Op::Ret as u8);
}
