use v4front::{compile, Op};

#[test]
fn test_task_words_compile_to_single_opcodes() {
    for (source, op) in [
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
    ] {
        let program = compile(source).unwrap();
        assert_eq!(program.main[0], op as u8, "source: {}", source);
        assert_eq!(program.main[1], Op::Ret as u8);
    }
}

#[test]
fn test_task_words_case_insensitive() {
    assert_eq!(compile("spawn").unwrap().main[0], Op::TaskSpawn as u8);
    assert_eq!(compile("yield").unwrap().main[0], Op::TaskYield as u8);
    assert_eq!(compile("me").unwrap().main[0], Op::TaskSelf as u8);
}

#[test]
fn test_sleep_with_duration() {
    // LIT 100, TASK_SLEEP, RET
    let program = compile("100 SLEEP").unwrap();
    assert_eq!(program.main.len(), 7);
    assert_eq!(program.main[0], Op::Lit as u8);
    assert_eq!(program.main[5], Op::TaskSleep as u8);
}

#[test]
fn test_task_words_inside_definitions() {
    let program = compile(": WORKER BEGIN YIELD AGAIN ;").unwrap();
    assert!(program.words[0].code.contains(&(Op::TaskYield as u8)));
}

#[test]
fn test_critical_section_pattern() {
    let program = compile("CRITICAL 1 2 + UNCRITICAL").unwrap();
    assert_eq!(program.main[0], Op::CriticalEnter as u8);
    assert_eq!(program.main[program.main.len() - 2], Op::CriticalExit as u8);
}
