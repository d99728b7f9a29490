// main.rs - v4front command line: compile files to .v4b, disassemble,
// or run an interactive compile-and-inspect REPL.

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::env;
use std::fs;
use std::process::ExitCode;
use v4front::{compile_with_context, container, disasm, error_message, Context};

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();

    let mut input: Option<String> = None;
    let mut output: Option<String> = None;
    let mut disassemble = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-o" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("v4front: -o needs a file name");
                    return ExitCode::FAILURE;
                }
                output = Some(args[i].clone());
            }
            "-d" => disassemble = true,
            "-h" | "--help" => {
                print_usage();
                return ExitCode::SUCCESS;
            }
            arg if arg.starts_with('-') => {
                eprintln!("v4front: unknown option: {}", arg);
                return ExitCode::FAILURE;
            }
            arg => input = Some(arg.to_string()),
        }
        i += 1;
    }

    match input {
        Some(path) => compile_file(&path, output.as_deref(), disassemble),
        None => repl(),
    }
}

fn print_usage() {
    println!("Usage: v4front [file] [-o out.v4b] [-d]");
    println!();
    println!("  file       Forth source file to compile");
    println!("  -o FILE    write compiled main bytecode as a .v4b container");
    println!("  -d         print a disassembly of the compiled code");
    println!();
    println!("With no file, start an interactive REPL.");
}

fn compile_file(path: &str, output: Option<&str>, disassemble: bool) -> ExitCode {
    let source = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("v4front: failed to read {}: {}", path, e);
            return ExitCode::FAILURE;
        }
    };

    let ctx = Context::new();
    let program = match compile_with_context(&ctx, &source) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("{}: {}", path, e);
            return ExitCode::FAILURE;
        }
    };

    println!(
        "{}: {} bytes main, {} words",
        path,
        program.main.len(),
        program.word_count()
    );

    if disassemble {
        for word in &program.words {
            println!();
            println!("\\ {}", word.name);
            for line in disasm::disasm_all(&word.code) {
                println!("{}", line);
            }
        }
        println!();
        println!("\\ main");
        for line in disasm::disasm_all(&program.main) {
            println!("{}", line);
        }
    }

    if let Some(out) = output {
        if let Err(e) = container::save_bytecode(out, &program.main) {
            eprintln!("v4front: failed to write {}: {}", out, e);
            return ExitCode::FAILURE;
        }
        println!("wrote {}", out);
    }

    ExitCode::SUCCESS
}

fn repl() -> ExitCode {
    println!("v4front {} (compile-only REPL)", env!("CARGO_PKG_VERSION"));
    println!("Type .help for help, bye to exit");
    println!();

    let mut rl = match DefaultEditor::new() {
        Ok(rl) => rl,
        Err(e) => {
            eprintln!("v4front: readline init failed: {:?}", e);
            return ExitCode::FAILURE;
        }
    };

    let history_file = dirs::home_dir().map(|mut p| {
        p.push(".v4front_history");
        p
    });
    if let Some(ref path) = history_file {
        let _ = rl.load_history(path);
    }

    let mut ctx = Context::new();

    loop {
        match rl.readline("> ") {
            Ok(line) => {
                let input = line.trim();
                if input.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(input);

                match input {
                    ".quit" | ".q" => break,
                    ".help" | ".h" => {
                        print_repl_help();
                        continue;
                    }
                    ".words" | ".w" => {
                        print_words(&ctx);
                        continue;
                    }
                    _ => {}
                }
                if input.eq_ignore_ascii_case("bye") {
                    break;
                }

                match compile_with_context(&ctx, input) {
                    Ok(program) => {
                        for word in &program.words {
                            let index = ctx.word_count() as u16;
                            ctx.register_word(&word.name, index);
                            println!("defined {} (@{})", word.name, index);
                        }
                        // A bare RET means the line only defined words.
                        if program.main.len() > 1 {
                            for line in disasm::disasm_all(&program.main) {
                                println!("{}", line);
                            }
                        }
                        println!("ok");
                    }
                    Err(e) => {
                        println!("{}", e);
                        println!("({})", error_message(e.code()));
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("v4front: {:?}", e);
                break;
            }
        }
    }

    if let Some(ref path) = history_file {
        let _ = rl.save_history(path);
    }
    ExitCode::SUCCESS
}

fn print_repl_help() {
    println!(".help, .h      show this help");
    println!(".words, .w     list words known to the session context");
    println!(".quit, .q      exit (also: bye)");
    println!();
    println!("Anything else is compiled as Forth source; the resulting");
    println!("bytecode is disassembled, never executed.");
}

fn print_words(ctx: &Context) {
    if ctx.word_count() == 0 {
        println!("(no words defined)");
        return;
    }
    for i in 0..ctx.word_count() {
        if let Some(name) = ctx.word_name(i) {
            println!("@{:<4} {}", i, name);
        }
    }
}
