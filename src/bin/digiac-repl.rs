//! Thin line-oriented driver over the Digiac-3080 core: load a tape, step or
//! run, examine registers and memory. Not the full interactive shell -- no
//! history, no completion, no scripting -- just enough to exercise the
//! library's supervisor surface from a terminal.

use std::fs::File;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::Parser;
use digiac3080_core::cpu::Cpu;
use digiac3080_core::peripherals::keyboard::NullKeyboard;
use digiac3080_core::word::Word;

#[derive(Parser)]
struct Args {
    /// Paper tape image to attach on startup.
    #[arg(long)]
    tape: Option<PathBuf>,

    /// Instructions per second; 0 disables throttling.
    #[arg(long, default_value_t = 60)]
    ips: u32,
}

fn parse_octal_addr(s: &str) -> Option<u16> {
    u16::from_str_radix(s, 8).ok().filter(|a| *a <= 0o7777)
}

/// Parses a supervisor-entered word literal: a leading `-` means the value
/// is a negative octal literal, converted to sign-magnitude per spec.md
/// §6.4 (`DEPOSIT A -12345670`).
fn parse_word_literal(s: &str) -> Option<Word> {
    i64::from_str_radix(s, 8)
        .ok()
        .map(Word::from_twos_complement_literal)
}

fn print_outcome(message: &str, printed: &Option<String>, tap_notices: &[String]) {
    println!("{}", message);
    if let Some(printed) = printed {
        print!("{}", printed);
        let _ = io::stdout().flush();
    }
    for notice in tap_notices {
        println!("{}", notice);
    }
}

fn main() {
    let args = Args::parse();
    let mut rng = rand::thread_rng();
    let mut cpu = Cpu::new_randomized(&mut rng);
    cpu.set_ips(args.ips);

    if let Some(path) = &args.tape {
        match File::open(path) {
            Ok(file) => cpu.attach_tape(Box::new(file)),
            Err(err) => eprintln!("could not open tape {}: {}", path.display(), err),
        }
    }

    // Type In is not exercised by this thin driver: hooking up raw-mode
    // stdin keypresses while also reading line-buffered commands from the
    // same stream would need its own mode switch, which belongs in the full
    // interactive shell this binary stands in for.
    let mut keyboard = NullKeyboard;
    let stdin = io::stdin();
    print!("> ");
    let _ = io::stdout().flush();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(_) => break,
        };
        let mut words = line.split_whitespace();
        match words.next() {
            Some("step") | Some("s") => {
                let count: u32 = words.next().and_then(|w| w.parse().ok()).unwrap_or(1);
                for outcome in cpu.step_n(count, &mut keyboard) {
                    if cpu.trace_flags() & 1 != 0 {
                        println!("{}", cpu.render_trace_line(&outcome));
                    } else {
                        print_outcome(&outcome.message, &outcome.printed, &outcome.tap_notices);
                    }
                }
            }
            Some("go") | Some("g") => {
                if let Some(addr) = words.next().and_then(parse_octal_addr) {
                    cpu.pc = addr;
                }
                cpu.set_running(true);
                for outcome in cpu.go(&mut keyboard) {
                    if cpu.trace_flags() & 1 != 0 {
                        println!("{}", cpu.render_trace_line(&outcome));
                    } else {
                        print_outcome(&outcome.message, &outcome.printed, &outcome.tap_notices);
                    }
                }
            }
            Some("status") => println!("{}", cpu.render_status()),
            Some("throttle") => match words.next() {
                Some(n) => match n.parse::<u32>() {
                    Ok(ips) => cpu.set_ips(ips),
                    Err(_) => println!("Invalid # instructions per second: \"{}\"", n),
                },
                None => {
                    if cpu.ips() == 0 {
                        println!("not throttled");
                    } else {
                        println!("{} Instr/sec", cpu.ips());
                    }
                }
            },
            Some("trace") => match words.next() {
                Some(n) => match n.parse::<u32>() {
                    Ok(flags) => cpu.set_trace_flags(flags),
                    Err(_) => println!("Invalid trace flags: \"{}\"", n),
                },
                None => println!("trace flags: {:02X}h", cpu.trace_flags()),
            },
            Some("examine") | Some("e") => match words.next() {
                Some("a") => println!("{}", cpu.examine_register_a().render_octal()),
                Some("b") => println!("{}", cpu.examine_register_b().render_octal()),
                Some("pc") => println!("{:04o}", cpu.pc),
                Some(addr_str) => match parse_octal_addr(addr_str) {
                    Some(addr) => println!("{}", cpu.examine_memory(addr).render_octal()),
                    None => println!("Invalid address: \"{}\"", addr_str),
                },
                None => println!("examine a|b|pc|<octal addr>"),
            },
            Some("deposit") | Some("d") => {
                let target = words.next();
                let value = words.next();
                match (target, value) {
                    (Some("a"), Some(v)) => match parse_word_literal(v) {
                        Some(word) => cpu.deposit_register_a(word),
                        None => println!("Invalid value: \"{}\"", v),
                    },
                    (Some("b"), Some(v)) => match parse_word_literal(v) {
                        Some(word) => cpu.deposit_register_b(word),
                        None => println!("Invalid value: \"{}\"", v),
                    },
                    (Some("pc"), Some(v)) => match parse_octal_addr(v) {
                        Some(addr) => cpu.pc = addr,
                        None => println!("Invalid address: \"{}\"", v),
                    },
                    (Some(addr_str), Some(v)) => match (parse_octal_addr(addr_str), parse_word_literal(v)) {
                        (Some(addr), Some(word)) => cpu.deposit_memory(addr, word),
                        _ => println!("Invalid deposit: \"{} {}\"", addr_str, v),
                    },
                    _ => println!("deposit a|b|pc|<octal addr> <octal value>"),
                }
            }
            Some("break") => match words.next().and_then(parse_octal_addr) {
                Some(addr) => cpu.set_breakpoint(addr),
                None => println!("Invalid address"),
            },
            Some("clear") => match words.next().and_then(parse_octal_addr) {
                Some(addr) => cpu.clear_breakpoint(addr),
                None => println!("Invalid address"),
            },
            Some("acstop") => match words.next().and_then(parse_octal_addr) {
                Some(addr) => cpu.set_address_compare_stop(addr),
                None => println!("Invalid address"),
            },
            Some("aclear") => match words.next().and_then(parse_octal_addr) {
                Some(addr) => cpu.clear_address_compare_stop(addr),
                None => println!("Invalid address"),
            },
            Some("attach") => match words.next() {
                Some(path) => match File::open(path) {
                    Ok(file) => cpu.attach_tape(Box::new(file)),
                    Err(err) => println!("could not open tape {}: {}", path, err),
                },
                None => println!("attach <path>"),
            },
            Some("detach") => cpu.detach_tape(),
            Some("quit") | Some("q") => break,
            _ => println!(
                "commands: step [n], go [addr], status, throttle [ips], trace [flags], \
                 examine a|b|pc|<addr>, deposit a|b|pc|<addr> <value>, break <addr>, \
                 clear <addr>, acstop <addr>, aclear <addr>, attach <path>, detach, quit"
            ),
        }
        print!("> ");
        let _ = io::stdout().flush();
    }
}
