//! TA (Type Alpha), RT (Read Tape), TI (Type In).

use crate::cpu::{Cpu, OpOutcome};
use crate::decode::DecodedInstruction;
use crate::peripherals::alphabet::{self, BLANK_CODE};
use crate::peripherals::keyboard::{KeyEvent, Keyboard};
use crate::peripherals::tape::{self, TapeFault};
use crate::word::Word;

pub(crate) fn ta(cpu: &mut Cpu, decoded: &DecodedInstruction) -> OpOutcome {
    let mut addr = decoded.address;
    let mut buf = String::new();
    let mut bits: u32 = 0;
    let total_chars = (0o100u32 - decoded.count as u32) * 4;
    for idx in 0..total_chars {
        if idx % 4 == 0 {
            bits = cpu.read_word_raw(addr).magnitude;
            addr = (addr + 1) & 0o7777;
        }
        let code = ((bits >> 18) & 0o77) as u8;
        bits = (bits << 6) & 0x00FF_FFFF;
        if code != BLANK_CODE {
            buf.push(alphabet::output_char(code));
        }
    }
    let mut outcome = OpOutcome::new(format!("next addr:     {:04o}", addr));
    if !buf.is_empty() {
        outcome.printed = Some(buf);
    }
    outcome
}

pub(crate) fn rt(cpu: &mut Cpu, decoded: &DecodedInstruction) -> OpOutcome {
    if !cpu.has_tape() {
        cpu.set_running(false);
        return OpOutcome::new("No Tape in PTReader");
    }

    let mut addr = decoded.address;
    let words = 0o100u32 - decoded.count as u32;
    for _ in 0..words {
        let word = {
            let (reader, offset) = cpu.tape_mut().expect("tape presence checked above");
            tape::read_word(reader, offset)
        };
        match word {
            Ok(word) => {
                cpu.write_word_raw(addr, word);
                addr = (addr + 1) & 0o7777;
            }
            Err(TapeFault::Eof) => {
                cpu.take_tape_if_exhausted();
                break;
            }
            Err(TapeFault::Invalid { offset, byte }) => {
                cpu.set_running(false);
                return OpOutcome::new(format!(
                    "Unexpected PT character = 0x{:02X} at offset {}",
                    byte, offset
                ));
            }
        }
    }
    OpOutcome::new(format!("next addr:     {:04o}", addr))
}

pub(crate) fn ti(cpu: &mut Cpu, decoded: &DecodedInstruction, keyboard: &mut dyn Keyboard) -> OpOutcome {
    let mut addr = decoded.address;
    let total_chars = (0o100u32 - decoded.count as u32) * 4;
    let mut bits: u32 = 0;
    let mut echo = String::new();
    for idx in 0..total_chars {
        let code = loop {
            match keyboard.read_key() {
                KeyEvent::Interrupt => {
                    cpu.set_running(false);
                    let mut outcome = OpOutcome::new("Control-C");
                    if !echo.is_empty() {
                        outcome.printed = Some(echo);
                    }
                    return outcome;
                }
                KeyEvent::Char(c) => match alphabet::input_code(c) {
                    Some(code) => break code,
                    // Unmapped characters ring the bell and do not count
                    // towards this word's four characters.
                    None => echo.push('\u{7}'),
                },
            }
        };
        echo.push(alphabet::output_char(code));
        bits = (bits << 6) | code as u32;
        if idx % 4 == 3 {
            cpu.write_word_raw(addr, Word::new(false, bits));
            addr = (addr + 1) & 0o7777;
            bits = 0;
        }
    }
    let mut outcome = OpOutcome::new(format!("next addr:     {:04o}", addr));
    if !echo.is_empty() {
        outcome.printed = Some(echo);
    }
    outcome
}
