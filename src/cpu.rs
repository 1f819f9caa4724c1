//! CPU glue (component E) and supervisor surface (component G).

use std::io::Read;
use std::thread::sleep;
use std::time::Duration;

use rand::Rng;

use crate::decode::{decode_word, DecodedInstruction};
use crate::memory::Memory;
use crate::ops;
use crate::peripherals::keyboard::Keyboard;
use crate::word::Word;

/// Outcome of a single `step`, carrying the human-readable effect line that
/// mirrors the original's per-instruction return string, plus whatever this
/// instruction wrote to the teletype (Type Alpha), if anything.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub message: String,
    /// False when a breakpoint pre-empted fetch entirely.
    pub executed: bool,
    pub printed: Option<String>,
    /// "Read/Write Memory address Compare Stop @ NNNN" notices raised by
    /// any tapped access this instruction made. A hit halts the CPU but,
    /// like the original, does not abort the instruction in progress --
    /// an instruction touching several tapped words (TA, RT) can raise
    /// more than one notice in a single step.
    pub tap_notices: Vec<String>,
    /// PC at the moment of fetch, before the post-fetch increment. Used by
    /// `Cpu::render_trace_line`; meaningless when `executed` is false.
    pub fetch_pc: u16,
    /// The raw instruction word read at `fetch_pc`.
    pub fetch_word: Word,
}

/// Result of a register/memory dispatch handler, before the CPU wraps it
/// into a `StepOutcome`.
pub(crate) struct OpOutcome {
    pub message: String,
    pub printed: Option<String>,
}

impl OpOutcome {
    pub(crate) fn new(message: impl Into<String>) -> OpOutcome {
        OpOutcome {
            message: message.into(),
            printed: None,
        }
    }
}

/// An attached paper-tape stream plus its cumulative byte offset, tracked
/// for the life of the attachment (spec.md §6.2: "the tape handle's byte
/// offset is only observable in error messages") and not reset between RT
/// instructions -- a program typically issues many RT calls against the
/// same tape, and an invalid-byte diagnostic must report the tape's true
/// position, matching `digiac.py`'s `self.ptr.tell()`.
struct AttachedTape {
    reader: Box<dyn Read>,
    offset: u64,
}

pub struct Cpu {
    pub(crate) memory: Memory,
    pub pc: u16,
    pub a: Word,
    pub b: Word,
    instruction_count: u64,
    ips: u32,
    tape: Option<AttachedTape>,
    breakpoints: std::collections::BTreeSet<u16>,
    running: bool,
    tap_notices: Vec<String>,
    /// Supervisor-owned tracing bitmask (spec.md §4.5's "read/write trace
    /// flags"); bit 0 means "render a trace line for every instruction"
    /// rather than only the last one of a run, matching `sim3080.py`'s
    /// `digi_trace`. The core never consults this bit itself -- it only
    /// stores it and renders lines on request, per spec.md's instrumentation
    /// hooks being driven by the supervisor.
    trace_flags: u32,
}

impl Cpu {
    pub fn new_randomized(rng: &mut impl Rng) -> Cpu {
        Cpu {
            memory: Memory::new_randomized(rng),
            pc: 0,
            a: Word::POSITIVE_ZERO,
            b: Word::POSITIVE_ZERO,
            instruction_count: 0,
            ips: 60,
            tape: None,
            breakpoints: std::collections::BTreeSet::new(),
            running: true,
            tap_notices: Vec::new(),
            trace_flags: 0,
        }
    }

    pub fn new_zeroed() -> Cpu {
        Cpu {
            memory: Memory::new_zeroed(),
            pc: 0,
            a: Word::POSITIVE_ZERO,
            b: Word::POSITIVE_ZERO,
            instruction_count: 0,
            ips: 60,
            tape: None,
            breakpoints: std::collections::BTreeSet::new(),
            running: true,
            tap_notices: Vec::new(),
            trace_flags: 0,
        }
    }

    pub fn trace_flags(&self) -> u32 {
        self.trace_flags
    }

    pub fn set_trace_flags(&mut self, flags: u32) {
        self.trace_flags = flags;
    }

    /// Renders one trace line for a just-executed step, matching the
    /// original's `"{instr_cnt: 5d}  {pc:04o}: {inst:08o} .. {result}"` shape
    /// (two spaces between the instruction count and the PC field).
    pub fn render_trace_line(&self, outcome: &StepOutcome) -> String {
        format!(
            "{:5}  {:04o}: {:08o} .. {}",
            self.instruction_count,
            outcome.fetch_pc,
            outcome.fetch_word.magnitude,
            outcome.message
        )
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn set_running(&mut self, running: bool) {
        self.running = running;
    }

    pub fn instruction_count(&self) -> u64 {
        self.instruction_count
    }

    pub fn ips(&self) -> u32 {
        self.ips
    }

    pub fn set_ips(&mut self, ips: u32) {
        self.ips = ips;
    }

    pub fn set_breakpoint(&mut self, addr: u16) {
        self.breakpoints.insert(addr);
    }

    pub fn clear_breakpoint(&mut self, addr: u16) {
        self.breakpoints.remove(&addr);
    }

    pub fn sorted_breakpoints(&self) -> Vec<u16> {
        self.breakpoints.iter().copied().collect()
    }

    pub fn set_address_compare_stop(&mut self, addr: u16) {
        self.memory.set_tap(addr);
    }

    pub fn clear_address_compare_stop(&mut self, addr: u16) {
        self.memory.clear_tap(addr);
    }

    pub fn sorted_address_compare_stops(&self) -> Vec<u16> {
        self.memory.sorted_taps()
    }

    pub fn attach_tape(&mut self, reader: Box<dyn Read>) {
        self.tape = Some(AttachedTape { reader, offset: 0 });
    }

    pub fn detach_tape(&mut self) {
        self.tape = None;
    }

    pub fn has_tape(&self) -> bool {
        self.tape.is_some()
    }

    pub fn examine_register_a(&self) -> Word {
        self.a
    }

    pub fn examine_register_b(&self) -> Word {
        self.b
    }

    pub fn deposit_register_a(&mut self, value: Word) {
        self.a = value;
    }

    pub fn deposit_register_b(&mut self, value: Word) {
        self.b = value;
    }

    pub fn examine_memory(&self, addr: u16) -> Word {
        self.memory.peek(addr)
    }

    pub fn deposit_memory(&mut self, addr: u16, value: Word) {
        self.memory.poke(addr, value);
    }

    /// Executes exactly one instruction, unless a breakpoint at the current
    /// PC pre-empts the fetch. Breakpoints are always checked, never lifted.
    pub fn step(&mut self, keyboard: &mut dyn Keyboard) -> StepOutcome {
        let pc = self.pc;
        if self.breakpoints.contains(&pc) {
            self.running = false;
            return StepOutcome {
                message: format!("Breakpoint at {:04o}", pc),
                executed: false,
                printed: None,
                tap_notices: Vec::new(),
                fetch_pc: pc,
                fetch_word: Word::POSITIVE_ZERO,
            };
        }
        self.step_unconditionally(keyboard)
    }

    /// Fetches and dispatches without consulting breakpoints at all. Used
    /// directly by `step_n` once it has decided whether to lift the
    /// breakpoint at the current PC for this one call.
    fn step_unconditionally(&mut self, keyboard: &mut dyn Keyboard) -> StepOutcome {
        if self.ips != 0 {
            sleep(Duration::from_secs_f64(1.0 / self.ips as f64));
        }
        self.tap_notices.clear();
        let fetch_pc = self.pc;
        let word = self.read_tapped(self.pc, "Read");
        self.pc = (self.pc + 1) % crate::memory::WORD_COUNT as u16;
        self.instruction_count += 1;

        let decoded = decode_word(word);
        let outcome = ops::dispatch(self, &decoded, keyboard);
        StepOutcome {
            message: outcome.message,
            executed: true,
            printed: outcome.printed,
            tap_notices: std::mem::take(&mut self.tap_notices),
            fetch_pc,
            fetch_word: word,
        }
    }

    /// Tapped read used for instruction fetch and TA/RT word transfers:
    /// raises a tap notice and halts the CPU on a hit, but still returns
    /// the word, matching the original's `rm` (it never aborts the access).
    fn read_tapped(&mut self, addr: u16, label: &str) -> Word {
        let (word, hit) = self.memory.read_tapped(addr);
        if hit {
            self.running = false;
            self.tap_notices
                .push(format!("{} Memory address Compare Stop @ {:04o}", label, addr));
        }
        word
    }

    /// Tapped write counterpart to `read_tapped`.
    fn write_tapped(&mut self, addr: u16, value: Word, label: &str) {
        let hit = self.memory.write_tapped(addr, value);
        if hit {
            self.running = false;
            self.tap_notices
                .push(format!("{} Memory address Compare Stop @ {:04o}", label, addr));
        }
    }

    /// Runs until halted, one instruction at a time, honoring breakpoints
    /// on every fetch. This backs the supervisor's Go command: an armed
    /// breakpoint at the current PC halts immediately rather than being
    /// lifted, per the worked "Go while parked on a breakpoint" scenario.
    pub fn go(&mut self, keyboard: &mut dyn Keyboard) -> Vec<StepOutcome> {
        let mut outcomes = Vec::new();
        while self.running {
            let outcome = self.step(keyboard);
            let executed = outcome.executed;
            outcomes.push(outcome);
            if !executed {
                break;
            }
        }
        outcomes
    }

    /// Executes `count` instructions, temporarily lifting a breakpoint at
    /// the current PC for the duration of this call only (so a Step issued
    /// while parked on a breakpoint still executes instead of refusing to
    /// move, then the breakpoint re-arms once the call returns).
    pub fn step_n(&mut self, count: u32, keyboard: &mut dyn Keyboard) -> Vec<StepOutcome> {
        let lifted = self.breakpoints.remove(&self.pc);
        let mut outcomes = Vec::with_capacity(count as usize);
        for _ in 0..count {
            if !self.running {
                break;
            }
            outcomes.push(self.step_unconditionally(keyboard));
        }
        if lifted {
            self.breakpoints.insert(self.pc);
        }
        outcomes
    }

    pub fn render_status(&self) -> String {
        let instr = self.memory.peek(self.pc);
        let mut s = format!(
            "Digiac< PC: {:04o}->{:08o} A: {} B: {} Icnt: {} IPS: {}",
            self.pc,
            instr.magnitude,
            self.a.render_octal(),
            self.b.render_octal(),
            self.instruction_count,
            self.ips
        );
        let breakpoints = self.sorted_breakpoints();
        if !breakpoints.is_empty() {
            s.push_str(" bpt");
            for b in breakpoints {
                s.push_str(&format!(":{:04o}", b));
            }
        }
        let taps = self.sorted_address_compare_stops();
        if !taps.is_empty() {
            s.push_str(" acs");
            for t in taps {
                s.push_str(&format!(":{:04o}", t));
            }
        }
        s.push('>');
        s
    }

    pub(crate) fn fetch_argument(&mut self, decoded: &DecodedInstruction) -> Word {
        let word = self.read_tapped(decoded.address, "Read");
        let magnitude = crate::modifier::shift_magnitude(word.magnitude, decoded.count);
        let sign = decoded.sign_modifier.apply(word.sign);
        Word::new(sign, magnitude)
    }

    pub(crate) fn store_register(&mut self, decoded: &DecodedInstruction, reg: Word) -> String {
        let sign = decoded.sign_modifier.apply(reg.sign);
        let magnitude = crate::modifier::shift_magnitude(reg.magnitude, decoded.count);
        let value = Word::new(sign, magnitude);
        self.write_tapped(decoded.address, value, "Write");
        format!("[{:04o}] <- {}", decoded.address, value.render_octal())
    }

    /// Raw tapped memory read, bypassing the shift/sign modifier unit.
    /// Used by TA/RT, which move whole words unmodified.
    pub(crate) fn read_word_raw(&mut self, addr: u16) -> Word {
        self.read_tapped(addr, "Read")
    }

    /// Raw tapped memory write, bypassing the shift/sign modifier unit.
    pub(crate) fn write_word_raw(&mut self, addr: u16, value: Word) {
        self.write_tapped(addr, value, "Write");
    }

    /// The tape's reader and its running byte offset, threaded through
    /// every RT call for the life of the attachment.
    pub(crate) fn tape_mut(&mut self) -> Option<(&mut dyn Read, &mut u64)> {
        self.tape
            .as_mut()
            .map(|t| (t.reader.as_mut(), &mut t.offset))
    }

    pub(crate) fn take_tape_if_exhausted(&mut self) {
        self.tape = None;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::peripherals::keyboard::NullKeyboard;

    fn word_with(opcode: u8, count: u8, address: u16) -> Word {
        let bits = ((opcode as u32 & 0o77) << 18)
            | ((count as u32 & 0o77) << 12)
            | (address as u32 & 0o7777);
        Word::from_bits(bits)
    }

    #[test]
    fn halt_stops_the_run_loop_and_reports_pc() {
        let mut cpu = Cpu::new_zeroed();
        cpu.deposit_memory(0, word_with(0o00, 0, 0));
        let mut kb = NullKeyboard;
        let outcome = cpu.step(&mut kb);
        assert!(!cpu.is_running());
        assert_eq!(outcome.message, "HALTED at 0000");
        assert!(outcome.executed);
    }

    #[test]
    fn invalid_opcode_halts_and_still_counts() {
        let mut cpu = Cpu::new_zeroed();
        cpu.deposit_memory(0, word_with(0o01, 0, 0));
        let mut kb = NullKeyboard;
        let outcome = cpu.step(&mut kb);
        assert!(!cpu.is_running());
        assert_eq!(cpu.instruction_count(), 1);
        assert!(outcome.message.contains("Invalid or Unknown OPCODE"));
    }

    #[test]
    fn breakpoint_preempts_fetch_and_does_not_count() {
        let mut cpu = Cpu::new_zeroed();
        cpu.deposit_memory(0, word_with(0o00, 0, 0));
        cpu.set_breakpoint(0);
        let mut kb = NullKeyboard;
        let outcome = cpu.step(&mut kb);
        assert!(!outcome.executed);
        assert_eq!(cpu.instruction_count(), 0);
        assert_eq!(outcome.message, "Breakpoint at 0000");
    }

    #[test]
    fn step_n_lifts_breakpoint_for_exactly_one_call() {
        let mut cpu = Cpu::new_zeroed();
        cpu.set_ips(0);
        // JMP 0 at address 0 loops forever; halt the test after one step.
        cpu.deposit_memory(0, word_with(0o00, 0, 0));
        cpu.set_breakpoint(0);
        let mut kb = NullKeyboard;
        let outcomes = cpu.step_n(1, &mut kb);
        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].executed);
        assert!(cpu.sorted_breakpoints().contains(&0));
    }

    #[test]
    fn go_halts_immediately_on_an_armed_breakpoint() {
        let mut cpu = Cpu::new_zeroed();
        cpu.set_ips(0);
        cpu.set_breakpoint(0);
        let mut kb = NullKeyboard;
        let outcomes = cpu.go(&mut kb);
        assert_eq!(outcomes.len(), 1);
        assert!(!outcomes[0].executed);
        assert_eq!(cpu.instruction_count(), 0);
    }

    #[test]
    fn examine_and_deposit_do_not_trip_address_compare_stops() {
        let mut cpu = Cpu::new_zeroed();
        cpu.set_address_compare_stop(5);
        cpu.deposit_memory(5, Word::new(false, 9));
        assert_eq!(cpu.examine_memory(5), Word::new(false, 9));
        assert!(cpu.is_running());
    }

    #[test]
    fn trace_flags_round_trip_and_default_to_zero() {
        let mut cpu = Cpu::new_zeroed();
        assert_eq!(cpu.trace_flags(), 0);
        cpu.set_trace_flags(1);
        assert_eq!(cpu.trace_flags(), 1);
    }

    #[test]
    fn render_trace_line_matches_the_original_shape() {
        let mut cpu = Cpu::new_zeroed();
        cpu.deposit_memory(0, word_with(0o00, 0, 0));
        let mut kb = NullKeyboard;
        let outcome = cpu.step(&mut kb);
        let line = cpu.render_trace_line(&outcome);
        assert_eq!(line, "    1  0000: 00000000 .. HALTED at 0001");
    }
}
