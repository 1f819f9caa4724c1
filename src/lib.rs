//! Core emulator for the Digiac-3080: fetch/decode/execute loop, sign-magnitude
//! arithmetic, the shift-and-sign modifier unit shared by most instructions,
//! and the paper-tape/teletype peripheral bindings. The interactive shell that
//! drives this crate, file attach/detach plumbing, and the standalone tape
//! dump utility are external collaborators and live outside this crate.
#![allow(clippy::new_without_default)]

pub mod cpu;
pub mod decode;
pub mod memory;
pub mod modifier;
pub mod ops;
pub mod peripherals;
pub mod trace_log;
pub mod word;

pub use cpu::{Cpu, StepOutcome};
pub use word::Word;
