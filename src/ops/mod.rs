//! Opcode handlers, split by family the way the teacher splits its
//! `opcodes_move`/`opcodes_jump`/`opcodes_logical` modules.

mod arithmetic;
mod branch;
mod io;
mod memory_ops;

use crate::cpu::{Cpu, OpOutcome};
use crate::decode::{DecodedInstruction, OpcodeGroup};
use crate::peripherals::keyboard::Keyboard;

pub(crate) fn dispatch(
    cpu: &mut Cpu,
    decoded: &DecodedInstruction,
    keyboard: &mut dyn Keyboard,
) -> OpOutcome {
    match decoded.group {
        OpcodeGroup::Halt => arithmetic::hlt(cpu),
        OpcodeGroup::And => arithmetic::and(cpu, decoded),
        OpcodeGroup::ClearAdd => arithmetic::cla(cpu, decoded),
        OpcodeGroup::AddSub => arithmetic::add(cpu, decoded),
        OpcodeGroup::Multiply => arithmetic::mlt(cpu, decoded),
        OpcodeGroup::Divide => arithmetic::div(cpu, decoded),
        OpcodeGroup::StoreA => memory_ops::sta(cpu, decoded),
        OpcodeGroup::StoreB => memory_ops::stb(cpu, decoded),
        OpcodeGroup::Jump => branch::jmp(cpu, decoded),
        OpcodeGroup::BranchMinus => branch::br_minus(cpu, decoded),
        OpcodeGroup::BranchPlus => branch::br_plus(cpu, decoded),
        OpcodeGroup::BranchZero => branch::brz(cpu, decoded),
        OpcodeGroup::TypeAlpha => io::ta(cpu, decoded),
        OpcodeGroup::ReadTape => io::rt(cpu, decoded),
        OpcodeGroup::TypeIn => io::ti(cpu, decoded, keyboard),
        OpcodeGroup::Invalid => {
            cpu.set_running(false);
            OpOutcome::new(format!(
                "Invalid or Unknown OPCODE {:08o} at {:04o}",
                instruction_bits(decoded),
                cpu.pc.wrapping_sub(1) % crate::memory::WORD_COUNT as u16,
            ))
        }
    }
}

fn instruction_bits(decoded: &DecodedInstruction) -> u32 {
    ((decoded.opcode as u32) << 18) | ((decoded.count as u32) << 12) | decoded.address as u32
}
