//! HLT, AND, CLA/CLS, ADD/SUB, MLT, DIV.

use crate::cpu::{Cpu, OpOutcome};
use crate::decode::DecodedInstruction;
use crate::word::Word;

pub(crate) fn hlt(cpu: &mut Cpu) -> OpOutcome {
    cpu.set_running(false);
    // Reports the already-incremented PC, not the address HLT was fetched
    // from -- matching the original's instruction flow, where this message
    // is built after the PC has advanced.
    OpOutcome::new(format!("HALTED at {:04o}", cpu.pc))
}

pub(crate) fn and(cpu: &mut Cpu, decoded: &DecodedInstruction) -> OpOutcome {
    let arg = cpu.fetch_argument(decoded);
    // The result's sign is A's own sign when the fetched argument is
    // negative, and positive when the fetched argument is positive --
    // the fetched argument's sign never survives into the result directly.
    let sign = if arg.sign { cpu.a.sign } else { false };
    let magnitude = arg.magnitude & cpu.a.magnitude;
    cpu.a = Word::new(sign, magnitude);
    OpOutcome::new(format!("A      <- {}", cpu.a.render_octal()))
}

pub(crate) fn cla(cpu: &mut Cpu, decoded: &DecodedInstruction) -> OpOutcome {
    let arg = cpu.fetch_argument(decoded);
    cpu.a = arg;
    OpOutcome::new(format!("A      <- {}", cpu.a.render_octal()))
}

pub(crate) fn add(cpu: &mut Cpu, decoded: &DecodedInstruction) -> OpOutcome {
    let arg = cpu.fetch_argument(decoded);
    let accum = cpu.a.signed_value() + arg.signed_value();
    cpu.a = Word::from_signed(accum);
    OpOutcome::new(format!("A      <- {}", cpu.a.render_octal()))
}

pub(crate) fn mlt(cpu: &mut Cpu, decoded: &DecodedInstruction) -> OpOutcome {
    let arg = cpu.fetch_argument(decoded);
    let product = (cpu.a.magnitude as u64) * (arg.magnitude as u64);
    let sign = cpu.a.sign != arg.sign;
    let high = ((product >> 24) & 0x00FF_FFFF) as u32;
    let low = (product & 0x00FF_FFFF) as u32;
    cpu.a = Word::new(sign, high);
    cpu.b = Word::new(sign, low);
    OpOutcome::new(format!(
        "AB: {}{:08o} {:08o}",
        if sign { "-" } else { "+" },
        high,
        low
    ))
}

pub(crate) fn div(cpu: &mut Cpu, decoded: &DecodedInstruction) -> OpOutcome {
    let arg = cpu.fetch_argument(decoded);
    let sign = cpu.a.sign != arg.sign;
    if arg.magnitude == 0 {
        cpu.set_running(false);
        return OpOutcome::new("Divide by Zero Stop");
    }
    let dividend = (cpu.a.magnitude as u64) << 24;
    let quotient = ((dividend / arg.magnitude as u64) & 0x00FF_FFFF) as u32;
    let remainder = ((dividend % arg.magnitude as u64) & 0x00FF_FFFF) as u32;
    cpu.a = Word::new(sign, remainder);
    cpu.b = Word::new(sign, quotient);
    OpOutcome::new(format!(
        "AB: {}{:08o} {:08o}",
        if sign { "-" } else { "+" },
        remainder,
        quotient
    ))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::decode::{decode_word, SignModifier};

    fn decoded(opcode: u8, count: u8, address: u16) -> DecodedInstruction {
        let bits = ((opcode as u32 & 0o77) << 18)
            | ((count as u32 & 0o77) << 12)
            | (address as u32 & 0o7777);
        decode_word(Word::from_bits(bits))
    }

    #[test]
    fn and_takes_sign_from_a_when_argument_is_negative() {
        let mut cpu = Cpu::new_zeroed();
        cpu.a = Word::new(true, 0b1111);
        cpu.deposit_memory(0o10, Word::new(true, 0b1010));
        let outcome = and(&mut cpu, &decoded(0o04, 0, 0o10));
        assert_eq!(cpu.a, Word::new(true, 0b1010));
        assert_eq!(outcome.message, "A      <- -00000012");
    }

    #[test]
    fn and_is_positive_when_argument_is_positive() {
        let mut cpu = Cpu::new_zeroed();
        cpu.a = Word::new(true, 0b1111);
        cpu.deposit_memory(0o10, Word::new(false, 0b1010));
        and(&mut cpu, &decoded(0o04, 0, 0o10));
        assert_eq!(cpu.a, Word::new(false, 0b1010));
    }

    #[test]
    fn cla_loads_register_from_memory() {
        let mut cpu = Cpu::new_zeroed();
        cpu.deposit_memory(0o10, Word::new(true, 5));
        cla(&mut cpu, &decoded(0o10, 0, 0o10));
        assert_eq!(cpu.a, Word::new(true, 5));
    }

    #[test]
    fn cls_negates_via_sign_modifier() {
        let mut cpu = Cpu::new_zeroed();
        cpu.deposit_memory(0o10, Word::new(false, 5));
        let d = decoded(0o11, 0, 0o10);
        assert_eq!(d.sign_modifier, SignModifier::Negate);
        cla(&mut cpu, &d);
        assert_eq!(cpu.a, Word::new(true, 5));
    }

    #[test]
    fn add_sums_signed_values() {
        let mut cpu = Cpu::new_zeroed();
        cpu.a = Word::new(false, 10);
        cpu.deposit_memory(0o10, Word::new(true, 3));
        add(&mut cpu, &decoded(0o14, 0, 0o10));
        assert_eq!(cpu.a, Word::new(false, 7));
    }

    #[test]
    fn add_result_sign_reflects_negative_total() {
        let mut cpu = Cpu::new_zeroed();
        cpu.a = Word::new(false, 3);
        cpu.deposit_memory(0o10, Word::new(true, 10));
        add(&mut cpu, &decoded(0o14, 0, 0o10));
        assert_eq!(cpu.a, Word::new(true, 7));
    }

    #[test]
    fn mlt_splits_product_into_a_and_b() {
        let mut cpu = Cpu::new_zeroed();
        cpu.a = Word::new(false, 3);
        cpu.deposit_memory(0o10, Word::new(true, 4));
        let outcome = mlt(&mut cpu, &decoded(0o20, 0, 0o10));
        assert_eq!(cpu.a, Word::new(true, 0));
        assert_eq!(cpu.b, Word::new(true, 12));
        assert_eq!(outcome.message, "AB: -00000000 00000014");
    }

    #[test]
    fn div_halts_on_zero_divisor_leaving_registers_untouched() {
        let mut cpu = Cpu::new_zeroed();
        cpu.a = Word::new(false, 9);
        let b_before = cpu.b;
        cpu.deposit_memory(0o10, Word::new(false, 0));
        let outcome = div(&mut cpu, &decoded(0o24, 0, 0o10));
        assert!(!cpu.is_running());
        assert_eq!(cpu.a, Word::new(false, 9));
        assert_eq!(cpu.b, b_before);
        assert_eq!(outcome.message, "Divide by Zero Stop");
    }

    #[test]
    fn div_produces_quotient_in_b_and_remainder_in_a() {
        let mut cpu = Cpu::new_zeroed();
        cpu.a = Word::new(false, 10);
        cpu.deposit_memory(0o10, Word::new(false, 3));
        div(&mut cpu, &decoded(0o24, 0, 0o10));
        let dividend = 10u64 << 24;
        assert_eq!(cpu.b.magnitude, ((dividend / 3) & 0x00FF_FFFF) as u32);
        assert_eq!(cpu.a.magnitude, ((dividend % 3) & 0x00FF_FFFF) as u32);
    }
}
