//! Property tests checking the add/sub flag formulas against a definition
//! computed independently via widened (64-bit) arithmetic, for arbitrary
//! operand pairs rather than just the seeded scenarios.

use arm_m0_emulator::devices::cpu::flags;
use proptest::prelude::*;

proptest! {
    #[test]
    fn add_carry_matches_widened_arithmetic(a in any::<u32>(), b in any::<u32>()) {
        let c = a.wrapping_add(b);
        let expected_carry = (a as u64) + (b as u64) > u32::MAX as u64;
        prop_assert_eq!(flags::add_carry(a, b, c), expected_carry);
    }

    #[test]
    fn add_overflow_matches_signed_widened_arithmetic(a in any::<u32>(), b in any::<u32>()) {
        let c = a.wrapping_add(b);
        let expected_overflow = (a as i32 as i64) + (b as i32 as i64) != c as i32 as i64;
        prop_assert_eq!(flags::add_overflow(a, b, c), expected_overflow);
    }

    #[test]
    fn sub_carry_matches_no_borrow_definition(a in any::<u32>(), b in any::<u32>()) {
        let c = a.wrapping_sub(b);
        let expected_carry = (a as u64) >= (b as u64);
        prop_assert_eq!(flags::sub_carry(a, b, c), expected_carry);
    }

    #[test]
    fn sub_overflow_matches_signed_widened_arithmetic(a in any::<u32>(), b in any::<u32>()) {
        let c = a.wrapping_sub(b);
        let expected_overflow = (a as i32 as i64) - (b as i32 as i64) != c as i32 as i64;
        prop_assert_eq!(flags::sub_overflow(a, b, c), expected_overflow);
    }
}
