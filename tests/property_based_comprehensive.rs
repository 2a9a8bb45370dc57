//! Property-based tests for the probe's classification and debounce invariants
//!
//! Core properties tested:
//! 1. Hit iff latency < threshold
//! 2. kpause resets on every candidate hit and counts misses one by one
//! 3. A report happens iff a hit arrives with kpause above the gate
//! 4. keystate flips exactly once per report
//! 5. Hex offsets parse like sscanf("%x"), signs and raw bytes included

use evict_reload::config::ProbeConfig;
use evict_reload::probe::{classify, Classification, Measurement, Observation, RunState};
use evict_reload::target::parse_hex_offset;
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn prop_hit_iff_below_default_threshold(latency in any::<u64>()) {
        let expected = if latency < 100 { Classification::Hit } else { Classification::Miss };
        prop_assert_eq!(classify(latency, 100), expected);
    }

    #[test]
    fn prop_hit_iff_below_any_threshold(latency in any::<u64>(), threshold in any::<u64>()) {
        prop_assert_eq!(classify(latency, threshold) == Classification::Hit, latency < threshold);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_run_state_follows_debounce_rules(
        latencies in prop::collection::vec(prop_oneof![0u64..100, 100u64..400], 0..400),
        debounce in 0u64..20,
    ) {
        let config = ProbeConfig::new().with_debounce_loops(debounce);
        let mut state = RunState::new(0);
        let mut reports = 0u64;

        for (i, latency) in latencies.iter().enumerate() {
            let before = state;
            let t0 = (i as u64) * 1000;
            let observation = state.observe(&Measurement { t0, t1: t0 + latency }, &config);

            if *latency < 100 {
                prop_assert_eq!(state.kpause(), 0);
                if before.kpause() > debounce {
                    reports += 1;
                    prop_assert!(matches!(observation, Observation::Reported(r) if r.idle == before.kpause()));
                    prop_assert_eq!(state.keystate(), before.keystate() ^ 1);
                } else {
                    prop_assert_eq!(observation, Observation::Suppressed);
                    prop_assert_eq!(state.keystate(), before.keystate());
                }
            } else {
                prop_assert_eq!(observation, Observation::Miss);
                prop_assert_eq!(state.kpause(), before.kpause() + 1);
                prop_assert_eq!(state.keystate(), before.keystate());
            }
            prop_assert!(state.keystate() <= 1);
        }

        prop_assert_eq!(u64::from(state.keystate()), reports % 2);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn prop_hex_offset_roundtrips_formatted_value(value in any::<u64>(), prefixed in any::<bool>(), upper in any::<bool>()) {
        let digits = if upper { format!("{:X}", value) } else { format!("{:x}", value) };
        let input = if prefixed { format!("0x{}", digits) } else { digits };
        prop_assert_eq!(parse_hex_offset(&input), value);
    }

    #[test]
    fn prop_hex_offset_sign_follows_strtoul(value in any::<u64>(), prefixed in any::<bool>(), negative in any::<bool>()) {
        let digits = if prefixed { format!("0x{:x}", value) } else { format!("{:x}", value) };
        let sign = if negative { "-" } else { "+" };
        let expected = if negative { value.wrapping_neg() } else { value };
        prop_assert_eq!(parse_hex_offset(format!("{}{}", sign, digits)), expected);
    }

    #[test]
    fn prop_hex_offset_non_utf8_tail_is_ignored(value in any::<u64>(), tail in prop::collection::vec(0x80u8..=0xff, 1..8)) {
        let mut bytes = format!("{:x}", value).into_bytes();
        bytes.extend(tail);
        prop_assert_eq!(parse_hex_offset(&bytes), value);
    }

    #[test]
    fn prop_hex_offset_without_digits_is_zero(input in "[g-wyzG-WYZ!@#%^&*_ -]{0,12}") {
        prop_assert_eq!(parse_hex_offset(&input), 0);
    }

    #[test]
    fn prop_hex_offset_ignores_trailing_garbage(value in 0u64..0xffff_ffff, tail in "[g-z]{1,6}") {
        prop_assert_eq!(parse_hex_offset(&format!("{:x}{}", value, tail)), value);
    }
}
