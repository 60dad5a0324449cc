use byte_unit::{Byte, Unit, UnitType};

/// Human-readable size with binary units, capped at TiB.
///
/// Bytes print as an integer (`"512 B"`); every larger unit gets one decimal
/// place (`"1.5 KiB"`).
pub fn bytes_human(n: u64) -> String {
    let byte = Byte::from_u64(n);
    let adjusted = match byte.get_appropriate_unit(UnitType::Binary).get_unit() {
        Unit::B | Unit::KiB | Unit::MiB | Unit::GiB | Unit::TiB => {
            byte.get_appropriate_unit(UnitType::Binary)
        }
        _ => byte.get_adjusted_unit(Unit::TiB),
    };
    match adjusted.get_unit() {
        Unit::B => format!("{} B", n),
        unit => format!("{:.1} {}", adjusted.get_value(), unit),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn formats_reference_values() {
        assert_eq!(bytes_human(0), "0 B");
        assert_eq!(bytes_human(1), "1 B");
        assert_eq!(bytes_human(1023), "1023 B");
        assert_eq!(bytes_human(1024), "1.0 KiB");
        assert_eq!(bytes_human(1536), "1.5 KiB");
        assert_eq!(bytes_human(51200), "50.0 KiB");
        assert_eq!(bytes_human(1_048_576), "1.0 MiB");
        assert_eq!(bytes_human(1_073_741_824), "1.0 GiB");
        assert_eq!(bytes_human(1u64 << 40), "1.0 TiB");
    }

    #[test]
    fn caps_at_tebibytes() {
        assert_eq!(bytes_human(1u64 << 50), "1024.0 TiB");
    }

    proptest! {
        #[test]
        fn below_one_kib_is_integer_bytes(n in 0u64..1024) {
            prop_assert_eq!(bytes_human(n), format!("{} B", n));
        }

        #[test]
        fn larger_values_carry_one_decimal(n in 1024u64..u64::MAX / 2) {
            let s = bytes_human(n);
            let (value, unit) = s.split_once(' ').unwrap();
            prop_assert!(["KiB", "MiB", "GiB", "TiB"].contains(&unit));
            let (_, frac) = value.split_once('.').unwrap();
            prop_assert_eq!(frac.len(), 1);
        }
    }
}
