// Copyright (C) 2013-2017 The Spa Project.
//
// fee.rs file belongs to the spa project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! Per-appendix fee schedules.

/// A fee schedule attached to an appendix kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fee {
    /// No fee.
    None,
    /// `constant_fee + ceil(size / unit_size) * fee_per_unit`.
    SizeBased {
        constant_fee: i64,
        fee_per_unit: i64,
        unit_size: u32,
    },
}

impl Fee {
    /// A size-based schedule. `unit_size` must be at least 1.
    pub fn size_based(constant_fee: i64, fee_per_unit: i64, unit_size: u32) -> Self {
        debug_assert!(unit_size >= 1);
        Self::SizeBased {
            constant_fee,
            fee_per_unit,
            unit_size,
        }
    }

    /// Evaluates the schedule against an effective size in bytes.
    ///
    /// All arithmetic is checked; `None` signals 63-bit overflow, which the
    /// enclosing transaction must treat as a validation failure. Sizes at or
    /// below zero contribute no units.
    pub fn compute(&self, size: i64) -> Option<i64> {
        match *self {
            Fee::None => Some(0),
            Fee::SizeBased {
                constant_fee,
                fee_per_unit,
                unit_size,
            } => {
                let unit_size = i64::from(unit_size);
                let units = if size <= 0 {
                    0
                } else {
                    (size - 1) / unit_size + 1
                };
                constant_fee.checked_add(units.checked_mul(fee_per_unit)?)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ONE_SPA: i64 = 100_000_000;

    #[test]
    fn test_none_is_zero() {
        assert_eq!(Fee::None.compute(1_000_000), Some(0));
    }

    #[test]
    fn test_size_based_rounds_up() {
        let fee = Fee::size_based(0, ONE_SPA, 32);
        assert_eq!(fee.compute(0), Some(0));
        assert_eq!(fee.compute(1), Some(ONE_SPA));
        assert_eq!(fee.compute(32), Some(ONE_SPA));
        assert_eq!(fee.compute(33), Some(2 * ONE_SPA));
        assert_eq!(fee.compute(64), Some(2 * ONE_SPA));
    }

    #[test]
    fn test_constant_part_added() {
        let fee = Fee::size_based(ONE_SPA, ONE_SPA, 32);
        assert_eq!(fee.compute(0), Some(ONE_SPA));
        assert_eq!(fee.compute(40), Some(3 * ONE_SPA));
    }

    #[test]
    fn test_negative_size_contributes_nothing() {
        let fee = Fee::size_based(ONE_SPA, ONE_SPA, 32);
        assert_eq!(fee.compute(-16), Some(ONE_SPA));
    }

    #[test]
    fn test_monotonic_in_size() {
        let fee = Fee::size_based(0, ONE_SPA / 10, 32);
        let mut last = 0;
        for size in 0..256 {
            let current = fee.compute(size).unwrap();
            assert!(current >= last, "fee must not decrease at size {size}");
            last = current;
        }
    }

    #[test]
    fn test_overflow_is_reported() {
        let fee = Fee::size_based(0, i64::MAX, 2);
        assert_eq!(fee.compute(100), None);

        let fee = Fee::size_based(i64::MAX, 1, 1);
        assert_eq!(fee.compute(1), None);
    }
}
