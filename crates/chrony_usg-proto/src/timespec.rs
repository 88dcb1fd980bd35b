// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

use crate::protocol::ConstPackedSizeBytes;
#[cfg(feature = "std")]
use std::time;

/// Largest nanosecond value a decoded timespec will report.
pub const MAX_NANOS: u32 = 999_999_999;

/// High-word marker chronyd writes when it has no seconds above 32 bits.
pub const NO_HIGH_SECONDS: u32 = 0x7fff_ffff;

/// chronyd's timespec wire format: seconds since the Unix epoch split into
/// two 32-bit words, followed by a nanosecond field.
///
/// ### Layout
///
/// ```ignore
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                        Seconds (high)                         |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                        Seconds (low)                          |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                         Nanoseconds                           |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct Timespec {
    /// Upper 32 bits of the seconds value.
    pub sec_high: u32,
    /// Lower 32 bits of the seconds value.
    pub sec_low: u32,
    /// Nanoseconds; not validated on the wire.
    pub nsec: u32,
}

impl Timespec {
    /// Build a timespec from whole seconds and nanoseconds since the Unix epoch.
    pub fn new(secs: u64, nsec: u32) -> Self {
        Timespec {
            sec_high: (secs >> 32) as u32,
            sec_low: secs as u32,
            nsec,
        }
    }

    /// Whole seconds since the Unix epoch.
    pub fn epoch_seconds(&self) -> u64 {
        let high = if self.sec_high == NO_HIGH_SECONDS {
            0
        } else {
            self.sec_high
        };
        ((high as u64) << 32) | self.sec_low as u64
    }

    /// Sub-second nanoseconds, clamped to [`MAX_NANOS`].
    pub fn subsec_nanos(&self) -> u32 {
        self.nsec.min(MAX_NANOS)
    }

    /// Seconds since the Unix epoch as an `f64`, including the clamped fraction.
    pub fn as_secs_f64(&self) -> f64 {
        self.epoch_seconds() as f64 + self.subsec_nanos() as f64 / 1e9
    }

    /// Convert to a [`std::time::SystemTime`].
    ///
    /// Returns `None` when the seconds value lies beyond what the platform's
    /// `SystemTime` can represent.
    #[cfg(feature = "std")]
    pub fn to_system_time(&self) -> Option<time::SystemTime> {
        time::UNIX_EPOCH.checked_add(time::Duration::new(
            self.epoch_seconds(),
            self.subsec_nanos(),
        ))
    }
}

impl ConstPackedSizeBytes for Timespec {
    const PACKED_SIZE_BYTES: usize = 12;
}

#[cfg(feature = "std")]
impl From<time::SystemTime> for Timespec {
    fn from(t: time::SystemTime) -> Self {
        let since_epoch = t.duration_since(time::UNIX_EPOCH).unwrap_or_default();
        Timespec::new(since_epoch.as_secs(), since_epoch.subsec_nanos())
    }
}
