//! Host and guest system clock types
//!
//! Both clocks count 100 ns ticks since 1601-01-01. The host clock maps
//! 1:1 to the host system time; the guest clock adds a scaled delta on top
//! of the configured base. Cross-domain conversion samples both clocks
//! between acquire-release fences so the sample pair stays consistent
//! without taking a lock.

use std::marker::PhantomData;
use std::sync::atomic::{fence, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::clock::{Clock, UNIX_EPOCH_FILETIME};

/// Ticks of 100 ns.
pub type HundredNanos = i64;

/// A point on one of the two clock domains, in FILETIME units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimePoint<C> {
    ticks: i64,
    _domain: PhantomData<C>,
}

impl<C> TimePoint<C> {
    pub const fn from_ticks(ticks: i64) -> Self {
        Self {
            ticks,
            _domain: PhantomData,
        }
    }

    pub const fn ticks(self) -> i64 {
        self.ticks
    }

    pub fn add_ticks(self, delta: HundredNanos) -> Self {
        Self::from_ticks(self.ticks + delta)
    }
}

/// Unscaled host clock; FILETIME and `SystemTime` interop lives here.
#[derive(Debug, Clone, Copy)]
pub struct WinSystemClock;

/// Guest clock, scaled per the process clock configuration.
#[derive(Debug, Clone, Copy)]
pub struct XSystemClock;

impl WinSystemClock {
    pub fn now() -> TimePoint<WinSystemClock> {
        Self::from_file_time(Clock::query_host_system_time())
    }

    pub const fn from_file_time(filetime: u64) -> TimePoint<WinSystemClock> {
        TimePoint::from_ticks(filetime as i64)
    }

    pub const fn to_file_time(tp: TimePoint<WinSystemClock>) -> u64 {
        tp.ticks() as u64
    }

    /// Convert to host system time (panics never; pre-1970 values map below
    /// the Unix epoch).
    pub fn to_sys(tp: TimePoint<WinSystemClock>) -> SystemTime {
        let unix_ticks = tp.ticks() - UNIX_EPOCH_FILETIME as i64;
        if unix_ticks >= 0 {
            UNIX_EPOCH + Duration::from_nanos(unix_ticks as u64 * 100)
        } else {
            UNIX_EPOCH - Duration::from_nanos(unix_ticks.unsigned_abs() * 100)
        }
    }

    pub fn from_sys(time: SystemTime) -> TimePoint<WinSystemClock> {
        let unix_ticks = match time.duration_since(UNIX_EPOCH) {
            Ok(after) => (after.as_nanos() / 100) as i64,
            Err(err) => -((err.duration().as_nanos() / 100) as i64),
        };
        TimePoint::from_ticks(unix_ticks + UNIX_EPOCH_FILETIME as i64)
    }
}

impl XSystemClock {
    pub fn now() -> TimePoint<XSystemClock> {
        Self::from_file_time(Clock::query_guest_system_time())
    }

    pub const fn from_file_time(filetime: u64) -> TimePoint<XSystemClock> {
        TimePoint::from_ticks(filetime as i64)
    }

    pub const fn to_file_time(tp: TimePoint<XSystemClock>) -> u64 {
        tp.ticks() as u64
    }
}

fn scale_to_host(delta: HundredNanos) -> HundredNanos {
    if Clock::no_scaling() {
        delta
    } else {
        (delta as f64 * Clock::guest_time_scalar()).floor() as i64
    }
}

fn scale_to_guest(delta: HundredNanos) -> HundredNanos {
    if Clock::no_scaling() {
        delta
    } else {
        (delta as f64 / Clock::guest_time_scalar()).floor() as i64
    }
}

/// Convert a guest time point to the host domain.
pub fn guest_to_host(t: TimePoint<XSystemClock>) -> TimePoint<WinSystemClock> {
    fence(Ordering::AcqRel);
    let w_now = WinSystemClock::now();
    let x_now = XSystemClock::now();
    fence(Ordering::AcqRel);

    let delta = t.ticks() - x_now.ticks();
    w_now.add_ticks(scale_to_host(delta))
}

/// Convert a host time point to the guest domain.
pub fn host_to_guest(t: TimePoint<WinSystemClock>) -> TimePoint<XSystemClock> {
    fence(Ordering::AcqRel);
    let w_now = WinSystemClock::now();
    let x_now = XSystemClock::now();
    fence(Ordering::AcqRel);

    let delta = t.ticks() - w_now.ticks();
    x_now.add_ticks(scale_to_guest(delta))
}

#[cfg(test)]
mod tests {
    use super::*;

    // Known FILETIME constants, 100 ns intervals since 1601-01-01 UTC.
    const FT_NT_EPOCH: u64 = 0; // 1601-01-01
    const FT_UNIX_EPOCH: u64 = 116_444_736_000_000_000; // 1970-01-01
    const FT_Y2K: u64 = 125_911_584_000_000_000; // 2000-01-01
    const FT_2021: u64 = 132_539_328_000_000_000; // 2021-01-01

    #[test]
    fn test_unix_epoch_delta() {
        // 369 years from 1601 to 1970, with 89 leap days.
        let expected_seconds = (369u64 * 365 + 89) * 86_400;
        assert_eq!(UNIX_EPOCH_FILETIME, expected_seconds * 10_000_000);
    }

    #[test]
    fn test_file_time_round_trip() {
        for ft in [FT_NT_EPOCH, FT_UNIX_EPOCH, FT_Y2K, 2_650_467_743_990_000_000] {
            let tp = WinSystemClock::from_file_time(ft);
            assert_eq!(WinSystemClock::to_file_time(tp), ft);
        }
    }

    #[test]
    fn test_to_sys_known_values() {
        let tp = WinSystemClock::to_sys(WinSystemClock::from_file_time(FT_UNIX_EPOCH));
        assert_eq!(tp, UNIX_EPOCH);

        // 2000-01-01 is 10957 days after 1970-01-01.
        let tp = WinSystemClock::to_sys(WinSystemClock::from_file_time(FT_Y2K));
        assert_eq!(
            tp.duration_since(UNIX_EPOCH).unwrap().as_secs(),
            10_957 * 86_400
        );

        // 2021-01-01 is 18628 days after 1970-01-01.
        let tp = WinSystemClock::to_sys(WinSystemClock::from_file_time(FT_2021));
        assert_eq!(
            tp.duration_since(UNIX_EPOCH).unwrap().as_secs(),
            18_628 * 86_400
        );
    }

    #[test]
    fn test_from_sys_round_trip() {
        for ft in [FT_NT_EPOCH, FT_UNIX_EPOCH, FT_Y2K, FT_2021] {
            let nt = WinSystemClock::from_file_time(ft);
            let sys = WinSystemClock::to_sys(nt);
            let nt2 = WinSystemClock::from_sys(sys);
            assert_eq!(WinSystemClock::to_file_time(nt2), ft);
        }
    }

    #[test]
    fn test_cross_domain_identity_when_unscaled() {
        Clock::set_guest_time_scalar(1.0);
        Clock::set_no_scaling(true);
        let guest = XSystemClock::now();
        let host = guest_to_host(guest);
        let back = host_to_guest(host);
        // Unscaled conversion is delta-preserving up to the sampling skew
        // between the paired now() calls.
        assert!((back.ticks() - guest.ticks()).abs() < 10_000_000);
        Clock::set_no_scaling(false);
    }
}
