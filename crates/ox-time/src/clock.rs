//! Process-wide clock state

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// FILETIME value of the Unix epoch (1970-01-01 in 100 ns since 1601-01-01).
pub const UNIX_EPOCH_FILETIME: u64 = 116_444_736_000_000_000;

static GUEST_TICK_FREQUENCY: AtomicU64 = AtomicU64::new(50_000_000);
static GUEST_SYSTEM_TIME_BASE: AtomicU64 = AtomicU64::new(0);
static HOST_SYSTEM_TIME_BASE: AtomicU64 = AtomicU64::new(0);
// f64 scalar stored as raw bits.
static GUEST_TIME_SCALAR: AtomicU64 = AtomicU64::new(0x3FF0_0000_0000_0000); // 1.0
static NO_SCALING: AtomicBool = AtomicBool::new(false);

/// Process-wide scaled clock.
///
/// `set_guest_system_time_base` pins the guest clock to a FILETIME value;
/// from then on guest time advances by the host delta multiplied by the
/// guest time scalar (unless scaling is disabled).
pub struct Clock;

impl Clock {
    /// Host time as FILETIME (100 ns intervals since 1601-01-01 UTC).
    pub fn query_host_system_time() -> u64 {
        let since_unix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        UNIX_EPOCH_FILETIME + (since_unix.as_nanos() / 100) as u64
    }

    /// Guest time as FILETIME: the configured base plus the scaled host
    /// delta since the base was set.
    pub fn query_guest_system_time() -> u64 {
        let base = GUEST_SYSTEM_TIME_BASE.load(Ordering::Acquire);
        if base == 0 {
            return Self::query_host_system_time();
        }
        let host_base = HOST_SYSTEM_TIME_BASE.load(Ordering::Acquire);
        let delta = Self::query_host_system_time().saturating_sub(host_base);
        let delta = if Self::no_scaling() {
            delta
        } else {
            (delta as f64 * Self::guest_time_scalar()) as u64
        };
        base + delta
    }

    pub fn guest_tick_frequency() -> u64 {
        GUEST_TICK_FREQUENCY.load(Ordering::Relaxed)
    }

    pub fn set_guest_tick_frequency(frequency: u64) {
        GUEST_TICK_FREQUENCY.store(frequency, Ordering::Relaxed);
    }

    pub fn set_guest_system_time_base(base: u64) {
        HOST_SYSTEM_TIME_BASE.store(Self::query_host_system_time(), Ordering::Release);
        GUEST_SYSTEM_TIME_BASE.store(base, Ordering::Release);
    }

    pub fn guest_time_scalar() -> f64 {
        f64::from_bits(GUEST_TIME_SCALAR.load(Ordering::Relaxed))
    }

    pub fn set_guest_time_scalar(scalar: f64) {
        GUEST_TIME_SCALAR.store(scalar.to_bits(), Ordering::Relaxed);
    }

    pub fn no_scaling() -> bool {
        NO_SCALING.load(Ordering::Relaxed)
    }

    pub fn set_no_scaling(value: bool) {
        NO_SCALING.store(value, Ordering::Relaxed);
    }

    /// Convert a guest-relative millisecond duration to host milliseconds.
    pub fn scale_guest_duration_millis(millis: u32) -> u32 {
        if Self::no_scaling() {
            millis
        } else {
            (millis as f64 * Self::guest_time_scalar()) as u32
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_time_after_unix_epoch() {
        assert!(Clock::query_host_system_time() > UNIX_EPOCH_FILETIME);
    }

    #[test]
    fn test_scale_identity() {
        Clock::set_guest_time_scalar(1.0);
        Clock::set_no_scaling(false);
        assert_eq!(Clock::scale_guest_duration_millis(100), 100);
        Clock::set_no_scaling(true);
        assert_eq!(Clock::scale_guest_duration_millis(100), 100);
        Clock::set_no_scaling(false);
    }
}
