//! Guest and host clock domains
//!
//! Two clocks in FILETIME units (100 ns since 1601-01-01): the host clock,
//! which maps 1:1 to the host system time, and the guest clock, which runs
//! from a configured base at a configurable speed. Conversion between the
//! two domains goes through fence-guarded paired samples.

pub mod calendar;
pub mod chrono;
pub mod clock;

pub use calendar::TimeFields;
pub use chrono::{guest_to_host, host_to_guest, WinSystemClock, XSystemClock};
pub use clock::Clock;
