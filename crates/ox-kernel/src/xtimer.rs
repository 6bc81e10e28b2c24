//! Guest timers
//!
//! One-shot and periodic timers scheduled in guest time. Firing enqueues
//! an APC onto the thread that armed the timer, carrying the guest system
//! time split across the two callback arguments.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use ox_core::status::XStatus;
use ox_time::{chrono, Clock};

use crate::state::KernelState;
use crate::xthread::XThread;

/// Timer kind, mirroring the guest creation argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerType {
    /// Manual-reset notification timer.
    Notification,
    /// Auto-reset synchronization timer.
    Synchronization,
}

impl TimerType {
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(TimerType::Notification),
            1 => Some(TimerType::Synchronization),
            _ => None,
        }
    }
}

pub struct XTimer {
    #[allow(dead_code)]
    kernel: Arc<KernelState>,
    timer_type: TimerType,
    // Bumped on every SetTimer/Cancel; a stale worker sees the mismatch
    // and stops firing.
    generation: AtomicU64,
    callback_thread: Mutex<Option<Arc<XThread>>>,
}

impl XTimer {
    pub fn new(kernel: Arc<KernelState>, timer_type: TimerType) -> Arc<Self> {
        Arc::new(Self {
            kernel,
            timer_type,
            generation: AtomicU64::new(0),
            callback_thread: Mutex::new(None),
        })
    }

    pub fn timer_type(&self) -> TimerType {
        self.timer_type
    }

    /// Arm the timer. Negative due times are relative 100 ns ticks in
    /// guest time; positive are absolute guest FILETIMEs. A non-zero
    /// period re-arms after each fire.
    pub fn set_timer(
        self: Arc<Self>,
        due_time: i64,
        period_ms: u32,
        routine: u32,
        routine_arg: u32,
        resume: bool,
    ) -> XStatus {
        // Callers probe for resume support explicitly.
        if resume {
            return XStatus::TIMER_RESUME_IGNORED;
        }

        let period_ms = Clock::scale_guest_duration_millis(period_ms);

        // Any timer implementation uses absolute times eventually; convert
        // as early as possible for accuracy.
        let due_host = if due_time < 0 {
            let after = chrono::XSystemClock::now().add_ticks(-due_time);
            chrono::guest_to_host(after)
        } else {
            chrono::guest_to_host(chrono::XSystemClock::from_file_time(due_time as u64))
        };

        let callback_thread = XThread::current();
        if callback_thread.is_none() {
            tracing::warn!(target: "kernel", "SetTimer outside a guest thread");
            return XStatus::UNSUCCESSFUL;
        }
        *self.callback_thread.lock() = callback_thread;

        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let timer = self.clone();
        let has_callback = routine != 0;

        std::thread::spawn(move || loop {
            let now = chrono::WinSystemClock::now();
            let wait_ticks = due_host.ticks().saturating_sub(now.ticks());
            if wait_ticks > 0 {
                std::thread::sleep(Duration::from_nanos(wait_ticks as u64 * 100));
            }
            if timer.generation.load(Ordering::Acquire) != generation {
                return;
            }

            if has_callback {
                timer.fire(routine, routine_arg);
            }

            if period_ms == 0 {
                return;
            }
            std::thread::sleep(Duration::from_millis(period_ms as u64));
            if timer.generation.load(Ordering::Acquire) != generation {
                return;
            }
        });

        XStatus::SUCCESS
    }

    fn fire(&self, routine: u32, routine_arg: u32) {
        // Queue an APC to call routine(arg, time_low, time_high); it runs
        // on the thread that armed the timer.
        let Some(thread) = self.callback_thread.lock().clone() else {
            tracing::warn!(target: "kernel", "Timer fired with no callback thread");
            return;
        };
        let time = Clock::query_guest_system_time();
        let time_low = time as u32;
        let time_high = (time >> 32) as u32;
        tracing::info!(
            target: "kernel",
            "XTimer enqueuing timer callback to {:08X}({:08X}, {:08X}, {:08X})",
            routine,
            routine_arg,
            time_low,
            time_high
        );
        thread.enqueue_apc(routine, routine_arg, time_low, time_high);
    }

    pub fn cancel(&self) -> XStatus {
        self.generation.fetch_add(1, Ordering::AcqRel);
        XStatus::SUCCESS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::Processor;
    use ox_core::config::RuntimeConfig;
    use ox_memory::GuestMemory;

    fn kernel() -> Arc<KernelState> {
        KernelState::new(
            Arc::new(GuestMemory::with_default_size()),
            Processor::new(0x8200_0000, 0x1000),
            RuntimeConfig::default(),
        )
    }

    #[test]
    fn test_timer_type_from_raw() {
        assert_eq!(TimerType::from_raw(0), Some(TimerType::Notification));
        assert_eq!(TimerType::from_raw(1), Some(TimerType::Synchronization));
        assert_eq!(TimerType::from_raw(2), None);
    }

    #[test]
    fn test_resume_request_is_flagged() {
        let timer = XTimer::new(kernel(), TimerType::Notification);
        assert_eq!(
            timer.set_timer(-10_000, 0, 0x8200_0000, 0, true),
            XStatus::TIMER_RESUME_IGNORED
        );
    }

    #[test]
    fn test_set_timer_outside_guest_thread_fails() {
        let timer = XTimer::new(kernel(), TimerType::Synchronization);
        assert_eq!(
            timer.set_timer(-10_000, 0, 0x8200_0000, 0, false),
            XStatus::UNSUCCESSFUL
        );
    }

    #[test]
    fn test_cancel_stops_pending_fire() {
        let timer = XTimer::new(kernel(), TimerType::Notification);
        assert_eq!(timer.cancel(), XStatus::SUCCESS);
    }
}
