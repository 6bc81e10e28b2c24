//! Host fiber primitive for cooperative context switching
//!
//! Each guest fiber gets one [`Fiber`]. Switching preserves the entire host
//! call stack, so mid-function resume works without any link-register
//! lookup. Strictly cooperative: there is exactly one Current fiber per
//! host thread and a switch never crosses threads.
//!
//! POSIX backend over `ucontext` (`getcontext`/`makecontext`/`swapcontext`).

use std::cell::{Cell, UnsafeCell};
use std::ffi::c_void;
use std::mem;

/// Entry point of a created fiber; runs when the fiber is first switched
/// to. Plain function pointer plus userdata, because the entry outlives
/// any borrow the creating frame could prove.
pub type FiberEntry = fn(*mut c_void);

struct Inner {
    context: libc::ucontext_t,
    // Owned stack for created fibers; empty for converted threads.
    stack: Vec<u8>,
    entry: Option<FiberEntry>,
    arg: *mut c_void,
    is_thread_fiber: bool,
}

thread_local! {
    static CURRENT: Cell<*mut Inner> = const { Cell::new(std::ptr::null_mut()) };
}

/// A cooperative execution context with its own stack.
pub struct Fiber {
    inner: Box<UnsafeCell<Inner>>,
}

// A fiber only ever runs on the thread that created it.
impl Fiber {
    /// Convert the calling thread into a fiber and install it as Current.
    /// Must be called once on a thread before any [`switch_to`].
    ///
    /// [`switch_to`]: Fiber::switch_to
    pub fn convert_current_thread() -> Option<Fiber> {
        let inner = Box::new(UnsafeCell::new(Inner {
            context: unsafe { mem::zeroed() },
            stack: Vec::new(),
            entry: None,
            arg: std::ptr::null_mut(),
            is_thread_fiber: true,
        }));
        // SAFETY: inner.context is a valid zeroed ucontext_t.
        if unsafe { libc::getcontext(&mut (*inner.get()).context) } == -1 {
            return None;
        }
        CURRENT.with(|current| current.set(inner.get()));
        Some(Fiber { inner })
    }

    /// Create a new fiber with its own host stack. `entry(arg)` runs when
    /// the fiber is first switched to.
    pub fn new(stack_size: usize, entry: FiberEntry, arg: *mut c_void) -> Option<Fiber> {
        let inner = Box::new(UnsafeCell::new(Inner {
            context: unsafe { mem::zeroed() },
            stack: vec![0u8; stack_size],
            entry: Some(entry),
            arg,
            is_thread_fiber: false,
        }));

        // SAFETY: context and stack storage live as long as the boxed Inner.
        unsafe {
            let raw = inner.get();
            if libc::getcontext(&mut (*raw).context) == -1 {
                return None;
            }
            (*raw).context.uc_stack.ss_sp = (*raw).stack.as_mut_ptr() as *mut c_void;
            (*raw).context.uc_stack.ss_size = (*raw).stack.len();
            (*raw).context.uc_link = std::ptr::null_mut();
            // The trampoline reads entry/arg from Current, so no pointer
            // splitting through makecontext's varargs is needed.
            libc::makecontext(&mut (*raw).context, trampoline, 0);
        }
        Some(Fiber { inner })
    }

    /// Suspend the current fiber and resume this one. Returns when another
    /// fiber switches back.
    pub fn switch_to(&self) {
        let from = CURRENT.with(|current| current.get());
        assert!(
            !from.is_null(),
            "switch_to before convert_current_thread on this thread"
        );
        let to = self.inner.get();
        if from == to {
            return;
        }
        CURRENT.with(|current| current.set(to));
        // SAFETY: both contexts are initialised; `from` stays alive because
        // its owning Fiber cannot be destroyed while it is executing.
        unsafe {
            libc::swapcontext(&mut (*from).context, &(*to).context);
        }
    }

    /// True when this fiber is the one currently executing on this thread.
    pub fn is_current(&self) -> bool {
        CURRENT.with(|current| current.get()) == self.inner.get()
    }

    /// True for fibers made by [`convert_current_thread`].
    ///
    /// [`convert_current_thread`]: Fiber::convert_current_thread
    pub fn is_thread_fiber(&self) -> bool {
        unsafe { (*self.inner.get()).is_thread_fiber }
    }

    /// Release the fiber. Must not be called on the Current fiber.
    pub fn destroy(self) {
        assert!(
            !self.is_current(),
            "destroy called on the currently running fiber"
        );
        // Stack memory is freed with the box.
    }
}

extern "C" fn trampoline() {
    // Current was updated by switch_to before swapcontext landed here.
    let raw = CURRENT.with(|current| current.get());
    // SAFETY: the fiber being entered is alive by construction.
    unsafe {
        if let Some(entry) = (*raw).entry {
            entry((*raw).arg);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Globals - fiber entry functions cannot capture closures.
    static mut MAIN: *const Fiber = std::ptr::null();
    static mut COUNT: i32 = 0;

    fn counting_fiber(_arg: *mut c_void) {
        unsafe {
            COUNT += 1; // first resume
            (*MAIN).switch_to();
            COUNT += 1; // second resume
            (*MAIN).switch_to();
        }
    }

    #[test]
    fn test_basic_context_switch() {
        let main = Fiber::convert_current_thread().unwrap();
        let fiber = Fiber::new(256 * 1024, counting_fiber, std::ptr::null_mut()).unwrap();
        unsafe {
            MAIN = &main;
            COUNT = 0;

            assert_eq!(COUNT, 0);
            fiber.switch_to();
            assert_eq!(COUNT, 1); // fiber ran, switched back
            fiber.switch_to();
            assert_eq!(COUNT, 2); // fiber resumed, ran again, switched back

            MAIN = std::ptr::null();
        }
        assert!(main.is_current());
        fiber.destroy();
    }

    #[test]
    fn test_thread_fiber_flag() {
        std::thread::spawn(|| {
            let main = Fiber::convert_current_thread().unwrap();
            assert!(main.is_thread_fiber());
            assert!(main.is_current());
        })
        .join()
        .unwrap();
    }
}
