//! Guest kernel core for recompiled titles
//!
//! Owns guest threads, their stacks, TLS and kernel blocks, APC delivery,
//! guest timers, and the process-wide state they share. Recompiled code
//! re-enters this crate only through kernel import calls.

pub mod native_list;
pub mod processor;
pub mod state;
pub mod stream;
pub mod xthread;
pub mod xtimer;

pub use processor::Processor;
pub use state::KernelState;
pub use stream::ByteStream;
pub use xthread::{CreationParams, XHostThread, XThread, X_CREATE_SUSPENDED};
pub use xtimer::{TimerType, XTimer};
