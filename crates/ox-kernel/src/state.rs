//! Process-wide kernel state

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, ReentrantMutex, ReentrantMutexGuard};

use ox_core::config::RuntimeConfig;
use ox_memory::GuestMemory;

use crate::processor::Processor;
use crate::stream::ByteStream;
use crate::xthread::XThread;

/// Save-state signature for the object table header.
pub const KERNEL_SAVE_SIGNATURE: u32 = u32::from_be_bytes(*b"OBJT");

/// Shared state of the guest kernel: memory, the recompiled-function
/// dispatch table, the thread registry, and the global critical region
/// guarding all of them.
pub struct KernelState {
    memory: Arc<GuestMemory>,
    processor: Processor,
    config: RuntimeConfig,
    // The guest critical region is re-entrant: APC kernel routines run
    // under it and may enqueue further APCs.
    global_critical_region: ReentrantMutex<()>,
    threads_by_id: Mutex<HashMap<u32, Arc<XThread>>>,
    next_thread_id: AtomicU32,
    process_info_block_address: u32,
}

impl KernelState {
    pub fn new(memory: Arc<GuestMemory>, processor: Processor, config: RuntimeConfig) -> Arc<Self> {
        let process_info_block_address = memory.system_heap_alloc(0x60);
        Arc::new(Self {
            memory,
            processor,
            config,
            global_critical_region: ReentrantMutex::new(()),
            threads_by_id: Mutex::new(HashMap::new()),
            next_thread_id: AtomicU32::new(1),
            process_info_block_address,
        })
    }

    pub fn memory(&self) -> &Arc<GuestMemory> {
        &self.memory
    }

    pub fn processor(&self) -> &Processor {
        &self.processor
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn process_info_block_address(&self) -> u32 {
        self.process_info_block_address
    }

    /// Acquire the global critical region.
    pub fn lock_global(&self) -> ReentrantMutexGuard<'_, ()> {
        self.global_critical_region.lock()
    }

    pub fn allocate_thread_id(&self) -> u32 {
        self.next_thread_id.fetch_add(1, Ordering::Relaxed)
    }

    pub fn register_thread(&self, thread: Arc<XThread>) {
        let _guard = self.lock_global();
        self.threads_by_id.lock().insert(thread.thread_id(), thread);
    }

    pub fn unregister_thread(&self, thread_id: u32) {
        let _guard = self.lock_global();
        self.threads_by_id.lock().remove(&thread_id);
    }

    pub fn thread_by_id(&self, thread_id: u32) -> Option<Arc<XThread>> {
        let _guard = self.lock_global();
        self.threads_by_id.lock().get(&thread_id).cloned()
    }

    pub fn threads(&self) -> Vec<Arc<XThread>> {
        let _guard = self.lock_global();
        let mut threads: Vec<_> = self.threads_by_id.lock().values().cloned().collect();
        threads.sort_by_key(|t| t.thread_id());
        threads
    }

    pub fn on_thread_execute(&self, thread: &XThread) {
        tracing::debug!(
            target: "kernel",
            "Thread {:08X} ('{}') executing",
            thread.thread_id(),
            thread.name()
        );
    }

    pub fn on_thread_exit(&self, thread: &XThread) {
        tracing::debug!(
            target: "kernel",
            "Thread {:08X} ('{}') exited",
            thread.thread_id(),
            thread.name()
        );
    }

    /// Serialise the object table and every quiescent guest thread.
    /// Fails when any guest thread is currently executing guest code.
    pub fn save(&self, stream: &mut ByteStream) -> bool {
        let _guard = self.lock_global();
        let threads = self.threads();
        let guest_threads: Vec<_> = threads.iter().filter(|t| t.is_guest_thread()).collect();

        stream.write_u32(KERNEL_SAVE_SIGNATURE);
        stream.write_u32(guest_threads.len() as u32);

        for thread in guest_threads {
            if !thread.save(stream) {
                return false;
            }
        }
        true
    }

    /// Recreate threads from a save stream produced by [`save`].
    ///
    /// [`save`]: KernelState::save
    pub fn restore(kernel: &Arc<KernelState>, stream: &mut ByteStream) -> bool {
        let Some(signature) = stream.read_u32() else {
            return false;
        };
        if signature != KERNEL_SAVE_SIGNATURE {
            tracing::error!(target: "kernel", "Could not restore - invalid object table magic");
            return false;
        }
        let Some(count) = stream.read_u32() else {
            return false;
        };
        for _ in 0..count {
            if XThread::restore(kernel, stream).is_none() {
                return false;
            }
        }
        true
    }
}
