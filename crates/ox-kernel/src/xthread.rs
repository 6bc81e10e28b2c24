//! Guest thread lifecycle
//!
//! Each guest thread owns a guarded guest stack, TLS, PCR and KTHREAD
//! blocks, an APC queue in guest memory, and one host thread carrying a
//! cooperative fiber. Recompiled code runs on the host thread and returns
//! to the kernel only through imports.

use std::cell::{RefCell, UnsafeCell};
use std::ffi::c_void;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU32, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use ox_core::status::XStatus;
use ox_fiber::Fiber;
use ox_memory::constants::PAGE_SIZE;
use ox_memory::PageFlags;
use ox_time::Clock;

use crate::native_list::NativeList;
use crate::state::KernelState;
use crate::stream::ByteStream;

/// Creation flag bit 0: start suspended. The top 8 bits carry the
/// requested logical processor.
pub const X_CREATE_SUSPENDED: u32 = 0x1;

/// Save-state signature preceding each serialised thread.
pub const THREAD_SAVE_SIGNATURE: u32 = u32::from_be_bytes(*b"KRNL");

// Guest KTHREAD block layout (offsets into the kthread allocation).
const KTHREAD_SIZE: u32 = 0x200;
const KTHREAD_HEADER_TYPE: u32 = 0x000; // u8, thread objects are type 6
const KTHREAD_SIGNAL_STATE: u32 = 0x004;
const KTHREAD_STACK_BASE: u32 = 0x05C;
const KTHREAD_STACK_LIMIT: u32 = 0x060;
const KTHREAD_TLS_ADDRESS: u32 = 0x068;
const KTHREAD_CREATE_TIME: u32 = 0x130;
const KTHREAD_THREAD_ID: u32 = 0x14C;
const KTHREAD_START_ADDRESS: u32 = 0x150;
const KTHREAD_LAST_ERROR: u32 = 0x160;
const KTHREAD_CREATION_FLAGS: u32 = 0x16C;
const KTHREAD_SUSPEND_COUNT: u32 = 0x170;
const KTHREAD_APC_DISABLE_COUNT: u32 = 0x174;
const KTHREAD_EXIT_STATUS: u32 = 0x178;
const KTHREAD_CURRENT_CPU: u32 = 0x17C;

// Guest PCR block layout; r13 points here while inside guest code.
const PCR_SIZE: u32 = 0x2D8;
const PCR_TLS_PTR: u32 = 0x000;
const PCR_SELF_PTR: u32 = 0x018;
const PCR_STACK_BASE: u32 = 0x070;
const PCR_STACK_END: u32 = 0x074;
const PCR_CURRENT_THREAD: u32 = 0x100;
const PCR_CURRENT_CPU: u32 = 0x10C;
const PCR_DPC_ACTIVE: u32 = 0x150;

// Guest APC node layout; the list entry is embedded at +8.
const APC_SIZE: u32 = 0x28;
const APC_KERNEL_ROUTINE: u32 = 0x00;
const APC_RUNDOWN_ROUTINE: u32 = 0x04;
const APC_LIST_ENTRY: u32 = 0x08;
const APC_NORMAL_ROUTINE: u32 = 0x10;
const APC_NORMAL_CONTEXT: u32 = 0x14;
const APC_ARG1: u32 = 0x18;
const APC_ARG2: u32 = 0x1C;
const APC_ENQUEUED: u32 = 0x20;

/// Sentinel routines marking a kernel-owned APC that is freed after
/// delivery.
pub const APC_DUMMY_KERNEL_ROUTINE: u32 = 0xF00D_FF00;
pub const APC_DUMMY_RUNDOWN_ROUTINE: u32 = 0xF00D_FF01;

const DEFAULT_TLS_SLOT_COUNT: u32 = 1024;
const MIN_STACK_SIZE: u32 = 16 * 1024;

/// Guest thread creation parameters.
#[derive(Debug, Clone, Copy, Default)]
pub struct CreationParams {
    pub stack_size: u32,
    /// XAPI startup trampoline; 0 for a raw thread.
    pub xapi_thread_startup: u32,
    pub start_address: u32,
    pub start_context: u32,
    pub creation_flags: u32,
}

/// Host priority bands the guest increment maps onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostPriority {
    Lowest,
    BelowNormal,
    Normal,
    AboveNormal,
    Highest,
}

thread_local! {
    static CURRENT_THREAD: RefCell<Option<Arc<XThread>>> = const { RefCell::new(None) };
    // The converted thread fiber lives with its host thread.
    static MAIN_FIBER: RefCell<Option<Fiber>> = const { RefCell::new(None) };
}

// Token unwound through guest frames when a thread exits mid-function.
struct ThreadExitToken(i32);

/// The guest register file wrapper owned by one thread.
///
/// Only the owning thread touches the context while it runs; other threads
/// may read it only once the thread is quiescent. That discipline is the
/// same one the recompiled ABI itself relies on.
pub struct ThreadState {
    context: UnsafeCell<Box<ox_guest::PpcContext>>,
}

unsafe impl Send for ThreadState {}
unsafe impl Sync for ThreadState {}

impl ThreadState {
    fn new() -> Self {
        Self {
            context: UnsafeCell::new(Box::default()),
        }
    }

    /// # Safety
    /// Caller must either be the owning guest thread, or the thread must
    /// not be executing guest code.
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn context(&self) -> &mut ox_guest::PpcContext {
        &mut *self.context.get()
    }
}

struct SuspendGate {
    count: Mutex<u32>,
    cond: Condvar,
}

impl SuspendGate {
    fn new(initial: u32) -> Self {
        Self {
            count: Mutex::new(initial),
            cond: Condvar::new(),
        }
    }

    fn suspend(&self) -> u32 {
        let mut count = self.count.lock();
        *count += 1;
        *count
    }

    fn resume(&self) -> u32 {
        let mut count = self.count.lock();
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.cond.notify_all();
        }
        *count
    }

    fn wait_until_runnable(&self) {
        let mut count = self.count.lock();
        while *count > 0 {
            self.cond.wait(&mut count);
        }
    }
}

struct AlertGate {
    alerted: Mutex<bool>,
    cond: Condvar,
}

impl AlertGate {
    fn new() -> Self {
        Self {
            alerted: Mutex::new(false),
            cond: Condvar::new(),
        }
    }

    fn alert(&self) {
        *self.alerted.lock() = true;
        self.cond.notify_all();
    }

    /// Sleep up to `timeout`; true when the sleep was cut short by an
    /// alert.
    fn alertable_sleep(&self, timeout: Duration) -> bool {
        let mut alerted = self.alerted.lock();
        if !*alerted {
            self.cond.wait_for(&mut alerted, timeout);
        }
        std::mem::take(&mut alerted)
    }
}

/// One guest thread.
pub struct XThread {
    kernel: Arc<KernelState>,
    thread_id: u32,
    guest_thread: bool,
    main_thread: bool,
    creation_params: CreationParams,
    name: Mutex<String>,

    stack_alloc_base: u32,
    stack_alloc_size: u32,
    stack_base: u32,
    stack_limit: u32,
    scratch_address: u32,
    tls_static_address: u32,
    tls_dynamic_address: u32,
    tls_total_size: u32,
    pcr_address: u32,
    kthread_address: u32,

    state: ThreadState,
    apc_list: Mutex<NativeList>,
    irql: AtomicU32,
    priority: AtomicI32,
    active_cpu: AtomicU8,
    running: AtomicBool,
    terminated: AtomicBool,
    suspend_gate: SuspendGate,
    alert_gate: AlertGate,
    host_thread: Mutex<Option<std::thread::JoinHandle<()>>>,
    // Host threads run this instead of dispatching into guest code.
    host_fn: Mutex<Option<Box<dyn FnOnce() -> i32 + Send>>>,
}

impl XThread {
    /// Allocate every per-thread guest resource, initialise the PCR and
    /// KTHREAD blocks, register with the kernel, and start the host
    /// thread unless created suspended.
    pub fn create(
        kernel: &Arc<KernelState>,
        params: CreationParams,
        guest_thread: bool,
        main_thread: bool,
    ) -> Result<Arc<XThread>, XStatus> {
        let memory = kernel.memory().clone();
        let mut params = params;
        if params.stack_size < MIN_STACK_SIZE {
            params.stack_size = MIN_STACK_SIZE;
        }

        // Thread kernel object
        let kthread_address = memory.system_heap_alloc(KTHREAD_SIZE);
        if kthread_address == 0 {
            tracing::warn!(target: "kernel", "Unable to allocate thread object");
            return Err(XStatus::NO_MEMORY);
        }

        // Stack with a guard page either side, poisoned with junk
        let stack_size = params.stack_size.div_ceil(PAGE_SIZE) * PAGE_SIZE;
        let actual_size = stack_size + 2 * PAGE_SIZE;
        let Some(stack_alloc_base) = memory.stack_alloc(actual_size) else {
            memory.system_heap_free(kthread_address);
            return Err(XStatus::NO_MEMORY);
        };
        let stack_limit = stack_alloc_base + PAGE_SIZE;
        let stack_base = stack_limit + stack_size;
        let _ = memory.fill(stack_alloc_base, actual_size, 0xBE);
        memory.protect(stack_alloc_base, PAGE_SIZE, PageFlags::NO_ACCESS);
        memory.protect(stack_base, PAGE_SIZE, PageFlags::NO_ACCESS);

        // Thread scratch, used to round-trip pointers through APC routines
        let scratch_address = memory.system_heap_alloc(4 * 16);

        // TLS block: 4-byte dynamic slots; no XEX static image in scope,
        // so the dynamic region is the whole block.
        let tls_total_size = DEFAULT_TLS_SLOT_COUNT * 4;
        let tls_static_address = memory.system_heap_alloc(tls_total_size);
        if tls_static_address == 0 {
            tracing::warn!(target: "kernel", "Unable to allocate thread local storage block");
            memory.system_heap_free(scratch_address);
            memory.system_heap_free(kthread_address);
            memory.protect(stack_alloc_base, actual_size, PageFlags::RW);
            memory.stack_free(stack_alloc_base);
            return Err(XStatus::NO_MEMORY);
        }
        let tls_dynamic_address = tls_static_address;
        let _ = memory.fill(tls_static_address, tls_total_size, 0);

        // PCR, exposed to guest code at r13
        let pcr_address = memory.system_heap_alloc(PCR_SIZE);
        if pcr_address == 0 {
            tracing::warn!(target: "kernel", "Unable to allocate thread state block");
            memory.system_heap_free(tls_static_address);
            memory.system_heap_free(scratch_address);
            memory.system_heap_free(kthread_address);
            memory.protect(stack_alloc_base, actual_size, PageFlags::RW);
            memory.stack_free(stack_alloc_base);
            return Err(XStatus::NO_MEMORY);
        }

        let thread_id = kernel.allocate_thread_id();
        tracing::debug!(
            target: "kernel",
            "XThread{:08X} Stack: {:08X}-{:08X}",
            thread_id,
            stack_limit,
            stack_base
        );

        let start_suspended = params.creation_flags & X_CREATE_SUSPENDED != 0;
        let cpu_index = fake_cpu_number((params.creation_flags >> 24) as u8);

        let thread = Arc::new(XThread {
            kernel: kernel.clone(),
            thread_id,
            guest_thread,
            main_thread,
            creation_params: params,
            name: Mutex::new(format!("XThread{thread_id:04X}")),
            stack_alloc_base,
            stack_alloc_size: actual_size,
            stack_base,
            stack_limit,
            scratch_address,
            tls_static_address,
            tls_dynamic_address,
            tls_total_size,
            pcr_address,
            kthread_address,
            state: ThreadState::new(),
            apc_list: Mutex::new(NativeList::new(memory.clone())),
            irql: AtomicU32::new(0),
            priority: AtomicI32::new(0),
            active_cpu: AtomicU8::new(0),
            running: AtomicBool::new(false),
            terminated: AtomicBool::new(false),
            // The gate opens on the initial Resume below (or the caller's
            // for suspended creation).
            suspend_gate: SuspendGate::new(1),
            alert_gate: AlertGate::new(),
            host_thread: Mutex::new(None),
            host_fn: Mutex::new(None),
        });

        thread.initialize_guest_object(start_suspended);
        thread.initialize_pcr();
        thread.set_active_cpu(cpu_index);

        if params.creation_flags & 0x60 != 0 {
            thread.set_priority(if params.creation_flags & 0x20 != 0 { 1 } else { 0 });
        }

        kernel.register_thread(thread.clone());

        let entry = thread.clone();
        let handle = std::thread::Builder::new()
            .name(entry.name())
            .stack_size(16 * 1024 * 1024)
            .spawn(move || {
                entry.suspend_gate.wait_until_runnable();
                CURRENT_THREAD.with(|current| *current.borrow_mut() = Some(entry.clone()));
                entry.running.store(true, Ordering::Release);

                let result = std::panic::catch_unwind(AssertUnwindSafe(|| entry.execute()));
                match result {
                    Ok(()) => {}
                    Err(payload) if payload.is::<ThreadExitToken>() => {}
                    Err(payload) => std::panic::resume_unwind(payload),
                }

                entry.running.store(false, Ordering::Release);
                CURRENT_THREAD.with(|current| *current.borrow_mut() = None);
                // Release the self-registration.
                entry.kernel.unregister_thread(entry.thread_id);
            })
            .map_err(|err| {
                tracing::error!(target: "kernel", "CreateThread failed: {err}");
                XStatus::NO_MEMORY
            })?;
        *thread.host_thread.lock() = Some(handle);

        if !start_suspended {
            thread.resume();
        }

        Ok(thread)
    }

    fn initialize_guest_object(&self, start_suspended: bool) {
        let memory = self.kernel.memory();
        let base = self.kthread_address;
        let _ = memory.write_u8(base + KTHREAD_HEADER_TYPE, 6);
        let _ = memory.write_be32(base + KTHREAD_SIGNAL_STATE, 0);
        let _ = memory.write_be32(base + KTHREAD_STACK_BASE, self.stack_base);
        let _ = memory.write_be32(base + KTHREAD_STACK_LIMIT, self.stack_limit);
        let _ = memory.write_be32(base + KTHREAD_TLS_ADDRESS, self.tls_static_address);
        let _ = memory.write_be64(base + KTHREAD_CREATE_TIME, Clock::query_guest_system_time());
        let _ = memory.write_be32(base + KTHREAD_THREAD_ID, self.thread_id);
        let _ = memory.write_be32(
            base + KTHREAD_START_ADDRESS,
            self.creation_params.start_address,
        );
        let _ = memory.write_be32(base + KTHREAD_LAST_ERROR, 0);
        let _ = memory.write_be32(
            base + KTHREAD_CREATION_FLAGS,
            self.creation_params.creation_flags,
        );
        let _ = memory.write_be32(
            base + KTHREAD_SUSPEND_COUNT,
            if start_suspended { 1 } else { 0 },
        );
        let _ = memory.write_be32(base + KTHREAD_APC_DISABLE_COUNT, 0);
        let _ = memory.write_be32(base + KTHREAD_EXIT_STATUS, 0);
    }

    fn initialize_pcr(&self) {
        let memory = self.kernel.memory();
        let base = self.pcr_address;
        let _ = memory.write_be32(base + PCR_TLS_PTR, self.tls_static_address);
        let _ = memory.write_be32(base + PCR_SELF_PTR, self.pcr_address);
        let _ = memory.write_be32(base + PCR_CURRENT_THREAD, self.kthread_address);
        let _ = memory.write_be32(base + PCR_STACK_BASE, self.stack_base);
        let _ = memory.write_be32(base + PCR_STACK_END, self.stack_limit);
        let _ = memory.write_be32(base + PCR_DPC_ACTIVE, 0);
    }

    //=========================================================================
    // Identity
    //=========================================================================

    pub fn thread_id(&self) -> u32 {
        self.thread_id
    }

    pub fn is_guest_thread(&self) -> bool {
        self.guest_thread
    }

    pub fn is_main_thread(&self) -> bool {
        self.main_thread
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn name(&self) -> String {
        self.name.lock().clone()
    }

    pub fn set_name(&self, name: &str) {
        *self.name.lock() = format!("{} ({:08X})", name, self.thread_id);
    }

    pub fn stack_base(&self) -> u32 {
        self.stack_base
    }

    pub fn stack_limit(&self) -> u32 {
        self.stack_limit
    }

    pub fn pcr_address(&self) -> u32 {
        self.pcr_address
    }

    pub fn kthread_address(&self) -> u32 {
        self.kthread_address
    }

    pub fn thread_state(&self) -> &ThreadState {
        &self.state
    }

    /// The thread currently inside guest code on this host thread.
    pub fn current() -> Option<Arc<XThread>> {
        CURRENT_THREAD.with(|current| current.borrow().clone())
    }

    pub fn is_in_thread(&self) -> bool {
        Self::current().map(|t| t.thread_id == self.thread_id).unwrap_or(false)
    }

    pub fn last_error(&self) -> u32 {
        self.kernel
            .memory()
            .read_be32(self.kthread_address + KTHREAD_LAST_ERROR)
            .unwrap_or(0)
    }

    pub fn set_last_error(&self, error_code: u32) {
        let _ = self
            .kernel
            .memory()
            .write_be32(self.kthread_address + KTHREAD_LAST_ERROR, error_code);
    }

    //=========================================================================
    // Execution
    //=========================================================================

    fn execute(&self) {
        // Terminate may have landed while parked at the start gate.
        self.check_terminated();

        self.kernel.on_thread_execute(self);

        // Host threads skip guest dispatch entirely.
        if let Some(host_fn) = self.host_fn.lock().take() {
            let exit_code = host_fn();
            self.exit(exit_code);
        }

        // A mandatory nap: some titles assume thread creation is slow
        // enough to finish initialising shared structures afterwards.
        std::thread::sleep(Duration::from_millis(10));

        // APCs queued before the thread started come first.
        self.deliver_apcs();

        // A XAPI trampoline receives (entry, context); a raw thread
        // receives just its context and its r3 becomes the exit code.
        let (address, args, want_exit_code) = if self.creation_params.xapi_thread_startup != 0 {
            (
                self.creation_params.xapi_thread_startup,
                vec![
                    self.creation_params.start_address as u64,
                    self.creation_params.start_context as u64,
                ],
                false,
            )
        } else {
            (
                self.creation_params.start_address,
                vec![self.creation_params.start_context as u64],
                true,
            )
        };

        let Some(func) = self.kernel.processor().get_function(address) else {
            tracing::error!(
                target: "kernel",
                "XThread::execute - no function registered at {:08X}",
                address
            );
            return;
        };

        // SAFETY: we are the owning thread.
        let ctx = unsafe { self.state.context() };
        ctx.r[1].set_u64(self.stack_base as u64);
        ctx.r[13].set_u64(self.pcr_address as u64);
        for (i, arg) in args.iter().enumerate().take(8) {
            ctx.r[3 + i].set_u64(*arg);
        }
        ctx.kernel_state = Arc::as_ptr(&self.kernel) as *mut c_void;
        ctx.fpscr.init_host();

        // Convert to a fiber so kernel waits can switch away and resume
        // at the same source location.
        MAIN_FIBER.with(|fiber| *fiber.borrow_mut() = Fiber::convert_current_thread());

        tracing::debug!(
            target: "kernel",
            "XThread::execute - calling function at {:08X}",
            address
        );
        func(ctx, self.kernel.memory().membase());

        let exit_code = ctx.r[3].u32() as i32;
        self.exit(if want_exit_code { exit_code } else { 0 });
    }

    /// Exit the current thread. Never returns.
    pub fn exit(&self, exit_code: i32) -> ! {
        debug_assert!(self.is_in_thread());

        self.rundown_apcs();

        let memory = self.kernel.memory();
        let _ = memory.write_be32(self.kthread_address + KTHREAD_SIGNAL_STATE, 1);
        let _ = memory.write_be32(self.kthread_address + KTHREAD_EXIT_STATUS, exit_code as u32);

        self.kernel.on_thread_exit(self);
        std::panic::panic_any(ThreadExitToken(exit_code));
    }

    /// Terminate the thread, possibly from another thread. Skips APC
    /// rundown when initiated externally.
    pub fn terminate(&self, exit_code: i32) -> XStatus {
        let memory = self.kernel.memory();
        let _ = memory.write_be32(self.kthread_address + KTHREAD_SIGNAL_STATE, 1);
        let _ = memory.write_be32(self.kthread_address + KTHREAD_EXIT_STATUS, exit_code as u32);
        self.terminated.store(true, Ordering::Release);

        if self.is_in_thread() {
            self.kernel.on_thread_exit(self);
            std::panic::panic_any(ThreadExitToken(exit_code));
        }

        // A host thread cannot be killed from outside; it observes the
        // terminated flag at its next suspension point.
        self.alert_gate.alert();
        self.suspend_gate.resume();
        XStatus::SUCCESS
    }

    /// Suspension points call this to honour Terminate from another thread.
    fn check_terminated(&self) {
        if self.terminated.load(Ordering::Acquire) && self.is_in_thread() {
            std::panic::panic_any(ThreadExitToken(0));
        }
    }

    //=========================================================================
    // Critical region and IRQL
    //=========================================================================

    fn apc_disable_count(&self) -> i32 {
        self.kernel
            .memory()
            .read_be32(self.kthread_address + KTHREAD_APC_DISABLE_COUNT)
            .unwrap_or(0) as i32
    }

    fn set_apc_disable_count(&self, value: i32) {
        let _ = self
            .kernel
            .memory()
            .write_be32(self.kthread_address + KTHREAD_APC_DISABLE_COUNT, value as u32);
    }

    pub fn enter_critical_region(&self) {
        self.set_apc_disable_count(self.apc_disable_count() - 1);
    }

    pub fn leave_critical_region(&self) {
        let count = self.apc_disable_count() + 1;
        self.set_apc_disable_count(count);
        if count == 0 && self.is_in_thread() {
            self.deliver_apcs();
        }
    }

    pub fn raise_irql(&self, new_irql: u32) -> u32 {
        self.irql.swap(new_irql, Ordering::AcqRel)
    }

    pub fn lower_irql(&self, new_irql: u32) {
        self.irql.store(new_irql, Ordering::Release);
    }

    //=========================================================================
    // APC delivery
    //=========================================================================

    /// Queue a kernel-owned APC; freed after delivery.
    pub fn enqueue_apc(
        &self,
        normal_routine: u32,
        normal_context: u32,
        arg1: u32,
        arg2: u32,
    ) {
        let memory = self.kernel.memory().clone();
        {
            let _guard = self.kernel.lock_global();

            let apc_ptr = memory.system_heap_alloc(APC_SIZE);
            if apc_ptr == 0 {
                tracing::warn!(target: "kernel", "EnqueueApc: out of system heap");
                return;
            }
            let _ = memory.write_be32(apc_ptr + APC_KERNEL_ROUTINE, APC_DUMMY_KERNEL_ROUTINE);
            let _ = memory.write_be32(apc_ptr + APC_RUNDOWN_ROUTINE, APC_DUMMY_RUNDOWN_ROUTINE);
            let _ = memory.write_be32(apc_ptr + APC_NORMAL_ROUTINE, normal_routine);
            let _ = memory.write_be32(apc_ptr + APC_NORMAL_CONTEXT, normal_context);
            let _ = memory.write_be32(apc_ptr + APC_ARG1, arg1);
            let _ = memory.write_be32(apc_ptr + APC_ARG2, arg2);
            let _ = memory.write_be32(apc_ptr + APC_ENQUEUED, 1);

            self.apc_list.lock().insert(apc_ptr + APC_LIST_ENTRY);
        }

        // Wake the thread if it is in an alertable wait.
        self.alert_gate.alert();
    }

    fn call_guest(&self, routine: u32, args: &[u64]) {
        let Some(func) = self.kernel.processor().get_function(routine) else {
            tracing::warn!(
                target: "kernel",
                "guest routine {:08X} not found",
                routine
            );
            return;
        };
        // SAFETY: APC delivery runs on the owning thread.
        let ctx = unsafe { self.state.context() };
        for (i, arg) in args.iter().enumerate().take(8) {
            ctx.r[3 + i].set_u64(*arg);
        }
        func(ctx, self.kernel.memory().membase());
    }

    /// FIFO delivery: gated by the APC disable count, kernel routine may
    /// rewrite the delivery slots through the scratch block, and the
    /// critical region is dropped around the normal routine so it may
    /// re-enter the queue.
    pub fn deliver_apcs(&self) {
        let memory = self.kernel.memory().clone();
        let mut guard = self.kernel.lock_global();

        loop {
            if self.apc_disable_count() != 0 {
                break;
            }
            let entry = self.apc_list.lock().shift();
            if entry == 0 {
                break;
            }
            let apc_ptr = entry - APC_LIST_ENTRY;

            // Cache what we need before routines mutate or free the node.
            let kernel_routine = memory.read_be32(apc_ptr + APC_KERNEL_ROUTINE).unwrap_or(0);
            let needs_freeing = kernel_routine == APC_DUMMY_KERNEL_ROUTINE;

            let normal_routine = memory.read_be32(apc_ptr + APC_NORMAL_ROUTINE).unwrap_or(0);
            tracing::debug!(target: "kernel", "Delivering APC to {:08X}", normal_routine);

            // Mark as uninserted so the routine may reinsert it.
            let _ = memory.write_be32(apc_ptr + APC_ENQUEUED, 0);

            // The kernel routine may modify any delivery argument, so the
            // values round-trip through guest-visible scratch.
            let scratch = self.scratch_address;
            let _ = memory.write_be32(scratch, normal_routine);
            let _ = memory.write_be32(
                scratch + 4,
                memory.read_be32(apc_ptr + APC_NORMAL_CONTEXT).unwrap_or(0),
            );
            let _ = memory.write_be32(
                scratch + 8,
                memory.read_be32(apc_ptr + APC_ARG1).unwrap_or(0),
            );
            let _ = memory.write_be32(
                scratch + 12,
                memory.read_be32(apc_ptr + APC_ARG2).unwrap_or(0),
            );

            if kernel_routine != APC_DUMMY_KERNEL_ROUTINE && kernel_routine != 0 {
                self.call_guest(
                    kernel_routine,
                    &[
                        apc_ptr as u64,
                        scratch as u64,
                        (scratch + 4) as u64,
                        (scratch + 8) as u64,
                        (scratch + 12) as u64,
                    ],
                );
            }

            let normal_routine = memory.read_be32(scratch).unwrap_or(0);
            let normal_context = memory.read_be32(scratch + 4).unwrap_or(0);
            let arg1 = memory.read_be32(scratch + 8).unwrap_or(0);
            let arg2 = memory.read_be32(scratch + 12).unwrap_or(0);

            if normal_routine != 0 {
                // Drop the critical region: the normal routine may block
                // or enqueue another APC onto this thread.
                drop(guard);
                self.call_guest(
                    normal_routine,
                    &[normal_context as u64, arg1 as u64, arg2 as u64],
                );
                guard = self.kernel.lock_global();
            }

            tracing::debug!(
                target: "kernel",
                "Completed delivery of APC to {:08X} ({:08X}, {:08X}, {:08X})",
                normal_routine,
                normal_context,
                arg1,
                arg2
            );

            if needs_freeing {
                memory.system_heap_free(apc_ptr);
            }
        }
        drop(guard);
    }

    /// Rundown on thread exit: pending APCs get their rundown routine
    /// instead of delivery.
    pub fn rundown_apcs(&self) {
        debug_assert!(self.is_in_thread());
        let memory = self.kernel.memory().clone();
        let _guard = self.kernel.lock_global();

        loop {
            let entry = self.apc_list.lock().shift();
            if entry == 0 {
                break;
            }
            let apc_ptr = entry - APC_LIST_ENTRY;
            let kernel_routine = memory.read_be32(apc_ptr + APC_KERNEL_ROUTINE).unwrap_or(0);
            let rundown_routine = memory.read_be32(apc_ptr + APC_RUNDOWN_ROUTINE).unwrap_or(0);
            let needs_freeing = kernel_routine == APC_DUMMY_KERNEL_ROUTINE;

            let _ = memory.write_be32(apc_ptr + APC_ENQUEUED, 0);

            if rundown_routine != APC_DUMMY_RUNDOWN_ROUTINE && rundown_routine != 0 {
                self.call_guest(rundown_routine, &[apc_ptr as u64]);
            }

            if needs_freeing {
                memory.system_heap_free(apc_ptr);
            }
        }
    }

    pub fn apc_list_head(&self) -> u32 {
        self.apc_list.lock().head()
    }

    /// Wait for the host thread to finish. Must not be called from the
    /// thread itself.
    pub fn join(&self) {
        assert!(!self.is_in_thread());
        let handle = self.host_thread.lock().take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }

    //=========================================================================
    // Suspend / resume / priority / affinity
    //=========================================================================

    pub fn suspend_count(&self) -> u32 {
        self.kernel
            .memory()
            .read_be32(self.kthread_address + KTHREAD_SUSPEND_COUNT)
            .unwrap_or(0)
    }

    pub fn suspend(&self) -> u32 {
        let guard = self.kernel.lock_global();
        let previous = self.suspend_count();
        let _ = self
            .kernel
            .memory()
            .write_be32(self.kthread_address + KTHREAD_SUSPEND_COUNT, previous + 1);
        self.suspend_gate.suspend();

        // Self-suspension cannot hold the global region while parked.
        if self.is_in_thread() {
            drop(guard);
            self.suspend_gate.wait_until_runnable();
            self.check_terminated();
        }
        previous
    }

    pub fn resume(&self) -> u32 {
        let _guard = self.kernel.lock_global();
        let previous = self.suspend_count();
        let _ = self.kernel.memory().write_be32(
            self.kthread_address + KTHREAD_SUSPEND_COUNT,
            previous.saturating_sub(1),
        );
        self.suspend_gate.resume();
        previous
    }

    pub fn priority(&self) -> i32 {
        self.priority.load(Ordering::Relaxed)
    }

    /// Map the guest priority increment into one of five host bands.
    pub fn set_priority(&self, increment: i32) {
        self.priority.store(increment, Ordering::Relaxed);
        let target = if increment > 0x22 {
            HostPriority::Highest
        } else if increment > 0x11 {
            HostPriority::AboveNormal
        } else if increment < -0x22 {
            HostPriority::Lowest
        } else if increment < -0x11 {
            HostPriority::BelowNormal
        } else {
            HostPriority::Normal
        };
        if !self.kernel.config().ignore_thread_priorities {
            // std exposes no portable priority control; record the band so
            // platform backends can apply it.
            tracing::trace!(
                target: "kernel",
                "thread {:08X} priority band {:?}",
                self.thread_id,
                target
            );
        }
    }

    pub fn set_affinity(&self, affinity: u32) {
        self.set_active_cpu(fake_cpu_number(affinity as u8));
    }

    pub fn active_cpu(&self) -> u8 {
        self.active_cpu.load(Ordering::Relaxed)
    }

    pub fn set_active_cpu(&self, cpu_index: u8) {
        assert!(cpu_index < 6);
        self.active_cpu.store(cpu_index, Ordering::Relaxed);

        let memory = self.kernel.memory();
        let _ = memory.write_be32(self.pcr_address + PCR_CURRENT_CPU, cpu_index as u32);
        if self.guest_thread {
            let _ = memory.write_be32(
                self.kthread_address + KTHREAD_CURRENT_CPU,
                cpu_index as u32,
            );
        }

        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        if cores >= 6 {
            if !self.kernel.config().ignore_thread_affinities {
                tracing::trace!(
                    target: "kernel",
                    "thread {:08X} affinity -> cpu {}",
                    self.thread_id,
                    cpu_index
                );
            }
        } else {
            tracing::warn!(target: "kernel", "Too few processor cores - scheduling will be wonky");
        }
    }

    //=========================================================================
    // Delay
    //=========================================================================

    /// Sleep in guest time. Negative intervals are relative 100 ns ticks;
    /// positive are absolute guest FILETIMEs. Alertable sleeps report APC
    /// interruption.
    pub fn delay(&self, _processor_mode: u32, alertable: bool, interval: i64) -> XStatus {
        self.check_terminated();
        // Honour a pending external Suspend before sleeping.
        if self.is_in_thread() {
            self.suspend_gate.wait_until_runnable();
        }
        let timeout_ms = if interval < 0 {
            // Relative time: ticks -> milliseconds
            ((-interval) / 10_000) as u64
        } else if interval > 0 {
            // Absolute guest deadline
            let now = Clock::query_guest_system_time();
            (interval as u64).saturating_sub(now) / 10_000
        } else {
            0
        };
        let timeout_ms = Clock::scale_guest_duration_millis(timeout_ms as u32);

        if alertable {
            let alerted = self
                .alert_gate
                .alertable_sleep(Duration::from_millis(timeout_ms as u64));
            self.check_terminated();
            if alerted {
                self.deliver_apcs();
                return XStatus::USER_APC;
            }
            XStatus::SUCCESS
        } else {
            std::thread::sleep(Duration::from_millis(timeout_ms as u64));
            self.check_terminated();
            XStatus::SUCCESS
        }
    }

    //=========================================================================
    // TLS
    //=========================================================================

    pub fn get_tls_value(&self, slot: u32) -> Option<u32> {
        if slot * 4 > self.tls_total_size {
            return None;
        }
        self.kernel
            .memory()
            .read_be32(self.tls_dynamic_address + slot * 4)
            .ok()
    }

    pub fn set_tls_value(&self, slot: u32, value: u32) -> bool {
        if slot * 4 >= self.tls_total_size {
            return false;
        }
        self.kernel
            .memory()
            .write_be32(self.tls_dynamic_address + slot * 4, value)
            .is_ok()
    }

    //=========================================================================
    // Save / restore
    //=========================================================================

    /// Serialise the thread. Only valid while the thread is not executing
    /// guest code; the snapshot then includes the full register file.
    pub fn save(&self, stream: &mut ByteStream) -> bool {
        if !self.guest_thread {
            // Host threads are expected to be recreated on their own.
            return false;
        }
        if self.is_running() {
            tracing::warn!(
                target: "kernel",
                "XThread {:08X} cannot be serialized while executing guest code",
                self.thread_id
            );
            return false;
        }

        tracing::debug!(target: "kernel", "XThread {:08X} serializing...", self.thread_id);

        stream.write_u32(THREAD_SAVE_SIGNATURE);
        stream.write_string(&self.name());

        stream.write_u32(self.thread_id);
        stream.write_u8(self.main_thread as u8);
        stream.write_u8(self.is_running() as u8);
        stream.write_u32(self.apc_list_head());
        stream.write_u32(self.tls_static_address);
        stream.write_u32(self.tls_dynamic_address);
        stream.write_u32(self.tls_total_size);
        stream.write_u32(self.pcr_address);
        stream.write_u32(self.stack_base);
        stream.write_u32(self.stack_limit);
        stream.write_u32(self.stack_alloc_base);
        stream.write_u32(self.stack_alloc_size);

        // SAFETY: the thread is quiescent (checked above).
        let ctx = unsafe { self.state.context() };
        stream.write_u64(ctx.lr);
        stream.write_u64(ctx.ctr.u64());
        for reg in &ctx.r {
            stream.write_u64(reg.u64());
        }
        for reg in &ctx.f {
            stream.write_u64(reg.u64());
        }
        for reg in &ctx.v {
            stream.write_bytes(&reg.bytes);
        }
        for field in &ctx.cr {
            stream.write_u32(field.raw());
        }
        stream.write_u32(ctx.fpscr.csr);
        stream.write_u8(ctx.xer.ca);
        stream.write_u8(ctx.xer.ov);
        stream.write_u8(ctx.xer.so);
        stream.write_u8(ctx.vscr_sat);
        stream.write_u32(0); // saved PC: quiescent threads resume at entry
        true
    }

    /// Recreate a thread from a snapshot. Snapshots taken while a thread
    /// was executing guest code are refused.
    pub fn restore(kernel: &Arc<KernelState>, stream: &mut ByteStream) -> Option<Arc<XThread>> {
        if stream.read_u32()? != THREAD_SAVE_SIGNATURE {
            tracing::error!(target: "kernel", "Could not restore XThread - invalid magic!");
            return None;
        }

        let name = stream.read_string()?;
        let thread_id = stream.read_u32()?;
        let main_thread = stream.read_u8()? != 0;
        let is_running = stream.read_u8()? != 0;
        let apc_head = stream.read_u32()?;
        let tls_static_address = stream.read_u32()?;
        let tls_dynamic_address = stream.read_u32()?;
        let tls_total_size = stream.read_u32()?;
        let pcr_address = stream.read_u32()?;
        let stack_base = stream.read_u32()?;
        let stack_limit = stream.read_u32()?;
        let stack_alloc_base = stream.read_u32()?;
        let stack_alloc_size = stream.read_u32()?;

        tracing::debug!(target: "kernel", "XThread {:08X} restoring", thread_id);

        let mut apc_list = NativeList::new(kernel.memory().clone());
        apc_list.set_head(apc_head);

        let thread = Arc::new(XThread {
            kernel: kernel.clone(),
            thread_id,
            guest_thread: true,
            main_thread,
            creation_params: CreationParams::default(),
            name: Mutex::new(name),
            stack_alloc_base,
            stack_alloc_size,
            stack_base,
            stack_limit,
            scratch_address: kernel.memory().system_heap_alloc(4 * 16),
            tls_static_address,
            tls_dynamic_address,
            tls_total_size,
            pcr_address,
            // The KTHREAD block lives in saved guest memory at the address
            // recorded in the PCR.
            kthread_address: kernel
                .memory()
                .read_be32(pcr_address + PCR_CURRENT_THREAD)
                .unwrap_or(0),
            state: ThreadState::new(),
            apc_list: Mutex::new(apc_list),
            irql: AtomicU32::new(0),
            priority: AtomicI32::new(0),
            active_cpu: AtomicU8::new(0),
            running: AtomicBool::new(false),
            terminated: AtomicBool::new(false),
            suspend_gate: SuspendGate::new(1),
            alert_gate: AlertGate::new(),
            host_thread: Mutex::new(None),
            host_fn: Mutex::new(None),
        });

        // SAFETY: the thread has no host thread yet.
        let ctx = unsafe { thread.state.context() };
        ctx.lr = stream.read_u64()?;
        ctx.ctr.set_u64(stream.read_u64()?);
        for i in 0..32 {
            ctx.r[i].set_u64(stream.read_u64()?);
        }
        for i in 0..32 {
            ctx.f[i].set_u64(stream.read_u64()?);
        }
        for i in 0..128 {
            ctx.v[i].bytes.copy_from_slice(stream.read_bytes(16)?);
        }
        for i in 0..8 {
            ctx.cr[i].set_raw(stream.read_u32()?);
        }
        ctx.fpscr.csr = stream.read_u32()?;
        ctx.xer.ca = stream.read_u8()?;
        ctx.xer.ov = stream.read_u8()?;
        ctx.xer.so = stream.read_u8()?;
        ctx.vscr_sat = stream.read_u8()?;
        let _saved_pc = stream.read_u32()?;

        if is_running {
            // A snapshot of a thread mid-guest-code cannot be resumed.
            tracing::error!(
                target: "kernel",
                "XThread {:08X} snapshot was taken while executing guest code - refusing",
                thread_id
            );
            return None;
        }

        kernel.register_thread(thread.clone());
        Some(thread)
    }
}

/// A kernel-owned thread that runs a host function inside the XThread
/// lifecycle (registration, naming, exit notification).
pub struct XHostThread;

impl XHostThread {
    pub fn create(
        kernel: &Arc<KernelState>,
        stack_size: u32,
        name: &str,
        host_fn: impl FnOnce() -> i32 + Send + 'static,
    ) -> Result<Arc<XThread>, XStatus> {
        let params = CreationParams {
            stack_size,
            creation_flags: X_CREATE_SUSPENDED,
            ..Default::default()
        };
        let thread = XThread::create(kernel, params, false, false)?;
        thread.set_name(name);
        *thread.host_fn.lock() = Some(Box::new(host_fn));
        thread.resume();
        Ok(thread)
    }
}

impl Drop for XThread {
    fn drop(&mut self) {
        let memory = self.kernel.memory();
        memory.system_heap_free(self.scratch_address);
        memory.system_heap_free(self.tls_static_address);
        memory.system_heap_free(self.pcr_address);
        memory.system_heap_free(self.kthread_address);
        if self.stack_alloc_base != 0 {
            memory.protect(self.stack_alloc_base, self.stack_alloc_size, PageFlags::RW);
            memory.stack_free(self.stack_alloc_base);
        }
    }
}

static NEXT_CPU: AtomicU8 = AtomicU8::new(0);

/// Map a logical-processor mask onto a single CPU index; an empty mask
/// round-robins over the six guest CPUs.
fn fake_cpu_number(proc_mask: u8) -> u8 {
    if proc_mask == 0 {
        return NEXT_CPU.fetch_add(1, Ordering::Relaxed) % 6;
    }
    debug_assert!(proc_mask & 0xC0 == 0);
    let cpu_number = 7 - proc_mask.leading_zeros() as u8;
    debug_assert!(cpu_number < 6);
    cpu_number
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fake_cpu_number_from_mask() {
        assert_eq!(fake_cpu_number(0b0000_0001), 0);
        assert_eq!(fake_cpu_number(0b0000_0010), 1);
        assert_eq!(fake_cpu_number(0b0010_0000), 5);
    }

    #[test]
    fn test_fake_cpu_number_round_robin_stays_in_range() {
        for _ in 0..16 {
            assert!(fake_cpu_number(0) < 6);
        }
    }
}
