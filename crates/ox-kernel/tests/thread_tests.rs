//! Guest thread lifecycle and APC delivery tests

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use ox_core::config::RuntimeConfig;
use ox_guest::PpcContext;
use ox_kernel::{CreationParams, KernelState, Processor, XThread, X_CREATE_SUSPENDED};
use ox_memory::{GuestMemory, MemoryError};

const CODE_BASE: u32 = 0x0010_0000;
const ENTRY: u32 = 0x0010_0000;
const APC_ROUTINE: u32 = 0x0010_0100;

static EXIT_MARKER: AtomicU32 = AtomicU32::new(0);

// Entry function: writes its start context into guest memory at 0x500 and
// returns 42 through r3.
extern "C" fn entry_fn(ctx: &mut PpcContext, base: *mut u8) {
    let context_arg = ctx.r[3].u32();
    unsafe {
        let slot = base.add(0x500) as *mut u32;
        *slot = context_arg.to_be();
    }
    EXIT_MARKER.store(1, Ordering::SeqCst);
    ctx.r[3].set_u64(42);
}

// APC normal routine: records its normal_context (r3) in delivery order.
// The order log is shared, so APC tests serialize on APC_TEST_LOCK.
static APC_ORDER: parking_lot::Mutex<Vec<u32>> = parking_lot::Mutex::new(Vec::new());
static APC_TEST_LOCK: parking_lot::Mutex<()> = parking_lot::Mutex::new(());

extern "C" fn apc_fn(ctx: &mut PpcContext, _base: *mut u8) {
    APC_ORDER.lock().push(ctx.r[3].u32());
}

fn kernel() -> Arc<KernelState> {
    let memory = Arc::new(GuestMemory::with_default_size());
    let processor = Processor::new(CODE_BASE, 0x1000);
    processor.set_function(ENTRY, entry_fn);
    processor.set_function(APC_ROUTINE, apc_fn);
    KernelState::new(memory, processor, RuntimeConfig::default())
}

fn spawn_params() -> CreationParams {
    CreationParams {
        stack_size: 0x8000,
        xapi_thread_startup: 0,
        start_address: ENTRY,
        start_context: 0xCAFE_F00D,
        creation_flags: 0,
    }
}

#[test]
fn test_thread_runs_entry_and_exits() {
    let kernel = kernel();
    let thread = XThread::create(&kernel, spawn_params(), true, true).unwrap();
    let thread_id = thread.thread_id();

    thread.join();
    assert_eq!(EXIT_MARKER.load(Ordering::SeqCst), 1);
    // The start context was passed in r3 and reached guest memory.
    assert_eq!(kernel.memory().read_be32(0x500).unwrap(), 0xCAFE_F00D);
    // The thread released its registration on exit.
    assert!(kernel.thread_by_id(thread_id).is_none());
}

#[test]
fn test_stack_has_guard_pages() {
    let kernel = kernel();
    let mut params = spawn_params();
    params.creation_flags = X_CREATE_SUSPENDED;
    let thread = XThread::create(&kernel, params, true, false).unwrap();

    assert!(thread.stack_limit() < thread.stack_base());
    assert_eq!(
        thread.stack_base() - thread.stack_limit(),
        0x8000,
        "stack span is the requested size"
    );

    // Guard pages on both sides refuse access.
    assert!(matches!(
        kernel.memory().read_u8(thread.stack_limit() - 1),
        Err(MemoryError::AccessViolation { .. })
    ));
    assert!(matches!(
        kernel.memory().read_u8(thread.stack_base()),
        Err(MemoryError::AccessViolation { .. })
    ));
    // The stack itself is poisoned and accessible.
    assert_eq!(kernel.memory().read_u8(thread.stack_limit()).unwrap(), 0xBE);

    thread.terminate(0);
    thread.join();
}

#[test]
fn test_min_stack_size_is_enforced() {
    let kernel = kernel();
    let mut params = spawn_params();
    params.stack_size = 0x100;
    params.creation_flags = X_CREATE_SUSPENDED;
    let thread = XThread::create(&kernel, params, true, false).unwrap();
    assert!(thread.stack_base() - thread.stack_limit() >= 16 * 1024);
    thread.terminate(0);
    thread.join();
}

#[test]
fn test_suspend_count_mirrors_kthread() {
    let kernel = kernel();
    let mut params = spawn_params();
    params.creation_flags = X_CREATE_SUSPENDED;
    let thread = XThread::create(&kernel, params, true, false).unwrap();

    assert_eq!(thread.suspend_count(), 1);
    let previous = thread.suspend(); // from another thread
    assert_eq!(previous, 1);
    assert_eq!(thread.suspend_count(), 2);
    assert_eq!(thread.resume(), 2);
    assert_eq!(thread.suspend_count(), 1);

    thread.terminate(0);
    thread.join();
}

#[test]
fn test_tls_slot_bounds() {
    let kernel = kernel();
    let mut params = spawn_params();
    params.creation_flags = X_CREATE_SUSPENDED;
    let thread = XThread::create(&kernel, params, true, false).unwrap();

    assert!(thread.set_tls_value(0, 0x1234_5678));
    assert_eq!(thread.get_tls_value(0), Some(0x1234_5678));
    assert!(thread.set_tls_value(1023, 1));
    assert_eq!(thread.get_tls_value(1023), Some(1));
    // Slot 1024 is out of the dynamic region.
    assert!(!thread.set_tls_value(1024, 1));

    thread.terminate(0);
    thread.join();
}

#[test]
fn test_apc_delivery_is_fifo() {
    let _lock = APC_TEST_LOCK.lock();
    let kernel = kernel();
    let mut params = spawn_params();
    params.creation_flags = X_CREATE_SUSPENDED;
    let thread = XThread::create(&kernel, params, true, false).unwrap();

    APC_ORDER.lock().clear();
    thread.enqueue_apc(APC_ROUTINE, 1, 0, 0);
    thread.enqueue_apc(APC_ROUTINE, 2, 0, 0);
    thread.enqueue_apc(APC_ROUTINE, 3, 0, 0);

    thread.deliver_apcs();
    assert_eq!(*APC_ORDER.lock(), vec![1, 2, 3]);

    thread.terminate(0);
    thread.join();
}

#[test]
fn test_apc_delivery_gated_by_critical_region() {
    let _lock = APC_TEST_LOCK.lock();
    let kernel = kernel();
    let mut params = spawn_params();
    params.creation_flags = X_CREATE_SUSPENDED;
    let thread = XThread::create(&kernel, params, true, false).unwrap();

    APC_ORDER.lock().clear();
    thread.enter_critical_region();
    thread.enqueue_apc(APC_ROUTINE, 7, 0, 0);
    thread.deliver_apcs();
    assert!(APC_ORDER.lock().is_empty(), "delivery is disabled");

    thread.leave_critical_region();
    thread.deliver_apcs();
    assert_eq!(*APC_ORDER.lock(), vec![7]);

    thread.terminate(0);
    thread.join();
}

#[test]
fn test_save_restore_round_trip() {
    let kernel = kernel();
    let mut params = spawn_params();
    params.creation_flags = X_CREATE_SUSPENDED;
    let thread = XThread::create(&kernel, params, true, false).unwrap();
    let thread_id = thread.thread_id();

    // Stage recognisable register state while the thread is quiescent.
    unsafe {
        let ctx = thread.thread_state().context();
        ctx.lr = 0x8200_1234;
        ctx.r[31].set_u64(0xDEAD_BEEF_1122_3344);
        ctx.f[1].set_f64(2.5);
        ctx.v[7].set_u32_lane(2, 0xABCD_EF01);
        ctx.cr[0].set_raw(0b1010);
        ctx.xer.ca = 1;
    }

    let mut stream = ox_kernel::ByteStream::new();
    assert!(thread.save(&mut stream));

    let tls = thread.get_tls_value(0);
    let stack_base = thread.stack_base();

    // Drop the original before restoring under the same id.
    thread.terminate(0);
    thread.join();

    let mut stream = ox_kernel::ByteStream::from_vec(stream.into_vec());
    let restored = XThread::restore(&kernel, &mut stream).unwrap();

    assert_eq!(restored.thread_id(), thread_id);
    assert_eq!(restored.stack_base(), stack_base);
    assert_eq!(restored.get_tls_value(0), tls);
    unsafe {
        let ctx = restored.thread_state().context();
        assert_eq!(ctx.lr, 0x8200_1234);
        assert_eq!(ctx.r[31].u64(), 0xDEAD_BEEF_1122_3344);
        assert_eq!(ctx.f[1].f64(), 2.5);
        assert_eq!(ctx.v[7].u32_lane(2), 0xABCD_EF01);
        assert_eq!(ctx.cr[0].raw(), 0b1010);
        assert_eq!(ctx.xer.ca, 1);
    }
    assert!(kernel.thread_by_id(thread_id).is_some());
}

#[test]
fn test_quiescent_thread_saves() {
    let kernel = kernel();
    let mut params = spawn_params();
    params.creation_flags = X_CREATE_SUSPENDED;
    let thread = XThread::create(&kernel, params, true, false).unwrap();

    let mut stream = ox_kernel::ByteStream::new();
    assert!(thread.save(&mut stream));
    // The stream leads with the KRNL signature.
    let mut stream = ox_kernel::ByteStream::from_vec(stream.into_vec());
    assert_eq!(stream.read_u32(), Some(u32::from_be_bytes(*b"KRNL")));

    thread.terminate(0);
    thread.join();
}
