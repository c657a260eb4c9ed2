//! Queue & Fence Synchronization Tests
//!
//! Tests for:
//! - CommandQueue: execute/signal fence values, completion queries
//! - Manual pacing: artificial fence delay via the headless binding
//! - Cross-queue ordering: GPU-side waits, retirement order
//! - CommandManager: flush, dirty-queue signals, list-pool recycling
//! - Wedged-timeline detection (WaitStalled)

use std::sync::Arc;

use kiln::errors::KilnError;
use kiln::gpu::backend::RenderBackend;
use kiln::gpu::fence::Fence;
use kiln::gpu::headless::HeadlessBackend;
use kiln::gpu::manager::CommandManager;
use kiln::gpu::queue::{CommandQueue, QueueClass};

fn backend() -> Arc<HeadlessBackend> {
    Arc::new(HeadlessBackend::new())
}

fn manager(backend: &Arc<HeadlessBackend>) -> CommandManager {
    let dyn_backend: Arc<dyn RenderBackend> = backend.clone();
    CommandManager::new(&dyn_backend).expect("headless queues")
}

// ============================================================================
// CommandQueue
// ============================================================================

#[test]
fn execute_signals_increasing_fence_values() {
    let backend = backend();
    let mut manager = manager(&backend);

    let list_a = manager.allocate_command_list(QueueClass::Graphics, "a");
    let value_a = manager.submit(list_a).unwrap();
    let list_b = manager.allocate_command_list(QueueClass::Graphics, "b");
    let value_b = manager.submit(list_b).unwrap();

    assert!(value_b > value_a);
    // Immediate pacing: everything completes as it is submitted.
    assert!(manager.queue(QueueClass::Graphics).is_complete(value_b));
}

#[test]
fn manual_pacing_delays_completion_until_retirement() {
    let backend = backend();
    backend.pace_manual();
    let mut manager = manager(&backend);

    let list = manager.allocate_command_list(QueueClass::Graphics, "delayed");
    let value = manager.submit(list).unwrap();

    assert!(!manager.queue(QueueClass::Graphics).is_complete(value));
    assert_eq!(backend.pending_count(QueueClass::Graphics), 1);

    assert!(backend.retire_next(QueueClass::Graphics));
    assert!(manager.queue(QueueClass::Graphics).is_complete(value));
}

#[test]
fn wait_until_forces_the_simulated_gpu_to_catch_up() {
    let backend = backend();
    backend.pace_manual();
    let mut manager = manager(&backend);

    let list = manager.allocate_command_list(QueueClass::Graphics, "work");
    let value = manager.submit(list).unwrap();
    assert!(!manager.queue(QueueClass::Graphics).is_complete(value));

    manager.queue(QueueClass::Graphics).wait_until(value).unwrap();
    assert!(manager.queue(QueueClass::Graphics).is_complete(value));
}

// ============================================================================
// Cross-queue ordering
// ============================================================================

#[test]
fn graphics_batch_waits_for_prior_compute_submission() {
    let backend = backend();
    backend.pace_manual();
    let mut manager = manager(&backend);

    let mut compute = manager.allocate_command_list(QueueClass::Compute, "lighting");
    compute.dispatch([4, 4, 1]);
    let compute_value = manager.submit(compute).unwrap();

    let graphics = manager.allocate_command_list(QueueClass::Graphics, "forward");
    manager.submit(graphics).unwrap();

    // The graphics submission carries a GPU-side wait on the compute fence:
    // it cannot retire while the compute batch is still pending.
    assert!(!backend.retire_next(QueueClass::Graphics));
    assert!(backend.retire_next(QueueClass::Compute));
    assert!(manager.queue(QueueClass::Compute).is_complete(compute_value));
    assert!(backend.retire_next(QueueClass::Graphics));

    let retired = backend.take_retired();
    let labels: Vec<&str> = retired.iter().map(|r| r.label.as_str()).collect();
    assert_eq!(labels, vec!["lighting", "forward"]);
}

#[test]
fn wedged_cross_queue_wait_is_reported_not_hung() {
    let backend = backend();
    let queue_backend = backend.create_queue(QueueClass::Graphics).unwrap();
    let mut queue = CommandQueue::new(QueueClass::Graphics, queue_backend);

    // Wait on a fence nothing will ever signal.
    let orphan = Fence::new();
    queue.push_wait(orphan.observer(), 1);
    let value = queue.signal().unwrap();

    let err = queue.wait_until(value).unwrap_err();
    assert!(matches!(err, KilnError::WaitStalled(_)));
}

// ============================================================================
// CommandManager
// ============================================================================

#[test]
fn flush_drains_every_queue() {
    let backend = backend();
    backend.pace_manual();
    let mut manager = manager(&backend);

    for class in QueueClass::ALL {
        let list = manager.allocate_command_list(class, class.name());
        manager.submit(list).unwrap();
    }

    manager.flush().unwrap();

    for class in QueueClass::ALL {
        assert_eq!(backend.pending_count(class), 0);
        let last = manager.queue(class).last_signaled();
        assert!(manager.queue(class).is_complete(last));
    }
}

#[test]
fn signal_used_only_touches_dirty_queues() {
    let backend = backend();
    let mut manager = manager(&backend);

    let list = manager.allocate_command_list(QueueClass::Graphics, "only-graphics");
    manager.submit(list).unwrap();

    let signals = manager.signal_used().unwrap();
    assert_eq!(signals.len(), 1);
    assert_eq!(signals[0].class, QueueClass::Graphics);

    // Nothing new submitted: the next call signals nothing.
    assert!(manager.signal_used().unwrap().is_empty());
}

#[test]
fn list_pool_reuses_only_after_fence_completion() {
    let backend = backend();
    backend.pace_manual();
    let mut manager = manager(&backend);

    let first = manager.allocate_command_list(QueueClass::Graphics, "first");
    manager.submit(first).unwrap();
    assert_eq!(manager.pool(QueueClass::Graphics).in_flight(), 1);

    // The first list's fence is incomplete, so a second list is created.
    let second = manager.allocate_command_list(QueueClass::Graphics, "second");
    manager.submit(second).unwrap();
    assert_eq!(manager.pool(QueueClass::Graphics).created(), 2);

    backend.retire_all();

    // Both lists are reclaimable now; no third list is created.
    let third = manager.allocate_command_list(QueueClass::Graphics, "third");
    assert_eq!(manager.pool(QueueClass::Graphics).created(), 2);
    manager.submit(third).unwrap();
}
