//! Timing and lifecycle tests for the delaying executor and channel.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::unbounded;

use stint_core::StintConfig;
use stint_scheduler::{DelayingChannel, DelayingExecutor, ExecutorState, SchedulerError};

/// Allowed gap between the requested delay and the observed one.
const MAX_DEVIATION: Duration = Duration::from_millis(100);
const TIMEOUT: Duration = Duration::from_secs(5);

fn assert_close(actual: Duration, expected: Duration) {
    let diff = if actual > expected { actual - expected } else { expected - actual };
    assert!(
        diff <= MAX_DEVIATION,
        "expected ~{expected:?}, got {actual:?}"
    );
}

fn executor() -> DelayingExecutor {
    stint_core::init_tracing("warn");
    DelayingExecutor::new(16).unwrap()
}

#[test]
fn fires_after_delay() {
    let executor = executor();
    let (tx, rx) = unbounded();
    let start = Instant::now();
    executor
        .schedule_after(Duration::from_millis(500), move || tx.send(start.elapsed()).unwrap())
        .unwrap();

    let elapsed = rx.recv_timeout(TIMEOUT).unwrap();
    assert_close(elapsed, Duration::from_millis(500));
}

#[test]
fn two_tasks_fire_in_order_on_time() {
    let executor = executor();
    let (tx, rx) = unbounded();
    let start = Instant::now();
    for (label, ms) in [("late", 800), ("early", 500)] {
        let tx = tx.clone();
        executor
            .schedule_after(Duration::from_millis(ms), move || {
                tx.send((label, start.elapsed())).unwrap()
            })
            .unwrap();
    }

    let (first, at_first) = rx.recv_timeout(TIMEOUT).unwrap();
    let (second, at_second) = rx.recv_timeout(TIMEOUT).unwrap();
    assert_eq!((first, second), ("early", "late"));
    assert_close(at_first, Duration::from_millis(500));
    assert_close(at_second, Duration::from_millis(800));
}

#[test]
fn increasing_delays_fire_in_order() {
    let executor = executor();
    let order = Arc::new(Mutex::new(Vec::new()));
    let (done_tx, done_rx) = unbounded();

    // Scheduled in reverse to make sure ordering comes from the ready time.
    for i in (0..8u64).rev() {
        let order = Arc::clone(&order);
        let done_tx = done_tx.clone();
        executor
            .schedule_after(Duration::from_millis(50 + i * 40), move || {
                order.lock().unwrap().push(i);
                done_tx.send(()).unwrap();
            })
            .unwrap();
    }
    for _ in 0..8 {
        done_rx.recv_timeout(TIMEOUT).unwrap();
    }
    assert_eq!(*order.lock().unwrap(), (0..8).collect::<Vec<_>>());
}

#[test]
fn many_tasks_at_the_same_delay_all_fire() {
    let executor = executor();
    let fired = Arc::new(AtomicUsize::new(0));
    for _ in 0..200 {
        let fired = Arc::clone(&fired);
        executor
            .schedule_after(Duration::from_millis(100), move || {
                fired.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
    }
    executor.shutdown_with_drain(true);

    let deadline = Instant::now() + TIMEOUT;
    while fired.load(Ordering::SeqCst) < 200 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(10));
    }
    assert_eq!(fired.load(Ordering::SeqCst), 200);
}

#[test]
fn panicking_task_does_not_stop_the_loop() {
    let executor = executor();
    let (tx, rx) = unbounded();
    executor
        .schedule_after(Duration::from_millis(10), || panic!("task blew up"))
        .unwrap();
    executor
        .schedule_after(Duration::from_millis(60), move || tx.send(()).unwrap())
        .unwrap();

    rx.recv_timeout(TIMEOUT).unwrap();
    assert_eq!(executor.stats().panicked, 1);
    assert_eq!(executor.state(), ExecutorState::Running);
}

#[test]
fn drain_blocks_until_everything_is_dispatched() {
    let executor = executor();
    let fired = Arc::new(AtomicUsize::new(0));
    let start = Instant::now();
    for ms in [50, 150, 300] {
        let fired = Arc::clone(&fired);
        executor
            .schedule_after(Duration::from_millis(ms), move || {
                fired.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
    }

    executor.shutdown_with_drain(true);
    assert!(start.elapsed() >= Duration::from_millis(300));
    assert_eq!(executor.state(), ExecutorState::Drained);
    assert_eq!(executor.stats().fired, 3);
    assert_eq!(executor.stats().pending, 0);

    let err = executor.schedule_after(Duration::ZERO, || {}).unwrap_err();
    assert!(matches!(err, SchedulerError::ExecutorStopped));
}

#[test]
fn non_blocking_drain_rejects_new_work_but_still_fires() {
    let executor = executor();
    let (tx, rx) = unbounded();
    executor
        .schedule_after(Duration::from_millis(200), move || tx.send(()).unwrap())
        .unwrap();

    let start = Instant::now();
    executor.shutdown_with_drain(false);
    assert!(start.elapsed() < Duration::from_millis(100));
    assert!(matches!(
        executor.try_schedule_after(Duration::ZERO, || {}),
        Err(SchedulerError::ExecutorStopped)
    ));

    rx.recv_timeout(TIMEOUT).unwrap();
}

#[test]
fn fast_stop_discards_pending() {
    let executor = executor();
    let fired = Arc::new(AtomicUsize::new(0));
    for _ in 0..5 {
        let fired = Arc::clone(&fired);
        executor
            .schedule_after(Duration::from_millis(200), move || {
                fired.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
    }
    executor.shutdown_fast();
    assert_eq!(executor.state(), ExecutorState::FastStopped);

    // A blocking drain after a fast stop returns at once.
    executor.shutdown_with_drain(true);
    thread::sleep(Duration::from_millis(400));
    assert_eq!(fired.load(Ordering::SeqCst), 0);
    assert!(matches!(
        executor.schedule_after(Duration::ZERO, || {}),
        Err(SchedulerError::ExecutorStopped)
    ));

    let stats = executor.stats();
    assert_eq!(stats.discarded, 5);
    assert_eq!(stats.rejected, 1);
}

#[test]
fn shutdown_calls_are_idempotent() {
    let executor = executor();
    executor.shutdown_fast();
    executor.shutdown_fast();
    executor.shutdown_with_drain(false);
    executor.shutdown_with_drain(true);
    assert_eq!(executor.state(), ExecutorState::FastStopped);

    let executor = self::executor();
    executor.shutdown_with_drain(false);
    executor.shutdown_with_drain(true);
    executor.shutdown_with_drain(true);
    assert_eq!(executor.state(), ExecutorState::Drained);
    // Already drained; a fast stop changes nothing.
    executor.shutdown_fast();
    assert_eq!(executor.state(), ExecutorState::Drained);
}

#[test]
fn dropped_executor_still_fires_accepted_tasks() {
    let (tx, rx) = unbounded();
    {
        let executor = executor();
        executor
            .schedule_after(Duration::from_millis(100), move || tx.send(()).unwrap())
            .unwrap();
    }
    rx.recv_timeout(TIMEOUT).unwrap();
}

#[test]
fn stats_serialize_to_json() {
    let executor = executor();
    executor.schedule_after(Duration::ZERO, || {}).unwrap();
    executor.shutdown_with_drain(true);

    let json = serde_json::to_value(executor.stats()).unwrap();
    assert_eq!(json["scheduled"], 1);
    assert_eq!(json["fired"], 1);
    assert_eq!(json["pending"], 0);
    assert_eq!(serde_json::to_value(executor.state()).unwrap(), "Drained");
}

// ── Delaying channel ──────────────────────────────────────────

#[test]
fn channel_delivers_after_close_then_yields_default() {
    let channel = DelayingChannel::new(4).unwrap();
    let start = Instant::now();
    channel.add_after(7u32, Duration::from_millis(500)).unwrap();
    channel.close().unwrap();

    assert_eq!(channel.get(), 7);
    assert_close(start.elapsed(), Duration::from_millis(500));

    // Closed and drained: zero values from now on.
    assert_eq!(channel.get(), 0);
    assert_eq!(channel.get(), 0);
    assert_eq!(channel.recv(), None);
    assert_eq!(channel.outstanding(), 0);
}

#[test]
fn channel_orders_values_by_delay() {
    let channel = DelayingChannel::new(8).unwrap();
    for (value, ms) in [("c", 300), ("a", 100), ("b", 200)] {
        channel.add_after(value.to_string(), Duration::from_millis(ms)).unwrap();
    }
    let got: Vec<String> = (0..3).map(|_| channel.get()).collect();
    assert_eq!(got, vec!["a", "b", "c"]);
}

#[test]
fn channel_close_twice_fails() {
    let channel: DelayingChannel<u8> = DelayingChannel::new(1).unwrap();
    assert!(!channel.is_closed());
    channel.close().unwrap();
    assert!(channel.is_closed());
    assert!(matches!(channel.close(), Err(SchedulerError::AlreadyClosed)));
}

#[test]
fn channel_rejects_values_after_close() {
    let channel = DelayingChannel::new(1).unwrap();
    channel.close().unwrap();
    assert!(matches!(
        channel.add_after(1i64, Duration::ZERO),
        Err(SchedulerError::ChannelClosed)
    ));
    assert_eq!(channel.outstanding(), 0);
    assert_eq!(channel.get(), 0);
}

#[test]
fn channel_recv_timeout_before_delay() {
    let channel = DelayingChannel::new(1).unwrap();
    channel.add_after('x', Duration::from_millis(300)).unwrap();
    assert!(channel.recv_timeout(Duration::from_millis(50)).is_err());
    assert_eq!(channel.recv_timeout(TIMEOUT), Ok('x'));
}

#[test]
fn channel_from_config() {
    let config = StintConfig::from_toml("[channel]\ncapacity = 2\n").unwrap();
    let channel = DelayingChannel::with_config(&config).unwrap();
    channel.add_after(1u8, Duration::from_millis(20)).unwrap();
    channel.add_after(2u8, Duration::from_millis(40)).unwrap();
    assert_eq!(channel.get(), 1);
    assert_eq!(channel.get(), 2);
}
