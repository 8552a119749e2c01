//! Worker pool and producer/consumer pool behaviour.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use stint_core::PoolConfig;
use stint_scheduler::{
    CancellationToken, PanicHandler, PanicPayload, ParallelConsumingProcessor, ParallelProcessor,
    SchedulerError,
};

#[test]
fn each_worker_runs_once_when_loop_returns_false() {
    stint_core::init_tracing("warn");
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let processor = ParallelProcessor::new(
        move |_: &CancellationToken| {
            counter.fetch_add(1, Ordering::SeqCst);
            false
        },
        None,
    );

    processor.start(3, &CancellationToken::new()).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(processor.stats().iterations, 3);
}

#[test]
fn cancelled_before_start_never_calls_loop() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let processor = ParallelProcessor::new(
        move |_: &CancellationToken| {
            counter.fetch_add(1, Ordering::SeqCst);
            true
        },
        None,
    );

    let token = CancellationToken::new();
    token.cancel();
    processor.start(4, &token).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn external_cancel_stops_running_pool() {
    let processor = ParallelProcessor::new(
        |_: &CancellationToken| {
            thread::sleep(Duration::from_millis(5));
            true
        },
        None,
    );
    let token = CancellationToken::new();
    let canceller = {
        let token = token.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            token.cancel();
        })
    };

    processor.start(2, &token).unwrap();
    canceller.join().unwrap();
    assert!(processor.stats().iterations > 0);
}

#[test]
fn zero_workers_is_an_error() {
    let processor = ParallelProcessor::new(|_: &CancellationToken| false, None);
    assert!(matches!(
        processor.start(0, &CancellationToken::new()),
        Err(SchedulerError::InvalidWorkerCount(0))
    ));
}

#[test]
fn panic_handler_receives_payload() {
    let messages = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&messages);
    let handler: PanicHandler = Arc::new(move |payload: PanicPayload| {
        sink.lock().unwrap().push(payload.to_string());
    });
    let processor = ParallelProcessor::new(|_: &CancellationToken| panic!("worker failed"), Some(handler));

    processor.start(1, &CancellationToken::new()).unwrap();
    assert_eq!(*messages.lock().unwrap(), vec!["worker failed".to_string()]);
}

#[test]
fn start_with_config_uses_configured_workers() {
    let threads = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&threads);
    let processor = ParallelProcessor::new(
        move |_: &CancellationToken| {
            let name = thread::current().name().map(str::to_string);
            seen.lock().unwrap().push(name);
            false
        },
        None,
    );
    let config = PoolConfig {
        workers: 2,
        thread_name: "cfg-pool".into(),
    };

    processor.start_with_config(&config, &CancellationToken::new()).unwrap();
    let names = threads.lock().unwrap();
    assert_eq!(names.len(), 2);
    assert!(names
        .iter()
        .all(|n| n.as_deref().is_some_and(|n| n.starts_with("cfg-pool-"))));
}

// ── Producer / consumer ──────────────────────────────────────

/// Hands out 1, 2, 3, ... and cancels once it reaches `limit`.
fn counting_producer(limit: usize) -> impl Fn(&CancellationToken) -> usize + Send + Sync + 'static {
    let next = AtomicUsize::new(0);
    move |token: &CancellationToken| {
        let n = next.fetch_add(1, Ordering::SeqCst) + 1;
        if n >= limit {
            token.cancel();
        }
        n
    }
}

#[test]
fn single_worker_consumes_until_cancelled() {
    let consumed = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&consumed);
    let processor = ParallelConsumingProcessor::new(
        counting_producer(10),
        move |item: usize, _: &CancellationToken| sink.lock().unwrap().push(item),
        None,
    );

    processor.start(1, &CancellationToken::new()).unwrap();
    // 10 was produced but cancellation fired before it could be consumed.
    assert_eq!(*consumed.lock().unwrap(), (1..10).collect::<Vec<_>>());
}

#[test]
fn several_workers_never_consume_past_cancellation() {
    let consumed = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&consumed);
    let processor = ParallelConsumingProcessor::new(
        counting_producer(10),
        move |item: usize, _: &CancellationToken| sink.lock().unwrap().push(item),
        None,
    );

    processor.start(2, &CancellationToken::new()).unwrap();
    let mut items = consumed.lock().unwrap().clone();
    items.sort_unstable();
    items.dedup();
    assert!(!items.contains(&10));
    assert!(items.iter().all(|i| (1..10).contains(i)));
}

#[test]
fn consumer_panic_goes_to_handler() {
    let handled = Arc::new(AtomicUsize::new(0));
    let count = Arc::clone(&handled);
    let handler: PanicHandler = Arc::new(move |_: PanicPayload| {
        count.fetch_add(1, Ordering::SeqCst);
    });
    let processor = ParallelConsumingProcessor::new(
        |_: &CancellationToken| 1u8,
        |_: u8, _: &CancellationToken| panic!("consumer failed"),
        Some(handler),
    );

    processor.start(2, &CancellationToken::new()).unwrap();
    assert_eq!(handled.load(Ordering::SeqCst), 2);
    assert_eq!(processor.stats().panics, 2);
}
