use stagger_log::{Scheduler, StaggeredLogger, TimerThread};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

#[test]
fn test_never_fires_early() {
    let timers = TimerThread::spawn().unwrap();
    let fired_at = Arc::new(Mutex::new(None));
    let task_fired_at = fired_at.clone();
    let armed_at = Instant::now();

    timers
        .arm(
            Duration::from_millis(50),
            1,
            Box::new(move |_| *task_fired_at.lock().unwrap() = Some(Instant::now())),
        )
        .unwrap();

    thread::sleep(Duration::from_millis(200));
    let fired_at = fired_at.lock().unwrap().expect("timer did not fire");
    assert!(fired_at - armed_at >= Duration::from_millis(50));
}

#[test]
fn test_fires_in_deadline_order() {
    let timers = TimerThread::spawn().unwrap();
    let order = Arc::new(Mutex::new(Vec::new()));

    for (delay, generation) in [(60, 3), (20, 1), (40, 2)] {
        let order = order.clone();
        timers
            .arm(
                Duration::from_millis(delay),
                generation,
                Box::new(move |generation| order.lock().unwrap().push(generation)),
            )
            .unwrap();
    }

    thread::sleep(Duration::from_millis(250));
    assert_eq!(*order.lock().unwrap(), vec![1, 2, 3]);
}

#[test]
fn test_cancel_before_deadline() {
    let timers = TimerThread::spawn().unwrap();
    let count = Arc::new(AtomicUsize::new(0));
    let task_count = count.clone();

    let id = timers
        .arm(
            Duration::from_millis(30),
            1,
            Box::new(move |_| {
                task_count.fetch_add(1, Ordering::SeqCst);
            }),
        )
        .unwrap();
    timers.cancel(id);

    thread::sleep(Duration::from_millis(100));
    assert_eq!(count.load(Ordering::SeqCst), 0);
    assert_eq!(timers.pending(), 0);
}

#[test]
fn test_cancel_waits_for_running_task() {
    let timers = TimerThread::spawn().unwrap();
    let started = Arc::new(AtomicBool::new(false));
    let finished = Arc::new(AtomicBool::new(false));
    let (task_started, task_finished) = (started.clone(), finished.clone());

    let id = timers
        .arm(
            Duration::ZERO,
            1,
            Box::new(move |_| {
                task_started.store(true, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(80));
                task_finished.store(true, Ordering::SeqCst);
            }),
        )
        .unwrap();

    while !started.load(Ordering::SeqCst) {
        thread::yield_now();
    }
    timers.cancel(id);
    assert!(finished.load(Ordering::SeqCst));
}

#[test]
fn test_panicking_task_does_not_stop_worker() {
    let timers = TimerThread::spawn().unwrap();
    let count = Arc::new(AtomicUsize::new(0));
    let task_count = count.clone();

    timers
        .arm(Duration::ZERO, 1, Box::new(|_| panic!("boom")))
        .unwrap();
    timers
        .arm(
            Duration::from_millis(20),
            2,
            Box::new(move |_| {
                task_count.fetch_add(1, Ordering::SeqCst);
            }),
        )
        .unwrap();

    thread::sleep(Duration::from_millis(150));
    assert!(timers.is_running());
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn test_shutdown_discards_pending_timers() {
    let timers = TimerThread::spawn().unwrap();
    let count = Arc::new(AtomicUsize::new(0));
    let task_count = count.clone();

    timers
        .arm(
            Duration::from_millis(30),
            1,
            Box::new(move |_| {
                task_count.fetch_add(1, Ordering::SeqCst);
            }),
        )
        .unwrap();
    timers.shutdown();

    thread::sleep(Duration::from_millis(100));
    assert_eq!(count.load(Ordering::SeqCst), 0);
    assert_eq!(timers.pending(), 0);
}

#[test]
fn test_logger_on_timer_thread() {
    let lines = Arc::new(Mutex::new(Vec::<String>::new()));
    let sink_lines = lines.clone();
    let logger = StaggeredLogger::new(
        "Error",
        Some(Box::new(move |line: &str| {
            sink_lines.lock().unwrap().push(line.to_owned())
        })),
    )
    .unwrap();

    for _ in 0..5 {
        logger.record();
    }
    thread::sleep(Duration::from_millis(400));

    let lines = lines.lock().unwrap();
    assert_eq!(lines.len(), 1);
    let line = &lines[0];
    let (time, rest) = line.split_once(": ").unwrap();
    assert_eq!(time.len(), 8);
    assert!(time.chars().enumerate().all(|(i, c)| match i {
        2 | 5 => c == ':',
        _ => c.is_ascii_digit(),
    }));
    let millis: u64 = rest
        .strip_prefix("Error (5 times in ")
        .and_then(|rest| rest.strip_suffix(" milliseconds)"))
        .and_then(|millis| millis.parse().ok())
        .unwrap_or_else(|| panic!("unexpected line: {line}"));
    assert!(millis >= 100);
    assert_eq!(logger.snapshot().interval_factor, 2);
}

#[test]
fn test_drop_logger_with_pending_window() {
    let count = Arc::new(AtomicUsize::new(0));
    let sink_count = count.clone();
    let logger = StaggeredLogger::new(
        "Teardown",
        Some(Box::new(move |_: &str| {
            sink_count.fetch_add(1, Ordering::SeqCst);
        })),
    )
    .unwrap();

    logger.record();
    drop(logger);

    thread::sleep(Duration::from_millis(200));
    assert_eq!(count.load(Ordering::SeqCst), 0);
}

#[test]
fn test_drop_waits_for_running_summary() {
    let started = Arc::new(AtomicBool::new(false));
    let finished = Arc::new(AtomicBool::new(false));
    let (sink_started, sink_finished) = (started.clone(), finished.clone());
    let logger = StaggeredLogger::new(
        "Slow sink",
        Some(Box::new(move |_: &str| {
            sink_started.store(true, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(150));
            sink_finished.store(true, Ordering::SeqCst);
        })),
    )
    .unwrap();

    logger.record();
    while !started.load(Ordering::SeqCst) {
        thread::yield_now();
    }
    drop(logger);

    assert!(finished.load(Ordering::SeqCst));
}

#[test]
fn test_records_racing_expiry_are_counted_once() {
    let total = Arc::new(AtomicUsize::new(0));
    let sink_total = total.clone();
    let timers = TimerThread::spawn().unwrap();
    let logger = StaggeredLogger::builder("Race")
        .sink(Box::new(move |line: &str| {
            let count: usize = line
                .split_once('(')
                .and_then(|(_, rest)| rest.split_once(' '))
                .and_then(|(count, _)| count.parse().ok())
                .unwrap_or(0);
            sink_total.fetch_add(count, Ordering::SeqCst);
        }))
        .options(stagger_log::StaggerOptions {
            base_interval: Duration::from_millis(5),
            max_interval_factor: 2,
            ..Default::default()
        })
        .scheduler(timers)
        .build()
        .unwrap();

    let recorded = AtomicUsize::new(0);
    thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                let deadline = Instant::now() + Duration::from_millis(100);
                while Instant::now() < deadline {
                    logger.record();
                    recorded.fetch_add(1, Ordering::SeqCst);
                }
            });
        }
    });

    thread::sleep(Duration::from_millis(100));
    assert_eq!(total.load(Ordering::SeqCst), recorded.load(Ordering::SeqCst));
}
