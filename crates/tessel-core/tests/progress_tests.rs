use std::sync::Mutex;
use std::thread;

use tessel_core::core::PROGRESS_STEPS;
use tessel_core::{
    Axis, CallbackControl, DispatchOptions, DispatchStrategy, Dispatcher, ExecutionControl, Extent,
};

#[derive(Default)]
struct ProgressLog {
    updates: Mutex<Vec<(thread::ThreadId, f64)>>,
}

impl ExecutionControl for ProgressLog {
    fn update_progress(&self, fraction: f64) {
        self.updates
            .lock()
            .expect("progress lock poisoned")
            .push((thread::current().id(), fraction));
    }
}

fn options_for(strategy: DispatchStrategy) -> DispatchOptions {
    match strategy {
        DispatchStrategy::FixedThreads => DispatchOptions::fixed(4),
        DispatchStrategy::DynamicRange => {
            DispatchOptions::dynamic().with_desired_bytes_per_piece(4096)
        }
    }
}

#[test]
fn progress_is_monotone_and_ends_at_one() -> Result<(), Box<dyn std::error::Error>> {
    let whole = Extent::new(0, 63, 0, 63, 0, 15);

    for strategy in [DispatchStrategy::FixedThreads, DispatchStrategy::DynamicRange] {
        let log = ProgressLog::default();
        Dispatcher::new(options_for(strategy)).run_with_control(whole, &log, |context| {
            let extent = context.extent();
            let rows = (extent.len(Axis::Y) * extent.len(Axis::Z)) as u64;
            let mut ticker = context.row_ticker(rows);
            for _ in 0..rows {
                ticker.tick();
            }
            Ok(())
        })?;

        let updates = log.updates.into_inner().expect("progress lock poisoned");
        let fractions: Vec<f64> = updates.iter().map(|(_, fraction)| *fraction).collect();
        assert!(!fractions.is_empty());
        assert!(
            fractions.windows(2).all(|pair| pair[0] < pair[1]),
            "{strategy:?}: {fractions:?}"
        );
        assert_eq!(fractions.last().copied(), Some(1.0));
        assert!(fractions.len() <= 2 * PROGRESS_STEPS as usize + 1);
    }

    Ok(())
}

#[test]
fn only_leader_thread_publishes_during_run() -> Result<(), Box<dyn std::error::Error>> {
    let whole = Extent::new(0, 15, 0, 255, 0, 0);
    let log = ProgressLog::default();
    let leader_thread = Mutex::new(None);

    Dispatcher::new(DispatchOptions::fixed(4)).run_with_control(whole, &log, |context| {
        if context.is_leader() {
            *leader_thread.lock().expect("leader lock poisoned") = Some(thread::current().id());
        }
        let mut ticker = context.row_ticker(64);
        for _ in 0..64 {
            ticker.tick();
        }
        Ok(())
    })?;

    let leader = leader_thread
        .into_inner()
        .expect("leader lock poisoned")
        .ok_or("no leader piece ran")?;
    let updates = log.updates.into_inner().expect("progress lock poisoned");
    let (last, during) = updates.split_last().ok_or("no progress published")?;

    assert_eq!(last.1, 1.0);
    assert!(!during.is_empty());
    assert!(during.iter().all(|(thread, _)| *thread == leader));

    Ok(())
}

#[test]
fn aborted_run_does_not_publish_completion() -> Result<(), Box<dyn std::error::Error>> {
    let whole = Extent::new(0, 15, 0, 255, 0, 0);
    let fractions = Mutex::new(Vec::new());
    let control = CallbackControl::new(|fraction| {
        fractions.lock().expect("fraction lock poisoned").push(fraction);
    });
    control.abort_flag().abort();

    let report = Dispatcher::new(DispatchOptions::fixed(2)).run_with_control(
        whole,
        &control,
        |_| Ok(()),
    )?;

    assert!(report.aborted);
    assert!(fractions.lock().expect("fraction lock poisoned").is_empty());

    Ok(())
}
