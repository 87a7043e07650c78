#[cfg(feature = "telemetry")]
mod telemetry_enabled_tests {
    use std::sync::Mutex;

    use tessel_core::telemetry;
    use tessel_core::telemetry::tags;
    use tessel_core::{AbortFlag, DispatchOptions, Dispatcher, Extent, TesselError};

    static TELEMETRY_TEST_MUTEX: Mutex<()> = Mutex::new(());

    #[test]
    fn records_dispatch_and_piece_metrics() -> Result<(), Box<dyn std::error::Error>> {
        let _guard = TELEMETRY_TEST_MUTEX
            .lock()
            .expect("telemetry test lock poisoned");

        telemetry::reset();

        let whole = Extent::new(0, 15, 0, 7, 0, 0);
        let report = Dispatcher::new(DispatchOptions::fixed(4)).run(whole, |_| Ok(()))?;
        assert_eq!(report.pieces_total, 4);

        let snapshot = telemetry::snapshot();
        assert_eq!(snapshot.counter(tags::METRIC_DISPATCH_RUN_COUNT), Some(1));
        assert_eq!(
            snapshot.counter(tags::METRIC_WORKER_PIECE_START_COUNT),
            Some(4)
        );
        assert_eq!(
            snapshot.counter(tags::METRIC_WORKER_PIECE_FINISH_COUNT),
            Some(4)
        );
        assert_eq!(snapshot.gauge(tags::METRIC_WORKER_ACTIVE_COUNT), Some(0));

        let latency = snapshot
            .histogram(tags::METRIC_WORKER_PIECE_LATENCY_US)
            .ok_or("missing piece latency histogram")?;
        assert_eq!(latency.count, 4);
        assert!(latency.min <= latency.max);

        let pieces = snapshot
            .histogram(tags::METRIC_DISPATCH_PIECES)
            .ok_or("missing pieces histogram")?;
        assert_eq!(pieces.total, 4);

        Ok(())
    }

    #[test]
    fn records_failures_and_aborts() {
        let _guard = TELEMETRY_TEST_MUTEX
            .lock()
            .expect("telemetry test lock poisoned");

        telemetry::reset();

        let whole = Extent::new(0, 15, 0, 1, 0, 0);
        let result = Dispatcher::new(DispatchOptions::fixed(2)).run(whole, |context| {
            if context.piece() == 1 {
                return Err(TesselError::Kernel("bad row".to_string()));
            }
            Ok(())
        });
        assert!(result.is_err());

        let abort = AbortFlag::new();
        abort.abort();
        let report = Dispatcher::new(DispatchOptions::fixed(2))
            .run_with_control(whole, &abort, |_| Ok(()))
            .expect("aborted run is not an error");
        assert!(report.aborted);

        let snapshot = telemetry::snapshot();
        assert_eq!(
            snapshot.counter(tags::METRIC_WORKER_PIECE_FAIL_COUNT),
            Some(1)
        );
        assert_eq!(
            snapshot.counter(tags::METRIC_WORKER_PIECE_SKIP_COUNT),
            Some(2)
        );
        assert_eq!(snapshot.counter(tags::METRIC_DISPATCH_ABORT_COUNT), Some(1));
    }

    #[test]
    fn report_can_carry_snapshot() -> Result<(), Box<dyn std::error::Error>> {
        let _guard = TELEMETRY_TEST_MUTEX
            .lock()
            .expect("telemetry test lock poisoned");

        telemetry::reset();

        let report = Dispatcher::new(DispatchOptions::fixed(1))
            .run(Extent::new(0, 3, 0, 3, 0, 0), |_| Ok(()))?
            .with_telemetry_snapshot(true);

        let snapshot = report.telemetry.ok_or("missing snapshot")?;
        assert_eq!(snapshot.counter(tags::METRIC_DISPATCH_RUN_COUNT), Some(1));

        Ok(())
    }
}

#[cfg(not(feature = "telemetry"))]
mod telemetry_disabled_tests {
    use tessel_core::telemetry;
    use tessel_core::telemetry::tags;
    use tessel_core::{DispatchOptions, Dispatcher, Extent};

    #[test]
    fn registry_stays_empty() -> Result<(), Box<dyn std::error::Error>> {
        Dispatcher::new(DispatchOptions::fixed(2)).run(Extent::new(0, 31, 0, 0, 0, 0), |_| Ok(()))?;

        let snapshot = telemetry::snapshot();
        assert_eq!(snapshot.counter(tags::METRIC_DISPATCH_RUN_COUNT), None);
        assert!(snapshot.histograms.is_empty());

        Ok(())
    }
}
