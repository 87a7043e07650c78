use std::time::{Duration, Instant};

use tessel_core::telemetry::profile;

#[test]
fn elapsed_us_reports_elapsed_time() {
    let started_at = Instant::now();
    std::thread::sleep(Duration::from_millis(1));
    assert!(profile::elapsed_us(started_at) >= 1_000);
}

#[cfg(feature = "profiling")]
mod profile_tag_stack_tests {
    use std::sync::{Arc, Mutex};

    use tessel_core::telemetry::tags;
    use tessel_core::telemetry::{GlobalTelemetrySink, TelemetryEvent, events, profile};
    use tessel_core::{DispatchOptions, Dispatcher, Extent};

    static PROFILE_TAG_MUTEX: Mutex<()> = Mutex::new(());

    struct CollectingSink(Arc<Mutex<Vec<TelemetryEvent>>>);

    impl GlobalTelemetrySink for CollectingSink {
        fn on_event(&mut self, event: TelemetryEvent) {
            self.0.lock().expect("sink lock poisoned").push(event);
        }
    }

    #[test]
    fn supports_enabling_multiple_tags_together() {
        let _guard = PROFILE_TAG_MUTEX.lock().expect("profile tag lock poisoned");

        profile::set_enabled_tags(&[tags::TAG_SPLIT, tags::TAG_WORKER]);

        assert!(profile::is_tag_stack_enabled(&[
            tags::TAG_SYSTEM,
            tags::TAG_SPLIT
        ]));
        assert!(profile::is_tag_stack_enabled(&[
            tags::TAG_SYSTEM,
            tags::TAG_WORKER
        ]));
        assert!(!profile::is_tag_stack_enabled(&[
            tags::TAG_SYSTEM,
            tags::TAG_DISPATCH
        ]));

        profile::enable_all_tags();
    }

    #[test]
    fn system_tag_can_enable_shared_events() {
        let _guard = PROFILE_TAG_MUTEX.lock().expect("profile tag lock poisoned");

        profile::set_enabled_tags(&[tags::TAG_SYSTEM]);

        for tag in [tags::TAG_SPLIT, tags::TAG_DISPATCH, tags::TAG_WORKER] {
            assert!(profile::is_tag_stack_enabled(&[tags::TAG_SYSTEM, tag]));
        }

        profile::enable_all_tags();
    }

    #[test]
    fn filtered_events_reach_global_sink() -> Result<(), Box<dyn std::error::Error>> {
        let _guard = PROFILE_TAG_MUTEX.lock().expect("profile tag lock poisoned");

        let received = Arc::new(Mutex::new(Vec::new()));
        events::set_global_sink(Some(Box::new(CollectingSink(Arc::clone(&received)))));
        profile::set_enabled_tags(&[tags::TAG_DISPATCH]);

        Dispatcher::new(DispatchOptions::fixed(2)).run(Extent::new(0, 31, 0, 0, 0, 0), |_| Ok(()))?;

        events::set_global_sink(None);
        profile::enable_all_tags();

        let received = received.lock().expect("sink lock poisoned");
        let profile_targets: Vec<&str> = received
            .iter()
            .filter_map(|event| match event {
                TelemetryEvent::Profile(profile_event) => Some(profile_event.target),
                _ => None,
            })
            .collect();
        assert_eq!(profile_targets, vec![tags::PROFILE_DISPATCH]);
        assert!(matches!(received.first(), Some(TelemetryEvent::DispatchStarted(_))));
        assert!(matches!(received.last(), Some(TelemetryEvent::DispatchCompleted(_))));

        Ok(())
    }
}

#[cfg(not(feature = "profiling"))]
mod profile_tag_stack_disabled_tests {
    use tessel_core::telemetry::profile;
    use tessel_core::telemetry::tags;

    #[test]
    fn profile_api_is_noop_and_tags_remain_disabled() {
        profile::set_enabled_tags(&[tags::TAG_SPLIT, tags::TAG_WORKER]);
        profile::reload_enabled_tags_from_env();
        profile::enable_all_tags();

        assert!(!profile::is_tag_stack_enabled(&[tags::TAG_SYSTEM]));
        assert!(!profile::is_tag_stack_enabled(&[
            tags::TAG_SYSTEM,
            tags::TAG_WORKER
        ]));

        profile::event(
            tags::PROFILE_DISPATCH,
            &[tags::TAG_SYSTEM, tags::TAG_DISPATCH],
            "noop",
            "ok",
            1,
            "profiling disabled",
        );
    }
}
