use std::sync::Mutex;

use tessel_core::config::{
    self, DEFAULT_DESIRED_BYTES_PER_PIECE, DispatchOptions, DispatchStrategy, MAX_THREADS,
};
use tessel_core::{Axis, Extent, SplitConfig, SplitMode, SplitPath};

static GLOBAL_SMP_MUTEX: Mutex<()> = Mutex::new(());

#[test]
fn defaults_match_documented_values() {
    let options = DispatchOptions::default();

    assert_eq!(options.enable_smp, None);
    assert_eq!(options.desired_bytes_per_piece, DEFAULT_DESIRED_BYTES_PER_PIECE);
    assert_eq!(options.bytes_per_sample, 1);
    assert_eq!(options.number_of_threads, num_cpus::get().clamp(1, MAX_THREADS));
    assert_eq!(options.dynamic_pool_threads, None);
    assert_eq!(DispatchOptions::dynamic().dynamic_pool_threads, None);

    let split = SplitConfig::default();
    assert_eq!(split.mode, SplitMode::Slab);
    assert_eq!(split.path.axes(), &[Axis::Z, Axis::Y, Axis::X]);
    assert_eq!(split.min_piece_size, [16, 1, 1]);
}

#[test]
fn explicit_smp_overrides_global_default() {
    let _guard = GLOBAL_SMP_MUTEX.lock().expect("global smp lock poisoned");

    config::set_global_default_enable_smp(false);
    assert_eq!(
        DispatchOptions::default().strategy(),
        DispatchStrategy::FixedThreads
    );
    assert_eq!(
        DispatchOptions::dynamic().strategy(),
        DispatchStrategy::DynamicRange
    );

    config::set_global_default_enable_smp(true);
    assert_eq!(
        DispatchOptions::default().strategy(),
        DispatchStrategy::DynamicRange
    );
    assert_eq!(
        DispatchOptions::fixed(2).strategy(),
        DispatchStrategy::FixedThreads
    );
}

#[test]
fn thread_counts_are_clamped() {
    assert_eq!(config::clamp_threads(0), 1);
    assert_eq!(config::clamp_threads(7), 7);
    assert_eq!(config::clamp_threads(MAX_THREADS + 1), MAX_THREADS);
    assert_eq!(DispatchOptions::fixed(500).clamped_threads(), MAX_THREADS);
}

#[test]
fn dynamic_estimate_rounds_up() {
    let whole = Extent::new(0, 99, 0, 0, 0, 0);
    let options = DispatchOptions::dynamic()
        .with_desired_bytes_per_piece(64)
        .with_bytes_per_sample(2);

    assert_eq!(options.estimate_dynamic_pieces(&whole, 8), 4);
    assert_eq!(
        options
            .with_desired_bytes_per_piece(0)
            .estimate_dynamic_pieces(&whole, 8),
        8
    );
    assert_eq!(
        options.estimate_dynamic_pieces(&Extent::new(0, 0, 0, 0, 0, 0), 8),
        1
    );
}

#[test]
fn options_round_trip_through_serde() -> Result<(), Box<dyn std::error::Error>> {
    let options = DispatchOptions::fixed(3).with_split(
        SplitConfig::new(SplitMode::Beam, SplitPath::new(&[Axis::Y, Axis::Z])?)
            .with_min_piece_size([4, 2, 1]),
    );

    let value = serde_json::to_value(options)?;
    assert_eq!(value["split"]["path"], serde_json::json!(["Y", "Z"]));

    let decoded: DispatchOptions = serde_json::from_value(value)?;
    assert_eq!(decoded, options);

    let pooled = DispatchOptions::dynamic().with_dynamic_pool_threads(6);
    let decoded: DispatchOptions = serde_json::from_value(serde_json::to_value(pooled)?)?;
    assert_eq!(decoded.dynamic_pool_threads, Some(6));

    let mut legacy = serde_json::to_value(DispatchOptions::fixed(2))?;
    if let Some(fields) = legacy.as_object_mut() {
        fields.remove("dynamic_pool_threads");
    }
    let decoded: DispatchOptions = serde_json::from_value(legacy)?;
    assert_eq!(decoded.dynamic_pool_threads, None);

    let duplicate = serde_json::json!(["X", "X"]);
    assert!(serde_json::from_value::<SplitPath>(duplicate).is_err());

    Ok(())
}
