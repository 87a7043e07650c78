use std::time::Instant;

#[cfg(feature = "profiling")]
use crate::telemetry::events::{ProfileEvent, TelemetryEvent, emit_global};
#[cfg(feature = "profiling")]
use crate::telemetry::tags;
#[cfg(feature = "profiling")]
use std::collections::BTreeSet;
#[cfg(feature = "profiling")]
use std::sync::{OnceLock, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Microseconds since `started_at`, clamped to `u64::MAX`.
#[inline]
pub fn elapsed_us(started_at: Instant) -> u64 {
    crate::types::duration_to_us(started_at.elapsed())
}

/// Comma-separated list of enabled tags; `*` or `all` enables everything.
#[cfg(feature = "profiling")]
const PROFILE_TAGS_ENV: &str = "TESSEL_PROFILE_TAGS";

// None => every tag enabled.
#[cfg(feature = "profiling")]
type TagFilter = Option<BTreeSet<String>>;

#[cfg(feature = "profiling")]
fn parse_tags<'a>(tokens: impl IntoIterator<Item = &'a str>) -> TagFilter {
    let mut enabled = BTreeSet::new();
    for token in tokens {
        let normalized = token.trim().to_ascii_lowercase();
        if normalized.is_empty() {
            continue;
        }
        if normalized == "*" || normalized == "all" {
            return None;
        }
        enabled.insert(normalized);
    }

    if enabled.is_empty() { None } else { Some(enabled) }
}

#[cfg(feature = "profiling")]
fn env_filter() -> TagFilter {
    std::env::var(PROFILE_TAGS_ENV)
        .ok()
        .and_then(|raw| parse_tags(raw.split(',')))
}

#[cfg(feature = "profiling")]
fn filter_state() -> &'static RwLock<TagFilter> {
    static STATE: OnceLock<RwLock<TagFilter>> = OnceLock::new();
    STATE.get_or_init(|| RwLock::new(env_filter()))
}

#[cfg(feature = "profiling")]
fn read_filter() -> RwLockReadGuard<'static, TagFilter> {
    match filter_state().read() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(feature = "profiling")]
fn write_filter() -> RwLockWriteGuard<'static, TagFilter> {
    match filter_state().write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(feature = "profiling")]
pub fn enable_all_tags() {
    *write_filter() = None;
}

#[cfg(not(feature = "profiling"))]
pub fn enable_all_tags() {}

/// Replaces the enabled tag set. An empty slice enables every tag.
#[cfg(feature = "profiling")]
pub fn set_enabled_tags(tags: &[&str]) {
    *write_filter() = parse_tags(tags.iter().copied());
}

#[cfg(not(feature = "profiling"))]
pub fn set_enabled_tags(_tags: &[&str]) {}

/// Reloads enabled tags from `TESSEL_PROFILE_TAGS`.
#[cfg(feature = "profiling")]
pub fn reload_enabled_tags_from_env() {
    *write_filter() = env_filter();
}

#[cfg(not(feature = "profiling"))]
pub fn reload_enabled_tags_from_env() {}

/// True when at least one tag of the stack is enabled.
#[cfg(feature = "profiling")]
pub fn is_tag_stack_enabled(tag_stack: &[&str]) -> bool {
    match &*read_filter() {
        None => true,
        Some(enabled) => tag_stack
            .iter()
            .any(|tag| enabled.contains(&tag.to_ascii_lowercase())),
    }
}

#[cfg(not(feature = "profiling"))]
pub fn is_tag_stack_enabled(_tag_stack: &[&str]) -> bool {
    false
}

#[cfg(feature = "profiling")]
#[inline]
pub fn event(
    target: &'static str,
    tag_stack: &[&str],
    op: &'static str,
    result: &'static str,
    elapsed_us: u64,
    message: &'static str,
) {
    if !is_tag_stack_enabled(tag_stack) {
        return;
    }

    emit_global(TelemetryEvent::Profile(ProfileEvent {
        target,
        op,
        result,
        elapsed_us,
        tags: tag_stack.iter().map(|tag| (*tag).to_string()).collect(),
        message,
    }));

    // tracing needs the target as a literal
    match target {
        tags::PROFILE_SPLIT => {
            tracing::debug!(target: tags::PROFILE_SPLIT, op, result, elapsed_us, tags = ?tag_stack, "{message}");
        }
        tags::PROFILE_DISPATCH => {
            tracing::debug!(target: tags::PROFILE_DISPATCH, op, result, elapsed_us, tags = ?tag_stack, "{message}");
        }
        tags::PROFILE_WORKER => {
            tracing::debug!(target: tags::PROFILE_WORKER, op, result, elapsed_us, tags = ?tag_stack, "{message}");
        }
        _ => {
            tracing::debug!(target: "tessel.profile", op, result, elapsed_us, original_target = target, tags = ?tag_stack, "{message}");
        }
    }
}

#[cfg(not(feature = "profiling"))]
#[inline]
pub fn event(
    _target: &'static str,
    _tag_stack: &[&str],
    _op: &'static str,
    _result: &'static str,
    _elapsed_us: u64,
    _message: &'static str,
) {
}
