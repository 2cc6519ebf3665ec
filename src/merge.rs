use crate::path;
use crate::provenance::Trace;
use crate::value::{Map, Value};

/// Deep-merge `incoming` on top of `existing`, recording `label` in `trace`
/// at `trace_path` and at every key the recursion visits.
///
/// - No `existing` value: `incoming` wins as-is.
/// - `incoming` is anything but a map (scalar, list, bytes, callable): it
///   replaces `existing` wholesale. Lists are never concatenated.
/// - `existing` is not a map: `incoming` replaces it.
/// - Both maps: a new map holding every key of `existing`, with each key of
///   `incoming` merged recursively on top.
///
/// Neither input is mutated; leaves are moved or cloned, never shared mutably.
pub fn deep_merge(
    existing: Option<&Value>,
    incoming: Value,
    label: &str,
    trace_path: &str,
    trace: &mut Trace,
) -> Value {
    trace.record(trace_path, label);

    match (existing, incoming) {
        (Some(Value::Map(base)), Value::Map(overlay)) => {
            Value::Map(merge_maps(base, overlay, label, trace_path, trace))
        }
        // A map landing on nothing (or on a scalar) is traced key by key too.
        (_, Value::Map(overlay)) => {
            Value::Map(merge_maps(&Map::new(), overlay, label, trace_path, trace))
        }
        (_, incoming) => incoming,
    }
}

/// Merge two maps key by key. Keys of `overlay` are traced beneath `trace_path`.
pub fn merge_maps(
    base: &Map,
    overlay: Map,
    label: &str,
    trace_path: &str,
    trace: &mut Trace,
) -> Map {
    let mut out = base.clone();
    for (key, overlay_val) in overlay {
        let merged = deep_merge(
            base.get(&key),
            overlay_val,
            label,
            &path::child(trace_path, &key),
            trace,
        );
        out.insert(key, merged);
    }
    out
}

/// Merge without provenance, for callers that only want the combined value.
pub fn merge_values(existing: Option<&Value>, incoming: Value) -> Value {
    let mut scratch = Trace::new();
    deep_merge(existing, incoming, "", "", &mut scratch)
}
