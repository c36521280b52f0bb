use serde::{Deserialize, Serialize};

use crate::model::CallTree;

/// The sample stream after collapsing runs of identical node ids.
///
/// `timestamps[k]` is when visit `k` (to `node_ids[k]`) began on the
/// clamped, non-decreasing timeline; `end_time` is the clock after the final
/// sample. No two adjacent `node_ids` are equal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollapsedSamples {
    pub node_ids: Vec<u64>,
    pub timestamps: Vec<f64>,
    pub end_time: f64,
}

impl CollapsedSamples {
    /// `end_time - timestamps[0]`, or zero for an empty stream.
    pub fn total_time(&self) -> f64 {
        self.timestamps
            .first()
            .map_or(0.0, |first| self.end_time - first)
    }

    /// Each visit as `(node_id, duration)`. A visit lasts until the next
    /// one begins; the last lasts until `end_time`.
    pub fn visits(&self) -> impl Iterator<Item = (u64, f64)> + '_ {
        self.node_ids.iter().enumerate().map(|(k, &id)| {
            let next = self.timestamps.get(k + 1).copied().unwrap_or(self.end_time);
            (id, next - self.timestamps[k])
        })
    }
}

/// Collapse a `(sample, delta)` stream into timed visits.
///
/// The clock starts at `time_deltas[0]` and advances by each later delta. A
/// sample is retained when its id differs from the last retained id; at
/// that point a clock that ran backwards (a recording artifact) is clamped
/// up to the last retained timestamp and continues from there. The clock
/// after the final sample is always flushed into `end_time`, so a trailing
/// run of the same id keeps its time.
pub fn collapse_samples(samples: &[u64], time_deltas: &[f64]) -> CollapsedSamples {
    let mut collapsed = CollapsedSamples::default();
    if samples.is_empty() {
        return collapsed;
    }

    let mut elapsed = time_deltas.first().copied().unwrap_or(0.0);
    let mut last_id = None;
    for (i, &id) in samples.iter().enumerate() {
        if i > 0 {
            elapsed += time_deltas.get(i).copied().unwrap_or(0.0);
        }
        if last_id == Some(id) {
            continue;
        }
        if let Some(&previous) = collapsed.timestamps.last() {
            elapsed = elapsed.max(previous);
        }
        collapsed.node_ids.push(id);
        collapsed.timestamps.push(elapsed);
        last_id = Some(id);
    }

    if let Some(&previous) = collapsed.timestamps.last() {
        elapsed = elapsed.max(previous);
    }
    collapsed.end_time = elapsed;
    collapsed
}

/// Attribute each visit's duration to its node as self time and count
/// the visit. Ids absent from the tree are skipped.
pub fn attribute_self_time(tree: &mut CallTree, collapsed: &CollapsedSamples) {
    for (id, duration) in collapsed.visits() {
        if let Some(node) = tree.node_mut(id) {
            node.self_time += duration;
            node.hit_count += 1;
        }
    }
}
