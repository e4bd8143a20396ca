//! Flat counter namespace and the snapshot that carries it between runs.

use std::collections::BTreeMap;

/// Cumulative counters keyed by dotted metric name
/// (`throughput.vda.read`, `time.vda.ioWeighted`, ...).
///
/// Keys are kept sorted so that iteration order is stable across runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Counters {
    values: BTreeMap<String, f64>,
}

impl Counters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a counter. Absence is reported as `None`, never as zero.
    pub fn get(&self, key: &str) -> Option<f64> {
        self.values.get(key).copied()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: f64) {
        self.values.insert(key.into(), value);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Counter names in ascending order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(String, f64)> for Counters {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

impl From<Counters> for BTreeMap<String, f64> {
    fn from(counters: Counters) -> Self {
        counters.values
    }
}

impl From<BTreeMap<String, f64>> for Counters {
    fn from(values: BTreeMap<String, f64>) -> Self {
        Self { values }
    }
}

/// One capture of all counters plus the time it was taken.
#[derive(Debug, Clone, PartialEq)]
pub struct CounterSnapshot {
    /// Unix timestamp in seconds.
    pub captured_at: i64,
    pub counters: Counters,
}

impl CounterSnapshot {
    pub fn new(captured_at: i64, counters: Counters) -> Self {
        Self {
            captured_at,
            counters,
        }
    }

    /// Seconds elapsed between `self` and a later capture at `now`.
    ///
    /// Saturates at the `i64` bounds; such windows are rejected as stale or
    /// empty by the rate step.
    pub fn elapsed_until(&self, now: i64) -> i64 {
        now.saturating_sub(self.captured_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_absent_key_is_none() {
        let mut counters = Counters::new();
        counters.insert("throughput.vda.read", 0.0);

        assert_eq!(counters.get("throughput.vda.read"), Some(0.0));
        assert_eq!(counters.get("throughput.vdb.read"), None);
    }

    #[test]
    fn test_counters_keys_are_sorted() {
        let counters: Counters = [
            ("time.vda.io".to_string(), 1.0),
            ("throughput.vda.write".to_string(), 2.0),
            ("throughput.vda.read".to_string(), 3.0),
        ]
        .into_iter()
        .collect();

        let keys: Vec<&str> = counters.keys().collect();
        assert_eq!(
            keys,
            vec!["throughput.vda.read", "throughput.vda.write", "time.vda.io"]
        );
    }

    #[test]
    fn test_snapshot_elapsed() {
        let snapshot = CounterSnapshot::new(1_700_000_000, Counters::new());
        assert_eq!(snapshot.elapsed_until(1_700_000_060), 60);
    }

    #[test]
    fn test_snapshot_elapsed_saturates() {
        let ancient = CounterSnapshot::new(i64::MIN, Counters::new());
        assert_eq!(ancient.elapsed_until(1_700_000_000), i64::MAX);

        let future = CounterSnapshot::new(i64::MAX, Counters::new());
        assert_eq!(future.elapsed_until(-1), i64::MIN);
    }
}
