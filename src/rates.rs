//! Rate computation from two observations of a cumulative counter.

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Maximum dt (seconds) between two snapshots that are still comparable.
/// Anything longer means the collector was down or the clock jumped.
pub const MAX_RATE_DT_SECS: i64 = 600;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why no rate could be computed for a counter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RateError {
    /// The previous snapshot is older than [`MAX_RATE_DT_SECS`].
    StaleWindow { elapsed_secs: i64 },
    /// The previous snapshot is not older than the current one.
    EmptyWindow { elapsed_secs: i64 },
    /// The counter went backwards: device reattached or counter wrapped.
    CounterReset { current: f64, previous: f64 },
}

impl std::fmt::Display for RateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RateError::StaleWindow { elapsed_secs } => write!(
                f,
                "too long duration: {}s since last fetch (max {}s)",
                elapsed_secs, MAX_RATE_DT_SECS
            ),
            RateError::EmptyWindow { elapsed_secs } => {
                write!(f, "non-positive duration since last fetch: {}s", elapsed_secs)
            }
            RateError::CounterReset { current, previous } => write!(
                f,
                "counter seems to be reset: {} -> {}",
                previous, current
            ),
        }
    }
}

impl std::error::Error for RateError {}

// ---------------------------------------------------------------------------
// Delta helpers
// ---------------------------------------------------------------------------

/// Compute f64 delta, returning `None` on counter regression (reset).
pub fn df64(curr: f64, prev: f64) -> Option<f64> {
    (curr >= prev).then_some(curr - prev)
}

/// Normalizes the change of a counter over `elapsed_secs` seconds.
///
/// With `per_second` the result is per second, otherwise per minute.
pub fn rate(
    current: f64,
    previous: f64,
    elapsed_secs: i64,
    per_second: bool,
) -> Result<f64, RateError> {
    if elapsed_secs > MAX_RATE_DT_SECS {
        return Err(RateError::StaleWindow { elapsed_secs });
    }
    if elapsed_secs <= 0 {
        return Err(RateError::EmptyWindow { elapsed_secs });
    }
    let delta = df64(current, previous).ok_or(RateError::CounterReset { current, previous })?;

    let dt = elapsed_secs as f64;
    Ok(if per_second {
        delta / dt
    } else {
        delta * 60.0 / dt
    })
}
