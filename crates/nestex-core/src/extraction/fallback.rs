//! What to do when a container fails to decode.

/// Outcome of the fallback policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackDecision {
    /// The container decoded. Continue with its entries.
    Proceed,
    /// Yield the container's raw bytes as one failed-container entry.
    EmitSelf,
    /// End the run with the decode failure.
    Propagate,
}

/// Decides how a container's decode result is handled.
///
/// Pure function of its two inputs.
///
/// # Examples
///
/// ```
/// use nestex_core::extraction::fallback::{FallbackDecision, decide};
///
/// assert_eq!(decide(true, false), FallbackDecision::Proceed);
/// assert_eq!(decide(false, true), FallbackDecision::EmitSelf);
/// assert_eq!(decide(false, false), FallbackDecision::Propagate);
/// ```
#[must_use]
pub const fn decide(decode_succeeded: bool, extract_self_on_fail: bool) -> FallbackDecision {
    match (decode_succeeded, extract_self_on_fail) {
        (true, _) => FallbackDecision::Proceed,
        (false, true) => FallbackDecision::EmitSelf,
        (false, false) => FallbackDecision::Propagate,
    }
}
