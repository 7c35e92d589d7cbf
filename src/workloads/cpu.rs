//! CPU workload: arithmetic, allocation and serialization.

use crate::error::BoxError;
use std::hint::black_box;

/// Elements in the generated sequence.
pub const SEQUENCE_LEN: usize = 1024;

/// Multiplier applied to each index. Kept at five digits to match the
/// collector's historical numbers.
#[allow(clippy::approx_constant)]
pub const FACTOR: f64 = 3.14159;

/// Build the sequence, encode it as JSON text and drop both.
pub fn run_once() -> Result<(), BoxError> {
    let seq = sequence();
    let text = serde_json::to_string(&seq)?;
    black_box(&text);
    Ok(())
}

/// The sequence a single invocation produces.
pub fn sequence() -> Vec<f64> {
    (0..SEQUENCE_LEN).map(|i| i as f64 * FACTOR).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_produce_scaled_indices() {
        let seq = sequence();
        assert_eq!(seq.len(), SEQUENCE_LEN);
        assert_eq!(seq[0], 0.0);
        assert_eq!(seq[2], 2.0 * FACTOR);
    }

    #[test]
    fn should_complete_without_error() {
        assert!(run_once().is_ok());
    }
}
