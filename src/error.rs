use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors reported by the checked entry points of the keypoint network.
///
/// The unchecked [forward](crate::KeypointNet::forward) pass never returns this type: shape
/// problems there surface as backend panics.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeypointError {
    /// The input tensor does not have the `[batch, 1, height, width]` layout the network was
    /// configured for.
    #[error("Input shape mismatch: expected [_, {expected:?}], got {actual:?}")]
    ShapeMismatch {
        /// Expected `[channels, height, width]`.
        expected: [usize; 3],
        /// Actual `[batch, channels, height, width]`.
        actual: [usize; 4],
    },
    /// A flat output row must hold `(x, y)` pairs.
    #[error("Output width {0} is not a whole number of (x, y) pairs")]
    OddOutputWidth(usize),
}
