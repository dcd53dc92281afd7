#![warn(missing_docs)]

//! Convolutional network regressing facial keypoints from grayscale face crops.
//!
//! ```rust,ignore
//! use keypoint_net::{KEYPOINT_MEAN, KEYPOINT_STD, KeypointNetConfig, Keypoints};
//!
//! let model = KeypointNetConfig::new().init::<MyBackend>(&device);
//! let output = model.try_forward(images)?; // [batch_size, 136]
//! let keypoints = Keypoints::from_output(output)?.denormalize(KEYPOINT_MEAN, KEYPOINT_STD);
//! ```

mod error;
mod keypoints;
mod model;

pub use error::*;
pub use keypoints::*;
pub use model::*;

/// The network consumes grayscale images.
pub const INPUT_CHANNELS: usize = 1;

/// Number of facial landmarks predicted by the default configuration.
pub const NUM_KEYPOINTS: usize = 68;

/// Backend for test cases
#[cfg(test)]
pub type TestBackend = burn::backend::NdArray<f32>;

/// Backend for autodiff test cases
#[cfg(test)]
pub type TestAutodiffBackend = burn::backend::Autodiff<TestBackend>;
