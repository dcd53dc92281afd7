use crate::KeypointError;
use burn::tensor::{Tensor, backend::Backend};

/// Offset of the normalized keypoint coordinates produced by the facial keypoint data loader.
pub const KEYPOINT_MEAN: f32 = 100.0;

/// Scale of the normalized keypoint coordinates produced by the facial keypoint data loader.
pub const KEYPOINT_STD: f32 = 50.0;

/// Network predictions grouped as `(x, y)` pairs.
///
/// # Shapes
///
/// - tensor: `[batch_size, num_keypoints, 2]`
#[derive(Clone, Debug)]
pub struct Keypoints<B: Backend> {
    tensor: Tensor<B, 3>,
}

impl<B: Backend> Keypoints<B> {
    /// Groups a flat `[batch_size, 2 * num_keypoints]` output into pairs.
    pub fn from_output(output: Tensor<B, 2>) -> Result<Self, KeypointError> {
        let [batch_size, width] = output.dims();

        if width % 2 != 0 {
            return Err(KeypointError::OddOutputWidth(width));
        }

        Ok(Self {
            tensor: output.reshape([batch_size, width / 2, 2]),
        })
    }

    /// Maps normalized coordinates back to pixels: `xy * std + mean`.
    pub fn denormalize(self, mean: f32, std: f32) -> Self {
        Self {
            tensor: self.tensor.mul_scalar(std).add_scalar(mean),
        }
    }

    /// Number of images.
    pub fn batch_size(&self) -> usize {
        self.tensor.dims()[0]
    }

    /// Number of keypoints per image.
    pub fn num_keypoints(&self) -> usize {
        self.tensor.dims()[1]
    }

    /// The `[batch_size, num_keypoints, 2]` tensor.
    pub fn tensor(&self) -> &Tensor<B, 3> {
        &self.tensor
    }

    /// Consumes the keypoints, returning the underlying tensor.
    pub fn into_tensor(self) -> Tensor<B, 3> {
        self.tensor
    }

    /// Keypoints of one image of the batch, `None` if the index is out of range.
    pub fn to_points(&self, index: usize) -> Option<Vec<[f32; 2]>> {
        if index >= self.batch_size() {
            return None;
        }

        let values: Vec<f32> = self
            .tensor
            .clone()
            .slice([index..index + 1])
            .into_data()
            .iter::<f32>()
            .collect();

        Some(
            values
                .chunks_exact(2)
                .map(|point| [point[0], point[1]])
                .collect(),
        )
    }
}
