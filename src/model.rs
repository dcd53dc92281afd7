use crate::{INPUT_CHANNELS, KeypointError, NUM_KEYPOINTS};
use burn::{
    config::Config,
    module::Module,
    nn::{
        Dropout, DropoutConfig, Linear, LinearConfig, Relu,
        conv::{Conv2d, Conv2dConfig},
        pool::{MaxPool2d, MaxPool2dConfig},
    },
    tensor::{Tensor, backend::Backend},
};

/// Configuration to create a [keypoint network](KeypointNet) using the
/// [init function](KeypointNetConfig::init).
///
/// The defaults describe the reference architecture: four 5x5 convolution blocks
/// (1→32→64→128→256 channels) over a 224x224 grayscale crop, followed by a
/// 25600→2560→1280→136 fully-connected head.
#[derive(Config, Debug)]
pub struct KeypointNetConfig {
    /// Number of predicted keypoints. The output holds one `(x, y)` pair per keypoint.
    #[config(default = "NUM_KEYPOINTS")]
    pub num_keypoints: usize,
    /// Side length of the square input image.
    #[config(default = 224)]
    pub input_size: usize,
    /// Output channels of the four convolution blocks.
    #[config(default = "[32, 64, 128, 256]")]
    pub channels: [usize; 4],
    /// Side length of the square convolution kernels.
    #[config(default = 5)]
    pub kernel_size: usize,
    /// Side length and stride of the square max pooling window.
    #[config(default = 2)]
    pub pool_size: usize,
    /// Dropout probability, shared by every block and the hidden linear layers.
    #[config(default = 0.4)]
    pub dropout: f64,
    /// Widths of the two hidden linear layers.
    #[config(default = "[2560, 1280]")]
    pub hidden: [usize; 2],
}

impl KeypointNetConfig {
    /// Side length of the feature maps produced by the last convolution block.
    ///
    /// Convolutions are stride 1 without padding, pooling uses a stride equal to its window.
    /// Returns `None` when the chain shrinks the input to nothing.
    pub fn feature_map_size(&self) -> Option<usize> {
        if self.kernel_size == 0 || self.pool_size == 0 {
            return None;
        }

        self.channels.iter().try_fold(self.input_size, |size, _| {
            let convolved = size.checked_add(1)?.checked_sub(self.kernel_size)?;
            let pooled = convolved / self.pool_size;

            (pooled > 0).then_some(pooled)
        })
    }

    /// Number of features entering the first linear layer.
    pub fn flatten_size(&self) -> Option<usize> {
        let size = self.feature_map_size()?;
        Some(self.channels[3] * size * size)
    }

    /// Width of the network output, two coordinates per keypoint.
    pub fn output_size(&self) -> usize {
        2 * self.num_keypoints
    }

    /// Initialize a new [keypoint network](KeypointNet).
    ///
    /// # Panics
    ///
    /// If the convolution and pooling chain leaves no feature map for the configured input size.
    pub fn init<B: Backend>(&self, device: &B::Device) -> KeypointNet<B> {
        let flatten_size = self.flatten_size().unwrap_or_else(|| {
            panic!(
                "Input size {} is too small for {} blocks of {}x{} convolution and {}x{} pooling",
                self.input_size,
                self.channels.len(),
                self.kernel_size,
                self.kernel_size,
                self.pool_size,
                self.pool_size,
            )
        });

        let mut channels_in = INPUT_CHANNELS;
        let blocks = self
            .channels
            .iter()
            .map(|&channels_out| {
                let block = ConvBlock::new([channels_in, channels_out], self, device);
                channels_in = channels_out;
                block
            })
            .collect();

        let [hidden1, hidden2] = self.hidden;
        let model = KeypointNet {
            blocks,
            fc1: LinearConfig::new(flatten_size, hidden1).init(device),
            fc2: LinearConfig::new(hidden1, hidden2).init(device),
            fc3: LinearConfig::new(hidden2, self.output_size()).init(device),
            dropout: DropoutConfig::new(self.dropout).init(),
            activation: Relu::new(),
            input_size: self.input_size,
            num_keypoints: self.num_keypoints,
        };

        log::info!(
            "Initialized keypoint network: input {}x{}, {} flattened features, {} outputs, \
             {} parameters",
            self.input_size,
            self.input_size,
            flatten_size,
            self.output_size(),
            model.num_params(),
        );

        model
    }
}

/// Convolution followed by ReLU, max pooling and dropout.
#[derive(Module, Debug)]
pub struct ConvBlock<B: Backend> {
    conv: Conv2d<B>,
    pool: MaxPool2d,
    dropout: Dropout,
    activation: Relu,
}

impl<B: Backend> ConvBlock<B> {
    fn new(channels: [usize; 2], config: &KeypointNetConfig, device: &B::Device) -> Self {
        let kernel = [config.kernel_size, config.kernel_size];
        let window = [config.pool_size, config.pool_size];

        Self {
            conv: Conv2dConfig::new(channels, kernel).init(device),
            pool: MaxPool2dConfig::new(window).with_strides(window).init(),
            dropout: DropoutConfig::new(config.dropout).init(),
            activation: Relu::new(),
        }
    }

    /// # Shapes
    ///
    /// - input: `[batch_size, channels_in, height_in, width_in]`
    /// - output: `[batch_size, channels_out, height_out, width_out]`
    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.conv.forward(input);
        let x = self.activation.forward(x);
        let x = self.pool.forward(x);

        self.dropout.forward(x)
    }
}

/// Facial keypoint regression network.
///
/// Maps a batch of single-channel face crops to `2 * num_keypoints` coordinates per image,
/// laid out as `x0, y0, x1, y1, ...`.
///
/// Dropout is only active on autodiff backends. Call
/// [valid](burn::module::AutodiffModule::valid) on a training model to get the
/// deterministic evaluation model.
#[derive(Module, Debug)]
pub struct KeypointNet<B: Backend> {
    blocks: Vec<ConvBlock<B>>,
    fc1: Linear<B>,
    fc2: Linear<B>,
    fc3: Linear<B>,
    dropout: Dropout,
    activation: Relu,
    input_size: usize,
    num_keypoints: usize,
}

impl<B: Backend> KeypointNet<B> {
    /// Applies the forward pass on the input tensor.
    ///
    /// The backend panics when the input has more than one channel, or when the convolution
    /// and pooling chain does not flatten to the width the first linear layer expects. Pooling
    /// rounds down, so sizes slightly above `input_size` can still flatten to that width and are
    /// accepted. [try_forward](Self::try_forward) checks the exact resolution instead.
    ///
    /// # Shapes
    ///
    /// - input: `[batch_size, 1, input_size, input_size]`
    /// - output: `[batch_size, 2 * num_keypoints]`
    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self
            .blocks
            .iter()
            .fold(input, |x, block| block.forward(x));
        let x: Tensor<B, 2> = x.flatten(1, 3);

        let x = self.fc1.forward(x);
        let x = self.activation.forward(x);
        let x = self.dropout.forward(x);

        let x = self.fc2.forward(x);
        let x = self.activation.forward(x);
        let x = self.dropout.forward(x);

        self.fc3.forward(x)
    }

    /// Same as [forward](Self::forward), but rejects inputs whose channel count or spatial
    /// size differ from the configuration before running any layer.
    pub fn try_forward(&self, input: Tensor<B, 4>) -> Result<Tensor<B, 2>, KeypointError> {
        let actual = input.dims();
        let expected = [INPUT_CHANNELS, self.input_size, self.input_size];

        if actual[1..] != expected {
            log::debug!(
                "Rejected input of shape {actual:?}, expected [channels, height, width] = {expected:?}"
            );
            return Err(KeypointError::ShapeMismatch { expected, actual });
        }

        Ok(self.forward(input))
    }

    /// Side length of the square input the network was built for.
    pub fn input_size(&self) -> usize {
        self.input_size
    }

    /// Number of keypoints predicted per image.
    pub fn num_keypoints(&self) -> usize {
        self.num_keypoints
    }
}
