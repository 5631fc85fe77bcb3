pub mod fast_rcnn;
pub mod fpn;

pub use fast_rcnn::FastRCNNPredictor;
pub use fpn::FPNPredictor;

use burn::module::Param;
use burn::nn::{Initializer, Linear, LinearConfig};
use burn::tensor::{Tensor, backend::Backend};

use crate::error::PredictorError;

/// Pooled region-of-interest features handed to a predictor.
///
/// The ROI feature extractor either delivers a spatial map that the predictor
/// still has to pool, or an already-pooled fixed-size representation vector.
#[derive(Debug, Clone)]
pub enum RoiFeatures<B: Backend> {
    /// `(batch, channels, height, width)` feature map.
    Map(Tensor<B, 4>),
    /// `(batch, representation_size)` flattened features.
    Flat(Tensor<B, 2>),
}

impl<B: Backend> From<Tensor<B, 4>> for RoiFeatures<B> {
    fn from(features: Tensor<B, 4>) -> Self {
        RoiFeatures::Map(features)
    }
}

impl<B: Backend> From<Tensor<B, 2>> for RoiFeatures<B> {
    fn from(features: Tensor<B, 2>) -> Self {
        RoiFeatures::Flat(features)
    }
}

/// A box-head predictor: turns pooled ROI features into per-class scores and
/// box-regression deltas.
///
/// For a batch of `N` regions and `C` classes (background included) the
/// output pair is class logits of shape `(N, C)` and box deltas of shape
/// `(N, R * 4)`, where `R` is 2 under class-agnostic regression and `C`
/// otherwise. Loss computation and box decoding happen downstream.
pub trait BoxPredictor<B: Backend>: core::fmt::Debug {
    /// Number of classes the score output covers, background included.
    fn num_classes(&self) -> usize;

    /// Number of classes the regression output covers. Downstream box
    /// decoding uses this to slice the deltas back into per-class groups.
    fn bbox_reg_classes(&self) -> usize;

    fn forward(
        &self,
        features: RoiFeatures<B>,
    ) -> Result<(Tensor<B, 2>, Tensor<B, 2>), PredictorError>;
}

/// Linear layer with `N(0, std²)` weights and a zero bias.
///
/// “Fast R-CNN”
/// Author: Ross Girshick
/// Link (official): https://arxiv.org/abs/1504.08083
///
/// Sec. 2.3, Initializing from pre-trained networks:
///
/// The fully connected layers used for softmax classification and
/// bounding-box regression are initialized from zero-mean Gaussian
/// distributions with standard deviations 0.01 and 0.001, respectively.
/// Biases are initialized to 0.
///
pub(crate) fn gaussian_linear<B: Backend>(
    d_input: usize,
    d_output: usize,
    std: f64,
    device: &B::Device,
) -> Linear<B> {
    let mut linear = LinearConfig::new(d_input, d_output)
        .with_initializer(Initializer::Normal { mean: 0.0, std })
        .init(device);
    linear.bias = Some(Param::from_tensor(Tensor::zeros([d_output], device)));
    linear
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{NdArray, ndarray::NdArrayDevice};

    #[test]
    fn test_gaussian_linear_zero_bias() {
        let device = &NdArrayDevice::default();
        type B = NdArray<f32>;

        let linear = gaussian_linear::<B>(64, 16, 0.01, device);
        let bias = linear
            .bias
            .expect("linear layers keep their bias")
            .val()
            .into_data()
            .to_vec::<f32>()
            .unwrap();
        assert!(bias.iter().all(|b| *b == 0.0));
    }
}
