use burn::nn::Linear;
use burn::nn::pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig};
use burn::{
    module::Module,
    tensor::{Tensor, backend::Backend},
};

use crate::config::ModelConfig;
use crate::error::PredictorError;
use crate::models::{BoxPredictor, RoiFeatures, gaussian_linear};

/// Box-head predictor in the original Fast R-CNN style: global average pool
/// over the ROI feature map, then two sibling affine projections.
///
/// “Fast R-CNN”
/// Author: Ross Girshick
/// Link (official): https://arxiv.org/abs/1504.08083
///
/// Sec. 2, Fast R-CNN architecture and training:
///
/// ... each feature vector is fed into a sequence of fully connected (fc)
/// layers that finally branch into two sibling output layers: one that
/// produces softmax probability estimates over K object classes plus a
/// catch-all “background” class and another layer that outputs four
/// real-valued numbers for each of the K object classes.
///
/// The adaptive pool reduces any spatial extent to 1×1, so the projections
/// are sized purely from the extractor's channel count and the configured
/// class counts.
#[derive(Module, Debug)]
pub struct FastRCNNPredictor<B: Backend> {
    avgpool: AdaptiveAvgPool2d,
    cls_score: Linear<B>,
    bbox_pred: Linear<B>,
    num_classes: usize,
    bbox_reg_classes: usize,
}

impl<B: Backend> FastRCNNPredictor<B> {
    /// Builds the predictor from the model configuration and the channel
    /// count reported by the ROI feature extractor.
    ///
    /// The extractor must report its channel count; `None` means the model
    /// was wired up incompletely and fails construction right away.
    pub fn new(
        config: &ModelConfig,
        in_channels: Option<usize>,
        device: &B::Device,
    ) -> Result<Self, PredictorError> {
        let in_channels = in_channels.filter(|channels| *channels > 0).ok_or_else(|| {
            PredictorError::invalid_config(
                "FastRCNNPredictor needs the ROI feature extractor's channel count",
            )
        })?;
        let num_classes = config.roi_box_head.num_classes;
        if num_classes == 0 {
            return Err(PredictorError::invalid_config(
                "num_classes must count at least the background class",
            ));
        }
        let bbox_reg_classes = config.bbox_reg_classes();

        Ok(FastRCNNPredictor {
            avgpool: AdaptiveAvgPool2dConfig::new([1, 1]).init(),
            cls_score: gaussian_linear(in_channels, num_classes, 0.01, device),
            bbox_pred: gaussian_linear(in_channels, bbox_reg_classes * 4, 0.001, device),
            num_classes,
            bbox_reg_classes,
        })
    }
}

impl<B: Backend> BoxPredictor<B> for FastRCNNPredictor<B> {
    fn num_classes(&self) -> usize {
        self.num_classes
    }

    fn bbox_reg_classes(&self) -> usize {
        self.bbox_reg_classes
    }

    /// Pools a `(batch, channels, height, width)` feature map to
    /// `(batch, channels)` and projects it to class logits of shape
    /// `(batch, num_classes)` and box deltas of shape
    /// `(batch, bbox_reg_classes * 4)`.
    ///
    /// Pooling is spatial-size-invariant, so any `height`/`width` ≥ 1 works.
    fn forward(
        &self,
        features: RoiFeatures<B>,
    ) -> Result<(Tensor<B, 2>, Tensor<B, 2>), PredictorError> {
        let maps = match features {
            RoiFeatures::Map(maps) => maps,
            RoiFeatures::Flat(_) => {
                return Err(PredictorError::shape_mismatch(
                    "FastRCNNPredictor pools its own input and needs a \
                     (batch, channels, height, width) feature map",
                ));
            }
        };

        let pooled = self.avgpool.forward(maps);
        let flat: Tensor<B, 2> = pooled.flatten(1, 3);

        let scores = self.cls_score.forward(flat.clone());
        let bbox_deltas = self.bbox_pred.forward(flat);
        Ok((scores, bbox_deltas))
    }
}
