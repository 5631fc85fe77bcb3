use burn::nn::Linear;
use burn::{
    module::Module,
    tensor::{Tensor, backend::Backend},
};

use crate::config::ModelConfig;
use crate::error::PredictorError;
use crate::models::{BoxPredictor, RoiFeatures, gaussian_linear};

/// Box-head predictor for FPN-style two-fc heads: the region extractor has
/// already pooled each ROI down to a fixed-size representation, so no
/// pooling happens here, only the two sibling projections.
///
/// “Feature Pyramid Networks for Object Detection”
/// Authors: Tsung-Yi Lin, Piotr Dollár, Ross Girshick, Kaiming He,
///          Bharath Hariharan, Serge Belongie
/// Link (official): https://arxiv.org/abs/1612.03144
///
/// Sec. 4.2, Feature Pyramid Networks for Fast R-CNN:
///
/// ... we adopt RoI pooling to extract 7×7 features, and attach two hidden
/// 1,024-d fully-connected (fc) layers (each followed by ReLU) before the
/// final classification and bounding box regression layers.
///
#[derive(Module, Debug)]
pub struct FPNPredictor<B: Backend> {
    cls_score: Linear<B>,
    bbox_pred: Linear<B>,
    num_classes: usize,
    bbox_reg_classes: usize,
}

impl<B: Backend> FPNPredictor<B> {
    /// Builds the predictor from the model configuration and the
    /// representation size reported by the ROI feature extractor.
    pub fn new(
        config: &ModelConfig,
        representation_size: Option<usize>,
        device: &B::Device,
    ) -> Result<Self, PredictorError> {
        let representation_size = representation_size
            .filter(|size| *size > 0)
            .ok_or_else(|| {
                PredictorError::invalid_config(
                    "FPNPredictor needs the ROI feature extractor's representation size",
                )
            })?;
        let num_classes = config.roi_box_head.num_classes;
        if num_classes == 0 {
            return Err(PredictorError::invalid_config(
                "num_classes must count at least the background class",
            ));
        }
        let bbox_reg_classes = config.bbox_reg_classes();

        Ok(FPNPredictor {
            cls_score: gaussian_linear(representation_size, num_classes, 0.01, device),
            bbox_pred: gaussian_linear(representation_size, bbox_reg_classes * 4, 0.001, device),
            num_classes,
            bbox_reg_classes,
        })
    }
}

impl<B: Backend> BoxPredictor<B> for FPNPredictor<B> {
    fn num_classes(&self) -> usize {
        self.num_classes
    }

    fn bbox_reg_classes(&self) -> usize {
        self.bbox_reg_classes
    }

    /// Projects pre-pooled ROI features to `(batch, num_classes)` class
    /// logits and `(batch, bbox_reg_classes * 4)` box deltas.
    ///
    /// Accepts the extractor's output either flattened or still carrying its
    /// 1×1 spatial dims. Any larger spatial extent means the upstream pooling
    /// contract was broken.
    fn forward(
        &self,
        features: RoiFeatures<B>,
    ) -> Result<(Tensor<B, 2>, Tensor<B, 2>), PredictorError> {
        let flat = match features {
            RoiFeatures::Flat(flat) => flat,
            RoiFeatures::Map(maps) => {
                let [batch, channels, height, width] = maps.dims();
                if height != 1 || width != 1 {
                    return Err(PredictorError::shape_mismatch(format!(
                        "FPNPredictor expects pre-pooled 1x1 features, got {height}x{width}",
                    )));
                }
                maps.reshape([batch, channels])
            }
        };

        let scores = self.cls_score.forward(flat.clone());
        let bbox_deltas = self.bbox_pred.forward(flat);
        Ok((scores, bbox_deltas))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RoiBoxHeadConfig;
    use burn::backend::{NdArray, ndarray::NdArrayDevice};
    use burn::tensor::{Distribution, Tolerance, ops::FloatElem};

    type B = NdArray<f32>;
    type FT = FloatElem<B>;

    fn config(num_classes: usize, cls_agnostic: bool) -> ModelConfig {
        ModelConfig::new(RoiBoxHeadConfig::new().with_num_classes(num_classes))
            .with_cls_agnostic_bbox_reg(cls_agnostic)
    }

    #[test]
    fn test_missing_representation_size_fails() {
        let device = &NdArrayDevice::default();
        let result = FPNPredictor::<B>::new(&config(81, false), None, device);
        assert!(matches!(result, Err(PredictorError::InvalidConfig { .. })));
    }

    #[test]
    fn test_forward_shapes() {
        let device = &NdArrayDevice::default();
        let predictor = FPNPredictor::<B>::new(&config(21, false), Some(1024), device).unwrap();

        let flat = Tensor::<B, 2>::random([3, 1024], Distribution::Default, device);
        let (scores, bbox_deltas) = predictor.forward(flat.into()).unwrap();
        assert_eq!(scores.dims(), [3, 21]);
        assert_eq!(bbox_deltas.dims(), [3, 21 * 4]);
    }

    #[test]
    fn test_agnostic_regression_width() {
        let device = &NdArrayDevice::default();
        let predictor = FPNPredictor::<B>::new(&config(21, true), Some(256), device).unwrap();

        let flat = Tensor::<B, 2>::random([3, 256], Distribution::Default, device);
        let (_, bbox_deltas) = predictor.forward(flat.into()).unwrap();
        assert_eq!(bbox_deltas.dims(), [3, 2 * 4]);
    }

    #[test]
    fn test_flat_and_pooled_inputs_agree() {
        let device = &NdArrayDevice::default();
        let predictor = FPNPredictor::<B>::new(&config(81, false), Some(128), device).unwrap();

        let flat = Tensor::<B, 2>::random([3, 128], Distribution::Default, device);
        let maps: Tensor<B, 4> = flat.clone().reshape([3, 128, 1, 1]);

        let (scores_flat, deltas_flat) = predictor.forward(flat.into()).unwrap();
        let (scores_maps, deltas_maps) = predictor.forward(maps.into()).unwrap();

        scores_flat
            .into_data()
            .assert_approx_eq::<FT>(&scores_maps.into_data(), Tolerance::default());
        deltas_flat
            .into_data()
            .assert_approx_eq::<FT>(&deltas_maps.into_data(), Tolerance::default());
    }

    #[test]
    fn test_rejects_unpooled_spatial_extent() {
        let device = &NdArrayDevice::default();
        let predictor = FPNPredictor::<B>::new(&config(81, false), Some(64), device).unwrap();

        let maps = Tensor::<B, 4>::random([2, 64, 2, 2], Distribution::Default, device);
        let result = predictor.forward(maps.into());
        assert!(matches!(result, Err(PredictorError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_zero_bias_initialization() {
        let device = &NdArrayDevice::default();
        let predictor = FPNPredictor::<B>::new(&config(81, false), Some(64), device).unwrap();

        for linear in [&predictor.cls_score, &predictor.bbox_pred] {
            let bias = linear
                .bias
                .as_ref()
                .unwrap()
                .val()
                .into_data()
                .to_vec::<f32>()
                .unwrap();
            assert!(bias.iter().all(|b| *b == 0.0));
        }
    }
}
