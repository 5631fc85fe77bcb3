use burn::config::Config;

/// Box-head section of the model configuration.
///
/// `num_classes` counts the background class: COCO's 80 object categories
/// configure as 81.
#[derive(Config, Debug)]
pub struct RoiBoxHeadConfig {
    #[config(default = 81)]
    pub num_classes: usize,
    /// Registry key of the predictor variant to build.
    #[config(default = "String::from(\"FastRCNNPredictor\")")]
    pub predictor: String,
}

/// The slice of the detector's configuration tree this crate reads.
///
/// Owned by the surrounding model builder and treated as read-only here.
#[derive(Config, Debug)]
pub struct ModelConfig {
    pub roi_box_head: RoiBoxHeadConfig,
    /// Regress one shared foreground/background box-delta set instead of one
    /// per class.
    #[config(default = false)]
    pub cls_agnostic_bbox_reg: bool,
}

impl ModelConfig {
    /// Number of classes the box-regression output covers.
    ///
    /// Class-agnostic regression keeps two slots (background, foreground);
    /// otherwise every class regresses its own box. The regression layer is
    /// always `bbox_reg_classes() * 4` wide, four coordinate offsets per
    /// slot.
    pub fn bbox_reg_classes(&self) -> usize {
        if self.cls_agnostic_bbox_reg {
            2
        } else {
            self.roi_box_head.num_classes
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ModelConfig::new(RoiBoxHeadConfig::new());
        assert_eq!(config.roi_box_head.num_classes, 81);
        assert_eq!(config.roi_box_head.predictor, "FastRCNNPredictor");
        assert!(!config.cls_agnostic_bbox_reg);
    }

    #[test]
    fn test_bbox_reg_classes_per_class() {
        let config = ModelConfig::new(RoiBoxHeadConfig::new().with_num_classes(21));
        assert_eq!(config.bbox_reg_classes(), 21);
    }

    #[test]
    fn test_bbox_reg_classes_agnostic() {
        let config = ModelConfig::new(RoiBoxHeadConfig::new().with_num_classes(21))
            .with_cls_agnostic_bbox_reg(true);
        assert_eq!(config.bbox_reg_classes(), 2);
    }
}
