// src/metrics.rs
pub mod brisque;
pub mod filter;
pub mod ssim;
pub mod svm;

use crate::error::{MetricError, SweepError};
use crate::models::{ImagePair, MetricsConfig};
use brisque::Brisque;
use image::imageops::{self, FilterType};
use image::{GrayImage, Luma, RgbImage};
use ssim::Ssim;
use svm::{FeatureScaling, SvrModel};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// 无参考图像质量评分（越低越好）
pub trait QualityMetric {
    fn name(&self) -> &'static str;
    fn score(&self, image: &RgbImage) -> Result<f64, MetricError>;
}

/// 两张同尺寸单通道图像的结构相似度
pub trait SimilarityMetric {
    fn name(&self) -> &'static str;
    fn compare(&self, reference: &GrayImage, other: &GrayImage, data_range: f64) -> Result<f64, MetricError>;
}

/// 按名称选择SSIM实现，扫描逻辑本身不关心具体后端
pub fn similarity_backend(name: &str) -> Result<Box<dyn SimilarityMetric>, SweepError> {
    match name.to_lowercase().as_str() {
        "uniform" => Ok(Box::new(Ssim::uniform())),
        "gaussian" => Ok(Box::new(Ssim::gaussian())),
        other => Err(SweepError::InvalidConfig(format!(
            "unknown ssim_backend '{}', expected 'uniform' or 'gaussian'",
            other
        ))),
    }
}

/// 一对图片的评分结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricScores {
    pub brisque: f64,
    pub ssim: f64,
    pub control_resized: bool,
}

/// 指标计算器：对LoRA图计算BRISQUE，对LoRA图与对照图计算SSIM
pub struct MetricCalculator {
    quality: Box<dyn QualityMetric>,
    similarity: Box<dyn SimilarityMetric>,
}

impl MetricCalculator {
    pub fn new(quality: Box<dyn QualityMetric>, similarity: Box<dyn SimilarityMetric>) -> Self {
        Self { quality, similarity }
    }

    /// 选择SSIM后端并加载BRISQUE模型；未配置模型路径时使用内置模型
    pub fn from_config(config: &MetricsConfig) -> Result<Self, SweepError> {
        let similarity = similarity_backend(&config.ssim_backend)?;

        let brisque = match (&config.brisque_model, &config.brisque_range) {
            (None, None) => {
                let brisque = Brisque::builtin().map_err(|source| SweepError::BrisqueModel {
                    path: PathBuf::from(BUILTIN_MODEL_LABEL),
                    source,
                })?;
                debug!("Using built-in BRISQUE model");
                brisque
            }
            (Some(model), Some(range)) => load_brisque(Path::new(model), Path::new(range))?,
            _ => {
                return Err(SweepError::InvalidConfig(
                    "brisque_model and brisque_range must be set together".to_string(),
                ));
            }
        };

        Ok(Self::new(Box::new(brisque), similarity))
    }

    pub fn backend_names(&self) -> (&'static str, &'static str) {
        (self.quality.name(), self.similarity.name())
    }

    /// 计算一对图片的指标；两个分数要么都有，要么返回错误
    pub fn evaluate(&self, pair: &ImagePair) -> Result<MetricScores, MetricError> {
        let lora = load_rgb(&pair.lora_path)?;
        let control = load_rgb(&pair.control_path)?;

        let brisque = self.quality.score(&lora)?;
        if !brisque.is_finite() {
            return Err(MetricError::NonFinite("BRISQUE"));
        }

        // 尺寸不同时只缩放对照图，LoRA图作为基准
        let control_resized = lora.dimensions() != control.dimensions();
        let control = if control_resized {
            let (w, h) = lora.dimensions();
            warn!(
                "Image shapes differ for SSIM. LoRA: {}x{}, Control: {}x{}. Resizing control to LoRA image size for SSIM.",
                w,
                h,
                control.width(),
                control.height()
            );
            imageops::resize(&control, w, h, FilterType::CatmullRom)
        } else {
            control
        };

        let lora_luma = to_luma(&lora);
        let control_luma = to_luma(&control);

        let ssim = self
            .similarity
            .compare(&lora_luma, &control_luma, data_range(&lora_luma))?;
        if !ssim.is_finite() {
            return Err(MetricError::NonFinite("SSIM"));
        }

        Ok(MetricScores {
            brisque,
            ssim,
            control_resized,
        })
    }
}

const BUILTIN_MODEL_LABEL: &str = "<built-in>";

fn load_brisque(model_path: &Path, range_path: &Path) -> Result<Brisque, SweepError> {
    for path in [model_path, range_path] {
        if !path.is_file() {
            return Err(SweepError::BrisqueModelMissing(path.to_path_buf()));
        }
    }

    let model_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source| SweepError::BrisqueModel { path, source }
    };
    let model = SvrModel::load(model_path).map_err(model_err(model_path))?;
    let scaling = FeatureScaling::load(range_path).map_err(model_err(range_path))?;
    debug!(
        "Loaded BRISQUE model from {} ({} support vectors)",
        model_path.display(),
        model.support_vectors.len()
    );
    Ok(Brisque::new(model, scaling))
}

/// 解码为RGB8
pub fn load_rgb(path: &Path) -> Result<RgbImage, MetricError> {
    image::open(path)
        .map(|img| img.to_rgb8())
        .map_err(|source| MetricError::Decode {
            path: path.to_path_buf(),
            source,
        })
}

/// ITU-R 601-2 亮度：L = R * 299/1000 + G * 587/1000 + B * 114/1000（定点取整）
pub fn to_luma(image: &RgbImage) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let p = image.get_pixel(x, y);
        let l = (p[0] as u32 * 19_595 + p[1] as u32 * 38_470 + p[2] as u32 * 7_471 + 0x8000) >> 16;
        Luma([l as u8])
    })
}

/// 像素值范围 max - min
pub fn data_range(image: &GrayImage) -> f64 {
    let (min, max) = image
        .as_raw()
        .iter()
        .fold((u8::MAX, u8::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    max.saturating_sub(min) as f64
}
