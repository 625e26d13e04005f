// src/sweep.rs
use crate::error::SweepError;
use crate::file_utils::{PathResolver, count_images, dir_has_entries};
use crate::metrics::MetricCalculator;
use crate::models::{
    Config, EntryError, MetricResult, StrengthValue, SweepReport, generate_strengths,
};
use tracing::{error, info, warn};

/// 扫描驱动器：生成强度序列，逐个解析路径、计算指标并汇总
pub struct SweepDriver {
    config: Config,
    resolver: PathResolver,
    calculator: MetricCalculator,
}

impl SweepDriver {
    /// 使用配置中的BRISQUE模型和SSIM后端
    pub fn new(config: Config) -> Result<Self, SweepError> {
        let calculator = MetricCalculator::from_config(&config.metrics)?;
        Ok(Self::with_calculator(config, calculator))
    }

    pub fn with_calculator(config: Config, calculator: MetricCalculator) -> Self {
        let resolver = PathResolver::new(&config);
        Self {
            config,
            resolver,
            calculator,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// 检查目录和单张对照图，任何一项失败都会中止扫描
    pub fn check_preconditions(&self) -> Result<(), SweepError> {
        let lora_dir = self.resolver.lora_dir();
        let control_dir = self.resolver.control_dir();

        if !lora_dir.is_dir() {
            return Err(SweepError::LoraDirMissing(lora_dir.to_path_buf()));
        }
        if !dir_has_entries(lora_dir) {
            return Err(SweepError::LoraDirEmpty(lora_dir.to_path_buf()));
        }
        if !control_dir.is_dir() {
            return Err(SweepError::ControlDirMissing(control_dir.to_path_buf()));
        }

        match self.resolver.single_control_path() {
            Some(single) if !single.exists() => Err(SweepError::SingleControlMissing(single)),
            Some(_) => Ok(()),
            None if !dir_has_entries(control_dir) => Err(SweepError::ControlDirEmpty(control_dir.to_path_buf())),
            None => Ok(()),
        }
    }

    /// 运行整个扫描
    pub fn run(&self) -> Result<SweepReport, SweepError> {
        let strengths = generate_strengths(&self.config.sweep)?;
        let tolerance = self.config.selection.brisque_tolerance;
        if !(tolerance.is_finite() && tolerance >= 0.0) {
            return Err(SweepError::InvalidConfig(format!(
                "brisque_tolerance must be a non-negative number, got {}",
                tolerance
            )));
        }
        self.check_preconditions()?;

        let (quality, similarity) = self.calculator.backend_names();
        info!(
            "Testing {} strength(s) with {} / {}; {} image(s) in LoRA directory",
            strengths.len(),
            quality,
            similarity,
            count_images(self.resolver.lora_dir(), &self.config.naming.extension)
        );

        let results = strengths
            .into_iter()
            .enumerate()
            .map(|(i, strength)| self.evaluate_strength(strength, i + 1))
            .collect();

        Ok(SweepReport::new(results, self.config.sweep.decimal_places, tolerance))
    }

    /// 处理单个强度值；缺失文件和处理错误只影响本条目
    fn evaluate_strength(&self, strength: StrengthValue, index: usize) -> MetricResult {
        let pair = self.resolver.resolve(strength, index);

        if !pair.lora_path.exists() {
            warn!(
                "Skipping Strength {}: LoRA image not found at {}",
                strength,
                pair.lora_path.display()
            );
            return MetricResult::failed(strength, index, EntryError::LoraMissing);
        }
        if !pair.control_path.exists() {
            warn!(
                "Skipping Strength {} (Control {}): Control image not found at {}",
                strength,
                pair.control_id,
                pair.control_path.display()
            );
            return MetricResult::failed(strength, index, EntryError::ControlMissing(pair.control_id));
        }

        info!("Processing Strength {} (Control: {})...", strength, pair.control_id);
        match self.calculator.evaluate(&pair) {
            Ok(scores) => {
                info!(
                    "  Strength {}: BRISQUE = {:.2}, SSIM (to control {}) = {:.4}{}",
                    strength,
                    scores.brisque,
                    pair.control_id,
                    scores.ssim,
                    if scores.control_resized { " [control resized]" } else { "" }
                );
                MetricResult::scored(strength, index, scores.brisque, scores.ssim)
            }
            Err(e) => {
                error!(
                    "Error processing images {} / {}: {}",
                    pair.lora_path.display(),
                    pair.control_path.display(),
                    e
                );
                MetricResult::failed(strength, index, EntryError::Processing(e.to_string()))
            }
        }
    }
}
