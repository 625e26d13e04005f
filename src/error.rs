use std::path::PathBuf;
use thiserror::Error;

/// 中止整个扫描的错误：配置无效或前置条件不满足
#[derive(Debug, Error)]
pub enum SweepError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("LoRA strength images directory not found: {}", .0.display())]
    LoraDirMissing(PathBuf),

    #[error("LoRA strength images directory is empty: {}", .0.display())]
    LoraDirEmpty(PathBuf),

    #[error("Control images directory not found: {}", .0.display())]
    ControlDirMissing(PathBuf),

    #[error("Control images directory is empty: {} (and not using single control image mode)", .0.display())]
    ControlDirEmpty(PathBuf),

    #[error("Single control image not found: {}", .0.display())]
    SingleControlMissing(PathBuf),

    #[error("BRISQUE model file not found: {}", .0.display())]
    BrisqueModelMissing(PathBuf),

    #[error("Failed to load BRISQUE model {}: {source}", path.display())]
    BrisqueModel {
        path: PathBuf,
        #[source]
        source: ModelError,
    },
}

impl SweepError {
    /// 进程退出码：配置错误为1，前置条件错误为2
    pub fn exit_code(&self) -> u8 {
        match self {
            SweepError::InvalidConfig(_) => 1,
            _ => 2,
        }
    }

    /// 给用户的修复提示
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            SweepError::LoraDirMissing(_) => Some("Please update paths.lora_dir in the config file."),
            SweepError::ControlDirMissing(_) => Some("Please update paths.control_dir in the config file."),
            SweepError::BrisqueModelMissing(_) => {
                Some("Fix metrics.brisque_model and metrics.brisque_range, or remove both to use the built-in BRISQUE model.")
            }
            _ => None,
        }
    }
}

/// 单个强度条目的指标计算错误，可恢复
#[derive(Debug, Error)]
pub enum MetricError {
    #[error("failed to decode {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("image too small for {metric}: {width}x{height}, need at least {min}x{min}")]
    TooSmall {
        metric: &'static str,
        width: u32,
        height: u32,
        min: u32,
    },

    #[error("shape mismatch: {0:?} vs {1:?}")]
    ShapeMismatch((u32, u32), (u32, u32)),

    #[error("{0}: image has no contrast")]
    NoContrast(&'static str),

    #[error("LoRA luminance has zero data range, SSIM is undefined")]
    DegenerateRange,

    #[error("feature vector has {got} entries, model expects {expected}")]
    FeatureCount { got: usize, expected: usize },

    #[error("non-finite {0} score")]
    NonFinite(&'static str),
}

/// BRISQUE模型/范围文件解析错误
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error("unsupported kernel type '{0}'")]
    UnsupportedKernel(String),

    #[error("missing header field '{0}'")]
    MissingField(&'static str),
}
