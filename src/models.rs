// models.rs - 作为模块目录入口文件（Rust 2018+ 风格）
// 导出所有子模块
pub mod config;
pub mod result;
pub mod strength;

// 重新导出常用类型
pub use config::{Config, KeybindingsConfig, MetricsConfig, TuiConfig};
pub use result::{ControlId, EntryError, ImagePair, MetricResult, SweepReport};
pub use strength::{StrengthValue, generate_strengths};
