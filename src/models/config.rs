use serde::Deserialize;

/// 应用程序配置结构
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub paths: PathsConfig,
    pub sweep: SweepConfig,
    pub naming: NamingConfig,
    pub control: ControlConfig,
    pub selection: SelectionConfig,
    pub metrics: MetricsConfig,
    pub tui: TuiConfig,
    pub keybindings: KeybindingsConfig,
}

/// 图片目录配置
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct PathsConfig {
    pub lora_dir: String,
    pub control_dir: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            lora_dir: r"C:\...\LoRA_Training\lora_strength_images".to_string(),
            control_dir: r"C:\...\LoRA_Training\control_images".to_string(),
        }
    }
}

/// 强度扫描范围配置
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct SweepConfig {
    pub min_strength: f64,
    pub max_strength: f64,
    pub increment: f64,
    // 文件名与显示都使用同一个小数位数
    pub decimal_places: u32,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            min_strength: 0.1,
            max_strength: 1.0,
            increment: 0.1,
            decimal_places: 1,
        }
    }
}

/// 文件命名规则配置
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct NamingConfig {
    pub lora_prefix: String,
    pub control_prefix: String,
    pub extension: String,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            lora_prefix: "strength_".to_string(),
            control_prefix: "control_".to_string(),
            extension: ".png".to_string(),
        }
    }
}

/// 对照图配置：单张共享对照图或按序号匹配
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ControlConfig {
    pub use_single_image: bool,
    pub single_image_name: String,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            use_single_image: false,
            single_image_name: DEFAULT_SINGLE_CONTROL_NAME.to_string(),
        }
    }
}

pub const DEFAULT_SINGLE_CONTROL_NAME: &str = "control_base.png";

/// 最佳强度选择配置
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct SelectionConfig {
    pub brisque_tolerance: f64,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self { brisque_tolerance: 0.01 }
    }
}

/// 指标计算配置
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct MetricsConfig {
    /// 自定义libsvm模型，需与 brisque_range 同时给出；都不给时使用内置模型
    pub brisque_model: Option<String>,
    pub brisque_range: Option<String>,
    pub ssim_backend: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            brisque_model: None,
            brisque_range: None,
            ssim_backend: "uniform".to_string(),
        }
    }
}

/// TUI界面配置
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct TuiConfig {
    pub refresh_rate_ms: u64,
    pub table_proportion: u16,
    pub colors: ColorConfig,
}

impl Default for TuiConfig {
    fn default() -> Self {
        Self {
            refresh_rate_ms: 250,
            table_proportion: 60,
            colors: ColorConfig::default(),
        }
    }
}

/// 颜色配置
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ColorConfig {
    pub best: String,
    pub failed: String,
    pub selected: String,
    pub text: String,
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            best: "green".to_string(),
            failed: "red".to_string(),
            selected: "yellow".to_string(),
            text: "white".to_string(),
        }
    }
}

/// 键盘绑定配置
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct KeybindingsConfig {
    pub up: String,
    pub down: String,
    pub top: String,
    pub bottom: String,
    pub best: String,
    pub quit: String,
}

impl Default for KeybindingsConfig {
    fn default() -> Self {
        Self {
            up: "k".to_string(),
            down: "j".to_string(),
            top: "g".to_string(),
            bottom: "G".to_string(),
            best: "b".to_string(),
            quit: "q".to_string(),
        }
    }
}
