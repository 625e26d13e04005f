use crate::file_utils::is_placeholder_path;
use crate::models::Config;
use crate::models::config::DEFAULT_SINGLE_CONTROL_NAME;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::info;

pub const DEFAULT_CONFIG_PATH: &str = "lora_sweep.toml";

pub fn load_config(config_path: &str) -> Result<Config> {
    // 检查配置文件是否存在，如果不存在则创建默认配置
    if !Path::new(config_path).exists() {
        create_default_config(config_path)?;
        info!("Created default config file at {}", config_path);
    }

    let config_content = fs::read_to_string(config_path)
        .with_context(|| format!("Failed to read config file: {}", config_path))?;

    parse_config(config_path, &config_content)
}

/// 按扩展名选择YAML或TOML
fn parse_config(config_path: &str, content: &str) -> Result<Config> {
    let lower = config_path.to_lowercase();
    if lower.ends_with(".yaml") || lower.ends_with(".yml") {
        serde_yaml::from_str(content).with_context(|| format!("Failed to parse config file: {}", config_path))
    } else {
        toml::from_str(content).with_context(|| format!("Failed to parse config file: {}", config_path))
    }
}

fn create_default_config(config_path: &str) -> Result<()> {
    let default_config = r#"[paths]
# 请改成实际的图片目录
lora_dir = 'C:\...\LoRA_Training\lora_strength_images'
control_dir = 'C:\...\LoRA_Training\control_images'

[sweep]
min_strength = 0.1
max_strength = 1.0
increment = 0.1
decimal_places = 1

[naming]
lora_prefix = "strength_"
control_prefix = "control_"
extension = ".png"

[control]
use_single_image = false
single_image_name = "control_base.png"

[selection]
brisque_tolerance = 0.01

[metrics]
# 不设置时使用内置BRISQUE模型；两项需同时设置
# brisque_model = "models/brisque_allmodel"
# brisque_range = "models/brisque_allrange"
ssim_backend = "uniform"

[tui]
refresh_rate_ms = 250
table_proportion = 60
colors = { best = "green", failed = "red", selected = "yellow", text = "white" }

[keybindings]
up = "k"
down = "j"
top = "g"
bottom = "G"
best = "b"
quit = "q"
"#;

    fs::write(config_path, default_config)
        .with_context(|| format!("Failed to create default config file: {}", config_path))?;

    Ok(())
}

/// 命令行覆盖项，None表示沿用配置文件
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    pub lora_dir: Option<String>,
    pub control_dir: Option<String>,
    pub min_strength: Option<f64>,
    pub max_strength: Option<f64>,
    pub increment: Option<f64>,
    pub decimal_places: Option<u32>,
    pub single_control: Option<String>,
    pub brisque_tolerance: Option<f64>,
    pub ssim_backend: Option<String>,
}

impl ConfigOverrides {
    pub fn apply(self, config: &mut Config) {
        if let Some(v) = self.lora_dir {
            config.paths.lora_dir = v;
        }
        if let Some(v) = self.control_dir {
            config.paths.control_dir = v;
        }
        if let Some(v) = self.min_strength {
            config.sweep.min_strength = v;
        }
        if let Some(v) = self.max_strength {
            config.sweep.max_strength = v;
        }
        if let Some(v) = self.increment {
            config.sweep.increment = v;
        }
        if let Some(v) = self.decimal_places {
            config.sweep.decimal_places = v;
        }
        // 指定单张对照图即开启单图模式
        if let Some(v) = self.single_control {
            config.control.use_single_image = true;
            config.control.single_image_name = v;
        }
        if let Some(v) = self.brisque_tolerance {
            config.selection.brisque_tolerance = v;
        }
        if let Some(v) = self.ssim_backend {
            config.metrics.ssim_backend = v;
        }
    }
}

/// 目录仍为占位符时给出的警告横幅，没有问题时返回None
pub fn placeholder_warnings(config: &Config) -> Option<String> {
    let lora = is_placeholder_path(&config.paths.lora_dir);
    let control = is_placeholder_path(&config.paths.control_dir);
    if !lora && !control {
        return None;
    }

    let rule = "!".repeat(70);
    let mut lines = vec![
        rule.clone(),
        "!!! IMPORTANT: Image directory paths still contain placeholders.".to_string(),
        "!!! Please update [paths] in the config file or pass --lora-dir / --control-dir.".to_string(),
    ];
    if lora {
        lines.push(format!("!!!   lora_dir    = {}", config.paths.lora_dir));
    }
    if control {
        lines.push(format!("!!!   control_dir = {}", config.paths.control_dir));
    }
    if config.control.use_single_image && config.control.single_image_name == DEFAULT_SINGLE_CONTROL_NAME {
        lines.push(format!(
            "!!! Single control mode: make sure '{}' exists inside control_dir.",
            config.control.single_image_name
        ));
    }
    lines.push(rule);
    Some(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_created_and_parsed() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("lora_sweep.toml");
        let path = path.to_str().unwrap();

        let config = load_config(path).unwrap();
        assert!(Path::new(path).exists());
        // 生成的默认文件与内置默认值一致
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_yaml_config() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("sweep.yml");
        fs::write(
            &path,
            "paths:\n  lora_dir: /data/lora\nsweep:\n  max_strength: 0.5\n  decimal_places: 2\n",
        )
        .unwrap();

        let config = load_config(path.to_str().unwrap()).unwrap();
        assert_eq!(config.paths.lora_dir, "/data/lora");
        assert_eq!(config.sweep.max_strength, 0.5);
        assert_eq!(config.sweep.decimal_places, 2);
        assert_eq!(config.sweep.min_strength, 0.1);
    }

    #[test]
    fn test_invalid_config_is_an_error() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("broken.toml");
        fs::write(&path, "[sweep]\nmin_strength = \"low\"\n").unwrap();

        let err = load_config(path.to_str().unwrap()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_overrides_apply() {
        let mut config = Config::default();
        ConfigOverrides {
            lora_dir: Some("/data/lora".to_string()),
            max_strength: Some(0.6),
            decimal_places: Some(2),
            single_control: Some("base.png".to_string()),
            ssim_backend: Some("gaussian".to_string()),
            ..Default::default()
        }
        .apply(&mut config);

        assert_eq!(config.paths.lora_dir, "/data/lora");
        assert_eq!(config.paths.control_dir, Config::default().paths.control_dir);
        assert_eq!(config.sweep.max_strength, 0.6);
        assert_eq!(config.sweep.min_strength, 0.1);
        assert_eq!(config.sweep.decimal_places, 2);
        assert!(config.control.use_single_image);
        assert_eq!(config.control.single_image_name, "base.png");
        assert_eq!(config.metrics.ssim_backend, "gaussian");
    }

    #[test]
    fn test_placeholder_banner() {
        let mut config = Config::default();
        let banner = placeholder_warnings(&config).unwrap();
        assert!(banner.contains("lora_dir"));
        assert!(banner.contains("control_dir"));
        assert!(!banner.contains("Single control mode"));

        config.control.use_single_image = true;
        config.paths.lora_dir = "/data/lora".to_string();
        let banner = placeholder_warnings(&config).unwrap();
        assert!(!banner.contains("lora_dir    ="));
        assert!(banner.contains("Single control mode: make sure 'control_base.png'"));

        // 改过文件名后不再提示
        config.control.single_image_name = "base_v2.png".to_string();
        let banner = placeholder_warnings(&config).unwrap();
        assert!(!banner.contains("Single control mode"));

        config.paths.control_dir = "/data/control".to_string();
        assert!(placeholder_warnings(&config).is_none());
    }
}
