use crate::models::{Config, ControlId, ImagePair, StrengthValue};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// 根据强度值和序号推导图片路径，不做任何I/O
#[derive(Debug, Clone)]
pub struct PathResolver {
    lora_dir: PathBuf,
    control_dir: PathBuf,
    lora_prefix: String,
    control_prefix: String,
    extension: String,
    single_control: Option<String>,
}

impl PathResolver {
    pub fn new(config: &Config) -> Self {
        Self {
            lora_dir: PathBuf::from(&config.paths.lora_dir),
            control_dir: PathBuf::from(&config.paths.control_dir),
            lora_prefix: config.naming.lora_prefix.clone(),
            control_prefix: config.naming.control_prefix.clone(),
            extension: config.naming.extension.clone(),
            single_control: config
                .control
                .use_single_image
                .then(|| config.control.single_image_name.clone()),
        }
    }

    /// 解析某个强度值（序号从1开始）对应的LoRA图与对照图
    pub fn resolve(&self, strength: StrengthValue, index: usize) -> ImagePair {
        let lora_name = format!("{}{}{}", self.lora_prefix, strength, self.extension);

        let (control_name, control_id) = match &self.single_control {
            Some(name) => (name.clone(), ControlId::Single(name.clone())),
            None => (
                format!("{}{:02}{}", self.control_prefix, index, self.extension),
                ControlId::Indexed(index),
            ),
        };

        ImagePair {
            lora_path: self.lora_dir.join(lora_name),
            control_path: self.control_dir.join(control_name),
            control_id,
        }
    }

    pub fn lora_dir(&self) -> &Path {
        &self.lora_dir
    }

    pub fn control_dir(&self) -> &Path {
        &self.control_dir
    }

    /// 单张对照图模式下的对照图路径
    pub fn single_control_path(&self) -> Option<PathBuf> {
        self.single_control.as_ref().map(|name| self.control_dir.join(name))
    }
}

/// 目录中是否至少有一个条目（文件或子目录）
pub fn dir_has_entries(dir: &Path) -> bool {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .next()
        .is_some()
}

/// 统计目录下（不递归）以指定扩展名结尾的文件数
pub fn count_images(dir: &Path, extension: &str) -> usize {
    let extension = extension.to_lowercase();
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| entry.file_name().to_string_lossy().to_lowercase().ends_with(&extension))
        .count()
}

/// 配置中的目录是否仍是占位符路径
pub fn is_placeholder_path(path: &str) -> bool {
    path.contains(r"\...\") || path.contains("/.../")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn resolver(single: bool) -> PathResolver {
        let mut config = Config::default();
        config.paths.lora_dir = "lora".to_string();
        config.paths.control_dir = "control".to_string();
        config.control.use_single_image = single;
        PathResolver::new(&config)
    }

    #[test]
    fn test_resolve_indexed_control() {
        let pair = resolver(false).resolve(StrengthValue::from_f64(0.3, 1), 3);
        assert_eq!(pair.lora_path, Path::new("lora").join("strength_0.3.png"));
        assert_eq!(pair.control_path, Path::new("control").join("control_03.png"));
        assert_eq!(pair.control_id, ControlId::Indexed(3));

        // 两位补零，超过99时保持原样
        let pair = resolver(false).resolve(StrengthValue::from_f64(1.0, 1), 12);
        assert_eq!(pair.control_path, Path::new("control").join("control_12.png"));
        let pair = resolver(false).resolve(StrengthValue::from_f64(1.0, 1), 120);
        assert_eq!(pair.control_path, Path::new("control").join("control_120.png"));
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let r = resolver(false);
        let strength = StrengthValue::from_f64(0.7, 1);
        assert_eq!(r.resolve(strength, 7), r.resolve(strength, 7));
    }

    #[test]
    fn test_single_control_is_shared() {
        let r = resolver(true);
        let pairs: Vec<ImagePair> = (1..=5)
            .map(|i| r.resolve(StrengthValue::from_units(i, 1), i as usize))
            .collect();

        assert!(pairs.iter().all(|p| p.control_path == pairs[0].control_path));
        assert_eq!(pairs[0].control_path, Path::new("control").join("control_base.png"));
        assert_eq!(pairs[0].control_id, ControlId::Single("control_base.png".to_string()));
        assert_eq!(r.single_control_path(), Some(Path::new("control").join("control_base.png")));
        assert_eq!(resolver(false).single_control_path(), None);
    }

    #[test]
    fn test_resolve_uses_precision() {
        let mut config = Config::default();
        config.paths.lora_dir = "lora".to_string();
        config.naming.lora_prefix = "w".to_string();
        config.naming.extension = ".jpg".to_string();
        let pair = PathResolver::new(&config).resolve(StrengthValue::from_f64(0.5, 2), 1);
        assert_eq!(pair.lora_path, Path::new("lora").join("w0.50.jpg"));
    }

    #[test]
    fn test_dir_has_entries() {
        let temp_dir = tempdir().unwrap();
        assert!(!dir_has_entries(temp_dir.path()));

        fs::create_dir(temp_dir.path().join("nested")).unwrap();
        assert!(dir_has_entries(temp_dir.path()));

        // 不存在的目录视为空
        assert!(!dir_has_entries(&temp_dir.path().join("missing")));
    }

    #[test]
    fn test_count_images() {
        let temp_dir = tempdir().unwrap();
        fs::write(temp_dir.path().join("strength_0.1.png"), "x").unwrap();
        fs::write(temp_dir.path().join("strength_0.2.PNG"), "x").unwrap();
        fs::write(temp_dir.path().join("notes.txt"), "x").unwrap();
        fs::create_dir(temp_dir.path().join("dir.png")).unwrap();

        assert_eq!(count_images(temp_dir.path(), ".png"), 2);
    }

    #[test]
    fn test_placeholder_detection() {
        assert!(is_placeholder_path(r"C:\...\LoRA_Training\lora_strength_images"));
        assert!(is_placeholder_path("/home/.../images"));
        assert!(!is_placeholder_path("/data/lora_images"));
        assert!(!is_placeholder_path(r"C:\data\images"));
    }
}
