use crate::models::strength::StrengthValue;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// 对照图标识：共享的单张对照图或按序号匹配的对照图
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlId {
    Single(String),
    Indexed(usize),
}

impl fmt::Display for ControlId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlId::Single(name) => write!(f, "{}", name),
            ControlId::Indexed(index) => write!(f, "set {:02}", index),
        }
    }
}

/// 某个强度值对应的一对图片路径
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePair {
    pub lora_path: PathBuf,
    pub control_path: PathBuf,
    pub control_id: ControlId,
}

/// 条目失败原因，会出现在汇总表中
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EntryError {
    #[error("LoRA image missing")]
    LoraMissing,
    #[error("Control image {0} missing")]
    ControlMissing(ControlId),
    // 详细原因已经写入日志，汇总表只显示通用文本
    #[error("Processing error")]
    Processing(String),
}

/// 单个强度值的指标结果
#[derive(Debug, Clone, PartialEq)]
pub struct MetricResult {
    pub strength: StrengthValue,
    pub index: usize,  // 在扫描序列中的1-based位置
    // ————————————————————————————————————————————————————————————————————————
    // 失败条目使用哨兵值：brisque为+inf（越低越好），ssim为-inf（越高越好），
    // 保证失败条目在任何排序中都排在有效条目之后
    // ————————————————————————————————————————————————————————————————————————
    pub brisque: f64,
    pub ssim: f64,
    pub error: Option<EntryError>,
}

impl MetricResult {
    pub fn scored(strength: StrengthValue, index: usize, brisque: f64, ssim: f64) -> Self {
        Self {
            strength,
            index,
            brisque,
            ssim,
            error: None,
        }
    }

    pub fn failed(strength: StrengthValue, index: usize, error: EntryError) -> Self {
        Self {
            strength,
            index,
            brisque: f64::INFINITY,
            ssim: f64::NEG_INFINITY,
            error: Some(error),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.error.is_none() && self.brisque.is_finite()
    }
}

/// 一次扫描的完整报告
#[derive(Debug, Clone, PartialEq)]
pub struct SweepReport {
    pub results: Vec<MetricResult>,
    pub decimal_places: u32,
    pub tolerance: f64,
    // 推荐条目在results中的下标
    pub best: Option<usize>,
}

impl SweepReport {
    pub fn new(results: Vec<MetricResult>, decimal_places: u32, tolerance: f64) -> Self {
        let best = select_best(&results, tolerance);
        Self {
            results,
            decimal_places,
            tolerance,
            best,
        }
    }

    pub fn best_result(&self) -> Option<&MetricResult> {
        self.best.and_then(|i| self.results.get(i))
    }

    pub fn valid_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_valid()).count()
    }
}

/// 选出推荐强度
///
/// 只考虑没有错误的条目：先找到最小BRISQUE，再收集与最小值相差不超过容差的候选，
/// 候选中取强度最小的一个。没有有效条目时返回None。
pub fn select_best(results: &[MetricResult], tolerance: f64) -> Option<usize> {
    let min_brisque = results
        .iter()
        .filter(|r| r.is_valid())
        .map(|r| r.brisque)
        .min_by(|a, b| a.total_cmp(b))?;

    results
        .iter()
        .enumerate()
        .filter(|(_, r)| r.is_valid())
        .filter(|(_, r)| r.brisque <= min_brisque || (r.brisque - min_brisque).abs() < tolerance)
        .min_by_key(|(_, r)| r.strength)
        .map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(value: f64) -> StrengthValue {
        StrengthValue::from_f64(value, 1)
    }

    #[test]
    fn test_tie_band_prefers_lower_strength() {
        let results = vec![
            MetricResult::scored(s(0.3), 1, 10.00, 0.9),
            MetricResult::scored(s(0.4), 2, 10.005, 0.8),
            MetricResult::scored(s(0.5), 3, 12.0, 0.7),
        ];
        let best = select_best(&results, 0.01).unwrap();
        assert_eq!(results[best].strength.to_string(), "0.3");
    }

    #[test]
    fn test_tie_band_picks_lower_strength_even_if_not_minimum() {
        let results = vec![
            MetricResult::scored(s(0.2), 1, 10.004, 0.9),
            MetricResult::scored(s(0.3), 2, 10.0, 0.8),
        ];
        let best = select_best(&results, 0.01).unwrap();
        assert_eq!(results[best].strength.to_string(), "0.2");

        // 容差为0时只有最小值本身是候选
        let best = select_best(&results, 0.0).unwrap();
        assert_eq!(results[best].strength.to_string(), "0.3");
    }

    #[test]
    fn test_selection_is_idempotent() {
        let results = vec![
            MetricResult::scored(s(0.1), 1, 20.0, 0.9),
            MetricResult::scored(s(0.2), 2, 15.0, 0.8),
        ];
        assert_eq!(select_best(&results, 0.01), select_best(&results, 0.01));
        assert_eq!(select_best(&results, 0.01), Some(1));
    }

    #[test]
    fn test_failed_entries_never_win() {
        let results = vec![
            MetricResult::failed(s(0.1), 1, EntryError::LoraMissing),
            MetricResult::scored(s(0.2), 2, 40.0, 0.1),
            MetricResult::failed(s(0.3), 3, EntryError::Processing("boom".to_string())),
        ];
        assert_eq!(select_best(&results, 0.01), Some(1));

        // 哨兵值排序不会优于任何有效条目
        let valid = &results[1];
        for failed in results.iter().filter(|r| !r.is_valid()) {
            assert!(failed.brisque > valid.brisque);
            assert!(failed.ssim < valid.ssim);
        }
    }

    #[test]
    fn test_all_failed_has_no_recommendation() {
        let results = vec![
            MetricResult::failed(s(0.1), 1, EntryError::LoraMissing),
            MetricResult::failed(s(0.2), 2, EntryError::ControlMissing(ControlId::Indexed(2))),
        ];
        let report = SweepReport::new(results, 1, 0.01);
        assert!(report.best_result().is_none());
        assert_eq!(report.valid_count(), 0);
        assert!(SweepReport::new(Vec::new(), 1, 0.01).best.is_none());
    }

    #[test]
    fn test_entry_error_messages() {
        assert_eq!(EntryError::LoraMissing.to_string(), "LoRA image missing");
        assert_eq!(
            EntryError::ControlMissing(ControlId::Indexed(2)).to_string(),
            "Control image set 02 missing"
        );
        assert_eq!(
            EntryError::ControlMissing(ControlId::Single("base.png".to_string())).to_string(),
            "Control image base.png missing"
        );
        assert_eq!(EntryError::Processing("x".to_string()).to_string(), "Processing error");
    }
}
