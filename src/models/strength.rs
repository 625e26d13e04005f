use crate::error::SweepError;
use crate::models::config::SweepConfig;
use std::fmt;

pub const MAX_DECIMAL_PLACES: u32 = 6;

/// LoRA强度值，以 10^-decimals 为单位的整数保存
///
/// 文件名和显示文本都由同一个取整后的整数推导，浮点误差不会导致两者不一致
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StrengthValue {
    units: i64,
    decimals: u32,
}

impl StrengthValue {
    /// 将浮点数按给定小数位数取整
    pub fn from_f64(value: f64, decimals: u32) -> Self {
        let scale = 10f64.powi(decimals as i32);
        Self {
            units: (value * scale).round() as i64,
            decimals,
        }
    }

    #[cfg(test)]
    pub fn from_units(units: i64, decimals: u32) -> Self {
        Self { units, decimals }
    }

    #[cfg(test)]
    pub fn units(&self) -> i64 {
        self.units
    }

    #[cfg(test)]
    pub fn value(&self) -> f64 {
        self.units as f64 / 10f64.powi(self.decimals as i32)
    }
}

impl fmt::Display for StrengthValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = if self.decimals == 0 {
            self.units.to_string()
        } else {
            let scale = 10u64.pow(self.decimals);
            let magnitude = self.units.unsigned_abs();
            let sign = if self.units < 0 { "-" } else { "" };
            format!(
                "{}{}.{:0width$}",
                sign,
                magnitude / scale,
                magnitude % scale,
                width = self.decimals as usize
            )
        };
        // 支持表格中的 {:<8} 等对齐格式
        f.pad(&text)
    }
}

/// 检查扫描范围配置
pub fn validate_sweep(sweep: &SweepConfig) -> Result<(), SweepError> {
    let SweepConfig { min_strength, max_strength, increment, decimal_places } = *sweep;

    if !(min_strength.is_finite() && max_strength.is_finite() && increment.is_finite()) {
        return Err(SweepError::InvalidConfig("strength range values must be finite".to_string()));
    }
    if increment <= 0.0 {
        return Err(SweepError::InvalidConfig(format!("increment must be positive, got {}", increment)));
    }
    if max_strength < min_strength {
        return Err(SweepError::InvalidConfig(format!(
            "max_strength {} is below min_strength {}",
            max_strength, min_strength
        )));
    }
    if decimal_places > MAX_DECIMAL_PLACES {
        return Err(SweepError::InvalidConfig(format!(
            "decimal_places must be at most {}, got {}",
            MAX_DECIMAL_PLACES, decimal_places
        )));
    }
    // 步长小于一个显示单位时取整后会出现重复的强度值
    let unit = 10f64.powi(-(decimal_places as i32));
    if increment < unit * (1.0 - 1e-9) {
        return Err(SweepError::InvalidConfig(format!(
            "increment {} is finer than {} decimal place(s) can express",
            increment, decimal_places
        )));
    }
    Ok(())
}

/// 生成待测试的强度序列，包含最小值和最大值
///
/// 上界额外放宽半个步长，再把每个值取整到配置的小数位数，
/// 避免二进制浮点表示的步长把最大值丢掉
pub fn generate_strengths(sweep: &SweepConfig) -> Result<Vec<StrengthValue>, SweepError> {
    validate_sweep(sweep)?;

    let stop = sweep.max_strength + sweep.increment / 2.0;
    let count = ((stop - sweep.min_strength) / sweep.increment).ceil().max(0.0) as usize;

    Ok((0..count)
        .map(|i| {
            let raw = sweep.min_strength + i as f64 * sweep.increment;
            StrengthValue::from_f64(raw, sweep.decimal_places)
        })
        .collect())
}
