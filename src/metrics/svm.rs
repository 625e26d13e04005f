// libsvm 文本格式：svm-train 输出的SVR模型和 svm-scale 的特征范围文件
use crate::error::ModelError;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Kernel {
    Linear,
    Rbf { gamma: f64 },
}

/// libsvm回归模型
#[derive(Debug, Clone, PartialEq)]
pub struct SvrModel {
    pub kernel: Kernel,
    pub rho: f64,
    pub coefficients: Vec<f64>,
    pub support_vectors: Vec<Vec<f64>>,
}

impl SvrModel {
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        Self::parse(&fs::read_to_string(path)?)
    }

    pub fn parse(text: &str) -> Result<Self, ModelError> {
        let mut lines = text.lines().enumerate();

        let mut svm_type = None;
        let mut kernel_type = None;
        let mut gamma = None;
        let mut rho = None;

        // 头部：键值对，直到 "SV" 行
        for (n, raw) in lines.by_ref() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            if line == "SV" {
                break;
            }
            let mut parts = line.split_whitespace();
            let key = parts.next().unwrap_or_default();
            let value = parts.next();
            match key {
                "svm_type" => svm_type = value.map(str::to_string),
                "kernel_type" => kernel_type = value.map(str::to_string),
                "gamma" => gamma = Some(parse_f64(value, n)?),
                "rho" => rho = Some(parse_f64(value, n)?),
                _ => {}
            }
        }

        let svm_type = svm_type.ok_or(ModelError::MissingField("svm_type"))?;
        if svm_type != "epsilon_svr" && svm_type != "nu_svr" {
            return Err(ModelError::Parse {
                line: 1,
                reason: format!("expected a regression model, got svm_type '{}'", svm_type),
            });
        }

        let kernel = match kernel_type.ok_or(ModelError::MissingField("kernel_type"))?.as_str() {
            "linear" => Kernel::Linear,
            "rbf" => Kernel::Rbf {
                gamma: gamma.ok_or(ModelError::MissingField("gamma"))?,
            },
            other => return Err(ModelError::UnsupportedKernel(other.to_string())),
        };
        let rho = rho.ok_or(ModelError::MissingField("rho"))?;

        let mut coefficients = Vec::new();
        let mut support_vectors = Vec::new();
        for (n, raw) in lines {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            let mut parts = line.split_whitespace();
            coefficients.push(parse_f64(parts.next(), n)?);

            let mut sv = Vec::new();
            for pair in parts {
                let (index, value) = pair.split_once(':').ok_or_else(|| ModelError::Parse {
                    line: n + 1,
                    reason: format!("expected index:value, got '{}'", pair),
                })?;
                let index: usize = index.parse().map_err(|_| ModelError::Parse {
                    line: n + 1,
                    reason: format!("bad feature index '{}'", index),
                })?;
                if index == 0 {
                    return Err(ModelError::Parse {
                        line: n + 1,
                        reason: "feature indices start at 1".to_string(),
                    });
                }
                if sv.len() < index {
                    sv.resize(index, 0.0);
                }
                sv[index - 1] = parse_f64(Some(value), n)?;
            }
            support_vectors.push(sv);
        }

        if support_vectors.is_empty() {
            return Err(ModelError::MissingField("SV"));
        }

        Ok(Self {
            kernel,
            rho,
            coefficients,
            support_vectors,
        })
    }

    /// 模型使用的最大特征维数
    pub fn dimension(&self) -> usize {
        self.support_vectors.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn predict(&self, x: &[f64]) -> f64 {
        let sum: f64 = self
            .support_vectors
            .iter()
            .zip(&self.coefficients)
            .map(|(sv, coef)| coef * self.kernel_value(sv, x))
            .sum();
        sum - self.rho
    }

    fn kernel_value(&self, sv: &[f64], x: &[f64]) -> f64 {
        let len = sv.len().max(x.len());
        let at = |v: &[f64], i: usize| v.get(i).copied().unwrap_or(0.0);
        match self.kernel {
            Kernel::Linear => (0..len).map(|i| at(sv, i) * at(x, i)).sum(),
            Kernel::Rbf { gamma } => {
                let dist: f64 = (0..len).map(|i| (at(sv, i) - at(x, i)).powi(2)).sum();
                (-gamma * dist).exp()
            }
        }
    }
}

/// svm-scale 生成的特征缩放范围
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureScaling {
    pub lower: f64,
    pub upper: f64,
    // 下标从0开始；None表示该特征不缩放
    pub ranges: Vec<Option<(f64, f64)>>,
}

impl FeatureScaling {
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        Self::parse(&fs::read_to_string(path)?)
    }

    pub fn parse(text: &str) -> Result<Self, ModelError> {
        let mut lines = text
            .lines()
            .enumerate()
            .map(|(n, l)| (n, l.trim()))
            .filter(|(_, l)| !l.is_empty());

        match lines.next() {
            Some((_, "x")) => {}
            Some((n, other)) => {
                return Err(ModelError::Parse {
                    line: n + 1,
                    reason: format!("expected 'x' section, got '{}'", other),
                });
            }
            None => return Err(ModelError::MissingField("x")),
        }

        let (n, bounds) = lines.next().ok_or(ModelError::MissingField("lower upper"))?;
        let mut parts = bounds.split_whitespace();
        let lower = parse_f64(parts.next(), n)?;
        let upper = parse_f64(parts.next(), n)?;

        let mut ranges = Vec::new();
        for (n, line) in lines {
            // 目标值缩放段与特征无关
            if line == "y" {
                break;
            }
            let mut parts = line.split_whitespace();
            let index: usize = parts
                .next()
                .and_then(|s| s.parse().ok())
                .filter(|&i| i > 0)
                .ok_or_else(|| ModelError::Parse {
                    line: n + 1,
                    reason: format!("bad feature index in '{}'", line),
                })?;
            let min = parse_f64(parts.next(), n)?;
            let max = parse_f64(parts.next(), n)?;
            if ranges.len() < index {
                ranges.resize(index, None);
            }
            ranges[index - 1] = Some((min, max));
        }

        Ok(Self { lower, upper, ranges })
    }

    pub fn scale(&self, features: &[f64]) -> Vec<f64> {
        features
            .iter()
            .enumerate()
            .map(|(i, &v)| match self.ranges.get(i).copied().flatten() {
                Some((min, max)) if max > min => {
                    self.lower + (self.upper - self.lower) * (v - min) / (max - min)
                }
                // svm-scale 会丢弃常量特征，稀疏表示下即为0
                Some(_) => 0.0,
                None => v,
            })
            .collect()
    }
}

fn parse_f64(token: Option<&str>, line: usize) -> Result<f64, ModelError> {
    let token = token.ok_or_else(|| ModelError::Parse {
        line: line + 1,
        reason: "missing numeric value".to_string(),
    })?;
    token.parse().map_err(|_| ModelError::Parse {
        line: line + 1,
        reason: format!("'{}' is not a number", token),
    })
}
