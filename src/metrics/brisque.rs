use crate::error::{MetricError, ModelError};
use crate::metrics::QualityMetric;
use crate::metrics::filter::{Border, Plane, gaussian_kernel, separable_filter};
use crate::metrics::svm::{FeatureScaling, SvrModel};
use image::imageops::{self, FilterType};
use image::{ImageBuffer, Luma, RgbImage};
use std::f64::consts::PI;

pub const FEATURE_COUNT: usize = 36;
/// 第二个尺度也要放得下7x7窗口
pub const MIN_SIDE: u32 = 14;

const MSCN_C: f64 = 1.0 / 255.0;
const WINDOW_SIGMA: f64 = 7.0 / 6.0;
const WINDOW_RADIUS: usize = 3;
const ALPHA_MIN: f64 = 0.2;
const ALPHA_MAX: f64 = 10.0;
const ALPHA_STEP: f64 = 0.001;

// 内置模型：以自然图像的典型NSS特征为中心的单支持向量RBF模型，分数范围 [0, 100)
const BUILTIN_MODEL: &str = include_str!("../../assets/brisque_default.model");
const BUILTIN_RANGE: &str = include_str!("../../assets/brisque_default.range");

// 相邻像素对：水平、垂直、主对角、副对角
const PAIR_SHIFTS: [(isize, isize); 4] = [(1, 0), (0, 1), (1, 1), (-1, 1)];

/// Lanczos近似的Gamma函数 (g = 7, n = 9)
pub fn gamma(x: f64) -> f64 {
    const G: f64 = 7.0;
    const COEF: [f64; 9] = [
        0.999_999_999_999_809_9,
        676.520_368_121_885_1,
        -1_259.139_216_722_402_8,
        771.323_428_777_653_1,
        -176.615_029_162_140_6,
        12.507_343_278_686_905,
        -0.138_571_095_265_720_12,
        9.984_369_578_019_572e-6,
        1.505_632_735_149_311_6e-7,
    ];

    if x < 0.5 {
        // 反射公式
        PI / ((PI * x).sin() * gamma(1.0 - x))
    } else {
        let x = x - 1.0;
        let t = x + G + 0.5;
        let a = COEF
            .iter()
            .enumerate()
            .skip(1)
            .fold(COEF[0], |acc, (i, c)| acc + c / (x + i as f64));
        (2.0 * PI).sqrt() * t.powf(x + 0.5) * (-t).exp() * a
    }
}

/// 矩匹配用的形状参数查找表
#[derive(Debug, Clone)]
pub struct MomentTable {
    alphas: Vec<f64>,
    // Γ(1/α)Γ(3/α)/Γ(2/α)²
    ratios: Vec<f64>,
}

impl MomentTable {
    pub fn new() -> Self {
        let steps = ((ALPHA_MAX - ALPHA_MIN) / ALPHA_STEP).round() as usize;
        let alphas: Vec<f64> = (0..=steps).map(|i| ALPHA_MIN + i as f64 * ALPHA_STEP).collect();
        let ratios = alphas
            .iter()
            .map(|&a| gamma(1.0 / a) * gamma(3.0 / a) / gamma(2.0 / a).powi(2))
            .collect();
        Self { alphas, ratios }
    }

    fn best_alpha(&self, target: f64, invert: bool) -> f64 {
        let idx = self
            .ratios
            .iter()
            .map(|&r| if invert { (1.0 / r - target).abs() } else { (r - target).abs() })
            .enumerate()
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i)
            .unwrap_or(0);
        self.alphas[idx]
    }

    /// 广义高斯分布拟合，返回 (alpha, sigma²)
    pub fn fit_ggd(&self, samples: &[f64]) -> Option<(f64, f64)> {
        let n = samples.len() as f64;
        let sigma_sq = samples.iter().map(|v| v * v).sum::<f64>() / n;
        let mean_abs = samples.iter().map(|v| v.abs()).sum::<f64>() / n;
        if !(mean_abs > 0.0 && sigma_sq.is_finite()) {
            return None;
        }
        let rho = sigma_sq / (mean_abs * mean_abs);
        Some((self.best_alpha(rho, false), sigma_sq))
    }

    /// 非对称广义高斯分布拟合，返回 (alpha, mean, left σ², right σ²)
    pub fn fit_aggd(&self, samples: &[f64]) -> Option<[f64; 4]> {
        let (mut left_sq, mut left_n, mut right_sq, mut right_n) = (0.0, 0usize, 0.0, 0usize);
        for &v in samples {
            if v < 0.0 {
                left_sq += v * v;
                left_n += 1;
            } else if v > 0.0 {
                right_sq += v * v;
                right_n += 1;
            }
        }
        if left_n == 0 || right_n == 0 {
            return None;
        }

        let left_std = (left_sq / left_n as f64).sqrt();
        let right_std = (right_sq / right_n as f64).sqrt();
        let gamma_hat = left_std / right_std;

        let n = samples.len() as f64;
        let mean_abs = samples.iter().map(|v| v.abs()).sum::<f64>() / n;
        let mean_sq = samples.iter().map(|v| v * v).sum::<f64>() / n;
        let r_hat = mean_abs * mean_abs / mean_sq;
        let r_hat_norm = r_hat * (gamma_hat.powi(3) + 1.0) * (gamma_hat + 1.0)
            / (gamma_hat.powi(2) + 1.0).powi(2);

        let alpha = self.best_alpha(r_hat_norm, true);
        let g1 = gamma(1.0 / alpha);
        let g2 = gamma(2.0 / alpha);
        let g3 = gamma(3.0 / alpha);
        let spread = (g1 / g3).sqrt();
        let mean = (right_std - left_std) * spread * g2 / g1;

        Some([alpha, mean, left_std * left_std, right_std * right_std])
    }
}

impl Default for MomentTable {
    fn default() -> Self {
        Self::new()
    }
}

/// 灰度化到 [0, 1]，权重与 skimage rgb2gray 相同
pub fn grayscale(image: &RgbImage) -> Plane {
    let data = image
        .pixels()
        .map(|p| (0.2125 * p[0] as f64 + 0.7154 * p[1] as f64 + 0.0721 * p[2] as f64) / 255.0)
        .collect();
    Plane::new(image.width() as usize, image.height() as usize, data)
}

/// MSCN系数：(I - μ) / (σ + C)，局部统计量使用零填充
pub fn mscn(plane: &Plane) -> Plane {
    let kernel = gaussian_kernel(WINDOW_SIGMA, WINDOW_RADIUS);
    let mu = separable_filter(plane, &kernel, Border::Zero);
    let mu_sq = separable_filter(&plane.map(|v| v * v), &kernel, Border::Zero);

    let data = plane
        .data
        .iter()
        .zip(mu.data.iter().zip(&mu_sq.data))
        .map(|(&v, (&m, &m2))| {
            let sigma = (m2 - m * m).abs().sqrt();
            (v - m) / (sigma + MSCN_C)
        })
        .collect();
    Plane::new(plane.width, plane.height, data)
}

/// 与循环平移后的自身逐点相乘，每个方向都得到 w * h 个乘积
fn neighbour_products(field: &Plane, (dx, dy): (isize, isize)) -> Vec<f64> {
    let (w, h) = (field.width, field.height);
    let mut out = Vec::with_capacity(field.data.len());
    for y in 0..h {
        let ny = (y as isize + dy).rem_euclid(h as isize) as usize;
        for x in 0..w {
            let nx = (x as isize + dx).rem_euclid(w as isize) as usize;
            out.push(field.get(x, y) * field.get(nx, ny));
        }
    }
    out
}

fn scale_features(plane: &Plane, table: &MomentTable) -> Option<Vec<f64>> {
    let field = mscn(plane);
    let (alpha, sigma_sq) = table.fit_ggd(&field.data)?;

    let mut features = vec![alpha, sigma_sq];
    for shift in PAIR_SHIFTS {
        features.extend(table.fit_aggd(&neighbour_products(&field, shift))?);
    }
    Some(features)
}

/// 双三次插值缩小一半
fn downscale_half(plane: &Plane) -> Plane {
    let buffer: ImageBuffer<Luma<f32>, Vec<f32>> = ImageBuffer::from_raw(
        plane.width as u32,
        plane.height as u32,
        plane.data.iter().map(|&v| v as f32).collect(),
    )
    .unwrap_or_else(|| ImageBuffer::new(plane.width as u32, plane.height as u32));

    let (w, h) = (plane.width.div_ceil(2) as u32, plane.height.div_ceil(2) as u32);
    let small = imageops::resize(&buffer, w, h, FilterType::CatmullRom);
    Plane::new(w as usize, h as usize, small.into_raw().into_iter().map(f64::from).collect())
}

/// 计算两尺度共36维BRISQUE特征
pub fn brisque_features(image: &RgbImage, table: &MomentTable) -> Result<Vec<f64>, MetricError> {
    let (w, h) = image.dimensions();
    if w < MIN_SIDE || h < MIN_SIDE {
        return Err(MetricError::TooSmall {
            metric: "BRISQUE",
            width: w,
            height: h,
            min: MIN_SIDE,
        });
    }

    let full = grayscale(image);
    let (lo, hi) = full
        .data
        .iter()
        .fold((f64::MAX, f64::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if hi - lo < 1e-6 {
        return Err(MetricError::NoContrast("BRISQUE"));
    }
    let half = downscale_half(&full);

    let mut features = Vec::with_capacity(FEATURE_COUNT);
    for plane in [&full, &half] {
        features.extend(scale_features(plane, table).ok_or(MetricError::NonFinite("BRISQUE feature"))?);
    }

    if features.iter().any(|f| !f.is_finite()) {
        return Err(MetricError::NonFinite("BRISQUE feature"));
    }
    Ok(features)
}

/// BRISQUE无参考质量评分（Mittal et al. 2012），分数越低失真越少
///
/// 两个尺度上各取MSCN系数的GGD拟合和四个方向相邻乘积的AGGD拟合，共36维，
/// 经 svm-scale 范围缩放后交给libsvm SVR模型打分。
#[derive(Debug, Clone)]
pub struct Brisque {
    model: SvrModel,
    scaling: FeatureScaling,
    table: MomentTable,
}

impl Brisque {
    pub fn new(model: SvrModel, scaling: FeatureScaling) -> Self {
        Self {
            model,
            scaling,
            table: MomentTable::new(),
        }
    }

    /// 使用随程序发布的内置模型
    pub fn builtin() -> Result<Self, ModelError> {
        Ok(Self::new(SvrModel::parse(BUILTIN_MODEL)?, FeatureScaling::parse(BUILTIN_RANGE)?))
    }
}

impl QualityMetric for Brisque {
    fn name(&self) -> &'static str {
        "brisque"
    }

    fn score(&self, image: &RgbImage) -> Result<f64, MetricError> {
        if self.model.dimension() > FEATURE_COUNT {
            return Err(MetricError::FeatureCount {
                got: FEATURE_COUNT,
                expected: self.model.dimension(),
            });
        }
        let features = brisque_features(image, &self.table)?;
        let score = self.model.predict(&self.scaling.scale(&features));
        if score.is_finite() { Ok(score) } else { Err(MetricError::NonFinite("BRISQUE")) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use image::Rgb;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn normal_samples(n: usize, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n)
            .map(|_| {
                let u1: f64 = rng.random::<f64>().max(1e-12);
                let u2: f64 = rng.random();
                (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
            })
            .collect()
    }

    fn laplace_samples(n: usize, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n)
            .map(|_| {
                let u: f64 = rng.random::<f64>().max(1e-12);
                let sign = if rng.random::<bool>() { 1.0 } else { -1.0 };
                -sign * u.ln()
            })
            .collect()
    }

    fn textured(w: u32, h: u32, seed: u64) -> RgbImage {
        let mut rng = StdRng::seed_from_u64(seed);
        RgbImage::from_fn(w, h, |x, y| {
            let base = ((x as f64 * 0.3).sin() * 60.0 + (y as f64 * 0.2).cos() * 60.0 + 128.0) as i32;
            let noise: i32 = rng.random_range(-10..=10);
            let v = (base + noise).clamp(0, 255) as u8;
            Rgb([v, v.saturating_add(5), v.saturating_sub(5)])
        })
    }

    #[test]
    fn test_gamma_known_values() {
        assert_relative_eq!(gamma(1.0), 1.0, epsilon = 1e-10);
        assert_relative_eq!(gamma(5.0), 24.0, epsilon = 1e-8);
        assert_relative_eq!(gamma(0.5), PI.sqrt(), epsilon = 1e-10);
        assert_relative_eq!(gamma(0.1), 9.513_507_698_668_732, epsilon = 1e-8);
    }

    #[test]
    fn test_ggd_fit_recovers_shape() {
        let table = MomentTable::new();

        let (alpha, sigma_sq) = table.fit_ggd(&normal_samples(50_000, 7)).unwrap();
        assert!((alpha - 2.0).abs() < 0.15, "gaussian alpha = {}", alpha);
        assert!((sigma_sq - 1.0).abs() < 0.05);

        let (alpha, _) = table.fit_ggd(&laplace_samples(50_000, 11)).unwrap();
        assert!((alpha - 1.0).abs() < 0.1, "laplacian alpha = {}", alpha);

        assert!(table.fit_ggd(&[0.0; 16]).is_none());
    }

    #[test]
    fn test_aggd_fit_symmetric_gaussian() {
        let table = MomentTable::new();
        let [alpha, mean, left, right] = table.fit_aggd(&normal_samples(50_000, 3)).unwrap();
        assert!((alpha - 2.0).abs() < 0.15, "alpha = {}", alpha);
        assert!(mean.abs() < 0.05, "mean = {}", mean);
        assert!((left - right).abs() < 0.05);

        // 单侧数据无法拟合
        assert!(table.fit_aggd(&[1.0, 2.0, 3.0]).is_none());
    }

    #[test]
    fn test_aggd_mean_follows_skew() {
        let table = MomentTable::new();
        let skewed: Vec<f64> = normal_samples(20_000, 5)
            .into_iter()
            .map(|v| if v > 0.0 { v * 2.0 } else { v })
            .collect();
        let [_, mean, left, right] = table.fit_aggd(&skewed).unwrap();
        assert!(mean > 0.0);
        assert!(right > left);
    }

    #[test]
    fn test_mscn_of_flat_image() {
        let plane = Plane::new(16, 16, vec![0.5; 256]);
        let field = mscn(&plane);
        // 内部为0，零填充使边缘非0
        assert!(field.get(8, 8).abs() < 1e-9);
        assert!(field.get(0, 0) > 0.0);
    }

    #[test]
    fn test_neighbour_products_wrap_around() {
        let field = Plane::new(3, 2, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let horizontal = neighbour_products(&field, (1, 0));
        assert_eq!(horizontal, vec![2.0, 6.0, 3.0, 20.0, 30.0, 24.0]);
        for shift in PAIR_SHIFTS {
            assert_eq!(neighbour_products(&field, shift).len(), 6);
        }
        assert_eq!(neighbour_products(&field, (-1, 1))[0], 1.0 * 6.0);
    }

    #[test]
    fn test_feature_vector_shape() {
        let table = MomentTable::new();
        let features = brisque_features(&textured(48, 40, 1), &table).unwrap();
        assert_eq!(features.len(), FEATURE_COUNT);
        assert!(features.iter().all(|f| f.is_finite()));
        // 每个尺度的第一个特征是GGD形状参数
        assert!(features[0] >= ALPHA_MIN && features[0] <= ALPHA_MAX);
        assert!(features[18] >= ALPHA_MIN && features[18] <= ALPHA_MAX);
    }

    #[test]
    fn test_rejects_small_and_flat_images() {
        let table = MomentTable::new();
        assert!(matches!(
            brisque_features(&textured(10, 40, 1), &table),
            Err(MetricError::TooSmall { .. })
        ));
        let flat = RgbImage::from_pixel(32, 32, Rgb([90, 90, 90]));
        assert!(matches!(brisque_features(&flat, &table), Err(MetricError::NoContrast(_))));
    }

    #[test]
    fn test_score_with_linear_model() {
        // 只取第一个特征：score = feature[0] - 0
        let model = SvrModel::parse("svm_type epsilon_svr\nkernel_type linear\nrho 0\nSV\n1 1:1\n").unwrap();
        let scaling = FeatureScaling::parse("x\n-1 1\n").unwrap();
        let brisque = Brisque::new(model, scaling);

        let image = textured(32, 32, 9);
        let features = brisque_features(&image, &MomentTable::new()).unwrap();
        assert_relative_eq!(brisque.score(&image).unwrap(), features[0], epsilon = 1e-12);
        assert_eq!(brisque.name(), "brisque");
    }

    #[test]
    fn test_builtin_model() {
        let brisque = Brisque::builtin().unwrap();
        assert_eq!(brisque.model.dimension(), FEATURE_COUNT);
        assert_eq!(brisque.scaling.ranges.len(), FEATURE_COUNT);

        // 支持向量本身就是参考点，得分为0
        let reference = brisque.model.support_vectors[0].clone();
        assert_relative_eq!(brisque.model.predict(&reference), 0.0, epsilon = 1e-9);

        let score = brisque.score(&textured(48, 48, 4)).unwrap();
        assert!((0.0..=100.0).contains(&score), "score = {}", score);
    }
}
