// SSIM (Wang et al. 2004)：uniform 为7x7均值窗口加样本协方差，gaussian 为 σ=1.5 的11x11窗口
use crate::error::MetricError;
use crate::metrics::SimilarityMetric;
use crate::metrics::filter::{Border, Plane, gaussian_kernel, separable_filter, uniform_kernel};
use image::GrayImage;

const K1: f64 = 0.01;
const K2: f64 = 0.03;
const GAUSSIAN_TRUNCATE: f64 = 3.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SsimWindow {
    Uniform { size: usize },
    Gaussian { sigma: f64 },
}

#[derive(Debug, Clone)]
pub struct Ssim {
    window: SsimWindow,
    kernel: Vec<f64>,
}

impl Ssim {
    pub fn new(window: SsimWindow) -> Self {
        let kernel = match window {
            SsimWindow::Uniform { size } => uniform_kernel(size),
            SsimWindow::Gaussian { sigma } => {
                gaussian_kernel(sigma, (GAUSSIAN_TRUNCATE * sigma + 0.5) as usize)
            }
        };
        Self { window, kernel }
    }

    pub fn uniform() -> Self {
        Self::new(SsimWindow::Uniform { size: 7 })
    }

    pub fn gaussian() -> Self {
        Self::new(SsimWindow::Gaussian { sigma: 1.5 })
    }

    pub fn window_size(&self) -> usize {
        self.kernel.len()
    }

    fn covariance_norm(&self) -> f64 {
        match self.window {
            SsimWindow::Uniform { .. } => {
                let np = (self.kernel.len() * self.kernel.len()) as f64;
                np / (np - 1.0)
            }
            SsimWindow::Gaussian { .. } => 1.0,
        }
    }

    /// 返回逐像素SSIM图
    pub fn ssim_map(&self, x: &Plane, y: &Plane, data_range: f64) -> Plane {
        let filter = |p: &Plane| separable_filter(p, &self.kernel, Border::Reflect);
        let cov_norm = self.covariance_norm();

        let ux = filter(x);
        let uy = filter(y);
        let uxx = filter(&x.zip_map(x, |a, b| a * b));
        let uyy = filter(&y.zip_map(y, |a, b| a * b));
        let uxy = filter(&x.zip_map(y, |a, b| a * b));

        let c1 = (K1 * data_range).powi(2);
        let c2 = (K2 * data_range).powi(2);

        let data = (0..x.data.len())
            .map(|i| {
                let (mx, my) = (ux.data[i], uy.data[i]);
                let vx = cov_norm * (uxx.data[i] - mx * mx);
                let vy = cov_norm * (uyy.data[i] - my * my);
                let vxy = cov_norm * (uxy.data[i] - mx * my);

                let num = (2.0 * mx * my + c1) * (2.0 * vxy + c2);
                let den = (mx * mx + my * my + c1) * (vx + vy + c2);
                num / den
            })
            .collect();

        Plane::new(x.width, x.height, data)
    }
}

impl SimilarityMetric for Ssim {
    fn name(&self) -> &'static str {
        match self.window {
            SsimWindow::Uniform { .. } => "ssim-uniform",
            SsimWindow::Gaussian { .. } => "ssim-gaussian",
        }
    }

    fn compare(&self, reference: &GrayImage, other: &GrayImage, data_range: f64) -> Result<f64, MetricError> {
        if reference.dimensions() != other.dimensions() {
            return Err(MetricError::ShapeMismatch(reference.dimensions(), other.dimensions()));
        }
        let win = self.window_size() as u32;
        let (w, h) = reference.dimensions();
        if w < win || h < win {
            return Err(MetricError::TooSmall {
                metric: "SSIM",
                width: w,
                height: h,
                min: win,
            });
        }
        if !(data_range.is_finite() && data_range > 0.0) {
            return Err(MetricError::DegenerateRange);
        }

        let map = self.ssim_map(&Plane::from_luma(reference), &Plane::from_luma(other), data_range);

        let pad = self.window_size() / 2;
        let mut sum = 0.0;
        let mut count = 0usize;
        for yy in pad..map.height - pad {
            for xx in pad..map.width - pad {
                sum += map.get(xx, yy);
                count += 1;
            }
        }
        Ok(sum / count as f64)
    }
}
