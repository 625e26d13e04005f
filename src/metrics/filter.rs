use image::GrayImage;

/// 边界处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Border {
    /// 半像素对称反射：d c b a | a b c d | d c b a
    Reflect,
    /// 边界外按0处理，与 filter2(..., 'same') 一致
    Zero,
}

/// 行优先存储的单通道浮点图像
#[derive(Debug, Clone, PartialEq)]
pub struct Plane {
    pub width: usize,
    pub height: usize,
    pub data: Vec<f64>,
}

impl Plane {
    pub fn new(width: usize, height: usize, data: Vec<f64>) -> Self {
        debug_assert_eq!(data.len(), width * height);
        Self { width, height, data }
    }

    pub fn from_luma(image: &GrayImage) -> Self {
        Self::new(
            image.width() as usize,
            image.height() as usize,
            image.as_raw().iter().map(|&v| v as f64).collect(),
        )
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f64 {
        self.data[y * self.width + x]
    }

    pub fn map(&self, f: impl Fn(f64) -> f64) -> Plane {
        Plane::new(self.width, self.height, self.data.iter().map(|&v| f(v)).collect())
    }

    pub fn zip_map(&self, other: &Plane, f: impl Fn(f64, f64) -> f64) -> Plane {
        debug_assert_eq!((self.width, self.height), (other.width, other.height));
        Plane::new(
            self.width,
            self.height,
            self.data.iter().zip(&other.data).map(|(&a, &b)| f(a, b)).collect(),
        )
    }
}

/// 把越界坐标映射回 [0, n)；零填充时越界返回None
fn border_index(i: isize, n: usize, border: Border) -> Option<usize> {
    let n_i = n as isize;
    match border {
        Border::Reflect => {
            let period = 2 * n_i;
            let m = i.rem_euclid(period);
            Some(if m < n_i { m as usize } else { (period - 1 - m) as usize })
        }
        Border::Zero => (0..n_i).contains(&i).then_some(i as usize),
    }
}

/// 对一个维度做一维卷积，kernel长度为奇数且以中心对齐
fn convolve_axis(src: &Plane, kernel: &[f64], border: Border, horizontal: bool) -> Plane {
    let radius = (kernel.len() / 2) as isize;
    let (w, h) = (src.width, src.height);
    let mut out = vec![0.0; w * h];

    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0;
            for (k, &weight) in kernel.iter().enumerate() {
                let offset = k as isize - radius;
                let v = if horizontal {
                    border_index(x as isize + offset, w, border).map(|xx| src.get(xx, y))
                } else {
                    border_index(y as isize + offset, h, border).map(|yy| src.get(x, yy))
                };
                acc += weight * v.unwrap_or(0.0);
            }
            out[y * w + x] = acc;
        }
    }

    Plane::new(w, h, out)
}

/// 可分离二维滤波：先水平后垂直
pub fn separable_filter(src: &Plane, kernel: &[f64], border: Border) -> Plane {
    let tmp = convolve_axis(src, kernel, border, true);
    convolve_axis(&tmp, kernel, border, false)
}

/// 均值滤波核
pub fn uniform_kernel(size: usize) -> Vec<f64> {
    vec![1.0 / size as f64; size]
}

/// 归一化的一维高斯核，长度为 2 * radius + 1
pub fn gaussian_kernel(sigma: f64, radius: usize) -> Vec<f64> {
    let r = radius as isize;
    let weights: Vec<f64> = (-r..=r)
        .map(|i| (-((i * i) as f64) / (2.0 * sigma * sigma)).exp())
        .collect();
    let sum: f64 = weights.iter().sum();
    weights.into_iter().map(|w| w / sum).collect()
}
