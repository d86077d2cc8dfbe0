// cvcli/src/processors/blur.rs
use crate::core::{BlurConfig, BorderType, CvToolError, ElementEncoding, Mat, PixelBuffer, Result};
use rayon::prelude::*;

/// Maps an out-of-range coordinate back into `0..len`, `None` meaning "use zero".
fn border_interpolate(p: isize, len: usize, border: BorderType) -> Option<usize> {
    let n = len as isize;
    if (0..n).contains(&p) {
        return Some(p as usize);
    }

    match border {
        // Isolated carries no base mode of its own, which leaves a zero border.
        BorderType::Constant | BorderType::Isolated | BorderType::Transparent => None,
        BorderType::Replicate => Some(p.clamp(0, n - 1) as usize),
        BorderType::Reflect | BorderType::Reflect101 | BorderType::Default => {
            if n == 1 {
                return Some(0);
            }
            let delta = if border == BorderType::Reflect { 0 } else { 1 };
            let mut p = p;
            while !(0..n).contains(&p) {
                if p < 0 {
                    p = -p - 1 + delta;
                } else {
                    p = n - 1 - (p - n) - delta;
                }
            }
            Some(p as usize)
        }
    }
}

/// 1-D Gaussian weights of length `size` (odd), normalized to sum to one.
pub fn gaussian_kernel(size: usize, sigma: f64) -> Vec<f64> {
    const SMALL: [&[f64]; 4] = [
        &[1.0],
        &[0.25, 0.5, 0.25],
        &[0.0625, 0.25, 0.375, 0.25, 0.0625],
        &[0.03125, 0.109375, 0.21875, 0.28125, 0.21875, 0.109375, 0.03125],
    ];

    if sigma <= 0.0 && size % 2 == 1 && size <= 7 {
        return SMALL[size / 2].to_vec();
    }

    let sigma = if sigma > 0.0 {
        sigma
    } else {
        ((size as f64 - 1.0) * 0.5 - 1.0) * 0.3 + 0.8
    };
    let scale = -0.5 / (sigma * sigma);
    let center = (size as f64 - 1.0) * 0.5;

    let weights: Vec<f64> = (0..size)
        .map(|i| {
            let x = i as f64 - center;
            (scale * x * x).exp()
        })
        .collect();
    let sum: f64 = weights.iter().sum();
    weights.into_iter().map(|w| w / sum).collect()
}

pub struct GaussianBlur {
    config: BlurConfig,
}

impl GaussianBlur {
    pub fn new(config: BlurConfig) -> Result<Self> {
        config.validate()?;

        if config.border == BorderType::Transparent {
            return Err(CvToolError::InvalidParameter(
                "Border type transparent is not supported by the Gaussian filter".to_string(),
            ));
        }

        Ok(Self { config })
    }

    pub fn apply(&self, src: &Mat) -> Result<Mat> {
        if src.is_empty() {
            return Err(CvToolError::InvalidParameter(
                "Source data is empty".to_string(),
            ));
        }

        match src.encoding() {
            ElementEncoding::UInt8
            | ElementEncoding::UInt16
            | ElementEncoding::Int16
            | ElementEncoding::Float32
            | ElementEncoding::Float64 => {}
            other => {
                return Err(CvToolError::UnsupportedDepth(format!(
                    "Source depth {} is not supported",
                    other.label()
                )));
            }
        }

        let sigma_x = self.config.sigma_x;
        let sigma_y = if self.config.sigma_y == 0.0 {
            sigma_x
        } else {
            self.config.sigma_y
        };
        let kx = gaussian_kernel(self.config.ksize_w as usize, sigma_x);
        let ky = gaussian_kernel(self.config.ksize_h as usize, sigma_y);

        log::debug!(
            "Gaussian blur {}x{} (sigma {:.3}/{:.3}, border {}) on {}x{}",
            kx.len(),
            ky.len(),
            sigma_x,
            sigma_y,
            self.config.border.name(),
            src.cols(),
            src.rows()
        );

        let rows = src.rows();
        let cols = src.cols();
        let channels = src.channels() as usize;
        let row_len = src.row_len();
        let border = self.config.border;
        let values = src.to_f64_vec();

        let ax = (kx.len() / 2) as isize;
        let xmap: Vec<Option<usize>> = (-ax..cols as isize + ax)
            .map(|p| border_interpolate(p, cols, border))
            .collect();

        let mut horizontal = vec![0.0; rows * row_len];
        horizontal
            .par_chunks_mut(row_len)
            .zip(values.par_chunks(row_len))
            .for_each(|(out, input)| {
                for x in 0..cols {
                    for c in 0..channels {
                        out[x * channels + c] = kx
                            .iter()
                            .zip(&xmap[x..x + kx.len()])
                            .filter_map(|(w, src_x)| src_x.map(|sx| w * input[sx * channels + c]))
                            .sum();
                    }
                }
            });

        let ay = (ky.len() / 2) as isize;
        let ymap: Vec<Option<usize>> = (-ay..rows as isize + ay)
            .map(|p| border_interpolate(p, rows, border))
            .collect();

        let mut output = vec![0.0; rows * row_len];
        output
            .par_chunks_mut(row_len)
            .enumerate()
            .for_each(|(y, out)| {
                for (w, src_y) in ky.iter().zip(&ymap[y..y + ky.len()]) {
                    if let Some(sy) = src_y {
                        let line = &horizontal[sy * row_len..(sy + 1) * row_len];
                        out.iter_mut().zip(line).for_each(|(o, v)| *o += w * v);
                    }
                }
            });

        Mat::from_f64(rows, cols, src.channels(), src.encoding(), output)
    }
}
