// cvcli/src/core/mat.rs
use super::descriptor::{make_type, ElementEncoding, PixelBuffer, CN_MAX};
use super::{CvToolError, Result};

/// Typed element storage, one variant per recognized encoding.
#[derive(Debug, Clone, PartialEq)]
pub enum MatData {
    U8(Vec<u8>),
    I8(Vec<i8>),
    U16(Vec<u16>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

macro_rules! saturate_int {
    ($values:expr, $t:ty) => {
        $values
            .into_iter()
            .map(|v| v.round().clamp(<$t>::MIN as f64, <$t>::MAX as f64) as $t)
            .collect()
    };
}

impl MatData {
    pub fn encoding(&self) -> ElementEncoding {
        match self {
            MatData::U8(_) => ElementEncoding::UInt8,
            MatData::I8(_) => ElementEncoding::Int8,
            MatData::U16(_) => ElementEncoding::UInt16,
            MatData::I16(_) => ElementEncoding::Int16,
            MatData::I32(_) => ElementEncoding::Int32,
            MatData::F32(_) => ElementEncoding::Float32,
            MatData::F64(_) => ElementEncoding::Float64,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            MatData::U8(v) => v.len(),
            MatData::I8(v) => v.len(),
            MatData::U16(v) => v.len(),
            MatData::I16(v) => v.len(),
            MatData::I32(v) => v.len(),
            MatData::F32(v) => v.len(),
            MatData::F64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element `index` widened to `f64`.
    pub fn get(&self, index: usize) -> Option<f64> {
        match self {
            MatData::U8(v) => v.get(index).map(|&x| f64::from(x)),
            MatData::I8(v) => v.get(index).map(|&x| f64::from(x)),
            MatData::U16(v) => v.get(index).map(|&x| f64::from(x)),
            MatData::I16(v) => v.get(index).map(|&x| f64::from(x)),
            MatData::I32(v) => v.get(index).map(|&x| f64::from(x)),
            MatData::F32(v) => v.get(index).map(|&x| f64::from(x)),
            MatData::F64(v) => v.get(index).copied(),
        }
    }

    /// Converts `values` to `encoding`, rounding to nearest and saturating for
    /// integer encodings. NaN becomes zero.
    pub fn from_f64(encoding: ElementEncoding, values: Vec<f64>) -> Option<Self> {
        let data = match encoding {
            ElementEncoding::UInt8 => MatData::U8(saturate_int!(values, u8)),
            ElementEncoding::Int8 => MatData::I8(saturate_int!(values, i8)),
            ElementEncoding::UInt16 => MatData::U16(saturate_int!(values, u16)),
            ElementEncoding::Int16 => MatData::I16(saturate_int!(values, i16)),
            ElementEncoding::Int32 => MatData::I32(saturate_int!(values, i32)),
            ElementEncoding::Float32 => {
                MatData::F32(values.into_iter().map(|v| v as f32).collect())
            }
            ElementEncoding::Float64 => MatData::F64(values),
            ElementEncoding::Unrecognized => return None,
        };
        Some(data)
    }

    fn zeros(encoding: ElementEncoding, len: usize) -> Option<Self> {
        let data = match encoding {
            ElementEncoding::UInt8 => MatData::U8(vec![0; len]),
            ElementEncoding::Int8 => MatData::I8(vec![0; len]),
            ElementEncoding::UInt16 => MatData::U16(vec![0; len]),
            ElementEncoding::Int16 => MatData::I16(vec![0; len]),
            ElementEncoding::Int32 => MatData::I32(vec![0; len]),
            ElementEncoding::Float32 => MatData::F32(vec![0.0; len]),
            ElementEncoding::Float64 => MatData::F64(vec![0.0; len]),
            ElementEncoding::Unrecognized => return None,
        };
        Some(data)
    }
}

/// Owned row-major buffer with interleaved channels.
///
/// `step` counts elements per row and may exceed `cols * channels` when rows
/// carry padding.
#[derive(Debug, Clone, PartialEq)]
pub struct Mat {
    rows: usize,
    cols: usize,
    channels: u32,
    step: usize,
    data: MatData,
}

/// `rows * cols * channels`, or an error when the product does not fit in `usize`.
pub fn element_count(rows: usize, cols: usize, channels: u32) -> Result<usize> {
    rows.checked_mul(cols)
        .and_then(|n| n.checked_mul(channels as usize))
        .ok_or_else(|| {
            CvToolError::InvalidParameter(format!(
                "Shape {}x{}x{} overflows the address space",
                rows, cols, channels
            ))
        })
}

impl Mat {
    pub fn new(rows: usize, cols: usize, channels: u32, data: MatData) -> Result<Self> {
        let step = element_count(1, cols, channels)?;
        Self::with_step(rows, cols, channels, step, data)
    }

    pub fn with_step(
        rows: usize,
        cols: usize,
        channels: u32,
        step: usize,
        data: MatData,
    ) -> Result<Self> {
        if channels == 0 || channels > CN_MAX as u32 {
            return Err(CvToolError::InvalidParameter(format!(
                "Channel count {} outside 1..={}",
                channels, CN_MAX
            )));
        }

        let row_len = element_count(1, cols, channels)?;
        if step < row_len {
            return Err(CvToolError::InvalidParameter(format!(
                "Row step {} is shorter than a row of {} elements",
                step, row_len
            )));
        }

        let total = rows.checked_mul(step).ok_or_else(|| {
            CvToolError::InvalidParameter(format!(
                "{} rows of step {} overflow the address space",
                rows, step
            ))
        })?;
        if data.len() != total {
            return Err(CvToolError::InvalidParameter(format!(
                "Expected {} elements for {}x{} with step {}, got {}",
                total,
                rows,
                cols,
                step,
                data.len()
            )));
        }

        Ok(Self {
            rows,
            cols,
            channels,
            step,
            data,
        })
    }

    pub fn zeros(rows: usize, cols: usize, channels: u32, encoding: ElementEncoding) -> Result<Self> {
        let data = MatData::zeros(encoding, element_count(rows, cols, channels)?).ok_or_else(|| {
            CvToolError::UnsupportedDepth(format!("Cannot allocate {} elements", encoding.label()))
        })?;
        Self::new(rows, cols, channels, data)
    }

    /// Builds a contiguous Mat from row-major `f64` values, saturating into `encoding`.
    pub fn from_f64(
        rows: usize,
        cols: usize,
        channels: u32,
        encoding: ElementEncoding,
        values: Vec<f64>,
    ) -> Result<Self> {
        let data = MatData::from_f64(encoding, values).ok_or_else(|| {
            CvToolError::UnsupportedDepth(format!("Cannot store {} elements", encoding.label()))
        })?;
        Self::new(rows, cols, channels, data)
    }

    pub fn channels(&self) -> u32 {
        self.channels
    }

    pub fn step(&self) -> usize {
        self.step
    }

    pub fn encoding(&self) -> ElementEncoding {
        self.data.encoding()
    }

    pub fn data(&self) -> &MatData {
        &self.data
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0 || self.cols == 0
    }

    /// Elements in one row, padding excluded.
    pub fn row_len(&self) -> usize {
        self.cols * self.channels as usize
    }

    pub fn get(&self, row: usize, col: usize, channel: u32) -> Option<f64> {
        if row >= self.rows || col >= self.cols || channel >= self.channels {
            return None;
        }
        let index = row * self.step + col * self.channels as usize + channel as usize;
        self.data.get(index)
    }

    /// Row-major values with row padding dropped.
    pub fn to_f64_vec(&self) -> Vec<f64> {
        let row_len = self.row_len();
        let mut values = Vec::with_capacity(self.rows * row_len);
        for row in 0..self.rows {
            let start = row * self.step;
            values.extend((start..start + row_len).filter_map(|i| self.data.get(i)));
        }
        values
    }
}

impl Default for Mat {
    fn default() -> Self {
        Self {
            rows: 0,
            cols: 0,
            channels: 1,
            step: 0,
            data: MatData::U8(Vec::new()),
        }
    }
}

impl PixelBuffer for Mat {
    fn rows(&self) -> usize {
        self.rows
    }

    fn cols(&self) -> usize {
        self.cols
    }

    fn type_code(&self) -> i32 {
        make_type(self.encoding(), self.channels)
    }

    fn is_continuous(&self) -> bool {
        !self.is_empty() && (self.rows == 1 || self.step == self.row_len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::describe;

    #[test]
    fn test_contiguity_follows_row_padding() {
        let packed = Mat::new(2, 3, 1, MatData::U8(vec![0; 6])).unwrap();
        assert!(packed.is_continuous());

        let padded = Mat::with_step(2, 3, 1, 4, MatData::U8(vec![0; 8])).unwrap();
        assert!(!padded.is_continuous());

        let single_row = Mat::with_step(1, 3, 1, 4, MatData::U8(vec![0; 4])).unwrap();
        assert!(single_row.is_continuous());

        assert!(!Mat::default().is_continuous());
    }

    #[test]
    fn test_padding_is_skipped_when_flattening() {
        let padded = Mat::with_step(
            2,
            2,
            1,
            3,
            MatData::I16(vec![1, 2, 99, 3, 4, 99]),
        )
        .unwrap();
        assert_eq!(padded.to_f64_vec(), vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(padded.get(1, 1, 0), Some(4.0));
        assert_eq!(padded.get(1, 2, 0), None);
    }

    #[test]
    fn test_rejects_inconsistent_shapes() {
        assert!(Mat::new(2, 2, 3, MatData::U8(vec![0; 11])).is_err());
        assert!(Mat::new(1, 1, 0, MatData::U8(vec![])).is_err());
        assert!(Mat::with_step(2, 4, 1, 3, MatData::U8(vec![0; 6])).is_err());
    }

    #[test]
    fn test_oversized_shapes_are_rejected() {
        let huge = 1usize << (usize::BITS / 2);
        assert!(element_count(huge, huge, 1).is_err());
        assert!(element_count(usize::MAX, 1, 2).is_err());
        assert_eq!(element_count(2, 3, 4).unwrap(), 24);

        assert!(Mat::new(huge, huge, 1, MatData::U8(vec![])).is_err());
        assert!(Mat::new(1, usize::MAX, 2, MatData::U8(vec![])).is_err());
        assert!(Mat::with_step(huge, 1, 1, huge, MatData::U8(vec![])).is_err());
    }

    #[test]
    fn test_from_f64_saturates() {
        let mat = Mat::from_f64(1, 4, 1, ElementEncoding::UInt8, vec![-5.0, 12.4, 12.6, 300.0])
            .unwrap();
        assert_eq!(mat.data(), &MatData::U8(vec![0, 12, 13, 255]));

        let mat = Mat::from_f64(1, 2, 1, ElementEncoding::Int8, vec![-200.0, f64::NAN]).unwrap();
        assert_eq!(mat.data(), &MatData::I8(vec![-128, 0]));
    }

    #[test]
    fn test_type_code_and_descriptor() {
        let mat = Mat::zeros(4, 5, 3, ElementEncoding::Float32).unwrap();
        assert_eq!(mat.type_code(), 21);

        let descriptor = describe(&mat);
        assert_eq!(descriptor.rows(), 4);
        assert_eq!(descriptor.cols(), 5);
        assert_eq!(descriptor.type_label(), "CV_32FC3");
        assert!(descriptor.is_contiguous());

        let empty = describe(&Mat::default());
        assert_eq!(empty.type_label(), "CV_8UC1");
        assert!(!empty.is_contiguous());
    }
}
