// cvcli/src/core/descriptor.rs
//! Shape and element-encoding snapshot of a pixel buffer.
//!
//! A packed type code stores the element depth in its low `CN_SHIFT` bits and
//! `channels - 1` above them. The layout is the image library's convention and is
//! fixed here, not configurable.
use image::{ColorType, DynamicImage};
use std::fmt;

/// Mask selecting the depth bits of a packed type code.
pub const DEPTH_MASK: i32 = 7;
/// Bit offset of the channel component in a packed type code.
pub const CN_SHIFT: i32 = 3;
/// Largest channel count a packed type code can carry.
pub const CN_MAX: i32 = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementEncoding {
    UInt8,
    Int8,
    UInt16,
    Int16,
    Int32,
    Float32,
    Float64,
    Unrecognized,
}

impl ElementEncoding {
    pub fn from_depth_code(depth: i32) -> Self {
        match depth {
            0 => ElementEncoding::UInt8,
            1 => ElementEncoding::Int8,
            2 => ElementEncoding::UInt16,
            3 => ElementEncoding::Int16,
            4 => ElementEncoding::Int32,
            5 => ElementEncoding::Float32,
            6 => ElementEncoding::Float64,
            _ => ElementEncoding::Unrecognized,
        }
    }

    /// Depth code of a recognized encoding. `Unrecognized` has none.
    pub fn depth_code(self) -> Option<i32> {
        match self {
            ElementEncoding::UInt8 => Some(0),
            ElementEncoding::Int8 => Some(1),
            ElementEncoding::UInt16 => Some(2),
            ElementEncoding::Int16 => Some(3),
            ElementEncoding::Int32 => Some(4),
            ElementEncoding::Float32 => Some(5),
            ElementEncoding::Float64 => Some(6),
            ElementEncoding::Unrecognized => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ElementEncoding::UInt8 => "CV_8U",
            ElementEncoding::Int8 => "CV_8S",
            ElementEncoding::UInt16 => "CV_16U",
            ElementEncoding::Int16 => "CV_16S",
            ElementEncoding::Int32 => "CV_32S",
            ElementEncoding::Float32 => "CV_32F",
            ElementEncoding::Float64 => "CV_64F",
            ElementEncoding::Unrecognized => "User",
        }
    }

    /// Size of one channel element in bytes, `None` when unrecognized.
    pub fn elem_size(self) -> Option<usize> {
        match self {
            ElementEncoding::UInt8 | ElementEncoding::Int8 => Some(1),
            ElementEncoding::UInt16 | ElementEncoding::Int16 => Some(2),
            ElementEncoding::Int32 | ElementEncoding::Float32 => Some(4),
            ElementEncoding::Float64 => Some(8),
            ElementEncoding::Unrecognized => None,
        }
    }
}

/// Builds a packed type code. Unrecognized encodings use the first free depth code.
pub fn make_type(encoding: ElementEncoding, channels: u32) -> i32 {
    let depth = encoding.depth_code().unwrap_or(DEPTH_MASK);
    let channels = channels.clamp(1, CN_MAX as u32) as i32;
    depth | ((channels - 1) << CN_SHIFT)
}

fn decompose(type_code: i32) -> (ElementEncoding, u32) {
    let depth = type_code & DEPTH_MASK;
    let channels = 1 + ((type_code >> CN_SHIFT) & (CN_MAX - 1));
    (ElementEncoding::from_depth_code(depth), channels as u32)
}

/// Splits a packed type code into its encoding label and channel count.
///
/// Total over `i32`: depths outside the recognized set map to `"User"`.
pub fn classify(type_code: i32) -> (&'static str, u32) {
    let (encoding, channels) = decompose(type_code);
    (encoding.label(), channels)
}

/// Human-readable form of a packed type code, e.g. `CV_8UC3`.
pub fn type_to_string(type_code: i32) -> String {
    let (label, channels) = classify(type_code);
    format!("{}C{}", label, channels)
}

/// Read-only view of a buffer's shape and encoding.
pub trait PixelBuffer {
    fn rows(&self) -> usize;
    fn cols(&self) -> usize;
    fn type_code(&self) -> i32;
    fn is_continuous(&self) -> bool;
}

impl PixelBuffer for DynamicImage {
    fn rows(&self) -> usize {
        self.height() as usize
    }

    fn cols(&self) -> usize {
        self.width() as usize
    }

    fn type_code(&self) -> i32 {
        let color = self.color();
        let encoding = match color {
            ColorType::L8 | ColorType::La8 | ColorType::Rgb8 | ColorType::Rgba8 => {
                ElementEncoding::UInt8
            }
            ColorType::L16 | ColorType::La16 | ColorType::Rgb16 | ColorType::Rgba16 => {
                ElementEncoding::UInt16
            }
            ColorType::Rgb32F | ColorType::Rgba32F => ElementEncoding::Float32,
            _ => ElementEncoding::Unrecognized,
        };
        make_type(encoding, u32::from(color.channel_count()))
    }

    fn is_continuous(&self) -> bool {
        self.width() > 0 && self.height() > 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelBufferDescriptor {
    rows: usize,
    cols: usize,
    encoding: ElementEncoding,
    channels: u32,
    is_contiguous: bool,
}

/// Snapshots `buffer`; the buffer itself is left untouched.
pub fn describe<B: PixelBuffer + ?Sized>(buffer: &B) -> PixelBufferDescriptor {
    let (encoding, channels) = decompose(buffer.type_code());
    PixelBufferDescriptor {
        rows: buffer.rows(),
        cols: buffer.cols(),
        encoding,
        channels,
        is_contiguous: buffer.is_continuous(),
    }
}

impl PixelBufferDescriptor {
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn encoding(&self) -> ElementEncoding {
        self.encoding
    }

    pub fn channel_count(&self) -> u32 {
        self.channels
    }

    pub fn is_contiguous(&self) -> bool {
        self.is_contiguous
    }

    pub fn encoding_label(&self) -> &'static str {
        self.encoding.label()
    }

    pub fn type_label(&self) -> String {
        format!("{}C{}", self.encoding.label(), self.channels)
    }
}

impl fmt::Display for PixelBufferDescriptor {
    /// The verbose report shared by every tool. `isContinous` is spelled the way
    /// existing consumers parse it.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "rows = {}", self.rows)?;
        writeln!(f, "cols = {}", self.cols)?;
        writeln!(f, "channels = {}", self.channels)?;
        writeln!(f, "type = {}", self.type_label())?;
        write!(f, "isContinous = {}", self.is_contiguous)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeBuffer {
        rows: usize,
        cols: usize,
        type_code: i32,
        continuous: bool,
    }

    impl PixelBuffer for FakeBuffer {
        fn rows(&self) -> usize {
            self.rows
        }
        fn cols(&self) -> usize {
            self.cols
        }
        fn type_code(&self) -> i32 {
            self.type_code
        }
        fn is_continuous(&self) -> bool {
            self.continuous
        }
    }

    #[test]
    fn test_classify_recognized_depths() {
        let expected = [
            "CV_8U", "CV_8S", "CV_16U", "CV_16S", "CV_32S", "CV_32F", "CV_64F",
        ];
        for (depth, label) in expected.iter().enumerate() {
            assert_eq!(classify(depth as i32), (*label, 1));
        }
    }

    #[test]
    fn test_classify_scenarios() {
        let u8c1 = make_type(ElementEncoding::UInt8, 1);
        assert_eq!(classify(u8c1), ("CV_8U", 1));
        assert_eq!(type_to_string(u8c1), "CV_8UC1");

        let f32c3 = make_type(ElementEncoding::Float32, 3);
        assert_eq!(f32c3, 21);
        assert_eq!(classify(f32c3), ("CV_32F", 3));
        assert_eq!(type_to_string(f32c3), "CV_32FC3");

        let user_c4 = 7 | (3 << CN_SHIFT);
        assert_eq!(classify(user_c4), ("User", 4));
        assert_eq!(type_to_string(user_c4), "UserC4");
    }

    #[test]
    fn test_channel_suffix_is_plain_decimal() {
        assert_eq!(type_to_string(make_type(ElementEncoding::UInt16, 10)), "CV_16UC10");
        assert_eq!(type_to_string(make_type(ElementEncoding::Float64, 512)), "CV_64FC512");
    }

    #[test]
    fn test_classify_is_total_and_stable() {
        for code in [i32::MIN, -1, -8, 7, 4095, 4096, i32::MAX] {
            let first = classify(code);
            assert_eq!(first, classify(code));
            assert!(!first.0.is_empty());
            assert!(first.1 >= 1);
        }
        assert_eq!(classify(-1), ("User", 512));
    }

    #[test]
    fn test_describe_empty_buffer() {
        let empty = FakeBuffer {
            rows: 0,
            cols: 0,
            type_code: make_type(ElementEncoding::Int16, 2),
            continuous: false,
        };
        let descriptor = describe(&empty);
        assert_eq!(descriptor.rows(), 0);
        assert_eq!(descriptor.encoding(), ElementEncoding::Int16);
        assert_eq!(descriptor.channel_count(), 2);
        assert_eq!(descriptor.type_label(), "CV_16SC2");
    }

    #[test]
    fn test_report_layout() {
        let buffer = FakeBuffer {
            rows: 480,
            cols: 640,
            type_code: make_type(ElementEncoding::UInt8, 3),
            continuous: true,
        };
        assert_eq!(
            describe(&buffer).to_string(),
            "rows = 480\ncols = 640\nchannels = 3\ntype = CV_8UC3\nisContinous = true"
        );

        let strided = FakeBuffer {
            rows: 4,
            cols: 3,
            type_code: make_type(ElementEncoding::Float32, 1),
            continuous: false,
        };
        assert_eq!(
            describe(&strided).to_string(),
            "rows = 4\ncols = 3\nchannels = 1\ntype = CV_32FC1\nisContinous = false"
        );
    }

    #[test]
    fn test_describe_dynamic_image() {
        let image = DynamicImage::new_rgba16(4, 2);
        let descriptor = describe(&image);
        assert_eq!((descriptor.rows(), descriptor.cols()), (2, 4));
        assert_eq!(descriptor.type_label(), "CV_16UC4");
        assert!(descriptor.is_contiguous());
    }
}
