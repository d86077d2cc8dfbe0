// cvcli/src/core/mod.rs
pub mod descriptor;
pub mod mat;

pub use descriptor::{
    classify, describe, make_type, type_to_string, ElementEncoding, PixelBuffer,
    PixelBufferDescriptor, CN_MAX, CN_SHIFT, DEPTH_MASK,
};
pub use mat::{element_count, Mat, MatData};

use thiserror::Error;

/// Decoding modes accepted by `imread`, one per named flag of the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImreadMode {
    Unchanged,
    Grayscale,
    Color,
    AnyDepth,
    AnyColor,
    LoadGdal,
    ReducedGrayscale2,
    ReducedGrayscale4,
    ReducedGrayscale8,
    ReducedColor2,
    ReducedColor4,
    ReducedColor8,
    IgnoreOrientation,
}

const FLAG_COLOR: i32 = 1;
const FLAG_ANYDEPTH: i32 = 2;
const FLAG_ANYCOLOR: i32 = 4;
const FLAG_LOAD_GDAL: i32 = 8;
const FLAG_REDUCED_2: i32 = 16;
const FLAG_REDUCED_4: i32 = 32;
const FLAG_REDUCED_8: i32 = 64;
const FLAG_IGNORE_ORIENTATION: i32 = 128;

impl ImreadMode {
    /// Numeric flag word, bit-compatible with the image library's imread modes.
    pub fn flags(self) -> i32 {
        match self {
            ImreadMode::Unchanged => -1,
            ImreadMode::Grayscale => 0,
            ImreadMode::Color => FLAG_COLOR,
            ImreadMode::AnyDepth => FLAG_ANYDEPTH,
            ImreadMode::AnyColor => FLAG_ANYCOLOR,
            ImreadMode::LoadGdal => FLAG_LOAD_GDAL,
            ImreadMode::ReducedGrayscale2 => FLAG_REDUCED_2,
            ImreadMode::ReducedGrayscale4 => FLAG_REDUCED_4,
            ImreadMode::ReducedGrayscale8 => FLAG_REDUCED_8,
            ImreadMode::ReducedColor2 => FLAG_REDUCED_2 | FLAG_COLOR,
            ImreadMode::ReducedColor4 => FLAG_REDUCED_4 | FLAG_COLOR,
            ImreadMode::ReducedColor8 => FLAG_REDUCED_8 | FLAG_COLOR,
            ImreadMode::IgnoreOrientation => FLAG_IGNORE_ORIENTATION,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ImreadMode::Unchanged => "unchanged",
            ImreadMode::Grayscale => "grayscale",
            ImreadMode::Color => "color",
            ImreadMode::AnyDepth => "anydepth",
            ImreadMode::AnyColor => "anycolor",
            ImreadMode::LoadGdal => "load_gdal",
            ImreadMode::ReducedGrayscale2 => "reduced_grayscale_2",
            ImreadMode::ReducedGrayscale4 => "reduced_grayscale_4",
            ImreadMode::ReducedGrayscale8 => "reduced_grayscale_8",
            ImreadMode::ReducedColor2 => "reduced_color_2",
            ImreadMode::ReducedColor4 => "reduced_color_4",
            ImreadMode::ReducedColor8 => "reduced_color_8",
            ImreadMode::IgnoreOrientation => "ignore_orientation",
        }
    }

    pub fn is_unchanged(self) -> bool {
        self.flags() < 0
    }

    pub fn wants_color(self) -> bool {
        !self.is_unchanged() && self.flags() & FLAG_COLOR != 0
    }

    pub fn keeps_depth(self) -> bool {
        !self.is_unchanged() && self.flags() & FLAG_ANYDEPTH != 0
    }

    pub fn keeps_color(self) -> bool {
        !self.is_unchanged() && self.flags() & FLAG_ANYCOLOR != 0
    }

    pub fn uses_gdal(self) -> bool {
        !self.is_unchanged() && self.flags() & FLAG_LOAD_GDAL != 0
    }

    /// Downscale denominator for the `reduced_*` modes.
    pub fn scale_denominator(self) -> u32 {
        let flags = self.flags();
        if flags < 0 {
            1
        } else if flags & FLAG_REDUCED_8 != 0 {
            8
        } else if flags & FLAG_REDUCED_4 != 0 {
            4
        } else if flags & FLAG_REDUCED_2 != 0 {
            2
        } else {
            1
        }
    }

    pub fn applies_orientation(self) -> bool {
        !self.is_unchanged() && self.flags() & FLAG_IGNORE_ORIENTATION == 0
    }
}

impl Default for ImreadMode {
    fn default() -> Self {
        ImreadMode::Color
    }
}

/// Pixel extrapolation method used past the buffer edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorderType {
    /// Same as `Reflect101`.
    Default,
    /// `iiiiii|abcdefgh|iiiiiii`, with `i` fixed at zero.
    Constant,
    /// `aaaaaa|abcdefgh|hhhhhhh`
    Replicate,
    /// `fedcba|abcdefgh|hgfedcb`
    Reflect,
    /// `gfedcb|abcdefgh|gfedcba`
    Reflect101,
    /// `uvwxyz|abcdefgh|ijklmno`
    Transparent,
    /// Do not look outside of the region of interest. A whole buffer has no
    /// surroundings, so pixels past the edges read as zero like `Constant`.
    Isolated,
}

impl BorderType {
    pub fn name(self) -> &'static str {
        match self {
            BorderType::Default => "default",
            BorderType::Constant => "constant",
            BorderType::Replicate => "replicate",
            BorderType::Reflect => "reflect",
            BorderType::Reflect101 => "reflect101",
            BorderType::Transparent => "transparent",
            BorderType::Isolated => "isolated",
        }
    }
}

impl Default for BorderType {
    fn default() -> Self {
        BorderType::Default
    }
}

#[derive(Debug, Clone)]
pub struct BlurConfig {
    pub ksize_w: i32,
    pub ksize_h: i32,
    pub sigma_x: f64,
    pub sigma_y: f64,
    pub border: BorderType,
}

impl Default for BlurConfig {
    fn default() -> Self {
        Self {
            ksize_w: 3,
            ksize_h: 3,
            sigma_x: 0.0,
            sigma_y: 0.0,
            border: BorderType::Default,
        }
    }
}

impl BlurConfig {
    pub fn validate(&self) -> Result<()> {
        let (w, h) = (self.ksize_w, self.ksize_h);

        if w == 0 && h == 0 {
            return Err(CvToolError::InvalidParameter(
                "Both ksizeW and ksizeH are zeros".to_string(),
            ));
        }

        if w == 0 || h == 0 {
            return Err(CvToolError::InvalidParameter(
                "Either ksizeW or ksizeH is zero".to_string(),
            ));
        }

        if w < 0 || h < 0 {
            return Err(CvToolError::InvalidParameter(
                "Either ksizeW or ksizeH is negative".to_string(),
            ));
        }

        if w % 2 == 0 || h % 2 == 0 {
            return Err(CvToolError::InvalidParameter(
                "Either ksizeW or ksizeH is not odd".to_string(),
            ));
        }

        if !self.sigma_x.is_finite() || !self.sigma_y.is_finite() {
            return Err(CvToolError::InvalidParameter(
                "sigmaX and sigmaY must be finite".to_string(),
            ));
        }

        Ok(())
    }
}

#[derive(Error, Debug)]
pub enum CvToolError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Unsupported depth: {0}")]
    UnsupportedDepth(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

pub type Result<T> = std::result::Result<T, CvToolError>;
