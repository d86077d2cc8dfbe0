mod cli;
mod core;
mod processors;
mod utils;

pub use cli::{BorderArg, Cli, Commands, ImreadFlag};
pub use crate::core::{
    classify, describe, make_type, type_to_string, BlurConfig, BorderType, CvToolError,
    ElementEncoding, ImreadMode, Mat, MatData, PixelBuffer, PixelBufferDescriptor, Result,
    CN_MAX, CN_SHIFT, DEPTH_MASK,
};
pub use processors::{
    format_dt, gaussian_kernel, parse_dt, FileStorage, GaussianBlur, Loader, MetadataProcessor,
    Orientation, StorageFormat,
};
pub use utils::{format_report, get_file_extension, version_string, MAT_NODE};

pub mod prelude {
    pub use crate::{
        describe, BlurConfig, FileStorage, GaussianBlur, ImreadMode, Loader, Mat, PixelBuffer,
    };
}

// Re-export commonly used types
pub use image::DynamicImage;
