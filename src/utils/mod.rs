// cvcli/src/utils/mod.rs
use crate::core::{describe, PixelBuffer};
use std::path::Path;

/// Node name under which every tool stores and looks up its matrix.
pub const MAT_NODE: &str = "mat";

pub fn get_file_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|s| s.to_lowercase())
}

/// Header line followed by the five-line buffer report.
pub fn format_report<B: PixelBuffer + ?Sized>(header: &str, buffer: &B) -> String {
    format!("[INFO] {}:\n{}", header, describe(buffer))
}

/// Library version, as printed by the `version` tool.
pub fn version_string() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ElementEncoding, Mat, MatData};

    #[test]
    fn test_extension_is_lowercased() {
        assert_eq!(get_file_extension(Path::new("out.XML")), Some("xml".to_string()));
        assert_eq!(get_file_extension(Path::new("out")), None);
    }

    #[test]
    fn test_report_has_header() {
        let mat = Mat::zeros(2, 3, 1, ElementEncoding::Float64).unwrap();
        let report = format_report("Blurred image", &mat);
        assert_eq!(
            report,
            "[INFO] Blurred image:\nrows = 2\ncols = 3\nchannels = 1\ntype = CV_64FC1\nisContinous = true"
        );

        let padded = Mat::with_step(2, 2, 2, 6, MatData::U16(vec![0; 12])).unwrap();
        assert_eq!(
            format_report("Loaded the data", &padded),
            "[INFO] Loaded the data:\nrows = 2\ncols = 2\nchannels = 2\ntype = CV_16UC2\nisContinous = false"
        );

        assert_eq!(
            format_report("Loaded the image", &Mat::default()),
            "[INFO] Loaded the image:\nrows = 0\ncols = 0\nchannels = 1\ntype = CV_8UC1\nisContinous = false"
        );
    }

    #[test]
    fn test_version_string() {
        assert!(!version_string().is_empty());
        assert_eq!(version_string().split('.').count(), 3);
    }
}
