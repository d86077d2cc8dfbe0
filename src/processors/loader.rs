// cvcli/src/processors/loader.rs
use crate::core::{CvToolError, ElementEncoding, ImreadMode, Mat, MatData, Result};
use crate::processors::MetadataProcessor;
use image::{imageops::FilterType, DynamicImage, GenericImageView, ImageReader};
use std::path::Path;

/// Decodes image files into BGR-ordered `Mat`s according to an `ImreadMode`.
#[derive(Clone)]
pub struct Loader {
    max_dimensions: Option<(u32, u32)>,
}

impl Loader {
    pub fn new() -> Self {
        Self {
            max_dimensions: Some((100_000, 100_000)),
        }
    }

    /// Like `imread`, but a file that cannot be read yields an empty `Mat`.
    pub fn imread_or_empty(&self, path: &Path, mode: ImreadMode) -> Mat {
        self.imread(path, mode).unwrap_or_else(|e| {
            log::warn!("Failed to read {}: {}", path.display(), e);
            Mat::default()
        })
    }

    pub fn imread(&self, path: &Path, mode: ImreadMode) -> Result<Mat> {
        log::debug!("Reading {} with flags {}", path.display(), mode.name());

        if mode.uses_gdal() {
            return Err(CvToolError::UnsupportedFormat(
                "GDAL raster loading is not available".to_string(),
            ));
        }

        let mut image = self.load(path)?;

        if mode.applies_orientation() {
            if let Some(orientation) = MetadataProcessor::new().orientation(path)? {
                image = orientation.apply(image);
            }
        }

        let denominator = mode.scale_denominator();
        if denominator > 1 {
            let (width, height) = image.dimensions();
            let width = (width / denominator).max(1);
            let height = (height / denominator).max(1);
            log::debug!("Reducing to {}x{}", width, height);
            image = image.resize_exact(width, height, FilterType::Triangle);
        }

        let mat = convert(&image, mode)?;
        log::info!(
            "Loaded image: {}x{} pixels, {} channel(s) of {}",
            image.width(),
            image.height(),
            mat.channels(),
            mat.encoding().label()
        );

        Ok(mat)
    }

    pub fn load(&self, path: &Path) -> Result<DynamicImage> {
        self.validate_path(path)?;

        let image = ImageReader::open(path)?.with_guessed_format()?.decode()?;

        if let Some((max_w, max_h)) = self.max_dimensions {
            let (width, height) = image.dimensions();
            if width > max_w || height > max_h {
                return Err(CvToolError::InvalidParameter(format!(
                    "Image dimensions {}x{} exceed maximum {}x{}",
                    width, height, max_w, max_h
                )));
            }
        }

        Ok(image)
    }

    fn validate_path(&self, path: &Path) -> Result<()> {
        if !path.exists() {
            return Err(CvToolError::InvalidParameter(format!(
                "File does not exist: {}",
                path.display()
            )));
        }

        let metadata = path.metadata()?;
        if metadata.len() == 0 {
            return Err(CvToolError::InvalidParameter(format!(
                "File is empty: {}",
                path.display()
            )));
        }

        Ok(())
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

fn native_encoding(image: &DynamicImage) -> ElementEncoding {
    match image {
        DynamicImage::ImageLuma16(_)
        | DynamicImage::ImageLumaA16(_)
        | DynamicImage::ImageRgb16(_)
        | DynamicImage::ImageRgba16(_) => ElementEncoding::UInt16,
        DynamicImage::ImageRgb32F(_) | DynamicImage::ImageRgba32F(_) => ElementEncoding::Float32,
        _ => ElementEncoding::UInt8,
    }
}

/// Swaps the first and third channel of every pixel (RGB <-> BGR).
fn swap_red_blue<T>(mut data: Vec<T>, channels: usize) -> Vec<T> {
    if channels >= 3 {
        data.chunks_exact_mut(channels).for_each(|px| px.swap(0, 2));
    }
    data
}

fn build(image: &DynamicImage, channels: u32, data: MatData) -> Result<Mat> {
    Mat::new(image.height() as usize, image.width() as usize, channels, data)
}

fn convert(image: &DynamicImage, mode: ImreadMode) -> Result<Mat> {
    if mode.is_unchanged() {
        return convert_unchanged(image);
    }

    let has_color = image.color().has_color();
    let channels = if mode.wants_color() || (mode.keeps_color() && has_color) {
        3
    } else {
        1
    };
    let encoding = if mode.keeps_depth() {
        native_encoding(image)
    } else {
        ElementEncoding::UInt8
    };

    let data = match (encoding, channels) {
        (ElementEncoding::UInt16, 1) => MatData::U16(image.to_luma16().into_raw()),
        (ElementEncoding::UInt16, _) => MatData::U16(swap_red_blue(image.to_rgb16().into_raw(), 3)),
        (ElementEncoding::Float32, 1) => MatData::F32(image.to_luma32f().into_raw()),
        (ElementEncoding::Float32, _) => {
            MatData::F32(swap_red_blue(image.to_rgb32f().into_raw(), 3))
        }
        (_, 1) => MatData::U8(image.to_luma8().into_raw()),
        (_, _) => MatData::U8(swap_red_blue(image.to_rgb8().into_raw(), 3)),
    };

    build(image, channels, data)
}

fn convert_unchanged(image: &DynamicImage) -> Result<Mat> {
    let channels = u32::from(image.color().channel_count());
    let n = channels as usize;

    // Gray with alpha has no two-channel layout here; it widens to BGRA.
    let data = match image {
        DynamicImage::ImageLuma8(buf) => MatData::U8(buf.as_raw().clone()),
        DynamicImage::ImageLumaA8(_) => {
            return build(image, 4, MatData::U8(image.to_rgba8().into_raw()));
        }
        DynamicImage::ImageRgb8(buf) => MatData::U8(swap_red_blue(buf.as_raw().clone(), n)),
        DynamicImage::ImageRgba8(buf) => MatData::U8(swap_red_blue(buf.as_raw().clone(), n)),
        DynamicImage::ImageLuma16(buf) => MatData::U16(buf.as_raw().clone()),
        DynamicImage::ImageLumaA16(_) => {
            return build(image, 4, MatData::U16(image.to_rgba16().into_raw()));
        }
        DynamicImage::ImageRgb16(buf) => MatData::U16(swap_red_blue(buf.as_raw().clone(), n)),
        DynamicImage::ImageRgba16(buf) => MatData::U16(swap_red_blue(buf.as_raw().clone(), n)),
        DynamicImage::ImageRgb32F(buf) => MatData::F32(swap_red_blue(buf.as_raw().clone(), n)),
        DynamicImage::ImageRgba32F(buf) => MatData::F32(swap_red_blue(buf.as_raw().clone(), n)),
        other => {
            return build(other, 4, MatData::U8(swap_red_blue(other.to_rgba8().into_raw(), 4)));
        }
    };

    build(image, channels, data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{describe, PixelBuffer};
    use image::{ImageBuffer, Luma, LumaA, Rgb, RgbImage, Rgba, RgbaImage};
    use tempfile::TempDir;

    fn write_rgb(dir: &TempDir, name: &str, width: u32, height: u32) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let img = RgbImage::from_pixel(width, height, Rgb([10, 20, 30]));
        img.save(&path).unwrap();
        path
    }

    #[test]
    fn test_color_is_bgr() {
        let dir = TempDir::new().unwrap();
        let path = write_rgb(&dir, "rgb.png", 4, 3);

        let mat = Loader::new().imread(&path, ImreadMode::Color).unwrap();
        assert_eq!((mat.rows(), mat.cols()), (3, 4));
        assert_eq!(describe(&mat).type_label(), "CV_8UC3");
        assert_eq!(mat.get(0, 0, 0), Some(30.0));
        assert_eq!(mat.get(0, 0, 2), Some(10.0));
        assert!(mat.is_continuous());
    }

    #[test]
    fn test_grayscale_and_anycolor() {
        let dir = TempDir::new().unwrap();
        let path = write_rgb(&dir, "rgb.png", 2, 2);
        let loader = Loader::new();

        let gray = loader.imread(&path, ImreadMode::Grayscale).unwrap();
        assert_eq!(describe(&gray).type_label(), "CV_8UC1");

        let any = loader.imread(&path, ImreadMode::AnyColor).unwrap();
        assert_eq!(any.channels(), 3);

        let gray_path = dir.path().join("gray.png");
        ImageBuffer::<Luma<u8>, _>::from_pixel(2, 2, Luma([7u8]))
            .save(&gray_path)
            .unwrap();
        let any_gray = loader.imread(&gray_path, ImreadMode::AnyColor).unwrap();
        assert_eq!(any_gray.channels(), 1);
    }

    #[test]
    fn test_unchanged_keeps_alpha_and_depth() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rgba.png");
        RgbaImage::from_pixel(2, 1, Rgba([1, 2, 3, 4])).save(&path).unwrap();

        let mat = Loader::new().imread(&path, ImreadMode::Unchanged).unwrap();
        assert_eq!(describe(&mat).type_label(), "CV_8UC4");
        assert_eq!(mat.get(0, 1, 0), Some(3.0));
        assert_eq!(mat.get(0, 1, 3), Some(4.0));

        let deep = dir.path().join("deep.png");
        ImageBuffer::<Luma<u16>, _>::from_pixel(3, 3, Luma([40_000u16]))
            .save(&deep)
            .unwrap();
        let loader = Loader::new();
        assert_eq!(
            describe(&loader.imread(&deep, ImreadMode::Unchanged).unwrap()).type_label(),
            "CV_16UC1"
        );
        let any_depth = loader.imread(&deep, ImreadMode::AnyDepth).unwrap();
        assert_eq!(describe(&any_depth).type_label(), "CV_16UC1");
        assert_eq!(any_depth.get(1, 1, 0), Some(40_000.0));
        assert_eq!(
            describe(&loader.imread(&deep, ImreadMode::Grayscale).unwrap()).type_label(),
            "CV_8UC1"
        );
    }

    #[test]
    fn test_reduced_modes_shrink() {
        let dir = TempDir::new().unwrap();
        let path = write_rgb(&dir, "big.png", 17, 9);
        let loader = Loader::new();

        let half = loader.imread(&path, ImreadMode::ReducedColor2).unwrap();
        assert_eq!((half.rows(), half.cols(), half.channels()), (4, 8, 3));

        let eighth = loader.imread(&path, ImreadMode::ReducedGrayscale8).unwrap();
        assert_eq!((eighth.rows(), eighth.cols(), eighth.channels()), (1, 2, 1));
    }

    #[test]
    fn test_failures() {
        let dir = TempDir::new().unwrap();
        let loader = Loader::new();

        assert!(loader
            .imread(&dir.path().join("missing.png"), ImreadMode::Color)
            .is_err());

        let path = write_rgb(&dir, "ok.png", 2, 2);
        assert!(matches!(
            loader.imread(&path, ImreadMode::LoadGdal),
            Err(CvToolError::UnsupportedFormat(_))
        ));

        let junk = dir.path().join("junk.png");
        std::fs::write(&junk, b"not an image").unwrap();
        assert!(loader.imread(&junk, ImreadMode::Color).is_err());

        let empty = loader.imread_or_empty(&junk, ImreadMode::Color);
        assert!(empty.is_empty());
        assert_eq!(describe(&empty).type_label(), "CV_8UC1");
        assert!(loader
            .imread_or_empty(&dir.path().join("missing.png"), ImreadMode::Unchanged)
            .is_empty());
        assert!(!loader.imread_or_empty(&path, ImreadMode::Color).is_empty());
    }

    #[test]
    fn test_unchanged_gray_alpha_widens_to_bgra() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gray_alpha.png");
        let img: ImageBuffer<LumaA<u8>, Vec<u8>> =
            ImageBuffer::from_pixel(3, 2, LumaA([70, 128]));
        img.save(&path).unwrap();

        let mat = Loader::new().imread(&path, ImreadMode::Unchanged).unwrap();
        assert_eq!(describe(&mat).type_label(), "CV_8UC4");
        assert_eq!((mat.rows(), mat.cols(), mat.channels()), (2, 3, 4));
        assert_eq!(mat.to_f64_vec()[..4], [70.0, 70.0, 70.0, 128.0]);

        let path16 = dir.path().join("gray_alpha16.png");
        let img16: ImageBuffer<LumaA<u16>, Vec<u16>> =
            ImageBuffer::from_pixel(2, 2, LumaA([1000, 65535]));
        img16.save(&path16).unwrap();

        let mat16 = Loader::new().imread(&path16, ImreadMode::Unchanged).unwrap();
        assert_eq!(describe(&mat16).type_label(), "CV_16UC4");
        assert_eq!(mat16.get(1, 1, 3), Some(65535.0));
        assert_eq!(mat16.get(0, 0, 0), Some(1000.0));
    }
}
