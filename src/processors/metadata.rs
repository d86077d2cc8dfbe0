// cvcli/src/processors/metadata.rs
use crate::core::{CvToolError, Result};
use exif::{Exif, In, Reader, Tag};
use image::DynamicImage;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// EXIF orientation as stored in tag 0x0112.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Normal,
    FlipHorizontal,
    Rotate180,
    FlipVertical,
    Transpose,
    Rotate90,
    Transverse,
    Rotate270,
}

impl Orientation {
    pub fn from_exif(value: u32) -> Option<Self> {
        match value {
            1 => Some(Orientation::Normal),
            2 => Some(Orientation::FlipHorizontal),
            3 => Some(Orientation::Rotate180),
            4 => Some(Orientation::FlipVertical),
            5 => Some(Orientation::Transpose),
            6 => Some(Orientation::Rotate90),
            7 => Some(Orientation::Transverse),
            8 => Some(Orientation::Rotate270),
            _ => None,
        }
    }

    /// Returns `image` turned upright.
    pub fn apply(self, image: DynamicImage) -> DynamicImage {
        match self {
            Orientation::Normal => image,
            Orientation::FlipHorizontal => image.fliph(),
            Orientation::Rotate180 => image.rotate180(),
            Orientation::FlipVertical => image.flipv(),
            Orientation::Transpose => image.rotate90().fliph(),
            Orientation::Rotate90 => image.rotate90(),
            Orientation::Transverse => image.rotate270().fliph(),
            Orientation::Rotate270 => image.rotate270(),
        }
    }
}

pub struct MetadataProcessor;

impl MetadataProcessor {
    pub fn new() -> Self {
        Self
    }

    pub fn read_metadata(&self, path: &Path) -> Result<Option<Exif>> {
        let file = File::open(path)?;
        let mut bufreader = BufReader::new(&file);

        match Reader::new().read_from_container(&mut bufreader) {
            Ok(exif) => {
                log::debug!("Found EXIF data in {}", path.display());
                Ok(Some(exif))
            }
            Err(exif::Error::NotFound(_)) => {
                log::debug!("No EXIF data found in {}", path.display());
                Ok(None)
            }
            Err(exif::Error::Io(e)) => Err(CvToolError::Io(e)),
            Err(e) => {
                // Containers without EXIF support (BMP, GIF, ...) land here.
                log::debug!("Skipping EXIF for {}: {}", path.display(), e);
                Ok(None)
            }
        }
    }

    pub fn orientation(&self, path: &Path) -> Result<Option<Orientation>> {
        let exif = match self.read_metadata(path)? {
            Some(exif) => exif,
            None => return Ok(None),
        };

        let orientation = exif
            .get_field(Tag::Orientation, In::PRIMARY)
            .and_then(|field| field.value.get_uint(0))
            .and_then(Orientation::from_exif);

        if let Some(o) = orientation {
            log::debug!("EXIF orientation of {}: {:?}", path.display(), o);
        }

        Ok(orientation)
    }
}

impl Default for MetadataProcessor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgb, RgbImage};

    fn marked() -> DynamicImage {
        // 3x2, only the top-left pixel is lit
        let mut img = RgbImage::new(3, 2);
        img.put_pixel(0, 0, Rgb([255, 0, 0]));
        DynamicImage::ImageRgb8(img)
    }

    fn lit(image: &DynamicImage) -> (u32, u32) {
        image
            .pixels()
            .find(|(_, _, p)| p.0[0] == 255)
            .map(|(x, y, _)| (x, y))
            .unwrap()
    }

    #[test]
    fn test_orientation_transforms() {
        assert_eq!(lit(&Orientation::Normal.apply(marked())), (0, 0));
        assert_eq!(lit(&Orientation::FlipHorizontal.apply(marked())), (2, 0));
        assert_eq!(lit(&Orientation::Rotate180.apply(marked())), (2, 1));
        assert_eq!(lit(&Orientation::FlipVertical.apply(marked())), (0, 1));

        let transposed = Orientation::Transpose.apply(marked());
        assert_eq!(transposed.dimensions(), (2, 3));
        assert_eq!(lit(&transposed), (0, 0));

        assert_eq!(lit(&Orientation::Rotate90.apply(marked())), (1, 0));
        assert_eq!(lit(&Orientation::Transverse.apply(marked())), (1, 2));
        assert_eq!(lit(&Orientation::Rotate270.apply(marked())), (0, 2));
    }

    #[test]
    fn test_unknown_exif_value() {
        assert_eq!(Orientation::from_exif(0), None);
        assert_eq!(Orientation::from_exif(9), None);
        assert_eq!(Orientation::from_exif(6), Some(Orientation::Rotate90));
    }

    #[test]
    fn test_png_without_exif() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.png");
        marked().save(&path).unwrap();

        let processor = MetadataProcessor::new();
        assert_eq!(processor.orientation(&path).unwrap(), None);
    }
}
