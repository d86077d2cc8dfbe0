use crate::core::{BlurConfig, BorderType, ImreadMode};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "cvcli", about = "Decode, blur and inspect typed pixel buffers")]
pub struct Cli {
    /// Verbose mode: print the buffer report and debug logs
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Loads an image from a file
    Imread {
        /// Name of file to be loaded
        filename: PathBuf,

        /// Mode of imread
        #[arg(long, value_enum, default_value_t = ImreadFlag::Color)]
        flags: ImreadFlag,

        #[command(flatten)]
        storage: StorageArgs,
    },

    /// Blurs an image using a Gaussian filter
    #[command(alias = "GaussianBlur")]
    GaussianBlur {
        /// Name of the file to read the data from
        filename: PathBuf,

        /// Width of Gaussian kernel size
        #[arg(long = "ksizeW", default_value_t = 0, allow_negative_numbers = true)]
        ksize_w: i32,

        /// Height of Gaussian kernel size
        #[arg(long = "ksizeH", default_value_t = 0, allow_negative_numbers = true)]
        ksize_h: i32,

        /// Gaussian kernel standard deviation in X direction
        #[arg(long = "sigmaX", default_value_t = 0.0, allow_negative_numbers = true)]
        sigma_x: f64,

        /// Gaussian kernel standard deviation in Y direction
        #[arg(long = "sigmaY", default_value_t = 0.0, allow_negative_numbers = true)]
        sigma_y: f64,

        /// Pixel extrapolation method
        #[arg(long = "borderType", value_enum, default_value_t = BorderArg::Default)]
        border_type: BorderArg,

        #[command(flatten)]
        storage: StorageArgs,
    },

    /// Loads data from a file storage
    Fsread {
        /// Name of the file to read the data from
        filename: PathBuf,
    },

    /// Prints the library version string
    Version,
}

#[derive(Args, Debug, Clone)]
pub struct StorageArgs {
    /// Write data to the specified XML/JSON file
    #[arg(long)]
    pub filestorage: Option<PathBuf>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImreadFlag {
    Unchanged,
    Grayscale,
    Color,
    Anydepth,
    Anycolor,
    #[value(name = "load_gdal")]
    LoadGdal,
    #[value(name = "reduced_grayscale_2")]
    ReducedGrayscale2,
    #[value(name = "reduced_grayscale_4")]
    ReducedGrayscale4,
    #[value(name = "reduced_grayscale_8")]
    ReducedGrayscale8,
    #[value(name = "reduced_color_2")]
    ReducedColor2,
    #[value(name = "reduced_color_4")]
    ReducedColor4,
    #[value(name = "reduced_color_8")]
    ReducedColor8,
    #[value(name = "ignore_orientation")]
    IgnoreOrientation,
}

impl From<ImreadFlag> for ImreadMode {
    fn from(flag: ImreadFlag) -> Self {
        match flag {
            ImreadFlag::Unchanged => ImreadMode::Unchanged,
            ImreadFlag::Grayscale => ImreadMode::Grayscale,
            ImreadFlag::Color => ImreadMode::Color,
            ImreadFlag::Anydepth => ImreadMode::AnyDepth,
            ImreadFlag::Anycolor => ImreadMode::AnyColor,
            ImreadFlag::LoadGdal => ImreadMode::LoadGdal,
            ImreadFlag::ReducedGrayscale2 => ImreadMode::ReducedGrayscale2,
            ImreadFlag::ReducedGrayscale4 => ImreadMode::ReducedGrayscale4,
            ImreadFlag::ReducedGrayscale8 => ImreadMode::ReducedGrayscale8,
            ImreadFlag::ReducedColor2 => ImreadMode::ReducedColor2,
            ImreadFlag::ReducedColor4 => ImreadMode::ReducedColor4,
            ImreadFlag::ReducedColor8 => ImreadMode::ReducedColor8,
            ImreadFlag::IgnoreOrientation => ImreadMode::IgnoreOrientation,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum BorderArg {
    /// reflect101
    Default,
    /// iiiiii|abcdefgh|iiiiiii with some specified i
    Constant,
    /// aaaaaa|abcdefgh|hhhhhhh
    Replicate,
    /// fedcba|abcdefgh|hgfedcb
    Reflect,
    /// gfedcb|abcdefgh|gfedcba
    #[value(name = "reflect101")]
    Reflect101,
    /// uvwxyz|abcdefgh|ijklmno
    Transparent,
    /// do not look outside of ROI
    Isolated,
}

impl From<BorderArg> for BorderType {
    fn from(arg: BorderArg) -> Self {
        match arg {
            BorderArg::Default => BorderType::Default,
            BorderArg::Constant => BorderType::Constant,
            BorderArg::Replicate => BorderType::Replicate,
            BorderArg::Reflect => BorderType::Reflect,
            BorderArg::Reflect101 => BorderType::Reflect101,
            BorderArg::Transparent => BorderType::Transparent,
            BorderArg::Isolated => BorderType::Isolated,
        }
    }
}

impl Commands {
    /// Blur parameters of a `gaussian-blur` invocation.
    pub fn blur_config(&self) -> Option<BlurConfig> {
        match self {
            Commands::GaussianBlur {
                ksize_w,
                ksize_h,
                sigma_x,
                sigma_y,
                border_type,
                ..
            } => Some(BlurConfig {
                ksize_w: *ksize_w,
                ksize_h: *ksize_h,
                sigma_x: *sigma_x,
                sigma_y: *sigma_y,
                border: (*border_type).into(),
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_imread() {
        let cli = Cli::parse_from(["cvcli", "-v", "imread", "a.png", "--flags", "reduced_color_4"]);
        assert!(cli.verbose);
        match cli.command {
            Commands::Imread { flags, storage, .. } => {
                assert_eq!(ImreadMode::from(flags), ImreadMode::ReducedColor4);
                assert!(storage.filestorage.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_gaussian_blur() {
        let cli = Cli::parse_from([
            "cvcli",
            "GaussianBlur",
            "in.json",
            "--ksizeW",
            "5",
            "--ksizeH",
            "3",
            "--sigmaX",
            "1.5",
            "--borderType",
            "reflect101",
            "--filestorage",
            "out.xml",
        ]);
        let config = cli.command.blur_config().unwrap();
        assert_eq!((config.ksize_w, config.ksize_h), (5, 3));
        assert_eq!(config.sigma_y, 0.0);
        assert_eq!(config.border, BorderType::Reflect101);
    }

    #[test]
    fn test_negative_kernel_reaches_validation() {
        let cli = Cli::parse_from(["cvcli", "gaussian-blur", "in.json", "--ksizeW=-3", "--ksizeH", "3"]);
        assert!(cli.command.blur_config().unwrap().validate().is_err());
    }

    #[test]
    fn test_unknown_flag_is_rejected() {
        assert!(Cli::try_parse_from(["cvcli", "imread", "a.png", "--flags", "sepia"]).is_err());
        assert!(Cli::try_parse_from(["cvcli", "fsread"]).is_err());
    }
}
