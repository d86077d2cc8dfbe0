use anyhow::{Context, Result};
use clap::Parser;
use cvcli::{
    format_report, version_string, Cli, Commands, FileStorage, GaussianBlur, ImreadFlag, Loader,
    MAT_NODE,
};
use log::LevelFilter;
use std::path::{Path, PathBuf};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logger
    env_logger::Builder::new()
        .filter_level(if cli.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        })
        .init();

    let blur_config = cli.command.blur_config();

    match cli.command {
        Commands::Imread {
            filename,
            flags,
            storage,
        } => {
            process_imread(&filename, flags, storage.filestorage.as_deref(), cli.verbose)?;
        }
        Commands::GaussianBlur {
            filename, storage, ..
        } => {
            let config = blur_config.context("missing blur parameters")?;
            let filter = GaussianBlur::new(config)?;
            process_gaussian_blur(&filename, &filter, storage.filestorage, cli.verbose)?;
        }
        Commands::Fsread { filename } => {
            process_fsread(&filename, cli.verbose)?;
        }
        Commands::Version => {
            print!("{}", version_string());
        }
    }

    Ok(())
}

fn process_imread(
    filename: &Path,
    flags: ImreadFlag,
    filestorage: Option<&Path>,
    verbose: bool,
) -> Result<()> {
    let image = Loader::new().imread_or_empty(filename, flags.into());

    if image.is_empty() {
        println!("[WARN] imread returns an empty matrix.");
    }

    if let Some(path) = filestorage {
        FileStorage::new(path)?.write(MAT_NODE, &image)?;
    }

    if verbose {
        println!("{}", format_report("Loaded the image", &image));
    }

    Ok(())
}

fn process_gaussian_blur(
    filename: &Path,
    filter: &GaussianBlur,
    filestorage: Option<PathBuf>,
    verbose: bool,
) -> Result<()> {
    let src = FileStorage::new(filename)?
        .read(MAT_NODE)
        .with_context(|| format!("Failed to open the file {}", filename.display()))?
        .unwrap_or_default();

    let dst = filter.apply(&src)?;

    if let Some(path) = filestorage {
        FileStorage::new(&path)?.write(MAT_NODE, &dst)?;
    }

    if verbose {
        println!("{}", format_report("Blurred image", &dst));
    }

    Ok(())
}

fn process_fsread(filename: &Path, verbose: bool) -> Result<()> {
    let mat = FileStorage::new(filename)?
        .read(MAT_NODE)
        .with_context(|| format!("Failed to open the file {}", filename.display()))?
        .unwrap_or_default();

    if mat.is_empty() {
        println!("[WARN] fsread returns an empty matrix.");
    }

    if verbose {
        println!("{}", format_report("Loaded the data", &mat));
    }

    Ok(())
}
