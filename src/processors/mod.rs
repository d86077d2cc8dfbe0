// cvcli/src/processors/mod.rs
mod blur;
mod loader;
mod metadata;
mod storage;

pub use blur::{gaussian_kernel, GaussianBlur};
pub use loader::Loader;
pub use metadata::{MetadataProcessor, Orientation};
pub use storage::{format_dt, parse_dt, FileStorage, StorageFormat};
