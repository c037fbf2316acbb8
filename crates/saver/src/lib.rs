//! Dataset Saver
//!
//! This crate persists processed data records from a CT preprocessing pipeline.
//! A [`Saver`] owns a map from data kinds (currently `"image"`) to path templates,
//! roots every template under an output directory, and writes each record's volume
//! to the path derived from the record's name.
//!
//! ## Output Layout
//!
//! With the default templates ([`default_path_dict`]) and root `/tmp/out`:
//!
//! ```text
//! /tmp/out/
//! └── images/
//!     ├── case001.nii.gz
//!     └── case002.nii.gz
//! ```
//!
//! Parent directories of every template are created when the saver is built, so
//! later saves only write files. Saving a record whose name was already saved
//! overwrites the earlier file.
//!
//! ## Example Usage
//!
//! ```no_run
//! use dataset_saver::{default_path_dict, DataRecord, Saver};
//! use dataset_types::Spacing;
//! use ndarray::Array3;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let saver = Saver::new("/tmp/out", &default_path_dict())?;
//!
//! let volume = Array3::<f32>::zeros((128, 128, 128)).into_dyn();
//! let record = DataRecord::new("case001", volume, Spacing::UNIT);
//!
//! // Writes /tmp/out/images/case001.nii.gz
//! saver.save(&record)?;
//! # Ok(())
//! # }
//! ```

mod config;
mod constants;
mod error;
mod record;
mod saver;
mod template;
mod writer;

pub use config::SaverConfig;
pub use constants::{
    default_path_dict, DEFAULT_IMAGE_TEMPLATE, IMAGE_FIELD, IMAGE_KIND, NAME_FIELD,
    OUTPUT_ENCODING, SPACING_FIELD, TEMPLATE_PLACEHOLDER,
};
pub use error::{RecordError, SaverError, SaverResult, WriteError};
pub use record::{DataRecord, RecordField};
pub use saver::Saver;
pub use template::PathTemplate;
pub use writer::{to_uint8, NiftiWriter, SampleEncoding, VolumeWriter};

pub use dataset_types::{RecordName, Spacing};
