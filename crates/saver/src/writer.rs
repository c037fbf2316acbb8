//! Volume writers.
//!
//! [`VolumeWriter`] is the seam between the saver and whatever encodes a volume to
//! disk. The saver only decides *where* a volume goes and which sample encoding it
//! uses; the writer owns the file format.
//!
//! [`NiftiWriter`] is the bundled implementation. It writes NIfTI-1 files and picks
//! gzip compression from a `.gz` suffix, so `images/case001.nii.gz` is compressed
//! and `images/case001.nii` is not.
//!
//! Volumes are indexed `[x, y, z]`. With [`SampleEncoding::UInt8`] the input is
//! expected to be normalised to `[0, 1]`; samples are clamped to that range, scaled
//! by 255 and truncated.

use std::path::Path;

use dataset_types::Spacing;
use ndarray::{ArrayD, ArrayViewD};
use nifti::writer::WriterOptions;
use nifti::NiftiHeader;

use crate::WriteError;

/// NIfTI `xyzt_units` code for millimetres.
const UNITS_MM: u8 = 2;

/// On-disk sample type of a written volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleEncoding {
    /// Normalised samples scaled to `0..=255`.
    UInt8,
    /// Samples written unchanged as 32-bit floats.
    Float32,
}

pub trait VolumeWriter {
    /// Encodes `image` with `spacing` to `path`, replacing any existing file.
    fn write(
        &self,
        path: &Path,
        image: ArrayViewD<'_, f32>,
        spacing: Spacing,
        encoding: SampleEncoding,
    ) -> Result<(), WriteError>;
}

impl<W: VolumeWriter + ?Sized> VolumeWriter for &W {
    fn write(
        &self,
        path: &Path,
        image: ArrayViewD<'_, f32>,
        spacing: Spacing,
        encoding: SampleEncoding,
    ) -> Result<(), WriteError> {
        (**self).write(path, image, spacing, encoding)
    }
}

/// Writes 3-D volumes as NIfTI-1.
#[derive(Debug, Clone, Copy, Default)]
pub struct NiftiWriter;

impl NiftiWriter {
    fn header(spacing: Spacing) -> NiftiHeader {
        let [x, y, z] = spacing.values();
        NiftiHeader {
            pixdim: [1.0, x as f32, y as f32, z as f32, 1.0, 1.0, 1.0, 1.0],
            xyzt_units: UNITS_MM,
            scl_slope: 1.0,
            scl_inter: 0.0,
            ..Default::default()
        }
    }

    fn check_shape(image: &ArrayViewD<'_, f32>) -> Result<(), WriteError> {
        if image.ndim() != 3 {
            return Err(WriteError::UnsupportedShape(format!(
                "expected a 3-D volume, got {} dimension(s) {:?}",
                image.ndim(),
                image.shape()
            )));
        }

        if image.is_empty() {
            return Err(WriteError::UnsupportedShape(format!(
                "volume has no samples {:?}",
                image.shape()
            )));
        }

        if let Some(&len) = image.shape().iter().find(|&&len| len > i16::MAX as usize) {
            return Err(WriteError::UnsupportedShape(format!(
                "axis length {len} exceeds the NIfTI-1 limit of {}",
                i16::MAX
            )));
        }

        Ok(())
    }
}

impl VolumeWriter for NiftiWriter {
    fn write(
        &self,
        path: &Path,
        image: ArrayViewD<'_, f32>,
        spacing: Spacing,
        encoding: SampleEncoding,
    ) -> Result<(), WriteError> {
        Self::check_shape(&image)?;

        let header = Self::header(spacing);
        let options = WriterOptions::new(path).reference_header(&header);

        match encoding {
            SampleEncoding::UInt8 => {
                let (samples, clamped) = to_uint8(image);
                if clamped > 0 {
                    tracing::warn!(
                        "clamped {} sample(s) outside [0, 1] while encoding {}",
                        clamped,
                        path.display()
                    );
                }
                options.write_nifti(&samples)?;
            }
            SampleEncoding::Float32 => options.write_nifti(&image)?,
        }

        Ok(())
    }
}

/// Scales normalised samples to `u8`.
///
/// Returns the encoded volume and the number of samples that were outside
/// `[0, 1]` (NaN included) and had to be clamped.
pub fn to_uint8(image: ArrayViewD<'_, f32>) -> (ArrayD<u8>, usize) {
    let mut clamped = 0usize;
    let samples = image.mapv(|value| {
        let unit = if value.is_nan() {
            clamped += 1;
            0.0
        } else if !(0.0..=1.0).contains(&value) {
            clamped += 1;
            value.clamp(0.0, 1.0)
        } else {
            value
        };
        (unit * 255.0) as u8
    });
    (samples, clamped)
}
