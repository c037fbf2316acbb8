//! Template-driven saver for processed data records.
//!
//! # Lifecycle
//!
//! Construction does all directory work: every template is rooted under the output
//! directory and its parent directory is created (recursively, idempotently).
//! After that, [`Saver::save`] renders one path per record and hands the volume to
//! the configured [`VolumeWriter`].
//!
//! Templates whose placeholder sits in a directory segment (`{}/ct.nii.gz`) cannot
//! have their full parent created up front; for those the deepest static ancestor is
//! created at construction and the rendered parent at save time.
//!
//! # Ownership
//!
//! The caller's template map is parsed into owned [`PathTemplate`]s, so mutating
//! the caller's map afterwards has no effect on where records are written.
//!
//! # Concurrency
//!
//! The saver holds no interior state and performs blocking I/O. Concurrent saves of
//! records with the same name race on the same file; the last write wins.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use dataset_types::RecordName;

use crate::{
    DataRecord, NiftiWriter, PathTemplate, SaverError, SaverResult, VolumeWriter, IMAGE_KIND,
    OUTPUT_ENCODING,
};

#[derive(Debug)]
pub struct Saver<W = NiftiWriter> {
    /// Output root every template is resolved under
    root_dir: PathBuf,

    /// Data kind to rooted template
    path_dict: BTreeMap<String, PathTemplate>,

    writer: W,
}

impl Saver<NiftiWriter> {
    /// Creates a saver that writes NIfTI volumes.
    ///
    /// See [`Saver::with_writer`] for details and errors.
    pub fn new(
        root_dir: impl AsRef<Path>,
        path_dict: &BTreeMap<String, String>,
    ) -> SaverResult<Self> {
        Self::with_writer(root_dir, path_dict, NiftiWriter)
    }
}

impl<W: VolumeWriter> Saver<W> {
    /// Creates a saver with a custom volume writer.
    ///
    /// # Arguments
    ///
    /// * `root_dir` - Directory all templates are resolved under
    /// * `path_dict` - Data kind to relative template, e.g. `"image" => "images/{}.nii.gz"`
    /// * `writer` - Encoder invoked by [`Saver::save`]
    ///
    /// # Errors
    ///
    /// Returns `SaverError` if:
    /// - A template does not contain exactly one `{}` placeholder
    /// - A template is absolute or contains `..`
    /// - A parent directory cannot be created (I/O)
    pub fn with_writer(
        root_dir: impl AsRef<Path>,
        path_dict: &BTreeMap<String, String>,
        writer: W,
    ) -> SaverResult<Self> {
        let root_dir = root_dir.as_ref().to_path_buf();

        let mut resolved = BTreeMap::new();
        for (kind, template) in path_dict {
            let template = PathTemplate::relative(template.as_str())?.rooted(&root_dir);

            if let Some(dir) = template.static_dir() {
                create_dir(&dir)?;
            }

            resolved.insert(kind.clone(), template);
        }

        Ok(Self {
            root_dir,
            path_dict: resolved,
            writer,
        })
    }

    /// Rooted templates keyed by data kind.
    #[must_use]
    pub fn path_dict(&self) -> &BTreeMap<String, PathTemplate> {
        &self.path_dict
    }

    /// Output root the templates are resolved under.
    #[must_use]
    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Volume writer invoked by [`Saver::save`].
    #[must_use]
    pub fn writer(&self) -> &W {
        &self.writer
    }

    /// Looks up the rooted template for a data kind.
    pub fn template(&self, kind: &str) -> SaverResult<&PathTemplate> {
        self.path_dict
            .get(kind)
            .ok_or_else(|| SaverError::MissingTemplate(kind.to_owned()))
    }

    /// Path the image of a record named `name` is written to.
    pub fn image_path(&self, name: &RecordName) -> SaverResult<PathBuf> {
        Ok(self.template(IMAGE_KIND)?.render(name))
    }

    /// Writes the record's image volume to its templated path.
    ///
    /// The record's `name`, `image` and `spacing` fields are all read before any
    /// filesystem change, so an incomplete record writes nothing. An existing file
    /// at the target path is overwritten.
    ///
    /// # Errors
    ///
    /// Returns `SaverError` if:
    /// - A required record field is missing, has the wrong type, or the name is invalid
    /// - No `"image"` template is registered
    /// - The rendered parent directory cannot be created (I/O)
    /// - The writer fails; its error is returned unchanged as [`SaverError::Write`]
    pub fn save(&self, record: &DataRecord) -> SaverResult<()> {
        let name = record.name()?;
        let image = record.image()?;
        let spacing = record.spacing()?;

        let template = self.template(IMAGE_KIND)?;
        let path = template.render(&name);

        if template.has_dynamic_dir() {
            if let Some(parent) = path.parent() {
                create_dir(parent)?;
            }
        }

        self.writer.write(&path, image, spacing, OUTPUT_ENCODING)?;

        tracing::info!("saved {} to {}", name, path.display());
        Ok(())
    }
}

fn create_dir(dir: &Path) -> SaverResult<()> {
    fs::create_dir_all(dir).map_err(|e| {
        SaverError::StorageDirCreation(std::io::Error::new(
            e.kind(),
            format!("Failed to create directory {}: {}", dir.display(), e),
        ))
    })?;
    tracing::debug!("ensured directory {}", dir.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{default_path_dict, RecordError, SampleEncoding, WriteError};
    use dataset_types::{NameError, Spacing};
    use ndarray::{Array3, ArrayD, ArrayViewD};
    use std::cell::RefCell;
    use tempfile::TempDir;

    /// Writer that records its calls and creates an empty file at the target path
    #[derive(Debug, Default)]
    struct RecordingWriter {
        calls: RefCell<Vec<(PathBuf, Vec<usize>, Spacing, SampleEncoding)>>,
    }

    impl VolumeWriter for RecordingWriter {
        fn write(
            &self,
            path: &Path,
            image: ArrayViewD<'_, f32>,
            spacing: Spacing,
            encoding: SampleEncoding,
        ) -> Result<(), WriteError> {
            fs::write(path, b"")?;
            self.calls.borrow_mut().push((
                path.to_path_buf(),
                image.shape().to_vec(),
                spacing,
                encoding,
            ));
            Ok(())
        }
    }

    #[derive(Debug)]
    struct FailingWriter;

    impl VolumeWriter for FailingWriter {
        fn write(
            &self,
            _path: &Path,
            _image: ArrayViewD<'_, f32>,
            _spacing: Spacing,
            _encoding: SampleEncoding,
        ) -> Result<(), WriteError> {
            Err(WriteError::UnsupportedShape("rejected".into()))
        }
    }

    fn volume() -> ArrayD<f32> {
        Array3::<f32>::from_elem((4, 4, 3), 0.25).into_dyn()
    }

    fn record(name: &str) -> DataRecord {
        DataRecord::new(name, volume(), Spacing::UNIT)
    }

    #[test]
    fn test_new_creates_template_parent() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("out");

        let saver = Saver::new(&root, &default_path_dict()).unwrap();

        assert!(root.join("images").is_dir());
        assert_eq!(saver.root_dir(), root.as_path());
        let template = &saver.path_dict()[IMAGE_KIND];
        assert_eq!(template.root(), root.as_path());
        assert_eq!(template.as_str(), "images/{}.nii.gz");
    }

    #[test]
    fn test_new_accepts_root_with_braces() {
        let temp = TempDir::new().unwrap();

        for dir in ["run{1}", "a{}b"] {
            let root = temp.path().join(dir);
            let saver = Saver::new(&root, &default_path_dict()).unwrap();
            assert!(root.join("images").is_dir());

            saver.save(&record("case001")).unwrap();
            assert!(root.join("images/case001.nii.gz").is_file());
        }
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_new_accepts_non_utf8_root() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let temp = TempDir::new().unwrap();
        let root = temp.path().join(OsStr::from_bytes(b"caf\xe9"));

        let saver = Saver::new(&root, &default_path_dict()).unwrap();
        assert!(root.join("images").is_dir());

        saver.save(&record("case001")).unwrap();
        assert!(root.join("images/case001.nii.gz").is_file());
    }

    #[test]
    fn test_save_rejects_name_with_surrounding_whitespace() {
        let temp = TempDir::new().unwrap();
        let saver = Saver::new(temp.path(), &default_path_dict()).unwrap();

        let result = saver.save(&record(" case001 "));

        assert!(matches!(
            result,
            Err(SaverError::Record(RecordError::InvalidName(
                NameError::SurroundingWhitespace(_)
            )))
        ));
        assert_eq!(fs::read_dir(temp.path().join("images")).unwrap().count(), 0);
    }

    #[test]
    fn test_new_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("out");

        let first = Saver::new(&root, &default_path_dict()).unwrap();
        let second = Saver::new(&root, &default_path_dict()).unwrap();

        assert_eq!(first.path_dict(), second.path_dict());
    }

    #[test]
    fn test_new_creates_nested_dirs_for_every_kind() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("out");

        let mut paths = default_path_dict();
        paths.insert("projections".into(), "projections/ap/{}.nii.gz".into());

        let saver = Saver::new(&root, &paths).unwrap();

        assert!(root.join("images").is_dir());
        assert!(root.join("projections/ap").is_dir());
        assert_eq!(saver.path_dict().len(), 2);
    }

    #[test]
    fn test_new_does_not_require_image_template() {
        let temp = TempDir::new().unwrap();
        let paths = BTreeMap::from([("blocks".to_owned(), "blocks/{}.nii.gz".to_owned())]);

        let saver = Saver::new(temp.path(), &paths).unwrap();
        let result = saver.save(&record("case001"));

        assert!(matches!(result, Err(SaverError::MissingTemplate(k)) if k == IMAGE_KIND));
    }

    #[test]
    fn test_path_dict_independent_of_input() {
        let temp = TempDir::new().unwrap();
        let mut paths = default_path_dict();

        let saver = Saver::new(temp.path(), &paths).unwrap();
        let before = saver.path_dict().clone();

        paths.insert(IMAGE_KIND.into(), "elsewhere/{}.nii".into());
        paths.insert("extra".into(), "extra/{}.nii".into());

        assert_eq!(saver.path_dict(), &before);
        assert_eq!(
            saver.image_path(&RecordName::new("case001").unwrap()).unwrap(),
            temp.path().join("images/case001.nii.gz")
        );
    }

    #[test]
    fn test_new_rejects_invalid_templates() {
        let temp = TempDir::new().unwrap();

        let no_placeholder =
            BTreeMap::from([(IMAGE_KIND.to_owned(), "images/ct.nii.gz".to_owned())]);
        assert!(matches!(
            Saver::new(temp.path(), &no_placeholder),
            Err(SaverError::InvalidTemplate(_))
        ));

        let escaping = BTreeMap::from([(IMAGE_KIND.to_owned(), "../{}.nii.gz".to_owned())]);
        assert!(matches!(
            Saver::new(temp.path(), &escaping),
            Err(SaverError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_new_fails_when_directory_cannot_be_created() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("file.txt");
        fs::write(&root, "not a directory").unwrap();

        let result = Saver::new(&root, &default_path_dict());

        assert!(matches!(result, Err(SaverError::StorageDirCreation(_))));
    }

    #[test]
    fn test_save_writes_nifti_at_templated_path() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("out");

        let saver = Saver::new(&root, &default_path_dict()).unwrap();
        saver.save(&record("case001")).unwrap();

        assert!(root.join("images/case001.nii.gz").is_file());
    }

    #[test]
    fn test_save_passes_uint8_encoding_to_writer() {
        let temp = TempDir::new().unwrap();
        let spacing = Spacing::new([0.8, 0.8, 1.25]).unwrap();

        let saver =
            Saver::with_writer(temp.path(), &default_path_dict(), RecordingWriter::default())
                .unwrap();
        saver
            .save(&DataRecord::new("case007", volume(), spacing))
            .unwrap();

        let calls = saver.writer().calls.borrow();
        assert_eq!(calls.len(), 1);

        let (path, shape, written_spacing, encoding) = &calls[0];
        assert_eq!(path, &temp.path().join("images/case007.nii.gz"));
        assert_eq!(shape, &vec![4, 4, 3]);
        assert_eq!(*written_spacing, spacing);
        assert_eq!(*encoding, SampleEncoding::UInt8);
    }

    #[test]
    fn test_save_missing_name_writes_nothing() {
        let temp = TempDir::new().unwrap();

        let saver =
            Saver::with_writer(temp.path(), &default_path_dict(), RecordingWriter::default())
                .unwrap();

        let mut incomplete = record("case001");
        incomplete.remove("name");
        let result = saver.save(&incomplete);

        assert!(matches!(
            result,
            Err(SaverError::Record(RecordError::MissingField(f))) if f == "name"
        ));
        assert!(saver.writer().calls.borrow().is_empty());
        assert_eq!(fs::read_dir(temp.path().join("images")).unwrap().count(), 0);
    }

    #[test]
    fn test_save_missing_image_or_spacing() {
        let temp = TempDir::new().unwrap();
        let saver = Saver::new(temp.path(), &default_path_dict()).unwrap();

        let mut no_image = record("case001");
        no_image.remove("image");
        assert!(matches!(
            saver.save(&no_image),
            Err(SaverError::Record(RecordError::MissingField(f))) if f == "image"
        ));

        let mut no_spacing = record("case001");
        no_spacing.remove("spacing");
        assert!(matches!(
            saver.save(&no_spacing),
            Err(SaverError::Record(RecordError::MissingField(f))) if f == "spacing"
        ));

        assert!(!temp.path().join("images/case001.nii.gz").exists());
    }

    #[test]
    fn test_save_twice_overwrites() {
        let temp = TempDir::new().unwrap();
        let saver = Saver::new(temp.path(), &default_path_dict()).unwrap();
        let path = temp.path().join("images/case001.nii.gz");

        saver.save(&record("case001")).unwrap();
        let first_len = fs::metadata(&path).unwrap().len();

        let bigger = DataRecord::new(
            "case001",
            Array3::<f32>::from_shape_fn((16, 16, 16), |(x, y, z)| ((x * y + z) % 7) as f32 / 6.0)
                .into_dyn(),
            Spacing::UNIT,
        );
        saver.save(&bigger).unwrap();

        assert!(path.is_file());
        assert_ne!(fs::metadata(&path).unwrap().len(), first_len);
        assert_eq!(fs::read_dir(temp.path().join("images")).unwrap().count(), 1);
    }

    #[test]
    fn test_save_propagates_writer_error() {
        let temp = TempDir::new().unwrap();
        let saver = Saver::with_writer(temp.path(), &default_path_dict(), FailingWriter).unwrap();

        let result = saver.save(&record("case001"));

        assert!(matches!(
            result,
            Err(SaverError::Write(WriteError::UnsupportedShape(_)))
        ));
    }

    #[test]
    fn test_save_placeholder_in_directory() {
        let temp = TempDir::new().unwrap();
        let paths = BTreeMap::from([(IMAGE_KIND.to_owned(), "cases/{}/ct.nii.gz".to_owned())]);

        let saver = Saver::new(temp.path(), &paths).unwrap();
        assert!(temp.path().join("cases").is_dir());

        saver.save(&record("case003")).unwrap();
        assert!(temp.path().join("cases/case003/ct.nii.gz").is_file());
    }

    #[test]
    fn test_image_path_requires_image_template() {
        let temp = TempDir::new().unwrap();
        let saver = Saver::new(temp.path(), &BTreeMap::new()).unwrap();
        let name = RecordName::new("case001").unwrap();

        assert!(matches!(
            saver.image_path(&name),
            Err(SaverError::MissingTemplate(_))
        ));
    }
}
