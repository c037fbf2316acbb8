use dataset_types::NameError;

/// Errors raised while reading fields out of a [`crate::DataRecord`].
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("record is missing required field `{0}`")]
    MissingField(String),
    #[error("record field `{field}` must be {expected}, found {found}")]
    WrongType {
        field: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("invalid record name: {0}")]
    InvalidName(#[from] NameError),
}

/// Errors raised by a [`crate::VolumeWriter`].
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("unsupported volume shape: {0}")]
    UnsupportedShape(String),
    #[error("failed to encode NIfTI volume: {0}")]
    Nifti(#[from] nifti::NiftiError),
    #[error("failed to write volume: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum SaverError {
    #[error("invalid path template: {0}")]
    InvalidTemplate(String),
    #[error("invalid path: {0}")]
    InvalidPath(String),
    #[error("no path template registered for data kind `{0}`")]
    MissingTemplate(String),
    #[error("failed to create storage directory: {0}")]
    StorageDirCreation(std::io::Error),
    #[error("invalid data record: {0}")]
    Record(#[from] RecordError),
    #[error(transparent)]
    Write(#[from] WriteError),
    #[error("failed to read saver config: {0}")]
    ConfigRead(std::io::Error),
    #[error("failed to parse saver config: {0}")]
    ConfigParse(serde_yaml::Error),
    #[error("failed to serialize saver config: {0}")]
    ConfigSerialize(serde_yaml::Error),
}

pub type SaverResult<T> = std::result::Result<T, SaverError>;
