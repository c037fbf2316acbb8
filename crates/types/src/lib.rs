//! Validated value types shared by the dataset saver.
//!
//! Each type checks its invariant once at construction, so code that holds one
//! never has to re-validate it:
//!
//! - [`RecordName`]: a record identifier that is safe to use as one path segment
//! - [`Spacing`]: three finite, strictly positive physical voxel spacings

/// Errors that can occur when creating a [`RecordName`].
#[derive(Debug, thiserror::Error)]
pub enum NameError {
    #[error("record name cannot be empty")]
    Empty,
    #[error("record name {name:?} contains forbidden character {found:?}")]
    ForbiddenCharacter { name: String, found: char },
    #[error("record name {0:?} is reserved")]
    Reserved(String),
    #[error("record name {0:?} has leading or trailing whitespace")]
    SurroundingWhitespace(String),
}

/// Errors that can occur when creating a [`Spacing`].
#[derive(Debug, thiserror::Error)]
pub enum SpacingError {
    #[error("spacing along axis {axis} must be finite, got {value}")]
    NotFinite { axis: usize, value: f64 },
    #[error("spacing along axis {axis} must be positive, got {value}")]
    NotPositive { axis: usize, value: f64 },
    #[error("spacing must have exactly 3 components, got {0}")]
    WrongLength(usize),
}

/// Identifier of a single data record, e.g. `case001`.
///
/// The name is substituted into a path template, so it must stay a single
/// path segment: no separators, no NUL, and never `.` or `..`. It is used
/// verbatim, so surrounding whitespace is rejected rather than trimmed.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordName(String);

impl RecordName {
    const FORBIDDEN: [char; 3] = ['/', '\\', '\0'];

    pub fn new(input: impl AsRef<str>) -> Result<Self, NameError> {
        let text = input.as_ref();

        if text.trim().is_empty() {
            return Err(NameError::Empty);
        }

        if text.trim() != text {
            return Err(NameError::SurroundingWhitespace(text.to_owned()));
        }

        if let Some(found) = text.chars().find(|c| Self::FORBIDDEN.contains(c)) {
            return Err(NameError::ForbiddenCharacter {
                name: text.to_owned(),
                found,
            });
        }

        if matches!(text, "." | "..") {
            return Err(NameError::Reserved(text.to_owned()));
        }

        Ok(Self(text.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RecordName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for RecordName {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Physical voxel spacing along the three volume axes, in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
#[serde(into = "[f64; 3]")]
pub struct Spacing([f64; 3]);

impl Spacing {
    /// Isotropic 1 mm spacing.
    pub const UNIT: Spacing = Spacing([1.0, 1.0, 1.0]);

    pub fn new(values: [f64; 3]) -> Result<Self, SpacingError> {
        for (axis, &value) in values.iter().enumerate() {
            if !value.is_finite() {
                return Err(SpacingError::NotFinite { axis, value });
            }
            if value <= 0.0 {
                return Err(SpacingError::NotPositive { axis, value });
            }
        }
        Ok(Self(values))
    }

    /// Builds a spacing from a slice, which must hold exactly three values.
    pub fn from_slice(values: &[f64]) -> Result<Self, SpacingError> {
        let values: [f64; 3] = values
            .try_into()
            .map_err(|_| SpacingError::WrongLength(values.len()))?;
        Self::new(values)
    }

    pub fn values(&self) -> [f64; 3] {
        self.0
    }
}

impl From<Spacing> for [f64; 3] {
    fn from(spacing: Spacing) -> Self {
        spacing.0
    }
}

impl<'de> serde::Deserialize<'de> for Spacing {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let values = Vec::<f64>::deserialize(deserializer)?;
        Spacing::from_slice(&values).map_err(serde::de::Error::custom)
    }
}
