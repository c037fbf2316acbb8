//! Data records handed to the saver by the upstream preprocessing stage.
//!
//! A record is a small field map rather than a fixed struct: upstream stages
//! attach whatever they produce, and the saver only reads the fields it needs
//! (`name`, `image`, `spacing`). Lookups are typed and fail with a
//! [`RecordError`] naming the offending field.

use std::collections::BTreeMap;

use dataset_types::{RecordName, Spacing};
use ndarray::{Array3, ArrayD, ArrayViewD};

use crate::{RecordError, IMAGE_FIELD, NAME_FIELD, SPACING_FIELD};

/// A single value stored in a [`DataRecord`].
#[derive(Debug, Clone, PartialEq)]
pub enum RecordField {
    Text(String),
    Volume(ArrayD<f32>),
    Spacing(Spacing),
}

impl RecordField {
    fn kind(&self) -> &'static str {
        match self {
            RecordField::Text(_) => "text",
            RecordField::Volume(_) => "a volume",
            RecordField::Spacing(_) => "a spacing",
        }
    }
}

impl From<String> for RecordField {
    fn from(value: String) -> Self {
        RecordField::Text(value)
    }
}

impl From<&str> for RecordField {
    fn from(value: &str) -> Self {
        RecordField::Text(value.to_owned())
    }
}

impl From<ArrayD<f32>> for RecordField {
    fn from(value: ArrayD<f32>) -> Self {
        RecordField::Volume(value)
    }
}

impl From<Array3<f32>> for RecordField {
    fn from(value: Array3<f32>) -> Self {
        RecordField::Volume(value.into_dyn())
    }
}

impl From<Spacing> for RecordField {
    fn from(value: Spacing) -> Self {
        RecordField::Spacing(value)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataRecord {
    fields: BTreeMap<String, RecordField>,
}

impl DataRecord {
    /// Builds a record holding the three fields the saver reads.
    pub fn new(name: impl Into<String>, image: ArrayD<f32>, spacing: Spacing) -> Self {
        Self::default()
            .with(NAME_FIELD, RecordField::Text(name.into()))
            .with(IMAGE_FIELD, image)
            .with(SPACING_FIELD, spacing)
    }

    /// Builder-style [`DataRecord::insert`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<RecordField>) -> Self {
        self.insert(key, value);
        self
    }

    /// Sets a field, returning the value it replaced.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<RecordField>,
    ) -> Option<RecordField> {
        self.fields.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<RecordField> {
        self.fields.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&RecordField> {
        self.fields.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// The record identifier, validated as a [`RecordName`].
    pub fn name(&self) -> Result<RecordName, RecordError> {
        match self.require(NAME_FIELD)? {
            RecordField::Text(text) => Ok(RecordName::new(text)?),
            other => Err(wrong_type(NAME_FIELD, "text", other)),
        }
    }

    pub fn image(&self) -> Result<ArrayViewD<'_, f32>, RecordError> {
        match self.require(IMAGE_FIELD)? {
            RecordField::Volume(volume) => Ok(volume.view()),
            other => Err(wrong_type(IMAGE_FIELD, "a volume", other)),
        }
    }

    pub fn spacing(&self) -> Result<Spacing, RecordError> {
        match self.require(SPACING_FIELD)? {
            RecordField::Spacing(spacing) => Ok(*spacing),
            other => Err(wrong_type(SPACING_FIELD, "a spacing", other)),
        }
    }

    fn require(&self, key: &str) -> Result<&RecordField, RecordError> {
        self.fields
            .get(key)
            .ok_or_else(|| RecordError::MissingField(key.to_owned()))
    }
}

fn wrong_type(field: &str, expected: &'static str, found: &RecordField) -> RecordError {
    RecordError::WrongType {
        field: field.to_owned(),
        expected,
        found: found.kind(),
    }
}
