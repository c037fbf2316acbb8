//! Output path templates.
//!
//! A [`PathTemplate`] is a relative path with exactly one `{}` placeholder, e.g.
//! `images/{}.nii.gz`, optionally rooted under a directory. The only operation on
//! it is substituting a [`RecordName`] into that placeholder; there is no general
//! formatting.
//!
//! The root is kept apart from the template text and is never scanned for
//! placeholders, so any directory (braces and non-UTF-8 bytes included) can be a
//! root. Templates supplied by callers must stay below the root: absolute paths
//! and `..` components are rejected.

use std::path::{Component, Path, PathBuf};

use dataset_types::RecordName;

use crate::{SaverError, SaverResult, TEMPLATE_PLACEHOLDER};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    /// Directory the template is resolved under; empty when unrooted
    root: PathBuf,

    /// Template text, containing exactly one placeholder
    text: String,

    /// Byte offset of the placeholder in `text`
    at: usize,
}

impl PathTemplate {
    /// Parses an unrooted template, checking only its placeholder syntax.
    ///
    /// # Errors
    ///
    /// Returns [`SaverError::InvalidTemplate`] unless the text contains exactly one
    /// `{}` and no other brace.
    pub fn parse(text: impl Into<String>) -> SaverResult<Self> {
        let text = text.into();

        let Some(at) = text.find(TEMPLATE_PLACEHOLDER) else {
            return Err(SaverError::InvalidTemplate(format!(
                "{text:?} has no {TEMPLATE_PLACEHOLDER} placeholder"
            )));
        };

        let before = &text[..at];
        let after = &text[at + TEMPLATE_PLACEHOLDER.len()..];
        if before.contains(['{', '}']) || after.contains(['{', '}']) {
            return Err(SaverError::InvalidTemplate(format!(
                "{text:?} must contain exactly one {TEMPLATE_PLACEHOLDER} placeholder and no other braces"
            )));
        }

        Ok(Self {
            root: PathBuf::new(),
            text,
            at,
        })
    }

    /// Parses a template that will later be rooted under an output directory.
    ///
    /// # Errors
    ///
    /// Besides the syntax errors of [`PathTemplate::parse`], returns
    /// [`SaverError::InvalidPath`] if the template is absolute or contains `..`.
    pub fn relative(text: impl Into<String>) -> SaverResult<Self> {
        let template = Self::parse(text)?;

        for component in Path::new(&template.text).components() {
            match component {
                Component::Prefix(_) | Component::RootDir => {
                    return Err(SaverError::InvalidPath(format!(
                        "template {:?} must be relative",
                        template.text
                    )));
                }
                Component::ParentDir => {
                    return Err(SaverError::InvalidPath(format!(
                        "template {:?} must not contain '..'",
                        template.text
                    )));
                }
                Component::CurDir | Component::Normal(_) => {}
            }
        }

        Ok(template)
    }

    /// Returns this template resolved under `root`.
    pub fn rooted(&self, root: &Path) -> Self {
        let root = if self.root.as_os_str().is_empty() {
            root.to_path_buf()
        } else {
            root.join(&self.root)
        };
        Self {
            root,
            text: self.text.clone(),
            at: self.at,
        }
    }

    /// Substitutes `name` into the placeholder and joins the result to the root.
    pub fn render(&self, name: &RecordName) -> PathBuf {
        let before = &self.text[..self.at];
        let after = &self.text[self.at + TEMPLATE_PLACEHOLDER.len()..];
        self.root.join(format!("{before}{}{after}", name.as_str()))
    }

    /// Deepest directory of the template that does not depend on the record name.
    ///
    /// For root `out` and `images/{}.nii.gz` this is `out/images`; for
    /// `{}/ct.nii.gz` it is `out`. Returns `None` when no directory is named at all.
    pub fn static_dir(&self) -> Option<PathBuf> {
        let relative = Path::new(&self.text)
            .parent()?
            .ancestors()
            .find(|dir| !dir.to_string_lossy().contains(TEMPLATE_PLACEHOLDER))
            .filter(|dir| !dir.as_os_str().is_empty());

        let dir = match relative {
            Some(relative) => self.root.join(relative),
            None => self.root.clone(),
        };
        (!dir.as_os_str().is_empty()).then_some(dir)
    }

    /// Whether the placeholder sits in a directory segment rather than the file name.
    pub fn has_dynamic_dir(&self) -> bool {
        self.text[self.at..].contains(std::path::is_separator)
    }

    /// Directory the template is resolved under; empty when unrooted.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Template text without the root.
    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl std::fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.root.join(&self.text).display())
    }
}

impl std::str::FromStr for PathTemplate {
    type Err = SaverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
