//! Constants used throughout the saver crate.
//!
//! Data-kind names, record field names and default templates live here so that
//! the on-disk layout is defined in exactly one place.

use std::collections::BTreeMap;

use crate::SampleEncoding;

/// Data kind under which the CT volume template is registered.
pub const IMAGE_KIND: &str = "image";

/// Default relative template for CT volumes.
pub const DEFAULT_IMAGE_TEMPLATE: &str = "images/{}.nii.gz";

/// Placeholder that a template's record name is substituted into.
pub const TEMPLATE_PLACEHOLDER: &str = "{}";

/// Record field holding the record identifier.
pub const NAME_FIELD: &str = "name";

/// Record field holding the pixel volume.
pub const IMAGE_FIELD: &str = "image";

/// Record field holding the physical voxel spacing.
pub const SPACING_FIELD: &str = "spacing";

/// Sample type every saved volume is encoded as.
pub const OUTPUT_ENCODING: SampleEncoding = SampleEncoding::UInt8;

/// Default data-kind to template map.
pub fn default_path_dict() -> BTreeMap<String, String> {
    BTreeMap::from([(IMAGE_KIND.to_owned(), DEFAULT_IMAGE_TEMPLATE.to_owned())])
}
