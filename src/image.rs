//! Image metadata refinement.
//!
//! An [`ImageMeta`] is a [`FileMeta`] whose mimetype names raster image
//! content, extended with pixel dimensions and the embedded tag map.
//! Dimensions come from the format header alone; tags are read only
//! from the JPEG encoding. Both decode best-effort during population.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::entry::{Entity, FileMeta, PopulateWarnings};
use crate::error::ExifError;
use crate::exif::ExifData;
use crate::inspect::Inspector;

/// Captured metadata for an image file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageMeta {
    #[serde(flatten)]
    pub file: FileMeta,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl ImageMeta {
    /// Attempts the refinement. Succeeds only when the file's
    /// (classified-on-demand) mimetype names an image; every attribute
    /// the file already carries moves over. A non-image file comes back
    /// unchanged.
    pub fn convert(mut file: FileMeta, inspector: &Inspector) -> Result<ImageMeta, FileMeta> {
        match file.is_image(inspector) {
            Ok(true) => Ok(ImageMeta {
                file,
                width: 0,
                height: 0,
                tags: BTreeMap::new(),
            }),
            _ => Err(file),
        }
    }

    /// Populates the inherited file attributes, then the pixel
    /// dimensions, then the embedded tags. Decode failures leave zero
    /// dimensions and an empty map and are reported in the warnings,
    /// never as a failed call.
    pub fn populate(&mut self, inspector: &Inspector) -> PopulateWarnings {
        let mut warnings = self.file.populate(inspector);

        match imagesize::size(&self.file.path) {
            Ok(dim) => {
                self.width = dim.width as u32;
                self.height = dim.height as u32;
            }
            Err(err) => {
                self.width = 0;
                self.height = 0;
                warnings.dimensions = Some(err.to_string());
            }
        }

        if self.is_jpeg() {
            match ExifData::read(&self.file.path) {
                Ok(data) => self.tags = data.into_tags(),
                Err(err) => {
                    self.tags.clear();
                    warnings.tags = Some(err.to_string());
                }
            }
        } else {
            self.tags.clear();
        }

        warnings
    }

    pub fn is_populated(&self) -> bool {
        self.file.is_populated()
    }

    /// True when the mimetype names the JPEG encoding, the only format
    /// whose embedded tags are read.
    pub fn is_jpeg(&self) -> bool {
        self.file.mimetype.as_deref() == Some("image/jpeg")
    }

    /// Reads the embedded tag block, applying the JPEG-only policy.
    pub fn read_exif(&self) -> Result<ExifData, ExifError> {
        if !self.is_jpeg() {
            return Err(ExifError::NotJpeg);
        }

        ExifData::read(&self.file.path)
    }
}

impl Entity for ImageMeta {
    fn path(&self) -> &Path {
        &self.file.path
    }
}

impl fmt::Display for ImageMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.file.path.display())
    }
}
