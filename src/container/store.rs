use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ContainerError;

use super::{Container, ContainerStore, NamedArray};

/// Format tag written into every container document.
pub const CONTAINER_FORMAT: &str = "em-fixtures/container";

/// Version written on save. Older versions are still readable.
pub const CONTAINER_FORMAT_VERSION: u32 = 1;

/// JSON container documents.
///
/// Saving always writes [`CONTAINER_FORMAT_VERSION`] and only the arrays;
/// extra top-level keys found on load (tool provenance and the like) are
/// not carried over.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonContainerStore;

#[derive(Deserialize)]
struct StoredDocument {
    format: String,
    version: u32,
    arrays: BTreeMap<String, NamedArray>,
}

#[derive(Serialize)]
struct DocumentRef<'a> {
    format: &'static str,
    version: u32,
    arrays: &'a BTreeMap<String, NamedArray>,
}

impl ContainerStore for JsonContainerStore {
    fn load(&self, path: &Path) -> Result<Container, ContainerError> {
        let contents = fs::read_to_string(path).map_err(|err| ContainerError::Read {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;
        let document: StoredDocument =
            serde_json::from_str(&contents).map_err(|err| ContainerError::Parse {
                path: path.to_path_buf(),
                reason: err.to_string(),
            })?;

        if document.format != CONTAINER_FORMAT {
            return Err(ContainerError::Parse {
                path: path.to_path_buf(),
                reason: format!("unexpected format tag {:?}", document.format),
            });
        }
        if document.version == 0 || document.version > CONTAINER_FORMAT_VERSION {
            return Err(ContainerError::UnsupportedVersion {
                path: path.to_path_buf(),
                version: document.version,
            });
        }

        Ok(Container::from_arrays(document.arrays))
    }

    fn save(&self, path: &Path, container: &Container) -> Result<(), ContainerError> {
        let write_failed = |reason: String| ContainerError::Write {
            path: path.to_path_buf(),
            reason,
        };
        let document = DocumentRef {
            format: CONTAINER_FORMAT,
            version: CONTAINER_FORMAT_VERSION,
            arrays: container.arrays(),
        };
        let json = serde_json::to_vec_pretty(&document).map_err(|err| write_failed(err.to_string()))?;
        fs::write(path, json).map_err(|err| write_failed(err.to_string()))
    }
}
