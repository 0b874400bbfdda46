//! Ephemeral auxiliary input files.
//!
//! The engine routine has no optional parameters. When a descriptor needs the
//! auxiliary pass, the routine is handed a second input script: a copy of the
//! primary script with the `efname`/`hfname` assignments blanked out. That
//! copy exists only while the call runs; [`AuxiliaryVariant`] deletes it on
//! drop, so a failing call cannot leave it behind.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::EngineError;

/// Appended to the primary input's stem to name its auxiliary variant.
pub const AUXILIARY_SUFFIX: &str = "__aux_filesetup_variant__.m";

/// Script variables rewritten to empty strings in the auxiliary variant.
pub const SUPPRESSED_FIELDS: [&str; 2] = ["efname", "hfname"];

/// Deterministic auxiliary path next to `primary`.
pub fn auxiliary_path_for(primary: &Path) -> PathBuf {
    let mut name = primary.with_extension("").into_os_string();
    name.push(AUXILIARY_SUFFIX);
    PathBuf::from(name)
}

/// Copy `source` with every suppressed assignment replaced by an
/// empty-string assignment. Line terminators are preserved and untouched
/// lines pass through byte for byte, whatever their encoding.
pub fn suppress_field_assignments(source: &[u8]) -> Vec<u8> {
    let mut rewritten = Vec::with_capacity(source.len());
    for line in source.split_inclusive(|&byte| byte == b'\n') {
        let (body, ending) = split_line_ending(line);
        let compact: String = String::from_utf8_lossy(body)
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        let suppressed = SUPPRESSED_FIELDS
            .iter()
            .find(|field| compact.contains(&format!("{field}=")));

        match suppressed {
            Some(field) => {
                rewritten.extend_from_slice(field.as_bytes());
                rewritten.extend_from_slice(b" = '';");
                rewritten.extend_from_slice(ending);
            }
            None => rewritten.extend_from_slice(line),
        }
    }
    rewritten
}

fn split_line_ending(line: &[u8]) -> (&[u8], &[u8]) {
    if let Some(body) = line.strip_suffix(b"\r\n") {
        (body, &line[body.len()..])
    } else if let Some(body) = line.strip_suffix(b"\n") {
        (body, &line[body.len()..])
    } else {
        (line, &line[line.len()..])
    }
}

/// Guard owning an auxiliary input file on disk.
#[derive(Debug)]
pub struct AuxiliaryVariant {
    path: PathBuf,
}

impl AuxiliaryVariant {
    /// Write the auxiliary variant of `primary`. A leftover file at the
    /// target path is overwritten.
    pub fn create(primary: &Path) -> Result<Self, EngineError> {
        let source = fs::read(primary).map_err(|err| EngineError::Auxiliary {
            path: primary.to_path_buf(),
            reason: err.to_string(),
        })?;

        let variant = Self {
            path: auxiliary_path_for(primary),
        };
        if variant.path.exists() {
            tracing::warn!(
                path = %variant.path.display(),
                "overwriting stale auxiliary input"
            );
        }

        // On failure `variant` drops here and removes any partial write.
        fs::write(&variant.path, suppress_field_assignments(&source)).map_err(|err| {
            EngineError::Auxiliary {
                path: variant.path.clone(),
                reason: err.to_string(),
            }
        })?;

        tracing::debug!(path = %variant.path.display(), "auxiliary input created");
        Ok(variant)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for AuxiliaryVariant {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "auxiliary input removed"),
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => tracing::warn!(
                path = %self.path.display(),
                error = %err,
                "failed to remove auxiliary input"
            ),
        }
    }
}
