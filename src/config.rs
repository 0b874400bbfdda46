//! Harness configuration
//!
//! Every location the tooling touches (where input scripts live, where the
//! engine runs, which directories it must be able to see) is carried in an
//! explicit [`HarnessConfig`] instead of being derived from the binary's own
//! location. The config can be loaded from a JSON file so fixture maintainers
//! can point the harness at a different checkout or engine install.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Entry point invoked in the engine for every call descriptor.
pub const DEFAULT_ENTRY_POINT: &str = "run_bscan";

cfg_if::cfg_if! {
    if #[cfg(windows)] {
        const DEFAULT_ENGINE_EXECUTABLE: &str = "matlab.exe";
    } else {
        const DEFAULT_ENGINE_EXECUTABLE: &str = "matlab";
    }
}

/// Complete harness configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HarnessConfig {
    /// Directory that `input_file` entries are resolved against
    pub input_base_dir: PathBuf,
    /// Directory the engine changes into after startup
    pub engine_working_dir: PathBuf,
    /// Directories registered on the engine's search path
    #[serde(default)]
    pub extra_search_paths: Vec<PathBuf>,
    #[serde(default)]
    pub engine: EngineConfig,
}

/// External engine launch parameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    /// Executable started for each session
    #[serde(default = "default_executable")]
    pub executable: PathBuf,
    /// Non-interactive startup options passed on the command line
    #[serde(default = "default_startup_options")]
    pub startup_options: Vec<String>,
    /// Function called once per descriptor
    #[serde(default = "default_entry_point")]
    pub entry_point: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            executable: default_executable(),
            startup_options: default_startup_options(),
            entry_point: default_entry_point(),
        }
    }
}

impl Default for HarnessConfig {
    /// Default configuration rooted at the current directory
    fn default() -> Self {
        Self::rooted_at(".")
    }
}

impl HarnessConfig {
    /// Standard layout for an input-generation directory: input scripts at
    /// the root, engine helper functions under `bscan/` and `matlab/`.
    pub fn rooted_at<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref().to_path_buf();
        Self {
            extra_search_paths: vec![root.join("bscan"), root.join("matlab")],
            input_base_dir: root.clone(),
            engine_working_dir: root,
            engine: EngineConfig::default(),
        }
    }

    /// Load configuration from JSON file
    ///
    /// # Returns
    /// The parsed configuration, or the defaults if the file is missing or
    /// its JSON is invalid (the failure is logged).
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }
}

fn default_executable() -> PathBuf {
    PathBuf::from(DEFAULT_ENGINE_EXECUTABLE)
}

fn default_startup_options() -> Vec<String> {
    ["-nodisplay", "-nodesktop", "-nosplash"]
        .iter()
        .map(|opt| opt.to_string())
        .collect()
}

fn default_entry_point() -> String {
    DEFAULT_ENTRY_POINT.to_string()
}
