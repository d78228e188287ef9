//! Socket endpoint naming.
//!
//! Every bridge gets its own directory of Unix domain sockets:
//!
//! ```text
//! <base>/
//!   host_plugin_control.sock                  control (host → plugin)
//!   plugin_host_callback.sock                 callbacks (plugin → host)
//!   host_plugin_audio_processor_<id>.sock     one per object instance
//! ```
//!
//! Both processes derive the same names from the base directory alone, so
//! only the directory has to be handed to the other side.

use std::path::{Path, PathBuf};

use rand::Rng;
use rand::distributions::Alphanumeric;

use crate::interfaces::InstanceId;

const CONTROL_SOCKET: &str = "host_plugin_control.sock";
const CALLBACK_SOCKET: &str = "plugin_host_callback.sock";
const AUDIO_PROCESSOR_PREFIX: &str = "host_plugin_audio_processor_";

/// Prefix for generated endpoint directories.
pub const DIRECTORY_PREFIX: &str = "bridgework-";

/// Deterministic endpoint paths under one base directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    base_dir: PathBuf,
}

impl Endpoints {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Pick a fresh, not yet existing directory under the user's runtime
    /// directory (or the temp directory when there is none).
    pub fn generate() -> Self {
        let root = dirs::runtime_dir().unwrap_or_else(std::env::temp_dir);
        let mut rng = rand::thread_rng();
        loop {
            let suffix: String = (&mut rng)
                .sample_iter(&Alphanumeric)
                .take(10)
                .map(char::from)
                .collect();
            let candidate = root.join(format!("{DIRECTORY_PREFIX}{suffix}"));
            if !candidate.exists() {
                return Self::new(candidate);
            }
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn control(&self) -> PathBuf {
        self.base_dir.join(CONTROL_SOCKET)
    }

    pub fn callback(&self) -> PathBuf {
        self.base_dir.join(CALLBACK_SOCKET)
    }

    pub fn audio_processor(&self, instance_id: InstanceId) -> PathBuf {
        self.base_dir
            .join(format!("{AUDIO_PROCESSOR_PREFIX}{instance_id}.sock"))
    }
}
