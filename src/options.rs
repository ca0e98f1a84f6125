use crate::error::ErrorDetail;
use serde_derive::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// The default number of instructions between interrupt polls.
const DEFAULT_INTERRUPT_POLL_INTERVAL: u32 = 8;
/// The default instruction budget for the headless runner.
const DEFAULT_STEP_LIMIT: u64 = 5_000_000;

/// A struct to allow specification of Nova-16 start-up parameters.
///
/// An instance is passed to [Machine::new()](crate::Machine::new) when instantiating
/// the emulator, and can be round-tripped through a JSON file so a hosting
/// application can persist its configuration.
#[derive(Copy, Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Options {
    /// How many instructions execute between pending-interrupt polls (1..=64)
    pub interrupt_poll_interval: u32,
    /// The maximum number of instructions the headless runner will execute
    pub step_limit: u64,
    /// Whether the hosting binary should attach a real audio backend
    pub enable_audio: bool,
}

impl Default for Options {
    /// Constructor that returns an [Options] instance using typical default settings.
    fn default() -> Self {
        Options {
            interrupt_poll_interval: DEFAULT_INTERRUPT_POLL_INTERVAL,
            step_limit: DEFAULT_STEP_LIMIT,
            enable_audio: false,
        }
    }
}

impl Options {
    /// Loads an [Options] instance from a JSON file.
    ///
    /// # Arguments
    ///
    /// * `file_path` - the path of the JSON options file
    pub fn load_from_file(file_path: &Path) -> Result<Options, ErrorDetail> {
        let text = fs::read_to_string(file_path).map_err(|_| ErrorDetail::FileError {
            file_path: file_path.display().to_string(),
        })?;
        serde_json::from_str(&text).map_err(|_| ErrorDetail::FileError {
            file_path: file_path.display().to_string(),
        })
    }

    /// Saves this [Options] instance to a JSON file.
    ///
    /// # Arguments
    ///
    /// * `file_path` - the path of the JSON options file to write
    pub fn save_to_file(&self, file_path: &Path) -> Result<(), ErrorDetail> {
        let text = serde_json::to_string_pretty(self).map_err(|_| ErrorDetail::FileError {
            file_path: file_path.display().to_string(),
        })?;
        fs::write(file_path, text).map_err(|_| ErrorDetail::FileError {
            file_path: file_path.display().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let options = Options::default();
        assert_eq!(options.interrupt_poll_interval, 8);
        assert!(!options.enable_audio);
    }

    #[test]
    fn test_json_round_trip() {
        let options = Options {
            interrupt_poll_interval: 4,
            step_limit: 123,
            enable_audio: true,
        };
        let text = serde_json::to_string(&options).unwrap();
        let restored: Options = serde_json::from_str(&text).unwrap();
        assert_eq!(restored, options);
    }
}
