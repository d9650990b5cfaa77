//! Options for the collated writer.
//!
//! `WriterOptions` names the destination file and controls padding and the
//! optional collective timeout. Values come from API calls or from
//! environment variables prefixed `COLLATE_`.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{CollateError, Result};

/// Suffix appended to the configured output name.
pub const DEFAULT_SUFFIX: &str = "-collated";

/// Destination and padding parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct WriterOptions {
    /// Base name of the output file
    pub output_name: String,

    /// Directory the file is written into
    pub output_dir: PathBuf,

    /// Appended to `output_name` (default `-collated`)
    pub suffix: String,

    /// Byte used to pad records to the negotiated width
    pub fill_byte: u8,

    /// Upper bound on a collective operation; `None` waits forever
    pub collective_timeout: Option<Duration>,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            output_name: "collate-output".to_string(),
            output_dir: PathBuf::from("."),
            suffix: DEFAULT_SUFFIX.to_string(),
            fill_byte: b' ',
            collective_timeout: None,
        }
    }
}

impl WriterOptions {
    pub fn new(output_name: impl Into<String>) -> Self {
        Self { output_name: output_name.into(), ..Self::default() }
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_fill_byte(mut self, fill: u8) -> Self {
        self.fill_byte = fill;
        self
    }

    pub fn with_collective_timeout(mut self, timeout: Duration) -> Self {
        self.collective_timeout = Some(timeout);
        self
    }

    /// Full path of the collated file: `<output_dir>/<output_name><suffix>`.
    pub fn output_path(&self) -> PathBuf {
        self.output_dir.join(format!("{}{}", self.output_name, self.suffix))
    }

    /// Load options from the process environment, falling back to defaults.
    ///
    /// Recognized variables:
    /// - `COLLATE_OUTPUT_NAME`
    /// - `COLLATE_OUTPUT_DIR`
    /// - `COLLATE_FILL_BYTE` (a single ASCII character)
    /// - `COLLATE_TIMEOUT_SECS`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a caller-supplied lookup.
    pub fn from_lookup<L>(lookup: L) -> Result<Self>
    where
        L: Fn(&str) -> Option<String>,
    {
        let mut opts = Self::default();

        if let Some(name) = lookup("COLLATE_OUTPUT_NAME") {
            if name.is_empty() {
                return Err(CollateError::Config("COLLATE_OUTPUT_NAME is empty".into()));
            }
            opts.output_name = name;
        }
        if let Some(dir) = lookup("COLLATE_OUTPUT_DIR") {
            opts.output_dir = PathBuf::from(dir);
        }
        if let Some(fill) = lookup("COLLATE_FILL_BYTE") {
            match fill.as_bytes() {
                [b] if b.is_ascii() => opts.fill_byte = *b,
                _ => {
                    return Err(CollateError::Config(format!(
                        "COLLATE_FILL_BYTE must be one ASCII character, got {fill:?}"
                    )));
                }
            }
        }
        if let Some(secs) = lookup("COLLATE_TIMEOUT_SECS") {
            let secs: u64 = secs.parse().map_err(|_| {
                CollateError::Config(format!("COLLATE_TIMEOUT_SECS is not an integer: {secs:?}"))
            })?;
            opts.collective_timeout = Some(Duration::from_secs(secs));
        }
        Ok(opts)
    }
}
