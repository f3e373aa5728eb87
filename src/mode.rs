//! Permission mode — how much autonomy the launched tool is granted.
//!
//! `PermissionMode` is used as the `--mode` CLI flag value. It determines
//! which sandbox/approval flags are passed to the tool at spawn time.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Autonomy/sandboxing policy for the launched tool.
///
/// Passed as `--mode` on the command line or set in the config file.
/// Defaults to [`PermissionMode::Default`].
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PermissionMode {
    /// No extra flags; the tool's own approval gating applies.
    #[default]
    Default,
    /// Force a read-only execution sandbox.
    ReadOnly,
    /// Auto-execute inside a write-capable sandbox, approval only on failure.
    SafeYolo,
    /// Disable all approval and sandboxing. Dangerous.
    Yolo,
}

impl PermissionMode {
    /// Command-line flags the tool receives for this mode.
    ///
    /// The mapping is exhaustive; passthrough arguments supplied by the
    /// caller are appended after these flags, never interleaved.
    #[must_use]
    pub fn cli_flags(self) -> &'static [&'static str] {
        match self {
            Self::Default => &[],
            Self::ReadOnly => &["--sandbox", "read-only"],
            Self::SafeYolo => &["--full-auto"],
            Self::Yolo => &["--dangerously-bypass-approvals-and-sandbox"],
        }
    }

    /// Whether this mode removes every safety rail.
    #[must_use]
    pub fn is_dangerous(self) -> bool {
        matches!(self, Self::Yolo)
    }
}
