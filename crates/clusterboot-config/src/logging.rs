use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Output encoding for controller log lines.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// One JSON object per event, for the log shipper.
    #[default]
    Json,
    /// Terse human-readable lines for interactive runs.
    Compact,
}
