use crate::models::ScanReport;
use super::FormatError;

/// Serialize a ScanReport to pretty-printed JSON
pub fn to_json(report: &ScanReport) -> Result<String, FormatError> {
    serde_json::to_string_pretty(report).map_err(FormatError::from)
}
