//! render_json.rs: pretty JSON for any report value (election report,
//! simulation report). Field order follows struct layout.

use serde::Serialize;

use crate::ReportError;

pub fn render_json<T: Serialize>(value: &T) -> Result<String, ReportError> {
    serde_json::to_string_pretty(value).map_err(|e| ReportError::Serialize(e.to_string()))
}
