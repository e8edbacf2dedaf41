//! Wire message types
//!
//! Devices send JSON text frames; every frame is one of the inbound shapes
//! below, checked in this order:
//! 1. `{"command": "show-drag-area"}`
//! 2. `{"type": "getStageTimes", "stageId": .., "slotId": ..}`; any frame of
//!    this type carrying a `slotId` is a stage time request, even when the
//!    ids do not parse
//! 3. `{"deviceId": ..}`
//!
//! Anything else that parses as JSON is ignored.

use serde::Serialize;
use serde_json::Value;

use crate::models::PacenoteFile;
use crate::query::{StageTimesReply, StageTimesRequest};
use crate::storage::IniDocument;

/// Command asking the desktop shell to show its drop area
pub const SHOW_DRAG_AREA: &str = "show-drag-area";

/// Message type of a stage time request
pub const GET_STAGE_TIMES: &str = "getStageTimes";

/// Messages received from devices
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundMessage {
    ShowDragArea,
    /// `None` when the ids could not be read; answered with `null`
    StageTimes(Option<StageTimesRequest>),
    Identify { device_id: String },
    Unrecognized,
}

impl InboundMessage {
    /// Decode a text frame
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(text)?;
        Ok(Self::from_value(&value))
    }

    fn from_value(value: &Value) -> Self {
        if value.get("command").and_then(Value::as_str) == Some(SHOW_DRAG_AREA) {
            return InboundMessage::ShowDragArea;
        }

        if value.get("type").and_then(Value::as_str) == Some(GET_STAGE_TIMES) {
            if let Some(slot) = value.get("slotId") {
                let stage_id = value.get("stageId").and_then(as_id);
                let request = stage_id
                    .zip(as_id(slot))
                    .map(|(stage_id, slot_id)| StageTimesRequest { stage_id, slot_id });
                return InboundMessage::StageTimes(request);
            }
        }

        match value.get("deviceId") {
            Some(Value::String(id)) if !id.is_empty() => InboundMessage::Identify {
                device_id: id.clone(),
            },
            Some(Value::Number(n)) => InboundMessage::Identify {
                device_id: n.to_string(),
            },
            _ => InboundMessage::Unrecognized,
        }
    }
}

/// Numeric id that may arrive as a JSON number or a numeric string
fn as_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// File push sent to devices
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilePush {
    /// Path relative to the watched subtree
    pub path: String,
    pub data: IniDocument,
    /// Modification time, ISO-8601 UTC with milliseconds
    pub date: String,
}

impl From<&PacenoteFile> for FilePush {
    fn from(file: &PacenoteFile) -> Self {
        FilePush {
            path: file.relative_path.clone(),
            data: file.content.clone(),
            date: file.modified_iso(),
        }
    }
}

/// Replies addressed to one device
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum ReplyMessage {
    #[serde(rename = "stageTimes")]
    StageTimes { data: StageTimesReply },

    /// Raw text of a file dropped on the desktop shell
    #[serde(rename = "file-content")]
    FileContent { content: String },
}

/// Messages sent to devices
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OutboundMessage {
    File(FilePush),
    Reply(ReplyMessage),
}

impl OutboundMessage {
    /// Create a file push
    pub fn file(file: &PacenoteFile) -> Self {
        OutboundMessage::File(FilePush::from(file))
    }

    /// Create a stage time reply
    pub fn stage_times(data: StageTimesReply) -> Self {
        OutboundMessage::Reply(ReplyMessage::StageTimes { data })
    }

    /// Create a dropped file relay
    pub fn file_content(content: String) -> Self {
        OutboundMessage::Reply(ReplyMessage::FileContent { content })
    }

    /// Encode message to JSON text
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use std::path::PathBuf;

    #[test]
    fn test_parse_identify() {
        assert_eq!(
            InboundMessage::parse(r#"{"deviceId":"phone1"}"#).unwrap(),
            InboundMessage::Identify {
                device_id: "phone1".to_string()
            }
        );
        assert_eq!(
            InboundMessage::parse(r#"{"deviceId":42}"#).unwrap(),
            InboundMessage::Identify {
                device_id: "42".to_string()
            }
        );
    }

    #[test]
    fn test_parse_empty_or_missing_device_id() {
        assert_eq!(
            InboundMessage::parse(r#"{"deviceId":""}"#).unwrap(),
            InboundMessage::Unrecognized
        );
        assert_eq!(
            InboundMessage::parse(r#"{"hello":"world"}"#).unwrap(),
            InboundMessage::Unrecognized
        );
        assert_eq!(
            InboundMessage::parse("[1,2]").unwrap(),
            InboundMessage::Unrecognized
        );
    }

    #[test]
    fn test_parse_stage_times() {
        assert_eq!(
            InboundMessage::parse(r#"{"type":"getStageTimes","stageId":10,"slotId":"5"}"#)
                .unwrap(),
            InboundMessage::StageTimes(Some(StageTimesRequest {
                stage_id: 10,
                slot_id: 5
            }))
        );
    }

    #[test]
    fn test_stage_times_with_unreadable_ids() {
        let msg = InboundMessage::parse(r#"{"type":"getStageTimes","slotId":5,"deviceId":"a"}"#)
            .unwrap();
        assert_eq!(msg, InboundMessage::StageTimes(None));

        let msg = InboundMessage::parse(r#"{"type":"getStageTimes","stageId":1,"slotId":"x"}"#)
            .unwrap();
        assert_eq!(msg, InboundMessage::StageTimes(None));
    }

    #[test]
    fn test_command_takes_precedence() {
        let msg = InboundMessage::parse(
            r#"{"command":"show-drag-area","type":"getStageTimes","slotId":1,"deviceId":"a"}"#,
        )
        .unwrap();
        assert_eq!(msg, InboundMessage::ShowDragArea);

        let msg =
            InboundMessage::parse(r#"{"type":"getStageTimes","stageId":1,"slotId":2,"deviceId":"a"}"#)
                .unwrap();
        assert!(matches!(msg, InboundMessage::StageTimes(_)));
    }

    #[test]
    fn test_stage_times_without_slot_falls_through() {
        let msg = InboundMessage::parse(r#"{"type":"getStageTimes","stageId":1,"deviceId":"a"}"#)
            .unwrap();
        assert_eq!(
            msg,
            InboundMessage::Identify {
                device_id: "a".to_string()
            }
        );
    }

    #[test]
    fn test_parse_invalid_json() {
        assert!(InboundMessage::parse("not json").is_err());
    }

    #[test]
    fn test_file_push_shape() {
        let file = PacenoteFile {
            path: PathBuf::from("/game/Plugins/NGPCarMenu/MyPacenotes/stage1.ini"),
            relative_path: "stage1.ini".to_string(),
            content: IniDocument::parse("[Notes]\ncount=2\n").unwrap(),
            modified: Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap(),
        };

        let value = serde_json::to_value(OutboundMessage::file(&file)).unwrap();
        assert_eq!(
            value,
            json!({
                "path": "stage1.ini",
                "data": { "Notes": { "count": "2" } },
                "date": "2024-03-09T14:05:07.000Z"
            })
        );
    }

    #[test]
    fn test_reply_shapes() {
        assert_eq!(
            OutboundMessage::file_content("[a]\nb=1".to_string())
                .encode()
                .unwrap(),
            r#"{"type":"file-content","content":"[a]\nb=1"}"#
        );
        assert_eq!(
            serde_json::to_value(OutboundMessage::stage_times(StageTimesReply::Failure {
                error: "Car slot ID 3 not found in Cars.ini".to_string()
            }))
            .unwrap(),
            json!({ "type": "stageTimes", "data": { "error": "Car slot ID 3 not found in Cars.ini" } })
        );
    }
}
