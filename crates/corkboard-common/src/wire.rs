//! Request and response bodies of the HTTP API.

use serde::{Deserialize, Serialize};

use crate::models::{Background, BoardReference, Privacy};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PinBoardRequest {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub board_id: String,
}

/// Result of a toggle-on-write: `pinned` is the state the server now holds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PinBoardResponse {
    pub message: String,
    pub pinned: bool,
}

impl PinBoardResponse {
    pub fn new(pinned: bool) -> Self {
        let message = if pinned { "Board pinned" } else { "Board unpinned" };
        Self {
            message: message.to_string(),
            pinned,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBoardRequest {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub privacy: Option<Privacy>,
    #[serde(default)]
    pub background: Option<Background>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateBoardResponse {
    pub board_id: String,
}

/// A free-text search hit, tagged with its result type for the command palette.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    #[serde(flatten)]
    pub reference: BoardReference,
    #[serde(rename = "type")]
    pub kind: String,
}

impl From<BoardReference> for SearchHit {
    fn from(reference: BoardReference) -> Self {
        Self {
            reference,
            kind: "board".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pin_board_response_message_tracks_state() {
        assert_eq!(PinBoardResponse::new(true).message, "Board pinned");
        assert_eq!(PinBoardResponse::new(false).message, "Board unpinned");
    }

    #[test]
    fn test_pin_board_request_uses_camel_case() {
        let req: PinBoardRequest =
            serde_json::from_str(r#"{"userId":"u1","boardId":"b1"}"#).unwrap();
        assert_eq!(req.user_id, "u1");
        assert_eq!(req.board_id, "b1");
    }

    #[test]
    fn test_missing_request_fields_default_to_empty() {
        let req: PinBoardRequest = serde_json::from_str(r#"{"boardId":"b1"}"#).unwrap();
        assert!(req.user_id.is_empty());

        let req: CreateBoardRequest = serde_json::from_str(r#"{"userId":"u1"}"#).unwrap();
        assert!(req.title.is_empty());
        assert!(req.privacy.is_none());
    }

    #[test]
    fn test_search_hit_is_tagged_board() {
        let hit = SearchHit::from(BoardReference {
            id: "b1".into(),
            name: Some("Roadmap".into()),
            owner_id: None,
            members: vec![],
        });
        let json = serde_json::to_value(&hit).unwrap();
        assert_eq!(json["type"], "board");
        assert_eq!(json["objectID"], "b1");
    }
}
