use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type BoardId = String;
pub type UserId = String;

/// A signed-in user as reported by the identity provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub display_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Privacy {
    #[default]
    Private,
    Public,
}

impl Privacy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::Public => "public",
        }
    }
}

impl FromStr for Privacy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "private" => Ok(Self::Private),
            "public" => Ok(Self::Public),
            _ => Err(format!("Invalid privacy: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BackgroundKind {
    Preset,
    Color,
    Upload,
}

/// Banner shown behind a board: a preset image, a CSS colour/gradient, or an
/// uploaded image reference.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Background {
    #[serde(rename = "type")]
    pub kind: BackgroundKind,
    pub value: String,
}

/// Authoritative board document, as stored in the `Boards` collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    pub id: BoardId,
    pub name: String,
    #[serde(default)]
    pub url_name: String,
    pub owner_id: UserId,
    #[serde(default)]
    pub privacy: Privacy,
    #[serde(default)]
    pub members: Vec<UserId>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<Background>,
}

impl Board {
    pub fn is_member(&self, user_id: &str) -> bool {
        self.members.iter().any(|m| m == user_id)
    }

    /// Denormalised copy of this board as the search index holds it.
    pub fn to_reference(&self) -> BoardReference {
        BoardReference {
            id: self.id.clone(),
            name: Some(self.name.clone()),
            owner_id: Some(self.owner_id.clone()),
            members: self.members.clone(),
        }
    }
}

/// A search-index hit. Only `id` is trusted; the other fields may be stale.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BoardReference {
    #[serde(rename = "objectID")]
    pub id: BoardId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "ownerId")]
    pub owner_id: Option<UserId>,
    #[serde(default)]
    pub members: Vec<UserId>,
}

/// A board annotated with the requesting user's pin state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PinnedBoard {
    #[serde(flatten)]
    pub board: Board,
    pub pinned: bool,
}

impl PinnedBoard {
    pub fn id(&self) -> &str {
        &self.board.id
    }
}

/// The three board lists assembled for one user.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BoardLists {
    pub owned: Vec<PinnedBoard>,
    pub shared: Vec<PinnedBoard>,
    pub pinned: Vec<PinnedBoard>,
}

/// Per-user document in the `Users` collection.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UserDoc {
    #[serde(rename = "Boards", default)]
    pub boards: Vec<BoardId>,
    #[serde(rename = "PinnedBoards", default)]
    pub pinned_boards: Vec<BoardId>,
}

impl UserDoc {
    pub fn ids(&self, field: UserArray) -> &[BoardId] {
        match field {
            UserArray::Boards => &self.boards,
            UserArray::PinnedBoards => &self.pinned_boards,
        }
    }

    pub fn ids_mut(&mut self, field: UserArray) -> &mut Vec<BoardId> {
        match field {
            UserArray::Boards => &mut self.boards,
            UserArray::PinnedBoards => &mut self.pinned_boards,
        }
    }

    pub fn is_pinned(&self, board_id: &str) -> bool {
        self.pinned_boards.iter().any(|id| id == board_id)
    }
}

/// Array fields on a user document that support atomic union/remove.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserArray {
    Boards,
    PinnedBoards,
}

impl UserArray {
    pub fn field_name(&self) -> &'static str {
        match self {
            Self::Boards => "Boards",
            Self::PinnedBoards => "PinnedBoards",
        }
    }
}
