use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Parent id carried by root comments.
pub const ROOT_PARENT_ID: i64 = 0;

/// Moderation action applied to a whole comment thread.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CommentAction {
    Resolved,
    Unresolved,
}

impl CommentAction {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "Resolved" => Some(Self::Resolved),
            "Unresolved" => Some(Self::Unresolved),
            _ => None,
        }
    }

    pub fn is_resolved(self) -> bool {
        self == Self::Resolved
    }
}

/// Comment model mapped to survey.comment.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Comment {
    pub id: i64,
    pub user_id: Option<Uuid>,
    pub survey_id: Uuid,
    pub parent_id: i64,
    pub is_resolved: bool,
    pub name: String,
    pub detail: String,
    pub images: Vec<String>,
    pub resolved_by: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_by: String,
    pub updated_by: Option<String>,
    pub deleted_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Parent link of one comment, enough to walk a thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRow)]
pub struct CommentLink {
    pub id: i64,
    pub parent_id: i64,
}
