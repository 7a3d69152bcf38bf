use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{dto::common::PageRequest, models::comments::Comment};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCommentRequest {
    pub survey_id: Uuid,
    #[serde(default)]
    pub parent_id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub detail: String,
    #[serde(default)]
    pub images: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateCommentRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub detail: String,
    #[serde(default)]
    pub images: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CommentListQuery {
    pub survey: Option<Uuid>,
    pub q: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl CommentListQuery {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::from_params(self.page.as_deref(), self.limit.as_deref())
    }

    pub fn keyword(&self) -> Option<String> {
        self.q
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    }
}

/// Comment node; `children` holds replies ordered by creation.
#[derive(Debug, Clone, Serialize)]
pub struct CommentResponse {
    pub id: i64,
    pub user_id: Option<Uuid>,
    pub survey_id: Uuid,
    pub parent_id: i64,
    pub name: String,
    pub detail: String,
    pub is_resolved: bool,
    pub images: Vec<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub resolved_by: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<CommentResponse>,
}

impl From<Comment> for CommentResponse {
    fn from(comment: Comment) -> Self {
        Self {
            id: comment.id,
            user_id: comment.user_id,
            survey_id: comment.survey_id,
            parent_id: comment.parent_id,
            name: comment.name,
            detail: comment.detail,
            is_resolved: comment.is_resolved,
            images: comment.images,
            created_by: comment.created_by,
            created_at: comment.created_at,
            resolved_by: comment.resolved_by,
            resolved_at: comment.resolved_at,
            children: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActionCommentRequest {
    pub comment_id: i64,
    #[serde(default)]
    pub action: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ActionCommentResult {
    pub affected: u64,
}
