use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::models::{comments::CommentAction, roles::ApprovalStage, surveys::StageStatus};

#[derive(Debug, Serialize)]
#[serde(tag = "event_type")]
pub enum BusinessEvent {
    SurveyCreated {
        survey_id: Uuid,
        owner_id: Uuid,
        is_submitted: bool,
    },
    SurveyUpdated {
        survey_id: Uuid,
        actor_id: Uuid,
        submitted_now: bool,
    },
    SurveyDeleted {
        survey_id: Uuid,
        actor_id: Uuid,
    },
    SurveysActioned {
        actor_id: Uuid,
        stage: ApprovalStage,
        decision: StageStatus,
        success_count: usize,
        failed_count: usize,
    },
    CommentCreated {
        comment_id: i64,
        survey_id: Uuid,
        parent_id: i64,
        author_id: Option<Uuid>,
    },
    CommentUpdated {
        comment_id: i64,
        actor_id: Uuid,
    },
    CommentDeleted {
        comment_id: i64,
        actor_id: Uuid,
    },
    CommentThreadModerated {
        comment_id: i64,
        survey_id: Uuid,
        actor_id: Uuid,
        action: CommentAction,
        affected: u64,
    },
}

impl BusinessEvent {
    pub fn log(&self) {
        let event_json = serde_json::to_string(self).unwrap_or_else(|_| format!("{:?}", self));
        info!(
            target: "business_events",
            event = %event_json,
            "Business event occurred"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_event_type_tag() {
        let event = BusinessEvent::SurveysActioned {
            actor_id: Uuid::nil(),
            stage: ApprovalStage::Balai,
            decision: StageStatus::Approved,
            success_count: 2,
            failed_count: 1,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event_type"], "SurveysActioned");
        assert_eq!(json["stage"], "balai");
        assert_eq!(json["decision"], "Approved");
        assert_eq!(json["failed_count"], 1);
    }
}
