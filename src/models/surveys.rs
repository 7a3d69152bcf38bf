use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Decision recorded for one approval stage, mapped to survey.stage_status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "survey.stage_status")]
pub enum StageStatus {
    Pending,
    Approved,
    Rejected,
}

/// Computed workflow state of a survey. Never stored.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum SurveyStatus {
    Draft,
    WaitingBalai,
    WaitingEselon1,
    Verified,
    RejectedByBalai,
    RejectedByEselon1,
}

impl SurveyStatus {
    /// Derives the workflow state. First matching rule wins.
    pub fn derive(is_submitted: bool, balai: StageStatus, eselon1: StageStatus) -> Self {
        use StageStatus::*;

        if !is_submitted {
            return Self::Draft;
        }
        match (balai, eselon1) {
            (Rejected, _) => Self::RejectedByBalai,
            (Pending, _) => Self::WaitingBalai,
            (Approved, Pending) => Self::WaitingEselon1,
            (Approved, Rejected) => Self::RejectedByEselon1,
            (Approved, Approved) => Self::Verified,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Draft => "Draf",
            Self::WaitingBalai => "Laporan Menunggu Verifikasi Balai",
            Self::WaitingEselon1 => "Laporan Menunggu Verifikasi Eselon 1",
            Self::Verified => "Laporan Terverifikasi",
            Self::RejectedByBalai => "Laporan Reject (Balai)",
            Self::RejectedByEselon1 => "Laporan Reject (Eselon 1)",
        }
    }

    /// Owners may edit a survey until the Balai stage has ruled on it.
    pub fn is_owner_editable(self) -> bool {
        matches!(self, Self::Draft | Self::WaitingBalai)
    }
}

/// True when the stage columns respect the pipeline order: Eselon 1 can
/// only rule once Balai has approved.
pub fn stages_consistent(balai: StageStatus, eselon1: StageStatus) -> bool {
    balai == StageStatus::Approved || eselon1 == StageStatus::Pending
}

/// Survey model mapped to survey.survey.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Survey {
    pub id: Uuid,
    pub user_id: Uuid,
    pub address: String,
    pub coordinate: String,
    pub survey_type: String,
    pub status_balai: StageStatus,
    pub status_eselon1: StageStatus,
    pub is_submitted: bool,
    pub notes: Option<String>,
    pub images: Vec<String>,
    pub province_id: i64,
    pub district_id: i64,
    pub subdistrict_id: i64,
    pub village_id: i64,
    pub program_id: Option<i64>,
    pub program_type_id: Option<i64>,
    pub resource_id: Option<i64>,
    pub created_by: String,
    pub updated_by: Option<String>,
    pub deleted_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Survey {
    pub fn status(&self) -> SurveyStatus {
        SurveyStatus::derive(self.is_submitted, self.status_balai, self.status_eselon1)
    }
}

#[cfg(test)]
mod tests {
    use super::{StageStatus, SurveyStatus, stages_consistent};
    use std::collections::HashSet;

    const STAGES: [StageStatus; 3] = [
        StageStatus::Pending,
        StageStatus::Approved,
        StageStatus::Rejected,
    ];

    #[test]
    fn unsubmitted_is_always_draft() {
        for balai in STAGES {
            for eselon1 in STAGES {
                assert_eq!(SurveyStatus::derive(false, balai, eselon1), SurveyStatus::Draft);
            }
        }
    }

    #[test]
    fn derivation_follows_precedence() {
        use StageStatus::*;

        let cases = [
            (Pending, Pending, SurveyStatus::WaitingBalai),
            (Pending, Approved, SurveyStatus::WaitingBalai),
            (Pending, Rejected, SurveyStatus::WaitingBalai),
            (Rejected, Pending, SurveyStatus::RejectedByBalai),
            (Rejected, Approved, SurveyStatus::RejectedByBalai),
            (Rejected, Rejected, SurveyStatus::RejectedByBalai),
            (Approved, Pending, SurveyStatus::WaitingEselon1),
            (Approved, Rejected, SurveyStatus::RejectedByEselon1),
            (Approved, Approved, SurveyStatus::Verified),
        ];

        for (balai, eselon1, expected) in cases {
            assert_eq!(
                SurveyStatus::derive(true, balai, eselon1),
                expected,
                "balai={balai:?} eselon1={eselon1:?}"
            );
        }
    }

    #[test]
    fn derivation_is_deterministic_and_covers_every_state() {
        let mut seen = HashSet::new();
        for submitted in [false, true] {
            for balai in STAGES {
                for eselon1 in STAGES {
                    let first = SurveyStatus::derive(submitted, balai, eselon1);
                    let second = SurveyStatus::derive(submitted, balai, eselon1);
                    assert_eq!(first, second);
                    seen.insert(first);
                }
            }
        }
        assert_eq!(seen.len(), 6);
    }

    #[test]
    fn only_early_states_are_owner_editable() {
        assert!(SurveyStatus::Draft.is_owner_editable());
        assert!(SurveyStatus::WaitingBalai.is_owner_editable());
        assert!(!SurveyStatus::WaitingEselon1.is_owner_editable());
        assert!(!SurveyStatus::Verified.is_owner_editable());
        assert!(!SurveyStatus::RejectedByBalai.is_owner_editable());
        assert!(!SurveyStatus::RejectedByEselon1.is_owner_editable());
    }

    #[test]
    fn eselon_decision_without_balai_approval_is_inconsistent() {
        assert!(stages_consistent(StageStatus::Pending, StageStatus::Pending));
        assert!(stages_consistent(StageStatus::Approved, StageStatus::Rejected));
        assert!(!stages_consistent(StageStatus::Pending, StageStatus::Approved));
        assert!(!stages_consistent(StageStatus::Rejected, StageStatus::Rejected));
    }
}
