use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    dto::common::{PageRequest, parse_id_list, split_csv},
    error::AppResult,
    models::surveys::{StageStatus, Survey, SurveyStatus},
};

/// Body of create and update. Missing text fields deserialize empty so the
/// required-field check can report them.
#[derive(Debug, Clone, Deserialize)]
pub struct SurveyRequest {
    pub user_id: Uuid,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub coordinate: String,
    #[serde(default, rename = "type")]
    pub survey_type: String,
    #[serde(default)]
    pub is_submitted: bool,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub province_id: i64,
    #[serde(default)]
    pub district_id: i64,
    #[serde(default)]
    pub subdistrict_id: i64,
    #[serde(default)]
    pub village_id: i64,
    pub program_id: Option<i64>,
    pub program_type_id: Option<i64>,
    pub resource_id: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SurveyListQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub address: Option<String>,
    pub user_id: Option<Uuid>,
    pub types: Option<String>,
    pub province_ids: Option<String>,
    pub district_ids: Option<String>,
    pub subdistrict_ids: Option<String>,
    pub village_ids: Option<String>,
    pub program_ids: Option<String>,
    pub program_type_ids: Option<String>,
    pub resource_ids: Option<String>,
}

/// Client filters after parsing. Empty lists mean "no filter".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SurveyFilters {
    pub address: Option<String>,
    pub owner_id: Option<Uuid>,
    pub types: Vec<String>,
    pub province_ids: Vec<i64>,
    pub district_ids: Vec<i64>,
    pub subdistrict_ids: Vec<i64>,
    pub village_ids: Vec<i64>,
    pub program_ids: Vec<i64>,
    pub program_type_ids: Vec<i64>,
    pub resource_ids: Vec<i64>,
}

impl SurveyListQuery {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::from_params(self.page.as_deref(), self.limit.as_deref())
    }

    /// `allow_owner_filter` gates the `user_id` parameter by role. An id list
    /// with an entry that is not an integer is rejected rather than ignored.
    pub fn filters(&self, allow_owner_filter: bool) -> AppResult<SurveyFilters> {
        Ok(SurveyFilters {
            address: self
                .address
                .as_deref()
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string),
            owner_id: self.user_id.filter(|_| allow_owner_filter),
            types: split_csv(self.types.as_deref()),
            province_ids: parse_id_list("province_ids", self.province_ids.as_deref())?,
            district_ids: parse_id_list("district_ids", self.district_ids.as_deref())?,
            subdistrict_ids: parse_id_list("subdistrict_ids", self.subdistrict_ids.as_deref())?,
            village_ids: parse_id_list("village_ids", self.village_ids.as_deref())?,
            program_ids: parse_id_list("program_ids", self.program_ids.as_deref())?,
            program_type_ids: parse_id_list("program_type_ids", self.program_type_ids.as_deref())?,
            resource_ids: parse_id_list("resource_ids", self.resource_ids.as_deref())?,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SurveyResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub user_email: Option<String>,
    pub address: String,
    pub coordinate: String,
    #[serde(rename = "type")]
    pub survey_type: String,
    pub is_submitted: bool,
    pub status: &'static str,
    pub status_balai: StageStatus,
    pub status_eselon1: StageStatus,
    pub notes: Option<String>,
    pub images: Vec<String>,
    pub province_id: i64,
    pub district_id: i64,
    pub subdistrict_id: i64,
    pub village_id: i64,
    pub program_id: Option<i64>,
    pub program_type_id: Option<i64>,
    pub resource_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SurveyResponse {
    pub fn from_survey(survey: Survey, user_email: Option<String>) -> Self {
        let status: SurveyStatus = survey.status();
        Self {
            id: survey.id,
            user_id: survey.user_id,
            user_email,
            address: survey.address,
            coordinate: survey.coordinate,
            survey_type: survey.survey_type,
            is_submitted: survey.is_submitted,
            status: status.label(),
            status_balai: survey.status_balai,
            status_eselon1: survey.status_eselon1,
            notes: survey.notes,
            images: survey.images,
            province_id: survey.province_id,
            district_id: survey.district_id,
            subdistrict_id: survey.subdistrict_id,
            village_id: survey.village_id,
            program_id: survey.program_id,
            program_type_id: survey.program_type_id,
            resource_id: survey.resource_id,
            created_at: survey.created_at,
            updated_at: survey.updated_at,
        }
    }
}

/// Body of the bulk stage decision. Ids arrive as strings so a malformed
/// one is reported as a validation error rather than a JSON error.
#[derive(Debug, Clone, Deserialize)]
pub struct ActionSurveyRequest {
    #[serde(default)]
    pub survey_ids: Vec<String>,
    #[serde(default)]
    pub action: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedSurvey {
    pub survey_id: Uuid,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionSurveyResult {
    pub success_count: usize,
    pub failed_count: usize,
    pub failed_details: Vec<FailedSurvey>,
}

impl ActionSurveyResult {
    pub fn message(&self, action: &str) -> String {
        format!(
            "{} {} surveys, {} failed",
            action.trim(),
            self.success_count,
            self.failed_count
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerificationSummary {
    pub total: i64,
    pub verified_count: i64,
    pub percent: f64,
}
