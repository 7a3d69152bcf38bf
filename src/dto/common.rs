use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::error::{AppError, AppResult};

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_LIMIT: i64 = 10;

/// Success envelope. Failures use the same shape through `AppError`.
#[derive(Debug)]
pub struct ApiResponse<T> {
    pub status: StatusCode,
    pub message: String,
    pub data: T,
}

#[derive(Serialize)]
struct Envelope<T> {
    status: bool,
    code: u16,
    message: String,
    data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            status: StatusCode::OK,
            message: message.into(),
            data,
        }
    }

    pub fn created(message: impl Into<String>, data: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            message: message.into(),
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let body = Envelope {
            status: self.status.is_success(),
            code: self.status.as_u16(),
            message: self.message,
            data: self.data,
        };
        (self.status, Json(body)).into_response()
    }
}

/// Normalized 1-indexed page window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl PageRequest {
    /// Missing or non-positive values fall back to the defaults.
    pub fn normalize(page: Option<i64>, limit: Option<i64>) -> Self {
        let page = page.filter(|page| *page >= 1).unwrap_or(DEFAULT_PAGE);
        let limit = limit.filter(|limit| *limit >= 1).unwrap_or(DEFAULT_LIMIT);
        Self { page, limit }
    }

    /// Raw query values; anything that is not an integer counts as missing.
    pub fn from_params(page: Option<&str>, limit: Option<&str>) -> Self {
        let parse = |raw: Option<&str>| raw.and_then(|value| value.trim().parse::<i64>().ok());
        Self::normalize(parse(page), parse(limit))
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    pub fn total_pages(&self, total: i64) -> i64 {
        if total <= 0 {
            0
        } else {
            (total - 1) / self.limit + 1
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    #[serde(rename = "totalPages")]
    pub total_pages: i64,
}

impl<T> Paginated<T> {
    pub fn new(data: Vec<T>, total: i64, window: PageRequest) -> Self {
        Self {
            data,
            total,
            page: window.page,
            limit: window.limit,
            total_pages: window.total_pages(total),
        }
    }
}

/// Splits a comma-separated query value, dropping blanks.
pub fn split_csv(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parses a comma-separated list of integer ids for the `field` filter.
pub fn parse_id_list(field: &str, raw: Option<&str>) -> AppResult<Vec<i64>> {
    split_csv(raw)
        .iter()
        .map(|item| {
            item.parse::<i64>().map_err(|_| {
                AppError::ValidationError(format!("Invalid id '{item}' in {field}"))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_defaults_without_upper_cap() {
        assert_eq!(
            PageRequest::normalize(None, None),
            PageRequest { page: 1, limit: 10 }
        );
        assert_eq!(
            PageRequest::normalize(Some(0), Some(-5)),
            PageRequest { page: 1, limit: 10 }
        );
        assert_eq!(
            PageRequest::normalize(Some(3), Some(500)),
            PageRequest { page: 3, limit: 500 }
        );
    }

    #[test]
    fn unparseable_page_params_fall_back_to_defaults() {
        assert_eq!(
            PageRequest::from_params(Some("abc"), Some("x")),
            PageRequest { page: 1, limit: 10 }
        );
        assert_eq!(
            PageRequest::from_params(Some(" 4 "), Some("")),
            PageRequest { page: 4, limit: 10 }
        );
        assert_eq!(
            PageRequest::from_params(None, Some("25")),
            PageRequest { page: 1, limit: 25 }
        );
    }

    #[test]
    fn offset_and_total_pages() {
        let window = PageRequest::normalize(Some(3), Some(10));
        assert_eq!(window.offset(), 20);
        assert_eq!(window.total_pages(0), 0);
        assert_eq!(window.total_pages(10), 1);
        assert_eq!(window.total_pages(21), 3);
        assert_eq!(PageRequest::normalize(None, Some(i64::MAX)).total_pages(5), 1);
    }

    #[test]
    fn csv_lists_skip_blanks() {
        assert_eq!(
            split_csv(Some(" RTLH, ,RUSUS ")),
            vec!["RTLH".to_string(), "RUSUS".to_string()]
        );
        assert_eq!(
            parse_id_list("province_ids", Some("1, 2,,30")).unwrap(),
            vec![1, 2, 30]
        );
        assert!(parse_id_list("province_ids", None).unwrap().is_empty());
    }

    #[test]
    fn id_list_with_garbage_is_a_validation_error() {
        assert!(matches!(
            parse_id_list("province_ids", Some("1,x,30")),
            Err(AppError::ValidationError(message)) if message.contains("province_ids")
        ));
        assert!(parse_id_list("village_ids", Some("abc")).is_err());
    }

    #[test]
    fn paginated_serializes_total_pages_in_camel_case() {
        let page = Paginated::new(vec![1, 2], 12, PageRequest::normalize(Some(1), Some(2)));
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["totalPages"], 6);
        assert_eq!(json["total"], 12);
    }
}
