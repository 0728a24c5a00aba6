use serde::Serialize;
use utoipa::ToSchema;

/// Pagination block attached to list responses. Single-object responses carry
/// an empty block, which serializes as `{}`.
#[derive(Debug, Serialize, ToSchema, Clone, PartialEq, Eq)]
pub struct Meta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<i64>,
}

impl Meta {
    pub fn new(page: i64, per_page: i64, total: u64) -> Self {
        let total = i64::try_from(total).unwrap_or(i64::MAX);
        let total_pages = if per_page > 0 {
            (total + per_page - 1) / per_page
        } else {
            0
        };
        Self {
            page: Some(page),
            per_page: Some(per_page),
            total: Some(total),
            total_pages: Some(total_pages),
        }
    }

    pub fn empty() -> Self {
        Self {
            page: None,
            per_page: None,
            total: None,
            total_pages: None,
        }
    }
}

/// Envelope shared by every JSON response, errors included.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub message: String,
    pub data: Option<T>,
    pub meta: Option<Meta>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: T, meta: Option<Meta>) -> Self {
        Self {
            message: message.into(),
            data: Some(data),
            meta,
        }
    }
}

impl ApiResponse<serde_json::Value> {
    /// Response without a payload, e.g. after a delete.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            data: Some(serde_json::json!({})),
            meta: Some(Meta::empty()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_pages_rounds_up() {
        assert_eq!(Meta::new(1, 20, 0).total_pages, Some(0));
        assert_eq!(Meta::new(1, 20, 20).total_pages, Some(1));
        assert_eq!(Meta::new(2, 20, 41).total_pages, Some(3));
    }

    #[test]
    fn empty_meta_serializes_without_fields() {
        let body = serde_json::to_value(ApiResponse::message("Deleted")).unwrap();
        assert_eq!(body["message"], "Deleted");
        assert_eq!(body["meta"], serde_json::json!({}));
    }
}
