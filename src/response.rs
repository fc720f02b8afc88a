use serde::Serialize;
use utoipa::ToSchema;

/// Paging info for list responses; empty for single resources.
#[derive(Debug, Serialize, ToSchema, Clone, PartialEq, Eq)]
pub struct Meta {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub total: Option<i64>,
}

impl Meta {
    pub fn new(page: i64, per_page: i64, total: i64) -> Self {
        Self {
            page: Some(page),
            per_page: Some(per_page),
            total: Some(total),
        }
    }

    pub fn empty() -> Self {
        Self {
            page: None,
            per_page: None,
            total: None,
        }
    }
}

/// Success envelope: `{message, data, meta}`.
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

    pub fn paged(
        message: impl Into<String>,
        data: T,
        page: i64,
        per_page: i64,
        total: i64,
    ) -> Self {
        Self::success(message, data, Some(Meta::new(page, per_page, total)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_envelope_carries_paging() {
        let resp = ApiResponse::paged("Things", vec![1, 2], 2, 2, 5);
        let json = serde_json::to_value(&resp).unwrap();

        assert_eq!(json["message"], "Things");
        assert_eq!(json["data"], serde_json::json!([1, 2]));
        assert_eq!(json["meta"]["page"], 2);
        assert_eq!(json["meta"]["per_page"], 2);
        assert_eq!(json["meta"]["total"], 5);
    }

    #[test]
    fn single_resource_meta_is_empty() {
        let resp = ApiResponse::success("Thing", 1, Some(Meta::empty()));
        let json = serde_json::to_value(&resp).unwrap();

        assert!(json["meta"]["page"].is_null());
        assert_eq!(resp.meta, Some(Meta::empty()));
    }
}
