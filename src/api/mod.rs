pub mod search;
pub mod server;

use serde::Serialize;

#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: 200,
            message: "success".to_string(),
            data: Some(data),
        }
    }

    pub fn error(code: i32, message: &str) -> Self {
        Self {
            code,
            message: message.to_string(),
            data: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_envelope_shape() {
        let ok = serde_json::to_value(ApiResponse::success(vec!["a"])).unwrap();
        assert_eq!(ok["code"], 200);
        assert_eq!(ok["message"], "success");
        assert_eq!(ok["data"][0], "a");

        let err = serde_json::to_value(ApiResponse::<()>::error(500, "Internal search error")).unwrap();
        assert_eq!(err["code"], 500);
        assert_eq!(err["message"], "Internal search error");
        assert!(err.get("data").is_none());
    }
}
