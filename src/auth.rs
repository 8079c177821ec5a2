//! Caller identity extraction
//!
//! Authentication happens upstream; requests arrive with the verified
//! WebID in the x-webid header. A missing header means the public
//! identity, a present-but-unusable header is an authentication error.

use axum::http::HeaderMap;
use podsearch_backend::error::SearchError;
use podsearch_backend::search::PUBLIC_USER_ID;

/// Header carrying the authenticated caller identity
pub const WEBID_HEADER: &str = "x-webid";

/// The acting subject of a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Agent(String),
    Public,
}

impl Identity {
    /// Identity string as stored in document_access.user_id
    pub fn as_str(&self) -> &str {
        match self {
            Identity::Agent(webid) => webid,
            Identity::Public => PUBLIC_USER_ID,
        }
    }
}

/// Extract the caller identity from request headers.
pub fn extract_identity(headers: &HeaderMap) -> Result<Identity, SearchError> {
    let Some(value) = headers.get(WEBID_HEADER) else {
        return Ok(Identity::Public);
    };

    let webid = value.to_str().map_err(|_| {
        SearchError::AuthenticationRejected(format!("{} header is not valid UTF-8", WEBID_HEADER))
    })?;

    let webid = webid.trim();
    if webid.is_empty() {
        return Err(SearchError::AuthenticationRejected(format!(
            "{} header is empty",
            WEBID_HEADER
        )));
    }

    Ok(Identity::Agent(webid.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_missing_header_is_public() {
        let headers = HeaderMap::new();
        assert_eq!(extract_identity(&headers).unwrap(), Identity::Public);
        assert_eq!(Identity::Public.as_str(), "public");
    }

    #[test]
    fn test_present_header_is_agent() {
        let mut headers = HeaderMap::new();
        headers.insert(
            WEBID_HEADER,
            HeaderValue::from_static("https://alice.example/profile/card#me"),
        );
        let identity = extract_identity(&headers).unwrap();
        assert_eq!(identity.as_str(), "https://alice.example/profile/card#me");
    }

    #[test]
    fn test_empty_header_is_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert(WEBID_HEADER, HeaderValue::from_static("   "));
        assert!(matches!(
            extract_identity(&headers),
            Err(SearchError::AuthenticationRejected(_))
        ));
    }
}
