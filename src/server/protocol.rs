//! JSON bodies exchanged with the HTTP API.

use serde::{Deserialize, Serialize};

/// `POST /upload` success body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub message: String,
    pub details: UploadDetails,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadDetails {
    pub chunks_added: usize,
}

impl UploadResponse {
    pub fn ingested(chunks_added: usize) -> Self {
        Self {
            message: "File ingested".to_string(),
            details: UploadDetails { chunks_added },
        }
    }
}

/// `POST /query` query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryParams {
    #[serde(default)]
    pub question: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub backend: String,
    pub entries: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_response_shape() {
        let json = serde_json::to_value(UploadResponse::ingested(3)).unwrap();
        assert_eq!(json["message"], "File ingested");
        assert_eq!(json["details"]["chunks_added"], 3);
    }
}
