use serde::Serialize;

/// Plain confirmation body, optionally flagged with `success`.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: None,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: Some(true),
            message: message.into(),
        }
    }
}
