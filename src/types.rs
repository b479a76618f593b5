use serde::Serialize;

/// A validated lead-capture submission. All fields are trimmed; blank optional
/// fields are `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeadRequest {
    pub name: String,
    pub phone: String,
    pub location: String,
    pub message: Option<String>,
    pub preferred_date: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NotifyResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
}

impl NotifyResponse {
    pub fn sent(message_id: Option<String>) -> Self {
        Self {
            success: true,
            error: None,
            details: None,
            message_id,
        }
    }

    pub fn failed(error: &str, details: Option<String>) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
            details,
            message_id: None,
        }
    }
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub channels: Vec<String>,
}
