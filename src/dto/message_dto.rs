use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub recipient_id: Uuid,
    #[validate(length(min = 1, max = 4000))]
    pub body: String,
}
