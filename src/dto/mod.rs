pub mod admin_dto;
pub mod auth_dto;
pub mod message_dto;
pub mod staff_dto;
pub mod student_dto;

use serde::Serialize;

/// Standard success envelope for student-facing endpoints:
/// `{ "success": true, "data": { ... } }`.
#[derive(Debug, Clone, Serialize)]
pub struct ApiEnvelope<T: Serialize> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> ApiEnvelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}
