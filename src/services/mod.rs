pub mod assignment_service;
pub mod dashboard_service;
pub mod grading_service;
pub mod invoice_service;
pub mod message_service;
pub mod school_service;
pub mod subject_service;
pub mod submission_service;
pub mod test_service;
pub mod user_service;
