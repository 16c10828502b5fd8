pub mod attempt;
pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use crate::services::{
    assignment_service::AssignmentService, dashboard_service::DashboardService,
    invoice_service::InvoiceService, message_service::MessageService,
    school_service::SchoolService, subject_service::SubjectService,
    submission_service::SubmissionService, test_service::TestService, user_service::UserService,
};
use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub test_service: TestService,
    pub submission_service: SubmissionService,
    pub user_service: UserService,
    pub school_service: SchoolService,
    pub subject_service: SubjectService,
    pub assignment_service: AssignmentService,
    pub invoice_service: InvoiceService,
    pub message_service: MessageService,
    pub dashboard_service: DashboardService,
}

impl AppState {
    pub fn new(pool: PgPool) -> Self {
        let test_service = TestService::new(pool.clone());
        let submission_service = SubmissionService::new(pool.clone());
        let user_service = UserService::new(pool.clone());
        let school_service = SchoolService::new(pool.clone());
        let subject_service = SubjectService::new(pool.clone());
        let assignment_service = AssignmentService::new(pool.clone());
        let invoice_service = InvoiceService::new(pool.clone());
        let message_service = MessageService::new(pool.clone());
        let dashboard_service = DashboardService::new(pool.clone());

        Self {
            pool,
            test_service,
            submission_service,
            user_service,
            school_service,
            subject_service,
            assignment_service,
            invoice_service,
            message_service,
            dashboard_service,
        }
    }
}
