use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use school_backend::{
    config::{get_config, init_config},
    database::pool::create_pool,
    middleware::auth,
    routes, AppState,
};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    init_config()?;
    let config = get_config();

    let pool = create_pool().await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let app_state = AppState::new(pool);

    {
        // the client timer is best-effort; the server closes test windows
        let state = app_state.clone();
        let grace = config.submission_grace_seconds;
        tokio::spawn(async move {
            loop {
                match state.test_service.sweep_expired(grace).await {
                    Ok(0) => {}
                    Ok(n) => info!(closed = n, "Closed expired tests"),
                    Err(e) => tracing::error!(error = ?e, "Test sweeper error"),
                }
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
        });
    }

    let base_routes = Router::new().route("/health", get(routes::health::health));

    let auth_api = Router::new()
        .route("/api/auth/login", post(routes::auth::login))
        .layer(axum::middleware::from_fn_with_state(
            school_backend::middleware::rate_limit::new_rps_state(config.auth_rps),
            school_backend::middleware::rate_limit::rps_middleware,
        ));

    let student_api = Router::new()
        .route("/api/student/tests", get(routes::student::list_tests))
        .route("/api/student/tests/submit", post(routes::student::submit_test))
        .route("/api/student/tests/:id", get(routes::student::get_test))
        .route(
            "/api/student/tests/:id/result",
            get(routes::student::get_result),
        )
        .route("/api/student/invoices", get(routes::student::list_invoices))
        .route(
            "/api/student/invoices/:id",
            get(routes::student::get_invoice),
        )
        .route(
            "/api/student/assignments",
            get(routes::student::list_assignments),
        )
        .route(
            "/api/student/assignments/:id/submit",
            post(routes::student::submit_assignment),
        )
        .layer(axum::middleware::from_fn(auth::require_student));

    let staff_api = Router::new()
        .route(
            "/api/staff/tests",
            get(routes::staff::list_tests).post(routes::staff::create_test),
        )
        .route(
            "/api/staff/tests/:id",
            get(routes::staff::get_test)
                .patch(routes::staff::update_test)
                .delete(routes::staff::delete_test),
        )
        .route("/api/staff/tests/:id/publish", post(routes::staff::publish_test))
        .route("/api/staff/tests/:id/close", post(routes::staff::close_test))
        .route("/api/staff/tests/:id/cancel", post(routes::staff::cancel_test))
        .route(
            "/api/staff/tests/:id/submissions",
            get(routes::staff::list_submissions),
        )
        .route(
            "/api/staff/submissions/:id/grade",
            post(routes::staff::grade_submission_answer),
        )
        .route(
            "/api/staff/assignments",
            get(routes::staff::list_assignments).post(routes::staff::create_assignment),
        )
        .route(
            "/api/staff/assignments/:id/submissions",
            get(routes::staff::list_assignment_submissions),
        )
        .route(
            "/api/staff/assignment-submissions/:id/grade",
            post(routes::staff::grade_assignment_submission),
        )
        .layer(axum::middleware::from_fn(auth::require_staff));

    let admin_api = Router::new()
        .route(
            "/api/admin/users",
            get(routes::admin::list_users).post(routes::admin::create_user),
        )
        .route(
            "/api/admin/users/:id/deactivate",
            post(routes::admin::deactivate_user),
        )
        .route(
            "/api/admin/subjects",
            get(routes::admin::list_subjects).post(routes::admin::create_subject),
        )
        .route(
            "/api/admin/subjects/:id/teacher",
            post(routes::admin::assign_subject_teacher),
        )
        .route(
            "/api/admin/invoices",
            get(routes::admin::list_invoices).post(routes::admin::create_invoice),
        )
        .route(
            "/api/admin/invoices/:id/pay",
            post(routes::admin::mark_invoice_paid),
        )
        .route(
            "/api/admin/invoices/:id/void",
            post(routes::admin::void_invoice),
        )
        .route("/api/admin/dashboard", get(routes::admin::dashboard))
        .layer(axum::middleware::from_fn(auth::require_admin));

    let headadmin_api = Router::new()
        .route(
            "/api/admin/schools",
            get(routes::admin::list_schools).post(routes::admin::create_school),
        )
        .layer(axum::middleware::from_fn(auth::require_headadmin));

    let messages_api = Router::new()
        .route("/api/messages", post(routes::messages::send_message))
        .route(
            "/api/messages/conversations",
            get(routes::messages::list_conversations),
        )
        .route(
            "/api/messages/conversations/:id",
            get(routes::messages::list_messages),
        )
        .route(
            "/api/messages/conversations/:id/read",
            post(routes::messages::mark_read),
        )
        .route("/api/messages/unread", get(routes::messages::unread_count))
        .layer(axum::middleware::from_fn(auth::require_auth));

    let api = Router::new()
        .merge(student_api)
        .merge(staff_api)
        .merge(admin_api)
        .merge(headadmin_api)
        .merge(messages_api)
        .layer(axum::middleware::from_fn_with_state(
            school_backend::middleware::rate_limit::new_rps_state(config.api_rps),
            school_backend::middleware::rate_limit::rps_middleware,
        ));

    let app = base_routes
        .merge(auth_api)
        .merge(api)
        .with_state(app_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(2 * 1024 * 1024));

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
