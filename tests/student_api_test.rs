use std::env;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    routing::{get, post},
    Router,
};
use chrono::{Duration, Utc};
use serde_json::{json, Value as JsonValue};
use tower::ServiceExt;
use uuid::Uuid;

use school_backend::middleware::auth;
use school_backend::models::question::{Question, QuestionType};
use school_backend::models::test::TestConfig;

fn init_env() {
    dotenvy::dotenv().ok();
    env::set_var("SERVER_ADDRESS", "127.0.0.1:0");
    env::set_var("JWT_SECRET", "test_secret_key");
    let _ = school_backend::config::init_config();
}

async fn setup_pool() -> sqlx::PgPool {
    init_env();
    let pool = school_backend::database::pool::create_pool()
        .await
        .expect("pool");
    sqlx::migrate!("./migrations").run(&pool).await.expect("migrations");
    pool
}

fn objective(prompt: &str, correct: i32) -> Question {
    Question {
        id: 0,
        question_type: QuestionType::Objective,
        prompt: prompt.to_string(),
        marks: 1,
        options: vec!["0".into(), "1".into(), "2".into(), "3".into()],
        correct_answer: Some(correct),
    }
}

fn theory(prompt: &str, marks: i32) -> Question {
    Question {
        id: 0,
        question_type: QuestionType::Theory,
        prompt: prompt.to_string(),
        marks,
        options: vec![],
        correct_answer: None,
    }
}

struct Fixture {
    state: school_backend::AppState,
    student_token: String,
    staff_token: String,
    test_id: Uuid,
    school_id: Uuid,
    teacher_id: Uuid,
    student_id: Uuid,
}

async fn seed(pool: sqlx::PgPool, questions: Vec<Question>, allow_retake: bool) -> Fixture {
    let state = school_backend::AppState::new(pool);
    let suffix = Uuid::new_v4();

    let school = state
        .school_service
        .create(&format!("School {}", suffix), &format!("school-{}", suffix))
        .await
        .expect("school");

    let teacher = state
        .user_service
        .create(
            Some(school.id),
            "Teacher",
            &format!("teacher_{}@example.com", suffix),
            "correct-horse",
            "teacher",
        )
        .await
        .expect("teacher");

    let student = state
        .user_service
        .create(
            Some(school.id),
            "Student",
            &format!("student_{}@example.com", suffix),
            "battery-staple",
            "student",
        )
        .await
        .expect("student");

    let config = TestConfig {
        duration_minutes: 30,
        questions,
        allow_retake,
        show_results_immediately: true,
        shuffle_questions: false,
        shuffle_options: false,
    };
    let test = state
        .test_service
        .create_test(
            school_backend::dto::staff_dto::CreateTestPayload {
                title: "Midterm".into(),
                subject_id: None,
                instructions: Some("Answer everything".into()),
                available_from: None,
                passing_score: rust_decimal::Decimal::from(5),
                config,
            },
            school.id,
            teacher.id,
        )
        .await
        .expect("create test");
    let test = state
        .test_service
        .transition(test.id, school.id, "publish")
        .await
        .expect("publish");

    Fixture {
        student_token: auth::issue_token(&student).expect("student token"),
        staff_token: auth::issue_token(&teacher).expect("staff token"),
        test_id: test.id,
        school_id: school.id,
        teacher_id: teacher.id,
        student_id: student.id,
        state,
    }
}

fn student_router(state: school_backend::AppState) -> Router {
    Router::new()
        .route("/api/student/tests", get(school_backend::routes::student::list_tests))
        .route(
            "/api/student/tests/submit",
            post(school_backend::routes::student::submit_test),
        )
        .route(
            "/api/student/tests/:id",
            get(school_backend::routes::student::get_test),
        )
        .route(
            "/api/student/tests/:id/result",
            get(school_backend::routes::student::get_result),
        )
        .layer(axum::middleware::from_fn(auth::require_student))
        .with_state(state)
}

fn staff_router(state: school_backend::AppState) -> Router {
    Router::new()
        .route(
            "/api/staff/tests/:id/submissions",
            get(school_backend::routes::staff::list_submissions),
        )
        .route(
            "/api/staff/submissions/:id/grade",
            post(school_backend::routes::staff::grade_submission_answer),
        )
        .route(
            "/api/staff/assignment-submissions/:id/grade",
            post(school_backend::routes::staff::grade_assignment_submission),
        )
        .layer(axum::middleware::from_fn(auth::require_staff))
        .with_state(state)
}

fn admin_router(state: school_backend::AppState) -> Router {
    Router::new()
        .route(
            "/api/admin/invoices",
            post(school_backend::routes::admin::create_invoice),
        )
        .route(
            "/api/admin/invoices/:id/pay",
            post(school_backend::routes::admin::mark_invoice_paid),
        )
        .layer(axum::middleware::from_fn(auth::require_admin))
        .with_state(state)
}

async fn body_json(resp: axum::response::Response) -> JsonValue {
    let bytes = to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn get_req(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

fn post_req(uri: &str, token: &str, body: JsonValue) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn student_flow_end_to_end() {
    let pool = setup_pool().await;
    // ten questions, all objective, correct answer is always option 0
    let questions = (0..10).map(|i| objective(&format!("Q{}", i + 1), 0)).collect();
    let fx = seed(pool, questions, false).await;
    let app = student_router(fx.state.clone());

    // unauthenticated calls never reach a query
    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/student/tests")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    // listing shows the test as available, status computed server-side
    let resp = app
        .clone()
        .oneshot(get_req("/api/student/tests?status=available", &fx.student_token))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["success"], json!(true));
    let tests = body["data"]["tests"].as_array().unwrap();
    assert!(tests.iter().any(|t| t["id"] == json!(fx.test_id)));
    assert!(body["data"]["summary"]["available"].as_u64().unwrap() >= 1);

    // the taking page never sees correct answers
    let resp = app
        .clone()
        .oneshot(get_req(&format!("/api/student/tests/{}", fx.test_id), &fx.student_token))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    let qs = body["data"]["questions"].as_array().unwrap();
    assert_eq!(qs.len(), 10);
    assert!(qs.iter().all(|q| q.get("correctAnswer").is_none()));

    // answer six of ten: four correct, two wrong
    let mut answers = serde_json::Map::new();
    for q in 1..=4 {
        answers.insert(q.to_string(), json!(0));
    }
    answers.insert("5".to_string(), json!(2));
    answers.insert("6".to_string(), json!(3));
    let submit_body = json!({
        "testId": fx.test_id,
        "answers": answers,
        "timeSpent": 540,
        "autoSubmit": false
    });
    let resp = app
        .clone()
        .oneshot(post_req("/api/student/tests/submit", &fx.student_token, submit_body.clone()))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["data"]["status"], json!("graded"));
    assert_eq!(body["data"]["score"], json!("4.00"));
    assert_eq!(body["data"]["maxScore"], json!("10.00"));

    // double submission conflicts (retakes disabled)
    let resp = app
        .clone()
        .oneshot(post_req("/api/student/tests/submit", &fx.student_token, submit_body))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    // re-opening the test points at the results view
    let resp = app
        .clone()
        .oneshot(get_req(&format!("/api/student/tests/{}", fx.test_id), &fx.student_token))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body = body_json(resp).await;
    assert_eq!(body["redirect"], json!("results"));

    // results reflect the stored submission
    let resp = app
        .clone()
        .oneshot(get_req(
            &format!("/api/student/tests/{}/result", fx.test_id),
            &fx.student_token,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["data"]["timeSpentSeconds"], json!(540));
    assert_eq!(body["data"]["autoSubmit"], json!(false));
    assert_eq!(body["data"]["passed"], json!(false));
}

#[tokio::test]
async fn theory_answers_wait_for_manual_grading() {
    let pool = setup_pool().await;
    let questions = vec![objective("Q1", 1), theory("Explain photosynthesis", 5)];
    let fx = seed(pool, questions, false).await;
    let student_app = student_router(fx.state.clone());
    let staff_app = staff_router(fx.state.clone());

    let submit_body = json!({
        "testId": fx.test_id,
        "answers": {"1": 1, "2": "Plants convert light into sugar."},
        "timeSpent": 300,
        "autoSubmit": true
    });
    let resp = student_app
        .clone()
        .oneshot(post_req("/api/student/tests/submit", &fx.student_token, submit_body))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["data"]["status"], json!("pending"));
    assert_eq!(body["data"]["autoSubmit"], json!(true));

    // teacher sees the pending submission
    let resp = staff_app
        .clone()
        .oneshot(get_req(
            &format!("/api/staff/tests/{}/submissions", fx.test_id),
            &fx.staff_token,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    let submissions = body.as_array().unwrap();
    assert_eq!(submissions.len(), 1);
    let submission_id = submissions[0]["id"].as_str().unwrap().to_string();
    assert_eq!(submissions[0]["status"], json!("pending"));

    // a student token cannot grade
    let resp = staff_app
        .clone()
        .oneshot(post_req(
            &format!("/api/staff/submissions/{}/grade", submission_id),
            &fx.student_token,
            json!({"questionId": 2, "marksAwarded": 4}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // grading the only theory answer completes the submission
    let resp = staff_app
        .clone()
        .oneshot(post_req(
            &format!("/api/staff/submissions/{}/grade", submission_id),
            &fx.staff_token,
            json!({"questionId": 2, "marksAwarded": 4}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["status"], json!("graded"));
    assert_eq!(body["score"], json!("5.00"));
    assert_eq!(body["max_score"], json!("6.00"));
}

#[tokio::test]
async fn retake_replaces_previous_submission() {
    let pool = setup_pool().await;
    let questions = vec![objective("Q1", 0), objective("Q2", 0)];
    let fx = seed(pool, questions, true).await;
    let student_app = student_router(fx.state.clone());
    let staff_app = staff_router(fx.state.clone());

    let first = json!({
        "testId": fx.test_id,
        "answers": {"1": 0, "2": 0},
        "timeSpent": 120,
        "autoSubmit": false
    });
    let resp = student_app
        .clone()
        .oneshot(post_req("/api/student/tests/submit", &fx.student_token, first))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["data"]["score"], json!("2.00"));

    let second = json!({
        "testId": fx.test_id,
        "answers": {"1": 0, "2": 3},
        "timeSpent": 200,
        "autoSubmit": false
    });
    let resp = student_app
        .clone()
        .oneshot(post_req("/api/student/tests/submit", &fx.student_token, second))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["data"]["score"], json!("1.00"));

    // still one row per (test, student), holding the latest attempt
    let resp = staff_app
        .clone()
        .oneshot(get_req(
            &format!("/api/staff/tests/{}/submissions", fx.test_id),
            &fx.staff_token,
        ))
        .await
        .unwrap();
    let body = body_json(resp).await;
    let submissions = body.as_array().unwrap();
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0]["time_spent_seconds"], json!(200));
    assert_eq!(submissions[0]["score"], json!("1.00"));
}

#[tokio::test]
async fn assignment_grading_is_scoped_to_the_graders_school() {
    let pool = setup_pool().await;
    let fx = seed(pool, vec![objective("Q1", 0)], false).await;
    let staff_app = staff_router(fx.state.clone());

    let assignment = fx
        .state
        .assignment_service
        .create(
            fx.school_id,
            school_backend::dto::staff_dto::CreateAssignmentPayload {
                title: "Essay".into(),
                subject_id: None,
                description: None,
                due_at: None,
                max_score: rust_decimal::Decimal::from(10),
            },
            fx.teacher_id,
        )
        .await
        .expect("assignment");
    let submission = fx
        .state
        .assignment_service
        .submit(&assignment, fx.student_id, "my essay")
        .await
        .expect("assignment submission");

    // a teacher from another school cannot see, let alone grade, it
    let suffix = Uuid::new_v4();
    let other_school = fx
        .state
        .school_service
        .create(&format!("Other {}", suffix), &format!("other-{}", suffix))
        .await
        .expect("other school");
    let outsider = fx
        .state
        .user_service
        .create(
            Some(other_school.id),
            "Outsider",
            &format!("outsider_{}@example.com", suffix),
            "correct-horse",
            "teacher",
        )
        .await
        .expect("outsider");
    let outsider_token = auth::issue_token(&outsider).expect("outsider token");

    let grade_body = json!({"score": 10, "feedback": "graded"});
    let resp = staff_app
        .clone()
        .oneshot(post_req(
            &format!("/api/staff/assignment-submissions/{}/grade", submission.id),
            &outsider_token,
            grade_body.clone(),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let ungraded = fx
        .state
        .assignment_service
        .get_submission(submission.id)
        .await
        .expect("submission");
    assert!(ungraded.score.is_none());

    // the school's own teacher can
    let resp = staff_app
        .clone()
        .oneshot(post_req(
            &format!("/api/staff/assignment-submissions/{}/grade", submission.id),
            &fx.staff_token,
            grade_body,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["score"], json!("10.00"));
}

#[tokio::test]
async fn late_submissions_bounce_and_the_sweeper_closes_the_test() {
    let pool = setup_pool().await;
    let fx = seed(pool, vec![objective("Q1", 0)], false).await;
    let student_app = student_router(fx.state.clone());

    // a 30 minute window that elapsed two hours ago
    let config = TestConfig {
        duration_minutes: 30,
        questions: vec![objective("Q1", 0)],
        allow_retake: false,
        show_results_immediately: true,
        shuffle_questions: false,
        shuffle_options: false,
    };
    let stale = fx
        .state
        .test_service
        .create_test(
            school_backend::dto::staff_dto::CreateTestPayload {
                title: "Missed".into(),
                subject_id: None,
                instructions: None,
                available_from: Some(Utc::now() - Duration::hours(2)),
                passing_score: rust_decimal::Decimal::from(1),
                config,
            },
            fx.school_id,
            fx.teacher_id,
        )
        .await
        .expect("stale test");
    let stale = fx
        .state
        .test_service
        .transition(stale.id, fx.school_id, "publish")
        .await
        .expect("publish");

    let resp = student_app
        .clone()
        .oneshot(post_req(
            "/api/student/tests/submit",
            &fx.student_token,
            json!({
                "testId": stale.id,
                "answers": {"1": 0},
                "timeSpent": 1800,
                "autoSubmit": true
            }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let closed = fx
        .state
        .test_service
        .sweep_expired(60)
        .await
        .expect("sweep");
    assert!(closed >= 1);
    let stale = fx
        .state
        .test_service
        .get_test_for_school(stale.id, fx.school_id)
        .await
        .expect("stale test reload");
    assert_eq!(stale.status, "closed");
}

#[tokio::test]
async fn headadmin_acts_on_an_explicitly_named_school() {
    let pool = setup_pool().await;
    let fx = seed(pool, vec![objective("Q1", 0)], false).await;
    let admin_app = admin_router(fx.state.clone());

    let suffix = Uuid::new_v4();
    let head = fx
        .state
        .user_service
        .create(
            None,
            "Head",
            &format!("head_{}@example.com", suffix),
            "battery-staple",
            "headadmin",
        )
        .await
        .expect("headadmin");
    let head_token = auth::issue_token(&head).expect("head token");

    // no school named: rejected up front
    let resp = admin_app
        .clone()
        .oneshot(post_req(
            "/api/admin/invoices",
            &head_token,
            json!({"studentId": fx.student_id, "amount": 150}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = admin_app
        .clone()
        .oneshot(post_req(
            "/api/admin/invoices",
            &head_token,
            json!({
                "studentId": fx.student_id,
                "amount": 150,
                "schoolId": fx.school_id
            }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["status"], json!("unpaid"));
    let invoice_id = body["id"].as_str().unwrap().to_string();

    let resp = admin_app
        .clone()
        .oneshot(post_req(
            &format!("/api/admin/invoices/{}/pay?schoolId={}", invoice_id, fx.school_id),
            &head_token,
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["status"], json!("paid"));
}
