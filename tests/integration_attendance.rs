mod common;

use axum::http::StatusCode;
use serde_json::json;
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

use common::{
    authed_json_request, authed_request, body_json, create_test_user, generate_unique_email,
    login, seeded_roles, setup_test_app,
};

async fn token_for_role(pool: &PgPool, app: &axum::Router, role_id: Uuid) -> String {
    let email = generate_unique_email();
    create_test_user(pool, &email, "password123", role_id, true).await;
    login(app, &email, "password123").await
}

/// Seed a class with one enrolled student directly through SQL.
async fn seed_class_with_student(pool: &PgPool) -> (Uuid, Uuid) {
    let class_id = sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO classes (name, subject) VALUES ('Maths 101', 'Maths') RETURNING id",
    )
    .fetch_one(pool)
    .await
    .unwrap();

    let student_id = sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO students (first_name, last_name, date_of_birth)
         VALUES ('Ada', 'Lovelace', '2012-12-10') RETURNING id",
    )
    .fetch_one(pool)
    .await
    .unwrap();

    sqlx::query(
        "INSERT INTO enrolments (student_id, class_id, start_date) VALUES ($1, $2, '2026-01-01')",
    )
    .bind(student_id)
    .bind(class_id)
    .execute(pool)
    .await
    .unwrap();

    (class_id, student_id)
}

#[sqlx::test(migrations = "./migrations")]
async fn test_teacher_records_and_reads_attendance(pool: PgPool) {
    let (class_id, student_id) = seed_class_with_student(&pool).await;

    let app = setup_test_app(pool.clone());
    let token = token_for_role(&pool, &app, seeded_roles::TEACHER).await;

    let session = app
        .clone()
        .oneshot(authed_json_request(
            "POST",
            "/api/attendance/sessions",
            &token,
            json!({"class_id": class_id, "session_date": "2026-03-02"}),
        ))
        .await
        .unwrap();
    assert_eq!(session.status(), StatusCode::CREATED);
    let session_id = body_json(session).await["id"].as_str().unwrap().to_string();

    let record = app
        .clone()
        .oneshot(authed_json_request(
            "POST",
            &format!("/api/attendance/sessions/{}/records", session_id),
            &token,
            json!({"student_id": student_id, "status": "late", "note": "arrived 9:20"}),
        ))
        .await
        .unwrap();
    assert_eq!(record.status(), StatusCode::OK);
    let record = body_json(record).await;
    assert_eq!(record["status"], "late");

    let records = app
        .oneshot(authed_request(
            "GET",
            &format!("/api/attendance/sessions/{}/records", session_id),
            &token,
        ))
        .await
        .unwrap();
    assert_eq!(records.status(), StatusCode::OK);
    let records = body_json(records).await;
    assert_eq!(records.as_array().unwrap().len(), 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_clerk_mask_has_no_attendance_bits(pool: PgPool) {
    let (class_id, _) = seed_class_with_student(&pool).await;

    let app = setup_test_app(pool.clone());
    let token = token_for_role(&pool, &app, seeded_roles::CLERK).await;

    let create = app
        .clone()
        .oneshot(authed_json_request(
            "POST",
            "/api/attendance/sessions",
            &token,
            json!({"class_id": class_id, "session_date": "2026-03-02"}),
        ))
        .await
        .unwrap();
    assert_eq!(create.status(), StatusCode::FORBIDDEN);

    let list = app
        .oneshot(authed_request("GET", "/api/attendance/sessions", &token))
        .await
        .unwrap();
    assert_eq!(list.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_invalid_status_is_rejected(pool: PgPool) {
    let (class_id, student_id) = seed_class_with_student(&pool).await;

    let app = setup_test_app(pool.clone());
    let token = token_for_role(&pool, &app, seeded_roles::TEACHER).await;

    let session = app
        .clone()
        .oneshot(authed_json_request(
            "POST",
            "/api/attendance/sessions",
            &token,
            json!({"class_id": class_id, "session_date": "2026-03-02"}),
        ))
        .await
        .unwrap();
    let session_id = body_json(session).await["id"].as_str().unwrap().to_string();

    let response = app
        .oneshot(authed_json_request(
            "POST",
            &format!("/api/attendance/sessions/{}/records", session_id),
            &token,
            json!({"student_id": student_id, "status": "tardy"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_session_for_unknown_class_is_404(pool: PgPool) {
    let app = setup_test_app(pool.clone());
    let token = token_for_role(&pool, &app, seeded_roles::TEACHER).await;

    let response = app
        .oneshot(authed_json_request(
            "POST",
            "/api/attendance/sessions",
            &token,
            json!({"class_id": Uuid::new_v4(), "session_date": "2026-03-02"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_audit_log_is_admin_only(pool: PgPool) {
    let app = setup_test_app(pool.clone());
    let teacher = token_for_role(&pool, &app, seeded_roles::TEACHER).await;
    let admin = token_for_role(&pool, &app, seeded_roles::ADMIN).await;

    let forbidden = app
        .clone()
        .oneshot(authed_request("GET", "/api/audit", &teacher))
        .await
        .unwrap();
    assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);

    let allowed = app
        .oneshot(authed_request("GET", "/api/audit", &admin))
        .await
        .unwrap();
    assert_eq!(allowed.status(), StatusCode::OK);
}
