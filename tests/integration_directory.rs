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

async fn admin_token(pool: &PgPool, app: &axum::Router) -> String {
    let email = generate_unique_email();
    create_test_user(pool, &email, "adminpass1", seeded_roles::ADMIN, true).await;
    login(app, &email, "adminpass1").await
}

async fn teacher_token(pool: &PgPool, app: &axum::Router) -> String {
    let email = generate_unique_email();
    create_test_user(pool, &email, "teachpass1", seeded_roles::TEACHER, true).await;
    login(app, &email, "teachpass1").await
}

#[sqlx::test(migrations = "./migrations")]
async fn test_student_crud_flow(pool: PgPool) {
    let app = setup_test_app(pool.clone());
    let token = admin_token(&pool, &app).await;

    let created = app
        .clone()
        .oneshot(authed_json_request(
            "POST",
            "/api/students",
            &token,
            json!({"first_name": "Ada", "last_name": "Lovelace", "date_of_birth": "2012-12-10"}),
        ))
        .await
        .unwrap();
    assert_eq!(created.status(), StatusCode::CREATED);
    let student = body_json(created).await;
    let id = student["id"].as_str().unwrap().to_string();

    let updated = app
        .clone()
        .oneshot(authed_json_request(
            "PUT",
            &format!("/api/students/{}", id),
            &token,
            json!({"last_name": "Byron"}),
        ))
        .await
        .unwrap();
    assert_eq!(updated.status(), StatusCode::OK);
    let updated = body_json(updated).await;
    assert_eq!(updated["first_name"], "Ada");
    assert_eq!(updated["last_name"], "Byron");

    let listed = app
        .clone()
        .oneshot(authed_request("GET", "/api/students?name=byron", &token))
        .await
        .unwrap();
    assert_eq!(listed.status(), StatusCode::OK);
    let listed = body_json(listed).await;
    assert_eq!(listed["meta"]["total"], 1);

    let deleted = app
        .clone()
        .oneshot(authed_request(
            "DELETE",
            &format!("/api/students/{}", id),
            &token,
        ))
        .await
        .unwrap();
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

    let gone = app
        .oneshot(authed_request(
            "GET",
            &format!("/api/students/{}", id),
            &token,
        ))
        .await
        .unwrap();
    assert_eq!(gone.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_teacher_can_read_but_not_mutate_students(pool: PgPool) {
    let app = setup_test_app(pool.clone());
    let token = teacher_token(&pool, &app).await;

    let listed = app
        .clone()
        .oneshot(authed_request("GET", "/api/students", &token))
        .await
        .unwrap();
    assert_eq!(listed.status(), StatusCode::OK);

    let created = app
        .oneshot(authed_json_request(
            "POST",
            "/api/students",
            &token,
            json!({"first_name": "Ada", "last_name": "Lovelace", "date_of_birth": "2012-12-10"}),
        ))
        .await
        .unwrap();
    assert_eq!(created.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_student_with_unknown_guardian_is_rejected(pool: PgPool) {
    let app = setup_test_app(pool.clone());
    let token = admin_token(&pool, &app).await;

    let response = app
        .oneshot(authed_json_request(
            "POST",
            "/api/students",
            &token,
            json!({
                "first_name": "Ada",
                "last_name": "Lovelace",
                "date_of_birth": "2012-12-10",
                "guardian_id": Uuid::new_v4(),
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_deleted_guardian_is_nulled_on_student_read(pool: PgPool) {
    let app = setup_test_app(pool.clone());
    let token = admin_token(&pool, &app).await;

    let guardian = app
        .clone()
        .oneshot(authed_json_request(
            "POST",
            "/api/guardians",
            &token,
            json!({"first_name": "Grace", "last_name": "Hopper"}),
        ))
        .await
        .unwrap();
    let guardian_id = body_json(guardian).await["id"].as_str().unwrap().to_string();

    let student = app
        .clone()
        .oneshot(authed_json_request(
            "POST",
            "/api/students",
            &token,
            json!({
                "first_name": "Ada",
                "last_name": "Lovelace",
                "date_of_birth": "2012-12-10",
                "guardian_id": guardian_id,
            }),
        ))
        .await
        .unwrap();
    let student_id = body_json(student).await["id"].as_str().unwrap().to_string();

    // Guardian deletion is unconditional; the student link dangles.
    let deleted = app
        .clone()
        .oneshot(authed_request(
            "DELETE",
            &format!("/api/guardians/{}", guardian_id),
            &token,
        ))
        .await
        .unwrap();
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

    let fetched = app
        .oneshot(authed_request(
            "GET",
            &format!("/api/students/{}", student_id),
            &token,
        ))
        .await
        .unwrap();
    assert_eq!(fetched.status(), StatusCode::OK);
    let fetched = body_json(fetched).await;
    assert!(fetched["guardian_id"].is_null());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_duplicate_guardian_email_is_rejected(pool: PgPool) {
    let app = setup_test_app(pool.clone());
    let token = admin_token(&pool, &app).await;

    let first = app
        .clone()
        .oneshot(authed_json_request(
            "POST",
            "/api/guardians",
            &token,
            json!({"first_name": "Grace", "last_name": "Hopper", "email": "grace@test.com"}),
        ))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = app
        .oneshot(authed_json_request(
            "POST",
            "/api/guardians",
            &token,
            json!({"first_name": "Other", "last_name": "Person", "email": "GRACE@test.com"}),
        ))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_class_mutations_are_admin_only(pool: PgPool) {
    let app = setup_test_app(pool.clone());
    let admin = admin_token(&pool, &app).await;
    let teacher = teacher_token(&pool, &app).await;

    let forbidden = app
        .clone()
        .oneshot(authed_json_request(
            "POST",
            "/api/classes",
            &teacher,
            json!({"name": "Maths 101", "subject": "Maths"}),
        ))
        .await
        .unwrap();
    assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);

    let created = app
        .clone()
        .oneshot(authed_json_request(
            "POST",
            "/api/classes",
            &admin,
            json!({"name": "Maths 101", "subject": "Maths"}),
        ))
        .await
        .unwrap();
    assert_eq!(created.status(), StatusCode::CREATED);

    // Teachers can still read the directory.
    let listed = app
        .oneshot(authed_request("GET", "/api/classes", &teacher))
        .await
        .unwrap();
    assert_eq!(listed.status(), StatusCode::OK);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_enrolment_date_ordering_over_http(pool: PgPool) {
    let app = setup_test_app(pool.clone());
    let token = admin_token(&pool, &app).await;

    let student = app
        .clone()
        .oneshot(authed_json_request(
            "POST",
            "/api/students",
            &token,
            json!({"first_name": "Ada", "last_name": "Lovelace", "date_of_birth": "2012-12-10"}),
        ))
        .await
        .unwrap();
    let student_id = body_json(student).await["id"].as_str().unwrap().to_string();

    let class = app
        .clone()
        .oneshot(authed_json_request(
            "POST",
            "/api/classes",
            &token,
            json!({"name": "Maths 101"}),
        ))
        .await
        .unwrap();
    let class_id = body_json(class).await["id"].as_str().unwrap().to_string();

    let response = app
        .oneshot(authed_json_request(
            "POST",
            "/api/enrolments",
            &token,
            json!({
                "student_id": student_id,
                "class_id": class_id,
                "start_date": "2026-06-01",
                "end_date": "2026-01-01",
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["message"], "end_date must not be before start_date");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_user_management_requires_manage_users(pool: PgPool) {
    let app = setup_test_app(pool.clone());
    let admin = admin_token(&pool, &app).await;
    let teacher = teacher_token(&pool, &app).await;

    let forbidden = app
        .clone()
        .oneshot(authed_request("GET", "/api/users", &teacher))
        .await
        .unwrap();
    assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);

    let created = app
        .clone()
        .oneshot(authed_json_request(
            "POST",
            "/api/users",
            &admin,
            json!({
                "first_name": "New",
                "last_name": "Clerk",
                "email": generate_unique_email(),
                "password": "clerkpass1",
                "role_id": seeded_roles::CLERK,
            }),
        ))
        .await
        .unwrap();
    assert_eq!(created.status(), StatusCode::CREATED);
    let created = body_json(created).await;

    // The password hash never appears in a response.
    assert!(created.get("password").is_none());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_create_user_with_unknown_role_is_rejected(pool: PgPool) {
    let app = setup_test_app(pool.clone());
    let admin = admin_token(&pool, &app).await;

    let response = app
        .oneshot(authed_json_request(
            "POST",
            "/api/users",
            &admin,
            json!({
                "first_name": "New",
                "last_name": "User",
                "email": generate_unique_email(),
                "password": "password1",
                "role_id": Uuid::new_v4(),
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
