/*!
Interoperation between the client and server.

(Not the application and the database; that's covered by `auth` and
`store`.)

Response bodies are JSON throughout, errors included. The middleware at
the bottom gates the role-scoped routes: admin CRUD wants a bearer token
with the admin role claim, the teacher- and student-facing routes want
any valid token, and registration/login stay open.
*/
use std::sync::Arc;

use axum::{
    http::{header, Request, StatusCode},
    http::header::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::{
    account::Role,
    auth::AuthError,
    config::Glob,
};

pub mod admin;
pub mod student;
pub mod teacher;
pub mod users;

static TEXT_500: &str = "An internal error occurred; an appropriate response was inconstructable.";

/// Data type to read the body of a login request.
///
/// Deliberately no `Debug`; the plaintext password stays out of the logs.
#[derive(Deserialize)]
pub struct LoginData {
    pub email: String,
    pub password: String,
}

pub fn text_500(text: Option<String>) -> Response {
    match text {
        Some(text) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            text
        ).into_response(),
        None => (
            StatusCode::INTERNAL_SERVER_ERROR,
            TEXT_500.to_owned()
        ).into_response()
    }
}

pub fn respond_bad_request(msg: String) -> Response {
    log::trace!("respond_bad_request( {:?} ) called.", &msg);

    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": msg }))
    ).into_response()
}

pub fn respond_not_found(msg: String) -> Response {
    log::trace!("respond_not_found( {:?} ) called.", &msg);

    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": msg }))
    ).into_response()
}

/// The one failure shape for a bad login, whether the email was unknown
/// or the password wrong; account existence doesn't leak.
pub fn respond_bad_credentials(msg: &str) -> Response {
    log::trace!("respond_bad_credentials() called.");

    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": msg }))
    ).into_response()
}

pub fn respond_bad_token(msg: &str) -> Response {
    log::trace!("respond_bad_token( {:?} ) called.", msg);

    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": msg }))
    ).into_response()
}

/// Pull the token out of an `Authorization: Bearer ...` header.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?;
    let value = value.to_str().ok()?;
    value.strip_prefix("Bearer ")
}

/// Middleware function demanding a valid bearer token, of either role.
pub async fn bearer_authenticate<B>(
    req: Request<B>,
    next: Next<B>,
) -> Response {
    // Scoped so the borrows of `req` end before it moves on into the
    // next layer.
    let verdict = {
        let glob: &Arc<Glob> = req.extensions().get().unwrap();

        match bearer_token(req.headers()) {
            None => None,
            Some(token) => Some(glob.mint.verify(token)),
        }
    };

    match verdict {
        None => respond_bad_token("Request must carry a bearer token."),
        Some(Err(AuthError::Expired)) => {
            respond_bad_token("Authorization token has expired.")
        },
        Some(Err(AuthError::Invalid)) => {
            respond_bad_token("Invalid authorization token.")
        },
        Some(Ok(_claims)) => next.run(req).await,
    }
}

/// Middleware function demanding a valid bearer token whose role claim
/// is `admin`.
pub async fn admin_authenticate<B>(
    req: Request<B>,
    next: Next<B>,
) -> Response {
    let verdict = {
        let glob: &Arc<Glob> = req.extensions().get().unwrap();

        match bearer_token(req.headers()) {
            None => None,
            Some(token) => Some(glob.mint.verify(token)),
        }
    };

    let claims = match verdict {
        None => {
            return respond_bad_token("Request must carry a bearer token.");
        },
        Some(Err(AuthError::Expired)) => {
            return respond_bad_token("Authorization token has expired.");
        },
        Some(Err(AuthError::Invalid)) => {
            return respond_bad_token("Invalid authorization token.");
        },
        Some(Ok(claims)) => claims,
    };

    match claims.role {
        Role::Admin => { /* Okay, request may proceed. */ },
        _ => {
            return (
                StatusCode::FORBIDDEN,
                Json(json!({
                    "error": "Who is this? What's your operating number?"
                })),
            ).into_response();
        },
    }

    next.run(req).await
}

#[cfg(test)]
mod tests {
    /*!
    End-to-end exercises of the handler surface, driven by calling the
    handler functions directly against the live test database described
    in `crate::store::tests`. `#[ignore]`d like the rest of the live-DB
    tests:

    ```bash
    cargo test -- --ignored
    ```
    */
    use axum::extract::{Extension, Path};
    use serial_test::serial;

    use super::*;
    use crate::{
        auth::TokenMint,
        store::Store,
        store::tests::TEST_CONNECTION,
        tests::ensure_logging,
    };

    async fn test_glob() -> Arc<Glob> {
        let store = Store::new(TEST_CONNECTION.to_owned());
        store.ensure_db_schema().await.unwrap();

        Arc::new(Glob {
            store,
            mint: TokenMint::new("a-test-secret-nobody-should-deploy", 60),
            frontend_origin: "http://localhost:3000".to_owned(),
            addr: std::net::SocketAddr::new("127.0.0.1".parse().unwrap(), 8000),
        })
    }

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = hyper::body::to_bytes(resp.into_body()).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    #[ignore]
    #[serial]
    async fn register_login_records_round_trip() {
        ensure_logging();
        let glob = test_glob().await;

        // Register a user and log in; the token carries the user role.
        let resp = users::register(
            Extension(glob.clone()),
            json!({ "email": "a@x.com", "password": "pw" }).to_string(),
        ).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let user = body_json(resp).await;
        let user_id = user["id"].as_i64().unwrap();

        let resp = users::login(
            Extension(glob.clone()),
            json!({ "email": "a@x.com", "password": "pw" }).to_string(),
        ).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["token_type"], "bearer");
        let claims = glob.mint.verify(body["access_token"].as_str().unwrap()).unwrap();
        assert_eq!(claims.role, Role::User);
        assert_eq!(claims.sub, user_id);

        // Same dance for an admin; the role claim differs.
        let resp = admin::register(
            Extension(glob.clone()),
            json!({
                "email": "adm@x.com", "password": "pw", "name": "The Admin"
            }).to_string(),
        ).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = admin::login(
            Extension(glob.clone()),
            json!({ "email": "adm@x.com", "password": "pw" }).to_string(),
        ).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        let claims = glob.mint.verify(body["access_token"].as_str().unwrap()).unwrap();
        assert_eq!(claims.role, Role::Admin);

        // Class, student, schedule.
        let resp = admin::create_class(
            Extension(glob.clone()),
            json!({ "name": "Class A" }).to_string(),
        ).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let class_id = body_json(resp).await["id"].as_i64().unwrap();

        let resp = student::register_student(
            Extension(glob.clone()),
            json!({ "user_id": user_id, "class_id": class_id }).to_string(),
        ).await;
        assert_eq!(resp.status(), StatusCode::OK);

        // No schedules yet.
        let resp = student::get_schedule(
            Extension(glob.clone()),
            Path(user_id),
        ).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await.as_array().unwrap().len(), 0);

        let resp = admin::create_schedule(
            Extension(glob.clone()),
            json!({
                "class_id": class_id, "time_slot": 2, "subject": "Math"
            }).to_string(),
        ).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = student::get_schedule(
            Extension(glob.clone()),
            Path(user_id),
        ).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let scheds = body_json(resp).await;
        let scheds = scheds.as_array().unwrap();
        assert_eq!(scheds.len(), 1);
        assert_eq!(scheds[0]["time_slot"], 2);
        assert_eq!(scheds[0]["subject"], "Math");

        glob.store.nuke_database().await.unwrap();
    }

    #[tokio::test]
    #[ignore]
    #[serial]
    async fn login_failures_look_identical() {
        ensure_logging();
        let glob = test_glob().await;

        let resp = users::register(
            Extension(glob.clone()),
            json!({ "email": "a@x.com", "password": "pw" }).to_string(),
        ).await;
        assert_eq!(resp.status(), StatusCode::OK);

        // Duplicate registration in the same table is refused.
        let resp = users::register(
            Extension(glob.clone()),
            json!({ "email": "a@x.com", "password": "other" }).to_string(),
        ).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        // Wrong password and unknown email fail indistinguishably.
        let wrong_pw = users::login(
            Extension(glob.clone()),
            json!({ "email": "a@x.com", "password": "nope" }).to_string(),
        ).await;
        let no_user = users::login(
            Extension(glob.clone()),
            json!({ "email": "b@x.com", "password": "pw" }).to_string(),
        ).await;
        assert_eq!(wrong_pw.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(no_user.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(wrong_pw).await, body_json(no_user).await);

        glob.store.nuke_database().await.unwrap();
    }

    #[tokio::test]
    #[ignore]
    #[serial]
    async fn teacher_surface() {
        ensure_logging();
        let glob = test_glob().await;

        let resp = users::register(
            Extension(glob.clone()),
            json!({ "email": "t@x.com", "password": "pw", "name": "Ms Jenny" }).to_string(),
        ).await;
        let t_user_id = body_json(resp).await["id"].as_i64().unwrap();

        let resp = admin::create_subject(
            Extension(glob.clone()),
            json!({ "name": "Math" }).to_string(),
        ).await;
        let subject_id = body_json(resp).await["id"].as_i64().unwrap();

        let resp = teacher::register_teacher(
            Extension(glob.clone()),
            json!({ "user_id": t_user_id, "subject_id": subject_id }).to_string(),
        ).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let teacher_id = body_json(resp).await["teacher_id"].as_i64().unwrap();

        // Registering against a nonexistent subject is a 404.
        let resp = teacher::register_teacher(
            Extension(glob.clone()),
            json!({ "user_id": t_user_id, "subject_id": 9999 }).to_string(),
        ).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = teacher::get_subject(
            Extension(glob.clone()),
            Path(teacher_id),
        ).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["subject_name"], "Math");

        // A student in the teacher's class, scored twice; the second
        // value is the one that sticks.
        let resp = users::register(
            Extension(glob.clone()),
            json!({ "email": "s@x.com", "password": "pw", "name": "John Smith" }).to_string(),
        ).await;
        let s_user_id = body_json(resp).await["id"].as_i64().unwrap();

        let resp = admin::create_class(
            Extension(glob.clone()),
            json!({ "name": "Class A" }).to_string(),
        ).await;
        let class_id = body_json(resp).await["id"].as_i64().unwrap();

        let resp = student::register_student(
            Extension(glob.clone()),
            json!({ "user_id": s_user_id, "class_id": class_id }).to_string(),
        ).await;
        let student_id = body_json(resp).await["student_id"].as_i64().unwrap();

        let resp = admin::assign_teacher(
            Extension(glob.clone()),
            json!({ "teacher_id": teacher_id, "class_id": class_id }).to_string(),
        ).await;
        assert_eq!(resp.status(), StatusCode::OK);

        for value in ["6.75", "9.25"] {
            let resp = teacher::add_score(
                Extension(glob.clone()),
                json!({
                    "student_id": student_id,
                    "subject_id": subject_id,
                    "score_value": value,
                    "teacher_id": teacher_id
                }).to_string(),
            ).await;
            assert_eq!(resp.status(), StatusCode::OK);
        }

        let resp = student::get_scores(
            Extension(glob.clone()),
            Path(s_user_id),
        ).await;
        let scores = body_json(resp).await;
        let scores = scores.as_array().unwrap().to_owned();
        assert_eq!(scores.len(), 1);
        assert_eq!(scores[0]["score"], "9.25");

        let resp = teacher::get_students(
            Extension(glob.clone()),
            Path(teacher_id),
        ).await;
        let students = body_json(resp).await;
        let students = students.as_array().unwrap().to_owned();
        assert_eq!(students.len(), 1);
        assert_eq!(students[0]["score"], "9.25");

        glob.store.nuke_database().await.unwrap();
    }
}
