/*!
Subcrate for interoperation with Student users.

The student-facing lookups key on the id of the *user account*, not the
student row; that's the id a freshly-logged-in client actually has.
*/
use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    Json,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;

use crate::config::Glob;
use super::*;

#[derive(Deserialize)]
struct StudentRegistrationData {
    user_id: i64,
    class_id: i64,
}

pub async fn register_student(
    Extension(glob): Extension<Arc<Glob>>,
    body: String,
) -> Response {
    log::trace!("student::register_student( [ body ] ) called.");

    let data: StudentRegistrationData = match serde_json::from_str(&body) {
        Ok(d) => d,
        Err(e) => {
            return respond_bad_request(format!(
                "Unable to deserialize student data: {}", &e
            ));
        },
    };

    let user = match glob.store.user_by_id(data.user_id).await {
        Err(e) => {
            log::error!(
                "Error looking up user {}: {}",
                &data.user_id, e.display()
            );
            return text_500(None);
        },
        Ok(u) => u,
    };
    let class = match glob.store.class_by_id(data.class_id).await {
        Err(e) => {
            log::error!(
                "Error looking up class {}: {}",
                &data.class_id, e.display()
            );
            return text_500(None);
        },
        Ok(c) => c,
    };
    if user.is_none() || class.is_none() {
        return respond_not_found("User or Class not found".to_owned());
    }

    match glob.store.insert_student(data.user_id, data.class_id).await {
        Err(e) => {
            log::error!(
                "Error inserting student for user {}: {}",
                &data.user_id, e.display()
            );
            text_500(None)
        },
        Ok(s) => (
            StatusCode::OK,
            Json(json!({
                "student_id": s.id,
                "user_id": s.user_id,
                "class_id": s.class_id,
            })),
        ).into_response(),
    }
}

pub async fn get_scores(
    Extension(glob): Extension<Arc<Glob>>,
    Path(user_id): Path<i64>,
) -> Response {
    log::trace!("student::get_scores( {} ) called.", &user_id);

    let student = match glob.store.student_by_user_id(user_id).await {
        Err(e) => {
            log::error!(
                "Error looking up student for user {}: {}",
                &user_id, e.display()
            );
            return text_500(None);
        },
        Ok(None) => {
            return respond_not_found("Student not found".to_owned());
        },
        Ok(Some(s)) => s,
    };

    match glob.store.scores_for_student(student.id).await {
        Err(e) => {
            log::error!(
                "Error listing scores for student {}: {}",
                &student.id, e.display()
            );
            text_500(None)
        },
        Ok(scores) => (StatusCode::OK, Json(scores)).into_response(),
    }
}

pub async fn get_schedule(
    Extension(glob): Extension<Arc<Glob>>,
    Path(user_id): Path<i64>,
) -> Response {
    log::trace!("student::get_schedule( {} ) called.", &user_id);

    let student = match glob.store.student_by_user_id(user_id).await {
        Err(e) => {
            log::error!(
                "Error looking up student for user {}: {}",
                &user_id, e.display()
            );
            return text_500(None);
        },
        Ok(None) => {
            return respond_not_found("Student not found".to_owned());
        },
        Ok(Some(s)) => s,
    };

    let schedules = match glob.store.schedules_for_class(student.class_id).await {
        Err(e) => {
            log::error!(
                "Error listing schedules for class {}: {}",
                &student.class_id, e.display()
            );
            return text_500(None);
        },
        Ok(s) => s,
    };

    let listing: Vec<serde_json::Value> = schedules.iter()
        .map(|s| json!({
            "time_slot": s.time_slot,
            "subject": s.subject,
        }))
        .collect();

    (StatusCode::OK, Json(listing)).into_response()
}
