/*!
Subcrate for interoperation with Teacher users.

A teacher is a regular user account linked to the one subject they teach;
their class assignments live in the `teacher_class` relation, which may
hold duplicate links (the read queries deduplicate).
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
struct TeacherRegistrationData {
    user_id: i64,
    subject_id: i64,
}

pub async fn register_teacher(
    Extension(glob): Extension<Arc<Glob>>,
    body: String,
) -> Response {
    log::trace!("teacher::register_teacher( [ body ] ) called.");

    let data: TeacherRegistrationData = match serde_json::from_str(&body) {
        Ok(d) => d,
        Err(e) => {
            return respond_bad_request(format!(
                "Unable to deserialize teacher data: {}", &e
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
    let subject = match glob.store.subject_by_id(data.subject_id).await {
        Err(e) => {
            log::error!(
                "Error looking up subject {}: {}",
                &data.subject_id, e.display()
            );
            return text_500(None);
        },
        Ok(s) => s,
    };
    if user.is_none() || subject.is_none() {
        return respond_not_found("User or Subject not found".to_owned());
    }

    match glob.store.insert_teacher(data.user_id, data.subject_id).await {
        Err(e) => {
            log::error!(
                "Error inserting teacher for user {}: {}",
                &data.user_id, e.display()
            );
            text_500(None)
        },
        Ok(t) => (
            StatusCode::OK,
            Json(json!({
                "teacher_id": t.id,
                "user_id": t.user_id,
                "subject_id": t.subject_id,
            })),
        ).into_response(),
    }
}

pub async fn get_subject(
    Extension(glob): Extension<Arc<Glob>>,
    Path(teacher_id): Path<i64>,
) -> Response {
    log::trace!("teacher::get_subject( {} ) called.", &teacher_id);

    let teacher = match glob.store.teacher_by_id(teacher_id).await {
        Err(e) => {
            log::error!(
                "Error looking up teacher {}: {}",
                &teacher_id, e.display()
            );
            return text_500(None);
        },
        Ok(None) => {
            return respond_not_found("Teacher not found".to_owned());
        },
        Ok(Some(t)) => t,
    };

    match glob.store.subject_by_id(teacher.subject_id).await {
        Err(e) => {
            log::error!(
                "Error looking up subject {}: {}",
                &teacher.subject_id, e.display()
            );
            text_500(None)
        },
        Ok(None) => respond_not_found("Subject not found".to_owned()),
        Ok(Some(s)) => (
            StatusCode::OK,
            Json(json!({
                "subject_id": s.id,
                "subject_name": s.name,
            })),
        ).into_response(),
    }
}

pub async fn get_classes(
    Extension(glob): Extension<Arc<Glob>>,
    Path(teacher_id): Path<i64>,
) -> Response {
    log::trace!("teacher::get_classes( {} ) called.", &teacher_id);

    match glob.store.teacher_by_id(teacher_id).await {
        Err(e) => {
            log::error!(
                "Error looking up teacher {}: {}",
                &teacher_id, e.display()
            );
            return text_500(None);
        },
        Ok(None) => {
            return respond_not_found("Teacher not found".to_owned());
        },
        Ok(Some(_)) => {},
    }

    match glob.store.classes_for_teacher(teacher_id).await {
        Err(e) => {
            log::error!(
                "Error listing classes for teacher {}: {}",
                &teacher_id, e.display()
            );
            text_500(None)
        },
        Ok(classes) => (StatusCode::OK, Json(classes)).into_response(),
    }
}

pub async fn get_students(
    Extension(glob): Extension<Arc<Glob>>,
    Path(teacher_id): Path<i64>,
) -> Response {
    log::trace!("teacher::get_students( {} ) called.", &teacher_id);

    match glob.store.teacher_by_id(teacher_id).await {
        Err(e) => {
            log::error!(
                "Error looking up teacher {}: {}",
                &teacher_id, e.display()
            );
            return text_500(None);
        },
        Ok(None) => {
            return respond_not_found("Teacher not found".to_owned());
        },
        Ok(Some(_)) => {},
    }

    let students = match glob.store.students_for_teacher(teacher_id).await {
        Err(e) => {
            log::error!(
                "Error listing students for teacher {}: {}",
                &teacher_id, e.display()
            );
            return text_500(None);
        },
        Ok(s) => s,
    };

    let listing: Vec<serde_json::Value> = students.iter()
        .map(|s| json!({
            "student_id": s.student_id,
            "user_id": s.user_id,
            "student_name": s.name.as_deref().unwrap_or("Unknown"),
            "class_id": s.class_id,
            "score": s.score,
        }))
        .collect();

    (StatusCode::OK, Json(listing)).into_response()
}

#[derive(Deserialize)]
struct ScoreData {
    student_id: i64,
    subject_id: i64,
    score_value: String,
    teacher_id: i64,
}

/// The one conditional mutation in the system: scoring a student
/// overwrites any score already recorded for the same (student, subject)
/// pair rather than stacking a second row.
pub async fn add_score(
    Extension(glob): Extension<Arc<Glob>>,
    body: String,
) -> Response {
    log::trace!("teacher::add_score( [ body ] ) called.");

    let data: ScoreData = match serde_json::from_str(&body) {
        Ok(d) => d,
        Err(e) => {
            return respond_bad_request(format!(
                "Unable to deserialize score data: {}", &e
            ));
        },
    };

    let student = match glob.store.student_by_id(data.student_id).await {
        Err(e) => {
            log::error!(
                "Error looking up student {}: {}",
                &data.student_id, e.display()
            );
            return text_500(None);
        },
        Ok(s) => s,
    };
    let teacher = match glob.store.teacher_by_id(data.teacher_id).await {
        Err(e) => {
            log::error!(
                "Error looking up teacher {}: {}",
                &data.teacher_id, e.display()
            );
            return text_500(None);
        },
        Ok(t) => t,
    };
    let teacher = match (student, teacher) {
        (Some(_), Some(t)) => t,
        _ => {
            return respond_not_found("Student or Teacher not found".to_owned());
        },
    };

    // A teacher only scores their own subject.
    if teacher.subject_id != data.subject_id {
        return respond_not_found(
            "Teacher is not assigned that subject".to_owned()
        );
    }

    let res = glob.store.upsert_score(
        data.student_id,
        data.subject_id,
        &data.score_value,
    ).await;

    match res {
        Err(e) => {
            log::error!(
                "Error recording score for student {}: {}",
                &data.student_id, e.display()
            );
            text_500(None)
        },
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "message": "Score added successfully" })),
        ).into_response(),
    }
}
