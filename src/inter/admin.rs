/*!
Subcrate for interoperation with Admin users.

Registration and login are public (the original deployment expects its
first admin to register itself); everything else in here sits behind the
`admin_authenticate` middleware.
*/
use std::sync::Arc;

use axum::{
    extract::Extension,
    Json,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;

use crate::{
    account::Role,
    auth,
    config::Glob,
    store::RegisterResult,
};
use super::*;

#[derive(Deserialize)]
struct AdminRegistrationData {
    email: String,
    password: String,
    name: String,
}

pub async fn register(
    Extension(glob): Extension<Arc<Glob>>,
    body: String,
) -> Response {
    log::trace!("admin::register( [ body ] ) called.");

    let data: AdminRegistrationData = match serde_json::from_str(&body) {
        Ok(d) => d,
        Err(e) => {
            return respond_bad_request(format!(
                "Unable to deserialize registration data: {}", &e
            ));
        },
    };

    let hash = match auth::hash_password(&data.password) {
        Ok(h) => h,
        Err(e) => {
            log::error!("Error hashing password for {:?}: {}", &data.email, &e);
            return text_500(None);
        },
    };

    match glob.store.insert_admin(&data.email, &hash, &data.name).await {
        Err(e) => {
            log::error!(
                "Error inserting admin {:?}: {}",
                &data.email, e.display()
            );
            text_500(None)
        },
        Ok(RegisterResult::DuplicateEmail) => {
            respond_bad_request("Admin email already registered".to_owned())
        },
        Ok(RegisterResult::Created(a)) => (
            StatusCode::OK,
            Json(json!({
                "id": a.id,
                "email": a.email,
                "name": a.name,
            })),
        ).into_response(),
    }
}

pub async fn login(
    Extension(glob): Extension<Arc<Glob>>,
    body: String,
) -> Response {
    let form: LoginData = match serde_json::from_str(&body) {
        Ok(f) => f,
        Err(e) => {
            return respond_bad_request(format!(
                "Unable to deserialize login data: {}", &e
            ));
        },
    };
    log::trace!("admin::login( {:?} ) called.", &form.email);

    let admin = match glob.store.admin_by_email(&form.email).await {
        Err(e) => {
            log::error!(
                "Error looking up admin {:?}: {}",
                &form.email, e.display()
            );
            return text_500(None);
        },
        Ok(None) => {
            return respond_bad_credentials("Invalid admin credentials");
        },
        Ok(Some(a)) => a,
    };

    if !auth::verify_password(&form.password, &admin.password) {
        return respond_bad_credentials("Invalid admin credentials");
    }

    let token = match glob.mint.issue(admin.id, Role::Admin) {
        Ok(t) => t,
        Err(e) => {
            log::error!("Error issuing token for {:?}: {}", &form.email, &e);
            return text_500(None);
        },
    };

    (
        StatusCode::OK,
        Json(json!({
            "access_token": token,
            "token_type": "bearer",
        })),
    ).into_response()
}

#[derive(Deserialize)]
struct NameData {
    name: String,
}

pub async fn create_class(
    Extension(glob): Extension<Arc<Glob>>,
    body: String,
) -> Response {
    log::trace!("admin::create_class( [ body ] ) called.");

    let data: NameData = match serde_json::from_str(&body) {
        Ok(d) => d,
        Err(e) => {
            return respond_bad_request(format!(
                "Unable to deserialize class data: {}", &e
            ));
        },
    };

    match glob.store.insert_class(&data.name).await {
        Err(e) => {
            log::error!(
                "Error inserting class {:?}: {}",
                &data.name, e.display()
            );
            text_500(None)
        },
        Ok(class) => (StatusCode::OK, Json(class)).into_response(),
    }
}

pub async fn create_subject(
    Extension(glob): Extension<Arc<Glob>>,
    body: String,
) -> Response {
    log::trace!("admin::create_subject( [ body ] ) called.");

    let data: NameData = match serde_json::from_str(&body) {
        Ok(d) => d,
        Err(e) => {
            return respond_bad_request(format!(
                "Unable to deserialize subject data: {}", &e
            ));
        },
    };

    match glob.store.insert_subject(&data.name).await {
        Err(e) => {
            log::error!(
                "Error inserting subject {:?}: {}",
                &data.name, e.display()
            );
            text_500(None)
        },
        Ok(subject) => (StatusCode::OK, Json(subject)).into_response(),
    }
}

/// Both ids optional so a half-formed request earns its documented
/// "required" complaint rather than a deserialization error.
#[derive(Deserialize)]
struct AssignmentData {
    teacher_id: Option<i64>,
    class_id: Option<i64>,
}

pub async fn assign_teacher(
    Extension(glob): Extension<Arc<Glob>>,
    body: String,
) -> Response {
    log::trace!("admin::assign_teacher( [ body ] ) called.");

    let data: AssignmentData = match serde_json::from_str(&body) {
        Ok(d) => d,
        Err(e) => {
            return respond_bad_request(format!(
                "Unable to deserialize assignment data: {}", &e
            ));
        },
    };

    let (teacher_id, class_id) = match (data.teacher_id, data.class_id) {
        (Some(t), Some(c)) => (t, c),
        _ => {
            return respond_bad_request(
                "Teacher ID and Class ID are required".to_owned()
            );
        },
    };

    let teacher = match glob.store.teacher_by_id(teacher_id).await {
        Err(e) => {
            log::error!(
                "Error looking up teacher {}: {}",
                &teacher_id, e.display()
            );
            return text_500(None);
        },
        Ok(t) => t,
    };
    let class = match glob.store.class_by_id(class_id).await {
        Err(e) => {
            log::error!(
                "Error looking up class {}: {}",
                &class_id, e.display()
            );
            return text_500(None);
        },
        Ok(c) => c,
    };
    if teacher.is_none() || class.is_none() {
        return respond_not_found("Teacher or Class not found".to_owned());
    }

    match glob.store.assign_teacher_to_class(teacher_id, class_id).await {
        Err(e) => {
            log::error!(
                "Error assigning teacher {} to class {}: {}",
                &teacher_id, &class_id, e.display()
            );
            text_500(None)
        },
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "message": "Teacher assigned to class successfully"
            })),
        ).into_response(),
    }
}

#[derive(Deserialize)]
struct ScheduleData {
    class_id: i64,
    time_slot: i16,
    subject: String,
    date: Option<String>,
}

pub async fn create_schedule(
    Extension(glob): Extension<Arc<Glob>>,
    body: String,
) -> Response {
    log::trace!("admin::create_schedule( [ body ] ) called.");

    let data: ScheduleData = match serde_json::from_str(&body) {
        Ok(d) => d,
        Err(e) => {
            return respond_bad_request(format!(
                "Unable to deserialize schedule data: {}", &e
            ));
        },
    };

    let res = glob.store.insert_schedule(
        data.date.as_deref(),
        data.class_id,
        data.time_slot,
        &data.subject,
    ).await;

    match res {
        Err(e) => {
            log::error!(
                "Error inserting schedule for class {}: {}",
                &data.class_id, e.display()
            );
            text_500(None)
        },
        Ok(schedule) => (StatusCode::OK, Json(schedule)).into_response(),
    }
}

pub async fn list_teachers(
    Extension(glob): Extension<Arc<Glob>>,
) -> Response {
    log::trace!("admin::list_teachers() called.");

    let overview = match glob.store.teachers_overview().await {
        Err(e) => {
            log::error!("Error listing teachers: {}", e.display());
            return text_500(None);
        },
        Ok(o) => o,
    };

    let listing: Vec<serde_json::Value> = overview.iter()
        .map(|t| json!({
            "teacher_id": t.teacher_id,
            "user_id": t.user_id,
            "name": t.name.as_deref().unwrap_or("Unknown"),
            "subject": t.subject.as_deref().unwrap_or("Unknown"),
        }))
        .collect();

    (StatusCode::OK, Json(listing)).into_response()
}

pub async fn list_classes(
    Extension(glob): Extension<Arc<Glob>>,
) -> Response {
    log::trace!("admin::list_classes() called.");

    match glob.store.get_classes().await {
        Err(e) => {
            log::error!("Error listing classes: {}", e.display());
            text_500(None)
        },
        Ok(classes) => (StatusCode::OK, Json(classes)).into_response(),
    }
}

pub async fn list_subjects(
    Extension(glob): Extension<Arc<Glob>>,
) -> Response {
    log::trace!("admin::list_subjects() called.");

    match glob.store.get_subjects().await {
        Err(e) => {
            log::error!("Error listing subjects: {}", e.display());
            text_500(None)
        },
        Ok(subjects) => (StatusCode::OK, Json(subjects)).into_response(),
    }
}
