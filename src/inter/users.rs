/*!
Subcrate for interoperation with regular user accounts: registration and
login. Both endpoints are public; everything a user goes on to do happens
through the teacher- and student-facing routes.
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
struct UserRegistrationData {
    email: String,
    password: String,
    gender: Option<String>,
    date_of_birth: Option<String>,
    name: Option<String>,
}

pub async fn register(
    Extension(glob): Extension<Arc<Glob>>,
    body: String,
) -> Response {
    log::trace!("users::register( [ body ] ) called.");

    let data: UserRegistrationData = match serde_json::from_str(&body) {
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

    let res = glob.store.insert_user(
        &data.email,
        &hash,
        data.gender.as_deref(),
        data.date_of_birth.as_deref(),
        data.name.as_deref(),
    ).await;

    match res {
        Err(e) => {
            log::error!(
                "Error inserting user {:?}: {}",
                &data.email, e.display()
            );
            text_500(None)
        },
        Ok(RegisterResult::DuplicateEmail) => {
            respond_bad_request("Email already registered".to_owned())
        },
        Ok(RegisterResult::Created(u)) => (
            StatusCode::OK,
            Json(json!({
                "id": u.id,
                "email": u.email,
                "name": u.name,
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
    log::trace!("users::login( {:?} ) called.", &form.email);

    let user = match glob.store.user_by_email(&form.email).await {
        Err(e) => {
            log::error!(
                "Error looking up user {:?}: {}",
                &form.email, e.display()
            );
            return text_500(None);
        },
        Ok(None) => {
            return respond_bad_credentials("Invalid email or password");
        },
        Ok(Some(u)) => u,
    };

    if !auth::verify_password(&form.password, &user.password) {
        return respond_bad_credentials("Invalid email or password");
    }

    let token = match glob.mint.issue(user.id, Role::User) {
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
