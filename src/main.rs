/*!
Here we go!
*/
use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{header, HeaderValue, Method},
    Json,
    middleware,
    Router,
    routing::{get, post},
};
use serde_json::json;
use simplelog::{ColorChoice, TerminalMode, TermLogger};
use tower_http::cors::CorsLayer;

use registrar::config;
use registrar::inter;

static DEFAULT_CONFIG: &str = "registrar.toml";

async fn root() -> Json<serde_json::Value> {
    Json(json!({ "message": "Welcome to the Student Management System" }))
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let log_cfg = simplelog::ConfigBuilder::new()
        .add_filter_allow_str("registrar")
        .build();
    TermLogger::init(
        registrar::log_level_from_env(),
        log_cfg,
        TerminalMode::Stdout,
        ColorChoice::Auto
    ).unwrap();
    log::info!("Logging started.");

    let config_path = std::env::var("REGISTRAR_CONFIG")
        .unwrap_or_else(|_| DEFAULT_CONFIG.to_owned());
    let glob = config::load_configuration(&config_path).await.unwrap();
    let addr = glob.addr;

    // One configured front-end origin gets cross-origin access, with
    // credentials.
    let cors = CorsLayer::new()
        .allow_origin(glob.frontend_origin.parse::<HeaderValue>().unwrap())
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true);

    let glob = Arc::new(glob);

    let user_routes = Router::new()
        .route("/register", post(inter::users::register))
        .route("/login", post(inter::users::login));

    let admin_api = Router::new()
        .route("/create-class", post(inter::admin::create_class))
        .route("/create-subject", post(inter::admin::create_subject))
        .route("/assign-teacher-to-class", post(inter::admin::assign_teacher))
        .route("/create-schedule", post(inter::admin::create_schedule))
        .route("/teachers", get(inter::admin::list_teachers))
        .route("/classes", get(inter::admin::list_classes))
        .route("/subjects", get(inter::admin::list_subjects))
        .route_layer(middleware::from_fn(inter::admin_authenticate));

    let admin_routes = Router::new()
        .route("/register", post(inter::admin::register))
        .route("/login", post(inter::admin::login))
        .merge(admin_api);

    let teacher_routes = Router::new()
        .route("/register-teacher", post(inter::teacher::register_teacher))
        .route("/subject/:teacher_id", get(inter::teacher::get_subject))
        .route("/classes/:teacher_id", get(inter::teacher::get_classes))
        .route("/students/:teacher_id", get(inter::teacher::get_students))
        .route("/add-score", post(inter::teacher::add_score))
        .route_layer(middleware::from_fn(inter::bearer_authenticate));

    let student_routes = Router::new()
        .route("/register-student", post(inter::student::register_student))
        .route("/scores/:user_id", get(inter::student::get_scores))
        .route("/schedule/:user_id", get(inter::student::get_schedule))
        .route_layer(middleware::from_fn(inter::bearer_authenticate));

    let app = Router::new()
        .route("/", get(root))
        .nest("/users", user_routes)
        .nest("/admin", admin_routes)
        .nest("/teachers", teacher_routes)
        .nest("/students", student_routes)
        .layer(Extension(glob))
        .layer(cors);

    log::info!("Listening on {}", &addr);

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await
        .unwrap();
}
