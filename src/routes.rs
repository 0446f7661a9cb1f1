// src/routes.rs

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post, put},
};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::{
    handlers::{admin, auth, ebook, exam, registration},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware, participant_middleware},
};

/// Slack on top of the file limits for the other multipart fields.
const FORM_OVERHEAD: usize = 64 * 1024;

/// Assembles the main application router.
///
/// * `/api/user` - registration, payment order, email verification, login, e-book.
/// * `/api/exam` - participant exam flow; adding questions is admin only.
/// * `/api/admin` - administrator login and participant management.
pub fn create_router(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .cors_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let photo_limit = DefaultBodyLimit::max(state.config.uploads.max_photo_bytes + FORM_OVERHEAD);
    let archive_limit =
        DefaultBodyLimit::max(state.config.uploads.max_archive_bytes + FORM_OVERHEAD);

    let user_routes = Router::new()
        .route("/send-otp", post(registration::send_otp))
        .route("/verify-otp", post(registration::verify_otp))
        .route("/create-order", post(registration::create_order))
        .route(
            "/register",
            post(registration::register).layer(photo_limit.clone()),
        )
        .route("/login", post(auth::login))
        // Protected participant routes
        .merge(
            Router::new()
                .route("/ebook", get(ebook::get_ebook))
                .layer(middleware::from_fn(participant_middleware))
                .layer(middleware::from_fn_with_state(state.clone(), auth_middleware)),
        );

    let exam_routes = Router::new()
        .merge(
            Router::new()
                .route("/start", get(exam::start_exam))
                .route("/submit", post(exam::submit_exam))
                .route("/violation", post(exam::report_violation))
                .layer(middleware::from_fn(participant_middleware))
                .layer(middleware::from_fn_with_state(state.clone(), auth_middleware)),
        )
        .merge(
            Router::new()
                .route("/questions", post(exam::add_question))
                .layer(middleware::from_fn(admin_middleware))
                .layer(middleware::from_fn_with_state(state.clone(), auth_middleware)),
        );

    let admin_routes = Router::new()
        .route("/participants", get(admin::list_participants))
        .route("/participants/bulk", post(admin::bulk_register))
        .route(
            "/participants/photos",
            post(admin::bulk_upload_photos).layer(archive_limit),
        )
        .route(
            "/participants/{registration_id}",
            get(admin::get_participant).put(admin::update_participant),
        )
        .route(
            "/participants/{registration_id}/photo",
            put(admin::update_participant_photo).layer(photo_limit),
        )
        .route("/audit-logs", get(admin::list_audit_logs))
        // Double middleware protection: Auth first, then Admin check
        .layer(middleware::from_fn(admin_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .merge(Router::new().route("/login", post(auth::admin_login)));

    Router::new()
        .nest("/api/user", user_routes)
        .nest("/api/exam", exam_routes)
        .nest("/api/admin", admin_routes)
        .nest_service("/uploads", ServeDir::new(state.config.uploads.dir.clone()))
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
