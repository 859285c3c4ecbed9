use crate::{auth, config::SessionLayer, handlers, middleware::add_security_headers, AppState};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

pub fn router(app_state: AppState, session_layer: SessionLayer) -> Router {
    Router::new()
        .route("/", get(handlers::index_handler))
        .route(
            "/login",
            get(auth::handlers::login_page).post(auth::handlers::login_handler),
        )
        .route(
            "/signup",
            get(auth::handlers::signup_page).post(auth::handlers::signup_handler),
        )
        .route("/logout", post(auth::handlers::logout_handler))
        .route(
            "/reset",
            get(handlers::reset_page).post(handlers::request_reset_handler),
        )
        .route("/reset/{token}", get(handlers::new_password_page))
        .route("/new-password", post(handlers::new_password_handler))
        .route("/user/{user_id}", get(handlers::edit_user_page))
        .route("/edit-user/{user_id}", post(handlers::edit_user_handler))
        .layer(session_layer)
        .layer(middleware::from_fn(add_security_headers))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
