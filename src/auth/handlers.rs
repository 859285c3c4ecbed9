use crate::auth::session::{flash, FlashKind, SessionContext, SessionUser};
use crate::error::AppError;
use crate::handlers::page_context::PageContext;
use crate::middleware::csrf::validate_csrf_form_field;
use crate::services::{
    auth_service::{AuthServiceError, LoginRequest},
    user_service::CreateUserRequest,
    OutgoingEmail,
};
use crate::AppState;
use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Form, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;

#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    page: PageContext,
    email: String,
}

#[derive(Template, WebTemplate)]
#[template(path = "auth/signup.html")]
pub struct SignupTemplate {
    page: PageContext,
    email: String,
    user_name: String,
}

#[derive(Deserialize)]
pub struct LoginForm {
    email: String,
    password: String,
    csrf_token: String,
}

#[derive(Deserialize)]
pub struct SignupForm {
    email: String,
    #[serde(default)]
    user_name: String,
    password: String,
    confirm_password: String,
    csrf_token: String,
}

pub async fn login_page(session: Session) -> Result<LoginTemplate, AppError> {
    Ok(LoginTemplate {
        page: PageContext::load(&session).await?,
        email: String::new(),
    })
}

pub async fn login_handler(
    State(app_state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    validate_csrf_form_field(&session, &form.csrf_token).await?;

    let request = LoginRequest {
        email: form.email.clone(),
        password: form.password,
    };

    match app_state.auth_service.authenticate(request).await {
        Ok(user) => {
            session.cycle_id().await?;
            SessionContext::logged_in(SessionUser::from(&user))
                .store(&session)
                .await?;
            tracing::info!(user_id = user.id, "User logged in");
            Ok(Redirect::to("/").into_response())
        }
        Err(AuthServiceError::RepositoryError(e)) => Err(e.into()),
        Err(err) => {
            let page = PageContext::load(&session).await?.with_error(err.to_string());
            Ok((
                StatusCode::UNPROCESSABLE_ENTITY,
                LoginTemplate {
                    page,
                    email: form.email,
                },
            )
                .into_response())
        }
    }
}

pub async fn signup_page(session: Session) -> Result<SignupTemplate, AppError> {
    Ok(SignupTemplate {
        page: PageContext::load(&session).await?,
        email: String::new(),
        user_name: String::new(),
    })
}

pub async fn signup_handler(
    State(app_state): State<AppState>,
    session: Session,
    Form(form): Form<SignupForm>,
) -> Result<Response, AppError> {
    validate_csrf_form_field(&session, &form.csrf_token).await?;

    let request = CreateUserRequest {
        email: form.email.clone(),
        user_name: form.user_name.clone(),
        password: form.password,
        password_confirm: Some(form.confirm_password),
    };

    match app_state.user_service.create_user(request).await {
        Ok(user) => {
            tracing::info!(user_id = user.id, "User signed up");
            flash(
                &session,
                FlashKind::Info,
                "You are registered successfully. Please login.",
            )
            .await;
            app_state
                .mailer
                .dispatch(OutgoingEmail::signup_succeeded(&user.email, &user.user_name));
            Ok(Redirect::to("/login").into_response())
        }
        Err(err) if err.is_user_facing() => {
            let page = PageContext::load(&session).await?.with_error(err.to_string());
            Ok((
                StatusCode::UNPROCESSABLE_ENTITY,
                SignupTemplate {
                    page,
                    email: form.email,
                    user_name: form.user_name,
                },
            )
                .into_response())
        }
        Err(err) => Err(err.into()),
    }
}

#[derive(Deserialize)]
pub struct LogoutForm {
    csrf_token: String,
}

pub async fn logout_handler(
    session: Session,
    Form(form): Form<LogoutForm>,
) -> Result<Redirect, AppError> {
    validate_csrf_form_field(&session, &form.csrf_token).await?;
    session.flush().await?;
    Ok(Redirect::to("/"))
}
