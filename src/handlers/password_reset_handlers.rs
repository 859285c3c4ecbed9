use crate::auth::session::{flash, FlashKind};
use crate::error::AppError;
use crate::handlers::page_context::PageContext;
use crate::middleware::csrf::validate_csrf_form_field;
use crate::services::{PasswordResetError, ResetRequestOutcome};
use crate::AppState;
use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Form, Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;

#[derive(Template, WebTemplate)]
#[template(path = "auth/reset.html")]
pub struct ResetTemplate {
    page: PageContext,
}

#[derive(Template, WebTemplate)]
#[template(path = "auth/new_password.html")]
pub struct NewPasswordTemplate {
    page: PageContext,
    user_id: i64,
    password_token: String,
}

#[derive(Deserialize)]
pub struct ResetForm {
    email: String,
    csrf_token: String,
}

#[derive(Deserialize)]
pub struct NewPasswordForm {
    user_id: i64,
    password_token: String,
    password: String,
    csrf_token: String,
}

pub async fn reset_page(session: Session) -> Result<ResetTemplate, AppError> {
    Ok(ResetTemplate {
        page: PageContext::load(&session).await?,
    })
}

pub async fn request_reset_handler(
    State(app_state): State<AppState>,
    session: Session,
    Form(form): Form<ResetForm>,
) -> Result<Redirect, AppError> {
    validate_csrf_form_field(&session, &form.csrf_token).await?;

    match app_state.reset_service.request_reset(&form.email).await? {
        ResetRequestOutcome::UnknownAccount => {
            flash(&session, FlashKind::Error, "No account with that email found.").await;
            Ok(Redirect::to("/reset"))
        }
        ResetRequestOutcome::Issued => {
            flash(
                &session,
                FlashKind::Info,
                "Password reset link sent. Check your email.",
            )
            .await;
            Ok(Redirect::to("/"))
        }
    }
}

/// Target of the emailed link.
pub async fn new_password_page(
    State(app_state): State<AppState>,
    session: Session,
    Path(token): Path<String>,
) -> Result<Response, AppError> {
    match app_state.reset_service.validate_reset_token(&token).await {
        Ok(user) => Ok(NewPasswordTemplate {
            page: PageContext::load(&session).await?,
            user_id: user.id,
            password_token: token,
        }
        .into_response()),
        Err(PasswordResetError::InvalidToken) => {
            flash(
                &session,
                FlashKind::Error,
                &PasswordResetError::InvalidToken.to_string(),
            )
            .await;
            Ok(Redirect::to("/reset").into_response())
        }
        Err(err) => Err(err.into()),
    }
}

pub async fn new_password_handler(
    State(app_state): State<AppState>,
    session: Session,
    Form(form): Form<NewPasswordForm>,
) -> Result<Response, AppError> {
    validate_csrf_form_field(&session, &form.csrf_token).await?;

    match app_state
        .reset_service
        .redeem(form.user_id, &form.password_token, &form.password)
        .await
    {
        Ok(_) => {
            flash(
                &session,
                FlashKind::Info,
                "The password has been updated. Please login.",
            )
            .await;
            Ok(Redirect::to("/login").into_response())
        }
        Err(err @ PasswordResetError::InvalidToken) => {
            let page = PageContext::load(&session).await?.with_error(err.to_string());
            Ok((StatusCode::UNPROCESSABLE_ENTITY, ResetTemplate { page }).into_response())
        }
        Err(err @ PasswordResetError::WeakPassword) => {
            let page = PageContext::load(&session).await?.with_error(err.to_string());
            Ok((
                StatusCode::UNPROCESSABLE_ENTITY,
                NewPasswordTemplate {
                    page,
                    user_id: form.user_id,
                    password_token: form.password_token,
                },
            )
                .into_response())
        }
        Err(err) => Err(err.into()),
    }
}
