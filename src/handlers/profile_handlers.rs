use crate::auth::guard::authorize;
use crate::auth::session::{flash, FlashKind, SessionContext};
use crate::error::AppError;
use crate::handlers::page_context::PageContext;
use crate::middleware::csrf::validate_csrf_form_field;
use crate::services::user_service::{UpdateProfileRequest, UserServiceError};
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
#[template(path = "auth/edit_user.html")]
pub struct EditUserTemplate {
    page: PageContext,
    user_id: i64,
    email: String,
    user_name: String,
}

#[derive(Deserialize)]
pub struct EditUserForm {
    email: String,
    #[serde(default)]
    user_name: String,
    password: Option<String>,
    new_password: Option<String>,
    csrf_token: String,
}

pub async fn edit_user_page(
    State(app_state): State<AppState>,
    session: Session,
    Path(user_id): Path<i64>,
) -> Result<Response, AppError> {
    let context = SessionContext::load(&session).await?;
    authorize(context.identity(), user_id).require()?;

    let Some(user) = app_state.user_service.find_user_by_id(user_id).await? else {
        return Ok(Redirect::to("/").into_response());
    };

    Ok(EditUserTemplate {
        page: PageContext::load(&session).await?,
        user_id: user.id,
        email: user.email,
        user_name: user.user_name,
    }
    .into_response())
}

pub async fn edit_user_handler(
    State(app_state): State<AppState>,
    session: Session,
    Path(user_id): Path<i64>,
    Form(form): Form<EditUserForm>,
) -> Result<Response, AppError> {
    let context = SessionContext::load(&session).await?;
    authorize(context.identity(), user_id).require()?;
    validate_csrf_form_field(&session, &form.csrf_token).await?;

    let request = UpdateProfileRequest {
        user_id,
        email: form.email.clone(),
        user_name: form.user_name.clone(),
        password: form.password,
        new_password: form.new_password,
    };

    match app_state.user_service.update_profile(request).await {
        Ok(user) => {
            context.with_user(&user).store(&session).await?;
            tracing::info!(user_id = user.id, "Profile updated");
            flash(
                &session,
                FlashKind::Info,
                &format!("The user \"{}\" has been updated.", user.user_name),
            )
            .await;
            Ok(Redirect::to("/").into_response())
        }
        Err(err @ UserServiceError::UserNotFound) => {
            flash(&session, FlashKind::Error, &err.to_string()).await;
            Ok(Redirect::to("/").into_response())
        }
        Err(err) if err.is_user_facing() => {
            let page = PageContext::load(&session).await?.with_error(err.to_string());
            Ok((
                StatusCode::UNPROCESSABLE_ENTITY,
                EditUserTemplate {
                    page,
                    user_id,
                    email: form.email,
                    user_name: form.user_name,
                },
            )
                .into_response())
        }
        Err(err) => Err(err.into()),
    }
}
