use crate::error::AppError;
use crate::handlers::page_context::PageContext;
use askama::Template;
use askama_web::WebTemplate;
use tower_sessions::Session;

#[derive(Template, WebTemplate)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    page: PageContext,
}

pub async fn index_handler(session: Session) -> Result<IndexTemplate, AppError> {
    Ok(IndexTemplate {
        page: PageContext::load(&session).await?,
    })
}
