// src/templates.rs

use axum::response::Html;
use tera::{Context, Tera};

use crate::{error::AppError, exam::session::FlashMessage};

/// Builds the template engine from the templates compiled into the binary.
pub fn engine() -> Result<Tera, tera::Error> {
    let mut tera = Tera::default();
    tera.add_raw_templates(vec![
        ("base.html", include_str!("../templates/base.html")),
        ("home.html", include_str!("../templates/home.html")),
        ("start_quiz.html", include_str!("../templates/start_quiz.html")),
        ("instructions.html", include_str!("../templates/instructions.html")),
        ("quiz.html", include_str!("../templates/quiz.html")),
        ("completion.html", include_str!("../templates/completion.html")),
        ("results.html", include_str!("../templates/results.html")),
    ])?;
    Ok(tera)
}

/// Context pre-filled with the flash messages every page displays.
pub fn page_context(messages: &[FlashMessage]) -> Context {
    let mut context = Context::new();
    context.insert("messages", messages);
    context
}

pub fn render(tera: &Tera, template: &str, context: &Context) -> Result<Html<String>, AppError> {
    let html = tera.render(template, context).map_err(|e| {
        tracing::error!("Failed to render {}: {:?}", template, e);
        AppError::from(e)
    })?;
    Ok(Html(html))
}
