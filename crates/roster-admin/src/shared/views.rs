//! Server-side views
//!
//! minijinja templates compiled into the binary. HTML auto-escaping is on
//! for every `.html` template.

use axum::response::Html;
use minijinja::{default_auto_escape_callback, Environment, Value};

use crate::shared::error::Result;

pub trait TemplateEngine: Send + Sync {
    fn render(&self, template_name: &str, context: Value) -> std::result::Result<String, minijinja::Error>;
}

pub struct MiniJinjaEngine {
    env: Environment<'static>,
}

impl MiniJinjaEngine {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_auto_escape_callback(default_auto_escape_callback);
        env.set_loader(embedded_template_loader);
        Self { env }
    }
}

impl Default for MiniJinjaEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateEngine for MiniJinjaEngine {
    fn render(&self, template_name: &str, context: Value) -> std::result::Result<String, minijinja::Error> {
        let tmpl = self.env.get_template(template_name)?;
        tmpl.render(context)
    }
}

/// Render a page, surfacing template failures as `AdminError::Template`.
pub fn render_html(engine: &dyn TemplateEngine, template_name: &str, context: Value) -> Result<Html<String>> {
    Ok(Html(engine.render(template_name, context)?))
}

fn embedded_template_loader(name: &str) -> std::result::Result<Option<String>, minijinja::Error> {
    let content = match name {
        "layout.html" => Some(include_str!("../../templates/layout.html")),

        "users/index.html" => Some(include_str!("../../templates/users/index.html")),
        "users/create.html" => Some(include_str!("../../templates/users/create.html")),
        "users/edit.html" => Some(include_str!("../../templates/users/edit.html")),
        "users/change_password.html" => Some(include_str!("../../templates/users/change_password.html")),

        _ => None,
    };

    Ok(content.map(|s| s.to_string()))
}
