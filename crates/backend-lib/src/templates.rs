// ============================
// idgate-backend-lib/src/templates.rs
// ============================
//! HTML pages rendered with handlebars.
use handlebars::Handlebars;
use serde_json::json;

use crate::error::AppError;

const LOGIN: &str = "login";
const INDEX: &str = "index";

/// Registry with every page template compiled once at startup
#[derive(Clone)]
pub struct Templates {
    registry: Handlebars<'static>,
}

impl Templates {
    pub fn new() -> Result<Self, AppError> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(true);
        registry.register_template_string(LOGIN, include_str!("../templates/login.html"))?;
        registry.register_template_string(INDEX, include_str!("../templates/index.html"))?;
        Ok(Self { registry })
    }

    /// Login form; `message` must be one of the user-facing auth messages
    pub fn login(&self, csrf: &str, uid: &str, message: Option<&str>) -> Result<String, AppError> {
        let data = json!({
            "csrf": csrf,
            "uid": uid,
            "message": message,
        });
        Ok(self.registry.render(LOGIN, &data)?)
    }

    pub fn index(&self, user: &str) -> Result<String, AppError> {
        Ok(self.registry.render(INDEX, &json!({ "user": user }))?)
    }
}
