//! HTML templates

use minijinja::Environment;
use serde::Serialize;

use rabbithole_common::errors::Result;

const PAGE_TEMPLATE: &str = "page.html";

/// Compiled templates; `.html` names are auto-escaped
pub struct Templates {
    env: Environment<'static>,
}

impl Templates {
    pub fn new() -> std::result::Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        env.add_template(PAGE_TEMPLATE, include_str!("../templates/page.html"))?;
        Ok(Self { env })
    }

    pub fn render_page<S: Serialize>(&self, context: &S) -> Result<String> {
        let template = self.env.get_template(PAGE_TEMPLATE)?;
        Ok(template.render(context)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_templates_compile() {
        assert!(Templates::new().is_ok());
    }

    #[test]
    fn test_user_text_is_escaped() {
        let templates = Templates::new().unwrap();
        let html = templates
            .render_page(&json!({
                "query": "<script>alert(1)</script>",
                "keyed": false,
                "limits": {"limit_refs": 5, "limit_cites": 5},
                "max_limit": 20,
            }))
            .unwrap();

        assert!(!html.contains("<script>alert(1)</script>"));
        assert!(html.contains("&lt;script&gt;"));
    }
}
