//! Template rendering.
//!
//! The engine only needs "name + variables in, string out", so rendering sits
//! behind the [`Renderer`] trait. [`Templates`] is the stock implementation:
//! minijinja loading files from the configured `template-path`.

use std::path::Path;
use std::sync::Arc;

use minijinja::{AutoEscape, Environment};
use serde_json::{Map, Value, json};

use crate::config::ContextSource;
use crate::error::Error;
use crate::request::Request;

/// Renders a named template with a JSON object of variables.
pub trait Renderer: Send + Sync {
    fn render(&self, name: &str, variables: &Value) -> Result<String, Error>;
}

/// Templates loaded lazily from a directory. Output is not auto-escaped.
pub struct Templates {
    env: Environment<'static>,
}

impl Templates {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        let mut env = Environment::new();
        env.set_loader(minijinja::path_loader(dir.as_ref().to_path_buf()));
        env.set_auto_escape_callback(|_| AutoEscape::None);
        Self { env }
    }
}

impl Renderer for Templates {
    fn render(&self, name: &str, variables: &Value) -> Result<String, Error> {
        let template = self.env.get_template(name)?;
        Ok(template.render(variables)?)
    }
}

/// The renderer plus the resolved `context` option.
pub(crate) struct Templating {
    renderer: Option<Arc<dyn Renderer>>,
    context: ContextSource,
}

impl Templating {
    pub(crate) fn new(renderer: Option<Arc<dyn Renderer>>, context: ContextSource) -> Self {
        Self { renderer, context }
    }

    /// Variables, later layers winning: configured context, then `request`,
    /// then `extra` (when it is an object).
    pub(crate) fn render(&self, request: &Request, name: &str, extra: Value) -> Result<String, Error> {
        let renderer = self.renderer.as_ref().ok_or(Error::TemplatePathUnset)?;

        let mut variables: Map<String, Value> = self.context.variables(request);
        variables.insert(
            "request".to_owned(),
            json!({
                "path": request.path(),
                "method": request.method().as_str(),
                "query_string": request.query_string(),
            }),
        );
        if let Value::Object(extra) = extra {
            variables.extend(extra);
        }
        renderer.render(name, &Value::Object(variables))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OK_HTML: &str = "<b>ok хорошо {{ request.path }} {{- hello }}</b>\n";

    fn template_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("ok.html"), OK_HTML).unwrap();
        dir
    }

    #[test]
    fn renders_from_the_template_dir() {
        let dir = template_dir();
        let templates = Templates::new(dir.path());
        let out = templates.render("ok.html", &json!({"request": {"path": "/ok"}, "hello": "!"})).unwrap();
        assert_eq!(out, "<b>ok хорошо /ok!</b>");
    }

    #[test]
    fn missing_template_is_an_error() {
        let dir = template_dir();
        let templates = Templates::new(dir.path());
        assert!(matches!(templates.render("nope.html", &json!({})), Err(Error::Template(_))));
    }

    #[test]
    fn layering_lets_extra_win() {
        let dir = template_dir();
        let mut fixed = Map::new();
        fixed.insert("hello".into(), json!("?"));
        let templating = Templating::new(
            Some(Arc::new(Templates::new(dir.path()))),
            ContextSource::Map(fixed),
        );
        let req = Request::builder("GET", "/ok3").build();

        assert_eq!(templating.render(&req, "ok.html", Value::Null).unwrap(), "<b>ok хорошо /ok3?</b>");
        assert_eq!(
            templating.render(&req, "ok.html", json!({"hello": "!"})).unwrap(),
            "<b>ok хорошо /ok3!</b>"
        );
    }

    #[test]
    fn unset_template_path() {
        let templating = Templating::new(None, ContextSource::Empty);
        let req = Request::builder("GET", "/").build();
        assert!(matches!(
            templating.render(&req, "ok.html", Value::Null),
            Err(Error::TemplatePathUnset)
        ));
    }
}
