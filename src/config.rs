//! Engine configuration.
//!
//! A [`Config`] is an explicit value handed to [`App::new`](crate::App::new).
//! Nothing is read from globals or the environment. It can be assembled in
//! code or loaded from TOML:
//!
//! ```toml
//! session-key = "random-string"
//! session-max-age = 86400
//! signature = "sha256"
//! template-path = "templates"
//!
//! [route-shortcut]
//! "{slug}" = "([a-z0-9-]+)"
//!
//! [context]
//! site = "wren"
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::codec::Signature;
use crate::error::Error;
use crate::request::Request;

/// Default name of the session cookie.
pub const SESSION_COOKIE: &str = "session";

/// Computes template variables from the request being served.
pub type ContextFn = Arc<dyn Fn(&Request) -> Map<String, Value> + Send + Sync + 'static>;

#[derive(Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct Config {
    /// Signing key. Sessions are only persisted when this is set.
    pub session_key: Option<String>,
    /// Seconds a session cookie stays valid. `None` never expires.
    pub session_max_age: Option<u64>,
    pub session_cookie: String,
    pub signature: Signature,
    /// Directory templates are loaded from.
    pub template_path: Option<PathBuf>,
    /// Placeholder token to regex fragment, e.g. `"{slug}" → "([a-z-]+)"`.
    #[serde(rename = "route-shortcut")]
    pub route_shortcuts: BTreeMap<String, String>,
    /// Variables every template sees.
    pub context: Map<String, Value>,
    #[serde(skip)]
    context_fn: Option<ContextFn>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_toml_str(source: &str) -> Result<Self, Error> {
        Ok(toml::from_str(source)?)
    }

    pub fn session_key(mut self, key: impl Into<String>) -> Self {
        self.session_key = Some(key.into());
        self
    }

    pub fn session_max_age(mut self, seconds: u64) -> Self {
        self.session_max_age = Some(seconds);
        self
    }

    pub fn session_cookie(mut self, name: impl Into<String>) -> Self {
        self.session_cookie = name.into();
        self
    }

    pub fn signature(mut self, signature: Signature) -> Self {
        self.signature = signature;
        self
    }

    pub fn template_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.template_path = Some(path.into());
        self
    }

    pub fn route_shortcut(mut self, token: impl Into<String>, fragment: impl Into<String>) -> Self {
        self.route_shortcuts.insert(token.into(), fragment.into());
        self
    }

    /// Fixed template variables. Replaced by [`context_fn`](Self::context_fn)
    /// when both are set.
    pub fn context(mut self, context: Map<String, Value>) -> Self {
        self.context = context;
        self
    }

    /// Template variables computed per request.
    pub fn context_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&Request) -> Map<String, Value> + Send + Sync + 'static,
    {
        self.context_fn = Some(Arc::new(f));
        self
    }

    /// Settles the `context` option into a single source.
    pub(crate) fn context_source(&self) -> ContextSource {
        match &self.context_fn {
            Some(f) => ContextSource::Fn(Arc::clone(f)),
            None if self.context.is_empty() => ContextSource::Empty,
            None => ContextSource::Map(self.context.clone()),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            session_key: None,
            session_max_age: None,
            session_cookie: SESSION_COOKIE.to_owned(),
            signature: Signature::default(),
            template_path: None,
            route_shortcuts: BTreeMap::new(),
            context: Map::new(),
            context_fn: None,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("session_key", &self.session_key.as_ref().map(|_| "<redacted>"))
            .field("session_max_age", &self.session_max_age)
            .field("session_cookie", &self.session_cookie)
            .field("signature", &self.signature)
            .field("template_path", &self.template_path)
            .field("route_shortcuts", &self.route_shortcuts)
            .field("context", &self.context)
            .field("context_fn", &self.context_fn.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

/// The `context` option, resolved once at startup.
#[derive(Clone)]
pub(crate) enum ContextSource {
    Empty,
    Map(Map<String, Value>),
    Fn(ContextFn),
}

impl ContextSource {
    pub(crate) fn variables(&self, request: &Request) -> Map<String, Value> {
        match self {
            Self::Empty => Map::new(),
            Self::Map(map) => map.clone(),
            Self::Fn(f) => f(request),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn loads_kebab_case_toml() {
        let config = Config::from_toml_str(
            r#"
            session-key = "random-string"
            session-max-age = 60
            signature = "sha256"
            template-path = "views"

            [route-shortcut]
            "{custom}" = "(abc|def)"

            [context]
            hello = "!"
            "#,
        )
        .unwrap();

        assert_eq!(config.session_key.as_deref(), Some("random-string"));
        assert_eq!(config.session_max_age, Some(60));
        assert_eq!(config.session_cookie, SESSION_COOKIE);
        assert_eq!(config.signature, Signature::Sha256);
        assert_eq!(config.template_path, Some(PathBuf::from("views")));
        assert_eq!(config.route_shortcuts.get("{custom}").map(String::as_str), Some("(abc|def)"));
        assert_eq!(config.context.get("hello"), Some(&json!("!")));
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(matches!(
            Config::from_toml_str("sesion-key = \"typo\""),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn context_source_prefers_the_function() {
        let req = Request::builder("GET", "/ok").build();

        assert!(matches!(Config::new().context_source(), ContextSource::Empty));

        let mut fixed = Map::new();
        fixed.insert("hello".into(), json!("!"));
        let config = Config::new().context(fixed.clone());
        assert_eq!(config.context_source().variables(&req), fixed);

        let config = config.context_fn(|req| {
            let mut map = Map::new();
            map.insert("hello".into(), json!(req.path()));
            map
        });
        assert_eq!(config.context_source().variables(&req).get("hello"), Some(&json!("/ok")));
    }
}
