//! Ordered regex route table.
//!
//! Every entry is compiled once, at registration, into an anchored regex plus
//! the method it answers. Lookup walks entries in registration order and the
//! first hit wins. There is no "best match" scoring.
//!
//! Pattern syntax:
//!
//! - a regex over the path, anchored at both ends for you;
//! - an optional method discriminator suffix, `#post`, case-insensitive,
//!   `GET` when absent;
//! - shortcut tokens, replaced before compiling: `<int>` → `(\d+)`,
//!   `<string>` → `([^/]+)`, plus any configured ones.

use std::collections::BTreeMap;

use regex::Regex;

use crate::error::Error;
use crate::handler::{Handler, Params};
use crate::method::Method;

/// Shortcuts every table understands. Applied before configured ones.
const BUILTIN_SHORTCUTS: [(&str, &str); 2] = [
    ("<int>", r"(\d+)"),
    ("<string>", r"([^/]+)"),
];

/// A pattern resolved at registration time.
#[derive(Clone, Debug)]
pub struct CompiledPattern {
    /// Pattern as written, discriminator removed.
    pub base: String,
    pub method: Method,
    /// Group names in capture order; `None` for unnamed groups.
    pub capture_names: Vec<Option<String>>,
    regex: Regex,
}

impl CompiledPattern {
    pub fn compile(pattern: &str, shortcuts: &BTreeMap<String, String>) -> Result<Self, Error> {
        let (base, method) = split_discriminator(pattern);

        let mut expanded = base.to_owned();
        for (token, fragment) in BUILTIN_SHORTCUTS {
            expanded = expanded.replace(token, fragment);
        }
        for (token, fragment) in shortcuts {
            expanded = expanded.replace(token.as_str(), fragment);
        }

        let regex = Regex::new(&format!("^(?:{expanded})$")).map_err(|source| Error::InvalidRoute {
            pattern: pattern.to_owned(),
            source,
        })?;
        let capture_names = regex.capture_names()
            .skip(1)
            .map(|name| name.map(str::to_owned))
            .collect();

        Ok(Self { base: base.to_owned(), method, capture_names, regex })
    }

    /// Captured values when `path` matches, `None` otherwise.
    pub fn captures(&self, path: &str) -> Option<Vec<Option<String>>> {
        let caps = self.regex.captures(path)?;
        Some(
            caps.iter()
                .skip(1)
                .map(|group| group.map(|m| m.as_str().to_owned()))
                .collect(),
        )
    }
}

/// Splits `"/path#post"` into `("/path", POST)`. A `#` followed by anything
/// other than a method token stays part of the regex.
fn split_discriminator(pattern: &str) -> (&str, Method) {
    match pattern.rsplit_once('#') {
        Some((base, method))
            if !method.is_empty()
                && method.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_') =>
        {
            (base, Method::from(method))
        }
        _ => (pattern, Method::Get),
    }
}

struct Route {
    pattern: CompiledPattern,
    handler: Handler,
}

/// A successful lookup.
pub struct Match<'a> {
    pub handler: &'a Handler,
    pub params: Params,
}

/// The application route table. Build it once; it is read-only afterwards.
#[derive(Default)]
pub struct RouteTable {
    routes: Vec<Route>,
    shortcuts: BTreeMap<String, String>,
}

impl RouteTable {
    pub fn new(shortcuts: BTreeMap<String, String>) -> Self {
        Self { routes: Vec::new(), shortcuts }
    }

    /// Appends an entry. Earlier entries take priority.
    pub fn add(&mut self, pattern: &str, handler: Handler) -> Result<(), Error> {
        let pattern = CompiledPattern::compile(pattern, &self.shortcuts)?;
        self.routes.push(Route { pattern, handler });
        Ok(())
    }

    /// First entry whose method and pattern both match.
    pub fn lookup(&self, path: &str, method: &Method) -> Option<Match<'_>> {
        self.routes.iter()
            .filter(|route| route.pattern.method == *method)
            .find_map(|route| {
                let values = route.pattern.captures(path)?;
                Some(Match {
                    handler: &route.handler,
                    params: Params::new(values, route.pattern.capture_names.clone()),
                })
            })
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::Static;

    fn body(m: Option<Match<'_>>) -> Option<String> {
        match m?.handler {
            Handler::Static(s) => Some(s.body.clone()),
            Handler::Callable(_) => None,
        }
    }

    fn table(entries: &[(&str, &str)]) -> RouteTable {
        let mut table = RouteTable::default();
        for (pattern, answer) in entries {
            table.add(pattern, Static::new(*answer).into()).unwrap();
        }
        table
    }

    #[test]
    fn patterns_are_anchored() {
        let t = table(&[("/ok", "ok")]);
        assert_eq!(body(t.lookup("/ok", &Method::Get)).as_deref(), Some("ok"));
        assert!(t.lookup("/ok/more", &Method::Get).is_none());
        assert!(t.lookup("/not/ok", &Method::Get).is_none());
    }

    #[test]
    fn first_registered_match_wins() {
        let t = table(&[("/a/(.*)", "first"), ("/a/b", "second")]);
        assert_eq!(body(t.lookup("/a/b", &Method::Get)).as_deref(), Some("first"));
    }

    #[test]
    fn discriminator_selects_the_method() {
        let t = table(&[("/#post", "post"), ("/", "get"), ("/m#PUBLISH", "publish")]);
        assert_eq!(body(t.lookup("/", &Method::Get)).as_deref(), Some("get"));
        assert_eq!(body(t.lookup("/", &Method::Post)).as_deref(), Some("post"));
        assert!(t.lookup("/", &Method::Put).is_none());
        assert_eq!(body(t.lookup("/m", &Method::from("publish"))).as_deref(), Some("publish"));
        assert!(t.lookup("/m", &Method::Get).is_none());
    }

    #[test]
    fn hash_that_is_not_a_method_stays_in_the_regex() {
        let compiled = CompiledPattern::compile("/a#b/c", &BTreeMap::new()).unwrap();
        assert_eq!(compiled.method, Method::Get);
        assert_eq!(compiled.base, "/a#b/c");
    }

    #[test]
    fn captures_in_order_with_unmatched_groups() {
        let mut shortcuts = BTreeMap::new();
        shortcuts.insert("{custom}".to_owned(), "(abc|def)".to_owned());
        let compiled = CompiledPattern::compile(r"/(\d+)/<int>/<string>(/x)?", &shortcuts).unwrap();
        assert_eq!(
            compiled.captures("/123/456/hello"),
            Some(vec![Some("123".into()), Some("456".into()), Some("hello".into()), None])
        );
        assert_eq!(compiled.captures("/123/abc/hello"), None);

        let custom = CompiledPattern::compile(r"/(\d+)/{custom}", &shortcuts).unwrap();
        assert_eq!(custom.captures("/123/def"), Some(vec![Some("123".into()), Some("def".into())]));
        assert_eq!(custom.captures("/123/xyz"), None);
        assert_eq!(custom.captures("/123/abcd"), None);
    }

    #[test]
    fn named_groups_are_recorded() {
        let compiled = CompiledPattern::compile(r"/users/(?P<id>\d+)", &BTreeMap::new()).unwrap();
        assert_eq!(compiled.capture_names, vec![Some("id".to_owned())]);
    }

    #[test]
    fn bad_regex_is_reported() {
        let mut t = RouteTable::default();
        let err = t.add("/(unclosed", Static::new("").into()).unwrap_err();
        assert!(matches!(err, Error::InvalidRoute { ref pattern, .. } if pattern == "/(unclosed"));
        assert!(t.is_empty());
    }
}
