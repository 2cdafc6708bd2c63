//! The dispatch engine.
//!
//! One call to [`App::dispatch`] takes one [`Request`] to one [`Response`]:
//!
//! ```text
//! START → BEFORE_HOOK → ROUTE_MATCH → HANDLER_EXEC → SESSION_WRITEBACK → EMIT
//!               │              │             │
//!               │              └─ NOT_FOUND ─┤
//!               └──────── INTERNAL_ERROR ────┴──→ SESSION_WRITEBACK → EMIT
//! ```
//!
//! - The `:before` hook runs on every request. If it writes a body or changes
//!   the status, that is the answer and routing is skipped.
//! - An unmatched path whose trailing-slash twin matches is answered with a
//!   `301` to the twin, query string preserved.
//! - `abort(status)` and unmatched paths go through `:error-<code>` when one
//!   is registered, otherwise the body is `Error <code>`.
//! - A handler that returns [`Halt::Fault`] or panics yields a `500` whose
//!   body is the failure detail, or the `:error-500` output when registered.
//! - The session is decoded once, shared by hook and handler, and written
//!   back as a single `Set-Cookie` only when its content changed.
//!
//! The engine is synchronous. The route table and config are read-only after
//! setup, so one `App` can serve concurrent requests without locking.

use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use serde_json::Value;
use tracing::{debug, debug_span, error, warn};
use url::form_urlencoded;

use crate::codec::Codec;
use crate::config::Config;
use crate::context::Context;
use crate::error::Error;
use crate::handler::{Flow, Halt, Handler, Params, Static};
use crate::render::{Renderer, Templates, Templating};
use crate::request::Request;
use crate::response::{ContentType, Response};
use crate::router::RouteTable;
use crate::session::Session;
use crate::status::Status;

/// Registration key of the before-hook.
pub const BEFORE: &str = ":before";
/// Prefix of error-route registration keys, e.g. `:error-404`.
pub const ERROR_PREFIX: &str = ":error-";

/// Bytes escaped in the path of a canonicalisation redirect.
/// The path is already decoded, so a literal `%` is escaped too.
const PATH: &AsciiSet = &CONTROLS.add(b' ').add(b'"').add(b'#').add(b'%').add(b'<').add(b'>').add(b'?').add(b'`');

/// Terminal state of one request.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DispatchOutcome {
    /// A route (or the before-hook) answered.
    Completed,
    /// A route matched but aborted or faulted.
    Failed,
    /// Nothing matched: a 404 or a trailing-slash redirect.
    Unmatched,
}

/// How one handler invocation ended.
enum Outcome {
    Completed,
    Aborted(Status),
    Faulted(String),
}

/// The application: route table, hooks, session codec and templates.
///
/// Build it once at startup; pass it to [`Server::serve`](crate::Server::serve)
/// or call [`dispatch`](App::dispatch) directly.
///
/// ```rust
/// use wren::{App, Config, Request, Static, Status};
///
/// let app = App::new(Config::new().session_key("random-string"))
///     .route_static("/", Static::new("It works!"))
///     .route(r"/users/<int>", |cx, params| {
///         let id: u64 = params.parse(0).unwrap_or_default();
///         cx.send(format!("user {id}"))
///     })
///     .route("/users#post", |cx, _| cx.abort(Status::Forbidden));
///
/// let res = app.dispatch(&Request::builder("GET", "/users/42").build());
/// assert_eq!(res.body, "user 42");
/// ```
pub struct App {
    routes: RouteTable,
    before: Option<Handler>,
    errors: HashMap<u16, Handler>,
    codec: Option<Codec>,
    session_cookie: String,
    session_max_age: Option<u64>,
    templating: Templating,
}

impl App {
    pub fn new(config: Config) -> Self {
        let renderer = config.template_path.as_ref()
            .map(|dir| Arc::new(Templates::new(dir)) as Arc<dyn Renderer>);
        Self::with_renderer(config, renderer)
    }

    /// Like [`new`](App::new), with a caller-supplied template renderer.
    pub fn with_renderer(config: Config, renderer: Option<Arc<dyn Renderer>>) -> Self {
        let codec = config.session_key.as_ref()
            .map(|key| Codec::new(key.as_str()).with_signature(config.signature));
        let templating = Templating::new(renderer, config.context_source());
        Self {
            routes: RouteTable::new(config.route_shortcuts),
            before: None,
            errors: HashMap::new(),
            codec,
            session_cookie: config.session_cookie,
            session_max_age: config.session_max_age,
            templating,
        }
    }

    /// Register a callable handler. Returns `self` for chaining.
    ///
    /// `pattern` is a route regex (optionally `#method`) or one of the
    /// reserved keys `:before` and `:error-<code>`.
    ///
    /// # Panics
    ///
    /// Panics if `pattern` does not compile. Use [`try_add`](App::try_add)
    /// to handle that as an error.
    pub fn route<F>(mut self, pattern: &str, handler: F) -> Self
    where
        F: Fn(&mut Context<'_>, &Params) -> Flow + Send + Sync + 'static,
    {
        self.try_add(pattern, Handler::callable(handler))
            .unwrap_or_else(|e| panic!("{e}"));
        self
    }

    /// Register a fixed answer. Returns `self` for chaining.
    ///
    /// # Panics
    ///
    /// Panics if `pattern` does not compile.
    pub fn route_static(mut self, pattern: &str, answer: Static) -> Self {
        self.try_add(pattern, answer.into())
            .unwrap_or_else(|e| panic!("{e}"));
        self
    }

    /// Fallible registration.
    pub fn try_add(&mut self, pattern: &str, handler: Handler) -> Result<(), Error> {
        if pattern == BEFORE {
            self.before = Some(handler);
        } else if let Some(code) = pattern.strip_prefix(ERROR_PREFIX) {
            let status = code.parse().ok()
                .and_then(Status::from_code)
                .ok_or_else(|| Error::UnknownReserved(pattern.to_owned()))?;
            self.errors.insert(status.code(), handler);
        } else if pattern.starts_with(':') {
            return Err(Error::UnknownReserved(pattern.to_owned()));
        } else {
            self.routes.add(pattern, handler)?;
        }
        Ok(())
    }

    /// Runs one request to completion.
    pub fn dispatch(&self, request: &Request) -> Response {
        self.handle(request).0
    }

    /// [`dispatch`](App::dispatch), also reporting how the request ended.
    pub fn handle(&self, request: &Request) -> (Response, DispatchOutcome) {
        let span = debug_span!("dispatch", method = %request.method(), path = %request.path());
        let _guard = span.enter();

        let mut session = self.load_session(request);
        let mut response = Response::new();

        let outcome = self.run(request, &mut response, &mut session);
        self.write_back(&session, &mut response);
        self.emit(&mut response);

        debug!(?outcome, code = response.code, "dispatched");
        (response, outcome)
    }

    fn run(&self, request: &Request, response: &mut Response, session: &mut Session) -> DispatchOutcome {
        if let Some(before) = &self.before {
            match self.invoke(before, request, response, session, &Params::default()) {
                Outcome::Completed => {}
                failed => {
                    self.settle(failed, request, response, session);
                    return DispatchOutcome::Failed;
                }
            }
            if !response.is_untouched() {
                debug!(code = response.code, "answered by before-hook");
                return DispatchOutcome::Completed;
            }
        }

        let Some(found) = self.routes.lookup(request.path(), request.method()) else {
            if let Some(location) = self.canonical_location(request) {
                debug!(%location, "redirecting to canonical path");
                response.body.clear();
                response.set_status(Status::MovedPermanently);
                response.set_header("Location", location);
            } else {
                self.error_page(Status::NotFound, request, response, session);
            }
            return DispatchOutcome::Unmatched;
        };

        match self.invoke(found.handler, request, response, session, &found.params) {
            Outcome::Completed => DispatchOutcome::Completed,
            failed => {
                self.settle(failed, request, response, session);
                DispatchOutcome::Failed
            }
        }
    }

    /// Runs one handler against `response`, catching panics.
    fn invoke(
        &self,
        handler: &Handler,
        request: &Request,
        response: &mut Response,
        session: &mut Session,
        params: &Params,
    ) -> Outcome {
        let callable = match handler {
            Handler::Static(answer) => {
                response.body.clone_from(&answer.body);
                if let Some(status) = answer.status {
                    response.set_status(status);
                }
                if let Some(content_type) = &answer.content_type {
                    response.set_header("Content-Type", content_type.as_str());
                }
                return Outcome::Completed;
            }
            Handler::Callable(callable) => callable,
        };

        let mut cx = Context::new(request, response, session, &self.templating);
        let result = panic::catch_unwind(AssertUnwindSafe(|| callable.call(&mut cx, params)));

        match result {
            Ok(Ok(())) | Ok(Err(Halt::Sent)) => Outcome::Completed,
            Ok(Err(Halt::Abort(status))) => Outcome::Aborted(status),
            Ok(Err(Halt::Fault(err))) => Outcome::Faulted(format!("{err:?}")),
            Err(payload) => Outcome::Faulted(panic_detail(payload.as_ref())),
        }
    }

    /// Turns an abort or fault into the final response.
    fn settle(&self, outcome: Outcome, request: &Request, response: &mut Response, session: &mut Session) {
        match outcome {
            Outcome::Completed => {}
            Outcome::Aborted(status) => self.error_page(status, request, response, session),
            Outcome::Faulted(detail) => {
                error!(%detail, "handler failed");
                response.body = detail;
                response.set_content_type(ContentType::Text);
                response.set_status(Status::InternalServerError);
                if self.errors.contains_key(&Status::InternalServerError.code()) {
                    response.body.clear();
                    self.error_page(Status::InternalServerError, request, response, session);
                }
            }
        }
    }

    /// Custom `:error-<code>` output, or `Error <code>`. The status is forced
    /// to `status` whatever the error handler does.
    fn error_page(&self, status: Status, request: &Request, response: &mut Response, session: &mut Session) {
        let code = status.code();
        match self.errors.get(&code) {
            Some(handler) => {
                response.set_status(status);
                match self.invoke(handler, request, response, session, &Params::default()) {
                    Outcome::Completed | Outcome::Aborted(_) => {}
                    Outcome::Faulted(detail) => {
                        error!(%detail, code, "error handler failed");
                        response.body = format!("Error {code}");
                        response.set_content_type(ContentType::Text);
                    }
                }
            }
            None => {
                response.body = format!("Error {code}");
                response.set_content_type(ContentType::Text);
            }
        }
        response.set_status(status);
    }

    /// Location of the trailing-slash twin of the request path, when that twin
    /// is routable with the same method.
    fn canonical_location(&self, request: &Request) -> Option<String> {
        let path = request.path();
        let twin = match path.strip_suffix('/') {
            Some("") => return None,
            Some(stripped) => stripped.to_owned(),
            None => format!("{path}/"),
        };
        self.routes.lookup(&twin, request.method())?;

        let mut location = utf8_percent_encode(&twin, PATH).to_string();
        if !request.query_string().is_empty() {
            let query = form_urlencoded::Serializer::new(String::new())
                .extend_pairs(form_urlencoded::parse(request.query_string().as_bytes()))
                .finish();
            location.push('?');
            location.push_str(&query);
        }
        Some(location)
    }

    fn load_session(&self, request: &Request) -> Session {
        let Some(codec) = &self.codec else {
            return Session::new();
        };
        let Some(token) = request.cookie(&self.session_cookie) else {
            return Session::new();
        };
        match codec.decode(token, self.session_max_age) {
            Some(Value::Object(map)) => Session::from_map(map),
            Some(_) => {
                warn!("session cookie does not hold an object, starting empty");
                Session::new()
            }
            None => Session::new(),
        }
    }

    fn write_back(&self, session: &Session, response: &mut Response) {
        let Some(codec) = &self.codec else { return };
        if !session.is_modified() {
            return;
        }
        let token = codec.encode(&session.to_value(), None);
        response.append_header(
            "Set-Cookie",
            format!("{}={token}; Path=/; HttpOnly", self.session_cookie),
        );
    }

    /// Final check: the status must be in the table.
    fn emit(&self, response: &mut Response) {
        if let Err(e) = response.status_line() {
            error!("{e}");
            response.body = e.to_string();
            response.set_content_type(ContentType::Text);
            response.set_status(Status::InternalServerError);
        }
    }
}

fn panic_detail(payload: &(dyn Any + Send)) -> String {
    let message = payload.downcast_ref::<&str>().copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload");
    format!("handler panicked: {message}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get(app: &App, target: &str) -> Response {
        app.dispatch(&Request::builder("GET", target).build())
    }

    #[test]
    fn empty_app_answers_404() {
        let app = App::new(Config::new());
        let (res, outcome) = app.handle(&Request::builder("GET", "/").build());
        assert_eq!(res.code, 404);
        assert_eq!(res.body, "Error 404");
        assert_eq!(res.header("content-type"), Some("text/plain; charset=utf-8"));
        assert_eq!(outcome, DispatchOutcome::Unmatched);
    }

    #[test]
    fn reserved_keys_are_not_path_routes() {
        let app = App::new(Config::new())
            .route(":error-404", |cx, _| cx.send("custom"));
        assert_eq!(app.routes.len(), 0);
        assert_eq!(get(&app, "/:error-404").body, "custom");
    }

    #[test]
    fn unknown_reserved_keys_are_rejected() {
        let mut app = App::new(Config::new());
        assert!(matches!(
            app.try_add(":after", Static::new("").into()),
            Err(Error::UnknownReserved(_))
        ));
        assert!(matches!(
            app.try_add(":error-299", Static::new("").into()),
            Err(Error::UnknownReserved(_))
        ));
        assert!(matches!(
            app.try_add("/(", Static::new("").into()),
            Err(Error::InvalidRoute { .. })
        ));
    }

    #[test]
    fn canonical_location_keeps_the_root_alone() {
        let app = App::new(Config::new()).route_static("", Static::new("empty"));
        assert_eq!(app.canonical_location(&Request::builder("GET", "/").build()), None);
    }

    #[test]
    fn panics_become_500() {
        let app = App::new(Config::new()).route("/boom", |_, _| panic!("kaboom"));
        let (res, outcome) = app.handle(&Request::builder("GET", "/boom").build());
        assert_eq!(res.code, 500);
        assert_eq!(res.body, "handler panicked: kaboom");
        assert_eq!(outcome, DispatchOutcome::Failed);
    }

    #[test]
    fn unmapped_handler_status_fails_loudly() {
        let app = App::new(Config::new()).route("/", |cx, _| {
            cx.response.code = 299;
            cx.send("odd")
        });
        let res = get(&app, "/");
        assert_eq!(res.code, 500);
        assert_eq!(res.body, "status code 299 has no reason phrase");
        assert_eq!(res.header("content-type"), Some("text/plain; charset=utf-8"));
    }

    #[test]
    fn canonical_location_escapes_decoded_percent_signs() {
        let app = App::new(Config::new()).route_static("/tag/<string>", Static::new("tag"));
        let req = Request::builder("GET", "/tag/a%2541/").build();
        assert_eq!(req.path(), "/tag/a%41/");
        assert_eq!(app.canonical_location(&req).as_deref(), Some("/tag/a%2541"));
    }
}
