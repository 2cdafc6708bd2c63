//! Handlers, captured route parameters, and the control-flow signal.
//!
//! # How handlers are stored
//!
//! The route table holds handlers of *different* closure types in one
//! `Vec`, so callables are erased behind a trait object:
//!
//! ```text
//! |cx, p| cx.send("hi")                ← user writes this
//!        ↓ app.route("/", f)
//! Arc::new(FnHandler(f))               ← heap-allocated wrapper
//!        ↓ stored as BoxedHandler = Arc<dyn ErasedHandler>
//! handler.call(&mut cx, &params)       ← one vtable dispatch per request
//! ```
//!
//! A route can also be answered by a [`Static`] body, which needs no
//! context at all.
//!
//! # Stopping early
//!
//! Handlers return [`Flow`]. `Err(Halt::Sent)` is not a failure: it is how
//! [`Context::send`](crate::Context::send) and
//! [`Context::redirect`](crate::Context::redirect) end a handler, and the
//! engine treats it exactly like `Ok(())`. `?` on any standard error turns it
//! into [`Halt::Fault`], which the engine answers with a 500.

use std::fmt;
use std::ops::Deref;
use std::str::FromStr;
use std::sync::Arc;

use crate::context::Context;
use crate::status::Status;

// ── Flow ──────────────────────────────────────────────────────────────────────

/// What a handler returns.
pub type Flow = Result<(), Halt>;

/// Why a handler stopped before returning `Ok(())`.
pub enum Halt {
    /// The response is final. Normal completion.
    Sent,
    /// Finish with this status, through the matching `:error-<code>` route.
    Abort(Status),
    /// An unexpected failure. Answered with a 500.
    Fault(anyhow::Error),
}

impl Halt {
    /// Wraps anything `anyhow` can hold, including `anyhow::Error` itself.
    pub fn fault(err: impl Into<anyhow::Error>) -> Self {
        Self::Fault(err.into())
    }

    /// A fault carrying only a message.
    pub fn msg(message: impl fmt::Display + fmt::Debug + Send + Sync + 'static) -> Self {
        Self::Fault(anyhow::Error::msg(message))
    }
}

impl<E> From<E> for Halt
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn from(err: E) -> Self {
        Self::Fault(anyhow::Error::new(err))
    }
}

impl fmt::Debug for Halt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sent => f.write_str("Sent"),
            Self::Abort(status) => write!(f, "Abort({})", status.code()),
            Self::Fault(err) => write!(f, "Fault({err:?})"),
        }
    }
}

// ── Params ────────────────────────────────────────────────────────────────────

/// Values captured by a route pattern, in group order.
///
/// A group that did not participate in the match is `None`.
///
/// ```rust,ignore
/// // route "/(\d+)/<string>" on "/42/hello"
/// assert_eq!(params.get(0), Some("42"));
/// assert_eq!(params.parse::<u32>(0), Some(42));
/// assert_eq!(params.get(1), Some("hello"));
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Params {
    values: Vec<Option<String>>,
    names: Vec<Option<String>>,
}

impl Params {
    pub(crate) fn new(values: Vec<Option<String>>, names: Vec<Option<String>>) -> Self {
        Self { values, names }
    }

    /// Positional value.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.values.get(index)?.as_deref()
    }

    /// Positional value parsed as `T`.
    pub fn parse<T: FromStr>(&self, index: usize) -> Option<T> {
        self.get(index)?.parse().ok()
    }

    /// Value of a named group, `(?P<name>…)`.
    pub fn named(&self, name: &str) -> Option<&str> {
        let index = self.names.iter().position(|n| n.as_deref() == Some(name))?;
        self.get(index)
    }
}

impl Deref for Params {
    type Target = [Option<String>];

    fn deref(&self) -> &Self::Target {
        &self.values
    }
}

// ── Static ────────────────────────────────────────────────────────────────────

/// A fixed `(body, status, content-type)` answer.
///
/// ```rust
/// use wren::{Static, Status};
///
/// Static::new("It works!");
/// Static::new("<b>hi</b>").status(Status::Created).content_type("text/html");
/// ```
#[derive(Clone, Debug)]
pub struct Static {
    pub(crate) body: String,
    pub(crate) status: Option<Status>,
    pub(crate) content_type: Option<String>,
}

impl Static {
    pub fn new(body: impl Into<String>) -> Self {
        Self { body: body.into(), status: None, content_type: None }
    }

    pub fn status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    pub fn content_type(mut self, content_type: &str) -> Self {
        self.content_type = Some(content_type.to_owned());
        self
    }
}

// ── Handler ───────────────────────────────────────────────────────────────────

/// Internal dispatch interface for callable handlers.
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, cx: &mut Context<'_>, params: &Params) -> Flow;
}

/// A type-erased callable shared across concurrent requests.
#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

/// Newtype bridging a concrete closure to [`ErasedHandler`].
struct FnHandler<F>(F);

impl<F> ErasedHandler for FnHandler<F>
where
    F: Fn(&mut Context<'_>, &Params) -> Flow,
{
    fn call(&self, cx: &mut Context<'_>, params: &Params) -> Flow {
        (self.0)(cx, params)
    }
}

/// What a route answers with.
#[derive(Clone)]
pub enum Handler {
    Static(Static),
    Callable(BoxedHandler),
}

impl Handler {
    /// Wraps a closure or `fn` item taking the context and captured params.
    pub fn callable<F>(f: F) -> Self
    where
        F: Fn(&mut Context<'_>, &Params) -> Flow + Send + Sync + 'static,
    {
        Self::Callable(Arc::new(FnHandler(f)))
    }
}

impl From<Static> for Handler {
    fn from(s: Static) -> Self {
        Self::Static(s)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(s) => f.debug_tuple("Static").field(s).finish(),
            Self::Callable(_) => f.write_str("Callable"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_positional_named_and_parsed() {
        let params = Params::new(
            vec![Some("123".into()), None, Some("hello".into())],
            vec![None, None, Some("word".into())],
        );
        assert_eq!(params.get(0), Some("123"));
        assert_eq!(params.parse::<u64>(0), Some(123));
        assert_eq!(params.get(1), None);
        assert_eq!(params.get(9), None);
        assert_eq!(params.named("word"), Some("hello"));
        assert_eq!(params.named("nope"), None);
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn question_mark_turns_errors_into_faults() {
        fn parse(s: &str) -> Flow {
            let _n: u32 = s.parse()?;
            Ok(())
        }
        assert!(parse("7").is_ok());
        assert!(matches!(parse("x"), Err(Halt::Fault(_))));
    }
}
