//! The value handed to every handler.
//!
//! A [`Context`] borrows the request, the response being built and the
//! request's session. Helpers that finish the response (`send`, `redirect`,
//! `render`, `abort`) return a [`Flow`] so a handler can simply
//! `return cx.send("done")`.

use std::thread;
use std::time::Duration;

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use serde::Serialize;
use serde_json::Value;

use crate::error::Error;
use crate::handler::{Flow, Halt};
use crate::render::Templating;
use crate::request::Request;
use crate::response::{ContentType, Response};
use crate::session::Session;
use crate::status::Status;

/// Bytes escaped in a `Location` header. Non-ASCII is always escaped.
const LOCATION: &AsciiSet = &CONTROLS.add(b' ').add(b'"').add(b'<').add(b'>').add(b'`');

/// Per-request handler context.
pub struct Context<'a> {
    pub request: &'a Request,
    pub response: &'a mut Response,
    pub session: &'a mut Session,
    templating: &'a Templating,
}

impl<'a> Context<'a> {
    pub(crate) fn new(
        request: &'a Request,
        response: &'a mut Response,
        session: &'a mut Session,
        templating: &'a Templating,
    ) -> Self {
        Self { request, response, session, templating }
    }

    /// Appends to the response body and keeps going.
    pub fn write(&mut self, text: impl AsRef<str>) {
        self.response.write(text);
    }

    /// Appends `value` as JSON (`application/json`) and keeps going.
    pub fn write_json<T: Serialize + ?Sized>(&mut self, value: &T) -> Flow {
        self.response.write_json(value)?;
        Ok(())
    }

    /// Appends to the body and stops the handler.
    pub fn send(&mut self, text: impl AsRef<str>) -> Flow {
        self.response.write(text);
        Err(Halt::Sent)
    }

    /// Appends `value` as JSON and stops the handler.
    pub fn send_json<T: Serialize + ?Sized>(&mut self, value: &T) -> Flow {
        self.write_json(value)?;
        Err(Halt::Sent)
    }

    /// `302 Found` to `url`. An empty `url` means the current path.
    pub fn redirect(&mut self, url: &str) -> Flow {
        self.redirect_with(Redirect::to(url))
    }

    /// Redirect with explicit status and delay. Clears the body, sets
    /// `Location` and stops the handler.
    pub fn redirect_with(&mut self, redirect: Redirect) -> Flow {
        if !redirect.delay.is_zero() {
            // blocks this request's thread for the whole delay
            thread::sleep(redirect.delay);
        }
        let target: &str = if redirect.url.is_empty() { self.request.path() } else { &redirect.url };
        let location = utf8_percent_encode(target, LOCATION).to_string();

        self.response.body.clear();
        self.response.set_status(redirect.status);
        self.response.set_header("Location", location);
        Err(Halt::Sent)
    }

    /// Finish through the `:error-<code>` route for `status`, or the generic
    /// `Error <code>` page when none is registered.
    pub fn abort(&mut self, status: Status) -> Flow {
        Err(Halt::Abort(status))
    }

    /// Pops the flash value from the session.
    pub fn flash(&mut self) -> Option<Value> {
        self.session.take_flash()
    }

    pub fn set_flash(&mut self, value: impl Into<Value>) {
        self.session.set_flash(value);
    }

    /// Renders a template to a string. `extra` (a JSON object, or `Null`)
    /// overrides the configured context.
    pub fn render_string(&self, name: &str, extra: Value) -> Result<String, Error> {
        self.templating.render(self.request, name, extra)
    }

    /// Renders a template as the `text/html` body and stops the handler.
    pub fn render(&mut self, name: &str, extra: Value) -> Flow {
        let html = self.render_string(name, extra)?;
        self.response.set_content_type(ContentType::Html);
        self.send(html)
    }
}

/// Options for [`Context::redirect_with`].
///
/// ```rust
/// use std::time::Duration;
/// use wren::{Redirect, Status};
///
/// Redirect::to("/login");                                   // 302
/// Redirect::to("/new-home").permanent();                    // 301
/// Redirect::to("/queued").status(Status::SeeOther);         // 303
/// Redirect::to("/slow").delay(Duration::from_millis(200));  // sleeps first
/// ```
#[derive(Clone, Debug)]
pub struct Redirect {
    url: String,
    status: Status,
    delay: Duration,
}

impl Redirect {
    pub fn to(url: impl Into<String>) -> Self {
        Self { url: url.into(), status: Status::Found, delay: Duration::ZERO }
    }

    /// `301 Moved Permanently`.
    pub fn permanent(self) -> Self {
        self.status(Status::MovedPermanently)
    }

    pub fn status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }

    /// Pause before answering. This is a blocking sleep on the thread that
    /// handles the request.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}
