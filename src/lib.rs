//! # wren
//!
//! A small request-dispatch engine. One request in, one response out,
//! fully in memory.
//!
//! ## What it does
//!
//! - **Regex routes**, first match wins, with a `#method` discriminator and
//!   shortcut tokens (`<int>`, `<string>`, or your own); see [`router`].
//! - **A before-hook** (`:before`) that runs on every request and may answer
//!   it outright.
//! - **Error routes** (`:error-404`, `:error-500`, …) for unmatched paths,
//!   explicit aborts and handler failures.
//! - **Signed cookie sessions**: the session is a JSON object stored in the
//!   client's cookie, HMAC-signed and timestamped. See [`codec`].
//!
//! What it leaves to others: TLS, body limits, streaming, content
//! negotiation, middleware stacks.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use wren::{App, Config, Redirect, Server, Static, Status};
//!
//! #[tokio::main]
//! async fn main() {
//!     let app = App::new(Config::new().session_key("change-me"))
//!         .route(":before", |cx, _| {
//!             cx.session.insert("seen", true);
//!             Ok(())
//!         })
//!         .route_static("/", Static::new("It works!"))
//!         .route(r"/users/<int>", |cx, params| {
//!             let id: u64 = params.parse(0).unwrap_or_default();
//!             cx.send_json(&serde_json::json!({ "id": id }))
//!         })
//!         .route("/login#post", |cx, _| {
//!             cx.set_flash("welcome back");
//!             cx.redirect_with(Redirect::to("/").status(Status::SeeOther))
//!         })
//!         .route(":error-404", |cx, _| cx.send("nothing here"));
//!
//!     Server::bind("0.0.0.0:3000").serve(app).await.unwrap();
//! }
//! ```

mod app;
mod context;
mod error;
mod handler;
mod method;
mod request;
mod response;
mod server;
mod session;
mod status;

pub mod codec;
pub mod config;
pub mod render;
pub mod router;

pub use app::{App, BEFORE, DispatchOutcome, ERROR_PREFIX};
pub use codec::Signature;
pub use config::Config;
pub use context::{Context, Redirect};
pub use error::Error;
pub use handler::{Flow, Halt, Handler, Params, Static};
pub use method::Method;
pub use request::{METHOD_OVERRIDE, Request, RequestBuilder};
pub use response::{ContentType, Response};
pub use server::Server;
pub use session::{FLASH_KEY, Session};
pub use status::Status;
