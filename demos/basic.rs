//! Minimal wren example: static pages, captures, a before-hook, a signed
//! session with flash messages, and custom error pages.
//!
//! Run with:
//!   cargo run --example basic
//!
//! Try:
//!   curl -i http://localhost:3000/
//!   curl -i http://localhost:3000/users/42
//!   curl -i http://localhost:3000/users/42/          # 301 to /users/42
//!   curl -i -c jar -b jar -X POST http://localhost:3000/login -d 'name=alice'
//!   curl -i -c jar -b jar http://localhost:3000/me
//!   curl -i -X POST http://localhost:3000/feed -d ':method=publish'
//!   curl -i http://localhost:3000/admin

use serde_json::json;
use wren::{App, Config, Context, Flow, Params, Redirect, Server, Static, Status};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = Config::new()
        .session_key("change-me")
        .session_max_age(24 * 60 * 60)
        .route_shortcut("{name}", "([a-z]+)");

    let app = App::new(config)
        .route(":before", count_visits)
        .route_static("/", Static::new("It works!"))
        .route_static("/healthz", Static::new(r#"{"status":"ok"}"#).content_type("application/json"))
        .route(r"/users/<int>", get_user)
        .route("/hello/{name}", |cx, params| cx.send(format!("hello, {}", params.get(0).unwrap_or("?"))))
        .route("/login#post", login)
        .route("/me", me)
        .route("/feed#publish", |cx, _| cx.send("published"))
        .route("/admin", |cx, _| cx.abort(Status::Forbidden))
        .route(":error-403", |cx, _| cx.send("keep out"))
        .route(":error-404", |cx, _| cx.send("nothing here"));

    Server::bind("0.0.0.0:3000")
        .serve(app)
        .await
        .expect("server error");
}

fn count_visits(cx: &mut Context<'_>, _: &Params) -> Flow {
    let visits = cx.session.get("visits").and_then(|v| v.as_u64()).unwrap_or(0);
    cx.session.insert("visits", visits + 1);
    Ok(())
}

fn get_user(cx: &mut Context<'_>, params: &Params) -> Flow {
    let Some(id) = params.parse::<u64>(0) else {
        return cx.abort(Status::NotFound);
    };
    cx.send_json(&json!({ "id": id, "name": format!("user-{id}") }))
}

fn login(cx: &mut Context<'_>, _: &Params) -> Flow {
    let name = cx.request.param("name").unwrap_or("guest").to_owned();
    cx.session.insert("user", name.as_str());
    cx.set_flash(format!("welcome, {name}"));
    cx.redirect_with(Redirect::to("/me").status(Status::SeeOther))
}

fn me(cx: &mut Context<'_>, _: &Params) -> Flow {
    let flash = cx.flash();
    let body = json!({
        "user": cx.session.get_str("user"),
        "visits": cx.session.get("visits"),
        "flash": flash,
    });
    cx.send_json(&body)
}
