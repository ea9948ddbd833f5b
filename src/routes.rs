use std::convert::Infallible;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use warp::http::header::COOKIE;
use warp::http::HeaderMap;
use warp::{Filter, Rejection, Reply};

use crate::app::App;
use crate::handlers;
use crate::session::{Session, SessionKeys};

const FORM_LIMIT: u64 = 16 * 1024;

fn form<T>() -> impl Filter<Extract = (T,), Error = Rejection> + Clone
where
    T: DeserializeOwned + Send,
{
    warp::body::content_length_limit(FORM_LIMIT).and(warp::body::form())
}

fn with_session(keys: SessionKeys) -> impl Filter<Extract = (Session,), Error = Infallible> + Clone {
    warp::header::headers_cloned().map(move |headers: HeaderMap| {
        let cookies = headers.get(COOKIE).and_then(|value| value.to_str().ok());
        keys.open(cookies)
    })
}

pub fn routes(
    app: Arc<App>,
    keys: SessionKeys,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let app = warp::any().map(move || Arc::clone(&app));
    let session = with_session(keys);

    let index = warp::path::end().and(warp::get()).map(handlers::index);

    let register_form = warp::path!("register")
        .and(warp::get())
        .and(session.clone())
        .and_then(handlers::register_form);

    let register = warp::path!("register")
        .and(warp::post())
        .and(session.clone())
        .and(app.clone())
        .and(form())
        .and_then(handlers::register);

    let login_form = warp::path!("login")
        .and(warp::get())
        .and(session.clone())
        .and_then(handlers::login_form);

    let login = warp::path!("login")
        .and(warp::post())
        .and(session.clone())
        .and(app.clone())
        .and(form())
        .and_then(handlers::login);

    let logout = warp::path!("logout")
        .and(warp::get())
        .and(session.clone())
        .and_then(handlers::logout);

    let auth = register_form
        .or(register)
        .unify()
        .or(login_form)
        .unify()
        .or(login)
        .unify()
        .or(logout)
        .unify();

    let users = {
        let show = warp::path!("users" / String)
            .and(warp::get())
            .and(session.clone())
            .and(app.clone())
            .and_then(handlers::show_user);

        let add_feedback_form = warp::path!("users" / String / "feedback" / "add")
            .and(warp::get())
            .and(session.clone())
            .and(app.clone())
            .and_then(handlers::add_feedback_form);

        let add_feedback = warp::path!("users" / String / "feedback" / "add")
            .and(warp::post())
            .and(session.clone())
            .and(app.clone())
            .and(form())
            .and_then(handlers::add_feedback);

        let delete = warp::path!("users" / String / "delete")
            .and(warp::post())
            .and(session.clone())
            .and(app.clone())
            .and_then(handlers::delete_user);

        show.or(add_feedback_form)
            .unify()
            .or(add_feedback)
            .unify()
            .or(delete)
            .unify()
    };

    let feedback = {
        let update_form = warp::path!("feedback" / i64 / "update")
            .and(warp::get())
            .and(session.clone())
            .and(app.clone())
            .and_then(handlers::update_feedback_form);

        let update = warp::path!("feedback" / i64 / "update")
            .and(warp::post())
            .and(session.clone())
            .and(app.clone())
            .and(form())
            .and_then(handlers::update_feedback);

        let delete = warp::path!("feedback" / i64 / "delete")
            .and(warp::post())
            .and(session)
            .and(app)
            .and_then(handlers::delete_feedback);

        update_form.or(update).unify().or(delete).unify()
    };

    index
        .or(auth)
        .unify()
        .or(users)
        .unify()
        .or(feedback)
        .unify()
        .recover(handlers::recover)
        .unify()
        .with(warp::log("userfeedback"))
}
