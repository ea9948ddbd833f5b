use std::convert::Infallible;
use std::sync::Arc;

use log::{error, info};
use serde::Serialize;
use warp::http::StatusCode;
use warp::reject;
use warp::reply::{self, Reply, Response};
use warp::Rejection;

use crate::app::{App, Error, Field, RegisterError};
use crate::auth::Action;
use crate::forms::{FeedbackForm, FieldErrors, LoginForm, RegisterForm};
use crate::session::Session;
use crate::view::{self, Form, View};

type HandlerResult = Result<Response, Rejection>;

const USERNAME_TAKEN: &str = "Username taken.  Please pick another one.";
const EMAIL_TAKEN: &str = "Email already registered.";
const BAD_LOGIN: &str = "Invalid username/password";

/// Renders `view`, consuming any pending flash messages.
fn render(mut session: Session, status: StatusCode, view: &View<'_>) -> Response {
    let flashes = session.take_flashes();
    session.finish(view::page(status, view, flashes))
}

fn redirect(session: Session, location: &str) -> Response {
    session.finish(view::see_other(location))
}

/// Refusals become a flash and a redirect, anything else is a rejection.
fn conclude(mut session: Session, result: Result<Response, Error>) -> HandlerResult {
    let response = match result {
        Ok(response) => response,
        Err(Error::Denied(denied)) => {
            session.flash(denied.message());
            view::see_other(&denied.location())
        }
        Err(e) => return Err(reject::custom(e)),
    };

    Ok(session.finish(response))
}

pub fn index() -> Response {
    view::see_other("/register")
}

pub async fn register_form(session: Session) -> HandlerResult {
    let view = View::Register {
        form: Form::default(),
    };
    Ok(render(session, StatusCode::OK, &view))
}

pub async fn register(mut session: Session, app: Arc<App>, form: RegisterForm) -> HandlerResult {
    let errors = match form.validate() {
        Ok(new_user) => match app.register(new_user).await {
            Ok(user) => {
                session.login(&user.username);
                return Ok(redirect(session, &view::user_page(&user.username)));
            }
            Err(RegisterError::Duplicate(field)) => {
                let mut errors = FieldErrors::default();
                match field {
                    Field::Username => errors.add("username", USERNAME_TAKEN),
                    Field::Email => errors.add("email", EMAIL_TAKEN),
                }
                errors
            }
            Err(RegisterError::Internal) => return Err(reject::custom(Error::Internal)),
        },
        Err(errors) => errors,
    };

    let view = View::Register {
        form: Form::new(form.values(), errors),
    };
    Ok(render(session, StatusCode::UNPROCESSABLE_ENTITY, &view))
}

pub async fn login_form(session: Session) -> HandlerResult {
    let view = View::Login {
        form: Form::default(),
    };
    Ok(render(session, StatusCode::OK, &view))
}

pub async fn login(mut session: Session, app: Arc<App>, form: LoginForm) -> HandlerResult {
    let errors = match form.validate() {
        Ok((username, password)) => match app.authenticate(&username, &password).await {
            Ok(Some(user)) => {
                session.login(&user.username);
                return Ok(redirect(session, &view::user_page(&user.username)));
            }
            Ok(None) => {
                let mut errors = FieldErrors::default();
                errors.add("username", BAD_LOGIN);
                errors
            }
            Err(e) => return Err(reject::custom(e)),
        },
        Err(errors) => errors,
    };

    let view = View::Login {
        form: Form::new(form.values(), errors),
    };
    Ok(render(session, StatusCode::UNPROCESSABLE_ENTITY, &view))
}

pub async fn show_user(username: String, mut session: Session, app: Arc<App>) -> HandlerResult {
    let action = Action::ViewUser;

    let result = async {
        let owner = app
            .identify(session.current_user(), action)?
            .with_user(&username, action)?;

        let user = owner.user().await?;
        let feedback = owner.feedback().await?;

        let view = View::User {
            user: &user,
            feedback: &feedback,
        };
        let flashes = session.take_flashes();
        Ok::<_, Error>(view::page(StatusCode::OK, &view, flashes))
    }
    .await;

    conclude(session, result)
}

pub async fn add_feedback_form(username: String, mut session: Session, app: Arc<App>) -> HandlerResult {
    let action = Action::AddFeedback;

    let result = async {
        let owner = app
            .identify(session.current_user(), action)?
            .with_user(&username, action)?;

        let view = View::Feedback {
            action: format!("{}/feedback/add", view::user_page(owner.username())),
            form: Form::default(),
        };
        let flashes = session.take_flashes();
        Ok::<_, Error>(view::page(StatusCode::OK, &view, flashes))
    }
    .await;

    conclude(session, result)
}

pub async fn add_feedback(
    username: String,
    mut session: Session,
    app: Arc<App>,
    form: FeedbackForm,
) -> HandlerResult {
    let action = Action::AddFeedback;

    let result = async {
        let owner = app
            .identify(session.current_user(), action)?
            .with_user(&username, action)?;

        let input = match form.validate() {
            Ok(input) => input,
            Err(errors) => {
                let view = View::Feedback {
                    action: format!("{}/feedback/add", view::user_page(owner.username())),
                    form: Form::new(form.values(), errors),
                };
                let flashes = session.take_flashes();
                return Ok(view::page(StatusCode::UNPROCESSABLE_ENTITY, &view, flashes));
            }
        };

        owner.add_feedback(&input).await?;
        Ok::<_, Error>(view::see_other(&view::user_page(owner.username())))
    }
    .await;

    conclude(session, result)
}

pub async fn update_feedback_form(id: i64, mut session: Session, app: Arc<App>) -> HandlerResult {
    let action = Action::UpdateFeedback;

    let result = async {
        let (_owner, feedback) = app
            .identify(session.current_user(), action)?
            .with_feedback(id, action)
            .await?;

        let form = FeedbackForm {
            title: feedback.title,
            content: feedback.content,
        };
        let view = View::Feedback {
            action: format!("/feedback/{id}/update"),
            form: Form::new(form.values(), FieldErrors::default()),
        };
        let flashes = session.take_flashes();
        Ok::<_, Error>(view::page(StatusCode::OK, &view, flashes))
    }
    .await;

    conclude(session, result)
}

pub async fn update_feedback(
    id: i64,
    mut session: Session,
    app: Arc<App>,
    form: FeedbackForm,
) -> HandlerResult {
    let action = Action::UpdateFeedback;

    let result = async {
        let (owner, _) = app
            .identify(session.current_user(), action)?
            .with_feedback(id, action)
            .await?;

        let input = match form.validate() {
            Ok(input) => input,
            Err(errors) => {
                let view = View::Feedback {
                    action: format!("/feedback/{id}/update"),
                    form: Form::new(form.values(), errors),
                };
                let flashes = session.take_flashes();
                return Ok(view::page(StatusCode::UNPROCESSABLE_ENTITY, &view, flashes));
            }
        };

        owner.update_feedback(id, &input).await?;
        Ok::<_, Error>(view::see_other(&view::user_page(owner.username())))
    }
    .await;

    conclude(session, result)
}

pub async fn delete_feedback(id: i64, session: Session, app: Arc<App>) -> HandlerResult {
    let action = Action::DeleteFeedback;

    let result = async {
        let (owner, _) = app
            .identify(session.current_user(), action)?
            .with_feedback(id, action)
            .await?;

        owner.delete_feedback(id).await?;
        Ok::<_, Error>(view::see_other(&view::user_page(owner.username())))
    }
    .await;

    conclude(session, result)
}

pub async fn delete_user(username: String, mut session: Session, app: Arc<App>) -> HandlerResult {
    let action = Action::DeleteUser;

    let result = async {
        let owner = app
            .identify(session.current_user(), action)?
            .with_user(&username, action)?;

        owner.delete_account().await?;
        session.logout();
        Ok::<_, Error>(view::see_other("/"))
    }
    .await;

    conclude(session, result)
}

pub async fn logout(mut session: Session) -> HandlerResult {
    if let Some(username) = session.current_user() {
        info!("{username} logout");
    }

    session.logout();
    session.flash("Goodbye!");
    Ok(redirect(session, "/"))
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
}

pub async fn recover(rejection: Rejection) -> Result<Response, Infallible> {
    let status = if rejection.is_not_found() {
        StatusCode::NOT_FOUND
    } else if let Some(e) = rejection.find::<Error>() {
        e.clone().into()
    } else if rejection.find::<reject::PayloadTooLarge>().is_some() {
        StatusCode::PAYLOAD_TOO_LARGE
    } else if rejection.find::<reject::LengthRequired>().is_some() {
        StatusCode::LENGTH_REQUIRED
    } else if rejection.find::<reject::UnsupportedMediaType>().is_some() {
        StatusCode::UNSUPPORTED_MEDIA_TYPE
    } else if rejection
        .find::<warp::filters::body::BodyDeserializeError>()
        .is_some()
        || rejection.find::<reject::InvalidHeader>().is_some()
    {
        StatusCode::BAD_REQUEST
    } else if rejection.find::<reject::MethodNotAllowed>().is_some() {
        StatusCode::METHOD_NOT_ALLOWED
    } else {
        error!("unhandled rejection: {rejection:?}");
        StatusCode::INTERNAL_SERVER_ERROR
    };

    let body = ErrorBody {
        error: status.canonical_reason().unwrap_or("Error"),
    };
    Ok(reply::with_status(reply::json(&body), status).into_response())
}
