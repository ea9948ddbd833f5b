use std::collections::BTreeMap;

use log::error;
use serde::Serialize;
use warp::http::header::{HeaderValue, LOCATION};
use warp::http::StatusCode;
use warp::reply::{self, Reply, Response};

use crate::feedback::Feedback;
use crate::forms::FieldErrors;
use crate::user::User;

/// A form as shown to the user: what they typed and what was wrong with it.
#[derive(Debug, Default, Serialize)]
pub struct Form {
    pub values: BTreeMap<&'static str, String>,
    pub errors: FieldErrors,
}

#[derive(Debug, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum View<'a> {
    Register { form: Form },
    Login { form: Form },
    User { user: &'a User, feedback: &'a [Feedback] },
    Feedback { action: String, form: Form },
}

#[derive(Serialize)]
struct Page<'a> {
    #[serde(flatten)]
    view: &'a View<'a>,
    flashes: Vec<String>,
}

impl Form {
    pub fn new(values: BTreeMap<&'static str, String>, errors: FieldErrors) -> Self {
        Self { values, errors }
    }
}

pub fn page(status: StatusCode, view: &View<'_>, flashes: Vec<String>) -> Response {
    reply::with_status(reply::json(&Page { view, flashes }), status).into_response()
}

pub fn see_other(location: &str) -> Response {
    let mut response = reply::with_status(reply::reply(), StatusCode::SEE_OTHER).into_response();

    match HeaderValue::from_str(location) {
        Ok(value) => {
            response.headers_mut().insert(LOCATION, value);
        }
        Err(e) => {
            error!("can't redirect to {location:?}: {e:?}");
            *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        }
    }

    response
}

pub fn user_page(username: &str) -> String {
    format!("/users/{username}")
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn page_shape() {
        let mut errors = FieldErrors::default();
        errors.add("username", "Invalid username/password");
        let form = Form::new(BTreeMap::from([("username", "alice".to_string())]), errors);

        let response = page(
            StatusCode::UNPROCESSABLE_ENTITY,
            &View::Login { form },
            vec!["Goodbye!".into()],
        );
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = warp::hyper::body::to_bytes(response.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "view": "login",
                "form": {
                    "values": { "username": "alice" },
                    "errors": { "username": ["Invalid username/password"] },
                },
                "flashes": ["Goodbye!"],
            })
        );
    }

    #[test]
    fn redirect() {
        let response = see_other("/users/alice");

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[LOCATION], "/users/alice");
    }
}
