use std::{result, sync::Arc};

use log::{debug, error, info, trace};
use warp::http;

use crate::auth::{self, Action, Denied};
use crate::backend::{Backend, FindError, InsertError};
use crate::credentials::Credentials;
use crate::feedback::{Feedback, FeedbackInput};
use crate::user::{NewUser, User};

pub struct App {
    backend: Backend,
    credentials: Credentials,
}

/// A request with a logged in user. `Authed<true>` has additionally been
/// checked to own whatever the request is about.
pub struct Authed<const OWNER: bool = false> {
    app: Arc<App>,
    username: String,
}

#[derive(Clone, Debug)]
pub enum Error {
    Internal,
    NotFound,
    Denied(Denied),
}

pub type Result<T> = result::Result<T, Error>;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Field {
    Username,
    Email,
}

#[derive(Debug)]
pub enum RegisterError {
    Duplicate(Field),
    Internal,
}

impl Into<http::StatusCode> for Error {
    fn into(self) -> http::StatusCode {
        match self {
            Self::Internal => http::StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound => http::StatusCode::NOT_FOUND,
            Self::Denied(_) => http::StatusCode::FORBIDDEN,
        }
    }
}

impl warp::reject::Reject for Error {}

impl From<FindError> for Error {
    fn from(e: FindError) -> Self {
        match e {
            FindError::NotFound => Self::NotFound,
            FindError::Internal => Self::Internal,
        }
    }
}

impl From<Denied> for Error {
    fn from(denied: Denied) -> Self {
        Self::Denied(denied)
    }
}

impl App {
    pub fn new(backend: Backend, credentials: Credentials) -> Self {
        Self {
            backend,
            credentials,
        }
    }

    pub async fn register(self: &Arc<Self>, new_user: NewUser) -> result::Result<User, RegisterError> {
        let NewUser {
            username,
            password,
            email,
            first_name,
            last_name,
        } = new_user;

        let app = Arc::clone(self);
        let password = tokio::task::spawn_blocking(move || app.credentials.hash(&password))
            .await
            .map_err(|e| {
                error!("password hashing task failed: {e:?}");
                RegisterError::Internal
            })?
            .map_err(|()| RegisterError::Internal)?;

        let user = self
            .backend
            .create_user(User {
                username,
                password,
                email,
                first_name,
                last_name,
            })
            .await
            .map_err(|e| match e {
                InsertError::DuplicateUsername => RegisterError::Duplicate(Field::Username),
                InsertError::DuplicateEmail => RegisterError::Duplicate(Field::Email),
                InsertError::Internal => RegisterError::Internal,
            })
            .map_err(|e| {
                if let RegisterError::Duplicate(field) = &e {
                    info!("registration refused, duplicate {field:?}");
                }
                e
            })?;

        info!("{} registered", user.username);
        Ok(user)
    }

    /// `None` for both an unknown user and a wrong password.
    pub async fn authenticate(self: &Arc<Self>, username: &str, password: &str) -> Result<Option<User>> {
        let user = match self.backend.find_user(username).await {
            Ok(user) => Some(user),
            Err(FindError::NotFound) => None,
            Err(FindError::Internal) => return Err(Error::Internal),
        };

        let app = Arc::clone(self);
        let password = password.to_string();
        let (user, verified) = tokio::task::spawn_blocking(move || match user {
            Some(user) => {
                let verified = app.credentials.verify(&password, &user.password);
                (Some(user), verified)
            }
            None => {
                app.credentials.verify_dummy(&password);
                (None, false)
            }
        })
        .await
        .map_err(|e| {
            error!("password verification task failed: {e:?}");
            Error::Internal
        })?;

        match user {
            Some(user) if verified => {
                info!("{username} authenticated");
                Ok(Some(user))
            }
            Some(_) => {
                info!("wrong password for user {username}");
                Ok(None)
            }
            None => {
                info!("rejecting non-existent user {username}");
                Ok(None)
            }
        }
    }

    pub fn identify(self: &Arc<Self>, session_user: Option<String>, action: Action) -> Result<Authed> {
        let username = auth::identify(session_user, action)?;

        debug!("{username}: {action}");
        Ok(Authed {
            app: Arc::clone(self),
            username,
        })
    }

    pub async fn user(&self, username: &str) -> Result<User> {
        Ok(self.backend.find_user(username).await?)
    }

    pub async fn feedback(&self, id: i64) -> Result<Feedback> {
        Ok(self.backend.find_feedback(id).await?)
    }
}

impl<const OWNER: bool> Authed<OWNER> {
    pub fn username(&self) -> &str {
        &self.username
    }
}

impl Authed {
    pub fn with_user(self, owner: &str, action: Action) -> Result<Authed<true>> {
        auth::owns(&self.username, Some(owner), action)?;

        Ok(Authed {
            app: self.app,
            username: self.username,
        })
    }

    /// Loads the feedback and checks it belongs to the logged in user.
    pub async fn with_feedback(self, id: i64, action: Action) -> Result<(Authed<true>, Feedback)> {
        let feedback = self.app.feedback(id).await?;
        auth::owns(&self.username, feedback.username.as_deref(), action)?;

        let owner = Authed {
            app: self.app,
            username: self.username,
        };
        Ok((owner, feedback))
    }
}

impl Authed<true> {
    pub async fn user(&self) -> Result<User> {
        self.app.user(&self.username).await
    }

    pub async fn feedback(&self) -> Result<Vec<Feedback>> {
        let username = &self.username;
        trace!("{username} listing feedback");

        self.app
            .backend
            .feedback_for_user(username)
            .await
            .map(|feedback| {
                debug!("{username}, {} feedback", feedback.len());
                feedback
            })
            .map_err(|()| Error::Internal)
    }

    pub async fn add_feedback(&self, input: &FeedbackInput) -> Result<Feedback> {
        let feedback = self.app.backend.create_feedback(&self.username, input).await?;

        info!("{} added feedback {}", self.username, feedback.id);
        Ok(feedback)
    }

    pub async fn update_feedback(&self, id: i64, input: &FeedbackInput) -> Result<Feedback> {
        let feedback = self
            .app
            .backend
            .update_feedback(id, &self.username, input)
            .await?;

        info!("{} updated feedback {id}", self.username);
        Ok(feedback)
    }

    pub async fn delete_feedback(&self, id: i64) -> Result<()> {
        self.app.backend.delete_feedback(id, &self.username).await?;

        info!("{} deleted feedback {id}", self.username);
        Ok(())
    }

    /// Deletes the user along with all of their feedback.
    pub async fn delete_account(self) -> Result<()> {
        let removed = self.app.backend.delete_user(&self.username).await?;

        info!("{} deleted, along with {removed} feedback", self.username);
        Ok(())
    }
}
