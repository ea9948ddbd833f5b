use std::fmt;

use log::{info, warn};

/// What an identity-sensitive request is trying to do.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Action {
    ViewUser,
    AddFeedback,
    UpdateFeedback,
    DeleteFeedback,
    DeleteUser,
}

/// Why a request was refused. Never a hard failure: the caller redirects
/// somewhere safe and tells the user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Denied {
    Unauthenticated,
    NotOwner { current: String, action: Action },
}

impl Denied {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "Please login first!",
            Self::NotOwner { action, .. } => match action {
                Action::ViewUser => "You cannot view another user's information!",
                Action::AddFeedback => "You cannot add feedback for another user",
                Action::UpdateFeedback => "You cannot update feedback for another user",
                Action::DeleteFeedback => "You cannot delete feedback for another user",
                Action::DeleteUser => "You cannot delete another user",
            },
        }
    }

    pub fn location(&self) -> String {
        match self {
            Self::Unauthenticated => "/login".into(),
            Self::NotOwner { current, .. } => format!("/users/{current}"),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::ViewUser => "view user",
            Self::AddFeedback => "add feedback",
            Self::UpdateFeedback => "update feedback",
            Self::DeleteFeedback => "delete feedback",
            Self::DeleteUser => "delete user",
        };
        write!(fmt, "{s}")
    }
}

/// First step of every guarded request: is anyone logged in?
pub fn identify(session_user: Option<String>, action: Action) -> Result<String, Denied> {
    session_user.ok_or_else(|| {
        info!("{action}: no session");
        Denied::Unauthenticated
    })
}

/// Second step: does the logged in user own the resource?
///
/// `owner` is the resource's owning username; feedback without an owner
/// belongs to nobody and can't be touched.
pub fn owns(current: &str, owner: Option<&str>, action: Action) -> Result<(), Denied> {
    if owner == Some(current) {
        Ok(())
    } else {
        warn!(
            "{action}: {current} denied, resource owned by {}",
            owner.unwrap_or("<nobody>")
        );
        Err(Denied::NotOwner {
            current: current.into(),
            action,
        })
    }
}
