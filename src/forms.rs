//! Typed form bodies and their validation.
//!
//! Each form deserialises with every field defaulting to an empty string, so a
//! missing field is reported as a field error rather than a rejected request.

use std::collections::BTreeMap;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::feedback::FeedbackInput;
use crate::user::NewUser;

const REQUIRED: &str = "This field is required.";

/// Field name to the messages for that field, in field order.
#[derive(Debug, Default, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<&'static str, Vec<String>>);

impl FieldErrors {
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[cfg(test)]
    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or_default()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterForm {
    pub username: String,
    pub password: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FeedbackForm {
    pub title: String,
    pub content: String,
}

fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|re| re.is_match(email))
}

/// Dots alone would make a path dot-segment.
fn valid_username(username: &str) -> bool {
    Regex::new(r"^[A-Za-z0-9_.-]*[A-Za-z0-9_-][A-Za-z0-9_.-]*$").is_ok_and(|re| re.is_match(username))
}

/// Trimmed, non-blank and at most `max` characters (if given).
fn text(
    errors: &mut FieldErrors,
    field: &'static str,
    value: &str,
    max: Option<usize>,
) -> String {
    let value = value.trim();

    if value.is_empty() {
        errors.add(field, REQUIRED);
    } else if let Some(max) = max {
        if value.chars().count() > max {
            errors.add(field, format!("Field cannot be longer than {max} characters."));
        }
    }

    value.to_string()
}

/// Passwords are taken verbatim, only checked for presence.
fn secret(errors: &mut FieldErrors, field: &'static str, value: &str) {
    if value.trim().is_empty() {
        errors.add(field, REQUIRED);
    }
}

fn finish<T>(errors: FieldErrors, valid: T) -> Result<T, FieldErrors> {
    if errors.is_empty() {
        Ok(valid)
    } else {
        Err(errors)
    }
}

impl RegisterForm {
    pub fn validate(&self) -> Result<NewUser, FieldErrors> {
        let mut errors = FieldErrors::default();

        let username = text(&mut errors, "username", &self.username, Some(20));
        if !username.is_empty() && !valid_username(&username) {
            errors.add(
                "username",
                "Username may only contain letters, digits, '.', '_' and '-'.",
            );
        }

        secret(&mut errors, "password", &self.password);

        let email = text(&mut errors, "email", &self.email, Some(50));
        if !email.is_empty() && !valid_email(&email) {
            errors.add("email", "Invalid email address.");
        }

        let first_name = text(&mut errors, "first_name", &self.first_name, Some(30));
        let last_name = text(&mut errors, "last_name", &self.last_name, Some(30));

        finish(
            errors,
            NewUser {
                username,
                password: self.password.clone(),
                email,
                first_name,
                last_name,
            },
        )
    }

    /// What to show back in the form; never the password.
    pub fn values(&self) -> BTreeMap<&'static str, String> {
        BTreeMap::from([
            ("username", self.username.clone()),
            ("email", self.email.clone()),
            ("first_name", self.first_name.clone()),
            ("last_name", self.last_name.clone()),
        ])
    }
}

impl LoginForm {
    pub fn validate(&self) -> Result<(String, String), FieldErrors> {
        let mut errors = FieldErrors::default();

        let username = text(&mut errors, "username", &self.username, None);
        secret(&mut errors, "password", &self.password);

        finish(errors, (username, self.password.clone()))
    }

    pub fn values(&self) -> BTreeMap<&'static str, String> {
        BTreeMap::from([("username", self.username.clone())])
    }
}

impl FeedbackForm {
    pub fn validate(&self) -> Result<FeedbackInput, FieldErrors> {
        let mut errors = FieldErrors::default();

        let title = text(&mut errors, "title", &self.title, Some(100));
        let content = text(&mut errors, "content", &self.content, None);

        finish(errors, FeedbackInput { title, content })
    }

    pub fn values(&self) -> BTreeMap<&'static str, String> {
        BTreeMap::from([
            ("title", self.title.clone()),
            ("content", self.content.clone()),
        ])
    }
}
