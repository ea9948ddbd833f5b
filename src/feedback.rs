use serde::Serialize;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[cfg_attr(test, derive(PartialEq, Eq))]
pub struct Feedback {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub username: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FeedbackInput {
    pub title: String,
    pub content: String,
}
