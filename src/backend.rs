#[derive(Debug)]
pub enum FindError {
    NotFound,
    Internal,
}

#[derive(Debug)]
pub enum InsertError {
    DuplicateUsername,
    DuplicateEmail,
    Internal,
}

mod backend_sql;
pub use backend_sql::*;
