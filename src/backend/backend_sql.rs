use std::future::Future;
use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{query, query_as, Executor, Pool, Sqlite, Transaction};

use log::{error, info};

use crate::backend::{FindError, InsertError};
use crate::feedback::{Feedback, FeedbackInput};
use crate::user::User;

type Result<T> = std::result::Result<T, ()>;

// sqlite extended result codes
const CONSTRAINT_FOREIGNKEY: &str = "787";
const CONSTRAINT_PRIMARYKEY: &str = "1555";
const CONSTRAINT_UNIQUE: &str = "2067";

pub struct Backend(pub Pool<Sqlite>);

impl Backend {
    pub async fn new(url: &str) -> std::result::Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        info!("Using {url}");

        Self::with_pool(pool).await
    }

    pub async fn with_pool(pool: Pool<Sqlite>) -> std::result::Result<Self, sqlx::Error> {
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self(pool))
    }
}

impl Backend {
    async fn transact<T, R, F>(&self, transaction: T) -> std::result::Result<R, FindError>
    where
        T: FnOnce(Transaction<'static, Sqlite>) -> F,
        F: Future<Output = std::result::Result<(Transaction<'static, Sqlite>, R), FindError>>,
    {
        let tx = self.0.begin().await.map_err(|e| {
            error!("error beginning transaction: {:?}", e);
            FindError::Internal
        })?;

        // an Err drops the transaction, rolling it back
        let (tx, r) = transaction(tx).await?;

        tx.commit().await.map_err(|e| {
            error!("error committing transaction: {:?}", e);
            FindError::Internal
        })?;

        Ok(r)
    }
}

fn constraint_code(e: &sqlx::Error) -> Option<String> {
    match e {
        sqlx::Error::Database(db) => db.code().map(|code| code.into_owned()),
        _ => None,
    }
}

fn find_error(e: sqlx::Error, what: &str) -> FindError {
    if matches!(e, sqlx::Error::RowNotFound) {
        FindError::NotFound
    } else {
        error!("error selecting {what}: {e:?}");
        FindError::Internal
    }
}

impl Backend {
    /// `user.password` must already be hashed.
    pub async fn create_user(&self, user: User) -> std::result::Result<User, InsertError> {
        query(
            "
            INSERT INTO users
            (username, password, email, first_name, last_name)
            VALUES
            (?, ?, ?, ?, ?)
            ",
        )
        .bind(user.username.as_str())
        .bind(user.password.as_str())
        .bind(user.email.as_str())
        .bind(user.first_name.as_str())
        .bind(user.last_name.as_str())
        .execute(&self.0)
        .await
        .map_err(|e| {
            match constraint_code(&e).as_deref() {
                Some(CONSTRAINT_UNIQUE | CONSTRAINT_PRIMARYKEY) => {
                    let message = match &e {
                        sqlx::Error::Database(db) => db.message().to_string(),
                        _ => String::new(),
                    };

                    if message.contains("users.email") {
                        InsertError::DuplicateEmail
                    } else {
                        InsertError::DuplicateUsername
                    }
                }
                _ => {
                    error!("error inserting user: {e:?}");
                    InsertError::Internal
                }
            }
        })?;

        Ok(user)
    }

    pub async fn find_user(&self, username: &str) -> std::result::Result<User, FindError> {
        query_as::<_, User>(
            "
            SELECT username, password, email, first_name, last_name
            FROM users
            WHERE username = ?
            ",
        )
        .bind(username)
        .fetch_one(&self.0)
        .await
        .map_err(|e| find_error(e, "user"))
    }

    /// Removes the user's feedback, then the user, as one transaction.
    /// Returns how many feedback rows went with them.
    pub async fn delete_user(&self, username: &str) -> std::result::Result<u64, FindError> {
        self.transact(|mut tx| async move {
            let feedback = delete_feedback_by_user(&mut tx, username).await?;

            let deleted = query("DELETE FROM users WHERE username = ?")
                .bind(username)
                .execute(&mut tx)
                .await
                .map_err(|e| {
                    error!("error deleting user: {e:?}");
                    FindError::Internal
                })?;

            if deleted.rows_affected() == 0 {
                return Err(FindError::NotFound);
            }

            Ok((tx, feedback))
        })
        .await
    }
}

async fn delete_feedback_by_user<'e, E>(executor: E, username: &str) -> std::result::Result<u64, FindError>
where
    E: Executor<'e, Database = Sqlite>,
{
    query("DELETE FROM feedback WHERE username = ?")
        .bind(username)
        .execute(executor)
        .await
        .map(|done| done.rows_affected())
        .map_err(|e| {
            error!("error deleting feedback for {username}: {e:?}");
            FindError::Internal
        })
}

impl Backend {
    pub async fn create_feedback(
        &self,
        username: &str,
        input: &FeedbackInput,
    ) -> std::result::Result<Feedback, FindError> {
        let done = query(
            "
            INSERT INTO feedback
            (title, content, username)
            VALUES
            (?, ?, ?)
            ",
        )
        .bind(input.title.as_str())
        .bind(input.content.as_str())
        .bind(username)
        .execute(&self.0)
        .await
        .map_err(|e| {
            if constraint_code(&e).as_deref() == Some(CONSTRAINT_FOREIGNKEY) {
                // no such user
                FindError::NotFound
            } else {
                error!("error inserting feedback: {e:?}");
                FindError::Internal
            }
        })?;

        Ok(Feedback {
            id: done.last_insert_rowid(),
            title: input.title.clone(),
            content: input.content.clone(),
            username: Some(username.into()),
        })
    }

    pub async fn find_feedback(&self, id: i64) -> std::result::Result<Feedback, FindError> {
        query_as::<_, Feedback>(
            "
            SELECT id, title, content, username
            FROM feedback
            WHERE id = ?
            ",
        )
        .bind(id)
        .fetch_one(&self.0)
        .await
        .map_err(|e| find_error(e, "feedback"))
    }

    pub async fn feedback_for_user(&self, username: &str) -> Result<Vec<Feedback>> {
        query_as::<_, Feedback>(
            "
            SELECT id, title, content, username
            FROM feedback
            WHERE username = ?
            ORDER BY id
            ",
        )
        .bind(username)
        .fetch_all(&self.0)
        .await
        .map_err(|e| {
            error!("error selecting feedback for {username}: {e:?}");
        })
    }

    /// Only touches the row if `username` owns it, NotFound otherwise.
    pub async fn update_feedback(
        &self,
        id: i64,
        username: &str,
        input: &FeedbackInput,
    ) -> std::result::Result<Feedback, FindError> {
        let done = query(
            "
            UPDATE feedback
            SET title = ?, content = ?
            WHERE id = ? AND username = ?
            ",
        )
        .bind(input.title.as_str())
        .bind(input.content.as_str())
        .bind(id)
        .bind(username)
        .execute(&self.0)
        .await
        .map_err(|e| {
            error!("error updating feedback {id}: {e:?}");
            FindError::Internal
        })?;

        if done.rows_affected() == 0 {
            return Err(FindError::NotFound);
        }

        Ok(Feedback {
            id,
            title: input.title.clone(),
            content: input.content.clone(),
            username: Some(username.into()),
        })
    }

    pub async fn delete_feedback(&self, id: i64, username: &str) -> std::result::Result<(), FindError> {
        let done = query("DELETE FROM feedback WHERE id = ? AND username = ?")
            .bind(id)
            .bind(username)
            .execute(&self.0)
            .await
            .map_err(|e| {
                error!("error deleting feedback {id}: {e:?}");
                FindError::Internal
            })?;

        match done.rows_affected() {
            0 => Err(FindError::NotFound),
            _ => Ok(()),
        }
    }
}
