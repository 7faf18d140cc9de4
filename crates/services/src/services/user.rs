use db::models::user::{CreateUser, User};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum UserServiceError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("{0}")]
    Validation(String),
    #[error("user not found")]
    NotFound,
}

pub struct UserService;

impl UserService {
    pub async fn list(pool: &SqlitePool) -> Result<Vec<User>, UserServiceError> {
        Ok(User::find_all(pool).await?)
    }

    pub async fn get(pool: &SqlitePool, id: Uuid) -> Result<User, UserServiceError> {
        User::find_by_id(pool, id)
            .await?
            .ok_or(UserServiceError::NotFound)
    }

    pub async fn create(pool: &SqlitePool, data: &CreateUser) -> Result<User, UserServiceError> {
        let username = data.username.trim();
        let email = data.email.trim();
        if username.is_empty() || email.is_empty() {
            return Err(UserServiceError::Validation(
                "username and email are required".to_string(),
            ));
        }
        if !email.contains('@') {
            return Err(UserServiceError::Validation(format!(
                "'{email}' is not a valid email address"
            )));
        }
        if User::find_by_username_or_email(pool, username, email)
            .await?
            .is_some()
        {
            return Err(UserServiceError::Validation(
                "a user with this username or email already exists".to_string(),
            ));
        }

        let data = CreateUser {
            username: username.to_string(),
            email: email.to_string(),
            ..data.clone()
        };
        let user = User::create(pool, &data, Uuid::new_v4()).await?;
        info!(user_id = %user.id, username = %user.username, "Created user");
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use db::DBService;

    use super::*;

    fn user(username: &str, email: &str) -> CreateUser {
        CreateUser {
            username: username.to_string(),
            email: email.to_string(),
            full_name: None,
            role: None,
        }
    }

    #[tokio::test]
    async fn rejects_invalid_and_duplicate_users() {
        let db = DBService::new_in_memory().await.unwrap();
        assert!(matches!(
            UserService::create(&db.pool, &user("ana", "not-an-email")).await,
            Err(UserServiceError::Validation(_))
        ));

        let ana = UserService::create(&db.pool, &user(" ana ", "ana@example.com"))
            .await
            .unwrap();
        assert_eq!(ana.username, "ana");

        assert!(matches!(
            UserService::create(&db.pool, &user("someone", "ana@example.com")).await,
            Err(UserServiceError::Validation(_))
        ));
        assert!(matches!(
            UserService::get(&db.pool, Uuid::new_v4()).await,
            Err(UserServiceError::NotFound)
        ));
    }
}
