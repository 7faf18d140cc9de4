use db::models::{
    notification::{Notification, NotificationKind},
    project::Project,
    task::{Task, TaskStatus},
    user::User,
};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("notification not found")]
    NotFound,
    #[error("user not found")]
    UserNotFound,
}

/// In-app notifications for project members
pub struct NotificationService;

impl NotificationService {
    /// Notify the project manager (or everyone, when the project has none) that a task
    /// was completed or delayed. Other statuses produce no notification.
    pub async fn notify_task_status(
        pool: &SqlitePool,
        task: &Task,
        project: &Project,
    ) -> Result<Option<Notification>, NotificationError> {
        let (title, kind) = match task.status {
            TaskStatus::Completed => ("Task completed", NotificationKind::Success),
            TaskStatus::Delayed => ("Task delayed", NotificationKind::Warning),
            _ => return Ok(None),
        };
        let message = format!("'{}' in project '{}' is now {}", task.title, project.name, task.status);

        let notification =
            Notification::create(pool, project.manager_id, title, &message, kind).await?;
        debug!(
            task_id = %task.id,
            notification_id = %notification.id,
            broadcast = project.manager_id.is_none(),
            "Task status notification created"
        );
        Ok(Some(notification))
    }

    pub async fn list(
        pool: &SqlitePool,
        user_id: Option<Uuid>,
        unread_only: bool,
    ) -> Result<Vec<Notification>, NotificationError> {
        Ok(Notification::find_for_user(pool, user_id, unread_only).await?)
    }

    /// Broadcasts read on behalf of `reader` stay unread for everyone else
    pub async fn mark_read(
        pool: &SqlitePool,
        id: Uuid,
        reader: Option<Uuid>,
    ) -> Result<Notification, NotificationError> {
        Self::check_user(pool, reader).await?;
        Notification::mark_read(pool, id, reader)
            .await?
            .ok_or(NotificationError::NotFound)
    }

    /// Returns the number of notifications that changed state
    pub async fn mark_all_read(
        pool: &SqlitePool,
        user_id: Option<Uuid>,
    ) -> Result<u64, NotificationError> {
        Self::check_user(pool, user_id).await?;
        Ok(Notification::mark_all_read(pool, user_id).await?)
    }

    async fn check_user(pool: &SqlitePool, user_id: Option<Uuid>) -> Result<(), NotificationError> {
        match user_id {
            Some(id) if User::find_by_id(pool, id).await?.is_none() => {
                Err(NotificationError::UserNotFound)
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use db::{
        DBService,
        models::{
            project::CreateProject,
            task::CreateTask,
            user::{CreateUser, User},
        },
    };

    use super::*;

    #[tokio::test]
    async fn completed_task_notifies_manager_and_in_progress_does_not() {
        let db = DBService::new_in_memory().await.unwrap();
        let manager = User::create(
            &db.pool,
            &CreateUser {
                username: "mara".to_string(),
                email: "mara@example.com".to_string(),
                full_name: None,
                role: None,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        let mut data = CreateProject::named("Dockside");
        data.manager_id = Some(manager.id);
        let project = Project::create(&db.pool, &data, Uuid::new_v4()).await.unwrap();

        let mut task = CreateTask::from_title(project.id, "Glazing");
        task.status = Some(TaskStatus::InProgress);
        let task = Task::create(&db.pool, &task, Uuid::new_v4()).await.unwrap();
        let none = NotificationService::notify_task_status(&db.pool, &task, &project)
            .await
            .unwrap();
        assert!(none.is_none());

        let task = Task::update_status(&db.pool, task.id, TaskStatus::Completed)
            .await
            .unwrap();
        let sent = NotificationService::notify_task_status(&db.pool, &task, &project)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(sent.user_id, Some(manager.id));
        assert_eq!(sent.kind, NotificationKind::Success);

        let unread = NotificationService::list(&db.pool, Some(manager.id), true)
            .await
            .unwrap();
        assert_eq!(unread.len(), 1);
        NotificationService::mark_read(&db.pool, sent.id, Some(manager.id))
            .await
            .unwrap();
        assert!(
            NotificationService::list(&db.pool, Some(manager.id), true)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn marking_unknown_notification_fails() {
        let db = DBService::new_in_memory().await.unwrap();
        let err = NotificationService::mark_read(&db.pool, Uuid::new_v4(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, NotificationError::NotFound));

        let err = NotificationService::mark_all_read(&db.pool, Some(Uuid::new_v4()))
            .await
            .unwrap_err();
        assert!(matches!(err, NotificationError::UserNotFound));
    }
}
