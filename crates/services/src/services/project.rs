//! Projects, tasks and resources, with activity logging and project progress upkeep.

use chrono::{NaiveDate, Utc};
use db::models::{
    activity_log::{ActivityAction, ActivityLog, EntityType},
    project::{CreateProject, Project, ProjectStatus, StatusCount, UpdateProject},
    resource::{
        AllocatedResource, CreateResource, Resource, ResourceType, TaskResource, UpdateResource,
    },
    task::{CreateTask, Task, TaskStatus, UpdateTask},
};
use serde::Serialize;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{info, warn};
use ts_rs::TS;
use uuid::Uuid;

use super::notification::NotificationService;

#[derive(Debug, Error)]
pub enum ProjectServiceError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("{0}")]
    Validation(String),
    #[error("project not found")]
    ProjectNotFound,
    #[error("task not found")]
    TaskNotFound,
    #[error("resource not found")]
    ResourceNotFound,
    #[error("resource is not assigned to this task")]
    AssignmentNotFound,
}

fn invalid(message: impl Into<String>) -> ProjectServiceError {
    ProjectServiceError::Validation(message.into())
}

fn check_dates(start: Option<NaiveDate>, end: Option<NaiveDate>, end_label: &str) -> Result<(), ProjectServiceError> {
    match (start, end) {
        (Some(start), Some(end)) if end < start => {
            Err(invalid(format!("{end_label} must not be before start_date")))
        }
        _ => Ok(()),
    }
}

fn check_progress(progress: i64) -> Result<(), ProjectServiceError> {
    if (0..=100).contains(&progress) {
        Ok(())
    } else {
        Err(invalid("progress must be between 0 and 100"))
    }
}

fn check_project(project: &Project) -> Result<(), ProjectServiceError> {
    if project.name.trim().is_empty() {
        return Err(invalid("project name is required"));
    }
    if !(project.budget >= 0.0) {
        return Err(invalid("budget must not be negative"));
    }
    if !(project.spent >= 0.0) {
        return Err(invalid("spent must not be negative"));
    }
    check_dates(project.start_date, project.end_date, "end_date")
}

fn check_task(task: &Task) -> Result<(), ProjectServiceError> {
    if task.title.trim().is_empty() {
        return Err(invalid("task title is required"));
    }
    check_progress(task.progress)?;
    check_dates(task.start_date, task.due_date, "due_date")
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct DashboardStats {
    pub total_projects: i64,
    pub projects_by_status: Vec<StatusCount>,
    pub tasks_by_status: Vec<StatusCount>,
    pub total_budget: f64,
    pub total_spent: f64,
    pub average_progress: f64,
    pub overdue_tasks: i64,
}

pub struct ProjectService;

impl ProjectService {
    // Projects

    pub async fn list_projects(
        pool: &SqlitePool,
        status: Option<ProjectStatus>,
    ) -> Result<Vec<Project>, ProjectServiceError> {
        Ok(Project::find_all(pool, status).await?)
    }

    pub async fn get_project(pool: &SqlitePool, id: Uuid) -> Result<Project, ProjectServiceError> {
        Project::find_by_id(pool, id)
            .await?
            .ok_or(ProjectServiceError::ProjectNotFound)
    }

    pub async fn create_project(
        pool: &SqlitePool,
        data: &CreateProject,
    ) -> Result<Project, ProjectServiceError> {
        if data.name.trim().is_empty() {
            return Err(invalid("project name is required"));
        }
        if data.budget.is_some_and(|b| !(b >= 0.0)) {
            return Err(invalid("budget must not be negative"));
        }
        if data.spent.is_some_and(|s| !(s >= 0.0)) {
            return Err(invalid("spent must not be negative"));
        }
        check_dates(data.start_date, data.end_date, "end_date")?;

        let mut tx = pool.begin().await?;
        let project = Project::create(&mut *tx, data, Uuid::new_v4()).await?;
        ActivityLog::create(
            &mut *tx,
            Some(project.id),
            EntityType::Project,
            project.id,
            ActivityAction::Created,
            Some(project.name.clone()),
        )
        .await?;
        tx.commit().await?;

        info!(project_id = %project.id, name = %project.name, "Created project");
        Ok(project)
    }

    pub async fn update_project(
        pool: &SqlitePool,
        id: Uuid,
        data: &UpdateProject,
    ) -> Result<Project, ProjectServiceError> {
        let existing = Self::get_project(pool, id).await?;
        let old_status = existing.status.clone();

        let mut project = existing;
        if let Some(name) = &data.name {
            project.name = name.trim().to_string();
        }
        if let Some(description) = &data.description {
            project.description = Some(description.clone());
        }
        if let Some(location) = &data.location {
            project.location = Some(location.clone());
        }
        if let Some(status) = &data.status {
            project.status = status.clone();
        }
        if let Some(category) = data.category {
            project.category = category;
        }
        if let Some(budget) = data.budget {
            project.budget = budget;
        }
        if let Some(spent) = data.spent {
            project.spent = spent;
        }
        if let Some(start_date) = data.start_date {
            project.start_date = Some(start_date);
        }
        if let Some(end_date) = data.end_date {
            project.end_date = Some(end_date);
        }
        if let Some(manager_id) = data.manager_id {
            project.manager_id = Some(manager_id);
        }
        check_project(&project)?;

        let only_status = data.status.is_some()
            && data.name.is_none()
            && data.description.is_none()
            && data.location.is_none()
            && data.category.is_none()
            && data.budget.is_none()
            && data.spent.is_none()
            && data.start_date.is_none()
            && data.end_date.is_none()
            && data.manager_id.is_none();

        let mut tx = pool.begin().await?;
        let project = Project::update(&mut *tx, &project).await?;
        let (action, details) = if only_status {
            (
                ActivityAction::StatusChanged,
                Some(format!("{} -> {}", old_status, project.status)),
            )
        } else {
            (ActivityAction::Updated, None)
        };
        ActivityLog::create(&mut *tx, Some(id), EntityType::Project, id, action, details).await?;
        tx.commit().await?;

        Ok(project)
    }

    /// Delete a project with its tasks and estimations
    pub async fn delete_project(pool: &SqlitePool, id: Uuid) -> Result<(), ProjectServiceError> {
        let project = Self::get_project(pool, id).await?;

        let mut tx = pool.begin().await?;
        Project::delete(&mut *tx, id).await?;
        ActivityLog::create(
            &mut *tx,
            None,
            EntityType::Project,
            id,
            ActivityAction::Deleted,
            Some(project.name.clone()),
        )
        .await?;
        tx.commit().await?;

        info!(project_id = %id, name = %project.name, "Deleted project");
        Ok(())
    }

    // Tasks

    pub async fn list_tasks(
        pool: &SqlitePool,
        project_id: Uuid,
    ) -> Result<Vec<Task>, ProjectServiceError> {
        Self::get_project(pool, project_id).await?;
        Ok(Task::find_by_project_id(pool, project_id).await?)
    }

    pub async fn get_task(pool: &SqlitePool, id: Uuid) -> Result<Task, ProjectServiceError> {
        Task::find_by_id(pool, id)
            .await?
            .ok_or(ProjectServiceError::TaskNotFound)
    }

    pub async fn create_task(
        pool: &SqlitePool,
        data: &CreateTask,
    ) -> Result<Task, ProjectServiceError> {
        if data.title.trim().is_empty() {
            return Err(invalid("task title is required"));
        }
        if let Some(progress) = data.progress {
            check_progress(progress)?;
        }
        check_dates(data.start_date, data.due_date, "due_date")?;
        Self::get_project(pool, data.project_id).await?;

        let mut tx = pool.begin().await?;
        let task = Task::create(&mut *tx, data, Uuid::new_v4()).await?;
        Project::recompute_progress(&mut *tx, task.project_id).await?;
        ActivityLog::create(
            &mut *tx,
            Some(task.project_id),
            EntityType::Task,
            task.id,
            ActivityAction::Created,
            Some(task.title.clone()),
        )
        .await?;
        tx.commit().await?;

        info!(task_id = %task.id, project_id = %task.project_id, "Created task");
        Ok(task)
    }

    pub async fn update_task(
        pool: &SqlitePool,
        id: Uuid,
        data: &UpdateTask,
    ) -> Result<Task, ProjectServiceError> {
        let existing = Self::get_task(pool, id).await?;
        let old_status = existing.status.clone();

        let mut task = existing;
        if let Some(title) = &data.title {
            task.title = title.trim().to_string();
        }
        if let Some(description) = &data.description {
            task.description = Some(description.clone());
        }
        if let Some(status) = &data.status {
            task.status = status.clone();
        }
        if let Some(priority) = &data.priority {
            task.priority = priority.clone();
        }
        if let Some(progress) = data.progress {
            task.progress = progress;
        }
        if let Some(start_date) = data.start_date {
            task.start_date = Some(start_date);
        }
        if let Some(due_date) = data.due_date {
            task.due_date = Some(due_date);
        }
        if let Some(assignee_id) = data.assignee_id {
            task.assignee_id = Some(assignee_id);
        }
        if task.status == TaskStatus::Completed {
            task.progress = 100;
        }
        check_task(&task)?;

        let status_changed = task.status != old_status;
        let (action, details) = if status_changed {
            (
                ActivityAction::StatusChanged,
                Some(format!("{} -> {}", old_status, task.status)),
            )
        } else {
            (ActivityAction::Updated, None)
        };

        let mut tx = pool.begin().await?;
        let task = Task::update(&mut *tx, &task).await?;
        Project::recompute_progress(&mut *tx, task.project_id).await?;
        ActivityLog::create(
            &mut *tx,
            Some(task.project_id),
            EntityType::Task,
            task.id,
            action,
            details,
        )
        .await?;
        tx.commit().await?;

        if status_changed {
            Self::notify_status_change(pool, &task).await;
        }
        Ok(task)
    }

    /// Change a task's status, keeping project progress current and notifying on
    /// completion or delay.
    pub async fn update_task_status(
        pool: &SqlitePool,
        id: Uuid,
        status: TaskStatus,
    ) -> Result<Task, ProjectServiceError> {
        let existing = Self::get_task(pool, id).await?;

        let mut tx = pool.begin().await?;
        let task = Task::update_status(&mut *tx, id, status).await?;
        Project::recompute_progress(&mut *tx, task.project_id).await?;
        ActivityLog::create(
            &mut *tx,
            Some(task.project_id),
            EntityType::Task,
            task.id,
            ActivityAction::StatusChanged,
            Some(format!("{} -> {}", existing.status, task.status)),
        )
        .await?;
        tx.commit().await?;

        info!(
            task_id = %task.id,
            from = %existing.status,
            to = %task.status,
            "Task status changed"
        );

        if existing.status != task.status {
            Self::notify_status_change(pool, &task).await;
        }

        Ok(task)
    }

    /// Notification failures are logged and never fail the status change itself
    async fn notify_status_change(pool: &SqlitePool, task: &Task) {
        let project = match Self::get_project(pool, task.project_id).await {
            Ok(project) => project,
            Err(e) => {
                warn!(task_id = %task.id, error = %e, "Failed to load project for notification");
                return;
            }
        };
        if let Err(e) = NotificationService::notify_task_status(pool, task, &project).await {
            warn!(task_id = %task.id, error = %e, "Failed to create task notification");
        }
    }

    pub async fn delete_task(pool: &SqlitePool, id: Uuid) -> Result<(), ProjectServiceError> {
        let task = Self::get_task(pool, id).await?;

        let mut tx = pool.begin().await?;
        Task::delete(&mut *tx, id).await?;
        Project::recompute_progress(&mut *tx, task.project_id).await?;
        ActivityLog::create(
            &mut *tx,
            Some(task.project_id),
            EntityType::Task,
            id,
            ActivityAction::Deleted,
            Some(task.title.clone()),
        )
        .await?;
        tx.commit().await?;

        Ok(())
    }

    // Resources

    pub async fn list_resources(
        pool: &SqlitePool,
        resource_type: Option<ResourceType>,
    ) -> Result<Vec<Resource>, ProjectServiceError> {
        Ok(Resource::find_all(pool, resource_type).await?)
    }

    pub async fn get_resource(pool: &SqlitePool, id: Uuid) -> Result<Resource, ProjectServiceError> {
        Resource::find_by_id(pool, id)
            .await?
            .ok_or(ProjectServiceError::ResourceNotFound)
    }

    pub async fn create_resource(
        pool: &SqlitePool,
        data: &CreateResource,
    ) -> Result<Resource, ProjectServiceError> {
        if data.name.trim().is_empty() {
            return Err(invalid("resource name is required"));
        }
        if data.cost_per_unit.is_some_and(|c| !(c >= 0.0)) {
            return Err(invalid("cost_per_unit must not be negative"));
        }

        let mut tx = pool.begin().await?;
        let resource = Resource::create(&mut *tx, data, Uuid::new_v4()).await?;
        ActivityLog::create(
            &mut *tx,
            None,
            EntityType::Resource,
            resource.id,
            ActivityAction::Created,
            Some(resource.name.clone()),
        )
        .await?;
        tx.commit().await?;
        Ok(resource)
    }

    pub async fn update_resource(
        pool: &SqlitePool,
        id: Uuid,
        data: &UpdateResource,
    ) -> Result<Resource, ProjectServiceError> {
        let mut resource = Self::get_resource(pool, id).await?;
        if let Some(name) = &data.name {
            resource.name = name.trim().to_string();
        }
        if let Some(resource_type) = &data.resource_type {
            resource.resource_type = resource_type.clone();
        }
        if let Some(description) = &data.description {
            resource.description = Some(description.clone());
        }
        if let Some(cost) = data.cost_per_unit {
            resource.cost_per_unit = cost;
        }
        if let Some(unit) = &data.unit {
            resource.unit = Some(unit.clone());
        }
        if let Some(available) = data.available {
            resource.available = available;
        }
        if resource.name.is_empty() {
            return Err(invalid("resource name is required"));
        }
        if !(resource.cost_per_unit >= 0.0) {
            return Err(invalid("cost_per_unit must not be negative"));
        }

        let mut tx = pool.begin().await?;
        let resource = Resource::update(&mut *tx, &resource).await?;
        ActivityLog::create(
            &mut *tx,
            None,
            EntityType::Resource,
            id,
            ActivityAction::Updated,
            None,
        )
        .await?;
        tx.commit().await?;
        Ok(resource)
    }

    pub async fn delete_resource(pool: &SqlitePool, id: Uuid) -> Result<(), ProjectServiceError> {
        let resource = Self::get_resource(pool, id).await?;
        let mut tx = pool.begin().await?;
        Resource::delete(&mut *tx, id).await?;
        ActivityLog::create(
            &mut *tx,
            None,
            EntityType::Resource,
            id,
            ActivityAction::Deleted,
            Some(resource.name),
        )
        .await?;
        tx.commit().await?;
        Ok(())
    }

    /// Allocate a resource to a task, replacing any previous allocation of the same pair
    pub async fn assign_resource(
        pool: &SqlitePool,
        task_id: Uuid,
        resource_id: Uuid,
        allocation_percent: i64,
    ) -> Result<TaskResource, ProjectServiceError> {
        if !(1..=100).contains(&allocation_percent) {
            return Err(invalid("allocation_percent must be between 1 and 100"));
        }
        let task = Self::get_task(pool, task_id).await?;
        let resource = Self::get_resource(pool, resource_id).await?;

        let mut tx = pool.begin().await?;
        let assignment =
            TaskResource::upsert(&mut *tx, task_id, resource_id, allocation_percent).await?;
        ActivityLog::create(
            &mut *tx,
            Some(task.project_id),
            EntityType::Resource,
            resource_id,
            ActivityAction::Assigned,
            Some(format!(
                "{} -> {} ({}%)",
                resource.name, task.title, allocation_percent
            )),
        )
        .await?;
        tx.commit().await?;
        Ok(assignment)
    }

    pub async fn unassign_resource(
        pool: &SqlitePool,
        task_id: Uuid,
        resource_id: Uuid,
    ) -> Result<(), ProjectServiceError> {
        let task = Self::get_task(pool, task_id).await?;
        let mut tx = pool.begin().await?;
        if TaskResource::delete(&mut *tx, task_id, resource_id).await? == 0 {
            return Err(ProjectServiceError::AssignmentNotFound);
        }
        ActivityLog::create(
            &mut *tx,
            Some(task.project_id),
            EntityType::Resource,
            resource_id,
            ActivityAction::Unassigned,
            Some(task.title),
        )
        .await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn list_task_resources(
        pool: &SqlitePool,
        task_id: Uuid,
    ) -> Result<Vec<AllocatedResource>, ProjectServiceError> {
        Self::get_task(pool, task_id).await?;
        Ok(TaskResource::find_by_task_id(pool, task_id).await?)
    }

    pub async fn dashboard_stats(pool: &SqlitePool) -> Result<DashboardStats, ProjectServiceError> {
        let projects_by_status = Project::count_by_status(pool).await?;
        let tasks_by_status = Task::count_by_status(pool).await?;
        let (total_budget, total_spent, average_progress) = Project::totals(pool).await?;
        let overdue = Task::find_overdue(pool, Utc::now().date_naive(), None).await?;

        Ok(DashboardStats {
            total_projects: projects_by_status.iter().map(|s| s.count).sum(),
            projects_by_status,
            tasks_by_status,
            total_budget,
            total_spent,
            average_progress,
            overdue_tasks: overdue.len() as i64,
        })
    }
}
