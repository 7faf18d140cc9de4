//! Project and material reports. Exports are JSON documents; the PDF and Excel formats
//! write the same document under their own file name.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use db::models::{
    activity_log::ActivityLog,
    estimation::{ProjectEstimation, ProjectEstimationWithBreakdown},
    material::{Material, MaterialCategorySummary},
    project::Project,
    resource::{AllocatedResource, TaskResource},
    task::{Task, TaskStatus},
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use strum_macros::{Display, EnumString};
use thiserror::Error;
use tracing::info;
use ts_rs::TS;
use uuid::Uuid;

const REPORT_ACTIVITY_LIMIT: i64 = 20;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("project not found")]
    ProjectNotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, EnumString, Display, Default)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Json,
    Pdf,
    Excel,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
pub struct TaskStatusSummary {
    pub total: i64,
    pub not_started: i64,
    pub in_progress: i64,
    pub completed: i64,
    pub delayed: i64,
}

impl TaskStatusSummary {
    fn from_tasks(tasks: &[Task]) -> Self {
        tasks.iter().fold(Self::default(), |mut acc, task| {
            acc.total += 1;
            match task.status {
                TaskStatus::NotStarted => acc.not_started += 1,
                TaskStatus::InProgress => acc.in_progress += 1,
                TaskStatus::Completed => acc.completed += 1,
                TaskStatus::Delayed => acc.delayed += 1,
            }
            acc
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ProjectReport {
    pub project: Project,
    pub tasks: TaskStatusSummary,
    pub overdue_tasks: Vec<Task>,
    pub resources: Vec<AllocatedResource>,
    /// Σ cost_per_unit × allocation share over all assignments
    pub allocated_resource_cost: f64,
    pub latest_estimation: Option<ProjectEstimationWithBreakdown>,
    pub budget_utilization_percent: Option<f64>,
    pub recent_activity: Vec<ActivityLog>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ExportedReport {
    pub project_id: Uuid,
    pub format: ReportFormat,
    pub path: String,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct MaterialsReport {
    pub total_materials: i64,
    pub categories: Vec<MaterialCategorySummary>,
    pub generated_at: DateTime<Utc>,
}

fn budget_utilization(project: &Project) -> Option<f64> {
    (project.budget > 0.0).then(|| (project.spent / project.budget * 10_000.0).round() / 100.0)
}

#[derive(Debug, Clone)]
pub struct ReportService {
    reports_dir: PathBuf,
}

impl ReportService {
    pub fn new(reports_dir: impl Into<PathBuf>) -> Self {
        Self {
            reports_dir: reports_dir.into(),
        }
    }

    pub async fn project_report(
        &self,
        pool: &SqlitePool,
        project_id: Uuid,
    ) -> Result<ProjectReport, ReportError> {
        let project = Project::find_by_id(pool, project_id)
            .await?
            .ok_or(ReportError::ProjectNotFound)?;
        let now = Utc::now();

        let tasks = Task::find_by_project_id(pool, project_id).await?;
        let overdue_tasks = Task::find_overdue(pool, now.date_naive(), Some(project_id)).await?;
        let resources = TaskResource::find_by_project_id(pool, project_id).await?;
        let allocated_resource_cost = resources
            .iter()
            .map(|r| r.cost_per_unit * r.allocation_percent as f64 / 100.0)
            .sum::<f64>();
        let latest_estimation = ProjectEstimation::find_latest_by_project_id(pool, project_id)
            .await?
            .map(ProjectEstimation::with_breakdown);
        let recent_activity =
            ActivityLog::find_recent(pool, Some(project_id), REPORT_ACTIVITY_LIMIT).await?;

        Ok(ProjectReport {
            budget_utilization_percent: budget_utilization(&project),
            tasks: TaskStatusSummary::from_tasks(&tasks),
            project,
            overdue_tasks,
            resources,
            allocated_resource_cost: (allocated_resource_cost * 100.0).round() / 100.0,
            latest_estimation,
            recent_activity,
            generated_at: now,
        })
    }

    /// Write the project report to the reports directory and return where it went
    pub async fn export_project_report(
        &self,
        pool: &SqlitePool,
        project_id: Uuid,
        format: ReportFormat,
    ) -> Result<ExportedReport, ReportError> {
        let report = self.project_report(pool, project_id).await?;
        let document = serde_json::to_vec_pretty(&report)?;

        tokio::fs::create_dir_all(&self.reports_dir).await?;
        let file_name = format!(
            "{}-{}-{}.json",
            project_id,
            report.generated_at.format("%Y%m%dT%H%M%S%3f"),
            format
        );
        let path = self.reports_dir.join(file_name);
        tokio::fs::write(&path, document).await?;

        info!(
            project_id = %project_id,
            format = %format,
            path = %path.display(),
            "Exported project report"
        );
        Ok(ExportedReport {
            project_id,
            format,
            path: path.to_string_lossy().into_owned(),
            generated_at: report.generated_at,
        })
    }

    pub async fn materials_report(&self, pool: &SqlitePool) -> Result<MaterialsReport, ReportError> {
        let categories = Material::category_summary(pool).await?;
        Ok(MaterialsReport {
            total_materials: categories.iter().map(|c| c.item_count).sum(),
            categories,
            generated_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use db::{
        DBService,
        models::{
            material::CreateMaterial,
            project::CreateProject,
            resource::{CreateResource, Resource, ResourceType},
            task::CreateTask,
        },
    };

    use super::*;

    #[tokio::test]
    async fn report_summarises_project() {
        let db = DBService::new_in_memory().await.unwrap();
        let mut data = CreateProject::named("Quayside");
        data.budget = Some(200_000.0);
        data.spent = Some(50_000.0);
        let project = Project::create(&db.pool, &data, Uuid::new_v4()).await.unwrap();

        let mut late = CreateTask::from_title(project.id, "Foundations");
        late.due_date = NaiveDate::from_ymd_opt(2021, 3, 1);
        let late = Task::create(&db.pool, &late, Uuid::new_v4()).await.unwrap();
        let mut done = CreateTask::from_title(project.id, "Survey");
        done.status = Some(TaskStatus::Completed);
        Task::create(&db.pool, &done, Uuid::new_v4()).await.unwrap();

        let crew = Resource::create(
            &db.pool,
            &CreateResource {
                name: "Concrete crew".to_string(),
                resource_type: ResourceType::Human,
                description: None,
                cost_per_unit: Some(80.0),
                unit: Some("hour".to_string()),
                available: None,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        TaskResource::upsert(&db.pool, late.id, crew.id, 50).await.unwrap();

        let reports = ReportService::new(std::env::temp_dir());
        let report = reports.project_report(&db.pool, project.id).await.unwrap();
        assert_eq!(report.tasks.total, 2);
        assert_eq!(report.tasks.completed, 1);
        assert_eq!(report.overdue_tasks.len(), 1);
        assert_eq!(report.allocated_resource_cost, 40.0);
        assert_eq!(report.budget_utilization_percent, Some(25.0));
        assert!(report.latest_estimation.is_none());
    }

    #[tokio::test]
    async fn zero_budget_has_no_utilisation() {
        let db = DBService::new_in_memory().await.unwrap();
        let project = Project::create(&db.pool, &CreateProject::named("Shed"), Uuid::new_v4())
            .await
            .unwrap();
        let report = ReportService::new(std::env::temp_dir())
            .project_report(&db.pool, project.id)
            .await
            .unwrap();
        assert_eq!(report.budget_utilization_percent, None);

        let missing = ReportService::new(std::env::temp_dir())
            .project_report(&db.pool, Uuid::new_v4())
            .await;
        assert!(matches!(missing, Err(ReportError::ProjectNotFound)));
    }

    #[tokio::test]
    async fn export_writes_json_document() {
        let db = DBService::new_in_memory().await.unwrap();
        let project = Project::create(&db.pool, &CreateProject::named("Mill"), Uuid::new_v4())
            .await
            .unwrap();
        let dir = tempfile::tempdir().unwrap();
        let reports = ReportService::new(dir.path().join("reports"));

        let exported = reports
            .export_project_report(&db.pool, project.id, ReportFormat::Pdf)
            .await
            .unwrap();
        assert!(exported.path.ends_with("-pdf.json"));

        let written: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&exported.path).unwrap()).unwrap();
        assert_eq!(written["project"]["name"], "Mill");
    }

    #[tokio::test]
    async fn materials_report_groups_by_category() {
        let db = DBService::new_in_memory().await.unwrap();
        for (name, category, price) in [
            ("Cement", "structure", 8.0),
            ("Sand", "structure", 30.0),
            ("Paint", "finishing", 6.0),
        ] {
            Material::create(
                &db.pool,
                &CreateMaterial {
                    name: name.to_string(),
                    category: category.to_string(),
                    unit: "unit".to_string(),
                    current_price: price,
                    supplier: None,
                },
                Uuid::new_v4(),
            )
            .await
            .unwrap();
        }

        let report = ReportService::new(std::env::temp_dir())
            .materials_report(&db.pool)
            .await
            .unwrap();
        assert_eq!(report.total_materials, 3);
        let structure = report
            .categories
            .iter()
            .find(|c| c.category == "structure")
            .unwrap();
        assert_eq!(structure.item_count, 2);
        assert_eq!(structure.average_price, 19.0);
    }
}
