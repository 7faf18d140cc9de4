//! Chat assistant and LLM-backed market/project analyses.

use std::{fmt::Write as _, sync::Arc};

use chrono::{DateTime, Utc};
use db::models::{
    ai_analysis::{AiAnalysis, AnalysisType},
    chat_message::{ChatMessage, ChatRole},
    estimation::ProjectEstimation,
    market::{MarketFilter, RealEstateMarket},
    project::Project,
    task::Task,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{info, warn};
use ts_rs::TS;
use uuid::Uuid;

use super::{
    config::{AiConfig, ProviderKind},
    llm::{self, DEFAULT_MAX_TOKENS, LlmError, LlmMessage, LlmProvider},
};

/// Messages of a conversation sent back to the model on every turn
pub const CHAT_CONTEXT_MESSAGES: i64 = 20;
const DEFAULT_ANALYSES_LIMIT: i64 = 50;

const CHAT_SYSTEM_PROMPT: &str = "You are Housy, an assistant for construction project managers \
and real-estate analysts. Answer concisely and practically. When asked about costs, quantities \
or schedules, state your assumptions.";

const ANALYST_SYSTEM_PROMPT: &str = "You are a construction and real-estate analyst. \
Respond with a single JSON object and nothing else.";

#[derive(Debug, Error)]
pub enum AiServiceError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("no AI provider is configured")]
    NotConfigured,
    #[error("{0}")]
    Validation(String),
    #[error("project not found")]
    ProjectNotFound,
    #[error("no market data matches the request")]
    NoMarketData,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ChatRequest {
    pub conversation_id: Option<Uuid>,
    pub message: String,
    pub context_project_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ChatResponse {
    pub conversation_id: Uuid,
    pub reply: ChatMessage,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct MarketAnalysisRequest {
    pub region: String,
    pub city: Option<String>,
    pub property_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct MarketInsight {
    pub summary: String,
    pub trend: String,
    #[serde(default)]
    pub opportunities: Vec<String>,
    #[serde(default)]
    pub risks: Vec<String>,
    pub recommendation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct ProjectRiskAssessment {
    pub summary: String,
    pub risk_level: String,
    #[serde(default)]
    pub risks: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct MarketAnalysis {
    pub analysis_id: Uuid,
    pub provider: String,
    pub data_points: usize,
    pub insight: MarketInsight,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ProjectAnalysis {
    pub analysis_id: Uuid,
    pub provider: String,
    pub assessment: ProjectRiskAssessment,
}

/// Stored analysis with its result parsed back into JSON
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct AiAnalysisView {
    pub id: Uuid,
    pub project_id: Option<Uuid>,
    pub analysis_type: AnalysisType,
    pub provider: String,
    pub result: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl From<AiAnalysis> for AiAnalysisView {
    fn from(analysis: AiAnalysis) -> Self {
        Self {
            result: analysis.parsed_result(),
            id: analysis.id,
            project_id: analysis.project_id,
            analysis_type: analysis.analysis_type,
            provider: analysis.provider,
            created_at: analysis.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ProvidersInfo {
    pub active: Option<String>,
    pub model: Option<String>,
    pub configured: Vec<ProviderKind>,
}

#[derive(Clone)]
pub struct AiService {
    provider: Option<Arc<dyn LlmProvider>>,
    configured: Vec<ProviderKind>,
}

impl AiService {
    pub fn new(provider: Option<Arc<dyn LlmProvider>>, configured: Vec<ProviderKind>) -> Self {
        Self {
            provider,
            configured,
        }
    }

    pub fn from_config(config: &AiConfig) -> Result<Self, LlmError> {
        let provider = llm::active_provider(config)?;
        match &provider {
            Some(p) => info!(provider = p.name(), model = p.model(), "AI provider ready"),
            None => warn!("No AI provider configured; AI endpoints will return 503"),
        }
        Ok(Self::new(provider, config.configured()))
    }

    fn provider(&self) -> Result<&dyn LlmProvider, AiServiceError> {
        self.provider
            .as_deref()
            .ok_or(AiServiceError::NotConfigured)
    }

    pub fn providers(&self) -> ProvidersInfo {
        ProvidersInfo {
            active: self.provider.as_ref().map(|p| p.name().to_string()),
            model: self.provider.as_ref().map(|p| p.model().to_string()),
            configured: self.configured.clone(),
        }
    }

    pub async fn chat(
        &self,
        pool: &SqlitePool,
        request: &ChatRequest,
    ) -> Result<ChatResponse, AiServiceError> {
        let message = request.message.trim();
        if message.is_empty() {
            return Err(AiServiceError::Validation("message is required".to_string()));
        }
        let provider = self.provider()?;

        let mut system = CHAT_SYSTEM_PROMPT.to_string();
        if let Some(project_id) = request.context_project_id {
            let project = Project::find_by_id(pool, project_id)
                .await?
                .ok_or(AiServiceError::ProjectNotFound)?;
            let tasks = Task::find_by_project_id(pool, project_id).await?;
            system.push_str("\n\nThe user is asking about this project:\n");
            system.push_str(&describe_project(&project, &tasks));
        }

        let conversation_id = request.conversation_id.unwrap_or_else(Uuid::new_v4);
        ChatMessage::create(pool, conversation_id, ChatRole::User, message, None).await?;

        let history: Vec<LlmMessage> =
            ChatMessage::find_recent(pool, conversation_id, CHAT_CONTEXT_MESSAGES)
                .await?
                .into_iter()
                .map(|m| match m.role {
                    ChatRole::User => LlmMessage::user(m.content),
                    ChatRole::Assistant => LlmMessage::assistant(m.content),
                })
                .collect();

        let answer = provider
            .complete(Some(&system), &history, DEFAULT_MAX_TOKENS)
            .await?;
        let reply = ChatMessage::create(
            pool,
            conversation_id,
            ChatRole::Assistant,
            answer.trim(),
            Some(provider.name()),
        )
        .await?;

        info!(
            conversation_id = %conversation_id,
            provider = provider.name(),
            context_messages = history.len(),
            "Chat reply generated"
        );
        Ok(ChatResponse {
            conversation_id,
            reply,
        })
    }

    pub async fn chat_history(
        pool: &SqlitePool,
        conversation_id: Uuid,
    ) -> Result<Vec<ChatMessage>, AiServiceError> {
        Ok(ChatMessage::find_by_conversation_id(pool, conversation_id).await?)
    }

    pub async fn clear_chat(pool: &SqlitePool, conversation_id: Uuid) -> Result<u64, AiServiceError> {
        Ok(ChatMessage::delete_by_conversation_id(pool, conversation_id).await?)
    }

    pub async fn market_analysis(
        &self,
        pool: &SqlitePool,
        request: &MarketAnalysisRequest,
    ) -> Result<MarketAnalysis, AiServiceError> {
        if request.region.trim().is_empty() {
            return Err(AiServiceError::Validation("region is required".to_string()));
        }
        let provider = self.provider()?;

        let filter = MarketFilter {
            region: Some(request.region.trim().to_string()),
            city: request.city.clone(),
            property_type: request.property_type.clone(),
        };
        let rows = RealEstateMarket::find(pool, &filter).await?;
        if rows.is_empty() {
            return Err(AiServiceError::NoMarketData);
        }

        let prompt = market_prompt(request, &rows);
        let insight: MarketInsight =
            llm::ask_json(provider, &prompt, Some(ANALYST_SYSTEM_PROMPT)).await?;

        let input = serde_json::to_string(&serde_json::json!({
            "request": request,
            "data_points": rows.len(),
        }))?;
        let analysis = AiAnalysis::create(
            pool,
            None,
            AnalysisType::Market,
            provider.name(),
            &input,
            &serde_json::to_string(&insight)?,
        )
        .await?;

        info!(
            analysis_id = %analysis.id,
            region = %request.region,
            data_points = rows.len(),
            "Market analysis stored"
        );
        Ok(MarketAnalysis {
            analysis_id: analysis.id,
            provider: analysis.provider,
            data_points: rows.len(),
            insight,
        })
    }

    pub async fn project_analysis(
        &self,
        pool: &SqlitePool,
        project_id: Uuid,
    ) -> Result<ProjectAnalysis, AiServiceError> {
        let provider = self.provider()?;
        let project = Project::find_by_id(pool, project_id)
            .await?
            .ok_or(AiServiceError::ProjectNotFound)?;
        let tasks = Task::find_by_project_id(pool, project_id).await?;
        let overdue = Task::find_overdue(pool, Utc::now().date_naive(), Some(project_id)).await?;
        let estimation = ProjectEstimation::find_latest_by_project_id(pool, project_id).await?;

        let prompt = project_prompt(&project, &tasks, overdue.len(), estimation.as_ref());
        let assessment: ProjectRiskAssessment =
            llm::ask_json(provider, &prompt, Some(ANALYST_SYSTEM_PROMPT)).await?;

        let input = serde_json::to_string(&serde_json::json!({
            "project_id": project_id,
            "tasks": tasks.len(),
            "overdue_tasks": overdue.len(),
            "estimation_id": estimation.as_ref().map(|e| e.id),
        }))?;
        let analysis = AiAnalysis::create(
            pool,
            Some(project_id),
            AnalysisType::ProjectRisk,
            provider.name(),
            &input,
            &serde_json::to_string(&assessment)?,
        )
        .await?;

        info!(
            analysis_id = %analysis.id,
            project_id = %project_id,
            risk_level = %assessment.risk_level,
            "Project analysis stored"
        );
        Ok(ProjectAnalysis {
            analysis_id: analysis.id,
            provider: analysis.provider,
            assessment,
        })
    }

    pub async fn list_analyses(
        pool: &SqlitePool,
        project_id: Option<Uuid>,
    ) -> Result<Vec<AiAnalysisView>, AiServiceError> {
        Ok(AiAnalysis::find_recent(pool, project_id, DEFAULT_ANALYSES_LIMIT)
            .await?
            .into_iter()
            .map(AiAnalysisView::from)
            .collect())
    }
}

fn describe_project(project: &Project, tasks: &[Task]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "- {} ({}, {}), status {}, progress {}%",
        project.name, project.category, project.location.as_deref().unwrap_or("no location"),
        project.status, project.progress
    );
    let _ = writeln!(
        out,
        "- budget {:.2}, spent {:.2}",
        project.budget, project.spent
    );
    if let (Some(start), Some(end)) = (project.start_date, project.end_date) {
        let _ = writeln!(out, "- schedule {start} to {end}");
    }
    let _ = writeln!(out, "- {} tasks:", tasks.len());
    for task in tasks {
        let _ = writeln!(
            out,
            "  - {} [{}, {} priority, {}%]{}",
            task.title,
            task.status,
            task.priority,
            task.progress,
            task.due_date
                .map(|d| format!(" due {d}"))
                .unwrap_or_default()
        );
    }
    out
}

fn market_prompt(request: &MarketAnalysisRequest, rows: &[RealEstateMarket]) -> String {
    let mut prompt = format!("Analyse the real-estate market for region '{}'", request.region);
    if let Some(city) = &request.city {
        let _ = write!(prompt, ", city '{city}'");
    }
    if let Some(property_type) = &request.property_type {
        let _ = write!(prompt, ", property type '{property_type}'");
    }
    prompt.push_str(".\n\nObservations (most recent first):\n");
    for row in rows {
        let _ = writeln!(
            prompt,
            "- {} {} {}: {:.2}/m², rent {}, growth {}, yield {}",
            row.recorded_on,
            row.city,
            row.property_type,
            row.avg_price_per_sqm,
            row.avg_rent_per_sqm
                .map(|r| format!("{r:.2}/m²"))
                .unwrap_or_else(|| "n/a".to_string()),
            row.growth_rate_percent
                .map(|g| format!("{g:.1}%"))
                .unwrap_or_else(|| "n/a".to_string()),
            row.rental_yield_percent()
                .map(|y| format!("{y:.1}%"))
                .unwrap_or_else(|| "n/a".to_string()),
        );
    }
    prompt.push_str(
        "\nReturn JSON with keys: summary (string), trend (one of rising, stable, declining), \
opportunities (array of strings), risks (array of strings), recommendation (string).",
    );
    prompt
}

fn project_prompt(
    project: &Project,
    tasks: &[Task],
    overdue: usize,
    estimation: Option<&ProjectEstimation>,
) -> String {
    let mut prompt = String::from("Assess the delivery risk of this construction project.\n\n");
    prompt.push_str(&describe_project(project, tasks));
    let _ = writeln!(prompt, "- {overdue} overdue tasks");
    if let Some(estimation) = estimation {
        let _ = writeln!(
            prompt,
            "- latest material estimation: {:.2} for {:.1} m² ({} quality)",
            estimation.total_cost, estimation.area_sqm, estimation.quality
        );
    }
    prompt.push_str(
        "\nReturn JSON with keys: summary (string), risk_level (one of low, medium, high), \
risks (array of strings), recommendations (array of strings).",
    );
    prompt
}
