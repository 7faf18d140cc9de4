use db::DBService;
use services::services::{
    ai::AiService, config::Config, llm::LlmError, report::ReportService,
};

/// Shared application state handed to every route
#[derive(Clone)]
pub struct Deployment {
    db: DBService,
    ai: AiService,
    reports: ReportService,
}

impl Deployment {
    pub fn new(db: DBService, ai: AiService, reports: ReportService) -> Self {
        Self { db, ai, reports }
    }

    pub fn from_config(db: DBService, config: &Config) -> Result<Self, LlmError> {
        let ai = AiService::from_config(&config.ai)?;
        let reports = ReportService::new(config.reports_dir.clone());
        Ok(Self::new(db, ai, reports))
    }

    pub fn db(&self) -> &DBService {
        &self.db
    }

    pub fn ai(&self) -> &AiService {
        &self.ai
    }

    pub fn reports(&self) -> &ReportService {
        &self.reports
    }
}
