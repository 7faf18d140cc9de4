use std::{env, fs, path::Path};

use ts_rs::TS;

fn generate_types_content() -> String {
    let header = "// This file was generated by `crates/server/src/bin/generate_types.rs`.\n\n// Do not edit this file manually.\n\n";

    let decls: Vec<String> = vec![
        utils::response::ApiResponse::<()>::decl(),
        db::models::user::UserRole::decl(),
        db::models::user::User::decl(),
        db::models::user::CreateUser::decl(),
        db::models::project::ProjectStatus::decl(),
        db::models::project::ProjectCategory::decl(),
        db::models::project::Project::decl(),
        db::models::project::CreateProject::decl(),
        db::models::project::UpdateProject::decl(),
        db::models::project::StatusCount::decl(),
        db::models::task::TaskStatus::decl(),
        db::models::task::TaskPriority::decl(),
        db::models::task::Task::decl(),
        db::models::task::CreateTask::decl(),
        db::models::task::UpdateTask::decl(),
        db::models::resource::ResourceType::decl(),
        db::models::resource::Resource::decl(),
        db::models::resource::CreateResource::decl(),
        db::models::resource::UpdateResource::decl(),
        db::models::resource::TaskResource::decl(),
        db::models::resource::AssignResource::decl(),
        db::models::resource::AllocatedResource::decl(),
        db::models::material::Material::decl(),
        db::models::material::CreateMaterial::decl(),
        db::models::material::UpdateMaterial::decl(),
        db::models::material::MaterialPriceHistory::decl(),
        db::models::material::MaterialCategorySummary::decl(),
        db::models::market::RealEstateMarket::decl(),
        db::models::market::CreateRealEstateMarket::decl(),
        db::models::market::MarketFilter::decl(),
        db::models::estimation::QualityLevel::decl(),
        db::models::estimation::MaterialGroup::decl(),
        db::models::estimation::PriceSource::decl(),
        db::models::estimation::EstimationRequest::decl(),
        db::models::estimation::EstimationLineItem::decl(),
        db::models::estimation::CategoryEstimate::decl(),
        db::models::estimation::EstimationResult::decl(),
        db::models::estimation::EstimationPreset::decl(),
        db::models::estimation::CreateEstimationPreset::decl(),
        db::models::estimation::ProjectEstimation::decl(),
        db::models::estimation::ProjectEstimationWithBreakdown::decl(),
        db::models::activity_log::EntityType::decl(),
        db::models::activity_log::ActivityAction::decl(),
        db::models::activity_log::ActivityLog::decl(),
        db::models::ai_analysis::AnalysisType::decl(),
        db::models::notification::NotificationKind::decl(),
        db::models::notification::Notification::decl(),
        db::models::chat_message::ChatRole::decl(),
        db::models::chat_message::ChatMessage::decl(),
        services::services::config::ProviderKind::decl(),
        services::services::project::DashboardStats::decl(),
        services::services::report::ReportFormat::decl(),
        services::services::report::TaskStatusSummary::decl(),
        services::services::report::ProjectReport::decl(),
        services::services::report::ExportedReport::decl(),
        services::services::report::MaterialsReport::decl(),
        services::services::ai::ChatRequest::decl(),
        services::services::ai::ChatResponse::decl(),
        services::services::ai::MarketAnalysisRequest::decl(),
        services::services::ai::MarketInsight::decl(),
        services::services::ai::MarketAnalysis::decl(),
        services::services::ai::ProjectRiskAssessment::decl(),
        services::services::ai::ProjectAnalysis::decl(),
        services::services::ai::AiAnalysisView::decl(),
        services::services::ai::ProvidersInfo::decl(),
        server::routes::health::HealthStatus::decl(),
        server::routes::tasks::UpdateTaskStatus::decl(),
        server::routes::estimation::ApplyPresetRequest::decl(),
        server::routes::reports::ExportReportRequest::decl(),
        server::routes::notifications::ReadAllResponse::decl(),
    ];

    let body = decls
        .into_iter()
        .map(|d| {
            let trimmed = d.trim_start();
            if trimmed.starts_with("export") {
                d
            } else {
                format!("export {trimmed}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!("{header}{body}\n")
}

fn main() {
    let check_mode = env::args().any(|arg| arg == "--check");

    let shared_path = Path::new("shared");
    let types_path = shared_path.join("types.ts");
    let generated = generate_types_content();

    if check_mode {
        let current = fs::read_to_string(&types_path).unwrap_or_default();
        if current == generated {
            println!("✅ shared/types.ts is up to date.");
            std::process::exit(0);
        } else {
            eprintln!("❌ shared/types.ts is not up to date. Please run 'cargo run --bin generate_types' and commit the changes.");
            std::process::exit(1);
        }
    }

    println!("Generating TypeScript types…");
    if let Err(e) = fs::create_dir_all(shared_path).and_then(|_| fs::write(&types_path, generated)) {
        eprintln!("Failed to write {}: {}", types_path.display(), e);
        std::process::exit(1);
    }
    println!("✅ TypeScript types generated in shared/");
}
