pub mod activity;
pub mod ai;
pub mod claude_api;
pub mod config;
pub mod database_validator;
pub mod estimation;
pub mod llm;
pub mod material;
pub mod notification;
pub mod ollama_api;
pub mod openai_api;
pub mod project;
pub mod report;
pub mod user;
