pub mod activity_log;
pub mod ai_analysis;
pub mod chat_message;
pub mod estimation;
pub mod market;
pub mod material;
pub mod notification;
pub mod project;
pub mod resource;
pub mod task;
pub mod user;
