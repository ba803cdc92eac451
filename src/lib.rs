pub mod carbon_pipeline;
pub mod logger;
