pub mod collection_name;
pub mod config;
pub mod embedding;
pub mod prompts;
