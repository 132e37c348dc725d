pub mod agent;
pub mod core;
pub mod ingest;
pub mod llm;
pub mod logging;
pub mod prompts;
pub mod rag;
pub mod server;
pub mod state;
pub mod tools;
