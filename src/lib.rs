//! Drive a code-interpreter assistant over the OpenAI Assistants API:
//! upload a file, ask a question about it, wait for the run to finish and
//! download the files the assistant generated.

pub mod client;
pub mod config;
pub mod workflow;

pub use client::OpenAIClient;
pub use config::WorkflowConfig;
pub use workflow::Workflow;
