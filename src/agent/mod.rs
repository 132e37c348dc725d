//! ReAct research agent.

pub mod executor;
pub mod parser;

pub use executor::{AgentExecutor, AgentOutcome, AgentStep};
pub use parser::{parse_decision, AgentDecision};
