//! Agent module - orchestration of planning and execution
//!
//! Contains the agent that coordinates the LLM, the plan parser and the
//! execution monitor.

pub mod orchestrator;

pub use orchestrator::Agent;
