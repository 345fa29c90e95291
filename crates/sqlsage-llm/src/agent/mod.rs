//! Tool-calling agent

mod executor;
mod tool;
mod trace;

pub use executor::{AgentConfig, AgentExecutor, MAX_ITERATIONS_OUTPUT};
pub use tool::{string_arg, Tool};
pub use trace::{
    AgentAction, AgentOutput, AgentStep, ERROR_OBSERVATION_PREFIX, QUERY_TOOL_NAME,
};
