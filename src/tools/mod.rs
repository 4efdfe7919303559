//! Side commands: a small plugin registry outside the response cascade.

pub mod clock;
pub mod fun;
pub mod manager;
pub mod weather;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,
    pub result: String,
    pub metadata: Option<Value>,
}

impl ToolResult {
    pub fn ok(result: impl Into<String>) -> Self {
        Self {
            success: true,
            result: result.into(),
            metadata: None,
        }
    }

    pub fn failed(result: impl Into<String>) -> Self {
        Self {
            success: false,
            result: result.into(),
            metadata: None,
        }
    }
}

#[async_trait]
pub trait Tool: Send + Sync {
    /// Command name the registry dispatches on.
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    async fn execute(&self, params: Value) -> Result<ToolResult>;
}

pub use clock::{DateTimeTool, TimeTool};
pub use fun::{GreetingTool, JokeTool};
pub use manager::{ToolManager, HELP_COMMAND};
pub use weather::WeatherTool;
