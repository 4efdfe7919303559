use super::{Tool, ToolResult};
use anyhow::Result;
use async_trait::async_trait;
use chrono::Local;
use serde_json::{json, Value};

pub struct DateTimeTool;

#[async_trait]
impl Tool for DateTimeTool {
    fn name(&self) -> &str {
        "data_atual"
    }

    fn description(&self) -> &str {
        "Data e hora atuais (dd/mm/aaaa hh:mm:ss)"
    }

    async fn execute(&self, _params: Value) -> Result<ToolResult> {
        let now = Local::now();
        Ok(ToolResult {
            success: true,
            result: now.format("%d/%m/%Y %H:%M:%S").to_string(),
            metadata: Some(json!({ "iso": now.to_rfc3339(), "timestamp": now.timestamp() })),
        })
    }
}

pub struct TimeTool;

#[async_trait]
impl Tool for TimeTool {
    fn name(&self) -> &str {
        "hora"
    }

    fn description(&self) -> &str {
        "Hora atual (hh:mm:ss)"
    }

    async fn execute(&self, _params: Value) -> Result<ToolResult> {
        Ok(ToolResult::ok(Local::now().format("%H:%M:%S").to_string()))
    }
}
