use super::{Tool, ToolResult};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};

/// Canned forecast; asks for a location when none is given.
pub struct WeatherTool;

#[async_trait]
impl Tool for WeatherTool {
    fn name(&self) -> &str {
        "previsao_tempo"
    }

    fn description(&self) -> &str {
        "Previsão do tempo para uma localização (parâmetro 'location')"
    }

    async fn execute(&self, params: Value) -> Result<ToolResult> {
        let location = params
            .get("location")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|l| !l.is_empty());

        let Some(location) = location else {
            return Ok(ToolResult::failed(
                "Por favor, informe a localização para a previsão do tempo.",
            ));
        };

        Ok(ToolResult {
            success: true,
            result: format!(
                "A previsão do tempo para {} é: céu parcialmente nublado, 25°C.",
                location
            ),
            metadata: Some(json!({ "location": location })),
        })
    }
}
