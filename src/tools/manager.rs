use super::{DateTimeTool, GreetingTool, JokeTool, TimeTool, Tool, WeatherTool};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Built into the registry; lists every available command.
pub const HELP_COMMAND: &str = "ajuda";

/// Name-keyed registry of side commands.
pub struct ToolManager {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolManager {
    /// Registry with the built-in commands.
    pub fn new() -> Self {
        let mut manager = Self::empty();
        manager.register(Arc::new(DateTimeTool));
        manager.register(Arc::new(TimeTool));
        manager.register(Arc::new(JokeTool::new()));
        manager.register(Arc::new(WeatherTool));
        manager.register(Arc::new(GreetingTool));
        manager
    }

    pub fn empty() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    /// Add or replace a command under its own name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        debug!("Registering command '{}'", tool.name());
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Sorted command names, the help command included.
    pub fn available_commands(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.push(HELP_COMMAND.to_string());
        names.sort();
        names
    }

    pub fn help_text(&self) -> String {
        format!("Comandos disponíveis: {}", self.available_commands().join(", "))
    }

    /// Run `command` with `params`. Always yields a user-facing string.
    pub async fn run_command(&self, command: &str, params: Value) -> String {
        if command == HELP_COMMAND {
            return self.help_text();
        }

        let Some(tool) = self.tools.get(command) else {
            warn!("Unknown command requested: {}", command);
            return format!(
                "Ops! Comando '{}' desconhecido. Use '{}' para ver os comandos disponíveis. {}",
                command,
                HELP_COMMAND,
                self.help_text()
            );
        };

        info!("🔧 Executing command: {}", command);
        debug!("Command params: {}", params);
        match tool.execute(params).await {
            Ok(result) => result.result,
            Err(e) => {
                warn!("Command '{}' failed: {:#}", command, e);
                format!("Não foi possível executar '{}': {}", command, e)
            }
        }
    }
}

impl Default for ToolManager {
    fn default() -> Self {
        Self::new()
    }
}
