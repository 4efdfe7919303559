use super::{Tool, ToolResult};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde_json::Value;
use std::sync::Mutex;

const JOKES: &[&str] = &[
    "Por que o computador foi ao médico? Porque estava com um vírus!",
    "Qual é o computador favorito dos matemáticos? O Excel!",
    "Por que o programador confunde Halloween com Natal? Porque OCT 31 == DEC 25.",
    "O que é que um bit disse para o outro? Você me completa.",
];

pub struct JokeTool {
    rng: Mutex<StdRng>,
}

impl JokeTool {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    pub fn with_rng(rng: StdRng) -> Self {
        Self {
            rng: Mutex::new(rng),
        }
    }

    pub fn jokes() -> &'static [&'static str] {
        JOKES
    }
}

impl Default for JokeTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for JokeTool {
    fn name(&self) -> &str {
        "piada"
    }

    fn description(&self) -> &str {
        "Conta uma piada"
    }

    async fn execute(&self, _params: Value) -> Result<ToolResult> {
        let joke = {
            let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
            JOKES.choose(&mut *rng).copied()
        };
        joke.map(ToolResult::ok)
            .ok_or_else(|| anyhow!("no jokes available"))
    }
}

pub struct GreetingTool;

#[async_trait]
impl Tool for GreetingTool {
    fn name(&self) -> &str {
        "saudacao"
    }

    fn description(&self) -> &str {
        "Cumprimenta o usuário"
    }

    async fn execute(&self, _params: Value) -> Result<ToolResult> {
        Ok(ToolResult::ok("Olá! Como posso ajudar você hoje?"))
    }
}
