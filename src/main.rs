use anyhow::Result;
use clap::{Parser, Subcommand};
use serde_json::{Map, Value};
use std::io::{self, Write};
use tracing::info;

use jarvis::agent::ResponseResolver;
use jarvis::config::Config;
use jarvis::InputError;

#[derive(Parser)]
#[command(name = "jarvis")]
#[command(about = "Conversational assistant backed by a local knowledge base")]
struct Args {
    #[arg(help = "Message to send to Jarvis")]
    prompt: Option<String>,

    #[arg(short, long, help = "Run an interactive session")]
    interactive: bool,

    #[arg(short, long, help = "Verbose output")]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Session history management
    Memory {
        #[command(subcommand)]
        command: MemoryCommands,
    },
    /// Knowledge base administration
    Intent {
        #[command(subcommand)]
        command: IntentCommands,
    },
    /// Show the classifier's distribution for a text
    Predict { text: String },
}

#[derive(Subcommand)]
enum MemoryCommands {
    /// Number of stored interactions
    Size,
    /// Delete the stored history
    Clear,
}

#[derive(Subcommand)]
enum IntentCommands {
    /// Add a new intent and save the knowledge base
    Add {
        name: String,
        #[arg(short, long = "pattern", required = true)]
        patterns: Vec<String>,
        #[arg(short, long = "response", required = true)]
        responses: Vec<String>,
    },
    /// List known intents
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    if let Some(env_path) = jarvis::utils::user_env_file() {
        dotenv::from_path(env_path).ok();
    }

    let args = Args::parse();
    let config = Config::load()?;

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(if args.verbose {
            tracing::Level::DEBUG
        } else {
            config.log_level()
        })
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting Jarvis...");
    let resolver = ResponseResolver::from_config(&config).await?;

    match args.command {
        Some(Commands::Memory { command }) => {
            match command {
                MemoryCommands::Size => {
                    println!("🧠 {} interactions stored", resolver.history_size().await);
                }
                MemoryCommands::Clear => {
                    if resolver.clear_history().await {
                        println!("✅ History cleared");
                    } else {
                        println!("❌ Could not clear history (store unavailable)");
                    }
                }
            }
            return Ok(());
        }
        Some(Commands::Intent { command }) => {
            match command {
                IntentCommands::Add {
                    name,
                    patterns,
                    responses,
                } => {
                    if resolver.knowledge().add_intent(&name, &patterns, &responses) {
                        let path = resolver.persist_knowledge()?;
                        println!("✅ Intent '{}' added and saved to {}", name, path.display());
                    } else {
                        println!("❌ Intent '{}' already exists", name);
                    }
                }
                IntentCommands::List => {
                    for (name, intent) in resolver.knowledge().intents() {
                        println!(
                            "• {} ({} patterns, {} responses)",
                            name,
                            intent.patterns.len(),
                            intent.responses.len()
                        );
                    }
                }
            }
            return Ok(());
        }
        Some(Commands::Predict { text }) => {
            if !resolver.classifier().is_ready() {
                println!("❌ Intent model not loaded");
            }
            for prediction in resolver.predict_all(&text) {
                println!("{}", prediction);
            }
            return Ok(());
        }
        None => {}
    }

    match args.prompt {
        Some(prompt) if !args.interactive => run_single_query(&resolver, &prompt).await,
        _ => run_interactive_mode(&resolver).await,
    }
}

async fn run_single_query(resolver: &ResponseResolver, prompt: &str) -> Result<()> {
    match resolver.respond(prompt).await {
        Ok(response) => println!("🤖 Jarvis: {}", response),
        Err(e) => println!("❌ {}", e),
    }
    Ok(())
}

async fn run_interactive_mode(resolver: &ResponseResolver) -> Result<()> {
    println!("\n🤖 Jarvis");
    println!("════════════════════════");
    println!("💡 Digite sua mensagem. Comandos especiais:");
    println!("   • 'sair', 'exit' ou 'quit' - Encerrar");
    println!("   • 'ajuda' - Listar comandos");
    println!("   • 'limpar' - Limpar a tela");
    println!("   • '/cmd <nome> [chave=valor...]' - Executar um comando");
    println!("═══════════════════════════════════════");

    loop {
        print!("\n💬 Você: ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let query = input.trim();

        match query.to_lowercase().as_str() {
            "sair" | "exit" | "quit" => {
                println!("\n👋 Até logo!");
                break;
            }
            "ajuda" => {
                println!("{}", resolver.run_side_command("ajuda", Value::Null).await);
                continue;
            }
            "limpar" => {
                print!("\x1B[2J\x1B[1;1H");
                io::stdout().flush()?;
                continue;
            }
            _ => {}
        }

        if let Some(rest) = query.strip_prefix("/cmd") {
            let (name, params) = parse_command(rest);
            if name.is_empty() {
                println!("💭 Uso: /cmd <nome> [chave=valor...]");
            } else {
                println!("🔧 {}", resolver.run_side_command(&name, params).await);
            }
            continue;
        }

        match resolver.respond(query).await {
            Ok(response) => println!("🤖 Jarvis: {}", response),
            Err(InputError::Empty) => println!("💭 Digite uma mensagem ou 'ajuda'."),
            Err(e) => println!("❌ {}", e),
        }
    }

    Ok(())
}

/// Split `name key=value ...` into the command name and a JSON object.
fn parse_command(line: &str) -> (String, Value) {
    let mut parts = line.split_whitespace();
    let name = parts.next().unwrap_or_default().to_string();
    let params: Map<String, Value> = parts
        .filter_map(|part| part.split_once('='))
        .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
        .collect();
    (name, Value::Object(params))
}
