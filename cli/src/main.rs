use anyhow::Result;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use zephyr_core::{AgentLoop, Config, config, providers, server, tools};

mod chat;
mod onboard;

#[derive(Parser)]
#[command(name = "zephyr")]
#[command(about = "zephyr - academic and web research agent", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactively write ~/.zephyr/config.toml
    Onboard,
    /// Run the HTTP API
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Answer a single question in-process
    Ask { question: String },
    /// Interactive chat against the HTTP API
    Chat {
        #[arg(long, env = "API_URL", default_value = chat::DEFAULT_API_URL)]
        api_url: String,
        /// Run the agent in this process instead of calling the API
        #[arg(long)]
        local: bool,
    },
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "zephyr_core=info,zephyr_cli=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn build_agent(config: &Config) -> Result<Arc<AgentLoop>> {
    config.validate()?;
    info!(
        provider = config.provider.as_deref().unwrap_or("huggingface"),
        model = %config.model,
        max_iterations = config.max_iterations,
        "building research agent"
    );
    let provider = providers::create_provider(config)?;
    let registry = Arc::new(tools::research_registry(&config.tools));
    Ok(Arc::new(AgentLoop::from_config(config, provider, registry)))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let command = cli.command.unwrap_or_else(|| {
        if !config::config_exists() {
            Commands::Onboard
        } else {
            Commands::Chat {
                api_url: std::env::var("API_URL")
                    .unwrap_or_else(|_| chat::DEFAULT_API_URL.to_string()),
                local: false,
            }
        }
    });

    match command {
        Commands::Onboard => {
            let onboard_config = onboard::run_onboard().map_err(|e| {
                eprintln!("❌ Onboarding failed: {}", e);
                anyhow::anyhow!("Onboarding failed: {}", e)
            })?;
            config::save_config(&onboard_config)?;
        }
        Commands::Serve { host, port } => {
            let mut config = Config::load()?;
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }

            let agent = build_agent(&config)?;
            server::serve(agent, &config.server.address()).await?;
        }
        Commands::Ask { question } => {
            let config = Config::load()?;
            let agent = build_agent(&config)?;

            println!("\n🤔 Researching...\n");
            let run = agent.run(&question).await.map_err(|e| {
                eprintln!("❌ Error: {:#}", e);
                e
            })?;
            termimad::print_text(&run.output);
        }
        Commands::Chat { api_url, local } => {
            let backend = if local {
                let config = Config::load()?;
                chat::Backend::Local(build_agent(&config)?)
            } else {
                chat::Backend::remote(api_url)
            };
            chat::run(backend).await?;
        }
    }

    Ok(())
}
