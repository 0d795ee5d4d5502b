use anyhow::{Context, Result};
use console::style;
use dialoguer::{Input, Password, Select};
use zephyr_core::config::{Config, DEFAULT_MODEL, get_config_path};

const BANNER: &str = r"
    -------------------------------------
     z e p h y r   research agent
    -------------------------------------
";

const PROVIDERS: [(&str, &str); 2] = [
    ("huggingface", "Hugging Face Inference (Mistral-7B-Instruct)"),
    ("openai", "OpenAI-compatible chat completions"),
];

fn print_step(step: usize, total: usize, title: &str) {
    println!();
    println!(
        "{}",
        style(format!("[{}/{}] {}", step, total, title))
            .cyan()
            .bold()
    );
    println!();
}

fn setup_provider() -> Result<&'static str> {
    let labels: Vec<&str> = PROVIDERS.iter().map(|(_, label)| *label).collect();

    let selection = Select::new()
        .with_prompt("Select your model provider")
        .items(&labels)
        .default(0)
        .interact()
        .context("Failed to select provider")?;

    Ok(PROVIDERS[selection].0)
}

fn setup_api_key(provider: &str) -> Result<String> {
    let prompt = match provider {
        "huggingface" => "Enter your Hugging Face token (HUGGINGFACEHUB_API_TOKEN)",
        _ => "Enter your API key",
    };

    let api_key = Password::new()
        .with_prompt(prompt)
        .interact()
        .context("Failed to read API key")?;

    if api_key.trim().is_empty() {
        return Err(anyhow::anyhow!("API key cannot be empty"));
    }

    Ok(api_key.trim().to_string())
}

fn setup_model(provider: &str) -> Result<String> {
    let default = match provider {
        "huggingface" => DEFAULT_MODEL,
        _ => "gpt-4o-mini",
    };

    Input::new()
        .with_prompt("Model")
        .default(default.to_string())
        .interact_text()
        .context("Failed to read model")
}

fn setup_tavily_key() -> Result<Option<String>> {
    let key: String = Input::new()
        .with_prompt("Tavily API key (optional, leave empty to skip)")
        .allow_empty(true)
        .interact_text()
        .context("Failed to read Tavily API key")?;

    let key = key.trim();
    Ok((!key.is_empty()).then(|| key.to_string()))
}

pub fn run_onboard() -> Result<Config> {
    println!("{}", style(BANNER).cyan().bold());

    println!("  {}", style("Welcome to Zephyr!").white().bold());
    println!(
        "  {}",
        style("This wizard writes the configuration for the research agent.").dim()
    );
    println!();

    print_step(1, 4, "Provider");
    let provider = setup_provider()?;

    print_step(2, 4, "API Key");
    let api_key = setup_api_key(provider)?;

    print_step(3, 4, "Model");
    let model = setup_model(provider)?;

    print_step(4, 4, "Search Tools");
    let tavily_api_key = setup_tavily_key()?;
    if tavily_api_key.is_none() {
        println!(
            "  {} Tavily tools will report a missing key; arXiv and DuckDuckGo still work.",
            style("!").yellow()
        );
    }

    let mut config = Config {
        provider: Some(provider.to_string()),
        api_key,
        model,
        ..Default::default()
    };
    config.tools.tavily_api_key = tavily_api_key;

    println!();
    println!("  {} Configuration complete!", style("✓").green().bold());
    println!(
        "  {} Config saved to {}",
        style("→").green(),
        style(get_config_path().display()).cyan()
    );
    println!();
    println!(
        "  {} Start the API with {} and talk to it with {}",
        style("→").green(),
        style("zephyr serve").cyan().bold(),
        style("zephyr chat").cyan().bold()
    );
    println!();

    Ok(config)
}
