use anyhow::Result;
use console::style;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use termimad::MadSkin;
use zephyr_core::agent::AgentLoop;
use zephyr_core::config::get_zephyr_dir;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000/ask";
const EMPTY_OUTPUT: &str = "Backend reached, but output is empty.";

/// Where questions go: the HTTP service, or an agent running in this process.
pub enum Backend {
    Remote {
        client: reqwest::Client,
        api_url: String,
    },
    Local(Arc<AgentLoop>),
}

impl Backend {
    pub fn remote(api_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .unwrap_or_default();
        Self::Remote {
            client,
            api_url: api_url.into(),
        }
    }

    /// Always yields something to show; failures become readable messages.
    pub async fn ask(&self, question: &str) -> String {
        match self {
            Self::Remote { client, api_url } => {
                let response = client
                    .post(api_url)
                    .json(&json!({ "input": question }))
                    .send()
                    .await;

                match response {
                    Ok(response) => {
                        let status = response.status();
                        let body = response.text().await.unwrap_or_default();
                        interpret_response(status.as_u16(), &body)
                    }
                    Err(e) => format!("Connection Error: {e}"),
                }
            }
            Self::Local(agent) => match agent.process(question).await {
                Ok(output) if output.trim().is_empty() => EMPTY_OUTPUT.to_string(),
                Ok(output) => output,
                Err(e) => format!("Agent Error: {e:#}"),
            },
        }
    }
}

pub fn interpret_response(status: u16, body: &str) -> String {
    if status != 200 {
        return format!("API Error: {status}");
    }

    let output = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("output").and_then(|o| o.as_str()).map(String::from))
        .unwrap_or_default();

    if output.is_empty() {
        EMPTY_OUTPUT.to_string()
    } else {
        output
    }
}

struct Turn {
    role: &'static str,
    content: String,
}

fn render_turn(skin: &MadSkin, turn: &Turn) {
    let label = if turn.role == "user" {
        style("you").cyan().bold()
    } else {
        style("zephyr").green().bold()
    };
    println!("{label}");
    skin.print_text(&turn.content);
    println!();
}

pub async fn run(backend: Backend) -> Result<()> {
    let skin = MadSkin::default();
    let mut editor = DefaultEditor::new()?;
    let history_path = get_zephyr_dir().join("chat_history.txt");
    let _ = editor.load_history(&history_path);

    let mut transcript: Vec<Turn> = Vec::new();

    println!("{}", style("Academic Search Assistant").cyan().bold());
    println!(
        "{}",
        style("Ask a question (example: 'Search arxiv for Deep Learning'). Type /history to review, exit to quit.").dim()
    );
    println!();

    loop {
        let line = match editor.readline(">> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };

        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        let _ = editor.add_history_entry(input);

        match input {
            "exit" | "quit" => break,
            "/history" => {
                if transcript.is_empty() {
                    println!("{}", style("No messages yet.").dim());
                }
                for turn in &transcript {
                    render_turn(&skin, turn);
                }
                continue;
            }
            _ => {}
        }

        transcript.push(Turn {
            role: "user",
            content: input.to_string(),
        });

        println!("{}", style("Agent is thinking...").dim());
        let answer = backend.ask(input).await;

        let turn = Turn {
            role: "assistant",
            content: answer,
        };
        render_turn(&skin, &turn);
        transcript.push(turn);
    }

    if let Some(parent) = history_path.parent()
        && parent.exists()
    {
        let _ = editor.save_history(&history_path);
    }
    println!("Goodbye!");
    Ok(())
}
