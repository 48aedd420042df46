//! mcp-chat binary entry point: a line-oriented chat REPL.

use std::io::Write;
use std::process::ExitCode;

use mcp_chat::app::ChatApp;
use mcp_chat::cli::Cli;
use mcp_chat::config::AppConfig;
use mcp_chat::types::{Role, Turn};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const HELP: &str = "Commands: /reset clears the conversation, /disconnect closes all MCP \
                    connections, /connect starts a fresh session, /quit exits. Anything else \
                    is sent to the agent.";

enum Input {
    Line(String),
    Eof,
    Interrupt,
}

fn main() -> ExitCode {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact(),
        )
        .init();

    match run(Cli::parse_args()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = cli.apply(AppConfig::from_env());
    let credentials = cli.credentials(&config)?;
    let entries = cli.server_entries()?;

    let mut app = ChatApp::openai(&config, cli.model_settings(&config));
    let status = app.initialize(&credentials, &entries)?;
    println!("{status}");
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        let _ = std::io::stdout().flush();

        let input = match app.bridge().run(read_input(&mut lines)) {
            Ok(input) => input,
            Err(e) => {
                eprintln!("Error: {e}");
                break;
            }
        };

        let line = match input {
            Input::Line(line) => line,
            Input::Eof => break,
            Input::Interrupt => {
                println!("\nReceived interrupt signal. Cleaning up...");
                break;
            }
        };

        match line.trim() {
            "" => continue,
            "/quit" | "/exit" => break,
            "/help" => println!("{HELP}"),
            "/reset" => println!("{}", app.reset_status()),
            "/disconnect" => match app.disconnect() {
                Ok(message) | Err(message) => println!("{message}"),
            },
            "/connect" => match app.initialize(&credentials, &entries) {
                Ok(message) | Err(message) => println!("{message}"),
            },
            message => match app.send_message(message) {
                Ok(transcript) => print_reply(&transcript),
                Err(error) => eprintln!("{error}"),
            },
        }
    }

    app.shutdown();
    Ok(())
}

async fn read_input(lines: &mut Lines<BufReader<Stdin>>) -> Input {
    tokio::select! {
        line = lines.next_line() => match line {
            Ok(Some(line)) => Input::Line(line),
            Ok(None) => Input::Eof,
            Err(error) => {
                tracing::warn!(%error, "failed to read stdin");
                Input::Eof
            }
        },
        _ = tokio::signal::ctrl_c() => Input::Interrupt,
    }
}

fn print_reply(transcript: &[Turn]) {
    if let Some(turn) = transcript.iter().rev().find(|t| t.role == Role::Assistant) {
        println!("{}", turn.content);
    }
}
