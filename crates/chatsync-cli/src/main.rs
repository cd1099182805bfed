mod repl;

use std::time::Duration;

use chatsync_core::SessionConfig;
use chatsync_http::{HttpClient, HttpConfig};
use chatsync_proto::{DEFAULT_CHAT_MODEL, Visibility, chat_models, find_model};
use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "chatsync", about = "Chat with a streaming backend from the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Base URL of the chat backend.
    #[arg(
        long,
        global = true,
        env = "CHATSYNC_BASE_URL",
        default_value = "http://localhost:3000"
    )]
    base_url: String,

    /// Session cookie sent with every request, e.g. `authjs.session-token=...`.
    #[arg(long, global = true, env = "CHATSYNC_SESSION_COOKIE", hide_env_values = true)]
    session_cookie: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Open a conversation and chat line by line.
    Chat(ChatArgs),
    /// Print the locally cached messages of a conversation as JSON.
    Cache {
        conversation_id: String,
    },
    /// List the selectable chat models.
    Models,
}

#[derive(Args)]
struct ChatArgs {
    /// Conversation to open. A new one is started when omitted.
    #[arg(long)]
    conversation: Option<String>,

    #[arg(long, env = "CHATSYNC_MODEL", default_value = DEFAULT_CHAT_MODEL)]
    model: String,

    #[arg(long, default_value = "private")]
    visibility: Visibility,

    /// Do not attach to a response that is still being generated.
    #[arg(long)]
    no_resume: bool,

    /// Send this message as soon as the conversation is open.
    #[arg(long)]
    query: Option<String>,

    /// Give up on a response after this many seconds without an event.
    #[arg(long, env = "CHATSYNC_STREAM_TIMEOUT_SECS")]
    stream_timeout_secs: Option<u64>,
}

impl ChatArgs {
    fn session_config(&self) -> SessionConfig {
        SessionConfig {
            model_id: self.model.clone(),
            visibility: self.visibility,
            stream_timeout: self.stream_timeout_secs.map(Duration::from_secs),
            ..Default::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let http = HttpClient::new(HttpConfig {
        base_url: cli.base_url,
        session_cookie: cli.session_cookie,
    });

    match cli.command {
        Command::Chat(args) => {
            if find_model(&args.model).is_none() {
                return Err(format!("unknown model: {}", args.model).into());
            }
            repl::run(http, args).await
        }
        Command::Cache { conversation_id } => print_cached(&conversation_id),
        Command::Models => {
            print_models();
            Ok(())
        }
    }
}

fn print_cached(conversation_id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let cache = chatsync_app::open_message_cache()?;
    match cache.read(conversation_id) {
        Some(messages) => println!("{}", serde_json::to_string_pretty(&messages)?),
        None => eprintln!("no cached messages for {conversation_id}"),
    }
    Ok(())
}

fn print_models() {
    for model in chat_models() {
        let marker = if model.id == DEFAULT_CHAT_MODEL {
            "*"
        } else {
            " "
        };
        println!("{marker} {:<24} {:<10} {}", model.id, model.name, model.description);
    }
}
