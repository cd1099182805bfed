use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use chatsync_core::{ChatSession, MountOptions, Notice, Notifier, Step, login_redirect};
use chatsync_http::{HttpClient, ServerSnapshot};
use chatsync_proto::{Message, Part, Role, StopHandle, StreamEvent, UploadFile, generate_id};
use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::ChatArgs;

/// Stop handle of the turn currently printing, if any.
type ActiveTurn = Arc<Mutex<Option<StopHandle>>>;

pub async fn run(http: HttpClient, args: ChatArgs) -> Result<(), Box<dyn std::error::Error>> {
    let cache = chatsync_app::open_message_cache()?;
    let conversation_id = args.conversation.clone().unwrap_or_else(generate_id);

    let (notice_tx, notice_rx) = mpsc::unbounded_channel();
    let notifier = Notifier::new(notice_tx);
    tokio::spawn(print_notices(notice_rx));

    let snapshot = load_snapshot(&http, &conversation_id, &notifier).await;
    let mut session = ChatSession::new(http.transport(), cache, args.session_config(), notifier);

    let active: ActiveTurn = Arc::new(Mutex::new(None));
    tokio::spawn(handle_interrupts(active.clone()));

    let source = session
        .mount(
            conversation_id.clone(),
            MountOptions {
                snapshot: snapshot.messages,
                usage: snapshot.last_context,
                auto_resume: !args.no_resume,
                query: args.query.clone(),
            },
        )
        .await;
    tracing::debug!(?source, "conversation hydrated");

    println!("conversation {conversation_id} ({})", session.config().model_id);
    let resuming_assistant = session.is_streaming()
        && session
            .messages()
            .last()
            .is_some_and(|m| m.role == Role::Assistant);
    let history = session.messages().len() - usize::from(resuming_assistant);
    for message in &session.messages()[..history] {
        print_message(message);
    }
    if session.is_streaming() {
        print!("assistant: ");
        if resuming_assistant && let Some(last) = session.messages().last() {
            print!("{}", last.text());
        }
        finish_turn(&mut session, &active).await?;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt()?;
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        match line {
            "" => {}
            "/quit" => break,
            "/regenerate" => match session.regenerate() {
                Ok(()) => {
                    print!("assistant: ");
                    finish_turn(&mut session, &active).await?;
                }
                Err(rejected) => eprintln!("{rejected}"),
            },
            _ if line.starts_with("/attach ") => {
                let path = line.trim_start_matches("/attach ").trim();
                attach(&mut session, &http, Path::new(path)).await;
            }
            text => {
                session.composer_mut().set_text(text);
                if session.submit().is_ok() {
                    print!("assistant: ");
                    finish_turn(&mut session, &active).await?;
                }
            }
        }
        prompt()?;
    }
    Ok(())
}

/// The server's view of the conversation, or an empty one when it cannot be
/// fetched. An empty snapshot lets the local cache win hydration.
async fn load_snapshot(
    http: &HttpClient,
    conversation_id: &str,
    notifier: &Notifier,
) -> ServerSnapshot {
    match http.snapshot(conversation_id).await {
        Ok(snapshot) => snapshot,
        Err(err) => {
            tracing::warn!(conversation_id, error = %err, "could not fetch server snapshot");
            if err.is_auth_required() {
                notifier.redirect(login_redirect(&format!("/chat/{conversation_id}")));
            }
            ServerSnapshot::default()
        }
    }
}

/// Print events of the running turn until it ends.
async fn finish_turn(session: &mut ChatSession, active: &ActiveTurn) -> io::Result<()> {
    *active.lock() = session.stop_handle();

    let mut stdout = io::stdout();
    let step = session
        .drive(|event| match event {
            StreamEvent::TextDelta(delta) => {
                let _ = write!(stdout, "{delta}");
                let _ = stdout.flush();
            }
            StreamEvent::FilePart(file) => {
                let _ = write!(stdout, "\n[file {} {}]\n", file.media_type, file.url);
            }
            _ => {}
        })
        .await;
    active.lock().take();
    println!();

    match step {
        Step::Cancelled => eprintln!("[stopped]"),
        Step::Finished => {
            if let Some(usage) = session.usage() {
                tracing::debug!(
                    input = usage.input_tokens,
                    output = usage.output_tokens,
                    "turn usage"
                );
            }
        }
        _ => {}
    }
    Ok(())
}

async fn attach(session: &mut ChatSession, http: &HttpClient, path: &Path) {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(err) => {
            eprintln!("cannot read {}: {err}", path.display());
            return;
        }
    };
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_string());
    let file = UploadFile {
        content_type: content_type_for(path).to_string(),
        name,
        bytes,
    };

    let failures = session.attach(http, vec![file]).await;
    if failures.is_empty() {
        let names: Vec<_> = session
            .composer()
            .attachments()
            .iter()
            .map(|a| a.name.as_str())
            .collect();
        println!("attached: {}", names.join(", "));
    }
}

fn content_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("pdf") => "application/pdf",
        Some("txt") => "text/plain",
        _ => "application/octet-stream",
    }
}

/// Ctrl-C stops the running turn, or exits when idle.
async fn handle_interrupts(active: ActiveTurn) {
    while tokio::signal::ctrl_c().await.is_ok() {
        match active.lock().take() {
            Some(stop) => stop.stop(),
            None => std::process::exit(130),
        }
    }
}

async fn print_notices(mut rx: mpsc::UnboundedReceiver<Notice>) {
    while let Some(notice) = rx.recv().await {
        match notice {
            Notice::Toast { message } => eprintln!("! {message}"),
            Notice::Redirect { location } => {
                eprintln!("! sign in required: open {location} in the browser and set CHATSYNC_SESSION_COOKIE")
            }
            Notice::StatusChanged(status) => tracing::trace!(?status, "status"),
            Notice::Revalidate { key } => tracing::debug!(%key, "conversation list is stale"),
        }
    }
}

fn print_message(message: &Message) {
    let label = role_label(message.role);
    for part in &message.parts {
        match part {
            Part::Text(text) => println!("{label}: {}", text.text),
            Part::File(file) => println!(
                "{label}: [file {} {}]",
                file.name.as_deref().unwrap_or(&file.media_type),
                file.url
            ),
        }
    }
}

fn role_label(role: Role) -> &'static str {
    match role {
        Role::User => "you",
        Role::Assistant => "assistant",
        Role::System => "system",
    }
}

fn prompt() -> io::Result<()> {
    print!("> ");
    io::stdout().flush()
}
