mod commands;
mod config;

use std::future::Future;
use std::io::Write;
use std::str::FromStr;

use anyhow::Context;
use chital::prelude::*;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::commands::{Command, HELP};
use crate::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let config = Config::load()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    init_logging(&config);

    tracing::info!(base_url = %config.ollama.base_url, "Starting chital");

    let builder = ChatAppBuilder::new()
        .ollama_config(config.ollama.clone())
        .settings(config.session.clone());
    let builder = match config.storage.threads_dir()? {
        Some(dir) => builder.storage_dir(dir),
        None => builder.in_memory(),
    };
    let app = builder.build().await?;

    let printer = tokio::spawn(print_events(app.store().subscribe()));

    let result = Repl::new(&app)?.run().await;

    app.shutdown().await;
    printer.abort();
    result
}

fn init_logging(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    // Logs go to stderr so they do not interleave with streamed replies
    let registry = tracing_subscriber::registry().with(env_filter);

    match config.logging.format.as_str() {
        "json" => {
            registry
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
                .init();
        }
    }
}

/// Render store events: streamed text and late-arriving titles
async fn print_events(mut events: broadcast::Receiver<ChatEvent>) {
    loop {
        match events.recv().await {
            Ok(ChatEvent::MessageUpdated { delta, .. }) => {
                print!("{}", delta);
                let _ = std::io::stdout().flush();
            }
            Ok(ChatEvent::TitleChanged { title, .. }) => {
                println!("\n[title: {}]", title);
            }
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Event printer fell behind");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

struct Repl<'a> {
    app: &'a ChatApp,
    current: ThreadId,
    /// Order shown by the last `/threads`
    listing: Vec<ThreadId>,
}

impl<'a> Repl<'a> {
    fn new(app: &'a ChatApp) -> Result<Self> {
        let current = app.store().create_draft()?;
        Ok(Self {
            app,
            current,
            listing: Vec::new(),
        })
    }

    async fn run(&mut self) -> Result<()> {
        println!("chital - chatting with Ollama. /help for commands.");
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            print!("> ");
            std::io::stdout().flush()?;

            let Some(line) = lines.next_line().await.context("Failed to read input")? else {
                break;
            };

            match Command::parse(&line) {
                Command::Empty => {}
                Command::Say(text) => {
                    let thread_id = self.current;
                    self.drive(self.app.controller().submit(thread_id, &text)).await;
                }
                Command::Retry => self.retry().await?,
                Command::Edit(text) => self.edit(&text).await?,
                Command::New => {
                    self.current = self.app.store().create_draft()?;
                    println!("[new thread]");
                }
                Command::Threads => self.list_threads()?,
                Command::Open(target) => self.open(&target)?,
                Command::Models => self.list_models().await,
                Command::Model(name) => self.select_model(name)?,
                Command::Delete => {
                    self.app.store().delete_thread(self.current)?;
                    self.current = self.app.store().create_draft()?;
                    println!("[thread deleted]");
                }
                Command::Help => println!("{}", HELP),
                Command::Quit => break,
                Command::Unknown(name) => println!("Unknown command /{}. Try /help.", name),
            }
        }

        Ok(())
    }

    /// Await an exchange; Ctrl-C cancels it
    async fn drive<F>(&self, exchange: F)
    where
        F: Future<Output = std::result::Result<ExchangeOutcome, SessionError>>,
    {
        tokio::pin!(exchange);

        let outcome = tokio::select! {
            outcome = &mut exchange => outcome,
            _ = tokio::signal::ctrl_c() => {
                self.app.controller().cancel(self.current);
                exchange.await
            }
        };
        println!();

        match outcome {
            Ok(ExchangeOutcome::Completed { .. }) => {}
            Ok(ExchangeOutcome::Cancelled { .. }) => println!("[stopped]"),
            Ok(ExchangeOutcome::Skipped) => println!("[nothing to send]"),
            Err(e) => eprintln!("Error: {}", e.user_message()),
        }
    }

    async fn retry(&mut self) -> Result<()> {
        let thread = self.app.store().thread(self.current)?;
        let Some(target) = thread.messages.iter().rev().find(|m| !m.is_user) else {
            println!("[nothing to retry]");
            return Ok(());
        };

        let (thread_id, message_id) = (self.current, target.id);
        self.drive(self.app.controller().retry(thread_id, message_id)).await;
        Ok(())
    }

    async fn edit(&mut self, text: &str) -> Result<()> {
        let thread = self.app.store().thread(self.current)?;
        let Some(target) = thread.messages.iter().rev().find(|m| m.is_user) else {
            println!("[no message to edit]");
            return Ok(());
        };

        let (thread_id, message_id) = (self.current, target.id);
        self.drive(self.app.controller().resubmit(thread_id, message_id, text)).await;
        Ok(())
    }

    fn list_threads(&mut self) -> Result<()> {
        let threads = self.app.store().list_threads()?;
        if threads.is_empty() {
            println!("[no saved threads]");
        }

        self.listing = threads.iter().map(|t| t.id).collect();
        for (index, thread) in threads.iter().enumerate() {
            let marker = if thread.id == self.current { "*" } else { " " };
            let title = if thread.title.is_empty() { "(untitled)" } else { thread.title.as_str() };
            println!("{}{:>3}. {} ({} messages)", marker, index + 1, title, thread.messages.len());
        }
        Ok(())
    }

    fn open(&mut self, target: &str) -> Result<()> {
        let thread_id = match target.parse::<usize>() {
            Ok(index) => match index.checked_sub(1).and_then(|i| self.listing.get(i)) {
                Some(id) => *id,
                None => {
                    println!("No thread {} in the last listing, try /threads", index);
                    return Ok(());
                }
            },
            Err(_) => ThreadId::from_str(target).with_context(|| format!("Not a thread id: {}", target))?,
        };

        let thread = self.app.store().thread(thread_id)?;
        self.current = thread_id;

        println!("[{}]", if thread.title.is_empty() { "(untitled)" } else { thread.title.as_str() });
        for message in &thread.messages {
            print_message(message);
        }
        Ok(())
    }

    async fn list_models(&self) {
        let selected = self
            .app
            .store()
            .thread(self.current)
            .ok()
            .and_then(|t| t.selected_model);

        match self.app.controller().refresh_models().await {
            Ok(models) if models.is_empty() => println!("[no models installed]"),
            Ok(models) => {
                for model in models {
                    let marker = if selected.as_deref() == Some(model.as_str()) { "*" } else { " " };
                    println!("{} {}", marker, model);
                }
            }
            Err(e) => eprintln!("Error: {}", e.user_message()),
        }
    }

    fn select_model(&self, name: String) -> Result<()> {
        if !self.app.controller().settings().available_models.contains(&name) {
            println!("[{} is not installed; the next message falls back to an installed model]", name);
        }
        self.app.store().set_selected_model(self.current, Some(name))?;
        Ok(())
    }
}

fn print_message(message: &ChatMessage) {
    let who = if message.is_user { "you" } else { "model" };
    println!("{}: {}", who, message.text);
}
