//! Grounded questions: `stash ask`, `stash chat` and `stash params`.
//!
//! All three drive the configured facility through one [`AppState`], so
//! the session rules (lazy creation, reset on failure, reset on a
//! parameter change) come from the core crate unchanged.

use anyhow::Result;
use std::io::Write;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, BufReader};

use webstash_core::filter::SortOrder;
use webstash_core::normalize::Normalized;
use webstash_core::session::{LanguageModel, SessionManager};
use webstash_core::state::AppState;

use crate::config::Config;
use crate::ollama::create_model;
use crate::progress::{AskProgress, AskProgressReporter, ProgressMode};
use crate::render;
use crate::store::SqliteItemStore;

type Model = Box<dyn LanguageModel>;

/// Options for a one-shot question.
#[derive(Debug, Clone, Default)]
pub struct AskOptions {
    pub query: Option<String>,
    pub order: Option<SortOrder>,
    pub temperature: Option<f64>,
    pub top_k: Option<u32>,
    /// Print the normalized reply as JSON instead of cards.
    pub raw: bool,
}

async fn open(config: &Config) -> Result<AppState<Model>> {
    let model = create_model(&config.model)?;
    let store = SqliteItemStore::open(config).await?;
    let mut app = AppState::new(
        model,
        config.model.session_settings(),
        config.dataset.limits(),
    );
    app.load(&store).await;
    store.close().await;
    Ok(app)
}

/// Ask one question over the filtered view and print the answer.
pub async fn run_ask(config: &Config, question: &str, opts: &AskOptions) -> Result<()> {
    let mut app = open(config).await?;
    if opts.query.is_some() || opts.order.is_some() {
        app.apply_filter(
            opts.query.as_deref().unwrap_or(""),
            opts.order.unwrap_or_default(),
        );
    }

    if opts.temperature.is_some() || opts.top_k.is_some() {
        app.session_mut().seed_defaults().await?;
        if let Some(t) = opts.temperature {
            app.session_mut().set_temperature(t);
        }
        if let Some(k) = opts.top_k {
            app.session_mut().set_top_k(k);
        }
    }

    let reporter = ProgressMode::default_for_tty().reporter();
    let answer = ask_with_progress(&mut app, question, reporter.as_ref()).await?;
    println!("{}", format_answer(&answer, opts.raw)?);
    Ok(())
}

async fn ask_with_progress(
    app: &mut AppState<Model>,
    question: &str,
    reporter: &dyn AskProgressReporter,
) -> Result<Normalized, webstash_core::error::ModelError> {
    reporter.report(AskProgress::Waiting);
    let start = Instant::now();
    let result = app.ask(question).await;
    reporter.report(AskProgress::Finished {
        elapsed: start.elapsed(),
    });
    result
}

fn format_answer(answer: &Normalized, raw: bool) -> Result<String> {
    if !raw {
        return Ok(render::render_answer(answer));
    }
    Ok(match answer {
        Normalized::Structured(records) => serde_json::to_string_pretty(records)?,
        Normalized::PlainText(text) => text.clone(),
    })
}

/// Print the facility's advertised defaults and the effective params.
pub async fn run_params(config: &Config) -> Result<()> {
    let model = create_model(&config.model)?;
    let mut session = SessionManager::new(model, config.model.session_settings());
    let advertised = session.model().params().await?;
    session.seed_from(advertised);
    let effective = session.params();

    let show = |v: Option<String>| v.unwrap_or_else(|| "-".to_string());
    println!("Advertised:");
    println!(
        "  temperature: {}",
        show(advertised.default_temperature.map(|t| t.to_string()))
    );
    println!(
        "  top_k:       {}",
        show(advertised.default_top_k.map(|k| k.to_string()))
    );
    println!(
        "  max_top_k:   {}",
        show(advertised.max_top_k.map(|k| k.to_string()))
    );
    println!("Effective:");
    println!("  temperature: {:.1}", effective.temperature);
    println!("  top_k:       {}", effective.top_k);
    println!("  max_top_k:   {}", session.max_top_k());
    Ok(())
}

/// One line of chat input.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    Empty,
    Ask(String),
    Filter(String),
    Order(SortOrder),
    Temperature(f64),
    TopK(u32),
    Reset,
    Quit,
    Invalid(String),
}

pub fn parse_chat_line(line: &str) -> ChatCommand {
    let line = line.trim();
    if line.is_empty() {
        return ChatCommand::Empty;
    }
    let Some(command) = line.strip_prefix('/') else {
        return ChatCommand::Ask(line.to_string());
    };
    let (name, arg) = match command.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (command, ""),
    };
    match name {
        "filter" => ChatCommand::Filter(arg.to_string()),
        "order" => match arg.parse() {
            Ok(order) => ChatCommand::Order(order),
            Err(e) => ChatCommand::Invalid(e),
        },
        "temperature" => match arg.parse() {
            Ok(t) => ChatCommand::Temperature(t),
            Err(_) => ChatCommand::Invalid(format!("Not a number: '{}'", arg)),
        },
        "top-k" => match arg.parse() {
            Ok(k) => ChatCommand::TopK(k),
            Err(_) => ChatCommand::Invalid(format!("Not a positive integer: '{}'", arg)),
        },
        "reset" => ChatCommand::Reset,
        "quit" | "exit" => ChatCommand::Quit,
        other => ChatCommand::Invalid(format!("Unknown command: /{}", other)),
    }
}

/// Interactive loop over one state and one shared session.
///
/// Generation failures are printed and the loop continues; the next
/// question opens a fresh session. An unavailable facility ends the loop.
pub async fn run_chat(config: &Config, query: Option<&str>, order: Option<SortOrder>) -> Result<()> {
    let mut app = open(config).await?;
    let mut current_query = query.unwrap_or("").to_string();
    let mut current_order = order.unwrap_or_default();
    if query.is_some() || order.is_some() {
        app.apply_filter(&current_query, current_order);
    }

    let reporter = ProgressMode::default_for_tty().reporter();
    eprintln!(
        "{} items in view. Commands: /filter <q>, /order <o>, /temperature <t>, /top-k <k>, /reset, /quit",
        app.filtered_view().len()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        eprint!("> ");
        let _ = std::io::stderr().flush();
        let Some(line) = lines.next_line().await? else {
            break;
        };

        match parse_chat_line(&line) {
            ChatCommand::Empty => {}
            ChatCommand::Quit => break,
            ChatCommand::Invalid(msg) => eprintln!("{}", msg),
            ChatCommand::Filter(q) => {
                current_query = q;
                let n = app.apply_filter(&current_query, current_order).len();
                eprintln!("{} items in view.", n);
            }
            ChatCommand::Order(o) => {
                current_order = o;
                let n = app.apply_filter(&current_query, current_order).len();
                eprintln!("{} items in view.", n);
            }
            ChatCommand::Temperature(t) => {
                app.session_mut().seed_defaults().await?;
                app.session_mut().set_temperature(t);
                eprintln!("temperature = {:.1}", app.session().params().temperature);
            }
            ChatCommand::TopK(k) => {
                app.session_mut().seed_defaults().await?;
                app.session_mut().set_top_k(k);
                eprintln!("top_k = {}", app.session().params().top_k);
            }
            ChatCommand::Reset => {
                app.session_mut().reset();
                eprintln!("Session reset.");
            }
            ChatCommand::Ask(question) => {
                match ask_with_progress(&mut app, &question, reporter.as_ref()).await {
                    Ok(answer) => println!("{}\n", render::render_answer(&answer)),
                    Err(e) if e.is_unavailable() => return Err(e.into()),
                    Err(e) => eprintln!("Error: {}", e),
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_chat_line() {
        assert_eq!(parse_chat_line("   "), ChatCommand::Empty);
        assert_eq!(
            parse_chat_line("what is this?"),
            ChatCommand::Ask("what is this?".to_string())
        );
        assert_eq!(
            parse_chat_line("/filter #space rocket"),
            ChatCommand::Filter("#space rocket".to_string())
        );
        assert_eq!(parse_chat_line("/filter"), ChatCommand::Filter(String::new()));
        assert_eq!(
            parse_chat_line("/order Oldest"),
            ChatCommand::Order(SortOrder::Oldest)
        );
        assert_eq!(
            parse_chat_line("/temperature 0.4"),
            ChatCommand::Temperature(0.4)
        );
        assert_eq!(parse_chat_line("/top-k 5"), ChatCommand::TopK(5));
        assert_eq!(parse_chat_line("/reset"), ChatCommand::Reset);
        assert_eq!(parse_chat_line("/quit"), ChatCommand::Quit);
    }

    #[test]
    fn test_parse_chat_line_invalid() {
        for line in ["/order sideways", "/temperature hot", "/top-k -1", "/dance"] {
            assert!(
                matches!(parse_chat_line(line), ChatCommand::Invalid(_)),
                "{}",
                line
            );
        }
    }

    #[test]
    fn test_raw_answer_is_json() {
        let answer = Normalized::Structured(vec![json!({"tag": "a"})]);
        let out = format_answer(&answer, true).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed, json!([{"tag": "a"}]));

        let plain = Normalized::PlainText("hi".to_string());
        assert_eq!(format_answer(&plain, true).unwrap(), "hi");
    }
}
