//! Command-line client for an in-place editing save endpoint.

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use inplace::constants::DEFAULT_CLI_ENDPOINT_URL;
use inplace::input::source::normalize_options;
use inplace::sanitize::markup_text;
use inplace::{
    FieldConfig, FieldEventKind, HttpTransport, InputKind, Page, Sanitizer, SubmissionContext,
    Transport, UiEvent,
};
use serde_json::{Map, Value};
use std::io::{self, Read};
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "inplace", about = "In-place editing CLI", version)]
struct Cli {
    /// Save endpoint URL (can also be set via INPLACE_URL env var)
    #[arg(short, long, env = "INPLACE_URL")]
    url: Option<String>,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    json: bool,

    /// Request timeout in seconds
    #[arg(short = 't', long, default_value = "30")]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
    /// Submit one field edit
    Save {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        pk: String,
        /// New value; read from stdin when omitted
        #[arg(short, long)]
        value: Option<String>,
        /// Extra payload entries as key=value
        #[arg(long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,
        #[arg(long)]
        user: Option<String>,
        #[arg(long, env = "INPLACE_CSRF_TOKEN")]
        csrf_token: Option<String>,
        /// Send the value as a sanitized rich-text envelope
        #[arg(long)]
        html: bool,
    },
    /// Fetch an option source and print its normalized options
    Source { url: String },
    /// Sanitize markup from a file or stdin
    Sanitize {
        #[arg(short, long)]
        file: Option<String>,
        /// Print visible text instead of markup
        #[arg(long)]
        text: bool,
    },
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected key=value, got '{}'", raw)),
    }
}

fn resolve_url(url: Option<String>) -> String {
    url.map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_CLI_ENDPOINT_URL.to_string())
}

fn read_input(file: Option<&str>) -> anyhow::Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path).with_context(|| format!("reading {}", path)),
        None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            Ok(buffer)
        }
    }
}

fn pk_value(raw: &str) -> Value {
    raw.parse::<i64>()
        .map(Value::from)
        .unwrap_or_else(|_| Value::from(raw))
}

/// One field edit, driven through a headless page.
struct FieldEdit {
    endpoint: String,
    name: String,
    pk: Value,
    value: String,
    params: Map<String, Value>,
    html: bool,
    context: SubmissionContext,
}

/// Attach a field, type `edit.value` into it, and submit through `transport`.
///
/// # Returns
/// The endpoint's raw response when the save committed, otherwise the
/// message the field shows in its error slot.
///
/// # Errors
/// Fails when the field cannot be attached, opened, or submitted.
async fn submit_edit<T: Transport>(
    edit: FieldEdit,
    transport: &T,
) -> anyhow::Result<Result<Value, String>> {
    let mut page = Page::new();
    page.set_submission_context(edit.context);
    let doc = page.document_mut();
    let body = doc.body();
    let anchor = doc.create_element("span");
    doc.append_child(body, anchor);

    let kind = if edit.html {
        InputKind::RichText
    } else {
        InputKind::Text
    };
    let mut config = FieldConfig::new(kind)
        .name(edit.name)
        .pk(edit.pk)
        .url(edit.endpoint)
        .params(edit.params)
        .save_nochange(true);
    config.html_envelope = edit.html;
    let id = page.attach(anchor, config)?;

    page.open(id)?;
    let target = page
        .control(id)
        .map(|handles| handles.control)
        .context("field rendered no control")?;
    page.dispatch(UiEvent::Input {
        target,
        value: edit.value,
    });
    page.submit(id)?;
    page.flush(transport).await;

    let committed = page
        .drain_events()
        .into_iter()
        .find_map(|event| match event.kind {
            FieldEventKind::Save { response, .. } => Some(response.unwrap_or(Value::Null)),
            _ => None,
        });
    Ok(committed.ok_or_else(|| {
        page.error_message(id)
            .unwrap_or_else(|| "Save did not complete".to_string())
    }))
}

fn format_save_output(name: &str, response: &Value, json: bool) -> anyhow::Result<String> {
    if json {
        return Ok(serde_json::to_string_pretty(response)?);
    }
    let message = response
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("Saved {}", name));
    Ok(message)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "inplace=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let Cli {
        url,
        json,
        timeout,
        command,
    } = Cli::parse();

    match command {
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut io::stdout());
        }
        Commands::Sanitize { file, text } => {
            let raw = read_input(file.as_deref())?;
            let cleaned = Sanitizer::default().clean(&raw);
            if cleaned.exceeds_limit {
                tracing::warn!("Sanitized text is {} characters long", cleaned.text_len);
            }
            if text {
                println!("{}", markup_text(&cleaned.markup));
            } else {
                println!("{}", cleaned.markup);
            }
        }
        Commands::Source { url: source_url } => {
            let transport = HttpTransport::new(Duration::from_secs(timeout))?;
            let response = transport.get_json(&source_url).await?;
            if !(200..300).contains(&response.status) {
                anyhow::bail!("Source failed ({} {})", response.status, response.reason);
            }
            let raw: Value = serde_json::from_str(&response.body)
                .context("source response is not JSON")?;
            let options = normalize_options(&raw);
            if json {
                println!("{}", serde_json::to_string_pretty(&options)?);
            } else {
                for option in options {
                    println!("{:<20} {}", option.value, option.label);
                }
            }
        }
        Commands::Save {
            name,
            pk,
            value,
            params,
            user,
            csrf_token,
            html,
        } => {
            let raw = match value {
                Some(value) => value,
                None => read_input(None)?.trim_end_matches('\n').to_string(),
            };
            let edit = FieldEdit {
                endpoint: resolve_url(url),
                name: name.clone(),
                pk: pk_value(&pk),
                value: raw,
                params: params
                    .into_iter()
                    .map(|(key, value)| (key, Value::String(value)))
                    .collect(),
                html,
                context: SubmissionContext {
                    user,
                    timestamp: None,
                    csrf_token,
                },
            };

            let transport = HttpTransport::new(Duration::from_secs(timeout))?;
            match submit_edit(edit, &transport).await? {
                Ok(response) => println!("{}", format_save_output(&name, &response, json)?),
                Err(message) => {
                    eprintln!("Save failed: {}", message);
                    std::process::exit(1);
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests;
