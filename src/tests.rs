//! Unit tests for the `inplace` CLI entrypoint module.

use super::{format_save_output, parse_param, pk_value, resolve_url, submit_edit, FieldEdit};
use super::{Cli, Commands};
use clap::Parser;
use inplace::constants::DEFAULT_CLI_ENDPOINT_URL;
use inplace::{SubmissionContext, Transport, TransportError, TransportResponse};
use serde_json::{json, Map, Value};
use std::cell::RefCell;

/// Answers every POST with `reply` and keeps the request bodies.
struct CannedTransport {
    reply: TransportResponse,
    posts: RefCell<Vec<Value>>,
}

impl CannedTransport {
    fn new(status: u16, body: Value) -> Self {
        Self {
            reply: TransportResponse {
                status,
                reason: String::new(),
                body: body.to_string(),
            },
            posts: RefCell::new(Vec::new()),
        }
    }
}

impl Transport for CannedTransport {
    async fn post_json(&self, _url: &str, body: &Value) -> Result<TransportResponse, TransportError> {
        self.posts.borrow_mut().push(body.clone());
        Ok(self.reply.clone())
    }

    async fn get_json(&self, _url: &str) -> Result<TransportResponse, TransportError> {
        Err(TransportError::Network("not scripted".into()))
    }
}

fn edit(value: &str, html: bool) -> FieldEdit {
    let mut params = Map::new();
    params.insert("section".into(), json!("profile"));
    FieldEdit {
        endpoint: "http://127.0.0.1:9/api/save".into(),
        name: "bio".into(),
        pk: json!(3),
        value: value.into(),
        params,
        html,
        context: SubmissionContext {
            user: Some("alice".into()),
            timestamp: None,
            csrf_token: Some("tok".into()),
        },
    }
}

#[test]
fn params_must_be_key_value_pairs() {
    assert_eq!(
        parse_param("section=profile"),
        Ok(("section".to_string(), "profile".to_string()))
    );
    assert_eq!(
        parse_param("query=a=b"),
        Ok(("query".to_string(), "a=b".to_string()))
    );
    assert!(parse_param("novalue").is_err());
    assert!(parse_param("=x").is_err());
}

#[test]
fn numeric_primary_keys_are_sent_as_numbers() {
    assert_eq!(pk_value("42"), json!(42));
    assert_eq!(pk_value("user-7"), json!("user-7"));
}

#[test]
fn blank_url_falls_back_to_default() {
    assert_eq!(resolve_url(None), DEFAULT_CLI_ENDPOINT_URL);
    assert_eq!(resolve_url(Some("  ".into())), DEFAULT_CLI_ENDPOINT_URL);
    assert_eq!(
        resolve_url(Some(" http://127.0.0.1:9000/save ".into())),
        "http://127.0.0.1:9000/save"
    );
}

#[test]
fn save_output_prefers_server_message() {
    let response = json!({"status": "success", "message": "Successfully updated status"});
    assert_eq!(
        format_save_output("status", &response, false).unwrap(),
        "Successfully updated status"
    );
    assert_eq!(
        format_save_output("status", &json!({"status": "success"}), false).unwrap(),
        "Saved status"
    );
    let pretty = format_save_output("status", &response, true).unwrap();
    assert!(pretty.contains("\"message\""));
}

#[test]
fn save_command_parses_repeated_params() {
    let cli = Cli::try_parse_from([
        "inplace",
        "--url",
        "http://127.0.0.1:9000/api/save",
        "save",
        "--name",
        "status",
        "--pk",
        "1",
        "--value",
        "Busy",
        "--param",
        "a=1",
        "--param",
        "b=2",
    ])
    .expect("valid save invocation");
    assert_eq!(cli.url.as_deref(), Some("http://127.0.0.1:9000/api/save"));
    match cli.command {
        Commands::Save {
            name,
            value,
            params,
            html,
            ..
        } => {
            assert_eq!(name, "status");
            assert_eq!(value.as_deref(), Some("Busy"));
            assert_eq!(params.len(), 2);
            assert!(!html);
        }
        _ => panic!("expected save command"),
    }
}

#[tokio::test]
async fn save_drives_a_field_through_one_edit() {
    let transport = CannedTransport::new(200, json!({"status": "success", "message": "ok"}));
    let outcome = submit_edit(edit("Hello", false), &transport).await.unwrap();
    assert_eq!(outcome.unwrap()["message"], "ok");

    let posts = transport.posts.borrow();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0]["name"], "bio");
    assert_eq!(posts[0]["value"], "Hello");
    assert_eq!(posts[0]["pk"], 3);
    assert_eq!(posts[0]["section"], "profile");
    assert_eq!(posts[0]["user"], "alice");
}

#[tokio::test]
async fn html_saves_send_a_sanitized_envelope() {
    let transport = CannedTransport::new(200, json!({"status": "success"}));
    submit_edit(edit("<p>Hi</p><script>x()</script>", true), &transport)
        .await
        .unwrap()
        .unwrap();

    let posts = transport.posts.borrow();
    let envelope: Value = serde_json::from_str(posts[0]["value"].as_str().unwrap()).unwrap();
    assert_eq!(envelope["content"], "<p>Hi</p>");
    assert_eq!(envelope["csrf_token"], "tok");
}

#[tokio::test]
async fn rejected_saves_report_the_inline_message() {
    let transport = CannedTransport::new(
        200,
        json!({"status": "error", "title": "Validation Error", "message": "Too short"}),
    );
    let outcome = submit_edit(edit("x", false), &transport).await.unwrap();
    assert_eq!(outcome, Err("Too short".to_string()));
}
