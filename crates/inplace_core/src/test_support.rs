//! Shared test-only helpers for inplace_core.

use serde_json::Value;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::document::{NodeId, Rect};
use crate::error::TransportError;
use crate::notify::{NoticeLevel, Notifier};
use crate::transport::{Transport, TransportResponse};
use crate::Page;

/// Transport double that replays queued outcomes and records requests.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    responses: RefCell<VecDeque<Result<TransportResponse, TransportError>>>,
    pub(crate) posts: RefCell<Vec<(String, Value)>>,
    pub(crate) gets: RefCell<Vec<String>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&self, outcome: Result<TransportResponse, TransportError>) -> &Self {
        self.responses.borrow_mut().push_back(outcome);
        self
    }

    pub(crate) fn push_json(&self, body: Value) -> &Self {
        self.push(Ok(json_response(200, body)))
    }

    pub(crate) fn post_count(&self) -> usize {
        self.posts.borrow().len()
    }

    fn next(&self) -> Result<TransportResponse, TransportError> {
        self.responses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Network("no scripted response".into())))
    }
}

impl Transport for ScriptedTransport {
    async fn post_json(&self, url: &str, body: &Value) -> Result<TransportResponse, TransportError> {
        self.posts.borrow_mut().push((url.to_string(), body.clone()));
        self.next()
    }

    async fn get_json(&self, url: &str) -> Result<TransportResponse, TransportError> {
        self.gets.borrow_mut().push(url.to_string());
        self.next()
    }
}

pub(crate) fn json_response(status: u16, body: Value) -> TransportResponse {
    TransportResponse {
        status,
        reason: match status {
            200 => "OK",
            404 => "Not Found",
            500 => "Internal Server Error",
            _ => "",
        }
        .to_string(),
        body: body.to_string(),
    }
}

/// Notifier that keeps every notice for later assertions.
#[derive(Clone, Default)]
pub(crate) struct RecordingNotifier {
    pub(crate) notices: Rc<RefCell<Vec<(NoticeLevel, String, String)>>>,
}

impl Notifier for RecordingNotifier {
    fn notify(&self, level: NoticeLevel, title: &str, message: &str) {
        self.notices
            .borrow_mut()
            .push((level, title.to_string(), message.to_string()));
    }
}

/// Append a `span` with `text` to the page body and give it a layout box.
///
/// # Returns
/// The new anchor node.
pub(crate) fn add_anchor(page: &mut Page, text: &str) -> NodeId {
    let doc = page.document_mut();
    let body = doc.body();
    let anchor = doc.create_element("span");
    doc.set_text(anchor, text);
    doc.set_rect(anchor, Rect::new(100.0, 200.0, 80.0, 20.0));
    doc.append_child(body, anchor);
    anchor
}
