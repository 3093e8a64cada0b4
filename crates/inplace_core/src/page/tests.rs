use serde_json::json;

use super::*;
use crate::config::{OnBlur, SuccessVerdict, Toggle};
use crate::document::Rect;
use crate::error::SubmitFailure;
use crate::input::{InputKind, OptionSource};
use crate::models::FieldEventKind;
use crate::notify::NoticeLevel;
use crate::page::{Key, Modifiers, UiEvent};
use crate::test_support::{add_anchor, json_response, RecordingNotifier, ScriptedTransport};

fn kinds(events: &[FieldEvent]) -> Vec<&'static str> {
    events.iter().map(|event| event.kind.name()).collect()
}

fn text_field(page: &mut Page, text: &str) -> FieldId {
    let anchor = add_anchor(page, text);
    page.attach(
        anchor,
        FieldConfig::new(InputKind::Text)
            .name("status")
            .pk(1)
            .url("http://localhost/api/save"),
    )
    .expect("attach")
}

fn control(page: &Page, id: FieldId) -> NodeId {
    page.control(id).expect("rendered control").control
}

fn type_into(page: &mut Page, id: FieldId, value: &str) {
    let target = control(page, id);
    page.dispatch(UiEvent::Input {
        target,
        value: value.to_string(),
    });
}

fn click_submit(page: &mut Page, id: FieldId) {
    let target = page
        .form(id)
        .and_then(|form| form.submit_button())
        .expect("submit button");
    page.dispatch(UiEvent::Click { target });
}

#[tokio::test]
async fn committed_save_updates_anchor_and_emits_in_order() {
    let mut page = Page::new();
    let id = text_field(&mut page, "Available");
    let anchor = page.document().children(page.document().body())[0];
    page.dispatch(UiEvent::Click { target: anchor });
    page.tick();
    assert_eq!(page.document().focused(), Some(control(&page, id)));

    type_into(&mut page, id, "Busy");
    click_submit(&mut page, id);
    assert_eq!(page.state(id), Some(&FieldState::Submitting));

    let transport = ScriptedTransport::new();
    transport.push_json(json!({"status": "success"}));
    assert_eq!(page.flush(&transport).await, 1);
    assert_eq!(transport.post_count(), 1);

    assert_eq!(page.state(id), Some(&FieldState::Closed));
    assert_eq!(page.document().text_content(anchor), "Busy");
    let events = page.drain_events();
    assert_eq!(kinds(&events), vec!["shown", "update", "hidden", "save"]);
    match &events[3].kind {
        FieldEventKind::Save {
            old_value,
            new_value,
            response,
            ..
        } => {
            assert_eq!(old_value, &FieldValue::text("Available"));
            assert_eq!(new_value, &FieldValue::text("Busy"));
            assert_eq!(response.as_ref().map(|r| r["status"].clone()), Some(json!("success")));
        }
        other => panic!("unexpected event {:?}", other),
    }
    let posts = transport.posts.borrow();
    assert_eq!(posts[0].0, "http://localhost/api/save");
    assert_eq!(posts[0].1, json!({"name": "status", "value": "Busy", "pk": 1}));
}

#[test]
fn unchanged_value_closes_without_a_request() {
    let mut page = Page::new();
    let id = text_field(&mut page, "Available");
    page.open(id).unwrap();
    assert_eq!(page.submit(id), Ok(SubmitOutcome::Unchanged));
    assert!(page.take_pending().is_empty());
    assert_eq!(
        kinds(&page.drain_events()),
        vec!["shown", "nochange", "hidden"]
    );
}

#[test]
fn save_nochange_still_submits() {
    let mut page = Page::new();
    let anchor = add_anchor(&mut page, "Available");
    let id = page
        .attach(
            anchor,
            FieldConfig::new(InputKind::Text)
                .url("http://localhost/api/save")
                .save_nochange(true),
        )
        .unwrap();
    page.open(id).unwrap();
    assert!(matches!(page.submit(id), Ok(SubmitOutcome::Queued(_))));
}

#[test]
fn second_submit_while_in_flight_is_ignored() {
    let mut page = Page::new();
    let id = text_field(&mut page, "Available");
    page.open(id).unwrap();
    type_into(&mut page, id, "Busy");
    assert!(matches!(page.submit(id), Ok(SubmitOutcome::Queued(_))));
    assert_eq!(page.submit(id), Ok(SubmitOutcome::AlreadySubmitting));
    assert_eq!(page.take_pending().len(), 1);
}

#[tokio::test]
async fn server_error_keeps_field_open_with_category_message() {
    let mut page = Page::new();
    let id = text_field(&mut page, "Available");
    page.open(id).unwrap();
    type_into(&mut page, id, "Busy");
    page.submit(id).unwrap();

    let transport = ScriptedTransport::new();
    transport.push(Ok(json_response(500, json!({}))));
    page.flush(&transport).await;

    let message = "Server error (500). Please try again later.".to_string();
    assert_eq!(
        page.state(id),
        Some(&FieldState::Open {
            error: Some(message.clone())
        })
    );
    assert_eq!(page.error_message(id), Some(message));
    assert_eq!(page.value(id), Some(&FieldValue::text("Available")));
}

#[tokio::test]
async fn application_errors_show_the_server_message() {
    let mut page = Page::new();
    let id = text_field(&mut page, "Available");
    page.open(id).unwrap();
    type_into(&mut page, id, "Busy");
    page.submit(id).unwrap();

    let transport = ScriptedTransport::new();
    transport.push_json(json!({"status": "error", "title": "Nope", "message": "Name taken"}));
    page.flush(&transport).await;
    assert_eq!(page.error_message(id).as_deref(), Some("Name taken"));

    // Retry from the same session succeeds.
    page.submit(id).unwrap();
    transport.push_json(json!({"status": "success"}));
    page.flush(&transport).await;
    assert_eq!(page.value(id), Some(&FieldValue::text("Busy")));
}

#[tokio::test]
async fn error_hook_overrides_the_message() {
    let mut page = Page::new();
    let anchor = add_anchor(&mut page, "a");
    let id = page
        .attach(
            anchor,
            FieldConfig::new(InputKind::Text)
                .url("http://localhost/api/save")
                .on_error(|failure| match failure {
                    SubmitFailure::Transport { .. } => Some("Try later".to_string()),
                    _ => None,
                }),
        )
        .unwrap();
    page.open(id).unwrap();
    type_into(&mut page, id, "b");
    page.submit(id).unwrap();
    let transport = ScriptedTransport::new();
    page.flush(&transport).await;
    assert_eq!(page.error_message(id).as_deref(), Some("Try later"));
}

#[test]
fn validation_failure_stays_local() {
    let mut page = Page::new();
    let anchor = add_anchor(&mut page, "Alice");
    let id = page
        .attach(
            anchor,
            FieldConfig::new(InputKind::Text)
                .url("http://localhost/api/save")
                .validate(|value| {
                    value
                        .as_text()
                        .filter(|text| text.trim().is_empty())
                        .map(|_| "This field is required".to_string())
                }),
        )
        .unwrap();
    page.open(id).unwrap();
    type_into(&mut page, id, "  ");
    assert_eq!(
        page.submit(id),
        Err(EditError::Validation("This field is required".into()))
    );
    assert!(page.take_pending().is_empty());
    assert_eq!(
        page.error_message(id).as_deref(),
        Some("This field is required")
    );
    assert!(matches!(page.state(id), Some(FieldState::Open { .. })));
}

#[test]
fn opening_a_second_floating_field_closes_exactly_the_first() {
    let mut page = Page::new();
    let first = text_field(&mut page, "one");
    let second = text_field(&mut page, "two");
    let third = text_field(&mut page, "three");
    page.open(first).unwrap();
    page.drain_events();

    page.open(second).unwrap();
    assert_eq!(page.state(first), Some(&FieldState::Closed));
    assert!(page.state(second).is_some_and(FieldState::is_open));
    assert_eq!(page.state(third), Some(&FieldState::Closed));
    assert_eq!(page.open_floating(), Some(second));
    let events = page.drain_events();
    let hidden: Vec<FieldId> = events
        .iter()
        .filter(|event| event.kind == FieldEventKind::Hidden)
        .map(|event| event.field)
        .collect();
    assert_eq!(hidden, vec![first]);
}

#[test]
fn responses_for_closed_sessions_are_discarded() {
    let mut page = Page::new();
    let id = text_field(&mut page, "Available");
    page.open(id).unwrap();
    type_into(&mut page, id, "Busy");
    let Ok(SubmitOutcome::Queued(stale)) = page.submit(id) else {
        panic!("expected a queued save");
    };
    page.cancel(id).unwrap();
    assert_eq!(
        page.complete(stale, Ok(json_response(200, json!({"status": "success"})))),
        Completion::Discarded
    );
    assert_eq!(page.value(id), Some(&FieldValue::text("Available")));

    page.open(id).unwrap();
    type_into(&mut page, id, "Away");
    let Ok(SubmitOutcome::Queued(fresh)) = page.submit(id) else {
        panic!("expected a queued save");
    };
    assert_eq!(
        page.complete(stale, Ok(json_response(200, json!({"status": "success"})))),
        Completion::Discarded
    );
    assert_eq!(page.state(id), Some(&FieldState::Submitting));
    assert_eq!(
        page.complete(fresh, Ok(json_response(200, json!({"status": "success"})))),
        Completion::Committed
    );
    assert_eq!(page.value(id), Some(&FieldValue::text("Away")));
}

#[test]
fn destroy_releases_everything_and_drops_late_responses() {
    let mut page = Page::new();
    let id = text_field(&mut page, "Available");
    let anchor = page.document().children(page.document().body())[0];
    page.open(id).unwrap();
    type_into(&mut page, id, "Busy");
    let Ok(SubmitOutcome::Queued(ticket)) = page.submit(id) else {
        panic!("expected a queued save");
    };
    let root = page.container_root(id).unwrap();
    page.destroy(id).unwrap();

    assert_eq!(page.listener_count(), 0);
    assert!(!page.document().is_alive(root));
    assert_eq!(page.field_for_anchor(anchor), None);
    assert!(page.take_pending().is_empty());
    assert_eq!(
        page.complete(ticket, Ok(json_response(200, json!({"status": "success"})))),
        Completion::Discarded
    );
    assert_eq!(page.document().text_content(anchor), "Available");
    assert_eq!(page.open(id), Err(EditError::FieldNotFound(id.get())));
}

#[test]
fn open_close_cycles_do_not_leak_listeners() {
    let mut page = Page::new();
    let id = text_field(&mut page, "Available");
    let baseline = page.listener_count();
    for _ in 0..3 {
        page.open(id).unwrap();
        assert!(page.listener_count() > baseline);
        page.cancel(id).unwrap();
        assert_eq!(page.listener_count(), baseline);
    }
}

#[test]
fn open_close_cycles_reuse_document_slots() {
    let mut page = Page::new();
    let floating = text_field(&mut page, "Available");
    let anchor = add_anchor(&mut page, "Oslo");
    let inline = page
        .attach(anchor, FieldConfig::new(InputKind::Text).mode(Mode::Inline))
        .unwrap();
    for id in [floating, inline] {
        page.open(id).unwrap();
        page.cancel(id).unwrap();
    }
    let capacity = page.document().capacity();
    let live = page.document().live_count();

    for _ in 0..500 {
        for id in [floating, inline] {
            page.open(id).unwrap();
            page.cancel(id).unwrap();
        }
    }
    assert_eq!(page.document().capacity(), capacity);
    assert_eq!(page.document().live_count(), live);
}

#[test]
fn anchor_click_while_submitting_hides_and_drops_the_response() {
    let mut page = Page::new();
    let anchor = add_anchor(&mut page, "Available");
    let id = page
        .attach(
            anchor,
            FieldConfig::new(InputKind::Text).url("http://localhost/api/save"),
        )
        .unwrap();
    page.open(id).unwrap();
    type_into(&mut page, id, "Busy");
    let Ok(SubmitOutcome::Queued(ticket)) = page.submit(id) else {
        panic!("expected a queued save");
    };
    assert_eq!(page.take_pending().len(), 1);
    page.drain_events();

    page.dispatch(UiEvent::Click { target: anchor });
    assert_eq!(page.state(id), Some(&FieldState::Closed));
    assert_eq!(kinds(&page.drain_events()), vec!["hidden"]);

    assert_eq!(
        page.complete(ticket, Ok(json_response(200, json!({"status": "success"})))),
        Completion::Discarded
    );
    assert_eq!(page.value(id), Some(&FieldValue::text("Available")));
    assert_eq!(page.document().text_content(anchor), "Available");
    assert!(page.drain_events().is_empty());
}

#[test]
fn escape_cancels_but_not_while_submitting() {
    let mut page = Page::new();
    let id = text_field(&mut page, "Available");
    page.open(id).unwrap();
    let target = control(&page, id);
    page.drain_events();
    page.dispatch(UiEvent::KeyUp {
        key: Key::Escape,
        modifiers: Modifiers::none(),
        target,
    });
    assert_eq!(page.state(id), Some(&FieldState::Closed));
    assert_eq!(kinds(&page.drain_events()), vec!["cancel", "hidden"]);

    page.open(id).unwrap();
    type_into(&mut page, id, "Busy");
    page.submit(id).unwrap();
    let target = control(&page, id);
    page.dispatch(UiEvent::KeyUp {
        key: Key::Escape,
        modifiers: Modifiers::none(),
        target,
    });
    assert_eq!(page.state(id), Some(&FieldState::Submitting));
}

#[test]
fn outside_pointer_follows_the_on_blur_policy() {
    let mut page = Page::new();
    let body = page.document().body();

    let cancel = text_field(&mut page, "a");
    page.open(cancel).unwrap();
    page.dispatch(UiEvent::PointerDown { target: body });
    assert_eq!(page.state(cancel), Some(&FieldState::Closed));

    let anchor = add_anchor(&mut page, "b");
    let submit = page
        .attach(anchor, FieldConfig::new(InputKind::Text).on_blur(OnBlur::Submit))
        .unwrap();
    page.open(submit).unwrap();
    type_into(&mut page, submit, "c");
    page.dispatch(UiEvent::PointerDown { target: body });
    assert_eq!(page.value(submit), Some(&FieldValue::text("c")));

    let anchor = add_anchor(&mut page, "d");
    let ignore = page
        .attach(anchor, FieldConfig::new(InputKind::Text).on_blur(OnBlur::Ignore))
        .unwrap();
    page.open(ignore).unwrap();
    page.dispatch(UiEvent::PointerDown { target: body });
    assert!(page.state(ignore).is_some_and(FieldState::is_open));

    // Clicks inside the panel never count as outside.
    page.hide(ignore).unwrap();
    let again = text_field(&mut page, "e");
    page.open(again).unwrap();
    let inner = control(&page, again);
    page.dispatch(UiEvent::PointerDown { target: inner });
    assert!(page.state(again).is_some_and(FieldState::is_open));
}

#[test]
fn outside_pointer_is_dropped_while_submitting() {
    let mut page = Page::new();
    let body = page.document().body();
    let id = text_field(&mut page, "a");
    page.open(id).unwrap();
    type_into(&mut page, id, "b");
    page.submit(id).unwrap();
    page.dispatch(UiEvent::PointerDown { target: body });
    assert_eq!(page.state(id), Some(&FieldState::Submitting));
}

#[test]
fn enter_submits_text_but_inserts_lines_in_rich_text() {
    let mut page = Page::new();
    let id = text_field(&mut page, "a");
    page.open(id).unwrap();
    type_into(&mut page, id, "b");
    let target = control(&page, id);
    page.dispatch(UiEvent::KeyDown {
        key: Key::Enter,
        modifiers: Modifiers::none(),
        target,
    });
    assert_eq!(page.state(id), Some(&FieldState::Submitting));

    let anchor = add_anchor(&mut page, "note");
    let rich = page
        .attach(
            anchor,
            FieldConfig::new(InputKind::RichText).show_buttons(false),
        )
        .unwrap();
    page.open(rich).unwrap();
    type_into(&mut page, rich, "<p>line one</p>");
    let target = control(&page, rich);
    page.dispatch(UiEvent::KeyDown {
        key: Key::Enter,
        modifiers: Modifiers::none(),
        target,
    });
    assert!(page.state(rich).is_some_and(FieldState::is_open));

    page.dispatch(UiEvent::KeyDown {
        key: Key::Enter,
        modifiers: Modifiers::ctrl(),
        target,
    });
    assert_eq!(page.state(rich), Some(&FieldState::Closed));
    assert_eq!(page.value(rich), Some(&FieldValue::text("<p>line one</p>")));
}

#[test]
fn rich_text_input_is_sanitized_into_the_control() {
    let mut page = Page::new();
    let anchor = add_anchor(&mut page, "");
    let id = page
        .attach(anchor, FieldConfig::new(InputKind::RichText))
        .unwrap();
    page.open(id).unwrap();
    type_into(&mut page, id, "<p>Hi</p><script>alert(1)</script>");
    let target = control(&page, id);
    assert_eq!(page.document().inner_markup(target), "<p>Hi</p>");
}

#[test]
fn multi_select_displays_joined_labels() {
    let mut page = Page::new();
    let anchor = add_anchor(&mut page, "");
    page.attach(
        anchor,
        FieldConfig::new(InputKind::MultiSelect)
            .source(OptionSource::Inline(json!([
                {"value": "en", "text": "English"},
                {"value": "es", "text": "Spanish"}
            ])))
            .value(FieldValue::list(["en", "es"])),
    )
    .unwrap();
    assert_eq!(page.document().text_content(anchor), "English, Spanish");
}

#[test]
fn unparseable_number_is_null_and_shows_empty_text() {
    let mut page = Page::new();
    let anchor = add_anchor(&mut page, "abc");
    let id = page
        .attach(anchor, FieldConfig::new(InputKind::Number))
        .unwrap();
    assert_eq!(page.value(id), Some(&FieldValue::Null));
    assert_eq!(page.document().text_content(anchor), "Empty");
    assert!(page.document().has_class(anchor, "editable-empty"));
}

#[test]
fn fields_without_url_commit_locally() {
    let mut page = Page::new();
    let anchor = add_anchor(&mut page, "Oslo");
    let id = page
        .attach(anchor, FieldConfig::new(InputKind::Text))
        .unwrap();
    page.open(id).unwrap();
    type_into(&mut page, id, "Bergen");
    assert_eq!(page.submit(id), Ok(SubmitOutcome::Committed));
    assert!(page.take_pending().is_empty());
    let events = page.drain_events();
    assert_eq!(kinds(&events), vec!["shown", "update", "hidden", "save"]);
    assert!(matches!(
        &events[3].kind,
        FieldEventKind::Save { response: None, wire_value, .. } if wire_value == "Bergen"
    ));
}

#[test]
fn authoritative_echo_replaces_the_local_value() {
    let mut page = Page::new();
    let id = text_field(&mut page, "a");
    page.open(id).unwrap();
    type_into(&mut page, id, "busy");
    let Ok(SubmitOutcome::Queued(ticket)) = page.submit(id) else {
        panic!("expected a queued save");
    };
    page.complete(
        ticket,
        Ok(json_response(200, json!({"status": "success", "value": "BUSY"}))),
    );
    assert_eq!(page.value(id), Some(&FieldValue::text("BUSY")));
}

#[test]
fn success_hook_verdicts() {
    let mut page = Page::new();
    let anchor = add_anchor(&mut page, "a");
    let keep = page
        .attach(
            anchor,
            FieldConfig::new(InputKind::Text)
                .url("http://localhost/api/save")
                .on_success(|_, _| SuccessVerdict::KeepOpen),
        )
        .unwrap();
    page.open(keep).unwrap();
    type_into(&mut page, keep, "b");
    let Ok(SubmitOutcome::Queued(ticket)) = page.submit(keep) else {
        panic!("expected a queued save");
    };
    page.drain_events();
    assert_eq!(
        page.complete(ticket, Ok(json_response(200, json!({"status": "success"})))),
        Completion::KeptOpen
    );
    assert_eq!(page.value(keep), Some(&FieldValue::text("a")));
    assert_eq!(page.document().text_content(anchor), "a");
    assert!(page.state(keep).is_some_and(FieldState::is_open));
    assert!(page.drain_events().is_empty());

    let anchor = add_anchor(&mut page, "x");
    let reject = page
        .attach(
            anchor,
            FieldConfig::new(InputKind::Text)
                .url("http://localhost/api/save")
                .on_success(|_, _| SuccessVerdict::Reject("Not allowed".into())),
        )
        .unwrap();
    page.open(reject).unwrap();
    type_into(&mut page, reject, "y");
    let Ok(SubmitOutcome::Queued(ticket)) = page.submit(reject) else {
        panic!("expected a queued save");
    };
    assert!(matches!(
        page.complete(ticket, Ok(json_response(200, json!({"status": "success"})))),
        Completion::Failed(_)
    ));
    assert_eq!(page.value(reject), Some(&FieldValue::text("x")));
    assert_eq!(page.error_message(reject).as_deref(), Some("Not allowed"));

    let anchor = add_anchor(&mut page, "m");
    let replace = page
        .attach(
            anchor,
            FieldConfig::new(InputKind::Text)
                .url("http://localhost/api/save")
                .on_success(|_, value| {
                    SuccessVerdict::Replace(FieldValue::text(format!(
                        "{}!",
                        value.to_plain_string()
                    )))
                }),
        )
        .unwrap();
    page.open(replace).unwrap();
    type_into(&mut page, replace, "n");
    let Ok(SubmitOutcome::Queued(ticket)) = page.submit(replace) else {
        panic!("expected a queued save");
    };
    page.complete(ticket, Ok(json_response(200, json!({"status": "success"}))));
    assert_eq!(page.value(replace), Some(&FieldValue::text("n!")));
}

#[test]
fn committed_saves_notify_success() {
    let notifier = RecordingNotifier::default();
    let mut page = Page::with_notifier(notifier.clone());
    let id = text_field(&mut page, "a");
    page.open(id).unwrap();
    type_into(&mut page, id, "b");
    let Ok(SubmitOutcome::Queued(ticket)) = page.submit(id) else {
        panic!("expected a queued save");
    };
    page.complete(
        ticket,
        Ok(json_response(
            200,
            json!({"status": "success", "title": "Updated", "message": "Successfully updated status"}),
        )),
    );
    let notices = notifier.notices.borrow();
    assert_eq!(
        notices.as_slice(),
        &[(
            NoticeLevel::Success,
            "Updated".to_string(),
            "Successfully updated status".to_string()
        )]
    );
}

#[tokio::test]
async fn url_sources_load_and_failures_resolve_empty() {
    let mut page = Page::new();
    let anchor = add_anchor(&mut page, "");
    let id = page
        .attach(
            anchor,
            FieldConfig::new(InputKind::Select)
                .source(OptionSource::Url("http://localhost/api/sources/languages".into()))
                .value("es"),
        )
        .unwrap();
    assert_eq!(page.document().text_content(anchor), "es");

    page.open(id).unwrap();
    let root = page.container_root(id).unwrap();
    let loading = page
        .document()
        .find_by_class(root, "editable-loading")
        .unwrap();
    assert!(!page.document().is_hidden(loading));

    let transport = ScriptedTransport::new();
    transport.push_json(json!([
        {"value": "en", "text": "English"},
        {"value": "es", "text": "Spanish"}
    ]));
    assert_eq!(page.load_sources(&transport).await, 1);
    assert!(page.document().is_hidden(loading));
    assert_eq!(page.document().text_content(anchor), "Spanish");
    let select = control(&page, id);
    assert_eq!(page.document().value(select), "es");

    let other_anchor = add_anchor(&mut page, "");
    let broken = page
        .attach(
            other_anchor,
            FieldConfig::new(InputKind::Select)
                .source(OptionSource::Url("http://localhost/missing".into())),
        )
        .unwrap();
    transport.push(Ok(json_response(404, json!({}))));
    assert_eq!(page.load_sources(&transport).await, 1);
    assert_eq!(page.load_sources(&transport).await, 0);
    assert_eq!(page.state(broken), Some(&FieldState::Closed));
}

#[test]
fn inline_mode_swaps_the_anchor_and_keeps_its_container() {
    let mut page = Page::new();
    let anchor = add_anchor(&mut page, "Oslo");
    let id = page
        .attach(
            anchor,
            FieldConfig::new(InputKind::Text).mode(Mode::Inline),
        )
        .unwrap();
    page.open(id).unwrap();
    assert_eq!(page.open_floating(), None);
    let root = page.container_root(id).unwrap();
    assert!(page.document().is_hidden(anchor));
    assert_eq!(page.document().parent(root), page.document().parent(anchor));

    type_into(&mut page, id, "Bergen");
    page.submit(id).unwrap();
    assert!(!page.document().is_hidden(anchor));
    assert_eq!(page.container_root(id), Some(root));
    assert!(!page.document().is_visible(root));
    assert_eq!(page.document().text_content(anchor), "Bergen");
}

#[test]
fn hover_toggle_opens_on_pointer_enter() {
    let mut page = Page::new();
    let anchor = add_anchor(&mut page, "a");
    let id = page
        .attach(anchor, FieldConfig::new(InputKind::Text).toggle(Toggle::Hover))
        .unwrap();
    page.dispatch(UiEvent::Click { target: anchor });
    assert_eq!(page.state(id), Some(&FieldState::Closed));
    page.dispatch(UiEvent::PointerEnter { target: anchor });
    assert!(page.state(id).is_some_and(FieldState::is_open));
}

#[test]
fn disabling_closes_and_blocks_opening() {
    let mut page = Page::new();
    let id = text_field(&mut page, "a");
    let anchor = page.document().children(page.document().body())[0];
    page.open(id).unwrap();
    page.disable(id).unwrap();
    assert_eq!(page.state(id), Some(&FieldState::Closed));
    assert_eq!(page.open_floating(), None);
    assert!(page.document().has_class(anchor, "editable-disabled"));
    assert_eq!(page.open(id), Err(EditError::Disabled));
    page.dispatch(UiEvent::Click { target: anchor });
    assert_eq!(page.state(id), Some(&FieldState::Closed));

    page.toggle_disabled(id).unwrap();
    assert_eq!(page.is_disabled(id), Some(false));
    page.toggle(id).unwrap();
    assert!(page.state(id).is_some_and(FieldState::is_open));
}

#[test]
fn reattaching_replaces_the_previous_field() {
    let mut page = Page::new();
    let anchor = add_anchor(&mut page, "a");
    page.document_mut().set_attribute(anchor, "id", "username");
    let first = page
        .attach(anchor, FieldConfig::new(InputKind::Text))
        .unwrap();
    page.open(first).unwrap();
    let second = page
        .attach(anchor, FieldConfig::new(InputKind::Text))
        .unwrap();
    assert_ne!(first, second);
    assert_eq!(page.state(first), None);
    assert_eq!(page.field_for_anchor(anchor), Some(second));
    assert_eq!(page.name(second), Some("username"));
    assert_eq!(page.open_floating(), None);
}

#[test]
fn attributes_configure_a_field() {
    let mut page = Page::new();
    let anchor = add_anchor(&mut page, "en");
    for (key, value) in [
        ("data-type", "select"),
        ("data-name", "language"),
        ("data-source", r#"{"en": "English", "es": "Spanish"}"#),
    ] {
        page.document_mut().set_attribute(anchor, key, value);
    }
    let id = page.attach_from_attributes(anchor).unwrap();
    assert_eq!(page.name(id), Some("language"));
    assert_eq!(page.document().text_content(anchor), "English");
}

fn attach_with_attributes(page: &mut Page, text: &str, attributes: &[(&str, &str)]) -> FieldId {
    let anchor = add_anchor(page, text);
    for (key, value) in attributes {
        page.document_mut().set_attribute(anchor, key, *value);
    }
    page.attach_from_attributes(anchor).expect("attach")
}

#[test]
fn attribute_values_are_parsed_by_input_kind() {
    let mut page = Page::new();
    let number = attach_with_attributes(
        &mut page,
        "",
        &[("data-type", "number"), ("data-value", "35"), ("data-url", "/api/save")],
    );
    let checklist = attach_with_attributes(
        &mut page,
        "",
        &[
            ("data-type", "checklist"),
            ("data-value", "en"),
            ("data-source", r#"{"en": "English", "es": "Spanish"}"#),
            ("data-url", "/api/save"),
        ],
    );
    let date = attach_with_attributes(
        &mut page,
        "",
        &[("data-type", "date"), ("data-value", "2024-01-05"), ("data-url", "/api/save")],
    );

    assert_eq!(page.value(number), Some(&FieldValue::Number(35.0)));
    assert_eq!(page.value(checklist), Some(&FieldValue::list(["en"])));
    let midnight = chrono::NaiveDate::from_ymd_opt(2024, 1, 5)
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .unwrap();
    assert_eq!(page.value(date), Some(&FieldValue::Timestamp(midnight)));

    for id in [number, checklist, date] {
        page.open(id).unwrap();
        assert_eq!(page.submit(id), Ok(SubmitOutcome::Unchanged), "field {}", id);
    }
    assert!(page.take_pending().is_empty());
}

#[test]
fn set_value_is_parsed_by_input_kind() {
    let mut page = Page::new();
    let anchor = add_anchor(&mut page, "");
    let id = page
        .attach(anchor, FieldConfig::new(InputKind::Number))
        .unwrap();
    page.set_value(id, "12.5").unwrap();
    assert_eq!(page.value(id), Some(&FieldValue::Number(12.5)));
    assert_eq!(page.document().text_content(anchor), "12.5");
}

#[test]
fn blur_submit_waits_for_the_debounce() {
    let mut page = Page::new();
    let anchor = add_anchor(&mut page, "a");
    let id = page
        .attach(
            anchor,
            FieldConfig::new(InputKind::Text)
                .show_buttons(false)
                .on_blur(OnBlur::Submit),
        )
        .unwrap();
    page.open(id).unwrap();
    page.tick();
    type_into(&mut page, id, "b");
    let target = control(&page, id);
    page.dispatch(UiEvent::Blur { target });
    page.tick();
    assert!(page.state(id).is_some_and(FieldState::is_open));
    page.tick();
    assert_eq!(page.state(id), Some(&FieldState::Closed));
    assert_eq!(page.value(id), Some(&FieldValue::text("b")));
}

#[test]
fn refocusing_cancels_a_pending_blur_submit() {
    let mut page = Page::new();
    let anchor = add_anchor(&mut page, "a");
    let id = page
        .attach(
            anchor,
            FieldConfig::new(InputKind::Text)
                .show_buttons(false)
                .on_blur(OnBlur::Submit),
        )
        .unwrap();
    page.open(id).unwrap();
    page.tick();
    let target = control(&page, id);
    page.dispatch(UiEvent::Blur { target });
    page.dispatch(UiEvent::Focus { target });
    page.tick();
    page.tick();
    assert!(page.state(id).is_some_and(FieldState::is_open));
}

#[test]
fn select_change_auto_submits_when_buttons_are_hidden() {
    let mut page = Page::new();
    let anchor = add_anchor(&mut page, "");
    let id = page
        .attach(
            anchor,
            FieldConfig::new(InputKind::Select)
                .show_buttons(false)
                .source(OptionSource::Inline(json!(["en", "es"])))
                .value("en"),
        )
        .unwrap();
    page.open(id).unwrap();
    let target = control(&page, id);
    page.dispatch(UiEvent::Input {
        target,
        value: "es".into(),
    });
    page.dispatch(UiEvent::Change { target });
    assert_eq!(page.value(id), Some(&FieldValue::text("es")));
    assert_eq!(page.state(id), Some(&FieldState::Closed));
}

#[test]
fn clear_button_empties_the_control() {
    let mut page = Page::new();
    let anchor = add_anchor(&mut page, "abc");
    let mut config = FieldConfig::new(InputKind::Text);
    config.clear_button = true;
    let id = page.attach(anchor, config).unwrap();
    page.open(id).unwrap();
    page.tick();
    let handles = page.control(id).unwrap().clone();
    let clear = handles.clear.unwrap();
    assert!(!page.document().is_hidden(clear));
    page.dispatch(UiEvent::Click { target: clear });
    assert_eq!(page.document().value(handles.control), "");
    assert!(page.document().is_hidden(clear));
}

#[test]
fn relayout_follows_anchor_geometry() {
    let mut page = Page::new();
    let id = text_field(&mut page, "a");
    let anchor = page.document().children(page.document().body())[0];
    page.open(id).unwrap();
    let root = page.container_root(id).unwrap();
    page.document_mut()
        .set_rect(root, Rect::new(0.0, 0.0, 100.0, 50.0));
    page.document_mut()
        .set_rect(anchor, Rect::new(300.0, 400.0, 100.0, 20.0));
    page.relayout();
    assert_eq!(page.document().position(root), Some((350.0, 300.0)));
}

#[test]
fn rich_text_envelope_carries_the_csrf_token() {
    let mut page = Page::new();
    page.set_submission_context(SubmissionContext {
        user: None,
        timestamp: None,
        csrf_token: Some("tok".into()),
    });
    let anchor = add_anchor(&mut page, "");
    let mut config = FieldConfig::new(InputKind::RichText).url("http://localhost/api/save");
    config.html_envelope = true;
    let id = page.attach(anchor, config).unwrap();
    page.open(id).unwrap();
    type_into(&mut page, id, "<p>Hi</p>");
    page.submit(id).unwrap();
    let pending = page.take_pending();
    let value = pending[0].payload.value().unwrap();
    let envelope: serde_json::Value = serde_json::from_str(value).unwrap();
    assert_eq!(
        envelope,
        json!({"content": "<p>Hi</p>", "htmlAllowed": true, "csrf_token": "tok"})
    );
    assert_eq!(pending[0].payload.get("csrf_token"), Some(&json!("tok")));
}
