//! Control rendering and control-side conversions.

use super::convert::{
    as_number, as_timestamp, date_parse, number_parse, select_parse, ConvertContext,
    DATETIME_CONTROL_FORMAT, DATE_FORMAT,
};
use super::source::SourceOption;
use super::InputKind;
use crate::document::{Document, NodeId};
use crate::models::value::format_number;
use crate::models::FieldValue;

/// Parameters a renderer may use.
pub(crate) struct RenderOptions<'a> {
    pub kind: InputKind,
    pub placeholder: Option<&'a str>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub step: Option<f64>,
    pub rows: Option<u32>,
    pub clear_button: bool,
    pub options: &'a [SourceOption],
}

/// Nodes a rendered input exposes to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlHandles {
    /// Wrapper placed in the form.
    pub root: NodeId,
    /// Element that takes focus and holds the value.
    pub control: NodeId,
    /// One per option for multi-select inputs.
    pub checkboxes: Vec<NodeId>,
    /// Live value mirror for range inputs.
    pub output: Option<NodeId>,
    pub clear: Option<NodeId>,
}

impl ControlHandles {
    fn single(root: NodeId, control: NodeId) -> Self {
        Self {
            root,
            control,
            checkboxes: Vec::new(),
            output: None,
            clear: None,
        }
    }
}

fn wrapper(doc: &mut Document) -> NodeId {
    let root = doc.create_element("div");
    doc.add_class(root, "editable-input");
    root
}

fn input_element(doc: &mut Document, input_type: &str, placeholder: Option<&str>) -> NodeId {
    let control = doc.create_element("input");
    doc.set_attribute(control, "type", input_type);
    doc.add_class(control, "form-control");
    if let Some(placeholder) = placeholder {
        doc.set_attribute(control, "placeholder", placeholder);
    }
    control
}

fn set_bounds(doc: &mut Document, control: NodeId, opts: &RenderOptions<'_>) {
    for (name, bound) in [("min", opts.min), ("max", opts.max), ("step", opts.step)] {
        if let Some(bound) = bound {
            doc.set_attribute(control, name, format_number(bound));
        }
    }
}

pub(crate) fn render_text(doc: &mut Document, opts: &RenderOptions<'_>) -> ControlHandles {
    let root = wrapper(doc);
    let input_type = match opts.kind {
        InputKind::Password => "password",
        InputKind::Email => "email",
        InputKind::Url => "url",
        InputKind::Tel => "tel",
        _ => "text",
    };
    let control = input_element(doc, input_type, opts.placeholder);
    doc.append_child(root, control);
    let mut handles = ControlHandles::single(root, control);
    if opts.clear_button {
        let clear = doc.create_element("span");
        doc.add_class(clear, "editable-clear-x");
        doc.set_text(clear, "\u{00d7}");
        doc.set_hidden(clear, true);
        doc.append_child(root, clear);
        handles.clear = Some(clear);
    }
    handles
}

pub(crate) fn render_rich(doc: &mut Document, opts: &RenderOptions<'_>) -> ControlHandles {
    let root = wrapper(doc);
    let control = doc.create_element("div");
    doc.add_class(control, "editable-rich");
    doc.set_attribute(control, "contenteditable", "true");
    doc.set_attribute(control, "role", "textbox");
    doc.set_attribute(control, "aria-multiline", "true");
    if let Some(rows) = opts.rows {
        doc.set_attribute(control, "data-rows", rows.to_string());
    }
    if let Some(placeholder) = opts.placeholder {
        doc.set_attribute(control, "data-placeholder", placeholder);
    }
    doc.append_child(root, control);
    ControlHandles::single(root, control)
}

pub(crate) fn render_select(doc: &mut Document, opts: &RenderOptions<'_>) -> ControlHandles {
    let root = wrapper(doc);
    let control = doc.create_element("select");
    doc.add_class(control, "form-select");
    doc.append_child(root, control);
    let mut handles = ControlHandles::single(root, control);
    rebuild_select(doc, &mut handles, opts.options);
    handles
}

pub(crate) fn render_multi(doc: &mut Document, opts: &RenderOptions<'_>) -> ControlHandles {
    let root = wrapper(doc);
    doc.add_class(root, "editable-checklist");
    let mut handles = ControlHandles::single(root, root);
    rebuild_checklist(doc, &mut handles, opts.options);
    handles
}

pub(crate) fn render_date(doc: &mut Document, opts: &RenderOptions<'_>) -> ControlHandles {
    let root = wrapper(doc);
    let input_type = if opts.kind == InputKind::DateTime {
        "datetime-local"
    } else {
        "date"
    };
    let control = input_element(doc, input_type, opts.placeholder);
    set_bounds(doc, control, opts);
    doc.append_child(root, control);
    ControlHandles::single(root, control)
}

pub(crate) fn render_number(doc: &mut Document, opts: &RenderOptions<'_>) -> ControlHandles {
    let root = wrapper(doc);
    let control = input_element(doc, "number", opts.placeholder);
    set_bounds(doc, control, opts);
    doc.append_child(root, control);
    ControlHandles::single(root, control)
}

pub(crate) fn render_range(doc: &mut Document, opts: &RenderOptions<'_>) -> ControlHandles {
    let root = wrapper(doc);
    doc.add_class(root, "editable-range");
    let control = input_element(doc, "range", None);
    doc.remove_class(control, "form-control");
    doc.add_class(control, "form-range");
    set_bounds(doc, control, opts);
    let output = doc.create_element("output");
    doc.append_child(root, control);
    doc.append_child(root, output);
    let mut handles = ControlHandles::single(root, control);
    handles.output = Some(output);
    handles
}

/// Replace the `<option>` children of a select control.
pub(crate) fn rebuild_select(doc: &mut Document, handles: &mut ControlHandles, options: &[SourceOption]) {
    doc.clear_children(handles.control);
    for option in options {
        let node = doc.create_element("option");
        doc.set_attribute(node, "value", option.value.as_str());
        doc.set_text(node, option.label.as_str());
        doc.append_child(handles.control, node);
    }
}

/// Replace the checkbox rows of a multi-select control.
pub(crate) fn rebuild_checklist(
    doc: &mut Document,
    handles: &mut ControlHandles,
    options: &[SourceOption],
) {
    doc.clear_children(handles.root);
    handles.checkboxes.clear();
    for option in options {
        let row = doc.create_element("label");
        doc.add_class(row, "form-check");
        let checkbox = doc.create_element("input");
        doc.set_attribute(checkbox, "type", "checkbox");
        doc.set_attribute(checkbox, "value", option.value.as_str());
        let caption = doc.create_element("span");
        doc.set_text(caption, option.label.as_str());
        doc.append_child(row, checkbox);
        doc.append_child(row, caption);
        doc.append_child(handles.root, row);
        handles.checkboxes.push(checkbox);
    }
    handles.control = handles.checkboxes.first().copied().unwrap_or(handles.root);
}

/// Show or hide the clear button to match the control value.
pub(crate) fn sync_clear(doc: &mut Document, control: NodeId, clear: NodeId) {
    let empty = doc.value(control).is_empty();
    doc.set_hidden(clear, empty);
}

/// Mirror a range control's value into its output element.
pub(crate) fn mirror_range(doc: &mut Document, control: NodeId, output: NodeId) {
    let shown = doc.value(control).to_string();
    doc.set_text(output, shown);
}

pub(crate) fn text_to_control(
    doc: &mut Document,
    handles: &ControlHandles,
    value: &FieldValue,
    _ctx: &ConvertContext<'_>,
) {
    doc.set_value(handles.control, value.to_plain_string());
    if let Some(clear) = handles.clear {
        sync_clear(doc, handles.control, clear);
    }
}

pub(crate) fn text_from_control(
    doc: &Document,
    handles: &ControlHandles,
    _ctx: &ConvertContext<'_>,
) -> FieldValue {
    FieldValue::text(doc.value(handles.control))
}

pub(crate) fn rich_to_control(
    doc: &mut Document,
    handles: &ControlHandles,
    value: &FieldValue,
    ctx: &ConvertContext<'_>,
) {
    let clean = ctx.sanitizer.sanitize(&value.to_plain_string());
    doc.set_markup(handles.control, clean);
}

pub(crate) fn rich_from_control(
    doc: &Document,
    handles: &ControlHandles,
    ctx: &ConvertContext<'_>,
) -> FieldValue {
    FieldValue::Text(ctx.sanitizer.sanitize(&doc.inner_markup(handles.control)))
}

pub(crate) fn select_to_control(
    doc: &mut Document,
    handles: &ControlHandles,
    value: &FieldValue,
    ctx: &ConvertContext<'_>,
) {
    let raw = value.to_plain_string();
    let selected = if ctx.options.iter().any(|option| option.value == raw) {
        raw
    } else {
        String::new()
    };
    doc.set_value(handles.control, selected);
}

pub(crate) fn select_from_control(
    doc: &Document,
    handles: &ControlHandles,
    ctx: &ConvertContext<'_>,
) -> FieldValue {
    select_parse(doc.value(handles.control), ctx)
}

pub(crate) fn multi_to_control(
    doc: &mut Document,
    handles: &ControlHandles,
    value: &FieldValue,
    _ctx: &ConvertContext<'_>,
) {
    let selected = value.to_list();
    for checkbox in &handles.checkboxes {
        let checked = doc
            .attribute(*checkbox, "value")
            .map(|v| selected.iter().any(|s| s == v))
            .unwrap_or(false);
        doc.set_checked(*checkbox, checked);
    }
}

pub(crate) fn multi_from_control(
    doc: &Document,
    handles: &ControlHandles,
    _ctx: &ConvertContext<'_>,
) -> FieldValue {
    FieldValue::List(
        handles
            .checkboxes
            .iter()
            .filter(|checkbox| doc.checked(**checkbox))
            .filter_map(|checkbox| doc.attribute(*checkbox, "value"))
            .map(str::to_string)
            .collect(),
    )
}

pub(crate) fn date_to_control(
    doc: &mut Document,
    handles: &ControlHandles,
    value: &FieldValue,
    ctx: &ConvertContext<'_>,
) {
    let pattern = if ctx.kind == InputKind::DateTime {
        DATETIME_CONTROL_FORMAT
    } else {
        DATE_FORMAT
    };
    let shown = as_timestamp(value)
        .map(|ts| ts.format(pattern).to_string())
        .unwrap_or_default();
    doc.set_value(handles.control, shown);
}

pub(crate) fn date_from_control(
    doc: &Document,
    handles: &ControlHandles,
    ctx: &ConvertContext<'_>,
) -> FieldValue {
    date_parse(doc.value(handles.control), ctx)
}

pub(crate) fn number_to_control(
    doc: &mut Document,
    handles: &ControlHandles,
    value: &FieldValue,
    _ctx: &ConvertContext<'_>,
) {
    let shown = as_number(value).map(format_number).unwrap_or_default();
    doc.set_value(handles.control, shown);
    if let Some(output) = handles.output {
        mirror_range(doc, handles.control, output);
    }
}

pub(crate) fn number_from_control(
    doc: &Document,
    handles: &ControlHandles,
    ctx: &ConvertContext<'_>,
) -> FieldValue {
    number_parse(doc.value(handles.control), ctx)
}
