//! Pure value conversions per input kind.
//!
//! Display, wire, and parse forms never touch the document; the control-side
//! conversions live in `render`.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use super::source::{label_for, SourceOption};
use super::InputKind;
use crate::constants::PASSWORD_MASK;
use crate::models::value::format_number;
use crate::models::FieldValue;
use crate::sanitize::Sanitizer;

pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d";
pub(crate) const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M";
pub(crate) const DATETIME_CONTROL_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Everything a conversion may consult besides the value itself.
#[derive(Clone, Copy)]
pub struct ConvertContext<'a> {
    pub kind: InputKind,
    pub options: &'a [SourceOption],
    pub sanitizer: &'a Sanitizer,
}

/// What the anchor shows for a committed value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayContent {
    Text(String),
    /// Already sanitized.
    Markup(String),
}

impl DisplayContent {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(text) | Self::Markup(text) => text.trim().is_empty(),
        }
    }
}

pub(crate) fn text_display(value: &FieldValue, ctx: &ConvertContext<'_>) -> DisplayContent {
    if ctx.kind == InputKind::Password {
        let shown = if value.to_plain_string().is_empty() {
            String::new()
        } else {
            PASSWORD_MASK.to_string()
        };
        return DisplayContent::Text(shown);
    }
    DisplayContent::Text(value.to_plain_string())
}

pub(crate) fn text_wire(value: &FieldValue, _ctx: &ConvertContext<'_>) -> String {
    value.to_plain_string()
}

pub(crate) fn text_parse(raw: &str, _ctx: &ConvertContext<'_>) -> FieldValue {
    FieldValue::text(raw)
}

pub(crate) fn rich_display(value: &FieldValue, ctx: &ConvertContext<'_>) -> DisplayContent {
    DisplayContent::Markup(ctx.sanitizer.sanitize(&value.to_plain_string()))
}

pub(crate) fn rich_wire(value: &FieldValue, ctx: &ConvertContext<'_>) -> String {
    ctx.sanitizer.sanitize(&value.to_plain_string())
}

pub(crate) fn rich_parse(raw: &str, ctx: &ConvertContext<'_>) -> FieldValue {
    FieldValue::Text(ctx.sanitizer.sanitize(raw))
}

pub(crate) fn select_display(value: &FieldValue, ctx: &ConvertContext<'_>) -> DisplayContent {
    let raw = value.to_plain_string();
    let shown = label_for(ctx.options, &raw)
        .map(str::to_string)
        .unwrap_or(raw);
    DisplayContent::Text(shown)
}

pub(crate) fn select_parse(raw: &str, _ctx: &ConvertContext<'_>) -> FieldValue {
    if raw.is_empty() {
        FieldValue::Null
    } else {
        FieldValue::text(raw)
    }
}

pub(crate) fn multi_display(value: &FieldValue, ctx: &ConvertContext<'_>) -> DisplayContent {
    let labels: Vec<String> = value
        .to_list()
        .into_iter()
        .map(|item| {
            label_for(ctx.options, &item)
                .map(str::to_string)
                .unwrap_or(item)
        })
        .collect();
    DisplayContent::Text(labels.join(", "))
}

pub(crate) fn multi_wire(value: &FieldValue, _ctx: &ConvertContext<'_>) -> String {
    value.to_list().join(",")
}

pub(crate) fn multi_parse(raw: &str, _ctx: &ConvertContext<'_>) -> FieldValue {
    FieldValue::List(
        raw.split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect(),
    )
}

fn date_pattern(kind: InputKind) -> &'static str {
    if kind == InputKind::DateTime {
        DATETIME_FORMAT
    } else {
        DATE_FORMAT
    }
}

pub(crate) fn date_display(value: &FieldValue, ctx: &ConvertContext<'_>) -> DisplayContent {
    DisplayContent::Text(date_wire(value, ctx))
}

pub(crate) fn date_wire(value: &FieldValue, ctx: &ConvertContext<'_>) -> String {
    as_timestamp(value)
        .map(|ts| ts.format(date_pattern(ctx.kind)).to_string())
        .unwrap_or_default()
}

pub(crate) fn date_parse(raw: &str, _ctx: &ConvertContext<'_>) -> FieldValue {
    parse_timestamp(raw)
        .map(FieldValue::Timestamp)
        .unwrap_or(FieldValue::Null)
}

pub(crate) fn number_display(value: &FieldValue, ctx: &ConvertContext<'_>) -> DisplayContent {
    DisplayContent::Text(number_wire(value, ctx))
}

pub(crate) fn number_wire(value: &FieldValue, _ctx: &ConvertContext<'_>) -> String {
    as_number(value).map(format_number).unwrap_or_default()
}

pub(crate) fn number_parse(raw: &str, _ctx: &ConvertContext<'_>) -> FieldValue {
    parse_number(raw)
        .map(FieldValue::Number)
        .unwrap_or(FieldValue::Null)
}

/// Finite number from trimmed text; anything else is `None`.
pub fn parse_number(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|number| number.is_finite())
}

pub(crate) fn as_number(value: &FieldValue) -> Option<f64> {
    match value {
        FieldValue::Number(number) if number.is_finite() => Some(*number),
        FieldValue::Text(text) => parse_number(text),
        _ => None,
    }
}

pub(crate) fn as_timestamp(value: &FieldValue) -> Option<NaiveDateTime> {
    match value {
        FieldValue::Timestamp(ts) => Some(*ts),
        FieldValue::Text(text) => parse_timestamp(text),
        _ => None,
    }
}

/// Parse the date and date-time shapes the inputs and endpoints produce.
///
/// Offsets in RFC 3339 input are dropped and the wall-clock time kept.
/// Date-only input lands at midnight.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(with_offset) = DateTime::parse_from_rfc3339(raw) {
        return Some(with_offset.naive_local());
    }
    for pattern in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        DATETIME_CONTROL_FORMAT,
        DATETIME_FORMAT,
    ] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, pattern) {
            return Some(ts);
        }
    }
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}
