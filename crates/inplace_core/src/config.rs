//! Per-field configuration and attribute parsing.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::constants::DEFAULT_EMPTY_TEXT;
use crate::error::SubmitFailure;
use crate::input::source::OptionSource;
use crate::input::InputKind;
use crate::models::{FieldValue, ServerResponse};
use crate::sanitize::SanitizerPolicy;

/// How the editing surface is presented.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    /// Floating panel anchored next to the element.
    #[default]
    Floating,
    /// The anchor is swapped for the form in place.
    Inline,
}

/// Side of the anchor a floating panel prefers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Placement {
    #[default]
    Top,
    Bottom,
    Left,
    Right,
}

impl Placement {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::Bottom => "bottom",
            Self::Left => "left",
            Self::Right => "right",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "top" => Some(Self::Top),
            "bottom" => Some(Self::Bottom),
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            _ => None,
        }
    }
}

/// What a pointer interaction outside an open field does.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OnBlur {
    #[default]
    Cancel,
    Submit,
    Ignore,
}

/// Which anchor interaction opens the field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Toggle {
    #[default]
    Click,
    Hover,
    /// Only explicit `open`/`toggle` calls.
    Manual,
}

/// Outcome of the success hook.
#[derive(Debug, Clone, PartialEq)]
pub enum SuccessVerdict {
    /// Commit and close.
    Accept,
    /// Keep the form open without committing.
    KeepOpen,
    /// Treat as failure and show the message.
    Reject(String),
    /// Commit this value instead.
    Replace(FieldValue),
}

pub type Validator = Arc<dyn Fn(&FieldValue) -> Option<String> + Send + Sync>;
pub type DisplayHook = Arc<dyn Fn(&FieldValue) -> String + Send + Sync>;
pub type SuccessHook = Arc<dyn Fn(&ServerResponse, &FieldValue) -> SuccessVerdict + Send + Sync>;
pub type ErrorHook = Arc<dyn Fn(&SubmitFailure) -> Option<String> + Send + Sync>;

/// Record key sent as `pk`.
#[derive(Clone)]
pub enum PrimaryKey {
    Value(Value),
    /// Evaluated once per submission.
    Computed(Arc<dyn Fn() -> Value + Send + Sync>),
}

impl Default for PrimaryKey {
    fn default() -> Self {
        Self::Value(Value::Null)
    }
}

impl PrimaryKey {
    pub fn resolve(&self) -> Value {
        match self {
            Self::Value(value) => value.clone(),
            Self::Computed(compute) => compute(),
        }
    }
}

impl fmt::Debug for PrimaryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

/// Extra payload entries, merged over `{name, value, pk}`.
#[derive(Clone)]
pub enum Params {
    Static(Map<String, Value>),
    /// Receives the base payload and returns the entries to merge.
    Computed(Arc<dyn Fn(&Map<String, Value>) -> Map<String, Value> + Send + Sync>),
}

impl Default for Params {
    fn default() -> Self {
        Self::Static(Map::new())
    }
}

impl fmt::Debug for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(map) => f.debug_tuple("Static").field(map).finish(),
            Self::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

/// Options for one editable field.
///
/// Hooks are shared closures so configs stay cheap to clone.
#[derive(Clone)]
pub struct FieldConfig {
    pub kind: InputKind,
    pub pk: PrimaryKey,
    /// Falls back to the anchor's `id` attribute.
    pub name: Option<String>,
    /// Without a URL, submissions commit locally.
    pub url: Option<String>,
    /// Falls back to the anchor's text parsed for the kind.
    pub value: Option<FieldValue>,
    pub source: Option<OptionSource>,
    pub mode: Mode,
    pub placement: Placement,
    pub title: Option<String>,
    pub show_buttons: bool,
    pub on_blur: OnBlur,
    pub toggle: Toggle,
    pub enable_escape: bool,
    pub enable_enter: bool,
    /// Wire the kind's auto-submit trigger when buttons are hidden.
    pub auto_submit: bool,
    /// Submit even when the value did not change.
    pub save_nochange: bool,
    pub disabled: bool,
    pub empty_text: String,
    pub placeholder: Option<String>,
    pub clear_button: bool,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub step: Option<f64>,
    pub rows: Option<u32>,
    pub params: Params,
    /// Send rich text as a JSON envelope instead of bare markup.
    pub html_envelope: bool,
    pub sanitizer: SanitizerPolicy,
    pub validate: Option<Validator>,
    pub display: Option<DisplayHook>,
    pub success: Option<SuccessHook>,
    pub error: Option<ErrorHook>,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self::new(InputKind::Text)
    }
}

impl fmt::Debug for FieldConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldConfig")
            .field("kind", &self.kind)
            .field("pk", &self.pk)
            .field("name", &self.name)
            .field("url", &self.url)
            .field("value", &self.value)
            .field("source", &self.source)
            .field("mode", &self.mode)
            .field("placement", &self.placement)
            .field("show_buttons", &self.show_buttons)
            .field("on_blur", &self.on_blur)
            .field("toggle", &self.toggle)
            .field("auto_submit", &self.auto_submit)
            .field("disabled", &self.disabled)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl FieldConfig {
    pub fn new(kind: InputKind) -> Self {
        Self {
            kind,
            pk: PrimaryKey::default(),
            name: None,
            url: None,
            value: None,
            source: None,
            mode: Mode::default(),
            placement: Placement::default(),
            title: None,
            show_buttons: true,
            on_blur: OnBlur::default(),
            toggle: Toggle::default(),
            enable_escape: true,
            enable_enter: true,
            auto_submit: true,
            save_nochange: false,
            disabled: false,
            empty_text: DEFAULT_EMPTY_TEXT.to_string(),
            placeholder: None,
            clear_button: false,
            min: None,
            max: None,
            step: None,
            rows: None,
            params: Params::default(),
            html_envelope: false,
            sanitizer: SanitizerPolicy::default(),
            validate: None,
            display: None,
            success: None,
            error: None,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn pk(mut self, pk: impl Into<Value>) -> Self {
        self.pk = PrimaryKey::Value(pk.into());
        self
    }

    pub fn pk_with<F>(mut self, compute: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.pk = PrimaryKey::Computed(Arc::new(compute));
        self
    }

    pub fn value(mut self, value: impl Into<FieldValue>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn source(mut self, source: OptionSource) -> Self {
        self.source = Some(source);
        self
    }

    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn placement(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn show_buttons(mut self, show: bool) -> Self {
        self.show_buttons = show;
        self
    }

    pub fn on_blur(mut self, on_blur: OnBlur) -> Self {
        self.on_blur = on_blur;
        self
    }

    pub fn toggle(mut self, toggle: Toggle) -> Self {
        self.toggle = toggle;
        self
    }

    pub fn save_nochange(mut self, save: bool) -> Self {
        self.save_nochange = save;
        self
    }

    pub fn params(mut self, params: Map<String, Value>) -> Self {
        self.params = Params::Static(params);
        self
    }

    pub fn params_with<F>(mut self, compute: F) -> Self
    where
        F: Fn(&Map<String, Value>) -> Map<String, Value> + Send + Sync + 'static,
    {
        self.params = Params::Computed(Arc::new(compute));
        self
    }

    pub fn validate<F>(mut self, validate: F) -> Self
    where
        F: Fn(&FieldValue) -> Option<String> + Send + Sync + 'static,
    {
        self.validate = Some(Arc::new(validate));
        self
    }

    pub fn display<F>(mut self, display: F) -> Self
    where
        F: Fn(&FieldValue) -> String + Send + Sync + 'static,
    {
        self.display = Some(Arc::new(display));
        self
    }

    pub fn on_success<F>(mut self, hook: F) -> Self
    where
        F: Fn(&ServerResponse, &FieldValue) -> SuccessVerdict + Send + Sync + 'static,
    {
        self.success = Some(Arc::new(hook));
        self
    }

    pub fn on_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(&SubmitFailure) -> Option<String> + Send + Sync + 'static,
    {
        self.error = Some(Arc::new(hook));
        self
    }

    /// Build a config from element attributes.
    ///
    /// Keys may carry a `data-` prefix. Recognized keys: `type`, `pk`, `name`,
    /// `url`, `value`, `source`, `mode`, `placement`, `title`, `showbuttons`,
    /// `onblur`, `toggle`, `savenochange`, `disabled`, `emptytext`,
    /// `placeholder`, `clear`, `min`, `max`, `step`, `rows`, `params`,
    /// `htmlenvelope`. JSON-looking values for `pk`, `value`, `source` and
    /// `params` are decoded.
    ///
    /// # Arguments
    /// - `attributes`: Attribute name/value pairs.
    ///
    /// # Returns
    /// The parsed config; unknown keys and unparseable values are ignored.
    pub fn from_attributes<'a, I>(attributes: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let attributes: BTreeMap<String, &str> = attributes
            .into_iter()
            .map(|(key, value)| {
                let key = key.strip_prefix("data-").unwrap_or(key);
                (key.to_ascii_lowercase(), value)
            })
            .collect();
        let get = |key: &str| attributes.get(key).copied();

        let kind = get("type")
            .and_then(InputKind::from_type_name)
            .unwrap_or(InputKind::Text);
        let mut config = Self::new(kind);

        if let Some(pk) = get("pk") {
            config.pk = PrimaryKey::Value(try_parse_json(pk).unwrap_or_else(|| Value::from(pk)));
        }
        config.name = get("name").map(str::to_string);
        config.url = get("url").filter(|url| !url.trim().is_empty()).map(str::to_string);
        if let Some(raw) = get("value") {
            config.value = Some(match try_parse_json(raw) {
                Some(value @ Value::Array(_)) => FieldValue::from_json(&value),
                _ => FieldValue::text(raw),
            });
        }
        if let Some(raw) = get("source") {
            config.source = Some(match try_parse_json(raw) {
                Some(value @ (Value::Array(_) | Value::Object(_))) => OptionSource::Inline(value),
                _ => OptionSource::Url(raw.trim().to_string()),
            });
        }
        if let Some(mode) = get("mode") {
            config.mode = match mode.trim().to_ascii_lowercase().as_str() {
                "inline" => Mode::Inline,
                _ => Mode::Floating,
            };
        }
        if let Some(placement) = get("placement").and_then(Placement::parse) {
            config.placement = placement;
        }
        config.title = get("title").map(str::to_string);
        if let Some(raw) = get("showbuttons") {
            // Position keywords such as "bottom" mean "shown".
            config.show_buttons = parse_env_flag(raw).unwrap_or(true);
        }
        if let Some(raw) = get("onblur") {
            config.on_blur = match raw.trim().to_ascii_lowercase().as_str() {
                "submit" => OnBlur::Submit,
                "ignore" => OnBlur::Ignore,
                _ => OnBlur::Cancel,
            };
        }
        if let Some(raw) = get("toggle") {
            config.toggle = match raw.trim().to_ascii_lowercase().as_str() {
                "hover" | "mouseenter" => Toggle::Hover,
                "manual" => Toggle::Manual,
                _ => Toggle::Click,
            };
        }
        if let Some(flag) = get("savenochange").and_then(parse_env_flag) {
            config.save_nochange = flag;
        }
        if let Some(flag) = get("disabled").and_then(parse_env_flag) {
            config.disabled = flag;
        }
        if let Some(empty) = get("emptytext") {
            config.empty_text = empty.to_string();
        }
        config.placeholder = get("placeholder").map(str::to_string);
        if let Some(flag) = get("clear").and_then(parse_env_flag) {
            config.clear_button = flag;
        }
        config.min = get("min").and_then(|raw| raw.trim().parse().ok());
        config.max = get("max").and_then(|raw| raw.trim().parse().ok());
        config.step = get("step").and_then(|raw| raw.trim().parse().ok());
        config.rows = get("rows").and_then(|raw| raw.trim().parse().ok());
        if let Some(raw) = get("params") {
            match try_parse_json(raw) {
                Some(Value::Object(map)) => config.params = Params::Static(map),
                _ => tracing::warn!("Ignoring params attribute that is not a JSON object"),
            }
        }
        if let Some(flag) = get("htmlenvelope").and_then(parse_env_flag) {
            config.html_envelope = flag;
        }
        config
    }
}

/// Decode a JSON-looking attribute value.
///
/// Arrays and objects are parsed as JSON. `true`, `false` and `null` map to
/// their JSON values, and numbers are decoded only when they print back
/// unchanged, so `"007"` and `"1.50"` stay strings.
fn try_parse_json(raw: &str) -> Option<Value> {
    let trimmed = raw.trim();
    if trimmed.starts_with('[') || trimmed.starts_with('{') {
        return serde_json::from_str(trimmed).ok();
    }
    match trimmed {
        "true" => return Some(Value::Bool(true)),
        "false" => return Some(Value::Bool(false)),
        "null" => return Some(Value::Null),
        _ => {}
    }
    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Number(number)) if number.to_string() == trimmed => Some(Value::Number(number)),
        _ => None,
    }
}

/// Parse a boolean-like flag value.
///
/// # Supported Values
/// - Truthy: `1`, `true`, `yes`, `on`
/// - Falsy: `0`, `false`, `no`, `off`, empty string
///
/// Matching is case-insensitive and ignores surrounding whitespace.
///
/// # Returns
/// `Some(bool)` when the value is recognized, otherwise `None`.
pub fn parse_env_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "" | "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
