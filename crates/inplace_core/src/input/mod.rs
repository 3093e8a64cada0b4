//! Input family: one closed set of kinds dispatched through a capability table.

/// Display, wire, and parse conversions.
pub mod convert;
/// Control rendering and control-side conversions.
pub mod render;
/// Option sources and normalization.
pub mod source;

use crate::config::FieldConfig;
use crate::document::{Document, NodeId};
use crate::listeners::{Disposer, Effect, KeyChord, ListenerRegistry, Trigger};
use crate::models::{FieldId, FieldValue};
use crate::sanitize::Sanitizer;

pub use convert::{ConvertContext, DisplayContent};
pub use render::ControlHandles;
pub use source::{OptionSource, SourceOption};

use render::RenderOptions;

/// Every supported input kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputKind {
    Text,
    Password,
    Email,
    Url,
    Tel,
    RichText,
    Select,
    MultiSelect,
    Date,
    DateTime,
    Number,
    Range,
}

impl InputKind {
    /// Resolve a `type` attribute value.
    pub fn from_type_name(name: &str) -> Option<Self> {
        let kind = match name.trim().to_ascii_lowercase().as_str() {
            "text" => Self::Text,
            "password" => Self::Password,
            "email" => Self::Email,
            "url" => Self::Url,
            "tel" => Self::Tel,
            "textarea" | "richtext" | "html" | "wysiwyg" => Self::RichText,
            "select" => Self::Select,
            "checklist" | "multiselect" => Self::MultiSelect,
            "date" => Self::Date,
            "datetime" | "datetime-local" => Self::DateTime,
            "number" => Self::Number,
            "range" => Self::Range,
            _ => return None,
        };
        Some(kind)
    }

    pub fn type_name(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Password => "password",
            Self::Email => "email",
            Self::Url => "url",
            Self::Tel => "tel",
            Self::RichText => "richtext",
            Self::Select => "select",
            Self::MultiSelect => "checklist",
            Self::Date => "date",
            Self::DateTime => "datetime",
            Self::Number => "number",
            Self::Range => "range",
        }
    }

    /// Kinds whose options come from an [`OptionSource`].
    pub fn uses_options(self) -> bool {
        matches!(self, Self::Select | Self::MultiSelect)
    }
}

/// Interaction that submits without a button press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoSubmit {
    None,
    Enter,
    ModifierEnter,
    Change,
}

type RenderFn = fn(&mut Document, &RenderOptions<'_>) -> ControlHandles;
type ToControlFn = fn(&mut Document, &ControlHandles, &FieldValue, &ConvertContext<'_>);
type FromControlFn = fn(&Document, &ControlHandles, &ConvertContext<'_>) -> FieldValue;
type DisplayFn = fn(&FieldValue, &ConvertContext<'_>) -> DisplayContent;
type WireFn = fn(&FieldValue, &ConvertContext<'_>) -> String;
type ParseFn = fn(&str, &ConvertContext<'_>) -> FieldValue;

struct Capabilities {
    render: RenderFn,
    to_control: ToControlFn,
    from_control: FromControlFn,
    to_display: DisplayFn,
    to_wire: WireFn,
    parse: ParseFn,
    autosubmit: AutoSubmit,
}

static TEXT_LIKE: Capabilities = Capabilities {
    render: render::render_text,
    to_control: render::text_to_control,
    from_control: render::text_from_control,
    to_display: convert::text_display,
    to_wire: convert::text_wire,
    parse: convert::text_parse,
    autosubmit: AutoSubmit::Enter,
};

static RICH_TEXT: Capabilities = Capabilities {
    render: render::render_rich,
    to_control: render::rich_to_control,
    from_control: render::rich_from_control,
    to_display: convert::rich_display,
    to_wire: convert::rich_wire,
    parse: convert::rich_parse,
    autosubmit: AutoSubmit::ModifierEnter,
};

static SELECT: Capabilities = Capabilities {
    render: render::render_select,
    to_control: render::select_to_control,
    from_control: render::select_from_control,
    to_display: convert::select_display,
    to_wire: convert::text_wire,
    parse: convert::select_parse,
    autosubmit: AutoSubmit::Change,
};

static MULTI_SELECT: Capabilities = Capabilities {
    render: render::render_multi,
    to_control: render::multi_to_control,
    from_control: render::multi_from_control,
    to_display: convert::multi_display,
    to_wire: convert::multi_wire,
    parse: convert::multi_parse,
    autosubmit: AutoSubmit::None,
};

static DATE: Capabilities = Capabilities {
    render: render::render_date,
    to_control: render::date_to_control,
    from_control: render::date_from_control,
    to_display: convert::date_display,
    to_wire: convert::date_wire,
    parse: convert::date_parse,
    autosubmit: AutoSubmit::Change,
};

static NUMBER: Capabilities = Capabilities {
    render: render::render_number,
    to_control: render::number_to_control,
    from_control: render::number_from_control,
    to_display: convert::number_display,
    to_wire: convert::number_wire,
    parse: convert::number_parse,
    autosubmit: AutoSubmit::Enter,
};

static RANGE: Capabilities = Capabilities {
    render: render::render_range,
    to_control: render::number_to_control,
    from_control: render::number_from_control,
    to_display: convert::number_display,
    to_wire: convert::number_wire,
    parse: convert::number_parse,
    autosubmit: AutoSubmit::Change,
};

fn capabilities(kind: InputKind) -> &'static Capabilities {
    match kind {
        InputKind::Text
        | InputKind::Password
        | InputKind::Email
        | InputKind::Url
        | InputKind::Tel => &TEXT_LIKE,
        InputKind::RichText => &RICH_TEXT,
        InputKind::Select => &SELECT,
        InputKind::MultiSelect => &MULTI_SELECT,
        InputKind::Date | InputKind::DateTime => &DATE,
        InputKind::Number => &NUMBER,
        InputKind::Range => &RANGE,
    }
}

/// A field's input: kind-specific conversions plus the rendered control.
#[derive(Debug)]
pub struct Input {
    kind: InputKind,
    sanitizer: Sanitizer,
    options: Vec<SourceOption>,
    placeholder: Option<String>,
    min: Option<f64>,
    max: Option<f64>,
    step: Option<f64>,
    rows: Option<u32>,
    clear_button: bool,
    handles: Option<ControlHandles>,
    disposers: Vec<Disposer>,
}

impl Input {
    pub fn new(config: &FieldConfig) -> Self {
        let rows = match config.kind {
            InputKind::RichText => config
                .rows
                .or(Some(crate::constants::DEFAULT_RICH_TEXT_ROWS)),
            _ => config.rows,
        };
        Self {
            kind: config.kind,
            sanitizer: Sanitizer::new(config.sanitizer.clone()),
            options: Vec::new(),
            placeholder: config.placeholder.clone(),
            min: config.min,
            max: config.max,
            step: config.step,
            rows,
            clear_button: config.clear_button && config.kind == InputKind::Text,
            handles: None,
            disposers: Vec::new(),
        }
    }

    pub fn kind(&self) -> InputKind {
        self.kind
    }

    pub fn options(&self) -> &[SourceOption] {
        &self.options
    }

    pub fn sanitizer(&self) -> &Sanitizer {
        &self.sanitizer
    }

    pub fn handles(&self) -> Option<&ControlHandles> {
        self.handles.as_ref()
    }

    pub fn autosubmit(&self) -> AutoSubmit {
        capabilities(self.kind).autosubmit
    }

    fn ctx(&self) -> ConvertContext<'_> {
        ConvertContext {
            kind: self.kind,
            options: &self.options,
            sanitizer: &self.sanitizer,
        }
    }

    /// Replace the option list, rebuilding a rendered control and
    /// re-applying `current` to it.
    pub fn set_options(&mut self, doc: &mut Document, options: Vec<SourceOption>, current: &FieldValue) {
        self.options = options;
        let Some(mut handles) = self.handles.take() else {
            return;
        };
        match self.kind {
            InputKind::Select => render::rebuild_select(doc, &mut handles, &self.options),
            InputKind::MultiSelect => render::rebuild_checklist(doc, &mut handles, &self.options),
            _ => {}
        }
        self.handles = Some(handles);
        self.to_control(doc, current);
    }

    /// Build the control subtree.
    ///
    /// # Returns
    /// The detached wrapper node to place in a form.
    pub fn render(&mut self, doc: &mut Document) -> NodeId {
        let opts = RenderOptions {
            kind: self.kind,
            placeholder: self.placeholder.as_deref(),
            min: self.min,
            max: self.max,
            step: self.step,
            rows: self.rows,
            clear_button: self.clear_button,
            options: &self.options,
        };
        let handles = (capabilities(self.kind).render)(doc, &opts);
        let root = handles.root;
        self.handles = Some(handles);
        root
    }

    /// Install the control's own listeners.
    ///
    /// # Arguments
    /// - `auto_submit`: Wire the kind's auto-submit trigger.
    /// - `blur_submit`: Also submit text-like controls on blur.
    pub fn wire(
        &mut self,
        listeners: &mut ListenerRegistry,
        owner: FieldId,
        auto_submit: bool,
        blur_submit: bool,
    ) {
        let Some(handles) = self.handles.as_ref() else {
            return;
        };
        let control = handles.control;
        let mut installed = Vec::new();
        if let Some(output) = handles.output {
            installed.push(listeners.register(
                owner,
                Trigger::ControlInput { node: control },
                Effect::MirrorRange { output },
            ));
        }
        if let Some(clear) = handles.clear {
            installed.push(listeners.register(
                owner,
                Trigger::ControlInput { node: control },
                Effect::SyncClear { clear },
            ));
            installed.push(listeners.register(
                owner,
                Trigger::Click { node: clear },
                Effect::ClearControl { control, clear },
            ));
        }
        if self.kind == InputKind::RichText {
            installed.push(listeners.register(
                owner,
                Trigger::ControlInput { node: control },
                Effect::SanitizeMarkup,
            ));
        }
        if auto_submit {
            match self.autosubmit() {
                AutoSubmit::Enter => {
                    installed.push(listeners.register(
                        owner,
                        Trigger::ControlKey {
                            node: control,
                            chord: KeyChord::Enter,
                        },
                        Effect::Submit,
                    ));
                    if blur_submit {
                        installed.push(listeners.register(
                            owner,
                            Trigger::ControlBlur { node: control },
                            Effect::ScheduleBlurSubmit,
                        ));
                    }
                }
                AutoSubmit::ModifierEnter => installed.push(listeners.register(
                    owner,
                    Trigger::ControlKey {
                        node: control,
                        chord: KeyChord::ModifierEnter,
                    },
                    Effect::Submit,
                )),
                AutoSubmit::Change => installed.push(listeners.register(
                    owner,
                    Trigger::ControlChange { node: control },
                    Effect::Submit,
                )),
                AutoSubmit::None => {}
            }
        }
        self.disposers.extend(installed);
    }

    /// Drop listeners and forget the rendered control.
    pub fn unmount(&mut self, listeners: &mut ListenerRegistry) {
        listeners.dispose_all(&mut self.disposers);
        self.handles = None;
    }

    /// Focus the control.
    pub fn activate(&self, doc: &mut Document) -> bool {
        match &self.handles {
            Some(handles) => {
                let focused = doc.focus(handles.control);
                if let Some(clear) = handles.clear {
                    render::sync_clear(doc, handles.control, clear);
                }
                focused
            }
            None => false,
        }
    }

    pub fn to_control(&self, doc: &mut Document, value: &FieldValue) {
        if let Some(handles) = &self.handles {
            (capabilities(self.kind).to_control)(doc, handles, value, &self.ctx());
        }
    }

    /// Read the control; an unrendered input reads as null.
    pub fn from_control(&self, doc: &Document) -> FieldValue {
        match &self.handles {
            Some(handles) => (capabilities(self.kind).from_control)(doc, handles, &self.ctx()),
            None => FieldValue::Null,
        }
    }

    pub fn to_display(&self, value: &FieldValue) -> DisplayContent {
        (capabilities(self.kind).to_display)(value, &self.ctx())
    }

    pub fn to_wire(&self, value: &FieldValue) -> String {
        (capabilities(self.kind).to_wire)(value, &self.ctx())
    }

    pub fn parse(&self, raw: &str) -> FieldValue {
        (capabilities(self.kind).parse)(raw, &self.ctx())
    }

    /// Bring a configured value into the typed form the control reads back.
    ///
    /// Values already in this kind's shape are kept; anything else goes
    /// through [`Input::parse`] via its plain string form.
    pub fn canonicalize(&self, value: &FieldValue) -> FieldValue {
        match (self.kind, value) {
            (_, FieldValue::Null) => FieldValue::Null,
            (InputKind::MultiSelect, FieldValue::List(_))
            | (InputKind::Number | InputKind::Range, FieldValue::Number(_))
            | (InputKind::Date | InputKind::DateTime, FieldValue::Timestamp(_)) => value.clone(),
            (_, other) => self.parse(&other.to_plain_string()),
        }
    }

    /// Whether Enter inside `node` inserts a line instead of submitting.
    pub fn is_multiline_target(&self, doc: &Document, node: NodeId) -> bool {
        match (&self.handles, self.kind) {
            (Some(handles), InputKind::RichText) => doc.contains(handles.control, node),
            _ => false,
        }
    }
}
