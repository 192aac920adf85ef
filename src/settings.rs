use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_HEADER_BG: &str = "#0039A6";
pub const DEFAULT_HEADER_FONT: &str = "#FFFFFF";
pub const DEFAULT_BUBBLE_BG: &str = "#0039A6";
pub const DEFAULT_FOCUS_COLOR: &str = "#FF0000";
pub const DEFAULT_HEADER_TEXT: &str = "Agent Pounce";
pub const DEFAULT_PLACEHOLDER: &str = "How can I help you?";
pub const DEFAULT_BODY_TEXT: &str =
    "👋 Hi! I’m Agent Pounce, your grad-admissions guru. Ask me anything…";
pub const DEFAULT_ICON: &str = "💬";
pub const DEFAULT_ANIMATION_SECS: f64 = 0.35;
pub const DEFAULT_ANIMATION_REPEAT: u32 = 1;
pub const CORNER_OFFSET: &str = "24px";

/// Partial widget options as supplied by the host page or the deployment.
///
/// Deserializes from any value: fields of an unexpected type are dropped rather than rejected,
/// so a malformed host object degrades to defaults instead of failing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", rename_all = "camelCase")]
pub struct WidgetConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header_bg: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header_font: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bg_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub focus_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shape: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub animation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub animation_duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub animation_count: Option<Repeat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude_paths: Option<Vec<String>>,
}

impl From<Value> for WidgetConfig {
    fn from(value: Value) -> Self {
        let field = |name: &str| value.get(name);
        let text = |name: &str| field(name).and_then(non_empty_str);
        Self {
            header_bg: text("headerBg"),
            header_font: text("headerFont"),
            bg_color: text("bgColor"),
            focus_color: text("focusColor"),
            header_text: text("headerText"),
            placeholder: text("placeholder"),
            body_text: text("bodyText"),
            position: text("position"),
            shape: text("shape"),
            animation: text("animation"),
            animation_duration: field("animationDuration")
                .and_then(number)
                .filter(|secs| secs.is_finite() && *secs > 0.0),
            animation_count: field("animationCount").and_then(Repeat::from_value),
            icon: text("icon"),
            icon_image: text("iconImage"),
            avatar: text("avatar"),
            exclude_paths: field("excludePaths").and_then(|v| v.as_array()).map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.as_str().map(str::to_string))
                    .collect()
            }),
        }
    }
}

fn non_empty_str(value: &Value) -> Option<String> {
    value
        .as_str()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

impl WidgetConfig {
    /// Layers `self` over `base`; every option set here wins.
    pub fn merged_over(&self, base: &WidgetConfig) -> WidgetConfig {
        macro_rules! pick {
            ($($field:ident),* $(,)?) => {
                WidgetConfig {
                    $($field: self.$field.clone().or_else(|| base.$field.clone()),)*
                }
            };
        }
        pick!(
            header_bg,
            header_font,
            bg_color,
            focus_color,
            header_text,
            placeholder,
            body_text,
            position,
            shape,
            animation,
            animation_duration,
            animation_count,
            icon,
            icon_image,
            avatar,
            exclude_paths,
        )
    }
}

/// Animation iteration count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repeat {
    Times(u32),
    Infinite,
}

impl Serialize for Repeat {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Repeat::Times(n) => serializer.serialize_u32(*n),
            Repeat::Infinite => serializer.serialize_str("infinite"),
        }
    }
}

impl Repeat {
    fn from_value(value: &Value) -> Option<Self> {
        if value.as_str().map(str::trim) == Some("infinite") {
            return Some(Repeat::Infinite);
        }
        let n = number(value)?;
        if n.is_finite() && n >= 1.0 && n <= u32::MAX as f64 {
            Some(Repeat::Times(n as u32))
        } else {
            None
        }
    }
}

impl std::fmt::Display for Repeat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Repeat::Times(n) => write!(f, "{n}"),
            Repeat::Infinite => f.write_str("infinite"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Vertical {
    Top,
    Bottom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Horizontal {
    Left,
    Right,
}

/// Screen corner the widget is anchored to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Corner {
    pub vertical: Vertical,
    pub horizontal: Horizontal,
}

impl Corner {
    pub fn from_position(position: Option<&str>) -> Self {
        let position = position.unwrap_or_default();
        Self {
            vertical: if position.starts_with("bottom") {
                Vertical::Bottom
            } else {
                Vertical::Top
            },
            horizontal: if position.ends_with("left") {
                Horizontal::Left
            } else {
                Horizontal::Right
            },
        }
    }

    pub fn vertical_property(&self) -> &'static str {
        match self.vertical {
            Vertical::Top => "top",
            Vertical::Bottom => "bottom",
        }
    }

    pub fn horizontal_property(&self) -> &'static str {
        match self.horizontal {
            Horizontal::Left => "left",
            Horizontal::Right => "right",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BubbleShape {
    Circle,
    Tab,
}

impl BubbleShape {
    fn from_option(shape: Option<&str>) -> Self {
        match shape {
            Some("tab") => BubbleShape::Tab,
            _ => BubbleShape::Circle,
        }
    }

    pub fn class_name(&self) -> &'static str {
        match self {
            BubbleShape::Circle => "circle",
            BubbleShape::Tab => "tab",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnimationKind {
    Bounce,
    Slide,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Animation {
    pub kind: AnimationKind,
    pub duration_secs: f64,
    pub repeat: Repeat,
}

impl Animation {
    /// CSS `animation` shorthand for the popup.
    pub fn css(&self) -> String {
        let name = match self.kind {
            AnimationKind::Bounce => "pounce-bounce",
            AnimationKind::Slide => "pounce-slide",
            AnimationKind::None => return "none".to_string(),
        };
        format!("{name} {}s ease {}", self.duration_secs, self.repeat)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum BubbleIcon {
    Image(String),
    Glyph(String),
}

/// Ordered path substrings on which the widget stays off.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExclusionList(pub Vec<String>);

impl ExclusionList {
    pub fn matches(&self, path: &str) -> bool {
        self.0
            .iter()
            .any(|needle| path.contains(needle.as_str()))
    }
}

/// Fully resolved widget settings; every themeable value is concrete.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WidgetSettings {
    pub header_bg: String,
    pub header_font: String,
    pub bubble_bg: String,
    pub focus_color: String,
    pub header_text: String,
    pub placeholder: String,
    pub body_text: String,
    pub corner: Corner,
    pub shape: BubbleShape,
    pub animation: Animation,
    pub icon: BubbleIcon,
    pub avatar: Option<String>,
    pub exclusions: ExclusionList,
}

impl WidgetSettings {
    pub fn resolve(config: &WidgetConfig) -> Self {
        let or = |value: &Option<String>, default: &str| {
            value
                .as_deref()
                .filter(|v| !v.is_empty())
                .unwrap_or(default)
                .to_string()
        };
        let animation_kind = match config.animation.as_deref() {
            Some("slide") => AnimationKind::Slide,
            Some("none") => AnimationKind::None,
            _ => AnimationKind::Bounce,
        };
        let icon = match config.icon_image.as_deref().filter(|url| !url.is_empty()) {
            Some(url) => BubbleIcon::Image(url.to_string()),
            None => BubbleIcon::Glyph(or(&config.icon, DEFAULT_ICON)),
        };
        Self {
            header_bg: or(&config.header_bg, DEFAULT_HEADER_BG),
            header_font: or(&config.header_font, DEFAULT_HEADER_FONT),
            bubble_bg: or(&config.bg_color, DEFAULT_BUBBLE_BG),
            focus_color: or(&config.focus_color, DEFAULT_FOCUS_COLOR),
            header_text: or(&config.header_text, DEFAULT_HEADER_TEXT),
            placeholder: or(&config.placeholder, DEFAULT_PLACEHOLDER),
            body_text: or(&config.body_text, DEFAULT_BODY_TEXT),
            corner: Corner::from_position(config.position.as_deref()),
            shape: BubbleShape::from_option(config.shape.as_deref()),
            animation: Animation {
                kind: animation_kind,
                duration_secs: config
                    .animation_duration
                    .filter(|secs| secs.is_finite() && *secs > 0.0)
                    .unwrap_or(DEFAULT_ANIMATION_SECS),
                repeat: config
                    .animation_count
                    .filter(|r| *r != Repeat::Times(0))
                    .unwrap_or(Repeat::Times(DEFAULT_ANIMATION_REPEAT)),
            },
            icon,
            avatar: config.avatar.clone().filter(|a| !a.is_empty()),
            exclusions: ExclusionList(config.exclude_paths.clone().unwrap_or_default()),
        }
    }

    /// Page-level CSS custom properties the stylesheet reads.
    pub fn theme_variables(&self) -> Vec<(&'static str, String)> {
        vec![
            ("--pounce-header-bg", self.header_bg.clone()),
            ("--pounce-header-font", self.header_font.clone()),
            ("--pounce-bubble-bg", self.bubble_bg.clone()),
            ("--pounce-focus", self.focus_color.clone()),
        ]
    }
}

impl Default for WidgetSettings {
    fn default() -> Self {
        Self::resolve(&WidgetConfig::default())
    }
}
