use crate::dom::Element;
use crate::settings::{BubbleIcon, CORNER_OFFSET, WidgetSettings};
use serde::Serialize;
use tracing::debug;

pub const WRAP_CLASS: &str = "pounce-wrap";
pub const BUBBLE_CLASS: &str = "pounce-bubble";
pub const POPUP_CLASS: &str = "pounce-popup";
pub const HEADER_CLASS: &str = "pounce-header";
pub const CLOSE_CLASS: &str = "pounce-close";
pub const LOG_ID: &str = "pounce-log";
pub const FORM_ID: &str = "pounce-form";
pub const INPUT_ID: &str = "pounce-msg";
pub const SEND_ID: &str = "pounce-send";

const USER_MARK: &str = "🧑‍🎓";
const BOT_MARK: &str = "🐾";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WidgetState {
    Collapsed,
    Expanded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Bot,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    pub speaker: Speaker,
    pub text: String,
}

impl LogEntry {
    pub fn display(&self) -> String {
        let mark = match self.speaker {
            Speaker::User => USER_MARK,
            Speaker::Bot => BOT_MARK,
        };
        format!("{mark} {}", self.text)
    }

    pub fn class_name(&self) -> &'static str {
        match self.speaker {
            Speaker::User => "pounce-user",
            Speaker::Bot => "pounce-bot",
        }
    }

    fn to_element(&self) -> Element {
        Element::new("div")
            .class(self.class_name())
            .text(self.display())
    }
}

/// Append-only record of the turns shown in the popup.
#[derive(Debug, Clone, Default)]
pub struct ConversationLog {
    entries: Vec<LogEntry>,
    scrolled_to: usize,
}

impl ConversationLog {
    pub fn push(&mut self, speaker: Speaker, text: impl Into<String>) {
        self.entries.push(LogEntry {
            speaker,
            text: text.into(),
        });
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn last(&self) -> Option<&LogEntry> {
        self.entries.last()
    }

    pub fn scroll_to_end(&mut self) {
        self.scrolled_to = self.entries.len();
    }

    pub fn is_scrolled_to_end(&self) -> bool {
        self.scrolled_to == self.entries.len()
    }
}

/// Bubble plus popup for one page, with its open/close state and conversation.
#[derive(Debug, Clone)]
pub struct Widget {
    settings: WidgetSettings,
    state: WidgetState,
    pub(crate) log: ConversationLog,
    pub(crate) input: String,
}

impl Widget {
    /// Returns `None` when `page_path` hits the exclusion list; nothing is built in that case.
    pub fn build(settings: WidgetSettings, page_path: &str) -> Option<Self> {
        if settings.exclusions.matches(page_path) {
            debug!(%page_path, "page path excluded; widget suppressed");
            return None;
        }
        let mut log = ConversationLog::default();
        log.push(Speaker::Bot, settings.body_text.clone());
        Some(Self {
            settings,
            state: WidgetState::Collapsed,
            log,
            input: String::new(),
        })
    }

    pub fn settings(&self) -> &WidgetSettings {
        &self.settings
    }

    pub fn state(&self) -> WidgetState {
        self.state
    }

    /// Bubble activation.
    pub fn open(&mut self) {
        self.state = WidgetState::Expanded;
    }

    /// Close-control activation.
    pub fn close(&mut self) {
        self.state = WidgetState::Collapsed;
    }

    pub fn bubble_visible(&self) -> bool {
        self.state == WidgetState::Collapsed
    }

    pub fn popup_visible(&self) -> bool {
        self.state == WidgetState::Expanded
    }

    pub fn log(&self) -> &ConversationLog {
        &self.log
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, value: impl Into<String>) {
        self.input = value.into();
    }

    /// Current DOM projection of the widget.
    pub fn tree(&self) -> Element {
        let s = &self.settings;
        let visible = |shown: bool| if shown { "flex" } else { "none" };

        let icon = match &s.icon {
            BubbleIcon::Image(src) => Element::new("img").attr("src", src).attr("alt", "icon"),
            BubbleIcon::Glyph(glyph) => Element::new("span")
                .style("font-size", "28px")
                .style("color", "#fff")
                .text(glyph),
        };
        let bubble = Element::new("div")
            .class(BUBBLE_CLASS)
            .class(s.shape.class_name())
            .style("display", visible(self.bubble_visible()))
            .child(icon);

        let mut header = Element::new("div")
            .class(HEADER_CLASS)
            .child(Element::new("span").text(&s.header_text))
            .child(
                Element::new("button")
                    .class(CLOSE_CLASS)
                    .attr("aria-label", "Close")
                    .text("×"),
            );
        if let Some(avatar) = &s.avatar {
            header.prepend_child(
                Element::new("img")
                    .attr("src", avatar)
                    .attr("alt", "avatar")
                    .style("width", "28px")
                    .style("height", "28px")
                    .style("margin-right", "6px")
                    .style("border-radius", "50%"),
            );
        }

        let mut log = Element::new("div").id(LOG_ID);
        for entry in self.log.entries() {
            log.push_child(entry.to_element());
        }
        if self.log.is_scrolled_to_end() {
            log.set_attr("data-scroll", "end");
        }
        let form = Element::new("form")
            .id(FORM_ID)
            .child(
                Element::new("input")
                    .id(INPUT_ID)
                    .attr("placeholder", &s.placeholder)
                    .attr("value", &self.input),
            )
            .child(Element::new("button").id(SEND_ID).text("Send"));
        let body = Element::new("div")
            .style("flex", "1")
            .style("display", "flex")
            .style("flex-direction", "column")
            .child(log)
            .child(form);

        let popup = Element::new("div")
            .class(POPUP_CLASS)
            .style("animation", s.animation.css())
            .style("display", visible(self.popup_visible()))
            .child(header)
            .child(body);

        Element::new("div")
            .class(WRAP_CLASS)
            .style(s.corner.vertical_property(), CORNER_OFFSET)
            .style(s.corner.horizontal_property(), CORNER_OFFSET)
            .child(bubble)
            .child(popup)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::WidgetConfig;
    use serde_json::json;

    fn widget(config: serde_json::Value) -> Widget {
        let config: WidgetConfig = serde_json::from_value(config).unwrap();
        Widget::build(WidgetSettings::resolve(&config), "/apply").expect("not excluded")
    }

    fn display_of(tree: &Element, class: &str) -> String {
        tree.find_by_class(class)
            .and_then(|el| el.style_value("display"))
            .unwrap_or_default()
            .to_string()
    }

    #[test]
    fn starts_collapsed_with_greeting() {
        let w = widget(json!({}));
        assert_eq!(w.state(), WidgetState::Collapsed);
        assert_eq!(w.log().len(), 1);
        let greeting = &w.log().entries()[0];
        assert_eq!(greeting.speaker, Speaker::Bot);
        assert_eq!(greeting.text, crate::settings::DEFAULT_BODY_TEXT);

        let tree = w.tree();
        let log = tree.find_by_id(LOG_ID).unwrap();
        assert_eq!(
            log.text_content(),
            format!("🐾 {}", crate::settings::DEFAULT_BODY_TEXT)
        );
    }

    #[test]
    fn open_and_close_toggle_exactly_one_element() {
        let mut w = widget(json!({}));
        let tree = w.tree();
        assert_eq!(display_of(&tree, BUBBLE_CLASS), "flex");
        assert_eq!(display_of(&tree, POPUP_CLASS), "none");

        w.open();
        assert_eq!(w.state(), WidgetState::Expanded);
        let tree = w.tree();
        assert_eq!(display_of(&tree, BUBBLE_CLASS), "none");
        assert_eq!(display_of(&tree, POPUP_CLASS), "flex");

        w.open();
        assert_eq!(w.state(), WidgetState::Expanded);

        w.close();
        assert_eq!(w.state(), WidgetState::Collapsed);
        assert!(w.bubble_visible() && !w.popup_visible());
    }

    #[test]
    fn never_both_visible_or_hidden() {
        let mut w = widget(json!({}));
        for step in 0..6 {
            if step % 3 == 0 {
                w.close();
            } else {
                w.open();
            }
            assert_ne!(w.bubble_visible(), w.popup_visible());
        }
    }

    #[test]
    fn excluded_path_builds_nothing() {
        let config: WidgetConfig =
            serde_json::from_value(json!({"excludePaths": ["/admin", "/portal/login"]})).unwrap();
        let settings = WidgetSettings::resolve(&config);
        assert!(Widget::build(settings.clone(), "/admin/dashboard").is_none());
        assert!(Widget::build(settings.clone(), "/x/portal/login?next=1").is_none());
        assert!(Widget::build(settings, "/apply").is_some());
    }

    #[test]
    fn glyph_icon_and_corner_follow_config() {
        let w = widget(json!({"headerText": "Ask Us", "icon": "🙋", "position": "bottom-left"}));
        let tree = w.tree();
        assert_eq!(tree.style_value("bottom"), Some("24px"));
        assert_eq!(tree.style_value("left"), Some("24px"));
        assert_eq!(tree.style_value("top"), None);

        let bubble = tree.find_by_class(BUBBLE_CLASS).unwrap();
        assert!(bubble.has_class("circle"));
        assert_eq!(bubble.text_content(), "🙋");
        assert!(bubble.find(&|el| el.tag == "img").is_none());

        let header = tree.find_by_class(HEADER_CLASS).unwrap();
        assert_eq!(header.text_content(), "Ask Us×");
    }

    #[test]
    fn image_icon_replaces_glyph() {
        let w = widget(json!({"icon": "🙋", "iconImage": "/img/paw.png", "shape": "tab"}));
        let tree = w.tree();
        let bubble = tree.find_by_class(BUBBLE_CLASS).unwrap();
        assert!(bubble.has_class("tab"));
        let img = bubble.find(&|el| el.tag == "img").expect("icon image");
        assert_eq!(img.attr_value("src"), Some("/img/paw.png"));
        assert_eq!(bubble.text_content(), "");
    }

    #[test]
    fn avatar_is_prepended_to_header() {
        let tree = widget(json!({"avatar": "/img/agent.png"})).tree();
        let header = tree.find_by_class(HEADER_CLASS).unwrap();
        let first = header.child_elements().next().unwrap();
        assert_eq!(first.tag, "img");
        assert_eq!(first.attr_value("alt"), Some("avatar"));
        assert_eq!(first.style_value("border-radius"), Some("50%"));

        let plain = widget(json!({})).tree();
        let header = plain.find_by_class(HEADER_CLASS).unwrap();
        assert_eq!(header.child_elements().next().unwrap().tag, "span");
    }

    #[test]
    fn popup_carries_animation_and_close_label() {
        let tree = widget(json!({"animation": "slide"})).tree();
        let popup = tree.find_by_class(POPUP_CLASS).unwrap();
        assert_eq!(
            popup.style_value("animation"),
            Some("pounce-slide 0.35s ease 1")
        );
        let close = tree.find_by_class(CLOSE_CLASS).unwrap();
        assert_eq!(close.attr_value("aria-label"), Some("Close"));
        let input = tree.find_by_id(INPUT_ID).unwrap();
        assert_eq!(
            input.attr_value("placeholder"),
            Some(crate::settings::DEFAULT_PLACEHOLDER)
        );
    }

    #[test]
    fn log_entries_render_with_speaker_marks() {
        let mut w = widget(json!({"bodyText": "hello"}));
        w.log.push(Speaker::User, "<i>hi</i>");
        let html = w.tree().find_by_id(LOG_ID).unwrap().to_html();
        assert_eq!(
            html,
            "<div id=\"pounce-log\"><div class=\"pounce-bot\">🐾 hello</div><div class=\"pounce-user\">🧑‍🎓 &lt;i&gt;hi&lt;/i&gt;</div></div>"
        );
    }
}
