use crate::settings::WidgetSettings;
use crate::widget::Widget;
use kuchiki::NodeRef;
use kuchiki::traits::*;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::{debug, warn};

pub const STYLESHEET_URL: &str = "/static/widget.css";
pub const STYLESHEET_FILE: &str = "widget.css";
const BUILTIN_STYLESHEET: &str = include_str!("../assets/widget.css");
const WRAPPER_ID: &str = "__pounce_mount_wrapper";

static REPEATED_SLASHES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/+").expect("static regex"));

#[derive(Debug, Error)]
pub enum MountError {
    #[error("html manipulation failed: {0}")]
    Html(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeVariable {
    pub name: String,
    pub value: String,
}

/// Everything a page needs to show the widget, in initialization order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountPlan {
    pub stylesheet_url: String,
    pub variables: Vec<ThemeVariable>,
    pub markup: String,
}

impl MountPlan {
    /// `None` when the page path is excluded.
    pub fn for_page(settings: WidgetSettings, page_path: &str) -> Option<Self> {
        let variables = theme_variables(&settings);
        let widget = Widget::build(settings, page_path)?;
        Some(Self {
            stylesheet_url: STYLESHEET_URL.to_string(),
            variables,
            markup: widget.tree().to_html(),
        })
    }
}

fn inline_css(variables: &[ThemeVariable]) -> String {
    variables
        .iter()
        .map(|v| format!("{}:{}", v.name, v.value))
        .collect::<Vec<_>>()
        .join(";")
}

fn theme_variables(settings: &WidgetSettings) -> Vec<ThemeVariable> {
    settings
        .theme_variables()
        .into_iter()
        .filter(|(name, value)| {
            let safe = !value.contains([';', '{', '}', '<', '>']);
            if !safe {
                warn!(%name, %value, "dropping theme value that is not a plain css value");
            }
            safe
        })
        .map(|(name, value)| ThemeVariable {
            name: name.to_string(),
            value,
        })
        .collect()
}

/// Collapses duplicate slashes and guarantees a leading `/`.
pub fn normalize_path(path: &str) -> String {
    let collapsed = REPEATED_SLASHES.replace_all(path.trim(), "/");
    if collapsed.starts_with('/') {
        collapsed.into_owned()
    } else {
        format!("/{collapsed}")
    }
}

/// Reads the widget stylesheet from the assets directory, falling back to the built-in copy.
pub async fn load_stylesheet(assets_root: &Path) -> String {
    let path = assets_root.join(STYLESHEET_FILE);
    match tokio::fs::read_to_string(&path).await {
        Ok(css) => css,
        Err(err) => {
            warn!(?path, ?err, "widget stylesheet not readable; using built-in copy");
            BUILTIN_STYLESHEET.to_string()
        }
    }
}

/// Mounts the widget into a host page server-side.
///
/// Steps run in load order: stylesheet, theme variables, exclusion, widget DOM. An excluded
/// page comes back with only the first two applied, and never gets widget markup.
pub fn mount_into_page(
    html: &str,
    settings: WidgetSettings,
    page_path: &str,
    stylesheet: Option<&str>,
) -> Result<String, MountError> {
    let document = kuchiki::parse_html().one(html);

    if let Some(css) = stylesheet {
        let head = document
            .select_first("head")
            .map_err(|_| MountError::Html("document has no head".into()))?;
        let style = parse_nodes("<style></style>")?
            .into_iter()
            .next()
            .ok_or_else(|| MountError::Html("style element not parsed".into()))?;
        style.append(NodeRef::new_text(css));
        head.as_node().append(style);
    }

    let variables = theme_variables(&settings);
    if !variables.is_empty() {
        let root = document
            .select_first("html")
            .map_err(|_| MountError::Html("document has no root element".into()))?;
        let mut attrs = root.attributes.borrow_mut();
        let inline = inline_css(&variables);
        let merged = match attrs.get("style").map(str::trim).filter(|s| !s.is_empty()) {
            Some(existing) => format!("{};{inline}", existing.trim_end_matches(';')),
            None => inline,
        };
        attrs.insert("style", merged);
    }

    let Some(plan) = MountPlan::for_page(settings, page_path) else {
        debug!(%page_path, "widget not mounted on excluded page");
        return Ok(document.to_string());
    };

    let body = document
        .select_first("body")
        .map_err(|_| MountError::Html("document has no body".into()))?;
    for node in parse_nodes(&plan.markup)? {
        body.as_node().append(node);
    }
    Ok(document.to_string())
}

fn parse_nodes(markup: &str) -> Result<Vec<NodeRef>, MountError> {
    let wrapper_html = format!("<div id=\"{WRAPPER_ID}\">{markup}</div>");
    let fragment_doc = kuchiki::parse_html().one(wrapper_html);
    let wrapper = fragment_doc
        .select_first(&format!("#{WRAPPER_ID}"))
        .map_err(|_| MountError::Html("select wrapper failed".into()))?;
    let children: Vec<_> = wrapper.as_node().children().collect();
    for child in &children {
        child.detach();
    }
    Ok(children)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::WidgetConfig;
    use serde_json::json;

    const HOST: &str = "<!DOCTYPE html><html lang=\"en\"><head><title>Apply</title></head><body><main>content</main></body></html>";

    fn settings(config: serde_json::Value) -> WidgetSettings {
        let config: WidgetConfig = serde_json::from_value(config).unwrap();
        WidgetSettings::resolve(&config)
    }

    #[test]
    fn normalizes_paths_like_routes() {
        assert_eq!(normalize_path("apply//now"), "/apply/now");
        assert_eq!(normalize_path("///"), "/");
        assert_eq!(normalize_path(""), "/");
    }

    #[test]
    fn plan_carries_variables_and_markup() {
        let plan = MountPlan::for_page(settings(json!({"headerBg": "#123456"})), "/apply")
            .expect("mounted");
        assert_eq!(plan.stylesheet_url, STYLESHEET_URL);
        assert_eq!(plan.variables.len(), 4);
        assert_eq!(plan.variables[0].value, "#123456");
        assert!(inline_css(&plan.variables).starts_with("--pounce-header-bg:#123456;"));
        assert!(plan.markup.starts_with("<div class=\"pounce-wrap\""));
    }

    #[test]
    fn plan_is_absent_for_excluded_page() {
        let s = settings(json!({"excludePaths": ["/admin"]}));
        assert!(MountPlan::for_page(s, "/admin/settings").is_none());
    }

    #[test]
    fn unsafe_theme_values_are_dropped() {
        let plan = MountPlan::for_page(
            settings(json!({"focusColor": "red;background:url(x)"})),
            "/",
        )
        .unwrap();
        assert_eq!(plan.variables.len(), 3);
        assert!(plan.variables.iter().all(|v| v.name != "--pounce-focus"));
    }

    #[test]
    fn mounts_widget_into_host_page() {
        let html = mount_into_page(
            HOST,
            settings(json!({"headerText": "Ask <Us>"})),
            "/apply",
            Some(".pounce-wrap{position:fixed}"),
        )
        .unwrap();
        let doc = kuchiki::parse_html().one(html.clone());
        let style = doc.select_first("head style").unwrap();
        assert_eq!(style.as_node().text_contents(), ".pounce-wrap{position:fixed}");
        let root = doc.select_first("html").unwrap();
        let root_style = root.attributes.borrow().get("style").unwrap().to_string();
        assert!(root_style.contains("--pounce-bubble-bg:#0039A6"));
        assert!(doc.select_first("body > main").is_ok());
        let header = doc.select_first("body > .pounce-wrap .pounce-header span").unwrap();
        assert_eq!(header.as_node().text_contents(), "Ask <Us>");
        assert!(doc.select_first("#pounce-log .pounce-bot").is_ok());
    }

    #[test]
    fn excluded_page_gets_no_widget_dom() {
        let html = mount_into_page(
            HOST,
            settings(json!({"excludePaths": ["/checkout"]})),
            "/store/checkout",
            None,
        )
        .unwrap();
        let doc = kuchiki::parse_html().one(html);
        assert!(doc.select_first(".pounce-wrap").is_err());
        assert!(doc.select_first("head style").is_err());
    }

    #[test]
    fn missing_stylesheet_still_mounts() {
        let html = mount_into_page(HOST, settings(json!({})), "/", None).unwrap();
        let doc = kuchiki::parse_html().one(html);
        assert!(doc.select_first("head style").is_err());
        assert!(doc.select_first(".pounce-bubble").is_ok());
        assert!(doc.select_first("#pounce-form #pounce-msg").is_ok());
    }

    #[test]
    fn existing_root_style_is_preserved() {
        let host = "<html style=\"color:black;\"><head></head><body></body></html>";
        let html = mount_into_page(host, settings(json!({})), "/", None).unwrap();
        let doc = kuchiki::parse_html().one(html);
        let root = doc.select_first("html").unwrap();
        let style = root.attributes.borrow().get("style").unwrap().to_string();
        assert!(style.starts_with("color:black;--pounce-header-bg:"));
    }

    #[tokio::test]
    async fn stylesheet_falls_back_to_builtin() {
        let dir = tempfile::tempdir().unwrap();
        let css = load_stylesheet(dir.path()).await;
        assert_eq!(css, BUILTIN_STYLESHEET);

        tokio::fs::write(dir.path().join(STYLESHEET_FILE), "body{}")
            .await
            .unwrap();
        assert_eq!(load_stylesheet(dir.path()).await, "body{}");
    }
}
