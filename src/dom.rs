//! Minimal element tree used to build widget markup programmatically.
//!
//! All text and attribute values pass through escaping on render, so configuration values
//! and chat content are never interpreted as markup.

use std::fmt::Write as _;

const VOID_ELEMENTS: &[&str] = &["img", "input", "br", "meta", "link"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub tag: String,
    attrs: Vec<(String, String)>,
    styles: Vec<(String, String)>,
    children: Vec<Node>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: Vec::new(),
            styles: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn id(self, id: impl Into<String>) -> Self {
        self.attr("id", id)
    }

    /// Adds one or more space-separated classes.
    pub fn class(mut self, class: impl AsRef<str>) -> Self {
        for name in class.as_ref().split_whitespace() {
            if self.has_class(name) {
                continue;
            }
            match self.attrs.iter_mut().find(|(k, _)| k == "class") {
                Some((_, existing)) => {
                    existing.push(' ');
                    existing.push_str(name);
                }
                None => self.attrs.push(("class".into(), name.to_string())),
            }
        }
        self
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    pub fn style(mut self, property: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_style(property, value);
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    pub fn child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attrs.iter_mut().find(|(k, _)| *k == name) {
            Some((_, existing)) => *existing = value,
            None => self.attrs.push((name, value)),
        }
    }

    pub fn attr_value(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_style(&mut self, property: impl Into<String>, value: impl Into<String>) {
        let property = property.into();
        let value = value.into();
        match self.styles.iter_mut().find(|(k, _)| *k == property) {
            Some((_, existing)) => *existing = value,
            None => self.styles.push((property, value)),
        }
    }

    pub fn has_class(&self, name: &str) -> bool {
        self.attr_value("class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == name))
    }

    pub fn push_child(&mut self, child: Element) {
        self.children.push(Node::Element(child));
    }

    pub fn prepend_child(&mut self, child: Element) {
        self.children.insert(0, Node::Element(child));
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.tag);
        for (name, value) in &self.attrs {
            let _ = write!(out, " {}=\"{}\"", name, escape(value));
        }
        if !self.styles.is_empty() {
            let css = self
                .styles
                .iter()
                .map(|(k, v)| format!("{k}:{v}"))
                .collect::<Vec<_>>()
                .join(";");
            let _ = write!(out, " style=\"{}\"", escape(&css));
        }
        out.push('>');
        if VOID_ELEMENTS.contains(&self.tag.as_str()) {
            return;
        }
        for node in &self.children {
            match node {
                Node::Text(text) => out.push_str(&escape(text)),
                Node::Element(el) => el.write_html(out),
            }
        }
        let _ = write!(out, "</{}>", self.tag);
    }
}

#[cfg(test)]
impl Element {
    pub fn style_value(&self, property: &str) -> Option<&str> {
        self.styles
            .iter()
            .find(|(k, _)| k == property)
            .map(|(_, v)| v.as_str())
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(el) => Some(el),
            Node::Text(_) => None,
        })
    }

    /// Depth-first search, including `self`.
    pub fn find(&self, pred: &dyn Fn(&Element) -> bool) -> Option<&Element> {
        if pred(self) {
            return Some(self);
        }
        self.child_elements().find_map(|child| child.find(pred))
    }

    pub fn find_by_id(&self, id: &str) -> Option<&Element> {
        self.find(&|el| el.attr_value("id") == Some(id))
    }

    pub fn find_by_class(&self, class: &str) -> Option<&Element> {
        self.find(&|el| el.has_class(class))
    }

    /// Concatenated text of all descendants.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for node in &self.children {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Element(el) => el.collect_text(out),
            }
        }
    }
}

pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_nested_tree_with_styles() {
        let el = Element::new("div")
            .class("pounce-wrap")
            .style("bottom", "24px")
            .style("left", "24px")
            .child(Element::new("span").text("hi"))
            .child(Element::new("img").attr("src", "a.png"));
        assert_eq!(
            el.to_html(),
            "<div class=\"pounce-wrap\" style=\"bottom:24px;left:24px\"><span>hi</span><img src=\"a.png\"></div>"
        );
    }

    #[test]
    fn escapes_text_and_attributes() {
        let el = Element::new("div")
            .attr("title", "\"><script>")
            .text("<b>bold</b> & more");
        let html = el.to_html();
        assert!(!html.contains("<script>"));
        assert!(!html.contains("<b>"));
        assert!(html.contains("&lt;b&gt;bold&lt;/b&gt; &amp; more"));
        assert!(html.contains("title=\"&quot;&gt;&lt;script&gt;\""));
    }

    #[test]
    fn set_style_replaces_existing_property() {
        let mut el = Element::new("div").style("display", "none");
        el.set_style("display", "flex");
        assert_eq!(el.style_value("display"), Some("flex"));
        assert_eq!(el.to_html(), "<div style=\"display:flex\"></div>");
    }

    #[test]
    fn classes_accumulate_without_duplicates() {
        let el = Element::new("div").class("pounce-bubble circle").class("circle");
        assert_eq!(el.attr_value("class"), Some("pounce-bubble circle"));
        assert!(el.has_class("circle"));
        assert!(!el.has_class("tab"));
    }

    #[test]
    fn finds_descendants_and_prepends() {
        let mut header = Element::new("div")
            .class("pounce-header")
            .child(Element::new("span").id("title").text("Agent"));
        header.prepend_child(Element::new("img").attr("alt", "avatar"));
        let root = Element::new("div").child(header);
        let header = root.find_by_class("pounce-header").unwrap();
        assert_eq!(header.child_elements().next().unwrap().tag, "img");
        assert_eq!(root.find_by_id("title").unwrap().text_content(), "Agent");
        assert!(root.find_by_id("missing").is_none());
    }
}
