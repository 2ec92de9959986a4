//! The element tree consumed by the `from_et` builders

use crate::OdxError;
use crate::odxlink::OdxLinkId;
use crate::parser::ParserState;

/// One element of a description document
///
/// The tree is produced by the caller (usually from ODX markup) and is only read by this crate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
    pub text: Option<String>,
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.push((name.to_string(), value.to_string()));
        self
    }

    #[must_use]
    pub fn with_text(mut self, text: &str) -> Self {
        self.text = Some(text.to_string());
        self
    }

    #[must_use]
    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    /// add a child which only contains text, e.g. `<SHORT-NAME>name</SHORT-NAME>`
    #[must_use]
    pub fn with_text_child(self, tag: &str, text: &str) -> Self {
        self.with_child(Element::new(tag).with_text(text))
    }

    /// get the value of an attribute
    pub fn get(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(attr_name, _)| attr_name == name)
            .map(|(_, value)| value.as_str())
    }

    /// find the first element matching a path of tags separated by '/'
    ///
    /// e.g. `COMPU-SCALES/COMPU-SCALE`
    pub fn find(&self, path: &str) -> Option<&Element> {
        let (head, rest) = split_path(path);
        self.children
            .iter()
            .filter(|child| child.tag == head)
            .find_map(|child| match rest {
                Some(rest) => child.find(rest),
                None => Some(child),
            })
    }

    /// find all elements matching a path, in document order
    pub fn findall(&self, path: &str) -> Vec<&Element> {
        let mut result = Vec::new();
        self.collect_path(path, &mut result);
        result
    }

    /// the text of the first element matching a path
    pub fn find_text(&self, path: &str) -> Option<&str> {
        self.find(path).and_then(|elem| elem.text.as_deref())
    }

    fn collect_path<'a>(&'a self, path: &str, result: &mut Vec<&'a Element>) {
        let (head, rest) = split_path(path);
        for child in self.children.iter().filter(|child| child.tag == head) {
            match rest {
                Some(rest) => child.collect_path(rest, result),
                None => result.push(child),
            }
        }
    }
}

fn split_path(path: &str) -> (&str, Option<&str>) {
    match path.split_once('/') {
        Some((head, rest)) => (head, Some(rest)),
        None => (path, None),
    }
}

/// The common part of all description objects that have an ID and a SHORT-NAME
#[derive(Debug, Clone, PartialEq)]
pub struct IdentifiableElement {
    pub odx_id: OdxLinkId,
    pub short_name: String,
    pub long_name: Option<String>,
    pub description: Option<String>,
}

impl IdentifiableElement {
    pub(crate) fn from_et(et: &Element, parser: &mut ParserState) -> Result<Self, OdxError> {
        Ok(Self {
            odx_id: parser.odx_id(et)?,
            short_name: parser.expect_text(et, "SHORT-NAME")?.to_string(),
            long_name: et.find_text("LONG-NAME").map(str::to_string),
            description: et.find_text("DESC").map(str::to_string),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Element {
        Element::new("COMPU-INTERNAL-TO-PHYS")
            .with_child(
                Element::new("COMPU-SCALES")
                    .with_child(Element::new("COMPU-SCALE").with_text_child("SHORT-LABEL", "a"))
                    .with_child(Element::new("COMPU-SCALE").with_text_child("SHORT-LABEL", "b")),
            )
            .with_child(Element::new("PROG-CODE").with_attr("ID", "pc"))
    }

    #[test]
    fn find_elements() {
        let et = sample();
        assert_eq!(et.find_text("COMPU-SCALES/COMPU-SCALE/SHORT-LABEL"), Some("a"));
        assert_eq!(et.find("PROG-CODE").and_then(|e| e.get("ID")), Some("pc"));
        assert!(et.find("COMPU-DEFAULT-VALUE").is_none());
        assert!(et.find("COMPU-SCALES/NOTHING").is_none());
    }

    #[test]
    fn findall_in_order() {
        let et = sample();
        let labels: Vec<&str> = et
            .findall("COMPU-SCALES/COMPU-SCALE/SHORT-LABEL")
            .iter()
            .filter_map(|e| e.text.as_deref())
            .collect();
        assert_eq!(labels, vec!["a", "b"]);
        assert!(et.findall("NOTHING/HERE").is_empty());
    }
}
