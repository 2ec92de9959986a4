use std::fmt::Display;
use std::str::FromStr;

use crate::OdxError;
use crate::element::Element;
use crate::errorlog::ErrorLog;
use crate::namelist::{NamedItemList, OdxNamed};
use crate::odxlink::{DocType, OdxDocFragment, OdxLinkId, OdxLinkRef};
use crate::odxtypes::{Value, ValueKind};

/// State shared by all `from_et` builders of one document
///
/// Missing mandatory elements are always errors. Content that is present but cannot
/// be interpreted goes through `error_or_log`, so that lenient parsing can continue
/// without the offending value.
pub struct ParserState<'a> {
    doc_fragments: Vec<OdxDocFragment>,
    log: &'a mut ErrorLog,
}

impl<'a> ParserState<'a> {
    pub(crate) fn new(doc_fragments: Vec<OdxDocFragment>, log: &'a mut ErrorLog) -> Self {
        Self { doc_fragments, log }
    }

    pub(crate) fn error_or_log(&mut self, err: OdxError) -> Result<(), OdxError> {
        self.log.error_or_log(err)
    }

    pub(crate) fn expect_child<'e>(
        &self,
        et: &'e Element,
        path: &str,
    ) -> Result<&'e Element, OdxError> {
        et.find(path).ok_or_else(|| OdxError::MissingElement {
            tag: path.to_string(),
            parent: et.tag.clone(),
        })
    }

    pub(crate) fn expect_text<'e>(&self, et: &'e Element, path: &str) -> Result<&'e str, OdxError> {
        let child = self.expect_child(et, path)?;
        child
            .text
            .as_deref()
            .map(str::trim)
            .ok_or_else(|| OdxError::MissingElement {
                tag: format!("{path} (text)"),
                parent: et.tag.clone(),
            })
    }

    pub(crate) fn expect_attribute<'e>(
        &self,
        et: &'e Element,
        name: &str,
    ) -> Result<&'e str, OdxError> {
        et.get(name).ok_or_else(|| OdxError::MissingElement {
            tag: format!("@{name}"),
            parent: et.tag.clone(),
        })
    }

    /// interpret the text of an element as a value of the given kind
    pub(crate) fn parse_value(
        &mut self,
        et: &Element,
        kind: ValueKind,
    ) -> Result<Option<Value>, OdxError> {
        let text = et.text.as_deref().unwrap_or_default();
        match kind.parse_value(text) {
            Ok(value) => Ok(Some(value)),
            Err(description) => {
                self.error_or_log(OdxError::InvalidValue {
                    text: text.to_string(),
                    element: et.tag.clone(),
                    description,
                })?;
                Ok(None)
            }
        }
    }

    /// interpret an optional text element using `FromStr`; used for numbers and enums
    pub(crate) fn parse_optional<T>(
        &mut self,
        et: &Element,
        path: &str,
    ) -> Result<Option<T>, OdxError>
    where
        T: FromStr,
        T::Err: Display,
    {
        match et.find_text(path) {
            Some(text) => self.parse_text(text, path),
            None => Ok(None),
        }
    }

    /// interpret an optional attribute using `FromStr`
    pub(crate) fn parse_attribute<T>(
        &mut self,
        et: &Element,
        name: &str,
    ) -> Result<Option<T>, OdxError>
    where
        T: FromStr,
        T::Err: Display,
    {
        match et.get(name) {
            Some(text) => self.parse_text(text, &format!("{}@{name}", et.tag)),
            None => Ok(None),
        }
    }

    fn parse_text<T>(&mut self, text: &str, element: &str) -> Result<Option<T>, OdxError>
    where
        T: FromStr,
        T::Err: Display,
    {
        match text.trim().parse::<T>() {
            Ok(value) => Ok(Some(value)),
            Err(err) => {
                self.error_or_log(OdxError::InvalidValue {
                    text: text.to_string(),
                    element: element.to_string(),
                    description: err.to_string(),
                })?;
                Ok(None)
            }
        }
    }

    /// the ID attribute of an identifiable element, scoped by the fragments of the current document
    pub(crate) fn odx_id(&self, et: &Element) -> Result<OdxLinkId, OdxError> {
        let local_id = self.expect_attribute(et, "ID")?;
        Ok(OdxLinkId::new(local_id, self.doc_fragments.clone()))
    }

    /// a reference element with the attributes ID-REF, and optionally DOCREF and DOCTYPE
    pub(crate) fn odxlink_ref(&mut self, et: &Element) -> Result<OdxLinkRef, OdxError> {
        let ref_id = self.expect_attribute(et, "ID-REF")?;
        let ref_docs = match et.get("DOCREF") {
            Some(doc_name) => {
                let doc_type = self
                    .parse_attribute::<DocType>(et, "DOCTYPE")?
                    .unwrap_or(DocType::Container);
                vec![OdxDocFragment::new(doc_name, doc_type)]
            }
            None => self.doc_fragments.clone(),
        };
        Ok(OdxLinkRef::new(ref_id, ref_docs))
    }

    /// add an item to a short-name scope; a name that is already taken is an invalid value
    pub(crate) fn push_unique<T: OdxNamed>(
        &mut self,
        items: &mut NamedItemList<T>,
        item: T,
        element: &str,
    ) -> Result<(), OdxError> {
        let short_name = item.short_name().to_string();
        if !items.push(item) {
            self.error_or_log(OdxError::InvalidValue {
                text: short_name,
                element: element.to_string(),
                description: "the short name is used more than once".to_string(),
            })?;
        }
        Ok(())
    }

    /// the SHORT-NAME attribute of a short-name reference element
    pub(crate) fn snref(&self, et: &Element, path: &str) -> Result<String, OdxError> {
        let snref_elem = self.expect_child(et, path)?;
        Ok(self.expect_attribute(snref_elem, "SHORT-NAME")?.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fragments() -> Vec<OdxDocFragment> {
        vec![OdxDocFragment::new("doc", DocType::Container)]
    }

    #[test]
    fn missing_elements() {
        let mut log = ErrorLog::new(false);
        let parser = ParserState::new(fragments(), &mut log);
        let et = Element::new("STATE");
        assert!(matches!(
            parser.expect_text(&et, "SHORT-NAME"),
            Err(OdxError::MissingElement { .. })
        ));
        assert!(matches!(
            parser.odx_id(&et),
            Err(OdxError::MissingElement { .. })
        ));
    }

    #[test]
    fn invalid_values() {
        let et = Element::new("X").with_text_child("BIT-LENGTH", "eight");

        let mut log = ErrorLog::new(false);
        let mut parser = ParserState::new(fragments(), &mut log);
        let result = parser.parse_optional::<u32>(&et, "BIT-LENGTH");
        assert!(matches!(result, Ok(None)));
        assert_eq!(log.messages().len(), 1);

        let mut log = ErrorLog::new(true);
        let mut parser = ParserState::new(fragments(), &mut log);
        let result = parser.parse_optional::<u32>(&et, "BIT-LENGTH");
        assert!(matches!(result, Err(OdxError::InvalidValue { .. })));
    }

    #[test]
    fn references() {
        let mut log = ErrorLog::new(true);
        let mut parser = ParserState::new(fragments(), &mut log);

        let local_ref = Element::new("DOP-REF").with_attr("ID-REF", "dop");
        let odxlink = parser.odxlink_ref(&local_ref).unwrap();
        assert_eq!(odxlink.ref_id, "dop");
        assert_eq!(odxlink.ref_docs, fragments());

        let foreign_ref = Element::new("DOP-REF")
            .with_attr("ID-REF", "dop")
            .with_attr("DOCREF", "other")
            .with_attr("DOCTYPE", "LAYER");
        let odxlink = parser.odxlink_ref(&foreign_ref).unwrap();
        assert_eq!(
            odxlink.ref_docs,
            vec![OdxDocFragment::new("other", DocType::Layer)]
        );

        let snref_parent =
            Element::new("X").with_child(Element::new("SOURCE-SNREF").with_attr("SHORT-NAME", "a"));
        assert_eq!(parser.snref(&snref_parent, "SOURCE-SNREF").unwrap(), "a");
    }
}
