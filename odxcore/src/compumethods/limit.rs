use std::cmp::Ordering;
use std::str::FromStr;

use crate::OdxError;
use crate::element::Element;
use crate::odxtypes::{Value, ValueKind};
use crate::parser::ParserState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalType {
    Closed,
    Open,
    Infinite,
}

/// One boundary of the domain of a compu scale
#[derive(Debug, Clone, PartialEq)]
pub struct Limit {
    /// `None` for infinite limits, or if the text could not be interpreted in lenient mode
    pub value: Option<Value>,
    pub interval_type: IntervalType,
}

impl FromStr for IntervalType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CLOSED" => Ok(Self::Closed),
            "OPEN" => Ok(Self::Open),
            "INFINITE" => Ok(Self::Infinite),
            _ => Err(format!("unknown interval type {s}")),
        }
    }
}

impl Limit {
    pub(crate) fn from_et(
        et: &Element,
        parser: &mut ParserState,
        kind: ValueKind,
    ) -> Result<Self, OdxError> {
        let interval_type = parser
            .parse_attribute::<IntervalType>(et, "INTERVAL-TYPE")?
            .unwrap_or(IntervalType::Closed);
        let has_text = et.text.as_deref().is_some_and(|text| !text.trim().is_empty());
        let value = if interval_type == IntervalType::Infinite || !has_text {
            None
        } else {
            parser.parse_value(et, kind)?
        };

        Ok(Self {
            value,
            interval_type,
        })
    }

    pub fn closed(value: Value) -> Self {
        Self {
            value: Some(value),
            interval_type: IntervalType::Closed,
        }
    }

    /// check if `value` is on the allowed side of this limit used as a lower limit
    pub fn complies_to_lower(&self, value: &Value) -> bool {
        self.complies(value, Ordering::Greater)
    }

    /// check if `value` is on the allowed side of this limit used as an upper limit
    pub fn complies_to_upper(&self, value: &Value) -> bool {
        self.complies(value, Ordering::Less)
    }

    fn complies(&self, value: &Value, allowed: Ordering) -> bool {
        let Some(limit) = &self.value else {
            return true;
        };
        match (self.interval_type, value.partial_cmp(limit)) {
            (IntervalType::Infinite, _) => true,
            (IntervalType::Closed, Some(ordering)) => {
                ordering == allowed || ordering == Ordering::Equal
            }
            (IntervalType::Open, Some(ordering)) => ordering == allowed,
            (_, None) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errorlog::ErrorLog;
    use crate::odxlink::{DocType, OdxDocFragment};

    #[test]
    fn limit_compliance() {
        let closed = Limit::closed(Value::UInt(10));
        assert!(closed.complies_to_lower(&Value::UInt(10)));
        assert!(closed.complies_to_lower(&Value::UInt(11)));
        assert!(!closed.complies_to_lower(&Value::UInt(9)));
        assert!(closed.complies_to_upper(&Value::Int(-5)));
        assert!(!closed.complies_to_upper(&Value::Float(10.5)));

        let open = Limit {
            value: Some(Value::UInt(10)),
            interval_type: IntervalType::Open,
        };
        assert!(!open.complies_to_lower(&Value::UInt(10)));
        assert!(!open.complies_to_upper(&Value::UInt(10)));
        assert!(open.complies_to_upper(&Value::UInt(9)));

        // a string can't be compared to a number
        assert!(!closed.complies_to_lower(&Value::String("x".to_string())));
    }

    #[test]
    fn limit_from_et() {
        let mut log = ErrorLog::new(true);
        let mut parser = ParserState::new(
            vec![OdxDocFragment::new("doc", DocType::Container)],
            &mut log,
        );

        let et = Element::new("LOWER-LIMIT").with_text("5");
        let limit = Limit::from_et(&et, &mut parser, ValueKind::Integer).unwrap();
        assert_eq!(limit, Limit::closed(Value::Int(5)));

        let et = Element::new("UPPER-LIMIT")
            .with_attr("INTERVAL-TYPE", "INFINITE")
            .with_text("5");
        let limit = Limit::from_et(&et, &mut parser, ValueKind::Integer).unwrap();
        assert_eq!(limit.value, None);
        assert!(limit.complies_to_upper(&Value::Int(1000)));

        let et = Element::new("UPPER-LIMIT").with_attr("INTERVAL-TYPE", "HALF-OPEN");
        assert!(Limit::from_et(&et, &mut parser, ValueKind::Integer).is_err());
    }
}
