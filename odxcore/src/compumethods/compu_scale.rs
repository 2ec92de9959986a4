use crate::OdxError;
use crate::element::Element;
use crate::odxtypes::{Value, ValueKind};
use crate::parser::ParserState;

use super::limit::Limit;

/// A constant value, given as `V` (numbers) or `VT` (text)
#[derive(Debug, Clone, PartialEq)]
pub struct CompuConst {
    pub value: Value,
}

/// The internal value used when a constant physical value is encoded
pub type CompuInverseValue = CompuConst;

/// The coefficients of a rational function `sum(n_i * x^i) / sum(d_i * x^i)`
#[derive(Debug, Clone, PartialEq)]
pub struct CompuRationalCoeffs {
    pub numerators: Vec<f64>,
    pub denominators: Vec<f64>,
}

/// One domain-to-range conversion rule of a computation method
#[derive(Debug, Clone, PartialEq)]
pub struct CompuScale {
    pub short_label: Option<String>,
    pub description: Option<String>,
    pub lower_limit: Option<Limit>,
    pub upper_limit: Option<Limit>,
    pub compu_inverse_value: Option<CompuInverseValue>,
    pub compu_const: Option<CompuConst>,
    pub compu_rational_coeffs: Option<CompuRationalCoeffs>,
    pub domain_type: ValueKind,
    pub range_type: ValueKind,
}

impl CompuConst {
    /// `None` if the value could not be interpreted and the error was logged
    pub(crate) fn from_et(
        et: &Element,
        parser: &mut ParserState,
        kind: ValueKind,
    ) -> Result<Option<Self>, OdxError> {
        let value_et = if kind == ValueKind::String {
            et.find("VT").or_else(|| et.find("V"))
        } else {
            et.find("V").or_else(|| et.find("VT"))
        };
        let value_et = value_et.ok_or_else(|| OdxError::MissingElement {
            tag: "V".to_string(),
            parent: et.tag.clone(),
        })?;
        Ok(parser.parse_value(value_et, kind)?.map(|value| Self { value }))
    }
}

impl CompuRationalCoeffs {
    pub(crate) fn from_et(et: &Element, parser: &mut ParserState) -> Result<Self, OdxError> {
        let mut numerators = Vec::new();
        for v_et in et.findall("COMPU-NUMERATOR/V") {
            if let Some(value) = parser.parse_value(v_et, ValueKind::Float)? {
                numerators.extend(value.as_f64());
            }
        }
        let mut denominators = Vec::new();
        for v_et in et.findall("COMPU-DENOMINATOR/V") {
            if let Some(value) = parser.parse_value(v_et, ValueKind::Float)? {
                denominators.extend(value.as_f64());
            }
        }

        Ok(Self {
            numerators,
            denominators,
        })
    }

    /// `None` if the denominator is zero
    pub fn evaluate(&self, x: f64) -> Option<f64> {
        let numerator = polynomial(&self.numerators, x);
        let denominator = if self.denominators.is_empty() {
            1.0
        } else {
            polynomial(&self.denominators, x)
        };
        if denominator == 0.0 {
            None
        } else {
            Some(numerator / denominator)
        }
    }

    /// invert the function; only possible for linear functions `(n0 + n1 * x) / d0`
    pub fn invert(&self, y: f64) -> Option<f64> {
        if self.numerators.len() > 2 || self.denominators.len() > 1 {
            return None;
        }
        let n0 = self.numerators.first().copied().unwrap_or(0.0);
        let n1 = self.numerators.get(1).copied().unwrap_or(0.0);
        let d0 = self.denominators.first().copied().unwrap_or(1.0);
        if n1 == 0.0 {
            None
        } else {
            Some((y * d0 - n0) / n1)
        }
    }

    pub fn is_linear(&self) -> bool {
        self.numerators.len() <= 2 && self.denominators.len() <= 1
    }
}

fn polynomial(coeffs: &[f64], x: f64) -> f64 {
    coeffs.iter().rev().fold(0.0, |acc, coeff| acc * x + coeff)
}

impl CompuScale {
    pub(crate) fn from_et(
        et: &Element,
        parser: &mut ParserState,
        domain_type: ValueKind,
        range_type: ValueKind,
    ) -> Result<Self, OdxError> {
        let lower_limit = et
            .find("LOWER-LIMIT")
            .map(|limit_et| Limit::from_et(limit_et, parser, domain_type))
            .transpose()?;
        let upper_limit = et
            .find("UPPER-LIMIT")
            .map(|limit_et| Limit::from_et(limit_et, parser, domain_type))
            .transpose()?;
        let compu_inverse_value = match et.find("COMPU-INVERSE-VALUE") {
            Some(civ_et) => CompuConst::from_et(civ_et, parser, domain_type)?,
            None => None,
        };
        let compu_const = match et.find("COMPU-CONST") {
            Some(cc_et) => CompuConst::from_et(cc_et, parser, range_type)?,
            None => None,
        };
        let compu_rational_coeffs = et
            .find("COMPU-RATIONAL-COEFFS")
            .map(|crc_et| CompuRationalCoeffs::from_et(crc_et, parser))
            .transpose()?;

        Ok(Self {
            short_label: et.find_text("SHORT-LABEL").map(str::to_string),
            description: et.find_text("DESC").map(str::to_string),
            lower_limit,
            upper_limit,
            compu_inverse_value,
            compu_const,
            compu_rational_coeffs,
            domain_type,
            range_type,
        })
    }

    /// check if an internal value is inside the domain of this scale
    ///
    /// A scale without limits applies to every value. A scale with only a lower limit
    /// applies to exactly the value of that limit.
    pub fn applies(&self, internal_value: &Value) -> bool {
        match (&self.lower_limit, &self.upper_limit) {
            (None, None) => true,
            (Some(lower), None) => match &lower.value {
                Some(limit) => internal_value.matches(limit),
                None => true,
            },
            (lower, upper) => {
                lower
                    .as_ref()
                    .is_none_or(|limit| limit.complies_to_lower(internal_value))
                    && upper
                        .as_ref()
                        .is_none_or(|limit| limit.complies_to_upper(internal_value))
            }
        }
    }

    pub fn convert_internal_to_physical(&self, internal_value: &Value) -> Result<Value, OdxError> {
        if let Some(compu_const) = &self.compu_const {
            return Ok(compu_const.value.clone());
        }

        if let Some(coeffs) = &self.compu_rational_coeffs {
            let x = internal_value.as_f64().ok_or_else(|| OdxError::ConversionError {
                description: format!("{internal_value} is not a number"),
            })?;
            return coeffs
                .evaluate(x)
                .and_then(|y| Value::from_f64(self.range_type, y))
                .ok_or_else(|| OdxError::ConversionError {
                    description: format!(
                        "{internal_value} can not be converted to a physical value of type {:?}",
                        self.range_type
                    ),
                });
        }

        internal_value
            .to_kind(self.range_type)
            .ok_or_else(|| OdxError::ConversionError {
                description: format!(
                    "{internal_value} can not be represented as {:?}",
                    self.range_type
                ),
            })
    }

    /// get the internal value for a physical value
    ///
    /// `Ok(None)` means that the physical value is not in the range of this scale.
    pub fn convert_physical_to_internal(
        &self,
        physical_value: &Value,
    ) -> Result<Option<Value>, OdxError> {
        if let Some(compu_const) = &self.compu_const {
            if !compu_const.value.matches(physical_value) {
                return Ok(None);
            }
            let internal_value = self
                .compu_inverse_value
                .as_ref()
                .map(|civ| civ.value.clone())
                .or_else(|| self.lower_limit.as_ref().and_then(|limit| limit.value.clone()))
                .or_else(|| self.upper_limit.as_ref().and_then(|limit| limit.value.clone()));
            return match internal_value {
                Some(value) => Ok(Some(value)),
                None => Err(OdxError::ConversionError {
                    description: format!(
                        "the scale for {physical_value} has neither an inverse value nor limits"
                    ),
                }),
            };
        }

        if let Some(coeffs) = &self.compu_rational_coeffs {
            let Some(y) = physical_value.as_f64() else {
                return Ok(None);
            };
            let x = coeffs.invert(y).ok_or_else(|| OdxError::ConversionError {
                description: format!(
                    "{physical_value} can not be converted: the scale is not invertible"
                ),
            })?;
            return Ok(Value::from_f64(self.domain_type, x)
                .filter(|internal| self.applies(internal)));
        }

        Ok(physical_value
            .to_kind(self.domain_type)
            .filter(|internal| self.applies(internal)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errorlog::ErrorLog;
    use crate::odxlink::{DocType, OdxDocFragment};

    fn linear_scale() -> CompuScale {
        CompuScale {
            short_label: None,
            description: None,
            lower_limit: Some(Limit::closed(Value::UInt(0))),
            upper_limit: Some(Limit::closed(Value::UInt(200))),
            compu_inverse_value: None,
            compu_const: None,
            compu_rational_coeffs: Some(CompuRationalCoeffs {
                numerators: vec![-40.0, 0.5],
                denominators: vec![1.0],
            }),
            domain_type: ValueKind::UnsignedInteger,
            range_type: ValueKind::Float,
        }
    }

    #[test]
    fn rational_coefficients() {
        let coeffs = CompuRationalCoeffs {
            numerators: vec![1.0, 2.0, 3.0],
            denominators: vec![],
        };
        assert_eq!(coeffs.evaluate(2.0), Some(17.0));
        assert!(!coeffs.is_linear());
        assert_eq!(coeffs.invert(17.0), None);

        let coeffs = CompuRationalCoeffs {
            numerators: vec![1.0],
            denominators: vec![0.0],
        };
        assert_eq!(coeffs.evaluate(2.0), None);
    }

    #[test]
    fn linear_conversion() {
        let scale = linear_scale();
        assert_eq!(
            scale.convert_internal_to_physical(&Value::UInt(100)).unwrap(),
            Value::Float(10.0)
        );
        assert_eq!(
            scale.convert_physical_to_internal(&Value::Float(10.0)).unwrap(),
            Some(Value::UInt(100))
        );
        // 70 degrees would need an internal value of 220
        assert_eq!(
            scale.convert_physical_to_internal(&Value::Float(70.0)).unwrap(),
            None
        );
    }

    #[test]
    fn applies_to_domain() {
        let mut scale = linear_scale();
        assert!(scale.applies(&Value::UInt(0)));
        assert!(scale.applies(&Value::UInt(200)));
        assert!(!scale.applies(&Value::UInt(201)));

        scale.upper_limit = None;
        assert!(scale.applies(&Value::UInt(0)));
        assert!(!scale.applies(&Value::UInt(1)));

        scale.lower_limit = None;
        assert!(scale.applies(&Value::UInt(12345)));
    }

    #[test]
    fn scale_from_et() {
        let et = Element::new("COMPU-SCALE")
            .with_text_child("SHORT-LABEL", "on")
            .with_text_child("LOWER-LIMIT", "1")
            .with_text_child("UPPER-LIMIT", "1")
            .with_child(Element::new("COMPU-INVERSE-VALUE").with_text_child("V", "1"))
            .with_child(Element::new("COMPU-CONST").with_text_child("VT", "on"));
        let mut log = ErrorLog::new(true);
        let mut parser = ParserState::new(
            vec![OdxDocFragment::new("doc", DocType::Container)],
            &mut log,
        );
        let scale =
            CompuScale::from_et(&et, &mut parser, ValueKind::UnsignedInteger, ValueKind::String)
                .unwrap();
        assert_eq!(scale.short_label.as_deref(), Some("on"));
        assert_eq!(
            scale.compu_const,
            Some(CompuConst {
                value: Value::String("on".to_string())
            })
        );
        assert_eq!(
            scale.convert_physical_to_internal(&Value::from("on")).unwrap(),
            Some(Value::UInt(1))
        );
        assert_eq!(
            scale.convert_physical_to_internal(&Value::from("off")).unwrap(),
            None
        );

        let et = Element::new("COMPU-SCALE").with_child(Element::new("COMPU-CONST"));
        assert!(matches!(
            CompuScale::from_et(&et, &mut parser, ValueKind::UnsignedInteger, ValueKind::String),
            Err(OdxError::MissingElement { .. })
        ));
    }
}
