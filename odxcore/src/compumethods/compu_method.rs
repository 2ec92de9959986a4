use std::fmt::Display;
use std::str::FromStr;

use crate::OdxError;
use crate::element::Element;
use crate::errorlog::ErrorLog;
use crate::odxlink::{OdxLinkDatabase, OdxLinkEntries, OdxLinked};
use crate::odxtypes::{Value, ValueKind};
use crate::parser::ParserState;
use crate::snrefcontext::SnRefContext;

use super::compu_internal_to_phys::CompuInternalToPhys;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompuCategory {
    Identical,
    Linear,
    ScaleLinear,
    TextTable,
    CompuCode,
}

/// A computation method: the category plus the conversion rules
#[derive(Debug)]
pub struct CompuMethod {
    pub category: CompuCategory,
    pub compu_internal_to_phys: Option<CompuInternalToPhys>,
    pub internal_type: ValueKind,
    pub physical_type: ValueKind,
}

impl FromStr for CompuCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "IDENTICAL" => Ok(Self::Identical),
            "LINEAR" => Ok(Self::Linear),
            "SCALE-LINEAR" => Ok(Self::ScaleLinear),
            "TEXTTABLE" => Ok(Self::TextTable),
            "COMPUCODE" => Ok(Self::CompuCode),
            _ => Err(format!("unknown compu method category {s}")),
        }
    }
}

impl Display for CompuCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Identical => "IDENTICAL",
            Self::Linear => "LINEAR",
            Self::ScaleLinear => "SCALE-LINEAR",
            Self::TextTable => "TEXTTABLE",
            Self::CompuCode => "COMPUCODE",
        })
    }
}

impl CompuMethod {
    pub(crate) fn from_et(
        et: &Element,
        parser: &mut ParserState,
        internal_type: ValueKind,
        physical_type: ValueKind,
    ) -> Result<Self, OdxError> {
        parser.expect_child(et, "CATEGORY")?;
        let category = parser
            .parse_optional::<CompuCategory>(et, "CATEGORY")?
            .unwrap_or(CompuCategory::Identical);
        let compu_internal_to_phys = et
            .find("COMPU-INTERNAL-TO-PHYS")
            .map(|citp_et| {
                CompuInternalToPhys::from_et(citp_et, parser, internal_type, physical_type)
            })
            .transpose()?;

        let compu_method = Self {
            category,
            compu_internal_to_phys,
            internal_type,
            physical_type,
        };
        if let Err(description) = compu_method.check_category() {
            parser.error_or_log(OdxError::InvalidValue {
                text: category.to_string(),
                element: "COMPU-METHOD/CATEGORY".to_string(),
                description,
            })?;
        }

        Ok(compu_method)
    }

    /// an identical computation method between the given kinds
    pub fn identical(internal_type: ValueKind, physical_type: ValueKind) -> Self {
        Self {
            category: CompuCategory::Identical,
            compu_internal_to_phys: None,
            internal_type,
            physical_type,
        }
    }

    // check that the conversion rules fit the category
    fn check_category(&self) -> Result<(), String> {
        let scales = self
            .compu_internal_to_phys
            .as_ref()
            .map(|citp| citp.compu_scales.as_slice())
            .unwrap_or_default();
        match self.category {
            CompuCategory::Identical => Ok(()),
            CompuCategory::Linear => {
                if scales.len() == 1 && scales[0].compu_rational_coeffs.is_some() {
                    Ok(())
                } else {
                    Err("a LINEAR computation method requires exactly one scale with rational \
                         coefficients"
                        .to_string())
                }
            }
            CompuCategory::ScaleLinear => {
                if !scales.is_empty()
                    && scales.iter().all(|scale| scale.compu_rational_coeffs.is_some())
                {
                    Ok(())
                } else {
                    Err("a SCALE-LINEAR computation method requires scales with rational \
                         coefficients"
                        .to_string())
                }
            }
            CompuCategory::TextTable => {
                if scales.iter().all(|scale| scale.compu_const.is_some()) {
                    Ok(())
                } else {
                    Err(
                        "all scales of a TEXTTABLE computation method require a constant"
                            .to_string(),
                    )
                }
            }
            CompuCategory::CompuCode => {
                if self
                    .compu_internal_to_phys
                    .as_ref()
                    .is_some_and(|citp| citp.prog_code.is_some())
                {
                    Ok(())
                } else {
                    Err("a COMPUCODE computation method requires program code".to_string())
                }
            }
        }
    }

    pub fn convert_internal_to_physical(&self, internal_value: &Value) -> Result<Value, OdxError> {
        match (&self.category, &self.compu_internal_to_phys) {
            (CompuCategory::Identical, _) => internal_value
                .to_kind(self.physical_type)
                .ok_or_else(|| kind_error(internal_value, self.physical_type)),
            (_, Some(citp)) => citp.convert_internal_to_physical(internal_value),
            (category, None) => Err(OdxError::ConversionError {
                description: format!("the {category} computation method has no conversion rules"),
            }),
        }
    }

    pub fn convert_physical_to_internal(&self, physical_value: &Value) -> Result<Value, OdxError> {
        match (&self.category, &self.compu_internal_to_phys) {
            (CompuCategory::Identical, _) => physical_value
                .to_kind(self.internal_type)
                .ok_or_else(|| kind_error(physical_value, self.internal_type)),
            (_, Some(citp)) => citp.convert_physical_to_internal(physical_value),
            (category, None) => Err(OdxError::ConversionError {
                description: format!("the {category} computation method has no conversion rules"),
            }),
        }
    }
}

fn kind_error(value: &Value, kind: ValueKind) -> OdxError {
    OdxError::ConversionError {
        description: format!("{value} can not be represented as {kind:?}"),
    }
}

impl OdxLinked for CompuMethod {
    fn build_odxlinks(&self) -> OdxLinkEntries {
        match &self.compu_internal_to_phys {
            Some(citp) => citp.build_odxlinks(),
            None => Vec::new(),
        }
    }

    fn resolve_odxlinks(
        &self,
        odxlinks: &OdxLinkDatabase,
        log: &mut ErrorLog,
    ) -> Result<(), OdxError> {
        if let Some(citp) = &self.compu_internal_to_phys {
            citp.resolve_odxlinks(odxlinks, log)?;
        }
        Ok(())
    }

    fn resolve_snrefs(
        &self,
        context: &SnRefContext<'_>,
        log: &mut ErrorLog,
    ) -> Result<(), OdxError> {
        if let Some(citp) = &self.compu_internal_to_phys {
            citp.resolve_snrefs(context, log)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::odxlink::{DocType, OdxDocFragment};

    fn build(et: &Element, strict: bool) -> (Result<CompuMethod, OdxError>, ErrorLog) {
        let mut log = ErrorLog::new(strict);
        let mut parser = ParserState::new(
            vec![OdxDocFragment::new("doc", DocType::Container)],
            &mut log,
        );
        let result = CompuMethod::from_et(
            et,
            &mut parser,
            ValueKind::UnsignedInteger,
            ValueKind::Float,
        );
        (result, log)
    }

    fn linear_method() -> Element {
        Element::new("COMPU-METHOD")
            .with_text_child("CATEGORY", "LINEAR")
            .with_child(
                Element::new("COMPU-INTERNAL-TO-PHYS").with_child(
                    Element::new("COMPU-SCALES").with_child(
                        Element::new("COMPU-SCALE").with_child(
                            Element::new("COMPU-RATIONAL-COEFFS")
                                .with_child(
                                    Element::new("COMPU-NUMERATOR")
                                        .with_text_child("V", "0")
                                        .with_text_child("V", "0.1"),
                                )
                                .with_child(
                                    Element::new("COMPU-DENOMINATOR").with_text_child("V", "1"),
                                ),
                        ),
                    ),
                ),
            )
    }

    #[test]
    fn linear() {
        let (result, _) = build(&linear_method(), true);
        let compu_method = result.unwrap();
        assert_eq!(compu_method.category, CompuCategory::Linear);
        assert_eq!(
            compu_method.convert_internal_to_physical(&Value::UInt(25)).unwrap(),
            Value::Float(2.5)
        );
        assert_eq!(
            compu_method.convert_physical_to_internal(&Value::Float(2.5)).unwrap(),
            Value::UInt(25)
        );
    }

    #[test]
    fn identical() {
        let et = Element::new("COMPU-METHOD").with_text_child("CATEGORY", "IDENTICAL");
        let (result, _) = build(&et, true);
        let compu_method = result.unwrap();
        assert_eq!(
            compu_method.convert_physical_to_internal(&Value::Float(7.0)).unwrap(),
            Value::UInt(7)
        );
        assert!(
            compu_method
                .convert_physical_to_internal(&Value::Float(-7.0))
                .is_err()
        );
    }

    #[test]
    fn category_mismatch() {
        let et = Element::new("COMPU-METHOD").with_text_child("CATEGORY", "COMPUCODE");
        let (result, _) = build(&et, true);
        assert!(matches!(result, Err(OdxError::InvalidValue { .. })));

        let (result, log) = build(&et, false);
        let compu_method = result.unwrap();
        assert_eq!(log.messages().len(), 1);
        assert!(
            compu_method
                .convert_internal_to_physical(&Value::UInt(1))
                .is_err()
        );

        let et = Element::new("COMPU-METHOD");
        let (result, _) = build(&et, false);
        assert!(matches!(result, Err(OdxError::MissingElement { .. })));
    }
}
