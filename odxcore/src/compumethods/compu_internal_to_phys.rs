use crate::OdxError;
use crate::element::Element;
use crate::errorlog::ErrorLog;
use crate::odxlink::{OdxLinkDatabase, OdxLinkEntries, OdxLinked};
use crate::odxtypes::{Value, ValueKind};
use crate::parser::ParserState;
use crate::progcode::ProgCode;
use crate::snrefcontext::SnRefContext;

use super::compu_default_value::CompuDefaultValue;
use super::compu_scale::CompuScale;

/// The conversion rules from internal to physical values
///
/// Scales are evaluated in order and the first one whose domain contains the value wins.
/// If no scale applies, the program code is responsible for the conversion. Without
/// program code the default value is used, and without a default value the conversion fails.
#[derive(Debug)]
pub struct CompuInternalToPhys {
    pub compu_scales: Vec<CompuScale>,
    pub prog_code: Option<ProgCode>,
    pub compu_default_value: Option<CompuDefaultValue>,
}

impl CompuInternalToPhys {
    pub(crate) fn from_et(
        et: &Element,
        parser: &mut ParserState,
        internal_type: ValueKind,
        physical_type: ValueKind,
    ) -> Result<Self, OdxError> {
        let compu_scales = et
            .findall("COMPU-SCALES/COMPU-SCALE")
            .into_iter()
            .map(|scale_et| CompuScale::from_et(scale_et, parser, internal_type, physical_type))
            .collect::<Result<Vec<_>, _>>()?;
        let prog_code = et
            .find("PROG-CODE")
            .map(|pc_et| ProgCode::from_et(pc_et, parser))
            .transpose()?;
        let compu_default_value = et
            .find("COMPU-DEFAULT-VALUE")
            .map(|cdv_et| CompuDefaultValue::from_et(cdv_et, parser, internal_type, physical_type))
            .transpose()?;

        Ok(Self {
            compu_scales,
            prog_code,
            compu_default_value,
        })
    }

    pub fn convert_internal_to_physical(&self, internal_value: &Value) -> Result<Value, OdxError> {
        if let Some(scale) = self
            .compu_scales
            .iter()
            .find(|scale| scale.applies(internal_value))
        {
            return scale.convert_internal_to_physical(internal_value);
        }

        if let Some(prog_code) = &self.prog_code {
            return Err(prog_code_error(prog_code, internal_value));
        }

        self.compu_default_value
            .as_ref()
            .and_then(|default_value| default_value.value.clone())
            .ok_or_else(|| OdxError::ConversionError {
                description: format!(
                    "no compu scale applies to the internal value {internal_value}"
                ),
            })
    }

    pub fn convert_physical_to_internal(&self, physical_value: &Value) -> Result<Value, OdxError> {
        for scale in &self.compu_scales {
            if let Some(internal_value) = scale.convert_physical_to_internal(physical_value)? {
                return Ok(internal_value);
            }
        }

        if let Some(prog_code) = &self.prog_code {
            return Err(prog_code_error(prog_code, physical_value));
        }

        if let Some(CompuDefaultValue {
            value: Some(default_value),
            compu_inverse_value: Some(inverse_value),
        }) = &self.compu_default_value
        {
            if default_value.matches(physical_value) {
                return Ok(inverse_value.value.clone());
            }
        }

        Err(OdxError::ConversionError {
            description: format!("no compu scale applies to the physical value {physical_value}"),
        })
    }
}

fn prog_code_error(prog_code: &ProgCode, value: &Value) -> OdxError {
    OdxError::ConversionError {
        description: format!(
            "converting {value} requires the program code {}, which can not be executed",
            prog_code.code_file
        ),
    }
}

impl OdxLinked for CompuInternalToPhys {
    fn build_odxlinks(&self) -> OdxLinkEntries {
        match &self.prog_code {
            Some(prog_code) => prog_code.build_odxlinks(),
            None => Vec::new(),
        }
    }

    fn resolve_odxlinks(
        &self,
        odxlinks: &OdxLinkDatabase,
        log: &mut ErrorLog,
    ) -> Result<(), OdxError> {
        if let Some(prog_code) = &self.prog_code {
            prog_code.resolve_odxlinks(odxlinks, log)?;
        }
        Ok(())
    }

    fn resolve_snrefs(
        &self,
        context: &SnRefContext<'_>,
        log: &mut ErrorLog,
    ) -> Result<(), OdxError> {
        if let Some(prog_code) = &self.prog_code {
            prog_code.resolve_snrefs(context, log)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::odxlink::{DocType, OdxDocFragment};

    fn scale(lower: &str, upper: &str, text: &str) -> Element {
        Element::new("COMPU-SCALE")
            .with_text_child("LOWER-LIMIT", lower)
            .with_text_child("UPPER-LIMIT", upper)
            .with_child(Element::new("COMPU-CONST").with_text_child("VT", text))
    }

    fn texttable() -> Element {
        Element::new("COMPU-INTERNAL-TO-PHYS")
            .with_child(
                Element::new("COMPU-SCALES")
                    .with_child(scale("0", "9", "low"))
                    .with_child(scale("10", "19", "high")),
            )
            .with_child(
                Element::new("COMPU-DEFAULT-VALUE")
                    .with_text_child("VT", "unknown")
                    .with_child(Element::new("COMPU-INVERSE-VALUE").with_text_child("V", "255")),
            )
    }

    fn build(et: &Element, log: &mut ErrorLog) -> Result<CompuInternalToPhys, OdxError> {
        let mut parser = ParserState::new(
            vec![OdxDocFragment::new("doc", DocType::Container)],
            log,
        );
        CompuInternalToPhys::from_et(
            et,
            &mut parser,
            ValueKind::UnsignedInteger,
            ValueKind::String,
        )
    }

    #[test]
    fn first_matching_scale_or_default() {
        let mut log = ErrorLog::new(true);
        let citp = build(&texttable(), &mut log).unwrap();
        assert_eq!(citp.compu_scales.len(), 2);
        assert!(citp.prog_code.is_none());
        assert!(citp.build_odxlinks().is_empty());

        let convert = |internal: u64| {
            citp.convert_internal_to_physical(&Value::UInt(internal))
                .unwrap()
        };
        assert_eq!(convert(5), Value::from("low"));
        assert_eq!(convert(15), Value::from("high"));
        assert_eq!(convert(99), Value::from("unknown"));

        assert_eq!(
            citp.convert_physical_to_internal(&Value::from("high")).unwrap(),
            Value::UInt(10)
        );
        assert_eq!(
            citp.convert_physical_to_internal(&Value::from("unknown")).unwrap(),
            Value::UInt(255)
        );
        assert!(matches!(
            citp.convert_physical_to_internal(&Value::from("medium")),
            Err(OdxError::ConversionError { .. })
        ));
    }

    #[test]
    fn no_default_value() {
        let et = Element::new("COMPU-INTERNAL-TO-PHYS").with_child(
            Element::new("COMPU-SCALES").with_child(scale("0", "9", "low")),
        );
        let mut log = ErrorLog::new(true);
        let citp = build(&et, &mut log).unwrap();
        assert!(citp.compu_default_value.is_none());
        assert!(matches!(
            citp.convert_internal_to_physical(&Value::UInt(10)),
            Err(OdxError::ConversionError { .. })
        ));
    }

    #[test]
    fn prog_code_conversion() {
        let et = Element::new("COMPU-INTERNAL-TO-PHYS")
            .with_child(Element::new("COMPU-SCALES").with_child(scale("0", "9", "low")))
            .with_child(
                Element::new("PROG-CODE")
                    .with_text_child("CODE-FILE", "convert.jar")
                    .with_text_child("SYNTAX", "JAR")
                    .with_text_child("REVISION", "1"),
            )
            .with_child(Element::new("COMPU-DEFAULT-VALUE").with_text_child("VT", "unknown"));
        let mut log = ErrorLog::new(true);
        let citp = build(&et, &mut log).unwrap();

        // scales still take precedence
        assert_eq!(
            citp.convert_internal_to_physical(&Value::UInt(1)).unwrap(),
            Value::from("low")
        );
        // the program code is used instead of the default value
        match citp.convert_internal_to_physical(&Value::UInt(50)) {
            Err(OdxError::ConversionError { description }) => {
                assert!(description.contains("convert.jar"));
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn invalid_limits_are_reported() {
        let et = Element::new("COMPU-INTERNAL-TO-PHYS").with_child(
            Element::new("COMPU-SCALES").with_child(scale("zero", "9", "low")),
        );
        let mut log = ErrorLog::new(true);
        assert!(matches!(
            build(&et, &mut log),
            Err(OdxError::InvalidValue { .. })
        ));

        let mut log = ErrorLog::new(false);
        let citp = build(&et, &mut log).unwrap();
        assert_eq!(log.messages().len(), 1);
        // without a usable lower limit the scale covers everything up to 9
        assert_eq!(
            citp.convert_internal_to_physical(&Value::UInt(3)).unwrap(),
            Value::from("low")
        );
    }
}
