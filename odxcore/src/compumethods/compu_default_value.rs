use crate::OdxError;
use crate::element::Element;
use crate::odxtypes::{Value, ValueKind};
use crate::parser::ParserState;

use super::compu_scale::{CompuConst, CompuInverseValue};

/// The physical value used when no scale applies to an internal value
#[derive(Debug, Clone, PartialEq)]
pub struct CompuDefaultValue {
    pub value: Option<Value>,
    pub compu_inverse_value: Option<CompuInverseValue>,
}

impl CompuDefaultValue {
    pub(crate) fn from_et(
        et: &Element,
        parser: &mut ParserState,
        internal_type: ValueKind,
        physical_type: ValueKind,
    ) -> Result<Self, OdxError> {
        let value = if et.find("V").is_some() || et.find("VT").is_some() {
            CompuConst::from_et(et, parser, physical_type)?.map(|compu_const| compu_const.value)
        } else {
            None
        };
        let compu_inverse_value = match et.find("COMPU-INVERSE-VALUE") {
            Some(civ_et) => CompuConst::from_et(civ_et, parser, internal_type)?,
            None => None,
        };

        Ok(Self {
            value,
            compu_inverse_value,
        })
    }
}
