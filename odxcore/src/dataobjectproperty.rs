use std::sync::Arc;

use crate::OdxError;
use crate::compumethods::CompuMethod;
use crate::diagcodedtype::DiagCodedType;
use crate::element::{Element, IdentifiableElement};
use crate::encodestate::EncodeState;
use crate::errorlog::ErrorLog;
use crate::namelist::OdxNamed;
use crate::odxlink::{LinkTarget, OdxLinkDatabase, OdxLinkEntries, OdxLinkId, OdxLinked};
use crate::odxtypes::{DataType, Value};
use crate::parser::ParserState;
use crate::snrefcontext::SnRefContext;
use crate::structure::Structure;

/// A data object property: a computation method and the coded type of the internal value
#[derive(Debug)]
pub struct DataObjectProperty {
    pub odx_id: OdxLinkId,
    pub short_name: String,
    pub long_name: Option<String>,
    pub description: Option<String>,
    pub compu_method: CompuMethod,
    pub diag_coded_type: DiagCodedType,
    pub physical_type: DataType,
}

/// The target of a DOP-REF: either a simple data object property or a structure
#[derive(Debug, Clone)]
pub enum DopBase {
    DataObjectProperty(Arc<DataObjectProperty>),
    Structure(Arc<Structure>),
}

impl DataObjectProperty {
    pub(crate) fn from_et(et: &Element, parser: &mut ParserState) -> Result<Self, OdxError> {
        let IdentifiableElement {
            odx_id,
            short_name,
            long_name,
            description,
        } = IdentifiableElement::from_et(et, parser)?;

        let diag_coded_type =
            DiagCodedType::from_et(parser.expect_child(et, "DIAG-CODED-TYPE")?, parser)?;
        let physical_type_et = parser.expect_child(et, "PHYSICAL-TYPE")?;
        parser.expect_attribute(physical_type_et, "BASE-DATA-TYPE")?;
        let physical_type = parser
            .parse_attribute::<DataType>(physical_type_et, "BASE-DATA-TYPE")?
            .unwrap_or(diag_coded_type.base_data_type);
        let compu_method = CompuMethod::from_et(
            parser.expect_child(et, "COMPU-METHOD")?,
            parser,
            diag_coded_type.base_data_type.kind(),
            physical_type.kind(),
        )?;

        Ok(Self {
            odx_id,
            short_name,
            long_name,
            description,
            compu_method,
            diag_coded_type,
            physical_type,
        })
    }

    /// convert a physical value and place it at the cursor
    ///
    /// In lenient mode a value that can't be converted is logged and encoded as zero.
    pub fn encode_into_pdu(
        &self,
        physical_value: &Value,
        param_name: &str,
        encode_state: &mut EncodeState,
    ) -> Result<(), OdxError> {
        let internal_value = match self.compu_method.convert_physical_to_internal(physical_value) {
            Ok(internal_value) => internal_value,
            Err(err) => {
                encode_state.log.error_or_log(err)?;
                Value::zero(self.diag_coded_type.base_data_type.kind())
            }
        };
        self.diag_coded_type
            .encode_into_pdu(&internal_value, param_name, encode_state)
    }
}

impl OdxNamed for DataObjectProperty {
    fn short_name(&self) -> &str {
        &self.short_name
    }
}

impl OdxLinked for Arc<DataObjectProperty> {
    fn build_odxlinks(&self) -> OdxLinkEntries {
        let mut result = vec![(self.odx_id.clone(), LinkTarget::from(self))];
        result.extend(self.compu_method.build_odxlinks());
        result.extend(self.diag_coded_type.build_odxlinks());
        result
    }

    fn resolve_odxlinks(
        &self,
        odxlinks: &OdxLinkDatabase,
        log: &mut ErrorLog,
    ) -> Result<(), OdxError> {
        self.compu_method.resolve_odxlinks(odxlinks, log)?;
        self.diag_coded_type.resolve_odxlinks(odxlinks, log)
    }

    fn resolve_snrefs(
        &self,
        context: &SnRefContext<'_>,
        log: &mut ErrorLog,
    ) -> Result<(), OdxError> {
        self.compu_method.resolve_snrefs(context, log)?;
        self.diag_coded_type.resolve_snrefs(context, log)
    }
}

impl DopBase {
    pub fn short_name(&self) -> &str {
        match self {
            Self::DataObjectProperty(dop) => &dop.short_name,
            Self::Structure(structure) => &structure.short_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::odxlink::{DocType, OdxDocFragment, OdxLinkRef};
    use crate::odxtypes::ParameterValueDict;
    use pretty_assertions::assert_eq;

    fn temperature_et() -> Element {
        Element::new("DATA-OBJECT-PROP")
            .with_attr("ID", "dop.temperature")
            .with_text_child("SHORT-NAME", "temperature")
            .with_child(
                Element::new("COMPU-METHOD")
                    .with_text_child("CATEGORY", "LINEAR")
                    .with_child(
                        Element::new("COMPU-INTERNAL-TO-PHYS").with_child(
                            Element::new("COMPU-SCALES").with_child(
                                Element::new("COMPU-SCALE")
                                    .with_text_child("LOWER-LIMIT", "0")
                                    .with_text_child("UPPER-LIMIT", "255")
                                    .with_child(
                                        Element::new("COMPU-RATIONAL-COEFFS")
                                            .with_child(
                                                Element::new("COMPU-NUMERATOR")
                                                    .with_text_child("V", "-40")
                                                    .with_text_child("V", "1"),
                                            )
                                            .with_child(
                                                Element::new("COMPU-DENOMINATOR")
                                                    .with_text_child("V", "1"),
                                            ),
                                    ),
                            ),
                        ),
                    ),
            )
            .with_child(
                Element::new("DIAG-CODED-TYPE")
                    .with_attr("xsi:type", "STANDARD-LENGTH-TYPE")
                    .with_attr("BASE-DATA-TYPE", "A_UINT32")
                    .with_text_child("BIT-LENGTH", "8"),
            )
            .with_child(Element::new("PHYSICAL-TYPE").with_attr("BASE-DATA-TYPE", "A_FLOAT64"))
    }

    fn fragments() -> Vec<OdxDocFragment> {
        vec![OdxDocFragment::new("doc", DocType::Container)]
    }

    #[test]
    fn encode_physical_values() {
        let mut log = ErrorLog::new(true);
        let mut parser = ParserState::new(fragments(), &mut log);
        let dop = DataObjectProperty::from_et(&temperature_et(), &mut parser).unwrap();
        assert_eq!(dop.physical_type, DataType::AFloat64);

        let mut state = EncodeState::new(ParameterValueDict::new(), 0, None, true);
        dop.encode_into_pdu(&Value::Float(25.0), "temperature", &mut state)
            .unwrap();
        assert_eq!(state.coded_message, vec![65]);

        // out of range in strict mode
        let mut state = EncodeState::new(ParameterValueDict::new(), 0, None, true);
        assert!(matches!(
            dop.encode_into_pdu(&Value::Float(300.0), "temperature", &mut state),
            Err(OdxError::ConversionError { .. })
        ));

        // lenient mode encodes zero instead
        let mut state = EncodeState::new(ParameterValueDict::new(), 0, None, false);
        dop.encode_into_pdu(&Value::Float(300.0), "temperature", &mut state)
            .unwrap();
        assert_eq!(state.coded_message, vec![0]);
        assert_eq!(state.warnings().len(), 1);
    }

    #[test]
    fn dop_base_links() {
        let mut log = ErrorLog::new(true);
        let mut parser = ParserState::new(fragments(), &mut log);
        let dop = Arc::new(DataObjectProperty::from_et(&temperature_et(), &mut parser).unwrap());

        let mut odxlinks = OdxLinkDatabase::new();
        odxlinks.update(dop.build_odxlinks()).unwrap();
        let dop_base: Arc<DopBase> = odxlinks
            .resolve(&OdxLinkRef::new("dop.temperature", fragments()))
            .unwrap();
        assert_eq!(dop_base.short_name(), "temperature");
        assert!(matches!(
            &*dop_base,
            DopBase::DataObjectProperty(target) if Arc::ptr_eq(target, &dop)
        ));
    }
}
