use std::sync::Arc;

use crate::element::{Element, IdentifiableElement};
use crate::encodestate::EncodeState;
use crate::errorlog::ErrorLog;
use crate::namelist::{NamedItemList, OdxNamed};
use crate::odxlink::{LinkTarget, OdxLinkDatabase, OdxLinkEntries, OdxLinkId, OdxLinked};
use crate::odxtypes::ParameterValueDict;
use crate::parameters::Parameter;
use crate::parser::ParserState;
use crate::snrefcontext::SnRefContext;
use crate::{MAX_NESTING_DEPTH, OdxError};

/// A sequence of parameters, e.g. the payload of a request or a response
#[derive(Debug)]
pub struct Structure {
    pub odx_id: OdxLinkId,
    pub short_name: String,
    pub long_name: Option<String>,
    pub description: Option<String>,
    /// if set, the structure is padded to this size
    pub byte_size: Option<u32>,
    pub parameters: NamedItemList<Arc<Parameter>>,
}

impl Structure {
    pub(crate) fn from_et(et: &Element, parser: &mut ParserState) -> Result<Self, OdxError> {
        let IdentifiableElement {
            odx_id,
            short_name,
            long_name,
            description,
        } = IdentifiableElement::from_et(et, parser)?;
        let mut parameters = NamedItemList::new();
        for param_et in et.findall("PARAMS/PARAM") {
            let parameter = Arc::new(Parameter::from_et(param_et, parser)?);
            parser.push_unique(&mut parameters, parameter, "PARAMS")?;
        }

        Ok(Self {
            odx_id,
            short_name,
            long_name,
            description,
            byte_size: parser.parse_optional::<u32>(et, "BYTE-SIZE")?,
            parameters,
        })
    }

    /// encode a PDU from the physical values of the parameters
    ///
    /// The structure starts at `origin_byte_position`; the bytes before it are zero.
    /// Returns the coded message and, in lenient mode, the warnings produced on the way.
    pub fn encode(
        &self,
        parameter_values: &ParameterValueDict,
        origin_byte_position: usize,
        triggering_request: Option<&[u8]>,
        strict: bool,
    ) -> Result<(Vec<u8>, Vec<OdxError>), OdxError> {
        let mut encode_state = EncodeState::new(
            parameter_values.clone(),
            origin_byte_position,
            triggering_request,
            strict,
        );
        self.encode_into_pdu(&mut encode_state)?;
        tracing::debug!(
            "encoded STRUCTURE {} into {} bytes",
            self.short_name,
            encode_state.coded_message.len()
        );
        Ok(encode_state.into_message())
    }

    /// encode the parameters of this structure starting at the cursor of `encode_state`
    ///
    /// Byte positions of the parameters are relative to the cursor position on entry.
    /// The values of the parameters are taken from `encode_state.parameter_values`.
    pub fn encode_into_pdu(&self, encode_state: &mut EncodeState) -> Result<(), OdxError> {
        if encode_state.nesting_depth >= MAX_NESTING_DEPTH {
            return Err(OdxError::NestingTooDeep {
                element: self.short_name.clone(),
                max_depth: MAX_NESTING_DEPTH,
            });
        }
        encode_state.nesting_depth += 1;
        let outer_origin = encode_state.origin_byte_position;
        let outer_is_end_of_pdu = encode_state.is_end_of_pdu;

        let result = self.encode_parameters(encode_state);

        encode_state.origin_byte_position = outer_origin;
        encode_state.is_end_of_pdu = outer_is_end_of_pdu;
        encode_state.nesting_depth -= 1;
        result
    }

    fn encode_parameters(&self, encode_state: &mut EncodeState) -> Result<(), OdxError> {
        let outer_is_end_of_pdu = encode_state.is_end_of_pdu;
        let origin = encode_state.cursor_byte_position;
        encode_state.origin_byte_position = origin;
        encode_state.cursor_bit_position = 0;

        let mut unknown_names: Vec<String> = encode_state
            .parameter_values
            .keys()
            .filter(|name| !self.parameters.contains_key(name))
            .cloned()
            .collect();
        unknown_names.sort();
        for name in unknown_names {
            encode_state.log.error_or_log(OdxError::EncodeError {
                param_name: name,
                description: format!("STRUCTURE {} has no such parameter", self.short_name),
            })?;
        }

        let mut end_position = origin;
        let param_count = self.parameters.len();
        for (idx, parameter) in self.parameters.iter().enumerate() {
            // only the last parameter of the outermost structure is at the end of the PDU
            encode_state.is_end_of_pdu = outer_is_end_of_pdu && idx + 1 == param_count;
            if let Some(byte_position) = parameter.byte_position {
                encode_state.cursor_byte_position = origin + byte_position as usize;
            }
            encode_state.cursor_bit_position = parameter.bit_position.unwrap_or(0);

            parameter.encode_into_pdu(encode_state)?;
            end_position = end_position.max(encode_state.cursor_byte_position);
        }

        // length keys and table keys can only be written once all parameters are known
        encode_state.cursor_byte_position = end_position;
        for parameter in &self.parameters {
            parameter.encode_deferred_into_pdu(encode_state)?;
        }

        encode_state.cursor_byte_position = end_position;
        encode_state.cursor_bit_position = 0;
        if let Some(byte_size) = self.byte_size {
            let size = end_position - origin;
            let byte_size = byte_size as usize;
            if size > byte_size {
                encode_state.log.error_or_log(OdxError::EncodeError {
                    param_name: self.short_name.clone(),
                    description: format!(
                        "the encoded structure needs {size} bytes, but its BYTE-SIZE is {byte_size}"
                    ),
                })?;
            } else {
                encode_state.emplace_atomic_value(&vec![0; byte_size - size], &self.short_name)?;
            }
        }

        Ok(())
    }
}

impl OdxNamed for Structure {
    fn short_name(&self) -> &str {
        &self.short_name
    }
}

impl OdxLinked for Arc<Structure> {
    fn build_odxlinks(&self) -> OdxLinkEntries {
        let mut result = vec![(self.odx_id.clone(), LinkTarget::from(self))];
        for parameter in &self.parameters {
            result.extend(parameter.build_odxlinks());
        }
        result
    }

    fn resolve_odxlinks(
        &self,
        odxlinks: &OdxLinkDatabase,
        log: &mut ErrorLog,
    ) -> Result<(), OdxError> {
        for parameter in &self.parameters {
            parameter.resolve_odxlinks(odxlinks, log)?;
        }
        Ok(())
    }

    fn resolve_snrefs(
        &self,
        context: &SnRefContext<'_>,
        log: &mut ErrorLog,
    ) -> Result<(), OdxError> {
        let context = SnRefContext {
            structure: Some(&**self),
            ..*context
        };
        for parameter in &self.parameters {
            parameter.resolve_snrefs(&context, log)?;
        }
        Ok(())
    }
}
