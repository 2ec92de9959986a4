use std::sync::Arc;

use crate::OdxError;
use crate::dataobjectproperty::{DataObjectProperty, DopBase};
use crate::diagcodedtype::DiagCodedType;
use crate::element::Element;
use crate::encodestate::EncodeState;
use crate::errorlog::ErrorLog;
use crate::namelist::OdxNamed;
use crate::odxlink::{LinkTarget, OdxLink, OdxLinkDatabase, OdxLinkEntries, OdxLinkId, OdxLinked};
use crate::odxtypes::{ParameterValue, ParameterValueDict, Value};
use crate::parser::ParserState;
use crate::snrefcontext::{SnRef, SnRefContext};
use crate::table::Table;

/// A parameter of a structure
#[derive(Debug)]
pub struct Parameter {
    /// only length keys and table keys are required to have an ID
    pub odx_id: Option<OdxLinkId>,
    pub short_name: String,
    pub long_name: Option<String>,
    pub description: Option<String>,
    /// position relative to the start of the enclosing structure; `None` continues at the cursor
    pub byte_position: Option<u32>,
    pub bit_position: Option<u32>,
    pub kind: ParameterKind,
}

#[derive(Debug)]
pub enum ParameterKind {
    /// a fixed value, e.g. a service identifier
    CodedConst {
        diag_coded_type: DiagCodedType,
        coded_value: Value,
    },
    /// a physical value supplied by the caller, or the default
    Value {
        dop: OdxLink<DopBase>,
        physical_default_value: Option<String>,
    },
    /// unused bits
    Reserved { bit_length: u32 },
    /// the length of another parameter whose coded type is PARAM-LENGTH-INFO-TYPE
    LengthKey { dop: OdxLink<DataObjectProperty> },
    /// the key of the selected row of a table
    TableKey { table: OdxLink<Table> },
    /// the structure of the table row selected by a table key
    TableStruct { table_key: SnRef<Parameter> },
}

impl Parameter {
    pub(crate) fn from_et(et: &Element, parser: &mut ParserState) -> Result<Self, OdxError> {
        let xsi_type = parser.expect_attribute(et, "xsi:type")?;
        let short_name = parser.expect_text(et, "SHORT-NAME")?.to_string();
        let odx_id = if matches!(xsi_type, "LENGTH-KEY" | "TABLE-KEY") || et.get("ID").is_some() {
            Some(parser.odx_id(et)?)
        } else {
            None
        };

        let kind = match xsi_type {
            "CODED-CONST" => {
                let diag_coded_type =
                    DiagCodedType::from_et(parser.expect_child(et, "DIAG-CODED-TYPE")?, parser)?;
                let internal_kind = diag_coded_type.base_data_type.kind();
                let coded_value = parser
                    .parse_value(parser.expect_child(et, "CODED-VALUE")?, internal_kind)?
                    .unwrap_or_else(|| Value::zero(internal_kind));
                ParameterKind::CodedConst {
                    diag_coded_type,
                    coded_value,
                }
            }
            "VALUE" => ParameterKind::Value {
                dop: OdxLink::new(parser.odxlink_ref(parser.expect_child(et, "DOP-REF")?)?),
                physical_default_value: et.find_text("PHYSICAL-DEFAULT-VALUE").map(str::to_string),
            },
            "RESERVED" => {
                parser.expect_child(et, "BIT-LENGTH")?;
                ParameterKind::Reserved {
                    bit_length: parser.parse_optional::<u32>(et, "BIT-LENGTH")?.unwrap_or(0),
                }
            }
            "LENGTH-KEY" => ParameterKind::LengthKey {
                dop: OdxLink::new(parser.odxlink_ref(parser.expect_child(et, "DOP-REF")?)?),
            },
            "TABLE-KEY" => ParameterKind::TableKey {
                table: OdxLink::new(parser.odxlink_ref(parser.expect_child(et, "TABLE-REF")?)?),
            },
            "TABLE-STRUCT" => ParameterKind::TableStruct {
                table_key: SnRef::new(&parser.snref(et, "TABLE-KEY-SNREF")?),
            },
            _ => {
                return Err(OdxError::InvalidValue {
                    text: xsi_type.to_string(),
                    element: format!("PARAM {short_name}@xsi:type"),
                    description: "unsupported parameter type".to_string(),
                });
            }
        };

        Ok(Self {
            odx_id,
            short_name,
            long_name: et.find_text("LONG-NAME").map(str::to_string),
            description: et.find_text("DESC").map(str::to_string),
            byte_position: parser.parse_optional::<u32>(et, "BYTE-POSITION")?,
            bit_position: parse_bit_position(et, parser)?,
            kind,
        })
    }

    /// place this parameter at the cursor of `encode_state`
    ///
    /// Length keys and table keys without a supplied row only leave a placeholder here;
    /// they are completed by [`Parameter::encode_deferred_into_pdu`] once the whole
    /// structure is encoded.
    pub(crate) fn encode_into_pdu(&self, encode_state: &mut EncodeState) -> Result<(), OdxError> {
        let supplied_value = encode_state.parameter_values.get(&self.short_name).cloned();

        match &self.kind {
            ParameterKind::CodedConst {
                diag_coded_type,
                coded_value,
            } => {
                if let Some(supplied_value) = supplied_value {
                    let matches_coded_value = matches!(
                        &supplied_value,
                        ParameterValue::Atomic(value) if value.matches(coded_value)
                    );
                    if !matches_coded_value {
                        self.encode_error(
                            encode_state,
                            format!("the value of this parameter must be {coded_value}"),
                        )?;
                    }
                }
                diag_coded_type.encode_into_pdu(coded_value, &self.short_name, encode_state)
            }
            ParameterKind::Value {
                dop,
                physical_default_value,
            } => {
                let Some(dop) = dop.get() else {
                    return self.unresolved(encode_state, &dop.odxlink_ref().ref_id);
                };
                match &*dop {
                    DopBase::DataObjectProperty(dop) => {
                        let physical_value = match (supplied_value, physical_default_value) {
                            (Some(ParameterValue::Atomic(value)), _) => value,
                            (None, Some(default_text)) => {
                                match dop.physical_type.kind().parse_value(default_text) {
                                    Ok(value) => value,
                                    Err(description) => {
                                        self.encode_error(encode_state, description)?;
                                        Value::zero(dop.physical_type.kind())
                                    }
                                }
                            }
                            (None, None) => {
                                let description = "no value was supplied".to_string();
                                self.encode_error(encode_state, description)?;
                                Value::zero(dop.physical_type.kind())
                            }
                            (Some(_), _) => {
                                let description = "expected an atomic value".to_string();
                                self.encode_error(encode_state, description)?;
                                Value::zero(dop.physical_type.kind())
                            }
                        };
                        dop.encode_into_pdu(&physical_value, &self.short_name, encode_state)
                    }
                    DopBase::Structure(structure) => {
                        let nested_values = match supplied_value {
                            Some(ParameterValue::Struct(nested_values)) => nested_values,
                            _ => {
                                let description = format!(
                                    "expected the values of STRUCTURE {}",
                                    structure.short_name
                                );
                                self.encode_error(encode_state, description)?;
                                ParameterValueDict::new()
                            }
                        };
                        let outer_values =
                            std::mem::replace(&mut encode_state.parameter_values, nested_values);
                        let result = structure.encode_into_pdu(encode_state);
                        encode_state.parameter_values = outer_values;
                        result
                    }
                }
            }
            ParameterKind::Reserved { bit_length } => {
                let bits = u64::from(*bit_length) + u64::from(encode_state.cursor_bit_position);
                let Ok(byte_len) = usize::try_from(bits.div_ceil(8)) else {
                    return self.encode_error(encode_state, format!("{bits} bits are too many"));
                };
                encode_state.emplace_atomic_value(&vec![0; byte_len], &self.short_name)
            }
            ParameterKind::LengthKey { dop } => {
                if supplied_value.is_some() {
                    let description =
                        "the value of a length key is computed and must not be supplied";
                    self.encode_error(encode_state, description.to_string())?;
                }
                let Some(dop) = dop.get() else {
                    return self.unresolved(encode_state, &dop.odxlink_ref().ref_id);
                };
                self.encode_placeholder(&dop, encode_state)
            }
            ParameterKind::TableKey { table } => {
                let Some(table) = table.get() else {
                    return self.unresolved(encode_state, &table.odxlink_ref().ref_id);
                };
                match supplied_value {
                    Some(ParameterValue::Atomic(Value::String(row_name))) => {
                        self.select_table_row(&row_name, encode_state)?;
                        table.encode_key_into_pdu(&row_name, &self.short_name, encode_state)
                    }
                    Some(_) => self.encode_error(
                        encode_state,
                        "expected the short name of a table row".to_string(),
                    ),
                    None => match table.key_dop() {
                        Some(key_dop) => self.encode_placeholder(&key_dop, encode_state),
                        None => self.encode_error(
                            encode_state,
                            format!("TABLE {} has no resolved KEY-DOP-REF", table.short_name),
                        ),
                    },
                }
            }
            ParameterKind::TableStruct { table_key } => {
                let Some(key_param) = table_key.get() else {
                    return self.unresolved(encode_state, table_key.short_name());
                };
                let ParameterKind::TableKey { table } = &key_param.kind else {
                    return self.encode_error(
                        encode_state,
                        format!("{} is not a table key", key_param.short_name),
                    );
                };
                let Some(ParameterValue::TableRow {
                    row: row_name,
                    value: nested_values,
                }) = supplied_value
                else {
                    return self.encode_error(
                        encode_state,
                        "expected a table row and the values of its structure".to_string(),
                    );
                };
                key_param.select_table_row(&row_name, encode_state)?;

                let row = table
                    .get()
                    .and_then(|table| table.table_rows.get(&row_name).cloned());
                let Some(row) = row else {
                    return self.encode_error(encode_state, format!("unknown table row {row_name}"));
                };
                // rows without a structure have nothing to encode
                let Some(structure) = row.structure() else {
                    return Ok(());
                };
                let outer_values =
                    std::mem::replace(&mut encode_state.parameter_values, nested_values);
                let result = structure.encode_into_pdu(encode_state);
                encode_state.parameter_values = outer_values;
                result
            }
        }
    }

    /// write the final value of a length key or a table key into its placeholder
    pub(crate) fn encode_deferred_into_pdu(
        &self,
        encode_state: &mut EncodeState,
    ) -> Result<(), OdxError> {
        let Some(key_pos) = encode_state.key_pos.remove(&self.short_name) else {
            return Ok(());
        };
        let cursor_byte_position = encode_state.cursor_byte_position;
        encode_state.cursor_byte_position = key_pos;
        encode_state.cursor_bit_position = self.bit_position.unwrap_or(0);

        let result = match &self.kind {
            ParameterKind::LengthKey { dop } => {
                match (encode_state.length_keys.remove(&self.short_name), dop.get()) {
                    (Some(bit_length), Some(dop)) => dop.encode_into_pdu(
                        &Value::UInt(u64::from(bit_length)),
                        &self.short_name,
                        encode_state,
                    ),
                    (None, _) => self.encode_error(
                        encode_state,
                        "no parameter uses this length key".to_string(),
                    ),
                    (_, None) => self.unresolved(encode_state, &dop.odxlink_ref().ref_id),
                }
            }
            ParameterKind::TableKey { table } => {
                match (encode_state.table_keys.get(&self.short_name).cloned(), table.get()) {
                    (Some(row_name), Some(table)) => {
                        table.encode_key_into_pdu(&row_name, &self.short_name, encode_state)
                    }
                    (None, _) => self.encode_error(
                        encode_state,
                        "no table row was selected for this table key".to_string(),
                    ),
                    (_, None) => self.unresolved(encode_state, &table.odxlink_ref().ref_id),
                }
            }
            _ => Ok(()),
        };

        encode_state.cursor_byte_position = cursor_byte_position;
        encode_state.cursor_bit_position = 0;
        result
    }

    // remember the position of a key and leave zero bits, so that the key can be written later
    fn encode_placeholder(
        &self,
        dop: &DataObjectProperty,
        encode_state: &mut EncodeState,
    ) -> Result<(), OdxError> {
        let Some(len) = dop
            .diag_coded_type
            .placeholder_len(encode_state.cursor_bit_position)
        else {
            return self.encode_error(
                encode_state,
                format!(
                    "the key DOP {} must use a STANDARD-LENGTH-TYPE",
                    dop.short_name
                ),
            );
        };
        encode_state
            .key_pos
            .insert(self.short_name.clone(), encode_state.cursor_byte_position);
        encode_state.emplace_atomic_value(&vec![0; len], &self.short_name)
    }

    // record the row selected for this table key
    fn select_table_row(
        &self,
        row_name: &str,
        encode_state: &mut EncodeState,
    ) -> Result<(), OdxError> {
        match encode_state.table_keys.get(&self.short_name) {
            Some(selected) if selected != row_name => {
                let description =
                    format!("table row {row_name} conflicts with the selected row {selected}");
                self.encode_error(encode_state, description)
            }
            Some(_) => Ok(()),
            None => {
                encode_state
                    .table_keys
                    .insert(self.short_name.clone(), row_name.to_string());
                Ok(())
            }
        }
    }

    fn encode_error(
        &self,
        encode_state: &mut EncodeState,
        description: String,
    ) -> Result<(), OdxError> {
        encode_state.log.error_or_log(OdxError::EncodeError {
            param_name: self.short_name.clone(),
            description,
        })
    }

    fn unresolved(&self, encode_state: &mut EncodeState, reference: &str) -> Result<(), OdxError> {
        self.encode_error(encode_state, format!("the reference {reference} is not resolved"))
    }
}

// the bit position inside the byte at BYTE-POSITION, 0-7
fn parse_bit_position(et: &Element, parser: &mut ParserState) -> Result<Option<u32>, OdxError> {
    match parser.parse_optional::<u32>(et, "BIT-POSITION")? {
        Some(bit_position) if bit_position > 7 => {
            parser.error_or_log(OdxError::InvalidValue {
                text: bit_position.to_string(),
                element: "BIT-POSITION".to_string(),
                description: "the bit position must be in the range 0-7".to_string(),
            })?;
            Ok(Some(0))
        }
        bit_position => Ok(bit_position),
    }
}

impl OdxNamed for Parameter {
    fn short_name(&self) -> &str {
        &self.short_name
    }
}

impl OdxLinked for Arc<Parameter> {
    fn build_odxlinks(&self) -> OdxLinkEntries {
        let mut result = Vec::new();
        if let Some(odx_id) = &self.odx_id {
            result.push((odx_id.clone(), LinkTarget::from(self)));
        }
        if let ParameterKind::CodedConst {
            diag_coded_type, ..
        } = &self.kind
        {
            result.extend(diag_coded_type.build_odxlinks());
        }
        result
    }

    fn resolve_odxlinks(
        &self,
        odxlinks: &OdxLinkDatabase,
        log: &mut ErrorLog,
    ) -> Result<(), OdxError> {
        match &self.kind {
            ParameterKind::CodedConst {
                diag_coded_type, ..
            } => diag_coded_type.resolve_odxlinks(odxlinks, log),
            ParameterKind::Value { dop, .. } => dop.resolve(odxlinks, log),
            ParameterKind::LengthKey { dop } => dop.resolve(odxlinks, log),
            ParameterKind::TableKey { table } => table.resolve(odxlinks, log),
            ParameterKind::Reserved { .. } | ParameterKind::TableStruct { .. } => Ok(()),
        }
    }

    // the table key of a table struct is a parameter of the enclosing structure
    fn resolve_snrefs(
        &self,
        context: &SnRefContext<'_>,
        log: &mut ErrorLog,
    ) -> Result<(), OdxError> {
        if let ParameterKind::TableStruct { table_key } = &self.kind {
            let parameters = context.structure.map(|structure| &structure.parameters);
            let scope = match context.structure {
                Some(structure) => format!("STRUCTURE {}", structure.short_name),
                None => format!("PARAM {} (no enclosing STRUCTURE)", self.short_name),
            };
            table_key.resolve_in(parameters, &scope, log)?;
        }
        Ok(())
    }
}
