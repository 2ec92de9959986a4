use std::str::FromStr;

use crate::OdxError;
use crate::element::Element;
use crate::encodestate::EncodeState;
use crate::errorlog::ErrorLog;
use crate::odxlink::{OdxLink, OdxLinkDatabase, OdxLinkEntries, OdxLinked};
use crate::odxtypes::{DataType, Value, ValueKind};
use crate::parameters::Parameter;
use crate::parser::ParserState;
use crate::snrefcontext::SnRefContext;

/// The termination of a field with a variable length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Zero,
    HexFf,
    EndOfPdu,
}

/// How the length of a coded value is determined
#[derive(Debug)]
pub enum CodedLength {
    /// a fixed number of bits, optionally masked
    Standard {
        bit_length: u32,
        bit_mask: Option<Vec<u8>>,
    },
    /// a variable number of bytes, terminated unless the maximum is reached
    MinMax {
        min_length: u32,
        max_length: Option<u32>,
        termination: Termination,
    },
    /// the length is given by the value; it is stored into a length-key parameter
    ParamLengthInfo { length_key: OdxLink<Parameter> },
}

/// The rule for turning an internal value into bits
#[derive(Debug)]
pub struct DiagCodedType {
    pub base_data_type: DataType,
    pub is_highlow_byte_order: bool,
    pub length: CodedLength,
}

impl FromStr for Termination {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ZERO" => Ok(Self::Zero),
            "HEX-FF" => Ok(Self::HexFf),
            "END-OF-PDU" => Ok(Self::EndOfPdu),
            _ => Err(format!("unknown termination {s}")),
        }
    }
}

impl DiagCodedType {
    pub(crate) fn from_et(et: &Element, parser: &mut ParserState) -> Result<Self, OdxError> {
        let xsi_type = parser.expect_attribute(et, "xsi:type")?;
        parser.expect_attribute(et, "BASE-DATA-TYPE")?;
        let base_data_type = parser
            .parse_attribute::<DataType>(et, "BASE-DATA-TYPE")?
            .unwrap_or(DataType::ABytefield);
        let is_highlow_byte_order = parser
            .parse_attribute::<bool>(et, "IS-HIGHLOW-BYTE-ORDER")?
            .unwrap_or(true);

        let length = match xsi_type {
            "STANDARD-LENGTH-TYPE" => {
                parser.expect_child(et, "BIT-LENGTH")?;
                let bit_length = parser.parse_optional::<u32>(et, "BIT-LENGTH")?.unwrap_or(0);
                let bit_mask = match et.find_text("BIT-MASK") {
                    Some(text) => parse_bit_mask(text, parser)?,
                    None => None,
                };
                CodedLength::Standard {
                    bit_length,
                    bit_mask,
                }
            }
            "MIN-MAX-LENGTH-TYPE" => {
                parser.expect_child(et, "MIN-LENGTH")?;
                parser.expect_attribute(et, "TERMINATION")?;
                CodedLength::MinMax {
                    min_length: parser.parse_optional::<u32>(et, "MIN-LENGTH")?.unwrap_or(0),
                    max_length: parser.parse_optional::<u32>(et, "MAX-LENGTH")?,
                    termination: parser
                        .parse_attribute::<Termination>(et, "TERMINATION")?
                        .unwrap_or(Termination::EndOfPdu),
                }
            }
            "PARAM-LENGTH-INFO-TYPE" => {
                let ref_et = parser.expect_child(et, "LENGTH-KEY-REF")?;
                CodedLength::ParamLengthInfo {
                    length_key: OdxLink::new(parser.odxlink_ref(ref_et)?),
                }
            }
            _ => {
                return Err(OdxError::InvalidValue {
                    text: xsi_type.to_string(),
                    element: format!("{}@xsi:type", et.tag),
                    description: "unsupported diag coded type".to_string(),
                });
            }
        };

        Ok(Self {
            base_data_type,
            is_highlow_byte_order,
            length,
        })
    }

    /// a standard length coded type
    pub fn standard(base_data_type: DataType, bit_length: u32) -> Self {
        Self {
            base_data_type,
            is_highlow_byte_order: true,
            length: CodedLength::Standard {
                bit_length,
                bit_mask: None,
            },
        }
    }

    /// the number of bytes covered by a value at bit position `bit_position`
    ///
    /// Only known in advance for standard length types.
    pub fn placeholder_len(&self, bit_position: u32) -> Option<usize> {
        match &self.length {
            CodedLength::Standard { bit_length, .. } => {
                let bits = u64::from(*bit_length) + u64::from(bit_position);
                usize::try_from(bits.div_ceil(8)).ok()
            }
            _ => None,
        }
    }

    /// encode an internal value at the cursor of `encode_state`
    pub fn encode_into_pdu(
        &self,
        internal_value: &Value,
        param_name: &str,
        encode_state: &mut EncodeState,
    ) -> Result<(), OdxError> {
        let bit_position = encode_state.cursor_bit_position;
        let result = match &self.length {
            CodedLength::Standard {
                bit_length,
                bit_mask,
            } => self.encode_standard(
                internal_value,
                *bit_length,
                bit_mask.as_deref(),
                bit_position,
            ),
            CodedLength::MinMax {
                min_length,
                max_length,
                termination,
            } => self.encode_min_max(
                internal_value,
                *min_length,
                *max_length,
                *termination,
                bit_position,
                encode_state.is_end_of_pdu,
            ),
            CodedLength::ParamLengthInfo { length_key } => {
                self.encode_param_length_info(internal_value, length_key, param_name, encode_state)
            }
        };

        match result {
            Ok(coded_bytes) => encode_state.emplace_atomic_value(&coded_bytes, param_name),
            Err(description) => {
                encode_state.log.error_or_log(OdxError::EncodeError {
                    param_name: param_name.to_string(),
                    description,
                })?;
                let len = self.placeholder_len(bit_position).unwrap_or(0);
                encode_state.emplace_atomic_value(&vec![0; len], param_name)
            }
        }
    }

    fn encode_standard(
        &self,
        value: &Value,
        bit_length: u32,
        bit_mask: Option<&[u8]>,
        bit_position: u32,
    ) -> Result<Vec<u8>, String> {
        if self.base_data_type.kind().is_numeric() {
            if u64::from(bit_length) + u64::from(bit_position) > 128 {
                return Err(format!(
                    "a bit length of {bit_length} at bit position {bit_position} exceeds 128 bits"
                ));
            }
            let mut raw = raw_number(self.base_data_type, value, bit_length)?;
            if let Some(mask) = bit_mask {
                raw &= mask.iter().fold(0u128, |acc, byte| (acc << 8) | u128::from(*byte));
            }
            let byte_len = (bit_length + bit_position).div_ceil(8) as usize;
            Ok(to_bytes(raw << bit_position, byte_len, self.is_highlow_byte_order))
        } else {
            if bit_position != 0 || bit_length % 8 != 0 {
                return Err(format!(
                    "{} values must be byte aligned (bit position {bit_position}, \
                     bit length {bit_length})",
                    self.base_data_type
                ));
            }
            let mut coded_bytes = self.encode_data(value)?;
            let byte_len = (bit_length / 8) as usize;
            if coded_bytes.len() > byte_len {
                return Err(format!(
                    "{value} needs {} bytes, but only {byte_len} are available",
                    coded_bytes.len()
                ));
            }
            coded_bytes.resize(byte_len, 0);
            if let Some(mask) = bit_mask {
                for (byte, mask_byte) in coded_bytes.iter_mut().zip(mask) {
                    *byte &= mask_byte;
                }
            }
            Ok(coded_bytes)
        }
    }

    fn encode_min_max(
        &self,
        value: &Value,
        min_length: u32,
        max_length: Option<u32>,
        termination: Termination,
        bit_position: u32,
        is_end_of_pdu: bool,
    ) -> Result<Vec<u8>, String> {
        if bit_position != 0 {
            return Err("min-max length values must be byte aligned".to_string());
        }
        let mut coded_bytes = self.encode_data(value)?;
        if coded_bytes.len() < min_length as usize {
            return Err(format!(
                "{value} is shorter than the minimum length of {min_length} bytes"
            ));
        }
        if let Some(max_length) = max_length {
            if coded_bytes.len() > max_length as usize {
                return Err(format!(
                    "{value} is longer than the maximum length of {max_length} bytes"
                ));
            }
        }

        // the termination is omitted at the end of the PDU and if the maximum length is reached
        let max_reached =
            max_length.is_some_and(|max_length| coded_bytes.len() >= max_length as usize);
        if !is_end_of_pdu && !max_reached {
            let width = if self.base_data_type == DataType::AUnicode2String {
                2
            } else {
                1
            };
            match termination {
                Termination::Zero => coded_bytes.extend(std::iter::repeat_n(0x00, width)),
                Termination::HexFf => coded_bytes.extend(std::iter::repeat_n(0xFF, width)),
                Termination::EndOfPdu => {}
            }
        }
        Ok(coded_bytes)
    }

    fn encode_param_length_info(
        &self,
        value: &Value,
        length_key: &OdxLink<Parameter>,
        param_name: &str,
        encode_state: &mut EncodeState,
    ) -> Result<Vec<u8>, String> {
        if encode_state.cursor_bit_position != 0 {
            return Err(
                "values with a length given by a length key must be byte aligned".to_string(),
            );
        }
        let coded_bytes = if self.base_data_type.kind().is_numeric() {
            let bit_length = minimal_bit_length(self.base_data_type, value)?;
            if bit_length == 0 {
                Vec::new()
            } else {
                let raw = raw_number(self.base_data_type, value, bit_length)?;
                to_bytes(raw, (bit_length / 8) as usize, self.is_highlow_byte_order)
            }
        } else {
            self.encode_data(value)?
        };

        let Some(key_param) = length_key.get() else {
            return Err(format!(
                "the length key {} is not resolved",
                length_key.odxlink_ref().ref_id
            ));
        };
        let bit_length = u32::try_from(coded_bytes.len() * 8)
            .map_err(|_| format!("{param_name} is too long"))?;
        if let Some(previous) = encode_state
            .length_keys
            .insert(key_param.short_name.clone(), bit_length)
        {
            if previous != bit_length {
                return Err(format!(
                    "the length key {} was already set to {previous} bits",
                    key_param.short_name
                ));
            }
        }
        Ok(coded_bytes)
    }

    // the bytes of string and byte field values
    fn encode_data(&self, value: &Value) -> Result<Vec<u8>, String> {
        match self.base_data_type {
            DataType::AAsciiString => {
                let text = as_text(value)?;
                if text.is_ascii() {
                    Ok(text.into_bytes())
                } else {
                    Err(format!("{value} is not an ASCII string"))
                }
            }
            DataType::AUtf8String => Ok(as_text(value)?.into_bytes()),
            DataType::AUnicode2String => Ok(as_text(value)?
                .encode_utf16()
                .flat_map(|unit| {
                    if self.is_highlow_byte_order {
                        unit.to_be_bytes()
                    } else {
                        unit.to_le_bytes()
                    }
                })
                .collect()),
            DataType::ABytefield => match value.to_kind(ValueKind::Bytes) {
                Some(Value::Bytes(bytes)) => Ok(bytes),
                _ => Err(format!("{value} is not a byte field")),
            },
            numeric => Err(format!(
                "{numeric} values can't be coded with a variable length"
            )),
        }
    }
}

impl OdxLinked for DiagCodedType {
    fn build_odxlinks(&self) -> OdxLinkEntries {
        Vec::new()
    }

    fn resolve_odxlinks(
        &self,
        odxlinks: &OdxLinkDatabase,
        log: &mut ErrorLog,
    ) -> Result<(), OdxError> {
        if let CodedLength::ParamLengthInfo { length_key } = &self.length {
            length_key.resolve(odxlinks, log)?;
        }
        Ok(())
    }

    fn resolve_snrefs(&self, _: &SnRefContext<'_>, _: &mut ErrorLog) -> Result<(), OdxError> {
        Ok(())
    }
}

fn parse_bit_mask(text: &str, parser: &mut ParserState) -> Result<Option<Vec<u8>>, OdxError> {
    let digits: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    match hex::decode(&digits) {
        Ok(mask) if mask.len() <= 16 => Ok(Some(mask)),
        Ok(_) => {
            parser.error_or_log(OdxError::InvalidValue {
                text: text.to_string(),
                element: "BIT-MASK".to_string(),
                description: "the bit mask is longer than 16 bytes".to_string(),
            })?;
            Ok(None)
        }
        Err(err) => {
            parser.error_or_log(OdxError::InvalidValue {
                text: text.to_string(),
                element: "BIT-MASK".to_string(),
                description: err.to_string(),
            })?;
            Ok(None)
        }
    }
}

fn as_text(value: &Value) -> Result<String, String> {
    match value.to_kind(ValueKind::String) {
        Some(Value::String(text)) => Ok(text),
        _ => Err(format!("{value} is not a string")),
    }
}

// the value of a number in its coded form, not yet shifted
fn raw_number(base_data_type: DataType, value: &Value, bit_length: u32) -> Result<u128, String> {
    if bit_length == 0 || bit_length > 64 {
        return Err(format!("a bit length of {bit_length} is not supported for numbers"));
    }
    let max = (1u128 << bit_length) - 1;
    match base_data_type {
        DataType::AUint32 => {
            let Some(Value::UInt(number)) = value.to_kind(ValueKind::UnsignedInteger) else {
                return Err(format!("{value} is not an unsigned integer"));
            };
            let number = u128::from(number);
            if number > max {
                Err(format!("{value} does not fit into {bit_length} bits"))
            } else {
                Ok(number)
            }
        }
        DataType::AInt32 => {
            let Some(Value::Int(number)) = value.to_kind(ValueKind::Integer) else {
                return Err(format!("{value} is not an integer"));
            };
            let number = i128::from(number);
            let limit = 1i128 << (bit_length - 1);
            if number < -limit || number >= limit {
                Err(format!("{value} does not fit into {bit_length} bits"))
            } else {
                // two's complement, truncated to the bit length
                Ok((number as u128) & max)
            }
        }
        DataType::AFloat32 => {
            let number = value.as_f64().ok_or_else(|| format!("{value} is not a number"))?;
            if bit_length != 32 {
                return Err(format!("A_FLOAT32 values need 32 bits, not {bit_length}"));
            }
            Ok(u128::from((number as f32).to_bits()))
        }
        DataType::AFloat64 => {
            let number = value.as_f64().ok_or_else(|| format!("{value} is not a number"))?;
            if bit_length != 64 {
                return Err(format!("A_FLOAT64 values need 64 bits, not {bit_length}"));
            }
            Ok(u128::from(number.to_bits()))
        }
        other => Err(format!("{other} is not a numeric data type")),
    }
}

// the number of bits needed for a number, rounded up to full bytes
fn minimal_bit_length(base_data_type: DataType, value: &Value) -> Result<u32, String> {
    let bits = match base_data_type {
        DataType::AUint32 => match value.to_kind(ValueKind::UnsignedInteger) {
            Some(Value::UInt(number)) => 64 - number.leading_zeros(),
            _ => return Err(format!("{value} is not an unsigned integer")),
        },
        DataType::AInt32 => match value.to_kind(ValueKind::Integer) {
            // one additional bit for the sign
            Some(Value::Int(number)) if number >= 0 => 65 - number.leading_zeros(),
            Some(Value::Int(number)) => 65 - (!number).leading_zeros(),
            _ => return Err(format!("{value} is not an integer")),
        },
        DataType::AFloat32 => 32,
        _ => 64,
    };
    Ok(bits.div_ceil(8) * 8)
}

fn to_bytes(raw: u128, byte_len: usize, is_highlow_byte_order: bool) -> Vec<u8> {
    let all_bytes = raw.to_be_bytes();
    let mut coded_bytes = all_bytes[all_bytes.len() - byte_len..].to_vec();
    if !is_highlow_byte_order {
        coded_bytes.reverse();
    }
    coded_bytes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::odxlink::{DocType, OdxDocFragment};
    use crate::odxtypes::ParameterValueDict;
    use pretty_assertions::assert_eq;

    fn encode_state(strict: bool) -> EncodeState {
        EncodeState::new(ParameterValueDict::new(), 0, None, strict)
    }

    fn encode(dct: &DiagCodedType, value: Value, bit_position: u32) -> Result<Vec<u8>, OdxError> {
        let mut state = encode_state(true);
        state.cursor_bit_position = bit_position;
        dct.encode_into_pdu(&value, "param", &mut state)?;
        Ok(state.coded_message)
    }

    #[test]
    fn standard_integers() {
        let dct = DiagCodedType::standard(DataType::AUint32, 16);
        assert_eq!(encode(&dct, Value::UInt(0x1234), 0).unwrap(), vec![0x12, 0x34]);
        assert!(encode(&dct, Value::UInt(0x10000), 0).is_err());

        let dct = DiagCodedType::standard(DataType::AUint32, 4);
        assert_eq!(encode(&dct, Value::UInt(0xA), 0).unwrap(), vec![0x0A]);
        assert_eq!(encode(&dct, Value::UInt(0xA), 4).unwrap(), vec![0xA0]);
        // 4 bits at bit position 6 span two bytes
        assert_eq!(encode(&dct, Value::UInt(0xF), 6).unwrap(), vec![0x03, 0xC0]);

        let dct = DiagCodedType::standard(DataType::AInt32, 8);
        assert_eq!(encode(&dct, Value::Int(-1), 0).unwrap(), vec![0xFF]);
        assert_eq!(encode(&dct, Value::Int(-128), 0).unwrap(), vec![0x80]);
        assert!(encode(&dct, Value::Int(128), 0).is_err());

        let dct = DiagCodedType {
            is_highlow_byte_order: false,
            ..DiagCodedType::standard(DataType::AUint32, 24)
        };
        assert_eq!(
            encode(&dct, Value::UInt(0x123456), 0).unwrap(),
            vec![0x56, 0x34, 0x12]
        );
    }

    #[test]
    fn standard_floats_and_masks() {
        let dct = DiagCodedType::standard(DataType::AFloat32, 32);
        assert_eq!(encode(&dct, Value::Float(1.0), 0).unwrap(), vec![0x3F, 0x80, 0x00, 0x00]);
        let dct = DiagCodedType::standard(DataType::AFloat64, 32);
        assert!(encode(&dct, Value::Float(1.0), 0).is_err());

        let dct = DiagCodedType {
            length: CodedLength::Standard {
                bit_length: 8,
                bit_mask: Some(vec![0x0F]),
            },
            ..DiagCodedType::standard(DataType::AUint32, 8)
        };
        assert_eq!(encode(&dct, Value::UInt(0xAB), 0).unwrap(), vec![0x0B]);
    }

    #[test]
    fn standard_strings() {
        let dct = DiagCodedType::standard(DataType::AAsciiString, 32);
        assert_eq!(
            encode(&dct, Value::from("ab"), 0).unwrap(),
            vec![0x61, 0x62, 0x00, 0x00]
        );
        assert!(encode(&dct, Value::from("abcde"), 0).is_err());
        assert!(encode(&dct, Value::from("äb"), 0).is_err());
        assert!(encode(&dct, Value::from("ab"), 2).is_err());

        let dct = DiagCodedType::standard(DataType::AUnicode2String, 32);
        assert_eq!(
            encode(&dct, Value::from("ab"), 0).unwrap(),
            vec![0x00, 0x61, 0x00, 0x62]
        );

        let dct = DiagCodedType::standard(DataType::ABytefield, 16);
        assert_eq!(
            encode(&dct, Value::Bytes(vec![0xCA, 0xFE]), 0).unwrap(),
            vec![0xCA, 0xFE]
        );
    }

    fn min_max(termination: Termination, max_length: Option<u32>) -> DiagCodedType {
        DiagCodedType {
            base_data_type: DataType::AAsciiString,
            is_highlow_byte_order: true,
            length: CodedLength::MinMax {
                min_length: 1,
                max_length,
                termination,
            },
        }
    }

    #[test]
    fn min_max_termination() {
        let dct = min_max(Termination::Zero, Some(4));

        let mut state = encode_state(true);
        state.is_end_of_pdu = false;
        dct.encode_into_pdu(&Value::from("ab"), "name", &mut state).unwrap();
        assert_eq!(state.coded_message, vec![0x61, 0x62, 0x00]);

        // no termination at the end of the PDU
        let mut state = encode_state(true);
        dct.encode_into_pdu(&Value::from("ab"), "name", &mut state).unwrap();
        assert_eq!(state.coded_message, vec![0x61, 0x62]);

        // no termination if the maximum length is reached
        let mut state = encode_state(true);
        state.is_end_of_pdu = false;
        dct.encode_into_pdu(&Value::from("abcd"), "name", &mut state).unwrap();
        assert_eq!(state.coded_message, vec![0x61, 0x62, 0x63, 0x64]);

        let mut state = encode_state(true);
        assert!(dct.encode_into_pdu(&Value::from("abcde"), "name", &mut state).is_err());
        let mut state = encode_state(true);
        assert!(dct.encode_into_pdu(&Value::from(""), "name", &mut state).is_err());

        let dct = min_max(Termination::HexFf, None);
        let mut state = encode_state(true);
        state.is_end_of_pdu = false;
        dct.encode_into_pdu(&Value::from("a"), "name", &mut state).unwrap();
        assert_eq!(state.coded_message, vec![0x61, 0xFF]);

        let dct = min_max(Termination::EndOfPdu, None);
        let mut state = encode_state(true);
        state.is_end_of_pdu = false;
        dct.encode_into_pdu(&Value::from("a"), "name", &mut state).unwrap();
        assert_eq!(state.coded_message, vec![0x61]);
    }

    #[test]
    fn lenient_placeholder() {
        let dct = DiagCodedType::standard(DataType::AUint32, 16);
        let mut state = encode_state(false);
        dct.encode_into_pdu(&Value::UInt(0x10000), "big", &mut state)
            .unwrap();
        assert_eq!(state.coded_message, vec![0x00, 0x00]);
        assert!(matches!(
            &state.warnings()[0],
            OdxError::EncodeError { param_name, .. } if param_name == "big"
        ));
    }

    #[test]
    fn minimal_lengths() {
        assert_eq!(minimal_bit_length(DataType::AUint32, &Value::UInt(0)), Ok(0));
        assert_eq!(minimal_bit_length(DataType::AUint32, &Value::UInt(255)), Ok(8));
        assert_eq!(minimal_bit_length(DataType::AUint32, &Value::UInt(256)), Ok(16));
        assert_eq!(minimal_bit_length(DataType::AInt32, &Value::Int(127)), Ok(8));
        assert_eq!(minimal_bit_length(DataType::AInt32, &Value::Int(128)), Ok(16));
        assert_eq!(minimal_bit_length(DataType::AInt32, &Value::Int(-128)), Ok(8));
        assert_eq!(minimal_bit_length(DataType::AInt32, &Value::Int(-129)), Ok(16));
    }

    #[test]
    fn coded_type_from_et() {
        let mut log = ErrorLog::new(true);
        let mut parser = ParserState::new(
            vec![OdxDocFragment::new("doc", DocType::Container)],
            &mut log,
        );

        let et = Element::new("DIAG-CODED-TYPE")
            .with_attr("xsi:type", "STANDARD-LENGTH-TYPE")
            .with_attr("BASE-DATA-TYPE", "A_UINT32")
            .with_attr("IS-HIGHLOW-BYTE-ORDER", "false")
            .with_text_child("BIT-LENGTH", "12")
            .with_text_child("BIT-MASK", "0FF0");
        let dct = DiagCodedType::from_et(&et, &mut parser).unwrap();
        assert_eq!(dct.base_data_type, DataType::AUint32);
        assert!(!dct.is_highlow_byte_order);
        assert!(matches!(
            &dct.length,
            CodedLength::Standard {
                bit_length: 12,
                bit_mask: Some(mask),
            } if mask == &vec![0x0F, 0xF0]
        ));
        assert_eq!(dct.placeholder_len(4), Some(2));
        assert_eq!(dct.placeholder_len(5), Some(3));

        let et = Element::new("DIAG-CODED-TYPE")
            .with_attr("xsi:type", "MIN-MAX-LENGTH-TYPE")
            .with_attr("BASE-DATA-TYPE", "A_UTF8STRING")
            .with_attr("TERMINATION", "HEX-FF")
            .with_text_child("MIN-LENGTH", "0")
            .with_text_child("MAX-LENGTH", "10");
        let dct = DiagCodedType::from_et(&et, &mut parser).unwrap();
        assert!(matches!(
            dct.length,
            CodedLength::MinMax {
                min_length: 0,
                max_length: Some(10),
                termination: Termination::HexFf
            }
        ));
        assert_eq!(dct.placeholder_len(0), None);

        let et = Element::new("DIAG-CODED-TYPE")
            .with_attr("xsi:type", "PARAM-LENGTH-INFO-TYPE")
            .with_attr("BASE-DATA-TYPE", "A_BYTEFIELD")
            .with_child(Element::new("LENGTH-KEY-REF").with_attr("ID-REF", "param.length"));
        let dct = DiagCodedType::from_et(&et, &mut parser).unwrap();
        match &dct.length {
            CodedLength::ParamLengthInfo { length_key } => {
                assert_eq!(length_key.odxlink_ref().ref_id, "param.length");
                assert!(!length_key.is_resolved());
            }
            other => panic!("unexpected length {other:?}"),
        }

        let et = Element::new("DIAG-CODED-TYPE")
            .with_attr("xsi:type", "LEADING-LENGTH-INFO-TYPE")
            .with_attr("BASE-DATA-TYPE", "A_BYTEFIELD");
        assert!(matches!(
            DiagCodedType::from_et(&et, &mut parser),
            Err(OdxError::InvalidValue { .. })
        ));

        let et = Element::new("DIAG-CODED-TYPE")
            .with_attr("xsi:type", "STANDARD-LENGTH-TYPE")
            .with_attr("BASE-DATA-TYPE", "A_UINT32");
        assert!(matches!(
            DiagCodedType::from_et(&et, &mut parser),
            Err(OdxError::MissingElement { .. })
        ));
    }

    #[test]
    fn bit_position_out_of_range() {
        let dct = DiagCodedType::standard(DataType::AUint32, 8);
        assert!(matches!(
            encode(&dct, Value::UInt(1), 200),
            Err(OdxError::EncodeError { .. })
        ));

        let mut state = encode_state(false);
        state.cursor_bit_position = 200;
        dct.encode_into_pdu(&Value::UInt(1), "param", &mut state)
            .unwrap();
        assert_eq!(state.coded_message, vec![0; 26]);
        assert_eq!(state.warnings().len(), 1);

        let dct = DiagCodedType::standard(DataType::AUint32, u32::MAX);
        assert_eq!(dct.placeholder_len(7), Some(536_870_912));
    }
}
