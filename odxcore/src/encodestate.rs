use std::collections::HashMap;

use crate::OdxError;
use crate::errorlog::ErrorLog;
use crate::odxtypes::ParameterValueDict;

/// The state of one PDU encoding
///
/// An `EncodeState` is created for every top-level encode operation and owns the
/// message under construction. Every parameter ends up in [`EncodeState::emplace_atomic_value`],
/// which is the only place where `coded_message` is modified.
#[derive(Debug)]
pub struct EncodeState {
    /// the payload constructed so far
    pub coded_message: Vec<u8>,

    /// the physical values of the parameters of the structure which is currently encoded
    pub parameter_values: ParameterValueDict,

    /// absolute byte position to which the byte positions of parameters refer,
    /// i.e. the beginning of the current structure
    pub origin_byte_position: usize,

    /// absolute byte position where the next parameter is placed
    pub cursor_byte_position: usize,

    /// bit position (0-7) where the next parameter is placed
    pub cursor_bit_position: u32,

    /// the request which triggered the response that is encoded
    pub triggering_request: Option<Vec<u8>>,

    /// length-key short name -> bit length of the field it describes
    pub length_keys: HashMap<String, u32>,

    /// table-key short name -> short name of the selected table row
    pub table_keys: HashMap<String, String>,

    /// length- or table-key short name -> byte position of its placeholder
    pub key_pos: HashMap<String, usize>,

    /// true while the last parameter of the PDU is encoded
    pub is_end_of_pdu: bool,

    pub(crate) nesting_depth: usize,
    pub(crate) log: ErrorLog,
}

impl EncodeState {
    pub fn new(
        parameter_values: ParameterValueDict,
        origin_byte_position: usize,
        triggering_request: Option<&[u8]>,
        strict: bool,
    ) -> Self {
        Self {
            coded_message: Vec::new(),
            parameter_values,
            origin_byte_position,
            cursor_byte_position: origin_byte_position,
            cursor_bit_position: 0,
            triggering_request: triggering_request.map(<[u8]>::to_vec),
            length_keys: HashMap::new(),
            table_keys: HashMap::new(),
            key_pos: HashMap::new(),
            is_end_of_pdu: true,
            nesting_depth: 0,
            log: ErrorLog::new(strict),
        }
    }

    /// place the already converted and bit-shifted bytes of a parameter at the cursor
    ///
    /// The message is extended with zero bytes as needed. A bit that is already set by
    /// another parameter is an encode error; bytes written before the collision was
    /// detected are not rolled back. On success the cursor moves past the new data
    /// and is byte aligned.
    pub fn emplace_atomic_value(
        &mut self,
        new_data: &[u8],
        param_name: &str,
    ) -> Result<(), OdxError> {
        let pos = self.cursor_byte_position;

        let min_length = pos + new_data.len();
        if self.coded_message.len() < min_length {
            self.coded_message.resize(min_length, 0);
        }

        let mut overlap_reported = false;
        for (idx, new_byte) in new_data.iter().enumerate() {
            let old_byte = self.coded_message[pos + idx];
            if old_byte & new_byte != 0 && !overlap_reported {
                self.log.error_or_log(OdxError::EncodeError {
                    param_name: param_name.to_string(),
                    description: format!(
                        "overlaps with another parameter at byte {} (bits 0x{:02X})",
                        pos + idx,
                        old_byte & new_byte
                    ),
                })?;
                overlap_reported = true;
            }
            self.coded_message[pos + idx] |= new_byte;
        }

        self.cursor_byte_position += new_data.len();
        self.cursor_bit_position = 0;

        Ok(())
    }

    /// strict encodings fail on the first problem, lenient ones collect warnings
    pub fn is_strict(&self) -> bool {
        self.log.is_strict()
    }

    pub fn log_mut(&mut self) -> &mut ErrorLog {
        &mut self.log
    }

    /// the warnings collected so far
    pub fn warnings(&self) -> &[OdxError] {
        self.log.messages()
    }

    /// finish the encoding: the message and the collected warnings
    pub fn into_message(self) -> (Vec<u8>, Vec<OdxError>) {
        (self.coded_message, self.log.into_messages())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn encode_state(strict: bool) -> EncodeState {
        EncodeState::new(ParameterValueDict::new(), 0, None, strict)
    }

    #[test]
    fn disjoint_bits_in_one_byte() {
        let mut state = encode_state(true);
        state.emplace_atomic_value(&[0x0F], "A").unwrap();
        assert_eq!(state.cursor_byte_position, 1);
        state.cursor_byte_position = 0;
        state.emplace_atomic_value(&[0xF0], "B").unwrap();
        assert_eq!(state.coded_message, vec![0xFF]);
        assert_eq!(state.cursor_byte_position, 1);
        assert_eq!(state.cursor_bit_position, 0);
    }

    #[test]
    fn overlapping_bits() {
        let mut state = encode_state(true);
        state.emplace_atomic_value(&[0x01], "A").unwrap();
        state.cursor_byte_position = 0;
        match state.emplace_atomic_value(&[0x01], "B") {
            Err(OdxError::EncodeError { param_name, .. }) => assert_eq!(param_name, "B"),
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn overlapping_bits_lenient() {
        let mut state = encode_state(false);
        state.emplace_atomic_value(&[0x01, 0x01], "A").unwrap();
        state.cursor_byte_position = 0;
        state.emplace_atomic_value(&[0x03, 0x03], "B").unwrap();
        assert_eq!(state.coded_message, vec![0x03, 0x03]);
        assert_eq!(state.cursor_byte_position, 2);
        // one warning per parameter
        let (message, warnings) = state.into_message();
        assert_eq!(message, vec![0x03, 0x03]);
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn extend_with_zeros() {
        let mut state = encode_state(true);
        state.cursor_byte_position = 3;
        state.cursor_bit_position = 4;
        state.emplace_atomic_value(&[0xAA], "X").unwrap();
        assert_eq!(state.coded_message, vec![0x00, 0x00, 0x00, 0xAA]);
        assert_eq!(state.cursor_byte_position, 4);
        assert_eq!(state.cursor_bit_position, 0);
    }

    #[test]
    fn disjoint_ranges_overlay() {
        let mut state = encode_state(true);
        state.cursor_byte_position = 4;
        state.emplace_atomic_value(&[0x44, 0x55], "C").unwrap();
        state.cursor_byte_position = 0;
        state.emplace_atomic_value(&[0x11], "A").unwrap();
        state.cursor_byte_position = 2;
        state.emplace_atomic_value(&[0x33], "B").unwrap();
        assert_eq!(state.coded_message, vec![0x11, 0x00, 0x33, 0x00, 0x44, 0x55]);
        assert_eq!(state.cursor_byte_position, 3);
    }

    #[test]
    fn no_rollback_after_overlap() {
        let mut state = encode_state(true);
        state.cursor_byte_position = 1;
        state.emplace_atomic_value(&[0x80], "A").unwrap();
        state.cursor_byte_position = 0;
        assert!(state.emplace_atomic_value(&[0x01, 0x80], "B").is_err());
        // the first byte of B has been written
        assert_eq!(state.coded_message, vec![0x01, 0x80]);
    }
}
