use std::sync::Arc;

use crate::OdxError;
use crate::dataobjectproperty::DataObjectProperty;
use crate::element::{Element, IdentifiableElement};
use crate::encodestate::EncodeState;
use crate::errorlog::ErrorLog;
use crate::namelist::{NamedItemList, OdxNamed};
use crate::odxlink::{LinkTarget, OdxLink, OdxLinkDatabase, OdxLinkEntries, OdxLinkId, OdxLinked};
use crate::parser::ParserState;
use crate::snrefcontext::SnRefContext;
use crate::structure::Structure;

/// A table whose rows are selected by a table-key parameter
#[derive(Debug)]
pub struct Table {
    pub odx_id: OdxLinkId,
    pub short_name: String,
    pub long_name: Option<String>,
    pub description: Option<String>,
    pub key_dop_ref: Option<OdxLink<DataObjectProperty>>,
    pub table_rows: NamedItemList<Arc<TableRow>>,
}

#[derive(Debug)]
pub struct TableRow {
    pub odx_id: OdxLinkId,
    pub short_name: String,
    pub long_name: Option<String>,
    pub description: Option<String>,
    /// the physical key value, interpreted with the key DOP of the table
    pub key: String,
    pub structure_ref: Option<OdxLink<Structure>>,
}

impl Table {
    pub(crate) fn from_et(et: &Element, parser: &mut ParserState) -> Result<Self, OdxError> {
        let IdentifiableElement {
            odx_id,
            short_name,
            long_name,
            description,
        } = IdentifiableElement::from_et(et, parser)?;
        let key_dop_ref = et
            .find("KEY-DOP-REF")
            .map(|ref_et| parser.odxlink_ref(ref_et).map(OdxLink::new))
            .transpose()?;
        let mut table_rows = NamedItemList::new();
        for row_et in et.findall("TABLE-ROW") {
            let row = Arc::new(TableRow::from_et(row_et, parser)?);
            parser.push_unique(&mut table_rows, row, "TABLE-ROW")?;
        }

        Ok(Self {
            odx_id,
            short_name,
            long_name,
            description,
            key_dop_ref,
            table_rows,
        })
    }

    pub fn key_dop(&self) -> Option<Arc<DataObjectProperty>> {
        self.key_dop_ref.as_ref().and_then(OdxLink::get)
    }

    /// encode the key of a row using the key DOP of the table
    pub(crate) fn encode_key_into_pdu(
        &self,
        row_name: &str,
        param_name: &str,
        encode_state: &mut EncodeState,
    ) -> Result<(), OdxError> {
        let Some(row) = self.table_rows.get(row_name) else {
            return encode_state.log.error_or_log(OdxError::EncodeError {
                param_name: param_name.to_string(),
                description: format!("TABLE {} has no row {row_name}", self.short_name),
            });
        };
        let Some(key_dop) = self.key_dop() else {
            return encode_state.log.error_or_log(OdxError::EncodeError {
                param_name: param_name.to_string(),
                description: format!("TABLE {} has no resolved KEY-DOP-REF", self.short_name),
            });
        };
        let key_value = match key_dop.physical_type.kind().parse_value(&row.key) {
            Ok(key_value) => key_value,
            Err(description) => {
                return encode_state.log.error_or_log(OdxError::InvalidValue {
                    text: row.key.clone(),
                    element: format!("TABLE-ROW {}/KEY", row.short_name),
                    description,
                });
            }
        };
        key_dop.encode_into_pdu(&key_value, param_name, encode_state)
    }
}

impl OdxNamed for Table {
    fn short_name(&self) -> &str {
        &self.short_name
    }
}

impl OdxLinked for Arc<Table> {
    fn build_odxlinks(&self) -> OdxLinkEntries {
        let mut result = vec![(self.odx_id.clone(), LinkTarget::from(self))];
        for row in &self.table_rows {
            result.extend(row.build_odxlinks());
        }
        result
    }

    fn resolve_odxlinks(
        &self,
        odxlinks: &OdxLinkDatabase,
        log: &mut ErrorLog,
    ) -> Result<(), OdxError> {
        if let Some(key_dop_ref) = &self.key_dop_ref {
            key_dop_ref.resolve(odxlinks, log)?;
        }
        for row in &self.table_rows {
            row.resolve_odxlinks(odxlinks, log)?;
        }
        Ok(())
    }

    fn resolve_snrefs(&self, _: &SnRefContext<'_>, _: &mut ErrorLog) -> Result<(), OdxError> {
        Ok(())
    }
}

impl TableRow {
    pub(crate) fn from_et(et: &Element, parser: &mut ParserState) -> Result<Self, OdxError> {
        let IdentifiableElement {
            odx_id,
            short_name,
            long_name,
            description,
        } = IdentifiableElement::from_et(et, parser)?;
        let structure_ref = et
            .find("STRUCTURE-REF")
            .map(|ref_et| parser.odxlink_ref(ref_et).map(OdxLink::new))
            .transpose()?;

        Ok(Self {
            odx_id,
            short_name,
            long_name,
            description,
            key: parser.expect_text(et, "KEY")?.to_string(),
            structure_ref,
        })
    }

    pub fn structure(&self) -> Option<Arc<Structure>> {
        self.structure_ref.as_ref().and_then(OdxLink::get)
    }
}

impl OdxNamed for TableRow {
    fn short_name(&self) -> &str {
        &self.short_name
    }
}

impl OdxLinked for Arc<TableRow> {
    fn build_odxlinks(&self) -> OdxLinkEntries {
        vec![(self.odx_id.clone(), LinkTarget::from(self))]
    }

    fn resolve_odxlinks(
        &self,
        odxlinks: &OdxLinkDatabase,
        log: &mut ErrorLog,
    ) -> Result<(), OdxError> {
        if let Some(structure_ref) = &self.structure_ref {
            structure_ref.resolve(odxlinks, log)?;
        }
        Ok(())
    }

    fn resolve_snrefs(&self, _: &SnRefContext<'_>, _: &mut ErrorLog) -> Result<(), OdxError> {
        Ok(())
    }
}
