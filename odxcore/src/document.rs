use std::sync::Arc;

use crate::OdxError;
use crate::dataobjectproperty::DataObjectProperty;
use crate::element::{Element, IdentifiableElement};
use crate::errorlog::ErrorLog;
use crate::namelist::{NamedItemList, OdxNamed};
use crate::odxlink::{
    DocType, OdxDocFragment, OdxLinkDatabase, OdxLinkEntries, OdxLinkId, OdxLinked,
};
use crate::parser::ParserState;
use crate::progcode::Library;
use crate::snrefcontext::SnRefContext;
use crate::state::StateChart;
use crate::structure::Structure;
use crate::table::Table;

/// One description document
///
/// The document type is derived from the root element, the SHORT-NAME of the root
/// element names the document fragment which scopes all IDs of the document.
#[derive(Debug)]
pub struct Document {
    pub odx_id: OdxLinkId,
    pub short_name: String,
    pub long_name: Option<String>,
    pub description: Option<String>,
    pub doc_type: DocType,
    pub data_object_props: NamedItemList<Arc<DataObjectProperty>>,
    pub structures: NamedItemList<Arc<Structure>>,
    pub tables: NamedItemList<Arc<Table>>,
    pub libraries: NamedItemList<Arc<Library>>,
    pub state_charts: NamedItemList<Arc<StateChart>>,
}

impl Document {
    /// build a document from its root element
    ///
    /// In lenient mode the problems found in the document are returned together with the document.
    pub fn from_et(et: &Element, strict: bool) -> Result<(Self, Vec<OdxError>), OdxError> {
        let doc_type = DocType::from_root_tag(&et.tag).ok_or_else(|| OdxError::InvalidValue {
            text: et.tag.clone(),
            element: "document root".to_string(),
            description: "not an ODX document".to_string(),
        })?;
        let doc_name = et
            .find_text("SHORT-NAME")
            .map(str::trim)
            .ok_or_else(|| OdxError::MissingElement {
                tag: "SHORT-NAME".to_string(),
                parent: et.tag.clone(),
            })?;

        let mut log = ErrorLog::new(strict);
        let mut parser = ParserState::new(vec![OdxDocFragment::new(doc_name, doc_type)], &mut log);
        let document = Self::build(et, doc_type, &mut parser)?;
        tracing::debug!(
            "built {doc_type} document {}: {} DOPs, {} structures, {} tables, {} state charts",
            document.short_name,
            document.data_object_props.len(),
            document.structures.len(),
            document.tables.len(),
            document.state_charts.len()
        );

        Ok((document, log.into_messages()))
    }

    fn build(et: &Element, doc_type: DocType, parser: &mut ParserState) -> Result<Self, OdxError> {
        let IdentifiableElement {
            odx_id,
            short_name,
            long_name,
            description,
        } = IdentifiableElement::from_et(et, parser)?;

        let mut data_object_props = NamedItemList::new();
        for dop_et in et.findall("DIAG-DATA-DICTIONARY-SPEC/DATA-OBJECT-PROPS/DATA-OBJECT-PROP") {
            let dop = Arc::new(DataObjectProperty::from_et(dop_et, parser)?);
            parser.push_unique(&mut data_object_props, dop, "DATA-OBJECT-PROPS")?;
        }
        let mut structures = NamedItemList::new();
        for structure_et in et.findall("DIAG-DATA-DICTIONARY-SPEC/STRUCTURES/STRUCTURE") {
            let structure = Arc::new(Structure::from_et(structure_et, parser)?);
            parser.push_unique(&mut structures, structure, "STRUCTURES")?;
        }
        let mut tables = NamedItemList::new();
        for table_et in et.findall("DIAG-DATA-DICTIONARY-SPEC/TABLES/TABLE") {
            let table = Arc::new(Table::from_et(table_et, parser)?);
            parser.push_unique(&mut tables, table, "TABLES")?;
        }
        let mut libraries = NamedItemList::new();
        for library_et in et.findall("LIBRARYS/LIBRARY") {
            let library = Arc::new(Library::from_et(library_et, parser)?);
            parser.push_unique(&mut libraries, library, "LIBRARYS")?;
        }
        let mut state_charts = NamedItemList::new();
        for state_chart_et in et.findall("STATE-CHARTS/STATE-CHART") {
            let state_chart = Arc::new(StateChart::from_et(state_chart_et, parser)?);
            parser.push_unique(&mut state_charts, state_chart, "STATE-CHARTS")?;
        }

        Ok(Self {
            odx_id,
            short_name,
            long_name,
            description,
            doc_type,
            data_object_props,
            structures,
            tables,
            libraries,
            state_charts,
        })
    }

    /// the fragments which scope the IDs of this document
    pub fn doc_fragments(&self) -> &[OdxDocFragment] {
        &self.odx_id.doc_fragments
    }
}

impl OdxNamed for Document {
    fn short_name(&self) -> &str {
        &self.short_name
    }
}

impl OdxLinked for Document {
    fn build_odxlinks(&self) -> OdxLinkEntries {
        let mut result = Vec::new();
        for dop in &self.data_object_props {
            result.extend(dop.build_odxlinks());
        }
        for structure in &self.structures {
            result.extend(structure.build_odxlinks());
        }
        for table in &self.tables {
            result.extend(table.build_odxlinks());
        }
        for library in &self.libraries {
            result.extend(library.build_odxlinks());
        }
        for state_chart in &self.state_charts {
            result.extend(state_chart.build_odxlinks());
        }
        result
    }

    fn resolve_odxlinks(
        &self,
        odxlinks: &OdxLinkDatabase,
        log: &mut ErrorLog,
    ) -> Result<(), OdxError> {
        for dop in &self.data_object_props {
            dop.resolve_odxlinks(odxlinks, log)?;
        }
        for structure in &self.structures {
            structure.resolve_odxlinks(odxlinks, log)?;
        }
        for table in &self.tables {
            table.resolve_odxlinks(odxlinks, log)?;
        }
        for library in &self.libraries {
            library.resolve_odxlinks(odxlinks, log)?;
        }
        for state_chart in &self.state_charts {
            state_chart.resolve_odxlinks(odxlinks, log)?;
        }
        Ok(())
    }

    fn resolve_snrefs(
        &self,
        context: &SnRefContext<'_>,
        log: &mut ErrorLog,
    ) -> Result<(), OdxError> {
        for dop in &self.data_object_props {
            dop.resolve_snrefs(context, log)?;
        }
        for structure in &self.structures {
            structure.resolve_snrefs(context, log)?;
        }
        for table in &self.tables {
            table.resolve_snrefs(context, log)?;
        }
        for library in &self.libraries {
            library.resolve_snrefs(context, log)?;
        }
        for state_chart in &self.state_charts {
            state_chart.resolve_snrefs(context, log)?;
        }
        Ok(())
    }
}
