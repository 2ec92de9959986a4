use std::fmt::Display;
use std::sync::Arc;

use crate::OdxError;
use crate::dataobjectproperty::DataObjectProperty;
use crate::document::Document;
use crate::errorlog::ErrorLog;
use crate::namelist::NamedItemList;
use crate::odxlink::{OdxLinkDatabase, OdxLinked};
use crate::snrefcontext::SnRefContext;
use crate::state::StateChart;
use crate::structure::Structure;
use crate::table::Table;

/// How far the documents of a [`Database`] have been connected
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResolutionPhase {
    Unregistered,
    Registered,
    LinksResolved,
    FullyResolved,
}

/// A set of documents and the link registry that connects them
#[derive(Debug)]
pub struct Database {
    documents: NamedItemList<Document>,
    odxlinks: OdxLinkDatabase,
    phase: ResolutionPhase,
}

impl Display for ResolutionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Unregistered => "unregistered",
            Self::Registered => "registered",
            Self::LinksResolved => "links resolved",
            Self::FullyResolved => "fully resolved",
        })
    }
}

impl Default for Database {
    fn default() -> Self {
        Self::new()
    }
}

impl Database {
    pub fn new() -> Self {
        Self {
            documents: NamedItemList::new(),
            odxlinks: OdxLinkDatabase::new(),
            phase: ResolutionPhase::Unregistered,
        }
    }

    /// add a document; returns false if a document with the same name is already present
    ///
    /// All phases have to be run again afterwards.
    pub fn add_document(&mut self, document: Document) -> bool {
        if self.documents.contains_key(&document.short_name) {
            return false;
        }
        self.phase = ResolutionPhase::Unregistered;
        self.documents.push(document)
    }

    pub fn documents(&self) -> &NamedItemList<Document> {
        &self.documents
    }

    pub fn odxlinks(&self) -> &OdxLinkDatabase {
        &self.odxlinks
    }

    pub fn phase(&self) -> ResolutionPhase {
        self.phase
    }

    /// phase 1: register the IDs of all documents
    ///
    /// The registry is rebuilt from scratch, so running this again is harmless.
    pub fn register_links(&mut self) -> Result<(), OdxError> {
        let mut odxlinks = OdxLinkDatabase::new();
        for document in &self.documents {
            odxlinks.update(document.build_odxlinks())?;
        }
        tracing::debug!(
            "registered {} IDs from {} documents",
            odxlinks.len(),
            self.documents.len()
        );
        self.odxlinks = odxlinks;
        self.phase = self.phase.max(ResolutionPhase::Registered);
        Ok(())
    }

    /// phase 2: resolve all ID references
    ///
    /// Returns the warnings collected in lenient mode.
    pub fn resolve_links(&mut self, strict: bool) -> Result<Vec<OdxError>, OdxError> {
        self.require_phase("resolve_links", ResolutionPhase::Registered)?;
        let mut log = ErrorLog::new(strict);
        for document in &self.documents {
            document.resolve_odxlinks(&self.odxlinks, &mut log)?;
        }
        tracing::debug!(
            "resolved the ID references of {} documents with {} warnings",
            self.documents.len(),
            log.messages().len()
        );
        self.phase = self.phase.max(ResolutionPhase::LinksResolved);
        Ok(log.into_messages())
    }

    /// phase 3: resolve all short-name references within their scopes
    pub fn resolve_snrefs(&mut self, strict: bool) -> Result<Vec<OdxError>, OdxError> {
        self.require_phase("resolve_snrefs", ResolutionPhase::LinksResolved)?;
        let mut log = ErrorLog::new(strict);
        let context = SnRefContext::default();
        for document in &self.documents {
            document.resolve_snrefs(&context, &mut log)?;
        }
        tracing::debug!(
            "resolved the short-name references of {} documents with {} warnings",
            self.documents.len(),
            log.messages().len()
        );
        self.phase = ResolutionPhase::FullyResolved;
        Ok(log.into_messages())
    }

    /// run all three phases in order
    pub fn refresh(&mut self, strict: bool) -> Result<Vec<OdxError>, OdxError> {
        self.register_links()?;
        let mut warnings = self.resolve_links(strict)?;
        warnings.extend(self.resolve_snrefs(strict)?);
        Ok(warnings)
    }

    fn require_phase(
        &self,
        operation: &'static str,
        required: ResolutionPhase,
    ) -> Result<(), OdxError> {
        if self.phase < required {
            return Err(OdxError::PhaseOrder {
                operation,
                required,
                current: self.phase,
            });
        }
        Ok(())
    }

    pub fn find_structure(&self, short_name: &str) -> Option<Arc<Structure>> {
        self.documents
            .iter()
            .find_map(|document| document.structures.get(short_name).cloned())
    }

    pub fn find_data_object_prop(&self, short_name: &str) -> Option<Arc<DataObjectProperty>> {
        self.documents
            .iter()
            .find_map(|document| document.data_object_props.get(short_name).cloned())
    }

    pub fn find_table(&self, short_name: &str) -> Option<Arc<Table>> {
        self.documents
            .iter()
            .find_map(|document| document.tables.get(short_name).cloned())
    }

    pub fn find_state_chart(&self, short_name: &str) -> Option<Arc<StateChart>> {
        self.documents
            .iter()
            .find_map(|document| document.state_charts.get(short_name).cloned())
    }
}
