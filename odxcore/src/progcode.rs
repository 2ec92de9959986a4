use std::sync::Arc;

use crate::OdxError;
use crate::element::{Element, IdentifiableElement};
use crate::errorlog::ErrorLog;
use crate::namelist::OdxNamed;
use crate::odxlink::{LinkTarget, OdxLink, OdxLinkDatabase, OdxLinkEntries, OdxLinkId, OdxLinked};
use crate::parser::ParserState;
use crate::snrefcontext::SnRefContext;

/// A code library which program code can depend on
#[derive(Debug)]
pub struct Library {
    pub odx_id: OdxLinkId,
    pub short_name: String,
    pub long_name: Option<String>,
    pub description: Option<String>,
    pub code_file: String,
    pub encryption: Option<String>,
    pub syntax: String,
    pub entry_point: Option<String>,
}

/// Executable or interpreted code implementing a conversion
///
/// This crate only keeps track of the code and its libraries; it can't execute it.
#[derive(Debug)]
pub struct ProgCode {
    pub code_file: String,
    pub encryption: Option<String>,
    pub syntax: String,
    pub revision: String,
    pub entrypoint: Option<String>,
    pub library_refs: Vec<OdxLink<Library>>,
}

impl Library {
    pub(crate) fn from_et(et: &Element, parser: &mut ParserState) -> Result<Self, OdxError> {
        let IdentifiableElement {
            odx_id,
            short_name,
            long_name,
            description,
        } = IdentifiableElement::from_et(et, parser)?;

        Ok(Self {
            odx_id,
            short_name,
            long_name,
            description,
            code_file: parser.expect_text(et, "CODE-FILE")?.to_string(),
            encryption: et.find_text("ENCRYPTION").map(str::to_string),
            syntax: parser.expect_text(et, "SYNTAX")?.to_string(),
            entry_point: et.find_text("ENTRY-POINT").map(str::to_string),
        })
    }
}

impl OdxNamed for Library {
    fn short_name(&self) -> &str {
        &self.short_name
    }
}

impl OdxLinked for Arc<Library> {
    fn build_odxlinks(&self) -> OdxLinkEntries {
        vec![(self.odx_id.clone(), LinkTarget::from(self))]
    }

    fn resolve_odxlinks(&self, _: &OdxLinkDatabase, _: &mut ErrorLog) -> Result<(), OdxError> {
        Ok(())
    }

    fn resolve_snrefs(&self, _: &SnRefContext<'_>, _: &mut ErrorLog) -> Result<(), OdxError> {
        Ok(())
    }
}

impl ProgCode {
    pub(crate) fn from_et(et: &Element, parser: &mut ParserState) -> Result<Self, OdxError> {
        let library_refs = et
            .findall("LIBRARY-REFS/LIBRARY-REF")
            .into_iter()
            .map(|ref_et| parser.odxlink_ref(ref_et).map(OdxLink::new))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            code_file: parser.expect_text(et, "CODE-FILE")?.to_string(),
            encryption: et.find_text("ENCRYPTION").map(str::to_string),
            syntax: parser.expect_text(et, "SYNTAX")?.to_string(),
            revision: parser.expect_text(et, "REVISION")?.to_string(),
            entrypoint: et.find_text("ENTRYPOINT").map(str::to_string),
            library_refs,
        })
    }

    /// the resolved libraries; unresolved references are skipped
    pub fn libraries(&self) -> impl Iterator<Item = Arc<Library>> + '_ {
        self.library_refs.iter().filter_map(OdxLink::get)
    }
}

impl OdxLinked for ProgCode {
    // program code has no ID of its own
    fn build_odxlinks(&self) -> OdxLinkEntries {
        Vec::new()
    }

    fn resolve_odxlinks(
        &self,
        odxlinks: &OdxLinkDatabase,
        log: &mut ErrorLog,
    ) -> Result<(), OdxError> {
        for library_ref in &self.library_refs {
            library_ref.resolve(odxlinks, log)?;
        }
        Ok(())
    }

    fn resolve_snrefs(&self, _: &SnRefContext<'_>, _: &mut ErrorLog) -> Result<(), OdxError> {
        Ok(())
    }
}
