//! odxcore is a library that links and encodes ODX diagnostic descriptions.
//!
//! Documents are built from an element tree supplied by the caller. A [`Database`] holds the
//! documents and connects them in three phases:
//!
//! 1. link registration: every object with an ID is entered into the [`OdxLinkDatabase`]
//! 2. link resolution: ID references become direct relations
//! 3. short-name resolution: references by SHORT-NAME are resolved within their enclosing scope
//!
//! Fully resolved structures can then encode physical parameter values into a PDU.
//!
//! Every operation takes a `strict` flag. In strict mode the first problem aborts the operation.
//! In lenient mode problems are returned as a list of warnings next to a best-effort result.
//!
//! ```
//! use odxcore::{Database, Document, Element};
//!
//! let et = Element::new("DIAG-LAYER-CONTAINER")
//!     .with_attr("ID", "dlc")
//!     .with_text_child("SHORT-NAME", "container");
//! let (document, warnings) = Document::from_et(&et, true).unwrap();
//! assert!(warnings.is_empty());
//!
//! let mut database = Database::new();
//! database.add_document(document);
//! let warnings = database.refresh(true).unwrap();
//! assert!(warnings.is_empty());
//! ```

mod compumethods;
mod database;
mod dataobjectproperty;
mod diagcodedtype;
mod document;
mod element;
mod encodestate;
mod errorlog;
mod namelist;
mod odxlink;
mod odxtypes;
mod parameters;
mod parser;
mod progcode;
mod snrefcontext;
mod state;
mod structure;
mod table;

use thiserror::Error;

pub use compumethods::{
    CompuCategory, CompuConst, CompuDefaultValue, CompuInternalToPhys, CompuInverseValue,
    CompuMethod, CompuRationalCoeffs, CompuScale, IntervalType, Limit,
};
pub use database::{Database, ResolutionPhase};
pub use dataobjectproperty::{DataObjectProperty, DopBase};
pub use diagcodedtype::{CodedLength, DiagCodedType, Termination};
pub use document::Document;
pub use element::{Element, IdentifiableElement};
pub use encodestate::EncodeState;
pub use errorlog::ErrorLog;
pub use namelist::{NamedItemList, OdxNamed};
pub use odxlink::{
    DocType, LinkTarget, LinkTargetType, OdxDocFragment, OdxLink, OdxLinkDatabase, OdxLinkEntries,
    OdxLinkId, OdxLinkRef, OdxLinked,
};
pub use odxtypes::{DataType, ParameterValue, ParameterValueDict, Value, ValueKind};
pub use parameters::{Parameter, ParameterKind};
pub use parser::ParserState;
pub use progcode::{Library, ProgCode};
pub use snrefcontext::{SnRef, SnRefContext};
pub use state::{State, StateChart, StateTransition};
pub use structure::Structure;
pub use table::{Table, TableRow};

/// The maximum depth of nested structure encodings
///
/// Structures can reach themselves through sub-structure parameters or table rows;
/// encoding deeper than this fails with [`OdxError::NestingTooDeep`].
pub const MAX_NESTING_DEPTH: usize = 32;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum OdxError {
    /// `EncodeError`: a parameter could not be placed into the PDU
    #[error("Encode error: parameter {param_name}: {description}")]
    EncodeError {
        param_name: String,
        description: String,
    },

    /// `DanglingLink`: a reference to an ID which is not registered
    #[error("Link resolution error: ID \"{ref_id}\" was not found in {doc_fragments}")]
    DanglingLink {
        ref_id: String,
        doc_fragments: String,
    },

    /// `LinkTypeMismatch`: a reference to an ID which belongs to an object of a different type
    #[error(
        "Link resolution error: ID \"{ref_id}\" refers to a {actual}, but a {expected} was expected"
    )]
    LinkTypeMismatch {
        ref_id: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// `UnresolvedShortName`: a short-name reference which does not match anything in its scope
    #[error("Link resolution error: there is no {target_type} \"{short_name}\" in {scope}")]
    UnresolvedShortName {
        short_name: String,
        target_type: &'static str,
        scope: String,
    },

    /// `DuplicateLinkId`: two different objects use the same ID in the same document fragment
    #[error("Duplicate ID \"{local_id}\" in {doc_fragment}")]
    DuplicateLinkId {
        local_id: String,
        doc_fragment: String,
    },

    /// `ConversionError`: a value could not be converted between physical and internal
    #[error("Conversion error: {description}")]
    ConversionError { description: String },

    /// `PhaseOrder`: a resolution phase was started before the previous phase completed
    #[error(
        "Cannot run {operation}: the database must be at least {required}, but it is {current}"
    )]
    PhaseOrder {
        operation: &'static str,
        required: ResolutionPhase,
        current: ResolutionPhase,
    },

    /// `MissingElement`: a required element or attribute is missing
    #[error("Element {parent} is missing the required {tag}")]
    MissingElement { tag: String, parent: String },

    /// `InvalidValue`: an element contains text which could not be interpreted
    #[error("Invalid value \"{text}\" in {element}: {description}")]
    InvalidValue {
        text: String,
        element: String,
        description: String,
    },

    /// `NestingTooDeep`: structures are nested more than [`MAX_NESTING_DEPTH`] levels deep
    #[error("Structure {element} is nested more than {max_depth} levels deep")]
    NestingTooDeep { element: String, max_depth: usize },
}
