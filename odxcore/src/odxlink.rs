//! Identifier based references between description objects
//!
//! Every description object that carries an ID registers itself in an
//! [`OdxLinkDatabase`] (phase 1). References are then turned into direct relations
//! by looking them up in the database (phase 2). The registry only holds weak
//! handles: the objects are owned by their documents.

use arc_swap::ArcSwapOption;
use fnv::FnvHashMap;
use std::fmt::Display;
use std::str::FromStr;
use std::sync::{Arc, Weak};

use crate::OdxError;
use crate::dataobjectproperty::{DataObjectProperty, DopBase};
use crate::errorlog::ErrorLog;
use crate::parameters::Parameter;
use crate::progcode::Library;
use crate::snrefcontext::SnRefContext;
use crate::state::{State, StateChart, StateTransition};
use crate::structure::Structure;
use crate::table::{Table, TableRow};

/// The kind of document a fragment comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocType {
    Container,
    ComparamSubset,
    ComparamSpec,
    VehicleInfoSpec,
    Flash,
    Layer,
    MultipleEcuJobSpec,
    FunctionDictionarySpec,
    EcuConfig,
}

/// A document (or a layer inside a document) which scopes identifiers
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OdxDocFragment {
    pub doc_name: String,
    pub doc_type: DocType,
}

/// The ID of a description object
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OdxLinkId {
    pub local_id: String,
    pub doc_fragments: Vec<OdxDocFragment>,
}

/// A reference to the ID of another description object
#[derive(Debug, Clone, PartialEq)]
pub struct OdxLinkRef {
    pub ref_id: String,
    /// the fragments to search, the last one first
    pub ref_docs: Vec<OdxDocFragment>,
}

/// A registered description object
#[derive(Debug, Clone)]
pub enum LinkTarget {
    State(Weak<State>),
    StateTransition(Weak<StateTransition>),
    StateChart(Weak<StateChart>),
    Library(Weak<Library>),
    DataObjectProperty(Weak<DataObjectProperty>),
    Structure(Weak<Structure>),
    Table(Weak<Table>),
    TableRow(Weak<TableRow>),
    Parameter(Weak<Parameter>),
}

/// The identifier-to-object entries contributed by an object during registration
pub type OdxLinkEntries = Vec<(OdxLinkId, LinkTarget)>;

/// Types that a reference can resolve to
pub trait LinkTargetType: Sized {
    /// the element name used in error messages
    const TYPE_NAME: &'static str;

    /// `None` if the target is of a different type or no longer exists
    fn from_target(target: &LinkTarget) -> Option<Arc<Self>>;
}

/// The capabilities of every object taking part in link resolution
///
/// The three operations are invoked by [`crate::Database`] in three separate passes
/// over all documents. Resolved relations are stored inside the objects, so all
/// three passes only need shared access.
pub trait OdxLinked {
    /// phase 1: the IDs of this object and all objects it contains
    fn build_odxlinks(&self) -> OdxLinkEntries;

    /// phase 2: turn ID references into direct relations
    fn resolve_odxlinks(&self, odxlinks: &OdxLinkDatabase, log: &mut ErrorLog)
    -> Result<(), OdxError>;

    /// phase 3: resolve short-name references within the scopes given by the context
    fn resolve_snrefs(&self, context: &SnRefContext<'_>, log: &mut ErrorLog)
    -> Result<(), OdxError>;
}

/// The link registry of a set of documents
#[derive(Debug, Default)]
pub struct OdxLinkDatabase {
    db: FnvHashMap<OdxDocFragment, FnvHashMap<String, LinkTarget>>,
}

/// A reference and, after phase 2, the object it refers to
pub struct OdxLink<T> {
    odxlink_ref: OdxLinkRef,
    target: ArcSwapOption<T>,
}

impl FromStr for DocType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CONTAINER" => Ok(Self::Container),
            "COMPARAM-SUBSET" => Ok(Self::ComparamSubset),
            "COMPARAM-SPEC" => Ok(Self::ComparamSpec),
            "VEHICLE-INFO-SPEC" => Ok(Self::VehicleInfoSpec),
            "FLASH" => Ok(Self::Flash),
            "LAYER" => Ok(Self::Layer),
            "MULTIPLE-ECU-JOB-SPEC" => Ok(Self::MultipleEcuJobSpec),
            "FUNCTION-DICTIONARY-SPEC" => Ok(Self::FunctionDictionarySpec),
            "ECU-CONFIG" => Ok(Self::EcuConfig),
            _ => Err(format!("unknown document type {s}")),
        }
    }
}

impl DocType {
    /// the document type implied by the root element of a document
    pub fn from_root_tag(tag: &str) -> Option<Self> {
        match tag {
            "DIAG-LAYER-CONTAINER" => Some(Self::Container),
            "COMPARAM-SUBSET" => Some(Self::ComparamSubset),
            "COMPARAM-SPEC" => Some(Self::ComparamSpec),
            "VEHICLE-INFO-SPEC" => Some(Self::VehicleInfoSpec),
            "FLASH" => Some(Self::Flash),
            "MULTIPLE-ECU-JOB-SPEC" => Some(Self::MultipleEcuJobSpec),
            "FUNCTION-DICTIONARY-SPEC" => Some(Self::FunctionDictionarySpec),
            "ECU-CONFIG" => Some(Self::EcuConfig),
            _ => None,
        }
    }
}

impl Display for DocType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Container => "CONTAINER",
            Self::ComparamSubset => "COMPARAM-SUBSET",
            Self::ComparamSpec => "COMPARAM-SPEC",
            Self::VehicleInfoSpec => "VEHICLE-INFO-SPEC",
            Self::Flash => "FLASH",
            Self::Layer => "LAYER",
            Self::MultipleEcuJobSpec => "MULTIPLE-ECU-JOB-SPEC",
            Self::FunctionDictionarySpec => "FUNCTION-DICTIONARY-SPEC",
            Self::EcuConfig => "ECU-CONFIG",
        })
    }
}

impl OdxDocFragment {
    pub fn new(doc_name: &str, doc_type: DocType) -> Self {
        Self {
            doc_name: doc_name.to_string(),
            doc_type,
        }
    }
}

impl Display for OdxDocFragment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.doc_name, self.doc_type)
    }
}

impl OdxLinkId {
    pub fn new(local_id: &str, doc_fragments: Vec<OdxDocFragment>) -> Self {
        Self {
            local_id: local_id.to_string(),
            doc_fragments,
        }
    }
}

impl OdxLinkRef {
    pub fn new(ref_id: &str, ref_docs: Vec<OdxDocFragment>) -> Self {
        Self {
            ref_id: ref_id.to_string(),
            ref_docs,
        }
    }

    /// a reference pointing at an existing ID
    pub fn from_id(odx_id: &OdxLinkId) -> Self {
        Self {
            ref_id: odx_id.local_id.clone(),
            ref_docs: odx_id.doc_fragments.clone(),
        }
    }
}

macro_rules! link_target_types {
    ( $( $variant:ident => $type:ty, $name:expr; )* ) => {
        impl LinkTarget {
            pub fn type_name(&self) -> &'static str {
                match self {
                    $( Self::$variant(_) => $name, )*
                }
            }

            /// true if the registered object has not been dropped
            pub fn is_alive(&self) -> bool {
                match self {
                    $( Self::$variant(weak) => weak.strong_count() > 0, )*
                }
            }

            fn same_object(&self, other: &LinkTarget) -> bool {
                match (self, other) {
                    $( (Self::$variant(a), Self::$variant(b)) => Weak::ptr_eq(a, b), )*
                    _ => false,
                }
            }
        }

        $(
            impl From<&Arc<$type>> for LinkTarget {
                fn from(value: &Arc<$type>) -> Self {
                    Self::$variant(Arc::downgrade(value))
                }
            }

            impl LinkTargetType for $type {
                const TYPE_NAME: &'static str = $name;

                fn from_target(target: &LinkTarget) -> Option<Arc<Self>> {
                    match target {
                        LinkTarget::$variant(weak) => weak.upgrade(),
                        _ => None,
                    }
                }
            }
        )*
    };
}

link_target_types! {
    State => State, "STATE";
    StateTransition => StateTransition, "STATE-TRANSITION";
    StateChart => StateChart, "STATE-CHART";
    Library => Library, "LIBRARY";
    DataObjectProperty => DataObjectProperty, "DATA-OBJECT-PROP";
    Structure => Structure, "STRUCTURE";
    Table => Table, "TABLE";
    TableRow => TableRow, "TABLE-ROW";
    Parameter => Parameter, "PARAM";
}

impl LinkTargetType for DopBase {
    const TYPE_NAME: &'static str = "DOP-BASE";

    fn from_target(target: &LinkTarget) -> Option<Arc<Self>> {
        match target {
            LinkTarget::DataObjectProperty(weak) => weak
                .upgrade()
                .map(|dop| Arc::new(DopBase::DataObjectProperty(dop))),
            LinkTarget::Structure(weak) => weak
                .upgrade()
                .map(|structure| Arc::new(DopBase::Structure(structure))),
            _ => None,
        }
    }
}

impl OdxLinkDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// add the entries of one object tree
    ///
    /// An ID is registered in every fragment of its scope. Registering the same object
    /// again is a no-op; a different object with an ID that already exists in the same
    /// fragment is rejected.
    pub fn update(&mut self, entries: OdxLinkEntries) -> Result<(), OdxError> {
        for (odx_id, target) in entries {
            for doc_fragment in &odx_id.doc_fragments {
                let fragment_db = self.db.entry(doc_fragment.clone()).or_default();
                if let Some(existing) = fragment_db.get(&odx_id.local_id) {
                    if !existing.same_object(&target) {
                        return Err(OdxError::DuplicateLinkId {
                            local_id: odx_id.local_id.clone(),
                            doc_fragment: doc_fragment.to_string(),
                        });
                    }
                }
                fragment_db.insert(odx_id.local_id.clone(), target.clone());
            }
        }
        Ok(())
    }

    /// look up the object registered for an ID in any of its fragments
    pub fn get(&self, odx_id: &OdxLinkId) -> Option<&LinkTarget> {
        odx_id
            .doc_fragments
            .iter()
            .rev()
            .find_map(|doc_fragment| self.db.get(doc_fragment)?.get(&odx_id.local_id))
    }

    /// resolve a reference to an object of type `T`
    ///
    /// The fragments of the reference are searched last to first; the first fragment
    /// which knows the ID decides the result.
    pub fn resolve<T: LinkTargetType>(&self, odxlink: &OdxLinkRef) -> Result<Arc<T>, OdxError> {
        for doc_fragment in odxlink.ref_docs.iter().rev() {
            let Some(fragment_db) = self.db.get(doc_fragment) else {
                continue;
            };
            if let Some(target) = fragment_db.get(&odxlink.ref_id) {
                if !target.is_alive() {
                    break;
                }
                return T::from_target(target).ok_or_else(|| OdxError::LinkTypeMismatch {
                    ref_id: odxlink.ref_id.clone(),
                    expected: T::TYPE_NAME,
                    actual: target.type_name(),
                });
            }
        }

        Err(OdxError::DanglingLink {
            ref_id: odxlink.ref_id.clone(),
            doc_fragments: odxlink
                .ref_docs
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", "),
        })
    }

    /// all (fragment, local id) keys of the registry
    pub fn keys(&self) -> impl Iterator<Item = (&OdxDocFragment, &String)> {
        self.db.iter().flat_map(|(doc_fragment, fragment_db)| {
            fragment_db.keys().map(move |local_id| (doc_fragment, local_id))
        })
    }

    /// the number of (fragment, local id) entries
    pub fn len(&self) -> usize {
        self.db.values().map(|fragment_db| fragment_db.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: LinkTargetType> OdxLink<T> {
    pub fn new(odxlink_ref: OdxLinkRef) -> Self {
        Self {
            odxlink_ref,
            target: ArcSwapOption::empty(),
        }
    }

    pub fn odxlink_ref(&self) -> &OdxLinkRef {
        &self.odxlink_ref
    }

    /// the referenced object, once the reference has been resolved
    pub fn get(&self) -> Option<Arc<T>> {
        self.target.load_full()
    }

    pub fn is_resolved(&self) -> bool {
        self.target.load().is_some()
    }

    /// look up the reference and store the result; a failed lookup clears any previous result
    pub fn resolve(&self, odxlinks: &OdxLinkDatabase, log: &mut ErrorLog) -> Result<(), OdxError> {
        match odxlinks.resolve::<T>(&self.odxlink_ref) {
            Ok(target) => {
                self.target.store(Some(target));
                Ok(())
            }
            Err(err) => {
                self.target.store(None);
                log.error_or_log(err)
            }
        }
    }
}

impl<T> std::fmt::Debug for OdxLink<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OdxLink")
            .field("odxlink_ref", &self.odxlink_ref)
            .field("resolved", &self.target.load().is_some())
            .finish()
    }
}
