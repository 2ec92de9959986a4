use arc_swap::ArcSwapOption;
use std::sync::Arc;

use crate::OdxError;
use crate::errorlog::ErrorLog;
use crate::namelist::{NamedItemList, OdxNamed};
use crate::odxlink::LinkTargetType;
use crate::state::StateChart;
use crate::structure::Structure;

/// The scopes enclosing an object during short-name resolution
///
/// Containers create a copy of the context with their own scope filled in before
/// they descend into their children.
#[derive(Debug, Clone, Copy, Default)]
pub struct SnRefContext<'a> {
    pub state_chart: Option<&'a StateChart>,
    pub structure: Option<&'a Structure>,
}

/// A reference by SHORT-NAME and, after phase 3, the object it refers to
pub struct SnRef<T> {
    short_name: String,
    target: ArcSwapOption<T>,
}

impl<T: LinkTargetType + OdxNamed> SnRef<T> {
    pub fn new(short_name: &str) -> Self {
        Self {
            short_name: short_name.to_string(),
            target: ArcSwapOption::empty(),
        }
    }

    pub fn short_name(&self) -> &str {
        &self.short_name
    }

    pub fn get(&self) -> Option<Arc<T>> {
        self.target.load_full()
    }

    pub fn is_resolved(&self) -> bool {
        self.target.load().is_some()
    }

    /// look up the short name in `items`
    ///
    /// `items` is `None` if the enclosing scope is not available in the current context;
    /// this is reported the same way as an unknown name.
    pub fn resolve_in(
        &self,
        items: Option<&NamedItemList<Arc<T>>>,
        scope: &str,
        log: &mut ErrorLog,
    ) -> Result<(), OdxError> {
        match items.and_then(|items| items.get(&self.short_name)) {
            Some(item) => {
                self.target.store(Some(item.clone()));
                Ok(())
            }
            None => {
                self.target.store(None);
                log.error_or_log(OdxError::UnresolvedShortName {
                    short_name: self.short_name.clone(),
                    target_type: T::TYPE_NAME,
                    scope: scope.to_string(),
                })
            }
        }
    }
}

impl<T> std::fmt::Debug for SnRef<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnRef")
            .field("short_name", &self.short_name)
            .field("resolved", &self.target.load().is_some())
            .finish()
    }
}
