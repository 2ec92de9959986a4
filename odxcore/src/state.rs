use std::sync::Arc;

use crate::OdxError;
use crate::element::{Element, IdentifiableElement};
use crate::errorlog::ErrorLog;
use crate::namelist::{NamedItemList, OdxNamed};
use crate::odxlink::{LinkTarget, OdxLinkDatabase, OdxLinkEntries, OdxLinkId, OdxLinked};
use crate::parser::ParserState;
use crate::snrefcontext::{SnRef, SnRefContext};

/// A state of an ECU, e.g. a diagnostic session
#[derive(Debug)]
pub struct State {
    pub odx_id: OdxLinkId,
    pub short_name: String,
    pub long_name: Option<String>,
    pub description: Option<String>,
}

/// A transition between two states of the same state chart
#[derive(Debug)]
pub struct StateTransition {
    pub odx_id: OdxLinkId,
    pub short_name: String,
    pub long_name: Option<String>,
    pub description: Option<String>,
    pub source_snref: SnRef<State>,
    pub target_snref: SnRef<State>,
}

/// A set of states and the transitions between them
#[derive(Debug)]
pub struct StateChart {
    pub odx_id: OdxLinkId,
    pub short_name: String,
    pub long_name: Option<String>,
    pub description: Option<String>,
    pub semantic: String,
    pub state_transitions: NamedItemList<Arc<StateTransition>>,
    pub start_state_snref: SnRef<State>,
    pub states: NamedItemList<Arc<State>>,
}

impl State {
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
        })
    }
}

impl OdxNamed for State {
    fn short_name(&self) -> &str {
        &self.short_name
    }
}

impl OdxLinked for Arc<State> {
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

impl StateTransition {
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
            source_snref: SnRef::new(&parser.snref(et, "SOURCE-SNREF")?),
            target_snref: SnRef::new(&parser.snref(et, "TARGET-SNREF")?),
        })
    }

    pub fn source_state(&self) -> Option<Arc<State>> {
        self.source_snref.get()
    }

    pub fn target_state(&self) -> Option<Arc<State>> {
        self.target_snref.get()
    }
}

impl OdxNamed for StateTransition {
    fn short_name(&self) -> &str {
        &self.short_name
    }
}

impl OdxLinked for Arc<StateTransition> {
    fn build_odxlinks(&self) -> OdxLinkEntries {
        vec![(self.odx_id.clone(), LinkTarget::from(self))]
    }

    fn resolve_odxlinks(&self, _: &OdxLinkDatabase, _: &mut ErrorLog) -> Result<(), OdxError> {
        Ok(())
    }

    // source and target are states of the enclosing state chart
    fn resolve_snrefs(
        &self,
        context: &SnRefContext<'_>,
        log: &mut ErrorLog,
    ) -> Result<(), OdxError> {
        let states = context.state_chart.map(|state_chart| &state_chart.states);
        let scope = match context.state_chart {
            Some(state_chart) => format!("STATE-CHART {}", state_chart.short_name),
            None => format!("STATE-TRANSITION {} (no enclosing STATE-CHART)", self.short_name),
        };
        self.source_snref.resolve_in(states, &scope, log)?;
        self.target_snref.resolve_in(states, &scope, log)
    }
}

impl StateChart {
    pub(crate) fn from_et(et: &Element, parser: &mut ParserState) -> Result<Self, OdxError> {
        let IdentifiableElement {
            odx_id,
            short_name,
            long_name,
            description,
        } = IdentifiableElement::from_et(et, parser)?;

        let mut state_transitions = NamedItemList::new();
        for transition_et in et.findall("STATE-TRANSITIONS/STATE-TRANSITION") {
            let transition = Arc::new(StateTransition::from_et(transition_et, parser)?);
            parser.push_unique(&mut state_transitions, transition, "STATE-TRANSITIONS")?;
        }
        let mut states = NamedItemList::new();
        for state_et in et.findall("STATES/STATE") {
            let state = Arc::new(State::from_et(state_et, parser)?);
            parser.push_unique(&mut states, state, "STATES")?;
        }

        Ok(Self {
            odx_id,
            short_name,
            long_name,
            description,
            semantic: parser.expect_text(et, "SEMANTIC")?.to_string(),
            state_transitions,
            start_state_snref: SnRef::new(&parser.snref(et, "START-STATE-SNREF")?),
            states,
        })
    }

    pub fn start_state(&self) -> Option<Arc<State>> {
        self.start_state_snref.get()
    }
}

impl OdxNamed for StateChart {
    fn short_name(&self) -> &str {
        &self.short_name
    }
}

impl OdxLinked for Arc<StateChart> {
    fn build_odxlinks(&self) -> OdxLinkEntries {
        let mut result = vec![(self.odx_id.clone(), LinkTarget::from(self))];
        for state in &self.states {
            result.extend(state.build_odxlinks());
        }
        for transition in &self.state_transitions {
            result.extend(transition.build_odxlinks());
        }
        result
    }

    fn resolve_odxlinks(
        &self,
        odxlinks: &OdxLinkDatabase,
        log: &mut ErrorLog,
    ) -> Result<(), OdxError> {
        for state in &self.states {
            state.resolve_odxlinks(odxlinks, log)?;
        }
        for transition in &self.state_transitions {
            transition.resolve_odxlinks(odxlinks, log)?;
        }
        Ok(())
    }

    fn resolve_snrefs(
        &self,
        context: &SnRefContext<'_>,
        log: &mut ErrorLog,
    ) -> Result<(), OdxError> {
        let context = SnRefContext {
            state_chart: Some(&**self),
            ..*context
        };
        let scope = format!("STATE-CHART {}", self.short_name);
        self.start_state_snref
            .resolve_in(Some(&self.states), &scope, log)?;
        for state in &self.states {
            state.resolve_snrefs(&context, log)?;
        }
        for transition in &self.state_transitions {
            transition.resolve_snrefs(&context, log)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::odxlink::{DocType, OdxDocFragment, OdxLinkRef};

    fn state_et(name: &str) -> Element {
        Element::new("STATE")
            .with_attr("ID", &format!("state.{name}"))
            .with_text_child("SHORT-NAME", name)
    }

    fn transition_et(name: &str, source: &str, target: &str) -> Element {
        Element::new("STATE-TRANSITION")
            .with_attr("ID", &format!("transition.{name}"))
            .with_text_child("SHORT-NAME", name)
            .with_child(Element::new("SOURCE-SNREF").with_attr("SHORT-NAME", source))
            .with_child(Element::new("TARGET-SNREF").with_attr("SHORT-NAME", target))
    }

    fn chart_et(transition: Element) -> Element {
        Element::new("STATE-CHART")
            .with_attr("ID", "chart.session")
            .with_text_child("SHORT-NAME", "session")
            .with_text_child("SEMANTIC", "SESSION")
            .with_child(Element::new("STATE-TRANSITIONS").with_child(transition))
            .with_child(Element::new("START-STATE-SNREF").with_attr("SHORT-NAME", "default"))
            .with_child(
                Element::new("STATES")
                    .with_child(state_et("default"))
                    .with_child(state_et("extended")),
            )
    }

    fn fragments() -> Vec<OdxDocFragment> {
        vec![OdxDocFragment::new("doc", DocType::Container)]
    }

    #[test]
    fn state_chart_resolution() {
        let mut log = ErrorLog::new(true);
        let mut parser = ParserState::new(fragments(), &mut log);
        let chart = Arc::new(
            StateChart::from_et(
                &chart_et(transition_et("to_extended", "default", "extended")),
                &mut parser,
            )
            .unwrap(),
        );
        assert_eq!(chart.states.len(), 2);

        let mut odxlinks = OdxLinkDatabase::new();
        odxlinks.update(chart.build_odxlinks()).unwrap();
        // chart, two states and one transition
        assert_eq!(odxlinks.len(), 4);
        let state: Arc<State> = odxlinks
            .resolve(&OdxLinkRef::new("state.extended", fragments()))
            .unwrap();
        assert_eq!(state.short_name, "extended");

        chart.resolve_odxlinks(&odxlinks, &mut log).unwrap();
        chart
            .resolve_snrefs(&SnRefContext::default(), &mut log)
            .unwrap();
        assert_eq!(chart.start_state().unwrap().short_name, "default");
        let transition = &chart.state_transitions[0];
        assert!(Arc::ptr_eq(
            &transition.source_state().unwrap(),
            &chart.states[0]
        ));
        assert!(Arc::ptr_eq(&transition.target_state().unwrap(), &state));
    }

    #[test]
    fn unknown_target_state() {
        let mut log = ErrorLog::new(false);
        let mut parser = ParserState::new(fragments(), &mut log);
        let chart = Arc::new(
            StateChart::from_et(
                &chart_et(transition_et("to_programming", "default", "programming")),
                &mut parser,
            )
            .unwrap(),
        );
        chart
            .resolve_snrefs(&SnRefContext::default(), &mut log)
            .unwrap();
        let transition = &chart.state_transitions[0];
        assert!(transition.source_state().is_some());
        assert!(transition.target_state().is_none());
        assert!(matches!(
            &log.messages()[0],
            OdxError::UnresolvedShortName { short_name, .. } if short_name == "programming"
        ));

        let mut log = ErrorLog::new(true);
        assert!(
            chart
                .resolve_snrefs(&SnRefContext::default(), &mut log)
                .is_err()
        );
    }

    #[test]
    fn duplicate_state_names() {
        let et = chart_et(transition_et("t", "default", "default")).with_child(
            Element::new("STATES").with_child(state_et("default")),
        );
        let mut log = ErrorLog::new(true);
        let mut parser = ParserState::new(fragments(), &mut log);
        assert!(matches!(
            StateChart::from_et(&et, &mut parser),
            Err(OdxError::InvalidValue { .. })
        ));
    }
}
