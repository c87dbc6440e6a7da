//! One query at a time.
//!
//! Clicks that arrive while a query runs are dropped. Control changes are
//! kept as a single pending event, the newest one winning, and run as soon
//! as the current query finishes.

use crate::selection::{QueryTrigger, SelectionEvent};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateDecision {
    Run,
    Dropped,
    Deferred,
}

#[derive(Debug, Default)]
pub struct QueryGate {
    running: bool,
    pending: Option<SelectionEvent>,
}

impl QueryGate {
    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn pending(&self) -> Option<&SelectionEvent> {
        self.pending.as_ref()
    }

    pub fn request(&mut self, event: &SelectionEvent) -> GateDecision {
        if !self.running {
            self.running = true;
            return GateDecision::Run;
        }
        match event.trigger {
            QueryTrigger::Click => GateDecision::Dropped,
            QueryTrigger::Load | QueryTrigger::Control(_) => {
                self.pending = Some(event.clone());
                GateDecision::Deferred
            }
        }
    }

    /// Ends the running query. A pending event, if any, starts right away.
    pub fn finish(&mut self) -> Option<SelectionEvent> {
        let next = self.pending.take();
        self.running = next.is_some();
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SelectionDefaults;
    use crate::params::Geography;
    use crate::selection::{Control, Selection};
    use pretty_assertions::assert_eq;

    fn event(trigger: QueryTrigger, geography: Geography) -> SelectionEvent {
        let mut s = Selection::from_defaults(&SelectionDefaults::default());
        s.geography = geography;
        SelectionEvent::new(trigger, s)
    }

    #[test]
    fn idle_gate_runs_immediately() {
        let mut gate = QueryGate::default();
        assert_eq!(gate.request(&event(QueryTrigger::Click, Geography::Tract)), GateDecision::Run);
        assert!(gate.is_running());
        assert_eq!(gate.finish(), None);
        assert!(!gate.is_running());
    }

    #[test]
    fn clicks_during_a_query_are_dropped() {
        let mut gate = QueryGate::default();
        gate.request(&event(QueryTrigger::Load, Geography::Tract));
        assert_eq!(
            gate.request(&event(QueryTrigger::Click, Geography::County)),
            GateDecision::Dropped
        );
        assert_eq!(gate.pending(), None);
        assert_eq!(gate.finish(), None);
    }

    #[test]
    fn control_changes_coalesce_to_the_latest() {
        let mut gate = QueryGate::default();
        gate.request(&event(QueryTrigger::Click, Geography::Tract));
        let trigger = QueryTrigger::Control(Control::Geography);
        assert_eq!(gate.request(&event(trigger, Geography::County)), GateDecision::Deferred);
        assert_eq!(gate.request(&event(trigger, Geography::BlockGroup)), GateDecision::Deferred);

        assert_eq!(gate.finish(), Some(event(trigger, Geography::BlockGroup)));
        assert!(gate.is_running());
        assert_eq!(gate.finish(), None);
        assert!(!gate.is_running());
    }
}
