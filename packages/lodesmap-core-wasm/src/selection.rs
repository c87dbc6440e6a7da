//! The current selection as one immutable value.
//!
//! Controls never mutate shared parameters. Each change produces a new
//! [`Selection`], and a change that should run a query is handed on as a
//! [`SelectionEvent`] carrying what caused it. Rejected values leave the
//! previous selection untouched.

use crate::config::SelectionDefaults;
use crate::error::{LodesError, Result};
use crate::params::{truncate_id, valid_id, Geography, JobSegment, Origin, Parameter, Year};
use crate::url_state::QueryString;

/// Query-string name for the clicked GEOID.
pub const ID_PARAM: &str = "id";
/// Older links used `origin` instead of `mode`.
pub const ORIGIN_ALIAS_PARAM: &str = "origin";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Control {
    Origin,
    JobSegment,
    Geography,
    Year,
}

impl Control {
    pub const ALL: [Control; 4] = [
        Control::Origin,
        Control::JobSegment,
        Control::Geography,
        Control::Year,
    ];

    pub fn element_id(self) -> &'static str {
        match self {
            Control::Origin => "mode",
            Control::JobSegment => "job_segment",
            Control::Geography => "geography",
            Control::Year => "year",
        }
    }

    pub fn url_param(self) -> &'static str {
        match self {
            Control::Origin => "mode",
            Control::JobSegment => "jobSegment",
            Control::Geography => "geography",
            Control::Year => "year",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Control::Origin => "Origin",
            Control::JobSegment => "Job Segment",
            Control::Geography => "Geography",
            Control::Year => "Year",
        }
    }

    pub fn from_element_id(id: &str) -> Option<Control> {
        Control::ALL.into_iter().find(|c| c.element_id() == id)
    }
}

/// What caused a query to be requested.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueryTrigger {
    Load,
    Click,
    Control(Control),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selection {
    pub origin: Origin,
    pub job_segment: JobSegment,
    pub year: Year,
    pub geography: Geography,
    /// Full GEOID of the clicked unit, if any.
    pub id: Option<String>,
}

/// A selection that should be queried, and what asked for it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectionEvent {
    pub trigger: QueryTrigger,
    pub selection: Selection,
}

impl SelectionEvent {
    pub fn new(trigger: QueryTrigger, selection: Selection) -> Self {
        SelectionEvent { trigger, selection }
    }
}

impl Selection {
    pub fn from_defaults(defaults: &SelectionDefaults) -> Self {
        Selection {
            origin: defaults.origin,
            job_segment: defaults.job_segment,
            year: defaults.year,
            geography: defaults.geography,
            id: None,
        }
    }

    /// Value currently shown by `control`.
    pub fn control_value(&self, control: Control) -> &'static str {
        match control {
            Control::Origin => self.origin.as_str(),
            Control::JobSegment => self.job_segment.as_str(),
            Control::Geography => self.geography.as_str(),
            Control::Year => self.year.as_str(),
        }
    }

    /// New selection with `control` set to `value`. Empty input keeps the current value.
    pub fn with_control(&self, control: Control, value: &str) -> Result<Selection> {
        let mut next = self.clone();
        if value.is_empty() {
            return Ok(next);
        }
        match control {
            Control::Origin => next.origin = Origin::parse(value)?,
            Control::JobSegment => next.job_segment = JobSegment::parse(value)?,
            Control::Geography => next.geography = Geography::parse(value)?,
            Control::Year => next.year = Year::parse(value)?,
        }
        Ok(next)
    }

    /// New selection pointing at `id`; an empty string clears the selection.
    pub fn with_id(&self, id: &str) -> Result<Selection> {
        if !valid_id(id) {
            return Err(LodesError::InvalidParameter {
                name: ID_PARAM,
                value: id.to_string(),
                allowed: "a 5 to 12 digit Census GEOID".to_string(),
            });
        }
        let mut next = self.clone();
        next.id = (!id.is_empty()).then(|| id.to_string());
        Ok(next)
    }

    /// Builds the selection described by a query string. Invalid entries are
    /// returned alongside and replaced by the defaults.
    pub fn from_query(query: &QueryString, defaults: &SelectionDefaults) -> (Selection, Vec<LodesError>) {
        let mut selection = Selection::from_defaults(defaults);
        let mut rejected = Vec::new();

        for control in Control::ALL {
            let raw = match control {
                Control::Origin => query
                    .get(control.url_param())
                    .or_else(|| query.get(ORIGIN_ALIAS_PARAM)),
                _ => query.get(control.url_param()),
            };
            if let Some(value) = raw {
                match selection.with_control(control, value) {
                    Ok(next) => selection = next,
                    Err(err) => rejected.push(err),
                }
            }
        }

        if let Some(id) = query.get(ID_PARAM) {
            match selection.with_id(id) {
                Ok(next) => selection = next,
                Err(err) => rejected.push(err),
            }
        }

        (selection, rejected)
    }

    /// Two-digit state FIPS prefix of the selected GEOID.
    pub fn state_fips(&self) -> Option<&str> {
        self.id.as_deref().and_then(|id| id.get(..2))
    }

    /// Selected GEOID cut to the current geography.
    pub fn query_id(&self) -> Option<&str> {
        self.id.as_deref().map(|id| truncate_id(self.geography, id))
    }
}
