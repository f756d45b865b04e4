//! Per-event input.

use serde::{Deserialize, Serialize};
use tt_core::{Jet, Lepton, Met, MetCovariance};

/// Borrowed view of the objects of one event.
///
/// Jets are expected in decreasing pt order; this is not checked.
#[derive(Debug, Clone, Copy)]
pub struct EventView<'a> {
    /// Jets, pt-descending.
    pub jets: &'a [Jet],
    /// Leading charged lepton, if any.
    pub lepton: Option<&'a Lepton>,
    /// Missing transverse momentum.
    pub met: Met,
    /// Covariance of the MET measurement.
    pub met_covariance: MetCovariance,
}

impl<'a> EventView<'a> {
    /// View with a unit MET covariance.
    pub fn new(jets: &'a [Jet], lepton: Option<&'a Lepton>, met: Met) -> Self {
        Self { jets, lepton, met, met_covariance: MetCovariance::identity() }
    }

    /// Set the MET covariance.
    pub fn with_met_covariance(mut self, met_covariance: MetCovariance) -> Self {
        self.met_covariance = met_covariance;
        self
    }
}

/// Owned event, as read from JSON by batch processing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Jets, pt-descending.
    pub jets: Vec<Jet>,
    /// Leading charged lepton, if any.
    #[serde(default)]
    pub lepton: Option<Lepton>,
    /// Missing transverse momentum.
    pub met: Met,
    /// Covariance of the MET measurement.
    #[serde(default)]
    pub met_covariance: MetCovariance,
}

impl Event {
    /// Event with a unit MET covariance.
    pub fn new(jets: Vec<Jet>, lepton: Option<Lepton>, met: Met) -> Self {
        Self { jets, lepton, met, met_covariance: MetCovariance::identity() }
    }

    /// Borrow the event.
    pub fn view(&self) -> EventView<'_> {
        EventView {
            jets: &self.jets,
            lepton: self.lepton.as_ref(),
            met: self.met,
            met_covariance: self.met_covariance,
        }
    }
}
