//! Parallel reconstruction of many events.
//!
//! Every rayon worker owns a clone of the engine and of the strategy; only read-only
//! configuration (density tables behind `Arc`) is shared. Events are independent, so the
//! result equals sequential processing and is returned in input order.

use crate::assignment::{JetAssigner, JetAssignment};
use crate::event::Event;
use crate::observables::TtObservables;
use crate::strategy::{RankStrategy, ReconstructionStatus};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tt_core::{FourMomentum, Result};

/// A missing rank (`-inf`) is written as `null` in JSON.
mod rank_or_null {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(x: &f64, s: S) -> Result<S::Ok, S::Error> {
        if x.is_finite() { s.serialize_some(x) } else { s.serialize_none() }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(d)?.unwrap_or(f64::NEG_INFINITY))
    }
}

/// Owned reconstruction result of one event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventOutcome {
    /// Status.
    pub status: ReconstructionStatus,
    /// Rank of the best assignment, `-inf` if there is none.
    #[serde(with = "rank_or_null")]
    pub rank: f64,
    /// Best assignment, on success.
    pub assignment: Option<JetAssignment>,
    /// Reconstructed neutrino, on success.
    pub neutrino: Option<FourMomentum>,
    /// Derived observables.
    pub observables: TtObservables,
}

/// Reconstruct one owned event.
pub fn reconstruct_event<S: RankStrategy + ?Sized>(
    assigner: &mut JetAssigner,
    strategy: &mut S,
    event: &Event,
) -> Result<EventOutcome> {
    let view = event.view();
    let reco = assigner.reconstruct(&view, strategy);
    let observables = TtObservables::from_reconstruction(&reco)?;
    Ok(EventOutcome {
        status: reco.status(),
        rank: reco.rank(),
        assignment: reco.assignment().ok().copied(),
        neutrino: reco.neutrino().ok(),
        observables,
    })
}

/// Reconstruct events in order on the current thread.
pub fn reconstruct_sequential<S: RankStrategy + Clone>(
    events: &[Event],
    assigner: &JetAssigner,
    strategy: &S,
) -> Result<Vec<EventOutcome>> {
    let mut assigner = assigner.clone();
    let mut strategy = strategy.clone();
    events.iter().map(|e| reconstruct_event(&mut assigner, &mut strategy, e)).collect()
}

/// Reconstruct events in parallel.
///
/// `assigner` and `strategy` are prototypes cloned once per worker.
pub fn reconstruct_batch<S>(
    events: &[Event],
    assigner: &JetAssigner,
    strategy: &S,
) -> Result<Vec<EventOutcome>>
where
    S: RankStrategy + Clone + Send + Sync,
{
    let outcomes: Vec<EventOutcome> = events
        .par_iter()
        .map_init(
            || (assigner.clone(), strategy.clone()),
            |(assigner, strategy), event| reconstruct_event(assigner, strategy, event),
        )
        .collect::<Result<_>>()?;

    let n_success = outcomes.iter().filter(|o| o.status.is_success()).count();
    log::info!("reconstructed {n_success}/{} events", outcomes.len());
    Ok(outcomes)
}
