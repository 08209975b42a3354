//! Target bookkeeping for one-to-many expansions
//!
//! A target is a location on one or more edges. It is priced whenever the
//! expansion relaxes a transition into one of its edges (the cost up to the
//! location, not to the edge end) and becomes final once the queue's lower
//! bound reaches that price: nothing still queued can beat it.

use butterfly_common::GraphId;
use rustc_hash::FxHashMap;

use super::expansion::{Arrival, ExpansionEngine, Step};
use crate::costing::{Cost, Costing};
use crate::error::Result;
use crate::graph::{Direction, GraphReader};
use crate::location::Location;
use crate::time::TimeInfo;

/// Best known way to a target
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetHit {
    /// Settled label the target was reached from; `None` when origin and
    /// target share an edge
    pub predecessor: Option<u32>,
    pub edge: GraphId,
    pub cost: Cost,
    pub distance: f32,
    /// Cost on entering `edge`
    pub cost_before: Cost,
}

#[derive(Debug, Clone, Copy, Default)]
struct TargetState {
    best: Option<TargetHit>,
    settled: bool,
}

#[derive(Debug, Clone)]
pub struct TargetSet {
    direction: Direction,
    targets: Vec<TargetState>,
    /// edge -> (target, share of the edge travelled to reach the target)
    by_edge: FxHashMap<GraphId, Vec<(usize, f32)>>,
    remaining: usize,
}

impl TargetSet {
    /// Targets of an expansion running in `direction`: destinations for a
    /// forward search, origins for a reverse one
    pub fn new(locations: &[Location], direction: Direction) -> Self {
        let mut by_edge: FxHashMap<GraphId, Vec<(usize, f32)>> = FxHashMap::default();
        for (i, loc) in locations.iter().enumerate() {
            for c in &loc.candidates {
                let share = match direction {
                    Direction::Forward => c.percent_along,
                    Direction::Reverse => 1.0 - c.percent_along,
                };
                by_edge.entry(c.edge).or_default().push((i, share));
            }
        }
        Self {
            direction,
            targets: vec![TargetState::default(); locations.len()],
            by_edge,
            remaining: locations.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn edges(&self) -> impl Iterator<Item = GraphId> + '_ {
        self.by_edge.keys().copied()
    }

    pub fn all_settled(&self) -> bool {
        self.remaining == 0
    }

    fn propose(&mut self, target: usize, hit: TargetHit) {
        let state = &mut self.targets[target];
        if state.settled {
            return;
        }
        if state.best.map_or(true, |b| hit.cost.cost < b.cost.cost) {
            state.best = Some(hit);
        }
    }

    pub fn offer(&mut self, arrival: &Arrival) {
        let Some(entries) = self.by_edge.get(&arrival.edge) else {
            return;
        };
        let hits: Vec<(usize, TargetHit)> = entries
            .iter()
            .map(|&(target, share)| {
                (
                    target,
                    TargetHit {
                        predecessor: Some(arrival.predecessor),
                        edge: arrival.edge,
                        cost: arrival.cost_before + arrival.edge_cost.scale(share),
                        distance: arrival.distance_before + arrival.edge_length * share,
                        cost_before: arrival.cost_before,
                    },
                )
            })
            .collect();
        for (target, hit) in hits {
            self.propose(target, hit);
        }
    }

    /// Price targets lying on the same edge as the expansion's own seed.
    /// Only valid when the target comes after the seed in search direction.
    pub fn offer_shared_edges<G, C>(
        &mut self,
        graph: &G,
        costing: &C,
        seed: &Location,
        time: Option<TimeInfo>,
    ) -> Result<()>
    where
        G: GraphReader + ?Sized,
        C: Costing + ?Sized,
    {
        for c in &seed.candidates {
            let Some(entries) = self.by_edge.get(&c.edge).cloned() else {
                continue;
            };
            let edge = graph.edge(c.edge)?;
            let Some(edge_cost) = costing.edge_cost(&edge, time) else {
                continue;
            };
            // position of the seed expressed as share travelled in search direction
            let seed_share = match self.direction {
                Direction::Forward => c.percent_along,
                Direction::Reverse => 1.0 - c.percent_along,
            };
            for (target, share) in entries {
                if share < seed_share {
                    continue;
                }
                let span = share - seed_share;
                self.propose(
                    target,
                    TargetHit {
                        predecessor: None,
                        edge: c.edge,
                        cost: edge_cost.scale(span),
                        distance: edge.length_m * span,
                        cost_before: Cost::ZERO,
                    },
                );
            }
        }
        Ok(())
    }

    /// Finalize targets whose best price is at or below `bound`
    pub fn settle_below(&mut self, bound: f32) {
        for state in &mut self.targets {
            if !state.settled && state.best.is_some_and(|b| b.cost.cost <= bound) {
                state.settled = true;
                self.remaining -= 1;
            }
        }
    }

    /// The expansion is over: whatever has a price is final
    pub fn settle_all(&mut self) {
        for state in &mut self.targets {
            if !state.settled {
                state.settled = true;
                self.remaining -= 1;
            }
        }
    }

    /// Final hit of a target, if it was reached
    pub fn hit(&self, target: usize) -> Option<&TargetHit> {
        let state = &self.targets[target];
        if state.settled {
            state.best.as_ref()
        } else {
            None
        }
    }
}

/// Drive an expansion until every target is final or the search stops
pub(crate) fn expand_to_targets<G, C>(
    engine: &mut ExpansionEngine<'_, G, C>,
    targets: &mut TargetSet,
) -> Result<()>
where
    G: GraphReader + ?Sized,
    C: Costing + ?Sized,
{
    match engine.peek_key() {
        Some(bound) => targets.settle_below(bound),
        None => targets.settle_all(),
    }
    while !targets.all_settled() {
        match engine.next()? {
            Step::Settled(_) => {
                for arrival in engine.arrivals() {
                    targets.offer(arrival);
                }
                match engine.peek_key() {
                    Some(bound) => targets.settle_below(bound),
                    None => targets.settle_all(),
                }
            }
            Step::Converged | Step::Exhausted => targets.settle_all(),
        }
    }
    Ok(())
}

/// Seed `engine` at `seed` and expand until every target is final
pub(crate) fn search_targets<G, C>(
    engine: &mut ExpansionEngine<'_, G, C>,
    targets: &mut TargetSet,
    graph: &G,
    costing: &C,
    seed: &Location,
    origin: u32,
    time: Option<TimeInfo>,
) -> Result<()>
where
    G: GraphReader + ?Sized,
    C: Costing + ?Sized,
{
    engine.seed(seed, origin, time)?;
    targets.offer_shared_edges(graph, costing, seed, time)?;
    expand_to_targets(engine, targets)
}
