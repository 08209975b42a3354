//! Generic label-setting expansion (Dijkstra / A*)
//!
//! One engine walks the graph in one direction. Drivers configure it with a
//! heuristic target, a termination predicate, an edge filter and a set of
//! watched edges, seed it with locations, and pull settled labels one at a
//! time through [`ExpansionEngine::next`].

use butterfly_common::{GraphId, LatLng};
use rustc_hash::FxHashSet;
use tracing::{trace, warn};

use super::label::{Allocation, EdgeLabel, LabelStatus, LabelStore, NO_PREDECESSOR};
use super::queue::{BucketQueue, QueueError};
use crate::costing::{Cost, Costing};
use crate::error::{Result, SearchError};
use crate::graph::{Direction, EdgeAttributes, GraphReader, Transition};
use crate::location::Location;
use crate::options::{Limits, SearchOptions};
use crate::time::TimeInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Running,
    /// The termination predicate fired
    Converged,
    /// Queue ran dry: everything reachable has been settled
    Exhausted,
    /// A limit tripped or the graph failed
    Aborted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Settled(u32),
    Converged,
    Exhausted,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExpansionStats {
    pub settled: usize,
    pub inserted: usize,
    pub decreased: usize,
    pub pops: usize,
}

/// Relaxation of a transition into a watched edge
///
/// Recorded even when the edge is already permanent, so drivers can price a
/// location part way along it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arrival {
    pub predecessor: u32,
    pub edge: GraphId,
    /// Cost on entering the edge (predecessor plus turn)
    pub cost_before: Cost,
    pub edge_cost: Cost,
    pub distance_before: f32,
    pub edge_length: f32,
}

/// Returns true when the search should stop before settling the label
pub type TerminationPredicate<'a> = Box<dyn FnMut(&EdgeLabel) -> bool + 'a>;

/// Returns false for edges the search must not use
pub type EdgeFilter<'a> = Box<dyn Fn(&EdgeAttributes) -> bool + 'a>;

pub struct ExpansionEngine<'a, G: GraphReader + ?Sized, C: Costing + ?Sized> {
    graph: &'a G,
    costing: &'a C,
    limits: Limits,
    direction: Direction,
    heuristic_target: Option<LatLng>,
    terminate: Option<TerminationPredicate<'a>>,
    filter: Option<EdgeFilter<'a>>,
    not_thru_pruning: bool,
    watched: FxHashSet<GraphId>,
    labels: LabelStore,
    queue: BucketQueue,
    state: EngineState,
    stats: ExpansionStats,
    scratch: Vec<Transition>,
    relaxed: Vec<u32>,
    arrivals: Vec<Arrival>,
}

impl<'a, G: GraphReader + ?Sized, C: Costing + ?Sized> ExpansionEngine<'a, G, C> {
    pub fn new(
        graph: &'a G,
        costing: &'a C,
        direction: Direction,
        options: &SearchOptions,
        limits: Limits,
    ) -> Self {
        let unit = costing.unit_size();
        let bucket_size = options
            .bucket_size
            .unwrap_or(if unit.is_finite() && unit > 0.0 { unit } else { 1.0 });
        Self {
            graph,
            costing,
            limits,
            direction,
            heuristic_target: None,
            terminate: None,
            filter: None,
            not_thru_pruning: false,
            watched: FxHashSet::default(),
            labels: LabelStore::new(direction),
            queue: BucketQueue::new(bucket_size, options.bucket_count),
            state: EngineState::Idle,
            stats: ExpansionStats::default(),
            scratch: Vec::new(),
            relaxed: Vec::new(),
            arrivals: Vec::new(),
        }
    }

    /// Guide the search towards `target` (A*)
    pub fn with_heuristic(mut self, target: LatLng) -> Self {
        self.heuristic_target = Some(target);
        self
    }

    pub fn with_termination(mut self, predicate: TerminationPredicate<'a>) -> Self {
        self.terminate = Some(predicate);
        self
    }

    pub fn with_filter(mut self, filter: EdgeFilter<'a>) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_not_thru_pruning(mut self) -> Self {
        self.not_thru_pruning = true;
        self
    }

    pub fn watch(&mut self, edges: impl IntoIterator<Item = GraphId>) {
        self.watched.extend(edges);
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn stats(&self) -> ExpansionStats {
        self.stats
    }

    pub fn labels(&self) -> &LabelStore {
        &self.labels
    }

    pub fn label(&self, index: u32) -> &EdgeLabel {
        self.labels.label(index)
    }

    /// Labels inserted or improved by the last step
    pub fn relaxed(&self) -> &[u32] {
        &self.relaxed
    }

    /// Watched edges reached by the last step
    pub fn arrivals(&self) -> &[Arrival] {
        &self.arrivals
    }

    /// Sort cost of the next label to be settled; `None` once the engine
    /// has stopped or has nothing left
    pub fn peek_key(&mut self) -> Option<f32> {
        match self.state {
            EngineState::Idle | EngineState::Running => self.queue.peek_key(),
            _ => None,
        }
    }

    /// Seed every candidate edge of a location. Returns the number of
    /// labels created or improved.
    pub fn seed(&mut self, location: &Location, origin: u32, time: Option<TimeInfo>) -> Result<usize> {
        if self.state == EngineState::Aborted {
            return Err(SearchError::InvalidRequest("expansion was aborted".into()));
        }
        self.relaxed.clear();
        match self.seed_candidates(location, origin, time) {
            Ok(n) => Ok(n),
            Err(e) => Err(self.fail(e)),
        }
    }

    fn seed_candidates(&mut self, location: &Location, origin: u32, time: Option<TimeInfo>) -> Result<usize> {
        let mut seeded = 0;
        for candidate in &location.candidates {
            let edge = self.graph.edge(candidate.edge)?;
            if !self.passes_filter(&edge) {
                continue;
            }
            let Some(edge_cost) = self.costing.edge_cost(&edge, time) else {
                continue;
            };
            let fraction = match self.direction {
                Direction::Forward => 1.0 - candidate.percent_along,
                Direction::Reverse => candidate.percent_along,
            };
            let cost = edge_cost.scale(fraction);
            let heuristic = self.heuristic(&edge)?;
            let label = EdgeLabel {
                predecessor: NO_PREDECESSOR,
                edge_id: edge.id,
                cost,
                sort_cost: cost.cost + heuristic,
                distance: edge.length_m * fraction,
                transition_cost: Cost::ZERO,
                edge_cost,
                edge_length: edge.length_m,
                fraction,
                direction: self.direction,
                restrictions: edge.restrictions,
                time: time.map(|t| self.advance(t, cost.secs)),
                origin,
                not_thru_pruning: self.not_thru_pruning && !edge.not_thru,
                status: LabelStatus::Unreached,
            };
            if let Some(index) = self.offer(label)? {
                self.relaxed.push(index);
                seeded += 1;
            }
        }
        if self.state == EngineState::Idle && !self.queue.is_empty() {
            self.state = EngineState::Running;
        }
        Ok(seeded)
    }

    /// Settle the cheapest label and relax its transitions
    pub fn next(&mut self) -> Result<Step> {
        match self.state {
            EngineState::Converged => return Ok(Step::Converged),
            EngineState::Exhausted => return Ok(Step::Exhausted),
            EngineState::Aborted => {
                return Err(SearchError::InvalidRequest("expansion was aborted".into()))
            }
            EngineState::Idle | EngineState::Running => self.state = EngineState::Running,
        }
        self.relaxed.clear();
        self.arrivals.clear();

        if self.limits.deadline_passed() {
            let elapsed_ms = self.limits.elapsed_ms();
            return Err(self.fail(SearchError::DeadlineExceeded { elapsed_ms }));
        }

        // The front is checked before it is taken out: a label past a limit
        // stays queued and unsettled, and nothing behind it is cheaper.
        let Some((front, _)) = self.queue.peek() else {
            self.state = EngineState::Exhausted;
            return Ok(Step::Exhausted);
        };
        let front = *self.labels.label(front);
        if self.should_stop(&front) {
            self.state = EngineState::Converged;
            return Ok(Step::Converged);
        }
        let Some(index) = self.queue.pop() else {
            self.state = EngineState::Exhausted;
            return Ok(Step::Exhausted);
        };
        self.stats.pops += 1;
        let label = *self.labels.label(index);

        self.labels.mark_permanent(index);
        self.stats.settled += 1;
        trace!(
            edge = %label.edge_id,
            cost = label.cost.cost,
            direction = ?self.direction,
            "settled"
        );

        if let Err(e) = self.expand(index, &label) {
            return Err(self.fail(e));
        }
        Ok(Step::Settled(index))
    }

    fn should_stop(&mut self, label: &EdgeLabel) -> bool {
        if self.limits.max_cost.is_some_and(|max| label.sort_cost > max) {
            return true;
        }
        match self.terminate.as_mut() {
            Some(predicate) => predicate(label),
            None => false,
        }
    }

    fn expand(&mut self, index: u32, pred: &EdgeLabel) -> Result<()> {
        let pred_edge = self.graph.edge(pred.edge_id)?;
        let mut transitions = std::mem::take(&mut self.scratch);
        transitions.clear();
        let result = self
            .graph
            .transitions(pred.edge_id, self.direction, &mut transitions)
            .map_err(SearchError::from)
            .and_then(|()| {
                transitions
                    .iter()
                    .try_for_each(|t| self.relax(index, pred, &pred_edge, t))
            });
        self.scratch = transitions;
        result
    }

    fn relax(
        &mut self,
        index: u32,
        pred: &EdgeLabel,
        pred_edge: &EdgeAttributes,
        transition: &Transition,
    ) -> Result<()> {
        let succ = self.graph.edge(transition.edge)?;
        if !self.passes_filter(&succ) {
            return Ok(());
        }
        if !self.limits.hierarchy.allows(succ.id.level(), pred.distance) {
            return Ok(());
        }
        if self.not_thru_pruning && pred.not_thru_pruning && succ.not_thru {
            return Ok(());
        }

        let permanent = self.labels.status(succ.id) == LabelStatus::Permanent;
        let watched = self.watched.contains(&succ.id);
        if permanent && !watched {
            return Ok(());
        }

        let (from, to) = match self.direction {
            Direction::Forward => (pred_edge, &succ),
            Direction::Reverse => (&succ, pred_edge),
        };
        let Some(transition_cost) = self.costing.transition_cost(from, to, &transition.turn) else {
            return Ok(());
        };
        let entry_time = pred.time.map(|t| self.advance(t, transition_cost.secs));
        let Some(edge_cost) = self.costing.edge_cost(&succ, entry_time) else {
            return Ok(());
        };

        let cost_before = pred.cost + transition_cost;
        if watched {
            self.arrivals.push(Arrival {
                predecessor: index,
                edge: succ.id,
                cost_before,
                edge_cost,
                distance_before: pred.distance,
                edge_length: succ.length_m,
            });
        }
        if permanent {
            return Ok(());
        }

        let distance = pred.distance + succ.length_m;
        if self.limits.max_distance.is_some_and(|max| distance > max) {
            return Ok(());
        }

        let cost = cost_before + edge_cost;
        let heuristic = self.heuristic(&succ)?;
        let label = EdgeLabel {
            predecessor: index,
            edge_id: succ.id,
            cost,
            sort_cost: cost.cost + heuristic,
            distance,
            transition_cost,
            edge_cost,
            edge_length: succ.length_m,
            fraction: 1.0,
            direction: self.direction,
            restrictions: succ.restrictions,
            time: entry_time.map(|t| self.advance(t, edge_cost.secs)),
            origin: pred.origin,
            not_thru_pruning: self.not_thru_pruning && (pred.not_thru_pruning || !succ.not_thru),
            status: LabelStatus::Unreached,
        };
        if let Some(idx) = self.offer(label)? {
            self.relaxed.push(idx);
        }
        Ok(())
    }

    /// Hand a label to the store and queue it. Returns its slot unless an
    /// equal-or-better label already exists.
    fn offer(&mut self, label: EdgeLabel) -> Result<Option<u32>> {
        if self.labels.find(label.edge_id).is_none() && self.labels.len() >= self.limits.max_labels {
            return Err(SearchError::ResourceExceeded {
                limit: self.limits.max_labels,
            });
        }
        match self.labels.allocate(label) {
            Allocation::Inserted(index) => {
                self.queue
                    .push(index, label.sort_cost)
                    .map_err(costing_defect)?;
                self.stats.inserted += 1;
                Ok(Some(index))
            }
            Allocation::Updated {
                index,
                previous_sort_cost,
            } => {
                self.queue
                    .decrease(index, previous_sort_cost, label.sort_cost)
                    .map_err(costing_defect)?;
                self.stats.decreased += 1;
                Ok(Some(index))
            }
            Allocation::Rejected => Ok(None),
        }
    }

    fn heuristic(&self, edge: &EdgeAttributes) -> Result<f32> {
        let Some(target) = self.heuristic_target else {
            return Ok(0.0);
        };
        let node = match self.direction {
            Direction::Forward => edge.end_node,
            Direction::Reverse => edge.start_node,
        };
        let position = self.graph.node(node)?.position;
        Ok(self.costing.heuristic(position, target))
    }

    fn passes_filter(&self, edge: &EdgeAttributes) -> bool {
        self.filter.as_ref().map_or(true, |f| f(edge))
    }

    fn advance(&self, time: TimeInfo, secs: f32) -> TimeInfo {
        match self.direction {
            Direction::Forward => time.forward(secs),
            Direction::Reverse => time.reverse(secs),
        }
    }

    fn fail(&mut self, err: SearchError) -> SearchError {
        self.state = EngineState::Aborted;
        if let SearchError::InvalidCostingConfiguration(reason) = &err {
            warn!(direction = ?self.direction, %reason, "expansion aborted on costing defect");
        }
        err
    }
}

fn costing_defect(err: QueueError) -> SearchError {
    SearchError::InvalidCostingConfiguration(err.to_string())
}
