//! Connectivity graph over placed modules.
//!
//! Nodes are module IDs; edges are inferred where two modules sit
//! within the connection distance (surface to surface) or are linked
//! explicitly through a placement's `connections` list. Airlocks also
//! connect to a virtual exterior node via "external" edges — crew
//! transit and egress never route through the exterior, so pressurized
//! queries filter those edges out.
//!
//! Implemented as a self-contained adjacency list with BFS/Dijkstra;
//! shortest-path ties break by edge insertion order.

use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};

use crate::catalog::{ModuleCatalog, ModuleType};
use crate::geometry::Vec3;
use crate::layout::ModulePlacement;

/// Assumed crew walking speed for transit and egress times.
pub const CREW_WALKING_SPEED_MPS: f32 = 1.0;

/// Default surface-to-surface gap below which two modules are
/// considered connected.
pub const DEFAULT_CONNECTION_DISTANCE_M: f32 = 1.2;

/// Minimum separation between airlocks before they count as clustered.
pub const MIN_AIRLOCK_SEPARATION_M: f32 = 4.0;

/// Virtual node standing in for the un-pressurized exterior.
const EXTERIOR_NODE: u32 = u32::MAX;

/// Whether an edge is inside the pressure vessel or crosses its hull.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    Pressurized,
    External,
}

#[derive(Debug, Clone, Copy)]
struct Edge {
    to: u32,
    length_m: f32,
    kind: EdgeKind,
}

/// Connectivity summary for a placement set.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectivityMetrics {
    pub is_connected: bool,
    pub component_count: usize,
    pub largest_component_size: usize,
    /// Per-module: can this module reach an airlock on pressurized edges?
    pub airlock_accessibility: HashMap<u32, bool>,
}

/// Undirected graph of module connectivity.
#[derive(Debug, Clone)]
pub struct ConnectivityGraph {
    /// Real module nodes in placement order.
    order: Vec<u32>,
    adj: HashMap<u32, Vec<Edge>>,
    types: HashMap<u32, ModuleType>,
    positions: HashMap<u32, Vec3>,
}

impl ConnectivityGraph {
    /// Build the graph from a placement set.
    ///
    /// Two modules connect when their boxes' surface gap is at most
    /// `connection_distance_m`, or when either lists the other in its
    /// explicit `connections`.
    pub fn build(
        placements: &[ModulePlacement],
        catalog: &ModuleCatalog,
        connection_distance_m: f32,
    ) -> Self {
        let mut graph = Self {
            order: Vec::new(),
            adj: HashMap::new(),
            types: HashMap::new(),
            positions: HashMap::new(),
        };

        for p in placements {
            graph.order.push(p.module_id);
            graph.adj.entry(p.module_id).or_default();
            graph.types.insert(p.module_id, p.module_type);
            graph.positions.insert(p.module_id, p.position);
        }
        graph.adj.entry(EXTERIOR_NODE).or_default();

        let boxes: Vec<_> = placements
            .iter()
            .map(|p| catalog.definition_for(p.module_type).map(|d| p.placed_box(d)))
            .collect();

        for i in 0..placements.len() {
            for j in (i + 1)..placements.len() {
                let a = &placements[i];
                let b = &placements[j];
                let near = match (&boxes[i], &boxes[j]) {
                    (Some(ba), Some(bb)) => ba.distance_to(bb) <= connection_distance_m,
                    _ => false,
                };
                let explicit = a.connections.contains(&b.module_id)
                    || b.connections.contains(&a.module_id);
                if near || explicit {
                    let length = a.position.distance(&b.position);
                    graph.add_edge(a.module_id, b.module_id, length, EdgeKind::Pressurized);
                }
            }
        }

        // Each airlock opens to the exterior through its outer hatch.
        for p in placements {
            if p.module_type == ModuleType::Airlock {
                graph.add_edge(p.module_id, EXTERIOR_NODE, 0.0, EdgeKind::External);
            }
        }

        graph
    }

    fn add_edge(&mut self, a: u32, b: u32, length_m: f32, kind: EdgeKind) {
        self.adj.entry(a).or_default().push(Edge { to: b, length_m, kind });
        self.adj.entry(b).or_default().push(Edge { to: a, length_m, kind });
    }

    pub fn node_count(&self) -> usize {
        self.order.len()
    }

    /// Pressurized neighbors of a module, in edge insertion order.
    pub fn neighbors(&self, module_id: u32) -> Vec<u32> {
        self.adj
            .get(&module_id)
            .map(|edges| {
                edges
                    .iter()
                    .filter(|e| e.kind == EdgeKind::Pressurized)
                    .map(|e| e.to)
                    .collect()
            })
            .unwrap_or_default()
    }

    fn airlocks(&self) -> Vec<u32> {
        self.order
            .iter()
            .copied()
            .filter(|id| self.types.get(id) == Some(&ModuleType::Airlock))
            .collect()
    }

    /// True if every module can reach every other through pressurized
    /// edges. Empty and singleton layouts are trivially connected.
    pub fn is_connected(&self) -> bool {
        self.connected_components().len() <= 1
    }

    /// Connected components over pressurized edges, each sorted by
    /// module ID, ordered by first appearance in the placement order.
    pub fn connected_components(&self) -> Vec<Vec<u32>> {
        let mut components = Vec::new();
        let mut visited: HashSet<u32> = HashSet::new();

        for &start in &self.order {
            if visited.contains(&start) {
                continue;
            }
            let mut component = Vec::new();
            let mut queue = VecDeque::new();
            visited.insert(start);
            queue.push_back(start);
            while let Some(current) = queue.pop_front() {
                component.push(current);
                if let Some(edges) = self.adj.get(&current) {
                    for e in edges {
                        if e.kind == EdgeKind::Pressurized && visited.insert(e.to) {
                            queue.push_back(e.to);
                        }
                    }
                }
            }
            component.sort_unstable();
            components.push(component);
        }
        components
    }

    /// Dijkstra over pressurized edges from `from`, returning distance
    /// and predecessor maps.
    fn dijkstra(&self, from: u32) -> (HashMap<u32, f32>, HashMap<u32, u32>) {
        #[derive(Debug, PartialEq)]
        struct State {
            cost: f32,
            tiebreak: usize,
            node: u32,
        }
        impl Eq for State {}
        impl Ord for State {
            fn cmp(&self, other: &Self) -> std::cmp::Ordering {
                // Min-heap on cost; earlier-inserted nodes win ties.
                other
                    .cost
                    .partial_cmp(&self.cost)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| other.tiebreak.cmp(&self.tiebreak))
            }
        }
        impl PartialOrd for State {
            fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
                Some(self.cmp(other))
            }
        }

        let mut dist: HashMap<u32, f32> = HashMap::new();
        let mut prev: HashMap<u32, u32> = HashMap::new();
        let mut heap = BinaryHeap::new();
        let mut counter = 0usize;

        if !self.adj.contains_key(&from) {
            return (dist, prev);
        }

        dist.insert(from, 0.0);
        heap.push(State {
            cost: 0.0,
            tiebreak: counter,
            node: from,
        });

        while let Some(State { cost, node, .. }) = heap.pop() {
            if cost > *dist.get(&node).unwrap_or(&f32::INFINITY) {
                continue;
            }
            if let Some(edges) = self.adj.get(&node) {
                for e in edges {
                    if e.kind != EdgeKind::Pressurized {
                        continue;
                    }
                    let next_cost = cost + e.length_m;
                    if next_cost < *dist.get(&e.to).unwrap_or(&f32::INFINITY) {
                        dist.insert(e.to, next_cost);
                        prev.insert(e.to, node);
                        counter += 1;
                        heap.push(State {
                            cost: next_cost,
                            tiebreak: counter,
                            node: e.to,
                        });
                    }
                }
            }
        }
        (dist, prev)
    }

    /// Shortest pressurized path between two modules, endpoints
    /// included. Empty when unreachable or when either ID is unknown.
    pub fn shortest_path(&self, from: u32, to: u32) -> Vec<u32> {
        if !self.adj.contains_key(&from) || !self.adj.contains_key(&to) {
            return Vec::new();
        }
        if from == to {
            return vec![from];
        }
        let (dist, prev) = self.dijkstra(from);
        if !dist.contains_key(&to) {
            return Vec::new();
        }
        let mut path = vec![to];
        let mut current = to;
        while let Some(&p) = prev.get(&current) {
            path.push(p);
            current = p;
        }
        path.reverse();
        path
    }

    /// Length in meters of the shortest pressurized path, `None` when
    /// unreachable.
    pub fn shortest_path_length(&self, from: u32, to: u32) -> Option<f32> {
        if from == to && self.adj.contains_key(&from) {
            return Some(0.0);
        }
        let (dist, _) = self.dijkstra(from);
        dist.get(&to).copied()
    }

    /// Transit time in seconds between two modules at walking speed.
    pub fn transit_time_s(&self, from: u32, to: u32) -> Option<f32> {
        self.shortest_path_length(from, to)
            .map(|d| d / CREW_WALKING_SPEED_MPS)
    }

    /// Mean transit time over all unordered module pairs. Infinite if
    /// any pair is unreachable; zero for empty or singleton layouts.
    pub fn mean_transit_time_s(&self) -> f32 {
        if self.order.len() < 2 {
            return 0.0;
        }
        let mut total = 0.0f32;
        let mut pairs = 0u32;
        for (i, &a) in self.order.iter().enumerate() {
            let (dist, _) = self.dijkstra(a);
            for &b in self.order.iter().skip(i + 1) {
                match dist.get(&b) {
                    Some(d) => {
                        total += d / CREW_WALKING_SPEED_MPS;
                        pairs += 1;
                    }
                    None => return f32::INFINITY,
                }
            }
        }
        total / pairs as f32
    }

    /// Egress time in seconds from a module to its nearest reachable
    /// airlock. Infinite when no airlock is reachable — a hard failure
    /// signal, never silently dropped.
    pub fn egress_time_s(&self, module_id: u32) -> f32 {
        let airlocks = self.airlocks();
        if airlocks.is_empty() {
            return f32::INFINITY;
        }
        if airlocks.contains(&module_id) {
            return 0.0;
        }
        let (dist, _) = self.dijkstra(module_id);
        airlocks
            .iter()
            .filter_map(|a| dist.get(a))
            .fold(f32::INFINITY, |best, d| best.min(d / CREW_WALKING_SPEED_MPS))
    }

    /// Worst-case egress time over all modules.
    pub fn worst_egress_time_s(&self) -> f32 {
        self.order
            .iter()
            .map(|&id| self.egress_time_s(id))
            .fold(0.0, f32::max)
    }

    /// Check that an airlock exists and that every module can reach one
    /// through pressurized edges only.
    pub fn validate_pressurized_connectivity(&self) -> (bool, Vec<String>) {
        let mut errors = Vec::new();
        let airlocks = self.airlocks();
        if airlocks.is_empty() {
            errors.push("layout has no airlock".to_string());
            return (false, errors);
        }

        // Multi-source BFS from all airlocks.
        let mut reached: HashSet<u32> = HashSet::new();
        let mut queue: VecDeque<u32> = VecDeque::new();
        for &a in &airlocks {
            if reached.insert(a) {
                queue.push_back(a);
            }
        }
        while let Some(current) = queue.pop_front() {
            if let Some(edges) = self.adj.get(&current) {
                for e in edges {
                    if e.kind == EdgeKind::Pressurized && reached.insert(e.to) {
                        queue.push_back(e.to);
                    }
                }
            }
        }

        for &id in &self.order {
            if !reached.contains(&id) {
                errors.push(format!(
                    "module {id} cannot reach any airlock through pressurized paths"
                ));
            }
        }
        (errors.is_empty(), errors)
    }

    /// Validate airlock count and dispersion. A missing airlock is an
    /// error; a single airlock (on a non-trivial layout) or clustered
    /// airlocks produce warnings only.
    pub fn validate_airlock_placement(&self, min_separation_m: f32) -> (bool, Vec<String>) {
        let airlocks = self.airlocks();
        let mut warnings = Vec::new();

        if airlocks.is_empty() {
            return (false, vec!["layout has no airlock".to_string()]);
        }
        if airlocks.len() == 1 {
            if self.order.len() > 3 {
                warnings.push(
                    "only one airlock: single point of failure for emergency egress".to_string(),
                );
            }
            return (true, warnings);
        }
        for (i, &a) in airlocks.iter().enumerate() {
            for &b in airlocks.iter().skip(i + 1) {
                let (Some(pa), Some(pb)) = (self.positions.get(&a), self.positions.get(&b)) else {
                    continue;
                };
                let d = pa.distance(pb);
                if d < min_separation_m {
                    warnings.push(format!(
                        "airlocks {a} and {b} are clustered ({d:.1} m apart, minimum {min_separation_m:.1} m)"
                    ));
                }
            }
        }
        (true, warnings)
    }

    /// Full connectivity analysis bundle.
    pub fn analyze(&self) -> ConnectivityMetrics {
        let components = self.connected_components();
        let airlock_accessibility = self
            .order
            .iter()
            .map(|&id| (id, self.egress_time_s(id).is_finite()))
            .collect();
        ConnectivityMetrics {
            is_connected: components.len() <= 1,
            component_count: components.len(),
            largest_component_size: components.iter().map(Vec::len).max().unwrap_or(0),
            airlock_accessibility,
        }
    }
}
