//! Simulation core for the neuroweave signal-propagation animation.
//!
//! A fixed population of drifting particles ("nodes") is connected once, at
//! startup, by proximity edges. Firing a node arms its incident edges and
//! schedules delayed fires of the opposite endpoints, producing cascades that
//! ripple across the graph while every armed element fades back toward its
//! base appearance. The core owns only data: positions, firing state, and the
//! contiguous attribute buffers a rendering backend uploads. It never touches
//! a GPU, a window, or a wall clock — hosts feed it time and consume buffers.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;

use ordered_float::OrderedFloat;
use rand::{Rng, RngCore, SeedableRng, rngs::SmallRng};
use serde::{Deserialize, Serialize};
use slotmap::{SlotMap, new_key_type};
use smallvec::SmallVec;
use thiserror::Error;
use tracing::{debug, info};

fn clamp01(value: f32) -> f32 {
    value.clamp(0.0, 1.0)
}

fn lerp(from: f32, to: f32, t: f32) -> f32 {
    from + (to - from) * t
}

fn lerp_rgb(from: [f32; 3], to: [f32; 3], t: f32) -> [f32; 3] {
    [
        lerp(from[0], to[0], t),
        lerp(from[1], to[1], t),
        lerp(from[2], to[2], t),
    ]
}

/// Errors emitted while assembling a [`PulseWorld`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Indicates configuration values that cannot be used (e.g., a
    /// non-positive fade duration).
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
}

/// Minimal owned 3D vector used for particle positions and velocities.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance to `other`.
    #[must_use]
    pub fn distance(self, other: Self) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    #[must_use]
    pub const fn to_array(self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }
}

impl std::ops::AddAssign for Vec3 {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
        self.z += rhs.z;
    }
}

/// Stable dense index of a node. Nodes are created once at startup and live
/// until teardown, so a plain `u32` is sufficient identity.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct NodeId(pub u32);

impl NodeId {
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Stable dense index of an edge in graph-construction order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct EdgeId(pub u32);

impl EdgeId {
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Tunable parameters for the pulse animation.
///
/// All values are fixed for the lifetime of a world; durations are seconds on
/// the host-supplied clock.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PulseConfig {
    /// Number of particles spawned at startup.
    pub node_count: usize,
    /// Side length of the spawn cube, centered on the origin.
    pub volume_size: f32,
    /// Per-axis bound on the random initial velocity (world units per tick).
    pub max_speed: f32,
    /// Two nodes closer than this at construction time are connected.
    pub connection_threshold: f32,
    /// Preallocated edge capacity; pairs found after it fills are skipped.
    pub max_edges: usize,
    /// Resting node color (linear RGB).
    pub node_base_color: [f32; 3],
    /// Peak node color written the instant a node fires.
    pub node_fire_color: [f32; 3],
    /// Resting point size.
    pub node_base_size: f32,
    /// Peak point size written the instant a node fires.
    pub node_fire_size: f32,
    /// Resting edge color (linear RGB).
    pub edge_base_color: [f32; 3],
    /// Peak edge color written the instant an edge arms.
    pub edge_fire_color: [f32; 3],
    /// Seconds a fired node takes to fade back to its base appearance.
    pub node_fade: f32,
    /// Seconds an armed edge takes to fade back to its base appearance.
    pub edge_fade: f32,
    /// Seconds between an edge arming and its far endpoint firing. Constant
    /// per hop regardless of edge length.
    pub propagation_delay: f32,
    /// Seconds between ambient random fires that keep the scene alive.
    pub ambient_interval: f32,
    /// Number of distinct seed nodes burst-fired at startup.
    pub seed_clusters: usize,
    /// Every node within this distance of a seed joins its startup burst.
    pub seed_radius: f32,
    /// Optional RNG seed for reproducible scenes.
    pub rng_seed: Option<u64>,
}

impl Default for PulseConfig {
    fn default() -> Self {
        Self {
            node_count: 120,
            volume_size: 40.0,
            max_speed: 0.02,
            connection_threshold: 7.5,
            max_edges: 600,
            node_base_color: [0.22, 0.45, 0.95],
            node_fire_color: [0.65, 0.88, 1.0],
            node_base_size: 0.35,
            node_fire_size: 1.1,
            edge_base_color: [0.10, 0.22, 0.55],
            edge_fire_color: [0.55, 0.80, 1.0],
            node_fade: 1.2,
            edge_fade: 0.9,
            propagation_delay: 0.18,
            ambient_interval: 0.8,
            seed_clusters: 3,
            seed_radius: 8.0,
            rng_seed: None,
        }
    }
}

impl PulseConfig {
    /// Validates the configuration before a world is assembled.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.node_count == 0 {
            return Err(ConfigError::InvalidConfig("node_count must be non-zero"));
        }
        if self.volume_size <= 0.0 {
            return Err(ConfigError::InvalidConfig("volume_size must be positive"));
        }
        if self.max_speed <= 0.0 {
            return Err(ConfigError::InvalidConfig("max_speed must be positive"));
        }
        if self.connection_threshold <= 0.0 {
            return Err(ConfigError::InvalidConfig(
                "connection_threshold must be positive",
            ));
        }
        if self.max_edges == 0 {
            return Err(ConfigError::InvalidConfig("max_edges must be non-zero"));
        }
        if self.node_base_size <= 0.0 || self.node_fire_size <= 0.0 {
            return Err(ConfigError::InvalidConfig("node sizes must be positive"));
        }
        if self.node_fade <= 0.0 || self.edge_fade <= 0.0 {
            return Err(ConfigError::InvalidConfig(
                "fade durations must be positive",
            ));
        }
        if self.propagation_delay <= 0.0 {
            return Err(ConfigError::InvalidConfig(
                "propagation_delay must be positive",
            ));
        }
        if self.ambient_interval <= 0.0 {
            return Err(ConfigError::InvalidConfig(
                "ambient_interval must be positive",
            ));
        }
        if self.seed_radius < 0.0 {
            return Err(ConfigError::InvalidConfig(
                "seed_radius must be non-negative",
            ));
        }
        Ok(())
    }

    /// Returns the configured RNG, seeding from entropy if no seed is set.
    fn seeded_rng(&self) -> SmallRng {
        match self.rng_seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => {
                let seed: u64 = rand::random();
                SmallRng::seed_from_u64(seed)
            }
        }
    }
}

/// Particle positions and velocities as structure-of-arrays columns.
///
/// The field allocates once at construction; [`ParticleField::tick`] is pure
/// mutation of the existing columns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticleField {
    half_extent: f32,
    positions: Vec<Vec3>,
    velocities: Vec<Vec3>,
}

impl ParticleField {
    /// Place `count` particles uniformly inside a cube of side `volume_size`
    /// centered on the origin, with per-axis velocities in `±max_speed`.
    #[must_use]
    pub fn new(count: usize, volume_size: f32, max_speed: f32, rng: &mut dyn RngCore) -> Self {
        let half = volume_size * 0.5;
        let mut positions = Vec::with_capacity(count);
        let mut velocities = Vec::with_capacity(count);
        for _ in 0..count {
            positions.push(Vec3::new(
                rng.random_range(-half..half),
                rng.random_range(-half..half),
                rng.random_range(-half..half),
            ));
            velocities.push(Vec3::new(
                rng.random_range(-max_speed..max_speed),
                rng.random_range(-max_speed..max_speed),
                rng.random_range(-max_speed..max_speed),
            ));
        }
        Self {
            half_extent: half,
            positions,
            velocities,
        }
    }

    /// Build a field from explicit columns; used by hosts and tests that lay
    /// nodes out deliberately.
    #[must_use]
    pub fn from_parts(positions: Vec<Vec3>, velocities: Vec<Vec3>, volume_size: f32) -> Self {
        debug_assert_eq!(positions.len(), velocities.len());
        Self {
            half_extent: volume_size * 0.5,
            positions,
            velocities,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    #[must_use]
    pub const fn half_extent(&self) -> f32 {
        self.half_extent
    }

    #[must_use]
    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    #[must_use]
    pub fn velocities(&self) -> &[Vec3] {
        &self.velocities
    }

    /// Integrate one step and reflect off the volume walls.
    ///
    /// Each axis is handled independently: when a coordinate would pass the
    /// half-extent it is pinned to the wall and its velocity component
    /// negated, so positions never leave `[-half, +half]`.
    pub fn tick(&mut self) {
        let half = self.half_extent;
        for (position, velocity) in self.positions.iter_mut().zip(self.velocities.iter_mut()) {
            *position += *velocity;
            if position.x > half {
                position.x = half;
                velocity.x = -velocity.x;
            } else if position.x < -half {
                position.x = -half;
                velocity.x = -velocity.x;
            }
            if position.y > half {
                position.y = half;
                velocity.y = -velocity.y;
            } else if position.y < -half {
                position.y = -half;
                velocity.y = -velocity.y;
            }
            if position.z > half {
                position.z = half;
                velocity.z = -velocity.z;
            } else if position.z < -half {
                position.z = -half;
                velocity.z = -velocity.z;
            }
        }
    }
}

/// Unordered endpoint pair of a proximity edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub a: NodeId,
    pub b: NodeId,
}

/// Undirected proximity graph, built exactly once from construction-time
/// particle positions. Edges do not track node motion afterwards.
#[derive(Debug, Clone)]
pub struct ConnectivityGraph {
    edges: Vec<Edge>,
    incident: Vec<SmallVec<[EdgeId; 8]>>,
}

impl ConnectivityGraph {
    /// Scan all unordered pairs in `(i, j > i)` order and connect the ones
    /// strictly closer than `threshold`, up to `max_edges`. Once capacity is
    /// reached remaining pairs are silently skipped; that truncation is
    /// policy, not an error.
    #[must_use]
    pub fn build(field: &ParticleField, threshold: f32, max_edges: usize) -> Self {
        let positions = field.positions();
        let mut edges = Vec::with_capacity(max_edges.min(1024));
        let mut incident = vec![SmallVec::new(); positions.len()];

        'scan: for i in 0..positions.len() {
            for j in (i + 1)..positions.len() {
                if positions[i].distance(positions[j]) >= threshold {
                    continue;
                }
                if edges.len() == max_edges {
                    debug!(
                        max_edges,
                        "edge capacity reached; remaining close pairs left unconnected"
                    );
                    break 'scan;
                }
                let id = EdgeId(edges.len() as u32);
                edges.push(Edge {
                    a: NodeId(i as u32),
                    b: NodeId(j as u32),
                });
                incident[i].push(id);
                incident[j].push(id);
            }
        }

        Self { edges, incident }
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    #[must_use]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Edges touching `node`, in discovery order.
    #[must_use]
    pub fn incident(&self, node: NodeId) -> &[EdgeId] {
        &self.incident[node.index()]
    }

    #[must_use]
    pub fn endpoints(&self, edge: EdgeId) -> Edge {
        self.edges[edge.index()]
    }

    /// The endpoint of `edge` that is not `origin`.
    #[must_use]
    pub fn opposite(&self, edge: EdgeId, origin: NodeId) -> NodeId {
        let Edge { a, b } = self.edges[edge.index()];
        if a == origin { b } else { a }
    }
}

/// Firing flags and start timestamps for one class of scene element.
///
/// "Firing" is a decay window, not a held state: an element counts as firing
/// from its start timestamp until one fade duration has elapsed, at which
/// point the per-frame sync settles it back to idle.
#[derive(Debug, Clone, Default)]
pub struct ActivityTrack {
    firing: Vec<bool>,
    started: Vec<f32>,
}

impl ActivityTrack {
    fn with_len(len: usize) -> Self {
        Self {
            firing: vec![false; len],
            started: vec![0.0; len],
        }
    }

    /// Arm (or re-arm) an element. Re-arming mid-fade just restarts the
    /// decay clock; there is no queueing or reference counting.
    fn arm(&mut self, index: usize, now: f32) {
        self.firing[index] = true;
        self.started[index] = now;
    }

    fn settle(&mut self, index: usize) {
        self.firing[index] = false;
    }

    #[must_use]
    pub fn is_firing(&self, index: usize) -> bool {
        self.firing[index]
    }

    #[must_use]
    pub fn started(&self, index: usize) -> f32 {
        self.started[index]
    }

    #[must_use]
    pub fn firing_count(&self) -> usize {
        self.firing.iter().filter(|flag| **flag).count()
    }
}

/// Per-attribute dirty markers; a backend re-uploads exactly the buffers
/// flagged here and nothing else.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirtyFlags {
    pub node_positions: bool,
    pub node_colors: bool,
    pub node_sizes: bool,
    pub edge_positions: bool,
    pub edge_colors: bool,
}

/// Contiguous attribute arrays consumed by the rendering backend.
///
/// Node positions are re-synced every frame because particles move; edge
/// endpoint geometry is written once at construction and never again.
/// Edge colors carry two entries per edge (one per line vertex), kept equal
/// so an edge fades as a unit.
#[derive(Debug, Clone, Default)]
pub struct SceneBuffers {
    node_positions: Vec<[f32; 3]>,
    node_colors: Vec<[f32; 3]>,
    node_sizes: Vec<f32>,
    edge_positions: Vec<[f32; 3]>,
    edge_colors: Vec<[f32; 3]>,
    dirty: DirtyFlags,
}

impl SceneBuffers {
    fn for_scene(field: &ParticleField, graph: &ConnectivityGraph, config: &PulseConfig) -> Self {
        let node_count = field.len();
        let node_positions = field.positions().iter().map(|p| p.to_array()).collect();

        let mut edge_positions = Vec::with_capacity(graph.edge_count() * 2);
        for edge in graph.edges() {
            edge_positions.push(field.positions()[edge.a.index()].to_array());
            edge_positions.push(field.positions()[edge.b.index()].to_array());
        }

        Self {
            node_positions,
            node_colors: vec![config.node_base_color; node_count],
            node_sizes: vec![config.node_base_size; node_count],
            edge_positions,
            edge_colors: vec![config.edge_base_color; graph.edge_count() * 2],
            // everything needs a first upload
            dirty: DirtyFlags {
                node_positions: true,
                node_colors: true,
                node_sizes: true,
                edge_positions: true,
                edge_colors: true,
            },
        }
    }

    #[must_use]
    pub fn node_positions(&self) -> &[[f32; 3]] {
        &self.node_positions
    }

    #[must_use]
    pub fn node_colors(&self) -> &[[f32; 3]] {
        &self.node_colors
    }

    #[must_use]
    pub fn node_sizes(&self) -> &[f32] {
        &self.node_sizes
    }

    /// Two vertices per edge, in edge-discovery order.
    #[must_use]
    pub fn edge_positions(&self) -> &[[f32; 3]] {
        &self.edge_positions
    }

    /// Two entries per edge, matching [`SceneBuffers::edge_positions`].
    #[must_use]
    pub fn edge_colors(&self) -> &[[f32; 3]] {
        &self.edge_colors
    }

    #[must_use]
    pub const fn dirty(&self) -> DirtyFlags {
        self.dirty
    }

    /// Return the dirty markers and clear them; called once per upload.
    pub fn take_dirty(&mut self) -> DirtyFlags {
        std::mem::take(&mut self.dirty)
    }

    fn set_node_color(&mut self, index: usize, color: [f32; 3]) {
        self.node_colors[index] = color;
        self.dirty.node_colors = true;
    }

    fn set_node_size(&mut self, index: usize, size: f32) {
        self.node_sizes[index] = size;
        self.dirty.node_sizes = true;
    }

    fn set_edge_color(&mut self, index: usize, color: [f32; 3]) {
        self.edge_colors[index * 2] = color;
        self.edge_colors[index * 2 + 1] = color;
        self.dirty.edge_colors = true;
    }

    fn sync_node_positions(&mut self, field: &ParticleField) {
        for (slot, position) in self.node_positions.iter_mut().zip(field.positions()) {
            *slot = position.to_array();
        }
        self.dirty.node_positions = true;
    }
}

new_key_type! {
    /// Cancellable handle for one scheduled propagation fire.
    pub struct FireTaskId;
}

/// A propagation callback waiting to run: fire `target` once the clock
/// reaches `due`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingFire {
    pub due: f32,
    pub target: NodeId,
}

/// Heap entry ordering pending fires by due time, earliest first, with a
/// sequence number breaking ties in schedule order.
#[derive(Debug, Clone, Copy)]
struct QueuedFire {
    due: OrderedFloat<f32>,
    seq: u64,
    task: FireTaskId,
}

impl PartialEq for QueuedFire {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for QueuedFire {}

impl Ord for QueuedFire {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap: earlier due times first.
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for QueuedFire {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Owner of every deferred callback in the system: the one-shot propagation
/// fires and the ambient repeating-fire deadline.
///
/// Cancellation removes the slotmap entry; the heap may retain a stale
/// record which is discarded when popped. [`PulseScheduler::cancel_all`] is
/// total, which is what makes teardown safe.
#[derive(Debug)]
pub struct PulseScheduler {
    pending: SlotMap<FireTaskId, PendingFire>,
    queue: BinaryHeap<QueuedFire>,
    next_seq: u64,
    ambient_interval: f32,
    ambient_due: f32,
}

impl PulseScheduler {
    #[must_use]
    pub fn new(ambient_interval: f32) -> Self {
        Self {
            pending: SlotMap::with_key(),
            queue: BinaryHeap::new(),
            next_seq: 0,
            ambient_interval,
            ambient_due: ambient_interval,
        }
    }

    /// Register a one-shot fire of `target` at clock time `due`.
    pub fn schedule_fire(&mut self, due: f32, target: NodeId) -> FireTaskId {
        let task = self.pending.insert(PendingFire { due, target });
        self.queue.push(QueuedFire {
            due: OrderedFloat(due),
            seq: self.next_seq,
            task,
        });
        self.next_seq += 1;
        task
    }

    /// Cancel one pending fire. Returns whether it was still outstanding.
    pub fn cancel(&mut self, task: FireTaskId) -> bool {
        self.pending.remove(task).is_some()
    }

    /// Cancel every outstanding fire. No callback survives this.
    pub fn cancel_all(&mut self) {
        self.pending.clear();
        self.queue.clear();
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Pop the earliest fire that is due at `now`, skipping records whose
    /// task was cancelled after being queued.
    pub fn pop_due(&mut self, now: f32) -> Option<PendingFire> {
        while let Some(top) = self.queue.peek() {
            if top.due.0 > now {
                return None;
            }
            let entry = self.queue.pop()?;
            if let Some(fire) = self.pending.remove(entry.task) {
                return Some(fire);
            }
            // stale: cancelled while queued
        }
        None
    }

    /// Whether the ambient repeating timer has elapsed; advancing the
    /// deadline on success so each fire schedules the next.
    pub fn ambient_ready(&mut self, now: f32) -> bool {
        if self.ambient_interval <= 0.0 || now < self.ambient_due {
            return false;
        }
        self.ambient_due = now + self.ambient_interval;
        true
    }
}

/// Snapshot of per-frame liveness counters, for host logging.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FrameSummary {
    pub clock: f32,
    pub nodes_firing: usize,
    pub edges_firing: usize,
    pub pending_fires: usize,
}

/// Aggregate simulation state: the explicit owner of every mutable buffer.
///
/// All mutation flows through `&mut self` methods on a single logical
/// thread; the frame update and the scheduler callbacks interleave but never
/// overlap, so no locking is needed.
pub struct PulseWorld {
    config: PulseConfig,
    clock: f32,
    disposed: bool,
    rng: SmallRng,
    field: ParticleField,
    graph: ConnectivityGraph,
    node_activity: ActivityTrack,
    edge_activity: ActivityTrack,
    buffers: SceneBuffers,
    scheduler: PulseScheduler,
}

impl fmt::Debug for PulseWorld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PulseWorld")
            .field("config", &self.config)
            .field("clock", &self.clock)
            .field("disposed", &self.disposed)
            .field("node_count", &self.field.len())
            .field("edge_count", &self.graph.edge_count())
            .finish()
    }
}

impl PulseWorld {
    /// Build a world with random particle placement and ignite the startup
    /// seed clusters at clock zero.
    pub fn new(config: PulseConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut rng = config.seeded_rng();
        let field = ParticleField::new(
            config.node_count,
            config.volume_size,
            config.max_speed,
            &mut rng,
        );
        let mut world = Self::assemble(config, rng, field);
        world.ignite_seed_clusters(0.0);
        Ok(world)
    }

    /// Build a world over a caller-supplied field. No seed ignition happens;
    /// the host decides what fires first.
    pub fn from_field(config: PulseConfig, field: ParticleField) -> Result<Self, ConfigError> {
        config.validate()?;
        if field.len() != config.node_count {
            return Err(ConfigError::InvalidConfig(
                "node_count must match the supplied particle field",
            ));
        }
        let rng = config.seeded_rng();
        Ok(Self::assemble(config, rng, field))
    }

    fn assemble(config: PulseConfig, rng: SmallRng, field: ParticleField) -> Self {
        let graph = ConnectivityGraph::build(&field, config.connection_threshold, config.max_edges);
        let buffers = SceneBuffers::for_scene(&field, &graph, &config);
        info!(
            nodes = field.len(),
            edges = graph.edge_count(),
            "assembled pulse world"
        );
        Self {
            node_activity: ActivityTrack::with_len(field.len()),
            edge_activity: ActivityTrack::with_len(graph.edge_count()),
            scheduler: PulseScheduler::new(config.ambient_interval),
            clock: 0.0,
            disposed: false,
            rng,
            field,
            graph,
            buffers,
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &PulseConfig {
        &self.config
    }

    #[must_use]
    pub const fn clock(&self) -> f32 {
        self.clock
    }

    #[must_use]
    pub const fn is_disposed(&self) -> bool {
        self.disposed
    }

    #[must_use]
    pub fn field(&self) -> &ParticleField {
        &self.field
    }

    #[must_use]
    pub fn graph(&self) -> &ConnectivityGraph {
        &self.graph
    }

    #[must_use]
    pub fn buffers(&self) -> &SceneBuffers {
        &self.buffers
    }

    #[must_use]
    pub fn buffers_mut(&mut self) -> &mut SceneBuffers {
        &mut self.buffers
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.field.len()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    #[must_use]
    pub fn node_firing(&self, node: NodeId) -> bool {
        self.node_activity.is_firing(node.index())
    }

    #[must_use]
    pub fn edge_firing(&self, edge: EdgeId) -> bool {
        self.edge_activity.is_firing(edge.index())
    }

    #[must_use]
    pub fn pending_fires(&self) -> usize {
        self.scheduler.pending_count()
    }

    #[must_use]
    pub fn summary(&self) -> FrameSummary {
        FrameSummary {
            clock: self.clock,
            nodes_firing: self.node_activity.firing_count(),
            edges_firing: self.edge_activity.firing_count(),
            pending_fires: self.scheduler.pending_count(),
        }
    }

    /// Pick distinct random seed nodes and burst-fire every node within the
    /// configured radius of each, so the scene opens mid-cascade instead of
    /// at rest.
    pub fn ignite_seed_clusters(&mut self, now: f32) {
        if self.disposed || self.field.is_empty() || self.config.seed_clusters == 0 {
            return;
        }
        let count = self.config.seed_clusters.min(self.field.len());
        let seeds = rand::seq::index::sample(&mut self.rng, self.field.len(), count);
        let mut burst: Vec<NodeId> = Vec::new();
        for seed in seeds {
            let center = self.field.positions()[seed];
            for (index, position) in self.field.positions().iter().enumerate() {
                if center.distance(*position) <= self.config.seed_radius {
                    burst.push(NodeId(index as u32));
                }
            }
        }
        debug!(clusters = count, nodes = burst.len(), "seed burst ignition");
        for node in burst {
            self.fire_node(node, now);
        }
    }

    /// Unconditionally (re)arm `node`: restart its decay clock, write its
    /// peak attributes immediately, and arm every incident edge, scheduling
    /// a delayed fire of each far endpoint.
    ///
    /// Re-firing a node mid-fade just restarts its timer, which keeps
    /// cascades over cyclic graphs safe without any visited-set bookkeeping.
    pub fn fire_node(&mut self, node: NodeId, now: f32) {
        if self.disposed || node.index() >= self.field.len() {
            return;
        }
        self.node_activity.arm(node.index(), now);
        self.buffers
            .set_node_color(node.index(), self.config.node_fire_color);
        self.buffers
            .set_node_size(node.index(), self.config.node_fire_size);

        let incident: SmallVec<[EdgeId; 8]> = SmallVec::from_slice(self.graph.incident(node));
        for edge in incident {
            self.propagate_edge(edge, node, now);
        }
    }

    /// Arm `edge` and schedule the fire of its far endpoint one propagation
    /// delay from `now`.
    fn propagate_edge(&mut self, edge: EdgeId, origin: NodeId, now: f32) {
        let target = self.graph.opposite(edge, origin);
        self.edge_activity.arm(edge.index(), now);
        self.buffers
            .set_edge_color(edge.index(), self.config.edge_fire_color);
        self.scheduler
            .schedule_fire(now + self.config.propagation_delay, target);
    }

    /// Advance the world to clock time `now` (seconds, monotonically
    /// non-decreasing between calls): integrate motion, run due propagation
    /// fires and the ambient timer, then recompute every fading attribute.
    pub fn advance(&mut self, now: f32) {
        if self.disposed {
            return;
        }
        self.clock = now;
        self.stage_motion();
        self.stage_scheduled_fires(now);
        self.stage_ambient(now);
        self.stage_decay(now);
    }

    fn stage_motion(&mut self) {
        self.field.tick();
        self.buffers.sync_node_positions(&self.field);
    }

    fn stage_scheduled_fires(&mut self, now: f32) {
        // Fires triggered here schedule follow-ups strictly later than `now`
        // (propagation_delay is validated positive), so this drains.
        while let Some(fire) = self.scheduler.pop_due(now) {
            self.fire_node(fire.target, now);
        }
    }

    fn stage_ambient(&mut self, now: f32) {
        if !self.scheduler.ambient_ready(now) {
            return;
        }
        let len = self.field.len() as u32;
        let pick = NodeId(self.rng.random_range(0..len));
        debug!(node = pick.0, "ambient fire");
        self.fire_node(pick, now);
    }

    /// Lazily decay every firing node and edge toward its base appearance.
    ///
    /// The interpolated value is a pure function of (flag, start time, now),
    /// so nothing else needs to observe the idle transition: once elapsed
    /// time reaches the fade duration the attribute snaps exactly to base
    /// and the flag clears.
    fn stage_decay(&mut self, now: f32) {
        let config = &self.config;
        for index in 0..self.node_activity.firing.len() {
            if !self.node_activity.firing[index] {
                continue;
            }
            let t = (now - self.node_activity.started[index]) / config.node_fade;
            if t >= 1.0 {
                self.node_activity.settle(index);
                self.buffers.set_node_color(index, config.node_base_color);
                self.buffers.set_node_size(index, config.node_base_size);
            } else {
                let t = clamp01(t);
                self.buffers.set_node_color(
                    index,
                    lerp_rgb(config.node_fire_color, config.node_base_color, t),
                );
                self.buffers.set_node_size(
                    index,
                    lerp(config.node_fire_size, config.node_base_size, t),
                );
            }
        }
        for index in 0..self.edge_activity.firing.len() {
            if !self.edge_activity.firing[index] {
                continue;
            }
            let t = (now - self.edge_activity.started[index]) / config.edge_fade;
            if t >= 1.0 {
                self.edge_activity.settle(index);
                self.buffers.set_edge_color(index, config.edge_base_color);
            } else {
                let t = clamp01(t);
                self.buffers.set_edge_color(
                    index,
                    lerp_rgb(config.edge_fire_color, config.edge_base_color, t),
                );
            }
        }
    }

    /// Tear down: cancel every pending propagation fire and the ambient
    /// timer. Idempotent; all subsequent operations are no-ops, so no
    /// callback can touch the buffers after this returns.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        let cancelled = self.scheduler.pending_count();
        self.scheduler.cancel_all();
        info!(cancelled, "pulse world disposed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> PulseConfig {
        PulseConfig {
            node_count: 16,
            rng_seed: Some(0xBEEF),
            // keep ambient fires out of short deterministic tests
            ambient_interval: 1_000_000.0,
            ..PulseConfig::default()
        }
    }

    #[test]
    fn config_rejects_degenerate_values() {
        let mut config = test_config();
        config.node_count = 0;
        assert!(config.validate().is_err());

        let mut config = test_config();
        config.propagation_delay = 0.0;
        assert!(config.validate().is_err());

        let mut config = test_config();
        config.node_fade = -1.0;
        assert!(config.validate().is_err());

        assert!(test_config().validate().is_ok());
    }

    #[test]
    fn seeded_fields_are_reproducible() {
        let config = test_config();
        let world_a = PulseWorld::new(config.clone()).expect("world_a");
        let world_b = PulseWorld::new(config).expect("world_b");
        assert_eq!(world_a.field().positions(), world_b.field().positions());
        assert_eq!(world_a.edge_count(), world_b.edge_count());
    }

    #[test]
    fn field_reflects_at_volume_walls() {
        let mut field = ParticleField::from_parts(
            vec![Vec3::new(4.9, 0.0, 0.0)],
            vec![Vec3::new(0.3, 0.0, 0.0)],
            10.0,
        );
        field.tick();
        assert_eq!(field.positions()[0].x, 5.0);
        assert!(field.velocities()[0].x < 0.0);
    }

    #[test]
    fn graph_truncates_at_capacity_in_scan_order() {
        // four mutually-close nodes produce six candidate pairs
        let positions = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
        ];
        let field = ParticleField::from_parts(positions, vec![Vec3::ZERO; 4], 10.0);
        let graph = ConnectivityGraph::build(&field, 5.0, 3);
        assert_eq!(graph.edge_count(), 3);
        // (0,1), (0,2), (0,3) come first in (i, j > i) order
        assert_eq!(graph.edges()[0], Edge { a: NodeId(0), b: NodeId(1) });
        assert_eq!(graph.edges()[1], Edge { a: NodeId(0), b: NodeId(2) });
        assert_eq!(graph.edges()[2], Edge { a: NodeId(0), b: NodeId(3) });
    }

    #[test]
    fn scheduler_orders_fires_and_skips_cancelled() {
        let mut scheduler = PulseScheduler::new(100.0);
        let late = scheduler.schedule_fire(2.0, NodeId(2));
        scheduler.schedule_fire(1.0, NodeId(1));
        assert_eq!(scheduler.pending_count(), 2);

        assert!(scheduler.cancel(late));
        assert!(!scheduler.cancel(late));

        assert_eq!(scheduler.pop_due(0.5), None);
        let fire = scheduler.pop_due(5.0).expect("due fire");
        assert_eq!(fire.target, NodeId(1));
        // the cancelled record is discarded, not returned
        assert_eq!(scheduler.pop_due(5.0), None);
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[test]
    fn isolated_node_fires_without_propagating() {
        let field = ParticleField::from_parts(vec![Vec3::ZERO], vec![Vec3::ZERO], 10.0);
        let config = PulseConfig {
            node_count: 1,
            ..test_config()
        };
        let mut world = PulseWorld::from_field(config, field).expect("world");
        world.fire_node(NodeId(0), 0.0);
        assert!(world.node_firing(NodeId(0)));
        assert_eq!(world.pending_fires(), 0);
    }

    #[test]
    fn firing_writes_peak_attributes_and_marks_dirty() {
        let field = ParticleField::from_parts(vec![Vec3::ZERO], vec![Vec3::ZERO], 10.0);
        let config = PulseConfig {
            node_count: 1,
            ..test_config()
        };
        let mut world = PulseWorld::from_field(config, field).expect("world");
        let _ = world.buffers_mut().take_dirty();

        world.fire_node(NodeId(0), 3.0);
        assert_eq!(world.buffers().node_colors()[0], world.config().node_fire_color);
        assert_eq!(world.buffers().node_sizes()[0], world.config().node_fire_size);
        let dirty = world.buffers_mut().take_dirty();
        assert!(dirty.node_colors && dirty.node_sizes);
        assert!(!dirty.node_positions);
    }
}
