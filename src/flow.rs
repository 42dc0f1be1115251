use std::cmp::min;
use std::fmt::Write;

use crate::base::{dirs, sample, Matrix, Point, LOS, RNG};
use crate::danger::{fear_threshold, Ctx};
use crate::goals::Goal;
use crate::map::{Feature, MAP_SIZE};
use crate::state::BorgState;

//////////////////////////////////////////////////////////////////////////////

// Constants

// Cost sentinel: unreachable. Seeds get 0; every reachable grid is cheaper
// than this.
pub const FLOW_MAX: u8 = 255;

const QUEUE_SIZE: usize = 2048;

// Minimum disarm skill before we route over or disarm a visible trap.
pub(crate) const TRAP_SKILL: i32 = 25;

// HP percentage below which unexplored grids are off the route.
const PANIC_HP: i32 = 25;

//////////////////////////////////////////////////////////////////////////////

// FlowQueue

#[derive(Debug, Eq, PartialEq)]
pub struct QueueFull;

// Fixed-capacity FIFO ring. A full queue refuses the newest insert and
// leaves every prior entry intact; the flood degrades to a smaller frontier
// rather than corrupting costs.
pub struct FlowQueue {
    data: Vec<Point>,
    head: usize,
    len: usize,
}

impl FlowQueue {
    fn new() -> Self {
        Self { data: vec![Point::default(); QUEUE_SIZE], head: 0, len: 0 }
    }

    pub fn push(&mut self, point: Point) -> Result<(), QueueFull> {
        if self.len == self.data.len() { return Err(QueueFull); }
        let tail = (self.head + self.len) % self.data.len();
        self.data[tail] = point;
        self.len += 1;
        Ok(())
    }

    pub fn pop(&mut self) -> Option<Point> {
        if self.len == 0 { return None; }
        let result = self.data[self.head];
        self.head = (self.head + 1) % self.data.len();
        self.len -= 1;
        Some(result)
    }

    pub fn clear(&mut self) { self.head = 0; self.len = 0; }

    pub fn len(&self) -> usize { self.len }

    pub fn is_empty(&self) -> bool { self.len == 0 }
}

//////////////////////////////////////////////////////////////////////////////

// FlowData

// The cost field plus the per-generation danger cache. known marks grids
// whose danger has been evaluated this generation; icky marks the ones that
// failed the fear gate and must never be revisited within it.
#[derive(Clone)]
pub struct FlowData {
    pub cost: Matrix<u8>,
    pub known: Matrix<bool>,
    pub icky: Matrix<bool>,
}

impl FlowData {
    fn new() -> Self {
        Self {
            cost: Matrix::new(MAP_SIZE, FLOW_MAX),
            known: Matrix::new(MAP_SIZE, false),
            icky: Matrix::new(MAP_SIZE, false),
        }
    }
}

//////////////////////////////////////////////////////////////////////////////

// Spread arguments

pub struct SpreadArgs {
    // Maximum cost radius of the flood.
    pub depth: i32,
    // Stop as soon as the agent's own grid is costed.
    pub optimize: bool,
    // Refuse to route through unexplored grids.
    pub avoid_unknown: bool,
    // Route through diggable veins and rubble.
    pub tunneling: bool,
    // Refuse grids adjacent to any tracked monster.
    pub sneak: bool,
    // Goal-specific cost cap; 0 means no extra cap beyond depth.
    pub leash: i32,
}

impl Default for SpreadArgs {
    fn default() -> Self {
        Self {
            depth: FLOW_MAX as i32 - 1,
            optimize: false,
            avoid_unknown: false,
            tunneling: false,
            sneak: false,
            leash: 0,
        }
    }
}

//////////////////////////////////////////////////////////////////////////////

// Flow

// The flood-fill pathfinding engine. Call order per generation is
// clear -> enqueue (seeds) -> spread -> commit; next_step then reads the
// committed field until the goal is reset. A commit whose own-grid cost is
// still the sentinel fails and leaves the previous committed field intact.
pub struct Flow {
    work: FlowData,
    active: FlowData,
    queue: FlowQueue,
    pub goal: Goal,
    pub dropped: i32,
}

impl Default for Flow {
    fn default() -> Self { Self::new() }
}

impl Flow {
    pub fn new() -> Self {
        Self {
            work: FlowData::new(),
            active: FlowData::new(),
            queue: FlowQueue::new(),
            goal: Goal::None,
            dropped: 0,
        }
    }

    pub fn active(&self) -> &FlowData { &self.active }

    pub fn reset_goal(&mut self) { self.goal = Goal::None; }

    // Starts a new working generation. Danger verdicts are usually carried
    // across generations within a turn; wipe_danger discards them when the
    // world has changed under us. Idempotent.
    pub fn clear(&mut self, wipe_danger: bool) {
        self.work.cost.fill(FLOW_MAX);
        self.queue.clear();
        self.dropped = 0;
        if wipe_danger {
            self.work.known.fill(false);
            self.work.icky.fill(false);
        }
    }

    // Seeds the flood at pos with cost zero. Seeds pass through the same
    // fear gate as spread steps.
    pub fn enqueue(&mut self, ctx: &Ctx, pos: Point) {
        if !self.work.cost.contains(pos) { return; }
        if self.work.cost.get(pos) == 0 { return; }
        let fear = fear_threshold(ctx.state);
        if self.too_scary(ctx, pos, fear) { return; }
        self.work.cost.set(pos, 0);
        if self.queue.push(pos).is_err() { self.dropped += 1; }
    }

    // Runs the 8-directional flood out from the seed set. Each grid's
    // danger is evaluated at most once per generation.
    pub fn spread(&mut self, ctx: &Ctx, args: &SpreadArgs) {
        let fear = fear_threshold(ctx.state);
        let player = ctx.state.player.pos;
        let depth = min(args.depth, FLOW_MAX as i32 - 1);
        let cap = if args.leash > 0 { min(args.leash, depth) } else { depth };

        while let Some(point) = self.queue.pop() {
            let cost = self.work.cost.get(point) as i32;
            if cost >= cap { continue; }

            for &dir in &dirs::ALL {
                let next = point + dir;
                if !self.work.cost.contains(next) { continue; }
                if (self.work.cost.get(next) as i32) <= cost + 1 { continue; }
                if !self.traversable(ctx, next, args) { continue; }
                if self.too_scary(ctx, next, fear) { continue; }

                self.work.cost.set(next, (cost + 1) as u8);
                if args.optimize && next == player {
                    self.queue.clear();
                    return;
                }
                if self.queue.push(next).is_err() { self.dropped += 1; }
            }
        }
    }

    // Publishes the working field under the given goal tag. Fails when the
    // flood never reached us.
    pub fn commit(&mut self, ctx: &Ctx, goal: Goal) -> bool {
        if self.work.cost.get(ctx.state.player.pos) >= FLOW_MAX { return false; }
        self.active = self.work.clone();
        self.goal = goal;
        true
    }

    // The next one-grid step along the committed field: any neighbor with a
    // strictly lower cost, preferring non-diagonals, breaking remaining ties
    // with a random jitter in the dungeon. prev is last turn's step, used to
    // avoid digging anti-summon corridors in a straight line.
    pub fn next_step(&self, ctx: &Ctx, rng: &mut RNG,
                     prev: Option<Point>) -> Option<Point> {
        let pos = ctx.state.player.pos;
        let own = self.active.cost.get(pos);
        if own == 0 || own >= FLOW_MAX { return None; }

        let mut best: Vec<Point> = vec![];
        let mut best_cost = own;
        for &dir in dirs::CARDINAL.iter().chain(dirs::DIAGONAL.iter()) {
            let cost = self.active.cost.get(pos + dir);
            if cost < best_cost {
                best_cost = cost;
                best.clear();
                best.push(dir);
            } else if cost == best_cost && !best.is_empty()
                    && dir.is_diagonal() == best[0].is_diagonal() {
                best.push(dir);
            }
        }
        if best.is_empty() { return None; }

        if self.goal == Goal::AntiSummon && best.len() > 1 {
            if let Some(prev) = prev {
                best.retain(|&dir| dir != prev);
            }
        }
        if best.len() > 1 && ctx.state.depth() > 0 {
            return Some(*sample(&best, rng));
        }
        Some(best[0])
    }

    pub fn debug(&self, state: &BorgState, out: &mut String) {
        let own = self.active.cost.get(state.player.pos);
        let _ = writeln!(out, "  flow: {:?}; own cost: {}; dropped: {}",
                         self.goal, own, self.dropped);
    }

    fn too_scary(&mut self, ctx: &Ctx, pos: Point, fear: i32) -> bool {
        if !self.work.known.get(pos) {
            self.work.known.set(pos, true);
            let danger = ctx.danger(pos, 1, true, false);
            self.work.icky.set(pos, danger > fear);
        }
        self.work.icky.get(pos)
    }

    fn traversable(&self, ctx: &Ctx, pos: Point, args: &SpreadArgs) -> bool {
        let state = ctx.state;
        if pos == state.player.pos { return true; }

        let grid = state.map.grid(pos);
        if grid.monster.is_some() { return false; }
        if args.sneak {
            let adjacent = dirs::ALL.iter().any(
                |&dir| state.map.grid(pos + dir).monster.is_some());
            if adjacent { return false; }
        }

        match grid.feature {
            Feature::Unknown => {
                let panic = 100 * state.player.hp
                    < PANIC_HP * state.player.max_hp;
                state.twitchy || (!args.avoid_unknown && !panic)
            }
            Feature::ClosedDoor | Feature::StuckDoor => true,
            Feature::Rubble => args.tunneling,
            Feature::Trap => {
                state.twitchy || (!state.player.blind
                    && state.player.disarm_skill >= TRAP_SKILL)
            }
            Feature::Shop(index) => state.shop_goal == Some(index),
            feature if feature.is_wall() => {
                args.tunneling && feature.is_tunnelable()
            }
            _ => true,
        }
    }
}

//////////////////////////////////////////////////////////////////////////////

// Direct movement

// A one-step move straight toward a nearby target, for hops too short to
// justify a flood. Candidates are tried in order: the non-diagonal
// components of the heading, the diagonal, the two rotational senses
// around a blocking pillar, then the exact line as a last resort. Applies
// the same fear gate as the flood does.
pub fn goto_dir(ctx: &Ctx, target: Point) -> Option<Point> {
    let pos = ctx.state.player.pos;
    if pos == target { return None; }

    let delta = target - pos;
    let sign = delta.signum();
    let straight = *LOS(pos, target).get(1)? - pos;

    let mut candidates = Vec::with_capacity(6);
    if delta.0.abs() >= delta.1.abs() {
        candidates.push(Point(sign.0, 0));
        candidates.push(Point(0, sign.1));
    } else {
        candidates.push(Point(0, sign.1));
        candidates.push(Point(sign.0, 0));
    }
    candidates.push(sign);
    candidates.push(rotate(straight, 1));
    candidates.push(rotate(straight, -1));
    candidates.push(straight);

    let fear = fear_threshold(ctx.state);
    for dir in candidates {
        if dir == dirs::NONE { continue; }
        let next = pos + dir;
        // Never step away from the target to round an obstacle; a hop that
        // long is the flood's job.
        if (target - next).len_range() > delta.len_range() { continue; }
        let grid = ctx.state.map.grid(next);
        if !grid.feature.is_passable() || grid.monster.is_some() { continue; }
        if ctx.danger(next, 1, true, false) > fear { continue; }
        return Some(dir);
    }
    None
}

// The next direction over, clockwise for positive steps.
fn rotate(dir: Point, steps: i32) -> Point {
    const RING: [Point; 8] = [
        dirs::N, dirs::NE, dirs::E, dirs::SE,
        dirs::S, dirs::SW, dirs::W, dirs::NW,
    ];
    let Some(index) = RING.iter().position(|&d| d == dir) else { return dir; };
    RING[(index as i32 + steps).rem_euclid(8) as usize]
}

//////////////////////////////////////////////////////////////////////////////
