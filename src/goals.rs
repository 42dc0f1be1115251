use crate::base::{dirs, Point};
use crate::danger::Ctx;
use crate::dex::{Spell, RF_FRIENDS, RF_SUMMONER};
use crate::flow::{Flow, SpreadArgs};
use crate::map::{Feature, MAP_SIZE};
use crate::player::MAX_RANGE;
use crate::state::BorgState;

//////////////////////////////////////////////////////////////////////////////

// Constants

// Frontier grids within this range count as "near" exploration.
const NEAR_RANGE: i32 = 20;

// Minimum retreat distance for a recovery grid.
const RECOVER_RANGE: i32 = 5;

// HP fraction (percent) below which we look for a recovery grid.
const RECOVER_HP: i32 = 60;

// Minimum dig skill before mineral veins are worth the turns.
const DIG_SKILL: i32 = 40;

//////////////////////////////////////////////////////////////////////////////

// Goal

// The reason the committed flow exists. Recorded by Flow::commit and read
// back by the step executor and the per-turn invalidation checks.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Goal {
    #[default]
    None,
    Kill,
    Take,
    Dark,
    Recover,
    Dig,
    AntiSummon,
    GlyphSea,
    Shop,
    StairUp,
    StairDown,
}

//////////////////////////////////////////////////////////////////////////////

// Leash

// How far from the nearest known stair a weak character may wander.
fn leash(state: &BorgState) -> i32 {
    if state.player.level >= 25 { return 250; }
    20 + 8 * state.player.level
}

fn within_leash(state: &BorgState, pos: Point) -> bool {
    match state.map.nearest_stair(pos) {
        Some(stair) => (pos - stair).len_range() <= leash(state),
        None => true,
    }
}

//////////////////////////////////////////////////////////////////////////////

// Stair selectors

pub fn flow_stairs_down(flow: &mut Flow, ctx: &Ctx) -> bool {
    let state = ctx.state;
    if state.map.stairs_down.is_empty() { return false; }

    // Diving blind or hungry gets characters killed. Scumming for a fast
    // descent overrides the check.
    if !state.scumming && !state.in_town() {
        if state.player.light < 2 && state.player.level < 20 { return false; }
        if state.inventory.food < 2 && state.player.hungry() { return false; }
    }

    flow.clear(false);
    for &stair in &state.map.stairs_down { flow.enqueue(ctx, stair); }
    flow.spread(ctx, &SpreadArgs { optimize: true, ..Default::default() });
    flow.commit(ctx, Goal::StairDown)
}

pub fn flow_stairs_up(flow: &mut Flow, ctx: &Ctx) -> bool {
    let state = ctx.state;
    if state.map.stairs_up.is_empty() { return false; }

    flow.clear(false);
    for &stair in &state.map.stairs_up { flow.enqueue(ctx, stair); }
    // A retreat sticks to ground we have already seen.
    flow.spread(ctx, &SpreadArgs {
        optimize: true, avoid_unknown: state.fleeing, ..Default::default()
    });
    flow.commit(ctx, Goal::StairUp)
}

//////////////////////////////////////////////////////////////////////////////

// Exploration

// Flows to known passable grids on the edge of the explored region. The
// near pass finishes the current neighborhood; the far pass crosses the
// level.
pub fn flow_dark(flow: &mut Flow, ctx: &Ctx, near: bool) -> bool {
    let state = ctx.state;
    flow.clear(false);

    let mut any = false;
    for x in 0..MAP_SIZE.0 {
        for y in 0..MAP_SIZE.1 {
            let pos = Point(x, y);
            let grid = state.map.grid(pos);
            if !grid.feature.is_passable() { continue; }

            let frontier = dirs::ALL.iter().any(
                |&dir| !state.map.grid(pos + dir).known());
            if !frontier { continue; }

            let range = (pos - state.player.pos).len_range();
            if near != (range <= NEAR_RANGE) { continue; }
            if !within_leash(state, pos) { continue; }

            flow.enqueue(ctx, pos);
            any = true;
        }
    }
    if !any { return false; }

    flow.spread(ctx, &SpreadArgs { optimize: true, ..Default::default() });
    flow.commit(ctx, Goal::Dark)
}

//////////////////////////////////////////////////////////////////////////////

// Kill

pub fn flow_kill(flow: &mut Flow, ctx: &Ctx) -> bool {
    let state = ctx.state;
    if state.fleeing || state.player.afraid { return false; }

    flow.clear(false);
    let mut any = false;
    for (_, monster) in &state.monsters {
        if !monster.seen { continue; }
        if !state.map.projectable(state.player.pos, monster.pos) { continue; }

        let range = (monster.pos - state.player.pos).len_range();
        // A faster, awake monster two grids out gets to close the last
        // step itself; stepping toward it hands over a free attack.
        if range == 2 && monster.awake
                && monster.race.speed > state.player.speed {
            continue;
        }
        // Packs flank us in the open. Hold a corridor and let them queue.
        if monster.race.has(RF_FRIENDS) && range > 1
                && !state.happy_grids.contains(&state.player.pos) {
            continue;
        }

        flow.enqueue(ctx, monster.pos);
        any = true;
    }
    if !any { return false; }

    flow.spread(ctx, &SpreadArgs {
        depth: 2 * MAX_RANGE, optimize: true, ..Default::default()
    });
    flow.commit(ctx, Goal::Kill)
}

//////////////////////////////////////////////////////////////////////////////

// Items

pub fn flow_take(flow: &mut Flow, ctx: &Ctx) -> bool {
    let state = ctx.state;
    flow.clear(false);

    let mut any = false;
    for take in &state.takes {
        if take.taken { continue; }
        if !state.map.grid(take.pos).known() { continue; }
        if !within_leash(state, take.pos) { continue; }
        flow.enqueue(ctx, take.pos);
        any = true;
    }
    if !any { return false; }

    flow.spread(ctx, &SpreadArgs {
        optimize: true, leash: leash(state), ..Default::default()
    });
    flow.commit(ctx, Goal::Take)
}

//////////////////////////////////////////////////////////////////////////////

// Mineral veins

pub fn flow_vein(flow: &mut Flow, ctx: &Ctx) -> bool {
    let state = ctx.state;
    if state.player.dig_skill < DIG_SKILL { return false; }

    flow.clear(false);
    let mut any = false;
    for x in 0..MAP_SIZE.0 {
        for y in 0..MAP_SIZE.1 {
            let pos = Point(x, y);
            if !state.map.grid(pos).feature.has_treasure() { continue; }
            if !within_leash(state, pos) { continue; }
            // Only veins we can walk up to; no tunneling across the level.
            let open = dirs::ALL.iter().any(
                |&dir| state.map.grid(pos + dir).feature.is_passable());
            if !open { continue; }
            flow.enqueue(ctx, pos);
            any = true;
        }
    }
    if !any { return false; }

    flow.spread(ctx, &SpreadArgs {
        optimize: true, tunneling: true, leash: leash(state),
        ..Default::default()
    });
    flow.commit(ctx, Goal::Dig)
}

//////////////////////////////////////////////////////////////////////////////

// Recovery

// Retreat to a remembered defensible grid when hurt. The grid must be far
// enough away that resting there actually breaks contact.
pub fn flow_recover(flow: &mut Flow, ctx: &Ctx) -> bool {
    let state = ctx.state;
    if 100 * state.player.hp >= RECOVER_HP * state.player.max_hp.max(1) {
        return false;
    }

    flow.clear(false);
    let mut any = false;
    for &pos in &state.happy_grids {
        if (pos - state.player.pos).len_range() < RECOVER_RANGE { continue; }
        if ctx.danger(pos, 1, true, false) > 0 { continue; }
        flow.enqueue(ctx, pos);
        any = true;
    }
    if !any { return false; }

    // The walk to a rest spot is the worst time to blunder into something:
    // keep to explored grids and give every monster a wide berth.
    flow.spread(ctx, &SpreadArgs {
        optimize: true, avoid_unknown: true, sneak: true, ..Default::default()
    });
    flow.commit(ctx, Goal::Recover)
}

//////////////////////////////////////////////////////////////////////////////

// Anti-summon corridor

// 5x5 neighborhoods, player at the center, that turn into a one-wide
// fighting pocket once the '+' grids are excavated. A summoner's escorts
// and summons then reach us one at a time. '#' wall, '.' open floor,
// '+' open or diggable, '?' anything; the seed is the deepest '+'.
const CORRIDOR_NORTH: [&str; 5] = [
    "?#+#?",
    "?#+#?",
    "?#.#?",
    "?...?",
    "?????",
];

const CORRIDOR_SOUTH: [&str; 5] = [
    "?????",
    "?...?",
    "?#.#?",
    "?#+#?",
    "?#+#?",
];

const CORRIDOR_EAST: [&str; 5] = [
    "?????",
    "??###",
    "?..++",
    "??###",
    "?????",
];

const CORRIDOR_WEST: [&str; 5] = [
    "?????",
    "###??",
    "++..?",
    "###??",
    "?????",
];

fn match_corridor(state: &BorgState, rows: &[&str; 5]) -> Option<Point> {
    let center = state.player.pos;
    let mut seed: Option<Point> = None;
    for (r, row) in rows.iter().enumerate() {
        for (c, ch) in row.bytes().enumerate() {
            let pos = center + Point(c as i32 - 2, r as i32 - 2);
            let feature = state.map.grid(pos).feature;
            let ok = match ch {
                b'#' => feature.is_wall(),
                b'.' => feature.is_passable(),
                b'+' => feature.is_passable() || feature.is_tunnelable(),
                _ => true,
            };
            if !ok { return None; }
            if ch == b'+' {
                let deeper = seed.map_or(true, |s| {
                    (pos - center).len_range() > (s - center).len_range()
                });
                if deeper { seed = Some(pos); }
            }
        }
    }
    seed
}

pub fn flow_anti_summon(flow: &mut Flow, ctx: &Ctx) -> bool {
    let state = ctx.state;
    let threatened = state.monsters.iter().any(|(_, m)| {
        m.seen && m.awake && m.race.has(RF_SUMMONER)
    });
    if !threatened { return false; }

    let templates = [
        &CORRIDOR_NORTH, &CORRIDOR_SOUTH, &CORRIDOR_EAST, &CORRIDOR_WEST,
    ];
    for rows in templates {
        let Some(seed) = match_corridor(state, rows) else { continue; };
        flow.clear(false);
        flow.enqueue(ctx, seed);
        flow.spread(ctx, &SpreadArgs {
            depth: 8, optimize: true, tunneling: true, ..Default::default()
        });
        if flow.commit(ctx, Goal::AntiSummon) { return true; }
    }
    false
}

//////////////////////////////////////////////////////////////////////////////

// Glyph sea

// Builds a block of warding glyphs one grid at a time. The selector routes
// to the nearest unwarded grid; the defense registry lays the glyph once we
// stand on it.
pub fn flow_glyph_sea(flow: &mut Flow, ctx: &Ctx) -> bool {
    let state = ctx.state;
    if !state.player.can_cast(Spell::get("Glyph of Warding")) { return false; }
    let threatened = state.monsters.iter().any(|(_, m)| {
        m.seen && m.awake && m.race.has(RF_SUMMONER)
    });
    if !threatened { return false; }

    flow.clear(false);
    let mut any = false;
    for dx in -2..=2 {
        for dy in -2..=2 {
            let pos = state.player.pos + Point(dx, dy);
            let grid = state.map.grid(pos);
            if grid.feature != Feature::Floor { continue; }
            if grid.monster.is_some() { continue; }
            flow.enqueue(ctx, pos);
            any = true;
        }
    }
    if !any { return false; }

    flow.spread(ctx, &SpreadArgs { depth: 6, optimize: true, ..Default::default() });
    flow.commit(ctx, Goal::GlyphSea)
}

//////////////////////////////////////////////////////////////////////////////

// Shops

pub fn flow_shop(flow: &mut Flow, ctx: &Ctx) -> bool {
    let state = ctx.state;
    let Some(index) = state.shop_goal else { return false; };

    flow.clear(false);
    let mut any = false;
    for &pos in &state.map.shops {
        if state.map.grid(pos).feature != Feature::Shop(index) { continue; }
        flow.enqueue(ctx, pos);
        any = true;
    }
    if !any { return false; }

    flow.spread(ctx, &SpreadArgs { optimize: true, ..Default::default() });
    flow.commit(ctx, Goal::Shop)
}

//////////////////////////////////////////////////////////////////////////////
