use std::cmp::max;

use crate::base::{clamp, Point};
use crate::dex::{Element, RF_EVIL, RF_NEVER_MOVE, RF_PASS_WALL};
use crate::monsters::Monster;
use crate::player::MAX_RANGE;
use crate::state::{BorgState, EffectSet, LEVEL_TIME_BUDGET};
use crate::state::{FX_BERSERK, FX_BLESS, FX_FAST, FX_HERO, FX_PROT_EVIL, FX_SHIELD};
use crate::state::{FX_RES_ACID, FX_RES_COLD, FX_RES_ELEC, FX_RES_FIRE, FX_RES_POIS};

//////////////////////////////////////////////////////////////////////////////

// DangerModel

// The danger oracle. Implementations must be deterministic for a fixed
// state snapshot; the threshold a danger value is compared against is the
// caller's business (see fear_threshold below), never the oracle's.
pub trait DangerModel {
    fn danger_with_effects(&self, state: &BorgState, effects: EffectSet,
                           pos: Point, turns: i32, include_unseen: bool,
                           attacking: bool) -> i32;

    fn danger(&self, state: &BorgState, pos: Point, turns: i32,
              include_unseen: bool, attacking: bool) -> i32 {
        self.danger_with_effects(
            state, state.effects, pos, turns, include_unseen, attacking)
    }
}

//////////////////////////////////////////////////////////////////////////////

// MonsterDanger

// Sums each tracked monster's damage potential at pos within the given
// number of our turns, accounting for distance, relative speed, sleep, and
// active effects on the copy it was handed.
pub struct MonsterDanger;

impl DangerModel for MonsterDanger {
    fn danger_with_effects(&self, state: &BorgState, effects: EffectSet,
                           pos: Point, turns: i32, include_unseen: bool,
                           attacking: bool) -> i32 {
        let mut total = 0;
        for (_, monster) in &state.monsters {
            if !include_unseen && !monster.seen { continue; }
            total += monster_danger(state, effects, monster, pos, turns);
        }
        // When we are the aggressor we get the first swing, so bias the
        // comparison slightly in favor of standing and fighting.
        if attacking { total = total * 9 / 10; }
        total
    }
}

fn monster_danger(state: &BorgState, effects: EffectSet,
                  monster: &Monster, pos: Point, turns: i32) -> i32 {
    let race = monster.race;
    let dist = (monster.pos - pos).len_range();

    let mut player_speed = max(state.player.speed, 1);
    if effects.has(FX_FAST) { player_speed += 10; }
    let moves = turns * race.speed / player_speed;
    if moves <= 0 { return 0; }

    let mut danger = 0;

    // Melee: turns remaining once the monster has closed to contact.
    let can_close = !race.has(RF_NEVER_MOVE) || dist <= 1;
    if can_close {
        let mut approach = max(dist - 1, 0);
        if approach > 0 && !race.has(RF_PASS_WALL)
                && !state.map.projectable(monster.pos, pos) {
            approach *= 2;
        }
        let contact = moves - approach;
        if contact > 0 {
            let mut melee = contact * race.melee;
            if effects.has(FX_SHIELD) { melee = melee * 3 / 4; }
            if effects.has(FX_PROT_EVIL) && race.has(RF_EVIL)
                    && race.level <= state.player.level {
                melee /= 2;
            }
            danger += melee;
        }
    }

    // Ranged: needs a clear shot and a grid within projection range.
    if race.ranged > 0 && dist <= MAX_RANGE
            && state.map.projectable(monster.pos, pos) {
        let mut ranged = moves * race.ranged;
        if let Some(flag) = resist_flag(race.ranged_element()) {
            if effects.has(flag) { ranged /= 3; }
        }
        danger += ranged;
    }

    if !monster.awake { danger /= 2; }
    if effects.has(FX_BLESS) { danger = danger * 19 / 20; }
    if effects.has(FX_HERO) { danger = danger * 19 / 20; }
    if effects.has(FX_BERSERK) { danger = danger * 9 / 10; }
    danger
}

fn resist_flag(element: Element) -> Option<u32> {
    match element {
        Element::Fire => Some(FX_RES_FIRE),
        Element::Cold => Some(FX_RES_COLD),
        Element::Elec => Some(FX_RES_ELEC),
        Element::Acid => Some(FX_RES_ACID),
        Element::Poison => Some(FX_RES_POIS),
        _ => None,
    }
}

//////////////////////////////////////////////////////////////////////////////

// Fear threshold

// The damage baseline we can absorb before a grid is "too scary". Doubles
// as the denominator of the escape-tier ratio.
pub fn avoidance(state: &BorgState) -> i32 {
    let mut avoid = max(state.player.hp, 1);
    if state.twitchy { avoid *= 3; }
    avoid
}

// The single fear-threshold computation. Every danger comparison in the
// crate (flow enqueue, flow spread, direct-path steps) goes through this
// function, so the gates can never drift apart.
pub fn fear_threshold(state: &BorgState) -> i32 {
    let avoid = avoidance(state);

    // Town is safe by construction; tolerate almost nothing there, except
    // that a starving character must brave the walk to a food shop.
    if state.in_town() {
        return if state.player.starving() { avoid } else { max(avoid / 10, 1) };
    }

    let mut fear = avoid * 6 / 10;
    if state.player.level > state.depth() + 5 { fear = fear * 12 / 10; }
    if state.player.hungry() { fear = fear * 13 / 10; }
    if state.player.starving() { fear = avoid; }

    // ignoring counts explicit "push through it" requests from the engine.
    fear = fear * (10 + 2 * clamp(state.ignoring, 0, 10)) / 10;

    // Overstaying a level shifts the balance toward reaching the stairs.
    if state.turns_on_level > LEVEL_TIME_BUDGET {
        let factor = clamp(state.turns_on_level / LEVEL_TIME_BUDGET + 1, 2, 3);
        fear *= factor;
    }

    // Inside a vault the loot justifies less caution, not more.
    if state.in_vault { fear = fear * 7 / 10; }

    if state.twitchy { fear = max(fear, 3 * state.player.max_hp); }
    max(fear, 1)
}

//////////////////////////////////////////////////////////////////////////////

// Ctx

// The read-only bundle handed to every score path: the state snapshot plus
// the danger oracle. Commit paths take the pieces they mutate directly.
pub struct Ctx<'a> {
    pub state: &'a BorgState,
    pub model: &'a dyn DangerModel,
}

impl<'a> Ctx<'a> {
    pub fn new(state: &'a BorgState, model: &'a dyn DangerModel) -> Self {
        Self { state, model }
    }

    pub fn danger(&self, pos: Point, turns: i32,
                  include_unseen: bool, attacking: bool) -> i32 {
        self.model.danger(self.state, pos, turns, include_unseen, attacking)
    }

    pub fn danger_with_effects(&self, effects: EffectSet, pos: Point,
                               turns: i32) -> i32 {
        self.model.danger_with_effects(
            self.state, effects, pos, turns, true, false)
    }
}

//////////////////////////////////////////////////////////////////////////////
