use std::cmp::min;

use crate::base::{dirs, Point, LOS};
use crate::danger::Ctx;
use crate::dex::{Brand, Device, Element, Shape, Spell};
use crate::dex::{RF_BREEDER, RF_EVIL, RF_SUMMONER, RF_UNIQUE};
use crate::monsters::Monster;
use crate::player::{Command, GameControl, Player, MAX_RANGE};

//////////////////////////////////////////////////////////////////////////////

// Constants

// Below this many missiles, each shot gets pricier to justify.
const AMMO_RESERVE: i32 = 10;

// Throwing range for flasks of oil.
const THROW_RANGE: i32 = 10;

// Spells above this fail chance are not worth a turn.
const FAIL_LIMIT: i32 = 75;

//////////////////////////////////////////////////////////////////////////////

// AttackAction

// One registered way of hurting a monster. score surveys the live state and
// returns the best (utility, target) pair without mutating anything; commit
// performs exactly the scored action. The fail roll lives in the host.
pub trait AttackAction {
    fn label(&self) -> &'static str;
    fn score(&self, ctx: &Ctx) -> Option<(i32, Point)>;
    fn commit(&self, ctx: &Ctx, target: Point,
              game: &mut dyn GameControl) -> bool;
}

// The full registry, in tie-break order: cheap actions first.
pub fn attack_registry() -> Vec<Box<dyn AttackAction>> {
    let mut registry: Vec<Box<dyn AttackAction>> = vec![Box::new(Melee)];
    for brand in Brand::ALL {
        registry.push(Box::new(LaunchAmmo { brand }));
    }
    registry.push(Box::new(ThrowObject));
    let mut spells: Vec<_> = Spell::all()
        .filter(|spell| (spell.damage)(50) > 0).collect();
    spells.sort_by_key(|spell| (spell.book, spell.index));
    for spell in spells {
        registry.push(Box::new(BookSpell { spell }));
    }
    let mut devices: Vec<_> = Device::all().collect();
    devices.sort_by_key(|device| (device.level, device.name));
    for device in devices {
        registry.push(Box::new(UseDevice { device }));
    }
    registry
}

// Linear scan keeping only the single best candidate. Strictly-greater
// comparison makes the earliest-registered action win ties.
pub fn best_attack(registry: &[Box<dyn AttackAction>],
                   ctx: &Ctx) -> Option<(usize, i32, Point)> {
    let mut best: Option<(usize, i32, Point)> = None;
    for (index, action) in registry.iter().enumerate() {
        let Some((score, target)) = action.score(ctx) else { continue; };
        if score <= 0 { continue; }
        if best.map_or(true, |(_, b, _)| score > b) {
            best = Some((index, score, target));
        }
    }
    best
}

//////////////////////////////////////////////////////////////////////////////

// Utility

// Expected value of landing `damage` of `element` on this monster.
fn attack_utility(monster: &Monster, element: Element, damage: i32) -> i32 {
    let race = monster.race;
    let mut value = damage;
    if race.resists(element) { value /= 3; }
    if race.vulnerable(element) { value *= 2; }

    // Overkill is wasted; damage past the kill only counts a little.
    value = min(value, monster.hp + monster.hp / 2 + 1);

    // Waking a sleeping monster forfeits the option of sneaking past.
    if !monster.awake { value = value * 2 / 3; }

    // Kill these before they multiply the problem.
    if race.has(RF_UNIQUE) || race.has(RF_SUMMONER) || race.has(RF_BREEDER) {
        value += value / 4;
    }
    value
}

fn visible_monsters<'a>(ctx: &'a Ctx) -> impl Iterator<Item = &'a Monster> {
    ctx.state.monsters.iter().map(|(_, m)| m).filter(move |m| {
        m.seen && (m.pos - ctx.state.player.pos).len_range() <= MAX_RANGE
    })
}

// The aim grid for a ball: the monster itself, or a neighboring grid we can
// project to when the monster is tucked behind a corner.
fn ball_target(ctx: &Ctx, monster: Point) -> Option<Point> {
    let player = ctx.state.player.pos;
    if ctx.state.map.projectable(player, monster) { return Some(monster); }
    for &dir in &dirs::ALL {
        let pos = monster + dir;
        if (pos - player).len_range() > MAX_RANGE { continue; }
        if !ctx.state.map.grid(pos).feature.is_passable() { continue; }
        if ctx.state.map.projectable(player, pos) { return Some(pos); }
    }
    None
}

// Scores a projection of the given shape, element, and raw damage: the best
// (utility, aim-grid) pair over all visible monsters, or None.
fn shape_score(ctx: &Ctx, shape: Shape, element: Element,
               damage: i32) -> Option<(i32, Point)> {
    if damage <= 0 { return None; }
    let player = ctx.state.player.pos;
    let mut best: Option<(i32, Point)> = None;
    let mut consider = |score: i32, target: Point| {
        if score > 0 && best.map_or(true, |(b, _)| score > b) {
            best = Some((score, target));
        }
    };

    match shape {
        Shape::Bolt => {
            for monster in visible_monsters(ctx) {
                if !ctx.state.map.projectable(player, monster.pos) { continue; }
                consider(attack_utility(monster, element, damage), monster.pos);
            }
        }
        Shape::Beam => {
            // A beam keeps going: sum everything standing on the ray.
            for monster in visible_monsters(ctx) {
                if !ctx.state.map.projectable(player, monster.pos) { continue; }
                let ray = LOS(player, monster.pos);
                let score = visible_monsters(ctx)
                    .filter(|m| ray.contains(&m.pos))
                    .map(|m| attack_utility(m, element, damage))
                    .sum();
                consider(score, monster.pos);
            }
        }
        Shape::Ball(radius) => {
            for monster in visible_monsters(ctx) {
                let Some(target) = ball_target(ctx, monster.pos) else { continue; };
                let score = visible_monsters(ctx)
                    .filter(|m| (m.pos - target).len_range() <= radius)
                    .map(|m| attack_utility(m, element, damage))
                    .sum();
                consider(score, target);
            }
        }
        Shape::Dispel => {
            let score = visible_monsters(ctx)
                .filter(|m| ctx.state.map.projectable(player, m.pos))
                .filter(|m| element != Element::Holy || m.race.has(RF_EVIL))
                .map(|m| attack_utility(m, element, damage))
                .sum();
            consider(score, player);
        }
        Shape::Caster => {}
    }
    best
}

// Mana left for this cast after protecting the emergency teleport. The
// penalty turns quadratic as spending eats into the reserve.
fn mana_reserve(player: &Player) -> i32 {
    player.class.reserve_spell()
        .filter(|spell| player.knows(spell))
        .map_or(0, |spell| spell.mana)
}

fn reserve_penalty(player: &Player, mana: i32) -> i32 {
    let reserve = mana_reserve(player);
    let after = player.sp - mana;
    if after >= reserve { return 0; }
    let short = reserve - after;
    short * short
}

//////////////////////////////////////////////////////////////////////////////

// Melee

pub struct Melee;

impl AttackAction for Melee {
    fn label(&self) -> &'static str { "melee" }

    fn score(&self, ctx: &Ctx) -> Option<(i32, Point)> {
        let player = &ctx.state.player;
        if player.afraid { return None; }

        let mut best: Option<(i32, Point)> = None;
        for monster in visible_monsters(ctx) {
            if (monster.pos - player.pos).len_l1() != 1 { continue; }
            let score = attack_utility(
                monster, Element::Physical, player.melee_damage());
            if best.map_or(true, |(b, _)| score > b) {
                best = Some((score, monster.pos));
            }
        }
        best
    }

    fn commit(&self, ctx: &Ctx, target: Point,
              game: &mut dyn GameControl) -> bool {
        let dir = target - ctx.state.player.pos;
        game.send(&Command::Attack(dir));
        true
    }
}

//////////////////////////////////////////////////////////////////////////////

// Missiles

pub struct LaunchAmmo {
    pub brand: Brand,
}

impl AttackAction for LaunchAmmo {
    fn label(&self) -> &'static str { "fire" }

    fn score(&self, ctx: &Ctx) -> Option<(i32, Point)> {
        let state = ctx.state;
        let count = state.inventory.missile_count(self.brand);
        if count <= 0 { return None; }

        let damage = state.player.missile_damage() * self.brand.mult();
        let (mut score, target) = shape_score(
            ctx, Shape::Bolt, self.brand.element(), damage)?;
        if count < AMMO_RESERVE { score -= 3 * (AMMO_RESERVE - count); }
        Some((score, target))
    }

    fn commit(&self, _: &Ctx, target: Point,
              game: &mut dyn GameControl) -> bool {
        game.fire(self.brand, target)
    }
}

pub struct ThrowObject;

impl AttackAction for ThrowObject {
    fn label(&self) -> &'static str { "throw" }

    fn score(&self, ctx: &Ctx) -> Option<(i32, Point)> {
        let state = ctx.state;
        if state.inventory.flasks <= 0 { return None; }

        // Flasks of oil: 2d6 fire, short range.
        let (score, target) = shape_score(ctx, Shape::Bolt, Element::Fire, 7)?;
        let range = (target - state.player.pos).len_range();
        if range > THROW_RANGE { return None; }
        Some((score, target))
    }

    fn commit(&self, _: &Ctx, target: Point,
              game: &mut dyn GameControl) -> bool {
        game.throw(target)
    }
}

//////////////////////////////////////////////////////////////////////////////

// Spells

pub struct BookSpell {
    pub spell: &'static Spell,
}

impl AttackAction for BookSpell {
    fn label(&self) -> &'static str { self.spell.name }

    fn score(&self, ctx: &Ctx) -> Option<(i32, Point)> {
        let player = &ctx.state.player;
        let spell = self.spell;
        if !player.can_cast(spell) { return None; }
        if !ctx.state.inventory.books[spell.book] { return None; }

        let fail = player.fail_chance(spell);
        if fail > FAIL_LIMIT { return None; }

        let damage = (spell.damage)(player.level);
        let (raw, target) = shape_score(ctx, spell.shape, spell.element, damage)?;
        let score = raw * (100 - fail) / 100 - reserve_penalty(player, spell.mana);
        Some((score, target))
    }

    fn commit(&self, _: &Ctx, target: Point,
              game: &mut dyn GameControl) -> bool {
        let target = match self.spell.shape {
            Shape::Dispel | Shape::Caster => None,
            _ => Some(target),
        };
        game.cast(self.spell, target)
    }
}

//////////////////////////////////////////////////////////////////////////////

// Devices

pub struct UseDevice {
    pub device: &'static Device,
}

impl AttackAction for UseDevice {
    fn label(&self) -> &'static str { self.device.name }

    fn score(&self, ctx: &Ctx) -> Option<(i32, Point)> {
        let state = ctx.state;
        let device = self.device;
        if state.inventory.charges(device) <= 0 { return None; }
        if state.player.blind || state.player.confused { return None; }

        let fail = state.player.device_fail_chance(device);
        let (raw, target) = shape_score(
            ctx, device.shape, device.element, device.damage)?;
        let mut score = raw * (100 - fail) / 100;

        // Wand charges do not grow back; keep the last few for emergencies.
        let charges = state.inventory.charges(device);
        if charges < 3 { score -= 5 * (3 - charges); }
        Some((score, target))
    }

    fn commit(&self, _: &Ctx, target: Point,
              game: &mut dyn GameControl) -> bool {
        let target = match self.device.shape {
            Shape::Dispel | Shape::Caster => None,
            _ => Some(target),
        };
        game.use_device(self.device, target)
    }
}

//////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use crate::danger::MonsterDanger;
    use crate::dex::MonsterRace;
    use crate::map::Feature;
    use crate::player::Class;
    use crate::test_support::{open_state, MockControl};

    #[test]
    fn test_melee_picks_adjacent_monster() {
        let mut state = open_state(Point(20, 20), 5);
        let pos = state.player.pos;
        let near = state.monsters.add(MonsterRace::get("kobold"), pos + dirs::E, 0);
        state.monsters[near].awake = true;
        let far = state.monsters.add(MonsterRace::get("kobold"), pos + Point(3, 0), 0);
        state.monsters[far].awake = true;

        let model = MonsterDanger;
        let ctx = Ctx::new(&state, &model);
        let melee = Melee;
        let (score, target) = melee.score(&ctx).unwrap();
        assert!(score > 0);
        assert_eq!(target, pos + dirs::E);

        let mut game = MockControl::new();
        assert!(melee.commit(&ctx, target, &mut game));
        assert_eq!(game.commands, vec![Command::Attack(dirs::E)]);
    }

    #[test]
    fn test_fear_blocks_melee() {
        let mut state = open_state(Point(20, 20), 5);
        let pos = state.player.pos;
        state.monsters.add(MonsterRace::get("kobold"), pos + dirs::E, 0);
        state.player.afraid = true;

        let model = MonsterDanger;
        let ctx = Ctx::new(&state, &model);
        assert!(Melee.score(&ctx).is_none());
    }

    #[test]
    fn test_resistance_and_vulnerability_shift_spell_choice() {
        let mut state = open_state(Point(30, 20), 20);
        state.player.class = Class::Mage;
        state.player.level = 30;
        state.player.sp = 100;
        state.player.max_sp = 100;
        state.inventory.books = [true; 4];
        let pos = state.player.pos;
        let mid = state.monsters.add(MonsterRace::get("fire giant"), pos + Point(5, 0), 0);
        state.monsters[mid].awake = true;

        let model = MonsterDanger;
        let ctx = Ctx::new(&state, &model);
        let fire = BookSpell { spell: Spell::get("Fire Bolt") };
        let frost = BookSpell { spell: Spell::get("Frost Bolt") };
        let (fire_score, _) = fire.score(&ctx).unwrap();
        let (frost_score, _) = frost.score(&ctx).unwrap();

        // Fire giants resist fire and melt to cold.
        assert!(frost_score > fire_score);
    }

    #[test]
    fn test_mana_reserve_penalty_steepens() {
        let mut state = open_state(Point(30, 20), 20);
        state.player.class = Class::Mage;
        state.player.level = 30;
        state.inventory.books = [true; 4];
        let pos = state.player.pos;
        let mid = state.monsters.add(MonsterRace::get("stone giant"), pos + Point(5, 0), 0);
        state.monsters[mid].awake = true;

        let spell = BookSpell { spell: Spell::get("Fire Bolt") };
        let model = MonsterDanger;

        state.player.sp = 100;
        let ctx = Ctx::new(&state, &model);
        let (rich, _) = spell.score(&ctx).unwrap();

        // Teleport Self costs 7: spending down into the reserve hurts, and
        // the penalty grows faster than linearly.
        state.player.sp = 13;
        let ctx = Ctx::new(&state, &model);
        let (tight, _) = spell.score(&ctx).unwrap();
        state.player.sp = 10;
        let ctx = Ctx::new(&state, &model);
        let (tighter, _) = spell.score(&ctx).unwrap();
        assert!(tight < rich);
        assert!(rich - tight < (tight - tighter));
    }

    #[test]
    fn test_ammo_conservation_discount() {
        let mut state = open_state(Point(30, 20), 10);
        let pos = state.player.pos;
        let mid = state.monsters.add(MonsterRace::get("soldier"), pos + Point(6, 0), 0);
        state.monsters[mid].awake = true;
        let model = MonsterDanger;

        let launch = LaunchAmmo { brand: Brand::None };
        state.inventory.add_missiles(Brand::None, 2);
        let ctx = Ctx::new(&state, &model);
        let (low, _) = launch.score(&ctx).unwrap();

        state.inventory.add_missiles(Brand::None, 38);
        let ctx = Ctx::new(&state, &model);
        let (full, _) = launch.score(&ctx).unwrap();
        assert!(low < full);
    }

    #[test]
    fn test_device_conserves_its_last_charges() {
        let mut state = open_state(Point(30, 20), 10);
        let pos = state.player.pos;
        let mid = state.monsters.add(MonsterRace::get("soldier"), pos + Point(5, 0), 0);
        state.monsters[mid].awake = true;
        let model = MonsterDanger;

        let wand = Device::get("Wand of Magic Missile");
        let action = UseDevice { device: wand };
        let ctx = Ctx::new(&state, &model);
        assert!(action.score(&ctx).is_none());

        state.inventory.add_device(wand, 1);
        let ctx = Ctx::new(&state, &model);
        let (last, _) = action.score(&ctx).unwrap();

        state.inventory.add_device(wand, 9);
        let ctx = Ctx::new(&state, &model);
        let (stocked, target) = action.score(&ctx).unwrap();
        assert!(last < stocked);

        let mut game = MockControl::new();
        assert!(action.commit(&ctx, target, &mut game));
        assert_eq!(game.devices, vec![("Wand of Magic Missile", Some(target))]);
    }

    #[test]
    fn test_ball_offset_targeting_around_a_corner() {
        let mut state = open_state(Point(30, 20), 20);
        let pos = state.player.pos;
        // A pillar between us and the soldier; the grids beside it still
        // have a clear line.
        let monster_pos = pos + Point(4, 0);
        state.map.set_feature(pos + Point(2, 0), Feature::Granite);
        let mid = state.monsters.add(MonsterRace::get("soldier"), monster_pos, 0);
        state.monsters[mid].awake = true;

        let model = MonsterDanger;
        let ctx = Ctx::new(&state, &model);
        assert!(!state.map.projectable(pos, monster_pos));

        let target = ball_target(&ctx, monster_pos).unwrap();
        assert_ne!(target, monster_pos);
        assert!((target - monster_pos).len_range() <= 1);
        assert!(state.map.projectable(pos, target));
    }

    #[test]
    fn test_dispel_only_counts_evil() {
        let mut state = open_state(Point(30, 20), 20);
        state.player.class = Class::Priest;
        state.player.level = 35;
        state.player.sp = 100;
        state.player.max_sp = 100;
        state.inventory.books = [true; 4];
        let pos = state.player.pos;

        // A soldier is not evil; Dispel Evil has nothing to hit.
        let mid = state.monsters.add(MonsterRace::get("soldier"), pos + Point(4, 0), 0);
        state.monsters[mid].awake = true;
        let model = MonsterDanger;
        let dispel = BookSpell { spell: Spell::get("Dispel Evil") };
        assert!(dispel.score(&Ctx::new(&state, &model)).is_none());

        let mid = state.monsters.add(MonsterRace::get("kobold"), pos + Point(0, 4), 0);
        state.monsters[mid].awake = true;
        assert!(dispel.score(&Ctx::new(&state, &model)).is_some());
    }

    #[test]
    fn test_best_attack_first_registered_wins_ties() {
        struct Fixed(&'static str, i32);
        impl AttackAction for Fixed {
            fn label(&self) -> &'static str { self.0 }
            fn score(&self, _: &Ctx) -> Option<(i32, Point)> {
                Some((self.1, Point(0, 0)))
            }
            fn commit(&self, _: &Ctx, _: Point, _: &mut dyn GameControl) -> bool {
                true
            }
        }

        let registry: Vec<Box<dyn AttackAction>> = vec![
            Box::new(Fixed("a", 10)),
            Box::new(Fixed("b", 10)),
            Box::new(Fixed("c", 5)),
        ];
        let state = open_state(Point(10, 10), 5);
        let model = MonsterDanger;
        let ctx = Ctx::new(&state, &model);
        let (index, score, _) = best_attack(&registry, &ctx).unwrap();
        assert_eq!(index, 0);
        assert_eq!(score, 10);
    }
}
