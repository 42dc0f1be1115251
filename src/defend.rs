use std::cmp::{max, min};

use crate::base::Point;
use crate::danger::{avoidance, Ctx, DangerModel};
use crate::dex::{Device, Spell, RF_INVISIBLE};
use crate::map::Feature;
use crate::player::{Command, GameControl, Potion, Scroll};
use crate::state::BorgState;
use crate::state::{FX_BERSERK, FX_BLESS, FX_FAST, FX_HERO, FX_PROT_EVIL, FX_SEE_INV};
use crate::state::{FX_RES_ACID, FX_RES_COLD, FX_RES_ELEC, FX_RES_FIRE, FX_RES_POIS};

//////////////////////////////////////////////////////////////////////////////

// Constants

// Horizon, in turns, over which a buff is expected to pay for itself.
const BUFF_TURNS: i32 = 4;

// Phase Door displacement range.
const PHASE_RANGE: i32 = 10;

// Safe landing grids required before a blind phase is worth the gamble.
const PHASE_SAFE_GRIDS: i32 = 8;

// Fail chance above which a non-emergency escape cast is skipped.
const ESCAPE_FAIL_LIMIT: i32 = 50;

//////////////////////////////////////////////////////////////////////////////

// DefenseAction

// One registered defensive measure. score re-runs the danger model with the
// simulated effect toggled on a copied effect set and returns the danger
// saved minus the action's cost; nothing persisted is touched until commit.
pub trait DefenseAction {
    fn label(&self) -> &'static str;
    fn score(&self, ctx: &Ctx) -> i32;
    fn commit(&self, ctx: &Ctx, game: &mut dyn GameControl) -> bool;
}

pub fn defense_registry() -> Vec<Box<dyn DefenseAction>> {
    const RES_ALL: u32 =
        FX_RES_FIRE | FX_RES_COLD | FX_RES_ELEC | FX_RES_ACID | FX_RES_POIS;
    vec![
        Box::new(SpellBuff { name: "Bless", flags: FX_BLESS }),
        Box::new(SpellBuff { name: "Protection from Evil", flags: FX_PROT_EVIL }),
        Box::new(SpellBuff { name: "Resistance", flags: RES_ALL }),
        Box::new(SpellBuff { name: "Haste Self", flags: FX_FAST }),
        Box::new(PotionBuff { kind: Potion::Heroism, flags: FX_HERO }),
        Box::new(PotionBuff { kind: Potion::Berserk, flags: FX_BERSERK }),
        Box::new(PotionBuff { kind: Potion::Speed, flags: FX_FAST }),
        Box::new(CureWounds),
        Box::new(GlyphWard),
        Box::new(TeleportOther),
        Box::new(SeeInvisible),
        Box::new(MassBanishment),
        Box::new(Earthquake),
        Box::new(Destruction),
        Box::new(ShiftPanel),
    ]
}

// Strictly-greater scan: the earliest-registered defense wins ties.
pub fn best_defense(registry: &[Box<dyn DefenseAction>],
                    ctx: &Ctx) -> Option<(usize, i32)> {
    let mut best: Option<(usize, i32)> = None;
    for (index, action) in registry.iter().enumerate() {
        let score = action.score(ctx);
        if score <= 0 { continue; }
        if best.map_or(true, |(_, b)| score > b) {
            best = Some((index, score));
        }
    }
    best
}

//////////////////////////////////////////////////////////////////////////////

// Buffs

fn buff_delta(ctx: &Ctx, flags: u32) -> i32 {
    let pos = ctx.state.player.pos;
    let base = ctx.danger_with_effects(ctx.state.effects, pos, BUFF_TURNS);
    let with = ctx.danger_with_effects(ctx.state.effects.with(flags), pos, BUFF_TURNS);
    base - with
}

pub struct SpellBuff {
    pub name: &'static str,
    pub flags: u32,
}

impl DefenseAction for SpellBuff {
    fn label(&self) -> &'static str { self.name }

    fn score(&self, ctx: &Ctx) -> i32 {
        let player = &ctx.state.player;
        if ctx.state.effects.has(self.flags) { return 0; }
        let spell = Spell::get(self.name);
        if !player.can_cast(spell) { return 0; }
        if !ctx.state.inventory.books[spell.book] { return 0; }
        buff_delta(ctx, self.flags) - spell.mana / 2 - player.fail_chance(spell) / 10
    }

    fn commit(&self, _: &Ctx, game: &mut dyn GameControl) -> bool {
        game.cast(Spell::get(self.name), None)
    }
}

pub struct PotionBuff {
    pub kind: Potion,
    pub flags: u32,
}

impl DefenseAction for PotionBuff {
    fn label(&self) -> &'static str { "quaff" }

    fn score(&self, ctx: &Ctx) -> i32 {
        if ctx.state.effects.has(self.flags) { return 0; }
        let count = ctx.state.inventory.potion_count(self.kind);
        if count <= 0 { return 0; }
        // Potions are scarcer than mana; demand a bigger payoff.
        buff_delta(ctx, self.flags) - 10
    }

    fn commit(&self, _: &Ctx, game: &mut dyn GameControl) -> bool {
        game.quaff(self.kind)
    }
}

//////////////////////////////////////////////////////////////////////////////

// Warding and crowd control

pub struct GlyphWard;

impl GlyphWard {
    fn castable(state: &BorgState) -> bool {
        let spell = Spell::get("Glyph of Warding");
        state.player.can_cast(spell) && state.inventory.books[spell.book]
    }

    fn scribable(state: &BorgState) -> bool {
        state.inventory.scroll_count(Scroll::Rune) > 0
            && !state.player.blind && !state.player.confused
    }
}

impl DefenseAction for GlyphWard {
    fn label(&self) -> &'static str { "glyph" }

    fn score(&self, ctx: &Ctx) -> i32 {
        let state = ctx.state;
        if state.map.grid(state.player.pos).feature == Feature::Glyph { return 0; }
        let castable = Self::castable(state);
        if !castable && !Self::scribable(state) { return 0; }

        // Worth a turn when we intend to stand and fight here.
        let danger = ctx.danger(state.player.pos, BUFF_TURNS, true, false);
        if danger <= avoidance(state) / 2 { return 0; }
        let cost = if castable { Spell::get("Glyph of Warding").mana / 2 } else { 10 };
        danger / 3 - cost
    }

    fn commit(&self, ctx: &Ctx, game: &mut dyn GameControl) -> bool {
        let state = ctx.state;
        if Self::castable(state)
                && game.cast(Spell::get("Glyph of Warding"), None) {
            return true;
        }
        if Self::scribable(state) {
            return game.read_scroll(Scroll::Rune);
        }
        false
    }
}

// Healing is the last consumable to burn: quaff only when the wounds plus
// the incoming hit threaten to finish us before an escape could land.
pub struct CureWounds;

impl CureWounds {
    fn pick(state: &BorgState) -> Option<Potion> {
        let player = &state.player;
        let missing = player.max_hp - player.hp;
        if missing >= player.max_hp / 2
                && state.inventory.potion_count(Potion::Healing) > 0 {
            return Some(Potion::Healing);
        }
        if state.inventory.potion_count(Potion::CureSeriousWounds) > 0 {
            return Some(Potion::CureSeriousWounds);
        }
        None
    }
}

impl DefenseAction for CureWounds {
    fn label(&self) -> &'static str { "cure wounds" }

    fn score(&self, ctx: &Ctx) -> i32 {
        let state = ctx.state;
        let player = &state.player;
        let missing = player.max_hp - player.hp;
        if missing <= player.max_hp / 3 { return 0; }

        let danger = ctx.danger(player.pos, 1, true, false);
        if danger < player.hp / 2 { return 0; }
        let Some(kind) = Self::pick(state) else { return 0; };
        min(missing, kind.heals()) - 10
    }

    fn commit(&self, ctx: &Ctx, game: &mut dyn GameControl) -> bool {
        let Some(kind) = Self::pick(ctx.state) else { return false; };
        game.quaff(kind)
    }
}

pub struct TeleportOther;

impl TeleportOther {
    // The single monster whose removal saves the most.
    fn pick(ctx: &Ctx) -> Option<(i32, Point)> {
        let state = ctx.state;
        let mut best: Option<(i32, Point)> = None;
        for (_, monster) in &state.monsters {
            if !monster.seen || !monster.awake { continue; }
            if !state.map.projectable(state.player.pos, monster.pos) { continue; }
            let range = (monster.pos - state.player.pos).len_range();
            if range > 6 { continue; }
            let threat = monster.race.melee + monster.race.ranged;
            if best.map_or(true, |(b, _)| threat > b) {
                best = Some((threat, monster.pos));
            }
        }
        best
    }
}

impl DefenseAction for TeleportOther {
    fn label(&self) -> &'static str { "teleport other" }

    fn score(&self, ctx: &Ctx) -> i32 {
        let state = ctx.state;
        let spell = Spell::get("Teleport Other");
        if !state.player.can_cast(spell) { return 0; }
        if !state.inventory.books[spell.book] { return 0; }

        let danger = ctx.danger(state.player.pos, 1, true, false);
        if danger <= avoidance(state) / 2 { return 0; }
        let Some((threat, _)) = Self::pick(ctx) else { return 0; };
        threat - spell.mana
    }

    fn commit(&self, ctx: &Ctx, game: &mut dyn GameControl) -> bool {
        let Some((_, target)) = Self::pick(ctx) else { return false; };
        game.cast(Spell::get("Teleport Other"), Some(target))
    }
}

pub struct SeeInvisible;

impl DefenseAction for SeeInvisible {
    fn label(&self) -> &'static str { "see invisible" }

    fn score(&self, ctx: &Ctx) -> i32 {
        let state = ctx.state;
        if state.effects.has(FX_SEE_INV) { return 0; }
        let spell = match state.player.class.realm() {
            Some(crate::dex::Realm::Arcane) => Spell::get("Detect Invisible"),
            Some(crate::dex::Realm::Divine) => Spell::get("Sense Invisible"),
            None => return 0,
        };
        if !state.player.can_cast(spell) { return 0; }
        if !state.inventory.books[spell.book] { return 0; }

        let haunted = state.monsters.iter().any(|(_, m)| {
            m.race.has(RF_INVISIBLE)
                && (m.pos - state.player.pos).len_range() <= 10
        });
        if haunted { 15 } else { 0 }
    }

    fn commit(&self, ctx: &Ctx, game: &mut dyn GameControl) -> bool {
        let spell = match ctx.state.player.class.realm() {
            Some(crate::dex::Realm::Arcane) => Spell::get("Detect Invisible"),
            Some(crate::dex::Realm::Divine) => Spell::get("Sense Invisible"),
            None => return false,
        };
        game.cast(spell, None)
    }
}

//////////////////////////////////////////////////////////////////////////////

// Panic buttons

pub struct MassBanishment;

impl DefenseAction for MassBanishment {
    fn label(&self) -> &'static str { "mass banishment" }

    fn score(&self, ctx: &Ctx) -> i32 {
        let state = ctx.state;
        let spell = Spell::get("Mass Banishment");
        if !state.player.can_cast(spell) { return 0; }
        if !state.inventory.books[spell.book] { return 0; }

        let danger = ctx.danger(state.player.pos, 1, true, false);
        if danger <= 2 * avoidance(state) { return 0; }
        danger - 2 * spell.mana
    }

    fn commit(&self, _: &Ctx, game: &mut dyn GameControl) -> bool {
        game.cast(Spell::get("Mass Banishment"), None)
    }
}

pub struct Earthquake;

impl DefenseAction for Earthquake {
    fn label(&self) -> &'static str { "earthquake" }

    fn score(&self, ctx: &Ctx) -> i32 {
        let state = ctx.state;
        let spell = Spell::get("Earthquake");
        if !state.player.can_cast(spell) { return 0; }
        if !state.inventory.books[spell.book] { return 0; }

        // Buries the melee crowd; useless against archers at range.
        let crowd: i32 = state.monsters.iter()
            .filter(|(_, m)| m.seen && m.awake)
            .filter(|(_, m)| (m.pos - state.player.pos).len_range() <= 2)
            .map(|(_, m)| m.race.melee)
            .sum();
        if crowd <= avoidance(state) { return 0; }
        crowd - 2 * spell.mana
    }

    fn commit(&self, _: &Ctx, game: &mut dyn GameControl) -> bool {
        game.cast(Spell::get("Earthquake"), None)
    }
}

pub struct Destruction;

impl DefenseAction for Destruction {
    fn label(&self) -> &'static str { "destruction" }

    fn score(&self, ctx: &Ctx) -> i32 {
        let state = ctx.state;
        let spell = Spell::get("Word of Destruction");
        if !state.player.can_cast(spell) { return 0; }
        if !state.inventory.books[spell.book] { return 0; }

        let danger = ctx.danger(state.player.pos, 1, true, false);
        if danger <= 3 * avoidance(state) { return 0; }
        danger
    }

    fn commit(&self, _: &Ctx, game: &mut dyn GameControl) -> bool {
        game.cast(Spell::get("Word of Destruction"), None)
    }
}

//////////////////////////////////////////////////////////////////////////////

// Scouting

// Remembered-but-unseen monsters still project danger; shifting the view
// panel toward them re-acquires their positions before they close in.
pub struct ShiftPanel;

impl ShiftPanel {
    fn lurker(ctx: &Ctx) -> Option<Point> {
        let state = ctx.state;
        state.monsters.iter()
            .filter(|(_, m)| !m.seen && state.turn - m.last_seen < 20)
            .map(|(_, m)| m.pos)
            .min_by_key(|&pos| (pos - state.player.pos).len_range())
    }
}

impl DefenseAction for ShiftPanel {
    fn label(&self) -> &'static str { "shift panel" }

    fn score(&self, ctx: &Ctx) -> i32 {
        if ctx.state.player.blind { return 0; }
        let pos = ctx.state.player.pos;
        let unseen = ctx.danger(pos, 1, true, false)
            - ctx.danger(pos, 1, false, false);
        if unseen <= 0 { return 0; }
        if Self::lurker(ctx).is_none() { return 0; }
        5
    }

    fn commit(&self, ctx: &Ctx, game: &mut dyn GameControl) -> bool {
        let Some(target) = Self::lurker(ctx) else { return false; };
        let dir = (target - ctx.state.player.pos).signum();
        game.send(&Command::Locate(dir));
        true
    }
}

//////////////////////////////////////////////////////////////////////////////

// Escape

// The tiered escape machine. The tier is keyed on the ratio of current
// danger to what we can absorb; each tier tries its methods in order, and a
// failed roll falls through to the next method, then to the next tier's
// cheaper measures. Success sets the sticky fleeing flag.
pub fn escape(state: &mut BorgState, model: &dyn DangerModel,
              game: &mut dyn GameControl) -> bool {
    let pos = state.player.pos;
    let danger = model.danger(state, pos, 1, true, false);
    let avoid = max(avoidance(state), 1);
    let mut ratio = danger * 10 / avoid;
    if state.player.heavy_stun() { ratio += 10; }
    if ratio < 6 { return false; }

    if ratio >= 50 {
        if take_stairs(state, game) { return true; }
        if cast_teleport(state, game, true) { return true; }
        if read_teleport(state, game) { return true; }
        if zap_teleport_staff(state, game) { return true; }
        if phase_door(state, model, game) { return true; }
        if teleport_level(state, game) { return true; }
    }
    if ratio >= 30 {
        if take_stairs(state, game) { return true; }
        if cast_teleport(state, game, false) { return true; }
        if read_teleport(state, game) { return true; }
        if zap_teleport_staff(state, game) { return true; }
        if phase_door(state, model, game) { return true; }
    }
    if ratio >= 20 {
        if take_stairs(state, game) { return true; }
        if cast_teleport(state, game, false) { return true; }
        if phase_door(state, model, game) { return true; }
    }
    if ratio >= 15 {
        if phase_door(state, model, game) { return true; }
    }
    if ratio >= 10 {
        if take_stairs(state, game) { return true; }
    }
    // Not worth a consumable yet; mark the retreat so the goal selectors
    // stop picking fights and start heading for cover.
    state.fleeing = true;
    false
}

fn take_stairs(state: &mut BorgState, game: &mut dyn GameControl) -> bool {
    let command = match state.map.grid(state.player.pos).feature {
        Feature::StairsUp => Command::StairsUp,
        Feature::StairsDown => Command::StairsDown,
        _ => return false,
    };
    game.send(&command);
    state.fleeing = true;
    state.leaving = true;
    true
}

fn cast_teleport(state: &mut BorgState, game: &mut dyn GameControl,
                 emergency: bool) -> bool {
    let Some(spell) = state.player.class.reserve_spell() else { return false; };
    if !state.player.knows(spell) { return false; }
    if state.player.sp < spell.mana { return false; }
    if !state.inventory.books[spell.book] { return false; }
    if !emergency {
        if state.player.blind || state.player.confused { return false; }
        if state.player.fail_chance(spell) > ESCAPE_FAIL_LIMIT { return false; }
    }
    if !game.cast(spell, None) { return false; }
    state.fleeing = true;
    true
}

fn read_teleport(state: &mut BorgState, game: &mut dyn GameControl) -> bool {
    if state.player.blind || state.player.confused { return false; }
    if state.inventory.scroll_count(Scroll::Teleport) <= 0 { return false; }
    if !game.read_scroll(Scroll::Teleport) { return false; }
    state.fleeing = true;
    true
}

fn zap_teleport_staff(state: &mut BorgState,
                      game: &mut dyn GameControl) -> bool {
    let staff = Device::get("Staff of Teleportation");
    if state.inventory.charges(staff) <= 0 { return false; }
    if !game.use_device(staff, None) { return false; }
    state.fleeing = true;
    true
}

fn teleport_level(state: &mut BorgState, game: &mut dyn GameControl) -> bool {
    let committed = if state.inventory.scroll_count(Scroll::TeleportLevel) > 0
            && !state.player.blind && !state.player.confused {
        game.read_scroll(Scroll::TeleportLevel)
    } else {
        let spell = Spell::get("Teleport Level");
        state.player.can_cast(spell)
            && state.inventory.books[spell.book]
            && game.cast(spell, None)
    };
    if !committed { return false; }
    state.fleeing = true;
    state.leaving = true;
    true
}

// Phase Door is short-ranged: only worth it when enough nearby grids are
// calmer than this one.
fn phase_safe(state: &BorgState, model: &dyn DangerModel) -> bool {
    let pos = state.player.pos;
    let here = model.danger(state, pos, 1, true, false);
    let mut safe = 0;
    for dx in -PHASE_RANGE..=PHASE_RANGE {
        for dy in -PHASE_RANGE..=PHASE_RANGE {
            let landing = pos + Point(dx, dy);
            let range = (landing - pos).len_range();
            if range < 2 || range > PHASE_RANGE { continue; }
            if !state.map.grid(landing).feature.is_passable() { continue; }
            if model.danger(state, landing, 1, true, false) < here / 2 {
                safe += 1;
            }
        }
    }
    safe >= PHASE_SAFE_GRIDS
}

fn phase_door(state: &mut BorgState, model: &dyn DangerModel,
              game: &mut dyn GameControl) -> bool {
    if !phase_safe(state, model) { return false; }

    let spell = Spell::get("Phase Door");
    let can_cast = state.player.can_cast(spell)
        && state.inventory.books[spell.book];
    let committed = if can_cast {
        game.cast(spell, None)
    } else if state.inventory.scroll_count(Scroll::PhaseDoor) > 0
            && !state.player.blind && !state.player.confused {
        game.read_scroll(Scroll::PhaseDoor)
    } else {
        false
    };
    if !committed { return false; }
    state.fleeing = true;
    true
}

//////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use crate::danger::MonsterDanger;
    use crate::dex::MonsterRace;
    use crate::player::Class;
    use crate::test_support::{open_state, MockControl};

    fn mage(state: &mut BorgState) {
        state.player.class = Class::Mage;
        state.player.level = 30;
        state.player.sp = 50;
        state.player.max_sp = 50;
        state.inventory.books = [true; 4];
    }

    #[test]
    fn test_buff_scores_danger_delta_without_mutation() {
        let mut state = open_state(Point(30, 20), 20);
        mage(&mut state);
        let pos = state.player.pos;
        for i in 0..3 {
            let mid = state.monsters.add(
                MonsterRace::get("stone giant"), pos + Point(2 + i, 0), 0);
            state.monsters[mid].awake = true;
        }

        let model = MonsterDanger;
        let ctx = Ctx::new(&state, &model);
        let haste = SpellBuff { name: "Haste Self", flags: FX_FAST };

        let before = state.fingerprint();
        let score = haste.score(&ctx);
        assert!(score > 0);
        assert_eq!(state.fingerprint(), before);

        // Already hasted: nothing to gain.
        let mut hasted = open_state(Point(30, 20), 20);
        mage(&mut hasted);
        hasted.effects.set(FX_FAST, true);
        let ctx = Ctx::new(&hasted, &model);
        assert_eq!(haste.score(&ctx), 0);
    }

    #[test]
    fn test_escape_tier_one_tries_teleport_first() {
        let mut state = open_state(Point(30, 20), 20);
        mage(&mut state);
        state.player.hp = 20;
        state.player.max_hp = 150;
        state.player.stun = 60;
        state.inventory.add_scrolls(Scroll::Teleport, 2);
        let pos = state.player.pos;

        // Enough danger that danger / avoidance lands in the top tier.
        for i in 0..2 {
            let mid = state.monsters.add(
                MonsterRace::get("fire giant"), pos + Point(1, i), 0);
            state.monsters[mid].awake = true;
        }
        let model = MonsterDanger;
        let danger = model.danger(&state, pos, 1, true, false);
        assert!(danger * 10 / avoidance(&state) + 10 >= 50);

        let mut game = MockControl::new();
        assert!(escape(&mut state, &model, &mut game));
        assert_eq!(game.casts, vec![("Teleport Self", None)]);
        assert!(game.scrolls.is_empty());
        assert!(state.fleeing);
    }

    #[test]
    fn test_escape_falls_through_on_failed_roll() {
        let mut state = open_state(Point(30, 20), 20);
        mage(&mut state);
        state.player.hp = 20;
        state.player.stun = 60;
        state.inventory.add_scrolls(Scroll::Teleport, 2);
        let pos = state.player.pos;
        for i in 0..2 {
            let mid = state.monsters.add(
                MonsterRace::get("fire giant"), pos + Point(1, i), 0);
            state.monsters[mid].awake = true;
        }

        // The cast fizzles; the scroll is next in line.
        let model = MonsterDanger;
        let mut game = MockControl::failing(1);
        assert!(escape(&mut state, &model, &mut game));
        assert!(game.casts.is_empty());
        assert_eq!(game.scrolls, vec![Scroll::Teleport]);
    }

    #[test]
    fn test_escape_zaps_the_staff_without_a_spell() {
        let mut state = open_state(Point(30, 20), 20);
        state.player.hp = 20;
        state.player.max_hp = 150;
        state.inventory.add_device(Device::get("Staff of Teleportation"), 3);
        let pos = state.player.pos;
        for i in 0..2 {
            let mid = state.monsters.add(
                MonsterRace::get("fire giant"), pos + Point(1, i), 0);
            state.monsters[mid].awake = true;
        }

        // A warrior with no spell and no scroll still gets out.
        let model = MonsterDanger;
        let mut game = MockControl::new();
        assert!(escape(&mut state, &model, &mut game));
        assert_eq!(game.devices, vec![("Staff of Teleportation", None)]);
        assert!(state.fleeing);
    }

    #[test]
    fn test_escape_takes_stairs_when_standing_on_them() {
        let mut state = open_state(Point(30, 20), 20);
        mage(&mut state);
        state.player.hp = 20;
        let pos = state.player.pos;
        state.map.set_feature(pos, Feature::StairsDown);
        for i in 0..2 {
            let mid = state.monsters.add(
                MonsterRace::get("fire giant"), pos + Point(1, i), 0);
            state.monsters[mid].awake = true;
        }

        let model = MonsterDanger;
        let mut game = MockControl::new();
        assert!(escape(&mut state, &model, &mut game));
        assert_eq!(game.commands, vec![Command::StairsDown]);
        assert!(state.leaving);
    }

    #[test]
    fn test_low_ratio_sets_fleeing_without_spending() {
        let mut state = open_state(Point(30, 20), 20);
        state.player.hp = 40;
        state.player.max_hp = 150;
        state.inventory.add_scrolls(Scroll::Teleport, 2);
        let pos = state.player.pos;
        for dir in [Point(1, 0), Point(0, 1)] {
            let mid = state.monsters.add(
                MonsterRace::get("soldier"), pos + dir, 0);
            state.monsters[mid].awake = true;
        }

        let model = MonsterDanger;
        let danger = model.danger(&state, pos, 1, true, false);
        let ratio = danger * 10 / avoidance(&state);
        assert!((6..10).contains(&ratio));

        let mut game = MockControl::new();
        assert!(!escape(&mut state, &model, &mut game));
        assert!(state.fleeing);
        assert!(game.scrolls.is_empty());
        assert!(game.commands.is_empty());
    }

    #[test]
    fn test_teleport_other_picks_biggest_threat() {
        let mut state = open_state(Point(30, 20), 20);
        mage(&mut state);
        state.player.hp = 10;
        let pos = state.player.pos;
        let small = state.monsters.add(
            MonsterRace::get("kobold"), pos + Point(1, 0), 0);
        state.monsters[small].awake = true;
        let big = state.monsters.add(
            MonsterRace::get("stone giant"), pos + Point(0, 2), 0);
        state.monsters[big].awake = true;

        let model = MonsterDanger;
        let ctx = Ctx::new(&state, &model);
        let action = TeleportOther;
        assert!(action.score(&ctx) > 0);

        let mut game = MockControl::new();
        assert!(action.commit(&ctx, &mut game));
        assert_eq!(game.casts, vec![("Teleport Other", Some(pos + Point(0, 2)))]);
    }

    #[test]
    fn test_cure_wounds_quaffs_only_under_threat() {
        let mut state = open_state(Point(30, 20), 20);
        state.player.hp = 30;
        state.player.max_hp = 150;
        state.inventory.add_potions(Potion::CureSeriousWounds, 2);
        state.inventory.add_potions(Potion::Healing, 1);

        // Hurt but unthreatened: save the potions and rest instead.
        let model = MonsterDanger;
        let action = CureWounds;
        let ctx = Ctx::new(&state, &model);
        assert_eq!(action.score(&ctx), 0);

        let pos = state.player.pos;
        for i in 0..2 {
            let mid = state.monsters.add(
                MonsterRace::get("stone giant"), pos + Point(1, i), 0);
            state.monsters[mid].awake = true;
        }
        let ctx = Ctx::new(&state, &model);
        assert!(action.score(&ctx) > 0);

        // Missing over half: reach for the big potion.
        let mut game = MockControl::new();
        assert!(action.commit(&ctx, &mut game));
        assert_eq!(game.quaffs, vec![Potion::Healing]);
    }

    #[test]
    fn test_glyph_falls_back_to_rune_scrolls() {
        let mut state = open_state(Point(30, 20), 20);
        state.player.hp = 30;
        state.player.max_hp = 150;
        state.inventory.add_scrolls(Scroll::Rune, 2);
        let pos = state.player.pos;
        let mid = state.monsters.add(
            MonsterRace::get("stone giant"), pos + Point(1, 0), 0);
        state.monsters[mid].awake = true;

        // A warrior cannot cast the spell but can still scribe the scroll.
        let model = MonsterDanger;
        let ctx = Ctx::new(&state, &model);
        let action = GlyphWard;
        assert!(action.score(&ctx) > 0);

        let mut game = MockControl::new();
        assert!(action.commit(&ctx, &mut game));
        assert!(game.casts.is_empty());
        assert_eq!(game.scrolls, vec![Scroll::Rune]);
    }

    #[test]
    fn test_shift_panel_hunts_remembered_monsters() {
        let mut state = open_state(Point(30, 20), 20);
        state.turn = 10;
        let pos = state.player.pos;
        let mid = state.monsters.add(
            MonsterRace::get("fire giant"), pos + Point(8, 0), 0);
        state.monsters[mid].awake = true;
        state.monsters[mid].seen = false;
        state.monsters[mid].last_seen = 5;

        let model = MonsterDanger;
        let ctx = Ctx::new(&state, &model);
        let action = ShiftPanel;
        assert!(action.score(&ctx) > 0);

        let mut game = MockControl::new();
        assert!(action.commit(&ctx, &mut game));
        assert_eq!(game.commands, vec![Command::Locate(Point(1, 0))]);
    }
}
