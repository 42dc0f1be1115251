use std::fmt::Write;

use rand::SeedableRng;

use crate::attack::{attack_registry, best_attack, AttackAction};
use crate::base::{dirs, sample, Point, RNG};
use crate::danger::{fear_threshold, Ctx, DangerModel, MonsterDanger};
use crate::defend::{best_defense, defense_registry, escape, DefenseAction};
use crate::flow::Flow;
use crate::goals::{self, Goal};
use crate::player::{Command, GameControl};
use crate::state::{BorgState, STUCK_LIMIT};
use crate::step::execute_step;

//////////////////////////////////////////////////////////////////////////////

// Decision

// What take_turn committed to, for the host's log.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Decision {
    Escaped,
    Defended(&'static str),
    Attacked(&'static str),
    Stepped(Goal),
    TookStairs,
    Rested,
    Twitched,
    Waited,
}

//////////////////////////////////////////////////////////////////////////////

// Borg

// The tactical controller. Owns the perception snapshot, the flow engine,
// both action registries, and the danger oracle; commits at most one game
// command per take_turn call.
pub struct Borg {
    pub state: BorgState,
    flow: Flow,
    attacks: Vec<Box<dyn AttackAction>>,
    defenses: Vec<Box<dyn DefenseAction>>,
    model: Box<dyn DangerModel>,
    rng: RNG,
    prev_step: Option<Point>,
    prev_pos: Option<Point>,
}

impl Borg {
    pub fn new(seed: u64) -> Self {
        Self::with_model(seed, Box::new(MonsterDanger))
    }

    pub fn with_model(seed: u64, model: Box<dyn DangerModel>) -> Self {
        Self {
            state: BorgState::new(),
            flow: Flow::new(),
            attacks: attack_registry(),
            defenses: defense_registry(),
            model,
            rng: RNG::seed_from_u64(seed),
            prev_step: None,
            prev_pos: None,
        }
    }

    pub fn goal(&self) -> Goal { self.flow.goal }

    // One full decision: escape, then defense, then attack, then movement
    // along a committed or freshly-selected flow, then rest, then the
    // liveness fallback. Exactly one command is committed.
    pub fn take_turn(&mut self, game: &mut dyn GameControl) -> Decision {
        self.bookkeeping();

        if escape(&mut self.state, self.model.as_ref(), game) {
            self.flow.reset_goal();
            return Decision::Escaped;
        }

        {
            let ctx = Ctx::new(&self.state, self.model.as_ref());
            if let Some((index, _)) = best_defense(&self.defenses, &ctx) {
                if self.defenses[index].commit(&ctx, game) {
                    return Decision::Defended(self.defenses[index].label());
                }
            }
        }

        {
            let ctx = Ctx::new(&self.state, self.model.as_ref());
            if let Some((index, _, target)) = best_attack(&self.attacks, &ctx) {
                if self.attacks[index].commit(&ctx, target, game) {
                    self.state.stuck = 0;
                    return Decision::Attacked(self.attacks[index].label());
                }
            }
        }

        if let Some(decision) = self.follow_flow(game) { return decision; }
        if let Some(decision) = self.select_goal(game) { return decision; }

        let pos = self.state.player.pos;
        let danger = self.model.danger(&self.state, pos, 1, true, false);
        let player = &self.state.player;
        if danger == 0 && (player.hp < player.max_hp || player.sp < player.max_sp) {
            game.send(&Command::Rest(50));
            return Decision::Rested;
        }

        self.twitch(game)
    }

    pub fn debug(&self, out: &mut String) {
        let pos = self.state.player.pos;
        let danger = self.model.danger(&self.state, pos, 1, true, false);
        let _ = writeln!(out, "Borg: depth {} pos ({}, {})",
                         self.state.depth(), pos.0, pos.1);
        let _ = writeln!(out, "  goal: {:?}; danger: {}; fear: {}",
                         self.flow.goal, danger, fear_threshold(&self.state));
        let _ = writeln!(out, "  fleeing: {}; leaving: {}; twitchy: {}; stuck: {}",
                         self.state.fleeing, self.state.leaving,
                         self.state.twitchy, self.state.stuck);
        let _ = writeln!(out, "  monsters: {}; turns on level: {}",
                         self.state.monsters.len(), self.state.turns_on_level);
        self.flow.debug(&self.state, out);
    }

    fn bookkeeping(&mut self) {
        self.state.turn += 1;
        self.state.turns_on_level += 1;
        self.state.record_happy_grid();

        let pos = self.state.player.pos;
        if self.prev_pos == Some(pos) {
            self.state.stuck += 1;
        } else {
            self.state.stuck = 0;
        }
        self.prev_pos = Some(pos);
        self.state.twitchy = self.state.stuck > STUCK_LIMIT;

        // A goal plotted before the world changed may now lead through
        // fire; drop it and re-plan.
        if self.flow.goal != Goal::None {
            let danger = self.model.danger(&self.state, pos, 1, true, false);
            if danger > fear_threshold(&self.state) {
                self.flow.reset_goal();
            }
        }
    }

    // Walks the committed flow, handling arrival. Returns None when there
    // is no usable flow and the caller should pick a new goal.
    fn follow_flow(&mut self, game: &mut dyn GameControl) -> Option<Decision> {
        if self.flow.goal == Goal::None { return None; }
        let pos = self.state.player.pos;

        if self.flow.active().cost.get(pos) == 0 {
            let goal = self.flow.goal;
            self.flow.reset_goal();
            match goal {
                Goal::StairDown => {
                    game.send(&Command::StairsDown);
                    self.state.fleeing = false;
                    self.state.leaving = false;
                    return Some(Decision::TookStairs);
                }
                Goal::StairUp => {
                    game.send(&Command::StairsUp);
                    self.state.fleeing = false;
                    self.state.leaving = false;
                    return Some(Decision::TookStairs);
                }
                Goal::Take => {
                    game.send(&Command::PickUp);
                    return Some(Decision::Stepped(goal));
                }
                Goal::Recover => {
                    self.state.fleeing = false;
                    return None;
                }
                _ => return None,
            }
        }

        let ctx = Ctx::new(&self.state, self.model.as_ref());
        let Some(step) = self.flow.next_step(&ctx, &mut self.rng, self.prev_step)
        else {
            self.flow.reset_goal();
            return None;
        };
        execute_step(&self.state, step, game);
        self.prev_step = Some(step);
        Some(Decision::Stepped(self.flow.goal))
    }

    // The goal selectors, in priority order. The first one that commits a
    // reachable flow wins; we immediately take its first step.
    fn select_goal(&mut self, game: &mut dyn GameControl) -> Option<Decision> {
        {
            let ctx = Ctx::new(&self.state, self.model.as_ref());
            let flow = &mut self.flow;

            let mut committed = false;
            if ctx.state.fleeing {
                committed = goals::flow_recover(flow, &ctx)
                    || goals::flow_stairs_up(flow, &ctx)
                    || goals::flow_stairs_down(flow, &ctx);
            }
            committed = committed
                || goals::flow_anti_summon(flow, &ctx)
                || goals::flow_glyph_sea(flow, &ctx)
                || goals::flow_kill(flow, &ctx)
                || goals::flow_take(flow, &ctx)
                || goals::flow_shop(flow, &ctx)
                || goals::flow_dark(flow, &ctx, true)
                || goals::flow_vein(flow, &ctx)
                || goals::flow_dark(flow, &ctx, false)
                || goals::flow_stairs_down(flow, &ctx)
                || goals::flow_recover(flow, &ctx);
            if !committed { return None; }
        }
        self.follow_flow(game)
    }

    // Liveness fallback: a uniformly random legal step beats standing in
    // place forever when every planner came up empty.
    fn twitch(&mut self, game: &mut dyn GameControl) -> Decision {
        self.state.stuck += 1;
        let pos = self.state.player.pos;
        let mut options = vec![];
        for &dir in &dirs::ALL {
            let grid = self.state.map.grid(pos + dir);
            if !grid.feature.is_passable() { continue; }
            if grid.monster.is_some() { continue; }
            options.push(dir);
        }
        if options.is_empty() {
            game.send(&Command::Rest(1));
            return Decision::Waited;
        }
        let dir = *sample(&options, &mut self.rng);
        execute_step(&self.state, dir, game);
        self.prev_step = Some(dir);
        Decision::Twitched
    }
}

//////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dex::MonsterRace;
    use crate::map::Feature;
    use crate::player::Scroll;
    use crate::test_support::{open_state, MockControl};

    fn commands_issued(game: &MockControl) -> usize {
        game.commands.len() + game.casts.len() + game.scrolls.len()
            + game.quaffs.len() + game.devices.len() + game.fired.len()
            + game.thrown.len()
    }

    // An all-floor room sealed by a granite ring, so exploration has no
    // frontier to chase.
    fn sealed_state(size: Point, depth: i32) -> BorgState {
        let mut state = open_state(size, depth);
        for x in 0..size.0 {
            for y in 0..size.1 {
                if x == 0 || y == 0 || x == size.0 - 1 || y == size.1 - 1 {
                    state.map.set_feature(Point(x, y), Feature::Granite);
                }
            }
        }
        state
    }

    #[test]
    fn test_turn_attacks_adjacent_monster() {
        let mut borg = Borg::new(7);
        borg.state = sealed_state(Point(12, 12), 5);
        let pos = borg.state.player.pos;
        let mid = borg.state.monsters.add(
            MonsterRace::get("kobold"), pos + dirs::E, 0);
        borg.state.monsters[mid].awake = true;
        if let Some(grid) = borg.state.map.grid_mut(pos + dirs::E) {
            grid.monster = Some(mid);
        }

        let mut game = MockControl::new();
        let decision = borg.take_turn(&mut game);
        assert_eq!(decision, Decision::Attacked("melee"));
        assert_eq!(game.commands, vec![Command::Attack(dirs::E)]);
        assert_eq!(commands_issued(&game), 1);
    }

    #[test]
    fn test_turn_explores_toward_the_frontier() {
        let mut borg = Borg::new(7);
        borg.state = open_state(Point(10, 10), 5);

        let mut game = MockControl::new();
        let decision = borg.take_turn(&mut game);
        assert_eq!(decision, Decision::Stepped(Goal::Dark));
        assert_eq!(commands_issued(&game), 1);
        assert!(matches!(game.commands[0], Command::Move(_)));
    }

    #[test]
    fn test_turn_rests_when_hurt_and_safe() {
        let mut borg = Borg::new(7);
        borg.state = sealed_state(Point(12, 12), 5);
        borg.state.player.hp = 80;

        let mut game = MockControl::new();
        assert_eq!(borg.take_turn(&mut game), Decision::Rested);
        assert_eq!(game.commands, vec![Command::Rest(50)]);
    }

    #[test]
    fn test_turn_escapes_before_fighting() {
        let mut borg = Borg::new(7);
        borg.state = sealed_state(Point(12, 12), 20);
        borg.state.player.hp = 20;
        borg.state.inventory.add_scrolls(Scroll::Teleport, 3);
        let pos = borg.state.player.pos;
        for dir in [dirs::E, dirs::W] {
            let mid = borg.state.monsters.add(
                MonsterRace::get("fire giant"), pos + dir, 0);
            borg.state.monsters[mid].awake = true;
        }

        let mut game = MockControl::new();
        assert_eq!(borg.take_turn(&mut game), Decision::Escaped);
        assert_eq!(game.scrolls, vec![Scroll::Teleport]);
        assert!(game.commands.is_empty());
        assert!(borg.state.fleeing);
    }

    #[test]
    fn test_turn_takes_stairs_on_arrival() {
        let mut borg = Borg::new(7);
        borg.state = sealed_state(Point(12, 12), 5);
        borg.state.scumming = true;
        let pos = borg.state.player.pos;
        borg.state.map.set_feature(pos, Feature::StairsDown);

        let mut game = MockControl::new();
        assert_eq!(borg.take_turn(&mut game), Decision::TookStairs);
        assert_eq!(game.commands, vec![Command::StairsDown]);
    }

    #[test]
    fn test_turn_twitches_rather_than_stalling() {
        let mut borg = Borg::new(7);
        borg.state = sealed_state(Point(12, 12), 5);
        // Full health, nothing to kill, nowhere to explore, no stairs.
        let mut game = MockControl::new();
        assert_eq!(borg.take_turn(&mut game), Decision::Twitched);
        assert_eq!(commands_issued(&game), 1);
        assert!(matches!(game.commands[0], Command::Move(_)));
    }

    #[test]
    fn test_scoring_never_mutates_state() {
        let mut state = open_state(Point(20, 20), 10);
        state.player.class = crate::player::Class::Mage;
        state.player.level = 25;
        state.player.sp = 40;
        state.player.max_sp = 40;
        state.inventory.books = [true; 4];
        let pos = state.player.pos;
        for dir in [Point(2, 0), Point(0, 3), Point(4, 4)] {
            let mid = state.monsters.add(
                MonsterRace::get("stone giant"), pos + dir, 0);
            state.monsters[mid].awake = true;
        }

        let model = MonsterDanger;
        let ctx = Ctx::new(&state, &model);
        let before = state.fingerprint();
        let _ = best_attack(&attack_registry(), &ctx);
        let _ = best_defense(&defense_registry(), &ctx);
        assert_eq!(state.fingerprint(), before);
    }

    #[test]
    fn test_debug_dump_mentions_the_basics() {
        let mut borg = Borg::new(7);
        borg.state = sealed_state(Point(12, 12), 5);
        let mut out = String::new();
        borg.debug(&mut out);
        assert!(out.contains("depth 5"));
        assert!(out.contains("goal: None"));
    }
}
