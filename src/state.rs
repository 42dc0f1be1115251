use std::hash::{Hash, Hasher};

use crate::base::{HashSet, Point};
use crate::map::{DungeonMap, Take};
use crate::monsters::MonsterMap;
use crate::player::{Inventory, Player};

//////////////////////////////////////////////////////////////////////////////

// Constants

// Turns spent on one level before the fear threshold starts decaying and
// the twitchy counter kicks in.
pub const LEVEL_TIME_BUDGET: i32 = 1000;

// Consecutive turns without progress before we force a random step.
pub const STUCK_LIMIT: i32 = 100;

//////////////////////////////////////////////////////////////////////////////

// EffectSet

pub const FX_BLESS: u32 = 1 << 0;
pub const FX_HERO: u32 = 1 << 1;
pub const FX_BERSERK: u32 = 1 << 2;
pub const FX_SHIELD: u32 = 1 << 3;
pub const FX_FAST: u32 = 1 << 4;
pub const FX_PROT_EVIL: u32 = 1 << 5;
pub const FX_RES_FIRE: u32 = 1 << 6;
pub const FX_RES_COLD: u32 = 1 << 7;
pub const FX_RES_ELEC: u32 = 1 << 8;
pub const FX_RES_ACID: u32 = 1 << 9;
pub const FX_RES_POIS: u32 = 1 << 10;
pub const FX_SEE_INV: u32 = 1 << 11;

// Active temporary effects, as a copyable bitset. Defensive actions score
// themselves by re-running the danger model on a copy with one bit toggled,
// so this type must stay cheap to copy and independent of the rest of the
// state snapshot.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct EffectSet(pub u32);

impl EffectSet {
    pub fn has(self, flag: u32) -> bool { self.0 & flag != 0 }

    pub fn with(self, flag: u32) -> EffectSet { EffectSet(self.0 | flag) }

    pub fn set(&mut self, flag: u32, on: bool) {
        if on { self.0 |= flag; } else { self.0 &= !flag; }
    }
}

//////////////////////////////////////////////////////////////////////////////

// BorgState

// The complete perception snapshot plus the sticky tactical flags. The
// perception layer rewrites map/monsters/player/inventory each turn; the
// engine owns the flags.
#[derive(Default)]
pub struct BorgState {
    pub map: DungeonMap,
    pub monsters: MonsterMap,
    pub takes: Vec<Take>,
    pub player: Player,
    pub inventory: Inventory,
    pub effects: EffectSet,

    // Grids worth retreating to: doorways, corridor ends, pillars, stairs.
    pub happy_grids: HashSet<Point>,

    // Bookkeeping:
    pub turn: i32,
    pub turns_on_level: i32,
    pub stuck: i32,

    // Sticky tactical flags:
    pub fleeing: bool,
    pub leaving: bool,
    pub twitchy: bool,
    pub ignoring: i32,
    pub scumming: bool,
    pub shop_goal: Option<u8>,
    pub in_vault: bool,
}

impl BorgState {
    pub fn new() -> Self { Self::default() }

    // Called when the perception layer reports a new level.
    pub fn enter_level(&mut self, depth: i32) {
        self.map.reset(depth);
        self.monsters.clear();
        self.takes.clear();
        self.happy_grids.clear();
        self.turns_on_level = 0;
        self.stuck = 0;
        self.fleeing = false;
        self.leaving = false;
        self.twitchy = false;
        self.in_vault = false;
    }

    pub fn depth(&self) -> i32 { self.map.depth }

    pub fn in_town(&self) -> bool { self.map.depth == 0 }

    // Remember the current grid if it is a defensible spot. Corridors and
    // doorways limit the directions we can be attacked from; stairs give an
    // instant exit.
    pub fn record_happy_grid(&mut self) {
        let pos = self.player.pos;
        let feature = self.map.grid(pos).feature;
        if feature.is_stair() || feature.is_door() {
            self.happy_grids.insert(pos);
            return;
        }
        let walls = crate::base::dirs::CARDINAL.iter()
            .filter(|&&dir| self.map.grid(pos + dir).feature.is_wall())
            .count();
        if walls >= 2 { self.happy_grids.insert(pos); }
    }

    // A stable digest of everything the danger model reads. Score paths must
    // not perturb it; tests snapshot it around each score call.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = fxhash::FxHasher64::default();
        self.map.depth.hash(&mut hasher);
        for (i, grid) in self.map.grids.data.iter().enumerate() {
            if !grid.known() { continue; }
            i.hash(&mut hasher);
            grid.feature.hash(&mut hasher);
            grid.glow.hash(&mut hasher);
            grid.view.hash(&mut hasher);
        }
        for (mid, monster) in &self.monsters {
            mid.hash(&mut hasher);
            monster.pos.hash(&mut hasher);
            monster.hp.hash(&mut hasher);
            monster.awake.hash(&mut hasher);
            monster.seen.hash(&mut hasher);
        }
        self.player.pos.hash(&mut hasher);
        self.player.hp.hash(&mut hasher);
        self.player.sp.hash(&mut hasher);
        self.effects.hash(&mut hasher);
        hasher.finish()
    }
}

//////////////////////////////////////////////////////////////////////////////
