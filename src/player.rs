use crate::base::{HashMap, Point, clamp, dirs};
use crate::dex::{Brand, Device, Realm, Spell};

//////////////////////////////////////////////////////////////////////////////

// Constants

pub const MAX_RANGE: i32 = 18;

const HEAVY_STUN: i32 = 50;

//////////////////////////////////////////////////////////////////////////////

// Class

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Class { Warrior, Mage, Priest, Rogue, Ranger, Paladin }

impl Class {
    pub fn realm(self) -> Option<Realm> {
        match self {
            Class::Warrior => None,
            Class::Mage | Class::Rogue | Class::Ranger => Some(Realm::Arcane),
            Class::Priest | Class::Paladin => Some(Realm::Divine),
        }
    }

    // The escape spell whose mana cost we always hold in reserve.
    pub fn reserve_spell(self) -> Option<&'static Spell> {
        match self.realm() {
            Some(Realm::Arcane) => Some(Spell::get("Teleport Self")),
            Some(Realm::Divine) => Some(Spell::get("Portal")),
            None => None,
        }
    }
}

//////////////////////////////////////////////////////////////////////////////

// Player

// Per-turn scalar snapshot of the agent. Mutated by the perception layer;
// read everywhere in the core.
#[derive(Clone)]
pub struct Player {
    pub pos: Point,
    pub hp: i32,
    pub max_hp: i32,
    pub sp: i32,
    pub max_sp: i32,
    pub level: i32,
    pub speed: i32,
    pub class: Class,
    pub food: i32,
    pub light: i32,

    // Status effects:
    pub stun: i32,
    pub cut: i32,
    pub afraid: bool,
    pub blind: bool,
    pub confused: bool,
    pub poisoned: bool,

    // Skills:
    pub disarm_skill: i32,
    pub dig_skill: i32,
}

impl Default for Player {
    fn default() -> Self {
        Self {
            pos: Point(1, 1),
            hp: 20,
            max_hp: 20,
            sp: 0,
            max_sp: 0,
            level: 1,
            speed: 110,
            class: Class::Warrior,
            food: 5000,
            light: 2,
            stun: 0,
            cut: 0,
            afraid: false,
            blind: false,
            confused: false,
            poisoned: false,
            disarm_skill: 20,
            dig_skill: 10,
        }
    }
}

impl Player {
    pub fn heavy_stun(&self) -> bool { self.stun > HEAVY_STUN }

    pub fn hungry(&self) -> bool { self.food < 1000 }

    pub fn starving(&self) -> bool { self.food < 100 }

    pub fn knows(&self, spell: &Spell) -> bool {
        self.class.realm() == Some(spell.realm) && self.level >= spell.level
    }

    // Whether a cast can be attempted right now, leaving aside the mana
    // reserve policy (the action scorer applies that separately).
    pub fn can_cast(&self, spell: &Spell) -> bool {
        self.knows(spell) && self.sp >= spell.mana && !self.blind && !self.confused
    }

    pub fn fail_chance(&self, spell: &Spell) -> i32 {
        let mut fail = spell.fail - 3 * (self.level - spell.level);
        if self.stun > 0 { fail += if self.heavy_stun() { 25 } else { 15 }; }
        if self.sp < spell.mana { fail += 5 * (spell.mana - self.sp); }
        clamp(fail, 2, 95)
    }

    pub fn device_fail_chance(&self, device: &Device) -> i32 {
        let skill = 20 + 2 * self.level;
        let fail = 100 * device.level / (skill + device.level);
        clamp(fail, 2, 75)
    }

    // Estimated average melee damage per round against an unarmored foe.
    pub fn melee_damage(&self) -> i32 {
        let blows = 1 + self.level / 12;
        blows * (4 + self.level / 2)
    }

    // Estimated average missile damage, before brand multipliers.
    pub fn missile_damage(&self) -> i32 {
        let shots = if self.class == Class::Ranger { 2 } else { 1 };
        shots * (8 + self.level / 3)
    }
}

//////////////////////////////////////////////////////////////////////////////

// Inventory

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Scroll { PhaseDoor, Teleport, TeleportLevel, Rune }

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Potion { CureSeriousWounds, Healing, Speed, Heroism, Berserk }

impl Potion {
    // Expected hp restored, zero for the pure buffs.
    pub fn heals(self) -> i32 {
        match self {
            Potion::CureSeriousWounds => 25,
            Potion::Healing => 300,
            _ => 0,
        }
    }
}

// Counts of the consumables and devices the engine reasons about. Updated
// by the perception layer; commit paths never decrement these directly (the
// next snapshot reflects whatever the host consumed).
#[derive(Clone, Default)]
pub struct Inventory {
    pub scrolls: HashMap<Scroll, i32>,
    pub potions: HashMap<Potion, i32>,
    pub devices: HashMap<&'static str, i32>,
    pub missiles: [i32; Brand::ALL.len()],
    pub flasks: i32,
    pub food: i32,
    pub books: [bool; 4],
}

impl Inventory {
    pub fn scroll_count(&self, kind: Scroll) -> i32 {
        self.scrolls.get(&kind).copied().unwrap_or(0)
    }

    pub fn potion_count(&self, kind: Potion) -> i32 {
        self.potions.get(&kind).copied().unwrap_or(0)
    }

    pub fn charges(&self, device: &'static Device) -> i32 {
        self.devices.get(device.name).copied().unwrap_or(0)
    }

    pub fn missile_count(&self, brand: Brand) -> i32 {
        self.missiles[brand as usize]
    }

    pub fn add_scrolls(&mut self, kind: Scroll, n: i32) {
        *self.scrolls.entry(kind).or_insert(0) += n;
    }

    pub fn add_potions(&mut self, kind: Potion, n: i32) {
        *self.potions.entry(kind).or_insert(0) += n;
    }

    pub fn add_device(&mut self, device: &'static Device, charges: i32) {
        *self.devices.entry(device.name).or_insert(0) += charges;
    }

    pub fn add_missiles(&mut self, brand: Brand, n: i32) {
        self.missiles[brand as usize] += n;
    }
}

//////////////////////////////////////////////////////////////////////////////

// Commands

// One logical game command. keys() renders the raw keypress sequence; the
// engine emits at most one committed command per game turn.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Command {
    Move(Point),
    Attack(Point),
    Tunnel(Point),
    Open(Point),
    Bash(Point),
    Disarm(Point),
    StairsUp,
    StairsDown,
    Rest(i32),
    PickUp,
    EnterShop(Point),
    Locate(Point),
}

impl Command {
    pub fn keys(&self) -> String {
        match self {
            Command::Move(dir) | Command::Attack(dir) => dirs::key(*dir).to_string(),
            Command::Tunnel(dir) => format!("T{}", dirs::key(*dir)),
            Command::Open(dir) => format!("o{}", dirs::key(*dir)),
            Command::Bash(dir) => format!("B{}", dirs::key(*dir)),
            Command::Disarm(dir) => format!("D{}", dirs::key(*dir)),
            Command::StairsUp => "<".into(),
            Command::StairsDown => ">".into(),
            Command::Rest(n) => format!("R{}\n", n),
            Command::PickUp => "g".into(),
            Command::EnterShop(dir) => dirs::key(*dir).to_string(),
            Command::Locate(dir) => format!("L{}\x1b", dirs::key(*dir)),
        }
    }
}

//////////////////////////////////////////////////////////////////////////////

// GameControl

// The command sink plus the probabilistic action primitives. Every method
// returning bool encapsulates the game's own fail-chance roll; callers fall
// back to the next-best method on failure rather than aborting the turn.
pub trait GameControl {
    fn send(&mut self, command: &Command);
    fn cast(&mut self, spell: &'static Spell, target: Option<Point>) -> bool;
    fn read_scroll(&mut self, kind: Scroll) -> bool;
    fn quaff(&mut self, kind: Potion) -> bool;
    fn use_device(&mut self, device: &'static Device, target: Option<Point>) -> bool;
    fn fire(&mut self, brand: Brand, target: Point) -> bool;
    fn throw(&mut self, target: Point) -> bool;
}

//////////////////////////////////////////////////////////////////////////////
