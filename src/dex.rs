use lazy_static::lazy_static;

use crate::base::HashMap;

//////////////////////////////////////////////////////////////////////////////

// Elements

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Element {
    Physical,
    Fire,
    Cold,
    Elec,
    Acid,
    Poison,
    Light,
    Dark,
    Nether,
    Holy,
}

impl Element {
    pub fn bit(self) -> u32 { 1 << (self as u32) }
}

//////////////////////////////////////////////////////////////////////////////

// Monster races

pub const RF_NEVER_MOVE: u32 = 1 << 0;
pub const RF_PASS_WALL: u32 = 1 << 1;
pub const RF_BREEDER: u32 = 1 << 2;
pub const RF_UNIQUE: u32 = 1 << 3;
pub const RF_SUMMONER: u32 = 1 << 4;
pub const RF_RANGED: u32 = 1 << 5;
pub const RF_FRIENDS: u32 = 1 << 6;
pub const RF_EVIL: u32 = 1 << 7;
pub const RF_INVISIBLE: u32 = 1 << 8;

pub struct MonsterRace {
    pub name: &'static str,
    pub glyph: char,
    pub level: i32,
    pub speed: i32,
    pub hp: i32,
    pub melee: i32,
    pub ranged: i32,
    pub flags: u32,
    pub resists: u32,
    pub vulns: u32,
}

impl MonsterRace {
    pub fn get(name: &str) -> &'static MonsterRace {
        RACES.get(name).unwrap_or_else(|| panic!("Unknown race: {}", name))
    }

    pub fn has(&self, flag: u32) -> bool { self.flags & flag != 0 }

    pub fn resists(&self, element: Element) -> bool {
        self.resists & element.bit() != 0
    }

    pub fn vulnerable(&self, element: Element) -> bool {
        self.vulns & element.bit() != 0
    }

    // Monsters project the element they themselves resist (dragons breathe
    // their own breath); physical otherwise.
    pub fn ranged_element(&self) -> Element {
        use Element::*;
        for element in [Fire, Cold, Elec, Acid, Poison, Dark, Nether] {
            if self.resists(element) { return element; }
        }
        Element::Physical
    }
}

impl std::fmt::Debug for MonsterRace {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.name)
    }
}

impl Eq for &'static MonsterRace {}

impl PartialEq for &'static MonsterRace {
    fn eq(&self, next: &&'static MonsterRace) -> bool {
        *self as *const MonsterRace == *next as *const MonsterRace
    }
}

lazy_static! {
    static ref RACES: HashMap<&'static str, MonsterRace> = {
        use Element::*;
        let no = 0u32;
        let items: Vec<(&'static str, char, i32, i32, i32, i32, i32, u32, u32, u32)> = vec![
            // name, glyph, level, speed, hp, melee, ranged, flags, resists, vulns
            ("giant white mouse",   'r',  1, 110,   3,   2,  0, RF_BREEDER, no, no),
            ("kobold",              'k',  2, 110,  12,   6,  0, RF_EVIL, no, no),
            ("cave spider",         'S',  2, 120,   4,   3,  0, RF_FRIENDS, no, no),
            ("soldier",             'p',  6, 110,  28,  12,  0, no, no, no),
            ("orc archer",          'o',  8, 110,  30,  10, 12, RF_EVIL | RF_RANGED, no, no),
            ("white jelly",         'j', 10, 120,  96,  14,  0, RF_NEVER_MOVE | RF_EVIL,
                                    Poison.bit(), Fire.bit()),
            ("Grip, Farmer Maggot's Dog",
                                    'C',  2, 120,  15,   5,  0, RF_UNIQUE, no, no),
            ("Mughash the Kobold Chief",
                                    'k', 12, 110,  90,  25,  0, RF_UNIQUE | RF_EVIL | RF_FRIENDS,
                                    no, no),
            ("dark elven mage",     'h', 12, 120,  35,   8, 24, RF_EVIL | RF_RANGED | RF_SUMMONER,
                                    Dark.bit(), Light.bit()),
            ("poltergeist",         'G',  8, 130,   8,   4,  0, RF_PASS_WALL | RF_EVIL,
                                    Cold.bit() | Poison.bit(), no),
            ("ghost",               'G', 26, 120,  52,  18,  0, RF_PASS_WALL | RF_EVIL | RF_INVISIBLE,
                                    Cold.bit() | Poison.bit() | Nether.bit(), no),
            ("stone giant",         'P', 18, 110, 160,  60,  0, RF_EVIL, no, no),
            ("frost giant",         'P', 21, 110, 170,  65, 40, RF_EVIL | RF_RANGED,
                                    Cold.bit(), Fire.bit()),
            ("fire giant",          'P', 25, 110, 200,  75, 50, RF_EVIL | RF_RANGED,
                                    Fire.bit(), Cold.bit()),
            ("quylthulg",           'Q', 26, 110, 115,   0, 30, RF_NEVER_MOVE | RF_SUMMONER | RF_RANGED,
                                    no, no),
            ("gravity hound",       'Z', 35, 120, 120,  40, 60, RF_FRIENDS | RF_RANGED, no, no),
            ("ancient red dragon",  'D', 44, 120, 800, 100, 220, RF_EVIL | RF_RANGED | RF_UNIQUE,
                                    Fire.bit(), no),
            ("nether wraith",       'W', 39, 120, 200,  45, 90, RF_EVIL | RF_PASS_WALL | RF_RANGED,
                                    Cold.bit() | Poison.bit() | Nether.bit(), Light.bit()),
            ("demon summoner",      'u', 44, 120, 350,  60, 120, RF_EVIL | RF_SUMMONER | RF_RANGED,
                                    Fire.bit(), no),
        ];
        let mut result = HashMap::default();
        for (name, glyph, level, speed, hp, melee, ranged, flags, resists, vulns) in items {
            result.insert(name, MonsterRace {
                name, glyph, level, speed, hp, melee, ranged, flags, resists, vulns,
            });
        }
        result
    };
}

//////////////////////////////////////////////////////////////////////////////

// Spells

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Realm { Arcane, Divine }

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Shape {
    Bolt,
    Beam,
    Ball(i32),
    // Hits every viewable monster the element applies to.
    Dispel,
    // Affects the caster only (buffs, escapes, the glyph under our feet).
    Caster,
}

type DamageFn = fn(i32) -> i32;

pub struct Spell {
    pub name: &'static str,
    pub realm: Realm,
    pub book: usize,
    pub index: usize,
    pub level: i32,
    pub mana: i32,
    pub fail: i32,
    pub shape: Shape,
    pub element: Element,
    pub damage: DamageFn,
}

impl Spell {
    pub fn get(name: &str) -> &'static Spell {
        SPELLS.get(name).unwrap_or_else(|| panic!("Unknown spell: {}", name))
    }

    pub fn all() -> impl Iterator<Item = &'static Spell> { SPELLS.values() }
}

impl std::fmt::Debug for Spell {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.name)
    }
}

// Average damage of n rolls of an s-sided die.
const fn d(n: i32, s: i32) -> i32 { n * (s + 1) / 2 }

lazy_static! {
    static ref SPELLS: HashMap<&'static str, Spell> = {
        use Element::*;
        use Realm::*;
        use Shape::*;
        let items: Vec<(&'static str, Realm, usize, usize, i32, i32, i32,
                        Shape, Element, DamageFn)> = vec![
            ("Magic Missile",    Arcane, 0, 0,  1,  1, 22, Bolt, Physical,
             |l| d(3 + (l - 1) / 5, 4)),
            ("Stinking Cloud",   Arcane, 0, 8,  3,  3, 27, Ball(2), Poison,
             |l| 10 + l / 2),
            ("Lightning Bolt",   Arcane, 1, 4, 15,  6, 30, Beam, Elec,
             |l| d(3 + (l - 5) / 6, 8)),
            ("Frost Bolt",       Arcane, 1, 6, 17,  7, 30, Bolt, Cold,
             |l| d(5 + (l - 5) / 4, 8)),
            ("Fire Bolt",        Arcane, 2, 0, 21,  9, 35, Bolt, Fire,
             |l| d(6 + (l - 5) / 4, 8)),
            ("Acid Bolt",        Arcane, 2, 2, 25, 10, 40, Bolt, Acid,
             |l| d(8 + (l - 5) / 4, 8)),
            ("Frost Ball",       Arcane, 2, 4, 29, 12, 45, Ball(2), Cold,
             |l| 30 + l),
            ("Fire Ball",        Arcane, 3, 0, 34, 15, 50, Ball(2), Fire,
             |l| 55 + l),
            ("Cloudkill",        Arcane, 3, 2, 40, 20, 60, Ball(3), Poison,
             |l| 20 + l / 2),
            ("Meteor Swarm",     Arcane, 3, 4, 42, 25, 65, Ball(1), Physical,
             |l| 30 + l * 3 / 2),
            ("Mana Storm",       Arcane, 3, 6, 48, 40, 75, Ball(3), Physical,
             |l| 300 + l * 2),
            ("Orb of Draining",  Divine, 0, 6,  9,  5, 25, Ball(2), Holy,
             |l| d(3, 6) + l),
            ("Dispel Evil",      Divine, 1, 4, 30, 15, 50, Dispel, Holy,
             |l| l * 3),
            ("Annihilation",     Divine, 2, 2, 42, 35, 70, Bolt, Nether,
             |_| 200),
            // Escapes and buffs; zero damage, Caster- or single-target.
            ("Phase Door",       Arcane, 0, 2,  1,  1, 25, Caster, Physical, |_| 0),
            ("Teleport Self",    Arcane, 1, 0, 15,  7, 30, Caster, Physical, |_| 0),
            ("Haste Self",       Arcane, 2, 6, 28, 12, 45, Caster, Physical, |_| 0),
            ("Resistance",       Arcane, 2, 8, 32, 18, 50, Caster, Physical, |_| 0),
            ("Teleport Other",   Arcane, 1, 8, 20,  9, 35, Bolt, Physical, |_| 0),
            ("Teleport Level",   Arcane, 3, 8, 36, 20, 60, Caster, Physical, |_| 0),
            ("Mass Banishment",  Arcane, 3, 9, 46, 60, 80, Caster, Physical, |_| 0),
            ("Detect Invisible", Arcane, 0, 4,  5,  2, 25, Caster, Physical, |_| 0),
            ("Bless",            Divine, 0, 0,  1,  1, 20, Caster, Physical, |_| 0),
            ("Portal",           Divine, 0, 8,  9,  6, 30, Caster, Physical, |_| 0),
            ("Protection from Evil",
                                 Divine, 1, 0, 16, 10, 35, Caster, Physical, |_| 0),
            ("Sense Invisible",  Divine, 1, 2, 14,  6, 30, Caster, Physical, |_| 0),
            ("Glyph of Warding", Divine, 2, 0, 33, 30, 55, Caster, Physical, |_| 0),
            ("Earthquake",       Divine, 2, 4, 37, 25, 60, Caster, Physical, |_| 0),
            ("Word of Destruction",
                                 Divine, 2, 8, 41, 40, 70, Caster, Physical, |_| 0),
        ];
        let mut result = HashMap::default();
        for (name, realm, book, index, level, mana, fail, shape, element, damage) in items {
            result.insert(name, Spell {
                name, realm, book, index, level, mana, fail, shape, element, damage,
            });
        }
        result
    };
}

//////////////////////////////////////////////////////////////////////////////

// Devices: wands, rods, staffs, and artifact activations

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum DeviceKind { Wand, Rod, Staff, Artifact }

pub struct Device {
    pub name: &'static str,
    pub kind: DeviceKind,
    pub level: i32,
    pub shape: Shape,
    pub element: Element,
    pub damage: i32,
}

impl Device {
    pub fn get(name: &str) -> &'static Device {
        DEVICES.get(name).unwrap_or_else(|| panic!("Unknown device: {}", name))
    }

    pub fn all() -> impl Iterator<Item = &'static Device> { DEVICES.values() }
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.name)
    }
}

impl Eq for &'static Device {}

impl PartialEq for &'static Device {
    fn eq(&self, next: &&'static Device) -> bool {
        *self as *const Device == *next as *const Device
    }
}

lazy_static! {
    static ref DEVICES: HashMap<&'static str, Device> = {
        use DeviceKind::*;
        use Element::*;
        use Shape::*;
        let items: Vec<(&'static str, DeviceKind, i32, Shape, Element, i32)> = vec![
            ("Wand of Magic Missile",   Wand,  3, Bolt, Physical,  7),
            ("Wand of Stinking Cloud",  Wand,  5, Ball(2), Poison, 12),
            ("Wand of Lightning Bolt",  Wand, 10, Beam, Elec,     18),
            ("Wand of Frost Bolt",      Wand, 12, Bolt, Cold,     27),
            ("Wand of Fire Bolt",       Wand, 15, Bolt, Fire,     36),
            ("Wand of Acid Bolt",       Wand, 18, Bolt, Acid,     45),
            ("Wand of Drain Life",      Wand, 25, Bolt, Nether,   75),
            ("Wand of Dragon's Frost",  Wand, 30, Ball(2), Cold,  80),
            ("Wand of Dragon's Flame",  Wand, 30, Ball(2), Fire, 100),
            ("Rod of Lightning Bolt",   Rod,  12, Beam, Elec,     22),
            ("Rod of Frost Bolt",       Rod,  14, Bolt, Cold,     30),
            ("Rod of Fire Bolt",        Rod,  16, Bolt, Fire,     38),
            ("Rod of Drain Life",       Rod,  30, Bolt, Nether,   75),
            ("Staff of Teleportation",  Staff, 20, Caster, Physical, 0),
            ("Staff of Dispel Evil",    Staff, 20, Dispel, Holy,  60),
            ("Staff of Power",          Staff, 30, Dispel, Physical, 120),
            ("Staff of Holiness",       Staff, 35, Dispel, Holy,  120),
            ("Dagger 'Narthanc'",       Artifact, 10, Bolt, Fire,  26),
            ("Ring of Ice",             Artifact, 20, Ball(2), Cold, 50),
            ("Sword 'Ringil'",          Artifact, 30, Ball(2), Cold, 100),
            ("Red Dragon Scale Mail",   Artifact, 30, Ball(2), Fire, 100),
            ("Morning Star 'Firestar'", Artifact, 25, Ball(3), Fire,  72),
        ];
        let mut result = HashMap::default();
        for (name, kind, level, shape, element, damage) in items {
            result.insert(name, Device { name, kind, level, shape, element, damage });
        }
        result
    };
}

//////////////////////////////////////////////////////////////////////////////

// Ammo brands

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Brand { None, Flame, Frost, Venom, Shock, Slaying }

impl Brand {
    pub const ALL: [Brand; 6] = [
        Brand::None, Brand::Flame, Brand::Frost,
        Brand::Venom, Brand::Shock, Brand::Slaying,
    ];

    pub fn element(self) -> Element {
        match self {
            Brand::None | Brand::Slaying => Element::Physical,
            Brand::Flame => Element::Fire,
            Brand::Frost => Element::Cold,
            Brand::Venom => Element::Poison,
            Brand::Shock => Element::Elec,
        }
    }

    pub fn mult(self) -> i32 {
        match self {
            Brand::None => 1,
            Brand::Slaying => 2,
            _ => 3,
        }
    }
}

//////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_race_flags() {
        let ghost = MonsterRace::get("ghost");
        assert!(ghost.has(RF_PASS_WALL));
        assert!(ghost.resists(Element::Cold));
        assert!(!ghost.resists(Element::Fire));

        let dragon = MonsterRace::get("ancient red dragon");
        assert!(dragon.has(RF_UNIQUE));
        assert!(dragon.resists(Element::Fire));

        let giant = MonsterRace::get("fire giant");
        assert!(giant.vulnerable(Element::Cold));
    }

    #[test]
    fn test_spell_damage_scales_with_level() {
        let bolt = Spell::get("Magic Missile");
        assert!((bolt.damage)(1) > 0);
        assert!((bolt.damage)(30) > (bolt.damage)(1));
        assert_eq!(bolt.realm, Realm::Arcane);

        let orb = Spell::get("Orb of Draining");
        assert_eq!(orb.realm, Realm::Divine);
        assert_eq!(orb.element, Element::Holy);
    }

    #[test]
    fn test_brand_multipliers() {
        assert_eq!(Brand::None.mult(), 1);
        assert!(Brand::Flame.mult() > Brand::Slaying.mult());
        assert_eq!(Brand::Frost.element(), Element::Cold);
    }
}
