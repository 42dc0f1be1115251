use crate::base::Point;
use crate::dex::{Brand, Device, Spell};
use crate::map::Feature;
use crate::player::{Command, GameControl, Potion, Scroll};
use crate::state::BorgState;

// A healthy level-20 character in an all-floor room at the given depth.
pub fn open_state(size: Point, depth: i32) -> BorgState {
    let mut state = BorgState::new();
    state.map.reset(depth);
    for x in 0..size.0 {
        for y in 0..size.1 {
            state.map.set_feature(Point(x, y), Feature::Floor);
        }
    }
    state.player.pos = Point(size.0 / 2, size.1 / 2);
    state.player.level = 20;
    state.player.hp = 150;
    state.player.max_hp = 150;
    state
}

// Records every action primitive; the first `failures` rolls fail, the rest
// succeed, so tests can script fall-through.
#[derive(Default)]
pub struct MockControl {
    pub commands: Vec<Command>,
    pub casts: Vec<(&'static str, Option<Point>)>,
    pub scrolls: Vec<Scroll>,
    pub quaffs: Vec<Potion>,
    pub devices: Vec<(&'static str, Option<Point>)>,
    pub fired: Vec<(Brand, Point)>,
    pub thrown: Vec<Point>,
    pub failures: i32,
}

impl MockControl {
    pub fn new() -> Self { Self::default() }

    pub fn failing(failures: i32) -> Self {
        Self { failures, ..Self::default() }
    }

    fn roll(&mut self) -> bool {
        if self.failures > 0 {
            self.failures -= 1;
            return false;
        }
        true
    }
}

impl GameControl for MockControl {
    fn send(&mut self, command: &Command) {
        self.commands.push(command.clone());
    }

    fn cast(&mut self, spell: &'static Spell, target: Option<Point>) -> bool {
        if !self.roll() { return false; }
        self.casts.push((spell.name, target));
        true
    }

    fn read_scroll(&mut self, kind: Scroll) -> bool {
        if !self.roll() { return false; }
        self.scrolls.push(kind);
        true
    }

    fn quaff(&mut self, kind: Potion) -> bool {
        if !self.roll() { return false; }
        self.quaffs.push(kind);
        true
    }

    fn use_device(&mut self, device: &'static Device, target: Option<Point>) -> bool {
        if !self.roll() { return false; }
        self.devices.push((device.name, target));
        true
    }

    fn fire(&mut self, brand: Brand, target: Point) -> bool {
        if !self.roll() { return false; }
        self.fired.push((brand, target));
        true
    }

    fn throw(&mut self, target: Point) -> bool {
        if !self.roll() { return false; }
        self.thrown.push(target);
        true
    }
}
