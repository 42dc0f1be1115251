use crate::base::{Matrix, Point};
use crate::monsters::MID;

//////////////////////////////////////////////////////////////////////////////

// Constants

pub const MAP_SIZE: Point = Point(198, 66);

//////////////////////////////////////////////////////////////////////////////

// Feature

#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum Feature {
    #[default]
    Unknown,
    Floor,
    Glyph,
    OpenDoor,
    BrokenDoor,
    ClosedDoor,
    StuckDoor,
    Trap,
    Rubble,
    Magma,
    MagmaTreasure,
    Quartz,
    QuartzTreasure,
    Granite,
    Perma,
    Shop(u8),
    StairsUp,
    StairsDown,
}

impl Feature {
    pub fn is_wall(self) -> bool {
        matches!(self, Feature::Magma | Feature::MagmaTreasure |
                       Feature::Quartz | Feature::QuartzTreasure |
                       Feature::Granite | Feature::Perma)
    }

    pub fn is_vein(self) -> bool {
        matches!(self, Feature::Magma | Feature::MagmaTreasure |
                       Feature::Quartz | Feature::QuartzTreasure)
    }

    pub fn has_treasure(self) -> bool {
        matches!(self, Feature::MagmaTreasure | Feature::QuartzTreasure)
    }

    // Grids a dig can eventually clear. Granite takes too long; perma never.
    pub fn is_tunnelable(self) -> bool {
        self.is_vein() || self == Feature::Rubble
    }

    pub fn is_door(self) -> bool {
        matches!(self, Feature::OpenDoor | Feature::BrokenDoor |
                       Feature::ClosedDoor | Feature::StuckDoor)
    }

    pub fn is_stair(self) -> bool {
        matches!(self, Feature::StairsUp | Feature::StairsDown)
    }

    // Grids the agent can step onto without clearing them first.
    pub fn is_passable(self) -> bool {
        matches!(self, Feature::Floor | Feature::Glyph | Feature::OpenDoor |
                       Feature::BrokenDoor | Feature::Trap | Feature::Shop(_) |
                       Feature::StairsUp | Feature::StairsDown)
    }

    pub fn blocks_los(self) -> bool {
        self.is_wall() || matches!(self, Feature::ClosedDoor | Feature::StuckDoor |
                                         Feature::Rubble)
    }
}

//////////////////////////////////////////////////////////////////////////////

// Grid

#[derive(Clone, Copy, Default)]
pub struct Grid {
    pub feature: Feature,
    pub monster: Option<MID>,

    // Flags:
    pub glow: bool,
    pub view: bool,
    pub mark: bool,
}

impl Grid {
    pub fn known(&self) -> bool { self.feature != Feature::Unknown }
}

//////////////////////////////////////////////////////////////////////////////

// Takes (tracked items on the floor)

#[derive(Clone, Copy, Debug)]
pub struct Take {
    pub pos: Point,
    pub value: i32,
    pub taken: bool,
}

//////////////////////////////////////////////////////////////////////////////

// DungeonMap

// The explored-level snapshot. Grids are never individually destroyed; the
// whole map is invalidated on level change via reset().
pub struct DungeonMap {
    pub grids: Matrix<Grid>,
    pub depth: i32,
    pub stairs_up: Vec<Point>,
    pub stairs_down: Vec<Point>,
    pub shops: Vec<Point>,
}

impl Default for DungeonMap {
    fn default() -> Self { Self::new(0) }
}

impl DungeonMap {
    pub fn new(depth: i32) -> Self {
        Self {
            grids: Matrix::new(MAP_SIZE, Grid::default()),
            depth,
            stairs_up: vec![],
            stairs_down: vec![],
            shops: vec![],
        }
    }

    pub fn reset(&mut self, depth: i32) {
        self.grids.fill(Grid::default());
        self.depth = depth;
        self.stairs_up.clear();
        self.stairs_down.clear();
        self.shops.clear();
    }

    pub fn grid(&self, p: Point) -> &Grid { self.grids.entry_ref(p) }

    pub fn grid_mut(&mut self, p: Point) -> Option<&mut Grid> {
        self.grids.entry_mut(p)
    }

    // Updates the feature at p, keeping the stair and shop caches in sync.
    pub fn set_feature(&mut self, p: Point, feature: Feature) {
        let Some(grid) = self.grids.entry_mut(p) else { return; };
        let old = grid.feature;
        grid.feature = feature;
        grid.mark = feature != Feature::Unknown;

        if old == feature { return; }
        match old {
            Feature::StairsUp => self.stairs_up.retain(|&x| x != p),
            Feature::StairsDown => self.stairs_down.retain(|&x| x != p),
            Feature::Shop(_) => self.shops.retain(|&x| x != p),
            _ => {}
        }
        match feature {
            Feature::StairsUp => self.stairs_up.push(p),
            Feature::StairsDown => self.stairs_down.push(p),
            Feature::Shop(_) => self.shops.push(p),
            _ => {}
        }
    }

    pub fn nearest_stair(&self, p: Point) -> Option<Point> {
        self.stairs_up.iter().chain(&self.stairs_down).copied()
            .min_by_key(|&x| (x - p).len_range())
    }

    // A clear shot, for projection purposes, from a to b. Endpoints are
    // exempt so we can target monsters standing in doorways.
    pub fn projectable(&self, a: Point, b: Point) -> bool {
        let los = crate::base::LOS(a, b);
        let last = los.len() - 1;
        los.iter().enumerate().all(|(i, &p)| {
            if i == 0 || i == last { return true; }
            !self.grid(p).feature.blocks_los()
        })
    }
}

//////////////////////////////////////////////////////////////////////////////
