mod attack;
mod danger;
mod defend;
mod goals;
mod step;

pub mod base;
pub mod dex;
pub mod engine;
pub mod flow;
pub mod map;
pub mod monsters;
pub mod player;
pub mod state;

#[cfg(test)]
mod test_support;

pub use danger::{avoidance, fear_threshold, Ctx, DangerModel, MonsterDanger};
pub use engine::{Borg, Decision};
pub use goals::Goal;
pub use player::{Command, GameControl};
