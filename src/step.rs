use crate::base::{dirs, Point};
use crate::flow::TRAP_SKILL;
use crate::map::Feature;
use crate::player::{Command, GameControl};
use crate::state::BorgState;

//////////////////////////////////////////////////////////////////////////////

// Step executor

// Turns the chosen one-grid step into the game command matching what is on
// that grid RIGHT NOW. The committed flow can be a turn stale; resolving
// the occupant from the live map tolerates the desync.
pub fn execute_step(state: &BorgState, step: Point,
                    game: &mut dyn GameControl) -> Command {
    let target = state.player.pos + step;
    let grid = state.map.grid(target);

    let command = if grid.monster.is_some() {
        Command::Attack(step)
    } else {
        match grid.feature {
            Feature::ClosedDoor => Command::Open(step),
            Feature::StuckDoor => Command::Bash(step),
            Feature::Rubble => Command::Tunnel(step),
            Feature::Trap => {
                if !state.player.blind
                        && state.player.disarm_skill >= TRAP_SKILL {
                    Command::Disarm(step)
                } else {
                    Command::Move(step)
                }
            }
            // A shop entrance we did not plan for means the path is stale;
            // hold position and let the next turn re-plan.
            Feature::Shop(index) => {
                if state.shop_goal == Some(index) {
                    Command::EnterShop(step)
                } else {
                    Command::Move(dirs::NONE)
                }
            }
            feature if feature.is_wall() => Command::Tunnel(step),
            _ => Command::Move(step),
        }
    };
    game.send(&command);
    command
}

//////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dex::MonsterRace;
    use crate::test_support::{open_state, MockControl};

    #[test]
    fn test_step_resolves_live_occupant() {
        let mut state = open_state(Point(20, 20), 5);
        let pos = state.player.pos;
        let east = pos + dirs::E;

        let mut game = MockControl::new();
        assert_eq!(execute_step(&state, dirs::E, &mut game),
                   Command::Move(dirs::E));

        state.map.set_feature(east, Feature::ClosedDoor);
        assert_eq!(execute_step(&state, dirs::E, &mut game),
                   Command::Open(dirs::E));

        state.map.set_feature(east, Feature::StuckDoor);
        assert_eq!(execute_step(&state, dirs::E, &mut game),
                   Command::Bash(dirs::E));

        state.map.set_feature(east, Feature::Magma);
        assert_eq!(execute_step(&state, dirs::E, &mut game),
                   Command::Tunnel(dirs::E));

        // A monster that stepped into the doorway takes precedence.
        state.map.set_feature(east, Feature::ClosedDoor);
        let mid = state.monsters.add(MonsterRace::get("kobold"), east, 0);
        if let Some(grid) = state.map.grid_mut(east) {
            grid.monster = Some(mid);
        }
        assert_eq!(execute_step(&state, dirs::E, &mut game),
                   Command::Attack(dirs::E));

        // One command sent per invocation.
        assert_eq!(game.commands.len(), 5);
    }

    #[test]
    fn test_step_disarms_only_with_the_skill() {
        let mut state = open_state(Point(20, 20), 5);
        let east = state.player.pos + dirs::E;
        state.map.set_feature(east, Feature::Trap);

        let mut game = MockControl::new();
        state.player.disarm_skill = 50;
        assert_eq!(execute_step(&state, dirs::E, &mut game),
                   Command::Disarm(dirs::E));

        state.player.disarm_skill = 5;
        assert_eq!(execute_step(&state, dirs::E, &mut game),
                   Command::Move(dirs::E));

        // Blind characters cannot aim at the trigger.
        state.player.disarm_skill = 50;
        state.player.blind = true;
        assert_eq!(execute_step(&state, dirs::E, &mut game),
                   Command::Move(dirs::E));
    }

    #[test]
    fn test_step_gates_shop_entrances() {
        let mut state = open_state(Point(20, 20), 0);
        let east = state.player.pos + dirs::E;
        state.map.set_feature(east, Feature::Shop(2));

        let mut game = MockControl::new();
        assert_eq!(execute_step(&state, dirs::E, &mut game),
                   Command::Move(dirs::NONE));

        state.shop_goal = Some(2);
        assert_eq!(execute_step(&state, dirs::E, &mut game),
                   Command::EnterShop(dirs::E));
    }
}
