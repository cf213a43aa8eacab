// racer_sim/src/simulation/plugins/agents/decision.rs

use avian3d::prelude::LinearVelocity;

use crate::prelude::*;
use crate::simulation::config::LoadedTrack;
use crate::simulation::plugins::agents::KeyboardDriven;
use crate::simulation::plugins::sensors::rangefinder::Rangefinder;
use racer_core::prelude::ControlIntents;

pub struct DecisionPlugin;

impl Plugin for DecisionPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<RespawnRequest>()
            .add_systems(Update, latch_respawn_key)
            .add_systems(
                FixedUpdate,
                (run_controllers, keyboard_driver).in_set(SimulationSet::Decision),
            );
    }
}

/// Set when the respawn key goes down in a frame, cleared by the first fixed
/// tick that reads it. A press reaches exactly one fixed tick.
#[derive(Resource, Debug, Default)]
pub struct RespawnRequest(bool);

impl RespawnRequest {
    pub fn take(&mut self) -> bool {
        std::mem::take(&mut self.0)
    }
}

fn latch_respawn_key(
    keys: Option<Res<ButtonInput<KeyCode>>>,
    mut request: ResMut<RespawnRequest>,
) {
    if keys.is_some_and(|keys| keys.just_pressed(KeyCode::KeyR)) {
        request.0 = true;
    }
}

/// WASD or the arrow keys drive, space brakes.
pub fn intents_from_keys(keys: &ButtonInput<KeyCode>) -> ControlIntents {
    let any = |codes: [KeyCode; 2]| keys.any_pressed(codes);
    ControlIntents {
        accelerate: any([KeyCode::KeyW, KeyCode::ArrowUp]),
        reverse: any([KeyCode::KeyS, KeyCode::ArrowDown]),
        brake: keys.pressed(KeyCode::Space),
        left: any([KeyCode::KeyA, KeyCode::ArrowLeft]),
        right: any([KeyCode::KeyD, KeyCode::ArrowRight]),
    }
}

/// Feeds each controller the last rangefinder reading and the chassis speed.
fn run_controllers(
    mut query: Query<(&mut RacerAgent, &Rangefinder, &LinearVelocity), Without<KeyboardDriven>>,
) {
    for (mut agent, rangefinder, velocity) in &mut query {
        let ranges = rangefinder.distances();
        if let Err(e) = agent.0.decide(&ranges, velocity.length()) {
            warn!("[DECISION] '{}' controller failed: {}", agent.0.name, e);
        }
    }
}

/// Headless runs have no keyboard; player agents then sit still.
fn keyboard_driver(
    keys: Option<Res<ButtonInput<KeyCode>>>,
    mut request: ResMut<RespawnRequest>,
    track: Res<LoadedTrack>,
    mut query: Query<&mut RacerAgent, With<KeyboardDriven>>,
) {
    let respawn = request.take();
    let Some(keys) = keys else {
        return;
    };
    let intents = intents_from_keys(&keys);
    for mut agent in &mut query {
        agent.0.drive(&intents);
        if respawn {
            match agent.0.respawn(&track.track) {
                Ok(_) => info!("'{}' respawned", agent.0.name),
                Err(e) => warn!("'{}' cannot respawn: {}", agent.0.name, e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_keys_means_no_intent() {
        let keys = ButtonInput::<KeyCode>::default();
        assert_eq!(intents_from_keys(&keys), ControlIntents::default());
    }

    #[test]
    fn arrows_and_letters_are_equivalent() {
        let mut letters = ButtonInput::<KeyCode>::default();
        letters.press(KeyCode::KeyW);
        letters.press(KeyCode::KeyA);
        let mut arrows = ButtonInput::<KeyCode>::default();
        arrows.press(KeyCode::ArrowUp);
        arrows.press(KeyCode::ArrowLeft);

        let expected = ControlIntents {
            accelerate: true,
            left: true,
            ..Default::default()
        };
        assert_eq!(intents_from_keys(&letters), expected);
        assert_eq!(intents_from_keys(&arrows), expected);
    }

    #[test]
    fn space_brakes() {
        let mut keys = ButtonInput::<KeyCode>::default();
        keys.press(KeyCode::Space);
        keys.press(KeyCode::KeyS);
        let intents = intents_from_keys(&keys);
        assert!(intents.brake);
        assert!(intents.reverse);
        assert!(!intents.accelerate);
    }

    fn latch_app() -> App {
        let mut app = App::new();
        app.init_resource::<ButtonInput<KeyCode>>()
            .init_resource::<RespawnRequest>()
            .add_systems(Update, latch_respawn_key);
        app
    }

    #[test]
    fn respawn_press_is_held_until_taken() {
        let mut app = latch_app();
        app.world_mut()
            .resource_mut::<ButtonInput<KeyCode>>()
            .press(KeyCode::KeyR);
        app.update();

        // The next frame has no new press, as with zero fixed ticks in between.
        app.world_mut().resource_mut::<ButtonInput<KeyCode>>().clear();
        app.update();

        let mut request = app.world_mut().resource_mut::<RespawnRequest>();
        assert!(request.take());
        assert!(!request.take());
    }

    #[test]
    fn holding_the_respawn_key_does_not_repeat() {
        let mut app = latch_app();
        app.world_mut()
            .resource_mut::<ButtonInput<KeyCode>>()
            .press(KeyCode::KeyR);
        app.update();
        assert!(app.world_mut().resource_mut::<RespawnRequest>().take());

        app.world_mut().resource_mut::<ButtonInput<KeyCode>>().clear();
        app.update();

        assert!(app.world().resource::<ButtonInput<KeyCode>>().pressed(KeyCode::KeyR));
        assert!(!app.world_mut().resource_mut::<RespawnRequest>().take());
    }
}
