//! Stress: hundreds of scattered agents rallying on a handful of
//! destinations, driven through many ticks. Deterministically seeded.

use drover_core::{AgentId, InMemoryPositions, PositionStore, StaticReference, Vec2};
use drover_engine::{Engine, EngineConfig, FollowerParams};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

const AGENTS: u64 = 300;
const TICKS: usize = 240;
const DT: f64 = 1.0 / 60.0;

#[test]
fn scattered_crowd_rallies_on_shared_points() {
    let mut engine = Engine::new(EngineConfig::default()).expect("valid config");
    let mut positions = InMemoryPositions::new();
    let camera = StaticReference(Vec2::ZERO);

    let rallies = [
        Vec2::new(40.0, 40.0),
        Vec2::new(-40.0, 40.0),
        Vec2::new(-40.0, -40.0),
        Vec2::new(40.0, -40.0),
    ];

    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let mut start_distance = Vec::with_capacity(AGENTS as usize);
    for i in 0..AGENTS {
        let agent = AgentId(i);
        let position = Vec2::new(
            rng.random_range(-40.0..40.0),
            rng.random_range(-40.0..40.0),
        );
        let rally = rallies[(i % 4) as usize];
        positions.insert(agent, position);
        engine.add_follower(agent, FollowerParams::default());
        engine.set_destination(agent, rally).unwrap();
        start_distance.push(position.distance(rally));
    }

    for _ in 0..TICKS {
        engine.tick(&mut positions, &camera, DT);
    }

    assert!(engine.live_fields() > 0, "shared fields were generated");

    // Nearly everyone made real progress; stragglers are tolerated
    // (briefly gated or shed requests recover through the demand loop).
    let mut progressed = 0;
    for i in 0..AGENTS {
        let rally = rallies[(i % 4) as usize];
        let now = positions.position(AgentId(i)).unwrap().distance(rally);
        let was = start_distance[i as usize];
        if now < was - 1.0 || now < 3.0 {
            progressed += 1;
        }
    }
    assert!(
        progressed as f64 >= AGENTS as f64 * 0.8,
        "only {progressed}/{AGENTS} agents progressed"
    );

    // The pipeline stayed inside its budget discipline: the per-tick
    // generation counter never exceeds the configured maximum.
    assert!(engine.metrics().fields_generated <= 5);
}
