//! Integration: generator, store, and cache working together across a
//! simulated scheduling sequence.

use drover_core::Vec2;
use drover_field::{
    CacheKey, FieldCache, FieldGenerator, FieldStore, GenerationRequest, Urgency,
};
use std::sync::Arc;

const TOLERANCE: f32 = 0.5;
const RETENTION: f64 = 5.0;

fn make_request(
    store: &mut FieldStore,
    center: Vec2,
    destination: Vec2,
    radius: f32,
) -> GenerationRequest {
    let handle = store.allocate_pending();
    GenerationRequest::new(
        center,
        destination,
        radius,
        1.0,
        TOLERANCE,
        Urgency::Explicit,
        handle,
    )
}

/// The scheduling fast path: second request within quantization tolerance
/// reuses the first field instead of regenerating.
#[test]
fn near_identical_requests_resolve_to_one_field() {
    let generator = FieldGenerator::open();
    let mut store = FieldStore::new();
    let mut cache = FieldCache::new();

    let first = make_request(&mut store, Vec2::ZERO, Vec2::new(10.0, 0.0), 20.0);
    assert!(cache.lookup(&first.key).is_none());
    let field = Arc::new(generator.generate(&first));
    assert!(store.fulfil(first.handle, field));
    cache.insert(first.key, first.handle, 0.0);
    assert!(store.acquire_cache(first.handle));

    // Same area within 0.5 world units: key collides, no generation.
    let second_key = CacheKey::quantize(
        Vec2::ZERO,
        Vec2::new(10.2, 0.1),
        20.0,
        TOLERANCE,
    );
    let reused = cache.lookup(&second_key).expect("cache hit expected");
    assert_eq!(reused, first.handle);
    assert!(store.get(reused).is_some());
    assert_eq!(store.live_fields(), 1);
}

/// Retention sweep destroys a field only after its last agent lets go.
#[test]
fn sweep_then_release_destroys_field() {
    let generator = FieldGenerator::open();
    let mut store = FieldStore::new();
    let mut cache = FieldCache::new();

    let request = make_request(&mut store, Vec2::ZERO, Vec2::new(5.0, 5.0), 10.0);
    let field = Arc::new(generator.generate(&request));
    store.fulfil(request.handle, field);
    cache.insert(request.key, request.handle, 0.0);
    store.acquire_cache(request.handle);
    store.add_agent_ref(request.handle);

    // Past the retention window the entry is evicted, but the agent still
    // holds the field alive.
    let evicted = cache.sweep(RETENTION + 1.0, RETENTION);
    assert_eq!(evicted, vec![request.handle]);
    for handle in evicted {
        store.release_cache(handle);
    }
    assert!(store.get(request.handle).is_some());

    // The agent unassigns; now the field dies and the handle goes stale.
    store.release_agent_ref(request.handle);
    assert!(store.get(request.handle).is_none());
    assert_eq!(store.live_fields(), 0);
}

/// A generated field keeps satisfying shared sampling after the grid and
/// agents disagree about exact positions.
#[test]
fn shared_field_samples_consistently() {
    let generator = FieldGenerator::open();
    let mut store = FieldStore::new();

    let request = make_request(&mut store, Vec2::ZERO, Vec2::new(8.0, 8.0), 12.0);
    let field = Arc::new(generator.generate(&request));
    store.fulfil(request.handle, Arc::clone(&field));

    let resolved = store.get(request.handle).unwrap();
    for pos in [
        Vec2::new(-6.0, -6.0),
        Vec2::new(0.0, 0.0),
        Vec2::new(6.0, -3.0),
    ] {
        let dir = resolved.sample(pos);
        assert!(dir.length() > 0.0, "expected guidance at {pos}");
        // Steering must reduce distance-to-destination over a small step.
        let before = pos.distance(field.destination());
        let after = (pos + dir * 0.5).distance(field.destination());
        assert!(after < before, "direction at {pos} points away");
    }
}
