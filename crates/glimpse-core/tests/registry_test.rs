//! Integration test: handle registry
//!
//! Verifies handle registration, aliasing, generational staleness and the
//! tolerance of the boundary operations (double unregister, unknown
//! handles).
//!
//! Run with: cargo test --test registry_test -- --nocapture

use std::sync::Arc;

use glimpse_core::registry::{Arena, HandleRegistry};

#[test]
fn test_register_and_lookup() {
    let registry: HandleRegistry<String> = HandleRegistry::new();
    registry.register(0x1000, Arc::new("device-a".to_string()));

    match registry.lookup(0x1000) {
        Some(ctx) => {
            if *ctx != "device-a" {
                panic!("expected device-a, got {:?}", ctx);
            }
        }
        None => panic!("expected a context for 0x1000, got None"),
    }
    if registry.lookup(0x2000).is_some() {
        panic!("expected None for an unknown handle");
    }
}

#[test]
fn test_unregister_then_lookup_misses() {
    let registry: HandleRegistry<u32> = HandleRegistry::new();
    registry.register(7, Arc::new(42));

    match registry.unregister(7) {
        Some(ctx) => {
            if *ctx != 42 {
                panic!("expected 42, got {:?}", ctx);
            }
        }
        None => panic!("expected the registered context back"),
    }
    if registry.lookup(7).is_some() {
        panic!("expected lookup to miss after unregister");
    }
    // Boundary APIs may legally be called with already-freed objects.
    if registry.unregister(7).is_some() {
        panic!("expected double unregister to be a no-op");
    }
}

#[test]
fn test_stale_id_after_slot_reuse() {
    let mut arena: Arena<u32> = Arena::new();
    let first = arena.insert(Arc::new(1));
    arena.remove(first);
    // The freed slot gets reused with a bumped generation.
    let second = arena.insert(Arc::new(2));

    if arena.get(first).is_some() {
        panic!("expected the stale id to stop resolving");
    }
    match arena.get(second) {
        Some(v) => {
            if *v != 2 {
                panic!("expected 2, got {:?}", v);
            }
        }
        None => panic!("expected the fresh id to resolve"),
    }
}

#[test]
fn test_alias_resolves_to_shared_context() {
    let registry: HandleRegistry<String> = HandleRegistry::new();
    let id = registry.register(0xaa, Arc::new("instance".to_string()));
    // Physical devices alias back to their owning instance.
    registry.alias(0xbb, id);
    registry.alias(0xcc, id);

    let via_alias = match registry.lookup(0xbb) {
        Some(ctx) => ctx,
        None => panic!("expected the alias to resolve"),
    };
    let direct = match registry.lookup(0xaa) {
        Some(ctx) => ctx,
        None => panic!("expected the original handle to resolve"),
    };
    if !Arc::ptr_eq(&via_alias, &direct) {
        panic!("expected alias and handle to share one context");
    }

    // Dropping an alias leaves the context alive.
    registry.unalias(0xcc);
    if registry.lookup(0xcc).is_some() {
        panic!("expected the dropped alias to miss");
    }
    if registry.lookup(0xaa).is_none() {
        panic!("expected the context to survive unalias");
    }
    if registry.len() != 1 {
        panic!("expected len 1, got {}", registry.len());
    }
}

#[test]
fn test_aliases_go_stale_with_their_context() {
    let registry: HandleRegistry<u32> = HandleRegistry::new();
    let id = registry.register(1, Arc::new(10));
    registry.alias(2, id);

    registry.unregister(1);
    // The alias still maps to the old id, which no longer resolves.
    if registry.lookup(2).is_some() {
        panic!("expected the alias to go stale with its context");
    }

    // Reusing the slot must not resurrect the stale alias.
    registry.register(3, Arc::new(20));
    if registry.lookup(2).is_some() {
        panic!("expected slot reuse not to resurrect the alias");
    }
}

#[test]
fn test_sweep_releases_only_matching_contexts() {
    // Command-buffer contexts tagged with their owning device.
    struct Tracked {
        device: u64,
    }
    let registry: HandleRegistry<Tracked> = HandleRegistry::new();
    registry.register(0x10, Arc::new(Tracked { device: 1 }));
    registry.register(0x11, Arc::new(Tracked { device: 1 }));
    registry.register(0x20, Arc::new(Tracked { device: 2 }));

    let dropped = registry.sweep(|ctx| ctx.device == 1);
    if dropped != 2 {
        panic!("expected 2 contexts dropped, got {}", dropped);
    }
    if registry.lookup(0x10).is_some() || registry.lookup(0x11).is_some() {
        panic!("expected device 1's contexts to be gone");
    }
    match registry.lookup(0x20) {
        Some(ctx) => {
            if ctx.device != 2 {
                panic!("expected device 2's context to survive");
            }
        }
        None => panic!("expected the other device's context to survive the sweep"),
    }

    // A handle value the driver recycles after the sweep maps fresh.
    registry.register(0x10, Arc::new(Tracked { device: 3 }));
    match registry.lookup(0x10) {
        Some(ctx) => {
            if ctx.device != 3 {
                panic!("expected the recycled handle to map to the new context");
            }
        }
        None => panic!("expected the recycled handle to resolve"),
    }
}

#[test]
fn test_id_of_tracks_current_mapping() {
    let registry: HandleRegistry<u32> = HandleRegistry::new();
    let id = registry.register(5, Arc::new(1));

    match registry.id_of(5) {
        Some(found) => {
            if found != id {
                panic!("expected {:?}, got {:?}", id, found);
            }
        }
        None => panic!("expected id_of to find the handle"),
    }
    registry.unregister(5);
    if registry.id_of(5).is_some() {
        panic!("expected id_of to miss after unregister");
    }
}
