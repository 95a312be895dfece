use {
    crate::registry::Registry,
    std::{
        sync::{Arc, Barrier},
        thread,
    },
};

#[test]
fn resolve_creates_once() {
    let registry = Registry::default();
    assert_eq!(registry.len(), 0);
    let a1 = registry.resolve(&"a");
    let a2 = registry.resolve(&"a");
    assert!(Arc::ptr_eq(&a1, &a2));
    assert_eq!(registry.len(), 1);
    let b = registry.resolve(&"b");
    assert!(!Arc::ptr_eq(&a1, &b));
    assert_eq!(registry.len(), 2);
}

#[test]
fn locks_are_retained() {
    let registry = Registry::default();
    let addr = registry.resolve(&1).addr();
    for i in 2..100 {
        registry.resolve(&i);
    }
    assert_eq!(registry.resolve(&1).addr(), addr);
    assert_eq!(registry.len(), 99);
}

#[test]
fn concurrent_first_touch() {
    const THREADS: usize = 16;
    let registry = Registry::default();
    let barrier = Barrier::new(THREADS);
    let locks: Vec<_> = thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                s.spawn(|| {
                    barrier.wait();
                    registry.resolve(&42u64)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    for lock in &locks[1..] {
        assert!(Arc::ptr_eq(&locks[0], lock));
    }
    assert_eq!(registry.len(), 1);
}
