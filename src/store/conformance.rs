//! Behaviour every [`Provider`] must show, independent of its storage.
//!
//! Backends call [`run_all`] from their own tests with a factory producing an
//! empty instance that reads time from the given clock.

use super::clock::ManualClock;
use super::Provider;
use std::sync::Arc;
use std::time::Duration;

pub(crate) fn run_all(make: impl Fn(Arc<ManualClock>) -> Arc<dyn Provider>) {
    let fresh = || {
        let clock = Arc::new(ManualClock::new());
        (make(clock.clone()), clock)
    };

    read_after_init_shares_record(fresh().0);
    read_creates_missing(fresh().0);
    destroy_then_read_is_fresh(fresh().0);
    destroy_unknown_is_noop(fresh().0);
    gc_keeps_recent_sessions(fresh().0);

    let (provider, clock) = fresh();
    gc_removes_exactly_the_expired_set(provider, clock);
    let (provider, clock) = fresh();
    data_access_refreshes_recency(provider, clock);
}

fn read_after_init_shares_record(provider: Arc<dyn Provider>) {
    let created = provider.init("conf-a").unwrap();
    created.set("k", "v").unwrap();

    let fetched = provider.read("conf-a").unwrap();
    assert!(created.same_record(&fetched));
    assert_eq!(fetched.get::<String>("k").unwrap().as_deref(), Some("v"));
    assert_eq!(fetched.id(), "conf-a");
}

fn read_creates_missing(provider: Arc<dyn Provider>) {
    assert_eq!(provider.session_count(), 0);
    let session = provider.read("conf-new").unwrap();
    assert_eq!(session.id(), "conf-new");
    assert!(session.snapshot().is_empty());
    assert_eq!(provider.session_count(), 1);
}

fn destroy_then_read_is_fresh(provider: Arc<dyn Provider>) {
    let old = provider.init("conf-d").unwrap();
    old.set("k", 1).unwrap();
    provider.destroy("conf-d").unwrap();
    assert_eq!(provider.session_count(), 0);

    let fresh = provider.read("conf-d").unwrap();
    assert!(!fresh.same_record(&old));
    assert_eq!(fresh.get::<i32>("k").unwrap(), None);
}

fn destroy_unknown_is_noop(provider: Arc<dyn Provider>) {
    provider.init("conf-x").unwrap();
    provider.destroy("conf-missing").unwrap();
    assert_eq!(provider.session_count(), 1);
}

fn gc_keeps_recent_sessions(provider: Arc<dyn Provider>) {
    provider.init("conf-g1").unwrap();
    provider.init("conf-g2").unwrap();
    assert_eq!(provider.gc(Duration::from_secs(3600)).unwrap(), 0);
    assert_eq!(provider.session_count(), 2);
}

fn gc_removes_exactly_the_expired_set(provider: Arc<dyn Provider>, clock: Arc<ManualClock>) {
    // Idle ages at sweep time: old1 = 30s, old2 = 20s, edge = 10s, new = 0s
    for sid in ["conf-old1", "conf-old2", "conf-edge", "conf-new"] {
        provider.init(sid).unwrap();
        if sid != "conf-new" {
            clock.advance(Duration::from_secs(10));
        }
    }

    assert_eq!(provider.gc(Duration::from_secs(10)).unwrap(), 2);
    assert_eq!(provider.session_count(), 2);

    // Reading a swept identifier would create it and bump the count
    provider.read("conf-edge").unwrap();
    provider.read("conf-new").unwrap();
    assert_eq!(provider.session_count(), 2);
}

fn data_access_refreshes_recency(provider: Arc<dyn Provider>, clock: Arc<ManualClock>) {
    let kept = provider.init("conf-kept").unwrap();
    provider.init("conf-idle").unwrap();

    clock.advance(Duration::from_secs(30));
    let _ = kept.get_value("anything");
    clock.advance(Duration::from_secs(30));
    kept.set("n", 1).unwrap();
    clock.advance(Duration::from_secs(1));

    assert_eq!(provider.gc(Duration::from_secs(45)).unwrap(), 1);
    assert_eq!(provider.session_count(), 1);
    let reread = provider.read("conf-kept").unwrap();
    assert!(reread.same_record(&kept));
    assert_eq!(reread.get::<i32>("n").unwrap(), Some(1));
}
