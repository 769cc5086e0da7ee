use kernel_sync::SpinLock;
use std::panic;

#[test]
fn guard_releases_on_drop() {
    let l = SpinLock::new(0_u32);

    {
        let mut g = l.lock();
        *g = 41;
        assert!(l.is_locked());
    }
    assert!(!l.is_locked());

    let mut g = l.lock();
    *g += 1;
    assert_eq!(*g, 42);
}

#[test]
fn try_lock_fails_while_held() {
    let l = SpinLock::new(1u8);

    let g1 = l.try_lock();
    assert!(g1.is_some());
    assert!(l.try_lock().is_none());

    drop(g1);
    assert!(l.try_lock().is_some());
}

#[test]
fn with_lock_returns_closure_value() {
    let l = SpinLock::new(vec![1, 2]);
    let len = l.with_lock(|v| {
        v.push(3);
        v.len()
    });
    assert_eq!(len, 3);
    assert_eq!(l.into_inner(), vec![1, 2, 3]);
}

#[test]
fn contended_increments_are_exact() {
    use std::sync::Arc;
    use std::thread;

    let lock = Arc::new(SpinLock::new(0usize));
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let lock = Arc::clone(&lock);
            thread::spawn(move || {
                for _ in 0..2_000 {
                    lock.with_lock(|v| *v += 1);
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(*lock.lock(), 8_000);
}

#[test]
fn lock_is_released_on_panic() {
    let l = SpinLock::new(0u32);

    let res = panic::catch_unwind(panic::AssertUnwindSafe(|| {
        l.with_lock(|v| {
            *v = 123;
            panic!("boom");
        });
    }));
    assert!(res.is_err());
    assert_eq!(l.with_lock(|v| *v), 123);
}
