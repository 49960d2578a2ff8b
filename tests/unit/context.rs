use super::*;

fn ctx(name: &str) -> ExecutionContext {
    ExecutionContext::new(DeviceDesc::new(name, "test"))
}

#[test]
fn scope_restores_previous_context() {
    let a = ctx("a");
    let b = ctx("b");
    ExecutionContext::unbind();

    {
        let _sa = a.scope();
        assert!(a.is_current());
        {
            let _sb = b.scope();
            assert!(b.is_current());
            assert!(!a.is_current());
        }
        assert!(a.is_current());
    }
    assert!(ExecutionContext::current().is_none());
}

#[test]
fn scope_restores_on_unwind() {
    let a = ctx("a");
    let b = ctx("b");
    a.bind();

    let r = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let _sb = b.scope();
        assert!(b.is_current());
        panic!("boom");
    }));
    assert!(r.is_err());
    assert!(a.is_current());
    ExecutionContext::unbind();
}

#[test]
fn binding_is_per_thread() {
    let a = ctx("a");
    let _s = a.scope();
    let other = std::thread::spawn(ExecutionContext::current).join().unwrap();
    assert!(other.is_none());
    assert!(a.is_current());
}

#[test]
fn clones_share_identity_and_compute_flag() {
    let a = ctx("a");
    let a2 = a.clone();
    assert_eq!(a, a2);
    assert_ne!(a, ctx("a"));

    assert!(a.use_compute());
    a2.set_use_compute(false);
    assert!(!a.use_compute());
}
