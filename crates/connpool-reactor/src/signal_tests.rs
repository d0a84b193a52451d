use super::*;

#[test]
fn watch_then_raise_sets_the_flag_observed_by_take_raised() {
    watch(libc::SIGUSR1).unwrap();
    assert!(!take_raised(libc::SIGUSR1));
    unsafe { libc::raise(libc::SIGUSR1) };
    assert!(take_raised(libc::SIGUSR1));
    // a second check without an intervening raise sees nothing
    assert!(!take_raised(libc::SIGUSR1));
}

#[test]
fn watch_is_idempotent_for_the_same_signal() {
    watch(libc::SIGUSR2).unwrap();
    watch(libc::SIGUSR2).unwrap();
}

#[test]
fn drain_raised_returns_and_clears_every_fired_signal() {
    watch(libc::SIGUSR1).unwrap();
    unsafe { libc::raise(libc::SIGUSR1) };
    let drained = drain_raised();
    assert!(drained.contains(&libc::SIGUSR1));
    assert!(!take_raised(libc::SIGUSR1));
}

#[test]
fn out_of_range_signal_number_is_rejected() {
    assert!(watch(9999).is_err());
    assert!(!take_raised(9999));
}
