use super::*;
use crate::config::LoopConfig;
use crate::message::HeapMessagePool;
use crate::status::Status;
use crate::watcher::{PeriodicWatcher, Watcher, WorkerWatcher};
use std::net::TcpListener;
use std::os::fd::AsRawFd;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn new_loop() -> EventLoop {
    let cfg = LoopConfig::new(Arc::new(HeapMessagePool)).with_backend(BackendKind::ReadinessLinux);
    EventLoop::init(&cfg).expect("loop init should succeed on linux")
}

#[test]
fn init_starts_in_ready_state() {
    let evloop = new_loop();
    assert_eq!(evloop.state(), LoopState::Ready);
    evloop.destroy();
}

#[test]
fn register_arms_backend_and_deregister_disarms() {
    let mut evloop = new_loop();
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind a loopback listener");
    let fd = listener.as_raw_fd();
    std::mem::forget(listener); // keep fd alive; backend does not own/close it in this test

    let id = evloop
        .register(Watcher::Worker(WorkerWatcher {
            rcv_fd: fd,
            snd_fd: fd,
            on_io: Arc::new(|_, _, _| Status::Ok),
        }))
        .expect("registering a worker watcher should succeed");

    evloop.deregister(id).expect("deregistering should succeed");
    evloop.destroy();

    // SAFETY: close the fd we leaked via `mem::forget` above, now that the
    // backend (which never owned it) is done with it.
    unsafe {
        libc::close(fd);
    }
}

#[test]
fn invalid_transitions_are_rejected() {
    let mut evloop = new_loop();
    evloop.state = LoopState::Running;
    assert!(matches!(evloop.run(), Err(ReactorError::InvalidState { .. })));
    evloop.state = LoopState::Ready;
    evloop.destroy();
}

#[test]
fn run_returns_once_break_loop_is_observed() {
    let mut evloop = new_loop();
    let running = evloop.running_flag();
    let handle = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        running.store(false, Ordering::SeqCst);
    });
    evloop.run().expect("run should return cleanly once stopped");
    handle.join().unwrap();
    assert_eq!(evloop.state(), LoopState::Ready);
    evloop.destroy();
}

#[test]
fn periodic_watcher_ticks_at_least_once_during_a_short_run() {
    let mut evloop = new_loop();
    let ticks = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let ticks2 = Arc::clone(&ticks);
    evloop
        .register(Watcher::Periodic(PeriodicWatcher {
            interval: Duration::from_millis(10),
            on_tick: Arc::new(move |_| {
                ticks2.fetch_add(1, Ordering::SeqCst);
                Status::Ok
            }),
        }))
        .expect("registering a periodic watcher should succeed");

    let running = evloop.running_flag();
    let handle = thread::spawn(move || {
        thread::sleep(Duration::from_millis(400));
        running.store(false, Ordering::SeqCst);
    });
    evloop.run().expect("run should return cleanly once stopped");
    handle.join().unwrap();
    assert!(ticks.load(Ordering::SeqCst) >= 1);
    evloop.destroy();
}
