//! Single-threaded host environment.
//!
//! Everything that "waits" lives here: frame callbacks, timeouts, key
//! listeners and the location fragment. The host never blocks; the app loop
//! pumps it (`fire_frames`, `fire_due_timers`, `emit_key`, `navigate`) and
//! callbacks run to completion on the calling thread. Callbacks are taken out
//! of the shared state before they run, so they may freely register more.

use crate::clock::{Clock, Timestamp};
use crossterm::event::KeyEvent;
use std::cell::RefCell;
use std::mem;
use std::rc::Rc;
use tracing::trace;

pub type TimerId = u64;
pub type ListenerId = u64;

type FrameCallback = Box<dyn FnOnce(Timestamp)>;
type KeyListener = Rc<dyn Fn(&KeyEvent)>;
type FragmentListener = Rc<dyn Fn(&str)>;

struct Timer {
    id: TimerId,
    deadline: Timestamp,
    callback: Box<dyn FnOnce()>,
}

#[derive(Default)]
struct HostState {
    next_id: u64,
    frames: Vec<FrameCallback>,
    timers: Vec<Timer>,
    key_listeners: Vec<(ListenerId, KeyListener)>,
    fragment_listeners: Vec<(ListenerId, FragmentListener)>,
    fragment: String,
}

impl HostState {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Clone)]
pub struct Host {
    clock: Rc<dyn Clock>,
    state: Rc<RefCell<HostState>>,
}

impl Host {
    pub fn new(clock: Rc<dyn Clock>, fragment: impl Into<String>) -> Self {
        Self {
            clock,
            state: Rc::new(RefCell::new(HostState {
                fragment: fragment.into(),
                ..HostState::default()
            })),
        }
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /* -----------------------------
       Frames
    ------------------------------ */

    /// Runs `cb` once on the next frame.
    pub fn request_frame(&self, cb: impl FnOnce(Timestamp) + 'static) {
        self.state.borrow_mut().frames.push(Box::new(cb));
    }

    /// Fires every frame callback pending at call time. Callbacks requested
    /// while firing wait for the next frame.
    pub fn fire_frames(&self) -> usize {
        let frames = mem::take(&mut self.state.borrow_mut().frames);
        let now = self.clock.now();
        let n = frames.len();
        for cb in frames {
            cb(now);
        }
        n
    }

    pub fn pending_frames(&self) -> usize {
        self.state.borrow().frames.len()
    }

    /* -----------------------------
       Timeouts
    ------------------------------ */

    pub fn set_timeout(&self, delay_ms: i64, cb: impl FnOnce() + 'static) -> TimerId {
        let deadline = self.clock.now() + delay_ms.max(0);
        let mut st = self.state.borrow_mut();
        let id = st.next_id();
        st.timers.push(Timer {
            id,
            deadline,
            callback: Box::new(cb),
        });
        trace!(id, deadline, "timeout scheduled");
        id
    }

    pub fn clear_timeout(&self, id: TimerId) -> bool {
        let mut st = self.state.borrow_mut();
        let before = st.timers.len();
        st.timers.retain(|t| t.id != id);
        st.timers.len() != before
    }

    /// Fires timers due at call time, earliest deadline first, ties in
    /// registration order.
    pub fn fire_due_timers(&self) -> usize {
        let now = self.clock.now();
        let mut due = {
            let mut st = self.state.borrow_mut();
            let (due, rest): (Vec<Timer>, Vec<Timer>) =
                mem::take(&mut st.timers).into_iter().partition(|t| t.deadline <= now);
            st.timers = rest;
            due
        };
        due.sort_by_key(|t| (t.deadline, t.id));
        let n = due.len();
        for t in due {
            trace!(id = t.id, "timeout fired");
            (t.callback)();
        }
        n
    }

    pub fn next_deadline(&self) -> Option<Timestamp> {
        self.state.borrow().timers.iter().map(|t| t.deadline).min()
    }

    pub fn pending_timers(&self) -> usize {
        self.state.borrow().timers.len()
    }

    /* -----------------------------
       Keys
    ------------------------------ */

    pub fn add_key_listener(&self, listener: impl Fn(&KeyEvent) + 'static) -> ListenerId {
        let mut st = self.state.borrow_mut();
        let id = st.next_id();
        st.key_listeners.push((id, Rc::new(listener)));
        id
    }

    pub fn remove_key_listener(&self, id: ListenerId) {
        self.state.borrow_mut().key_listeners.retain(|(l, _)| *l != id);
    }

    pub fn emit_key(&self, ev: &KeyEvent) {
        let listeners: Vec<KeyListener> = self
            .state
            .borrow()
            .key_listeners
            .iter()
            .map(|(_, l)| Rc::clone(l))
            .collect();
        for l in listeners {
            l(ev);
        }
    }

    pub fn key_listener_count(&self) -> usize {
        self.state.borrow().key_listeners.len()
    }

    /* -----------------------------
       Location fragment
    ------------------------------ */

    pub fn fragment(&self) -> String {
        self.state.borrow().fragment.clone()
    }

    pub fn add_fragment_listener(&self, listener: impl Fn(&str) + 'static) -> ListenerId {
        let mut st = self.state.borrow_mut();
        let id = st.next_id();
        st.fragment_listeners.push((id, Rc::new(listener)));
        id
    }

    pub fn remove_fragment_listener(&self, id: ListenerId) {
        self.state
            .borrow_mut()
            .fragment_listeners
            .retain(|(l, _)| *l != id);
    }

    pub fn fragment_listener_count(&self) -> usize {
        self.state.borrow().fragment_listeners.len()
    }

    /// Moves to `fragment`. Listeners hear about it only if it changed.
    pub fn navigate(&self, fragment: &str) -> bool {
        let listeners: Vec<FragmentListener> = {
            let mut st = self.state.borrow_mut();
            if st.fragment == fragment {
                return false;
            }
            st.fragment = fragment.to_string();
            st.fragment_listeners
                .iter()
                .map(|(_, l)| Rc::clone(l))
                .collect()
        };
        trace!(fragment, "navigate");
        for l in listeners {
            l(fragment);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::cell::Cell;

    fn host() -> (Host, ManualClock) {
        let clock = ManualClock::new(1_000);
        (Host::new(Rc::new(clock.clone()), ""), clock)
    }

    #[test]
    fn frames_requested_while_firing_wait_for_next_frame() {
        let (host, _) = host();
        let count = Rc::new(Cell::new(0));

        fn again(host: Host, count: Rc<Cell<u32>>) {
            let h = host.clone();
            host.request_frame(move |_| {
                count.set(count.get() + 1);
                again(h, count);
            });
        }
        again(host.clone(), Rc::clone(&count));

        assert_eq!(host.fire_frames(), 1);
        assert_eq!(host.fire_frames(), 1);
        assert_eq!(count.get(), 2);
        assert_eq!(host.pending_frames(), 1);
    }

    #[test]
    fn timers_fire_in_deadline_order_once_due() {
        let (host, clock) = host();
        let log = Rc::new(RefCell::new(Vec::new()));

        for (delay, tag) in [(500, "late"), (100, "early"), (100, "early-2")] {
            let log = Rc::clone(&log);
            host.set_timeout(delay, move || log.borrow_mut().push(tag));
        }
        assert_eq!(host.next_deadline(), Some(1_100));

        clock.advance(99);
        assert_eq!(host.fire_due_timers(), 0);
        clock.advance(1);
        assert_eq!(host.fire_due_timers(), 2);
        clock.advance(400);
        assert_eq!(host.fire_due_timers(), 1);
        assert_eq!(*log.borrow(), vec!["early", "early-2", "late"]);
        assert_eq!(host.next_deadline(), None);
    }

    #[test]
    fn cleared_timer_never_fires() {
        let (host, clock) = host();
        let fired = Rc::new(Cell::new(false));
        let f = Rc::clone(&fired);
        let id = host.set_timeout(10, move || f.set(true));
        assert!(host.clear_timeout(id));
        assert!(!host.clear_timeout(id));
        clock.advance(10);
        host.fire_due_timers();
        assert!(!fired.get());
    }

    #[test]
    fn navigate_notifies_only_on_change() {
        let (host, _) = host();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&seen);
        let id = host.add_fragment_listener(move |f| s.borrow_mut().push(f.to_string()));

        assert!(host.navigate("#about"));
        assert!(!host.navigate("#about"));
        assert!(host.navigate("#"));
        assert_eq!(*seen.borrow(), vec!["#about", "#"]);

        host.remove_fragment_listener(id);
        host.navigate("#about");
        assert_eq!(seen.borrow().len(), 2);
        assert_eq!(host.fragment(), "#about");
    }
}
