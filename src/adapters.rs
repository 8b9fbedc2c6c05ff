//! Push adapters over the host: animation frames, key edges and fragment
//! changes. Each one is an [`Adapter`] so the program can start it through an
//! effect and cancel it from `update` or `done`.

use crate::clock::Timestamp;
use crate::effect::{Adapter, Dispatch};
use crate::host::{Host, ListenerId};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::debug;

/* -----------------------------
   Animation frames
------------------------------ */

#[derive(Default)]
struct FrameState {
    generation: u64,
    sink: Option<Dispatch<Timestamp>>,
}

/// Emits the current timestamp on every host frame until cancelled.
#[derive(Clone)]
pub struct AnimationFrames {
    host: Host,
    inner: Rc<RefCell<FrameState>>,
}

impl AnimationFrames {
    pub fn new(host: Host) -> Self {
        Self {
            host,
            inner: Rc::default(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner.borrow().sink.is_some()
    }

    fn schedule(host: &Host, inner: Rc<RefCell<FrameState>>, generation: u64) {
        let next_host = host.clone();
        host.request_frame(move |ts| {
            let sink = {
                let st = inner.borrow();
                if st.generation != generation {
                    return;
                }
                st.sink.clone()
            };
            if let Some(sink) = sink {
                sink(ts);
                Self::schedule(&next_host, inner, generation);
            }
        });
    }
}

impl Adapter for AnimationFrames {
    type Output = Timestamp;

    fn start(&self, sink: Dispatch<Timestamp>) {
        let generation = {
            let mut st = self.inner.borrow_mut();
            st.generation += 1;
            st.sink = Some(sink);
            st.generation
        };
        Self::schedule(&self.host, Rc::clone(&self.inner), generation);
    }

    // A frame already requested still fires, but finds a stale generation.
    fn cancel(&self) {
        let mut st = self.inner.borrow_mut();
        st.generation += 1;
        st.sink = None;
    }
}

/* -----------------------------
   Key edges
------------------------------ */

#[derive(Default)]
struct KeyState {
    listener: Option<ListenerId>,
    sink: Option<Dispatch<bool>>,
    down: bool,
}

/// Emits `true` when the designated key goes down and `false` when it comes
/// back up. Auto-repeat and unmatched releases are swallowed.
#[derive(Clone)]
pub struct KeyEdges {
    host: Host,
    key: KeyCode,
    inner: Rc<RefCell<KeyState>>,
}

impl KeyEdges {
    pub fn new(host: Host, key: KeyCode) -> Self {
        Self {
            host,
            key,
            inner: Rc::default(),
        }
    }

    pub fn is_down(&self) -> bool {
        self.inner.borrow().down
    }

    fn on_key(inner: &RefCell<KeyState>, key: KeyCode, ev: &KeyEvent) {
        if ev.code != key {
            return;
        }
        let (edge, sink) = {
            let mut st = inner.borrow_mut();
            let edge = match ev.kind {
                KeyEventKind::Press if !st.down => {
                    st.down = true;
                    Some(true)
                }
                KeyEventKind::Release if st.down => {
                    st.down = false;
                    Some(false)
                }
                _ => None,
            };
            (edge, st.sink.clone())
        };
        if let (Some(edge), Some(sink)) = (edge, sink) {
            sink(edge);
        }
    }
}

impl Adapter for KeyEdges {
    type Output = bool;

    fn start(&self, sink: Dispatch<bool>) {
        self.cancel();
        let inner = Rc::clone(&self.inner);
        let key = self.key;
        let id = self
            .host
            .add_key_listener(move |ev| Self::on_key(&inner, key, ev));
        let mut st = self.inner.borrow_mut();
        st.listener = Some(id);
        st.sink = Some(sink);
        debug!(?key, "key edges started");
    }

    fn cancel(&self) {
        let listener = {
            let mut st = self.inner.borrow_mut();
            st.sink = None;
            st.down = false;
            st.listener.take()
        };
        if let Some(id) = listener {
            self.host.remove_key_listener(id);
        }
    }
}

/* -----------------------------
   Fragment changes
------------------------------ */

#[derive(Default)]
struct FragmentState {
    listener: Option<ListenerId>,
}

/// Emits the new location fragment whenever it changes. Silent on start.
#[derive(Clone)]
pub struct FragmentChanges {
    host: Host,
    inner: Rc<RefCell<FragmentState>>,
}

impl FragmentChanges {
    pub fn new(host: Host) -> Self {
        Self {
            host,
            inner: Rc::default(),
        }
    }

    pub fn is_listening(&self) -> bool {
        self.inner.borrow().listener.is_some()
    }
}

impl Adapter for FragmentChanges {
    type Output = String;

    fn start(&self, sink: Dispatch<String>) {
        self.cancel();
        let id = self
            .host
            .add_fragment_listener(move |fragment| sink(fragment.to_string()));
        self.inner.borrow_mut().listener = Some(id);
    }

    fn cancel(&self) {
        let listener = self.inner.borrow_mut().listener.take();
        if let Some(id) = listener {
            self.host.remove_fragment_listener(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crossterm::event::KeyModifiers;

    fn host() -> (Host, ManualClock) {
        let clock = ManualClock::new(0);
        (Host::new(Rc::new(clock.clone()), ""), clock)
    }

    fn collector<T: 'static>() -> (Dispatch<T>, Rc<RefCell<Vec<T>>>) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&seen);
        (Rc::new(move |v| s.borrow_mut().push(v)), seen)
    }

    fn space(kind: KeyEventKind) -> KeyEvent {
        KeyEvent::new_with_kind(KeyCode::Char(' '), KeyModifiers::NONE, kind)
    }

    #[test]
    fn frames_tick_until_cancelled() {
        let (host, clock) = host();
        let frames = AnimationFrames::new(host.clone());
        let (sink, seen) = collector();

        frames.start(sink);
        host.fire_frames();
        clock.advance(16);
        host.fire_frames();
        assert_eq!(*seen.borrow(), vec![0, 16]);

        frames.cancel();
        clock.advance(16);
        host.fire_frames();
        host.fire_frames();
        assert_eq!(seen.borrow().len(), 2);
        assert_eq!(host.pending_frames(), 0);
    }

    #[test]
    fn restart_after_cancel_runs_a_single_chain() {
        let (host, _) = host();
        let frames = AnimationFrames::new(host.clone());
        let (sink, seen) = collector();

        frames.start(Rc::clone(&sink));
        frames.cancel();
        frames.start(sink);
        host.fire_frames();
        host.fire_frames();
        assert_eq!(seen.borrow().len(), 2);
        assert_eq!(host.pending_frames(), 1);
    }

    #[test]
    fn key_edges_ignore_repeats_and_other_keys() {
        let (host, _) = host();
        let keys = KeyEdges::new(host.clone(), KeyCode::Char(' '));
        let (sink, seen) = collector();
        keys.start(sink);

        host.emit_key(&space(KeyEventKind::Press));
        host.emit_key(&space(KeyEventKind::Repeat));
        host.emit_key(&space(KeyEventKind::Press));
        host.emit_key(&KeyEvent::new_with_kind(
            KeyCode::Enter,
            KeyModifiers::NONE,
            KeyEventKind::Release,
        ));
        host.emit_key(&space(KeyEventKind::Release));
        host.emit_key(&space(KeyEventKind::Release));
        assert_eq!(*seen.borrow(), vec![true, false]);
    }

    #[test]
    fn cancel_while_down_does_not_leave_key_stuck() {
        let (host, _) = host();
        let keys = KeyEdges::new(host.clone(), KeyCode::Char(' '));
        let (sink, seen) = collector();

        keys.start(Rc::clone(&sink));
        host.emit_key(&space(KeyEventKind::Press));
        keys.cancel();
        assert!(!keys.is_down());
        assert_eq!(host.key_listener_count(), 0);

        host.emit_key(&space(KeyEventKind::Release));
        keys.start(sink);
        host.emit_key(&space(KeyEventKind::Press));
        assert_eq!(*seen.borrow(), vec![true, true]);
        assert_eq!(host.key_listener_count(), 1);
    }

    #[test]
    fn fragment_changes_are_passive() {
        let (host, _) = host();
        host.navigate("#about");
        let changes = FragmentChanges::new(host.clone());
        let (sink, seen) = collector();

        changes.start(sink);
        assert!(seen.borrow().is_empty());
        host.navigate("");
        changes.cancel();
        host.navigate("#about");
        assert_eq!(*seen.borrow(), vec![String::new()]);
        assert!(!changes.is_listening());
    }
}
