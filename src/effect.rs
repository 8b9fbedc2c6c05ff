//! Effects: declarative, startable units of asynchronous work.
//!
//! An [`Effect`] is a value. Building one does nothing; only [`Effect::run`]
//! starts it against a [`Dispatch`] sink, after which it may emit any number
//! of messages over time. Effects that wrap a long-lived source are built
//! from an [`Adapter`], whose lifecycle stays with the adapter's owner.

use std::fmt;
use std::rc::Rc;

/// Message sink handed to a running effect.
pub type Dispatch<Msg> = Rc<dyn Fn(Msg)>;

pub enum Effect<Msg> {
    /// No effect at all. Mapping and batching treat it as a no-op.
    None,
    Run(Box<dyn FnOnce(Dispatch<Msg>)>),
}

impl<Msg: 'static> Effect<Msg> {
    pub fn none() -> Self {
        Effect::None
    }

    pub fn from_fn(f: impl FnOnce(Dispatch<Msg>) + 'static) -> Self {
        Effect::Run(Box::new(f))
    }

    /// Emits `msg` once, as soon as the effect is started.
    pub fn dispatch(msg: Msg) -> Self {
        Effect::from_fn(move |d| d(msg))
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Effect::None)
    }

    pub fn run(self, dispatch: &Dispatch<Msg>) {
        if let Effect::Run(f) = self {
            f(Rc::clone(dispatch));
        }
    }

    /// Applies `f` to every message the effect emits.
    pub fn map<B: 'static>(self, f: impl Fn(Msg) -> B + 'static) -> Effect<B> {
        match self {
            Effect::None => Effect::None,
            Effect::Run(run) => Effect::from_fn(move |sink: Dispatch<B>| {
                let inner: Dispatch<Msg> = Rc::new(move |msg| sink(f(msg)));
                run(inner)
            }),
        }
    }
}

impl<Msg> fmt::Debug for Effect<Msg> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Effect::None => f.write_str("Effect::None"),
            Effect::Run(_) => f.write_str("Effect::Run(..)"),
        }
    }
}

pub fn map<A: 'static, B: 'static>(effect: Effect<A>, f: impl Fn(A) -> B + 'static) -> Effect<B> {
    effect.map(f)
}

/// Starts every member against the same sink, in order, when the batch is
/// started. Members keep their own cancellation; the batch has none.
pub fn batch<Msg: 'static>(effects: impl IntoIterator<Item = Effect<Msg>>) -> Effect<Msg> {
    let effects: Vec<Effect<Msg>> = effects.into_iter().filter(|e| !e.is_none()).collect();
    if effects.is_empty() {
        return Effect::None;
    }
    Effect::from_fn(move |d| {
        for effect in effects {
            effect.run(&d);
        }
    })
}

/// A long-lived event source with an explicit start/cancel lifecycle.
///
/// Clones share state, so the owner can keep one handle for cancelling while
/// another is moved into a start effect.
pub trait Adapter: Clone + 'static {
    type Output: 'static;

    /// Begins emitting through `sink`. Starting twice without a cancel in
    /// between replaces the sink.
    fn start(&self, sink: Dispatch<Self::Output>);

    /// Stops emitting. Callbacks still pending in the host become inert.
    fn cancel(&self);
}

pub fn start<A: Adapter>(adapter: &A) -> Effect<A::Output> {
    let adapter = adapter.clone();
    Effect::from_fn(move |sink| adapter.start(sink))
}

/// An effect that emits nothing and cancels `adapter` when started.
pub fn cancel<A: Adapter, Msg: 'static>(adapter: &A) -> Effect<Msg> {
    let adapter = adapter.clone();
    Effect::from_fn(move |_| adapter.cancel())
}
