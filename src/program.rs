//! The program driver.
//!
//! A [`Program`] is a closed `init`/`update`/`done` contract. The [`Runtime`]
//! owns the only live model and feeds it one message at a time: every
//! message runs `update` to completion, the new model is committed, and only
//! then is the returned effect started. Sinks handed to effects just enqueue,
//! so an effect can never reenter `update` within the same turn.

use crate::effect::{Dispatch, Effect};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};
use tracing::{debug, trace};

pub trait Program {
    type Msg: fmt::Debug + 'static;
    type Model;

    fn init(&self) -> (Self::Model, Effect<Self::Msg>);

    /// Must not have side effects of its own; those belong in the returned effect.
    fn update(&self, msg: Self::Msg, model: &Self::Model) -> (Self::Model, Effect<Self::Msg>);

    /// Called once at teardown. Releases every adapter still running.
    fn done(&self) {}
}

struct Mailbox<Msg> {
    queue: VecDeque<Msg>,
    open: bool,
}

pub struct Runtime<P: Program> {
    program: P,
    model: P::Model,
    mailbox: Rc<RefCell<Mailbox<P::Msg>>>,
    dispatch: Dispatch<P::Msg>,
    finished: bool,
}

impl<P: Program> Runtime<P> {
    /// Runs `init`, commits its model and starts its effect.
    pub fn start(program: P) -> Self {
        let mailbox = Rc::new(RefCell::new(Mailbox {
            queue: VecDeque::new(),
            open: true,
        }));
        let dispatch = enqueue(Rc::downgrade(&mailbox));

        let (model, effect) = program.init();
        debug!("program started");
        let runtime = Self {
            program,
            model,
            mailbox,
            dispatch,
            finished: false,
        };
        effect.run(&runtime.dispatch);
        runtime
    }

    pub fn model(&self) -> &P::Model {
        &self.model
    }

    pub fn program(&self) -> &P {
        &self.program
    }

    /// A sink for input handlers outside any effect. Messages are queued, not handled.
    pub fn dispatcher(&self) -> Dispatch<P::Msg> {
        Rc::clone(&self.dispatch)
    }

    pub fn pending(&self) -> usize {
        self.mailbox.borrow().queue.len()
    }

    /// Handles queued messages in arrival order until the queue is empty,
    /// including messages queued by effects started along the way.
    pub fn drain(&mut self) -> usize {
        let mut processed = 0;
        loop {
            let next = self.mailbox.borrow_mut().queue.pop_front();
            let Some(msg) = next else {
                break;
            };
            self.step(msg);
            processed += 1;
        }
        processed
    }

    fn step(&mut self, msg: P::Msg) {
        trace!(?msg, "update");
        let (model, effect) = self.program.update(msg, &self.model);
        self.model = model;
        effect.run(&self.dispatch);
    }

    pub fn is_done(&self) -> bool {
        self.finished
    }

    /// Tears the program down. Queued and later messages are dropped.
    pub fn done(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        {
            let mut mailbox = self.mailbox.borrow_mut();
            mailbox.open = false;
            mailbox.queue.clear();
        }
        self.program.done();
        debug!("program done");
    }
}

impl<P: Program> Drop for Runtime<P> {
    fn drop(&mut self) {
        self.done();
    }
}

fn enqueue<Msg: 'static>(mailbox: Weak<RefCell<Mailbox<Msg>>>) -> Dispatch<Msg> {
    Rc::new(move |msg| {
        let Some(mailbox) = mailbox.upgrade() else {
            return;
        };
        let mut mailbox = mailbox.borrow_mut();
        if mailbox.open {
            mailbox.queue.push_back(msg);
        }
    })
}
