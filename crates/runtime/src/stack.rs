//! Call stack
//!
//! One `Frame` per active invocation. Each frame owns its return slot, so a
//! nested invocation writes its result into its own frame and can never
//! clobber the slot of the call that is still running outside it.
//!
//! Frames are pushed through [`CallStack::push`], which hands back a
//! [`FrameGuard`]. The guard truncates the stack to its entry depth when it
//! goes out of scope, on the success path and on every early return alike.

use itembridge_core::{Item, Symbol};
use std::cell::{RefCell, RefMut};
use std::rc::Rc;

#[derive(Debug, Clone)]
pub struct Frame {
    pub symbol: Symbol,
    pub receiver: Item,
    pub argc: usize,
    ret: Item,
}

impl Frame {
    pub fn new(symbol: Symbol) -> Self {
        Frame {
            symbol,
            receiver: Item::Nil,
            argc: 0,
            ret: Item::Nil,
        }
    }

    pub fn ret(&self) -> &Item {
        &self.ret
    }
}

#[derive(Debug, Clone, Default)]
pub struct CallStack(Rc<RefCell<Vec<Frame>>>);

impl CallStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depth(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn push(&self, frame: Frame) -> FrameGuard {
        let mut frames = self.0.borrow_mut();
        let depth = frames.len();
        frames.push(frame);
        FrameGuard {
            stack: self.clone(),
            depth,
        }
    }

    /// Mutable view of the innermost frame
    pub fn top_mut(&self) -> Option<RefMut<'_, Frame>> {
        RefMut::filter_map(self.0.borrow_mut(), |frames| frames.last_mut()).ok()
    }

    /// Return slot of the innermost frame
    pub fn ret_mut(&self) -> Option<RefMut<'_, Item>> {
        RefMut::filter_map(self.0.borrow_mut(), |frames| {
            frames.last_mut().map(|f| &mut f.ret)
        })
        .ok()
    }

    /// Symbols of the active frames, outermost first
    pub fn symbols(&self) -> Vec<Symbol> {
        self.0.borrow().iter().map(|f| f.symbol).collect()
    }
}

/// Pops its frame (and anything above it) when dropped
#[must_use = "dropping the guard pops the frame immediately"]
pub struct FrameGuard {
    stack: CallStack,
    depth: usize,
}

impl FrameGuard {
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Pop the frame and hand back its return slot
    pub fn finish(self) -> Item {
        let mut frames = self.stack.0.borrow_mut();
        let ret = frames
            .get_mut(self.depth)
            .map(|f| std::mem::take(&mut f.ret))
            .unwrap_or_default();
        frames.truncate(self.depth);
        ret
    }
}

impl Drop for FrameGuard {
    fn drop(&mut self) {
        if let Ok(mut frames) = self.stack.0.try_borrow_mut() {
            frames.truncate(self.depth);
        }
    }
}
