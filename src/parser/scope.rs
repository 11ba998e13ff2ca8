//! Declaration scope tracking
//!
//! A stack of name sets. The bottom frame holds globals and function names and
//! is never popped; every function, parameter list and block pushes its own
//! frame for the duration of its parse.

use rustc_hash::FxHashSet;

#[derive(Debug)]
pub struct ScopeStack {
    frames: Vec<FxHashSet<String>>,
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeStack {
    pub fn new() -> Self {
        Self {
            frames: vec![FxHashSet::default()],
        }
    }

    pub fn push(&mut self) {
        self.frames.push(FxHashSet::default());
    }

    /// Pop the innermost frame. The global frame stays in place.
    pub fn pop(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    /// Number of frames, the global frame included.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Drop frames above `depth`; used to unwind after a parse error.
    pub fn truncate(&mut self, depth: usize) {
        self.frames.truncate(depth.max(1));
    }

    /// Record `name` in the innermost frame.
    ///
    /// Returns `false` if the innermost frame already held it.
    pub fn declare(&mut self, name: &str) -> bool {
        match self.frames.last_mut() {
            Some(frame) => frame.insert(name.to_string()),
            None => false,
        }
    }

    /// Search from the innermost frame outward.
    pub fn is_declared(&self, name: &str) -> bool {
        self.frames.iter().rev().any(|frame| frame.contains(name))
    }

    pub fn is_declared_in_current(&self, name: &str) -> bool {
        self.frames
            .last()
            .map_or(false, |frame| frame.contains(name))
    }

    pub fn is_global(&self, name: &str) -> bool {
        self.frames[0].contains(name)
    }
}
