//! `@if`/`@ifdef` nesting state

use log::trace;

/// Which directive opened or last changed a frame, for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opener {
    If,
    IfDef,
}

impl Opener {
    pub fn directive(self) -> &'static str {
        match self {
            Opener::If => "@if",
            Opener::IfDef => "@ifdef",
        }
    }
}

/// One open conditional block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConditionalFrame {
    /// Lines of the current branch are emitted.
    pub in_true_block: bool,
    /// Some branch of this chain has already been taken.
    pub condition_met: bool,
    pub opener: Opener,
    /// Line of the opening directive.
    pub line: usize,
}

#[derive(Debug, Default)]
pub struct ConditionalStack {
    frames: Vec<ConditionalFrame>,
}

impl ConditionalStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether lines at the current position are emitted.
    pub fn is_active(&self) -> bool {
        self.frames.last().map_or(true, |frame| frame.in_true_block)
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn innermost(&self) -> Option<&ConditionalFrame> {
        self.frames.last()
    }

    /// Open a block. `condition` is only consulted when the enclosing
    /// region is active; a block nested in a disabled branch never activates.
    pub fn open<E>(
        &mut self,
        opener: Opener,
        line: usize,
        condition: impl FnOnce() -> Result<bool, E>,
    ) -> Result<(), E> {
        let frame = if self.is_active() {
            let taken = condition()?;
            ConditionalFrame {
                in_true_block: taken,
                condition_met: taken,
                opener,
                line,
            }
        } else {
            ConditionalFrame {
                in_true_block: false,
                condition_met: true,
                opener,
                line,
            }
        };

        trace!(
            "{} at line {}: depth {} -> {}, active: {}",
            opener.directive(),
            line,
            self.frames.len(),
            self.frames.len() + 1,
            frame.in_true_block
        );
        self.frames.push(frame);
        Ok(())
    }

    /// Handle `@elif`. Returns `Ok(false)` if no block is open.
    pub fn elif<E>(&mut self, condition: impl FnOnce() -> Result<bool, E>) -> Result<bool, E> {
        let Some(frame) = self.frames.last_mut() else {
            return Ok(false);
        };

        if frame.condition_met {
            frame.in_true_block = false;
        } else {
            let taken = condition()?;
            frame.in_true_block = taken;
            frame.condition_met = taken;
        }

        trace!("@elif: active: {}", frame.in_true_block);
        Ok(true)
    }

    /// Handle `@else`. Returns `false` if no block is open.
    pub fn otherwise(&mut self) -> bool {
        match self.frames.last_mut() {
            Some(frame) => {
                frame.in_true_block = !frame.condition_met;
                frame.condition_met = true;
                trace!("@else: active: {}", frame.in_true_block);
                true
            }
            None => false,
        }
    }

    /// Handle `@endif`. Returns `false` if no block is open.
    pub fn close(&mut self) -> bool {
        let closed = self.frames.pop().is_some();
        if closed {
            trace!("@endif: depth {}", self.frames.len());
        }
        closed
    }
}
