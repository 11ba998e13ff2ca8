//! `header { ... }` block tracking
//!
//! A header block may span many lines and contain any number of nested
//! braces. The block ends at the brace where the running balance returns to
//! zero; text after that brace is dropped.

/// Net `{` minus `}` count of `text`.
pub fn brace_balance(text: &str) -> i32 {
    text.chars().fold(0, |balance, ch| match ch {
        '{' => balance + 1,
        '}' => balance - 1,
        _ => balance,
    })
}

/// Byte offset of the `}` that brings `balance` down to zero, if any.
pub fn closing_brace(text: &str, mut balance: i32) -> Option<usize> {
    for (offset, ch) in text.char_indices() {
        match ch {
            '{' => balance += 1,
            '}' => {
                balance -= 1;
                if balance <= 0 {
                    return Some(offset);
                }
            }
            _ => {}
        }
    }
    None
}

/// Result of feeding one line to an open block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Feed<'a> {
    /// The whole line is header content and the block stays open.
    Continue(&'a str),
    /// The block closed on this line; the text before the closing brace.
    Close(&'a str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderBlock {
    balance: i32,
    /// Line of the `header {` opener.
    pub opened_at: usize,
}

impl HeaderBlock {
    /// Start a block whose `{` sits at byte offset `brace` of `line`.
    ///
    /// Returns the block, or `None` if it also closed on this line, along
    /// with the captured text for the line. Everything up to the opening
    /// brace is blanked so columns keep matching the source.
    pub fn open(line: &str, brace: usize, line_no: usize) -> (Option<Self>, String) {
        let (prefix, rest) = line.split_at(brace);
        let after = rest.get(1..).unwrap_or("");

        let (block, content) = match closing_brace(after, 1) {
            Some(close) => (None, &after[..close]),
            None => (
                Some(Self {
                    balance: 1 + brace_balance(after),
                    opened_at: line_no,
                }),
                after,
            ),
        };

        if content.trim().is_empty() {
            return (block, String::new());
        }
        (block, format!("{}{}", blank(prefix), content))
    }

    pub fn feed<'a>(&mut self, line: &'a str) -> Feed<'a> {
        match closing_brace(line, self.balance) {
            Some(close) => {
                self.balance = 0;
                Feed::Close(&line[..close])
            }
            None => {
                self.balance += brace_balance(line);
                Feed::Continue(line)
            }
        }
    }

    pub fn balance(&self) -> i32 {
        self.balance
    }
}

/// Replace `text` with whitespace of the same width, keeping tabs.
fn blank(text: &str) -> String {
    text.chars()
        .map(|ch| if ch == '\t' { '\t' } else { ' ' })
        .chain(std::iter::once(' '))
        .collect()
}
