//! Open-tag bookkeeping for the truncator.

/// A start tag that has not been closed yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenTag<'a> {
    pub name: &'a str,
    /// Offset of the tag's `<` in the input.
    pub position: usize,
}

/// Stack operation, kept so that operations past the final cut can be undone.
#[derive(Debug, Clone, Copy)]
enum Op {
    Open { position: usize },
    Close { position: usize, popped: usize },
}

impl Op {
    fn position(&self) -> usize {
        match *self {
            Op::Open { position } | Op::Close { position, .. } => position,
        }
    }
}

/// Tags open at the current scan position, innermost on top.
///
/// The cut offset is chosen after the scan has already consumed tags that
/// may lie beyond it, so every push and pop is journaled and
/// [`OpenTagStack::rewind_to`] restores the state as of the cut.
#[derive(Debug, Default)]
pub struct OpenTagStack<'a> {
    open: Vec<OpenTag<'a>>,
    discarded: Vec<OpenTag<'a>>,
    journal: Vec<Op>,
}

impl<'a> OpenTagStack<'a> {
    pub fn open(&mut self, name: &'a str, position: usize) {
        self.open.push(OpenTag { name, position });
        self.journal.push(Op::Open { position });
    }

    /// Closes the innermost open tag named `name`, discarding any unmatched
    /// tags opened inside it. A closing tag with no opener is ignored.
    pub fn close(&mut self, name: &str, position: usize) {
        let Some(idx) = self
            .open
            .iter()
            .rposition(|t| t.name.eq_ignore_ascii_case(name))
        else {
            return;
        };
        let popped = self.open.len() - idx;
        self.discarded.extend(self.open.drain(idx..).rev());
        self.journal.push(Op::Close { position, popped });
    }

    /// Undoes every operation of a tag starting at or after `cut`.
    pub fn rewind_to(&mut self, cut: usize) {
        while self.journal.last().is_some_and(|op| op.position() >= cut) {
            match self.journal.pop() {
                Some(Op::Open { .. }) => {
                    self.open.pop();
                }
                Some(Op::Close { popped, .. }) => {
                    let from = self.discarded.len() - popped;
                    self.open.extend(self.discarded.drain(from..).rev());
                }
                None => break,
            }
        }
    }

    /// Open tags, innermost first.
    pub fn unclosed(&self) -> impl Iterator<Item = &OpenTag<'a>> {
        self.open.iter().rev()
    }
}
