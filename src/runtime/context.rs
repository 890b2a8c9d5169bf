//! Execution contexts and the context stack
//!
//! Entry identity is the entry's index within its sequence, so two
//! structurally identical entries at different positions are distinct.

use crate::types::{Entry, EntrySequence};
use serde::Serialize;
use std::collections::BTreeSet;

/// One in-progress traversal of an entry sequence
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    entries: EntrySequence,
    processed: BTreeSet<usize>,
}

impl ExecutionContext {
    pub fn new(entries: EntrySequence) -> Self {
        Self {
            entries,
            processed: BTreeSet::new(),
        }
    }

    pub fn entries(&self) -> &EntrySequence {
        &self.entries
    }

    pub fn processed(&self) -> &BTreeSet<usize> {
        &self.processed
    }

    /// Index of the first entry not yet processed, in sequence order
    pub fn next_unprocessed(&self) -> Option<usize> {
        (0..self.entries.len()).find(|index| !self.processed.contains(index))
    }

    /// Mark an entry as processed; returns false if it already was
    pub fn mark_processed(&mut self, index: usize) -> bool {
        self.processed.insert(index)
    }

    pub fn is_exhausted(&self) -> bool {
        self.next_unprocessed().is_none()
    }
}

/// What the next entry would be, without consuming it
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeekNext {
    /// Stack depth at which the entry was found
    pub depth: usize,
    pub next_character: Option<String>,
    pub next_dialogue: Option<String>,
}

/// LIFO stack of execution contexts; the last one is current
#[derive(Debug, Clone, Default)]
pub struct ContextStack {
    contexts: Vec<ExecutionContext>,
}

impl ContextStack {
    pub fn new(root: EntrySequence) -> Self {
        Self {
            contexts: vec![ExecutionContext::new(root)],
        }
    }

    pub fn push(&mut self, entries: EntrySequence) {
        self.contexts.push(ExecutionContext::new(entries));
    }

    pub fn pop(&mut self) -> Option<ExecutionContext> {
        self.contexts.pop()
    }

    pub fn current(&self) -> Option<&ExecutionContext> {
        self.contexts.last()
    }

    pub fn current_mut(&mut self) -> Option<&mut ExecutionContext> {
        self.contexts.last_mut()
    }

    pub fn depth(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    /// Look at the next entry that would be consumed.
    ///
    /// Exhausted contexts are skipped as if popped; nothing is marked
    /// processed and branches are not evaluated.
    pub fn peek(&self) -> Option<PeekNext> {
        self.contexts
            .iter()
            .enumerate()
            .rev()
            .find_map(|(position, context)| {
                let index = context.next_unprocessed()?;
                let entry: &Entry = &context.entries()[index];
                Some(PeekNext {
                    depth: position + 1,
                    next_character: entry.character().map(str::to_string),
                    next_dialogue: entry.dialogue().map(str::to_string),
                })
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(text: &str) -> Entry {
        Entry::dialogue_line(None, text)
    }

    #[test]
    fn identical_entries_are_tracked_by_position() {
        let mut context = ExecutionContext::new(vec![line("Hi"), line("Hi")].into());
        assert_eq!(context.next_unprocessed(), Some(0));
        assert!(context.mark_processed(0));
        assert_eq!(context.next_unprocessed(), Some(1));
        assert!(!context.mark_processed(0));
        context.mark_processed(1);
        assert!(context.is_exhausted());
    }

    #[test]
    fn peek_skips_exhausted_contexts_without_mutating() {
        let mut stack = ContextStack::new(
            vec![
                Entry::dialogue_line(Some("Alice"), "root"),
                line("after"),
            ]
            .into(),
        );
        stack.current_mut().unwrap().mark_processed(0);
        stack.push(vec![line("branch")].into());
        stack.current_mut().unwrap().mark_processed(0);

        let peek = stack.peek().unwrap();
        assert_eq!(peek.depth, 1);
        assert_eq!(peek.next_character, None);
        assert_eq!(peek.next_dialogue.as_deref(), Some("after"));

        assert_eq!(stack.depth(), 2);
        assert_eq!(stack.current().unwrap().processed().len(), 1);
    }

    #[test]
    fn peek_on_finished_stack_is_none() {
        let mut stack = ContextStack::new(vec![line("only")].into());
        stack.current_mut().unwrap().mark_processed(0);
        assert!(stack.peek().is_none());
        stack.pop();
        assert!(stack.is_empty());
        assert!(stack.peek().is_none());
    }
}
