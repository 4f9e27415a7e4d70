//! Bounded conversation window.

use std::collections::VecDeque;

use llmbind_core::message::Turn;

/// The most recent `max_messages` turns of one session, oldest first.
///
/// Appending to a full window evicts from the oldest end. Nothing is
/// summarized; evicted turns are gone.
#[derive(Debug, Clone)]
pub struct ChatMemoryWindow {
    max_messages: usize,
    turns: VecDeque<Turn>,
}

impl ChatMemoryWindow {
    /// A window that keeps at most `max_messages` turns (at least one).
    pub fn new(max_messages: usize) -> Self {
        let max_messages = max_messages.max(1);
        Self {
            max_messages,
            turns: VecDeque::with_capacity(max_messages),
        }
    }

    /// Rebuild a window from persisted turns, keeping only the newest.
    pub fn from_turns(max_messages: usize, turns: Vec<Turn>) -> Self {
        let mut window = Self::new(max_messages);
        for turn in turns {
            window.append(turn);
        }
        window
    }

    pub fn append(&mut self, turn: Turn) {
        if self.turns.len() == self.max_messages {
            self.turns.pop_front();
        }
        self.turns.push_back(turn);
    }

    pub fn extend(&mut self, turns: impl IntoIterator<Item = Turn>) {
        for turn in turns {
            self.append(turn);
        }
    }

    /// Copy of the current turns. Later appends do not affect it.
    pub fn snapshot(&self) -> Vec<Turn> {
        self.turns.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn max_messages(&self) -> usize {
        self.max_messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use llmbind_core::message::Role;

    fn contents(turns: &[Turn]) -> Vec<(Role, &str)> {
        turns.iter().map(|t| (t.role, t.content.as_str())).collect()
    }

    #[test]
    fn evicts_oldest_when_full() {
        let mut window = ChatMemoryWindow::new(2);
        window.append(Turn::user("hi"));
        window.append(Turn::assistant("hello"));
        window.append(Turn::user("bye"));

        assert_eq!(
            contents(&window.snapshot()),
            vec![(Role::Assistant, "hello"), (Role::User, "bye")]
        );
    }

    #[test]
    fn keeps_last_n_after_many_appends() {
        let mut window = ChatMemoryWindow::new(3);
        for i in 0..10 {
            window.append(Turn::user(format!("m{i}")));
        }
        let snapshot = window.snapshot();
        assert_eq!(snapshot.len(), 3);
        assert_eq!(
            snapshot.iter().map(|t| t.content.as_str()).collect::<Vec<_>>(),
            vec!["m7", "m8", "m9"]
        );
    }

    #[test]
    fn snapshot_is_a_copy() {
        let mut window = ChatMemoryWindow::new(4);
        window.append(Turn::user("one"));
        let before = window.snapshot();
        window.append(Turn::user("two"));
        assert_eq!(before.len(), 1);
        assert_eq!(window.len(), 2);
    }

    #[test]
    fn zero_capacity_clamped_to_one() {
        let mut window = ChatMemoryWindow::new(0);
        window.append(Turn::user("a"));
        window.append(Turn::user("b"));
        assert_eq!(window.max_messages(), 1);
        assert_eq!(window.snapshot()[0].content, "b");
    }

    #[test]
    fn from_turns_truncates_to_newest() {
        let turns = vec![Turn::user("a"), Turn::assistant("b"), Turn::user("c")];
        let window = ChatMemoryWindow::from_turns(2, turns);
        assert_eq!(
            contents(&window.snapshot()),
            vec![(Role::Assistant, "b"), (Role::User, "c")]
        );
    }
}
