//! Per-node knowledge banks: insertion-ordered question/answer maps.
//!
//! Numbering is 1-based and follows insertion order, which is the order the
//! knowledge selector presents items to the model.

use indexmap::IndexMap;
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct KnowledgeBank {
    entries: IndexMap<String, String>,
}

impl KnowledgeBank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Store an answer. Re-inserting a question replaces its answer in place.
    pub fn insert(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.entries.insert(question.into(), answer.into());
    }

    pub fn get(&self, question: &str) -> Option<&str> {
        self.entries.get(question).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(q, a)| (q.as_str(), a.as_str()))
    }

    pub fn questions(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Merge `other` into this bank; on conflicting questions `other` wins.
    pub fn merge(&mut self, other: &KnowledgeBank) {
        for (question, answer) in other.iter() {
            self.insert(question, answer);
        }
    }

    /// Combine this bank with a boss's bank. Own entries shadow the boss's.
    pub fn with_fallback(&self, boss: &KnowledgeBank) -> KnowledgeBank {
        let mut combined = boss.clone();
        combined.merge(self);
        combined
    }

    /// Entries whose question is one of `questions`; unknown keys are skipped.
    pub fn subset<'q>(&self, questions: impl IntoIterator<Item = &'q str>) -> KnowledgeBank {
        let mut picked = KnowledgeBank::new();
        for question in questions {
            if let Some(answer) = self.get(question) {
                picked.insert(question, answer);
            }
        }
        picked
    }

    /// Questions rendered as `1. question`, one per entry.
    pub fn numbered_questions(&self) -> Vec<String> {
        self.questions()
            .enumerate()
            .map(|(index, question)| format!("{}. {question}", index + 1))
            .collect()
    }

    /// Entries rendered as question/answer bullets for planning prompts.
    pub fn render_qna(&self) -> Vec<String> {
        self.iter()
            .map(|(question, answer)| format!("- Question: \"{question}\". Answer: \"{answer}\""))
            .collect()
    }

    /// Entries picked by 1-based position. Out-of-range numbers are ignored.
    pub fn select_numbers(&self, numbers: impl IntoIterator<Item = usize>) -> KnowledgeBank {
        let mut picked = KnowledgeBank::new();
        for number in numbers {
            let Some(index) = number.checked_sub(1) else {
                continue;
            };
            if let Some((question, answer)) = self.entries.get_index(index) {
                picked.insert(question.as_str(), answer.as_str());
            }
        }
        picked
    }
}

/// Read the item number out of a selection argument such as `3`, `3.` or
/// `3. Contents of "a.txt"`.
pub fn parse_selection_number(raw: &str) -> Option<usize> {
    let trimmed = raw.trim().trim_start_matches('#');
    let digits_len = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    trimmed[..digits_len].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bank(entries: &[(&str, &str)]) -> KnowledgeBank {
        let mut bank = KnowledgeBank::new();
        for (q, a) in entries {
            bank.insert(*q, *a);
        }
        bank
    }

    #[test]
    fn merge_prefers_incoming_entries() {
        let mut own = bank(&[("a", "old"), ("b", "kept")]);
        own.merge(&bank(&[("a", "new"), ("c", "added")]));
        assert_eq!(own.get("a"), Some("new"));
        assert_eq!(own.get("b"), Some("kept"));
        assert_eq!(own.get("c"), Some("added"));
        assert_eq!(own.questions().collect::<Vec<_>>(), vec!["a", "b", "c"]);
    }

    #[test]
    fn own_entries_shadow_boss_entries() {
        let own = bank(&[("shared", "mine")]);
        let boss = bank(&[("shared", "boss"), ("only-boss", "x")]);
        let combined = own.with_fallback(&boss);
        assert_eq!(combined.get("shared"), Some("mine"));
        assert_eq!(combined.get("only-boss"), Some("x"));
    }

    #[test]
    fn numbering_and_selection_are_one_based() {
        let bank = bank(&[("first", "1"), ("second", "2"), ("third", "3")]);
        assert_eq!(
            bank.numbered_questions(),
            vec!["1. first", "2. second", "3. third"]
        );
        let picked = bank.select_numbers([3, 0, 9, 1]);
        assert_eq!(picked.questions().collect::<Vec<_>>(), vec!["third", "first"]);
    }

    #[test]
    fn subset_skips_unknown_keys() {
        let bank = bank(&[("code", "fn main() {}"), ("other", "x")]);
        let picked = bank.subset(["code", "missing"]);
        assert_eq!(picked.len(), 1);
        assert_eq!(picked.get("code"), Some("fn main() {}"));
    }

    #[test]
    fn renders_question_and_answer_bullets() {
        let bank = bank(&[("Contents of \"a.txt\"", "hello")]);
        assert_eq!(
            bank.render_qna(),
            vec!["- Question: \"Contents of \"a.txt\"\". Answer: \"hello\"".to_string()]
        );
    }

    #[test]
    fn selection_numbers_tolerate_decoration() {
        assert_eq!(parse_selection_number("3"), Some(3));
        assert_eq!(parse_selection_number(" 12. "), Some(12));
        assert_eq!(parse_selection_number("2. Contents of \"a.txt\""), Some(2));
        assert_eq!(parse_selection_number("#4"), Some(4));
        assert_eq!(parse_selection_number("three"), None);
        assert_eq!(parse_selection_number(""), None);
    }
}
