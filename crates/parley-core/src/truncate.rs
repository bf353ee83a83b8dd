//! History truncation
//!
//! Tokens are approximated as whitespace-delimited words. Truncation is a
//! single sweep from the newest turn to the oldest with one running total:
//! a turn that would push the total above the budget is dropped and does not
//! count, and the sweep carries on, so a short older turn can survive after a
//! long newer one was dropped. The newest turn is always kept.

use parley_llm::Message;
use tracing::debug;

/// Approximate token count of a history
#[must_use]
pub fn count_tokens(history: &[Message]) -> usize {
    history.iter().map(Message::word_count).sum()
}

/// Drop turns from `history` until it fits in `max_tokens`.
///
/// Returns the number of removed turns.
pub fn truncate_history(history: &mut Vec<Message>, max_tokens: usize) -> usize {
    let Some(newest) = history.last() else {
        return 0;
    };

    let mut total = newest.word_count();
    let mut keep = vec![true; history.len()];

    for (index, message) in history.iter().enumerate().rev().skip(1) {
        let words = message.word_count();
        if total + words > max_tokens {
            keep[index] = false;
        } else {
            total += words;
        }
    }

    let before = history.len();
    let mut flags = keep.into_iter();
    history.retain(|_| flags.next().unwrap_or(true));
    let removed = before - history.len();

    if removed > 0 {
        debug!(removed, remaining = history.len(), tokens = total, max_tokens, "Truncated history");
    }

    removed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(n: usize) -> String {
        vec!["w"; n].join(" ")
    }

    #[test]
    fn test_reverse_sweep_scenario() {
        let mut history = vec![
            Message::user("a b c"),
            Message::assistant("d e"),
            Message::user("f"),
        ];

        let removed = truncate_history(&mut history, 4);

        assert_eq!(removed, 1);
        assert_eq!(history, vec![Message::assistant("d e"), Message::user("f")]);
    }

    #[test]
    fn test_within_budget_untouched() {
        let mut history = vec![Message::user("one two"), Message::assistant("three")];
        assert_eq!(truncate_history(&mut history, 3), 0);
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_empty_history() {
        let mut history: Vec<Message> = Vec::new();
        assert_eq!(truncate_history(&mut history, 0), 0);
        assert!(history.is_empty());
    }

    #[test]
    fn test_skipped_turn_does_not_block_older_short_turn() {
        // newest 2, then 10 (overflows, dropped), then 1 (still fits)
        let mut history = vec![
            Message::user(words(1)),
            Message::assistant(words(10)),
            Message::user(words(2)),
        ];

        truncate_history(&mut history, 4);

        assert_eq!(history, vec![Message::user(words(1)), Message::user(words(2))]);
        assert!(count_tokens(&history) <= 4);
    }

    #[test]
    fn test_differs_from_newest_suffix() {
        // Keeping only the newest contiguous suffix would give [3]; the sweep keeps [1, 3].
        let mut history = vec![
            Message::user(words(1)),
            Message::assistant(words(5)),
            Message::user(words(3)),
        ];

        truncate_history(&mut history, 4);

        assert_eq!(history.len(), 2);
        assert_eq!(history[0].word_count(), 1);
        assert_eq!(history[1].word_count(), 3);
    }

    #[test]
    fn test_oversized_newest_turn_is_kept_alone() {
        let mut history = vec![
            Message::user(words(1)),
            Message::assistant(""),
            Message::user(words(50)),
        ];

        truncate_history(&mut history, 10);

        assert_eq!(history, vec![Message::user(words(50))]);
    }

    #[test]
    fn test_zero_budget_keeps_newest() {
        let mut history = vec![Message::user("a"), Message::assistant("b")];
        truncate_history(&mut history, 0);
        assert_eq!(history, vec![Message::assistant("b")]);
    }

    #[test]
    fn test_idempotent() {
        let cases: Vec<(Vec<usize>, usize)> = vec![
            (vec![3, 2, 1], 4),
            (vec![1, 10, 2], 4),
            (vec![7, 0, 3, 3, 9, 1], 8),
            (vec![20], 5),
            (vec![2, 2, 2, 2], 0),
        ];

        for (sizes, budget) in cases {
            let mut history: Vec<Message> = sizes.iter().map(|&n| Message::user(words(n))).collect();
            truncate_history(&mut history, budget);
            let once = history.clone();
            let removed = truncate_history(&mut history, budget);
            assert_eq!(removed, 0, "second pass removed turns for {:?}", sizes);
            assert_eq!(history, once);
        }
    }

    #[test]
    fn test_bound_holds() {
        let cases: Vec<(Vec<usize>, usize)> = vec![
            (vec![5, 4, 3, 2, 1], 6),
            (vec![1, 1, 1, 1, 1, 1], 3),
            (vec![0, 0, 8], 2),
            (vec![4, 9, 1, 1], 5),
        ];

        for (sizes, budget) in cases {
            let mut history: Vec<Message> = sizes.iter().map(|&n| Message::user(words(n))).collect();
            truncate_history(&mut history, budget);
            assert!(
                count_tokens(&history) <= budget || history.len() == 1,
                "bound violated for {:?} / {}",
                sizes,
                budget
            );
            assert_eq!(
                history.last().map(Message::word_count),
                sizes.last().copied(),
                "newest turn must survive"
            );
        }
    }
}
