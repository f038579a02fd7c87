//! Property tests for paragraph chunking bounds.

use std::collections::HashSet;

use codepal_rag::chunking::ParagraphChunker;
use proptest::prelude::*;

/// Text mixing paragraphs, sentences, ASCII and full-width punctuation.
fn arb_text() -> impl Strategy<Value = String> {
    proptest::collection::vec(
        prop_oneof![
            "[a-zA-Z]{1,12}",
            Just(" ".to_string()),
            Just(". ".to_string()),
            Just("\n\n".to_string()),
            Just("编程".to_string()),
            Just("。".to_string()),
        ],
        0..400,
    )
    .prop_map(|parts| parts.concat())
}

mod prop_segment_length {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn no_segment_exceeds_max(
            text in arb_text(),
            max in 1usize..120,
            overlap_ratio in 0.0f64..1.0,
        ) {
            let overlap = (max as f64 * overlap_ratio) as usize;
            let chunker = ParagraphChunker::new(max, overlap);
            for segment in chunker.split_text(&text) {
                prop_assert!(!segment.is_empty());
                prop_assert!(
                    segment.chars().count() <= max,
                    "segment of {} chars exceeds {}: {:?}",
                    segment.chars().count(),
                    max,
                    segment
                );
            }
        }
    }
}

mod prop_overlap_bound {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// With unique word tokens, the words a segment shares with its
        /// predecessor are exactly its overlap prefix.
        #[test]
        fn overlap_never_exceeds_max_overlap(
            word_count in 1usize..300,
            max in 10usize..200,
            overlap_ratio in 0.0f64..1.0,
        ) {
            let overlap = (max as f64 * overlap_ratio) as usize;
            let words: Vec<String> = (0..word_count).map(|i| format!("w{i}")).collect();
            let text = words.join(" ");

            let segments = ParagraphChunker::new(max, overlap).split_text(&text);

            for pair in segments.windows(2) {
                let previous: HashSet<&str> = pair[0].split(' ').collect();
                let shared: Vec<&str> =
                    pair[1].split(' ').take_while(|w| previous.contains(w)).collect();
                let shared_len = shared.join(" ").chars().count();
                prop_assert!(shared_len <= overlap, "overlap {shared_len} > {overlap}");
                prop_assert!(pair[0].ends_with(&shared.join(" ")));
            }

            // Every word survives, in order.
            let mut seen: Vec<String> = Vec::new();
            let mut known = HashSet::new();
            for word in segments.iter().flat_map(|s| s.split(' ')) {
                if known.insert(word.to_string()) {
                    seen.push(word.to_string());
                }
            }
            prop_assert_eq!(seen, words);
        }
    }
}
