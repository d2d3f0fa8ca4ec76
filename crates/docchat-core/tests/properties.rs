//! Property tests for segmentation coverage and the relevance filter.

use std::num::NonZeroUsize;
use std::sync::Arc;

use docchat_core::models::{Candidate, Document, Metadata};
use docchat_core::observe::NoopObserver;
use docchat_core::retrieve::{filter_results, RELEVANCE_THRESHOLD};
use docchat_core::segment::{clamp_overlap, Segmenter};
use proptest::prelude::*;

/// Non-blank text mixing ASCII and multi-byte characters.
fn arb_content() -> impl Strategy<Value = String> {
    "[a-zé─ \n]{0,300}[a-z]"
}

fn arb_candidate() -> impl Strategy<Value = Candidate> {
    ("[a-z]{1,12}", 0.0f64..3.0).prop_map(|(content, distance)| Candidate {
        content,
        metadata: Metadata::new(),
        distance,
    })
}

mod prop_segment_coverage {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn windows_cover_content_with_exact_overlap(
            content in arb_content(),
            size in 1usize..64,
            overlap in 0usize..80,
        ) {
            let size = NonZeroUsize::new(size).unwrap();
            let seg = Segmenter::new(size, overlap, Arc::new(NoopObserver));
            let effective = clamp_overlap(size, overlap);
            let chars: Vec<char> = content.chars().collect();
            let len = chars.len() as u64;

            let chunks = seg.chunk(&Document::new(content.clone(), "p.md", "p.md"));
            prop_assert!(!chunks.is_empty());
            prop_assert!(chunks.len() as u64 <= len);

            let spans: Vec<(u64, u64)> = chunks
                .iter()
                .map(|c| (c.chunk_start().unwrap(), c.chunk_end().unwrap()))
                .collect();

            prop_assert_eq!(spans[0].0, 0);
            prop_assert_eq!(spans[spans.len() - 1].1, len);

            for (chunk, &(start, end)) in chunks.iter().zip(&spans) {
                prop_assert!(start < end);
                prop_assert!(end - start <= size.get() as u64);
                let expected: String = chars[start as usize..end as usize].iter().collect();
                prop_assert_eq!(&chunk.content, &expected);
            }

            for pair in spans.windows(2) {
                let (a, b) = (pair[0], pair[1]);
                prop_assert!(b.0 > a.0);
                prop_assert_eq!(a.1 - b.0, effective as u64);
            }
        }

        #[test]
        fn clamped_overlap_is_below_chunk_size(size in 1usize..10_000, overlap in 0usize..20_000) {
            let size = NonZeroUsize::new(size).unwrap();
            let effective = clamp_overlap(size, overlap);
            prop_assert!(effective < size.get());
            if overlap < size.get() {
                prop_assert_eq!(effective, overlap);
            }
        }
    }
}

mod prop_relevance_filter {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn keeps_all_and_only_relevant_in_order(
            candidates in proptest::collection::vec(arb_candidate(), 0..20),
        ) {
            let expected: Vec<Candidate> = candidates
                .iter()
                .filter(|c| c.distance <= RELEVANCE_THRESHOLD)
                .cloned()
                .collect();
            let kept = filter_results(candidates);
            prop_assert!(kept.iter().all(|c| c.distance <= RELEVANCE_THRESHOLD));
            prop_assert_eq!(kept, expected);
        }
    }
}
