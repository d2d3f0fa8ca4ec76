//! Overlapping fixed-size text segmenter.
//!
//! Splits a [`Document`] into windows of `chunk_size` characters, each
//! window starting `chunk_size - overlap` characters after the previous
//! one. Offsets are character offsets, so a window never cuts a
//! multi-byte character in half.
//!
//! # Algorithm
//!
//! 1. If `overlap >= chunk_size`, clamp it to `chunk_size / 4`.
//! 2. Emit `[start, min(start + chunk_size, len))`.
//! 3. Stop if that window reached the end of the content.
//! 4. Otherwise advance to `max(end - overlap, start + 1)` and repeat.
//!
//! The `start + 1` floor means `start` strictly increases, so the loop
//! runs at most `len` times whatever the parameters.
//!
//! # Example
//!
//! ```rust
//! use std::num::NonZeroUsize;
//! use std::sync::Arc;
//! use docchat_core::models::Document;
//! use docchat_core::observe::NoopObserver;
//! use docchat_core::segment::Segmenter;
//!
//! let seg = Segmenter::new(NonZeroUsize::new(1000).unwrap(), 200, Arc::new(NoopObserver));
//! let doc = Document::new("A".repeat(2000), "a.md", "a.md");
//! let starts: Vec<u64> = seg.chunk(&doc).iter().filter_map(|c| c.chunk_start()).collect();
//! assert_eq!(starts, vec![0, 800, 1600]);
//! ```

use std::num::NonZeroUsize;
use std::sync::Arc;

use serde_json::Value;

use crate::models::{Chunk, Document, CHUNK_END_KEY, CHUNK_START_KEY};
use crate::observe::{PipelineEvent, PipelineObserver};

/// Overlap actually used for a given `chunk_size`.
///
/// Returns `overlap` unchanged when it is smaller than `chunk_size`,
/// otherwise `chunk_size / 4`.
pub fn clamp_overlap(chunk_size: NonZeroUsize, overlap: usize) -> usize {
    if overlap >= chunk_size.get() {
        chunk_size.get() / 4
    } else {
        overlap
    }
}

/// Splits documents into overlapping character windows.
pub struct Segmenter {
    chunk_size: NonZeroUsize,
    overlap: usize,
    observer: Arc<dyn PipelineObserver>,
}

impl Segmenter {
    /// Create a segmenter. An `overlap >= chunk_size` is clamped (and
    /// reported), never rejected.
    pub fn new(
        chunk_size: NonZeroUsize,
        overlap: usize,
        observer: Arc<dyn PipelineObserver>,
    ) -> Self {
        let effective = clamp_overlap(chunk_size, overlap);
        if effective != overlap {
            observer.observe(&PipelineEvent::OverlapClamped {
                requested: overlap,
                clamped: effective,
            });
        }
        Self {
            chunk_size,
            overlap: effective,
            observer,
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size.get()
    }

    /// The overlap in effect after clamping.
    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split one document. Chunks come back in increasing `chunk_start`
    /// order. Whitespace-only content yields no chunks.
    pub fn chunk(&self, document: &Document) -> Vec<Chunk> {
        let content = document.content.as_str();
        let source_id = document.metadata.source_id.as_str();

        if content.trim().is_empty() {
            self.observer.observe(&PipelineEvent::DocumentEmpty {
                source_id: source_id.to_string(),
            });
            return Vec::new();
        }

        let offsets: Vec<usize> = content.char_indices().map(|(i, _)| i).collect();
        let len = offsets.len();
        let byte_at = |c: usize| if c >= len { content.len() } else { offsets[c] };

        let base = document.metadata.to_metadata();
        let mut chunks = Vec::new();
        let mut start = 0usize;

        while start < len {
            let end = (start + self.chunk_size.get()).min(len);

            let mut metadata = base.clone();
            metadata.insert(CHUNK_START_KEY.to_string(), Value::from(start as u64));
            metadata.insert(CHUNK_END_KEY.to_string(), Value::from(end as u64));
            chunks.push(Chunk {
                content: content[byte_at(start)..byte_at(end)].to_string(),
                metadata,
            });

            if end == len {
                break;
            }

            let next = end.saturating_sub(self.overlap).max(start + 1);
            if next <= start {
                self.observer.observe(&PipelineEvent::SegmenterStalled {
                    source_id: source_id.to_string(),
                    start,
                    next,
                });
                break;
            }
            start = next;
        }

        self.observer.observe(&PipelineEvent::DocumentSegmented {
            source_id: source_id.to_string(),
            chunks: chunks.len(),
        });
        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observe::RecordingObserver;

    fn segmenter(size: usize, overlap: usize) -> (Segmenter, Arc<RecordingObserver>) {
        let rec = Arc::new(RecordingObserver::new());
        let seg = Segmenter::new(NonZeroUsize::new(size).unwrap(), overlap, rec.clone());
        (seg, rec)
    }

    fn spans(chunks: &[Chunk]) -> Vec<(u64, u64)> {
        chunks
            .iter()
            .map(|c| (c.chunk_start().unwrap(), c.chunk_end().unwrap()))
            .collect()
    }

    #[test]
    fn test_two_thousand_chars_three_chunks() {
        let (seg, _) = segmenter(1000, 200);
        let doc = Document::new("A".repeat(2000), "a.md", "a.md");
        let chunks = seg.chunk(&doc);
        assert_eq!(spans(&chunks), vec![(0, 1000), (800, 1800), (1600, 2000)]);
    }

    #[test]
    fn test_short_document_single_chunk() {
        let (seg, _) = segmenter(1000, 200);
        let doc = Document::new("Hello, world!", "h.md", "h.md");
        let chunks = seg.chunk(&doc);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "Hello, world!");
        assert_eq!(spans(&chunks), vec![(0, 13)]);
    }

    #[test]
    fn test_exactly_chunk_size_single_chunk() {
        let (seg, _) = segmenter(10, 3);
        let doc = Document::new("0123456789", "d.md", "d.md");
        assert_eq!(spans(&seg.chunk(&doc)), vec![(0, 10)]);
    }

    #[test]
    fn test_whitespace_only_yields_nothing_and_warns() {
        let (seg, rec) = segmenter(100, 10);
        let doc = Document::new("  \n\t ", "blank.md", "blank.md");
        assert!(seg.chunk(&doc).is_empty());
        assert_eq!(
            rec.events(),
            vec![PipelineEvent::DocumentEmpty {
                source_id: "blank.md".into()
            }]
        );
    }

    #[test]
    fn test_overlap_clamped_to_quarter() {
        let (seg, rec) = segmenter(100, 100);
        assert_eq!(seg.overlap(), 25);
        assert_eq!(
            rec.events(),
            vec![PipelineEvent::OverlapClamped {
                requested: 100,
                clamped: 25
            }]
        );

        let (seg, _) = segmenter(8, 500);
        assert_eq!(seg.overlap(), 2);
    }

    #[test]
    fn test_overlap_one_less_than_size_terminates() {
        let (seg, rec) = segmenter(10, 9);
        let doc = Document::new("x".repeat(50), "x.md", "x.md");
        let chunks = seg.chunk(&doc);
        assert_eq!(chunks.len(), 41);
        assert!(chunks.len() <= 50);
        assert_eq!(
            rec.count(|e| matches!(e, PipelineEvent::SegmenterStalled { .. })),
            0
        );
    }

    #[test]
    fn test_multibyte_offsets_are_characters() {
        let (seg, _) = segmenter(4, 1);
        let doc = Document::new("┌──┐│hé│└──┘", "box.md", "box.md");
        let chunks = seg.chunk(&doc);
        assert_eq!(chunks[0].content, "┌──┐");
        assert_eq!(chunks[1].content, "┐│hé");
        for c in &chunks {
            assert!(c.content.chars().count() <= 4);
        }
        let last = chunks.last().unwrap();
        assert_eq!(last.chunk_end(), Some(12));
    }

    #[test]
    fn test_metadata_carries_document_fields() {
        let (seg, _) = segmenter(5, 0);
        let doc = Document::new("abcdefgh", "notes/a.md", "a.md");
        let chunks = seg.chunk(&doc);
        assert_eq!(chunks[1].source_id(), Some("notes/a.md"));
        assert_eq!(
            chunks[1].metadata.get("display_name"),
            Some(&Value::from("a.md"))
        );
        assert_eq!(spans(&chunks), vec![(0, 5), (5, 8)]);
    }

    #[test]
    fn test_deterministic() {
        let (seg, _) = segmenter(7, 2);
        let doc = Document::new("Alpha beta gamma delta epsilon", "g.md", "g.md");
        assert_eq!(seg.chunk(&doc), seg.chunk(&doc));
    }
}
