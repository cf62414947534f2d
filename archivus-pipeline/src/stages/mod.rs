//! The nine stage handlers of §4.7's processing graph. Each is a distinct
//! `archivus_queue::Job` impl sharing [`PipelineContext`](crate::context::PipelineContext)
//! as its context type and the bookkeeping in [`common`].

pub mod common;

pub mod classification;
pub mod embedding;
pub mod entity_extraction;
pub mod financial_extraction;
pub mod ocr;
pub mod preview_generation;
pub mod summarization;
pub mod tagging;
pub mod text_extraction;

/// Content types the text_extraction handler can read directly. Anything
/// else (images, in particular) is routed to `ocr` instead — §4.7.1.
pub fn is_text_extractable(content_type: &str) -> bool {
    matches!(
        content_type,
        "text/plain"
            | "text/markdown"
            | "text/csv"
            | "application/json"
            | "application/pdf"
            | "application/msword"
            | "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
    )
}
