//! Transcript screening policies
//! Kept separate so either heuristic can be changed without touching the loop.

/// Transcripts shorter than this (after trimming) are treated as noise.
pub const MIN_TRANSCRIPT_CHARS: usize = 2;

/// Characters that mark an utterance as a finished sentence.
pub const SENTENCE_ENDINGS: &[char] = &['.', '!', '?'];

/// Marker appended to utterances that trail off mid-sentence.
pub const ELLIPSIS: &str = "...";

/// What the loop should do with a raw transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptDecision {
    /// Too short to be a question; discard without dispatching.
    TooShort,
    /// A finished sentence, usable as-is.
    Complete(String),
    /// Trailed off mid-sentence; the ellipsis marker has been appended and
    /// the text is still dispatched.
    Incomplete(String),
}

/// Screen a raw transcript against both heuristics.
pub fn screen_transcript(raw: &str) -> TranscriptDecision {
    let text = raw.trim();
    if text.chars().count() < MIN_TRANSCRIPT_CHARS {
        return TranscriptDecision::TooShort;
    }

    match text.chars().last() {
        Some(last) if SENTENCE_ENDINGS.contains(&last) => {
            TranscriptDecision::Complete(text.to_string())
        }
        _ => TranscriptDecision::Incomplete(format!("{text}{ELLIPSIS}")),
    }
}
