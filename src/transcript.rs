// Transcript data types
//
// Words, model segments and the assembled transcription returned by the
// transcription adapter. All times are in seconds.

use serde::Serialize;

use crate::asr::DecodeOptions;

/// A single recognized word with its timing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Word {
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
    /// Word text, without surrounding whitespace
    pub word: String,
    /// Mean probability of the tokens that make up the word
    pub probability: f32,
}

impl Word {
    /// Shift the word by `seconds`
    pub fn offset(&mut self, seconds: f64) {
        self.start += seconds;
        self.end += seconds;
    }
}

/// A span of speech as reported by the model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    pub id: usize,
    pub start: f64,
    pub end: f64,
    pub text: String,
    /// Empty unless word timestamps were requested
    pub words: Vec<Word>,
}

/// Flatten model segments into a single ordered word list
pub fn words_from_segments(segments: &[Segment]) -> Vec<Word> {
    segments
        .iter()
        .flat_map(|segment| segment.words.iter().cloned())
        .collect()
}

/// Ordered sequence of timed words
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Transcription {
    pub words: Vec<Word>,
}

impl Transcription {
    pub fn new(words: Vec<Word>) -> Self {
        Self { words }
    }

    /// Words joined by single spaces
    pub fn text(&self) -> String {
        self.words
            .iter()
            .map(|w| w.word.trim())
            .filter(|w| !w.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn start(&self) -> f64 {
        self.words.first().map(|w| w.start).unwrap_or(0.0)
    }

    pub fn end(&self) -> f64 {
        self.words.last().map(|w| w.end).unwrap_or(0.0)
    }

    pub fn duration(&self) -> f64 {
        self.end() - self.start()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// Metadata reported alongside a transcription
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscriptionInfo {
    /// Detected or forced language code
    pub language: Option<String>,
    pub language_probability: Option<f32>,
    /// Duration of the input audio in seconds
    pub duration: f64,
    /// Options actually used for decoding
    pub options: DecodeOptions,
}
