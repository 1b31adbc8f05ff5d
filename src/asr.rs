// Transcription adapter
//
// Wraps a blocking speech model behind an async interface. Inference runs on
// tokio's blocking pool so a slow transcription never stalls the HTTP
// workers that await it.

use std::sync::Arc;
use std::time::Instant;

use log::info;
use serde::Serialize;
use thiserror::Error;

use crate::audio::AudioSegment;
use crate::transcript::{words_from_segments, Segment, Transcription, TranscriptionInfo};

/// Default decoding values, matching the usual whisper defaults
pub mod defaults {
    pub const BEAM_SIZE: u32 = 5;
    pub const BEST_OF: u32 = 5;
    pub const TEMPERATURE: f32 = 0.0;
    pub const MAX_THREADS: usize = 4;
}

/// Decoding parameters passed to the model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodeOptions {
    pub beam_size: u32,
    pub best_of: u32,
    pub temperature: f32,
    /// Language hint; `None` lets the model detect it
    pub language: Option<String>,
    pub threads: usize,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            beam_size: defaults::BEAM_SIZE,
            best_of: defaults::BEST_OF,
            temperature: defaults::TEMPERATURE,
            language: None,
            threads: num_cpus::get().min(defaults::MAX_THREADS),
        }
    }
}

impl DecodeOptions {
    /// Copy of these options with per-call overrides applied
    pub fn merged(&self, beam_size: Option<u32>) -> DecodeOptions {
        let mut options = self.clone();
        if let Some(beam_size) = beam_size {
            options.beam_size = beam_size;
        }
        options
    }
}

/// Everything the model needs besides the samples
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRequest {
    pub prompt: Option<String>,
    pub word_timestamps: bool,
    pub options: DecodeOptions,
}

/// Errors reported by a speech model
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to write audio: {0}")]
    Audio(#[from] hound::Error),

    #[error("Model process failed ({status}): {stderr}")]
    Process { status: String, stderr: String },

    #[error("Invalid model output: {0}")]
    Output(#[from] serde_json::Error),

    #[error("Inference failed: {0}")]
    Inference(String),
}

/// Errors returned by the transcription adapter
#[derive(Error, Debug)]
pub enum AsrError {
    /// Failure of the underlying model, passed through as is
    #[error(transparent)]
    Model(#[from] ModelError),

    /// The blocking pool dropped the job before it ran
    #[error("Transcription worker unavailable: {0}")]
    WorkerUnavailable(String),
}

/// Blocking speech-to-text model
pub trait SpeechModel: Send + Sync {
    fn transcribe(
        &self,
        samples: &[f32],
        request: &ModelRequest,
    ) -> Result<(Vec<Segment>, TranscriptionInfo), ModelError>;
}

/// Async front end for a blocking `SpeechModel`
#[derive(Clone)]
pub struct WhisperAsr {
    model: Arc<dyn SpeechModel>,
    options: Arc<DecodeOptions>,
}

impl WhisperAsr {
    pub fn new(model: Arc<dyn SpeechModel>, options: DecodeOptions) -> Self {
        Self {
            model,
            options: Arc::new(options),
        }
    }

    /// Base decoding options shared by every call
    pub fn options(&self) -> &DecodeOptions {
        &self.options
    }

    /// Transcribe `audio` on the blocking pool and await the result.
    ///
    /// Dropping the returned future does not stop inference: the blocking
    /// job runs to completion and its result is discarded.
    pub async fn transcribe(
        &self,
        audio: &AudioSegment,
        prompt: Option<&str>,
        beam_size: Option<u32>,
    ) -> Result<(Transcription, TranscriptionInfo), AsrError> {
        let asr = self.clone();
        let audio = audio.clone();
        let prompt = prompt.map(str::to_owned);

        let handle = tokio::task::spawn_blocking(move || {
            asr.transcribe_blocking(&audio, prompt.as_deref(), beam_size)
        });

        match handle.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => Err(AsrError::WorkerUnavailable(e.to_string())),
        }
    }

    /// Synchronous transcription, run on the calling thread
    pub fn transcribe_blocking(
        &self,
        audio: &AudioSegment,
        prompt: Option<&str>,
        beam_size: Option<u32>,
    ) -> Result<(Transcription, TranscriptionInfo), AsrError> {
        let start = Instant::now();

        let request = ModelRequest {
            prompt: prompt.map(str::to_owned),
            word_timestamps: true,
            options: self.options.merged(beam_size),
        };

        let (segments, info) = self.model.transcribe(&audio.samples, &request)?;

        let mut words = words_from_segments(&segments);
        for word in &mut words {
            word.offset(audio.start);
        }
        let transcription = Transcription::new(words);

        info!(
            "Transcribed {} in {:.2} seconds. Prompt: {:?}. Beam size: {}. Transcription: {}",
            audio,
            start.elapsed().as_secs_f64(),
            prompt,
            request.options.beam_size,
            transcription.text()
        );

        Ok((transcription, info))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::Word;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Barrier, Mutex};
    use std::time::Duration;

    /// Reports one fixed word per segment and records every request
    struct FixedModel {
        words: Vec<(&'static str, f64, f64)>,
        requests: Mutex<Vec<ModelRequest>>,
    }

    impl FixedModel {
        fn new(words: Vec<(&'static str, f64, f64)>) -> Self {
            Self {
                words,
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    impl SpeechModel for FixedModel {
        fn transcribe(
            &self,
            samples: &[f32],
            request: &ModelRequest,
        ) -> Result<(Vec<Segment>, TranscriptionInfo), ModelError> {
            self.requests.lock().unwrap().push(request.clone());
            let segments = self
                .words
                .iter()
                .enumerate()
                .map(|(id, (text, start, end))| Segment {
                    id,
                    start: *start,
                    end: *end,
                    text: text.to_string(),
                    words: vec![Word {
                        start: *start,
                        end: *end,
                        word: text.to_string(),
                        probability: 1.0,
                    }],
                })
                .collect();
            let info = TranscriptionInfo {
                language: Some("en".to_string()),
                language_probability: None,
                duration: samples.len() as f64 / 16_000.0,
                options: request.options.clone(),
            };
            Ok((segments, info))
        }
    }

    struct FailingModel;

    impl SpeechModel for FailingModel {
        fn transcribe(
            &self,
            _samples: &[f32],
            _request: &ModelRequest,
        ) -> Result<(Vec<Segment>, TranscriptionInfo), ModelError> {
            Err(ModelError::Inference("out of memory".to_string()))
        }
    }

    /// Blocks its thread until `parties` calls are inside the model
    struct RendezvousModel {
        barrier: Barrier,
    }

    impl SpeechModel for RendezvousModel {
        fn transcribe(
            &self,
            _samples: &[f32],
            request: &ModelRequest,
        ) -> Result<(Vec<Segment>, TranscriptionInfo), ModelError> {
            self.barrier.wait();
            Ok((
                Vec::new(),
                TranscriptionInfo {
                    language: None,
                    language_probability: None,
                    duration: 0.0,
                    options: request.options.clone(),
                },
            ))
        }
    }

    /// Sleeps, then flags completion
    struct SlowModel {
        delay: Duration,
        finished: Arc<AtomicBool>,
    }

    impl SpeechModel for SlowModel {
        fn transcribe(
            &self,
            _samples: &[f32],
            request: &ModelRequest,
        ) -> Result<(Vec<Segment>, TranscriptionInfo), ModelError> {
            std::thread::sleep(self.delay);
            self.finished.store(true, Ordering::SeqCst);
            Ok((
                Vec::new(),
                TranscriptionInfo {
                    language: None,
                    language_probability: None,
                    duration: 0.0,
                    options: request.options.clone(),
                },
            ))
        }
    }

    fn options() -> DecodeOptions {
        DecodeOptions {
            beam_size: 5,
            best_of: 5,
            temperature: 0.0,
            language: None,
            threads: 1,
        }
    }

    #[test]
    fn test_merged_applies_override_without_touching_base() {
        let base = options();
        let merged = base.merged(Some(1));
        assert_eq!(merged.beam_size, 1);
        assert_eq!(base.beam_size, 5);
        assert_eq!(base.merged(None), base);
    }

    #[tokio::test]
    async fn test_word_timestamps_shifted_by_segment_start() {
        let model = Arc::new(FixedModel::new(vec![("hello", 0.5, 0.9)]));
        let asr = WhisperAsr::new(model, options());
        let audio = AudioSegment::new(vec![0.0; 16_000], 10.0);

        let (transcription, _) = asr.transcribe(&audio, None, None).await.unwrap();

        assert_eq!(transcription.words.len(), 1);
        assert_eq!(transcription.words[0].word, "hello");
        assert_eq!(transcription.words[0].start, 10.5);
        assert_eq!(transcription.words[0].end, 10.9);
        assert_eq!(transcription.text(), "hello");
    }

    #[tokio::test]
    async fn test_every_word_shifted_by_start_offset() {
        let reported = vec![("a", 0.0, 0.2), ("b", 0.3, 0.6), ("c", 1.25, 1.5)];
        let model = Arc::new(FixedModel::new(reported.clone()));
        let asr = WhisperAsr::new(model, options());
        let audio = AudioSegment::new(vec![0.0; 32_000], 3.5);

        let (transcription, _) = asr.transcribe(&audio, None, None).await.unwrap();

        for (word, (_, start, end)) in transcription.words.iter().zip(reported) {
            assert_eq!(word.start, start + 3.5);
            assert_eq!(word.end, end + 3.5);
        }
    }

    #[tokio::test]
    async fn test_request_carries_prompt_and_word_timestamps() {
        let model = Arc::new(FixedModel::new(vec![]));
        let asr = WhisperAsr::new(model.clone(), options());
        let audio = AudioSegment::new(vec![0.0; 160], 0.0);

        asr.transcribe(&audio, Some("glossary: rust"), Some(2))
            .await
            .unwrap();

        let requests = model.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].prompt.as_deref(), Some("glossary: rust"));
        assert!(requests[0].word_timestamps);
        assert_eq!(requests[0].options.beam_size, 2);
    }

    #[tokio::test]
    async fn test_beam_override_does_not_leak_into_later_calls() {
        let model = Arc::new(FixedModel::new(vec![]));
        let asr = WhisperAsr::new(model.clone(), options());
        let audio = AudioSegment::new(vec![0.0; 160], 0.0);

        let (_, first) = asr.transcribe(&audio, None, Some(1)).await.unwrap();
        let (_, second) = asr.transcribe(&audio, None, Some(8)).await.unwrap();
        let (_, third) = asr.transcribe(&audio, None, None).await.unwrap();

        assert_eq!(first.options.beam_size, 1);
        assert_eq!(second.options.beam_size, 8);
        assert_eq!(third.options.beam_size, 5);
        assert_eq!(asr.options(), &options());
    }

    #[tokio::test]
    async fn test_model_error_propagates_unchanged() {
        let asr = WhisperAsr::new(Arc::new(FailingModel), options());
        let audio = AudioSegment::new(vec![0.0; 160], 0.0);

        let err = asr.transcribe(&audio, None, None).await.unwrap_err();
        assert!(matches!(
            err,
            AsrError::Model(ModelError::Inference(ref msg)) if msg == "out of memory"
        ));
        assert_eq!(err.to_string(), "Inference failed: out of memory");
    }

    #[tokio::test]
    async fn test_concurrent_calls_run_in_parallel() {
        const CALLS: usize = 4;
        let model = Arc::new(RendezvousModel {
            barrier: Barrier::new(CALLS),
        });
        let asr = WhisperAsr::new(model, options());
        let audio = AudioSegment::new(vec![0.0; 160], 0.0);

        // Every call waits for the others inside the model, so this only
        // completes if the calls are not serialized.
        let calls = (0..CALLS).map(|_| asr.transcribe(&audio, None, None));
        let results = tokio::time::timeout(
            Duration::from_secs(10),
            futures::future::join_all(calls),
        )
        .await
        .expect("concurrent transcriptions were serialized");

        assert!(results.iter().all(|r| r.is_ok()));
    }

    #[tokio::test]
    async fn test_scheduler_keeps_running_during_inference() {
        let finished = Arc::new(AtomicBool::new(false));
        let model = Arc::new(SlowModel {
            delay: Duration::from_millis(300),
            finished: finished.clone(),
        });
        let asr = WhisperAsr::new(model, options());
        let audio = AudioSegment::new(vec![0.0; 160], 0.0);

        let ticks = Arc::new(AtomicUsize::new(0));
        let ticker = {
            let ticks = ticks.clone();
            let finished = finished.clone();
            async move {
                while !finished.load(Ordering::SeqCst) {
                    ticks.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
            }
        };

        let (result, _) = tokio::join!(asr.transcribe(&audio, None, None), ticker);

        assert!(result.is_ok());
        assert!(
            ticks.load(Ordering::SeqCst) > 5,
            "ticker did not advance while inference was running"
        );
    }

    #[tokio::test]
    async fn test_dropping_the_call_does_not_cancel_inference() {
        let finished = Arc::new(AtomicBool::new(false));
        let model = Arc::new(SlowModel {
            delay: Duration::from_millis(200),
            finished: finished.clone(),
        });
        let asr = WhisperAsr::new(model, options());
        let audio = AudioSegment::new(vec![0.0; 160], 0.0);

        let timed_out = tokio::time::timeout(
            Duration::from_millis(20),
            asr.transcribe(&audio, None, None),
        )
        .await;
        assert!(timed_out.is_err());
        assert!(!finished.load(Ordering::SeqCst));

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(finished.load(Ordering::SeqCst));
    }

    #[test]
    fn test_blocking_variant_matches_async_contract() {
        let model = Arc::new(FixedModel::new(vec![("hello", 0.5, 0.9)]));
        let asr = WhisperAsr::new(model, options());
        let audio = AudioSegment::new(vec![0.0; 16_000], 10.0);

        let (transcription, info) = asr.transcribe_blocking(&audio, None, Some(3)).unwrap();

        assert_eq!(transcription.words[0].start, 10.5);
        assert_eq!(info.options.beam_size, 3);
        assert_eq!(info.language.as_deref(), Some("en"));
    }

    #[test]
    fn test_adapter_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<WhisperAsr>();
    }
}
