// whisper.cpp command line backend
//
// Runs `whisper-cli` as a blocking subprocess for every call. The samples are
// written to a scratch WAV file and the full JSON output (with per-token
// timings) is read back and folded into words.
// https://github.com/ggml-org/whisper.cpp?tab=readme-ov-file#quick-start

use log::debug;
use serde::de::{self, Deserializer, Visitor};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::process::Command;

use crate::asr::{ModelError, ModelRequest, SpeechModel};
use crate::audio::{write_wav, SAMPLE_RATE};
use crate::config::WhisperConfig;
use crate::file_utils::{cleanup_folder, create_scratch_paths, ScratchPaths};
use crate::transcript::{Segment, TranscriptionInfo, Word};

/// Speech model backed by the whisper.cpp CLI
#[derive(Debug, Clone)]
pub struct WhisperCli {
    command_path: PathBuf,
    model_path: PathBuf,
    temp_dir: PathBuf,
}

impl WhisperCli {
    pub fn new(config: &WhisperConfig) -> Self {
        Self {
            command_path: PathBuf::from(&config.command_path),
            model_path: PathBuf::from(&config.model_path),
            temp_dir: PathBuf::from(&config.temp_dir),
        }
    }

    fn command(&self, paths: &ScratchPaths, request: &ModelRequest) -> Command {
        let options = &request.options;
        let mut command = Command::new(&self.command_path);

        command
            .arg("-m")
            .arg(&self.model_path)
            .arg("-f")
            .arg(&paths.audio_file)
            .arg("-of")
            .arg(&paths.output_prefix)
            .arg("-np")
            .arg("-l")
            .arg(options.language.as_deref().unwrap_or("auto"))
            .arg("-bs")
            .arg(options.beam_size.to_string())
            .arg("-bo")
            .arg(options.best_of.to_string())
            .arg("-tp")
            .arg(options.temperature.to_string())
            .arg("-t")
            .arg(options.threads.to_string());

        // Full JSON carries the token timings needed for words
        if request.word_timestamps {
            command.arg("-ojf");
        } else {
            command.arg("-oj");
        }

        if let Some(prompt) = &request.prompt {
            command.arg("--prompt").arg(prompt);
        }

        command
    }

    fn run(
        &self,
        paths: &ScratchPaths,
        samples: &[f32],
        request: &ModelRequest,
    ) -> Result<(Vec<Segment>, TranscriptionInfo), ModelError> {
        write_wav(&paths.audio_file, samples)?;

        let mut command = self.command(paths, request);
        debug!("Running whisper job {}: {:?}", paths.id, command);
        let output = command.output()?;

        if !output.status.success() {
            return Err(ModelError::Process {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let json = fs::read(paths.json_output())?;
        let (segments, language) = parse_output(&json, request.word_timestamps)?;

        let info = TranscriptionInfo {
            language: language.or_else(|| request.options.language.clone()),
            language_probability: None,
            duration: samples.len() as f64 / SAMPLE_RATE as f64,
            options: request.options.clone(),
        };

        Ok((segments, info))
    }
}

impl SpeechModel for WhisperCli {
    fn transcribe(
        &self,
        samples: &[f32],
        request: &ModelRequest,
    ) -> Result<(Vec<Segment>, TranscriptionInfo), ModelError> {
        let paths = create_scratch_paths(&self.temp_dir, "segment")?;
        let result = self.run(&paths, samples, request);
        cleanup_folder(&paths.folder);
        result
    }
}

#[derive(Debug, Deserialize)]
struct CliOutput {
    #[serde(default)]
    result: Option<CliResult>,
    #[serde(default)]
    transcription: Vec<CliSegment>,
}

#[derive(Debug, Deserialize)]
struct CliResult {
    language: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CliSegment {
    offsets: CliOffsets,
    #[serde(deserialize_with = "raw_text")]
    text: Vec<u8>,
    #[serde(default)]
    tokens: Vec<CliToken>,
}

/// Milliseconds from the start of the input
#[derive(Debug, Deserialize)]
struct CliOffsets {
    from: i64,
    to: i64,
}

#[derive(Debug, Deserialize)]
struct CliToken {
    #[serde(deserialize_with = "raw_text")]
    text: Vec<u8>,
    offsets: CliOffsets,
    #[serde(default)]
    p: f32,
}

/// Read a JSON string as raw bytes
///
/// whisper.cpp tokens are byte sequences, so a multibyte character can be
/// split across two tokens and the file is then not valid UTF-8.
fn raw_text<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    struct RawText;

    impl<'de> Visitor<'de> for RawText {
        type Value = Vec<u8>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string")
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
            Ok(value.as_bytes().to_vec())
        }

        fn visit_bytes<E: de::Error>(self, value: &[u8]) -> Result<Self::Value, E> {
            Ok(value.to_vec())
        }

        fn visit_byte_buf<E: de::Error>(self, value: Vec<u8>) -> Result<Self::Value, E> {
            Ok(value)
        }
    }

    deserializer.deserialize_bytes(RawText)
}

fn ms_to_secs(ms: i64) -> f64 {
    ms as f64 / 1000.0
}

/// Parse whisper-cli JSON output into segments and the detected language
fn parse_output(
    json: &[u8],
    word_timestamps: bool,
) -> Result<(Vec<Segment>, Option<String>), serde_json::Error> {
    let output: CliOutput = serde_json::from_slice(json)?;

    let segments = output
        .transcription
        .into_iter()
        .enumerate()
        .map(|(id, segment)| Segment {
            id,
            start: ms_to_secs(segment.offsets.from),
            end: ms_to_secs(segment.offsets.to),
            text: String::from_utf8_lossy(&segment.text).trim().to_string(),
            words: if word_timestamps {
                words_from_tokens(&segment.tokens)
            } else {
                Vec::new()
            },
        })
        .collect();

    Ok((segments, output.result.and_then(|r| r.language)))
}

/// Control tokens such as `[_BEG_]` or `[_TT_150]`
fn is_special_token(text: &[u8]) -> bool {
    (text.starts_with(b"[_") && text.ends_with(b"]"))
        || (text.starts_with(b"<|") && text.ends_with(b"|>"))
}

/// Word being assembled; bytes are decoded once the word is complete
struct PendingWord {
    text: Vec<u8>,
    start: i64,
    end: i64,
    probability_sum: f32,
    tokens: usize,
}

impl PendingWord {
    fn new(token: &CliToken) -> Self {
        Self {
            text: token.text.clone(),
            start: token.offsets.from,
            end: token.offsets.to,
            probability_sum: token.p,
            tokens: 1,
        }
    }

    fn push(&mut self, token: &CliToken) {
        self.text.extend_from_slice(&token.text);
        self.end = token.offsets.to;
        self.probability_sum += token.p;
        self.tokens += 1;
    }

    fn finish(self) -> Option<Word> {
        let text = String::from_utf8_lossy(&self.text);
        let word = text.trim();
        if word.is_empty() {
            return None;
        }
        Some(Word {
            start: ms_to_secs(self.start),
            end: ms_to_secs(self.end),
            word: word.to_string(),
            probability: self.probability_sum / self.tokens as f32,
        })
    }
}

/// Merge sub-word tokens into words; a leading space starts a new word
fn words_from_tokens(tokens: &[CliToken]) -> Vec<Word> {
    let mut words = Vec::new();
    let mut pending: Option<PendingWord> = None;

    for token in tokens.iter().filter(|t| !is_special_token(&t.text)) {
        match pending.as_mut() {
            Some(word) if !token.text.starts_with(b" ") => word.push(token),
            _ => {
                if let Some(word) = pending.take().and_then(PendingWord::finish) {
                    words.push(word);
                }
                pending = Some(PendingWord::new(token));
            }
        }
    }

    if let Some(word) = pending.and_then(PendingWord::finish) {
        words.push(word);
    }

    words
}
