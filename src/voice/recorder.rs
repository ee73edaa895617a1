//! Microphone capture using cpal
//!
//! Each call to [`capture_utterance`] opens the default input device, spends a
//! short window calibrating against ambient noise, waits for speech to start,
//! records until the speaker pauses (or the phrase cap is hit), and drops the
//! stream before returning.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use cpal::Sample;
use thiserror::Error;

/// Samples per analysis window.
const WINDOW_MS: u64 = 50;

/// Windows of audio kept from just before speech onset, so the first word
/// isn't clipped.
const PREROLL_WINDOWS: usize = 6;

/// Quiet rooms calibrate to nearly zero; never let the threshold drop under this.
const THRESHOLD_FLOOR: f32 = 0.01;

/// Bounds for a single listen pass.
#[derive(Debug, Clone)]
pub struct ListenTuning {
    /// Ambient-noise sampling window before listening starts.
    pub calibration: Duration,
    /// Maximum wait for speech to begin.
    pub onset_timeout: Duration,
    /// Hard cap on phrase length.
    pub max_phrase: Duration,
    /// Span of continuous silence that ends a phrase.
    pub trailing_silence: Duration,
    /// Speech threshold as a multiple of the calibrated ambient level.
    pub energy_ratio: f32,
}

impl Default for ListenTuning {
    fn default() -> Self {
        Self {
            calibration: Duration::from_secs(1),
            onset_timeout: Duration::from_secs(10),
            max_phrase: Duration::from_secs(20),
            trailing_silence: Duration::from_millis(800),
            energy_ratio: 1.8,
        }
    }
}

/// One captured utterance, mono f32 at the device rate.
#[derive(Debug, Clone)]
pub struct CapturedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl CapturedAudio {
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }
}

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no speech detected before the listen window closed")]
    NoSpeech,
    #[error("audio device error: {0}")]
    Device(String),
}

/// Capture a single utterance from the default input device.
///
/// Blocks the calling thread for the whole capture; run it on a dedicated
/// thread (cpal streams are not `Send`). The input stream lives only for the
/// duration of this call.
pub fn capture_utterance(tuning: &ListenTuning) -> Result<CapturedAudio, CaptureError> {
    use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| CaptureError::Device("no input device available".to_string()))?;

    let config = device
        .default_input_config()
        .map_err(|e| CaptureError::Device(e.to_string()))?;
    let sample_rate = config.sample_rate().0;
    let channels = config.channels() as usize;
    let stream_config: cpal::StreamConfig = config.clone().into();

    tracing::debug!("listening at {} Hz, {} channels", sample_rate, channels);

    let sink: Arc<Mutex<Vec<f32>>> = Arc::default();
    let stream = match config.sample_format() {
        cpal::SampleFormat::F32 => {
            build_stream::<f32>(&device, &stream_config, channels, sink.clone())?
        }
        cpal::SampleFormat::I16 => {
            build_stream::<i16>(&device, &stream_config, channels, sink.clone())?
        }
        cpal::SampleFormat::U16 => {
            build_stream::<u16>(&device, &stream_config, channels, sink.clone())?
        }
        other => {
            return Err(CaptureError::Device(format!(
                "unsupported sample format {other:?}"
            )))
        }
    };

    stream
        .play()
        .map_err(|e| CaptureError::Device(e.to_string()))?;

    // The detector counts samples, so a device that stops delivering audio
    // would never trip the onset timeout. Bound the pass by wall clock too.
    let deadline = Instant::now()
        + tuning.calibration
        + tuning.onset_timeout
        + tuning.max_phrase
        + tuning.trailing_silence
        + Duration::from_secs(5);

    let mut detector = PhraseDetector::new(tuning, sample_rate);
    loop {
        std::thread::sleep(Duration::from_millis(20));
        if Instant::now() > deadline {
            return Err(CaptureError::Device(
                "input stream stopped delivering audio".to_string(),
            ));
        }
        let chunk = {
            let mut buf = sink.lock().unwrap();
            std::mem::take(&mut *buf)
        };
        if let Some(verdict) = detector.feed(&chunk) {
            // Returning drops the stream and releases the microphone.
            return match verdict {
                Verdict::Phrase(samples) => Ok(CapturedAudio {
                    samples,
                    sample_rate,
                }),
                Verdict::NoSpeech => Err(CaptureError::NoSpeech),
            };
        }
    }
}

/// Build an input stream that downmixes to mono f32 into `sink`.
fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    channels: usize,
    sink: Arc<Mutex<Vec<f32>>>,
) -> Result<cpal::Stream, CaptureError>
where
    T: cpal::SizedSample,
    f32: cpal::FromSample<T>,
{
    use cpal::traits::DeviceTrait;

    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                let mut buf = sink.lock().unwrap();
                if channels > 1 {
                    for frame in data.chunks(channels) {
                        let mono =
                            frame.iter().map(|&s| f32::from_sample(s)).sum::<f32>() / channels as f32;
                        buf.push(mono);
                    }
                } else {
                    buf.extend(data.iter().map(|&s| f32::from_sample(s)));
                }
            },
            |err| {
                tracing::error!("audio input error: {}", err);
            },
            None,
        )
        .map_err(|e| CaptureError::Device(e.to_string()))
}

#[derive(Debug, PartialEq)]
enum Verdict {
    NoSpeech,
    Phrase(Vec<f32>),
}

enum Stage {
    Calibrating,
    AwaitingSpeech,
    Capturing,
}

/// Incremental phrase detector fed mono samples in arbitrary-sized chunks.
///
/// Time is measured in samples, not wall clock, so the state machine is
/// deterministic for a given input.
struct PhraseDetector {
    window_len: usize,
    energy_ratio: f32,
    calibration_windows: usize,
    onset_budget: usize,
    max_phrase_samples: usize,
    ending_silence_windows: usize,

    stage: Stage,
    pending: Vec<f32>,
    ambient_levels: Vec<f32>,
    threshold: f32,
    windows_waited: usize,
    preroll: VecDeque<Vec<f32>>,
    phrase: Vec<f32>,
    quiet_run: usize,
}

impl PhraseDetector {
    fn new(tuning: &ListenTuning, sample_rate: u32) -> Self {
        let window_len = ((sample_rate as u64 * WINDOW_MS) / 1000).max(1) as usize;
        let windows = |d: Duration| ((d.as_millis() as u64 / WINDOW_MS).max(1)) as usize;

        Self {
            window_len,
            energy_ratio: tuning.energy_ratio,
            calibration_windows: windows(tuning.calibration),
            onset_budget: windows(tuning.onset_timeout),
            max_phrase_samples: (tuning.max_phrase.as_millis() as u64 * sample_rate as u64 / 1000)
                as usize,
            ending_silence_windows: windows(tuning.trailing_silence),
            stage: Stage::Calibrating,
            pending: Vec::new(),
            ambient_levels: Vec::new(),
            threshold: THRESHOLD_FLOOR,
            windows_waited: 0,
            preroll: VecDeque::new(),
            phrase: Vec::new(),
            quiet_run: 0,
        }
    }

    fn feed(&mut self, chunk: &[f32]) -> Option<Verdict> {
        self.pending.extend_from_slice(chunk);
        while self.pending.len() >= self.window_len {
            let window: Vec<f32> = self.pending.drain(..self.window_len).collect();
            if let Some(verdict) = self.advance(&window) {
                return Some(verdict);
            }
        }
        None
    }

    fn advance(&mut self, window: &[f32]) -> Option<Verdict> {
        let level = rms(window);

        match self.stage {
            Stage::Calibrating => {
                self.ambient_levels.push(level);
                if self.ambient_levels.len() >= self.calibration_windows {
                    let ambient = self.ambient_levels.iter().sum::<f32>()
                        / self.ambient_levels.len() as f32;
                    self.threshold = (ambient * self.energy_ratio).max(THRESHOLD_FLOOR);
                    self.stage = Stage::AwaitingSpeech;
                    tracing::debug!("ambient level {:.4}, threshold {:.4}", ambient, self.threshold);
                }
                None
            }
            Stage::AwaitingSpeech => {
                if level >= self.threshold {
                    self.stage = Stage::Capturing;
                    for kept in self.preroll.drain(..) {
                        self.phrase.extend(kept);
                    }
                    self.phrase.extend_from_slice(window);
                    return None;
                }

                self.preroll.push_back(window.to_vec());
                if self.preroll.len() > PREROLL_WINDOWS {
                    self.preroll.pop_front();
                }
                self.windows_waited += 1;
                (self.windows_waited >= self.onset_budget).then_some(Verdict::NoSpeech)
            }
            Stage::Capturing => {
                self.phrase.extend_from_slice(window);
                if level < self.threshold {
                    self.quiet_run += 1;
                } else {
                    self.quiet_run = 0;
                }

                let paused = self.quiet_run >= self.ending_silence_windows;
                let capped = self.phrase.len() >= self.max_phrase_samples;
                (paused || capped).then(|| Verdict::Phrase(std::mem::take(&mut self.phrase)))
            }
        }
    }
}

fn rms(window: &[f32]) -> f32 {
    (window.iter().map(|s| s * s).sum::<f32>() / window.len() as f32).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    // 1 kHz "sample rate" keeps the windows small: 50 samples each.
    const RATE: u32 = 1000;

    fn tuning() -> ListenTuning {
        ListenTuning {
            calibration: Duration::from_millis(100),   // 2 windows
            onset_timeout: Duration::from_millis(500), // 10 windows
            max_phrase: Duration::from_millis(1000),   // 1000 samples
            trailing_silence: Duration::from_millis(200), // 4 windows
            energy_ratio: 2.0,
        }
    }

    fn window(level: f32) -> Vec<f32> {
        vec![level; 50]
    }

    fn feed_windows(
        detector: &mut PhraseDetector,
        levels: impl IntoIterator<Item = f32>,
    ) -> Option<Verdict> {
        for level in levels {
            if let Some(verdict) = detector.feed(&window(level)) {
                return Some(verdict);
            }
        }
        None
    }

    #[test]
    fn silence_for_the_whole_onset_window_is_no_speech() {
        let mut detector = PhraseDetector::new(&tuning(), RATE);

        // Calibration windows, then exactly the onset budget of quiet ones.
        assert_eq!(feed_windows(&mut detector, [0.001; 2]), None);
        assert_eq!(feed_windows(&mut detector, [0.001; 9]), None);
        assert_eq!(
            feed_windows(&mut detector, [0.001; 1]),
            Some(Verdict::NoSpeech)
        );
    }

    #[test]
    fn a_phrase_ends_after_the_trailing_silence_span() {
        let mut detector = PhraseDetector::new(&tuning(), RATE);

        assert_eq!(feed_windows(&mut detector, [0.001; 2]), None); // calibrate
        assert_eq!(feed_windows(&mut detector, [0.001; 3]), None); // quiet lead-in
        assert_eq!(feed_windows(&mut detector, [0.5; 6]), None); // speech
        assert_eq!(feed_windows(&mut detector, [0.001; 3]), None); // pause, not long enough

        let verdict = feed_windows(&mut detector, [0.001; 1]).expect("phrase should end");
        match verdict {
            Verdict::Phrase(samples) => {
                // preroll (3 quiet) + 6 speech + 4 trailing windows
                assert_eq!(samples.len(), 13 * 50);
                let speech_samples = samples.iter().filter(|&&s| s == 0.5).count();
                assert_eq!(speech_samples, 6 * 50);
            }
            Verdict::NoSpeech => panic!("expected a phrase"),
        }
    }

    #[test]
    fn an_unbroken_phrase_is_cut_at_the_cap() {
        let mut detector = PhraseDetector::new(&tuning(), RATE);

        assert_eq!(feed_windows(&mut detector, [0.001; 2]), None);
        let verdict = feed_windows(&mut detector, std::iter::repeat(0.5).take(25))
            .expect("cap should end the phrase");
        match verdict {
            Verdict::Phrase(samples) => assert_eq!(samples.len(), 1000),
            Verdict::NoSpeech => panic!("expected a phrase"),
        }
    }

    #[test]
    fn loud_rooms_raise_the_threshold_above_the_floor() {
        let mut detector = PhraseDetector::new(&tuning(), RATE);
        feed_windows(&mut detector, [0.2; 2]);
        assert!((detector.threshold - 0.4).abs() < 1e-6);
    }

    #[test]
    fn chunk_boundaries_do_not_matter() {
        // Feed the same audio one sample at a time.
        let mut detector = PhraseDetector::new(&tuning(), RATE);
        let mut audio: Vec<f32> = Vec::new();
        audio.extend(window(0.001).repeat(2)); // calibration
        audio.extend(window(0.5).repeat(5)); // speech
        audio.extend(window(0.001).repeat(4)); // trailing silence

        let mut verdict = None;
        for sample in audio {
            if let Some(v) = detector.feed(&[sample]) {
                verdict = Some(v);
                break;
            }
        }
        match verdict {
            Some(Verdict::Phrase(samples)) => assert_eq!(samples.len(), 9 * 50),
            other => panic!("expected a phrase, got {other:?}"),
        }
    }
}
