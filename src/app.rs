//! Application state and the listen-transcribe-ask-render loop

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::{
    chat::{ChatOutcome, ChatService, OllamaChat},
    session::{screen_transcript, ChatSession, TranscriptDecision, SYSTEM_PROMPT},
    ui::{self, LoopStage, RenderState},
    voice::{capture_utterance, CaptureError, CapturedAudio, ListenTuning, TranscribeError, Transcriber},
};

const INSTRUCTION: &str = "Ask me anything. I'll listen and respond live for the interview.";
const NOISE_NOTICE: &str = "Very short transcription. Could you speak more clearly?";
const INCOMPLETE_NOTICE: &str = "That sentence sounded incomplete. Please continue speaking.";
const NO_SPEECH_NOTICE: &str = "No speech detected. Make sure your microphone is working.";
const UNINTELLIGIBLE_NOTICE: &str = "Could not understand the audio. Please try again.";

/// Messages sent back to the app from the capture thread and worker tasks
#[derive(Debug)]
pub enum AppMessage {
    /// One listen pass finished, successfully or not
    Captured(Result<CapturedAudio, CaptureError>),
    /// Transcription of the captured audio finished
    Transcribed(Result<String, TranscribeError>),
    /// The chat endpoint answered (or failed; the outcome carries a reply either way)
    Answered { question: String, outcome: ChatOutcome },
}

/// A line in the rendered exchange stream
#[derive(Debug, Clone)]
pub struct ConversationEntry {
    pub kind: EntryKind,
    pub text: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// A transcribed question
    Question,
    /// The model's reply
    Answer,
    /// Inline warning (no speech, noise, incomplete sentence)
    Notice,
    /// Inline error (device, transcription service, chat endpoint)
    Failure,
}

/// Everything the app needs from the command line.
pub struct AppOptions {
    pub model: String,
    pub chat_url: String,
    pub transcribe_url: String,
    pub language: String,
}

/// Application state
pub struct App {
    /// Terminal handle
    terminal: Terminal<CrosstermBackend<Stdout>>,
    /// Model requested from the chat endpoint
    model: String,
    /// Chat endpoint, shown in the status bar
    chat_url: String,
    /// Conversation history replayed on every request
    session: ChatSession,
    /// Chat endpoint client
    chat: Arc<dyn ChatService>,
    /// Transcription client
    transcriber: Arc<Transcriber>,
    /// Capture bounds for each listen pass
    tuning: ListenTuning,
    /// Exchange stream for display
    entries: Vec<ConversationEntry>,
    /// Where the loop currently is
    stage: LoopStage,
    /// Scroll offset for the exchange view
    scroll_offset: usize,
    /// Transient status line
    status_message: Option<String>,
    /// App message receiver
    message_rx: mpsc::Receiver<AppMessage>,
    /// App message sender (shared with workers)
    message_tx: mpsc::Sender<AppMessage>,
    /// Injectable stop condition for the run loop
    should_quit: bool,
}

impl App {
    pub fn new(options: AppOptions) -> Result<Self> {
        // Set up terminal
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;

        let (message_tx, message_rx) = mpsc::channel(32);

        let chat: Arc<dyn ChatService> = Arc::new(OllamaChat::new(options.chat_url.clone())?);
        let transcriber = Arc::new(Transcriber::new(options.transcribe_url, options.language)?);
        let session = ChatSession::new(options.model.clone(), SYSTEM_PROMPT);

        Ok(Self {
            terminal,
            model: options.model,
            chat_url: options.chat_url,
            session,
            chat,
            transcriber,
            tuning: ListenTuning::default(),
            entries: Vec::new(),
            stage: LoopStage::Listening,
            scroll_offset: 0,
            status_message: None,
            message_rx,
            message_tx,
            should_quit: false,
        })
    }

    /// Main event loop
    pub async fn run(&mut self) -> Result<()> {
        self.push_entry(EntryKind::Notice, INSTRUCTION);
        self.begin_listen();

        loop {
            // Draw UI
            self.draw()?;

            // Handle events with timeout
            tokio::select! {
                // Check for terminal events
                _ = tokio::time::sleep(Duration::from_millis(16)) => {
                    if event::poll(Duration::from_millis(0))? {
                        if let Event::Key(key) = event::read()? {
                            self.handle_key_event(key);
                        }
                    }
                }

                // Check for app messages
                Some(msg) = self.message_rx.recv() => {
                    self.handle_app_message(msg);
                }
            }

            if self.should_quit {
                break;
            }
        }

        // Cleanup
        self.cleanup()
    }

    fn draw(&mut self) -> Result<()> {
        let state = RenderState {
            entries: &self.entries,
            stage: self.stage,
            model: &self.model,
            chat_url: &self.chat_url,
            scroll_offset: self.scroll_offset,
            status_message: self.status_message.as_deref(),
            exchanges: self.session.exchanges(),
        };

        self.terminal.draw(|frame| {
            ui::draw(frame, &state);
        })?;
        Ok(())
    }

    fn handle_key_event(&mut self, key: KeyEvent) {
        match (key.modifiers, key.code) {
            // Quit
            (KeyModifiers::CONTROL, KeyCode::Char('q'))
            | (KeyModifiers::CONTROL, KeyCode::Char('c'))
            | (_, KeyCode::Char('q')) => {
                self.should_quit = true;
            }
            // Scroll exchange view
            (_, KeyCode::PageUp) => {
                self.scroll_offset = self.scroll_offset.saturating_add(10);
            }
            (_, KeyCode::PageDown) => {
                self.scroll_offset = self.scroll_offset.saturating_sub(10);
            }
            _ => {}
        }
    }

    fn handle_app_message(&mut self, msg: AppMessage) {
        match msg {
            AppMessage::Captured(Ok(audio)) => {
                self.status_message = Some(format!(
                    "Captured {:.1}s of audio",
                    audio.duration().as_secs_f32()
                ));
                self.begin_transcribe(audio);
            }
            AppMessage::Captured(Err(err)) => {
                let (kind, text) = capture_failure_entry(&err);
                self.push_entry(kind, &text);
                self.begin_listen();
            }
            AppMessage::Transcribed(Ok(raw)) => {
                self.handle_transcript(&raw);
            }
            AppMessage::Transcribed(Err(err)) => {
                let (kind, text) = transcribe_failure_entry(&err);
                self.push_entry(kind, &text);
                self.begin_listen();
            }
            AppMessage::Answered { question, outcome } => {
                if let Some(detail) = outcome.error_detail() {
                    self.push_entry(EntryKind::Failure, &detail);
                }
                let reply = outcome.reply_text().to_string();
                // User turn first, then the assistant turn, even on fallbacks.
                self.session.record_exchange(&question, &reply);
                self.push_entry(EntryKind::Answer, &reply);
                self.status_message = None;
                self.scroll_offset = 0;
                self.begin_listen();
            }
        }
    }

    /// Apply the transcript policies and either discard or dispatch.
    fn handle_transcript(&mut self, raw: &str) {
        match screen_transcript(raw) {
            TranscriptDecision::TooShort => {
                self.push_entry(EntryKind::Notice, NOISE_NOTICE);
                self.begin_listen();
            }
            TranscriptDecision::Incomplete(question) => {
                self.push_entry(EntryKind::Notice, INCOMPLETE_NOTICE);
                self.begin_ask(question);
            }
            TranscriptDecision::Complete(question) => {
                self.begin_ask(question);
            }
        }
    }

    /// Kick off one listen pass on a dedicated thread (cpal streams are not Send).
    fn begin_listen(&mut self) {
        self.stage = LoopStage::Listening;
        let tuning = self.tuning.clone();
        let tx = self.message_tx.clone();
        std::thread::spawn(move || {
            let outcome = capture_utterance(&tuning);
            let _ = tx.blocking_send(AppMessage::Captured(outcome));
        });
    }

    fn begin_transcribe(&mut self, audio: CapturedAudio) {
        self.stage = LoopStage::Transcribing;
        let transcriber = self.transcriber.clone();
        let tx = self.message_tx.clone();
        tokio::spawn(async move {
            let outcome = transcriber.transcribe(&audio.samples, audio.sample_rate).await;
            let _ = tx.send(AppMessage::Transcribed(outcome)).await;
        });
    }

    /// Dispatch one question to the chat endpoint with the full history.
    fn begin_ask(&mut self, question: String) {
        self.stage = LoopStage::Thinking;
        self.push_entry(EntryKind::Question, &question);
        self.scroll_offset = 0;

        let request = self.session.request(&question);
        let chat = self.chat.clone();
        let tx = self.message_tx.clone();
        tokio::spawn(async move {
            let outcome = chat.complete(&request).await;
            let _ = tx.send(AppMessage::Answered { question, outcome }).await;
        });
    }

    fn push_entry(&mut self, kind: EntryKind, text: impl Into<String>) {
        self.entries.push(ConversationEntry {
            kind,
            text: text.into(),
            timestamp: chrono::Utc::now(),
        });
    }

    fn cleanup(&mut self) -> Result<()> {
        // Restore terminal
        disable_raw_mode()?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen)?;
        self.terminal.show_cursor()?;
        Ok(())
    }
}

/// Status entry for a failed listen pass. Never dispatches anything.
fn capture_failure_entry(err: &CaptureError) -> (EntryKind, String) {
    match err {
        CaptureError::NoSpeech => (EntryKind::Notice, NO_SPEECH_NOTICE.to_string()),
        CaptureError::Device(detail) => (
            EntryKind::Failure,
            format!("Speech capture error: {detail}"),
        ),
    }
}

/// Status entry for a failed transcription. Never dispatches anything.
fn transcribe_failure_entry(err: &TranscribeError) -> (EntryKind, String) {
    match err {
        TranscribeError::Unintelligible => (EntryKind::Notice, UNINTELLIGIBLE_NOTICE.to_string()),
        TranscribeError::Service(detail) => (
            EntryKind::Failure,
            format!("Speech recognition service error: {detail}"),
        ),
    }
}
