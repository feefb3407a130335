//! # HPS Guitar Tuner - Desktop Front-end
//!
//! A small Iced window around `hps-tuner-core`: pick a tuning, start the
//! tuner, read the closest note.
//!
//! ## Architecture
//! - **Main Thread**: Iced GUI application with dark theme
//! - **Audio Thread**: Owns the CPAL stream; the tuner runs in its input callback
//! - **Communication**: A bounded crossbeam channel carries `Detection` values
//!   to the GUI, a second one carries the shutdown signal
//! - **Updates**: 60 FPS polling via subscription while the tuner runs

mod ui;

use std::fmt;
use std::fs;
use std::path::Path;
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result};
use cpal::traits::StreamTrait;
use crossbeam_channel::{Receiver, Sender, TryRecvError};
use hps_tuner_core::{
    Detection, MappingMode, TunerConfig, audio, tuning,
};
use iced::{Element, Subscription, Theme};
use tracing::{debug, error, info, warn};
use ui::main_display::create_main_view;

/// Optional configuration file read from the working directory at start-up.
const CONFIG_PATH: &str = "tuner_config.json";

/// Detections buffered between the audio callback and the GUI.
const DETECTION_CHANNEL_CAPACITY: usize = 16;

/// Main entry point for the tuner application.
pub fn main() -> iced::Result {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    info!("starting HPS guitar tuner");
    let result = iced::application("HPS Guitar Tuner", TunerApp::update, TunerApp::view)
        .subscription(TunerApp::subscription)
        .theme(TunerApp::theme)
        .window_size(iced::Size::new(750.0, 260.0))
        .run();
    info!(?result, "application finished");
    result
}

/// Application message types for the Iced GUI framework.
#[derive(Debug, Clone)]
pub enum Message {
    TuningSelected(TuningChoice), // User picked a tuning (applies on next start)
    StartTuner,                   // Open the input stream with the selected tuning
    StopTuner,                    // Shut the audio thread down
    Tick,                         // Timer tick for draining detections
}

/// Entry of the tuning menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TuningChoice {
    /// A named profile from the tuning registry
    Profile(&'static str),
    /// Free equal-tempered detection, shown as "tune"
    EqualTempered,
}

impl TuningChoice {
    /// Every registered profile followed by the equal-tempered mode.
    fn all() -> Vec<TuningChoice> {
        tuning::profile_names()
            .map(TuningChoice::Profile)
            .chain(std::iter::once(TuningChoice::EqualTempered))
            .collect()
    }

    fn mode(self) -> MappingMode {
        match self {
            TuningChoice::Profile(name) => MappingMode::Profile(name.to_string()),
            TuningChoice::EqualTempered => MappingMode::EqualTempered,
        }
    }
}

impl fmt::Display for TuningChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TuningChoice::Profile(name) => f.write_str(name),
            TuningChoice::EqualTempered => f.write_str("tune"),
        }
    }
}

/// UI-specific data needed for rendering the interface.
#[derive(Debug, Clone)]
pub struct AppDisplayData {
    pub choices: Vec<TuningChoice>,
    pub selected: TuningChoice,
    /// Tuning the running stream was started with
    pub active: Option<TuningChoice>,
    pub last_detection: Option<Detection>,
    /// Majority note sent with the latest pitch; silent windows keep it
    pub stable_note: Option<String>,
    pub status: String,
}

/// Main application state.
#[derive(Debug)]
struct TunerApp {
    config: TunerConfig,
    audio_worker: Option<AudioWorker>,
    detection_receiver: Option<Receiver<Detection>>,
    display_data: AppDisplayData,
}

/// Audio worker thread management structure.
///
/// Dropping the worker signals the thread and waits for it to release the stream.
#[derive(Debug)]
struct AudioWorker {
    shutdown_tx: Sender<()>,
    thread_handle: Option<JoinHandle<()>>,
}

impl Drop for AudioWorker {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(());
        if let Some(handle) = self.thread_handle.take() {
            if handle.join().is_err() {
                error!("audio thread panicked");
            }
        }
    }
}

impl Default for TunerApp {
    fn default() -> Self {
        let config = match load_config(CONFIG_PATH) {
            Ok(Some(config)) => {
                info!(path = CONFIG_PATH, "loaded tuner configuration");
                config
            }
            Ok(None) => TunerConfig::default(),
            Err(e) => {
                warn!("ignoring {}: {:#}", CONFIG_PATH, e);
                TunerConfig::default()
            }
        };

        Self {
            config,
            audio_worker: None,
            detection_receiver: None,
            display_data: AppDisplayData {
                choices: TuningChoice::all(),
                selected: TuningChoice::Profile(tuning::STANDARD),
                active: None,
                last_detection: None,
                stable_note: None,
                status: "Select a tuning and start the tuner.".to_string(),
            },
        }
    }
}

impl TunerApp {
    /// Starts a fresh tuner session on a dedicated audio thread.
    ///
    /// A running session is stopped first: the window buffer and the mapping
    /// mode belong together, so a new tuning always means a new `Tuner`.
    fn start_audio_processing(&mut self) {
        self.stop_audio_processing();

        let (detection_tx, detection_rx) = crossbeam_channel::bounded(DETECTION_CHANNEL_CAPACITY);
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(1);
        let config = self.config.clone();
        let choice = self.display_data.selected;

        let thread_handle = thread::spawn(move || {
            info!(tuning = %choice, "starting audio thread");
            let (stream, sample_rate) =
                match audio::start_tuner_stream(config, choice.mode(), detection_tx) {
                    Ok(pair) => pair,
                    Err(e) => {
                        error!("Fatal error starting audio: {:#}", e);
                        return;
                    }
                };
            info!(sample_rate, "tuner stream running");

            // Either a shutdown signal or a dropped sender ends the session.
            let _ = shutdown_rx.recv();

            if let Err(e) = stream.pause() {
                warn!("Error pausing stream: {}", e);
            }
            drop(stream);
            info!("audio thread finished");
        });

        self.audio_worker = Some(AudioWorker {
            shutdown_tx,
            thread_handle: Some(thread_handle),
        });
        self.detection_receiver = Some(detection_rx);
        self.display_data.active = Some(choice);
        self.display_data.last_detection = None;
        self.display_data.stable_note = None;
        self.display_data.status = format!("Listening ({choice})...");
    }

    fn stop_audio_processing(&mut self) {
        if let Some(worker) = self.audio_worker.take() {
            info!("shutting down audio worker");
            drop(worker);
        }
        self.detection_receiver = None;
        self.display_data.active = None;
    }

    fn update(&mut self, message: Message) {
        match message {
            Message::TuningSelected(choice) => {
                debug!(tuning = %choice, "tuning selected");
                self.display_data.selected = choice;
                if self.display_data.active.is_some_and(|active| active != choice) {
                    self.display_data.status = "Restart the tuner to apply the new tuning.".to_string();
                }
            }
            Message::StartTuner => self.start_audio_processing(),
            Message::StopTuner => {
                self.stop_audio_processing();
                self.display_data.status = "Tuner stopped.".to_string();
            }
            Message::Tick => self.drain_detections(),
        }
    }

    /// Pulls every pending detection from the audio thread.
    fn drain_detections(&mut self) {
        let Some(receiver) = &self.detection_receiver else {
            return;
        };

        let mut disconnected = false;
        let mut received = Vec::new();
        loop {
            match receiver.try_recv() {
                Ok(detection) => received.push(detection),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    disconnected = true;
                    break;
                }
            }
        }

        for detection in received {
            self.process_detection(detection);
        }

        if disconnected {
            warn!("audio thread closed the detection channel");
            self.stop_audio_processing();
            self.display_data.status = "Audio input unavailable.".to_string();
        }
    }

    fn process_detection(&mut self, detection: Detection) {
        match &detection {
            Detection::Pitch(result) => self.display_data.stable_note = result.stable_note.clone(),
            // Faulty blocks do not replace what is on screen.
            Detection::Skipped(status) => {
                debug!(?status, "stream fault, block skipped");
                return;
            }
            Detection::NoPitch(_) => {}
        }
        self.display_data.last_detection = Some(detection);
    }

    fn view(&self) -> Element<'_, Message> {
        create_main_view(&self.display_data)
    }

    fn subscription(&self) -> Subscription<Message> {
        if self.detection_receiver.is_some() {
            iced::time::every(std::time::Duration::from_millis(16)).map(|_| Message::Tick)
        } else {
            Subscription::none()
        }
    }

    fn theme(&self) -> Theme {
        Theme::Dark
    }
}

/// Loads a tuner configuration from a JSON file.
///
/// # Returns
/// * `Ok(Some(config))` - File found, parsed and valid
/// * `Ok(None)` - No file at `path`
/// * `Err(e)` - The file exists but cannot be read, parsed or validated
fn load_config(path: impl AsRef<Path>) -> Result<Option<TunerConfig>> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(None);
    }
    let data = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let config: TunerConfig = serde_json::from_str(&data).context("parsing tuner configuration")?;
    config.validate()?;
    Ok(Some(config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn menu_lists_profiles_then_tune() {
        let choices = TuningChoice::all();
        assert_eq!(choices.len(), 6);
        assert_eq!(choices.last(), Some(&TuningChoice::EqualTempered));
        assert_eq!(TuningChoice::EqualTempered.to_string(), "tune");
        assert!(choices.contains(&TuningChoice::Profile("drop_d")));
    }

    #[test]
    fn stable_note_comes_from_the_tuner() {
        let mut app = TunerApp::default();
        app.process_detection(Detection::Pitch(hps_tuner_core::PitchResult {
            note: "A2".into(),
            detected_frequency: 110.2,
            reference_frequency: 110.0,
            stable_note: Some("A2".into()),
        }));
        assert_eq!(app.display_data.stable_note.as_deref(), Some("A2"));

        app.process_detection(Detection::NoPitch(hps_tuner_core::NoPitchReason::InsufficientSignal));
        assert_eq!(app.display_data.stable_note.as_deref(), Some("A2"));

        let shown = app.display_data.last_detection.clone();
        app.process_detection(Detection::Skipped(hps_tuner_core::StreamStatus::StreamError));
        assert_eq!(app.display_data.last_detection, shown);
    }

    #[test]
    fn partial_config_file_uses_defaults() {
        let path = std::env::temp_dir().join(format!("hps_tuner_config_{}.json", std::process::id()));
        fs::write(&path, r#"{ "concert_pitch": 432.0 }"#).unwrap();
        let config = load_config(&path).unwrap().unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(config.concert_pitch, 432.0);
        assert_eq!(config.window_size, TunerConfig::default().window_size);
    }

    #[test]
    fn invalid_config_file_is_rejected() {
        let path = std::env::temp_dir().join(format!("hps_tuner_bad_config_{}.json", std::process::id()));
        fs::write(&path, r#"{ "num_hps": 0 }"#).unwrap();
        let result = load_config(&path);
        fs::remove_file(&path).unwrap();
        assert!(result.is_err());
    }

    #[test]
    fn missing_config_file_is_not_an_error() {
        assert!(load_config("does/not/exist.json").unwrap().is_none());
    }
}
