//! # Audio Capture Module
//!
//! Real-time audio capture with CPAL (Cross-Platform Audio Library).
//!
//! The tuner runs inside the input callback: device samples are assembled
//! into blocks of `window_step` samples, each full block goes through
//! [`Tuner::process_block`], and the resulting [`Detection`] is posted to the
//! consumer over a bounded channel. Nothing mutable leaves the callback.
//!
//! ## Stream faults
//! - A device error raises a flag; the next block is delivered as
//!   [`StreamStatus::StreamError`] and skipped by the tuner.
//! - When the consumer falls behind, only the detection is dropped. The block
//!   itself has already entered the window, so the next analyses are intact.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result, anyhow};
use cpal::SupportedStreamConfigRange;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{Sender, TrySendError};
use tracing::{error, info, trace, warn};

use crate::{Detection, MappingMode, StreamStatus, Tuner, TunerConfig};

/// Starts the tuner on the default input device.
///
/// This function:
/// 1. Builds a [`Tuner`] for `config` and `mode`
/// 2. Selects the default input device and a float format at `config.sample_rate`
/// 3. Runs the tuner in the input callback and posts detections to `sender`
///
/// # Arguments
/// * `config` - Analysis constants; the device must support its sample rate
/// * `mode` - Note mapping strategy for this session
/// * `sender` - Bounded channel towards the UI thread
///
/// # Returns
/// * `Ok((stream, sample_rate))` - Running stream handle and the sample rate in use
/// * `Err(e)` - Invalid configuration or audio setup failure
pub fn start_tuner_stream(
    config: TunerConfig,
    mode: MappingMode,
    sender: Sender<Detection>,
) -> Result<(cpal::Stream, u32)> {
    let tuner = Tuner::new(config.clone(), mode)?;

    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| anyhow!("No input device available"))?;

    info!(device = %device.name()?, "using audio input device");

    let configs = device.supported_input_configs()?.collect::<Vec<_>>();
    let supported_config = find_supported_config(configs, config.sample_rate).ok_or_else(|| {
        anyhow!(
            "No f32 input format supports {} Hz",
            config.sample_rate
        )
    })?;

    let channels = usize::from(supported_config.channels());
    let stream_config: cpal::StreamConfig = supported_config
        .with_sample_rate(cpal::SampleRate(config.sample_rate))
        .into();
    info!(sample_rate = config.sample_rate, channels, "selected input format");

    let mut processor = BlockProcessor::new(tuner, sender);
    let err_flag = processor.fault_flag();
    let err_fn = move |err: cpal::StreamError| {
        error!("An error occurred on the audio stream: {}", err);
        err_flag.store(true, Ordering::Relaxed);
    };

    let mut assembler = BlockAssembler::new(config.window_step, channels);

    let stream = device
        .build_input_stream(
            &stream_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                assembler.push_interleaved(data, |block| processor.process(block));
            },
            err_fn,
            None,
        )
        .context("building input stream")?;

    stream.play()?;

    Ok((stream, config.sample_rate))
}

/// Runs the tuner on assembled blocks and posts the detections.
///
/// Lives inside the input callback. A device error raised through
/// [`BlockProcessor::fault_flag`] turns the next block into a skipped one.
pub struct BlockProcessor {
    tuner: Tuner,
    sender: Sender<Detection>,
    stream_fault: Arc<AtomicBool>,
}

impl BlockProcessor {
    pub fn new(tuner: Tuner, sender: Sender<Detection>) -> Self {
        Self {
            tuner,
            sender,
            stream_fault: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag for the stream's error callback.
    pub fn fault_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stream_fault)
    }

    /// Processes one block and hands the detection to the consumer without blocking.
    pub fn process(&mut self, block: &[f32]) {
        let status = if self.stream_fault.swap(false, Ordering::Relaxed) {
            StreamStatus::StreamError
        } else {
            StreamStatus::Ok
        };

        let detection = match self.tuner.process_block(block, status) {
            Ok(detection) => detection,
            Err(e) => {
                warn!("dropping block: {}", e);
                return;
            }
        };

        match self.sender.try_send(detection) {
            Ok(()) | Err(TrySendError::Disconnected(_)) => {}
            Err(TrySendError::Full(_)) => trace!("detection channel full, result dropped"),
        }
    }

    #[cfg(test)]
    fn tuner(&self) -> &Tuner {
        &self.tuner
    }
}

/// Collects interleaved device frames into fixed-size mono blocks.
///
/// Only the first channel of each frame is kept. The block buffer is
/// allocated once and reused.
#[derive(Debug)]
pub struct BlockAssembler {
    block: Vec<f32>,
    block_size: usize,
    channels: usize,
}

impl BlockAssembler {
    pub fn new(block_size: usize, channels: usize) -> Self {
        Self {
            block: Vec::with_capacity(block_size),
            block_size,
            channels: channels.max(1),
        }
    }

    /// Appends interleaved samples and calls `on_block` for every full block.
    pub fn push_interleaved(&mut self, data: &[f32], mut on_block: impl FnMut(&[f32])) {
        for &sample in data.iter().step_by(self.channels) {
            self.block.push(sample);
            if self.block.len() == self.block_size {
                on_block(&self.block);
                self.block.clear();
            }
        }
    }

    /// Samples waiting for the current block to fill.
    pub fn pending(&self) -> usize {
        self.block.len()
    }
}

/// Finds an f32 input configuration that can run at `target_rate`.
///
/// Mono configurations are preferred; otherwise the one with the fewest
/// channels is used and the first channel is analysed.
fn find_supported_config(
    configs: Vec<SupportedStreamConfigRange>,
    target_rate: u32,
) -> Option<SupportedStreamConfigRange> {
    configs
        .into_iter()
        .filter(|c| c.sample_format() == cpal::SampleFormat::F32)
        .filter(|c| c.min_sample_rate().0 <= target_rate && target_rate <= c.max_sample_rate().0)
        .min_by_key(|c| c.channels())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> TunerConfig {
        TunerConfig {
            sample_rate: 8000,
            window_size: 8000,
            window_step: 2000,
            ..TunerConfig::default()
        }
    }

    fn stream(len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (0.5 * (2.0 * std::f64::consts::PI * 110.0 * i as f64 / 8000.0).sin()) as f32)
            .collect()
    }

    #[test]
    fn full_channel_keeps_every_block_in_the_window() {
        let tuner = Tuner::new(small_config(), MappingMode::EqualTempered).unwrap();
        let (sender, receiver) = crossbeam_channel::bounded(1);
        let mut processor = BlockProcessor::new(tuner, sender);

        // Nobody drains the channel after the first detection.
        let samples = stream(6 * 2000);
        for block in samples.chunks(2000) {
            processor.process(block);
        }

        assert_eq!(receiver.len(), 1);
        assert_eq!(processor.tuner().window(), &samples[4000..]);
    }

    #[test]
    fn device_error_skips_exactly_one_block() {
        let tuner = Tuner::new(small_config(), MappingMode::EqualTempered).unwrap();
        let (sender, receiver) = crossbeam_channel::unbounded();
        let mut processor = BlockProcessor::new(tuner, sender);
        let samples = stream(3 * 2000);

        processor.process(&samples[..2000]);
        processor.fault_flag().store(true, Ordering::Relaxed);
        processor.process(&samples[2000..4000]);
        processor.process(&samples[4000..]);

        let detections: Vec<_> = receiver.try_iter().collect();
        assert_eq!(detections.len(), 3);
        assert_eq!(detections[1], Detection::Skipped(StreamStatus::StreamError));
        assert!(!matches!(detections[2], Detection::Skipped(_)));
        let window = processor.tuner().window();
        assert_eq!(&window[6000..], &samples[4000..]);
        assert_eq!(&window[4000..6000], &samples[..2000]);
    }

    #[test]
    fn assembler_emits_full_blocks_only() {
        let mut assembler = BlockAssembler::new(4, 1);
        let mut blocks = Vec::new();
        assembler.push_interleaved(&[1.0, 2.0, 3.0], |b| blocks.push(b.to_vec()));
        assert!(blocks.is_empty());
        assert_eq!(assembler.pending(), 3);

        assembler.push_interleaved(&[4.0, 5.0, 6.0, 7.0, 8.0, 9.0], |b| blocks.push(b.to_vec()));
        assert_eq!(blocks, vec![vec![1.0, 2.0, 3.0, 4.0], vec![5.0, 6.0, 7.0, 8.0]]);
        assert_eq!(assembler.pending(), 1);
    }

    #[test]
    fn assembler_keeps_first_channel() {
        let mut assembler = BlockAssembler::new(2, 2);
        let mut blocks = Vec::new();
        assembler.push_interleaved(&[1.0, -1.0, 2.0, -2.0], |b| blocks.push(b.to_vec()));
        assert_eq!(blocks, vec![vec![1.0, 2.0]]);
    }
}
