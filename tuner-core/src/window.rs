//! # Sliding Window Module
//!
//! Keeps the most recent `window_size` samples of the stream in temporal order.

use crate::error::TunerError;

/// Fixed-length buffer holding the latest samples, oldest first.
#[derive(Debug, Clone)]
pub struct SlidingWindow {
    samples: Vec<f32>,
}

impl SlidingWindow {
    /// Creates a window of `len` samples, initially silent.
    pub fn new(len: usize) -> Self {
        Self {
            samples: vec![0.0; len],
        }
    }

    /// Appends `block` and drops the same number of samples from the front.
    ///
    /// # Returns
    /// * `Ok(samples)` - The updated window
    /// * `Err(TunerError::BlockTooLarge)` - `block` is longer than the window; nothing changes
    pub fn ingest(&mut self, block: &[f32]) -> Result<&[f32], TunerError> {
        let len = self.samples.len();
        if block.len() > len {
            return Err(TunerError::BlockTooLarge {
                block: block.len(),
                window: len,
            });
        }
        self.samples.copy_within(block.len().., 0);
        self.samples[len - block.len()..].copy_from_slice(block);
        Ok(&self.samples)
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.samples.len()
    }
}
