//! Main interface for the DSP loop.
//!
//! The host's real-time thread owns a [`Processor`] and calls
//! [`Processor::process`] once per block. Attribute changes come from the
//! control side and must be applied between blocks, never while a block is
//! being processed; the processing path reads the configuration without any
//! synchronization.

use crate::compressor::{Compressor, GainMode};

/// Which detector drives the gain of a multi-channel block.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ProcessingMode {
    /// Every channel detects its own envelope and computes its own gain.
    #[default]
    Independent,
    /// One detector runs on the cross-channel peak and all channels share
    /// its gain, keeping the stereo image in place.
    Linked,
}

#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Attributes {
    pub threshold_db: f32,
    pub ratio: f32,
    pub attack_time_ms: f32,
    pub release_time_ms: f32,
    pub knee_width_db: f32,
    pub mode: ProcessingMode,
    pub gain_mode: GainMode,
    pub bypass: bool,
}

impl Default for Attributes {
    fn default() -> Self {
        Self {
            threshold_db: 0.0,
            ratio: 3.0,
            attack_time_ms: 10.0,
            release_time_ms: 80.0,
            knee_width_db: 6.0,
            mode: ProcessingMode::Independent,
            gain_mode: GainMode::Reduction,
            bypass: false,
        }
    }
}

#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Processor {
    compressor: Compressor,
    mode: ProcessingMode,
    bypass: bool,
}

impl Processor {
    #[allow(clippy::let_and_return)]
    #[must_use]
    pub fn new(sample_rate: f32, max_block_size: usize, channels: usize) -> Self {
        let mut compressor = Compressor::new();
        compressor.prepare(sample_rate, max_block_size, channels);

        let mut uninitialized_processor = Self {
            compressor,
            mode: ProcessingMode::default(),
            bypass: false,
        };

        uninitialized_processor.set_attributes(Attributes::default());
        let processor = uninitialized_processor;

        processor
    }

    /// Process one non-interleaved multi-channel block in place.
    pub fn process(&mut self, block: &mut [&mut [f32]]) {
        match self.mode {
            ProcessingMode::Independent => {
                self.compressor.process_block_independent(block, self.bypass);
            }
            ProcessingMode::Linked => {
                self.compressor.process_block_linked(block, self.bypass);
            }
        }
    }

    /// Apply a new set of attributes. Call between blocks only.
    pub fn set_attributes(&mut self, attributes: Attributes) {
        self.compressor.set_threshold(attributes.threshold_db);
        self.compressor.set_ratio(attributes.ratio);
        self.compressor.set_attack(attributes.attack_time_ms);
        self.compressor.set_release(attributes.release_time_ms);
        self.compressor.set_knee_width(attributes.knee_width_db);
        self.compressor.set_gain_mode(attributes.gain_mode);
        self.mode = attributes.mode;
        self.bypass = attributes.bypass;
    }

    /// Clear detector state, keeping the configuration.
    pub fn reset(&mut self) {
        self.compressor.reset();
    }
}
