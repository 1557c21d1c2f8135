//! Dynamic range compressor with a soft knee.
//!
//! Level detection runs through an envelope follower, the detected level is
//! mapped over a piecewise gain curve in the decibel domain and the result
//! is folded back onto the signal. Based on the README of
//! <https://github.com/p-hlp/CTAGDRC>.

use libm::fabsf;

use crate::envelope_follower::EnvelopeFollower;
use crate::math;

/// How the computed static gain leaves the compressor.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GainMode {
    /// Attenuate the input sample by the computed reduction. Keeps the sign
    /// and fine structure of the waveform intact.
    #[default]
    Reduction,
    /// Rebuild the sample from the compressed envelope alone. The sign and
    /// fine structure of the input are discarded, so this is not equivalent
    /// to [`GainMode::Reduction`] for any signal whose envelope and
    /// instantaneous sample differ. Kept for A/B measurement of the
    /// detector path.
    Absolute,
}

#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Compressor {
    threshold_db: f32,
    ratio: f32,
    knee_width_db: f32,
    threshold: f32,
    threshold_inverse: f32,
    ratio_inverse: f32,
    slope: f32,
    knee_half_db: f32,
    gain_mode: GainMode,
    max_block_size: usize,
    channels: usize,
    envelope_follower: EnvelopeFollower,
}

impl Compressor {
    pub fn new() -> Self {
        let mut compressor = Self {
            threshold_db: 0.0,
            ratio: 1.0,
            knee_width_db: 0.0,
            threshold: 1.0,
            threshold_inverse: 1.0,
            ratio_inverse: 1.0,
            slope: 0.0,
            knee_half_db: 0.0,
            gain_mode: GainMode::Reduction,
            max_block_size: 0,
            channels: 0,
            envelope_follower: EnvelopeFollower::new(),
        };
        compressor.update();
        compressor
    }

    /// Set the level in dB above which compression engages.
    pub fn set_threshold(&mut self, threshold_db: f32) {
        self.threshold_db = threshold_db;
        self.update();
    }

    /// Set the compression ratio, must be 1 or higher.
    pub fn set_ratio(&mut self, ratio: f32) {
        assert!(
            ratio >= 1.0,
            "ratio below 1 would turn the compressor into an expander"
        );
        self.ratio = ratio;
        self.update();
    }

    /// Set the width in dB of the knee centered on the threshold.
    pub fn set_knee_width(&mut self, knee_width_db: f32) {
        assert!(knee_width_db >= 0.0);
        self.knee_width_db = knee_width_db;
        self.update();
    }

    /// Set the attack time in milliseconds of the level detector.
    pub fn set_attack(&mut self, attack_time_ms: f32) {
        self.envelope_follower.set_attack_time(attack_time_ms);
    }

    /// Set the release time in milliseconds of the level detector.
    pub fn set_release(&mut self, release_time_ms: f32) {
        self.envelope_follower.set_release_time(release_time_ms);
    }

    pub fn set_gain_mode(&mut self, gain_mode: GainMode) {
        self.gain_mode = gain_mode;
    }

    /// Size the compressor for the given stream configuration.
    pub fn prepare(&mut self, sample_rate: f32, max_block_size: usize, channels: usize) {
        assert!(sample_rate > 0.0);
        assert!(max_block_size > 0);
        assert!(channels > 0);

        self.max_block_size = max_block_size;
        self.channels = channels;
        self.envelope_follower.prepare(sample_rate, channels);

        self.update();
        self.reset();
    }

    /// Clear detector state, keeping the configuration.
    pub fn reset(&mut self) {
        self.envelope_follower.reset();
    }

    /// Process one sample against its own channel's detector.
    pub fn process_sample(&mut self, channel: usize, input: f32) -> f32 {
        let envelope = self.envelope_follower.process_sample(channel, input);
        let gain = math::decibels_to_amplitude(self.reduction_db(envelope));
        match self.gain_mode {
            GainMode::Reduction => input * gain,
            GainMode::Absolute => envelope * gain,
        }
    }

    /// Process a block with every channel detecting its own envelope.
    pub fn process_block_independent(&mut self, block: &mut [&mut [f32]], bypass: bool) {
        self.check_block(block);
        if bypass {
            return;
        }

        for (channel, samples) in block.iter_mut().enumerate() {
            for x in samples.iter_mut() {
                *x = self.process_sample(channel, *x);
            }
        }
    }

    /// Process a block with a single detector shared by all channels.
    ///
    /// Per sample, the loudest channel drives detector channel 0 and the
    /// resulting gain is applied to every channel, so the stereo image
    /// never shifts.
    pub fn process_block_linked(&mut self, block: &mut [&mut [f32]], bypass: bool) {
        self.check_block(block);
        if bypass {
            return;
        }

        for i in 0..block[0].len() {
            let mut x_max = 0.0;
            for samples in block.iter() {
                x_max = f32::max(x_max, fabsf(samples[i]));
            }

            let envelope = self.envelope_follower.process_sample(0, x_max);
            let gain = math::decibels_to_amplitude(self.reduction_db(envelope));

            for samples in block.iter_mut() {
                samples[i] = match self.gain_mode {
                    GainMode::Reduction => samples[i] * gain,
                    GainMode::Absolute => envelope * gain,
                };
            }
        }
    }

    /// Last envelope detected on the given channel, useful for metering.
    pub fn detected_envelope(&self, channel: usize) -> f32 {
        self.envelope_follower.envelope(channel)
    }

    /// Gain reduction in dB for the given detected level, always 0 or less.
    fn reduction_db(&self, envelope: f32) -> f32 {
        let overshoot_db = math::amplitude_to_decibels(envelope * self.threshold_inverse);

        if overshoot_db < -self.knee_half_db {
            0.0
        } else if overshoot_db < self.knee_half_db {
            // With zero knee width both conditions collapse to overshoot < 0
            // and this branch is never entered, the division is safe.
            self.slope * (overshoot_db + self.knee_half_db) * (overshoot_db + self.knee_half_db)
                / (2.0 * self.knee_width_db)
        } else {
            self.slope * overshoot_db
        }
    }

    fn check_block(&self, block: &[&mut [f32]]) {
        assert!(self.channels > 0, "the compressor was not prepared");
        assert_eq!(block.len(), self.channels);
        for samples in block.iter() {
            assert_eq!(samples.len(), block[0].len());
            assert!(samples.len() <= self.max_block_size);
        }
    }

    fn update(&mut self) {
        self.threshold =
            math::decibels_to_amplitude(f32::max(self.threshold_db, math::MINUS_INFINITY_DB));
        self.threshold_inverse = 1.0 / self.threshold;
        self.ratio_inverse = 1.0 / self.ratio;
        self.slope = self.ratio_inverse - 1.0;
        self.knee_half_db = self.knee_width_db / 2.0;
    }
}

impl Default for Compressor {
    fn default() -> Self {
        Self::new()
    }
}
