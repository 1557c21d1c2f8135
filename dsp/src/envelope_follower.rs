//! Peak envelope follower with attack and release ballistics.
//!
//! Rectifies the input and smooths it with a one-pole filter that picks its
//! coefficient per sample, attack while the rectified input sits above the
//! held envelope, release while it falls below it.

#[allow(unused_imports)]
use micromath::F32Ext as _;

use heapless::Vec;
use libm::expf;

/// The most channels a single follower can track.
pub const MAX_CHANNELS: usize = 8;

#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EnvelopeFollower {
    sample_rate: f32,
    attack_time_ms: f32,
    release_time_ms: f32,
    alpha_attack: f32,
    alpha_release: f32,
    envelopes: Vec<f32, MAX_CHANNELS>,
}

impl EnvelopeFollower {
    pub fn new() -> Self {
        let mut follower = Self {
            sample_rate: 44100.0,
            attack_time_ms: 1.0,
            release_time_ms: 100.0,
            alpha_attack: 0.0,
            alpha_release: 0.0,
            envelopes: Vec::new(),
        };
        follower.update_coefficients();
        follower
    }

    /// Size per-channel state for the given configuration.
    ///
    /// Existing envelope state is dropped. Calling this again with identical
    /// arguments leaves the follower in the same state.
    pub fn prepare(&mut self, sample_rate: f32, channels: usize) {
        assert!(sample_rate > 0.0);
        assert!(channels > 0 && channels <= MAX_CHANNELS);

        self.sample_rate = sample_rate;
        self.envelopes.clear();
        self.envelopes.resize(channels, 0.0).unwrap();
        self.update_coefficients();
    }

    /// Zero envelope state on all channels, keeping the configuration.
    pub fn reset(&mut self) {
        for envelope in self.envelopes.iter_mut() {
            *envelope = 0.0;
        }
    }

    /// Takes effect on the next processed sample.
    pub fn set_attack_time(&mut self, attack_time_ms: f32) {
        assert!(attack_time_ms > 0.0);
        self.attack_time_ms = attack_time_ms;
        self.alpha_attack = coefficient(self.sample_rate, attack_time_ms);
    }

    /// Takes effect on the next processed sample.
    pub fn set_release_time(&mut self, release_time_ms: f32) {
        assert!(release_time_ms > 0.0);
        self.release_time_ms = release_time_ms;
        self.alpha_release = coefficient(self.sample_rate, release_time_ms);
    }

    /// Feed one sample of the given channel, returning the new envelope.
    ///
    /// Must be called once per sample per channel, in time order. Panics
    /// when the channel was not prepared.
    pub fn process_sample(&mut self, channel: usize, value: f32) -> f32 {
        assert!(
            channel < self.envelopes.len(),
            "channel out of range, was the follower prepared?"
        );

        let rectified = value.abs();
        let previous = self.envelopes[channel];
        let alpha = if rectified > previous {
            self.alpha_attack
        } else {
            self.alpha_release
        };

        let envelope = alpha * previous + (1.0 - alpha) * rectified;
        self.envelopes[channel] = envelope;
        envelope
    }

    /// Last envelope detected on the given channel, useful for metering.
    pub fn envelope(&self, channel: usize) -> f32 {
        self.envelopes[channel]
    }

    fn update_coefficients(&mut self) {
        self.alpha_attack = coefficient(self.sample_rate, self.attack_time_ms);
        self.alpha_release = coefficient(self.sample_rate, self.release_time_ms);
    }
}

impl Default for EnvelopeFollower {
    fn default() -> Self {
        Self::new()
    }
}

fn coefficient(sample_rate: f32, time_in_ms: f32) -> f32 {
    expf(-1.0 / (sample_rate * time_in_ms * 0.001))
}
