//! Control-side parameter layer of the compressor.
//!
//! Raw control values arrive from a host or UI loop normalized to `[0, 1]`.
//! This crate clamps and scales them into the documented parameter ranges
//! and cooks them into attributes the DSP loop applies between blocks:
//!
//! ```text
//!    [ ControlLoop ]                        [ DSPLoop ]
//!          |                                    A
//!          | (ControlAction)    (Attributes)    |
//!          V                                    |
//!    [ reduce {Cache} ] --(DSPReaction)---------+
//! ```

#![cfg_attr(not(test), no_std)]
#![allow(clippy::module_name_repetitions)]

#[cfg(test)]
#[macro_use]
extern crate approx;

use lis_dsp::processor::{Attributes, ProcessingMode};

mod log;
mod taper;

use crate::log::info;

const THRESHOLD_RANGE: (f32, f32) = (-60.0, 0.0);
const RATIO_RANGE: (f32, f32) = (2.0, 10.0);
// Time controls feel natural on a log curve, see the taper module.
const ATTACK_RANGE: (f32, f32) = (1.0, 50.0);
const RELEASE_RANGE: (f32, f32) = (40.0, 120.0);
const KNEE_RANGE: (f32, f32) = (0.0, 20.0);

#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlAction {
    SetThreshold(f32),
    SetRatio(f32),
    SetAttack(f32),
    SetRelease(f32),
    SetKneeWidth(f32),
    SetLinked(bool),
    SetBypass(bool),
}

/// Cooked parameter values, ready to be turned into DSP attributes.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DSPReaction {
    pub threshold_db: f32,
    pub ratio: f32,
    pub attack_time_ms: f32,
    pub release_time_ms: f32,
    pub knee_width_db: f32,
    pub linked: bool,
    pub bypass: bool,
}

impl From<DSPReaction> for Attributes {
    fn from(other: DSPReaction) -> Self {
        Attributes {
            threshold_db: other.threshold_db,
            ratio: other.ratio,
            attack_time_ms: other.attack_time_ms,
            release_time_ms: other.release_time_ms,
            knee_width_db: other.knee_width_db,
            mode: if other.linked {
                ProcessingMode::Linked
            } else {
                ProcessingMode::Independent
            },
            bypass: other.bypass,
            ..Attributes::default()
        }
    }
}

/// Raw control values as they were last received.
#[derive(Default, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Cache {
    pub threshold: f32,
    pub ratio: f32,
    pub attack: f32,
    pub release: f32,
    pub knee_width: f32,
    pub linked: bool,
    pub bypass: bool,
}

#[must_use]
pub fn reduce_control_action(action: ControlAction, cache: &mut Cache) -> DSPReaction {
    apply_control_action_in_cache(action, cache);
    cook_dsp_reaction_from_cache(cache)
}

#[must_use]
pub fn cook_dsp_reaction_from_cache(cache: &Cache) -> DSPReaction {
    let reaction = DSPReaction {
        threshold_db: calculate_threshold(cache),
        ratio: calculate_ratio(cache),
        attack_time_ms: calculate_attack(cache),
        release_time_ms: calculate_release(cache),
        knee_width_db: calculate_knee_width(cache),
        linked: cache.linked,
        bypass: cache.bypass,
    };
    info!("Cooked DSP reaction: {}", reaction);
    reaction
}

#[allow(clippy::let_and_return)]
fn calculate_threshold(cache: &Cache) -> f32 {
    let threshold_clamped = cache.threshold.clamp(0.0, 1.0);
    let threshold_scaled =
        threshold_clamped * (THRESHOLD_RANGE.1 - THRESHOLD_RANGE.0) + THRESHOLD_RANGE.0;
    threshold_scaled
}

#[allow(clippy::let_and_return)]
fn calculate_ratio(cache: &Cache) -> f32 {
    let ratio_clamped = cache.ratio.clamp(0.0, 1.0);
    let ratio_scaled = ratio_clamped * (RATIO_RANGE.1 - RATIO_RANGE.0) + RATIO_RANGE.0;
    ratio_scaled
}

#[allow(clippy::let_and_return)]
fn calculate_attack(cache: &Cache) -> f32 {
    let attack_clamped = cache.attack.clamp(0.0, 1.0);
    let attack_curved = taper::log(attack_clamped);
    let attack_scaled = attack_curved * (ATTACK_RANGE.1 - ATTACK_RANGE.0) + ATTACK_RANGE.0;
    attack_scaled
}

#[allow(clippy::let_and_return)]
fn calculate_release(cache: &Cache) -> f32 {
    let release_clamped = cache.release.clamp(0.0, 1.0);
    let release_curved = taper::log(release_clamped);
    let release_scaled = release_curved * (RELEASE_RANGE.1 - RELEASE_RANGE.0) + RELEASE_RANGE.0;
    release_scaled
}

#[allow(clippy::let_and_return)]
fn calculate_knee_width(cache: &Cache) -> f32 {
    let knee_clamped = cache.knee_width.clamp(0.0, 1.0);
    let knee_scaled = knee_clamped * (KNEE_RANGE.1 - KNEE_RANGE.0) + KNEE_RANGE.0;
    knee_scaled
}

fn apply_control_action_in_cache(action: ControlAction, cache: &mut Cache) {
    #[allow(clippy::enum_glob_use)]
    use ControlAction::*;
    match action {
        SetThreshold(x) => {
            cache.threshold = x;
        }
        SetRatio(x) => {
            cache.ratio = x;
        }
        SetAttack(x) => {
            cache.attack = x;
        }
        SetRelease(x) => {
            cache.release = x;
        }
        SetKneeWidth(x) => {
            cache.knee_width = x;
        }
        SetLinked(x) => {
            cache.linked = x;
        }
        SetBypass(x) => {
            cache.bypass = x;
        }
    }
}
