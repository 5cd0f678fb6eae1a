use std::time::Duration;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::audio::LETTERS;
use crate::config::Settings;
use crate::error::NBackError;

/// Share of eligible positions forced to match when none is configured.
pub const DEFAULT_MATCH_PERCENTAGE: u8 = 30;

/// Orientation pause before the first stimulus.
pub const LEAD_IN_MS: u64 = 1000;

/// How long Correct/Incorrect feedback stays visible.
pub const FEEDBACK_RESET_MS: u64 = 300;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    ValueEnum,
    strum_macros::Display,
)]
pub enum Modality {
    #[default]
    Visual,
    Audio,
    AudioVisual,
}

impl Modality {
    pub fn has_visual(&self) -> bool {
        matches!(self, Modality::Visual | Modality::AudioVisual)
    }

    pub fn has_audio(&self) -> bool {
        matches!(self, Modality::Audio | Modality::AudioVisual)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Feedback {
    #[default]
    None,
    Correct,
    Incorrect,
}

/// Parameters for one session, fixed from `start` until the session ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub lag: usize,
    pub length: usize,
    /// Visual domain, usually the number of grid cells.
    pub stimulus_domain_size: u32,
    /// Audio domain, capped by the letter table.
    pub audio_domain_size: u32,
    pub target_match_percentage: u8,
    pub tick_interval_ms: u64,
    pub modality: Modality,
}

impl SessionConfig {
    pub fn new(
        lag: usize,
        length: usize,
        stimulus_domain_size: u32,
        target_match_percentage: u8,
        tick_interval_ms: u64,
        modality: Modality,
    ) -> Self {
        Self {
            lag,
            length,
            stimulus_domain_size,
            audio_domain_size: LETTERS.len() as u32,
            target_match_percentage,
            tick_interval_ms,
            modality,
        }
    }

    pub fn from_settings(settings: &Settings, modality: Modality) -> Self {
        Self::new(
            settings.n_back as usize,
            settings.event_count as usize,
            settings.grid_size * settings.grid_size,
            DEFAULT_MATCH_PERCENTAGE,
            settings.event_interval_ms,
            modality,
        )
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Check every precondition of a session before any state is touched.
    pub fn validate(&self) -> Result<(), NBackError> {
        if self.lag == 0 {
            return Err(NBackError::invalid("lag must be at least 1"));
        }
        if self.length <= self.lag {
            return Err(NBackError::invalid(format!(
                "length {} must exceed lag {}",
                self.length, self.lag
            )));
        }
        if self.target_match_percentage > 100 {
            return Err(NBackError::invalid(format!(
                "match percentage {} is above 100",
                self.target_match_percentage
            )));
        }
        if self.tick_interval_ms == 0 {
            return Err(NBackError::invalid("tick interval must be positive"));
        }
        if self.modality.has_visual() && self.stimulus_domain_size < 2 {
            return Err(NBackError::invalid(format!(
                "visual domain of {} is too small",
                self.stimulus_domain_size
            )));
        }
        if self.modality.has_audio() {
            if self.audio_domain_size < 2 {
                return Err(NBackError::invalid(format!(
                    "audio domain of {} is too small",
                    self.audio_domain_size
                )));
            }
            if self.audio_domain_size as usize > LETTERS.len() {
                return Err(NBackError::invalid(format!(
                    "audio domain of {} exceeds the {} available letters",
                    self.audio_domain_size,
                    LETTERS.len()
                )));
            }
        }
        Ok(())
    }
}

/// Snapshot published to observers on every orchestrator mutation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionState {
    pub modality: Modality,
    pub current_visual_value: Option<u32>,
    pub current_audio_value: Option<u32>,
    pub current_index: usize,
    pub is_running: bool,
    pub feedback: Feedback,
    pub correct_count: u32,
}

impl SessionState {
    pub fn idle(modality: Modality) -> Self {
        Self {
            modality,
            ..Self::default()
        }
    }

    /// True once the first stimulus is on screen.
    pub fn is_presenting(&self) -> bool {
        self.is_running
            && (self.current_visual_value.is_some() || self.current_audio_value.is_some())
    }
}
