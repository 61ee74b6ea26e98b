//! Tempo and key estimation.

use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;
use rand::seq::IndexedRandom;
use rand::Rng;

use super::models::{Mode, MusicalKey, PitchClass};

pub const MIN_PLAUSIBLE_BPM: f64 = 40.0;
pub const MAX_PLAUSIBLE_BPM: f64 = 240.0;

/// Estimates musical features from an audio file. Each method is called
/// independently and may fail on its own.
#[async_trait]
pub trait FeatureDetector: Send + Sync {
    async fn detect_bpm(&self, audio: &Path) -> Result<Option<f64>>;

    async fn detect_key(&self, audio: &Path) -> Result<Option<MusicalKey>>;
}

pub fn is_plausible_bpm(bpm: f64) -> bool {
    bpm.is_finite() && (MIN_PLAUSIBLE_BPM..=MAX_PLAUSIBLE_BPM).contains(&bpm)
}

/// Produces random but plausible values until real signal analysis exists.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlaceholderFeatureDetector;

#[async_trait]
impl FeatureDetector for PlaceholderFeatureDetector {
    async fn detect_bpm(&self, _audio: &Path) -> Result<Option<f64>> {
        let bpm: u32 = rand::rng().random_range(60..180);
        Ok(Some(bpm as f64))
    }

    async fn detect_key(&self, _audio: &Path) -> Result<Option<MusicalKey>> {
        let mut rng = rand::rng();
        let tonic = PitchClass::ALL.choose(&mut rng).copied();
        let mode = if rng.random_bool(0.5) {
            Mode::Major
        } else {
            Mode::Minor
        };
        Ok(tonic.map(|t| MusicalKey::new(t, mode)))
    }
}
