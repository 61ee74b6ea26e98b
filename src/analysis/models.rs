//! Data types flowing through the analysis pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What the caller asked us to analyze.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisRequest {
    /// A previously uploaded audio file, plus optional caller-supplied
    /// metadata used when identification comes back empty.
    Audio {
        file_reference: String,
        fallback_title: Option<String>,
        fallback_artist: Option<String>,
    },
    /// A plain text lookup.
    Text { title: String, artist: String },
}

/// Canonical metadata returned by the fingerprinting service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentifiedTrack {
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    pub release_date: Option<String>,
    pub spotify_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub duration_seconds: Option<f64>,
}

impl IdentifiedTrack {
    /// A track is only usable if it names both a title and an artist.
    pub fn is_usable(&self) -> bool {
        !self.title.trim().is_empty() && !self.artist.trim().is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PitchClass {
    C,
    CSharp,
    D,
    DSharp,
    E,
    F,
    FSharp,
    G,
    GSharp,
    A,
    ASharp,
    B,
}

impl PitchClass {
    pub const ALL: [PitchClass; 12] = [
        PitchClass::C,
        PitchClass::CSharp,
        PitchClass::D,
        PitchClass::DSharp,
        PitchClass::E,
        PitchClass::F,
        PitchClass::FSharp,
        PitchClass::G,
        PitchClass::GSharp,
        PitchClass::A,
        PitchClass::ASharp,
        PitchClass::B,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PitchClass::C => "C",
            PitchClass::CSharp => "C#",
            PitchClass::D => "D",
            PitchClass::DSharp => "D#",
            PitchClass::E => "E",
            PitchClass::F => "F",
            PitchClass::FSharp => "F#",
            PitchClass::G => "G",
            PitchClass::GSharp => "G#",
            PitchClass::A => "A",
            PitchClass::ASharp => "A#",
            PitchClass::B => "B",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_str() == s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Major,
    Minor,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Major => "Major",
            Mode::Minor => "Minor",
        }
    }
}

/// A musical key: one of the twelve pitch classes in major or minor mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MusicalKey {
    pub tonic: PitchClass,
    pub mode: Mode,
}

impl MusicalKey {
    pub fn new(tonic: PitchClass, mode: Mode) -> Self {
        Self { tonic, mode }
    }
}

impl fmt::Display for MusicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.tonic.as_str(), self.mode.as_str())
    }
}

impl FromStr for MusicalKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (tonic, mode) = s
            .trim()
            .split_once(' ')
            .ok_or_else(|| format!("Invalid musical key: {}", s))?;
        let tonic = PitchClass::parse(tonic).ok_or_else(|| format!("Invalid tonic: {}", tonic))?;
        let mode = match mode.trim() {
            "Major" => Mode::Major,
            "Minor" => Mode::Minor,
            other => return Err(format!("Invalid mode: {}", other)),
        };
        Ok(MusicalKey { tonic, mode })
    }
}

/// Values estimated from the audio itself. Each field is independent.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AudioFeatures {
    pub bpm: Option<f64>,
    pub key: Option<MusicalKey>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabsAndChords {
    pub chords: Vec<String>,
    pub tab_document: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackingTrackLinks {
    pub backing_track_url: Option<String>,
    pub youtube_url: Option<String>,
}

/// The merged outcome of an analysis. This is also the song part of a
/// library entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub title: String,
    pub artist: String,
    #[serde(default)]
    pub album: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub spotify_url: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default, alias = "duration")]
    pub duration_seconds: Option<f64>,
    #[serde(default)]
    pub bpm: Option<f64>,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub chords: Vec<String>,
    #[serde(default, alias = "tabs")]
    pub tab_document: String,
    #[serde(default)]
    pub backing_track_url: Option<String>,
    #[serde(default)]
    pub youtube_url: Option<String>,
    #[serde(default)]
    pub audio_url: Option<String>,
}

impl AnalysisResult {
    pub fn from_text(title: &str, artist: &str) -> Self {
        Self {
            title: title.to_string(),
            artist: artist.to_string(),
            ..Default::default()
        }
    }

    pub fn from_identified(track: IdentifiedTrack) -> Self {
        Self {
            title: track.title,
            artist: track.artist,
            album: track.album,
            release_date: track.release_date,
            spotify_url: track.spotify_url,
            thumbnail_url: track.thumbnail_url,
            duration_seconds: track.duration_seconds,
            ..Default::default()
        }
    }

    pub fn apply_features(&mut self, features: AudioFeatures) {
        self.bpm = features.bpm;
        self.key = features.key.map(|k| k.to_string());
    }

    pub fn apply_tabs(&mut self, tabs: TabsAndChords) {
        self.chords = tabs.chords;
        self.tab_document = tabs.tab_document;
    }

    pub fn apply_links(&mut self, links: BackingTrackLinks) {
        self.backing_track_url = links.backing_track_url;
        self.youtube_url = links.youtube_url;
    }
}
