//! Data-type labels and their cache lifetimes.
//!
//! [`TtlPolicy`] is an explicit struct rather than a string-keyed map: a misspelled
//! label parses to [`DataType::Other`] and always receives the default lifetime.

#[cfg(test)]
mod tests;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    AUDIO_FEATURES_TTL_HOURS, DEFAULT_TTL_HOURS, DETAILS_TTL_HOURS, PLAYLIST_TTL_HOURS, hours,
};

/// Category of cached payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum DataType {
    AudioFeatures,
    Playlist,
    TrackDetails,
    AlbumDetails,
    ArtistDetails,
    /// Any label without a dedicated TTL. Only [`DataType::from_label`] builds one,
    /// so the label is always normalized and never names a dedicated type.
    Other(OtherLabel),
}

/// Normalized label of a [`DataType::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OtherLabel(String);

impl OtherLabel {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for OtherLabel {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl DataType {
    /// Returns the stable label used in keys, on disk and in stats.
    pub fn as_str(&self) -> &str {
        match self {
            DataType::AudioFeatures => "audio_features",
            DataType::Playlist => "playlist",
            DataType::TrackDetails => "track_details",
            DataType::AlbumDetails => "album_details",
            DataType::ArtistDetails => "artist_details",
            DataType::Other(label) => label.as_str(),
        }
    }

    /// Returns `true` for labels that have a dedicated TTL field.
    pub fn is_known(&self) -> bool {
        !matches!(self, DataType::Other(_))
    }

    /// Parses a label. Never fails; unknown labels become [`DataType::Other`].
    pub fn from_label(label: &str) -> Self {
        let normalized = label.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "audio_features" => DataType::AudioFeatures,
            "playlist" => DataType::Playlist,
            "track_details" => DataType::TrackDetails,
            "album_details" => DataType::AlbumDetails,
            "artist_details" => DataType::ArtistDetails,
            _ => DataType::Other(OtherLabel(normalized)),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_label(s))
    }
}

impl From<&str> for DataType {
    fn from(label: &str) -> Self {
        Self::from_label(label)
    }
}

impl From<String> for DataType {
    fn from(label: String) -> Self {
        Self::from_label(&label)
    }
}

impl From<DataType> for String {
    fn from(data_type: DataType) -> Self {
        data_type.as_str().to_string()
    }
}

/// Per-type cache lifetimes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TtlPolicy {
    pub audio_features: Duration,
    pub playlist: Duration,
    pub track_details: Duration,
    pub album_details: Duration,
    pub artist_details: Duration,
    /// Used for [`DataType::Other`].
    pub default: Duration,
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self {
            audio_features: hours(AUDIO_FEATURES_TTL_HOURS),
            playlist: hours(PLAYLIST_TTL_HOURS),
            track_details: hours(DETAILS_TTL_HOURS),
            album_details: hours(DETAILS_TTL_HOURS),
            artist_details: hours(DETAILS_TTL_HOURS),
            default: hours(DEFAULT_TTL_HOURS),
        }
    }
}

impl TtlPolicy {
    /// A policy that applies `ttl` to every data type.
    pub fn uniform(ttl: Duration) -> Self {
        Self {
            audio_features: ttl,
            playlist: ttl,
            track_details: ttl,
            album_details: ttl,
            artist_details: ttl,
            default: ttl,
        }
    }

    /// Lifetime for entries of `data_type`.
    #[inline]
    pub fn ttl_for(&self, data_type: &DataType) -> Duration {
        match data_type {
            DataType::AudioFeatures => self.audio_features,
            DataType::Playlist => self.playlist,
            DataType::TrackDetails => self.track_details,
            DataType::AlbumDetails => self.album_details,
            DataType::ArtistDetails => self.artist_details,
            DataType::Other(_) => self.default,
        }
    }

    /// Returns a copy with the lifetime of `data_type` replaced.
    ///
    /// Setting an [`DataType::Other`] label changes the default, since other labels
    /// share one bucket.
    pub fn with_ttl(mut self, data_type: &DataType, ttl: Duration) -> Self {
        match data_type {
            DataType::AudioFeatures => self.audio_features = ttl,
            DataType::Playlist => self.playlist = ttl,
            DataType::TrackDetails => self.track_details = ttl,
            DataType::AlbumDetails => self.album_details = ttl,
            DataType::ArtistDetails => self.artist_details = ttl,
            DataType::Other(_) => self.default = ttl,
        }
        self
    }

    /// Returns the label of the first zero lifetime, if any.
    pub fn first_zero(&self) -> Option<&'static str> {
        [
            ("default", self.default),
            ("audio_features", self.audio_features),
            ("playlist", self.playlist),
            ("track_details", self.track_details),
            ("album_details", self.album_details),
            ("artist_details", self.artist_details),
        ]
        .into_iter()
        .find(|(_, ttl)| ttl.is_zero())
        .map(|(label, _)| label)
    }
}
