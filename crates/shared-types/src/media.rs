//! # Media Center Payloads
//!
//! Requests accepted by a media-center bridge and the status it reports.
//!
//! ## Requests
//!
//! - `PlaybackCommand`: play / pause / stop / previous / next
//! - `SetSpeed`, `SeekPosition`: plain decimal integers
//! - `PlaybackOption`: random / repeat toggled by a boolean payload
//! - `PlayRequest`: what to play, selected by a kind tag
//!
//! ## Status
//!
//! - `VolumeState`
//! - `Playback` with the current, previous and next `PlaybackItem`

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};
use std::time::Duration;

use crate::{parse_bool, parse_int, payload_str, Validate, ValidationError};

// =============================================================================
// VOLUME
// =============================================================================

/// Volume status of an output.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeState {
    pub active: bool,
    pub mute: bool,
    pub volume: f64,
    #[serde(rename = "min")]
    pub minimum: f64,
    #[serde(rename = "max")]
    pub maximum: f64,
    pub steps: f64,
    #[serde(rename = "changecapabilities")]
    pub change_capabilities: VolumeChangeCapabilities,
}

/// Which volume changes the output supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeChangeCapabilities {
    pub mute: bool,
    #[serde(rename = "updown")]
    pub up_down: bool,
    pub set: bool,
}

impl VolumeState {
    /// Decode and validate a JSON volume status.
    pub fn parse(payload: &[u8]) -> Result<Self, ValidationError> {
        let state: Self = serde_json::from_slice(payload)?;
        state.validate()?;
        Ok(state)
    }
}

impl Validate for VolumeState {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.volume < self.minimum || self.volume > self.maximum {
            return Err(ValidationError::VolumeOutOfRange {
                volume: self.volume,
                min: self.minimum,
                max: self.maximum,
            });
        }
        Ok(())
    }
}

// =============================================================================
// PLAYBACK CONTROL
// =============================================================================

/// Transport control command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackCommand {
    Play,
    Pause,
    Stop,
    Previous,
    Next,
}

impl PlaybackCommand {
    pub fn parse(payload: &[u8]) -> Result<Self, ValidationError> {
        match payload_str(payload)? {
            "play" => Ok(Self::Play),
            "pause" => Ok(Self::Pause),
            "stop" => Ok(Self::Stop),
            "previous" => Ok(Self::Previous),
            "next" => Ok(Self::Next),
            other => Err(ValidationError::InvalidPlaybackCommand(other.to_string())),
        }
    }
}

/// Requested playback speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetSpeed(pub i32);

impl SetSpeed {
    pub fn parse(payload: &[u8]) -> Result<Self, ValidationError> {
        parse_int(payload).map(Self)
    }
}

/// Requested seek position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeekPosition(pub i32);

impl SeekPosition {
    pub fn parse(payload: &[u8]) -> Result<Self, ValidationError> {
        parse_int(payload).map(Self)
    }
}

/// Toggleable playback option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackOptionKind {
    Random,
    Repeat,
}

/// Playback option with its requested state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackOption {
    pub option: PlaybackOptionKind,
    pub state: bool,
}

impl PlaybackOption {
    /// Parse the option named in the topic with a boolean payload.
    pub fn parse(option: &str, payload: &[u8]) -> Result<Self, ValidationError> {
        let state = parse_bool(payload)?;
        let option = match option {
            "random" => PlaybackOptionKind::Random,
            "repeat" => PlaybackOptionKind::Repeat,
            other => return Err(ValidationError::InvalidPlaybackOption(other.to_string())),
        };
        Ok(Self { option, state })
    }
}

// =============================================================================
// PLAY REQUESTS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MovieSelection {
    pub title: String,
    pub year: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EpisodeSelection {
    pub show: String,
    pub season: i32,
    pub episode: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtistSelection {
    pub artist: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AlbumSelection {
    pub artist: String,
    pub album: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SongSelection {
    pub artist: String,
    pub album: String,
    pub song: String,
}

/// What to play. The kind tag selects exactly one payload shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "what", rename_all = "lowercase")]
pub enum PlayRequest {
    Url(String),
    Movie(MovieSelection),
    Episode(EpisodeSelection),
    Playlist(String),
    Artist(ArtistSelection),
    Album(AlbumSelection),
    Song(SongSelection),
}

impl PlayRequest {
    /// Parse the payload for `kind`.
    ///
    /// `url` and `playlist` take the raw payload, every other kind a JSON
    /// object.
    pub fn parse(kind: &str, payload: &[u8]) -> Result<Self, ValidationError> {
        let request = match kind {
            "url" => Self::Url(payload_str(payload)?.to_string()),
            "playlist" => Self::Playlist(payload_str(payload)?.to_string()),
            "movie" => Self::Movie(serde_json::from_slice(payload)?),
            "episode" => Self::Episode(serde_json::from_slice(payload)?),
            "artist" => Self::Artist(serde_json::from_slice(payload)?),
            "album" => Self::Album(serde_json::from_slice(payload)?),
            "song" => Self::Song(serde_json::from_slice(payload)?),
            other => return Err(ValidationError::UnknownPlayKind(other.to_string())),
        };
        request.validate()?;
        Ok(request)
    }

    /// The kind tag of this request.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Url(_) => "url",
            Self::Movie(_) => "movie",
            Self::Episode(_) => "episode",
            Self::Playlist(_) => "playlist",
            Self::Artist(_) => "artist",
            Self::Album(_) => "album",
            Self::Song(_) => "song",
        }
    }
}

impl Validate for PlayRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        let missing = |what, required| Err(ValidationError::MissingFields { what, required });

        match self {
            Self::Url(url) if url.is_empty() => missing("an URL", "a non-empty URL"),
            Self::Movie(m) if m.title.is_empty() || m.year == 0 => {
                missing("a movie", "the title and year")
            }
            Self::Episode(e) if e.show.is_empty() || e.season == 0 || e.episode == 0 => {
                missing("an episode", "the show, season and episode")
            }
            Self::Playlist(name) if name.is_empty() => missing("a playlist", "the name"),
            Self::Artist(a) if a.artist.is_empty() => {
                missing("songs of an artist", "the artist")
            }
            Self::Album(a) if a.artist.is_empty() || a.album.is_empty() => {
                missing("songs of an album", "the artist and album")
            }
            Self::Song(s) if s.artist.is_empty() || s.album.is_empty() || s.song.is_empty() => {
                missing("a song", "the artist, album and song")
            }
            _ => Ok(()),
        }
    }
}

// =============================================================================
// PLAYBACK STATUS
// =============================================================================

fn is_zero(value: &i32) -> bool {
    *value == 0
}

/// Playback status reported by a media center.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Playback {
    pub source: String,
    pub state: String,
    #[serde(rename = "type", skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(rename = "starttime", skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(rename = "endtime", skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    /// Milliseconds on the wire.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(skip_serializing_if = "Duration::is_zero")]
    pub elapsed: Duration,
    /// Milliseconds on the wire.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(skip_serializing_if = "Duration::is_zero")]
    pub duration: Duration,
    #[serde(skip_serializing_if = "is_zero")]
    pub speed: i32,
    #[serde(rename = "availablespeeds", skip_serializing_if = "Vec::is_empty")]
    pub available_speeds: Vec<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<PlaybackItem>,
    #[serde(rename = "previous", skip_serializing_if = "Option::is_none")]
    pub previous_item: Option<PlaybackItem>,
    #[serde(rename = "next", skip_serializing_if = "Option::is_none")]
    pub next_item: Option<PlaybackItem>,
    #[serde(rename = "changecapabilities", skip_serializing_if = "Option::is_none")]
    pub change_capabilities: Option<PlaybackChangeCapabilities>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<PlaybackOptions>,
}

impl Playback {
    /// Decode and validate a JSON playback status.
    pub fn parse(payload: &[u8]) -> Result<Self, ValidationError> {
        let playback: Self = serde_json::from_slice(payload)?;
        playback.validate()?;
        Ok(playback)
    }
}

impl Validate for Playback {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.source.is_empty() || self.state.is_empty() {
            return Err(ValidationError::IncompletePlayback);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackChangeCapabilities {
    pub speed: bool,
    #[serde(rename = "move")]
    pub move_: bool,
    pub repeat: bool,
    pub rotate: bool,
    pub seek: bool,
    pub shuffle: bool,
    pub zoom: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackOptions {
    pub repeat: String,
    pub random: bool,
}

/// Item being played, with detail for the item type.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackItem {
    pub title: String,
    #[serde(rename = "type", skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub filename: String,
    #[serde(rename = "livetv", skip_serializing_if = "Option::is_none")]
    pub live_tv: Option<PlaybackItemLiveTv>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub movie: Option<PlaybackItemMovie>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub episode: Option<PlaybackItemEpisode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub song: Option<PlaybackItemSong>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackItemLiveTv {
    pub channel: TvChannel,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackItemMovie {
    #[serde(rename = "imdbnumber", skip_serializing_if = "String::is_empty")]
    pub imdb_number: String,
    #[serde(rename = "originaltitle", skip_serializing_if = "String::is_empty")]
    pub original_title: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub year: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<ItemRating>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackItemEpisode {
    #[serde(rename = "showtitle")]
    pub show_title: String,
    pub season: i32,
    pub episode: i32,
    #[serde(rename = "firstaired", skip_serializing_if = "Option::is_none")]
    pub first_aired: Option<DateTime<Utc>>,
    #[serde(rename = "imdbnumber", skip_serializing_if = "String::is_empty")]
    pub imdb_number: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub year: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<ItemRating>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackItemSong {
    pub album: String,
    pub artist: String,
    pub track: i32,
    pub total: i32,
    pub year: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TvChannel {
    #[serde(rename = "type")]
    pub kind: String,
    pub number: i32,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemRating {
    pub rating: f32,
    pub votes: i64,
}
