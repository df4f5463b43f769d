use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;

use crate::{Clip, Frame};

/// Header of a packed binary clip: magic followed by a little-endian `u32` channel count.
pub const BINARY_MAGIC: &[u8; 4] = b"CLIP";
const BINARY_HEADER_LEN: usize = 8;

/// Upper bound on channels per frame; sparse JSON keys beyond it are rejected.
pub const MAX_CHANNELS: usize = 65_536;

#[derive(Debug, Error)]
pub enum ClipError {
    #[error("clip directory {0} does not exist")]
    MissingDirectory(PathBuf),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid clip {path}: {reason}")]
    InvalidFormat { path: PathBuf, reason: String },

    #[error("clip {0} contains no frames")]
    Empty(PathBuf),
}

/// A JSON frame is either a plain array (index 0 = channel 1) or an object keyed by
/// 1-based channel number.
#[derive(Deserialize)]
#[serde(untagged)]
enum JsonFrame {
    Dense(Vec<Option<f64>>),
    Sparse(BTreeMap<String, Option<f64>>),
}

/// In-memory index of every clip available for playback.
#[derive(Debug, Default, Clone)]
pub struct ClipStore {
    clips: HashMap<String, Arc<Clip>>,
}

impl ClipStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads every `.json` and `.bin` clip in `directory` (not recursive).
    ///
    /// Files that fail to load are logged and skipped so one bad export doesn't take the
    /// whole show down.
    pub fn load_directory(directory: impl AsRef<Path>) -> Result<Self, ClipError> {
        let directory = directory.as_ref();
        if !directory.is_dir() {
            return Err(ClipError::MissingDirectory(directory.to_path_buf()));
        }

        let entries = fs::read_dir(directory).map_err(|source| ClipError::Io {
            path: directory.to_path_buf(),
            source,
        })?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .filter(|path| path.is_file())
            .collect();
        paths.sort();

        let mut store = ClipStore::new();
        for path in paths {
            match load_clip_file(&path) {
                Ok(Some(clip)) => {
                    log::debug!("Loaded clip '{}' ({} frames)", clip.name(), clip.len());
                    if let Some(previous) = store.insert(clip) {
                        log::warn!(
                            "Clip '{}' defined more than once, keeping {}",
                            previous.name(),
                            path.display()
                        );
                    }
                }
                Ok(None) => {}
                Err(e) => log::error!("Skipping clip: {}", e),
            }
        }

        log::info!(
            "Loaded {} clips from {}",
            store.len(),
            directory.display()
        );
        Ok(store)
    }

    /// Adds a clip, returning the one it replaced.
    pub fn insert(&mut self, clip: Clip) -> Option<Arc<Clip>> {
        self.clips.insert(clip.name().to_string(), Arc::new(clip))
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Clip>> {
        self.clips.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.clips.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    /// Clip names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.clips.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Loads a single clip file. Returns `Ok(None)` for files that aren't clips.
pub fn load_clip_file(path: &Path) -> Result<Option<Clip>, ClipError> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    let decode: fn(&[u8]) -> Result<Vec<Frame>, DecodeError> = match extension.as_deref() {
        Some("json") => decode_json,
        Some("bin") => decode_binary,
        _ => return Ok(None),
    };

    let Some(name) = path.file_stem().and_then(|stem| stem.to_str()) else {
        return Err(ClipError::InvalidFormat {
            path: path.to_path_buf(),
            reason: "file name is not valid UTF-8".to_string(),
        });
    };

    let bytes = fs::read(path).map_err(|source| ClipError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let frames = decode(&bytes).map_err(|e| e.with_path(path))?;
    if frames.is_empty() {
        return Err(ClipError::Empty(path.to_path_buf()));
    }

    Ok(Some(Clip::new(name, frames)))
}

enum DecodeError {
    Json(serde_json::Error),
    Format(String),
}

impl DecodeError {
    fn with_path(self, path: &Path) -> ClipError {
        let path = path.to_path_buf();
        match self {
            DecodeError::Json(source) => ClipError::Json { path, source },
            DecodeError::Format(reason) => ClipError::InvalidFormat { path, reason },
        }
    }
}

fn decode_json(bytes: &[u8]) -> Result<Vec<Frame>, DecodeError> {
    let frames: Vec<JsonFrame> = serde_json::from_slice(bytes).map_err(DecodeError::Json)?;

    frames
        .into_iter()
        .enumerate()
        .map(|(index, frame)| match frame {
            JsonFrame::Dense(values) => Ok(Frame::new(
                values.into_iter().map(|v| intensity(v.unwrap_or(0.0))).collect(),
            )),
            JsonFrame::Sparse(channels) => decode_sparse(channels)
                .map_err(|reason| DecodeError::Format(format!("frame {}: {}", index, reason))),
        })
        .collect()
}

fn decode_sparse(channels: BTreeMap<String, Option<f64>>) -> Result<Frame, String> {
    let mut values = Vec::new();

    for (key, value) in channels {
        let channel: usize = key
            .trim()
            .parse()
            .map_err(|_| format!("channel key '{}' is not a number", key))?;
        // Channel 0 doesn't exist on the output side
        if channel == 0 {
            continue;
        }
        if channel > MAX_CHANNELS {
            return Err(format!("channel {} exceeds {}", channel, MAX_CHANNELS));
        }
        if values.len() < channel {
            values.resize(channel, 0);
        }
        values[channel - 1] = intensity(value.unwrap_or(0.0));
    }

    Ok(Frame::new(values))
}

fn decode_binary(bytes: &[u8]) -> Result<Vec<Frame>, DecodeError> {
    if bytes.len() < BINARY_HEADER_LEN || &bytes[..4] != BINARY_MAGIC {
        return Err(DecodeError::Format("missing CLIP header".to_string()));
    }

    let channels = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]) as usize;
    if channels == 0 || channels > MAX_CHANNELS {
        return Err(DecodeError::Format(format!(
            "invalid channel count {}",
            channels
        )));
    }

    let body = &bytes[BINARY_HEADER_LEN..];
    if body.len() % channels != 0 {
        return Err(DecodeError::Format(format!(
            "{} trailing bytes after last full frame",
            body.len() % channels
        )));
    }

    Ok(body
        .chunks_exact(channels)
        .map(|chunk| Frame::new(chunk.to_vec()))
        .collect())
}

/// Encodes frames in the packed binary layout read by the loader.
pub fn encode_binary(frames: &[Frame]) -> Vec<u8> {
    let channels = frames.iter().map(Frame::len).max().unwrap_or(0);
    let mut bytes = Vec::with_capacity(BINARY_HEADER_LEN + channels * frames.len());
    bytes.extend_from_slice(BINARY_MAGIC);
    bytes.extend_from_slice(&(channels as u32).to_le_bytes());

    for frame in frames {
        let start = bytes.len();
        bytes.resize(start + channels, 0);
        frame.write_into(&mut bytes[start..], 1);
    }
    bytes
}

fn intensity(value: f64) -> u8 {
    if value.is_nan() {
        return 0;
    }
    value.round().clamp(0.0, 255.0) as u8
}
