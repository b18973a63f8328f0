use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use kirinuki_core::{
    decode_snapshot, encode_snapshot, validate_snapshot, CodecError, GameSnapshot, GameStats,
    SnapshotError,
};

pub const SAVE_DIR_ENV: &str = "KIRINUKI_SAVE_DIR";
pub const DEFAULT_SAVE_DIR: &str = "saves";

#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    #[error("save io failed: {0}")]
    Io(#[from] io::Error),
    #[error("save file is not valid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("save is not a valid game: {0}")]
    Invalid(#[from] SnapshotError),
    #[error("invalid save name {0:?}")]
    InvalidName(String),
    #[error("no save named {0:?}")]
    NotFound(String),
}

/// On-disk encoding. JSON is readable; binary is the compact rkyv archive.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SaveFormat {
    #[default]
    Json,
    Binary,
}

impl SaveFormat {
    fn extension(self) -> &'static str {
        match self {
            SaveFormat::Json => "json",
            SaveFormat::Binary => "bin",
        }
    }

    fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "json" => Some(SaveFormat::Json),
            "bin" => Some(SaveFormat::Binary),
            _ => None,
        }
    }
}

/// Save metadata without the piece list or groups.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SaveInfo {
    pub name: String,
    pub saved_at: u64,
    pub label: String,
    pub image_path: Option<String>,
    pub rows: u32,
    pub cols: u32,
    pub piece_count: u32,
    pub shape_family: String,
    pub rotation_enabled: bool,
    pub stats: GameStats,
}

impl SaveInfo {
    fn from_snapshot(name: &str, snapshot: &GameSnapshot) -> Self {
        Self {
            name: name.to_string(),
            saved_at: snapshot.saved_at,
            label: snapshot.puzzle.label.clone(),
            image_path: snapshot.puzzle.image_path.clone(),
            rows: snapshot.puzzle.rows,
            cols: snapshot.puzzle.cols,
            piece_count: snapshot.puzzle.rows * snapshot.puzzle.cols,
            shape_family: snapshot.puzzle.shape_family.name().to_string(),
            rotation_enabled: snapshot.rules.rotation_enabled,
            stats: snapshot.stats,
        }
    }
}

/// A directory of named saves, one file per save.
#[derive(Clone, Debug)]
pub struct SaveStore {
    dir: PathBuf,
    format: SaveFormat,
}

impl SaveStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            format: SaveFormat::Json,
        }
    }

    /// Directory from `KIRINUKI_SAVE_DIR`, else `./saves`.
    pub fn from_env() -> Self {
        let dir = std::env::var_os(SAVE_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SAVE_DIR));
        Self::new(dir)
    }

    pub fn with_format(mut self, format: SaveFormat) -> Self {
        self.format = format;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes the snapshot under `name`, or `save-<saved_at>` when no name is
    /// given, replacing any save of the same name. Returns the name used.
    pub fn save(&self, snapshot: &GameSnapshot, name: Option<&str>) -> Result<String, SaveError> {
        let name = match name {
            Some(name) => name.trim().to_string(),
            None => default_save_name(snapshot.saved_at),
        };
        check_name(&name)?;
        validate_snapshot(snapshot)?;
        fs::create_dir_all(&self.dir)?;
        let bytes = match self.format {
            SaveFormat::Json => serde_json::to_vec_pretty(snapshot)?,
            SaveFormat::Binary => encode_snapshot(snapshot)?,
        };
        for format in [SaveFormat::Json, SaveFormat::Binary] {
            if format != self.format {
                remove_if_present(&self.path_for(&name, format))?;
            }
        }
        let path = self.path_for(&name, self.format);
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &path)?;
        log::debug!("saved {} to {}", name, path.display());
        Ok(name)
    }

    pub fn load(&self, name: &str) -> Result<GameSnapshot, SaveError> {
        check_name(name)?;
        let (path, format) = self.find(name)?;
        let bytes = fs::read(&path)?;
        let snapshot = match format {
            SaveFormat::Json => {
                let snapshot: GameSnapshot = serde_json::from_slice(&bytes)?;
                validate_snapshot(&snapshot).map(|_| snapshot)
            }
            SaveFormat::Binary => match decode_snapshot(&bytes) {
                Ok(snapshot) => Ok(snapshot),
                Err(CodecError::Invalid(err)) => Err(err),
                Err(err) => return Err(err.into()),
            },
        };
        snapshot.map_err(|err| {
            log::warn!("rejected save {}: {}", name, err);
            SaveError::Invalid(err)
        })
    }

    pub fn exists(&self, name: &str) -> bool {
        check_name(name).is_ok() && self.find(name).is_ok()
    }

    pub fn delete(&self, name: &str) -> Result<(), SaveError> {
        check_name(name)?;
        let (path, _) = self.find(name)?;
        fs::remove_file(path)?;
        log::debug!("deleted save {}", name);
        Ok(())
    }

    pub fn info(&self, name: &str) -> Result<SaveInfo, SaveError> {
        let snapshot = self.load(name)?;
        Ok(SaveInfo::from_snapshot(name, &snapshot))
    }

    /// Every loadable save, newest first. Unreadable files are skipped.
    pub fn list(&self) -> Result<Vec<SaveInfo>, SaveError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        let mut names = Vec::new();
        for entry in entries {
            let path = entry?.path();
            let is_save = path
                .extension()
                .and_then(|ext| ext.to_str())
                .and_then(SaveFormat::from_extension)
                .is_some();
            if !is_save {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort_unstable();
        names.dedup();

        let mut infos: Vec<SaveInfo> = names
            .iter()
            .filter_map(|name| match self.info(name) {
                Ok(info) => Some(info),
                Err(err) => {
                    log::warn!("skipping save {}: {}", name, err);
                    None
                }
            })
            .collect();
        infos.sort_by(|a, b| b.saved_at.cmp(&a.saved_at).then_with(|| a.name.cmp(&b.name)));
        Ok(infos)
    }

    fn path_for(&self, name: &str, format: SaveFormat) -> PathBuf {
        self.dir.join(format!("{}.{}", name, format.extension()))
    }

    fn find(&self, name: &str) -> Result<(PathBuf, SaveFormat), SaveError> {
        [self.format, SaveFormat::Json, SaveFormat::Binary]
            .into_iter()
            .map(|format| (self.path_for(name, format), format))
            .find(|(path, _)| path.is_file())
            .ok_or_else(|| SaveError::NotFound(name.to_string()))
    }
}

pub fn default_save_name(saved_at: u64) -> String {
    format!("save-{}", saved_at)
}

pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
}

fn check_name(name: &str) -> Result<(), SaveError> {
    let ok = !name.is_empty()
        && name.len() <= 64
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if ok {
        Ok(())
    } else {
        Err(SaveError::InvalidName(name.to_string()))
    }
}

fn remove_if_present(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err),
        _ => Ok(()),
    }
}
