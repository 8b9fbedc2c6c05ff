use anyhow::{Context, Result};
use clap::Parser;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs, io,
    path::{Path, PathBuf},
};

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "fill-line")]
#[command(about = "Fill cups up to their fill lines in rapid succession", long_about = None)]
pub struct Args {
    /// FPS cap (render and animation-frame rate)
    #[arg(long)]
    pub fps: Option<u32>,

    /// Tap to start and stop pouring instead of holding the fill key
    #[arg(long, default_value_t = false)]
    pub touch: bool,

    /// Seed for bottle generation (random when omitted)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Open on the About page
    #[arg(long, default_value_t = false)]
    pub about: bool,

    /// Directory for settings, storage and the log file
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Render without color
    #[arg(long, default_value_t = false)]
    pub no_color: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub fps_cap: u32,
    pub enable_color: bool,
    /// `None` picks touch mode when the terminal cannot report key releases.
    pub touch: Option<bool>,
    pub seed: Option<u64>,
    pub fill_key: char,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            fps_cap: 60,
            enable_color: true,
            touch: None,
            seed: None,
            fill_key: ' ',
        }
    }
}

impl Settings {
    /// Settings for this session: command-line flags win over the file.
    pub fn with_args(&self, args: &Args) -> Settings {
        let mut s = self.clone();
        if let Some(fps) = args.fps {
            s.fps_cap = fps;
        }
        s.fps_cap = s.fps_cap.clamp(10, 240);
        if args.touch {
            s.touch = Some(true);
        }
        if args.seed.is_some() {
            s.seed = args.seed;
        }
        if args.no_color {
            s.enable_color = false;
        }
        s
    }
}

pub struct Paths {
    pub storage_path: PathBuf,
    pub settings_path: PathBuf,
    pub log_path: PathBuf,
}

pub fn project_paths(data_dir: Option<&Path>) -> Result<Paths> {
    let dir = match data_dir {
        Some(dir) => dir.to_path_buf(),
        None => ProjectDirs::from("com", "fill-line", "FillLine")
            .context("could not resolve project directories")?
            .data_local_dir()
            .to_path_buf(),
    };
    fs::create_dir_all(&dir)
        .with_context(|| format!("could not create data directory {}", dir.display()))?;
    Ok(Paths {
        storage_path: dir.join("storage.json"),
        settings_path: dir.join("settings.json"),
        log_path: dir.join("fill-line.log"),
    })
}

pub fn load_settings(path: &Path) -> Settings {
    if let Ok(s) = fs::read_to_string(path) {
        if let Ok(v) = serde_json::from_str::<Settings>(&s) {
            return v;
        }
    }
    Settings::default()
}

pub fn save_settings_atomic(path: &Path, s: &Settings) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    let data = serde_json::to_vec_pretty(s)?;
    fs::write(&tmp, data)?;
    atomic_rename(&tmp, path)?;
    Ok(())
}

pub(crate) fn atomic_rename(from: &Path, to: &Path) -> io::Result<()> {
    // rename() replaces on unix; Windows needs the target gone first.
    if cfg!(windows) && to.exists() {
        let _ = fs::remove_file(to);
    }
    fs::rename(from, to)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_file_settings() {
        let file = Settings {
            fps_cap: 30,
            ..Settings::default()
        };
        let args = Args::parse_from(["fill-line", "--fps", "500", "--touch", "--seed", "9", "--no-color"]);
        let s = file.with_args(&args);
        assert_eq!(s.fps_cap, 240);
        assert_eq!(s.touch, Some(true));
        assert_eq!(s.seed, Some(9));
        assert!(!s.enable_color);
        assert_eq!(file.fps_cap, 30);
    }

    #[test]
    fn no_flags_keep_file_settings() {
        let file = Settings::default();
        let s = file.with_args(&Args::parse_from(["fill-line"]));
        assert_eq!(s, file);
    }

    #[test]
    fn settings_round_trip_and_fill_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        let paths = project_paths(Some(dir.path())).unwrap();
        assert_eq!(load_settings(&paths.settings_path), Settings::default());

        let s = Settings {
            fps_cap: 90,
            seed: Some(3),
            ..Settings::default()
        };
        save_settings_atomic(&paths.settings_path, &s).unwrap();
        assert_eq!(load_settings(&paths.settings_path), s);

        fs::write(&paths.settings_path, r#"{"fps_cap": 45}"#).unwrap();
        let partial = load_settings(&paths.settings_path);
        assert_eq!(partial.fps_cap, 45);
        assert_eq!(partial.fill_key, ' ');
    }
}
