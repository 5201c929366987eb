use crate::error::{Error, Result};
use directories::BaseDirs;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::debug;

pub const DATA_FILE_NAME: &str = "AmpShell.xml";
pub const DEBUG_ENV: &str = "AMPSHELL_DEBUG";
const APP_DIR_NAME: &str = "AmpShell";
const LOG_FILE_NAME: &str = "ampshell.log";

/// Every directory the application reads from or probes, resolved once at
/// startup and passed to whatever needs it.
#[derive(Debug, Clone)]
pub struct Locations {
    /// Directory of the running executable; `AppPath` in portable data files.
    pub startup_dir: PathBuf,
    /// Per-user data directory holding the non-portable `AmpShell.xml`.
    pub user_data_dir: PathBuf,
    /// Where DOSBox keeps its own per-user config and language files.
    pub dosbox_user_dir: PathBuf,
    /// Roots scanned for `DOSBox*` installation directories.
    pub program_roots: Vec<PathBuf>,
    /// Directories where a packaged `dosbox` binary lands directly.
    pub system_bin_dirs: Vec<PathBuf>,
    pub editor_candidates: Vec<PathBuf>,
    pub windows_dir: Option<PathBuf>,
    pub debug: bool,
}

impl Locations {
    pub fn detect(app_dir_override: Option<&Path>) -> Result<Self> {
        let base = BaseDirs::new().ok_or(Error::HomeDirUnavailable)?;
        let startup_dir = match app_dir_override {
            Some(path) => path.to_path_buf(),
            None => std::env::current_exe()
                .ok()
                .and_then(|exe| exe.parent().map(Path::to_path_buf))
                .unwrap_or_else(|| PathBuf::from(".")),
        };
        let debug = std::env::var(DEBUG_ENV)
            .map(|value| !value.trim().is_empty())
            .unwrap_or(false);

        let locations = Self {
            startup_dir,
            user_data_dir: base.data_dir().join(APP_DIR_NAME),
            dosbox_user_dir: dosbox_user_dir(&base),
            program_roots: program_roots(&base),
            system_bin_dirs: system_bin_dirs(),
            editor_candidates: editor_candidates(),
            windows_dir: windows_dir(),
            debug,
        };
        debug!(?locations, "resolved locations");
        Ok(locations)
    }

    pub fn startup_dir_text(&self) -> String {
        self.startup_dir.to_string_lossy().into_owned()
    }

    pub fn portable_data_file(&self) -> PathBuf {
        self.startup_dir.join(DATA_FILE_NAME)
    }

    pub fn user_data_file(&self) -> PathBuf {
        self.user_data_dir.join(DATA_FILE_NAME)
    }

    pub fn log_path(&self) -> PathBuf {
        self.user_data_dir.join(LOG_FILE_NAME)
    }

    pub fn is_portable_data_file(&self, path: &Path) -> bool {
        path == self.portable_data_file()
    }

    /// The data file to load from, and to save to outside portable mode.
    pub fn data_file_path(&self) -> Result<PathBuf> {
        let user_file = self.user_data_file();
        if self.debug {
            return Ok(user_file);
        }
        if !self.has_write_access_to_startup_dir() {
            fs::create_dir_all(&self.user_data_dir).map_err(|source| Error::Write {
                path: self.user_data_dir.clone(),
                source,
            })?;
            return Ok(user_file);
        }
        let portable_file = self.portable_data_file();
        if portable_file.is_file() {
            Ok(portable_file)
        } else {
            Ok(user_file)
        }
    }

    /// Creates and drops a uniquely named file in the startup directory.
    pub fn has_write_access_to_startup_dir(&self) -> bool {
        tempfile::Builder::new()
            .prefix(".ampshell-write-test")
            .tempfile_in(&self.startup_dir)
            .is_ok()
    }
}

#[cfg(windows)]
fn dosbox_user_dir(base: &BaseDirs) -> PathBuf {
    base.data_local_dir().join("DOSBox")
}

#[cfg(not(windows))]
fn dosbox_user_dir(base: &BaseDirs) -> PathBuf {
    base.home_dir().join(".dosbox")
}

#[cfg(windows)]
fn program_roots(_base: &BaseDirs) -> Vec<PathBuf> {
    ["ProgramFiles", "ProgramFiles(x86)"]
        .iter()
        .filter_map(|key| std::env::var_os(key))
        .map(PathBuf::from)
        .collect()
}

#[cfg(not(windows))]
fn program_roots(base: &BaseDirs) -> Vec<PathBuf> {
    vec![
        PathBuf::from("/opt"),
        PathBuf::from("/usr/local"),
        base.home_dir().join(".local/opt"),
    ]
}

#[cfg(windows)]
fn system_bin_dirs() -> Vec<PathBuf> {
    Vec::new()
}

#[cfg(not(windows))]
fn system_bin_dirs() -> Vec<PathBuf> {
    ["/usr/bin", "/usr/local/bin", "/usr/games"]
        .iter()
        .map(PathBuf::from)
        .collect()
}

#[cfg(windows)]
fn windows_dir() -> Option<PathBuf> {
    std::env::var_os("WINDIR").map(PathBuf::from)
}

#[cfg(not(windows))]
fn windows_dir() -> Option<PathBuf> {
    None
}

#[cfg(windows)]
fn editor_candidates() -> Vec<PathBuf> {
    windows_dir()
        .map(|dir| vec![dir.join("notepad.exe")])
        .unwrap_or_default()
}

#[cfg(not(windows))]
fn editor_candidates() -> Vec<PathBuf> {
    ["gedit", "gnome-text-editor", "kate", "mousepad", "nano", "vi"]
        .iter()
        .map(|name| Path::new("/usr/bin").join(name))
        .collect()
}

#[cfg(test)]
pub(crate) fn test_locations(root: &Path) -> Locations {
    let startup_dir = root.join("app");
    let user_data_dir = root.join("user").join(APP_DIR_NAME);
    fs::create_dir_all(&startup_dir).expect("create startup dir");
    Locations {
        startup_dir,
        user_data_dir,
        dosbox_user_dir: root.join("user").join("dosbox"),
        program_roots: vec![root.join("programs")],
        system_bin_dirs: Vec::new(),
        editor_candidates: vec![root.join("bin").join("editor")],
        windows_dir: None,
        debug: false,
    }
}
