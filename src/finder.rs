use crate::{
    config::Locations,
    error::{Error, Result},
};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

#[cfg(windows)]
pub const DOSBOX_EXECUTABLE: &str = "dosbox.exe";
#[cfg(not(windows))]
pub const DOSBOX_EXECUTABLE: &str = "dosbox";

const DOSBOX_CONF: &str = "dosbox.conf";

/// What the user answered when DOSBox could not be found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptAnswer {
    Picked(PathBuf),
    Skipped,
    Cancelled,
}

pub trait DosboxPrompt {
    fn ask_for_dosbox(&mut self, initial_dir: &Path) -> PromptAnswer;
}

/// Never asks; used when there is nobody to ask.
pub struct NoPrompt;

impl DosboxPrompt for NoPrompt {
    fn ask_for_dosbox(&mut self, _initial_dir: &Path) -> PromptAnswer {
        PromptAnswer::Skipped
    }
}

/// Locates the DOSBox executable, prompting as a last resort. Only a
/// cancelled prompt is an error; not finding DOSBox yields an empty string.
pub fn locate_dosbox_executable(
    locations: &Locations,
    data_file: &Path,
    portable_mode: bool,
    prompt: &mut dyn DosboxPrompt,
) -> Result<String> {
    if let Some(found) = search_dosbox(locations, data_file, portable_mode) {
        info!(path = %found.display(), "found DOSBox");
        return Ok(path_text(&found));
    }

    let initial_dir = locations
        .program_roots
        .first()
        .cloned()
        .unwrap_or_else(|| locations.startup_dir.clone());
    match prompt.ask_for_dosbox(&initial_dir) {
        PromptAnswer::Picked(path) => {
            info!(path = %path.display(), "DOSBox location picked by user");
            Ok(path_text(&path))
        }
        PromptAnswer::Skipped => {
            warn!("DOSBox not found");
            Ok(String::new())
        }
        PromptAnswer::Cancelled => Err(Error::DosboxLocationCancelled),
    }
}

fn search_dosbox(locations: &Locations, data_file: &Path, portable_mode: bool) -> Option<PathBuf> {
    if portable_mode && locations.is_portable_data_file(data_file) {
        let candidate = locations.startup_dir.join(DOSBOX_EXECUTABLE);
        return candidate.is_file().then_some(candidate);
    }

    for root in &locations.program_roots {
        for dir in dosbox_install_dirs(root) {
            let candidate = dir.join(DOSBOX_EXECUTABLE);
            if candidate.is_file() {
                return Some(candidate);
            }
            debug!(dir = %dir.display(), "no DOSBox executable in install dir");
        }
    }

    locations
        .system_bin_dirs
        .iter()
        .map(|dir| dir.join(DOSBOX_EXECUTABLE))
        .find(|candidate| candidate.is_file())
}

/// Default DOSBox configuration: portable `.conf` first, then DOSBox's own
/// per-user directory, then beside the executable (DOSBox before 0.73).
pub fn locate_dosbox_conf(locations: &Locations, data_file: &Path, dosbox_path: &str) -> String {
    if locations.is_portable_data_file(data_file) {
        if let Some(found) = first_file(&locations.startup_dir, |name| name.ends_with(".conf")) {
            return path_text(&found);
        }
    }

    if locations.dosbox_user_dir.is_dir() {
        return first_file(&locations.dosbox_user_dir, |name| {
            name.contains("dosbox") && name.ends_with(".conf")
        })
        .map(|found| path_text(&found))
        .unwrap_or_default();
    }

    executable_dir(dosbox_path)
        .map(|dir| dir.join(DOSBOX_CONF))
        .filter(|candidate| candidate.is_file())
        .map(|found| path_text(&found))
        .unwrap_or_default()
}

pub fn locate_dosbox_language_file(locations: &Locations, dosbox_path: &str) -> String {
    let is_language_file = |name: &str| name.ends_with(".lng");
    let found = if locations.dosbox_user_dir.is_dir() {
        first_file(&locations.dosbox_user_dir, is_language_file)
    } else {
        executable_dir(dosbox_path).and_then(|dir| first_file(&dir, is_language_file))
    };
    found.map(|found| path_text(&found)).unwrap_or_default()
}

pub fn locate_text_editor(locations: &Locations) -> String {
    locations
        .editor_candidates
        .iter()
        .find(|candidate| candidate.is_file())
        .map(|found| path_text(found))
        .unwrap_or_default()
}

fn dosbox_install_dirs(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_dir())
        .filter(|entry| {
            entry
                .file_name()
                .to_string_lossy()
                .to_lowercase()
                .starts_with("dosbox")
        })
        .map(|entry| entry.into_path())
        .collect()
}

/// First regular file in `dir` (by name) whose lower-cased name matches.
fn first_file(dir: &Path, matches: impl Fn(&str) -> bool) -> Option<PathBuf> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .find(|entry| matches(&entry.file_name().to_string_lossy().to_lowercase()))
        .map(|entry| entry.into_path())
}

fn executable_dir(dosbox_path: &str) -> Option<PathBuf> {
    if dosbox_path.trim().is_empty() {
        return None;
    }
    Path::new(dosbox_path)
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(Path::to_path_buf)
}

fn path_text(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
