use crate::error::GameValidationError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use time::{format_description::well_known::Rfc3339, Date, OffsetDateTime, PrimitiveDateTime};

/// Root of the user data: global DOSBox settings plus the ordered categories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename = "Preferences")]
pub struct Preferences {
    #[serde(rename = "DBPath", default, skip_serializing_if = "String::is_empty")]
    pub dosbox_path: String,
    #[serde(
        rename = "DBDefaultConfFilePath",
        default,
        skip_serializing_if = "String::is_empty"
    )]
    pub dosbox_default_conf_path: String,
    #[serde(
        rename = "DBDefaultLangFilePath",
        default,
        skip_serializing_if = "String::is_empty"
    )]
    pub dosbox_default_lang_path: String,
    #[serde(rename = "ConfigEditorPath", default, skip_serializing_if = "String::is_empty")]
    pub config_editor_path: String,
    #[serde(
        rename = "ConfigEditorAdditionalParameters",
        default,
        skip_serializing_if = "String::is_empty"
    )]
    pub config_editor_args: String,
    #[serde(rename = "PortableMode", default)]
    pub portable_mode: bool,
    #[serde(rename = "GamesUseDOSBox", default = "default_true")]
    pub games_use_dosbox: bool,
    #[serde(rename = "GamesNoConsole", default)]
    pub games_no_console: bool,
    #[serde(rename = "GamesInFullScreen", default)]
    pub games_in_fullscreen: bool,
    #[serde(rename = "GamesQuitOnExit", default)]
    pub games_quit_on_exit: bool,
    #[serde(rename = "GamesDefaultDir", default, skip_serializing_if = "String::is_empty")]
    pub games_default_dir: String,
    #[serde(rename = "CDsDefaultDir", default, skip_serializing_if = "String::is_empty")]
    pub cds_default_dir: String,
    #[serde(rename = "Category", default)]
    pub categories: Vec<Category>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            dosbox_path: String::new(),
            dosbox_default_conf_path: String::new(),
            dosbox_default_lang_path: String::new(),
            config_editor_path: String::new(),
            config_editor_args: String::new(),
            portable_mode: false,
            games_use_dosbox: true,
            games_no_console: false,
            games_in_fullscreen: false,
            games_quit_on_exit: false,
            games_default_dir: String::new(),
            cds_default_dir: String::new(),
            categories: Vec::new(),
        }
    }
}

impl Preferences {
    pub fn games(&self) -> impl Iterator<Item = &Game> {
        self.categories
            .iter()
            .flat_map(|category| category.games.iter())
    }

    pub fn games_mut(&mut self) -> impl Iterator<Item = &mut Game> {
        self.categories
            .iter_mut()
            .flat_map(|category| category.games.iter_mut())
    }

    pub fn game_count(&self) -> usize {
        self.categories
            .iter()
            .map(|category| category.games.len())
            .sum()
    }

    /// Editor command to hand to the launcher. The stock Windows notepad is
    /// reduced to its bare file name so the shell resolves it.
    pub fn config_editor_command(&self, windows_dir: Option<&Path>) -> String {
        if is_blank(&self.config_editor_path) {
            return self.config_editor_path.clone();
        }
        if let Some(windows_dir) = windows_dir {
            let notepad = windows_dir.join("NOTEPAD.EXE");
            if notepad.to_string_lossy().to_uppercase() == self.config_editor_path.to_uppercase() {
                return Path::new(&self.config_editor_path)
                    .file_name()
                    .map(|name| name.to_string_lossy().to_lowercase())
                    .unwrap_or_default();
            }
        }
        self.config_editor_path.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    #[serde(rename = "@Signature", default)]
    pub signature: String,
    #[serde(rename = "Title", default)]
    pub title: String,
    #[serde(rename = "Game", default)]
    pub games: Vec<Game>,
}

impl Category {
    pub fn new(title: &str, signature: &str) -> Self {
        Self {
            signature: signature.to_string(),
            title: title.to_string(),
            games: Vec::new(),
        }
    }

    pub fn move_up(&mut self, index: usize) {
        if index == 0 || index >= self.games.len() {
            return;
        }
        self.games.swap(index, index - 1);
    }

    pub fn move_down(&mut self, index: usize) {
        if index + 1 >= self.games.len() {
            return;
        }
        self.games.swap(index, index + 1);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    #[serde(rename = "@Signature", default)]
    pub signature: String,
    #[serde(rename = "Name", default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(
        rename = "ReleaseDate",
        default = "default_release_date",
        with = "release_date"
    )]
    pub release_date: Date,
    /// Main executable; its directory is what DOSBox mounts as C:.
    #[serde(rename = "DOSEXEPath", default, skip_serializing_if = "String::is_empty")]
    pub dos_exe_path: String,
    /// Directory mounted as C: when no executable is given.
    #[serde(rename = "Directory", default, skip_serializing_if = "String::is_empty")]
    pub directory: String,
    /// CD image, or a CD directory such as `D:\`.
    #[serde(rename = "CDPath", default, skip_serializing_if = "String::is_empty")]
    pub cd_path: String,
    /// Optional label, only used when the CD is not an image.
    #[serde(rename = "CDLabel", default, skip_serializing_if = "String::is_empty")]
    pub cd_label: String,
    #[serde(rename = "CDIsAnImage", default)]
    pub cd_is_an_image: bool,
    #[serde(rename = "SetupEXEPath", default, skip_serializing_if = "String::is_empty")]
    pub setup_exe_path: String,
    #[serde(rename = "DBConfPath", default, skip_serializing_if = "String::is_empty")]
    pub dosbox_conf_path: String,
    /// A DOSBox fork (DOSBox-X, Staging, ECE...) used instead of the global one.
    #[serde(
        rename = "AlternateDOSBoxExePath",
        default,
        skip_serializing_if = "String::is_empty"
    )]
    pub alternate_dosbox_exe_path: String,
    #[serde(
        rename = "AdditionalCommands",
        default,
        skip_serializing_if = "String::is_empty"
    )]
    pub additional_commands: String,
    #[serde(rename = "Icon", default, skip_serializing_if = "String::is_empty")]
    pub icon: String,
    #[serde(rename = "UsesDOSBox", default = "default_true")]
    pub uses_dosbox: bool,
    /// Legacy (0.72 and older) switch: start DOSBox without any config file.
    #[serde(rename = "NoConfig", default)]
    pub no_config: bool,
    #[serde(rename = "NoConsole", default)]
    pub no_console: bool,
    #[serde(rename = "InFullScreen", default)]
    pub in_fullscreen: bool,
    /// DOSBox `-exit`: close the emulator when the game exits.
    #[serde(rename = "QuitOnExit", default)]
    pub quit_on_exit: bool,
    #[serde(rename = "UseIOCTL", default)]
    pub use_ioctl: bool,
    #[serde(rename = "MountAsFloppy", default)]
    pub mount_as_floppy: bool,
    #[serde(
        rename = "DOSBoxWorkingDirectory",
        default,
        skip_serializing_if = "String::is_empty"
    )]
    pub dosbox_working_directory: String,
    #[serde(rename = "Notes", default, skip_serializing_if = "String::is_empty")]
    pub notes: String,
}

impl Default for Game {
    fn default() -> Self {
        Self {
            signature: String::new(),
            name: String::new(),
            release_date: default_release_date(),
            dos_exe_path: String::new(),
            directory: String::new(),
            cd_path: String::new(),
            cd_label: String::new(),
            cd_is_an_image: false,
            setup_exe_path: String::new(),
            dosbox_conf_path: String::new(),
            alternate_dosbox_exe_path: String::new(),
            additional_commands: String::new(),
            icon: String::new(),
            uses_dosbox: true,
            no_config: false,
            no_console: false,
            in_fullscreen: false,
            quit_on_exit: false,
            use_ioctl: false,
            mount_as_floppy: false,
            dosbox_working_directory: String::new(),
            notes: String::new(),
        }
    }
}

impl Game {
    #[cfg(test)]
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// The alternate executable when set, the global DOSBox otherwise.
    pub fn dosbox_path<'a>(&'a self, prefs: &'a Preferences) -> &'a str {
        if is_blank(&self.alternate_dosbox_exe_path) {
            &prefs.dosbox_path
        } else {
            &self.alternate_dosbox_exe_path
        }
    }

    pub fn is_dosbox_used(&self, prefs: &Preferences) -> bool {
        prefs.games_use_dosbox && self.uses_dosbox
    }

    pub fn is_dosbox_x_used(&self, prefs: &Preferences) -> bool {
        if !self.is_dosbox_used(prefs) {
            return false;
        }
        let path = self.dosbox_path(prefs);
        if is_blank(path) {
            return false;
        }
        Path::new(path)
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_uppercase().contains("DOSBOX-X"))
            .unwrap_or(false)
    }

    pub fn dosbox_working_directory(&self, prefs: &Preferences, initial: &str) -> String {
        if !self.is_dosbox_used(prefs) {
            return initial.to_string();
        }
        if !is_blank(&self.dosbox_working_directory) {
            return self.dosbox_working_directory.clone();
        }
        if self.is_dosbox_x_used(prefs) {
            if let Some(parent) = parent_dir(self.dosbox_path(prefs)) {
                return parent;
            }
        } else if !is_blank(&self.dosbox_conf_path) {
            if let Some(parent) = parent_dir(&self.dosbox_conf_path) {
                return parent;
            }
        }
        initial.to_string()
    }

    /// Where a file picker for this game should open.
    pub fn file_dialog_initial_directory(&self, prefs: &Preferences) -> String {
        let candidates = [
            parent_dir(&self.dos_exe_path),
            non_blank(&self.directory),
            parent_dir(&self.setup_exe_path),
            parent_dir(&self.icon),
            parent_dir(&self.dosbox_conf_path),
            non_blank(&prefs.games_default_dir),
        ];
        candidates
            .into_iter()
            .flatten()
            .find(|dir| Path::new(dir).is_dir())
            .unwrap_or_default()
    }

    /// Parent directory of the first path on this game that exists on disk.
    pub fn game_folder(&self) -> Option<String> {
        [
            &self.dos_exe_path,
            &self.directory,
            &self.setup_exe_path,
            &self.dosbox_conf_path,
            &self.icon,
            &self.alternate_dosbox_exe_path,
            &self.cd_path,
        ]
        .into_iter()
        .find(|path| !is_blank(path) && Path::new(path.as_str()).exists())
        .and_then(|path| parent_dir(path))
    }

    pub fn validate(&self) -> Result<(), GameValidationError> {
        if is_blank(&self.name) {
            return Err(GameValidationError::MissingName);
        }
        if is_blank(&self.dos_exe_path) && is_blank(&self.directory) {
            return Err(GameValidationError::MissingLocation);
        }
        Ok(())
    }

    pub fn refresh_cd_is_image(&mut self) {
        if !self.cd_path.is_empty() {
            self.cd_is_an_image = Path::new(&self.cd_path).is_file();
        }
    }
}

pub fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

pub fn default_release_date() -> Date {
    time::macros::date!(1980 - 01 - 01)
}

pub fn format_release_date(date: Date) -> String {
    format!(
        "{:04}-{:02}-{:02}T00:00:00",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

pub fn parse_release_date(value: &str) -> Option<Date> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    let naive_format =
        time::macros::format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
    if let Ok(dt) = PrimitiveDateTime::parse(trimmed, &naive_format) {
        return Some(dt.date());
    }
    if let Ok(dt) = OffsetDateTime::parse(trimmed, &Rfc3339) {
        return Some(dt.date());
    }
    let date_format = time::macros::format_description!("[year]-[month]-[day]");
    Date::parse(trimmed, &date_format).ok()
}

fn default_true() -> bool {
    true
}

fn non_blank(value: &str) -> Option<String> {
    (!is_blank(value)).then(|| value.to_string())
}

fn parent_dir(path: &str) -> Option<String> {
    if is_blank(path) {
        return None;
    }
    Path::new(path)
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(|parent| parent.to_string_lossy().into_owned())
}

mod release_date {
    use serde::{de, Deserialize, Deserializer, Serializer};
    use time::Date;

    pub fn serialize<S: Serializer>(date: &Date, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_release_date(*date))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Date, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_release_date(&raw)
            .ok_or_else(|| de::Error::custom(format!("invalid release date {raw:?}")))
    }
}
