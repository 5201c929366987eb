use crate::{
    config::Locations,
    error::{Error, Result},
    finder::{self, DosboxPrompt},
    identity,
    model::{is_blank, Category, Game, Preferences},
    portable,
};
use quick_xml::{
    events::{BytesText, Event},
    DeError, Reader, Writer,
};
use serde::Serialize;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, info};

/// How signatures are reassigned after an import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ImportMode {
    /// Re-sign every category and game in the merged tree.
    #[default]
    RekeyAll,
    /// Re-sign only what came from the imported file.
    RekeyImported,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    Loaded { path: PathBuf },
    Saved { path: PathBuf },
    AutoConfigured,
    CategoryAdded { signature: String },
    CategoryRenamed { signature: String },
    CategoryRemoved { signature: String },
    CategoryMoved { signature: String },
    GameAdded { signature: String, category: String },
    GameUpdated { signature: String },
    GameMoved { signature: String },
    GameRemoved { signature: String },
    Imported { categories: usize },
}

pub type Observer = Box<dyn FnMut(&StoreEvent)>;

/// Which tool paths auto-configuration changed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AutoConfigReport {
    pub dosbox: bool,
    pub config_editor: bool,
    pub dosbox_conf: bool,
    pub dosbox_lang: bool,
}

impl AutoConfigReport {
    pub fn changed(&self) -> bool {
        self.dosbox || self.config_editor || self.dosbox_conf || self.dosbox_lang
    }
}

/// Reads a preferences file as written, with no token expansion. A missing
/// file yields defaults.
pub fn load(path: &Path) -> Result<Preferences> {
    if !path.exists() {
        debug!(path = %path.display(), "no data file, using defaults");
        return Ok(Preferences::default());
    }
    read_preferences(path)
}

/// Writes `prefs` as-is, replacing the target atomically.
pub fn save(path: &Path, prefs: &Preferences) -> Result<()> {
    let xml = preferences_xml(prefs)?;
    write_atomic_text(path, &xml)
}

fn read_preferences(path: &Path) -> Result<Preferences> {
    let raw = fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let deserialize_error = |source| Error::Deserialize {
        path: path.to_path_buf(),
        source,
    };
    let protected = protect_edge_whitespace(&raw).map_err(deserialize_error)?;
    quick_xml::de::from_str(&protected).map_err(deserialize_error)
}

// The serde reader trims text nodes before unescaping them, so whitespace at
// the edges of an element value is rewritten as character references first.
// Whitespace-only text is indentation unless it is the whole element value.
fn protect_edge_whitespace(raw: &str) -> std::result::Result<String, DeError> {
    let mut reader = Reader::from_str(raw);
    let mut writer = Writer::new(Vec::with_capacity(raw.len()));
    let mut pending: Option<Event> = None;
    let mut after_start = false;
    loop {
        let event = match pending.take() {
            Some(event) => event,
            None => reader.read_event()?,
        };
        match event {
            Event::Eof => break,
            Event::Text(text) => {
                let content = std::str::from_utf8(&text)
                    .map_err(|err| DeError::Custom(err.to_string()))?;
                let blank = content.bytes().all(is_xml_whitespace);
                let whole_value = if blank && after_start {
                    let next = reader.read_event()?;
                    let closes = matches!(next, Event::End(_));
                    pending = Some(next);
                    closes
                } else {
                    !blank
                };
                if whole_value {
                    let encoded = encode_edge_whitespace(content);
                    writer.write_event(Event::Text(BytesText::from_escaped(encoded)))?;
                } else {
                    writer.write_event(Event::Text(text))?;
                }
                after_start = false;
            }
            other => {
                after_start = matches!(other, Event::Start(_));
                writer.write_event(other)?;
            }
        }
    }
    String::from_utf8(writer.into_inner()).map_err(|err| DeError::Custom(err.to_string()))
}

fn is_xml_whitespace(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\r' | b'\n')
}

fn encode_edge_whitespace(content: &str) -> String {
    let edge = |c: char| c.is_ascii() && is_xml_whitespace(c as u8);
    let lead = content.len() - content.trim_start_matches(edge).len();
    let body_end = content.trim_end_matches(edge).len().max(lead);
    let char_refs = |part: &str| part.bytes().map(|byte| format!("&#{byte};")).collect::<String>();
    format!(
        "{}{}{}",
        char_refs(&content[..lead]),
        &content[lead..body_end],
        char_refs(&content[body_end..])
    )
}

fn preferences_xml(prefs: &Preferences) -> Result<String> {
    let mut xml = "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n".to_string();
    let mut ser = quick_xml::se::Serializer::new(&mut xml);
    ser.indent(' ', 2);
    prefs.serialize(ser).map_err(Error::Serialize)?;
    xml.push('\n');
    Ok(xml)
}

fn write_atomic_text(path: &Path, contents: &str) -> Result<()> {
    let write_error = |source| Error::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_error)?;
    }
    let mut temp_name = path.file_name().unwrap_or_default().to_os_string();
    temp_name.push(".tmp");
    let temp_path = path.with_file_name(temp_name);
    fs::write(&temp_path, contents).map_err(write_error)?;
    fs::rename(&temp_path, path).map_err(write_error)?;
    Ok(())
}

/// Owns the preference tree for the lifetime of the process.
pub struct PreferencesStore {
    prefs: Preferences,
    locations: Locations,
    data_file: PathBuf,
    observers: Vec<Observer>,
}

impl PreferencesStore {
    pub fn new(locations: Locations, data_file: PathBuf) -> Self {
        Self {
            prefs: Preferences::default(),
            locations,
            data_file,
            observers: Vec::new(),
        }
    }

    /// Loads the data file chosen by [`Locations::data_file_path`].
    pub fn open(locations: Locations) -> Result<Self> {
        let data_file = locations.data_file_path()?;
        Self::open_file(locations, data_file)
    }

    pub fn open_file(locations: Locations, data_file: PathBuf) -> Result<Self> {
        let mut store = Self::new(locations, data_file);
        store.reload()?;
        Ok(store)
    }

    /// Re-reads the data file and expands `AppPath` to the running directory.
    /// On error the current tree is kept.
    pub fn reload(&mut self) -> Result<()> {
        let mut prefs = load(&self.data_file)?;
        portable::expand_tree(&mut prefs, &self.locations.startup_dir_text());
        info!(
            path = %self.data_file.display(),
            categories = prefs.categories.len(),
            games = prefs.game_count(),
            "preferences loaded"
        );
        self.prefs = prefs;
        let path = self.data_file.clone();
        self.emit(StoreEvent::Loaded { path });
        Ok(())
    }

    pub fn preferences(&self) -> &Preferences {
        &self.prefs
    }

    /// Direct access for plain preference edits; tree changes should go
    /// through the dedicated methods so observers hear about them.
    pub fn preferences_mut(&mut self) -> &mut Preferences {
        &mut self.prefs
    }

    pub fn locations(&self) -> &Locations {
        &self.locations
    }

    pub fn data_file(&self) -> &Path {
        &self.data_file
    }

    pub fn subscribe(&mut self, observer: impl FnMut(&StoreEvent) + 'static) {
        self.observers.push(Box::new(observer));
    }

    fn emit(&mut self, event: StoreEvent) {
        for observer in &mut self.observers {
            observer(&event);
        }
    }

    /// Fills in tool paths that are unset or point at missing files.
    pub fn run_auto_config(&mut self, prompt: &mut dyn DosboxPrompt) -> Result<AutoConfigReport> {
        self.auto_config(prompt, false)
    }

    /// Re-locates every tool path, even ones that still exist.
    pub fn refresh_tool_paths(&mut self, prompt: &mut dyn DosboxPrompt) -> Result<AutoConfigReport> {
        self.auto_config(prompt, true)
    }

    fn auto_config(&mut self, prompt: &mut dyn DosboxPrompt, force: bool) -> Result<AutoConfigReport> {
        let mut report = AutoConfigReport::default();
        let stale = |path: &str| force || is_blank(path) || !Path::new(path).is_file();

        if stale(&self.prefs.dosbox_path) {
            let found = finder::locate_dosbox_executable(
                &self.locations,
                &self.data_file,
                self.prefs.portable_mode,
                prompt,
            )?;
            report.dosbox = replace_path(&mut self.prefs.dosbox_path, found);
        }
        if stale(&self.prefs.config_editor_path) {
            let found = finder::locate_text_editor(&self.locations);
            report.config_editor = replace_path(&mut self.prefs.config_editor_path, found);
        }
        if stale(&self.prefs.dosbox_default_conf_path) {
            let found = finder::locate_dosbox_conf(
                &self.locations,
                &self.data_file,
                &self.prefs.dosbox_path,
            );
            report.dosbox_conf = replace_path(&mut self.prefs.dosbox_default_conf_path, found);
        }
        if stale(&self.prefs.dosbox_default_lang_path) {
            let found =
                finder::locate_dosbox_language_file(&self.locations, &self.prefs.dosbox_path);
            report.dosbox_lang = replace_path(&mut self.prefs.dosbox_default_lang_path, found);
        }

        debug!(?report, "auto-configuration done");
        self.emit(StoreEvent::AutoConfigured);
        Ok(report)
    }

    /// Where [`save`](Self::save) writes given the current portable flag.
    pub fn save_target(&self) -> Result<PathBuf> {
        if self.prefs.portable_mode {
            Ok(self.locations.portable_data_file())
        } else {
            self.locations.data_file_path()
        }
    }

    /// Persists the tree. In portable mode the running directory is written
    /// back as `AppPath`; the in-memory tree keeps absolute paths.
    pub fn save(&mut self) -> Result<PathBuf> {
        let target = self.save_target()?;
        if self.prefs.portable_mode {
            let mut portable_copy = self.prefs.clone();
            portable::collapse_tree(&mut portable_copy, &self.locations.startup_dir_text());
            save(&target, &portable_copy)?;
        } else {
            save(&target, &self.prefs)?;
        }
        info!(path = %target.display(), portable = self.prefs.portable_mode, "preferences saved");
        self.data_file = target.clone();
        self.emit(StoreEvent::Saved {
            path: target.clone(),
        });
        Ok(target)
    }

    pub fn generate_unique_signature(&self) -> String {
        identity::generate_unique_signature(&self.prefs)
    }

    /// Appends the categories of another data file. Returns whether any
    /// category was merged. The current tree is untouched when the file
    /// cannot be read.
    pub fn import(&mut self, path: &Path, mode: ImportMode) -> Result<bool> {
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }
        let mut imported = read_preferences(path)?;
        portable::expand_categories(&mut imported.categories, &self.locations.startup_dir_text());

        let count = imported.categories.len();
        let first_imported = self.prefs.categories.len();
        self.prefs.categories.append(&mut imported.categories);

        let start = match mode {
            ImportMode::RekeyAll => 0,
            ImportMode::RekeyImported => first_imported,
        };
        for index in start..self.prefs.categories.len() {
            for game_index in 0..self.prefs.categories[index].games.len() {
                let signature = identity::generate_unique_signature(&self.prefs);
                self.prefs.categories[index].games[game_index].signature = signature;
            }
            let signature = identity::generate_unique_signature(&self.prefs);
            self.prefs.categories[index].signature = signature;
        }

        info!(path = %path.display(), categories = count, ?mode, "import finished");
        self.emit(StoreEvent::Imported { categories: count });
        Ok(count > 0)
    }

    pub fn add_category(&mut self, title: &str) -> Result<String> {
        if is_blank(title) {
            return Err(Error::InvalidCategory);
        }
        let signature = self.generate_unique_signature();
        self.prefs
            .categories
            .push(Category::new(title.trim(), &signature));
        self.emit(StoreEvent::CategoryAdded {
            signature: signature.clone(),
        });
        Ok(signature)
    }

    pub fn rename_category(&mut self, signature: &str, title: &str) -> Result<()> {
        if is_blank(title) {
            return Err(Error::InvalidCategory);
        }
        let category = self
            .prefs
            .category_mut(signature)
            .ok_or_else(|| Error::UnknownCategory(signature.to_string()))?;
        category.title = title.trim().to_string();
        self.emit(StoreEvent::CategoryRenamed {
            signature: signature.to_string(),
        });
        Ok(())
    }

    pub fn remove_category(&mut self, signature: &str) -> Result<Category> {
        let index = self
            .prefs
            .categories
            .iter()
            .position(|category| category.signature == signature)
            .ok_or_else(|| Error::UnknownCategory(signature.to_string()))?;
        let removed = self.prefs.categories.remove(index);
        self.emit(StoreEvent::CategoryRemoved {
            signature: signature.to_string(),
        });
        Ok(removed)
    }

    pub fn move_category_up(&mut self, signature: &str) -> Result<()> {
        let index = self.category_index(signature)?;
        if index > 0 {
            self.prefs.categories.swap(index, index - 1);
        }
        self.emit(StoreEvent::CategoryMoved {
            signature: signature.to_string(),
        });
        Ok(())
    }

    pub fn move_category_down(&mut self, signature: &str) -> Result<()> {
        let index = self.category_index(signature)?;
        if index + 1 < self.prefs.categories.len() {
            self.prefs.categories.swap(index, index + 1);
        }
        self.emit(StoreEvent::CategoryMoved {
            signature: signature.to_string(),
        });
        Ok(())
    }

    fn category_index(&self, signature: &str) -> Result<usize> {
        self.prefs
            .categories
            .iter()
            .position(|category| category.signature == signature)
            .ok_or_else(|| Error::UnknownCategory(signature.to_string()))
    }

    /// Adds `game` to a category under a freshly generated signature.
    pub fn add_game(&mut self, category_signature: &str, mut game: Game) -> Result<String> {
        game.validate()?;
        if self.prefs.find_category_by_signature(category_signature).is_none() {
            return Err(Error::UnknownCategory(category_signature.to_string()));
        }
        let signature = self.generate_unique_signature();
        game.signature = signature.clone();
        if let Some(category) = self.prefs.category_mut(category_signature) {
            category.games.push(game);
        }
        self.emit(StoreEvent::GameAdded {
            signature: signature.clone(),
            category: category_signature.to_string(),
        });
        Ok(signature)
    }

    /// Applies `edit` to a copy of the game and keeps it only if it still
    /// validates. The signature cannot be changed this way.
    pub fn update_game(&mut self, signature: &str, edit: impl FnOnce(&mut Game)) -> Result<()> {
        let current = self
            .prefs
            .game_mut(signature)
            .ok_or_else(|| Error::UnknownGame(signature.to_string()))?;
        let mut edited = current.clone();
        edit(&mut edited);
        edited.signature = current.signature.clone();
        edited.validate()?;
        *current = edited;
        self.emit(StoreEvent::GameUpdated {
            signature: signature.to_string(),
        });
        Ok(())
    }

    pub fn move_game_up(&mut self, signature: &str) -> Result<()> {
        let (category, index) = self.game_position(signature)?;
        self.prefs.categories[category].move_up(index);
        self.emit(StoreEvent::GameMoved {
            signature: signature.to_string(),
        });
        Ok(())
    }

    pub fn move_game_down(&mut self, signature: &str) -> Result<()> {
        let (category, index) = self.game_position(signature)?;
        self.prefs.categories[category].move_down(index);
        self.emit(StoreEvent::GameMoved {
            signature: signature.to_string(),
        });
        Ok(())
    }

    fn game_position(&self, signature: &str) -> Result<(usize, usize)> {
        self.prefs
            .categories
            .iter()
            .enumerate()
            .find_map(|(category, entry)| {
                entry
                    .games
                    .iter()
                    .position(|game| game.signature == signature)
                    .map(|index| (category, index))
            })
            .ok_or_else(|| Error::UnknownGame(signature.to_string()))
    }

    pub fn remove_game(&mut self, signature: &str) -> Result<Game> {
        let removed = self
            .prefs
            .categories
            .iter_mut()
            .find_map(|category| {
                let index = category
                    .games
                    .iter()
                    .position(|game| game.signature == signature)?;
                Some(category.games.remove(index))
            })
            .ok_or_else(|| Error::UnknownGame(signature.to_string()))?;
        self.emit(StoreEvent::GameRemoved {
            signature: signature.to_string(),
        });
        Ok(removed)
    }
}

// A forced refresh that finds nothing keeps a path that still exists.
fn replace_path(slot: &mut String, found: String) -> bool {
    if found.is_empty() && Path::new(slot.as_str()).is_file() {
        return false;
    }
    let changed = *slot != found;
    *slot = found;
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::test_locations, finder::NoPrompt};
    use std::{cell::RefCell, collections::HashSet, rc::Rc};
    use tempfile::TempDir;

    fn game(name: &str, exe: &str) -> Game {
        Game {
            dos_exe_path: exe.to_string(),
            ..Game::named(name)
        }
    }

    fn all_signatures(prefs: &Preferences) -> Vec<String> {
        prefs
            .categories
            .iter()
            .map(|category| category.signature.clone())
            .chain(prefs.games().map(|game| game.signature.clone()))
            .collect()
    }

    fn assert_unique(prefs: &Preferences) {
        let signatures = all_signatures(prefs);
        let distinct: HashSet<&String> = signatures.iter().collect();
        assert_eq!(distinct.len(), signatures.len(), "duplicate in {signatures:?}");
    }

    fn store_in(temp: &TempDir) -> PreferencesStore {
        let locations = test_locations(temp.path());
        PreferencesStore::open(locations).unwrap()
    }

    #[test]
    fn missing_file_loads_defaults() {
        let temp = TempDir::new().unwrap();
        let prefs = load(&temp.path().join("nope.xml")).unwrap();
        assert_eq!(prefs, Preferences::default());
        assert!(prefs.games_use_dosbox);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("broken.xml");
        fs::write(&path, "<Preferences><Category Signature=\"1\"><Title>Oops").unwrap();
        assert!(matches!(load(&path), Err(Error::Deserialize { .. })));
    }

    #[test]
    fn round_trip_keeps_every_field() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("AmpShell.xml");
        let mut prefs = Preferences {
            dosbox_path: "/usr/bin/dosbox".to_string(),
            dosbox_default_conf_path: "/home/me/.dosbox/dosbox-0.74.conf".to_string(),
            config_editor_args: "--new-window".to_string(),
            games_in_fullscreen: true,
            games_use_dosbox: false,
            cds_default_dir: "/media/cdrom".to_string(),
            ..Preferences::default()
        };
        let mut action = Category::new("Action & Arcade", "42");
        action.games.push(Game {
            signature: "43".to_string(),
            release_date: time::macros::date!(1993 - 12 - 10),
            directory: "/games/doom".to_string(),
            cd_path: "/games/doom/doom.iso".to_string(),
            cd_label: "DOOM".to_string(),
            cd_is_an_image: true,
            additional_commands: "-c \"mount d /cd\" -c \"echo <ok>\"".to_string(),
            uses_dosbox: false,
            quit_on_exit: true,
            use_ioctl: true,
            notes: "Shareware episode".to_string(),
            ..Game::named("Doom")
        });
        action.games.push(Game {
            signature: "44".to_string(),
            ..game("Wolfenstein 3D", "/games/wolf3d/WOLF3D.EXE")
        });
        prefs.categories.push(action);
        prefs.categories.push(Category::new("Empty", "45"));

        save(&path, &prefs).unwrap();
        let loaded = load(&path).unwrap();
        assert_eq!(loaded, prefs);
    }

    #[test]
    fn edge_whitespace_survives_a_round_trip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("AmpShell.xml");
        let mut prefs = Preferences {
            config_editor_args: " --new-window ".to_string(),
            ..Preferences::default()
        };
        let mut category = Category::new("  Padded title", "1");
        category.games.push(Game {
            signature: "2".to_string(),
            notes: "  indented\n".to_string(),
            additional_commands: "mount d /cd\nd:\n".to_string(),
            cd_label: "   ".to_string(),
            ..game("Keen", "/keen/KEEN.EXE")
        });
        prefs.categories.push(category);

        save(&path, &prefs).unwrap();
        assert_eq!(load(&path).unwrap(), prefs);
    }

    #[test]
    fn portable_save_reloads_under_a_new_directory() {
        let temp = TempDir::new().unwrap();
        let mut store = store_in(&temp);
        let app_dir = store.locations().startup_dir_text();
        store.preferences_mut().portable_mode = true;
        store.preferences_mut().dosbox_path = format!("{app_dir}/dosbox");
        let category = store.add_category("Strategy").unwrap();
        let sig = store
            .add_game(&category, game("Dune II", &format!("{app_dir}/games/dune2/DUNE2.EXE")))
            .unwrap();

        let target = store.save().unwrap();
        assert_eq!(target, store.locations().portable_data_file());
        let raw = fs::read_to_string(&target).unwrap();
        assert!(raw.contains("AppPath/games/dune2/DUNE2.EXE"));
        assert!(!raw.contains(&app_dir));
        // the in-memory tree keeps absolute paths
        assert_eq!(store.preferences().dosbox_path, format!("{app_dir}/dosbox"));

        let moved = temp.path().join("moved");
        fs::create_dir_all(&moved).unwrap();
        let moved_file = moved.join("AmpShell.xml");
        fs::rename(&target, &moved_file).unwrap();
        let mut locations = store.locations().clone();
        locations.startup_dir = moved.clone();
        let reopened = PreferencesStore::open(locations).unwrap();
        assert_eq!(reopened.data_file(), moved_file.as_path());

        let moved_text = moved.to_string_lossy();
        let prefs = reopened.preferences();
        assert_eq!(prefs.dosbox_path, format!("{moved_text}/dosbox"));
        assert_eq!(
            prefs.find_game_by_signature(&sig).unwrap().dos_exe_path,
            format!("{moved_text}/games/dune2/DUNE2.EXE")
        );
    }

    #[test]
    fn portable_load_save_load_is_stable() {
        let temp = TempDir::new().unwrap();
        let locations = test_locations(temp.path());
        let portable_file = locations.portable_data_file();
        let mut prefs = Preferences {
            portable_mode: true,
            dosbox_path: "AppPath/dosbox".to_string(),
            ..Preferences::default()
        };
        let mut category = Category::new("Adventure", "1");
        category.games.push(Game {
            signature: "2".to_string(),
            additional_commands: "-c \"mount d AppPath/cds\"".to_string(),
            ..game("Loom", "AppPath/loom/LOOM.EXE")
        });
        prefs.categories.push(category);
        save(&portable_file, &prefs).unwrap();

        let mut store = PreferencesStore::open(locations.clone()).unwrap();
        let first = store.preferences().clone();
        store.save().unwrap();
        assert_eq!(load(&portable_file).unwrap(), prefs);
        let reopened = PreferencesStore::open(locations).unwrap();
        assert_eq!(reopened.preferences(), &first);
    }

    #[test]
    fn non_portable_save_goes_to_the_user_file() {
        let temp = TempDir::new().unwrap();
        let mut store = store_in(&temp);
        store.add_category("Sports").unwrap();
        let target = store.save().unwrap();
        assert_eq!(target, store.locations().user_data_file());
        assert!(target.is_file());
    }

    #[test]
    fn import_merges_and_rekeys_everything() {
        let temp = TempDir::new().unwrap();
        let mut store = store_in(&temp);
        let existing = store.add_category("Mine").unwrap();
        let existing_game = store.add_game(&existing, game("Keen", "/keen/KEEN.EXE")).unwrap();

        let mut other = Preferences::default();
        let mut first = Category::new("Shooters", "1");
        for (index, name) in ["Doom", "Heretic", "Hexen"].iter().enumerate() {
            first.games.push(Game {
                signature: format!("{}", index + 2),
                ..game(name, "/x/GAME.EXE")
            });
        }
        let mut second = Category::new("Mine", "1");
        for name in ["Lemmings", "Tetris"] {
            second.games.push(Game {
                signature: "2".to_string(),
                ..game(name, "/y/GAME.EXE")
            });
        }
        other.categories.push(first);
        other.categories.push(second);
        let import_file = temp.path().join("import.xml");
        save(&import_file, &other).unwrap();

        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        store.subscribe(move |event| sink.borrow_mut().push(event.clone()));

        assert!(store.import(&import_file, ImportMode::RekeyAll).unwrap());
        let prefs = store.preferences();
        assert_eq!(prefs.categories.len(), 3);
        assert_eq!(prefs.game_count(), 6);
        assert_eq!(all_signatures(prefs).len(), 9);
        assert_unique(prefs);
        assert_eq!(prefs.categories[0].title, "Mine");
        assert_eq!(prefs.categories[2].title, "Mine");
        assert_eq!(prefs.categories[1].games[2].name, "Hexen");
        assert_eq!(
            events.borrow().as_slice(),
            &[StoreEvent::Imported { categories: 2 }]
        );
        assert_ne!(prefs.categories[0].signature, existing);
        assert_ne!(prefs.categories[0].games[0].signature, existing_game);
        assert!(prefs.find_game_by_name("keen").is_persisted());
    }

    #[test]
    fn import_can_keep_existing_signatures() {
        let temp = TempDir::new().unwrap();
        let mut store = store_in(&temp);
        let existing = store.add_category("Mine").unwrap();
        let existing_game = store.add_game(&existing, game("Keen", "/keen/KEEN.EXE")).unwrap();

        let mut other = Preferences::default();
        let mut category = Category::new("Theirs", &existing);
        category.games.push(Game {
            signature: existing_game.clone(),
            ..game("Commander Keen", "/k/KEEN.EXE")
        });
        other.categories.push(category);
        let import_file = temp.path().join("import.xml");
        save(&import_file, &other).unwrap();

        assert!(store.import(&import_file, ImportMode::RekeyImported).unwrap());
        let prefs = store.preferences();
        assert_eq!(prefs.categories[0].signature, existing);
        assert_eq!(prefs.categories[0].games[0].signature, existing_game);
        assert_unique(prefs);
    }

    #[test]
    fn import_failures_leave_the_tree_alone() {
        let temp = TempDir::new().unwrap();
        let mut store = store_in(&temp);
        store.add_category("Mine").unwrap();
        let before = store.preferences().clone();

        let missing = temp.path().join("missing.xml");
        assert!(matches!(
            store.import(&missing, ImportMode::RekeyAll),
            Err(Error::FileNotFound(path)) if path == missing
        ));

        let broken = temp.path().join("broken.xml");
        fs::write(&broken, "<Preferences><Category>").unwrap();
        assert!(matches!(
            store.import(&broken, ImportMode::RekeyAll),
            Err(Error::Deserialize { .. })
        ));
        assert_eq!(store.preferences(), &before);

        let empty = temp.path().join("empty.xml");
        save(&empty, &Preferences::default()).unwrap();
        assert!(!store.import(&empty, ImportMode::RekeyAll).unwrap());
    }

    #[test]
    fn tree_edits_keep_signatures_unique_and_notify() {
        let temp = TempDir::new().unwrap();
        let mut store = store_in(&temp);
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        store.subscribe(move |event| sink.borrow_mut().push(event.clone()));

        let racing = store.add_category("Racing").unwrap();
        let arcade = store.add_category("Arcade").unwrap();
        let mut games = Vec::new();
        for index in 0..20 {
            let category = if index % 2 == 0 { &racing } else { &arcade };
            games.push(
                store
                    .add_game(category, game(&format!("Game {index}"), "/g/G.EXE"))
                    .unwrap(),
            );
        }
        assert_unique(store.preferences());

        store.rename_category(&arcade, " Arcade Classics ").unwrap();
        store.move_category_up(&arcade).unwrap();
        assert_eq!(store.preferences().categories[0].title, "Arcade Classics");

        store
            .update_game(&games[0], |game| {
                game.name = "Stunts".to_string();
                game.signature = "hijacked".to_string();
            })
            .unwrap();
        let updated = store.preferences().find_game_by_signature(&games[0]).unwrap();
        assert_eq!(updated.name, "Stunts");

        let rejected = store.update_game(&games[0], |game| game.name.clear());
        assert!(matches!(rejected, Err(Error::InvalidGame(_))));
        assert_eq!(
            store.preferences().find_game_by_signature(&games[0]).unwrap().name,
            "Stunts"
        );

        store.move_game_down(&games[0]).unwrap();
        let racing_games = &store.preferences().categories[1].games;
        assert_eq!(racing_games[1].name, "Stunts");
        store.move_game_up(&games[0]).unwrap();
        store.move_game_up(&games[0]).unwrap();
        assert_eq!(store.preferences().categories[1].games[0].name, "Stunts");

        let removed = store.remove_game(&games[1]).unwrap();
        assert_eq!(removed.name, "Game 1");
        assert!(matches!(store.remove_game(&games[1]), Err(Error::UnknownGame(_))));
        let removed = store.remove_category(&racing).unwrap();
        assert_eq!(removed.games.len(), 10);
        assert_eq!(store.preferences().game_count(), 9);

        let events = events.borrow();
        assert_eq!(events[0], StoreEvent::CategoryAdded { signature: racing.clone() });
        assert!(events.contains(&StoreEvent::GameRemoved {
            signature: games[1].clone()
        }));
        assert_eq!(
            events.last(),
            Some(&StoreEvent::CategoryRemoved { signature: racing })
        );
    }

    #[test]
    fn invalid_additions_are_rejected() {
        let temp = TempDir::new().unwrap();
        let mut store = store_in(&temp);
        assert!(matches!(store.add_category("  "), Err(Error::InvalidCategory)));
        let category = store.add_category("Misc").unwrap();
        assert!(matches!(
            store.add_game(&category, Game::named("No location")),
            Err(Error::InvalidGame(_))
        ));
        assert!(matches!(
            store.add_game("nope", game("Lost", "/l/L.EXE")),
            Err(Error::UnknownCategory(_))
        ));
    }

    #[test]
    fn auto_config_fills_only_stale_paths() {
        let temp = TempDir::new().unwrap();
        let mut store = store_in(&temp);
        let exe = temp
            .path()
            .join("programs")
            .join("DOSBox-0.74")
            .join(finder::DOSBOX_EXECUTABLE);
        fs::create_dir_all(exe.parent().unwrap()).unwrap();
        fs::write(&exe, b"").unwrap();
        let lang = exe.with_file_name("german.lng");
        fs::write(&lang, b"").unwrap();

        let report = store.run_auto_config(&mut NoPrompt).unwrap();
        assert!(report.dosbox);
        assert!(report.dosbox_lang);
        assert!(!report.config_editor);
        let prefs = store.preferences();
        assert_eq!(prefs.dosbox_path, exe.to_string_lossy());
        assert_eq!(prefs.dosbox_default_lang_path, lang.to_string_lossy());
        assert_eq!(prefs.dosbox_default_conf_path, "");

        let again = store.run_auto_config(&mut NoPrompt).unwrap();
        assert!(!again.changed());
    }
}
