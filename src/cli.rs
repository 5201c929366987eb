use crate::{
    commands,
    config::Locations,
    error::Error,
    finder::{DosboxPrompt, NoPrompt, PromptAnswer},
    model::{format_release_date, parse_release_date, Game, Preferences},
    store::{ImportMode, PreferencesStore},
};
use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::{
    fs,
    io::{self, IsTerminal, Write},
    path::{Path, PathBuf},
    sync::Mutex,
};
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "ampshell", version)]
#[command(about = "Catalog DOS games and their DOSBox launch settings", long_about = None)]
struct Cli {
    /// Directory treated as the application's own (AppPath in portable data files)
    #[arg(long, value_name = "DIR", global = true)]
    app_dir: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value = "text", global = true)]
    format: OutputFormat,

    /// Never ask for DOSBox's location
    #[arg(long, global = true)]
    no_prompt: bool,

    /// Mirror log output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// List categories and their games
    List,
    /// Show DOSBox, config, language file and editor locations
    Paths {
        /// Search for every tool again, even ones that still exist
        #[arg(long)]
        refresh: bool,
    },
    /// Manage categories
    Category {
        #[command(subcommand)]
        action: CategoryAction,
    },
    /// Manage games
    Game {
        #[command(subcommand)]
        action: GameAction,
    },
    /// Merge the categories of another AmpShell.xml
    Import {
        #[arg(value_name = "FILE")]
        path: PathBuf,
        /// Only re-sign the imported entries
        #[arg(long)]
        keep_signatures: bool,
    },
    /// Change global preferences
    Set(SetArgs),
    /// Convert additional DOSBox commands between their two forms
    Commands {
        #[command(subcommand)]
        action: CommandsAction,
    },
}

#[derive(Subcommand)]
enum CategoryAction {
    Add {
        title: String,
    },
    Rename {
        category: String,
        title: String,
    },
    Remove {
        category: String,
    },
    Move {
        category: String,
        #[arg(value_enum)]
        direction: Direction,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Direction {
    Up,
    Down,
}

#[derive(Subcommand)]
enum GameAction {
    /// Add a game to a category (signature or title)
    Add {
        category: String,
        #[command(flatten)]
        fields: GameFields,
    },
    Edit {
        signature: String,
        #[command(flatten)]
        fields: GameFields,
    },
    Remove {
        signature: String,
    },
    /// Move a game within its category
    Move {
        signature: String,
        #[arg(value_enum)]
        direction: Direction,
    },
    Show {
        signature: String,
    },
    /// Look a game up by name or by main executable
    Find {
        #[arg(long, conflicts_with = "exe", required_unless_present = "exe")]
        name: Option<String>,
        #[arg(long, value_name = "PATH")]
        exe: Option<String>,
    },
}

#[derive(Subcommand)]
enum CommandsAction {
    /// `-c "..."` switches to one command per line
    ToLines {
        #[arg(allow_hyphen_values = true)]
        text: String,
    },
    /// One command per line to `-c "..."` switches
    ToFlags {
        #[arg(allow_hyphen_values = true)]
        text: String,
    },
}

#[derive(Args, Default)]
struct GameFields {
    #[arg(long)]
    name: Option<String>,
    /// Main executable
    #[arg(long, value_name = "PATH")]
    exe: Option<String>,
    /// Directory mounted as C:
    #[arg(long, value_name = "DIR")]
    dir: Option<String>,
    /// CD image or CD directory
    #[arg(long, value_name = "PATH")]
    cd: Option<String>,
    #[arg(long)]
    cd_label: Option<String>,
    #[arg(long, value_name = "PATH")]
    setup: Option<String>,
    /// Custom DOSBox configuration file
    #[arg(long, value_name = "PATH")]
    conf: Option<String>,
    /// Alternate DOSBox executable
    #[arg(long, value_name = "PATH")]
    dosbox: Option<String>,
    /// Additional DOSBox commands, one per line or as `-c "..."` switches
    #[arg(long, allow_hyphen_values = true)]
    commands: Option<String>,
    #[arg(long, value_name = "PATH")]
    icon: Option<String>,
    #[arg(long, value_name = "YYYY-MM-DD")]
    release_date: Option<String>,
    #[arg(long, value_name = "DIR")]
    working_dir: Option<String>,
    #[arg(long)]
    notes: Option<String>,
    #[arg(long, value_name = "BOOL")]
    uses_dosbox: Option<bool>,
    #[arg(long, value_name = "BOOL")]
    no_config: Option<bool>,
    #[arg(long, value_name = "BOOL")]
    no_console: Option<bool>,
    #[arg(long, value_name = "BOOL")]
    fullscreen: Option<bool>,
    #[arg(long, value_name = "BOOL")]
    quit_on_exit: Option<bool>,
    #[arg(long, value_name = "BOOL")]
    ioctl: Option<bool>,
    #[arg(long, value_name = "BOOL")]
    floppy: Option<bool>,
}

impl GameFields {
    fn apply(self, game: &mut Game) -> Result<()> {
        let text_fields = [
            (self.name, &mut game.name),
            (self.exe, &mut game.dos_exe_path),
            (self.dir, &mut game.directory),
            (self.cd, &mut game.cd_path),
            (self.cd_label, &mut game.cd_label),
            (self.setup, &mut game.setup_exe_path),
            (self.conf, &mut game.dosbox_conf_path),
            (self.dosbox, &mut game.alternate_dosbox_exe_path),
            (self.icon, &mut game.icon),
            (self.working_dir, &mut game.dosbox_working_directory),
            (self.notes, &mut game.notes),
        ];
        for (value, slot) in text_fields {
            if let Some(value) = value {
                *slot = value;
            }
        }

        let flags = [
            (self.uses_dosbox, &mut game.uses_dosbox),
            (self.no_config, &mut game.no_config),
            (self.no_console, &mut game.no_console),
            (self.fullscreen, &mut game.in_fullscreen),
            (self.quit_on_exit, &mut game.quit_on_exit),
            (self.ioctl, &mut game.use_ioctl),
            (self.floppy, &mut game.mount_as_floppy),
        ];
        for (value, slot) in flags {
            if let Some(value) = value {
                *slot = value;
            }
        }

        if let Some(commands) = self.commands {
            game.additional_commands = if commands.trim_start().starts_with(commands::COMMAND_FLAG) {
                commands::to_multiline(&commands)
            } else {
                commands
            };
        }
        if let Some(raw) = self.release_date {
            game.release_date = match parse_release_date(&raw) {
                Some(date) => date,
                None => bail!("invalid release date {raw:?}, expected YYYY-MM-DD"),
            };
        }
        game.refresh_cd_is_image();
        Ok(())
    }
}

#[derive(Args)]
struct SetArgs {
    #[arg(long, value_name = "PATH")]
    dosbox: Option<String>,
    #[arg(long, value_name = "PATH")]
    dosbox_conf: Option<String>,
    #[arg(long, value_name = "PATH")]
    dosbox_lang: Option<String>,
    #[arg(long, value_name = "PATH")]
    editor: Option<String>,
    #[arg(long, allow_hyphen_values = true)]
    editor_args: Option<String>,
    #[arg(long, value_name = "DIR")]
    games_dir: Option<String>,
    #[arg(long, value_name = "DIR")]
    cds_dir: Option<String>,
    #[arg(long, value_name = "BOOL")]
    portable: Option<bool>,
    #[arg(long, value_name = "BOOL")]
    use_dosbox: Option<bool>,
    #[arg(long, value_name = "BOOL")]
    no_console: Option<bool>,
    #[arg(long, value_name = "BOOL")]
    fullscreen: Option<bool>,
    #[arg(long, value_name = "BOOL")]
    quit_on_exit: Option<bool>,
}

impl SetArgs {
    fn apply(self, prefs: &mut Preferences) {
        let text_fields = [
            (self.dosbox, &mut prefs.dosbox_path),
            (self.dosbox_conf, &mut prefs.dosbox_default_conf_path),
            (self.dosbox_lang, &mut prefs.dosbox_default_lang_path),
            (self.editor, &mut prefs.config_editor_path),
            (self.editor_args, &mut prefs.config_editor_args),
            (self.games_dir, &mut prefs.games_default_dir),
            (self.cds_dir, &mut prefs.cds_default_dir),
        ];
        for (value, slot) in text_fields {
            if let Some(value) = value {
                *slot = value;
            }
        }
        let flags = [
            (self.portable, &mut prefs.portable_mode),
            (self.use_dosbox, &mut prefs.games_use_dosbox),
            (self.no_console, &mut prefs.games_no_console),
            (self.fullscreen, &mut prefs.games_in_fullscreen),
            (self.quit_on_exit, &mut prefs.games_quit_on_exit),
        ];
        for (value, slot) in flags {
            if let Some(value) = value {
                *slot = value;
            }
        }
    }
}

/// Reads a path from the terminal when DOSBox cannot be found.
struct StdinPrompt;

impl DosboxPrompt for StdinPrompt {
    fn ask_for_dosbox(&mut self, initial_dir: &Path) -> PromptAnswer {
        eprintln!("AmpShell cannot find DOSBox (looked under {}).", initial_dir.display());
        eprint!("DOSBox executable location (empty to skip, q to quit): ");
        let _ = io::stderr().flush();
        let mut line = String::new();
        if io::stdin().read_line(&mut line).is_err() {
            return PromptAnswer::Skipped;
        }
        match line.trim() {
            "" => PromptAnswer::Skipped,
            "q" | "Q" => PromptAnswer::Cancelled,
            path => PromptAnswer::Picked(PathBuf::from(path)),
        }
    }
}

pub fn run() -> Result<()> {
    let Cli {
        app_dir,
        format,
        no_prompt,
        verbose,
        command,
    } = Cli::parse();
    let command = match command {
        Command::Commands { action } => return run_codec(action),
        other => other,
    };

    let locations = Locations::detect(app_dir.as_deref()).context("resolve locations")?;
    init_logging(&locations, verbose);

    let mut store = PreferencesStore::open(locations).context("load preferences")?;
    store.subscribe(|event| debug!(?event, "store event"));
    let mut prompt: Box<dyn DosboxPrompt> = if no_prompt || !io::stdin().is_terminal() {
        Box::new(NoPrompt)
    } else {
        Box::new(StdinPrompt)
    };
    store.run_auto_config(prompt.as_mut())?;

    match command {
        Command::List => print_tree(store.preferences(), format),
        Command::Paths { refresh } => {
            if refresh {
                let report = store.refresh_tool_paths(prompt.as_mut())?;
                if report.changed() {
                    save(&mut store)?;
                }
            }
            print_paths(&store, format)
        }
        Command::Category { action } => run_category(&mut store, action, format),
        Command::Game { action } => run_game(&mut store, action, format),
        Command::Import {
            path,
            keep_signatures,
        } => {
            let mode = if keep_signatures {
                ImportMode::RekeyImported
            } else {
                ImportMode::RekeyAll
            };
            let merged = store
                .import(&path, mode)
                .with_context(|| format!("import {}", path.display()))?;
            if merged {
                save(&mut store)?;
                println!("Imported categories from {}", path.display());
            } else {
                println!("No categories in {}", path.display());
            }
            Ok(())
        }
        Command::Set(args) => {
            args.apply(store.preferences_mut());
            save(&mut store)?;
            print_paths(&store, format)
        }
        Command::Commands { .. } => Ok(()),
    }
}

fn init_logging(locations: &Locations, verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let log_file = fs::create_dir_all(&locations.user_data_dir)
        .and_then(|_| {
            fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(locations.log_path())
        })
        .ok();
    let file_layer = log_file.map(|file| {
        fmt::layer()
            .with_writer(Mutex::new(file))
            .with_ansi(false)
    });
    let stderr_layer = verbose.then(|| fmt::layer().with_writer(io::stderr));
    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .init();
}

fn save(store: &mut PreferencesStore) -> Result<()> {
    let path = store.save().context("save preferences")?;
    info!(path = %path.display(), "saved");
    Ok(())
}

fn run_codec(action: CommandsAction) -> Result<()> {
    match action {
        CommandsAction::ToLines { text } => println!("{}", commands::to_multiline(&text)),
        CommandsAction::ToFlags { text } => println!("{}", commands::to_single_line(&text)),
    }
    Ok(())
}

fn run_category(store: &mut PreferencesStore, action: CategoryAction, format: OutputFormat) -> Result<()> {
    match action {
        CategoryAction::Add { title } => {
            let signature = store.add_category(&title)?;
            save(store)?;
            print_signature(&signature, format)
        }
        CategoryAction::Rename { category, title } => {
            let signature = resolve_category(store.preferences(), &category)?;
            store.rename_category(&signature, &title)?;
            save(store)
        }
        CategoryAction::Remove { category } => {
            let signature = resolve_category(store.preferences(), &category)?;
            let removed = store.remove_category(&signature)?;
            save(store)?;
            println!(
                "Removed category {} ({} game(s))",
                removed.title,
                removed.games.len()
            );
            Ok(())
        }
        CategoryAction::Move {
            category,
            direction,
        } => {
            let signature = resolve_category(store.preferences(), &category)?;
            match direction {
                Direction::Up => store.move_category_up(&signature)?,
                Direction::Down => store.move_category_down(&signature)?,
            }
            save(store)
        }
    }
}

fn run_game(store: &mut PreferencesStore, action: GameAction, format: OutputFormat) -> Result<()> {
    match action {
        GameAction::Add { category, fields } => {
            let category = resolve_category(store.preferences(), &category)?;
            let mut game = Game::default();
            fields.apply(&mut game)?;
            let signature = store.add_game(&category, game)?;
            save(store)?;
            print_signature(&signature, format)
        }
        GameAction::Edit { signature, fields } => {
            // Parse errors surface before the store is touched.
            let mut staged = store
                .preferences()
                .find_game_by_signature(&signature)
                .cloned()
                .ok_or_else(|| Error::UnknownGame(signature.clone()))?;
            fields.apply(&mut staged)?;
            store.update_game(&signature, |game| *game = staged)?;
            save(store)
        }
        GameAction::Remove { signature } => {
            let removed = store.remove_game(&signature)?;
            save(store)?;
            println!("Removed game {}", removed.name);
            Ok(())
        }
        GameAction::Move {
            signature,
            direction,
        } => {
            match direction {
                Direction::Up => store.move_game_up(&signature)?,
                Direction::Down => store.move_game_down(&signature)?,
            }
            save(store)
        }
        GameAction::Show { signature } => {
            let prefs = store.preferences();
            let game = prefs
                .find_game_by_signature(&signature)
                .ok_or_else(|| Error::UnknownGame(signature.clone()))?;
            print_game(game, prefs, store.locations(), format)
        }
        GameAction::Find { name, exe } => {
            let prefs = store.preferences();
            let found = match (name, exe) {
                (Some(name), _) => prefs.find_game_by_name(&name),
                (None, Some(exe)) => prefs.find_game_by_executable_path(&exe),
                (None, None) => bail!("--name or --exe is required"),
            };
            if !found.is_persisted() {
                warn!("game lookup found nothing");
                println!("No matching game in the library");
                return Ok(());
            }
            print_game(&found, prefs, store.locations(), format)
        }
    }
}

/// Accepts a category signature, or failing that a title (case-insensitive).
fn resolve_category(prefs: &Preferences, key: &str) -> Result<String> {
    if let Some(category) = prefs.find_category_by_signature(key) {
        return Ok(category.signature.clone());
    }
    let wanted = key.trim().to_uppercase();
    prefs
        .categories
        .iter()
        .find(|category| category.title.trim().to_uppercase() == wanted)
        .map(|category| category.signature.clone())
        .ok_or_else(|| Error::UnknownCategory(key.to_string()).into())
}

#[derive(Serialize)]
struct CategoryView<'a> {
    signature: &'a str,
    title: &'a str,
    games: Vec<GameSummary<'a>>,
}

#[derive(Serialize)]
struct GameSummary<'a> {
    signature: &'a str,
    name: &'a str,
    executable: &'a str,
}

#[derive(Serialize)]
struct GameDetail<'a> {
    signature: &'a str,
    name: &'a str,
    category: Option<&'a str>,
    release_date: String,
    executable: &'a str,
    directory: &'a str,
    cd_path: &'a str,
    cd_label: &'a str,
    cd_is_an_image: bool,
    setup: &'a str,
    dosbox_conf: &'a str,
    alternate_dosbox: &'a str,
    additional_commands: &'a str,
    icon: &'a str,
    uses_dosbox: bool,
    no_config: bool,
    no_console: bool,
    fullscreen: bool,
    quit_on_exit: bool,
    use_ioctl: bool,
    mount_as_floppy: bool,
    working_directory: &'a str,
    notes: &'a str,
    effective_dosbox: &'a str,
    dosbox_x: bool,
    game_folder: Option<String>,
    browse_from: String,
    effective_working_directory: String,
    dosbox_switches: String,
}

#[derive(Serialize)]
struct PathsView<'a> {
    data_file: String,
    portable_mode: bool,
    dosbox: &'a str,
    dosbox_conf: &'a str,
    dosbox_lang: &'a str,
    config_editor: &'a str,
    config_editor_command: String,
    config_editor_args: &'a str,
}

#[derive(Serialize)]
struct SignatureView<'a> {
    signature: &'a str,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let raw = serde_json::to_string_pretty(value).context("serialize output")?;
    println!("{raw}");
    Ok(())
}

fn print_signature(signature: &str, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(&SignatureView { signature }),
        OutputFormat::Text => {
            println!("{signature}");
            Ok(())
        }
    }
}

fn print_tree(prefs: &Preferences, format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        let view: Vec<CategoryView> = prefs
            .categories
            .iter()
            .map(|category| CategoryView {
                signature: &category.signature,
                title: &category.title,
                games: category
                    .games
                    .iter()
                    .map(|game| GameSummary {
                        signature: &game.signature,
                        name: &game.name,
                        executable: &game.dos_exe_path,
                    })
                    .collect(),
            })
            .collect();
        return print_json(&view);
    }

    if prefs.categories.is_empty() {
        println!("No categories yet");
        return Ok(());
    }
    for category in &prefs.categories {
        println!(
            "[{}] {} ({} game(s))",
            category.signature,
            category.title,
            category.games.len()
        );
        for game in &category.games {
            let location = if game.dos_exe_path.is_empty() {
                &game.directory
            } else {
                &game.dos_exe_path
            };
            println!("    [{}] {}  {}", game.signature, game.name, location);
        }
    }
    Ok(())
}

fn print_game(game: &Game, prefs: &Preferences, locations: &Locations, format: OutputFormat) -> Result<()> {
    let startup = locations.startup_dir_text();
    let detail = GameDetail {
        signature: &game.signature,
        name: &game.name,
        category: prefs
            .category_of_game(&game.signature)
            .map(|category| category.title.as_str()),
        release_date: format_release_date(game.release_date),
        executable: &game.dos_exe_path,
        directory: &game.directory,
        cd_path: &game.cd_path,
        cd_label: &game.cd_label,
        cd_is_an_image: game.cd_is_an_image,
        setup: &game.setup_exe_path,
        dosbox_conf: &game.dosbox_conf_path,
        alternate_dosbox: &game.alternate_dosbox_exe_path,
        additional_commands: &game.additional_commands,
        icon: &game.icon,
        uses_dosbox: game.uses_dosbox,
        no_config: game.no_config,
        no_console: game.no_console,
        fullscreen: game.in_fullscreen,
        quit_on_exit: game.quit_on_exit,
        use_ioctl: game.use_ioctl,
        mount_as_floppy: game.mount_as_floppy,
        working_directory: &game.dosbox_working_directory,
        notes: &game.notes,
        effective_dosbox: game.dosbox_path(prefs),
        dosbox_x: game.is_dosbox_x_used(prefs),
        game_folder: game.game_folder(),
        browse_from: game.file_dialog_initial_directory(prefs),
        effective_working_directory: game.dosbox_working_directory(prefs, &startup),
        dosbox_switches: commands::to_single_line(&game.additional_commands),
    };
    if format == OutputFormat::Json {
        return print_json(&detail);
    }

    println!("{} [{}]", detail.name, detail.signature);
    let rows = [
        ("Category", detail.category.unwrap_or_default()),
        ("Released", detail.release_date.as_str()),
        ("Executable", detail.executable),
        ("Mounted as C:", detail.directory),
        ("CD", detail.cd_path),
        ("CD label", detail.cd_label),
        ("Setup", detail.setup),
        ("DOSBox config", detail.dosbox_conf),
        ("DOSBox", detail.effective_dosbox),
        ("Working dir", detail.effective_working_directory.as_str()),
        ("Game folder", detail.game_folder.as_deref().unwrap_or_default()),
        ("Browse from", detail.browse_from.as_str()),
        ("Switches", detail.dosbox_switches.as_str()),
        ("Icon", detail.icon),
        ("Notes", detail.notes),
    ];
    for (label, value) in rows {
        if !value.is_empty() {
            println!("  {label:<14} {value}");
        }
    }
    let flags = [
        ("uses DOSBox", detail.uses_dosbox),
        ("no config", detail.no_config),
        ("no console", detail.no_console),
        ("fullscreen", detail.fullscreen),
        ("quit on exit", detail.quit_on_exit),
        ("IOCTL", detail.use_ioctl),
        ("floppy", detail.mount_as_floppy),
        ("CD image", detail.cd_is_an_image),
        ("DOSBox-X", detail.dosbox_x),
    ];
    let enabled: Vec<&str> = flags
        .iter()
        .filter(|(_, on)| *on)
        .map(|(label, _)| *label)
        .collect();
    if !enabled.is_empty() {
        println!("  {:<14} {}", "Flags", enabled.join(", "));
    }
    Ok(())
}

fn print_paths(store: &PreferencesStore, format: OutputFormat) -> Result<()> {
    let prefs = store.preferences();
    let view = PathsView {
        data_file: store.data_file().display().to_string(),
        portable_mode: prefs.portable_mode,
        dosbox: &prefs.dosbox_path,
        dosbox_conf: &prefs.dosbox_default_conf_path,
        dosbox_lang: &prefs.dosbox_default_lang_path,
        config_editor: &prefs.config_editor_path,
        config_editor_command: prefs.config_editor_command(store.locations().windows_dir.as_deref()),
        config_editor_args: &prefs.config_editor_args,
    };
    if format == OutputFormat::Json {
        return print_json(&view);
    }
    let missing = |value: &str| {
        if value.is_empty() {
            "(not found)".to_string()
        } else {
            value.to_string()
        }
    };
    println!("Data file       {}", view.data_file);
    println!("Portable mode   {}", view.portable_mode);
    println!("DOSBox          {}", missing(view.dosbox));
    println!("DOSBox config   {}", missing(view.dosbox_conf));
    println!("Language file   {}", missing(view.dosbox_lang));
    println!("Text editor     {}", missing(&view.config_editor_command));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn game_fields_only_touch_what_was_given() {
        let mut game = Game {
            name: "Doom".to_string(),
            directory: "/games/doom".to_string(),
            no_console: true,
            ..Game::default()
        };
        let fields = GameFields {
            exe: Some("/games/doom/DOOM.EXE".to_string()),
            fullscreen: Some(true),
            commands: Some(r#"-c "mount d /cd" -c "d:""#.to_string()),
            release_date: Some("1993-12-10".to_string()),
            ..GameFields::default()
        };
        fields.apply(&mut game).unwrap();
        assert_eq!(game.name, "Doom");
        assert_eq!(game.directory, "/games/doom");
        assert_eq!(game.dos_exe_path, "/games/doom/DOOM.EXE");
        assert!(game.no_console);
        assert!(game.in_fullscreen);
        assert_eq!(game.additional_commands, "mount d /cd\nd:");
        assert_eq!(format_release_date(game.release_date), "1993-12-10T00:00:00");
    }

    #[test]
    fn bad_release_date_is_rejected() {
        let fields = GameFields {
            release_date: Some("someday".to_string()),
            ..GameFields::default()
        };
        assert!(fields.apply(&mut Game::default()).is_err());
    }

    #[test]
    fn categories_resolve_by_signature_or_title() {
        let mut prefs = Preferences::default();
        prefs
            .categories
            .push(crate::model::Category::new("Role Playing", "314"));
        assert_eq!(resolve_category(&prefs, "314").unwrap(), "314");
        assert_eq!(resolve_category(&prefs, " role playing ").unwrap(), "314");
        assert!(resolve_category(&prefs, "Shooters").is_err());
    }

    #[test]
    fn cli_parses_game_add() {
        let cli = Cli::try_parse_from([
            "ampshell",
            "--no-prompt",
            "game",
            "add",
            "Action",
            "--name",
            "Doom",
            "--exe",
            "/games/doom/DOOM.EXE",
            "--quit-on-exit",
            "true",
        ])
        .unwrap();
        assert!(cli.no_prompt);
        match cli.command {
            Command::Game {
                action: GameAction::Add { category, fields },
            } => {
                assert_eq!(category, "Action");
                assert_eq!(fields.name.as_deref(), Some("Doom"));
                assert_eq!(fields.quit_on_exit, Some(true));
            }
            _ => panic!("expected game add"),
        }
    }
}
