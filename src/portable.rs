use crate::model::{Category, Game, Preferences};

/// Stands in for the application's own directory inside portable data files.
pub const APP_PATH_TOKEN: &str = "AppPath";

pub fn expand_token(text: &str, app_dir: &str) -> String {
    text.replace(APP_PATH_TOKEN, app_dir)
}

/// Replaces `app_dir` with the token wherever it is a whole path prefix.
pub fn collapse_dir(text: &str, app_dir: &str) -> String {
    if app_dir.is_empty() {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find(app_dir) {
        let after = &rest[pos + app_dir.len()..];
        out.push_str(&rest[..pos]);
        if ends_path_prefix(after) {
            out.push_str(APP_PATH_TOKEN);
        } else {
            out.push_str(app_dir);
        }
        rest = after;
    }
    out.push_str(rest);
    out
}

pub fn expand_tree(prefs: &mut Preferences, app_dir: &str) {
    rewrite_tree(prefs, |text| expand_token(text, app_dir));
}

pub fn collapse_tree(prefs: &mut Preferences, app_dir: &str) {
    rewrite_tree(prefs, |text| collapse_dir(text, app_dir));
}

pub fn expand_categories(categories: &mut [Category], app_dir: &str) {
    for game in categories.iter_mut().flat_map(|category| category.games.iter_mut()) {
        rewrite_game(game, &|text: &str| expand_token(text, app_dir));
    }
}

fn rewrite_tree(prefs: &mut Preferences, rewrite: impl Fn(&str) -> String) {
    for field in preference_path_fields(prefs) {
        *field = rewrite(field);
    }
    for game in prefs.games_mut() {
        rewrite_game(game, &rewrite);
    }
}

fn rewrite_game(game: &mut Game, rewrite: &impl Fn(&str) -> String) {
    for field in game_path_fields(game) {
        *field = rewrite(field);
    }
}

fn preference_path_fields(prefs: &mut Preferences) -> [&mut String; 7] {
    [
        &mut prefs.dosbox_path,
        &mut prefs.dosbox_default_conf_path,
        &mut prefs.dosbox_default_lang_path,
        &mut prefs.config_editor_path,
        &mut prefs.config_editor_args,
        &mut prefs.games_default_dir,
        &mut prefs.cds_default_dir,
    ]
}

fn game_path_fields(game: &mut Game) -> [&mut String; 9] {
    [
        &mut game.dos_exe_path,
        &mut game.dosbox_conf_path,
        &mut game.additional_commands,
        &mut game.directory,
        &mut game.cd_path,
        &mut game.setup_exe_path,
        &mut game.icon,
        &mut game.alternate_dosbox_exe_path,
        &mut game.dosbox_working_directory,
    ]
}

fn ends_path_prefix(after: &str) -> bool {
    match after.chars().next() {
        None => true,
        Some(next) => {
            next == '/' || next == '\\' || next == '"' || next == '\'' || next.is_whitespace()
        }
    }
}
