use crate::model::{Category, Game, Preferences};
use rand::Rng;
use std::ops::Deref;

/// Signatures are decimal renderings of a draw from `0..SIGNATURE_RANGE`.
pub const SIGNATURE_RANGE: u32 = 1_048_576;

pub fn is_unique_signature(prefs: &Preferences, candidate: &str) -> bool {
    prefs.categories.iter().all(|category| {
        category.signature != candidate
            && category.games.iter().all(|game| game.signature != candidate)
    })
}

pub fn generate_unique_signature(prefs: &Preferences) -> String {
    generate_unique_signature_with(prefs, &mut rand::thread_rng())
}

pub fn generate_unique_signature_with<R: Rng + ?Sized>(prefs: &Preferences, rng: &mut R) -> String {
    loop {
        let candidate = rng.gen_range(0..SIGNATURE_RANGE).to_string();
        if is_unique_signature(prefs, &candidate) {
            return candidate;
        }
    }
}

/// A lookup result: either a game stored in the tree, or a fresh one that
/// is not part of it yet.
#[derive(Debug)]
pub enum GameRef<'a> {
    Stored(&'a Game),
    Transient(Game),
}

impl GameRef<'_> {
    pub fn is_persisted(&self) -> bool {
        matches!(self, GameRef::Stored(_))
    }
}

impl Deref for GameRef<'_> {
    type Target = Game;

    fn deref(&self) -> &Game {
        match self {
            GameRef::Stored(game) => game,
            GameRef::Transient(game) => game,
        }
    }
}

impl Preferences {
    pub fn find_category_by_signature(&self, signature: &str) -> Option<&Category> {
        self.categories
            .iter()
            .find(|category| category.signature == signature)
    }

    pub fn category_mut(&mut self, signature: &str) -> Option<&mut Category> {
        self.categories
            .iter_mut()
            .find(|category| category.signature == signature)
    }

    pub fn find_game_by_signature(&self, signature: &str) -> Option<&Game> {
        self.games().find(|game| game.signature == signature)
    }

    pub fn game_mut(&mut self, signature: &str) -> Option<&mut Game> {
        self.games_mut().find(|game| game.signature == signature)
    }

    pub fn category_of_game(&self, signature: &str) -> Option<&Category> {
        self.categories.iter().find(|category| {
            category
                .games
                .iter()
                .any(|game| game.signature == signature)
        })
    }

    /// First game whose trimmed name matches, ignoring case.
    pub fn find_game_by_name(&self, name: &str) -> GameRef<'_> {
        if name.trim().is_empty() {
            return GameRef::Transient(Game::default());
        }
        self.games()
            .find(|game| !game.name.trim().is_empty() && same_text(&game.name, name))
            .map(GameRef::Stored)
            .unwrap_or_else(|| GameRef::Transient(Game::default()))
    }

    /// First game launching `executable_path`. An unknown path yields a
    /// transient game already pointing at it.
    pub fn find_game_by_executable_path(&self, executable_path: &str) -> GameRef<'_> {
        if executable_path.trim().is_empty() {
            return GameRef::Transient(Game::default());
        }
        self.games()
            .find(|game| {
                !game.dos_exe_path.trim().is_empty()
                    && same_text(&game.dos_exe_path, executable_path)
            })
            .map(GameRef::Stored)
            .unwrap_or_else(|| {
                GameRef::Transient(Game {
                    dos_exe_path: executable_path.to_string(),
                    ..Game::default()
                })
            })
    }
}

fn same_text(left: &str, right: &str) -> bool {
    left.trim().to_uppercase() == right.trim().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn sample_tree() -> Preferences {
        let mut prefs = Preferences::default();
        let mut action = Category::new("Action", "10");
        action.games.push(Game {
            signature: "11".to_string(),
            dos_exe_path: "C:\\Games\\Doom\\DOOM.EXE".to_string(),
            ..Game::named("Doom")
        });
        let mut puzzle = Category::new("Puzzle", "20");
        puzzle.games.push(Game {
            signature: "21".to_string(),
            ..Game::named("Lemmings")
        });
        prefs.categories.push(action);
        prefs.categories.push(puzzle);
        prefs
    }

    #[test]
    fn uniqueness_covers_categories_and_games() {
        let prefs = sample_tree();
        assert!(!is_unique_signature(&prefs, "10"));
        assert!(!is_unique_signature(&prefs, "21"));
        assert!(is_unique_signature(&prefs, "30"));
    }

    #[test]
    fn generation_redraws_on_collision() {
        let mut probe = StdRng::seed_from_u64(42);
        let first_draw = probe.gen_range(0..SIGNATURE_RANGE).to_string();

        let mut prefs = Preferences::default();
        prefs.categories.push(Category::new("Taken", &first_draw));

        let mut rng = StdRng::seed_from_u64(42);
        let signature = generate_unique_signature_with(&prefs, &mut rng);
        assert_ne!(signature, first_draw);
        assert!(signature.parse::<u32>().unwrap() < SIGNATURE_RANGE);
    }

    #[test]
    fn lookups_by_signature() {
        let prefs = sample_tree();
        assert_eq!(prefs.find_category_by_signature("20").unwrap().title, "Puzzle");
        assert!(prefs.find_category_by_signature("21").is_none());
        assert_eq!(prefs.find_game_by_signature("21").unwrap().name, "Lemmings");
        assert!(prefs.find_game_by_signature("99").is_none());
        assert_eq!(prefs.category_of_game("11").unwrap().title, "Action");
    }

    #[test]
    fn name_lookup_is_trimmed_and_case_insensitive() {
        let prefs = sample_tree();
        let found = prefs.find_game_by_name("  lemmings ");
        assert!(found.is_persisted());
        assert_eq!(found.signature, "21");

        for query in ["", "   ", "Monkey Island"] {
            let missing = prefs.find_game_by_name(query);
            assert!(!missing.is_persisted());
            assert_eq!(*missing, Game::default());
        }
    }

    #[test]
    fn executable_lookup_returns_a_transient_game_when_unknown() {
        let prefs = sample_tree();
        assert_eq!(
            prefs.find_game_by_executable_path("c:\\games\\doom\\doom.exe ").signature,
            "11"
        );

        let unknown = prefs.find_game_by_executable_path("C:\\Games\\KEEN\\KEEN4.EXE");
        assert!(!unknown.is_persisted());
        assert_eq!(unknown.dos_exe_path, "C:\\Games\\KEEN\\KEEN4.EXE");
        assert!(unknown.signature.is_empty());
    }
}
