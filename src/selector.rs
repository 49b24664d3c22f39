//! Random game selection
//!
//! Filters the library by a playtime ceiling, optionally hides games already
//! rolled this session, and picks one of the remaining games uniformly at random.

use std::collections::HashSet;

use rand::seq::IndexedRandom;
use rand::Rng;
use thiserror::Error;

use crate::data::GameRecord;

/// Default playtime ceiling in hours
pub const DEFAULT_MAX_HOURS: f64 = 2.0;

/// Largest playtime ceiling the UI offers
pub const MAX_HOURS_LIMIT: f64 = 100.0;

/// Step used when adjusting the ceiling
pub const MAX_HOURS_STEP: f64 = 0.5;

/// Raised when no game survives the filters
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SelectError {
    /// Every game under the ceiling has already been rolled
    #[error("No more games available with less than {max_hours} hours of playtime. You've rolled all available games! Reset rolled games to start over.")]
    AllRolled { max_hours: f64 },

    /// No game is under the ceiling at all
    #[error("No games found with less than {max_hours} hours of playtime. Try increasing the playtime limit!")]
    NoneUnderCeiling { max_hours: f64 },
}

/// Whether a game is under the ceiling: `playtime_minutes < max_hours * 60`
pub fn is_under_ceiling(game: &GameRecord, max_hours: f64) -> bool {
    (game.playtime_minutes as f64) < max_hours * 60.0
}

/// Games with less than `max_hours` of playtime, in library order
pub fn filter_by_playtime(games: &[GameRecord], max_hours: f64) -> Vec<&GameRecord> {
    games
        .iter()
        .filter(|game| is_under_ceiling(game, max_hours))
        .collect()
}

/// AppIDs excluded from selection for the rest of the session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RolledSet {
    app_ids: HashSet<u32>,
}

impl RolledSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, app_id: u32) -> bool {
        self.app_ids.insert(app_id)
    }

    pub fn contains(&self, app_id: u32) -> bool {
        self.app_ids.contains(&app_id)
    }

    pub fn len(&self) -> usize {
        self.app_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.app_ids.is_empty()
    }

    pub fn clear(&mut self) {
        self.app_ids.clear();
    }
}

/// Eligible games for one roll, plus how many were hidden by the rolled set
#[derive(Debug)]
pub struct Candidates<'a> {
    pub games: Vec<&'a GameRecord>,
    pub excluded: usize,
}

/// Session-scoped selector state
#[derive(Debug, Clone, Default)]
pub struct Selector {
    /// Hide games that were already rolled
    pub exclude_rolled: bool,
    rolled: RolledSet,
}

impl Selector {
    pub fn new(exclude_rolled: bool) -> Self {
        Self {
            exclude_rolled,
            rolled: RolledSet::new(),
        }
    }

    /// Games rolled so far this session
    pub fn rolled(&self) -> &RolledSet {
        &self.rolled
    }

    /// Forgets every rolled game
    pub fn reset(&mut self) {
        self.rolled.clear();
    }

    /// The games a roll would choose from
    pub fn candidates<'a>(&self, games: &'a [GameRecord], max_hours: f64) -> Candidates<'a> {
        let under_ceiling = filter_by_playtime(games, max_hours);
        if !self.exclude_rolled || self.rolled.is_empty() {
            return Candidates {
                games: under_ceiling,
                excluded: 0,
            };
        }

        let total = under_ceiling.len();
        let remaining: Vec<&GameRecord> = under_ceiling
            .into_iter()
            .filter(|game| !self.rolled.contains(game.app_id))
            .collect();
        Candidates {
            excluded: total - remaining.len(),
            games: remaining,
        }
    }

    /// Picks one game uniformly at random from the candidates
    ///
    /// On success the game is added to the rolled set when exclusion is on.
    ///
    /// # Returns
    /// * `Ok(&GameRecord)` - The rolled game
    /// * `Err(SelectError::AllRolled)` - Exclusion emptied an otherwise non-empty set
    /// * `Err(SelectError::NoneUnderCeiling)` - Nothing is under the ceiling
    pub fn roll<'a, R: Rng + ?Sized>(
        &mut self,
        games: &'a [GameRecord],
        max_hours: f64,
        rng: &mut R,
    ) -> Result<&'a GameRecord, SelectError> {
        let candidates = self.candidates(games, max_hours);
        let Some(&game) = candidates.games.choose(rng) else {
            return Err(if candidates.excluded > 0 {
                SelectError::AllRolled { max_hours }
            } else {
                SelectError::NoneUnderCeiling { max_hours }
            });
        };

        if self.exclude_rolled {
            self.rolled.insert(game.app_id);
        }
        Ok(game)
    }
}

/// Raises or lowers a ceiling by one step, clamped to `[0, MAX_HOURS_LIMIT]`
pub fn step_max_hours(current: f64, up: bool) -> f64 {
    let next = if up {
        current + MAX_HOURS_STEP
    } else {
        current - MAX_HOURS_STEP
    };
    next.clamp(0.0, MAX_HOURS_LIMIT)
}
