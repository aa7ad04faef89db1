//! A player's persistent pokemon, outside of any battle, and experience progression.

use log::{debug, info};

use crate::pokemon::{Experience, Level, RosterPokemon, MAX_LEVEL};

/// Where a peer keeps its own pokemon between battles.
pub trait Roster {
    fn member(&self, index: usize) -> Option<&RosterPokemon>;

    fn member_mut(&mut self, index: usize) -> Option<&mut RosterPokemon>;

    /// Persists changes made through [`Roster::member_mut`].
    fn commit(&mut self);
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MemoryRoster {
    pub pokemon: Vec<RosterPokemon>,
    commits: usize,
}

impl MemoryRoster {
    pub fn new(pokemon: Vec<RosterPokemon>) -> Self {
        Self {
            pokemon,
            commits: 0,
        }
    }

    pub fn commits(&self) -> usize {
        self.commits
    }
}

impl Roster for MemoryRoster {
    fn member(&self, index: usize) -> Option<&RosterPokemon> {
        self.pokemon.get(index)
    }

    fn member_mut(&mut self, index: usize) -> Option<&mut RosterPokemon> {
        self.pokemon.get_mut(index)
    }

    fn commit(&mut self) {
        self.commits += 1;
    }
}

/// Experience needed to advance from `level` to the next one.
pub fn xp_to_next_level(level: Level) -> Experience {
    (100.0 * 1.1f64.powi(level.max(1) as i32 - 1)).ceil() as Experience
}

/// Adds experience, levelling up while the threshold is met. Returns the new
/// level if it changed.
pub fn gain_xp(pokemon: &mut RosterPokemon, xp: Experience) -> Option<Level> {
    let before = pokemon.level;
    pokemon.experience = pokemon.experience.saturating_add(xp);

    while pokemon.level < MAX_LEVEL {
        let needed = xp_to_next_level(pokemon.level);
        if pokemon.experience < needed {
            break;
        }
        pokemon.experience -= needed;
        pokemon.level += 1;
    }

    if pokemon.level == MAX_LEVEL {
        pokemon.experience = 0;
    }

    debug!("{} gained {} xp", pokemon.name, xp);

    (pokemon.level != before).then(|| {
        info!("{} grew to level {}", pokemon.name, pokemon.level);
        pokemon.level
    })
}

/// Applies an award to one roster slot and persists it.
pub fn award(roster: &mut dyn Roster, index: usize, xp: Experience) -> Option<Level> {
    let level = gain_xp(roster.member_mut(index)?, xp);
    roster.commit();
    level
}
