//! Game rules the resolution engine looks up: move data and the type chart.

use core::fmt::{Display, Formatter, Result as FmtResult};
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::{
    moves::{MoveData, MoveId},
    pokemon::PokemonType,
};

pub trait RulesData {
    fn move_data(&self, id: &MoveId) -> Result<MoveData, RulesError>;

    /// Multiplier of an attacking type against every defending type, multiplied together.
    fn type_effectiveness(
        &self,
        attacking: PokemonType,
        defending: &[PokemonType],
    ) -> Result<f64, RulesError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RulesError {
    MissingMove(MoveId),
    MissingType(PokemonType),
}

impl std::error::Error for RulesError {}

impl Display for RulesError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::MissingMove(id) => write!(f, "no data for move {}", id),
            Self::MissingType(pokemon_type) => write!(f, "no damage relations for type {:?}", pokemon_type),
        }
    }
}

/// Damage relations of one attacking type.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct TypeRelations {
    #[serde(default)]
    pub double_damage_to: Vec<PokemonType>,
    #[serde(default)]
    pub half_damage_to: Vec<PokemonType>,
    #[serde(default)]
    pub no_damage_to: Vec<PokemonType>,
}

impl TypeRelations {
    pub fn against(&self, defending: PokemonType) -> f64 {
        if self.no_damage_to.contains(&defending) {
            0.0
        } else if self.double_damage_to.contains(&defending) {
            2.0
        } else if self.half_damage_to.contains(&defending) {
            0.5
        } else {
            1.0
        }
    }
}

/// In-memory rules tables.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct RulesDex {
    #[serde(default)]
    pub moves: HashMap<MoveId, MoveData>,
    #[serde(default)]
    pub types: HashMap<PokemonType, TypeRelations>,
}

impl RulesDex {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn insert_move(&mut self, data: MoveData) {
        self.moves.insert(data.id, data);
    }

    pub fn insert_type(&mut self, pokemon_type: PokemonType, relations: TypeRelations) {
        self.types.insert(pokemon_type, relations);
    }
}

impl RulesData for RulesDex {
    fn move_data(&self, id: &MoveId) -> Result<MoveData, RulesError> {
        self.moves
            .get(id)
            .cloned()
            .ok_or(RulesError::MissingMove(*id))
    }

    fn type_effectiveness(
        &self,
        attacking: PokemonType,
        defending: &[PokemonType],
    ) -> Result<f64, RulesError> {
        let relations = self
            .types
            .get(&attacking)
            .ok_or(RulesError::MissingType(attacking))?;
        Ok(defending
            .iter()
            .map(|defending| relations.against(*defending))
            .product())
    }
}

#[cfg(test)]
mod tests {
    use super::{RulesData, RulesDex, RulesError};
    use crate::{moves::MoveId, pokemon::PokemonType};

    const DEX: &str = r#"{
        "moves": {
            "33": { "id": 33, "name": "tackle", "type": "normal", "power": 40, "accuracy": 100 }
        },
        "types": {
            "electric": {
                "double_damage_to": ["water", "flying"],
                "half_damage_to": ["electric", "grass", "dragon"],
                "no_damage_to": ["ground"]
            }
        }
    }"#;

    #[test]
    fn loads_from_json() {
        let dex = RulesDex::from_json(DEX).unwrap();
        let tackle = dex.move_data(&MoveId(33)).unwrap();
        assert_eq!(tackle.name, "tackle");
        assert_eq!(tackle.power, Some(40));
        assert_eq!(dex.move_data(&MoveId(1)), Err(RulesError::MissingMove(MoveId(1))));
    }

    #[test]
    fn multiplies_every_defending_type() {
        let dex = RulesDex::from_json(DEX).unwrap();
        let electric = |defending: &[PokemonType]| dex.type_effectiveness(PokemonType::Electric, defending);

        assert_eq!(electric(&[PokemonType::Water, PokemonType::Flying]), Ok(4.0));
        assert_eq!(electric(&[PokemonType::Water, PokemonType::Grass]), Ok(1.0));
        assert_eq!(electric(&[PokemonType::Water, PokemonType::Ground]), Ok(0.0));
        assert_eq!(electric(&[PokemonType::Normal]), Ok(1.0));
        assert_eq!(
            dex.type_effectiveness(PokemonType::Fire, &[PokemonType::Grass]),
            Err(RulesError::MissingType(PokemonType::Fire))
        );
    }
}
