//! Built-in symbol tables that are not compiled from dataset files.
//!
//! The catalog carries stats, evolution methods, encounter types, growth
//! rates, the plain enum namespaces (colours, shapes, natures, ...) and the
//! numeric limits trainer validation checks against. It is configuration:
//! [`Catalog::default`] holds the standard values and a config file may
//! replace any part of it.

use pbsc_core::schema::Namespace;
use pbsc_core::symbols::SymbolTable;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Namespaces
// ---------------------------------------------------------------------------

pub const STAT: Namespace = "Stat";
pub const EVOLUTION: Namespace = "Evolution";
pub const ENCOUNTER_TYPE: Namespace = "EncounterType";
pub const GROWTH_RATE: Namespace = "GrowthRate";
pub const GENDER_RATIO: Namespace = "GenderRatio";
pub const BODY_COLOR: Namespace = "BodyColor";
pub const BODY_SHAPE: Namespace = "BodyShape";
pub const HABITAT: Namespace = "Habitat";
pub const EGG_GROUP: Namespace = "EggGroup";
pub const NATURE: Namespace = "Nature";
pub const TARGET: Namespace = "Target";
pub const ENVIRONMENT: Namespace = "Environment";
pub const WEATHER: Namespace = "Weather";
pub const TRAINER_GENDER: Namespace = "TrainerGender";
pub const POKEMON_GENDER: Namespace = "PokemonGender";
pub const MOVE_CATEGORY: Namespace = "MoveCategory";
pub const ITEM_FIELD_USE: Namespace = "ItemFieldUse";
pub const ITEM_BATTLE_USE: Namespace = "ItemBattleUse";
pub const DIRECTION: Namespace = "Direction";

// ---------------------------------------------------------------------------
// Entries
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatDef {
    pub id: String,
    /// Position of the stat in six-value lists (base stats, IVs, EVs).
    /// `None` for stats that only exist in battle.
    #[serde(default)]
    pub pbs_order: Option<usize>,
}

/// How the parameter of an evolution is interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParameterKind {
    /// No parameter; anything written is discarded.
    None,
    /// A positive integer.
    Integer,
    /// Free text, kept as written.
    Text,
    /// A member of the named namespace.
    Enum(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvolutionMethod {
    pub id: String,
    pub parameter: ParameterKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncounterType {
    pub id: String,
    /// Step chance used when a map does not give its own.
    pub trigger_chance: u64,
}

/// Numeric limits for trainer Pokémon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    pub max_name_size: usize,
    pub iv_stat_limit: u64,
    pub ev_stat_limit: u64,
    pub ev_limit: u64,
    pub max_happiness: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_name_size: 10,
            iv_stat_limit: 31,
            ev_stat_limit: 252,
            ev_limit: 510,
            max_happiness: 255,
        }
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Catalog {
    pub stats: Vec<StatDef>,
    pub evolution_methods: Vec<EvolutionMethod>,
    pub encounter_types: Vec<EncounterType>,
    pub growth_rates: Vec<String>,
    pub max_level: u64,
    /// Plain enum namespaces: namespace → members.
    pub enums: BTreeMap<String, Vec<String>>,
    /// Extra spellings: namespace → alias → member.
    pub aliases: BTreeMap<String, BTreeMap<String, String>>,
    pub limits: Limits,
    /// Names of the game's maps by id. Empty when unknown.
    pub map_names: BTreeMap<u64, String>,
}

impl Catalog {
    /// Stats that appear in six-value lists, with their position.
    pub fn main_stats(&self) -> impl Iterator<Item = (&str, usize)> {
        self.stats
            .iter()
            .filter_map(|s| s.pbs_order.map(|order| (s.id.as_str(), order)))
    }

    pub fn evolution_method(&self, id: &str) -> Option<&EvolutionMethod> {
        self.evolution_methods.iter().find(|m| m.id == id)
    }

    pub fn encounter_type(&self, id: &str) -> Option<&EncounterType> {
        self.encounter_types.iter().find(|t| t.id == id)
    }

    /// Whether the catalog lists the game's maps at all.
    pub fn knows_maps(&self) -> bool {
        !self.map_names.is_empty()
    }

    pub fn map_name(&self, id: u64) -> Option<&str> {
        self.map_names.get(&id).map(String::as_str)
    }

    pub fn has_map(&self, id: u64) -> bool {
        self.map_names.contains_key(&id)
    }

    fn members(&self, namespace: &str) -> Option<Vec<&str>> {
        let members = match namespace {
            STAT => self.stats.iter().map(|s| s.id.as_str()).collect(),
            EVOLUTION => self.evolution_methods.iter().map(|m| m.id.as_str()).collect(),
            ENCOUNTER_TYPE => self.encounter_types.iter().map(|t| t.id.as_str()).collect(),
            GROWTH_RATE => self.growth_rates.iter().map(String::as_str).collect(),
            _ => self.enums.get(namespace)?.iter().map(String::as_str).collect(),
        };
        Some(members)
    }
}

impl SymbolTable for Catalog {
    fn resolve(&self, namespace: &str, token: &str) -> Option<String> {
        let members = self.members(namespace)?;
        if members.contains(&token) {
            return Some(token.to_string());
        }
        self.aliases
            .get(namespace)?
            .get(token)
            .filter(|canonical| members.contains(&canonical.as_str()))
            .cloned()
    }

    fn has_namespace(&self, namespace: &str) -> bool {
        self.members(namespace).is_some()
    }
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn alias_map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(alias, canonical)| (alias.to_string(), canonical.to_string()))
        .collect()
}

impl Default for Catalog {
    fn default() -> Self {
        let stats = [
            ("HP", Some(0)),
            ("ATTACK", Some(1)),
            ("DEFENSE", Some(2)),
            ("SPECIAL_ATTACK", Some(4)),
            ("SPECIAL_DEFENSE", Some(5)),
            ("SPEED", Some(3)),
            ("ACCURACY", None),
            ("EVASION", None),
        ]
        .into_iter()
        .map(|(id, pbs_order)| StatDef {
            id: id.to_string(),
            pbs_order,
        })
        .collect();

        use ParameterKind as P;
        let evolution_methods = [
            ("None", P::None),
            ("Level", P::Integer),
            ("LevelMale", P::Integer),
            ("LevelFemale", P::Integer),
            ("LevelDay", P::Integer),
            ("LevelNight", P::Integer),
            ("LevelRain", P::Integer),
            ("AttackGreater", P::Integer),
            ("AtkDefEqual", P::Integer),
            ("DefenseGreater", P::Integer),
            ("Silcoon", P::Integer),
            ("Cascoon", P::Integer),
            ("Ninjask", P::Integer),
            ("Shedinja", P::Integer),
            ("Happiness", P::None),
            ("HappinessDay", P::None),
            ("HappinessNight", P::None),
            ("HappinessMove", P::Enum("Move".into())),
            ("HappinessMoveType", P::Enum("Type".into())),
            ("HasMove", P::Enum("Move".into())),
            ("HasMoveType", P::Enum("Type".into())),
            ("HasInParty", P::Enum("Species".into())),
            ("Location", P::Integer),
            ("LocationFlag", P::Text),
            ("Region", P::Integer),
            ("Beauty", P::Integer),
            ("Item", P::Enum("Item".into())),
            ("ItemMale", P::Enum("Item".into())),
            ("ItemFemale", P::Enum("Item".into())),
            ("HoldItem", P::Enum("Item".into())),
            ("DayHoldItem", P::Enum("Item".into())),
            ("NightHoldItem", P::Enum("Item".into())),
            ("Trade", P::None),
            ("TradeItem", P::Enum("Item".into())),
            ("TradeSpecies", P::Enum("Species".into())),
            ("Event", P::Integer),
        ]
        .into_iter()
        .map(|(id, parameter)| EvolutionMethod {
            id: id.to_string(),
            parameter,
        })
        .collect();

        let encounter_types = [
            ("Land", 21),
            ("LandDay", 21),
            ("LandNight", 21),
            ("LandMorning", 21),
            ("LandAfternoon", 21),
            ("LandEvening", 21),
            ("Cave", 5),
            ("CaveDay", 5),
            ("CaveNight", 5),
            ("Water", 2),
            ("WaterDay", 2),
            ("WaterNight", 2),
            ("OldRod", 0),
            ("GoodRod", 0),
            ("SuperRod", 0),
            ("RockSmash", 50),
            ("HeadbuttLow", 0),
            ("HeadbuttHigh", 0),
            ("BugContest", 21),
        ]
        .into_iter()
        .map(|(id, trigger_chance)| EncounterType {
            id: id.to_string(),
            trigger_chance,
        })
        .collect();

        let mut enums = BTreeMap::new();
        let mut add = |namespace: &str, members: &[&str]| {
            enums.insert(namespace.to_string(), names(members));
        };
        add(
            GENDER_RATIO,
            &[
                "AlwaysMale",
                "AlwaysFemale",
                "Genderless",
                "FemaleOneEighth",
                "Female25Percent",
                "Female50Percent",
                "Female75Percent",
                "FemaleSevenEighths",
            ],
        );
        add(
            BODY_COLOR,
            &["Red", "Blue", "Yellow", "Green", "Black", "Brown", "Purple", "Gray", "White", "Pink"],
        );
        add(
            BODY_SHAPE,
            &[
                "Head",
                "Serpentine",
                "Finned",
                "HeadArms",
                "HeadBase",
                "BipedalTail",
                "HeadLegs",
                "Quadruped",
                "Winged",
                "Multiped",
                "MultiBody",
                "Bipedal",
                "MultiWinged",
                "Insectoid",
            ],
        );
        add(
            HABITAT,
            &[
                "None",
                "Grassland",
                "Forest",
                "WatersEdge",
                "Sea",
                "Cave",
                "Mountain",
                "RoughTerrain",
                "Urban",
                "Rare",
            ],
        );
        add(
            EGG_GROUP,
            &[
                "Undiscovered",
                "Monster",
                "Water1",
                "Bug",
                "Flying",
                "Field",
                "Fairy",
                "Grass",
                "Humanlike",
                "Water3",
                "Mineral",
                "Amorphous",
                "Water2",
                "Ditto",
                "Dragon",
            ],
        );
        add(
            NATURE,
            &[
                "HARDY", "LONELY", "BRAVE", "ADAMANT", "NAUGHTY", "BOLD", "DOCILE", "RELAXED", "IMPISH",
                "LAX", "TIMID", "HASTY", "SERIOUS", "JOLLY", "NAIVE", "MODEST", "MILD", "QUIET",
                "BASHFUL", "RASH", "CALM", "GENTLE", "SASSY", "CAREFUL", "QUIRKY",
            ],
        );
        add(
            TARGET,
            &[
                "None",
                "User",
                "NearAlly",
                "UserOrNearAlly",
                "AllAllies",
                "UserAndAllies",
                "NearFoe",
                "RandomNearFoe",
                "AllNearFoes",
                "Foe",
                "AllFoes",
                "NearOther",
                "AllNearOthers",
                "Other",
                "AllBattlers",
                "UserSide",
                "FoeSide",
                "BothSides",
            ],
        );
        add(
            ENVIRONMENT,
            &[
                "None",
                "Grass",
                "TallGrass",
                "MovingWater",
                "StillWater",
                "Puddle",
                "Underwater",
                "Cave",
                "Rock",
                "Sand",
                "Forest",
                "ForestGrass",
                "Snow",
                "Ice",
                "Volcano",
                "Graveyard",
                "Sky",
                "Space",
                "UltraSpace",
            ],
        );
        add(
            WEATHER,
            &["None", "Rain", "Storm", "Snow", "Blizzard", "Sandstorm", "HeavyRain", "Sun", "Fog"],
        );
        add(TRAINER_GENDER, &["Male", "Female", "Unknown", "Mixed"]);
        add(POKEMON_GENDER, &["Male", "Female", "Genderless"]);
        add(MOVE_CATEGORY, &["Physical", "Special", "Status"]);
        add(ITEM_FIELD_USE, &["OnPokemon", "Direct", "TM", "HM", "TR"]);
        add(ITEM_BATTLE_USE, &["OnPokemon", "OnMove", "OnBattler", "OnFoe", "Direct"]);
        add(DIRECTION, &["N", "E", "S", "W"]);

        let mut aliases = BTreeMap::new();
        aliases.insert(
            DIRECTION.to_string(),
            alias_map(&[("North", "N"), ("East", "E"), ("South", "S"), ("West", "W")]),
        );
        aliases.insert(
            POKEMON_GENDER.to_string(),
            alias_map(&[
                ("M", "Male"),
                ("m", "Male"),
                ("male", "Male"),
                ("F", "Female"),
                ("f", "Female"),
                ("female", "Female"),
            ]),
        );

        Self {
            stats,
            evolution_methods,
            encounter_types,
            growth_rates: names(&["Medium", "Erratic", "Fluctuating", "Parabolic", "Fast", "Slow"]),
            max_level: 100,
            enums,
            aliases,
            limits: Limits::default(),
            map_names: BTreeMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_resolves_builtin_namespaces() {
        let catalog = Catalog::default();
        assert_eq!(catalog.resolve(STAT, "SPEED"), Some("SPEED".to_string()));
        assert_eq!(catalog.resolve(GROWTH_RATE, "Slow"), Some("Slow".to_string()));
        assert_eq!(catalog.resolve(BODY_COLOR, "Green"), Some("Green".to_string()));
        assert_eq!(catalog.resolve(BODY_COLOR, "green"), None);
        assert!(catalog.has_namespace(NATURE));
        assert!(!catalog.has_namespace("Type"));
    }

    #[test]
    fn aliases_map_to_canonical_members() {
        let catalog = Catalog::default();
        assert_eq!(catalog.resolve(DIRECTION, "North"), Some("N".to_string()));
        assert_eq!(catalog.resolve(DIRECTION, "W"), Some("W".to_string()));
        assert_eq!(catalog.resolve(POKEMON_GENDER, "f"), Some("Female".to_string()));
        assert_eq!(catalog.resolve(DIRECTION, "Up"), None);
    }

    #[test]
    fn main_stats_follow_file_order() {
        let catalog = Catalog::default();
        let mut main: Vec<_> = catalog.main_stats().collect();
        main.sort_by_key(|(_, order)| *order);
        let ids: Vec<_> = main.into_iter().map(|(id, _)| id).collect();
        assert_eq!(
            ids,
            vec!["HP", "ATTACK", "DEFENSE", "SPEED", "SPECIAL_ATTACK", "SPECIAL_DEFENSE"]
        );
    }

    #[test]
    fn lookups_by_id() {
        let catalog = Catalog::default();
        assert_eq!(catalog.evolution_method("Level").unwrap().parameter, ParameterKind::Integer);
        assert_eq!(
            catalog.evolution_method("Item").unwrap().parameter,
            ParameterKind::Enum("Item".into())
        );
        assert_eq!(catalog.encounter_type("Cave").unwrap().trigger_chance, 5);
        assert!(catalog.encounter_type("Lava").is_none());
        assert!(!catalog.knows_maps());
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let catalog: Catalog = ron::from_str("(max_level: 50)").unwrap();
        assert_eq!(catalog.max_level, 50);
        assert_eq!(catalog.limits.iv_stat_limit, 31);
        assert!(catalog.encounter_type("Land").is_some());
    }
}
