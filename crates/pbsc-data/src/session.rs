//! A compile session: runs dataset kinds in dependency order and keeps what
//! they produced.
//!
//! Compiling is split in two. [`Session::stage`] takes `&self`, runs both
//! phases of one dataset against the stores committed so far and returns a
//! [`Staged`] result without touching the session. [`Session::commit`]
//! takes `&mut self` and makes a staged result visible to later datasets.
//! A dataset that fails to stage commits nothing: no store, no messages, no
//! warnings.

use crate::catalog::Catalog;
use crate::config::CompilerConfig;
use crate::datasets::connections::MapConnections;
use crate::datasets::dungeon::{self, DungeonParameters};
use crate::datasets::encounters::Encounters;
use crate::datasets::forms::SpeciesForms;
use crate::datasets::metadata::{MapMetadata, Metadata, PlayerMetadata};
use crate::datasets::metrics::SpeciesMetrics;
use crate::datasets::moves::Moves;
use crate::datasets::phone::PhoneContacts;
use crate::datasets::plain;
use crate::datasets::regional_dexes::RegionalDexes;
use crate::datasets::species::Species;
use crate::datasets::town_map::TownMap;
use crate::datasets::trainers::Trainers;
use crate::datasets::types::Types;
use crate::datasets::{
    ABILITY, BERRY_PLANT, DUNGEON_PARAMETERS, DUNGEON_TILESET, ENCOUNTER, ITEM, MAP_CONNECTION, MAP_METADATA,
    METADATA, MOVE, PHONE_CONTACT, PLAYER_METADATA, REGIONAL_DEX, RIBBON, SHADOW_POKEMON, SPECIES, SPECIES_METRICS,
    TOWN_MAP, TRAINER, TRAINER_TYPE, TYPE,
};
use crate::loader::{DataLoadError, SourceProvider};
use pbsc_core::compiler::{CompileEnv, Compiled, Dataset, compile};
use pbsc_core::error::{CompileError, Warning};
use pbsc_core::messages::Messages;
use pbsc_core::persist::{PersistError, PersistenceSink};
use pbsc_core::schema::Namespace;
use pbsc_core::store::{DataStore, FrozenStore};
use pbsc_core::symbols::Layered;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

// ===========================================================================
// Dataset kinds
// ===========================================================================

/// Every dataset kind the compiler knows. Declaration order is a valid
/// compile order: each kind comes after everything it depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DatasetKind {
    TownMap,
    MapConnection,
    Type,
    Ability,
    Move,
    Item,
    BerryPlant,
    Species,
    SpeciesForm,
    SpeciesMetrics,
    ShadowPokemon,
    RegionalDex,
    Ribbon,
    Encounter,
    TrainerType,
    Trainer,
    PhoneContact,
    Metadata,
    PlayerMetadata,
    MapMetadata,
    DungeonTileset,
    DungeonParameters,
}

impl DatasetKind {
    pub const ALL: [DatasetKind; 22] = [
        DatasetKind::TownMap,
        DatasetKind::MapConnection,
        DatasetKind::Type,
        DatasetKind::Ability,
        DatasetKind::Move,
        DatasetKind::Item,
        DatasetKind::BerryPlant,
        DatasetKind::Species,
        DatasetKind::SpeciesForm,
        DatasetKind::SpeciesMetrics,
        DatasetKind::ShadowPokemon,
        DatasetKind::RegionalDex,
        DatasetKind::Ribbon,
        DatasetKind::Encounter,
        DatasetKind::TrainerType,
        DatasetKind::Trainer,
        DatasetKind::PhoneContact,
        DatasetKind::Metadata,
        DatasetKind::PlayerMetadata,
        DatasetKind::MapMetadata,
        DatasetKind::DungeonTileset,
        DatasetKind::DungeonParameters,
    ];

    pub fn name(self) -> &'static str {
        match self {
            DatasetKind::TownMap => "TownMap",
            DatasetKind::MapConnection => "MapConnection",
            DatasetKind::Type => "Type",
            DatasetKind::Ability => "Ability",
            DatasetKind::Move => "Move",
            DatasetKind::Item => "Item",
            DatasetKind::BerryPlant => "BerryPlant",
            DatasetKind::Species => "Species",
            DatasetKind::SpeciesForm => "SpeciesForm",
            DatasetKind::SpeciesMetrics => "SpeciesMetrics",
            DatasetKind::ShadowPokemon => "ShadowPokemon",
            DatasetKind::RegionalDex => "RegionalDex",
            DatasetKind::Ribbon => "Ribbon",
            DatasetKind::Encounter => "Encounter",
            DatasetKind::TrainerType => "TrainerType",
            DatasetKind::Trainer => "Trainer",
            DatasetKind::PhoneContact => "PhoneContact",
            DatasetKind::Metadata => "Metadata",
            DatasetKind::PlayerMetadata => "PlayerMetadata",
            DatasetKind::MapMetadata => "MapMetadata",
            DatasetKind::DungeonTileset => "DungeonTileset",
            DatasetKind::DungeonParameters => "DungeonParameters",
        }
    }

    /// Kind with the given [`DatasetKind::name`].
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    /// Namespace the compiled store answers for. Species forms extend the
    /// species store, so both share one.
    pub fn namespace(self) -> Namespace {
        match self {
            DatasetKind::TownMap => TOWN_MAP,
            DatasetKind::MapConnection => MAP_CONNECTION,
            DatasetKind::Type => TYPE,
            DatasetKind::Ability => ABILITY,
            DatasetKind::Move => MOVE,
            DatasetKind::Item => ITEM,
            DatasetKind::BerryPlant => BERRY_PLANT,
            DatasetKind::Species | DatasetKind::SpeciesForm => SPECIES,
            DatasetKind::SpeciesMetrics => SPECIES_METRICS,
            DatasetKind::ShadowPokemon => SHADOW_POKEMON,
            DatasetKind::RegionalDex => REGIONAL_DEX,
            DatasetKind::Ribbon => RIBBON,
            DatasetKind::Encounter => ENCOUNTER,
            DatasetKind::TrainerType => TRAINER_TYPE,
            DatasetKind::Trainer => TRAINER,
            DatasetKind::PhoneContact => PHONE_CONTACT,
            DatasetKind::Metadata => METADATA,
            DatasetKind::PlayerMetadata => PLAYER_METADATA,
            DatasetKind::MapMetadata => MAP_METADATA,
            DatasetKind::DungeonTileset => DUNGEON_TILESET,
            DatasetKind::DungeonParameters => DUNGEON_PARAMETERS,
        }
    }

    pub fn default_file(self) -> &'static str {
        match self {
            DatasetKind::TownMap => "town_map.txt",
            DatasetKind::MapConnection => "map_connections.txt",
            DatasetKind::Type => "types.txt",
            DatasetKind::Ability => "abilities.txt",
            DatasetKind::Move => "moves.txt",
            DatasetKind::Item => "items.txt",
            DatasetKind::BerryPlant => "berry_plants.txt",
            DatasetKind::Species => "pokemon.txt",
            DatasetKind::SpeciesForm => "pokemon_forms.txt",
            DatasetKind::SpeciesMetrics => "pokemon_metrics.txt",
            DatasetKind::ShadowPokemon => "shadow_pokemon.txt",
            DatasetKind::RegionalDex => "regional_dexes.txt",
            DatasetKind::Ribbon => "ribbons.txt",
            DatasetKind::Encounter => "encounters.txt",
            DatasetKind::TrainerType => "trainer_types.txt",
            DatasetKind::Trainer => "trainers.txt",
            DatasetKind::PhoneContact => "phone.txt",
            DatasetKind::Metadata | DatasetKind::PlayerMetadata => "metadata.txt",
            DatasetKind::MapMetadata => "map_metadata.txt",
            DatasetKind::DungeonTileset => "dungeon_tilesets.txt",
            DatasetKind::DungeonParameters => "dungeon_parameters.txt",
        }
    }

    /// Key under which the compiled store is persisted.
    pub fn output_key(self) -> &'static str {
        match self {
            DatasetKind::TownMap => "town_map",
            DatasetKind::MapConnection => "map_connections",
            DatasetKind::Type => "types",
            DatasetKind::Ability => "abilities",
            DatasetKind::Move => "moves",
            DatasetKind::Item => "items",
            DatasetKind::BerryPlant => "berry_plants",
            DatasetKind::Species | DatasetKind::SpeciesForm => "species",
            DatasetKind::SpeciesMetrics => "species_metrics",
            DatasetKind::ShadowPokemon => "shadow_pokemon",
            DatasetKind::RegionalDex => "regional_dexes",
            DatasetKind::Ribbon => "ribbons",
            DatasetKind::Encounter => "encounters",
            DatasetKind::TrainerType => "trainer_types",
            DatasetKind::Trainer => "trainers",
            DatasetKind::PhoneContact => "phone",
            DatasetKind::Metadata => "metadata",
            DatasetKind::PlayerMetadata => "player_metadata",
            DatasetKind::MapMetadata => "map_metadata",
            DatasetKind::DungeonTileset => "dungeon_tilesets",
            DatasetKind::DungeonParameters => "dungeon_parameters",
        }
    }

    /// Kinds whose names this kind resolves, and which must therefore be
    /// committed first.
    pub fn dependencies(self) -> &'static [DatasetKind] {
        use DatasetKind as K;
        match self {
            K::Move => &[K::Type],
            K::Item => &[K::Move],
            K::BerryPlant => &[K::Item],
            K::Species => &[K::Type, K::Ability, K::Move, K::Item],
            K::SpeciesForm | K::SpeciesMetrics | K::ShadowPokemon | K::RegionalDex | K::Encounter => &[K::Species],
            K::Trainer => &[K::TrainerType, K::Species, K::Item, K::Move, K::Ability],
            K::PhoneContact => &[K::TrainerType],
            K::Metadata | K::PlayerMetadata => &[K::TrainerType, K::Item],
            _ => &[],
        }
    }

    /// Whether `other` is a direct or indirect dependency of this kind.
    pub fn depends_on(self, other: DatasetKind) -> bool {
        self.dependencies()
            .iter()
            .any(|&d| d == other || d.depends_on(other))
    }

    /// The kind whose store this kind starts from instead of an empty one.
    pub fn extends(self) -> Option<DatasetKind> {
        match self {
            DatasetKind::SpeciesForm => Some(DatasetKind::Species),
            _ => None,
        }
    }

    /// Build the dataset definition for this kind.
    pub fn build(self, catalog: &Arc<Catalog>) -> Result<Box<dyn Dataset>, CompileError> {
        let dataset: Box<dyn Dataset> = match self {
            DatasetKind::TownMap => Box::new(TownMap::new()?),
            DatasetKind::MapConnection => Box::new(MapConnections::new(catalog.clone())?),
            DatasetKind::Type => Box::new(Types::new()?),
            DatasetKind::Ability => Box::new(plain::abilities()?),
            DatasetKind::Move => Box::new(Moves::new()?),
            DatasetKind::Item => Box::new(plain::items()?),
            DatasetKind::BerryPlant => Box::new(plain::berry_plants()?),
            DatasetKind::Species => Box::new(Species::new(catalog.clone())?),
            DatasetKind::SpeciesForm => Box::new(SpeciesForms::new(catalog.clone())?),
            DatasetKind::SpeciesMetrics => Box::new(SpeciesMetrics::new()?),
            DatasetKind::ShadowPokemon => Box::new(plain::shadow_pokemon()?),
            DatasetKind::RegionalDex => Box::new(RegionalDexes::new()?),
            DatasetKind::Ribbon => Box::new(plain::ribbons()?),
            DatasetKind::Encounter => Box::new(Encounters::new(catalog.clone())?),
            DatasetKind::TrainerType => Box::new(plain::trainer_types()?),
            DatasetKind::Trainer => Box::new(Trainers::new(catalog.clone())?),
            DatasetKind::PhoneContact => Box::new(PhoneContacts::new()?),
            DatasetKind::Metadata => Box::new(Metadata::new()?),
            DatasetKind::PlayerMetadata => Box::new(PlayerMetadata::new()?),
            DatasetKind::MapMetadata => Box::new(MapMetadata::new(catalog.clone())?),
            DatasetKind::DungeonTileset => Box::new(dungeon::dungeon_tilesets()?),
            DatasetKind::DungeonParameters => Box::new(DungeonParameters::new()?),
        };
        Ok(dataset)
    }
}

// ===========================================================================
// Session
// ===========================================================================

/// A compiled dataset that has not been committed yet.
#[derive(Debug, Clone)]
pub struct Staged {
    pub kind: DatasetKind,
    pub compiled: Compiled,
}

pub struct Session {
    config: CompilerConfig,
    catalog: Arc<Catalog>,
    /// Committed stores by namespace.
    committed: HashMap<String, FrozenStore>,
    compiled: BTreeSet<DatasetKind>,
    /// Store an extending kind started from, so recompiling it does not
    /// see its own earlier records.
    bases: HashMap<DatasetKind, FrozenStore>,
    messages: Messages,
    warnings: BTreeMap<DatasetKind, Vec<Warning>>,
}

impl Session {
    pub fn new(config: CompilerConfig) -> Self {
        let catalog = Arc::new(config.catalog.clone());
        Self {
            config,
            catalog,
            committed: HashMap::new(),
            compiled: BTreeSet::new(),
            bases: HashMap::new(),
            messages: Messages::new(),
            warnings: BTreeMap::new(),
        }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn is_compiled(&self, kind: DatasetKind) -> bool {
        self.compiled.contains(&kind)
    }

    /// Kinds committed so far, in compile order.
    pub fn compiled(&self) -> impl Iterator<Item = DatasetKind> + '_ {
        self.compiled.iter().copied()
    }

    /// The committed store answering for `namespace`.
    pub fn store(&self, namespace: &str) -> Option<&FrozenStore> {
        self.committed.get(namespace)
    }

    pub fn messages(&self) -> &Messages {
        &self.messages
    }

    /// Warnings of the last successful compile of `kind`.
    pub fn warnings(&self, kind: DatasetKind) -> &[Warning] {
        self.warnings.get(&kind).map(Vec::as_slice).unwrap_or_default()
    }

    // -----------------------------------------------------------------------
    // Staging
    // -----------------------------------------------------------------------

    /// Compile `text` as `kind` against the committed stores. Nothing in the
    /// session changes.
    pub fn stage(&self, kind: DatasetKind, text: &str) -> Result<Staged, CompileError> {
        for dependency in kind.dependencies() {
            if !self.compiled.contains(dependency) {
                return Err(CompileError::MissingDependency {
                    dataset: kind.name().to_string(),
                    dependency: dependency.name().to_string(),
                });
            }
        }
        let dataset = kind.build(&self.catalog)?;

        let mut symbols = Layered::new();
        symbols.push(self.catalog.as_ref());
        for store in self.committed.values() {
            symbols.push(store);
        }

        let store = match kind.extends() {
            Some(base) => self
                .bases
                .get(&kind)
                .or_else(|| self.committed.get(base.namespace()))
                .map(FrozenStore::to_store)
                .ok_or_else(|| CompileError::MissingDependency {
                    dataset: kind.name().to_string(),
                    dependency: base.name().to_string(),
                })?,
            None => DataStore::new(kind.namespace()),
        };

        let env = CompileEnv::new(self.config.file_for(kind), &symbols)
            .with_stores(&self.committed)
            .with_options(self.config.options())
            .with_messages(self.messages.fork());
        let compiled = compile(dataset.as_ref(), text, store, env)?;
        Ok(Staged { kind, compiled })
    }

    /// Make a staged result visible to later datasets. Committed kinds that
    /// depend on `staged.kind` are dropped and must be compiled again.
    pub fn commit(&mut self, staged: Staged) {
        let Staged { kind, compiled } = staged;
        self.invalidate_dependents(kind);

        if let Some(base) = kind.extends() {
            if !self.bases.contains_key(&kind) {
                if let Some(previous) = self.committed.remove(base.namespace()) {
                    self.bases.insert(kind, previous);
                }
            }
        } else {
            self.bases.retain(|extending, _| extending.extends() != Some(kind));
        }

        tracing::info!(
            dataset = kind.name(),
            records = compiled.store.len(),
            warnings = compiled.warnings.len(),
            "committed"
        );
        self.committed.insert(kind.namespace().to_string(), compiled.store);
        self.messages.merge_touched(&compiled.messages);
        self.warnings.insert(kind, compiled.warnings);
        self.compiled.insert(kind);
    }

    fn invalidate_dependents(&mut self, kind: DatasetKind) {
        let stale: Vec<DatasetKind> = self
            .compiled
            .iter()
            .copied()
            .filter(|d| *d != kind && d.depends_on(kind))
            .collect();
        for dependent in stale {
            tracing::info!(
                dataset = dependent.name(),
                changed = kind.name(),
                "dropping compiled dataset; it must be compiled again"
            );
            self.compiled.remove(&dependent);
            self.warnings.remove(&dependent);
            self.bases.remove(&dependent);
            if dependent.namespace() != kind.namespace() {
                self.committed.remove(dependent.namespace());
            }
        }
    }

    // -----------------------------------------------------------------------
    // Convenience
    // -----------------------------------------------------------------------

    /// Stage and commit in one step.
    pub fn compile(&mut self, kind: DatasetKind, text: &str) -> Result<&[Warning], CompileError> {
        let staged = self.stage(kind, text)?;
        self.commit(staged);
        Ok(self.warnings(kind))
    }

    /// Compile `kind` from its configured file. A missing file is an error.
    pub fn compile_from(&mut self, kind: DatasetKind, source: &dyn SourceProvider) -> Result<(), DataLoadError> {
        let path = self.config.file_for(kind).to_string();
        let text = source.require(&path)?;
        self.compile(kind, &text)?;
        Ok(())
    }

    /// Compile every kind whose file exists, in dependency order. Returns
    /// the kinds compiled. A present file whose dependencies were skipped
    /// fails with [`CompileError::MissingDependency`].
    pub fn compile_all(&mut self, source: &dyn SourceProvider) -> Result<Vec<DatasetKind>, DataLoadError> {
        let mut done = Vec::new();
        for kind in DatasetKind::ALL {
            let path = self.config.file_for(kind).to_string();
            let Some(text) = source.read(&path)? else {
                tracing::debug!(dataset = kind.name(), path = %path, "no source; skipped");
                continue;
            };
            self.compile(kind, &text)?;
            done.push(kind);
        }
        Ok(done)
    }

    /// Stage independent datasets in parallel, then commit them in input
    /// order. If any fails, none is committed.
    #[cfg(feature = "parallel")]
    pub fn compile_batch(&mut self, batch: &[(DatasetKind, &str)]) -> Result<(), CompileError> {
        use rayon::prelude::*;

        let staged: Vec<Staged> = batch
            .par_iter()
            .map(|(kind, text)| self.stage(*kind, text))
            .collect::<Result<_, _>>()?;
        for staged in staged {
            self.commit(staged);
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    /// Hand every committed store, then the message tables, to `sink`.
    pub fn persist(&self, sink: &mut dyn PersistenceSink) -> Result<(), PersistError> {
        let mut written = BTreeSet::new();
        for kind in self.compiled() {
            if !written.insert(kind.output_key()) {
                continue;
            }
            if let Some(store) = self.committed.get(kind.namespace()) {
                sink.persist(kind.output_key(), store)?;
            }
        }
        sink.persist_messages(&self.messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::MemorySource;
    use pbsc_core::messages::MessageTable;
    use pbsc_core::persist::MemorySink;

    const TYPES: &str = "[NORMAL]\nName = Normal\n[FIRE]\nName = Fire\nWeaknesses = WATER\n[WATER]\nName = Water\n";
    const MOVES: &str = "[EMBER]\nName = Ember\nType = FIRE\nCategory = Special\nPower = 40\n";

    fn session() -> Session {
        Session::new(CompilerConfig::default())
    }

    // -----------------------------------------------------------------------
    // Kinds
    // -----------------------------------------------------------------------

    #[test]
    fn all_is_a_valid_compile_order() {
        for (i, kind) in DatasetKind::ALL.iter().enumerate() {
            for dependency in kind.dependencies() {
                let at = DatasetKind::ALL.iter().position(|k| k == dependency).unwrap();
                assert!(at < i, "{} listed before {}", kind.name(), dependency.name());
            }
            assert_eq!(DatasetKind::from_name(kind.name()), Some(*kind));
        }
    }

    #[test]
    fn every_kind_builds_with_the_default_catalog() {
        let catalog = Arc::new(Catalog::default());
        for kind in DatasetKind::ALL {
            let dataset = kind.build(&catalog).unwrap();
            assert_eq!(dataset.namespace(), kind.namespace(), "{}", kind.name());
        }
    }

    #[test]
    fn dependencies_are_transitive() {
        assert!(DatasetKind::Trainer.depends_on(DatasetKind::Type));
        assert!(DatasetKind::SpeciesForm.depends_on(DatasetKind::Move));
        assert!(!DatasetKind::Type.depends_on(DatasetKind::Move));
    }

    // -----------------------------------------------------------------------
    // Stage / commit
    // -----------------------------------------------------------------------

    #[test]
    fn dependency_must_be_committed_first() {
        let session = session();
        let result = session.stage(DatasetKind::Move, MOVES);
        assert!(matches!(
            result,
            Err(CompileError::MissingDependency { dataset, dependency })
                if dataset == "Move" && dependency == "Type"
        ));
    }

    #[test]
    fn staging_leaves_the_session_untouched() {
        let mut session = session();
        session.compile(DatasetKind::Type, TYPES).unwrap();
        let staged = session.stage(DatasetKind::Move, MOVES).unwrap();
        assert!(session.store(MOVE).is_none());
        assert!(session.messages().get(MessageTable::Moves).is_none());

        session.commit(staged);
        assert!(session.store(MOVE).unwrap().exists(&"EMBER".into()));
        assert!(session.messages().get(MessageTable::Moves).unwrap().contains("Ember"));
        assert!(session.messages().get(MessageTable::Types).unwrap().contains("Fire"));
    }

    #[test]
    fn later_datasets_resolve_against_committed_stores() {
        let mut session = session();
        session.compile(DatasetKind::Type, TYPES).unwrap();
        let result = session.compile(DatasetKind::Move, "[BUBBLE]\nName = Bubble\nType = ICE\n");
        match result {
            Err(CompileError::Reference { namespace, value, .. }) => {
                assert_eq!(namespace, "Type");
                assert_eq!(value, "ICE");
            }
            other => panic!("expected reference error, got {other:?}"),
        }
        assert!(!session.is_compiled(DatasetKind::Move));
    }

    #[test]
    fn recompiling_drops_dependents() {
        let mut session = session();
        session.compile(DatasetKind::Type, TYPES).unwrap();
        session.compile(DatasetKind::Move, MOVES).unwrap();
        session.compile(DatasetKind::Type, TYPES).unwrap();
        assert!(session.is_compiled(DatasetKind::Type));
        assert!(!session.is_compiled(DatasetKind::Move));
        assert!(session.store(MOVE).is_none());
    }

    // -----------------------------------------------------------------------
    // Sources and persistence
    // -----------------------------------------------------------------------

    #[test]
    fn compile_all_skips_missing_sources() {
        let source = MemorySource::new()
            .with("types.txt", TYPES)
            .with("moves.txt", MOVES)
            .with("town_map.txt", "[0]\nName = Essen\nFilename = map0.png\n");
        let mut session = session();
        let done = session.compile_all(&source).unwrap();
        assert_eq!(done, vec![DatasetKind::TownMap, DatasetKind::Type, DatasetKind::Move]);
    }

    #[test]
    fn compile_all_reports_skipped_dependencies() {
        let source = MemorySource::new().with("moves.txt", MOVES);
        let result = session().compile_all(&source);
        assert!(matches!(
            result,
            Err(DataLoadError::Compile(CompileError::MissingDependency { .. }))
        ));
    }

    #[test]
    fn compile_from_requires_the_file() {
        let mut session = session();
        let result = session.compile_from(DatasetKind::Type, &MemorySource::new());
        assert!(matches!(result, Err(DataLoadError::MissingSource { path }) if path == "types.txt"));
    }

    #[test]
    fn persist_hands_over_every_store_and_the_messages() {
        let mut session = session();
        session.compile(DatasetKind::Type, TYPES).unwrap();
        session.compile(DatasetKind::Move, MOVES).unwrap();
        let mut sink = MemorySink::new();
        session.persist(&mut sink).unwrap();
        assert_eq!(sink.stores.keys().collect::<Vec<_>>(), ["moves", "types"]);
        assert_eq!(sink.stores["types"].len(), 3);
        assert!(sink.messages.unwrap().get(MessageTable::Types).is_some());
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn batch_commits_in_input_order() {
        let mut session = session();
        session
            .compile_batch(&[(DatasetKind::Type, TYPES), (DatasetKind::Ability, "[STENCH]\nName = Stench\n")])
            .unwrap();
        assert!(session.is_compiled(DatasetKind::Type));
        assert!(session.is_compiled(DatasetKind::Ability));

        let failed = session.compile_batch(&[(DatasetKind::Move, MOVES), (DatasetKind::Item, "[POTION]\n")]);
        assert!(failed.is_err());
        assert!(!session.is_compiled(DatasetKind::Move));
    }
}
