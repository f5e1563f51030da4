//! Random dungeon data: tile layouts per tileset and generation parameters
//! per area, where `[AREA,n]` versions fall back on version 0 of the area.

use super::plain::Plain;
use super::{DUNGEON_PARAMETERS, DUNGEON_TILESET};
use pbsc_core::compiler::{Dataset, HookContext};
use pbsc_core::error::CompileError;
use pbsc_core::id::Identifier;
use pbsc_core::record::Record;
use pbsc_core::resolve::{Inherit, inherit, split_variant};
use pbsc_core::schema::{Namespace, SECTION_NAME, Schema, TypeSpec};
use pbsc_core::store::DataStore;
use pbsc_core::value::Value;

/// `dungeon_tilesets.txt`: which tiles of a tileset make up a random
/// dungeon.
pub fn dungeon_tilesets() -> Result<Plain, CompileError> {
    let schema = Schema::builder(DUNGEON_TILESET)
        .field(SECTION_NAME, "id", "u")
        .field("Autotile", "autotile", "^us")
        .field("Tile", "tile", "^us")
        .field("SnapToLargeGrid", "snap_to_large_grid", "b")
        .field("LargeVoidTiles", "large_void_tiles", "b")
        .field("LargeWallTiles", "large_wall_tiles", "b")
        .field("LargeFloorTiles", "large_floor_tiles", "b")
        .field("DoubleWalls", "double_walls", "b")
        .field("FloorPatchUnderWalls", "floor_patch_under_walls", "b")
        .field("ThinNorthWallOffset", "thin_north_wall_offset", "i")
        .field("Flags", "flags", "*s")
        .build()?;
    Ok(Plain::new(schema, &[]))
}

/// `dungeon_parameters.txt`: layout settings per dungeon area. `[AREA]` is
/// version 0 of an area; `[AREA,n]` is version `n` and takes every setting
/// it leaves out from version 0.
pub struct DungeonParameters {
    schema: Schema,
    inheritance: Vec<Inherit>,
}

impl DungeonParameters {
    pub fn new() -> Result<Self, CompileError> {
        let schema = Schema::builder(DUNGEON_PARAMETERS)
            .field(SECTION_NAME, "id", "mV")
            .field("DungeonSize", "dungeon_size", "uu")
            .field("CellSize", "cell_size", "uu")
            .field("MinRoomSize", "min_room_size", "uu")
            .field("MaxRoomSize", "max_room_size", "uu")
            .field("CorridorWidth", "corridor_width", "v")
            .field("ShiftCorridors", "random_corridor_shift", "b")
            .field("NodeLayout", "node_layout", "m")
            .field("RoomLayout", "room_layout", "m")
            .field("RoomChance", "room_chance", "v")
            .bounded(0, 100)
            .field("ExtraConnections", "extra_connections_count", "u")
            .field("FloorPatches", "floor_patches", "vvu")
            .field("FloorDecorations", "floor_decorations", "uu")
            .field("VoidDecorations", "void_decorations", "uu")
            .field("RNGSeed", "rng_seed", "u")
            .field("Flags", "flags", "*s")
            .build()?;
        let inheritance = schema
            .fields()
            .filter(|f| !f.is_section_name())
            .map(|f| match f.spec {
                TypeSpec::Repeat(_) | TypeSpec::Lines(_) => Inherit::Collection(f.id),
                _ => Inherit::Scalar(f.id),
            })
            .collect();
        Ok(Self { schema, inheritance })
    }
}

impl Dataset for DungeonParameters {
    fn namespace(&self) -> Namespace {
        DUNGEON_PARAMETERS
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn local_validate(&self, record: &mut Record, cx: &mut HookContext<'_>) -> Result<(), CompileError> {
        let (area, version, id) = split_variant(&record.id, true)
            .ok_or_else(|| cx.grammar(format!("expected [area] or [area,version], got [{}]", record.id)))?;
        record.id = id;
        record.set("area", Value::sym(area));
        record.set("version", version);
        Ok(())
    }

    fn global_validate(&self, store: &mut DataStore, _cx: &mut HookContext<'_>) -> Result<(), CompileError> {
        let mut inherited = 0;
        for id in store.ids() {
            let Some(variant) = store.get(&id) else {
                continue;
            };
            if variant.u64("version").unwrap_or(0) == 0 {
                continue;
            }
            let Some(area) = variant.str("area") else {
                continue;
            };
            let Some(base) = store.get(&Identifier::from(area)).cloned() else {
                continue;
            };
            if let Some(variant) = store.get_mut(&id) {
                inherit(variant, &base, &self.inheritance);
                inherited += 1;
            }
        }
        tracing::debug!(inherited, "dungeon versions filled from their base area");
        Ok(())
    }
}
