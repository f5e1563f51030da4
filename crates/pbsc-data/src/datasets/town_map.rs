use super::TOWN_MAP;
use pbsc_core::compiler::{Dataset, HookContext};
use pbsc_core::error::CompileError;
use pbsc_core::messages::MessageTable;
use pbsc_core::schema::{Namespace, SECTION_NAME, Schema};
use pbsc_core::store::DataStore;

/// `town_map.txt`: one section per region, with a repeatable `Point` key
/// (`x, y, name, point of interest, fly destination`).
pub struct TownMap {
    schema: Schema,
}

impl TownMap {
    pub fn new() -> Result<Self, CompileError> {
        let schema = Schema::builder(TOWN_MAP)
            .field(SECTION_NAME, "id", "u")
            .field("Name", "real_name", "s")
            .field("Filename", "filename", "s")
            .field("Point", "point", "^uussUUUU")
            .build()?;
        Ok(Self { schema })
    }
}

impl Dataset for TownMap {
    fn namespace(&self) -> Namespace {
        TOWN_MAP
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn global_validate(&self, store: &mut DataStore, cx: &mut HookContext<'_>) -> Result<(), CompileError> {
        let mut regions: Vec<Option<String>> = Vec::new();
        let mut places = Vec::new();
        let mut descriptions = Vec::new();
        for region in store.each() {
            if let Some(index) = region.id.as_num().map(|n| n as usize) {
                if regions.len() <= index {
                    regions.resize(index + 1, None);
                }
                regions[index] = region.str("real_name").map(str::to_string);
            }
            for point in region.list("point") {
                places.extend(point.at(2).as_str().map(str::to_string));
                descriptions.extend(point.at(3).as_str().map(str::to_string));
            }
        }
        cx.messages.set(MessageTable::RegionNames, regions);
        cx.messages.set_unique(MessageTable::PlaceNames, places);
        cx.messages.set_unique(MessageTable::PlaceDescriptions, descriptions);
        Ok(())
    }
}
