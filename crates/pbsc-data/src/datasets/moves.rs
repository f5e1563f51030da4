use super::{MOVE, TYPE, texts};
use crate::catalog::{MOVE_CATEGORY, TARGET};
use pbsc_core::compiler::{Dataset, HookContext};
use pbsc_core::error::{CompileError, WarningKind};
use pbsc_core::messages::MessageTable;
use pbsc_core::record::Record;
use pbsc_core::schema::{Namespace, SECTION_NAME, Schema};
use pbsc_core::store::DataStore;
use pbsc_core::value::Value;

const STATUS: &str = "Status";

/// `moves.txt`. A move's category and base damage must agree: Status
/// moves deal no damage, and a damaging move with no power is turned into a
/// Status move.
pub struct Moves {
    schema: Schema,
}

impl Moves {
    pub fn new() -> Result<Self, CompileError> {
        let schema = Schema::builder(MOVE)
            .field(SECTION_NAME, "id", "m")
            .field("Name", "real_name", "s")
            .enum_field("Type", "type", "e", &[TYPE])
            .enum_field("Category", "category", "e", &[MOVE_CATEGORY])
            .field("Power", "base_damage", "u")
            .field("Accuracy", "accuracy", "u")
            .bounded(0, 100)
            .field("TotalPP", "total_pp", "u")
            .enum_field("Target", "target", "e", &[TARGET])
            .field("Priority", "priority", "i")
            .field("FunctionCode", "function_code", "s")
            .field("Flags", "flags", "*s")
            .field("EffectChance", "effect_chance", "u")
            .bounded(0, 100)
            .field("Description", "real_description", "q")
            .build()?;
        Ok(Self { schema })
    }
}

impl Dataset for Moves {
    fn namespace(&self) -> Namespace {
        MOVE
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn local_validate(&self, record: &mut Record, cx: &mut HookContext<'_>) -> Result<(), CompileError> {
        let is_status = record.str("category").is_none_or(|c| c == STATUS);
        let power = record.u64("base_damage").unwrap_or(0);
        if is_status && power != 0 {
            cx.at_field("Power");
            return Err(cx.consistency(format!(
                "move {} is a Status move with a non-zero base damage",
                record.id
            )));
        }
        if !is_status && power == 0 {
            cx.warn(
                WarningKind::Corrected,
                format!(
                    "move {} is Physical or Special but has a base damage of 0, changing it to a Status move",
                    record.id
                ),
            );
            record.set("category", Value::sym(STATUS));
        }
        Ok(())
    }

    fn global_validate(&self, store: &mut DataStore, cx: &mut HookContext<'_>) -> Result<(), CompileError> {
        cx.messages.set_unique(MessageTable::Moves, texts(store, "real_name"));
        cx.messages
            .set_unique(MessageTable::MoveDescriptions, texts(store, "real_description"));
        Ok(())
    }
}
