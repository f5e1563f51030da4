use super::{PHONE_CONTACT, TRAINER_TYPE};
use pbsc_core::compiler::{Dataset, HookContext};
use pbsc_core::error::CompileError;
use pbsc_core::id::Identifier;
use pbsc_core::messages::MessageTable;
use pbsc_core::record::Record;
use pbsc_core::schema::{Namespace, SECTION_NAME, Schema, TypeSpec};
use pbsc_core::store::DataStore;
use pbsc_core::value::Value;

const DEFAULT_CONTACT: &str = "default";

const MESSAGE_FIELDS: [&str; 10] = [
    "intro",
    "intro_morning",
    "intro_afternoon",
    "intro_evening",
    "body",
    "body1",
    "body2",
    "battle_request",
    "battle_remind",
    "end",
];

/// `phone.txt`: what trainers say when they call. `[default]` holds the
/// lines used by trainers without a section of their own; every other
/// section is `[TYPE,Name,version]`.
pub struct PhoneContacts {
    schema: Schema,
    contact: TypeSpec,
}

impl PhoneContacts {
    pub fn new() -> Result<Self, CompileError> {
        let schema = Schema::builder(PHONE_CONTACT)
            .field(SECTION_NAME, "id", "q")
            .field("Intro", "intro", "^q")
            .field("IntroMorning", "intro_morning", "^q")
            .field("IntroAfternoon", "intro_afternoon", "^q")
            .field("IntroEvening", "intro_evening", "^q")
            .field("Body", "body", "^q")
            .field("Body1", "body1", "^q")
            .field("Body2", "body2", "^q")
            .field("BattleRequest", "battle_request", "^q")
            .field("BattleRemind", "battle_remind", "^q")
            .field("End", "end", "^q")
            .build()?;
        let contact = TypeSpec::parse("esU", &[TRAINER_TYPE]).map_err(|e| CompileError::schema(PHONE_CONTACT, e))?;
        Ok(Self { schema, contact })
    }
}

impl Dataset for PhoneContacts {
    fn namespace(&self) -> Namespace {
        PHONE_CONTACT
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn local_validate(&self, record: &mut Record, cx: &mut HookContext<'_>) -> Result<(), CompileError> {
        let name = record.id.to_string();
        if name.trim().eq_ignore_ascii_case(DEFAULT_CONTACT) {
            record.id = Identifier::from(DEFAULT_CONTACT);
            record.set("trainer_type", Value::sym(DEFAULT_CONTACT));
            return Ok(());
        }
        let key = cx.decode(&name, &self.contact)?;
        let trainer_type = key.at(0).as_str().unwrap_or_default().to_string();
        let real_name = key.at(1).as_str().unwrap_or_default().to_string();
        let version = key.at(2).as_u64().unwrap_or(0);
        record.id = Identifier::Compound(vec![
            Identifier::from(trainer_type.as_str()),
            Identifier::from(real_name.as_str()),
            Identifier::Num(version),
        ]);
        record.set("trainer_type", Value::sym(trainer_type));
        record.set("real_name", Value::str(real_name));
        record.set("version", version);
        Ok(())
    }

    fn global_validate(&self, store: &mut DataStore, cx: &mut HookContext<'_>) -> Result<(), CompileError> {
        let lines: Vec<String> = store
            .each()
            .flat_map(|contact| MESSAGE_FIELDS.iter().flat_map(|f| contact.list(f)))
            .filter_map(|line| line.as_str().map(str::to_string))
            .collect();
        cx.messages.set_unique(MessageTable::PhoneMessages, lines);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pbsc_core::symbols::SymbolMap;
    use pbsc_core::test_utils::compile_str;

    const TEXT: &str = "\
[Default]
Intro = Hello. This is \\TN.
Intro = Good day, \\PN! It's \\TN.
Body = How are your Pokémon doing?
End = Bye!
[CAMPER,Jeff]
Intro = Hey, it's Jeff!
Intro = Hello. This is \\TN.
[CAMPER,Jeff,1]
BattleRequest = Want a rematch?
";

    fn run(text: &str) -> Result<pbsc_core::compiler::Compiled, CompileError> {
        let symbols = SymbolMap::new().with(TRAINER_TYPE, &["CAMPER", "PICNICKER"]);
        compile_str(&PhoneContacts::new().unwrap(), "phone.txt", text, &symbols)
    }

    #[test]
    fn default_and_trainer_contacts() {
        let out = run(TEXT).unwrap();
        assert_eq!(out.store.len(), 3);
        let default = out.store.get(&"default".into()).unwrap();
        assert_eq!(default.list("intro").len(), 2);
        assert_eq!(default.str("trainer_type"), Some("default"));

        let jeff = Identifier::Compound(vec!["CAMPER".into(), "Jeff".into(), Identifier::Num(1)]);
        let rematch = out.store.get(&jeff).unwrap();
        assert_eq!(rematch.u64("version"), Some(1));
        assert_eq!(rematch.str("real_name"), Some("Jeff"));
    }

    #[test]
    fn every_line_is_a_message_once() {
        let out = run(TEXT).unwrap();
        let messages = out.messages.get(MessageTable::PhoneMessages).unwrap();
        assert_eq!(messages.len(), 6);
        assert!(messages.contains("Want a rematch?"));
    }

    #[test]
    fn unknown_trainer_type_fails() {
        assert!(matches!(run("[HIKER,Tim]\nEnd = Bye\n"), Err(CompileError::Reference { .. })));
    }

    #[test]
    fn contact_defined_twice_fails() {
        let result = run("[CAMPER,Jeff]\nEnd = A\n[CAMPER,Jeff,0]\nEnd = B\n");
        assert!(matches!(result, Err(CompileError::Duplicate { .. })));
    }
}
