//! Translatable text collected while compiling.
//!
//! Each dataset fills one or more [`MessageTable`]s during its global
//! validation. Tables are either indexed (position matters, gaps allowed)
//! or unique (deduplicated text, order of first appearance).

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MessageTable {
    Types,
    Abilities,
    AbilityDescriptions,
    Moves,
    MoveDescriptions,
    Items,
    ItemPlurals,
    ItemDescriptions,
    Species,
    FormNames,
    Categories,
    PokedexEntries,
    Ribbons,
    RibbonDescriptions,
    TrainerTypes,
    TrainerNames,
    TrainerLoseTexts,
    RegionNames,
    PlaceNames,
    PlaceDescriptions,
    PhoneMessages,
    StorageCreator,
    MapNames,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageList {
    Indexed(Vec<Option<String>>),
    Unique(Vec<String>),
}

impl MessageList {
    pub fn len(&self) -> usize {
        match self {
            MessageList::Indexed(items) => items.len(),
            MessageList::Unique(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Text at `index`, if set.
    pub fn get(&self, index: usize) -> Option<&str> {
        match self {
            MessageList::Indexed(items) => items.get(index)?.as_deref(),
            MessageList::Unique(items) => items.get(index).map(String::as_str),
        }
    }

    pub fn contains(&self, text: &str) -> bool {
        match self {
            MessageList::Indexed(items) => items.iter().flatten().any(|t| t == text),
            MessageList::Unique(items) => items.iter().any(|t| t == text),
        }
    }
}

/// The message tables of a compile session.
///
/// Every table a dataset writes is marked touched, so merging the messages
/// of one dataset into the session replaces exactly the tables that dataset
/// produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Messages {
    tables: BTreeMap<MessageTable, MessageList>,
    #[serde(skip)]
    touched: BTreeSet<MessageTable>,
}

impl Messages {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace `table` with an indexed list. `None` entries are gaps.
    pub fn set(&mut self, table: MessageTable, items: Vec<Option<String>>) {
        self.touched.insert(table);
        self.tables.insert(table, MessageList::Indexed(items));
    }

    /// Replace `table` with the distinct non-empty texts of `items`.
    pub fn set_unique<I, S>(&mut self, table: MessageTable, items: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tables.insert(table, MessageList::Unique(Vec::new()));
        self.add_unique(table, items);
    }

    /// Append the distinct non-empty texts of `items` not already in
    /// `table`.
    pub fn add_unique<I, S>(&mut self, table: MessageTable, items: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.touched.insert(table);
        let list = self
            .tables
            .entry(table)
            .or_insert_with(|| MessageList::Unique(Vec::new()));
        if let MessageList::Indexed(indexed) = list {
            *list = MessageList::Unique(indexed.drain(..).flatten().collect());
        }
        if let MessageList::Unique(existing) = list {
            for item in items {
                let item = item.into();
                if !item.is_empty() && !existing.contains(&item) {
                    existing.push(item);
                }
            }
        }
    }

    /// A copy of every table with nothing marked touched. Datasets that
    /// append to tables owned by an earlier dataset start from a fork.
    pub fn fork(&self) -> Messages {
        Messages {
            tables: self.tables.clone(),
            touched: BTreeSet::new(),
        }
    }

    pub fn get(&self, table: MessageTable) -> Option<&MessageList> {
        self.tables.get(&table)
    }

    pub fn tables(&self) -> impl Iterator<Item = (MessageTable, &MessageList)> {
        self.tables.iter().map(|(t, l)| (*t, l))
    }

    /// Tables written since this collector was created.
    pub fn touched(&self) -> impl Iterator<Item = MessageTable> + '_ {
        self.touched.iter().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Copy every table `other` touched into `self`, replacing what was
    /// there.
    pub fn merge_touched(&mut self, other: &Messages) {
        for table in &other.touched {
            match other.tables.get(table) {
                Some(list) => {
                    self.tables.insert(*table, list.clone());
                }
                None => {
                    self.tables.remove(table);
                }
            }
        }
    }
}
