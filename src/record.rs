//! Employee records, the shape exchanged with loaders, savers and reports.

use log::{debug, warn};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

use crate::error::TreeError;
use crate::iter::NodeRef;
use crate::tree::AvlTree;

/// Payload carried by every roster node. Stored and returned verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Employee {
    pub name: String,
    pub date_of_birth: String,
    pub place_of_birth: String,
}

/// A flat employee record as it appears in data files:
/// an object with the fields `ID`, `Name`, `Date of Birth` and `Place of Birth`.
///
/// `ID` is read from a JSON integer or from a string holding one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "ID", deserialize_with = "deserialize_id")]
    pub id: i64,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Date of Birth")]
    pub date_of_birth: String,
    #[serde(rename = "Place of Birth")]
    pub place_of_birth: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Number(i64),
    Text(String),
}

fn deserialize_id<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match RawId::deserialize(deserializer)? {
        RawId::Number(id) => Ok(id),
        RawId::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| de::Error::custom(format!("invalid employee id {text:?}"))),
    }
}

impl Record {
    pub fn new(
        id: i64,
        name: impl Into<String>,
        date_of_birth: impl Into<String>,
        place_of_birth: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            date_of_birth: date_of_birth.into(),
            place_of_birth: place_of_birth.into(),
        }
    }

    /// Splits the record into the key and payload stored in the tree.
    pub fn into_entry(self) -> (i64, Employee) {
        (
            self.id,
            Employee {
                name: self.name,
                date_of_birth: self.date_of_birth,
                place_of_birth: self.place_of_birth,
            },
        )
    }

    pub fn from_entry(id: i64, employee: &Employee) -> Self {
        Self {
            id,
            name: employee.name.clone(),
            date_of_birth: employee.date_of_birth.clone(),
            place_of_birth: employee.place_of_birth.clone(),
        }
    }
}

impl From<NodeRef<'_, i64, Employee>> for Record {
    fn from(node: NodeRef<'_, i64, Employee>) -> Self {
        Self::from_entry(*node.key(), node.value())
    }
}

/// Links of one node, by id. The root has no parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeLinks {
    pub id: i64,
    pub parent: Option<i64>,
    pub left: Option<i64>,
    pub right: Option<i64>,
}

/// Employees keyed by id.
pub type Roster = AvlTree<i64, Employee>;

/// Result of [`Roster::load`].
#[derive(Debug)]
pub struct LoadReport {
    pub roster: Roster,
    /// Ids of records that were skipped because an earlier record had the same id.
    pub duplicates: Vec<i64>,
}

impl AvlTree<i64, Employee> {
    /// Builds a roster from records in sequence order.
    /// A record whose id is already present is reported and skipped.
    pub fn load<I>(records: I) -> LoadReport
    where
        I: IntoIterator<Item = Record>,
    {
        let (roster, duplicates) = Self::bulk_load(records.into_iter().map(Record::into_entry));
        for id in &duplicates {
            warn!("skipping record with duplicate id {id}");
        }
        LoadReport { roster, duplicates }
    }

    pub fn add_record(&mut self, record: Record) -> Result<(), TreeError> {
        let (id, employee) = record.into_entry();
        self.insert(id, employee).inspect_err(|_| {
            debug!("rejected record with duplicate id {id}");
        })
    }

    pub fn find_record(&self, id: i64) -> Result<Record, TreeError> {
        self.search(&id).map(Record::from)
    }

    /// Removes the employee with the given id and returns its record.
    pub fn remove_record(&mut self, id: i64) -> Result<Record, TreeError> {
        let (id, employee) = self.remove(&id)?;
        debug!("removed employee {id}");
        Ok(Record::from_entry(id, &employee))
    }

    /// Records in ascending id order, the order used for saving.
    pub fn records_inorder(&self) -> Vec<Record> {
        self.iter_inorder().map(Record::from).collect()
    }

    pub fn records_level_order(&self) -> Vec<Record> {
        self.iter_level_order().map(Record::from).collect()
    }

    /// Parent and child ids of every node, in level order.
    pub fn links_level_order(&self) -> Vec<NodeLinks> {
        self.iter_level_order()
            .map(|node| NodeLinks {
                id: *node.key(),
                parent: node.parent().map(|n| *n.key()),
                left: node.left().map(|n| *n.key()),
                right: node.right().map(|n| *n.key()),
            })
            .collect()
    }
}
