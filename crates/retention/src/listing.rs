//! Overview listing wire types and age classification

use serde::Deserialize;

use crate::policy::Cutoffs;

/// One page of `user/{name}/overview`.
#[derive(Debug, Deserialize)]
pub struct Listing {
    pub data: ListingData,
}

#[derive(Debug, Deserialize)]
pub struct ListingData {
    /// Cursor for the next page; null or empty on the last page.
    #[serde(default)]
    pub after: Option<String>,
    #[serde(default)]
    pub children: Vec<Thing>,
}

#[derive(Debug, Deserialize)]
pub struct Thing {
    pub kind: String,
    pub data: ThingData,
}

#[derive(Debug, Deserialize)]
pub struct ThingData {
    /// Fullname, e.g. `t1_abc123`. This is what `api/del` takes.
    pub name: String,
    pub created_utc: f64,
}

/// Entry kinds that can expire. Other listing kinds are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Comment,
    Post,
}

impl EntryKind {
    pub fn from_kind(kind: &str) -> Option<Self> {
        match kind {
            "t1" => Some(EntryKind::Comment),
            "t3" => Some(EntryKind::Post),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            EntryKind::Comment => "comment",
            EntryKind::Post => "post",
        }
    }
}

/// An entry queued for deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionTarget {
    pub name: String,
    pub kind: EntryKind,
    /// Creation time, unix seconds.
    pub created_utc: i64,
}

/// Queue `thing` if it is older than the cutoff for its kind.
pub fn classify(thing: &Thing, cutoffs: &Cutoffs) -> Option<RetentionTarget> {
    let kind = EntryKind::from_kind(&thing.kind)?;
    let cutoff = match kind {
        EntryKind::Comment => cutoffs.comments,
        EntryKind::Post => cutoffs.posts,
    }?;

    let created_utc = thing.data.created_utc as i64;
    (created_utc < cutoff).then(|| RetentionTarget {
        name: thing.data.name.clone(),
        kind,
        created_utc,
    })
}
