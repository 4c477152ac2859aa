//! JSON store with change notifications and path lenses.
//!
//! A [`Store`] holds one JSON document. Every write emits a `"change"`
//! record on the store's emitter:
//!
//! ```json
//! { "type": "update", "key": "user.name", "value": "ada" }
//! ```
//!
//! Keys are dot-separated object paths; the empty path is the whole
//! document. [`Store::lens`] narrows the change stream to one path.

use emitterify_core::types::{shared, Shared};
use emitterify_core::{AsEmitter, Emitter, Node, Value};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};

/// Separator between path segments
pub const PATH_SEPARATOR: char = '.';

/// What happened at a key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Update,
    Remove,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Update => "update",
            ChangeKind::Remove => "remove",
        }
    }
}

/// One change record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Change {
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    pub key: String,
    #[serde(default)]
    pub value: Value,
}

impl Change {
    pub fn update(key: impl Into<String>, value: Value) -> Self {
        Self {
            kind: ChangeKind::Update,
            key: key.into(),
            value,
        }
    }

    pub fn remove(key: impl Into<String>, value: Value) -> Self {
        Self {
            kind: ChangeKind::Remove,
            key: key.into(),
            value,
        }
    }

    /// Read a record back from its JSON form
    pub fn from_value(value: &Value) -> Option<Self> {
        Change::deserialize(value).ok()
    }
}

impl From<Change> for Value {
    fn from(change: Change) -> Value {
        serde_json::json!({
            "type": change.kind.as_str(),
            "key": change.key,
            "value": change.value,
        })
    }
}

/// Whether `key` is `path` or lies underneath it
pub fn within(path: &str, key: &str) -> bool {
    if path.is_empty() {
        return true;
    }
    match key.strip_prefix(path) {
        Some(rest) => rest.is_empty() || rest.starts_with(PATH_SEPARATOR),
        None => false,
    }
}

/// A JSON document that announces its writes
#[derive(Clone)]
pub struct Store {
    doc: Shared<Value>,
    emitter: Emitter,
}

impl Store {
    pub fn new(doc: Value) -> Self {
        Self::with_emitter(doc, Emitter::new())
    }

    /// Create a store that announces changes on an existing emitter
    pub fn with_emitter(doc: Value, emitter: Emitter) -> Self {
        Self {
            doc: shared(doc),
            emitter,
        }
    }

    /// The value at `path`, `Null` if absent
    pub fn get(&self, path: &str) -> Value {
        let doc = self.doc.borrow();
        segments(path)
            .try_fold(&*doc, |node, segment| node.get(segment))
            .cloned()
            .unwrap_or(Value::Null)
    }

    /// A copy of the whole document
    pub fn snapshot(&self) -> Value {
        self.doc.borrow().clone()
    }

    /// Write `value` at `path`, creating intermediate objects
    pub fn set(&self, path: &str, value: impl Into<Value>) -> Result<Change> {
        check(path)?;
        let value = value.into();
        {
            let mut doc = self.doc.borrow_mut();
            match path.rsplit_once(PATH_SEPARATOR) {
                _ if path.is_empty() => *doc = value.clone(),
                Some((parent_path, leaf)) => {
                    let parent = descend(&mut doc, path, parent_path)?;
                    object(parent, path, parent_path)?.insert(leaf.to_string(), value.clone());
                }
                None => {
                    object(&mut doc, path, "")?.insert(path.to_string(), value.clone());
                }
            }
        }
        Ok(self.announce(Change::update(path, value)))
    }

    /// Delete the value at `path`, returning the change if there was one
    pub fn remove(&self, path: &str) -> Option<Change> {
        if path.is_empty() || check(path).is_err() {
            return None;
        }
        let (parent, leaf) = path.rsplit_once(PATH_SEPARATOR).unwrap_or(("", path));
        let removed = detach(&mut self.doc.borrow_mut(), parent, leaf)?;
        Some(self.announce(Change::remove(path, removed)))
    }

    /// A node tracking `path`
    ///
    /// Settled with an `update` record for the current value at `path`, then
    /// fed every change whose key is `path` or nested under it. Stopping the
    /// lens ends its subscription to the store.
    pub fn lens(&self, path: &str) -> Node {
        let view = Node::detached();
        view.next(Change::update(path, self.get(path)));

        let prefix = path.to_string();
        let feed = self.emitter.observe("change").filter(move |record, _, _| {
            record
                .get("key")
                .and_then(Value::as_str)
                .is_some_and(|key| within(&prefix, key))
        });
        let target = view.clone();
        feed.each(move |record, _, _| target.next(record.clone()));

        let subscription = feed.source();
        view.emitter()
            .once("stop", move |_, _| subscription.unsubscribe());
        view
    }

    fn announce(&self, change: Change) -> Change {
        tracing::debug!("{:?} '{}'", change.kind, change.key);
        self.emitter.emit("change", change.clone());
        change
    }
}

impl AsEmitter for Store {
    fn emitter(&self) -> &Emitter {
        &self.emitter
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("doc", &self.doc.try_borrow().map(|d| d.clone()).ok())
            .finish()
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split(PATH_SEPARATOR).filter(|s| !s.is_empty())
}

fn check(path: &str) -> Result<()> {
    if !path.is_empty() && path.split(PATH_SEPARATOR).any(str::is_empty) {
        return Err(StoreError::InvalidPath(path.to_string()));
    }
    Ok(())
}

/// Walk to `parent`, creating empty objects for missing segments
fn descend<'a>(doc: &'a mut Value, path: &str, parent: &str) -> Result<&'a mut Value> {
    let mut node = doc;
    let mut walked: usize = 0;
    for segment in parent.split(PATH_SEPARATOR) {
        let prefix = &parent[..walked.saturating_sub(1)];
        let map = object(node, path, prefix)?;
        node = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Default::default()));
        walked += segment.len() + 1;
    }
    Ok(node)
}

fn detach(doc: &mut Value, parent: &str, leaf: &str) -> Option<Value> {
    segments(parent)
        .try_fold(doc, |node, segment| node.get_mut(segment))?
        .as_object_mut()?
        .remove(leaf)
}

fn object<'a>(
    node: &'a mut Value,
    path: &str,
    segment: &str,
) -> Result<&'a mut serde_json::Map<String, Value>> {
    if node.is_null() {
        *node = Value::Object(Default::default());
    }
    node.as_object_mut().ok_or_else(|| StoreError::NotAnObject {
        path: path.to_string(),
        segment: segment.to_string(),
    })
}
