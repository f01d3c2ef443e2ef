//! The attribute bag: the in-memory form of one document.
//!
//! An [`AttributeBag`] stores a sparse set of [`Value`]s keyed by the fields its
//! [`Schema`] declares. Bags are shared through [`DocumentRef`] handles so that an
//! embedded document can be mutated through any handle and still dirty the documents
//! embedding it.

use bson::DateTime;
use indexmap::IndexMap;
use serde_json::{Map, Value as JsonValue};
use std::{
    cell::RefCell,
    fmt,
    rc::{Rc, Weak},
    sync::Arc,
};

use crate::{
    association::AssociationRef,
    codec::{self, EncodeMode},
    error::{DocumentStoreError, DocumentStoreResult},
    registry::TypeRegistry,
    schema::{CREATED_DATE, DocumentType, PRIMARY_KEY, Schema},
    store::DocumentStore,
    tracker::{ChangeTracker, DirtyKind},
    value::{DocumentId, Value},
};

pub(crate) type BagCell = RefCell<AttributeBag>;

/// Fields that can be assigned once and never changed afterwards.
const WRITE_ONCE: [&str; 2] = [PRIMARY_KEY, CREATED_DATE];

/// A schema-constrained set of field values with change tracking.
#[derive(Debug)]
pub struct AttributeBag {
    pub(crate) schema: Arc<Schema>,
    pub(crate) attributes: IndexMap<String, Value>,
    pub(crate) tracker: ChangeTracker,
    this: Weak<BagCell>,
    persisted: bool,
    deleted: bool,
}

impl AttributeBag {
    fn new(schema: Arc<Schema>, this: Weak<BagCell>) -> Self {
        Self {
            schema,
            attributes: IndexMap::new(),
            tracker: ChangeTracker::new(),
            this,
            persisted: false,
            deleted: false,
        }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.attributes
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }

    pub fn tracker(&self) -> &ChangeTracker {
        &self.tracker
    }

    /// The assigned primary key, if any.
    pub fn primary_key(&self) -> Option<&Value> {
        self.attributes
            .get(PRIMARY_KEY)
            .filter(|value| !value.is_null())
    }

    pub fn is_persisted(&self) -> bool {
        self.persisted
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    fn has(&self, name: &str) -> bool {
        self.attributes
            .get(name)
            .is_some_and(|value| !value.is_null())
    }

    fn ensure_writable(&self, name: &str, value: &Value) -> DocumentStoreResult<()> {
        if self.deleted {
            return Err(DocumentStoreError::DocumentDeleted(self.schema.type_name().to_string()));
        }

        if !self.schema.declares(name) {
            return Err(DocumentStoreError::UnknownField(
                name.to_string(),
                self.schema.type_name().to_string(),
            ));
        }

        if WRITE_ONCE.contains(&name) {
            if let Some(current) = self.attributes.get(name) {
                if !current.is_null() && current != value {
                    return Err(DocumentStoreError::ImmutableField(name.to_string()));
                }
            }
        }

        let this = self.this.as_ptr();
        let cyclic = children_of(value)
            .iter()
            .any(|child| match child {
                Child::Document(document) => embeds(document, this),
                Child::Association(_) => false,
            });

        if cyclic {
            return Err(DocumentStoreError::CyclicEmbedding(name.to_string()));
        }

        // Subscribing needs write access to every child.
        if children_of(value).iter().any(|child| !child.is_free()) {
            return Err(DocumentStoreError::DocumentInUse(name.to_string()));
        }

        Ok(())
    }

    /// Stores `value` under `name` and rewires child subscriptions.
    fn replace(&mut self, name: &str, value: Value) {
        let children = children_of(&value);

        if let Some(previous) = self.attributes.insert(name.to_string(), value) {
            for child in children_of(&previous) {
                child.detach(name, &self.this);
            }
        }

        for child in children {
            child.attach(name, self.this.clone());
        }
    }

    /// Assigns a field, marking it dirty when the value actually changed.
    pub(crate) fn set(&mut self, name: &str, value: Value) -> DocumentStoreResult<()> {
        self.ensure_writable(name, &value)?;

        let changed = self.attributes.get(name) != Some(&value);
        self.replace(name, value);

        if changed {
            self.mark_dirty(name, DirtyKind::Assigned);
        }

        Ok(())
    }

    /// Assigns a field without recording a change. Used when loading stored data.
    pub(crate) fn assign(&mut self, name: &str, value: Value) -> DocumentStoreResult<()> {
        self.ensure_writable(name, &value)?;
        self.replace(name, value);

        Ok(())
    }

    /// Records a change on `field` and propagates it to every owner.
    pub(crate) fn mark_dirty(&mut self, field: &str, kind: DirtyKind) {
        self.tracker.record(field, kind);
        self.tracker.subscribers().notify();
    }

    /// Resets the dirty baseline of this bag and of every embedded document.
    pub(crate) fn clear_changes(&mut self) {
        self.tracker.clear();

        for value in self.attributes.values() {
            for child in children_of(value) {
                if let Child::Document(document) = child {
                    if let Ok(mut bag) = document.0.try_borrow_mut() {
                        bag.clear_changes();
                    }
                }
            }
        }
    }

    /// Fills in the created date (first encode of an unstored bag only) and the primary
    /// key. Returns the fields that were assigned.
    pub(crate) fn bootstrap(&mut self) -> Vec<&'static str> {
        let mut assigned = Vec::new();

        if !self.persisted && !self.has(CREATED_DATE) {
            self.attributes
                .insert(CREATED_DATE.to_string(), Value::Timestamp(DateTime::now()));
            assigned.push(CREATED_DATE);
        }

        if !self.has(PRIMARY_KEY) {
            self.attributes.insert(
                PRIMARY_KEY.to_string(),
                Value::Id(DocumentId::generate(self.schema.id_strategy())),
            );
            assigned.push(PRIMARY_KEY);
        }

        self.persisted = true;
        assigned
    }

    /// Overwrites a bookkeeping field without change tracking.
    pub(crate) fn stamp(&mut self, name: &str, value: Value) {
        self.attributes.insert(name.to_string(), value);
    }

    pub(crate) fn mark_persisted(&mut self) {
        self.persisted = true;
    }

    pub(crate) fn mark_deleted(&mut self) {
        self.deleted = true;
    }

    pub(crate) fn ensure_live(&self) -> DocumentStoreResult<()> {
        if self.deleted {
            return Err(DocumentStoreError::DocumentDeleted(self.schema.type_name().to_string()));
        }

        Ok(())
    }

    fn to_json(&self) -> JsonValue {
        JsonValue::Object(
            self.attributes
                .iter()
                .map(|(name, value)| (name.clone(), value.to_json()))
                .collect::<Map<_, _>>(),
        )
    }
}

/// A value nested in a field that tracks its own changes.
pub(crate) enum Child {
    Document(DocumentRef),
    Association(AssociationRef),
}

impl Child {
    fn is_free(&self) -> bool {
        match self {
            Child::Document(document) => document.0.try_borrow_mut().is_ok(),
            Child::Association(association) => association.is_free(),
        }
    }

    fn attach(&self, field: &str, owner: Weak<BagCell>) {
        match self {
            Child::Document(document) => {
                if let Ok(mut bag) = document.0.try_borrow_mut() {
                    bag.tracker
                        .subscribers_mut()
                        .subscribe(field, owner);
                }
            }
            Child::Association(association) => association.attach(field, owner),
        }
    }

    fn detach(&self, field: &str, owner: &Weak<BagCell>) {
        match self {
            Child::Document(document) => {
                if let Ok(mut bag) = document.0.try_borrow_mut() {
                    bag.tracker
                        .subscribers_mut()
                        .unsubscribe(field, owner);
                }
            }
            Child::Association(association) => association.detach(field, owner),
        }
    }
}

/// Collects the documents and associations held by a value, looking inside containers
/// but not inside the documents themselves.
pub(crate) fn children_of(value: &Value) -> Vec<Child> {
    let mut children = Vec::new();
    collect_children(value, &mut children);
    children
}

fn collect_children(value: &Value, children: &mut Vec<Child>) {
    match value {
        Value::Embedded(document) => children.push(Child::Document(document.clone())),
        Value::Association(association) => children.push(Child::Association(association.clone())),
        Value::Sequence(items) => items
            .iter()
            .for_each(|item| collect_children(item, children)),
        Value::Keyed(map) => map
            .values()
            .for_each(|item| collect_children(item, children)),
        _ => {}
    }
}

/// Whether `document` is `target` or embeds it at any depth.
fn embeds(document: &DocumentRef, target: *const BagCell) -> bool {
    if std::ptr::eq(Rc::as_ptr(&document.0), target) {
        return true;
    }

    // A bag that is already mutably borrowed is on the current mutation path.
    let Ok(bag) = document.0.try_borrow() else {
        return true;
    };

    bag.attributes
        .values()
        .flat_map(children_of)
        .any(|child| match child {
            Child::Document(inner) => embeds(&inner, target),
            Child::Association(_) => false,
        })
}

/// A shared handle to an [`AttributeBag`].
///
/// Cloning the handle shares the bag. Equality compares the documents' types and
/// attributes, not their identity; use [`DocumentRef::ptr_eq`] for identity.
///
/// # Example
///
/// ```ignore
/// let address = DocumentRef::of::<Address>();
/// address.set("city", "Cambridge")?;
///
/// let user = DocumentRef::of::<User>();
/// user.set("address", &address)?;
///
/// // Changing the embedded document dirties the owner's field.
/// address.set("zip", "02140")?;
/// assert!(user.is_field_dirty("address"));
/// ```
#[derive(Clone)]
pub struct DocumentRef(pub(crate) Rc<BagCell>);

impl DocumentRef {
    /// Creates an empty, pristine document of the given schema.
    pub fn new(schema: Arc<Schema>) -> Self {
        Self(Rc::new_cyclic(|this| RefCell::new(AttributeBag::new(schema, this.clone()))))
    }

    /// Creates an empty document of type `T`.
    pub fn of<T: DocumentType>() -> Self {
        Self::new(T::schema())
    }

    pub fn schema(&self) -> Arc<Schema> {
        self.0.borrow().schema.clone()
    }

    pub fn type_name(&self) -> String {
        self.0.borrow().schema.type_name().to_string()
    }

    /// Assigns a declared field.
    ///
    /// # Errors
    ///
    /// - [`DocumentStoreError::UnknownField`] if the schema does not declare `name`
    /// - [`DocumentStoreError::ImmutableField`] when overwriting the primary key or created date
    /// - [`DocumentStoreError::CyclicEmbedding`] if the value embeds this document
    /// - [`DocumentStoreError::DocumentDeleted`] once the document was deleted
    pub fn set(&self, name: &str, value: impl Into<Value>) -> DocumentStoreResult<()> {
        let value = value.into();
        self.0.borrow_mut().set(name, value)
    }

    /// Returns a copy of the stored value, if the field was set.
    pub fn get(&self, name: &str) -> Option<Value> {
        self.0.borrow().get(name).cloned()
    }

    /// Returns the stored value or `default`.
    pub fn get_or(&self, name: &str, default: impl Into<Value>) -> Value {
        self.get(name).unwrap_or_else(|| default.into())
    }

    pub fn primary_key(&self) -> Option<Value> {
        self.0.borrow().primary_key().cloned()
    }

    pub fn id(&self) -> Option<DocumentId> {
        self.0
            .borrow()
            .primary_key()
            .and_then(Value::as_id)
    }

    pub fn is_dirty(&self) -> bool {
        self.0.borrow().tracker.is_dirty()
    }

    pub fn is_field_dirty(&self, name: &str) -> bool {
        self.0.borrow().tracker.is_field_dirty(name)
    }

    pub fn dirty_fields(&self) -> Vec<String> {
        self.0
            .borrow()
            .tracker
            .dirty()
            .map(|(field, _)| field.to_string())
            .collect()
    }

    pub fn is_persisted(&self) -> bool {
        self.0.borrow().is_persisted()
    }

    pub fn is_deleted(&self) -> bool {
        self.0.borrow().is_deleted()
    }

    /// Whether `owner` is subscribed to this document's changes.
    pub fn is_watched_by(&self, owner: &DocumentRef) -> bool {
        self.0
            .borrow()
            .tracker
            .subscribers()
            .contains(&owner.0)
    }

    /// Runs `f` with read access to the underlying bag.
    pub fn inspect<R>(&self, f: impl FnOnce(&AttributeBag) -> R) -> R {
        f(&self.0.borrow())
    }

    /// Encodes this document into its wire form. See [`codec::encode`].
    pub fn encode(&self, mode: EncodeMode) -> bson::Document {
        codec::encode(&mut self.0.borrow_mut(), mode)
    }

    /// Loads raw data into this document and resets its dirty baseline.
    pub fn populate(&self, raw: &bson::Document, registry: &TypeRegistry) -> DocumentStoreResult<()> {
        codec::populate(self, raw, registry)
    }

    /// Resets the dirty baseline of this document and every embedded document.
    pub fn clear_changes(&self) {
        self.0.borrow_mut().clear_changes();
    }

    /// Resolves the association stored under `field` through `store`.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::NotAReference`] if the field does not hold an
    /// association, plus every error of [`AssociationRef::resolve`].
    pub async fn resolve(&self, field: &str, store: &DocumentStore) -> DocumentStoreResult<DocumentRef> {
        let Some(Value::Association(association)) = self.get(field) else {
            return Err(DocumentStoreError::NotAReference(field.to_string()));
        };

        association.resolve(store).await
    }

    /// Renders the attributes for display. See [`Value::to_json`].
    pub fn to_json(&self) -> JsonValue {
        self.0.borrow().to_json()
    }

    pub fn ptr_eq(&self, other: &DocumentRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for DocumentRef {
    fn eq(&self, other: &Self) -> bool {
        if self.ptr_eq(other) {
            return true;
        }

        match (self.0.try_borrow(), other.0.try_borrow()) {
            (Ok(left), Ok(right)) => {
                left.schema.type_name() == right.schema.type_name()
                    && left.attributes == right.attributes
            }
            _ => false,
        }
    }
}

impl fmt::Debug for DocumentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(bag) => f
                .debug_struct("DocumentRef")
                .field("type", &bag.schema.type_name())
                .field("attributes", &bag.attributes)
                .finish(),
            Err(_) => f.write_str("DocumentRef(<borrowed>)"),
        }
    }
}
