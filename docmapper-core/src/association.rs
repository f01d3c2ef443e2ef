//! Lazy references to documents stored in other collections.
//!
//! An association stores only the foreign key of its target. The target is fetched
//! through the [`DocumentStore`] the first time it is resolved and memoized after that.

use bson::Document;
use serde_json::{Value as JsonValue, json};
use std::{cell::RefCell, fmt, rc::{Rc, Weak}};

use crate::{
    bag::{BagCell, DocumentRef},
    codec,
    error::{DocumentStoreError, DocumentStoreResult},
    schema::{DocumentType, PRIMARY_KEY},
    store::DocumentStore,
    tracker::Subscribers,
    value::Value,
};

/// Discriminator written on the wire form of an association.
pub const ASSOCIATION_MARKER: &str = "docmapper::HasOne";

#[derive(Debug)]
struct Association {
    target_type: String,
    local_field: Option<String>,
    foreign_key: String,
    foreign_key_value: Value,
    resolved: Option<DocumentRef>,
    subscribers: Subscribers,
}

/// A shared handle to a lazy one-to-one reference.
///
/// # Example
///
/// ```ignore
/// let owner = AssociationRef::to::<User>();
/// owner.associate(&user)?;
/// post.set("owner", &owner)?;
///
/// let user = post.resolve("owner", &store).await?;
/// ```
#[derive(Clone)]
pub struct AssociationRef(Rc<RefCell<Association>>);

impl AssociationRef {
    /// Creates an unassociated reference to documents of `target_type`, matched on
    /// `foreign_key`.
    pub fn new(target_type: impl Into<String>, foreign_key: impl Into<String>) -> Self {
        Self(Rc::new(RefCell::new(Association {
            target_type: target_type.into(),
            local_field: None,
            foreign_key: foreign_key.into(),
            foreign_key_value: Value::Null,
            resolved: None,
            subscribers: Subscribers::default(),
        })))
    }

    /// Creates a reference to a `T` matched on its primary key.
    pub fn to<T: DocumentType>() -> Self {
        Self::new(T::type_name(), PRIMARY_KEY)
    }

    pub(crate) fn from_parts(
        target_type: String,
        local_field: Option<String>,
        foreign_key: String,
        foreign_key_value: Value,
    ) -> Self {
        let association = Self::new(target_type, foreign_key);
        {
            let mut inner = association.0.borrow_mut();
            inner.local_field = local_field;
            inner.foreign_key_value = foreign_key_value;
        }
        association
    }

    pub fn target_type(&self) -> String {
        self.0.borrow().target_type.clone()
    }

    /// The owner field this association is stored under, once assigned.
    pub fn local_field(&self) -> Option<String> {
        self.0.borrow().local_field.clone()
    }

    pub fn foreign_key(&self) -> String {
        self.0.borrow().foreign_key.clone()
    }

    pub fn foreign_key_value(&self) -> Value {
        self.0
            .borrow()
            .foreign_key_value
            .clone()
    }

    /// Whether a target is memoized.
    pub fn is_resolved(&self) -> bool {
        self.0.borrow().resolved.is_some()
    }

    /// Points this association at `target`.
    ///
    /// A changed foreign key dirties the owner field and forgets the memoized target.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::MissingPrimaryKey`] if `target` has no primary key.
    pub fn associate(&self, target: &DocumentRef) -> DocumentStoreResult<()> {
        if target.primary_key().is_none() {
            return Err(DocumentStoreError::MissingPrimaryKey(target.type_name()));
        }

        let mut association = self.0.borrow_mut();
        let value = target
            .get(&association.foreign_key)
            .unwrap_or(Value::Null);

        if association.foreign_key_value != value {
            association.foreign_key_value = value;
            association.resolved = None;
            association.subscribers.notify();
        }

        Ok(())
    }

    /// Returns the target, fetching it through `store` on first use.
    ///
    /// # Errors
    ///
    /// - [`DocumentStoreError::UnregisteredType`] if the target type is not registered
    /// - [`DocumentStoreError::NotFound`] if no stored document matches the foreign key
    /// - [`DocumentStoreError::StorageNotConfigured`] if the store has no backend
    pub async fn resolve(&self, store: &DocumentStore) -> DocumentStoreResult<DocumentRef> {
        let (target_type, criteria) = {
            let association = self.0.borrow();

            if let Some(resolved) = &association.resolved {
                return Ok(resolved.clone());
            }

            let mut criteria = Document::new();
            criteria.insert(
                association.foreign_key.clone(),
                codec::encode_value(&association.foreign_key_value),
            );

            (association.target_type.clone(), criteria)
        };

        let schema = store
            .registry()
            .resolve(&target_type)?;

        tracing::debug!(target_type = %target_type, "resolving association");

        let target = store
            .collection_for(schema)
            .find_one(criteria)
            .await?;

        self.0.borrow_mut().resolved = Some(target.clone());

        Ok(target)
    }

    pub(crate) fn is_free(&self) -> bool {
        self.0.try_borrow_mut().is_ok()
    }

    pub(crate) fn attach(&self, field: &str, owner: Weak<BagCell>) {
        let Ok(mut association) = self.0.try_borrow_mut() else {
            return;
        };

        if association.local_field.is_none() {
            association.local_field = Some(field.to_string());
        }

        association
            .subscribers
            .subscribe(field, owner);
    }

    pub(crate) fn detach(&self, field: &str, owner: &Weak<BagCell>) {
        if let Ok(mut association) = self.0.try_borrow_mut() {
            association
                .subscribers
                .unsubscribe(field, owner);
        }
    }

    pub fn to_json(&self) -> JsonValue {
        let association = self.0.borrow();

        json!({
            "className": association.target_type,
            "localKey": association.local_field,
            "foreignKey": association.foreign_key,
            "foreignKeyValue": association.foreign_key_value.to_json(),
        })
    }
}

impl PartialEq for AssociationRef {
    fn eq(&self, other: &Self) -> bool {
        if Rc::ptr_eq(&self.0, &other.0) {
            return true;
        }

        let (left, right) = (self.0.borrow(), other.0.borrow());

        left.target_type == right.target_type
            && left.foreign_key == right.foreign_key
            && left.foreign_key_value == right.foreign_key_value
    }
}

impl fmt::Debug for AssociationRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(association) => f
                .debug_struct("AssociationRef")
                .field("target_type", &association.target_type)
                .field("foreign_key", &association.foreign_key)
                .field("foreign_key_value", &association.foreign_key_value)
                .field("resolved", &association.resolved.is_some())
                .finish(),
            Err(_) => f.write_str("AssociationRef(<borrowed>)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{codec::EncodeMode, schema::Schema};
    use std::sync::Arc;

    fn user() -> DocumentRef {
        DocumentRef::new(Arc::new(Schema::new("tests::User", "users", ["name"])))
    }

    fn post() -> DocumentRef {
        DocumentRef::new(Arc::new(Schema::new("tests::Post", "posts", ["title", "owner"])))
    }

    #[test]
    fn associate_requires_a_primary_key() {
        let association = AssociationRef::new("tests::User", PRIMARY_KEY);

        let err = association.associate(&user()).unwrap_err();

        assert_eq!(err, DocumentStoreError::MissingPrimaryKey("tests::User".to_string()));
        assert_eq!(association.foreign_key_value(), Value::Null);
    }

    #[test]
    fn associate_copies_the_foreign_key() {
        let target = user();
        target.encode(EncodeMode::Full);
        let association = AssociationRef::new("tests::User", PRIMARY_KEY);

        association.associate(&target).unwrap();

        assert_eq!(association.foreign_key_value(), target.primary_key().unwrap());
    }

    #[test]
    fn reassociation_dirties_the_owner_field() {
        let first = user();
        let second = user();
        first.encode(EncodeMode::Full);
        second.encode(EncodeMode::Full);

        let association = AssociationRef::new("tests::User", PRIMARY_KEY);
        let owner = post();
        owner.set("owner", &association).unwrap();
        association.associate(&first).unwrap();
        owner.clear_changes();

        association.associate(&first).unwrap();
        assert!(!owner.is_dirty());

        association.associate(&second).unwrap();
        assert_eq!(owner.dirty_fields(), vec!["owner"]);
        assert_eq!(association.local_field(), Some("owner".to_string()));
    }

    #[test]
    fn json_view_names_the_target() {
        let association = AssociationRef::new("tests::User", PRIMARY_KEY);

        let view = association.to_json();

        assert_eq!(view["className"], "tests::User");
        assert_eq!(view["foreignKey"], "_id");
        assert!(view["foreignKeyValue"].is_null());
    }
}
