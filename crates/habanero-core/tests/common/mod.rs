//! Shared fixture: organisations with contact people and their addresses,
//! people with cars and a licence.

#![allow(dead_code)]

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use habanero_core::{
    ClassDef, ClassDefRegistry, DataStore, DeleteParentAction, MemoryStore, ObjectId, OrderBy,
    PropDef, PropType, RelKeyDef, RelationshipDef, RelationshipKind, Session, SessionConfig,
};

pub const ORGANISATION: &str = "Organisation";
pub const CONTACT_PERSON: &str = "ContactPerson";
pub const ADDRESS: &str = "Address";
pub const PERSON: &str = "Person";
pub const CAR: &str = "Car";
pub const LICENCE: &str = "Licence";

pub const CONTACT_PEOPLE: &str = "ContactPeople";

/// The relationship definitions tests vary. Everything else is fixed.
pub struct Model {
    /// Organisation -> ContactPerson, multiple.
    pub contact_people: RelationshipDef,
    /// Person -> Licence, single, key held by the licence.
    pub licence: RelationshipDef,
    /// Licence -> Person, single, reverse of `licence`.
    pub holder: RelationshipDef,
}

impl Default for Model {
    fn default() -> Self {
        Self {
            contact_people: RelationshipDef::multiple(
                CONTACT_PEOPLE,
                CONTACT_PERSON,
                RelKeyDef::new("OrganisationID", "OrganisationID"),
            )
            .with_order_by(OrderBy::asc("Surname")),
            licence: RelationshipDef::single(
                "Licence",
                LICENCE,
                RelKeyDef::new("PersonID", "PersonID"),
            )
            .with_owning_foreign_key(false)
            .with_kind(RelationshipKind::Composition)
            .with_delete_parent_action(DeleteParentAction::DeleteRelated),
            holder: RelationshipDef::single("Holder", PERSON, RelKeyDef::new("PersonID", "PersonID")),
        }
    }
}

impl Model {
    /// Default model with the organisation's contact people configured.
    pub fn contact_people(
        kind: RelationshipKind,
        delete_parent_action: DeleteParentAction,
    ) -> Self {
        let mut model = Self::default();
        model.contact_people = model
            .contact_people
            .with_kind(kind)
            .with_delete_parent_action(delete_parent_action);
        model
    }

    pub fn registry(self) -> Arc<ClassDefRegistry> {
        let organisation = ClassDef::new(ORGANISATION, "OrganisationID")
            .with_prop(PropDef::new("Name", PropType::String).compulsory())
            .with_relationship(self.contact_people);

        let contact_person = ClassDef::new(CONTACT_PERSON, "ContactPersonID")
            .with_prop(PropDef::new("Surname", PropType::String).compulsory())
            .with_prop(PropDef::new("FirstName", PropType::String))
            .with_prop(PropDef::new("OrganisationID", PropType::Uuid))
            .with_relationship(RelationshipDef::single(
                ORGANISATION,
                ORGANISATION,
                RelKeyDef::new("OrganisationID", "OrganisationID"),
            ))
            .with_relationship(
                RelationshipDef::multiple(
                    "Addresses",
                    ADDRESS,
                    RelKeyDef::new("ContactPersonID", "ContactPersonID"),
                )
                .with_kind(RelationshipKind::Composition)
                .with_delete_parent_action(DeleteParentAction::DeleteRelated),
            );

        let address = ClassDef::new(ADDRESS, "AddressID")
            .with_prop(PropDef::new("Street", PropType::String))
            .with_prop(PropDef::new("ContactPersonID", PropType::Uuid))
            .with_relationship(RelationshipDef::single(
                CONTACT_PERSON,
                CONTACT_PERSON,
                RelKeyDef::new("ContactPersonID", "ContactPersonID"),
            ));

        let person = ClassDef::new(PERSON, "PersonID")
            .with_prop(PropDef::new("Name", PropType::String).compulsory())
            .with_relationship(RelationshipDef::multiple(
                "Cars",
                CAR,
                RelKeyDef::new("PersonID", "OwnerID"),
            ))
            .with_relationship(self.licence);

        let car = ClassDef::new(CAR, "CarID")
            .with_prop(PropDef::new("Make", PropType::String).compulsory())
            .with_prop(PropDef::new("OwnerID", PropType::Uuid))
            .with_relationship(RelationshipDef::single(
                "Owner",
                PERSON,
                RelKeyDef::new("OwnerID", "PersonID"),
            ));

        let licence = ClassDef::new(LICENCE, "LicenceID")
            .with_prop(PropDef::new("Number", PropType::String))
            .with_prop(PropDef::new("PersonID", PropType::Uuid))
            .with_relationship(self.holder);

        let registry = ClassDefRegistry::builder()
            .register(organisation)
            .register(contact_person)
            .register(address)
            .register(person)
            .register(car)
            .register(licence)
            .build()
            .unwrap();
        Arc::new(registry)
    }
}

/// A session over a memory store that outlives it.
pub struct TestSession {
    session: Session,
    pub store: Arc<MemoryStore>,
    pub registry: Arc<ClassDefRegistry>,
}

impl TestSession {
    pub fn new(model: Model) -> Self {
        Self::with_config(model, SessionConfig::default())
    }

    pub fn with_config(model: Model, config: SessionConfig) -> Self {
        let registry = model.registry();
        let store = Arc::new(MemoryStore::new());
        let session = Session::with_config(
            Arc::clone(&registry),
            Arc::clone(&store) as Arc<dyn DataStore>,
            config,
        );
        Self {
            session,
            store,
            registry,
        }
    }

    /// A fresh session over the same store and classes.
    pub fn reopen(&self) -> TestSession {
        Self {
            session: Session::new(
                Arc::clone(&self.registry),
                Arc::clone(&self.store) as Arc<dyn DataStore>,
            ),
            store: Arc::clone(&self.store),
            registry: Arc::clone(&self.registry),
        }
    }
}

impl Deref for TestSession {
    type Target = Session;

    fn deref(&self) -> &Self::Target {
        &self.session
    }
}

impl DerefMut for TestSession {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.session
    }
}

/// Create and save an organisation with one contact person per surname.
pub fn saved_organisation(session: &mut Session, surnames: &[&str]) -> (ObjectId, Vec<ObjectId>) {
    let org = session.create(ORGANISATION).unwrap();
    session.set_value(org, "Name", "Acme").unwrap();
    let contacts = surnames
        .iter()
        .map(|surname| {
            let contact = session.create_child(org, CONTACT_PEOPLE).unwrap();
            session.set_value(contact, "Surname", *surname).unwrap();
            contact
        })
        .collect();
    session.save(org).unwrap();
    (org, contacts)
}

/// Create and save a contact person belonging to no organisation.
pub fn saved_contact(session: &mut Session, surname: &str) -> ObjectId {
    let contact = session.create(CONTACT_PERSON).unwrap();
    session.set_value(contact, "Surname", surname).unwrap();
    session.save(contact).unwrap();
    contact
}

/// Create and save a person.
pub fn saved_person(session: &mut Session, name: &str) -> ObjectId {
    let person = session.create(PERSON).unwrap();
    session.set_value(person, "Name", name).unwrap();
    session.save(person).unwrap();
    person
}

/// Create and save a car, optionally owned.
pub fn saved_car(session: &mut Session, make: &str, owner: Option<ObjectId>) -> ObjectId {
    let car = session.create(CAR).unwrap();
    session.set_value(car, "Make", make).unwrap();
    session.set_related(car, "Owner", owner).unwrap();
    session.save(car).unwrap();
    car
}
