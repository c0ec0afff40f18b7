//! Delete-parent actions: prevent, cascade, dereference.

mod common;

use common::*;
use habanero_core::{DataStore, DeleteParentAction, Error, RelationshipKind, Value};
use pretty_assertions::assert_eq;

#[test]
fn test_prevent_refuses_delete_while_related() {
    let mut s = TestSession::new(Model::default());
    let person = saved_person(&mut s, "Pat");
    let car = saved_car(&mut s, "Saab", Some(person));

    let check = s.is_deletable(person).unwrap();
    assert!(!check.deletable);
    let message = check.message.unwrap();
    assert!(message.contains("'Cars'"));
    assert!(message.contains("1 Car"));

    let err = s.mark_for_delete(person).unwrap_err();
    assert!(matches!(err, Error::NotDeletable(_)));
    assert!(!s.get(person).unwrap().is_deleted());

    s.set_related(car, "Owner", None).unwrap();
    s.save(car).unwrap();
    assert!(s.is_deletable(person).unwrap().deletable);
    s.mark_for_delete(person).unwrap();
    assert!(s.get(person).unwrap().is_deleted());
}

#[test]
fn test_prevent_counts_stored_members() {
    let mut s = TestSession::new(Model::default());
    let (org, _) = saved_organisation(&mut s, &["Adams", "Brown"]);
    let (empty, _) = saved_organisation(&mut s, &[]);

    let mut fresh = s.reopen();
    let org = fresh.load(ORGANISATION, org).unwrap();
    let empty = fresh.load(ORGANISATION, empty).unwrap();
    let check = fresh.is_deletable(org).unwrap();
    assert!(!check.deletable);
    assert!(check.message.unwrap().contains("2 ContactPerson"));
    assert!(fresh.is_deletable(empty).unwrap().deletable);
}

#[test]
fn test_delete_related_cascades() {
    let mut s = TestSession::new(Model::contact_people(
        RelationshipKind::Association,
        DeleteParentAction::DeleteRelated,
    ));
    let (org, contacts) = saved_organisation(&mut s, &["Adams", "Brown"]);
    let address = s.create_child(contacts[0], "Addresses").unwrap();
    s.set_value(address, "Street", "1 High St").unwrap();
    s.save(contacts[0]).unwrap();
    let before = s.store.len();

    assert!(s.is_deletable(org).unwrap().deletable);
    s.mark_for_delete(org).unwrap();

    for id in [org, contacts[0], contacts[1], address] {
        assert!(s.get(id).unwrap().is_deleted());
    }
    let collection = s.collection(org, CONTACT_PEOPLE).unwrap();
    assert!(collection.ids().is_empty());
    assert_eq!(collection.marked_for_delete(), contacts.as_slice());
    assert!(s.relationship_is_dirty(org, CONTACT_PEOPLE).unwrap());

    let summary = s.save(org).unwrap();
    assert_eq!(summary.deleted, 4);
    assert_eq!(s.store.len(), before - 4);
    for id in [org, contacts[0], contacts[1], address] {
        assert!(s.get(id).unwrap().is_gone());
    }
    assert!(s.mark_for_delete(org).unwrap_err().is_not_found());
}

#[test]
fn test_cancel_restores_cascaded_delete() {
    let mut s = TestSession::new(Model::contact_people(
        RelationshipKind::Association,
        DeleteParentAction::DeleteRelated,
    ));
    let (org, contacts) = saved_organisation(&mut s, &["Adams", "Brown"]);
    let address = s.create_child(contacts[0], "Addresses").unwrap();
    s.save(contacts[0]).unwrap();

    s.mark_for_delete(org).unwrap();
    s.cancel_edits(org).unwrap();

    for id in [org, contacts[0], contacts[1], address] {
        assert!(!s.get(id).unwrap().is_deleted());
        assert!(!s.is_dirty(id).unwrap());
    }
    assert_eq!(s.children(org, CONTACT_PEOPLE).unwrap(), contacts);
    assert_eq!(s.children(contacts[0], "Addresses").unwrap(), vec![address]);
}

#[test]
fn test_dereference_related_clears_keys_on_save() {
    let mut s = TestSession::new(Model::contact_people(
        RelationshipKind::Association,
        DeleteParentAction::DereferenceRelated,
    ));
    let (org, contacts) = saved_organisation(&mut s, &["Adams", "Brown"]);

    s.mark_for_delete(org).unwrap();
    for contact in &contacts {
        assert!(!s.get(*contact).unwrap().is_deleted());
        assert_eq!(s.value(*contact, "OrganisationID").unwrap(), &Value::from(org));
    }

    let summary = s.save(org).unwrap();
    assert_eq!(summary.deleted, 1);
    assert_eq!(summary.updated, 2);
    assert!(s.store.get(ORGANISATION, org).unwrap().is_none());
    for contact in &contacts {
        let stored = s.store.get(CONTACT_PERSON, *contact).unwrap().unwrap();
        assert_eq!(stored.get("OrganisationID"), Some(&Value::Null));
        assert_eq!(s.value(*contact, "OrganisationID").unwrap(), &Value::Null);
        assert!(!s.is_dirty(*contact).unwrap());
    }
}

#[test]
fn test_dereference_loads_unloaded_members() {
    let mut s = TestSession::new(Model::contact_people(
        RelationshipKind::Association,
        DeleteParentAction::DereferenceRelated,
    ));
    let (org, contacts) = saved_organisation(&mut s, &["Adams"]);

    let mut fresh = s.reopen();
    let org = fresh.load(ORGANISATION, org).unwrap();
    fresh.mark_for_delete(org).unwrap();
    fresh.save(org).unwrap();

    let stored = fresh.store.get(CONTACT_PERSON, contacts[0]).unwrap().unwrap();
    assert_eq!(stored.get("OrganisationID"), Some(&Value::Null));
}

#[test]
fn test_marking_created_child_discards_it() {
    let mut s = TestSession::new(Model::contact_people(
        RelationshipKind::Association,
        DeleteParentAction::DoNothing,
    ));
    let (org, _) = saved_organisation(&mut s, &["Adams"]);
    let before = s.store.len();

    let created = s.create_child(org, CONTACT_PEOPLE).unwrap();
    s.mark_child_for_delete(org, CONTACT_PEOPLE, created).unwrap();
    assert!(s.get(created).unwrap().is_gone());
    assert!(s.is_dirty(org).unwrap());

    s.save(org).unwrap();
    assert_eq!(s.store.len(), before);
    assert!(!s.is_dirty(org).unwrap());
    assert!(!s.collection(org, CONTACT_PEOPLE).unwrap().contains(created));
}

#[test]
fn test_mark_non_member_for_delete_fails() {
    let mut s = TestSession::new(Model::default());
    let (org, _) = saved_organisation(&mut s, &[]);
    let outsider = saved_contact(&mut s, "Evans");

    let err = s
        .mark_child_for_delete(org, CONTACT_PEOPLE, outsider)
        .unwrap_err();
    assert!(matches!(err, Error::NotInRelationship { .. }));
    assert!(!s.get(outsider).unwrap().is_deleted());
}
