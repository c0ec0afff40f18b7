//! Dirty state and dirty children of multiple relationships.

mod common;

use common::*;
use habanero_core::{DeleteParentAction, Error, InsertParentAction, RelationshipKind, Value};
use pretty_assertions::assert_eq;

fn session(kind: RelationshipKind) -> TestSession {
    TestSession::new(Model::contact_people(kind, DeleteParentAction::DoNothing))
}

#[test]
fn test_association_member_edit_does_not_dirty_parent() {
    let mut s = session(RelationshipKind::Association);
    let (org, contacts) = saved_organisation(&mut s, &["Adams", "Brown"]);
    assert!(!s.is_dirty(org).unwrap());

    s.set_value(contacts[0], "FirstName", "Ann").unwrap();
    assert!(s.is_dirty(contacts[0]).unwrap());
    assert!(!s.relationship_is_dirty(org, CONTACT_PEOPLE).unwrap());
    assert!(!s.is_dirty(org).unwrap());
    assert!(s.dirty_children(org, CONTACT_PEOPLE).unwrap().is_empty());

    s.create_child(org, CONTACT_PEOPLE).unwrap();
    assert!(s.relationship_is_dirty(org, CONTACT_PEOPLE).unwrap());
    assert!(s.status(org).unwrap().is_dirty);
}

#[test]
fn test_aggregation_member_edit_dirties_parent() {
    let mut s = session(RelationshipKind::Aggregation);
    let (org, contacts) = saved_organisation(&mut s, &["Adams", "Brown"]);

    s.set_value(contacts[1], "FirstName", "Bob").unwrap();
    assert!(s.relationship_is_dirty(org, CONTACT_PEOPLE).unwrap());
    assert!(s.is_dirty(org).unwrap());
    assert!(!s.get(org).unwrap().own_status().is_dirty);
    assert_eq!(s.dirty_children(org, CONTACT_PEOPLE).unwrap(), vec![contacts[1]]);
}

#[test]
fn test_composition_member_edit_dirties_parent() {
    let mut s = session(RelationshipKind::Composition);
    let (org, contacts) = saved_organisation(&mut s, &["Adams"]);

    s.set_value(contacts[0], "Surname", "Addams").unwrap();
    assert!(s.is_dirty(org).unwrap());
    assert_eq!(s.all_dirty_children(org).unwrap(), vec![contacts[0]]);
}

#[test]
fn test_dirty_children_count_by_state() {
    let mut s = session(RelationshipKind::Association);
    let (org, contacts) = saved_organisation(&mut s, &["Adams", "Brown", "Clark"]);
    let outsider = saved_contact(&mut s, "Evans");

    let created = s.create_child(org, CONTACT_PEOPLE).unwrap();
    s.add_child(org, CONTACT_PEOPLE, outsider).unwrap();
    s.remove_child(org, CONTACT_PEOPLE, contacts[0]).unwrap();
    s.mark_child_for_delete(org, CONTACT_PEOPLE, contacts[1]).unwrap();
    s.set_value(contacts[2], "FirstName", "Cy").unwrap();

    let collection = s.collection(org, CONTACT_PEOPLE).unwrap();
    assert_eq!(collection.created(), &[created]);
    assert_eq!(collection.added(), &[outsider]);
    assert_eq!(collection.removed(), &[contacts[0]]);
    assert_eq!(collection.marked_for_delete(), &[contacts[1]]);

    // association: the edited member is not a dirty child
    let mut children = s.dirty_children(org, CONTACT_PEOPLE).unwrap();
    children.sort();
    let mut expected = vec![created, outsider, contacts[0], contacts[1]];
    expected.sort();
    assert_eq!(children, expected);
}

#[test]
fn test_insert_parent_do_nothing_excludes_created() {
    let mut model = Model::default();
    model.contact_people = model
        .contact_people
        .with_delete_parent_action(DeleteParentAction::DoNothing)
        .with_insert_parent_action(InsertParentAction::DoNothing);
    let mut s = TestSession::new(model);
    let (org, _) = saved_organisation(&mut s, &[]);

    let created = s.create_child(org, CONTACT_PEOPLE).unwrap();
    s.set_value(created, "Surname", "Adams").unwrap();
    assert!(s.relationship_is_dirty(org, CONTACT_PEOPLE).unwrap());
    assert!(s.dirty_children(org, CONTACT_PEOPLE).unwrap().is_empty());

    // saving the parent leaves the created child to the caller
    s.save(org).unwrap();
    assert!(s.get(created).unwrap().is_new());
    s.save(created).unwrap();
    assert!(!s.get(created).unwrap().is_new());
    assert!(!s.is_dirty(org).unwrap());
}

#[test]
fn test_aggregation_worked_example() {
    let mut s = session(RelationshipKind::Aggregation);
    let (org, contacts) = saved_organisation(&mut s, &["Adams", "Brown", "Clark", "Davis"]);
    let outsider = saved_contact(&mut s, "Evans");
    assert_eq!(s.children(org, CONTACT_PEOPLE).unwrap().len(), 4);

    let created = s.create_child(org, CONTACT_PEOPLE).unwrap();
    s.set_value(created, "Surname", "Fox").unwrap();
    s.add_child(org, CONTACT_PEOPLE, outsider).unwrap();
    s.remove_child(org, CONTACT_PEOPLE, contacts[0]).unwrap();
    s.mark_child_for_delete(org, CONTACT_PEOPLE, contacts[1]).unwrap();
    s.set_value(contacts[2], "FirstName", "Cy").unwrap();

    assert!(s.relationship_is_dirty(org, CONTACT_PEOPLE).unwrap());
    assert!(s.is_dirty(org).unwrap());
    assert_eq!(s.dirty_children(org, CONTACT_PEOPLE).unwrap().len(), 5);
    assert_eq!(s.children(org, CONTACT_PEOPLE).unwrap().len(), 4);

    s.cancel_edits(org).unwrap();

    assert!(!s.relationship_is_dirty(org, CONTACT_PEOPLE).unwrap());
    assert!(!s.is_dirty(org).unwrap());
    assert!(s.dirty_children(org, CONTACT_PEOPLE).unwrap().is_empty());
    let collection = s.collection(org, CONTACT_PEOPLE).unwrap();
    assert!(collection.created().is_empty());
    assert!(collection.added().is_empty());
    assert!(collection.removed().is_empty());
    assert!(collection.marked_for_delete().is_empty());
    assert_eq!(collection.ids(), contacts.as_slice());

    assert_eq!(s.value(contacts[0], "OrganisationID").unwrap(), &Value::from(org));
    assert!(!s.get(contacts[1]).unwrap().is_deleted());
    assert_eq!(s.value(contacts[2], "FirstName").unwrap(), &Value::Null);
    assert_eq!(s.value(outsider, "OrganisationID").unwrap(), &Value::Null);
    assert!(!s.is_dirty(outsider).unwrap());

    let created_bo = s.get(created).unwrap();
    assert!(created_bo.is_new());
    assert_eq!(created_bo.value("Surname").unwrap(), &Value::Null);
    assert_eq!(created_bo.value("OrganisationID").unwrap(), &Value::Null);
}

#[test]
fn test_cancelled_created_child_is_discarded() {
    let mut s = session(RelationshipKind::Aggregation);
    let (org, contacts) = saved_organisation(&mut s, &["Adams"]);
    let before = s.store.len();

    let created = s.create_child(org, CONTACT_PEOPLE).unwrap();
    s.set_value(created, "Surname", "Fox").unwrap();
    let unnamed = s.create_child(org, CONTACT_PEOPLE).unwrap();
    s.cancel_edits(org).unwrap();

    assert!(s.get(created).unwrap().is_gone());
    assert!(s.get(unnamed).unwrap().is_gone());
    assert!(!s.is_dirty(created).unwrap());

    assert_eq!(s.save_all().unwrap().total(), 0);
    assert_eq!(s.store.len(), before);
    assert_eq!(s.children(org, CONTACT_PEOPLE).unwrap(), contacts);
    assert!(s.add_child(org, CONTACT_PEOPLE, created).unwrap_err().is_not_found());
}

#[test]
fn test_cancel_is_idempotent() {
    let mut s = session(RelationshipKind::Aggregation);
    let (org, contacts) = saved_organisation(&mut s, &["Adams", "Brown"]);

    s.remove_child(org, CONTACT_PEOPLE, contacts[0]).unwrap();
    s.create_child(org, CONTACT_PEOPLE).unwrap();
    s.cancel_edits(org).unwrap();
    s.cancel_edits(org).unwrap();

    assert!(!s.is_dirty(org).unwrap());
    assert_eq!(s.children(org, CONTACT_PEOPLE).unwrap(), contacts);
}

#[test]
fn test_association_cancel_keeps_member_edits() {
    let mut s = session(RelationshipKind::Association);
    let (org, contacts) = saved_organisation(&mut s, &["Adams"]);

    s.set_value(contacts[0], "FirstName", "Ann").unwrap();
    s.set_value(org, "Name", "Other").unwrap();
    s.cancel_edits(org).unwrap();

    assert_eq!(s.value(org, "Name").unwrap(), &Value::from("Acme"));
    assert_eq!(s.value(contacts[0], "FirstName").unwrap(), &Value::from("Ann"));
}

#[test]
fn test_cancel_child_leaves_parent_collection() {
    let mut s = session(RelationshipKind::Aggregation);
    let (org, _) = saved_organisation(&mut s, &["Adams"]);
    let outsider = saved_contact(&mut s, "Evans");

    s.add_child(org, CONTACT_PEOPLE, outsider).unwrap();
    s.cancel_edits(outsider).unwrap();

    assert_eq!(s.value(outsider, "OrganisationID").unwrap(), &Value::Null);
    assert_eq!(s.collection(org, CONTACT_PEOPLE).unwrap().added(), &[outsider]);
}

#[test]
fn test_remove_then_add_restores_member() {
    let mut s = session(RelationshipKind::Association);
    let (org, contacts) = saved_organisation(&mut s, &["Adams"]);

    s.remove_child(org, CONTACT_PEOPLE, contacts[0]).unwrap();
    assert_eq!(s.value(contacts[0], "OrganisationID").unwrap(), &Value::Null);
    s.add_child(org, CONTACT_PEOPLE, contacts[0]).unwrap();

    assert_eq!(s.value(contacts[0], "OrganisationID").unwrap(), &Value::from(org));
    assert!(!s.is_dirty(org).unwrap());
    assert!(!s.is_dirty(contacts[0]).unwrap());
}

#[test]
fn test_remove_non_member_fails() {
    let mut s = session(RelationshipKind::Association);
    let (org, _) = saved_organisation(&mut s, &["Adams"]);
    let outsider = saved_contact(&mut s, "Evans");

    let err = s.remove_child(org, CONTACT_PEOPLE, outsider).unwrap_err();
    assert!(matches!(err, Error::NotInRelationship { .. }));
}

#[test]
fn test_composition_refuses_add_and_remove() {
    let mut s = session(RelationshipKind::Composition);
    let (org, contacts) = saved_organisation(&mut s, &["Adams"]);
    let outsider = saved_contact(&mut s, "Evans");

    let err = s.add_child(org, CONTACT_PEOPLE, outsider).unwrap_err();
    assert!(err.is_developer_error());
    let message = err.to_string();
    assert!(message.contains(CONTACT_PEOPLE));
    assert!(message.contains(ORGANISATION));
    assert!(message.contains("Composition"));

    assert!(s
        .remove_child(org, CONTACT_PEOPLE, contacts[0])
        .unwrap_err()
        .is_developer_error());
    assert!(!s.is_dirty(org).unwrap());
}

#[test]
fn test_wrong_accessor_and_unknown_relationship() {
    let mut s = session(RelationshipKind::Association);
    let (org, contacts) = saved_organisation(&mut s, &["Adams"]);

    assert!(matches!(
        s.related(org, CONTACT_PEOPLE).unwrap_err(),
        Error::WrongRelationshipArity { .. }
    ));
    assert!(matches!(
        s.children(contacts[0], ORGANISATION).unwrap_err(),
        Error::WrongRelationshipArity { .. }
    ));
    assert!(s.children(org, "Nope").unwrap_err().is_not_found());
}
