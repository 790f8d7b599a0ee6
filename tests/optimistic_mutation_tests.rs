//! Tests for the optimistic mutation lifecycle.
//!
//! Each mutation applies locally first, then commits the server's answer or
//! rolls back, and always leaves the cache consistent:
//!
//! - create: temp placeholder selected at once, replaced in place by the
//!   server record, removed again on failure
//! - delete/leave: left-neighbour selection, re-insertion on failure
//! - rename/sharing: field patch, exact restore on failure
//! - independent mutations on different tabs may settle in any order

mod common;

use common::{
    FakePadApi, assert_settled_invariants, eventually, ids, loaded_engine, rejected, transport,
};
use padsync::sync::{MutationOutcome, SyncEvent};
use padsync::tab::is_temporary_id;
use padsync::{MutationKind, PadOperation, SharingPolicy, SyncError};

// ============================================================================
// Create
// ============================================================================

#[tokio::test]
async fn create_shows_selected_placeholder_then_server_record() {
    let api = FakePadApi::with_ids(&["a"]);
    let engine = loaded_engine(&api).await;
    assert_eq!(engine.cache().selected().as_deref(), Some("a"));

    let gate = api.gate(PadOperation::CreatePad);
    let task = tokio::spawn({
        let engine = engine.clone();
        async move { engine.create_pad().await }
    });

    eventually(|| engine.cache().collection().len() == 2).await;
    let speculative = engine.cache().read();
    let temp_id = speculative.collection.id_at(1).cloned().unwrap();
    assert!(is_temporary_id(&temp_id));
    assert_eq!(speculative.selected.as_ref(), Some(&temp_id));
    assert!(engine.is_pending(MutationKind::Create));

    gate.send(()).unwrap();
    let created = task.await.unwrap().unwrap();
    assert_eq!(created.id, "srv-1");

    let state = engine.cache().read();
    assert_eq!(ids(&state), vec!["a", "srv-1"]);
    assert_eq!(state.selected.as_deref(), Some("srv-1"));
    assert!(!engine.is_pending(MutationKind::Create));

    // Reconciliation must not move the selection off the new pad
    engine.wait_idle().await;
    let state = engine.cache().read();
    assert_eq!(ids(&state), vec!["a", "srv-1"]);
    assert_eq!(state.selected.as_deref(), Some("srv-1"));
    assert_settled_invariants(&state);
}

#[tokio::test]
async fn failed_create_restores_exact_prior_state() {
    let api = FakePadApi::with_ids(&["a"]);
    let engine = loaded_engine(&api).await;
    let before = engine.cache().read();

    api.fail_next(
        PadOperation::CreatePad,
        rejected(PadOperation::CreatePad, 500, "Failed to create new pad"),
    );
    let err = engine.create_pad().await.unwrap_err();
    assert_eq!(err.user_message(), "Failed to create new pad");
    assert_eq!(engine.cache().read(), before);

    engine.wait_idle().await;
    assert_eq!(engine.cache().read(), before);
    assert_settled_invariants(&engine.cache().read());
}

#[tokio::test]
async fn failed_create_on_empty_collection_unsets_selection() {
    let api = FakePadApi::with_ids(&[]);
    let engine = loaded_engine(&api).await;

    api.fail_next(PadOperation::CreatePad, transport(PadOperation::CreatePad));
    let err = engine.create_pad().await.unwrap_err();
    assert!(matches!(err, SyncError::Api(_)));

    let state = engine.cache().read();
    assert!(state.collection.is_empty());
    assert_eq!(state.selected, None);
}

// ============================================================================
// Delete / Leave
// ============================================================================

#[tokio::test]
async fn delete_selected_middle_tab_selects_left_neighbour() {
    let api = FakePadApi::with_ids(&["a", "b", "c"]);
    let engine = loaded_engine(&api).await;
    engine.cache().patch(|s| s.selected = Some("b".to_string()));

    let outcome = engine.delete_pad("b").await.unwrap();
    assert_eq!(outcome, MutationOutcome::Committed(()));

    let state = engine.cache().read();
    assert_eq!(ids(&state), vec!["a", "c"]);
    assert_eq!(state.selected.as_deref(), Some("a"));
    assert_eq!(api.pad_ids(), vec!["a", "c"]);
}

#[tokio::test]
async fn delete_selected_first_tab_selects_new_first() {
    let api = FakePadApi::with_ids(&["a", "b", "c"]);
    let engine = loaded_engine(&api).await;
    assert_eq!(engine.cache().selected().as_deref(), Some("a"));

    engine.delete_pad("a").await.unwrap();
    assert_eq!(engine.cache().selected().as_deref(), Some("b"));
}

#[tokio::test]
async fn delete_last_tab_leaves_empty_unselected_collection() {
    let api = FakePadApi::with_ids(&["a"]);
    let engine = loaded_engine(&api).await;

    engine.delete_pad("a").await.unwrap();
    engine.wait_idle().await;

    let state = engine.cache().read();
    assert!(state.collection.is_empty());
    assert_eq!(state.selected, None);
    assert_settled_invariants(&state);
}

#[tokio::test]
async fn failed_delete_reinserts_tab_and_restores_selection() {
    let api = FakePadApi::with_ids(&["a", "b", "c"]);
    let engine = loaded_engine(&api).await;
    engine.cache().patch(|s| s.selected = Some("b".to_string()));
    let before = engine.cache().read();

    api.fail_next(
        PadOperation::DeletePad,
        rejected(PadOperation::DeletePad, 500, "Failed to delete pad"),
    );
    engine.delete_pad("b").await.unwrap_err();

    let state = engine.cache().read();
    assert_eq!(state, before);
    assert_eq!(state.selected.as_deref(), Some("b"));
}

#[tokio::test]
async fn failed_leave_surfaces_server_detail() {
    let api = FakePadApi::with_ids(&["a", "b"]);
    let engine = loaded_engine(&api).await;
    let mut events = engine.subscribe();

    api.fail_next(
        PadOperation::LeavePad,
        rejected(PadOperation::LeavePad, 403, "Owners cannot leave their own pad"),
    );
    let err = engine.leave_pad("b").await.unwrap_err();
    assert_eq!(err.user_message(), "Owners cannot leave their own pad");
    assert_eq!(ids(&engine.cache().read()), vec!["a", "b"]);

    assert_eq!(
        events.recv().await.unwrap(),
        SyncEvent::RolledBack {
            kind: MutationKind::Leave,
            id: "b".to_string(),
            message: "Owners cannot leave their own pad".to_string(),
        }
    );
}

#[tokio::test]
async fn leave_emits_left_with_title() {
    let api = FakePadApi::with_pads(
        vec![common::pad("a", "Mine"), common::pad("b", "Theirs")],
        None,
    );
    let engine = loaded_engine(&api).await;
    let mut events = engine.subscribe();

    engine.leave_pad("b").await.unwrap();
    assert_eq!(
        events.recv().await.unwrap(),
        SyncEvent::Left {
            id: "b".to_string(),
            title: "Theirs".to_string(),
        }
    );
}

// ============================================================================
// Rename / Sharing
// ============================================================================

#[tokio::test]
async fn failed_rename_restores_title_and_updated_at() {
    let api = FakePadApi::with_ids(&["a"]);
    let engine = loaded_engine(&api).await;
    engine.rename_pad("a", "X").await.unwrap();
    engine.wait_idle().await;
    let before = engine.cache().collection().get("a").cloned().unwrap();
    assert_eq!(before.title, "X");

    let gate = api.gate(PadOperation::RenamePad);
    api.fail_next(PadOperation::RenamePad, transport(PadOperation::RenamePad));
    let task = tokio::spawn({
        let engine = engine.clone();
        async move { engine.rename_pad("a", "Y").await }
    });
    eventually(|| engine.cache().collection().get("a").is_some_and(|t| t.title == "Y")).await;
    gate.send(()).unwrap();

    let err = task.await.unwrap().unwrap_err();
    assert_eq!(err.user_message(), "Failed to rename pad");
    let after = engine.cache().collection().get("a").cloned().unwrap();
    assert_eq!(after.title, "X");
    assert_eq!(after.updated_at, before.updated_at);
}

#[tokio::test]
async fn sharing_change_commits_and_reconciles() {
    let api = FakePadApi::with_ids(&["a"]);
    let engine = loaded_engine(&api).await;

    engine
        .update_sharing_policy("a", SharingPolicy::Public)
        .await
        .unwrap();
    engine.wait_idle().await;

    let tab = engine.cache().collection().get("a").cloned().unwrap();
    assert_eq!(tab.sharing_policy, SharingPolicy::Public);
    assert_eq!(api.pads()[0].sharing_policy, SharingPolicy::Public);
}

#[tokio::test]
async fn failed_sharing_change_restores_policy() {
    let api = FakePadApi::with_ids(&["a"]);
    let engine = loaded_engine(&api).await;
    let before = engine.cache().read();

    api.fail_next(
        PadOperation::UpdateSharingPolicy,
        transport(PadOperation::UpdateSharingPolicy),
    );
    engine
        .update_sharing_policy("a", SharingPolicy::Public)
        .await
        .unwrap_err();
    assert_eq!(engine.cache().read(), before);
}

// ============================================================================
// Independent concurrent mutations
// ============================================================================

async fn rename_a_and_delete_b(delete_settles_first: bool) {
    let api = FakePadApi::with_ids(&["a", "b"]);
    let engine = loaded_engine(&api).await;

    let rename_gate = api.gate(PadOperation::RenamePad);
    let delete_gate = api.gate(PadOperation::DeletePad);
    let rename = tokio::spawn({
        let engine = engine.clone();
        async move { engine.rename_pad("a", "A'").await }
    });
    let delete = tokio::spawn({
        let engine = engine.clone();
        async move { engine.delete_pad("b").await }
    });

    eventually(|| engine.in_flight() == 2).await;
    let speculative = engine.cache().read();
    assert_eq!(ids(&speculative), vec!["a"]);
    assert_eq!(speculative.collection.get("a").unwrap().title, "A'");

    if delete_settles_first {
        delete_gate.send(()).unwrap();
        delete.await.unwrap().unwrap();
        rename_gate.send(()).unwrap();
        rename.await.unwrap().unwrap();
    } else {
        rename_gate.send(()).unwrap();
        rename.await.unwrap().unwrap();
        delete_gate.send(()).unwrap();
        delete.await.unwrap().unwrap();
    }
    engine.wait_idle().await;

    let state = engine.cache().read();
    assert_eq!(ids(&state), vec!["a"]);
    assert_eq!(state.collection.get("a").unwrap().title, "A'");
    assert_eq!(state.selected.as_deref(), Some("a"));
    assert_settled_invariants(&state);
}

#[tokio::test]
async fn concurrent_rename_and_delete_delete_first() {
    rename_a_and_delete_b(true).await;
}

#[tokio::test]
async fn concurrent_rename_and_delete_rename_first() {
    rename_a_and_delete_b(false).await;
}

#[tokio::test]
async fn failure_of_one_mutation_keeps_the_other() {
    let api = FakePadApi::with_ids(&["a", "b"]);
    let engine = loaded_engine(&api).await;

    let delete_gate = api.gate(PadOperation::DeletePad);
    let delete = tokio::spawn({
        let engine = engine.clone();
        async move { engine.delete_pad("b").await }
    });
    eventually(|| engine.in_flight() == 1).await;

    // Rename of a settles (and fails) while the delete of b is in flight
    api.fail_next(PadOperation::RenamePad, transport(PadOperation::RenamePad));
    engine.rename_pad("a", "Nope").await.unwrap_err();
    assert_eq!(ids(&engine.cache().read()), vec!["a"]);

    delete_gate.send(()).unwrap();
    delete.await.unwrap().unwrap();
    engine.wait_idle().await;

    let state = engine.cache().read();
    assert_eq!(ids(&state), vec!["a"]);
    assert_eq!(state.collection.get("a").unwrap().title, "a");
    assert_settled_invariants(&state);
}

#[tokio::test]
async fn mutation_of_missing_tab_is_already_settled() {
    let api = FakePadApi::with_ids(&["a"]);
    let engine = loaded_engine(&api).await;

    assert_eq!(
        engine.rename_pad("gone", "x").await.unwrap(),
        MutationOutcome::AlreadySettled
    );
    assert_eq!(
        engine.delete_pad("gone").await.unwrap(),
        MutationOutcome::AlreadySettled
    );
    assert_eq!(api.call_count(PadOperation::RenamePad), 0);
    assert_eq!(api.call_count(PadOperation::DeletePad), 0);
}
