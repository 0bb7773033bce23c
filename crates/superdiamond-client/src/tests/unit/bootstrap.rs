//! Listeners registered on the builder, before the initial load.

use rstest::rstest;

use crate::client::BootstrapSource;
use crate::event::{ChangeEvent, ChangeKind};
use crate::tests::support::{
    Harness, MemoryBackupStore, WAIT_LIMIT, identity, record_events_from_start, settings,
};

#[rstest]
fn listener_registered_before_authority_bootstrap_sees_only_reloads() {
    let harness = Harness::new();
    let authority = harness.connector.accept_with("version = 1\na = 1\nb = 2\n");
    let (builder, events) = record_events_from_start(harness.builder(settings()));

    let client = builder.connect().expect("bootstrap succeeds");

    assert_eq!(client.bootstrap_source(), BootstrapSource::Authority);
    assert!(events.try_recv().is_err(), "bootstrap raised an event");

    authority.push("version = 2\na = 1\nb = 3\n");
    let event = events.recv_timeout(WAIT_LIMIT).expect("reload event");
    assert_eq!(event, ChangeEvent::new(ChangeKind::Update, "b", "3"));
}

#[rstest]
fn listener_registered_before_backup_bootstrap_sees_nothing() {
    let backup = MemoryBackupStore::default();
    backup.seed(&identity(), "version = 3\na = 1\n");
    let harness = Harness::with_backup(backup);
    harness.connector.refuse();
    let (builder, events) = record_events_from_start(harness.builder(settings()));

    let client = builder.connect().expect("backup bootstrap succeeds");

    assert_eq!(client.bootstrap_source(), BootstrapSource::Backup);
    assert_eq!(client.get_int("a").expect("a present"), 1);
    client.close();
    assert!(events.try_recv().is_err(), "bootstrap raised an event");
}

