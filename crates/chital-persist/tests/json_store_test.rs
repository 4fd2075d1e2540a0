use std::sync::Arc;

use chital_persist::{JsonFilePersistence, PersistenceClient, ThreadStore};
use tempfile::TempDir;

fn json_store(dir: &TempDir) -> ThreadStore {
    let persistence = JsonFilePersistence::new(dir.path().join("threads")).unwrap();
    ThreadStore::new(Arc::new(persistence))
}

#[test]
fn test_threads_survive_reload() {
    let dir = TempDir::new().unwrap();

    let thread_id = {
        let store = json_store(&dir);
        let thread_id = store.create_draft().unwrap();
        store.promote_draft(thread_id).unwrap();
        store.append(thread_id, "Hello", true).unwrap();
        let reply = store.append(thread_id, "", false).unwrap();
        store.try_begin_exchange(thread_id).unwrap();
        store.append_to_message(thread_id, reply.id, "Hi").unwrap();
        store.append_to_message(thread_id, reply.id, " there!").unwrap();
        store.finish_exchange(thread_id, reply.id).unwrap();
        store.set_title(thread_id, "Greetings").unwrap();
        thread_id
    };

    let reopened = json_store(&dir);
    assert_eq!(reopened.load().unwrap(), 1);

    let thread = reopened.thread(thread_id).unwrap();
    assert_eq!(thread.title, "Greetings");
    assert!(thread.has_received_first_message);
    assert!(!thread.is_thinking);
    let texts: Vec<&str> = thread.messages.iter().map(|m| m.text.as_str()).collect();
    assert_eq!(texts, vec!["Hello", "Hi there!"]);
}

#[test]
fn test_drafts_are_not_written() {
    let dir = TempDir::new().unwrap();
    let store = json_store(&dir);

    store.create_draft().unwrap();

    let persistence = JsonFilePersistence::new(dir.path().join("threads")).unwrap();
    assert!(persistence.list_threads().unwrap().is_empty());
}

#[test]
fn test_truncation_is_persisted() {
    let dir = TempDir::new().unwrap();
    let store = json_store(&dir);
    let thread_id = store.create_thread().unwrap();
    store.append(thread_id, "Hello", true).unwrap();
    let reply = store.append(thread_id, "Hi", false).unwrap();

    store.truncate_from(thread_id, reply.id).unwrap();

    let persistence = JsonFilePersistence::new(dir.path().join("threads")).unwrap();
    let stored = persistence.get_messages(thread_id).unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].text, "Hello");
}

#[test]
fn test_delete_removes_file() {
    let dir = TempDir::new().unwrap();
    let store = json_store(&dir);
    let thread_id = store.create_thread().unwrap();
    let path = dir.path().join("threads").join(format!("{}.json", thread_id));
    assert!(path.exists());

    store.delete_thread(thread_id).unwrap();

    assert!(!path.exists());
}

#[test]
fn test_sequence_continues_after_reload() {
    let dir = TempDir::new().unwrap();
    let thread_id = {
        let store = json_store(&dir);
        let thread_id = store.create_thread().unwrap();
        store.append(thread_id, "one", true).unwrap();
        store.append(thread_id, "two", false).unwrap();
        thread_id
    };

    let reopened = json_store(&dir);
    reopened.load().unwrap();
    let third = reopened.append(thread_id, "three", true).unwrap();

    assert_eq!(third.sequence, 3);
    let last = reopened.chronological_messages(thread_id).unwrap();
    assert_eq!(last.last().unwrap().text, "three");
}

#[test]
fn test_unreadable_file_is_skipped() {
    let dir = TempDir::new().unwrap();
    let threads_dir = dir.path().join("threads");
    let store = json_store(&dir);
    store.create_thread().unwrap();
    std::fs::write(threads_dir.join("garbage.json"), "{not json").unwrap();

    let persistence = JsonFilePersistence::new(&threads_dir).unwrap();
    assert_eq!(persistence.list_threads().unwrap().len(), 1);
}

#[test]
fn test_non_utf8_file_and_json_named_directory_do_not_block_load() {
    let dir = TempDir::new().unwrap();
    let threads_dir = dir.path().join("threads");
    let thread_id = json_store(&dir).create_thread().unwrap();
    std::fs::write(threads_dir.join("garbage.json"), [0xff, 0xfe, 0x00, 0x7b]).unwrap();
    std::fs::create_dir(threads_dir.join("folder.json")).unwrap();

    let reopened = json_store(&dir);
    assert_eq!(reopened.load().unwrap(), 1);
    assert!(reopened.thread(thread_id).is_ok());
}
