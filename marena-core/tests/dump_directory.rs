//! Integration tests for file-based snapshots.

use marena_core::snapshot::SUMMARY_FILE;
use marena_core::{ArenaConfig, ArenaSummary, MemoryManager, MemoryService};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn dump_files(dir: &Path) -> Vec<serde_json::Value> {
    let mut names: Vec<_> = fs::read_dir(dir)
        .unwrap()
        .flatten()
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("dump_") && n.ends_with(".json"))
        })
        .collect();
    names.sort();

    names
        .into_iter()
        .map(|p| serde_json::from_str(&fs::read_to_string(p).unwrap()).unwrap())
        .collect()
}

fn read_summary(dir: &Path) -> ArenaSummary {
    serde_json::from_str(&fs::read_to_string(dir.join(SUMMARY_FILE)).unwrap()).unwrap()
}

#[test]
fn test_manager_writes_summary_and_dumps() {
    let dir = tempdir().unwrap();
    let config = ArenaConfig::for_testing(128)
        .with_autostart(false)
        .with_dump_directory(dir.path());
    let manager = MemoryManager::new(&config).unwrap();

    assert_eq!(read_summary(dir.path()), ArenaSummary::empty(128));

    let a = manager.create(4, "int").unwrap();
    let b = manager.create(8, "double").unwrap();
    manager.decrease_ref(a).unwrap();
    manager.flush_collection();

    let summary = read_summary(dir.path());
    assert_eq!(summary.allocated_blocks, 1);
    assert_eq!(summary.used_memory, 8);
    assert_eq!(summary.free_memory, 120);
    assert_eq!(summary.next_available_id.as_u64(), 3);

    let dumps = dump_files(dir.path());
    assert_eq!(dumps.len(), 3);

    let last = dumps
        .iter()
        .find(|d| d["blocks"].as_array().is_some_and(|b| b.len() == 1) && d["blocks"][0]["size"] == 8)
        .unwrap();
    assert_eq!(last["blocks"][0]["id"], b.as_u64());
    assert_eq!(last["blocks"][0]["offset"], 0);
    assert_eq!(last["blocks"][0]["type_tag"], "double");
}

#[test]
fn test_no_temp_files_left_behind() {
    let dir = tempdir().unwrap();
    let config = ArenaConfig::for_testing(64).with_dump_directory(dir.path());
    let service = MemoryService::new(&config).unwrap();

    for _ in 0..10 {
        let id = service.create(1, "bool").id;
        service.decrease_ref_count(id);
    }
    service.manager().flush_collection();

    let leftovers: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .flatten()
        .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty());
    assert_eq!(read_summary(dir.path()).allocated_blocks, 0);
}

#[test]
fn test_unwritable_directory_fails_construction() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("not-a-directory");
    fs::write(&file, b"occupied").unwrap();

    let config = ArenaConfig::for_testing(64).with_dump_directory(&file);
    let err = MemoryManager::new(&config).err().unwrap();
    assert_eq!(err.code(), "E104");
}

#[test]
fn test_rejected_config_leaves_no_files() {
    let dir = tempdir().unwrap();
    let dumps = dir.path().join("dumps");

    let mut config = ArenaConfig::for_testing(64).with_dump_directory(&dumps);
    config.collector.thread_name.clear();

    let err = MemoryManager::new(&config).err().unwrap();
    assert_eq!(err.code(), "E106");
    assert!(!dumps.exists());
}
