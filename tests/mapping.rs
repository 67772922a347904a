use std::sync::atomic::{AtomicU32, Ordering};

use venom_map::{
    granularity, remove_segment, AccessMode, BackingKind, MapError, MapOptions, MapState,
    Mapping, UnlinkPolicy,
};

fn unique_name(tag: &str) -> String {
    static NEXT: AtomicU32 = AtomicU32::new(0);
    format!(
        "venom_map_it_{}_{}_{}",
        tag,
        std::process::id(),
        NEXT.fetch_add(1, Ordering::Relaxed)
    )
}

fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8 + 1).collect()
}

#[test]
fn read_only_open_of_missing_target_fails() {
    let mut seg = Mapping::new(unique_name("missing"), AccessMode::ReadOnly);
    assert!(seg.open().is_err());
    assert_eq!(seg.state(), MapState::Closed);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.bin");
    let mut file = Mapping::new(path.to_str().unwrap(), AccessMode::ReadOnly);
    assert!(matches!(file.open_file(), Err(MapError::FileOpen { .. })));
    assert!(!file.is_open());
}

#[test]
fn write_open_of_missing_target_without_size_fails() {
    let mut seg = Mapping::new(unique_name("nosize"), AccessMode::ReadWrite);
    assert!(seg.open().is_err());
    assert!(!seg.is_open());

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nosize.bin");
    let mut file = Mapping::new(path.to_str().unwrap(), AccessMode::ReadWrite);
    assert!(file.open_file().is_err());
    assert!(!path.exists());
}

#[test]
fn create_sets_exact_size() {
    let mut seg = Mapping::with_size(unique_name("exact"), 1000, AccessMode::ReadWrite);
    seg.open().unwrap();
    assert_eq!(seg.size(), 1000);
    assert_eq!(seg.backing_kind(), Some(BackingKind::Segment));

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("exact.bin");
    let mut file = Mapping::with_size(path.to_str().unwrap(), 1000, AccessMode::ReadWrite);
    file.open_file().unwrap();
    assert_eq!(file.size(), 1000);
    assert_eq!(file.backing_kind(), Some(BackingKind::File));
    assert_eq!(std::fs::metadata(&path).unwrap().len(), 1000);
}

#[test]
fn adopts_existing_size() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("adopt.bin");
    std::fs::write(&path, vec![7u8; 333]).unwrap();

    let mut ro = Mapping::new(path.to_str().unwrap(), AccessMode::ReadOnly);
    ro.open_file().unwrap();
    assert_eq!(ro.size(), 333);

    // Writable with size 0 adopts too, and keeps the content
    let mut rw = Mapping::new(path.to_str().unwrap(), AccessMode::ReadWrite);
    rw.open_file().unwrap();
    assert_eq!(rw.size(), 333);
    rw.map().unwrap();
    assert!(rw.as_slice().unwrap().iter().all(|&b| b == 7));
}

#[test]
fn map_unmap_cycle() {
    let mut seg = Mapping::with_size(unique_name("cycle"), 64, AccessMode::ReadWrite);
    seg.open().unwrap();
    seg.map().unwrap();
    assert!(seg.is_mapped());
    assert!(!seg.data().is_null());

    seg.unmap().unwrap();
    assert!(!seg.is_mapped());
    assert!(seg.is_open());
    assert!(seg.data().is_null());
    seg.unmap().unwrap();
}

#[test]
fn segment_round_trip_between_attachers() {
    let name = unique_name("x");
    let bytes = pattern(64);

    let mut a = Mapping::with_size(&name, 64, AccessMode::ReadWrite);
    a.open().unwrap();
    a.map().unwrap();
    a.as_mut_slice().unwrap().copy_from_slice(&bytes);

    let mut b = Mapping::new(&name, AccessMode::ReadOnly);
    b.open().unwrap();
    b.map().unwrap();
    assert_eq!(b.as_slice().unwrap()[..64], bytes[..]);

    // Reader detaches without removing the segment
    b.close().unwrap();
    let mut c = Mapping::new(&name, AccessMode::ReadOnly);
    c.open().unwrap();
    c.close().unwrap();

    a.close().unwrap();
}

#[test]
fn file_round_trip_across_lifetimes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("f.bin");
    let target = path.to_str().unwrap();
    let bytes = pattern(128);

    {
        let mut a = Mapping::with_size(target, 128, AccessMode::ReadWrite);
        a.open_file().unwrap();
        a.map().unwrap();
        a.write_at(0, &bytes).unwrap();
        a.flush().unwrap();
        a.unmap().unwrap();
        a.close().unwrap();
    }
    assert!(path.exists());

    let mut b = Mapping::new(target, AccessMode::ReadOnly);
    b.open_file().unwrap();
    assert_eq!(b.size(), 128);
    b.map().unwrap();
    assert_eq!(b.as_slice().unwrap(), &bytes[..]);
}

#[test]
fn close_on_never_opened_mapping_is_noop() {
    let mut map = Mapping::new(unique_name("idle"), AccessMode::ReadWrite);
    map.close().unwrap();
    assert_eq!(map.state(), MapState::Closed);
}

#[test]
fn closed_mapping_can_be_reopened() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reopen.bin");

    let mut map = Mapping::with_size(path.to_str().unwrap(), 32, AccessMode::ReadWrite);
    map.open_file().unwrap();
    map.map().unwrap();
    map.close().unwrap();

    map.open_file().unwrap();
    map.map().unwrap();
    assert_eq!(map.size(), 32);
}

#[test]
fn granularity_is_stable_power_of_two() {
    let g = granularity();
    assert!(g > 0);
    assert!(g.is_power_of_two());
    assert_eq!(g, granularity());

    let map = Mapping::new(unique_name("gran"), AccessMode::ReadOnly);
    assert_eq!(map.granularity(), g);
}

#[cfg(unix)]
#[test]
fn recreate_segment_discards_old_content() {
    let name = unique_name("recreate");

    let mut first = Mapping::with_options(
        MapOptions::new(&name)
            .size(64)
            .unlink(UnlinkPolicy::Never),
    );
    first.open().unwrap();
    first.map().unwrap();
    first.as_mut_slice().unwrap().fill(0xEE);
    first.close().unwrap();

    let mut second = Mapping::with_size(&name, 32, AccessMode::ReadWrite);
    second.open().unwrap();
    assert_eq!(second.size(), 32);
    second.map().unwrap();
    assert!(second.as_slice().unwrap().iter().all(|&b| b == 0));
    second.close().unwrap();

    // The creator unlinked it
    let mut gone = Mapping::new(&name, AccessMode::ReadOnly);
    assert!(gone.open().is_err());
}

#[cfg(unix)]
#[test]
fn recreate_over_live_segment_truncates() {
    let name = unique_name("live");

    let mut first = Mapping::with_size(&name, 64, AccessMode::ReadWrite);
    first.open().unwrap();
    first.map().unwrap();
    first.as_mut_slice().unwrap().fill(0xEE);

    let mut second = Mapping::with_size(&name, 32, AccessMode::ReadWrite);
    second.open().unwrap();
    assert_eq!(second.size(), 32);
    second.map().unwrap();
    assert!(second.as_slice().unwrap().iter().all(|&b| b == 0));

    let mut reader = Mapping::new(&name, AccessMode::ReadOnly);
    reader.open().unwrap();
    assert_eq!(reader.size(), 32);
    reader.close().unwrap();

    second.close().unwrap();
    // The first view now covers a shorter object; only release it
    first.close().unwrap();
}

#[cfg(unix)]
#[test]
fn failed_create_leaves_no_segment() {
    let name = unique_name("toolarge");

    let mut seg = Mapping::with_size(&name, usize::MAX, AccessMode::ReadWrite);
    assert!(matches!(seg.open(), Err(MapError::Truncate(_))));
    assert_eq!(seg.state(), MapState::Closed);

    let mut attach = Mapping::new(&name, AccessMode::ReadOnly);
    assert!(attach.open().is_err());
}

#[cfg(unix)]
#[test]
fn unlink_policies() {
    let name = unique_name("policy");

    let mut creator = Mapping::with_options(MapOptions::new(&name).size(16).unlink(UnlinkPolicy::Never));
    creator.open().unwrap();
    drop(creator);

    // Attacher with Always removes it
    let mut attacher =
        Mapping::with_options(MapOptions::new(&name).read_only().unlink(UnlinkPolicy::Always));
    attacher.open().unwrap();
    assert_eq!(attacher.size(), 16);
    attacher.close().unwrap();

    let mut again = Mapping::new(&name, AccessMode::ReadOnly);
    assert!(again.open().is_err());
}

#[cfg(unix)]
#[test]
fn remove_segment_cleans_up_leftovers() {
    let name = unique_name("leftover");

    let mut seg = Mapping::with_options(MapOptions::new(&name).size(8).unlink(UnlinkPolicy::Never));
    seg.open().unwrap();
    seg.close().unwrap();

    let mut probe = Mapping::new(&name, AccessMode::ReadOnly);
    probe.open().unwrap();
    probe.close().unwrap();

    remove_segment(&name).unwrap();
    assert!(probe.open().is_err());
    remove_segment(&name).unwrap();
}

#[test]
fn read_only_with_larger_requested_size_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("small.bin");
    std::fs::write(&path, [1u8; 10]).unwrap();

    let mut map = Mapping::with_size(path.to_str().unwrap(), 4096, AccessMode::ReadOnly);
    assert!(matches!(
        map.open_file(),
        Err(MapError::SizeMismatch {
            requested: 4096,
            actual: 10
        })
    ));
    assert!(!map.is_open());
}

#[test]
fn empty_file_cannot_be_mapped() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.bin");
    std::fs::write(&path, b"").unwrap();

    let mut map = Mapping::new(path.to_str().unwrap(), AccessMode::ReadOnly);
    map.open_file().unwrap();
    assert!(matches!(map.map(), Err(MapError::EmptyObject)));
    assert_eq!(map.state(), MapState::Open);
}

#[test]
fn drop_releases_everything() {
    let name = unique_name("drop");
    {
        let mut seg = Mapping::with_size(&name, 64, AccessMode::ReadWrite);
        seg.open().unwrap();
        seg.map().unwrap();
    }

    let mut after = Mapping::new(&name, AccessMode::ReadOnly);
    assert!(after.open().is_err());
}

#[test]
fn mapping_moves_across_threads() {
    let mut seg = Mapping::with_size(unique_name("send"), 16, AccessMode::ReadWrite);
    seg.open().unwrap();
    seg.map().unwrap();

    let seg = std::thread::spawn(move || {
        let mut seg = seg;
        seg.write_at(0, b"thread").unwrap();
        seg
    })
    .join()
    .unwrap();

    assert_eq!(&seg.as_slice().unwrap()[..6], b"thread");
}
