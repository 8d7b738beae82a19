//! Round-trip and idempotence properties from spec §8, exercised directly against the
//! bitmap/directory/allocation layers rather than through the shell-equivalent helpers.

mod common;

use common::{fixture_path, format_fixture};
use ext2fs::dirent::DirEntry;
use ext2fs::inode::FileType;
use ext2fs::{alloc, dir};

#[test]
fn allocate_block_then_free_block_is_byte_identical() {
    let path = fixture_path("alloc_block_round_trip");
    let mut engine = format_fixture(&path);

    let gd_before = engine.read_group_descriptor(0).unwrap();
    let mut bitmap_before = vec![0u8; common::BLOCK_SIZE as usize];
    {
        let (dev, sb) = engine.parts();
        ext2fs::io::block::read_block(dev, sb, gd_before.block_bitmap, &mut bitmap_before).unwrap();
    }

    let block_no = {
        let (dev, sb) = engine.parts();
        alloc::alloc_block(dev, sb).unwrap()
    };
    {
        let (dev, sb) = engine.parts();
        alloc::free_block(dev, sb, block_no).unwrap();
    }

    let gd_after = engine.read_group_descriptor(0).unwrap();
    let mut bitmap_after = vec![0u8; common::BLOCK_SIZE as usize];
    {
        let (dev, sb) = engine.parts();
        ext2fs::io::block::read_block(dev, sb, gd_after.block_bitmap, &mut bitmap_after).unwrap();
    }

    assert_eq!(bitmap_before, bitmap_after);
    assert_eq!(gd_before.free_blocks_count, gd_after.free_blocks_count);

    // The freed block is immediately re-allocatable.
    let reallocated = {
        let (dev, sb) = engine.parts();
        alloc::alloc_block(dev, sb).unwrap()
    };
    assert_eq!(reallocated, block_no);
}

#[test]
fn allocate_inode_then_free_inode_is_byte_identical() {
    let path = fixture_path("alloc_inode_round_trip");
    let mut engine = format_fixture(&path);

    let inode_no = engine.alloc_inode(1000, 1000).unwrap();
    let fresh = engine.read_inode(inode_no).unwrap();
    engine.free_inode(inode_no, fresh).unwrap();

    let after = engine.read_inode(inode_no).unwrap();
    assert_eq!(after.mode, 0);
    assert_eq!(after.links_count, 0);
    assert_eq!(after.block, [0u32; 15]);

    let reallocated = engine.alloc_inode(1000, 1000).unwrap();
    assert_eq!(reallocated, inode_no);
}

#[test]
fn directory_append_then_remove_round_trips_block_content() {
    let path = fixture_path("dirent_round_trip");
    let mut engine = format_fixture(&path);
    let root_no = engine.root_inode();
    let mut root = engine.read_inode(root_no).unwrap();

    let before = {
        let mut buf = vec![0u8; root.size() as usize];
        engine.read_file(&root, &mut buf, 0).unwrap();
        buf
    };

    let scratch_entry = DirEntry {
        inode: 999,
        file_type: FileType::RegularFile as u8,
        name: "scratch".into(),
    };
    {
        let (dev, sb) = engine.parts();
        dir::append_entry(dev, sb, root_no, &mut root, &scratch_entry).unwrap();
    }
    {
        let (dev, sb) = engine.parts();
        dir::remove_entry(dev, sb, &root, "scratch").unwrap();
    }

    let after = {
        let mut buf = vec![0u8; root.size() as usize];
        engine.read_file(&root, &mut buf, 0).unwrap();
        buf
    };

    assert_eq!(before, after);
}

#[test]
fn append_entry_grows_directory_past_its_first_block_when_full() {
    let path = fixture_path("dir_growth");
    let mut engine = format_fixture(&path);
    let root = engine.root_inode();

    let a_no = common::ops::mkdir(&mut engine, root, "/a").unwrap();
    assert_eq!(engine.read_inode(a_no).unwrap().blocks_used(), 1);

    // Short, fixed-width names (`f00`..`f89`) keep every entry at a fixed 12-byte on-disk size,
    // so this comfortably overruns the ~84 entries a single 1024-byte block can hold alongside
    // `.`/`..` and the sentinel.
    for i in 0..90 {
        common::ops::create(&mut engine, root, &format!("/a/f{i:02}")).expect("create");
    }

    let a_inode = engine.read_inode(a_no).unwrap();
    assert!(a_inode.blocks_used() >= 2, "directory should have grown past one block");
    assert_eq!(a_inode.size(), common::BLOCK_SIZE as u64 * a_inode.blocks_used() as u64);

    let names = common::ops::ls_names(&mut engine, root, "/a");
    assert_eq!(names.len(), 92); // "." + ".." + 90 files
    for i in 0..90 {
        assert!(names.contains(&format!("f{i:02}")));
    }
}

#[test]
fn link_count_matches_directory_records_across_the_tree() {
    let path = fixture_path("link_count_consistency");
    let mut engine = format_fixture(&path);
    let root = engine.root_inode();

    let a_no = common::ops::mkdir(&mut engine, root, "/a").unwrap();
    common::ops::mkdir(&mut engine, a_no, "b").unwrap();
    common::ops::mkdir(&mut engine, a_no, "c").unwrap();

    // /a now contains two subdirectories, so its link count is 1 (the parent's entry) + 2.
    let a_inode = engine.read_inode(a_no).unwrap();
    assert_eq!(a_inode.links_count, 3);

    // Root directly contains one subdirectory (/a), so its link count is 1 + 1.
    let root_inode = engine.read_inode(root).unwrap();
    assert_eq!(root_inode.links_count, 2);
}
