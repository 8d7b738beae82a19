//! Shared fixture builder for the integration tests: a freshly formatted, two-group ext2 image
//! with 1024-byte blocks, matching the concrete scenario parameters from spec §8
//! (`block_size = 1024`, `inodes_per_group = 128`, `blocks_per_group = 8192`, two groups).
//!
//! The layout is hand-laid-out rather than built through a richer `mkfs`-style formatter, since
//! the engine under test has no such formatter of its own (mirroring real ext2 tooling, where
//! the disk layout and the driver operating on it are separate programs).

use ext2fs::group::GroupDescriptor;
use ext2fs::io::block::{write_block, write_group_descriptor, write_inode};
use ext2fs::io::byte::write_bytes;
use ext2fs::superblock::{Superblock, EXT2_MAGIC, ROOT_INODE, SUPERBLOCK_OFFSET};
use ext2fs::util::reinterpret;
use ext2fs::{dir, Engine};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

pub const BLOCK_SIZE: u32 = 1024;
pub const BLOCKS_PER_GROUP: u32 = 8192;
pub const INODES_PER_GROUP: u32 = 128;
pub const GROUP_COUNT: u32 = 2;
pub const TOTAL_BLOCKS: u32 = BLOCKS_PER_GROUP * GROUP_COUNT;
pub const TOTAL_INODES: u32 = INODES_PER_GROUP * GROUP_COUNT;

/// Group 0 carries the superblock (block 1), the GDT (block 2), and its own bitmaps/inode table;
/// later groups only carry their own bitmaps/inode table.
const RESERVED_BLOCKS_GROUP0: u32 = 20; // sb(1) + gdt(1) + block bmp(1) + inode bmp(1) + itable(16)
const RESERVED_BLOCKS_GROUP1: u32 = 18; // block bmp(1) + inode bmp(1) + itable(16)

/// Inodes 1 and 3..=10 are reserved placeholders (never looked up); inode 2 is the root.
const RESERVED_INODES_GROUP0: u32 = 10;

pub const FIXTURE_UID: u16 = 1000;
pub const FIXTURE_GID: u16 = 1000;

/// Returns a path under the system temp directory private to one named fixture.
pub fn fixture_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("ext2fs_test_{name}.img"))
}

/// Builds a fresh image at `path` and mounts it, returning the ready-to-use engine.
pub fn format_fixture(path: &Path) -> Engine {
    {
        let mut dev = OpenOptions::new()
            .create(true)
            .truncate(true)
            .read(true)
            .write(true)
            .open(path)
            .expect("create fixture image");
        dev.set_len(TOTAL_BLOCKS as u64 * BLOCK_SIZE as u64)
            .expect("size fixture image");

        let group0_free_blocks = BLOCKS_PER_GROUP - RESERVED_BLOCKS_GROUP0;
        let group1_free_blocks = BLOCKS_PER_GROUP - RESERVED_BLOCKS_GROUP1;
        let group0_free_inodes = INODES_PER_GROUP - RESERVED_INODES_GROUP0;

        let mut sb = Superblock::zeroed();
        sb.total_inodes = TOTAL_INODES;
        sb.total_blocks = TOTAL_BLOCKS;
        sb.free_blocks = group0_free_blocks + group1_free_blocks;
        sb.free_inodes = group0_free_inodes + INODES_PER_GROUP;
        sb.first_data_block = 1;
        sb.block_size_log = 0;
        sb.fragment_size_log = 0;
        sb.blocks_per_group = BLOCKS_PER_GROUP;
        sb.fragments_per_group = BLOCKS_PER_GROUP;
        sb.inodes_per_group = INODES_PER_GROUP;
        sb.magic = EXT2_MAGIC;
        sb.major_version = 1;
        sb.inode_size = 128;
        sb.first_non_reserved_inode = 11;
        write_bytes(&mut dev, SUPERBLOCK_OFFSET, reinterpret(&sb)).expect("write superblock");

        let gd0 = GroupDescriptor {
            block_bitmap: 3,
            inode_bitmap: 4,
            inode_table: 5,
            free_blocks_count: group0_free_blocks as u16,
            free_inodes_count: group0_free_inodes as u16,
            used_dirs_count: 1,
            ..GroupDescriptor::default()
        };
        let gd1 = GroupDescriptor {
            block_bitmap: BLOCKS_PER_GROUP + 1,
            inode_bitmap: BLOCKS_PER_GROUP + 2,
            inode_table: BLOCKS_PER_GROUP + 3,
            free_blocks_count: group1_free_blocks as u16,
            free_inodes_count: INODES_PER_GROUP as u16,
            used_dirs_count: 0,
            ..GroupDescriptor::default()
        };
        write_group_descriptor(&mut dev, &sb, 0, &gd0).expect("write gd0");
        write_group_descriptor(&mut dev, &sb, 1, &gd1).expect("write gd1");

        let mut block_bitmap0 = vec![0u8; BLOCK_SIZE as usize];
        set_bits(&mut block_bitmap0, RESERVED_BLOCKS_GROUP0);
        write_block(&mut dev, &sb, gd0.block_bitmap, &block_bitmap0).expect("write group0 block bitmap");

        let mut block_bitmap1 = vec![0u8; BLOCK_SIZE as usize];
        set_bits(&mut block_bitmap1, RESERVED_BLOCKS_GROUP1);
        write_block(&mut dev, &sb, gd1.block_bitmap, &block_bitmap1).expect("write group1 block bitmap");

        let mut inode_bitmap0 = vec![0u8; BLOCK_SIZE as usize];
        set_bits(&mut inode_bitmap0, RESERVED_INODES_GROUP0);
        write_block(&mut dev, &sb, gd0.inode_bitmap, &inode_bitmap0).expect("write group0 inode bitmap");

        let inode_bitmap1 = vec![0u8; BLOCK_SIZE as usize];
        write_block(&mut dev, &sb, gd1.inode_bitmap, &inode_bitmap1).expect("write group1 inode bitmap");

        // Root is its own parent: `new_directory` populates `.`/`..`/sentinel and allocates the
        // directory's single data block through the ordinary allocator, now that group 0's
        // bitmap/descriptor correctly mark the reserved blocks as used.
        let root_inode = dir::new_directory(&mut dev, &sb, ROOT_INODE, ROOT_INODE, FIXTURE_UID, FIXTURE_GID)
            .expect("build root directory");
        write_inode(&mut dev, &sb, ROOT_INODE, &root_inode).expect("write root inode");
    }

    Engine::mount(path).expect("mount freshly formatted fixture")
}

fn set_bits(bitmap: &mut [u8], count: u32) {
    for bit in 0..count {
        bitmap[(bit / 8) as usize] |= 1 << (bit % 8);
    }
}

/// Shell-command-equivalent operations against the public engine API, used by the integration
/// tests in place of `ext2sh`'s own command handlers (which live in the binary crate and are not
/// reachable from here). Each mirrors the same resolve/validate/mutate sequence the shell uses.
pub mod ops {
    use super::{FIXTURE_GID, FIXTURE_UID};
    use ext2fs::dirent::DirEntry;
    use ext2fs::error::ShellError;
    use ext2fs::inode::FileType;
    use ext2fs::Engine;

    pub fn mkdir(engine: &mut Engine, cwd: u32, path: &str) -> Result<u32, ShellError> {
        let (parent_no, name) = engine.resolve_parent(cwd, path).expect("fatal")?;
        let mut parent = engine.read_inode(parent_no).expect("fatal");
        if engine.lookup(&parent, name).expect("fatal").is_some() {
            return Err(ShellError::AlreadyExists);
        }
        let new_no = engine.alloc_inode(FIXTURE_UID, FIXTURE_GID).expect("fatal");
        let new_inode = engine
            .new_directory(new_no, parent_no, FIXTURE_UID, FIXTURE_GID)
            .expect("fatal");
        engine.write_inode(new_no, &new_inode).expect("fatal");
        let entry = DirEntry {
            inode: new_no,
            file_type: FileType::Directory as u8,
            name: name.to_string(),
        };
        engine.append_entry(parent_no, &mut parent, &entry).expect("fatal");
        Ok(new_no)
    }

    pub fn rmdir(engine: &mut Engine, cwd: u32, path: &str) -> Result<(), ShellError> {
        let target_no = engine.resolve(cwd, path).expect("fatal")?;
        let target = engine.read_inode(target_no).expect("fatal");
        if !engine.is_empty_dir(&target).expect("fatal") {
            return Err(ShellError::NotEmpty);
        }
        let (parent_no, name) = engine.resolve_parent(cwd, path).expect("fatal")?;
        let mut parent = engine.read_inode(parent_no).expect("fatal");
        engine.remove_entry(&parent, name)?;
        parent.links_count = parent.links_count.saturating_sub(1);
        engine.write_inode(parent_no, &parent).expect("fatal");
        engine.adjust_used_dirs(target_no, -1).expect("fatal");
        engine.free_inode(target_no, target).expect("fatal");
        Ok(())
    }

    pub fn create(engine: &mut Engine, cwd: u32, path: &str) -> Result<u32, ShellError> {
        let (parent_no, name) = engine.resolve_parent(cwd, path).expect("fatal")?;
        let mut parent = engine.read_inode(parent_no).expect("fatal");
        if engine.lookup(&parent, name).expect("fatal").is_some() {
            return Err(ShellError::AlreadyExists);
        }
        let new_no = engine.alloc_inode(FIXTURE_UID, FIXTURE_GID).expect("fatal");
        let mut new_inode = engine.read_inode(new_no).expect("fatal");
        new_inode.links_count = 1;
        engine.write_inode(new_no, &new_inode).expect("fatal");
        let entry = DirEntry {
            inode: new_no,
            file_type: FileType::RegularFile as u8,
            name: name.to_string(),
        };
        engine.append_entry(parent_no, &mut parent, &entry).expect("fatal");
        Ok(new_no)
    }

    pub fn cp(engine: &mut Engine, cwd: u32, dest: &str, source: &str) -> Result<u32, ShellError> {
        let src_no = engine.resolve(cwd, source).expect("fatal")?;
        let src_inode = engine.read_inode(src_no).expect("fatal");
        let size = src_inode.size() as usize;
        let mut data = vec![0u8; size];
        if size > 0 {
            engine.read_file(&src_inode, &mut data, 0).expect("fatal");
        }

        let (parent_no, name) = engine.resolve_parent(cwd, dest).expect("fatal")?;
        let mut parent = engine.read_inode(parent_no).expect("fatal");
        if engine.lookup(&parent, name).expect("fatal").is_some() {
            return Err(ShellError::AlreadyExists);
        }

        let dest_no = engine.alloc_inode(FIXTURE_UID, FIXTURE_GID).expect("fatal");
        let mut dest_inode = engine.read_inode(dest_no).expect("fatal");
        dest_inode.links_count = 1;
        engine.write_file(dest_no, &mut dest_inode, &data, 0).expect("fatal");

        let entry = DirEntry {
            inode: dest_no,
            file_type: FileType::RegularFile as u8,
            name: name.to_string(),
        };
        engine.append_entry(parent_no, &mut parent, &entry).expect("fatal");
        Ok(dest_no)
    }

    pub fn write_file(engine: &mut Engine, inode_no: u32, data: &[u8]) {
        let mut inode = engine.read_inode(inode_no).expect("fatal");
        engine.write_file(inode_no, &mut inode, data, 0).expect("fatal");
    }

    pub fn read_file(engine: &mut Engine, path: &str, cwd: u32) -> Vec<u8> {
        let inode_no = engine.resolve(cwd, path).expect("fatal").expect("exists");
        let inode = engine.read_inode(inode_no).expect("fatal");
        let mut buf = vec![0u8; inode.size() as usize];
        if !buf.is_empty() {
            engine.read_file(&inode, &mut buf, 0).expect("fatal");
        }
        buf
    }

    pub fn link(engine: &mut Engine, cwd: u32, existing: &str, new: &str) -> Result<(), ShellError> {
        let existing_no = engine.resolve(cwd, existing).expect("fatal")?;
        let mut existing_inode = engine.read_inode(existing_no).expect("fatal");
        if existing_inode.is_dir() {
            return Err(ShellError::IsADirectory);
        }
        let (parent_no, name) = engine.resolve_parent(cwd, new).expect("fatal")?;
        let mut parent = engine.read_inode(parent_no).expect("fatal");
        if engine.lookup(&parent, name).expect("fatal").is_some() {
            return Err(ShellError::AlreadyExists);
        }
        let entry = DirEntry {
            inode: existing_no,
            file_type: existing_inode.file_type() as u8,
            name: name.to_string(),
        };
        engine.append_entry(parent_no, &mut parent, &entry).expect("fatal");
        existing_inode.links_count += 1;
        engine.write_inode(existing_no, &existing_inode).expect("fatal");
        Ok(())
    }

    pub fn unlink(engine: &mut Engine, cwd: u32, path: &str) -> Result<(), ShellError> {
        let target_no = engine.resolve(cwd, path).expect("fatal")?;
        let mut inode = engine.read_inode(target_no).expect("fatal");
        let (parent_no, name) = engine.resolve_parent(cwd, path).expect("fatal")?;
        let parent = engine.read_inode(parent_no).expect("fatal");
        engine.remove_entry(&parent, name)?;
        inode.links_count = inode.links_count.saturating_sub(1);
        if inode.links_count == 0 {
            engine.free_inode(target_no, inode).expect("fatal");
        } else {
            engine.write_inode(target_no, &inode).expect("fatal");
        }
        Ok(())
    }

    pub fn ls_names(engine: &mut Engine, cwd: u32, path: &str) -> Vec<String> {
        let target_no = engine.resolve(cwd, path).expect("fatal").expect("exists");
        let inode = engine.read_inode(target_no).expect("fatal");
        engine
            .list_dir(&inode)
            .expect("fatal")
            .into_iter()
            .map(|e| e.name)
            .collect()
    }
}
