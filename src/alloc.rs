//! Bitmap allocation and deallocation of inodes and blocks (C3).

use crate::bitmap::{BitPosition, BitmapView};
use crate::error::{EngineError, EngineResult};
use crate::group::GroupDescriptor;
use crate::indirect;
use crate::inode::{Inode, DEFAULT_FILE_PERM, S_IFREG};
use crate::io::block::{read_block, read_group_descriptor, write_block, write_group_descriptor, write_inode};
use crate::superblock::Superblock;
use crate::util::get_timestamp;
use std::fs::File;

/// Scans every group's block bitmap in order and returns the first free block number, marking
/// it used on disk. Block 0 is the NULL sentinel and is never handed out.
///
/// Fails fatally with [`EngineError::OutOfBlocks`] if every group's bitmap is full.
pub fn alloc_block(dev: &mut File, sb: &Superblock) -> EngineResult<u32> {
	for group in 0..sb.group_count() {
		let gd = read_group_descriptor(dev, sb, group)?;
		let mut buf = vec![0u8; sb.block_size() as usize];
		read_block(dev, sb, gd.block_bitmap, &mut buf)?;
		let found = {
			let view = BitmapView::new(&mut buf);
			view.scan_first_free(sb.blocks_per_group)
		};
		let Some((byte, bit)) = found else {
			continue;
		};
		let pos = BitPosition { group, byte, bit };
		let block_no = pos.compose(sb.blocks_per_group);
		BitmapView::new(&mut buf).set(byte, bit);
		write_block(dev, sb, gd.block_bitmap, &buf)?;
		let mut gd = gd;
		gd.free_blocks_count -= 1;
		write_group_descriptor(dev, sb, group, &gd)?;
		return Ok(block_no);
	}
	Err(EngineError::OutOfBlocks)
}

/// Releases block `b` back to its group's free pool and zeroes its content on disk.
///
/// A no-op when `b == 0` (the NULL sentinel is never allocated, so freeing it is always
/// vacuous — this lets callers free inode block-pointer slots unconditionally).
pub fn free_block(dev: &mut File, sb: &Superblock, b: u32) -> EngineResult<()> {
	if b == 0 {
		return Ok(());
	}
	let zeroes = vec![0u8; sb.block_size() as usize];
	write_block(dev, sb, b, &zeroes)?;

	let pos = BitPosition::decompose(b, sb.blocks_per_group);
	let gd = read_group_descriptor(dev, sb, pos.group)?;
	let mut buf = vec![0u8; sb.block_size() as usize];
	read_block(dev, sb, gd.block_bitmap, &mut buf)?;
	BitmapView::new(&mut buf).clear(pos.byte, pos.bit);
	write_block(dev, sb, gd.block_bitmap, &buf)?;

	let mut gd = gd;
	gd.free_blocks_count += 1;
	write_group_descriptor(dev, sb, pos.group, &gd)
}

/// Scans every group's inode bitmap in order, marks the first free inode used, and writes a
/// freshly initialized inode record (owned by `uid`/`gid`, zero size, zero links, no blocks) at
/// that slot.
///
/// Fails fatally with [`EngineError::OutOfInodes`] if every group's bitmap is full.
pub fn alloc_inode(dev: &mut File, sb: &Superblock, uid: u16, gid: u16) -> EngineResult<u32> {
	for group in 0..sb.group_count() {
		let gd = read_group_descriptor(dev, sb, group)?;
		let mut buf = vec![0u8; sb.block_size() as usize];
		read_block(dev, sb, gd.inode_bitmap, &mut buf)?;
		let found = {
			let view = BitmapView::new(&mut buf);
			view.scan_first_free(sb.inodes_per_group)
		};
		let Some((byte, bit)) = found else {
			continue;
		};
		let pos = BitPosition { group, byte, bit };
		let inode_no = pos.compose(sb.inodes_per_group);
		BitmapView::new(&mut buf).set(byte, bit);
		write_block(dev, sb, gd.inode_bitmap, &buf)?;
		let mut gd = gd;
		gd.free_inodes_count -= 1;
		write_group_descriptor(dev, sb, group, &gd)?;

		let now = get_timestamp().as_secs() as u32;
		let mut inode = Inode::zeroed();
		inode.mode = S_IFREG | DEFAULT_FILE_PERM;
		inode.uid = uid;
		inode.gid = gid;
		inode.ctime = now;
		inode.mtime = now;
		inode.atime = now;
		write_inode(dev, sb, inode_no, &inode)?;

		return Ok(inode_no);
	}
	Err(EngineError::OutOfInodes)
}

/// Adjusts the `used_dirs_count` counter of the group descriptor owning inode `n` by `delta`,
/// keeping that on-disk counter in sync with the number of directory inodes actually live in the
/// group (spec.md §3's group descriptor fields, not covered by the documented superblock
/// free-counter staleness resolution).
pub fn adjust_used_dirs(dev: &mut File, sb: &Superblock, n: u32, delta: i16) -> EngineResult<()> {
	let pos = BitPosition::decompose(n, sb.inodes_per_group);
	let mut gd = read_group_descriptor(dev, sb, pos.group)?;
	gd.used_dirs_count = (gd.used_dirs_count as i32 + delta as i32) as u16;
	write_group_descriptor(dev, sb, pos.group, &gd)
}

/// Frees every data and index block reachable from inode `n`'s 15 block pointers, zeroes its
/// inode record, and clears its bit in the owning group's inode bitmap.
pub fn free_inode(dev: &mut File, sb: &Superblock, n: u32, mut inode: Inode) -> EngineResult<()> {
	indirect::free_all(dev, sb, &mut inode)?;
	write_inode(dev, sb, n, &Inode::zeroed())?;

	let pos = BitPosition::decompose(n, sb.inodes_per_group);
	let gd = read_group_descriptor(dev, sb, pos.group)?;
	let mut buf = vec![0u8; sb.block_size() as usize];
	read_block(dev, sb, gd.inode_bitmap, &mut buf)?;
	BitmapView::new(&mut buf).clear(pos.byte, pos.bit);
	write_block(dev, sb, gd.inode_bitmap, &buf)?;

	let mut gd: GroupDescriptor = gd;
	gd.free_inodes_count += 1;
	write_group_descriptor(dev, sb, pos.group, &gd)
}
