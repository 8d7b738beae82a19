//! Indirect block addressing (C4): translating a logical file-block index into a physical block
//! number, allocating intermediate index blocks lazily, and freeing whole subtrees on deletion.

use crate::alloc::{alloc_block, free_block};
use crate::error::{EngineError, EngineResult};
use crate::inode::{Inode, BLOCK_PTRS, DOUBLE_INDIRECT, SINGLE_INDIRECT, TRIPLE_INDIRECT};
use crate::io::block::{read_block, write_block, zero_block};
use crate::superblock::Superblock;
use std::fs::File;

/// The logical block ranges addressed by each indirection level, derived from the block size.
#[derive(Debug, Clone, Copy)]
pub struct IndirectRange {
	/// Number of 32-bit block-number entries that fit in one index block.
	pub indirects_per_block: u64,
	/// First logical index addressed through single indirection (== [`crate::inode::DIRECT_BLOCKS`]).
	pub single_start: u64,
	/// First logical index addressed through double indirection.
	pub double_start: u64,
	/// First logical index addressed through triple indirection.
	pub triple_start: u64,
	/// One past the last logical index addressable at all.
	pub triple_end: u64,
}

impl IndirectRange {
	/// Derives the indirect addressing geometry from the filesystem's block size.
	pub fn for_superblock(sb: &Superblock) -> Self {
		let indirects_per_block = (sb.block_size() / 4) as u64;
		let single_start = crate::inode::DIRECT_BLOCKS as u64;
		let double_start = single_start + indirects_per_block;
		let triple_start = double_start + indirects_per_block * indirects_per_block;
		let triple_end =
			triple_start + indirects_per_block * indirects_per_block * indirects_per_block;
		Self {
			indirects_per_block,
			single_start,
			double_start,
			triple_start,
			triple_end,
		}
	}
}

/// How many indirection levels separate a logical index from its physical block, and the chain
/// of entry offsets (within each level's index block) to walk to reach it.
enum Classification {
	Direct { direct_index: usize },
	Indirect { levels: Vec<u64> },
}

fn classify(i: u64, range: &IndirectRange) -> EngineResult<Classification> {
	if i < range.single_start {
		return Ok(Classification::Direct {
			direct_index: i as usize,
		});
	}
	if i < range.double_start {
		return Ok(Classification::Indirect {
			levels: vec![i - range.single_start],
		});
	}
	if i < range.triple_start {
		let off = i - range.double_start;
		return Ok(Classification::Indirect {
			levels: vec![
				off / range.indirects_per_block,
				off % range.indirects_per_block,
			],
		});
	}
	if i < range.triple_end {
		let off = i - range.triple_start;
		let per_block = range.indirects_per_block;
		return Ok(Classification::Indirect {
			levels: vec![
				off / (per_block * per_block),
				(off / per_block) % per_block,
				off % per_block,
			],
		});
	}
	Err(EngineError::UnaddressableBlock { index: i })
}

/// Reads the 32-bit block-number entry at `index` within index block `block_no`.
fn read_index_entry(dev: &mut File, sb: &Superblock, block_no: u32, index: u64) -> EngineResult<u32> {
	let mut buf = vec![0u8; sb.block_size() as usize];
	read_block(dev, sb, block_no, &mut buf)?;
	let off = index as usize * 4;
	Ok(u32::from_le_bytes(buf[off..off + 4].try_into().unwrap()))
}

/// Writes the 32-bit block-number entry at `index` within index block `block_no`.
fn write_index_entry(
	dev: &mut File,
	sb: &Superblock,
	block_no: u32,
	index: u64,
	value: u32,
) -> EngineResult<()> {
	let mut buf = vec![0u8; sb.block_size() as usize];
	read_block(dev, sb, block_no, &mut buf)?;
	let off = index as usize * 4;
	buf[off..off + 4].copy_from_slice(&value.to_le_bytes());
	write_block(dev, sb, block_no, &buf)
}

/// Looks up the physical block number for logical block index `i`, without allocating anything.
///
/// A zero pointer anywhere along the path (including the direct slot) yields `Ok(0)`: the
/// caller distinguishes a hole from a real block by checking for zero.
pub fn lookup(dev: &mut File, sb: &Superblock, inode: &Inode, i: u64) -> EngineResult<u32> {
	let range = IndirectRange::for_superblock(sb);
	match classify(i, &range)? {
		Classification::Direct { direct_index } => Ok(inode.block[direct_index]),
		Classification::Indirect { levels } => {
			let root_index = match levels.len() {
				1 => SINGLE_INDIRECT,
				2 => DOUBLE_INDIRECT,
				3 => TRIPLE_INDIRECT,
				_ => unreachable!(),
			};
			let mut block_no = inode.block[root_index];
			if block_no == 0 {
				return Ok(0);
			}
			// All but the last level index into an index block to find the next index block;
			// the last level indexes into an index block to find the physical block itself.
			for &level_index in &levels[..levels.len() - 1] {
				block_no = read_index_entry(dev, sb, block_no, level_index)?;
				if block_no == 0 {
					return Ok(0);
				}
			}
			let leaf_index = *levels.last().unwrap();
			read_index_entry(dev, sb, block_no, leaf_index)
		}
	}
}

/// Ensures every logical block in `[0, count)` has a physical block allocated, allocating
/// intermediate index blocks and leaf data blocks as needed, and sets `inode.blocks_used` to
/// `count`.
pub fn allocate_chain(dev: &mut File, sb: &Superblock, inode: &mut Inode, count: u32) -> EngineResult<()> {
	let range = IndirectRange::for_superblock(sb);
	for i in 0..count as u64 {
		ensure_block(dev, sb, inode, i, &range)?;
	}
	inode.set_blocks_used(count);
	Ok(())
}

/// Ensures a single logical block index has a physical block allocated, without touching
/// `blocks_used` (the caller updates that once for the whole chain).
fn ensure_block(
	dev: &mut File,
	sb: &Superblock,
	inode: &mut Inode,
	i: u64,
	range: &IndirectRange,
) -> EngineResult<()> {
	match classify(i, range)? {
		Classification::Direct { direct_index } => {
			if inode.block[direct_index] == 0 {
				inode.block[direct_index] = alloc_block(dev, sb)?;
			}
			Ok(())
		}
		Classification::Indirect { levels } => {
			let root_index = match levels.len() {
				1 => SINGLE_INDIRECT,
				2 => DOUBLE_INDIRECT,
				3 => TRIPLE_INDIRECT,
				_ => unreachable!(),
			};
			if inode.block[root_index] == 0 {
				let new_block = alloc_block(dev, sb)?;
				zero_block(dev, sb, new_block)?;
				inode.block[root_index] = new_block;
			}
			let mut block_no = inode.block[root_index];
			for &level_index in &levels[..levels.len() - 1] {
				let mut next = read_index_entry(dev, sb, block_no, level_index)?;
				if next == 0 {
					next = alloc_block(dev, sb)?;
					zero_block(dev, sb, next)?;
					write_index_entry(dev, sb, block_no, level_index, next)?;
				}
				block_no = next;
			}
			let leaf_index = *levels.last().unwrap();
			let leaf = read_index_entry(dev, sb, block_no, leaf_index)?;
			if leaf == 0 {
				let new_block = alloc_block(dev, sb)?;
				write_index_entry(dev, sb, block_no, leaf_index, new_block)?;
			}
			Ok(())
		}
	}
}

/// Recursively frees an index block's subtree at the given indirection `depth` (0 = the block
/// holds leaf data-block pointers, 1 = it holds pointers to such blocks, and so on), then frees
/// the index block itself.
fn free_subtree(dev: &mut File, sb: &Superblock, block_no: u32, depth: u32) -> EngineResult<()> {
	if block_no == 0 {
		return Ok(());
	}
	let mut buf = vec![0u8; sb.block_size() as usize];
	read_block(dev, sb, block_no, &mut buf)?;
	let entries = sb.block_size() as usize / 4;
	for i in 0..entries {
		let off = i * 4;
		let child = u32::from_le_bytes(buf[off..off + 4].try_into().unwrap());
		if child == 0 {
			continue;
		}
		if depth == 0 {
			free_block(dev, sb, child)?;
		} else {
			free_subtree(dev, sb, child, depth - 1)?;
		}
	}
	free_block(dev, sb, block_no)
}

/// Frees every data block and index block reachable from the inode's 15 block pointers, per
/// direct/single/double/triple indirection.
pub fn free_all(dev: &mut File, sb: &Superblock, inode: &mut Inode) -> EngineResult<()> {
	for i in 0..crate::inode::DIRECT_BLOCKS {
		free_block(dev, sb, inode.block[i])?;
	}
	free_subtree(dev, sb, inode.block[SINGLE_INDIRECT], 0)?;
	free_subtree(dev, sb, inode.block[DOUBLE_INDIRECT], 1)?;
	free_subtree(dev, sb, inode.block[TRIPLE_INDIRECT], 2)?;
	inode.block = [0; BLOCK_PTRS];
	inode.set_blocks_used(0);
	Ok(())
}
