//! Structured I/O on top of byte I/O (C2): blocks, block ranges, group descriptors, inodes.

use super::byte::{read_bytes, write_bytes};
use crate::error::{EngineError, EngineResult};
use crate::group::GroupDescriptor;
use crate::inode::Inode;
use crate::superblock::Superblock;
use crate::util::{reinterpret, reinterpret_mut};
use std::fs::File;

/// Checks that `block_no` is within the filesystem's total block count, catching a corrupt
/// on-disk pointer before it turns into an out-of-bounds positioned I/O.
fn check_range(sb: &Superblock, block_no: u32) -> EngineResult<()> {
	if block_no >= sb.total_blocks {
		return Err(EngineError::BlockOutOfRange { block: block_no });
	}
	Ok(())
}

/// Reads the full contents of block `block_no` into `buf`, which must be exactly `block_size`
/// bytes long.
pub fn read_block(dev: &mut File, sb: &Superblock, block_no: u32, buf: &mut [u8]) -> EngineResult<()> {
	debug_assert_eq!(buf.len(), sb.block_size() as usize);
	check_range(sb, block_no)?;
	read_bytes(dev, block_no as u64 * sb.block_size() as u64, buf)?;
	Ok(())
}

/// Writes the full contents of block `block_no` from `buf`, which must be exactly `block_size`
/// bytes long.
pub fn write_block(dev: &mut File, sb: &Superblock, block_no: u32, buf: &[u8]) -> EngineResult<()> {
	debug_assert_eq!(buf.len(), sb.block_size() as usize);
	check_range(sb, block_no)?;
	write_bytes(dev, block_no as u64 * sb.block_size() as u64, buf)?;
	Ok(())
}

/// Writes `sb.block_size()` zero bytes to block `block_no`.
pub fn zero_block(dev: &mut File, sb: &Superblock, block_no: u32) -> EngineResult<()> {
	let zeroes = vec![0u8; sb.block_size() as usize];
	write_block(dev, sb, block_no, &zeroes)
}

/// Reads `buf.len()` bytes from block `block_no` starting at `offset_in_block`.
///
/// Panics (a bug in the caller, not a disk condition) if the requested range does not fit in a
/// single block.
pub fn read_block_part(
	dev: &mut File,
	sb: &Superblock,
	block_no: u32,
	offset_in_block: u32,
	buf: &mut [u8],
) -> EngineResult<()> {
	assert!(
		offset_in_block as u64 + buf.len() as u64 <= sb.block_size() as u64,
		"block_part read out of block bounds"
	);
	check_range(sb, block_no)?;
	let offset = block_no as u64 * sb.block_size() as u64 + offset_in_block as u64;
	read_bytes(dev, offset, buf)?;
	Ok(())
}

/// Writes `buf.len()` bytes to block `block_no` starting at `offset_in_block`.
pub fn write_block_part(
	dev: &mut File,
	sb: &Superblock,
	block_no: u32,
	offset_in_block: u32,
	buf: &[u8],
) -> EngineResult<()> {
	assert!(
		offset_in_block as u64 + buf.len() as u64 <= sb.block_size() as u64,
		"block_part write out of block bounds"
	);
	check_range(sb, block_no)?;
	let offset = block_no as u64 * sb.block_size() as u64 + offset_in_block as u64;
	write_bytes(dev, offset, buf)?;
	Ok(())
}

/// Reads the `group`th group descriptor from the Group Descriptor Table.
pub fn read_group_descriptor(
	dev: &mut File,
	sb: &Superblock,
	group: u32,
) -> EngineResult<GroupDescriptor> {
	let mut gd = GroupDescriptor::default();
	read_bytes(
		dev,
		GroupDescriptor::disk_offset(group, sb),
		reinterpret_mut(&mut gd),
	)?;
	Ok(gd)
}

/// Writes the `group`th group descriptor to the Group Descriptor Table.
pub fn write_group_descriptor(
	dev: &mut File,
	sb: &Superblock,
	group: u32,
	gd: &GroupDescriptor,
) -> EngineResult<()> {
	write_bytes(dev, GroupDescriptor::disk_offset(group, sb), reinterpret(gd))?;
	Ok(())
}

/// Computes `(group, table_index)` for the given 1-based inode number.
fn inode_group_index(inode_no: u32, sb: &Superblock) -> (u32, u32) {
	let zero_based = inode_no - 1;
	(
		zero_based / sb.inodes_per_group,
		zero_based % sb.inodes_per_group,
	)
}

/// Computes the absolute byte offset of inode `inode_no` on disk.
fn inode_disk_offset(dev: &mut File, sb: &Superblock, inode_no: u32) -> EngineResult<u64> {
	let (group, table_index) = inode_group_index(inode_no, sb);
	let gd = read_group_descriptor(dev, sb, group)?;
	let inode_size = sb.inode_size() as u64;
	Ok(gd.inode_table as u64 * sb.block_size() as u64 + table_index as u64 * inode_size)
}

/// Reads inode number `inode_no` (1-based) into memory.
pub fn read_inode(dev: &mut File, sb: &Superblock, inode_no: u32) -> EngineResult<Inode> {
	let offset = inode_disk_offset(dev, sb, inode_no)?;
	let mut inode = Inode::zeroed();
	read_bytes(dev, offset, reinterpret_mut(&mut inode))?;
	Ok(inode)
}

/// Writes inode number `inode_no` (1-based) to disk.
pub fn write_inode(dev: &mut File, sb: &Superblock, inode_no: u32, inode: &Inode) -> EngineResult<()> {
	let offset = inode_disk_offset(dev, sb, inode_no)?;
	write_bytes(dev, offset, reinterpret(inode))?;
	Ok(())
}
