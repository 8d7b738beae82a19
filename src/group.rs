//! The Group Descriptor Table: one record per block group.

use crate::superblock::Superblock;
use std::mem::size_of;

/// A block group descriptor, as stored in the Group Descriptor Table (GDT).
#[repr(C, packed)]
#[derive(Clone, Copy, Default)]
pub struct GroupDescriptor {
	/// The block address of the block usage bitmap.
	pub block_bitmap: u32,
	/// The block address of the inode usage bitmap.
	pub inode_bitmap: u32,
	/// The starting block address of the inode table.
	pub inode_table: u32,
	/// Number of unallocated blocks in the group.
	pub free_blocks_count: u16,
	/// Number of unallocated inodes in the group.
	pub free_inodes_count: u16,
	/// Number of directories in the group.
	pub used_dirs_count: u16,

	/// Structure padding.
	pub _padding: [u8; 14],
}

/// The size in bytes of an on-disk [`GroupDescriptor`] record.
pub const GROUP_DESCRIPTOR_SIZE: usize = size_of::<GroupDescriptor>();

impl GroupDescriptor {
	/// Returns the absolute byte offset of the `group`th group descriptor within the Group
	/// Descriptor Table.
	pub fn disk_offset(group: u32, sb: &Superblock) -> u64 {
		sb.gdt_offset() + group as u64 * GROUP_DESCRIPTOR_SIZE as u64
	}
}
