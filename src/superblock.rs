//! The ext2 superblock: on-disk layout and the derived geometry read from it.

use crate::util::pow2;
use std::mem::size_of;

/// The absolute byte offset of the superblock from the start of the image.
pub const SUPERBLOCK_OFFSET: u64 = 1024;
/// The filesystem's magic signature.
pub const EXT2_MAGIC: u16 = 0xef53;
/// The inode number of the filesystem root.
pub const ROOT_INODE: u32 = 2;
/// The first inode number reserved by the first non-reserved-inode default (no `resize_inode`,
/// `journal`, etc. are modeled by this engine; new inodes are always allocated by bitmap scan).
pub const FIRST_NON_RESERVED_INODE_DEFAULT: u32 = 11;

/// The ext2 superblock, as stored on disk. Field widths and order follow the published ext2
/// on-disk layout exactly; unused/unsupported fields (journal, compression, OS-specific) are
/// still carried so that reads/writes round-trip byte for byte.
#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct Superblock {
	/// Total number of inodes in the filesystem.
	pub total_inodes: u32,
	/// Total number of blocks in the filesystem.
	pub total_blocks: u32,
	/// Number of blocks reserved for the superuser.
	pub superuser_blocks: u32,
	/// Total number of unallocated blocks.
	pub free_blocks: u32,
	/// Total number of unallocated inodes.
	pub free_inodes: u32,
	/// Block number of the block containing the superblock (`s_first_data_block`).
	pub first_data_block: u32,
	/// `log2(block_size) - 10`.
	pub block_size_log: u32,
	/// `log2(fragment_size) - 10`.
	pub fragment_size_log: u32,
	/// The number of blocks per block group.
	pub blocks_per_group: u32,
	/// The number of fragments per block group.
	pub fragments_per_group: u32,
	/// The number of inodes per block group.
	pub inodes_per_group: u32,
	/// The timestamp of the last mount operation.
	pub last_mount_timestamp: u32,
	/// The timestamp of the last write operation.
	pub last_write_timestamp: u32,
	/// The number of mounts since the last consistency check.
	pub mount_count_since_fsck: u16,
	/// The number of mounts allowed before a consistency check must be done.
	pub mount_count_before_fsck: u16,
	/// The ext2 signature, must equal [`EXT2_MAGIC`].
	pub magic: u16,
	/// The filesystem's state.
	pub fs_state: u16,
	/// The action to perform when an error is detected.
	pub error_action: u16,
	/// The minor version.
	pub minor_version: u16,
	/// The timestamp of the last consistency check.
	pub last_fsck_timestamp: u32,
	/// The interval between mandatory consistency checks.
	pub fsck_interval: u32,
	/// The id of the operating system that created the filesystem.
	pub os_id: u32,
	/// The major version.
	pub major_version: u32,
	/// The UID of the user that can use reserved blocks.
	pub uid_reserved: u16,
	/// The GID of the group that can use reserved blocks.
	pub gid_reserved: u16,

	// Extended superblock fields (valid when `major_version >= 1`).
	/// The first non-reserved inode.
	pub first_non_reserved_inode: u32,
	/// The size of the inode structure in bytes.
	pub inode_size: u16,
	/// The block group containing this copy of the superblock.
	pub superblock_group: u16,
	/// Optional features for the implementation to support.
	pub optional_features: u32,
	/// Required features for the implementation to support.
	pub required_features: u32,
	/// Required features for the implementation to support for writing.
	pub write_required_features: u32,
	/// The filesystem id.
	pub filesystem_id: [u8; 16],
	/// The volume name.
	pub volume_name: [u8; 16],
	/// The path the volume was last mounted to.
	pub last_mount_path: [u8; 64],
	/// Used compression algorithms.
	pub compression_algorithms: u32,
	/// The number of blocks to preallocate for files.
	pub files_preallocate_count: u8,
	/// The number of blocks to preallocate for directories.
	pub directories_preallocate_count: u8,
	/// Unused padding.
	pub _unused: u16,
	/// The journal ID. Unused by this engine (no journaling support).
	pub journal_id: [u8; 16],
	/// The journal inode. Unused by this engine.
	pub journal_inode: u32,
	/// The journal device. Unused by this engine.
	pub journal_device: u32,
	/// The head of the orphan inode list. Unused by this engine.
	pub orphan_inode_head: u32,

	/// Structure padding, bringing the superblock up to 1024 bytes.
	pub _padding: [u8; 788],
}

impl Superblock {
	/// Returns a zeroed superblock, to be filled in by a raw read from disk.
	pub fn zeroed() -> Self {
		unsafe { std::mem::zeroed() }
	}

	/// Returns the block size in bytes (`1024 << log_block_size`).
	pub fn block_size(&self) -> u32 {
		pow2(self.block_size_log + 10) as u32
	}

	/// Returns the size of an inode record in bytes.
	pub fn inode_size(&self) -> u16 {
		if self.major_version >= 1 {
			self.inode_size
		} else {
			128
		}
	}

	/// Returns the total number of block groups, derived as
	/// `ceil(total_blocks / blocks_per_group)`.
	pub fn group_count(&self) -> u32 {
		self.total_blocks.div_ceil(self.blocks_per_group)
	}

	/// Returns the absolute byte offset of the Group Descriptor Table: the block immediately
	/// following the superblock's own block.
	///
	/// This is keyed off `first_data_block` rather than hardcoded to block 2, so that larger
	/// block sizes (where the superblock's block is block 0) still locate the table correctly.
	pub fn gdt_offset(&self) -> u64 {
		(self.first_data_block as u64 + 1) * self.block_size() as u64
	}

	/// Returns whether this is structurally a valid ext2 superblock.
	pub fn is_valid(&self) -> bool {
		self.magic == EXT2_MAGIC
	}
}

/// The size in bytes of an on-disk [`Superblock`] record.
pub const SUPERBLOCK_SIZE: usize = size_of::<Superblock>();
