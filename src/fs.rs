//! Mount / filesystem init (C8) and the `Engine` that owns the open image and exposes the rest
//! of the engine as methods instead of free functions threading a `&mut File` everywhere.

use crate::error::{EngineError, EngineResult};
use crate::inode::Inode;
use crate::io::byte::read_bytes;
use crate::superblock::{Superblock, ROOT_INODE, SUPERBLOCK_OFFSET};
use crate::util::reinterpret_mut;
use std::fs::{File, OpenOptions};
use std::path::Path;

/// An open ext2 image with its superblock cached in memory.
///
/// This replaces the ambient global disk-info/ext-info state the tool this engine is modeled on
/// used: every operation here takes `&mut Engine` explicitly.
pub struct Engine {
	dev: File,
	sb: Superblock,
}

impl Engine {
	/// Opens `image_path` read-write and validates its superblock.
	///
	/// Fails fatally with `EngineError::CorruptSuperblock` if the magic does not match.
	pub fn mount<P: AsRef<Path>>(image_path: P) -> EngineResult<Self> {
		let mut dev = OpenOptions::new().read(true).write(true).open(image_path)?;
		let mut sb = Superblock::zeroed();
		read_bytes(&mut dev, SUPERBLOCK_OFFSET, reinterpret_mut(&mut sb))?;
		if !sb.is_valid() {
			return Err(EngineError::CorruptSuperblock);
		}
		Ok(Self { dev, sb })
	}

	/// The inode number of the filesystem root.
	pub fn root_inode(&self) -> u32 {
		ROOT_INODE
	}

	/// The filesystem's superblock, as read at mount time.
	pub fn superblock(&self) -> &Superblock {
		&self.sb
	}

	/// Grants mutable access to the backing image and the cached superblock together, for
	/// callers that need to drive the free-function engine API (`dir::`, `alloc::`, `file::`,
	/// ...) directly.
	pub fn parts(&mut self) -> (&mut File, &Superblock) {
		(&mut self.dev, &self.sb)
	}

	/// Reads inode `inode_no` from disk.
	pub fn read_inode(&mut self, inode_no: u32) -> EngineResult<Inode> {
		crate::io::block::read_inode(&mut self.dev, &self.sb, inode_no)
	}

	/// Writes `inode` to disk at `inode_no`.
	pub fn write_inode(&mut self, inode_no: u32, inode: &Inode) -> EngineResult<()> {
		crate::io::block::write_inode(&mut self.dev, &self.sb, inode_no, inode)
	}

	/// Resolves `path` to an inode number relative to `cwd_inode`.
	pub fn resolve(
		&mut self,
		cwd_inode: u32,
		path: &str,
	) -> EngineResult<Result<u32, crate::error::ShellError>> {
		crate::path::resolve(&mut self.dev, &self.sb, cwd_inode, path)
	}

	/// Resolves the parent directory of `path` plus the trailing component name.
	pub fn resolve_parent<'a>(
		&mut self,
		cwd_inode: u32,
		path: &'a str,
	) -> EngineResult<Result<(u32, &'a str), crate::error::ShellError>> {
		crate::path::resolve_parent(&mut self.dev, &self.sb, cwd_inode, path)
	}

	/// Lists every live entry in a directory inode's data.
	pub fn list_dir(&mut self, inode: &Inode) -> EngineResult<Vec<crate::dirent::DirEntry>> {
		crate::dir::list_entries(&mut self.dev, &self.sb, inode)
	}

	/// Reads `buf.len()` bytes from an inode's data starting at `offset`.
	pub fn read_file(&mut self, inode: &Inode, buf: &mut [u8], offset: u64) -> EngineResult<()> {
		crate::file::read_file(&mut self.dev, &self.sb, inode, buf, offset)
	}

	/// Ensures `inode`'s data spans at least `count` logical blocks, then writes `buf` at
	/// `offset`.
	pub fn write_file(
		&mut self,
		inode_no: u32,
		inode: &mut Inode,
		buf: &[u8],
		offset: u64,
	) -> EngineResult<()> {
		let block_size = self.sb.block_size() as u64;
		let needed_blocks = ((offset + buf.len() as u64).div_ceil(block_size)) as u32;
		if needed_blocks > inode.blocks_used() {
			crate::indirect::allocate_chain(&mut self.dev, &self.sb, inode, needed_blocks)?;
		}
		crate::file::write_file(&mut self.dev, &self.sb, inode, buf, offset)?;
		let new_size = inode.size().max(offset + buf.len() as u64);
		inode.set_size(new_size);
		self.write_inode(inode_no, inode)
	}

	/// Allocates a fresh inode owned by `uid`/`gid`.
	pub fn alloc_inode(&mut self, uid: u16, gid: u16) -> EngineResult<u32> {
		crate::alloc::alloc_inode(&mut self.dev, &self.sb, uid, gid)
	}

	/// Frees inode `n`, releasing every block it reaches and clearing its bitmap bit.
	pub fn free_inode(&mut self, n: u32, inode: Inode) -> EngineResult<()> {
		crate::alloc::free_inode(&mut self.dev, &self.sb, n, inode)
	}

	/// Adjusts the `used_dirs_count` counter of the group descriptor owning inode `n` by `delta`.
	pub fn adjust_used_dirs(&mut self, n: u32, delta: i16) -> EngineResult<()> {
		crate::alloc::adjust_used_dirs(&mut self.dev, &self.sb, n, delta)
	}

	/// Creates a new directory inode with `.`/`..`/sentinel populated.
	pub fn new_directory(
		&mut self,
		self_inode_no: u32,
		parent_inode_no: u32,
		uid: u16,
		gid: u16,
	) -> EngineResult<Inode> {
		crate::dir::new_directory(&mut self.dev, &self.sb, self_inode_no, parent_inode_no, uid, gid)
	}

	/// Appends a directory record to `dir_inode`'s data.
	pub fn append_entry(
		&mut self,
		dir_inode_no: u32,
		dir_inode: &mut Inode,
		entry: &crate::dirent::DirEntry,
	) -> EngineResult<()> {
		crate::dir::append_entry(&mut self.dev, &self.sb, dir_inode_no, dir_inode, entry)
	}

	/// Removes the directory record named `name` from `dir_inode`'s data.
	pub fn remove_entry(
		&mut self,
		dir_inode: &Inode,
		name: &str,
	) -> Result<u32, crate::error::ShellError> {
		crate::dir::remove_entry(&mut self.dev, &self.sb, dir_inode, name)
	}

	/// Returns whether `inode` (a directory) contains only `.` and `..`.
	pub fn is_empty_dir(&mut self, inode: &Inode) -> EngineResult<bool> {
		crate::dir::is_empty(&mut self.dev, &self.sb, inode)
	}

	/// Looks up a single name within a directory inode's data.
	pub fn lookup(&mut self, dir_inode: &Inode, name: &str) -> EngineResult<Option<u32>> {
		crate::dir::lookup(&mut self.dev, &self.sb, dir_inode, name)
	}

	/// Reads the `group`th group descriptor.
	pub fn read_group_descriptor(&mut self, group: u32) -> EngineResult<crate::group::GroupDescriptor> {
		crate::io::block::read_group_descriptor(&mut self.dev, &self.sb, group)
	}

	/// Reads the full contents of block `block_no`.
	pub fn read_block(&mut self, block_no: u32, buf: &mut [u8]) -> EngineResult<()> {
		crate::io::block::read_block(&mut self.dev, &self.sb, block_no, buf)
	}
}
