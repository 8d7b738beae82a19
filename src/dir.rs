//! Directory Engine (C6): enumerates, appends, and compacts the variable-length records packed
//! into a directory inode's data, layered on File I/O (C5).

use crate::dirent::{round_up, DirEntry, ENTRY_ALIGN, ENTRY_HEADER_SIZE};
use crate::error::{EngineResult, ShellError};
use crate::file::{read_file, write_file};
use crate::inode::{FileType, Inode, DEFAULT_DIR_PERM, S_IFDIR};
use crate::superblock::Superblock;
use crate::util::get_timestamp;
use std::fs::File;

/// Reads the entry at `offset` within `inode`'s data, returning it together with the offset of
/// the record that follows.
pub fn read_entry(
	dev: &mut File,
	sb: &Superblock,
	inode: &Inode,
	offset: u32,
) -> EngineResult<(DirEntry, u32)> {
	let mut header = [0u8; ENTRY_HEADER_SIZE as usize];
	read_file(dev, sb, inode, &mut header, offset as u64)?;
	let entry_inode = u32::from_le_bytes(header[0..4].try_into().unwrap());
	let rec_len = u16::from_le_bytes(header[4..6].try_into().unwrap());
	let name_len = header[6];
	let file_type = header[7];

	let mut name_buf = vec![0u8; name_len as usize];
	if name_len > 0 {
		read_file(dev, sb, inode, &mut name_buf, (offset + ENTRY_HEADER_SIZE) as u64)?;
	}
	let entry = DirEntry::decode(entry_inode, file_type, &name_buf);

	let next = if rec_len > 0 {
		offset + rec_len as u32
	} else {
		offset + entry.disk_size()
	};
	Ok((entry, next))
}

/// Writes `entry` at `offset` within `inode`'s data, returning the offset the next record should
/// start at.
///
/// Padding is always forward: the written record's length already accounts for 4-byte alignment,
/// so the returned offset is simply `offset + entry.disk_size()` with no later backward
/// adjustment of the write cursor.
pub fn write_entry(
	dev: &mut File,
	sb: &Superblock,
	inode: &Inode,
	offset: u32,
	entry: &DirEntry,
) -> EngineResult<u32> {
	let rec_len = entry.disk_size() as u16;
	let mut header = [0u8; ENTRY_HEADER_SIZE as usize];
	header[0..4].copy_from_slice(&entry.inode.to_le_bytes());
	header[4..6].copy_from_slice(&rec_len.to_le_bytes());
	header[6] = entry.name.len() as u8;
	header[7] = entry.file_type;
	write_file(dev, sb, inode, &header, offset as u64)?;
	if !entry.name.is_empty() {
		write_file(dev, sb, inode, entry.name.as_bytes(), (offset + ENTRY_HEADER_SIZE) as u64)?;
	}
	let written = ENTRY_HEADER_SIZE + entry.name.len() as u32;
	let padding = round_up(written, ENTRY_ALIGN) - written;
	if padding > 0 {
		let zeroes = [0u8; ENTRY_ALIGN as usize];
		write_file(dev, sb, inode, &zeroes[..padding as usize], (offset + written) as u64)?;
	}
	Ok(offset + entry.disk_size())
}

/// Lists every live (non-sentinel) entry in a directory inode's data, in on-disk order.
pub fn list_entries(dev: &mut File, sb: &Superblock, inode: &Inode) -> EngineResult<Vec<DirEntry>> {
	let mut entries = Vec::new();
	let mut offset = 0u32;
	loop {
		let (entry, next) = read_entry(dev, sb, inode, offset)?;
		if entry.is_sentinel() {
			break;
		}
		entries.push(entry);
		offset = next;
	}
	Ok(entries)
}

/// Scans a directory's entries for one named `name`, returning its inode number.
pub fn lookup(dev: &mut File, sb: &Superblock, inode: &Inode, name: &str) -> EngineResult<Option<u32>> {
	let mut offset = 0u32;
	loop {
		let (entry, next) = read_entry(dev, sb, inode, offset)?;
		if entry.is_sentinel() {
			return Ok(None);
		}
		if entry.name == name {
			return Ok(Some(entry.inode));
		}
		offset = next;
	}
}

/// Appends `new_entry` to a directory's data, just before its sentinel, then rewrites the
/// sentinel immediately after it. Bumps the directory inode's atime, and — only when the new
/// entry is itself a directory — its link count, since a subdirectory's `..` back-references its
/// parent (a plain file or hard-link entry does not add such a reference).
///
/// The caller must have already verified the name does not already exist.
pub fn append_entry(
	dev: &mut File,
	sb: &Superblock,
	dir_inode_no: u32,
	dir_inode: &mut Inode,
	new_entry: &DirEntry,
) -> EngineResult<()> {
	let mut offset = 0u32;
	let sentinel_offset = loop {
		let (entry, next) = read_entry(dev, sb, dir_inode, offset)?;
		if entry.is_sentinel() {
			break offset;
		}
		offset = next;
	};

	// Grow the directory by one block if the new entry plus a fresh sentinel would not fit in
	// the space currently allocated to it.
	let needed_end = sentinel_offset as u64 + new_entry.disk_size() as u64 + ENTRY_HEADER_SIZE as u64;
	let capacity = sb.block_size() as u64 * dir_inode.blocks_used() as u64;
	if needed_end > capacity {
		let grown_blocks = dir_inode.blocks_used() + 1;
		crate::indirect::allocate_chain(dev, sb, dir_inode, grown_blocks)?;
		dir_inode.set_size(sb.block_size() as u64 * grown_blocks as u64);
	}

	let after_new = write_entry(dev, sb, dir_inode, sentinel_offset, new_entry)?;
	write_entry(dev, sb, dir_inode, after_new, &DirEntry::sentinel())?;

	if new_entry.file_type == FileType::Directory as u8 {
		dir_inode.links_count += 1;
	}
	dir_inode.atime = get_timestamp().as_secs() as u32;
	crate::io::block::write_inode(dev, sb, dir_inode_no, dir_inode)?;
	Ok(())
}

/// Removes the entry named `name` from a directory's data, compacting every subsequent record
/// forward by the removed record's size, then writing a fresh sentinel at the new end.
///
/// Returns the removed entry's inode number, or `ShellError::NotFound` if no entry matches.
pub fn remove_entry(
	dev: &mut File,
	sb: &Superblock,
	dir_inode: &Inode,
	name: &str,
) -> Result<u32, ShellError> {
	let mut read_offset = 0u32;
	let removed_inode;
	let mut write_offset;
	loop {
		let (entry, next) = read_entry(dev, sb, dir_inode, read_offset).map_err(|_| ShellError::NotFound)?;
		if entry.is_sentinel() {
			return Err(ShellError::NotFound);
		}
		if entry.name == name {
			removed_inode = entry.inode;
			write_offset = read_offset;
			read_offset = next;
			break;
		}
		read_offset = next;
	}

	loop {
		let (entry, next) = read_entry(dev, sb, dir_inode, read_offset).map_err(|_| ShellError::NotFound)?;
		if entry.is_sentinel() {
			write_entry(dev, sb, dir_inode, write_offset, &DirEntry::sentinel())
				.map_err(|_| ShellError::NotFound)?;
			break;
		}
		write_offset = write_entry(dev, sb, dir_inode, write_offset, &entry).map_err(|_| ShellError::NotFound)?;
		read_offset = next;
	}

	Ok(removed_inode)
}

/// Allocates a fresh directory inode and a single data block, and populates it with `.`
/// (pointing at itself), `..` (pointing at `parent_inode_no`), and a terminating sentinel.
pub fn new_directory(
	dev: &mut File,
	sb: &Superblock,
	self_inode_no: u32,
	parent_inode_no: u32,
	uid: u16,
	gid: u16,
) -> EngineResult<Inode> {
	let block_no = crate::alloc::alloc_block(dev, sb)?;
	crate::io::block::zero_block(dev, sb, block_no)?;

	let now = get_timestamp().as_secs() as u32;
	let mut inode = Inode::zeroed();
	inode.mode = S_IFDIR | DEFAULT_DIR_PERM;
	inode.uid = uid;
	inode.gid = gid;
	inode.ctime = now;
	inode.mtime = now;
	inode.atime = now;
	inode.set_size(sb.block_size() as u64);
	inode.set_blocks_used(1);
	inode.links_count = 1;
	inode.block[0] = block_no;

	let dot = DirEntry {
		inode: self_inode_no,
		file_type: FileType::Directory as u8,
		name: ".".into(),
	};
	let dotdot = DirEntry {
		inode: parent_inode_no,
		file_type: FileType::Directory as u8,
		name: "..".into(),
	};

	let after_dot = write_entry(dev, sb, &inode, 0, &dot)?;
	let after_dotdot = write_entry(dev, sb, &inode, after_dot, &dotdot)?;
	write_entry(dev, sb, &inode, after_dotdot, &DirEntry::sentinel())?;

	crate::alloc::adjust_used_dirs(dev, sb, self_inode_no, 1)?;

	Ok(inode)
}

/// Returns whether a directory contains nothing but `.` and `..` — i.e. is safe to `rmdir`.
pub fn is_empty(dev: &mut File, sb: &Superblock, inode: &Inode) -> EngineResult<bool> {
	let entries = list_entries(dev, sb, inode)?;
	Ok(entries.iter().all(|e| e.name == "." || e.name == ".."))
}
