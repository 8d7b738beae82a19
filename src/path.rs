//! Path Resolver (C7): walks a slash-delimited path from a starting inode through the Directory
//! Engine (C6), returning the terminal inode number.

use crate::dir::lookup;
use crate::error::{EngineResult, ShellError};
use crate::io::block::read_inode;
use crate::superblock::{Superblock, ROOT_INODE};
use std::fs::File;

/// Splits a path into its non-empty components, ignoring repeated or trailing slashes.
fn components(path: &str) -> Vec<&str> {
	path.split('/').filter(|c| !c.is_empty()).collect()
}

/// Resolves `path` to an inode number, starting from `cwd_inode` (ignored if `path` is absolute).
///
/// An empty path resolves to `cwd_inode`. A missing path component is a recoverable
/// `ShellError::NotFound`, not a fatal error.
pub fn resolve(
	dev: &mut File,
	sb: &Superblock,
	cwd_inode: u32,
	path: &str,
) -> EngineResult<Result<u32, ShellError>> {
	let mut current = if path.starts_with('/') {
		ROOT_INODE
	} else {
		cwd_inode
	};

	for component in components(path) {
		let dir_inode = read_inode(dev, sb, current)?;
		if !dir_inode.is_dir() {
			return Ok(Err(ShellError::NotADirectory));
		}
		match lookup(dev, sb, &dir_inode, component)? {
			Some(next) => current = next,
			None => return Ok(Err(ShellError::NotFound)),
		}
	}
	Ok(Ok(current))
}

/// Resolves the parent directory of `path`: strips the trailing component, then resolves what
/// remains. Returns the parent's inode number together with the trailing component's name.
pub fn resolve_parent<'a>(
	dev: &mut File,
	sb: &Superblock,
	cwd_inode: u32,
	path: &'a str,
) -> EngineResult<Result<(u32, &'a str), ShellError>> {
	let comps = components(path);
	let Some((&name, init)) = comps.split_last() else {
		return Ok(Err(ShellError::InvalidName));
	};
	let parent_path = if path.starts_with('/') {
		format!("/{}", init.join("/"))
	} else {
		init.join("/")
	};
	match resolve(dev, sb, cwd_inode, &parent_path)? {
		Ok(parent) => Ok(Ok((parent, name))),
		Err(e) => Ok(Err(e)),
	}
}

/// Resolves `path` and discards the match, reporting only whether it exists.
pub fn exists(dev: &mut File, sb: &Superblock, cwd_inode: u32, path: &str) -> EngineResult<bool> {
	Ok(resolve(dev, sb, cwd_inode, path)?.is_ok())
}
