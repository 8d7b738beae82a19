//! The shell's command surface: one tagged variant per command (per REDESIGN FLAGS, matched
//! through a single dispatcher instead of a function-pointer table), parsed from a raw input
//! line and executed against the engine and the current working directory.

use super::cwd::Cwd;
use super::print;
use ext2fs::dirent::DirEntry;
use ext2fs::error::{CommandError, CommandResult, ShellError};
use ext2fs::inode::FileType;
use ext2fs::Engine;

/// A parsed shell command, tagged by name with its own argument fields.
pub enum Command {
	Ls(String),
	Mkdir(String),
	Rmdir(String),
	Create(String),
	Link { existing: String, new: String },
	Unlink(String),
	Cp { dest: String, source: String },
	Cat(String),
	Cd(String),
	Pwd,
	DiskInfo,
	InodeInfo(String),
	BlockBitmap(u32),
	InodeBitmap(u32),
	RawBlock(u32),
	Menu,
	Exit,
	/// Blank input, or a name not matching any known command.
	Unknown(String),
}

/// Parses one line of shell input into a [`Command`].
pub fn parse(line: &str) -> Command {
	let mut parts = line.split_whitespace();
	let Some(name) = parts.next() else {
		return Command::Unknown(String::new());
	};
	let rest: Vec<&str> = parts.collect();
	let arg = |i: usize| rest.get(i).map(|s| s.to_string()).unwrap_or_default();

	match name {
		"ls" => Command::Ls(arg(0)),
		"mkdir" => Command::Mkdir(arg(0)),
		"rmdir" => Command::Rmdir(arg(0)),
		"create" => Command::Create(arg(0)),
		"link" => Command::Link {
			existing: arg(0),
			new: arg(1),
		},
		"unlink" => Command::Unlink(arg(0)),
		"cp" => Command::Cp {
			dest: arg(0),
			source: arg(1),
		},
		"cat" => Command::Cat(arg(0)),
		"cd" => Command::Cd(arg(0)),
		"pwd" => Command::Pwd,
		"diskinfo" => Command::DiskInfo,
		"inodeinfo" => Command::InodeInfo(arg(0)),
		"blockbitmap" => Command::BlockBitmap(arg(0).parse().unwrap_or(0)),
		"inodebitmap" => Command::InodeBitmap(arg(0).parse().unwrap_or(0)),
		"rawblock" => Command::RawBlock(arg(0).parse().unwrap_or(0)),
		"menu" => Command::Menu,
		"exit" | "quit" => Command::Exit,
		other => Command::Unknown(other.to_string()),
	}
}

/// Executes a parsed command. Returns `Ok(true)` to keep the REPL running, `Ok(false)` to exit.
pub fn execute(cmd: Command, engine: &mut Engine, cwd: &mut Cwd) -> CommandResult<bool> {
	match cmd {
		Command::Ls(path) => ls(engine, cwd, &path)?,
		Command::Mkdir(path) => mkdir(engine, cwd, &path)?,
		Command::Rmdir(path) => rmdir(engine, cwd, &path)?,
		Command::Create(path) => create(engine, cwd, &path)?,
		Command::Link { existing, new } => link(engine, cwd, &existing, &new)?,
		Command::Unlink(path) => unlink(engine, cwd, &path)?,
		Command::Cp { dest, source } => cp(engine, cwd, &dest, &source)?,
		Command::Cat(path) => cat(engine, cwd, &path)?,
		Command::Cd(path) => cd(engine, cwd, &path)?,
		Command::Pwd => println!("{}", cwd.display()),
		Command::DiskInfo => print::print_disk_info(engine.superblock()),
		Command::InodeInfo(path) => inodeinfo(engine, cwd, &path)?,
		Command::BlockBitmap(group) => bitmap_info(engine, group)?,
		Command::InodeBitmap(group) => bitmap_info(engine, group)?,
		Command::RawBlock(n) => rawblock(engine, n)?,
		Command::Menu => print::print_menu(),
		Command::Exit => return Ok(false),
		Command::Unknown(name) => {
			if !name.is_empty() {
				println!("{name}: unknown command (try `menu`)");
			}
		}
	}
	Ok(true)
}

fn current_uid_gid() -> (u16, u16) {
	unsafe { (libc::getuid() as u16, libc::getgid() as u16) }
}

fn ls(engine: &mut Engine, cwd: &mut Cwd, path: &str) -> CommandResult<()> {
	let target = match engine.resolve(cwd.inode(), path)? {
		Ok(inode_no) => inode_no,
		Err(e) => return Err(report("ls", path, e)),
	};
	let inode = engine.read_inode(target)?;
	if inode.is_dir() {
		let entries = engine.list_dir(&inode)?;
		print::print_entries(&entries);
	} else {
		println!("{path}\t{} bytes", inode.size());
	}
	Ok(())
}

fn mkdir(engine: &mut Engine, cwd: &mut Cwd, path: &str) -> CommandResult<()> {
	let (parent_no, name) = match engine.resolve_parent(cwd.inode(), path)? {
		Ok(p) => p,
		Err(e) => return Err(report("mkdir", path, e)),
	};
	if name.is_empty() {
		return Err(report("mkdir", path, ShellError::InvalidName));
	}
	let mut parent = engine.read_inode(parent_no)?;
	if !parent.is_dir() {
		return Err(report("mkdir", path, ShellError::NotADirectory));
	}
	if engine.lookup(&parent, name)?.is_some() {
		return Err(report("mkdir", path, ShellError::AlreadyExists));
	}

	let (uid, gid) = current_uid_gid();
	let new_inode_no = engine.alloc_inode(uid, gid)?;
	let new_inode = engine.new_directory(new_inode_no, parent_no, uid, gid)?;
	engine.write_inode(new_inode_no, &new_inode)?;

	let entry = DirEntry {
		inode: new_inode_no,
		file_type: FileType::Directory as u8,
		name: name.to_string(),
	};
	engine.append_entry(parent_no, &mut parent, &entry)?;
	Ok(())
}

fn rmdir(engine: &mut Engine, cwd: &mut Cwd, path: &str) -> CommandResult<()> {
	let target = match engine.resolve(cwd.inode(), path)? {
		Ok(inode_no) => inode_no,
		Err(e) => return Err(report("rmdir", path, e)),
	};
	let inode = engine.read_inode(target)?;
	if !inode.is_dir() {
		return Err(report("rmdir", path, ShellError::NotADirectory));
	}
	if !engine.is_empty_dir(&inode)? {
		return Err(report("rmdir", path, ShellError::NotEmpty));
	}

	let (parent_no, name) = match engine.resolve_parent(cwd.inode(), path)? {
		Ok(p) => p,
		Err(e) => return Err(report("rmdir", path, e)),
	};
	let mut parent = engine.read_inode(parent_no)?;
	engine.remove_entry(&parent, name).map_err(|e| report("rmdir", path, e))?;
	// The removed entry was itself a directory, so its `..` no longer back-references this one.
	parent.links_count = parent.links_count.saturating_sub(1);
	engine.write_inode(parent_no, &parent)?;
	engine.adjust_used_dirs(target, -1)?;
	engine.free_inode(target, inode)?;
	Ok(())
}

fn create(engine: &mut Engine, cwd: &mut Cwd, path: &str) -> CommandResult<()> {
	let (parent_no, name) = match engine.resolve_parent(cwd.inode(), path)? {
		Ok(p) => p,
		Err(e) => return Err(report("create", path, e)),
	};
	if name.is_empty() {
		return Err(report("create", path, ShellError::InvalidName));
	}
	let mut parent = engine.read_inode(parent_no)?;
	if !parent.is_dir() {
		return Err(report("create", path, ShellError::NotADirectory));
	}
	if engine.lookup(&parent, name)?.is_some() {
		return Err(report("create", path, ShellError::AlreadyExists));
	}

	let (uid, gid) = current_uid_gid();
	let new_inode_no = engine.alloc_inode(uid, gid)?;
	let mut new_inode = engine.read_inode(new_inode_no)?;
	new_inode.links_count = 1;
	engine.write_inode(new_inode_no, &new_inode)?;

	let entry = DirEntry {
		inode: new_inode_no,
		file_type: FileType::RegularFile as u8,
		name: name.to_string(),
	};
	engine.append_entry(parent_no, &mut parent, &entry)?;
	Ok(())
}

fn link(engine: &mut Engine, cwd: &mut Cwd, existing: &str, new: &str) -> CommandResult<()> {
	let existing_no = match engine.resolve(cwd.inode(), existing)? {
		Ok(n) => n,
		Err(e) => return Err(report("link", existing, e)),
	};
	let mut existing_inode = engine.read_inode(existing_no)?;
	if existing_inode.is_dir() {
		return Err(report("link", existing, ShellError::IsADirectory));
	}

	let (parent_no, name) = match engine.resolve_parent(cwd.inode(), new)? {
		Ok(p) => p,
		Err(e) => return Err(report("link", new, e)),
	};
	if name.is_empty() {
		return Err(report("link", new, ShellError::InvalidName));
	}
	let mut parent = engine.read_inode(parent_no)?;
	if engine.lookup(&parent, name)?.is_some() {
		return Err(report("link", new, ShellError::AlreadyExists));
	}

	let entry = DirEntry {
		inode: existing_no,
		file_type: existing_inode.file_type() as u8,
		name: name.to_string(),
	};
	engine.append_entry(parent_no, &mut parent, &entry)?;
	existing_inode.links_count += 1;
	engine.write_inode(existing_no, &existing_inode)?;
	Ok(())
}

fn unlink(engine: &mut Engine, cwd: &mut Cwd, path: &str) -> CommandResult<()> {
	let target = match engine.resolve(cwd.inode(), path)? {
		Ok(n) => n,
		Err(e) => return Err(report("unlink", path, e)),
	};
	let mut inode = engine.read_inode(target)?;
	if inode.is_dir() {
		return Err(report("unlink", path, ShellError::IsADirectory));
	}

	let (parent_no, name) = match engine.resolve_parent(cwd.inode(), path)? {
		Ok(p) => p,
		Err(e) => return Err(report("unlink", path, e)),
	};
	let parent = engine.read_inode(parent_no)?;
	engine.remove_entry(&parent, name).map_err(|e| report("unlink", path, e))?;

	inode.links_count = inode.links_count.saturating_sub(1);
	if inode.links_count == 0 {
		engine.free_inode(target, inode)?;
	} else {
		engine.write_inode(target, &inode)?;
	}
	Ok(())
}

fn cp(engine: &mut Engine, cwd: &mut Cwd, dest: &str, source: &str) -> CommandResult<()> {
	let src_no = match engine.resolve(cwd.inode(), source)? {
		Ok(n) => n,
		Err(e) => return Err(report("cp", source, e)),
	};
	let src_inode = engine.read_inode(src_no)?;
	if !src_inode.is_regular_file() {
		return Err(report("cp", source, ShellError::NotARegularFile));
	}
	let size = src_inode.size() as usize;
	let mut data = vec![0u8; size];
	if size > 0 {
		engine.read_file(&src_inode, &mut data, 0)?;
	}

	let (parent_no, name) = match engine.resolve_parent(cwd.inode(), dest)? {
		Ok(p) => p,
		Err(e) => return Err(report("cp", dest, e)),
	};
	if name.is_empty() {
		return Err(report("cp", dest, ShellError::InvalidName));
	}
	let mut parent = engine.read_inode(parent_no)?;
	if engine.lookup(&parent, name)?.is_some() {
		return Err(report("cp", dest, ShellError::AlreadyExists));
	}

	let (uid, gid) = current_uid_gid();
	let dest_no = engine.alloc_inode(uid, gid)?;
	let mut dest_inode = engine.read_inode(dest_no)?;
	dest_inode.links_count = 1;
	engine.write_file(dest_no, &mut dest_inode, &data, 0)?;

	let entry = DirEntry {
		inode: dest_no,
		file_type: FileType::RegularFile as u8,
		name: name.to_string(),
	};
	engine.append_entry(parent_no, &mut parent, &entry)?;
	Ok(())
}

fn cat(engine: &mut Engine, cwd: &mut Cwd, path: &str) -> CommandResult<()> {
	let target = match engine.resolve(cwd.inode(), path)? {
		Ok(n) => n,
		Err(e) => return Err(report("cat", path, e)),
	};
	let inode = engine.read_inode(target)?;
	if !inode.is_regular_file() {
		return Err(report("cat", path, ShellError::NotARegularFile));
	}
	let size = inode.size() as usize;
	let mut buf = vec![0u8; size];
	if size > 0 {
		engine.read_file(&inode, &mut buf, 0)?;
	}
	use std::io::Write;
	std::io::stdout().write_all(&buf).map_err(CommandError::from)?;
	Ok(())
}

fn cd(engine: &mut Engine, cwd: &mut Cwd, path: &str) -> CommandResult<()> {
	if path.is_empty() {
		return Ok(());
	}
	let target = match engine.resolve(cwd.inode(), path)? {
		Ok(n) => n,
		Err(e) => return Err(report("cd", path, e)),
	};
	let inode = engine.read_inode(target)?;
	if !inode.is_dir() {
		return Err(report("cd", path, ShellError::NotADirectory));
	}
	cwd.cd(path, target);
	Ok(())
}

fn inodeinfo(engine: &mut Engine, cwd: &mut Cwd, path: &str) -> CommandResult<()> {
	let target = match engine.resolve(cwd.inode(), path)? {
		Ok(n) => n,
		Err(e) => return Err(report("inodeinfo", path, e)),
	};
	let inode = engine.read_inode(target)?;
	print::print_inode_info(target, &inode);
	Ok(())
}

fn bitmap_info(engine: &mut Engine, group: u32) -> CommandResult<()> {
	let gd = engine.read_group_descriptor(group)?;
	print::print_group_descriptor(group, &gd);
	Ok(())
}

fn rawblock(engine: &mut Engine, n: u32) -> CommandResult<()> {
	let mut buf = vec![0u8; engine.superblock().block_size() as usize];
	engine.read_block(n, &mut buf)?;
	print::print_raw_block(n, &buf);
	Ok(())
}

fn report(cmd: &str, path: &str, e: ShellError) -> CommandError {
	eprintln!("{cmd}: {path}: {e}");
	CommandError::Recoverable(e)
}
