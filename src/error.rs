//! Error types for the engine.
//!
//! The engine distinguishes two taxonomies of failure (plus allocation exhaustion, which is
//! fatal but reported with its own variants so the message can name the exhausted pool):
//! fatal [`EngineError`]s that abort the whole process, since they mean the on-disk structures
//! can no longer be trusted, and recoverable [`ShellError`]s that a command prints and returns
//! from, leaving the shell loop running.

use std::fmt;
use std::io;

/// A fatal error: the image is corrupt, exhausted, or was asked for something outside of its
/// addressable geometry. There is no reasonable way to continue the current operation.
#[derive(Debug)]
pub enum EngineError {
	/// A positioned read or write on the backing image failed or returned short.
	Io(io::Error),
	/// The superblock magic did not match `0xEF53`.
	CorruptSuperblock,
	/// No free bit was found in any group's inode bitmap.
	OutOfInodes,
	/// No free bit was found in any group's block bitmap.
	OutOfBlocks,
	/// A logical block index fell outside of `[0, triple_end)`.
	UnaddressableBlock {
		/// The logical block index that was requested.
		index: u64,
	},
	/// A block number read back from an on-disk pointer exceeds the filesystem's block count.
	BlockOutOfRange {
		/// The offending block number.
		block: u32,
	},
	/// A file I/O request reached past `inode.blocks_used`: the writer was required to call
	/// `allocate_chain` first.
	ReadPastEnd {
		/// The logical block index that was requested.
		block: u64,
	},
}

impl fmt::Display for EngineError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Io(e) => write!(f, "I/O error: {e}"),
			Self::CorruptSuperblock => {
				write!(f, "bad superblock magic (not an ext2 filesystem?)")
			}
			Self::OutOfInodes => write!(f, "no free inodes left on this filesystem"),
			Self::OutOfBlocks => write!(f, "no free blocks left on this filesystem"),
			Self::UnaddressableBlock { index } => {
				write!(f, "logical block {index} is beyond max supported range")
			}
			Self::BlockOutOfRange { block } => {
				write!(f, "block {block} is out of range for this filesystem")
			}
			Self::ReadPastEnd { block } => {
				write!(f, "logical block {block} is past the end of the file")
			}
		}
	}
}

impl std::error::Error for EngineError {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		match self {
			Self::Io(e) => Some(e),
			_ => None,
		}
	}
}

impl From<io::Error> for EngineError {
	fn from(e: io::Error) -> Self {
		Self::Io(e)
	}
}

/// A user-recoverable error: the command could not complete, but the filesystem and the shell
/// are both still in a well-defined state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellError {
	/// A path component did not match any directory entry.
	NotFound,
	/// A path component that was expected to be a directory was not one.
	NotADirectory,
	/// An operation that requires a non-directory target was given a directory.
	IsADirectory,
	/// The target name already exists in the parent directory.
	AlreadyExists,
	/// `rmdir` was given a directory containing entries other than `.` and `..`.
	NotEmpty,
	/// An operation that requires a regular file was given something else.
	NotARegularFile,
	/// A name was empty, too long, or otherwise unusable as a directory entry name.
	InvalidName,
}

impl fmt::Display for ShellError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let msg = match self {
			Self::NotFound => "No such file or directory",
			Self::NotADirectory => "Not a directory",
			Self::IsADirectory => "Is a directory",
			Self::AlreadyExists => "File exists",
			Self::NotEmpty => "Directory not empty",
			Self::NotARegularFile => "Not a regular file",
			Self::InvalidName => "Invalid name",
		};
		write!(f, "{msg}")
	}
}

impl std::error::Error for ShellError {}

/// The result of an operation that can fail fatally.
pub type EngineResult<T> = Result<T, EngineError>;

/// The result of a shell command: recoverable errors are folded into the fatal error type so
/// that `?` works uniformly across the engine and the command layer, with [`ShellError`]
/// wrapped in [`CommandError::Recoverable`].
#[derive(Debug)]
pub enum CommandError {
	/// A user-recoverable failure; printed by the caller and not propagated further.
	Recoverable(ShellError),
	/// A fatal engine failure; terminates the process.
	Fatal(EngineError),
}

impl fmt::Display for CommandError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Recoverable(e) => write!(f, "{e}"),
			Self::Fatal(e) => write!(f, "{e}"),
		}
	}
}

impl From<ShellError> for CommandError {
	fn from(e: ShellError) -> Self {
		Self::Recoverable(e)
	}
}

impl From<EngineError> for CommandError {
	fn from(e: EngineError) -> Self {
		Self::Fatal(e)
	}
}

impl From<io::Error> for CommandError {
	fn from(e: io::Error) -> Self {
		Self::Fatal(EngineError::Io(e))
	}
}

/// The result type used throughout the command layer.
pub type CommandResult<T> = Result<T, CommandError>;
