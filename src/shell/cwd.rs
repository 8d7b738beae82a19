//! The shell's current working directory: an owned list of path components plus the terminal
//! inode number, instead of a linked parent/child chain of path records.

/// The current working directory, tracked as the component names from root plus the inode
/// number those components resolve to.
pub struct Cwd {
	components: Vec<String>,
	inode: u32,
}

impl Cwd {
	/// Starts a `Cwd` at the filesystem root.
	pub fn root(root_inode: u32) -> Self {
		Self {
			components: Vec::new(),
			inode: root_inode,
		}
	}

	/// The inode number the current working directory resolves to.
	pub fn inode(&self) -> u32 {
		self.inode
	}

	/// Moves the current working directory to `path` (already resolved to `new_inode` by the
	/// caller), updating the displayed component list by textual normalization: `..` pops a
	/// component, `.` is a no-op, anything else pushes. There are no symlinks to chase, so this
	/// purely syntactic walk always matches the inode resolution the caller already performed.
	pub fn cd(&mut self, path: &str, new_inode: u32) {
		let mut stack = if path.starts_with('/') {
			Vec::new()
		} else {
			self.components.clone()
		};
		for component in path.split('/').filter(|c| !c.is_empty()) {
			match component {
				"." => {}
				".." => {
					stack.pop();
				}
				other => stack.push(other.to_string()),
			}
		}
		self.components = stack;
		self.inode = new_inode;
	}

	/// Renders the absolute path of the current working directory, e.g. `/a/b`, or `/` at root.
	pub fn display(&self) -> String {
		if self.components.is_empty() {
			"/".to_string()
		} else {
			format!("/{}", self.components.join("/"))
		}
	}
}
