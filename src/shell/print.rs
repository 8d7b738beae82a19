//! Pretty-printing for the shell's introspection commands.

use ext2fs::dirent::DirEntry;
use ext2fs::group::GroupDescriptor;
use ext2fs::inode::{FileType, Inode};
use ext2fs::superblock::Superblock;

/// Prints one `ls -l`-style line per directory entry.
pub fn print_entries(entries: &[DirEntry]) {
	for entry in entries {
		let kind = match FileType::from_raw(entry.file_type) {
			FileType::Directory => 'd',
			FileType::Symlink => 'l',
			FileType::CharDevice => 'c',
			FileType::BlockDevice => 'b',
			FileType::Fifo => 'p',
			FileType::Socket => 's',
			_ => '-',
		};
		println!("{kind} {:>8} {}", entry.inode, entry.name);
	}
}

/// Prints the superblock-derived geometry summary used by `diskinfo`.
pub fn print_disk_info(sb: &Superblock) {
	// Packed-struct fields must be copied out to locals before they can be borrowed by a
	// formatting macro.
	let total_blocks = sb.total_blocks;
	let free_blocks = sb.free_blocks;
	let total_inodes = sb.total_inodes;
	let free_inodes = sb.free_inodes;
	let blocks_per_group = sb.blocks_per_group;
	let inodes_per_group = sb.inodes_per_group;
	let first_data_block = sb.first_data_block;

	println!("block size:        {}", sb.block_size());
	println!("total blocks:      {total_blocks}");
	println!("free blocks:       {free_blocks}");
	println!("total inodes:      {total_inodes}");
	println!("free inodes:       {free_inodes}");
	println!("blocks per group:  {blocks_per_group}");
	println!("inodes per group:  {inodes_per_group}");
	println!("group count:       {}", sb.group_count());
	println!("first data block:  {first_data_block}");
	println!("gdt offset:        {}", sb.gdt_offset());
}

/// Prints a single inode's metadata, used by `inodeinfo`.
pub fn print_inode_info(inode_no: u32, inode: &Inode) {
	let mode = inode.mode;
	let uid = inode.uid;
	let gid = inode.gid;
	let links_count = inode.links_count;
	let block: [u32; 15] = inode.block;

	println!("inode:       {inode_no}");
	println!("type:        {:?}", inode.file_type());
	println!("mode:        {mode:#o}");
	println!("uid/gid:     {uid}/{gid}");
	println!("size:        {}", inode.size());
	println!("links:       {links_count}");
	println!("blocks used: {}", inode.blocks_used());
	println!("block[0..]:  {block:?}");
}

/// Prints a group descriptor's bitmap block numbers and free counters, used by `blockbitmap`/
/// `inodebitmap`.
pub fn print_group_descriptor(group: u32, gd: &GroupDescriptor) {
	let block_bitmap = gd.block_bitmap;
	let inode_bitmap = gd.inode_bitmap;
	let inode_table = gd.inode_table;
	let free_blocks_count = gd.free_blocks_count;
	let free_inodes_count = gd.free_inodes_count;
	let used_dirs_count = gd.used_dirs_count;

	println!("group:             {group}");
	println!("block bitmap:      block {block_bitmap}");
	println!("inode bitmap:      block {inode_bitmap}");
	println!("inode table start: block {inode_table}");
	println!("free blocks:       {free_blocks_count}");
	println!("free inodes:       {free_inodes_count}");
	println!("used dirs:         {used_dirs_count}");
}

/// Prints a raw block's bytes as a hex dump, used by `rawblock`.
pub fn print_raw_block(block_no: u32, buf: &[u8]) {
	println!("block {block_no} ({} bytes):", buf.len());
	for (row, chunk) in buf.chunks(16).enumerate() {
		print!("{:06x}  ", row * 16);
		for byte in chunk {
			print!("{byte:02x} ");
		}
		println!();
	}
}

/// Prints the command menu, used by `menu`.
pub fn print_menu() {
	println!("Commands:");
	println!("  ls <path>             list directory entries or describe a file");
	println!("  mkdir <path>          create a directory");
	println!("  rmdir <path>          remove an empty directory");
	println!("  create <path>         create an empty regular file");
	println!("  link <existing> <new> add a hard link to an existing file");
	println!("  unlink <path>         remove a directory entry");
	println!("  cp <dest> <source>    copy a file within the image");
	println!("  cat <path>            print a file's contents");
	println!("  cd <path>             change the working directory");
	println!("  pwd                   print the working directory");
	println!("  diskinfo              print filesystem geometry");
	println!("  inodeinfo <path>      print an inode's metadata");
	println!("  blockbitmap <group>   print a group's block bitmap descriptor");
	println!("  inodebitmap <group>   print a group's inode bitmap descriptor");
	println!("  rawblock <n>          hex-dump a raw block");
	println!("  menu                  print this menu");
	println!("  exit, quit            leave the shell");
}
