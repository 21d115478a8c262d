//! Walks the source directory tree into a [`NodeTable`], without following symlinks.
//!
//! Built directly on `std::fs`/`std::os::unix::fs::MetadataExt` rather than a walking crate.

use crate::error::{Error, Result};
use crate::node::{Node, NodeKind, NodeTable};
use std::collections::BTreeMap;
use std::fs;
use std::os::unix::fs::{FileTypeExt, MetadataExt};
use std::path::Path;

fn walk_error(path: &Path, source: std::io::Error) -> Error {
	Error::Walk {
		path: path.to_path_buf(),
		source,
	}
}

/// Walks `source`, filling `table` with one [`Node`] per distinct inode number reachable from
/// it. Returns the id of the root node.
pub fn walk(source: &Path) -> Result<(NodeTable, u64)> {
	let mut table = NodeTable::new();
	let root_id = visit(source, &mut table)?;
	Ok((table, root_id))
}

fn visit(path: &Path, table: &mut NodeTable) -> Result<u64> {
	let meta = fs::symlink_metadata(path).map_err(|e| walk_error(path, e))?;
	let id = meta.ino();

	// Two paths sharing an inode number (hard links) collapse onto the same node; only the
	// first visit actually populates it.
	if table.contains_key(&id) {
		return Ok(id);
	}

	let file_type = meta.file_type();
	let kind = if file_type.is_symlink() {
		let target = fs::read_link(path).map_err(|e| walk_error(path, e))?;
		let target = target.to_str().ok_or_else(|| {
			walk_error(
				path,
				std::io::Error::new(std::io::ErrorKind::InvalidData, "non-UTF-8 symlink target"),
			)
		})?;
		NodeKind::Link {
			target: target.to_owned(),
		}
	} else if file_type.is_dir() {
		NodeKind::Dir {
			children: BTreeMap::new(),
		}
	} else if file_type.is_file() {
		NodeKind::File {
			path: path.to_path_buf(),
		}
	} else if file_type.is_block_device() {
		NodeKind::BlockDevice
	} else if file_type.is_char_device() {
		NodeKind::CharDevice
	} else if file_type.is_fifo() {
		NodeKind::Fifo
	} else if file_type.is_socket() {
		NodeKind::Socket
	} else {
		return Err(Error::Unsupported {
			path: path.to_path_buf(),
		});
	};

	let mut node = Node::new(id, kind);
	node.mode = (meta.mode() & 0xffff) as u16;
	node.uid = meta.uid() as u16;
	node.gid = meta.gid() as u16;
	node.ctime = to_timestamp(path, meta.ctime())?;
	node.mtime = to_timestamp(path, meta.mtime())?;
	node.atime = to_timestamp(path, meta.atime())?;
	node.rdev = if file_type.is_block_device() || file_type.is_char_device() {
		meta.rdev()
			.try_into()
			.map_err(|_| Error::Overflow(format!("{}: device id does not fit in 32 bits", path.display())))?
	} else {
		0
	};

	// Insert the (childless) node before recursing so that a pathological self-referencing
	// walk can't recurse forever; real directory trees never hit this.
	table.insert(id, node);

	if file_type.is_dir() {
		let mut children = BTreeMap::new();
		let entries = fs::read_dir(path).map_err(|e| walk_error(path, e))?;
		for entry in entries {
			let entry = entry.map_err(|e| walk_error(path, e))?;
			let child_path = entry.path();
			let name = entry.file_name().into_string().map_err(|_| {
				walk_error(
					&child_path,
					std::io::Error::new(std::io::ErrorKind::InvalidData, "non-UTF-8 file name"),
				)
			})?;
			let child_id = visit(&child_path, table)?;
			children.insert(name, child_id);
		}
		if let Some(node) = table.get_mut(&id) {
			node.kind = NodeKind::Dir { children };
		}
	}

	Ok(id)
}

fn to_timestamp(path: &Path, secs: i64) -> Result<u32> {
	u32::try_from(secs)
		.map_err(|_| Error::Overflow(format!("{}: timestamp out of range", path.display())))
}

#[cfg(test)]
mod test {
	use super::*;
	use std::os::unix::fs::symlink;

	fn fresh_dir(name: &str) -> std::path::PathBuf {
		let mut dir = std::env::temp_dir();
		dir.push(format!("raonfs-walker-test-{}-{name}", std::process::id()));
		let _ = fs::remove_dir_all(&dir);
		fs::create_dir_all(&dir).unwrap();
		dir
	}

	#[test]
	fn nested_directories_and_files_all_get_nodes() {
		let dir = fresh_dir("nested");
		fs::create_dir(dir.join("sub")).unwrap();
		fs::write(dir.join("sub").join("leaf"), b"x").unwrap();
		fs::write(dir.join("top"), b"yz").unwrap();

		let (table, root_id) = walk(&dir).unwrap();
		assert_eq!(table.len(), 4); // root, sub, sub/leaf, top

		let root = &table[&root_id];
		let NodeKind::Dir { children } = &root.kind else {
			panic!("root must be a directory");
		};
		assert_eq!(children.len(), 2);
		let sub_id = children["sub"];
		let NodeKind::Dir { children: sub_children } = &table[&sub_id].kind else {
			panic!("sub must be a directory");
		};
		assert_eq!(sub_children.len(), 1);
		assert!(matches!(table[&children["top"]].kind, NodeKind::File { .. }));

		let _ = fs::remove_dir_all(&dir);
	}

	#[test]
	fn hard_links_collapse_onto_one_node() {
		let dir = fresh_dir("hardlink");
		fs::write(dir.join("a"), b"shared").unwrap();
		fs::hard_link(dir.join("a"), dir.join("b")).unwrap();

		let (table, root_id) = walk(&dir).unwrap();
		let NodeKind::Dir { children } = &table[&root_id].kind else {
			panic!("root must be a directory");
		};
		assert_eq!(children["a"], children["b"]);
		// The shared inode itself contributes exactly one node to the table.
		assert_eq!(table.len(), 2);

		let _ = fs::remove_dir_all(&dir);
	}

	#[test]
	fn symlinks_are_not_followed() {
		let dir = fresh_dir("symlink");
		fs::write(dir.join("real"), b"content").unwrap();
		symlink("real", dir.join("link")).unwrap();

		let (table, root_id) = walk(&dir).unwrap();
		let NodeKind::Dir { children } = &table[&root_id].kind else {
			panic!("root must be a directory");
		};
		let link_node = &table[&children["link"]];
		match &link_node.kind {
			NodeKind::Link { target } => assert_eq!(target, "real"),
			other => panic!("expected a symlink node, got {other:?}"),
		}

		let _ = fs::remove_dir_all(&dir);
	}

	#[test]
	fn empty_directory_has_no_children() {
		let dir = fresh_dir("empty");

		let (table, root_id) = walk(&dir).unwrap();
		let NodeKind::Dir { children } = &table[&root_id].kind else {
			panic!("root must be a directory");
		};
		assert!(children.is_empty());
		assert_eq!(table.len(), 1);

		let _ = fs::remove_dir_all(&dir);
	}
}
