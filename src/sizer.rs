//! Computes `size`/`msize` for every node.

use crate::codec::DENTRY_SIZE;
use crate::error::{Error, Result};
use crate::node::{NodeKind, NodeTable};
use std::fs;

/// Fills in `size` (and, for directories, `msize`) on every node in `table`.
pub fn size_nodes(table: &mut NodeTable) -> Result<()> {
	for node in table.values_mut() {
		match &node.kind {
			NodeKind::File { path } => {
				let meta = fs::metadata(path)?;
				node.size = meta.len();
			}
			NodeKind::Dir { children } => {
				let msize: u64 = children.keys().map(|name| name.len() as u64).sum();
				let n = children.len() as u64;
				node.msize = msize;
				node.size = n
					.checked_mul(DENTRY_SIZE as u64)
					.and_then(|v| v.checked_add(msize))
					.ok_or_else(|| {
						Error::Overflow(format!("node {}: directory payload too large", node.id))
					})?;
			}
			NodeKind::Link { target } => {
				node.size = target.len() as u64;
			}
			NodeKind::BlockDevice
			| NodeKind::CharDevice
			| NodeKind::Fifo
			| NodeKind::Socket => {
				node.size = 0;
				node.msize = 0;
			}
		}
	}
	Ok(())
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::node::Node;
	use std::collections::BTreeMap;

	#[test]
	fn directory_size_includes_dentries_and_names() {
		let mut table = NodeTable::new();
		let mut children = BTreeMap::new();
		children.insert("a".to_owned(), 2);
		children.insert("bb".to_owned(), 3);
		table.insert(1, Node::new(1, NodeKind::Dir { children }));
		table.insert(2, Node::new(2, NodeKind::Fifo));
		table.insert(3, Node::new(3, NodeKind::Fifo));

		size_nodes(&mut table).unwrap();

		let root = &table[&1];
		assert_eq!(root.msize, 3); // "a" + "bb"
		assert_eq!(root.size, DENTRY_SIZE as u64 * 2 + 3);
	}

	#[test]
	fn empty_directory_is_zero_sized() {
		let mut table = NodeTable::new();
		table.insert(
			1,
			Node::new(
				1,
				NodeKind::Dir {
					children: BTreeMap::new(),
				},
			),
		);
		size_nodes(&mut table).unwrap();
		assert_eq!(table[&1].size, 0);
		assert_eq!(table[&1].msize, 0);
	}

	#[test]
	fn link_size_is_target_byte_length() {
		let mut table = NodeTable::new();
		table.insert(
			1,
			Node::new(
				1,
				NodeKind::Link {
					target: "target".to_owned(),
				},
			),
		);
		size_nodes(&mut table).unwrap();
		assert_eq!(table[&1].size, 6);
	}
}
