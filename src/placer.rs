//! The two-pass offset assignment that is the heart of the layout algorithm.

use crate::codec::INODE_SIZE;
use crate::node::{NodeTable, INLINE_DATA};
use utils::util::ceil_to_multiple;

/// Parameters controlling placement, taken directly off the CLI.
#[derive(Debug, Clone, Copy)]
pub struct PlacerConfig {
	pub blocksize: u64,
	pub inlinestep: u32,
}

/// Assigns `ioffset`/`doffset`/`moffset` to every node in `table`.
///
/// Traversal is always in ascending node id order (the `NodeTable`'s natural `BTreeMap` order),
/// which makes the resulting layout a deterministic function of the source inode numbers.
pub fn place(table: &mut NodeTable, cfg: &PlacerConfig) {
	let inode_size = INODE_SIZE as u64;
	let mut cursor = cfg.blocksize; // nodebase: block 0 is reserved for the superblock.

	// Pass A: multi-granularity inline placement, coarsest step first (k = inlinestep down to
	// 1), offering progressively larger slots to whatever didn't fit in a smaller one.
	for k in (1..=cfg.inlinestep).rev() {
		let maxsize = cfg.blocksize >> k;
		if maxsize > inode_size {
			let room = maxsize - inode_size;
			for node in table.values_mut() {
				if node.ioffset != 0 {
					continue;
				}
				if node.size == 0 || node.size <= room {
					node.ioffset = cursor;
					node.doffset = cursor + inode_size;
					node.moffset = cursor + inode_size + (node.size - node.msize);
					node.flags |= INLINE_DATA;
					cursor += maxsize;
				}
			}
		}
		cursor = ceil_to_multiple(cursor, cfg.blocksize);
	}

	// Pass B.1: pack remaining inode records contiguously, then align to a block.
	for node in table.values_mut() {
		if node.ioffset == 0 {
			node.ioffset = cursor;
			cursor += inode_size;
		}
	}
	cursor = ceil_to_multiple(cursor, cfg.blocksize);

	// Pass B.2: block-granular extents for whatever still has no data region.
	for node in table.values_mut() {
		if node.doffset == 0 && node.size > 0 {
			node.doffset = cursor;
			node.moffset = cursor + (node.size - node.msize);
			cursor += ceil_to_multiple(node.size, cfg.blocksize);
		}
	}
}
