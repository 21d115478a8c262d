//! Seeks and writes every region to the target image.

use crate::codec::{Codec, Dentry, Inode, Superblock, FSNAME_SIZE, MAGIC_SIZE, INODE_SIZE};
use crate::error::{Error, Result};
use crate::node::{NodeKind, NodeTable};
use std::fs::{File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::Path;

/// Superblock fields that are not derived from the node table.
#[derive(Debug, Clone, Copy)]
pub struct SuperblockConfig {
	pub blocksize: u32,
	pub magic: [u8; MAGIC_SIZE],
	pub fsname: [u8; FSNAME_SIZE],
}

fn to_u32_offset(id: u64, offset: u64) -> Result<u32> {
	u32::try_from(offset)
		.map_err(|_| Error::Overflow(format!("node {id}: offset {offset} does not fit in 32 bits")))
}

/// Computes the high-water mark the emitter would produce, without writing anything.
///
/// Used for the `--output` diagnostic when no `--target` image is requested, so the reported
/// `fssize` still reflects the placement rather than a placeholder zero.
pub fn estimate_fssize(table: &NodeTable) -> u64 {
	let mut fssize = 0u64;
	for node in table.values() {
		fssize = fssize.max(node.ioffset + INODE_SIZE as u64);
		if node.size > 0 {
			fssize = fssize.max(node.doffset + node.size);
		}
	}
	fssize
}

/// Writes the whole image to `path` and returns the final `fssize`.
pub fn emit(
	path: &Path,
	table: &NodeTable,
	root_id: u64,
	cfg: &SuperblockConfig,
	codec: &Codec,
) -> Result<u64> {
	let mut file = OpenOptions::new()
		.write(true)
		.create(true)
		.truncate(true)
		.open(path)?;
	let mut fssize: u64 = 0;

	write_inodes(&mut file, table, codec, &mut fssize)?;
	write_directories(&mut file, table, codec, &mut fssize)?;
	write_file_contents(&mut file, table, &mut fssize)?;
	write_symlinks(&mut file, table, codec, &mut fssize)?;

	let root = table
		.get(&root_id)
		.expect("root id always present in its own table");
	let superblock = Superblock {
		magic: cfg.magic,
		blocksize: cfg.blocksize,
		root_ioffset: to_u32_offset(root_id, root.ioffset)?,
		fssize,
		fsname: cfg.fsname,
	};
	file.seek(SeekFrom::Start(0))?;
	file.write_all(&superblock.encode(codec))?;

	Ok(fssize)
}

fn bump(file: &mut File, fssize: &mut u64) -> Result<()> {
	*fssize = (*fssize).max(file.stream_position()?);
	Ok(())
}

fn write_inodes(file: &mut File, table: &NodeTable, codec: &Codec, fssize: &mut u64) -> Result<()> {
	for node in table.values() {
		let size = u32::try_from(node.size).map_err(|_| {
			Error::Overflow(format!("node {}: size does not fit in 32 bits", node.id))
		})?;
		let inode = Inode {
			size,
			msize: u32::try_from(node.msize).map_err(|_| {
				Error::Overflow(format!("node {}: msize does not fit in 32 bits", node.id))
			})?,
			rdev: node.rdev,
			mode: node.mode,
			uid: node.uid,
			gid: node.gid,
			ctime: node.ctime,
			mtime: node.mtime,
			atime: node.atime,
			flags: node.flags,
			doffset: node.doffset,
			moffset: node.moffset,
		};
		file.seek(SeekFrom::Start(node.ioffset))?;
		file.write_all(&inode.encode(codec))?;
		bump(file, fssize)?;
	}
	Ok(())
}

fn write_directories(
	file: &mut File,
	table: &NodeTable,
	codec: &Codec,
	fssize: &mut u64,
) -> Result<()> {
	for node in table.values() {
		let NodeKind::Dir { children } = &node.kind else {
			continue;
		};
		if children.is_empty() {
			continue;
		}

		file.seek(SeekFrom::Start(node.doffset))?;
		let mut name_offset: u32 = 0;
		for (name, child_id) in children {
			let child = &table[child_id];
			let dentry = Dentry {
				name_offset,
				name_len: u16::try_from(name.len()).map_err(|_| {
					Error::Overflow(format!("{name}: name too long for a 16-bit length"))
				})?,
				dentry_type: child.kind.dentry_type(),
				ioffset: to_u32_offset(child.id, child.ioffset)?,
			};
			file.write_all(&dentry.encode(codec))?;
			name_offset += name.len() as u32;
		}

		file.seek(SeekFrom::Start(node.moffset))?;
		for name in children.keys() {
			file.write_all(name.as_bytes())?;
		}
		bump(file, fssize)?;
	}
	Ok(())
}

fn write_file_contents(file: &mut File, table: &NodeTable, fssize: &mut u64) -> Result<()> {
	for node in table.values() {
		let NodeKind::File { path } = &node.kind else {
			continue;
		};
		if node.size == 0 {
			continue;
		}
		file.seek(SeekFrom::Start(node.doffset))?;
		let mut src = File::open(path)?;
		io::copy(&mut src, file)?;
		bump(file, fssize)?;
	}
	Ok(())
}

fn write_symlinks(file: &mut File, table: &NodeTable, _codec: &Codec, fssize: &mut u64) -> Result<()> {
	for node in table.values() {
		let NodeKind::Link { target } = &node.kind else {
			continue;
		};
		file.seek(SeekFrom::Start(node.doffset))?;
		file.write_all(target.as_bytes())?;
		bump(file, fssize)?;
	}
	Ok(())
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::codec::Endian;
	use crate::node::Node;
	use crate::placer::{place, PlacerConfig};
	use crate::sizer::size_nodes;
	use std::collections::BTreeMap;
	use std::io::Read;

	fn tmp_path(name: &str) -> std::path::PathBuf {
		let mut p = std::env::temp_dir();
		p.push(format!("raonfs-emitter-test-{}-{}", std::process::id(), name));
		p
	}

	#[test]
	fn empty_directory_image_layout() {
		let mut table = NodeTable::new();
		table.insert(
			2,
			Node::new(
				2,
				NodeKind::Dir {
					children: BTreeMap::new(),
				},
			),
		);
		size_nodes(&mut table).unwrap();
		place(
			&mut table,
			&PlacerConfig {
				blocksize: 4096,
				inlinestep: 4,
			},
		);

		let codec = Codec::new(Endian::Little);
		let out = tmp_path("empty");
		let cfg = SuperblockConfig {
			blocksize: 4096,
			magic: *b"RAON",
			fsname: {
				let mut f = [0u8; FSNAME_SIZE];
				f[..7].copy_from_slice(b"RAON-FS");
				f
			},
		};
		let fssize = emit(&out, &table, 2, &cfg, &codec).unwrap();
		assert!(fssize >= 4096 + crate::codec::INODE_SIZE as u64);

		let mut bytes = Vec::new();
		File::open(&out).unwrap().read_to_end(&mut bytes).unwrap();
		let sb = Superblock::decode(&codec, &bytes[0..crate::codec::SUPERBLOCK_SIZE]);
		assert_eq!(sb.magic, *b"RAON");
		assert_eq!(sb.root_ioffset, 4096);
		let _ = std::fs::remove_file(&out);
	}
}
