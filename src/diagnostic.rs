//! Renders the superblock and node table as JSON for `--output`.

use crate::codec::Superblock;
use crate::error::Result;
use crate::node::NodeTable;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;

#[derive(Serialize)]
struct SuperblockInfo {
	magic: String,
	blocksize: u32,
	root_ioffset: u32,
	fssize: u64,
	fsname: String,
}

impl From<&Superblock> for SuperblockInfo {
	fn from(sb: &Superblock) -> Self {
		Self {
			magic: lossy_trimmed(&sb.magic),
			blocksize: sb.blocksize,
			root_ioffset: sb.root_ioffset,
			fssize: sb.fssize,
			fsname: lossy_trimmed(&sb.fsname),
		}
	}
}

fn lossy_trimmed(bytes: &[u8]) -> String {
	let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
	String::from_utf8_lossy(&bytes[..end]).into_owned()
}

#[derive(Serialize)]
struct NodeInfo {
	id: u64,
	#[serde(rename = "type")]
	kind: &'static str,
	size: u64,
	msize: u64,
	mode: u16,
	uid: u16,
	gid: u16,
	ioffset: u64,
	doffset: u64,
	moffset: u64,
	flags: u32,
	inline: bool,
}

#[derive(Serialize)]
struct Diagnostic {
	superblock: SuperblockInfo,
	nodes: Vec<NodeInfo>,
}

/// Writes a JSON diagnostic of `superblock` and `table` to `path`.
pub fn write(path: &Path, table: &NodeTable, superblock: &Superblock) -> Result<()> {
	let nodes = table
		.values()
		.map(|node| NodeInfo {
			id: node.id,
			kind: node.kind.type_name(),
			size: node.size,
			msize: node.msize,
			mode: node.mode,
			uid: node.uid,
			gid: node.gid,
			ioffset: node.ioffset,
			doffset: node.doffset,
			moffset: node.moffset,
			flags: node.flags,
			inline: node.is_inline(),
		})
		.collect();
	let diagnostic = Diagnostic {
		superblock: SuperblockInfo::from(superblock),
		nodes,
	};

	let mut out = File::create(path)?;
	let json = serde_json::to_string_pretty(&diagnostic)
		.expect("diagnostic structures always serialize");
	out.write_all(json.as_bytes())?;
	out.write_all(b"\n")?;
	Ok(())
}
