//! Endian-aware fixed-width packing/unpacking of the three on-disk records.
//!
//! Byte order is a runtime switch rather than a compile-time one, so records are packed through
//! explicit byte writers instead of reinterpreting a native-order struct in place.

use crate::error::{Error, Result};

/// Byte width of the on-disk superblock record.
pub const SUPERBLOCK_SIZE: usize = 52;
/// Byte width of the on-disk inode record.
pub const INODE_SIZE: usize = 50;
/// Byte width of the on-disk dentry record.
pub const DENTRY_SIZE: usize = 12;

/// Byte width of the superblock's `fsname` field.
pub const FSNAME_SIZE: usize = 32;
/// Byte width of the superblock's `magic` field.
pub const MAGIC_SIZE: usize = 4;

/// Runtime byte order selector, read once at startup from `ENDIAN_TYPE`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Endian {
	Little,
	Big,
}

impl Endian {
	/// Reads `ENDIAN_TYPE` from the environment; defaults to [`Endian::Little`] when unset.
	pub fn from_env() -> Result<Self> {
		match std::env::var("ENDIAN_TYPE") {
			Err(_) => Ok(Self::Little),
			Ok(v) if v == "little" => Ok(Self::Little),
			Ok(v) if v == "big" => Ok(Self::Big),
			Ok(v) => Err(Error::Config(format!(
				"ENDIAN_TYPE: invalid value `{v}`, expected `little` or `big`"
			))),
		}
	}
}

/// A small byte-packing helper bound to a single [`Endian`].
///
/// Packs through explicit `to_le_bytes`/`to_be_bytes` conversions since the byte order is a
/// runtime value, not baked into the type's memory layout.
#[derive(Clone, Copy)]
pub struct Codec {
	endian: Endian,
}

impl Codec {
	pub fn new(endian: Endian) -> Self {
		Self { endian }
	}

	pub fn put_u16(&self, out: &mut Vec<u8>, v: u16) {
		out.extend_from_slice(&match self.endian {
			Endian::Little => v.to_le_bytes(),
			Endian::Big => v.to_be_bytes(),
		});
	}

	pub fn put_u32(&self, out: &mut Vec<u8>, v: u32) {
		out.extend_from_slice(&match self.endian {
			Endian::Little => v.to_le_bytes(),
			Endian::Big => v.to_be_bytes(),
		});
	}

	pub fn put_u64(&self, out: &mut Vec<u8>, v: u64) {
		out.extend_from_slice(&match self.endian {
			Endian::Little => v.to_le_bytes(),
			Endian::Big => v.to_be_bytes(),
		});
	}

	/// Writes `bytes` zero-padded (or truncated) to exactly `width` bytes.
	pub fn put_fixed(&self, out: &mut Vec<u8>, bytes: &[u8], width: usize) {
		let n = bytes.len().min(width);
		out.extend_from_slice(&bytes[..n]);
		out.resize(out.len() + (width - n), 0);
	}

	/// Only the test suite reads records back; `mkraonfs` itself only ever writes.
	#[cfg(test)]
	pub fn get_u16(&self, buf: &[u8]) -> u16 {
		let b: [u8; 2] = buf[..2].try_into().unwrap();
		match self.endian {
			Endian::Little => u16::from_le_bytes(b),
			Endian::Big => u16::from_be_bytes(b),
		}
	}

	#[cfg(test)]
	pub fn get_u32(&self, buf: &[u8]) -> u32 {
		let b: [u8; 4] = buf[..4].try_into().unwrap();
		match self.endian {
			Endian::Little => u32::from_le_bytes(b),
			Endian::Big => u32::from_be_bytes(b),
		}
	}

	#[cfg(test)]
	pub fn get_u64(&self, buf: &[u8]) -> u64 {
		let b: [u8; 8] = buf[..8].try_into().unwrap();
		match self.endian {
			Endian::Little => u64::from_le_bytes(b),
			Endian::Big => u64::from_be_bytes(b),
		}
	}
}

/// The on-disk superblock, placed at offset 0 of the image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Superblock {
	pub magic: [u8; MAGIC_SIZE],
	pub blocksize: u32,
	pub root_ioffset: u32,
	pub fssize: u64,
	pub fsname: [u8; FSNAME_SIZE],
}

impl Superblock {
	pub fn encode(&self, codec: &Codec) -> Vec<u8> {
		let mut out = Vec::with_capacity(SUPERBLOCK_SIZE);
		out.extend_from_slice(&self.magic);
		codec.put_u32(&mut out, self.blocksize);
		codec.put_u32(&mut out, self.root_ioffset);
		codec.put_u64(&mut out, self.fssize);
		codec.put_fixed(&mut out, &self.fsname, FSNAME_SIZE);
		debug_assert_eq!(out.len(), SUPERBLOCK_SIZE);
		out
	}

	/// Round-trip companion to [`Self::encode`], used by the test suite; `mkraonfs` itself
	/// never reads a superblock back.
	#[cfg(test)]
	pub fn decode(codec: &Codec, buf: &[u8]) -> Self {
		let mut magic = [0u8; MAGIC_SIZE];
		magic.copy_from_slice(&buf[0..4]);
		let blocksize = codec.get_u32(&buf[4..8]);
		let root_ioffset = codec.get_u32(&buf[8..12]);
		let fssize = codec.get_u64(&buf[12..20]);
		let mut fsname = [0u8; FSNAME_SIZE];
		fsname.copy_from_slice(&buf[20..52]);
		Self {
			magic,
			blocksize,
			root_ioffset,
			fssize,
			fsname,
		}
	}
}

/// The on-disk inode record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inode {
	pub size: u32,
	pub msize: u32,
	pub rdev: u32,
	pub mode: u16,
	pub uid: u16,
	pub gid: u16,
	pub ctime: u32,
	pub mtime: u32,
	pub atime: u32,
	pub flags: u32,
	pub doffset: u64,
	pub moffset: u64,
}

impl Inode {
	pub fn encode(&self, codec: &Codec) -> Vec<u8> {
		let mut out = Vec::with_capacity(INODE_SIZE);
		codec.put_u32(&mut out, self.size);
		codec.put_u32(&mut out, self.msize);
		codec.put_u32(&mut out, self.rdev);
		codec.put_u16(&mut out, self.mode);
		codec.put_u16(&mut out, self.uid);
		codec.put_u16(&mut out, self.gid);
		codec.put_u32(&mut out, self.ctime);
		codec.put_u32(&mut out, self.mtime);
		codec.put_u32(&mut out, self.atime);
		codec.put_u32(&mut out, self.flags);
		codec.put_u64(&mut out, self.doffset);
		codec.put_u64(&mut out, self.moffset);
		debug_assert_eq!(out.len(), INODE_SIZE);
		out
	}

	#[cfg(test)]
	pub fn decode(codec: &Codec, buf: &[u8]) -> Self {
		Self {
			size: codec.get_u32(&buf[0..4]),
			msize: codec.get_u32(&buf[4..8]),
			rdev: codec.get_u32(&buf[8..12]),
			mode: codec.get_u16(&buf[12..14]),
			uid: codec.get_u16(&buf[14..16]),
			gid: codec.get_u16(&buf[16..18]),
			ctime: codec.get_u32(&buf[18..22]),
			mtime: codec.get_u32(&buf[22..26]),
			atime: codec.get_u32(&buf[26..30]),
			flags: codec.get_u32(&buf[30..34]),
			doffset: codec.get_u64(&buf[34..42]),
			moffset: codec.get_u64(&buf[42..50]),
		}
	}
}

/// The on-disk directory entry record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dentry {
	/// Offset of this entry's name within the parent's name region, relative to its start.
	pub name_offset: u32,
	pub name_len: u16,
	pub dentry_type: u16,
	pub ioffset: u32,
}

impl Dentry {
	pub fn encode(&self, codec: &Codec) -> Vec<u8> {
		let mut out = Vec::with_capacity(DENTRY_SIZE);
		codec.put_u32(&mut out, self.name_offset);
		codec.put_u16(&mut out, self.name_len);
		codec.put_u16(&mut out, self.dentry_type);
		codec.put_u32(&mut out, self.ioffset);
		debug_assert_eq!(out.len(), DENTRY_SIZE);
		out
	}

	#[cfg(test)]
	pub fn decode(codec: &Codec, buf: &[u8]) -> Self {
		Self {
			name_offset: codec.get_u32(&buf[0..4]),
			name_len: codec.get_u16(&buf[4..6]),
			dentry_type: codec.get_u16(&buf[6..8]),
			ioffset: codec.get_u32(&buf[8..12]),
		}
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn superblock_roundtrip_little() {
		let codec = Codec::new(Endian::Little);
		let mut fsname = [0u8; FSNAME_SIZE];
		fsname[..7].copy_from_slice(b"RAON-FS");
		let sb = Superblock {
			magic: *b"RAON",
			blocksize: 4096,
			root_ioffset: 4096,
			fssize: 123_456_789,
			fsname,
		};
		let bytes = sb.encode(&codec);
		assert_eq!(bytes.len(), SUPERBLOCK_SIZE);
		assert_eq!(Superblock::decode(&codec, &bytes), sb);
	}

	#[test]
	fn superblock_roundtrip_big() {
		let codec = Codec::new(Endian::Big);
		let sb = Superblock {
			magic: *b"RAON",
			blocksize: 1024,
			root_ioffset: 2048,
			fssize: u64::MAX / 3,
			fsname: [0u8; FSNAME_SIZE],
		};
		let bytes = sb.encode(&codec);
		assert_eq!(Superblock::decode(&codec, &bytes), sb);
	}

	#[test]
	fn endianness_changes_bytes_not_length() {
		let le = Codec::new(Endian::Little);
		let be = Codec::new(Endian::Big);
		let sb = Superblock {
			magic: *b"RAON",
			blocksize: 0x0102_0304,
			root_ioffset: 0,
			fssize: 0,
			fsname: [0u8; FSNAME_SIZE],
		};
		let le_bytes = sb.encode(&le);
		let be_bytes = sb.encode(&be);
		assert_eq!(le_bytes.len(), be_bytes.len());
		assert_ne!(le_bytes, be_bytes);
		// Magic and name are byte strings, not integers: endianness must not touch them.
		assert_eq!(&le_bytes[0..4], &be_bytes[0..4]);
	}

	#[test]
	fn inode_roundtrip() {
		let codec = Codec::new(Endian::Little);
		let inode = Inode {
			size: 13,
			msize: 1,
			rdev: 0,
			mode: 0o755,
			uid: 1000,
			gid: 1000,
			ctime: 1_700_000_000,
			mtime: 1_700_000_001,
			atime: 1_700_000_002,
			flags: 0,
			doffset: 4096 + INODE_SIZE as u64,
			moffset: 4096 + INODE_SIZE as u64 + 12,
		};
		let bytes = inode.encode(&codec);
		assert_eq!(bytes.len(), INODE_SIZE);
		assert_eq!(Inode::decode(&codec, &bytes), inode);
	}

	#[test]
	fn dentry_roundtrip() {
		let codec = Codec::new(Endian::Big);
		let dentry = Dentry {
			name_offset: 3,
			name_len: 5,
			dentry_type: 2,
			ioffset: 4096 + 256,
		};
		let bytes = dentry.encode(&codec);
		assert_eq!(bytes.len(), DENTRY_SIZE);
		assert_eq!(Dentry::decode(&codec, &bytes), dentry);
	}
}
