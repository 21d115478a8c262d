//! Error types surfaced by the pipeline.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// An error produced while building a RaonFS image.
#[derive(Debug)]
pub enum Error {
	/// Walking the source tree failed (`stat`, `readlink`, `read_dir`).
	Walk { path: PathBuf, source: io::Error },
	/// A source path has a filetype outside the enumerated eight.
	Unsupported { path: PathBuf },
	/// A configuration value (blocksize, inlinestep, magic, endianness) is invalid.
	Config(String),
	/// A read/write/seek on the target image or a source file failed.
	Io(io::Error),
	/// A size or offset does not fit in its on-disk field width.
	Overflow(String),
}

impl fmt::Display for Error {
	fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Walk { path, source } => {
				write!(fmt, "{}: {source}", path.display())
			}
			Self::Unsupported { path } => {
				write!(fmt, "{}: unsupported file type", path.display())
			}
			Self::Config(msg) => write!(fmt, "{msg}"),
			Self::Io(e) => write!(fmt, "{e}"),
			Self::Overflow(msg) => write!(fmt, "{msg}"),
		}
	}
}

impl std::error::Error for Error {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		match self {
			Self::Walk { source, .. } => Some(source),
			Self::Io(e) => Some(e),
			_ => None,
		}
	}
}

impl From<io::Error> for Error {
	fn from(e: io::Error) -> Self {
		Self::Io(e)
	}
}

/// Shorthand for a pipeline result.
pub type Result<T> = std::result::Result<T, Error>;
