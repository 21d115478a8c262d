//! `mkraonfs` builds a read-only RaonFS image from a source directory tree.

mod codec;
mod diagnostic;
mod emitter;
mod error;
mod node;
mod placer;
mod sizer;
mod walker;

use codec::{Codec, Endian, FSNAME_SIZE, INODE_SIZE, MAGIC_SIZE};
use error::{Error, Result};
use placer::PlacerConfig;
use std::env;
use std::path::PathBuf;
use std::process::exit;
use utils::util::{is_pow2, ByteSize};

/// Structure storing command line arguments.
#[derive(Debug)]
struct Args {
	/// The name of the current program used in command line.
	prog: String,

	source: PathBuf,
	target: Option<PathBuf>,
	blocksize: u64,
	inlinestep: u32,
	magic: String,
	name: String,
	output: Option<PathBuf>,
	verbose: bool,
	help: bool,
}

impl Default for Args {
	fn default() -> Self {
		Self {
			prog: "mkraonfs".to_owned(),
			source: PathBuf::from("."),
			target: None,
			blocksize: 4096,
			inlinestep: 4,
			magic: "RAON".to_owned(),
			name: "RAON-FS".to_owned(),
			output: None,
			verbose: false,
			help: false,
		}
	}
}

/// Consumes the next argument as a flag's value, or exits with a usage error.
fn next_value(iter: &mut env::Args, prog: &str, flag: &str) -> String {
	iter.next().unwrap_or_else(|| {
		eprintln!("{prog}: {flag}: missing value");
		exit(1);
	})
}

fn parse_u64(s: &str, prog: &str, flag: &str) -> u64 {
	s.parse().unwrap_or_else(|_| {
		eprintln!("{prog}: {flag}: expected a non-negative integer, got `{s}`");
		exit(1);
	})
}

fn parse_u32(s: &str, prog: &str, flag: &str) -> u32 {
	s.parse().unwrap_or_else(|_| {
		eprintln!("{prog}: {flag}: expected a non-negative integer, got `{s}`");
		exit(1);
	})
}

fn parse_args() -> Args {
	let mut args = Args::default();
	let mut iter = env::args();
	if let Some(prog) = iter.next() {
		args.prog = prog;
	}

	while let Some(arg) = iter.next() {
		match arg.as_str() {
			"-h" | "--help" => args.help = true,
			"-v" | "--verbose" => args.verbose = true,
			"-s" | "--source" => args.source = next_value(&mut iter, &args.prog, "--source").into(),
			"-t" | "--target" => {
				args.target = Some(next_value(&mut iter, &args.prog, "--target").into())
			}
			"-b" | "--blocksize" => {
				let v = next_value(&mut iter, &args.prog, "--blocksize");
				args.blocksize = parse_u64(&v, &args.prog, "--blocksize");
			}
			"-l" | "--inlinestep" => {
				let v = next_value(&mut iter, &args.prog, "--inlinestep");
				args.inlinestep = parse_u32(&v, &args.prog, "--inlinestep");
			}
			"-m" | "--magics" => args.magic = next_value(&mut iter, &args.prog, "--magics"),
			"-n" | "--name" => args.name = next_value(&mut iter, &args.prog, "--name"),
			"-o" | "--output" => {
				args.output = Some(next_value(&mut iter, &args.prog, "--output").into())
			}

			other => {
				eprintln!("{}: unrecognized argument `{other}`", args.prog);
				print_usage(&args.prog);
				exit(1);
			}
		}
	}

	args
}

fn print_usage(prog: &str) {
	eprintln!("Try '{prog} --help' for more information.");
}

fn print_help(prog: &str) {
	println!();
	println!("Usage:");
	println!(" {prog} [options]");
	println!();
	println!("Builds a RaonFS image from a source directory tree.");
	println!();
	println!("Options:");
	println!(" -s, --source PATH\tSource directory (default: .)");
	println!(" -t, --target PATH\tOutput image file");
	println!(" -b, --blocksize N\tBlock size in bytes (default: 4096)");
	println!(" -l, --inlinestep K\tNumber of inline placement steps (default: 4)");
	println!(" -m, --magics S\t\tFilesystem magic, exactly 4 bytes (default: RAON)");
	println!(" -n, --name S\t\tFilesystem name, up to 32 bytes (default: RAON-FS)");
	println!(" -o, --output PATH\tWrite a JSON diagnostic to PATH");
	println!(" -v, --verbose\t\tLog pipeline progress to stderr");
	println!(" -h, --help\t\tPrint this help");
}

fn parse_magic(s: &str) -> Result<[u8; MAGIC_SIZE]> {
	let bytes = s.as_bytes();
	if bytes.len() != MAGIC_SIZE {
		return Err(Error::Config(format!(
			"--magics must be exactly {MAGIC_SIZE} bytes, got {} (`{s}`)",
			bytes.len()
		)));
	}
	let mut magic = [0u8; MAGIC_SIZE];
	magic.copy_from_slice(bytes);
	Ok(magic)
}

fn build_fsname(s: &str) -> [u8; FSNAME_SIZE] {
	let mut fsname = [0u8; FSNAME_SIZE];
	let bytes = s.as_bytes();
	let n = bytes.len().min(FSNAME_SIZE);
	fsname[..n].copy_from_slice(&bytes[..n]);
	fsname
}

fn validate_config(args: &Args) -> Result<()> {
	if args.blocksize == 0 || !is_pow2(args.blocksize) {
		return Err(Error::Config(format!(
			"--blocksize must be a power of two, got {}",
			args.blocksize
		)));
	}
	if args.blocksize <= INODE_SIZE as u64 {
		return Err(Error::Config(format!(
			"--blocksize must be greater than the inode record size ({INODE_SIZE})"
		)));
	}
	Ok(())
}

fn run(args: &Args) -> Result<()> {
	validate_config(args)?;
	let magic = parse_magic(&args.magic)?;
	let fsname = build_fsname(&args.name);
	let endian = Endian::from_env()?;
	let codec = Codec::new(endian);

	if args.verbose {
		eprintln!("{}: walking {}", args.prog, args.source.display());
	}
	let (mut table, root_id) = walker::walk(&args.source)?;

	if args.verbose {
		eprintln!("{}: sizing {} nodes", args.prog, table.len());
	}
	sizer::size_nodes(&mut table)?;

	if args.verbose {
		eprintln!(
			"{}: placing nodes (blocksize={}, inlinestep={})",
			args.prog, args.blocksize, args.inlinestep
		);
	}
	placer::place(
		&mut table,
		&PlacerConfig {
			blocksize: args.blocksize,
			inlinestep: args.inlinestep,
		},
	);

	let sb_cfg = emitter::SuperblockConfig {
		blocksize: args.blocksize as u32,
		magic,
		fsname,
	};

	let mut fssize = emitter::estimate_fssize(&table);
	if let Some(target) = &args.target {
		if args.verbose {
			eprintln!("{}: emitting image to {}", args.prog, target.display());
		}
		fssize = emitter::emit(target, &table, root_id, &sb_cfg, &codec)?;
		if args.verbose {
			eprintln!("{}: wrote {}", args.prog, ByteSize(fssize));
		}
	}

	if let Some(output) = &args.output {
		if args.verbose {
			eprintln!("{}: writing diagnostic to {}", args.prog, output.display());
		}
		let root = &table[&root_id];
		let superblock = codec::Superblock {
			magic: sb_cfg.magic,
			blocksize: sb_cfg.blocksize,
			root_ioffset: root.ioffset as u32,
			fssize,
			fsname: sb_cfg.fsname,
		};
		diagnostic::write(output, &table, &superblock)?;
	}

	Ok(())
}

fn main() {
	let args = parse_args();
	if args.help {
		print_help(&args.prog);
		exit(0);
	}

	run(&args).unwrap_or_else(|e| {
		eprintln!("{}: {e}", args.prog);
		exit(1);
	});
}
