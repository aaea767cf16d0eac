use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use memmap2::Mmap;
use zflate::{
    CompressionLevel, DeflateConfig, Deflater, Flush, GzipHeader, InflateConfig, Inflater,
    Status, Strategy, Wrap,
};

#[derive(Parser, Debug)]
#[command(name = "zflate")]
#[command(about = "Compress or decompress DEFLATE, zlib and gzip streams")]
#[command(version)]
struct Args {
    /// Input file (use - for stdin)
    #[arg(short, long, default_value = "-")]
    input: PathBuf,

    /// Output file (use - for stdout)
    #[arg(short, long, default_value = "-")]
    output: PathBuf,

    /// Decompress instead of compress
    #[arg(short, long)]
    decompress: bool,

    /// Compression level (0-9)
    #[arg(short, long, default_value = "6", value_parser = clap::value_parser!(u8).range(0..=9))]
    level: u8,

    /// Stream framing
    #[arg(long, value_enum, default_value = "gzip")]
    format: Format,

    /// Match-finding strategy
    #[arg(long, value_enum, default_value = "default")]
    strategy: StrategyArg,

    /// Base-2 log of the window size (8-15)
    #[arg(long, default_value = "15", value_parser = clap::value_parser!(u8).range(8..=15))]
    window_bits: u8,

    /// Size of the input and output buffers handed to the codec
    #[arg(long, default_value = "65536")]
    buffer_size: usize,

    /// Show verbose statistics
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Raw,
    Zlib,
    Gzip,
    /// Detect zlib or gzip (decompression only)
    Auto,
}

impl From<Format> for Wrap {
    fn from(format: Format) -> Self {
        match format {
            Format::Raw => Wrap::Raw,
            Format::Zlib => Wrap::Zlib,
            Format::Gzip => Wrap::Gzip,
            Format::Auto => Wrap::Auto,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum StrategyArg {
    Default,
    Filtered,
    HuffmanOnly,
    Rle,
    Fixed,
}

impl From<StrategyArg> for Strategy {
    fn from(strategy: StrategyArg) -> Self {
        match strategy {
            StrategyArg::Default => Strategy::Default,
            StrategyArg::Filtered => Strategy::Filtered,
            StrategyArg::HuffmanOnly => Strategy::HuffmanOnly,
            StrategyArg::Rle => Strategy::Rle,
            StrategyArg::Fixed => Strategy::Fixed,
        }
    }
}

/// Exit codes
const EXIT_CODEC_ERROR: u8 = 1;
const EXIT_IO_ERROR: u8 = 2;

/// Failures split by exit code
enum CliError {
    Codec(zflate::Error),
    Io(io::Error),
}

impl From<zflate::Error> for CliError {
    fn from(e: zflate::Error) -> Self {
        CliError::Codec(e)
    }
}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        CliError::Io(e)
    }
}

/// Byte counts reported under --verbose
struct Stats {
    input_bytes: u64,
    output_bytes: u64,
    members: usize,
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(CliError::Codec(e)) => {
            eprintln!("Error: {}", e);
            ExitCode::from(EXIT_CODEC_ERROR)
        }
        Err(CliError::Io(e)) => {
            eprintln!("Error: {}", e);
            ExitCode::from(EXIT_IO_ERROR)
        }
    }
}

fn run() -> Result<(), CliError> {
    let args = Args::parse();
    let is_stdin = args.input.to_str() == Some("-");
    let is_stdout = args.output.to_str() == Some("-");
    let buffer_size = args.buffer_size.max(1);

    // Files are mapped; stdin is read whole
    let mapped;
    let mut owned = Vec::new();
    let input: &[u8] = if is_stdin {
        io::stdin().lock().read_to_end(&mut owned)?;
        &owned
    } else {
        let file = File::open(&args.input)?;
        // SAFETY: the mapping is read-only and only lives for this run
        mapped = unsafe { Mmap::map(&file)? };
        &mapped
    };

    let mut output: Box<dyn Write> = if is_stdout {
        Box::new(BufWriter::new(io::stdout().lock()))
    } else {
        Box::new(BufWriter::new(File::create(&args.output)?))
    };

    let start = std::time::Instant::now();
    let stats = if args.decompress {
        let config = InflateConfig { window_bits: args.window_bits, wrap: args.format.into() };
        decompress(input, &mut output, config, buffer_size)?
    } else {
        let gzip_header = (args.format == Format::Gzip && !is_stdin)
            .then(|| gzip_header_for(&args.input))
            .flatten();
        let config = DeflateConfig {
            level: CompressionLevel::from_level(args.level),
            strategy: args.strategy.into(),
            window_bits: args.window_bits,
            mem_level: 8,
            wrap: args.format.into(),
            gzip_header,
        };
        compress(input, &mut output, config, buffer_size)?
    };
    output.flush()?;
    let elapsed = start.elapsed();

    if args.verbose {
        eprintln!("{} complete:", if args.decompress { "Decompression" } else { "Compression" });
        eprintln!("  Input bytes:      {}", stats.input_bytes);
        eprintln!("  Output bytes:     {}", stats.output_bytes);
        if args.decompress {
            eprintln!("  Members:          {}", stats.members);
        } else if stats.input_bytes > 0 {
            eprintln!(
                "  Ratio:            {:.2}%",
                stats.output_bytes as f64 * 100.0 / stats.input_bytes as f64
            );
        }
        eprintln!("  Time:             {:.2?}", elapsed);
        eprintln!(
            "  Throughput:       {:.1} MB/s",
            stats.input_bytes as f64 / elapsed.as_secs_f64() / 1_000_000.0
        );
    }
    Ok(())
}

/// gzip header naming the input file, with its modification time
fn gzip_header_for(path: &Path) -> Option<GzipHeader> {
    let name = path.file_name()?.to_string_lossy().into_owned();
    let mtime = std::fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map_or(0, |d| u32::try_from(d.as_secs()).unwrap_or(0));
    Some(GzipHeader { mtime, ..GzipHeader::with_filename(name) })
}

fn compress(
    input: &[u8],
    output: &mut dyn Write,
    config: DeflateConfig,
    buffer_size: usize,
) -> Result<Stats, CliError> {
    let mut deflater = Deflater::new(config)?;
    let mut buf = vec![0u8; buffer_size];
    let mut pos = 0;
    loop {
        let end = (pos + buffer_size).min(input.len());
        let flush = if end == input.len() { Flush::Finish } else { Flush::None };
        let before_in = deflater.total_in();
        let before_out = deflater.total_out();
        let status = deflater.deflate(&input[pos..end], &mut buf, flush)?;
        pos += (deflater.total_in() - before_in) as usize;
        output.write_all(&buf[..(deflater.total_out() - before_out) as usize])?;
        if status == Status::StreamEnd {
            break;
        }
    }
    Ok(Stats { input_bytes: deflater.total_in(), output_bytes: deflater.total_out(), members: 1 })
}

fn decompress(
    input: &[u8],
    output: &mut dyn Write,
    config: InflateConfig,
    buffer_size: usize,
) -> Result<Stats, CliError> {
    let mut inflater = Inflater::new(config)?;
    let mut buf = vec![0u8; buffer_size];
    let mut pos = 0;
    let mut stats = Stats { input_bytes: 0, output_bytes: 0, members: 0 };
    loop {
        let end = (pos + buffer_size).min(input.len());
        let before_in = inflater.total_in();
        let before_out = inflater.total_out();
        let status = inflater.inflate(&input[pos..end], &mut buf, Flush::None)?;
        let consumed = (inflater.total_in() - before_in) as usize;
        let produced = (inflater.total_out() - before_out) as usize;
        pos += consumed;
        stats.input_bytes += consumed as u64;
        stats.output_bytes += produced as u64;
        output.write_all(&buf[..produced])?;
        match status {
            Status::StreamEnd => {
                stats.members += 1;
                // Concatenated gzip members continue the output
                if inflater.gzip_header().is_none() || !input[pos..].starts_with(&zflate::gzip::MAGIC) {
                    return Ok(stats);
                }
                inflater.reset();
            }
            Status::NeedDict => {
                return Err(zflate::Error::DictionaryRejected("no dictionary on the command line").into())
            }
            Status::Ok | Status::BufError => {
                if consumed == 0 && produced == 0 && pos == input.len() {
                    return Err(zflate::Error::UnexpectedEof.into());
                }
            }
        }
    }
}
