use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use log::{debug, info};

use fieldpack_cli::report::{human_bytes, ratio, throughput};
use fieldpack_cli::streams::{create_output, open_input, CountingWriter};
use fieldpack_fields::{compressor_for, decompressor_for, parse_schema, record_size, FieldKind};

// ── CLI definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "fieldpack",
    about = "Field-wise compression of fixed-layout binary records",
    version
)]
struct Cli {
    /// Log pipeline events (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress a file of packed records
    Compress {
        /// Source file of back-to-back records ("-" reads stdin)
        input: PathBuf,
        /// Destination for the compressed stream ("-" writes to stdout)
        output: PathBuf,
        /// Record layout, e.g. "point3,i32,i32,i16"
        #[arg(short, long)]
        schema: String,
    },
    /// Decompress a stream back into packed records
    ///
    /// The stream carries no header, so the schema and the record count
    /// used at compression time must be given again.
    Decompress {
        /// Compressed stream ("-" reads stdin)
        input: PathBuf,
        /// Destination file ("-" writes to stdout)
        output: PathBuf,
        /// Record layout used when compressing
        #[arg(short, long)]
        schema: String,
        /// Number of records in the stream
        #[arg(short, long)]
        records: u64,
    },
    /// Compress in memory, decompress, and compare every record
    Verify {
        /// Source file of back-to-back records ("-" reads stdin)
        input: PathBuf,
        /// Record layout, e.g. "point3,i32,i32,i16"
        #[arg(short, long)]
        schema: String,
    },
}

// ── Helpers ────────────────────────────────────────────────────────────────

fn init_logging(verbose: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.format(|buf, record| writeln!(buf, "[{}] {}", record.level(), record.args()));
    let _ = builder.try_init();
}

fn schema_display(schema: &[FieldKind]) -> String {
    schema
        .iter()
        .map(|kind| kind.name())
        .collect::<Vec<_>>()
        .join(",")
}

/// Reads the whole input and checks that it splits into whole records.
fn read_records(input: &Path, record_size: usize) -> anyhow::Result<Vec<u8>> {
    let mut data = Vec::new();
    open_input(input)?
        .read_to_end(&mut data)
        .with_context(|| format!("reading {:?}", input))?;

    if data.len() % record_size != 0 {
        anyhow::bail!(
            "input is {} bytes, not a whole number of {}-byte records ({} bytes left over)",
            data.len(),
            record_size,
            data.len() % record_size
        );
    }
    Ok(data)
}

// ── Subcommand implementations ─────────────────────────────────────────────

fn run_compress(input: PathBuf, output: PathBuf, schema_text: &str) -> anyhow::Result<()> {
    let schema = parse_schema(schema_text)?;
    let size = record_size(&schema);
    let data = read_records(&input, size)?;

    let sink = CountingWriter::new(create_output(&output)?);
    let mut compressor = compressor_for(sink, &schema);

    let t0 = Instant::now();
    for (i, record) in data.chunks_exact(size).enumerate() {
        compressor
            .compress(record)
            .with_context(|| format!("compressing record {}", i))?;
    }
    compressor.done()?;
    let records = compressor.records();
    let mut sink = compressor.into_stream();
    sink.flush()?;
    let elapsed = t0.elapsed();

    let compressed_size = sink.written();
    let raw_size = data.len() as u64;
    info!("compressed {} records into {:?}", records, output);

    eprintln!("  schema      : {}", schema_display(&schema));
    eprintln!("  record size : {} B", size);
    eprintln!("  records     : {}", records);
    eprintln!("  raw size    : {}", human_bytes(raw_size));
    eprintln!("  compressed  : {}", human_bytes(compressed_size));
    eprintln!("  ratio       : {:.2}x", ratio(raw_size, compressed_size));
    eprintln!("  throughput  : {}", throughput(raw_size, elapsed));
    eprintln!("  elapsed     : {:.3}s", elapsed.as_secs_f64());
    Ok(())
}

fn run_decompress(
    input: PathBuf,
    output: PathBuf,
    schema_text: &str,
    records: u64,
) -> anyhow::Result<()> {
    let schema = parse_schema(schema_text)?;
    let size = record_size(&schema);

    let mut decompressor = decompressor_for(open_input(&input)?, &schema);
    let mut dst = create_output(&output)?;

    let t0 = Instant::now();
    let mut record = vec![0u8; size];
    for i in 0..records {
        decompressor.decompress(&mut record).with_context(|| {
            format!("decoding record {} of {} (stream ended early?)", i, records)
        })?;
        dst.write_all(&record)?;
    }
    dst.flush()?;

    let elapsed = t0.elapsed();
    let total_raw = records * size as u64;
    eprintln!("  records     : {}", records);
    eprintln!("  raw size    : {}", human_bytes(total_raw));
    eprintln!("  throughput  : {}", throughput(total_raw, elapsed));
    eprintln!("  elapsed     : {:.3}s", elapsed.as_secs_f64());
    Ok(())
}

fn run_verify(input: PathBuf, schema_text: &str) -> anyhow::Result<()> {
    let schema = parse_schema(schema_text)?;
    let size = record_size(&schema);
    let data = read_records(&input, size)?;

    let mut compressor = compressor_for(Vec::with_capacity(data.len() / 2), &schema);
    for record in data.chunks_exact(size) {
        compressor.compress(record)?;
    }
    compressor.done()?;
    let compressed = compressor.into_stream();
    debug!("verify: {} bytes compressed to {}", data.len(), compressed.len());

    let mut decompressor = decompressor_for(compressed.as_slice(), &schema);
    let mut decoded = vec![0u8; size];
    for (i, expected) in data.chunks_exact(size).enumerate() {
        decompressor
            .decompress(&mut decoded)
            .with_context(|| format!("decoding record {}", i))?;
        if decoded != expected {
            anyhow::bail!(
                "record {} does not round-trip: expected {:02x?}, decoded {:02x?}",
                i,
                expected,
                decoded
            );
        }
    }

    eprintln!(
        "  OK: {} records of {} B round-trip ({} -> {}, {:.2}x)",
        data.len() / size,
        size,
        human_bytes(data.len() as u64),
        human_bytes(compressed.len() as u64),
        ratio(data.len() as u64, compressed.len() as u64)
    );
    Ok(())
}

// ── Entry point ────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match cli.command {
        Commands::Compress {
            input,
            output,
            schema,
        } => run_compress(input, output, &schema),
        Commands::Decompress {
            input,
            output,
            schema,
            records,
        } => run_decompress(input, output, &schema, records),
        Commands::Verify { input, schema } => run_verify(input, &schema),
    }
}
