//! fieldpack demo
//!
//! Packs a stream of point records (a 3D point, two counters and a short),
//! compresses it with the compile-time and the run-time pipelines, checks
//! that both decode to the exact input, and sets the result against the
//! general-purpose compressors on the same raw bytes.

use std::io::Write;
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Parser;
use flate2::write::GzEncoder;
use flate2::Compression as GzCompression;
use log::debug;
use xxhash_rust::xxh3::xxh3_64;

use fieldpack_cli::report::{fmt_duration, human_bytes, ratio, section};
use fieldpack_core::{field_chain, Field, Packable, StaticCompressor, StaticDecompressor};
use fieldpack_fields::{compressor_for, decompressor_for, FieldKind, Point3};

// ── constants ──────────────────────────────────────────────────────────────

const RECORD_SIZE: usize = 34;

type Scenario = field_chain![Field<Point3>, Field<i32>, Field<i32>, Field<i16>];

const SCHEMA: [FieldKind; 4] = [
    FieldKind::Point3,
    FieldKind::I32,
    FieldKind::I32,
    FieldKind::I16,
];

#[derive(Parser)]
#[command(name = "fieldpack-demo", about = "Point-record compression demo", version)]
struct Args {
    /// Number of records to generate
    #[arg(short, long, default_value_t = 1000)]
    records: u32,
}

// ── data generator ──────────────────────────────────────────────────────────

/// Record `i`: point `(i, i, i)`, then `i + 50000`, `i + 10`, `i + 10000`.
fn generate_record(i: u32, out: &mut [u8]) {
    let t = i as f64;
    Point3::new(t, t, t).pack_into(&mut out[0..24]);
    (i as i32 + 50_000).pack_into(&mut out[24..28]);
    (i as i32 + 10).pack_into(&mut out[28..32]);
    ((i + 10_000) as i16).pack_into(&mut out[32..34]);
}

fn generate_records(count: u32) -> Vec<u8> {
    let mut data = vec![0u8; count as usize * RECORD_SIZE];
    for (i, record) in data.chunks_exact_mut(RECORD_SIZE).enumerate() {
        generate_record(i as u32, record);
    }
    data
}

// ── timing ──────────────────────────────────────────────────────────────────

fn timed<T, F: FnOnce() -> Result<T>>(f: F) -> Result<(T, Duration)> {
    let t0 = Instant::now();
    let out = f()?;
    Ok((out, t0.elapsed()))
}

// ── pipelines ───────────────────────────────────────────────────────────────

fn compress_static(data: &[u8]) -> Result<Vec<u8>> {
    let mut c = StaticCompressor::<_, Scenario>::new(Vec::new());
    for record in data.chunks_exact(RECORD_SIZE) {
        c.compress(record)?;
    }
    c.done()?;
    Ok(c.into_stream())
}

fn compress_dynamic(data: &[u8]) -> Result<Vec<u8>> {
    let mut c = compressor_for(Vec::new(), &SCHEMA);
    for record in data.chunks_exact(RECORD_SIZE) {
        c.compress(record)?;
    }
    c.done()?;
    Ok(c.into_stream())
}

fn decompress_static(stream: &[u8], records: u32) -> Result<Vec<u8>> {
    let mut d = StaticDecompressor::<_, Scenario>::new(stream);
    let mut out = vec![0u8; records as usize * RECORD_SIZE];
    for record in out.chunks_exact_mut(RECORD_SIZE) {
        d.decompress(record)?;
    }
    Ok(out)
}

fn decompress_dynamic(stream: &[u8], records: u32) -> Result<Vec<u8>> {
    let mut d = decompressor_for(stream, &SCHEMA);
    let mut out = vec![0u8; records as usize * RECORD_SIZE];
    for record in out.chunks_exact_mut(RECORD_SIZE) {
        d.decompress(record)?;
    }
    Ok(out)
}

/// Fails on the first record that differs from the original.
fn check_roundtrip(label: &str, original: &[u8], decoded: &[u8]) -> Result<()> {
    let pairs = original
        .chunks_exact(RECORD_SIZE)
        .zip(decoded.chunks_exact(RECORD_SIZE));
    for (i, (want, got)) in pairs.enumerate() {
        if want != got {
            anyhow::bail!("{label}: record {i} mismatch: expected {want:02x?}, decoded {got:02x?}");
        }
    }
    if xxh3_64(original) != xxh3_64(decoded) {
        anyhow::bail!("{label}: digest mismatch");
    }
    Ok(())
}

// ── baselines ───────────────────────────────────────────────────────────────

fn baseline_zstd(data: &[u8]) -> Result<usize> {
    Ok(zstd::bulk::compress(data, 3)?.len())
}

fn baseline_lz4(data: &[u8]) -> Result<usize> {
    Ok(lz4_flex::compress_prepend_size(data).len())
}

fn baseline_gzip(data: &[u8]) -> Result<usize> {
    let mut enc = GzEncoder::new(Vec::new(), GzCompression::default());
    enc.write_all(data)?;
    Ok(enc.finish()?.len())
}

// ── demo runner ─────────────────────────────────────────────────────────────

fn print_row(label: &str, raw: usize, compressed: usize, time: Option<Duration>) {
    println!(
        "  {:<24} {:>12}  {:>8.2}x  {:>10}",
        label,
        human_bytes(compressed as u64),
        ratio(raw as u64, compressed as u64),
        time.map(fmt_duration).unwrap_or_default()
    );
}

fn run(args: Args) -> Result<()> {
    let records = args.records;
    if records == 0 {
        anyhow::bail!("--records must be at least 1");
    }

    println!();
    section("0 · DATA");
    let raw = generate_records(records);
    let digest = xxh3_64(&raw);
    println!("  schema        : point3, i32, i32, i16 ({RECORD_SIZE} B per record)");
    println!("  records       : {records}");
    println!("  raw size      : {}", human_bytes(raw.len() as u64));
    println!("  xxh3          : {digest:016x}");
    println!();

    section("1 · COMPRESSION");
    let (static_stream, static_time) = timed(|| compress_static(&raw))?;
    let (dynamic_stream, dynamic_time) = timed(|| compress_dynamic(&raw))?;
    if static_stream != dynamic_stream {
        anyhow::bail!("static and dynamic pipelines produced different streams");
    }
    debug!("pipeline streams agree ({} bytes)", static_stream.len());

    println!("  {:<24} {:>12}  {:>9}  {:>10}", "Format", "Compressed", "Ratio", "Time");
    println!("  {}", "─".repeat(62));
    print_row("fieldpack (static)", raw.len(), static_stream.len(), Some(static_time));
    print_row("fieldpack (dynamic)", raw.len(), dynamic_stream.len(), Some(dynamic_time));
    print_row("zstd -3", raw.len(), baseline_zstd(&raw)?, None);
    print_row("lz4", raw.len(), baseline_lz4(&raw)?, None);
    print_row("gzip", raw.len(), baseline_gzip(&raw)?, None);
    println!();

    section("2 · ROUND TRIP");
    let (decoded, time) = timed(|| decompress_static(&static_stream, records))?;
    check_roundtrip("static", &raw, &decoded)?;
    println!("  static   : {records} records ✓  ({})", fmt_duration(time));

    let (decoded, time) = timed(|| decompress_dynamic(&dynamic_stream, records))?;
    check_roundtrip("dynamic", &raw, &decoded)?;
    println!("  dynamic  : {records} records ✓  ({})", fmt_duration(time));
    println!("  xxh3     : {:016x} matches the input", xxh3_64(&decoded));
    println!();

    Ok(())
}

fn main() {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    let _ = builder.try_init();

    if let Err(e) = run(Args::parse()) {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
