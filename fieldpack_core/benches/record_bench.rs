use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use fieldpack_core::{field_chain, Field, Packable, StaticCompressor, StaticDecompressor};
use fieldpack_fields::{compressor_for, decompressor_for, FieldKind, Point3};

const RECORDS: usize = 10_000;
const RECORD_SIZE: usize = 34;

type Schema = field_chain![Field<Point3>, Field<i32>, Field<i32>, Field<i16>];

const SCHEMA: [FieldKind; 4] = [
    FieldKind::Point3,
    FieldKind::I32,
    FieldKind::I32,
    FieldKind::I16,
];

/// Slowly moving points with a couple of counters, packed back to back.
fn generate_records(count: usize) -> Vec<u8> {
    let mut data = vec![0u8; count * RECORD_SIZE];
    for (i, record) in data.chunks_exact_mut(RECORD_SIZE).enumerate() {
        let t = i as f64 * 0.01;
        Point3::new(t.cos() * 100.0, t.sin() * 100.0, t).pack_into(&mut record[0..24]);
        (i as i32 + 50_000).pack_into(&mut record[24..28]);
        ((i * 7 % 1000) as i32).pack_into(&mut record[28..32]);
        (i as i16).pack_into(&mut record[32..34]);
    }
    data
}

fn compress_static(data: &[u8]) -> Vec<u8> {
    let mut c = StaticCompressor::<_, Schema>::new(Vec::with_capacity(data.len()));
    for record in data.chunks_exact(RECORD_SIZE) {
        c.compress(record).unwrap();
    }
    c.done().unwrap();
    c.into_stream()
}

fn compress_dynamic(data: &[u8]) -> Vec<u8> {
    let mut c = compressor_for(Vec::with_capacity(data.len()), &SCHEMA);
    for record in data.chunks_exact(RECORD_SIZE) {
        c.compress(record).unwrap();
    }
    c.done().unwrap();
    c.into_stream()
}

fn decompress_static(data: &[u8], out: &mut [u8]) {
    let mut d = StaticDecompressor::<_, Schema>::new(data);
    for record in out.chunks_exact_mut(RECORD_SIZE) {
        d.decompress(record).unwrap();
    }
}

fn decompress_dynamic(data: &[u8], out: &mut [u8]) {
    let mut d = decompressor_for(data, &SCHEMA);
    for record in out.chunks_exact_mut(RECORD_SIZE) {
        d.decompress(record).unwrap();
    }
}

fn bench_pipelines(c: &mut Criterion) {
    let raw = generate_records(RECORDS);
    let compressed = compress_static(&raw);
    let mut out = vec![0u8; raw.len()];

    let mut group = c.benchmark_group("record pipelines");
    group.throughput(Throughput::Bytes(raw.len() as u64));

    group.bench_function("compress static", |b| {
        b.iter(|| black_box(compress_static(black_box(&raw))))
    });
    group.bench_function("compress dynamic", |b| {
        b.iter(|| black_box(compress_dynamic(black_box(&raw))))
    });
    group.bench_function("decompress static", |b| {
        b.iter(|| decompress_static(black_box(&compressed), &mut out))
    });
    group.bench_function("decompress dynamic", |b| {
        b.iter(|| decompress_dynamic(black_box(&compressed), &mut out))
    });

    group.finish();
}

criterion_group!(benches, bench_pipelines);
criterion_main!(benches);
