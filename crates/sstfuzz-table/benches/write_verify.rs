use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use sstfuzz_table::{Options, SstFileReader, SstFileWriter};
use tempfile::tempdir;

fn bench_write_verify(c: &mut Criterion) {
    let mut group = c.benchmark_group("write_verify");
    let dir = tempdir().unwrap();
    let path = dir.path().join("bench.sst");
    let options = Options::default();

    for count in [16usize, 256, 4096] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter(|| {
                let mut writer = SstFileWriter::new(options.clone());
                writer.open(&path).unwrap();
                for i in 0..count {
                    let key = format!("key{:08}", i);
                    writer.put(key.as_bytes(), b"value").unwrap();
                }
                black_box(writer.finish().unwrap());

                let mut reader = SstFileReader::open(&options, &path).unwrap();
                reader.verify_checksum().unwrap();
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_write_verify);
criterion_main!(benches);
