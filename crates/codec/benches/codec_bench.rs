use criterion::{Criterion, black_box, criterion_group, criterion_main};

use kvbridge_codec::{Codec, Envelope, JsonCodec, Slot};

fn bench_encode_small_string(c: &mut Criterion) {
    let env = Envelope::new(Slot::Defined("bar"), Some(1_700_000_000_000));

    c.bench_function("encode_small_string", |b| {
        b.iter(|| JsonCodec.encode(black_box(&env)).unwrap())
    });
}

fn bench_decode_small_string(c: &mut Criterion) {
    let env = Envelope::new(Slot::Defined("bar"), Some(1_700_000_000_000));
    let data = JsonCodec.encode(&env).unwrap();

    c.bench_function("decode_small_string", |b| {
        b.iter(|| {
            JsonCodec
                .decode::<Envelope<String>>(black_box(data.as_ref()))
                .unwrap()
        })
    });
}

fn bench_encode_bulk_1kb(c: &mut Criterion) {
    let data = vec![7u8; 1024];
    let env = Envelope::new(Slot::Defined(data), None);

    c.bench_function("encode_bulk_1kb", |b| {
        b.iter(|| JsonCodec.encode(black_box(&env)).unwrap())
    });
}

fn bench_decode_bulk_1kb(c: &mut Criterion) {
    let env = Envelope::new(Slot::Defined(vec![7u8; 1024]), None);
    let data = JsonCodec.encode(&env).unwrap();

    c.bench_function("decode_bulk_1kb", |b| {
        b.iter(|| {
            JsonCodec
                .decode::<Envelope<Vec<u8>>>(black_box(data.as_ref()))
                .unwrap()
        })
    });
}

criterion_group!(
    benches,
    bench_encode_small_string,
    bench_decode_small_string,
    bench_encode_bulk_1kb,
    bench_decode_bulk_1kb,
);
criterion_main!(benches);
