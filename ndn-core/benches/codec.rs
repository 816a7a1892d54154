use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ndn_core::tlv::{read_varnum, write_varnum};
use ndn_core::{
    Data, Encoder, Interest, Name, NameComponent, ParamsDigest, SignatureInfo, SignatureType,
};

fn benchmark_varnum(c: &mut Criterion) {
    c.bench_function("varnum_write", |b| {
        let mut buf = Vec::<u8>::with_capacity(64);
        b.iter(|| {
            buf.clear();
            for n in [black_box(252u64), 65535, 4294967296] {
                write_varnum(&mut buf, n);
            }
        })
    });

    c.bench_function("varnum_read", |b| {
        let wire = [0xFE, 0x00, 0x01, 0x00, 0x00];
        b.iter(|| read_varnum(black_box(&wire), false))
    });
}

fn benchmark_name(c: &mut Criterion) {
    let a = Name::from_uri("/ndn/edu/ucla/ping/1234/50=%07").unwrap();
    let b = Name::from_uri("/ndn/edu/ucla/ping/1234/50=%08").unwrap();

    c.bench_function("name_compare", |bench| {
        bench.iter(|| black_box(&a).compare(black_box(&b)))
    });

    c.bench_function("name_from_uri", |bench| {
        bench.iter(|| Name::from_uri(black_box("/ndn/edu/ucla/%00%01/50=%07")))
    });
}

fn benchmark_packets(c: &mut Criterion) {
    let mut interest = Interest::new(
        Name::from_uri("/ndn/edu/ucla/ping")
            .unwrap()
            .append(ParamsDigest::placeholder()),
    )
    .with_nonce(0x01020304)
    .with_app_parameters(vec![0xC0; 64]);
    interest.update_params_digest().unwrap();
    let interest_wire = Encoder::encode(&interest).unwrap();

    c.bench_function("interest_encode", |b| {
        b.iter(|| Encoder::encode(black_box(&interest)))
    });

    c.bench_function("interest_decode", |b| {
        b.iter(|| Interest::decode(black_box(interest_wire.clone())))
    });

    c.bench_function("params_digest_validate", |b| {
        b.iter(|| black_box(&interest).validate_params_digest())
    });

    let mut data = Data::new(Name::from_uri("/ndn/edu/ucla/ping").unwrap(), vec![0xAB; 1024])
        .with_final_block_id(NameComponent::generic("last"));
    data.sig_info = Some(SignatureInfo::new(SignatureType::DigestSha256));
    data.sig_value = Some(vec![0; 32].into());
    let data_wire = Encoder::encode(&data).unwrap();

    c.bench_function("data_encode", |b| b.iter(|| Encoder::encode(black_box(&data))));

    c.bench_function("data_decode", |b| {
        b.iter(|| Data::decode(black_box(data_wire.clone())))
    });
}

criterion_group!(benches, benchmark_varnum, benchmark_name, benchmark_packets);
criterion_main!(benches);
