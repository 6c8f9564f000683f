//! Benchmarks for result analysis and trust classification.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use gpgreport::algorithm::PublicKeyAlgorithm;
use gpgreport::analysis::{analyze, AnalysisContext};
use gpgreport::engine::{RawEngineResult, RawEncryptResult, RawSignature, RawVerifyResult};
use gpgreport::key::{Fingerprint, Key, KeyUsage, Subkey};
use gpgreport::keyring::Keyring;
use gpgreport::trust::{classify, OwnerTrust, ValidityCode};

const NOW: u64 = 1_700_000_000;

fn fingerprint(n: usize) -> String {
    format!("{:040X}", n + 1)
}

fn keyring(size: usize) -> Keyring {
    let keys = (0..size).map(|n| {
        let primary = Subkey::new(
            Fingerprint::parse(&fingerprint(n)).unwrap(),
            PublicKeyAlgorithm::Ed25519,
            KeyUsage::all(),
            255,
            NOW - 1_000,
        );
        Key::new(primary, vec![], vec![])
            .unwrap()
            .with_owner_trust(OwnerTrust::Full)
            .with_validity(ValidityCode::FULL)
    });
    Keyring::from_keys(keys).unwrap()
}

fn verify_result(signatures: usize) -> RawEngineResult {
    RawEngineResult::Verify(RawVerifyResult {
        signatures: Some(
            (0..signatures)
                .map(|n| RawSignature {
                    fpr: Some(fingerprint(n * 7)),
                    summary: Some(0x3),
                    status: Some(0),
                    timestamp: Some(NOW - 60),
                    validity: Some(4),
                    ..RawSignature::default()
                })
                .collect(),
        ),
        ..RawVerifyResult::default()
    })
}

fn bench_verify(c: &mut Criterion) {
    let mut group = c.benchmark_group("verify_analysis");
    let ring = keyring(1_000);
    let ctx = AnalysisContext::at(NOW);

    for signatures in [1usize, 10, 100] {
        let raw = verify_result(signatures);
        group.throughput(Throughput::Elements(signatures as u64));
        group.bench_with_input(BenchmarkId::from_parameter(signatures), &raw, |b, raw| {
            b.iter(|| analyze(black_box(raw), &ring, &ctx))
        });
    }

    group.finish();
}

fn bench_encrypt(c: &mut Criterion) {
    let ring = keyring(1_000);
    let ctx = AnalysisContext::at(NOW);
    let raw = RawEngineResult::Encrypt(RawEncryptResult {
        recipients: Some((0..50).map(|n| fingerprint(n * 13)).collect()),
        invalid_recipients: Some(vec![]),
        ..RawEncryptResult::default()
    });

    c.bench_function("encrypt_analysis_50_recipients", |b| {
        b.iter(|| analyze(black_box(&raw), &ring, &ctx))
    });
}

fn bench_report_digest(c: &mut Criterion) {
    let ring = keyring(100);
    let report = analyze(&verify_result(20), &ring, &AnalysisContext::at(NOW));

    c.bench_function("report_digest", |b| b.iter(|| black_box(&report).digest().unwrap()));
}

fn bench_classify(c: &mut Criterion) {
    c.bench_function("classify", |b| {
        b.iter(|| {
            for code in -1..7 {
                black_box(classify(black_box(OwnerTrust::Marginal), ValidityCode(code)));
            }
        })
    });
}

criterion_group!(
    benches,
    bench_verify,
    bench_encrypt,
    bench_report_digest,
    bench_classify
);
criterion_main!(benches);
