// Signing benchmarks for the bubbl device core.
//
// Covers secp256k1 scalar multiplication, ECDSA signing with recovery id,
// the recovery-id search on its own, and EIP-712 typed data hashing. The
// device runs these on a microcontroller; the numbers here are for spotting
// regressions, not for absolute budgets.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use num_bigint::BigUint;
use serde_json::{json, Value};

use bubbl_signer::crypto::curve::{scalar_mult, CurvePoint};
use bubbl_signer::crypto::hash::keccak256;
use bubbl_signer::crypto::keys::KeyPair;
use bubbl_signer::crypto::signatures::{recovery_id, sign, sign_hash};
use bubbl_signer::typed_data::{encode_typed_data, TypeSchema};

fn cow() -> KeyPair {
    KeyPair::from_private(BigUint::from_bytes_be(&keccak256(b"cow"))).unwrap()
}

fn mail() -> (Value, TypeSchema, Value) {
    let types = json!({
        "Person": [
            {"name": "name", "type": "string"},
            {"name": "wallet", "type": "address"}
        ],
        "Mail": [
            {"name": "from", "type": "Person"},
            {"name": "to", "type": "Person"},
            {"name": "contents", "type": "string"}
        ]
    });
    let domain = json!({
        "name": "Ether Mail",
        "version": "1",
        "chainId": 1,
        "verifyingContract": "0xCcCCccccCCCCcCCCCCCcCcCccCcCCCcCcccccccC"
    });
    let message = json!({
        "from": {"name": "Cow", "wallet": "0xCD2a3d9F938E13CD947Ec05AbC7FE734Df8DD826"},
        "to": {"name": "Bob", "wallet": "0xbBbBBBBbbBBBbbbBbbBbbbbBBbBbbbbBbBbbBBbB"},
        "contents": "Hello, Bob!"
    });
    (domain, serde_json::from_value(types).unwrap(), message)
}

fn bench_scalar_mult(c: &mut Criterion) {
    let g = CurvePoint::generator();
    let mut group = c.benchmark_group("secp256k1/scalar_mult");
    for bits in [8u32, 128, 256] {
        let k = (BigUint::from(1u32) << (bits - 1)) + 1u32;
        group.bench_with_input(BenchmarkId::from_parameter(bits), &k, |b, k| {
            b.iter(|| scalar_mult(k, &g).unwrap());
        });
    }
    group.finish();
}

fn bench_sign(c: &mut Criterion) {
    let keypair = cow();
    let hash = keccak256(b"transfer 1 ETH to bob; nonce=42");

    c.bench_function("ecdsa/sign_with_recovery", |b| {
        b.iter(|| sign(&keypair, &hash).unwrap());
    });
}

fn bench_recovery_id(c: &mut Criterion) {
    let keypair = cow();
    let hash = keccak256(b"transfer 1 ETH to bob; nonce=42");
    let (r, s) = sign_hash(keypair.private_key(), &hash).unwrap();

    c.bench_function("ecdsa/recovery_id", |b| {
        b.iter(|| recovery_id(keypair.public_key(), &hash, &r, &s));
    });
}

fn bench_typed_data(c: &mut Criterion) {
    let (domain, types, message) = mail();

    c.bench_function("eip712/encode_mail", |b| {
        b.iter(|| encode_typed_data(&domain, &types, "Mail", &message).unwrap());
    });
}

criterion_group!(
    benches,
    bench_scalar_mult,
    bench_sign,
    bench_recovery_id,
    bench_typed_data,
);
criterion_main!(benches);
