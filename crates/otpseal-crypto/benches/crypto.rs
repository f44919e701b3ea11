use otpseal_crypto::{decrypt, encrypt, parse, KeyHandle, OtpGenerator, KEY_SIZE};

fn bench_handle() -> KeyHandle {
    KeyHandle::from_key_bytes("bench", &[0xABu8; KEY_SIZE]).unwrap()
}

#[divan::bench(args = [6, 16, 64])]
fn bench_generate(bencher: divan::Bencher, len: usize) {
    let generator = OtpGenerator::default();
    bencher.bench(|| generator.generate(divan::black_box(len)).unwrap());
}

#[divan::bench]
fn bench_encrypt_otp(bencher: divan::Bencher) {
    let handle = bench_handle();
    bencher.bench(|| {
        encrypt(divan::black_box(&handle), divan::black_box(b"483920"))
            .unwrap()
            .to_string()
    });
}

#[divan::bench]
fn bench_decrypt_otp(bencher: divan::Bencher) {
    let handle = bench_handle();
    let text = encrypt(&handle, b"483920").unwrap().to_string();
    bencher.bench(|| {
        let envelope = parse(divan::black_box(&text)).unwrap();
        decrypt(divan::black_box(&handle), &envelope).unwrap()
    });
}

fn main() {
    divan::main();
}
