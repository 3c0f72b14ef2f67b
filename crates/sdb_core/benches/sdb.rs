use divan::AllocProfiler;

#[global_allocator]
static ALLOC: AllocProfiler = AllocProfiler::system();

fn main() {
    divan::main();
}

fn entries(count: usize) -> Vec<sdb_core::StringEntry> {
    (0..count)
        .map(|i| {
            sdb_core::StringEntry::new(
                0x1000_0000 + i as u32,
                format!("localized string number {i} with some padding text"),
                false,
            )
        })
        .collect()
}

pub mod read {
    use divan::Bencher;
    use sdb_core::read::{decode_with, DecodeOptions};
    use sdb_core::write::{encode_with, EncodeOptions};

    #[divan::bench(args = [1_000, 5_000, 50_000])]
    fn decode_plaintext(bencher: Bencher, count: usize) {
        let bytes = encode_with(&super::entries(count), EncodeOptions::default()).unwrap();
        bencher.bench(|| divan::black_box(decode_with(&bytes, DecodeOptions::default()).unwrap()));
    }

    #[divan::bench(args = [1_000, 5_000, 50_000])]
    fn decode_obscured(bencher: Bencher, count: usize) {
        let bytes = encode_with(
            &super::entries(count),
            EncodeOptions::builder().obscure(true).build(),
        )
        .unwrap();
        bencher.bench(|| divan::black_box(decode_with(&bytes, DecodeOptions::default()).unwrap()));
    }

    #[divan::bench]
    fn decode_obscured_sequential(bencher: Bencher) {
        let bytes = encode_with(
            &super::entries(50_000),
            EncodeOptions::builder().obscure(true).build(),
        )
        .unwrap();
        let options = DecodeOptions::builder()
            .parallel_threshold(usize::MAX)
            .build();
        bencher.bench(|| divan::black_box(decode_with(&bytes, options).unwrap()));
    }
}

pub mod write {
    use divan::Bencher;
    use sdb_core::write::encode;

    #[divan::bench(args = [1_000, 50_000])]
    fn encode_plaintext(bencher: Bencher, count: usize) {
        let entries = super::entries(count);
        bencher.bench(|| divan::black_box(encode(&entries).unwrap()));
    }
}

pub mod cipher {
    use divan::Bencher;

    #[divan::bench(args = [16, 1024, 65536])]
    fn reveal(bencher: Bencher, len: usize) {
        let data = vec![0xA5u8; len];
        bencher.bench(|| divan::black_box(sdb_core::cipher::reveal(&data, 0x20)));
    }
}
