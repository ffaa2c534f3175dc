use divan::AllocProfiler;

#[global_allocator]
static ALLOC: AllocProfiler = AllocProfiler::system();

fn main() {
    divan::main();
}

fn get_input() -> Vec<u8> {
    std::fs::read(format!(
        "{}/resources/simple.eqg",
        env!("CARGO_MANIFEST_DIR")
    ))
    .unwrap()
}

pub mod read {
    use divan::Bencher;
    use eq_pfs::{PfsArchive, PfsReader};
    use std::io::Cursor;

    #[divan::bench]
    fn decode(bencher: Bencher) {
        bencher.with_inputs(super::get_input).bench_refs(|data| {
            divan::black_box(PfsReader::new(Cursor::new(data)).read().unwrap());
        });
    }

    #[divan::bench]
    fn access_file(bencher: Bencher) {
        bencher
            .with_inputs(|| {
                let mut archive = PfsArchive::new("simple.eqg");
                archive.decode(&mut Cursor::new(super::get_input())).unwrap();
                archive
            })
            .bench_refs(|archive| {
                divan::black_box(archive.file("hello.txt").unwrap());
            });
    }
}

pub mod write {
    use divan::Bencher;
    use eq_pfs::{PfsArchive, PfsWriterOptions};
    use std::io::Cursor;

    fn archive(size: usize) -> PfsArchive {
        let mut archive = PfsArchive::new("bench.eqg");
        for i in 0..16 {
            let data = (0..size).map(|b| (b % 251) as u8 ^ i as u8).collect::<Vec<_>>();
            archive.add(format!("file_{i:02}.dat"), data).unwrap();
        }
        archive
    }

    #[divan::bench(args = [1024, 65536])]
    fn encode(bencher: Bencher, size: usize) {
        let archive = archive(size);
        bencher.bench_local(|| {
            let mut buffer = Cursor::new(Vec::new());
            archive
                .encode_with(&mut buffer, PfsWriterOptions::default())
                .unwrap();
            divan::black_box(buffer);
        });
    }

    #[divan::bench(sample_count = 10)]
    fn encode_stored(bencher: Bencher) {
        let archive = archive(65536);
        let options = PfsWriterOptions::builder().compression_level(0).build();
        bencher.bench_local(|| {
            let mut buffer = Cursor::new(Vec::new());
            archive.encode_with(&mut buffer, options).unwrap();
            divan::black_box(buffer);
        });
    }
}
