use collate_io::parallel::RayonComm;
use collate_io::{
    CollatedWrite, ProfileData, RegionTiming, TableFormatter, UniverseComm, WriterContext,
    WriterOptions, pad_record,
};
use criterion::{Criterion, black_box, criterion_group, criterion_main};

fn sample_profile(regions: usize) -> ProfileData {
    let mut data = ProfileData::default();
    for i in 0..regions {
        let t = (i as f64 + 1.0).sqrt();
        data.push(RegionTiming::new(format!("region_{i}"), i as u64 + 1, t, 2.0 * t));
    }
    data
}

fn bench_collated_write(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let data = sample_profile(64);

    c.bench_function("pad 4 KiB record", |ben| {
        let fragment = vec![b'x'; 3000];
        ben.iter(|| pad_record(black_box(fragment.clone()), 4096, b' ').unwrap())
    });

    c.bench_function("collated write, 4 ranks", |ben| {
        ben.iter(|| {
            RayonComm::run(4, None, |comm| {
                let opts = WriterOptions::new("bench").with_output_dir(dir.path());
                WriterContext::new(UniverseComm::Rayon(comm), TableFormatter::default(), opts)
                    .write(black_box(&data))
                    .unwrap()
            })
            .unwrap()
        })
    });

    c.bench_function("serial write", |ben| {
        let opts = WriterOptions::new("bench-serial").with_output_dir(dir.path());
        let mut writer = WriterContext::new(UniverseComm::Serial, TableFormatter::default(), opts);
        ben.iter(|| writer.write(black_box(&data)).unwrap())
    });
}

criterion_group!(benches, bench_collated_write);
criterion_main!(benches);
