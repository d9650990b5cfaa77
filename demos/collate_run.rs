use collate_io::{
    CollatedWrite, Comm, ProfileData, RegionTiming, TableFormatter, UniverseComm, WriterContext,
    WriterOptions,
};
#[cfg(all(feature = "rayon", not(feature = "mpi")))]
use collate_io::parallel::RayonComm;
use tracing_subscriber::EnvFilter;

// Fake timings whose row count varies per rank, so records differ in length.
fn profile_for(rank: usize) -> ProfileData {
    let mut data = ProfileData::default();
    data.push(RegionTiming::new("main", 1, 0.5, 4.0 + rank as f64));
    for i in 0..=rank % 4 {
        data.push(RegionTiming::new(format!("kernel_{i}"), 10 * (i as u64 + 1), 0.75, 0.75));
    }
    data
}

fn run_rank(comm: UniverseComm, opts: WriterOptions) -> collate_io::Result<()> {
    let data = profile_for(comm.rank());
    let mut writer = WriterContext::new(comm, TableFormatter::default(), opts);
    let outcome = writer.write(&data)?;
    println!(
        "wrote {} bytes at {:?} of {} (record width {:?})",
        outcome.bytes_written,
        outcome.placement,
        outcome.path.display(),
        outcome.record_width
    );
    Ok(())
}

#[cfg(feature = "mpi")]
fn main() -> collate_io::Result<()> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let opts = WriterOptions::from_env()?;
    let comm = collate_io::parallel::MpiComm::new()?;
    run_rank(UniverseComm::Mpi(comm), opts)
}

#[cfg(all(feature = "rayon", not(feature = "mpi")))]
fn main() -> collate_io::Result<()> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let opts = WriterOptions::from_env()?;
    // The writer applies `opts.collective_timeout` to each rank itself.
    let per_rank = |comm| run_rank(UniverseComm::Rayon(comm), opts.clone());
    let results = match std::env::args().nth(1).and_then(|s| s.parse().ok()) {
        Some(ranks) => RayonComm::run(ranks, None, per_rank)?,
        None => RayonComm::run_on_all_cpus(per_rank)?,
    };
    results.into_iter().collect()
}

#[cfg(not(any(feature = "rayon", feature = "mpi")))]
fn main() -> collate_io::Result<()> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let opts = WriterOptions::from_env()?;
    run_rank(UniverseComm::Serial, opts)
}
