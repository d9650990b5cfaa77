//! Failure behavior of the distributed write.
//!
//! A rank that never joins the negotiation, a rank whose formatter fails and
//! an unwritable destination must each leave every rank with an error, and
//! none of them may claim a usable collated file.
#![cfg(feature = "rayon")]

use std::sync::mpsc;
use std::time::Duration;

use collate_io::parallel::RayonComm;
use collate_io::{
    CollateError, CollatedWrite, Comm, FnFormatter, FormatError, UniverseComm, WriteStage,
    WriterContext, WriterOptions,
};

type EmitFn = fn(&mut Vec<u8>, &(), &UniverseComm) -> Result<(), FormatError>;
type RankFormatter = FnFormatter<(), EmitFn>;

/// Rank 1 fails to format; the others write their rank number.
fn rank_one_fails() -> RankFormatter {
    fn emit(out: &mut Vec<u8>, _: &(), comm: &UniverseComm) -> Result<(), FormatError> {
        if comm.rank() == 1 {
            return Err(FormatError::Custom("no measurements recorded".into()));
        }
        out.extend_from_slice(format!("rank {}", comm.rank()).as_bytes());
        Ok(())
    }
    FnFormatter::new(emit as EmitFn)
}

fn echo_rank() -> RankFormatter {
    fn emit(out: &mut Vec<u8>, _: &(), comm: &UniverseComm) -> Result<(), FormatError> {
        out.extend_from_slice(format!("rank {}", comm.rank()).as_bytes());
        Ok(())
    }
    FnFormatter::new(emit as EmitFn)
}

/// A participant that drops out before negotiating fails the whole group,
/// and no file is created.
#[test]
fn missing_participant_fails_every_rank() {
    let dir = tempfile::tempdir().unwrap();
    let results = RayonComm::run(3, None, |comm| {
        if comm.rank() == 2 {
            // Simulated crash: leaves without contributing a length.
            return None;
        }
        let opts = WriterOptions::new("dropped").with_output_dir(dir.path());
        let mut writer = WriterContext::new(UniverseComm::Rayon(comm), echo_rank(), opts);
        let result = writer.write(&());
        Some((result, writer.stage()))
    })
    .unwrap();

    for (result, stage) in results.into_iter().flatten() {
        assert!(matches!(result, Err(CollateError::Negotiation { .. })));
        assert_eq!(stage, WriteStage::Negotiating);
    }
    assert!(!dir.path().join("dropped-collated").exists());
}

/// A participant that stays alive but never contributes trips the timeout.
#[test]
fn silent_participant_times_out() {
    let dir = tempfile::tempdir().unwrap();
    let timeout = Some(Duration::from_millis(200));
    let results = RayonComm::run(3, timeout, |comm| {
        if comm.rank() == 0 {
            // Holds its handle past the other ranks' deadline.
            std::thread::sleep(Duration::from_millis(600));
            drop(comm);
            return None;
        }
        let opts = WriterOptions::new("silent").with_output_dir(dir.path());
        Some(WriterContext::new(UniverseComm::Rayon(comm), echo_rank(), opts).write(&()))
    })
    .unwrap();

    assert!(results[0].is_none());
    for result in results.into_iter().flatten() {
        assert!(matches!(result, Err(CollateError::Negotiation { .. })));
    }
    assert!(!dir.path().join("silent-collated").exists());
}

/// A formatting failure on one rank is reported there and, since that rank
/// never negotiates, fails negotiation everywhere else.
#[test]
fn formatting_failure_on_one_rank() {
    let dir = tempfile::tempdir().unwrap();
    let results = RayonComm::run(3, None, |comm| {
        let opts = WriterOptions::new("badfmt").with_output_dir(dir.path());
        WriterContext::new(UniverseComm::Rayon(comm), rank_one_fails(), opts).write(&())
    })
    .unwrap();

    assert!(matches!(results[1], Err(CollateError::Format(_))));
    assert!(matches!(results[0], Err(CollateError::Negotiation { .. })));
    assert!(matches!(results[2], Err(CollateError::Negotiation { .. })));
    assert!(!dir.path().join("badfmt-collated").exists());
}

/// If rank 0 cannot create the file, rank 0 reports the access error and
/// every other rank learns the write failed.
#[test]
fn unwritable_destination_fails_every_rank() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("no-such-dir");
    let results = RayonComm::run(3, None, |comm| {
        let opts = WriterOptions::new("lost").with_output_dir(&missing);
        WriterContext::new(UniverseComm::Rayon(comm), echo_rank(), opts).write(&())
    })
    .unwrap();

    assert!(matches!(results[0], Err(CollateError::FileAccess { .. })));
    assert!(matches!(results[1], Err(CollateError::PeerWriteFailed { .. })));
    assert!(matches!(results[2], Err(CollateError::PeerWriteFailed { .. })));
}

/// A timeout set on the writer options bounds negotiation even when the
/// group itself was built without one.
#[test]
fn writer_options_timeout_bounds_negotiation() {
    let dir = tempfile::tempdir().unwrap();
    let mut members = RayonComm::group(2, None);
    // Rank 1 stays alive for the whole test but never contributes.
    let silent = members.pop().unwrap();
    let comm = members.pop().unwrap();

    let (tx, rx) = mpsc::channel();
    let out_dir = dir.path().to_path_buf();
    let handle = std::thread::spawn(move || {
        let opts = WriterOptions::new("bounded")
            .with_output_dir(out_dir)
            .with_collective_timeout(Duration::from_millis(100));
        let mut writer = WriterContext::new(UniverseComm::Rayon(comm), echo_rank(), opts);
        tx.send(writer.write(&())).unwrap();
    });

    let result = rx
        .recv_timeout(Duration::from_secs(5))
        .expect("writer must give up after its configured timeout");
    assert!(matches!(result, Err(CollateError::Negotiation { rank: 0, .. })));
    handle.join().unwrap();
    drop(silent);
    assert!(!dir.path().join("bounded-collated").exists());
}

/// The file is created, then one non-zero rank fails its own write: that
/// rank reports the access error and every other rank is told the file is
/// unusable instead of reporting success.
#[test]
fn late_write_failure_fails_every_rank() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("no-such-dir");
    let results = RayonComm::run(3, None, |comm| {
        // Rank 1 alone resolves the shared file under a missing directory,
        // so rank 0 still creates the real file and the other opens succeed.
        let out_dir = if comm.rank() == 1 { missing.as_path() } else { dir.path() };
        let opts = WriterOptions::new("partial").with_output_dir(out_dir);
        let mut writer = WriterContext::new(UniverseComm::Rayon(comm), echo_rank(), opts);
        (writer.write(&()), writer.stage())
    })
    .unwrap();

    assert!(matches!(results[1].0, Err(CollateError::FileAccess { .. })));
    for rank in [0, 2] {
        assert!(matches!(
            results[rank].0,
            Err(CollateError::PeerWriteFailed { stage: "writing" })
        ));
    }
    assert!(results.iter().all(|(_, stage)| *stage == WriteStage::Closed));
    // The file exists but no rank claimed it.
    assert!(dir.path().join("partial-collated").exists());
}
