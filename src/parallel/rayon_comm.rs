// rayon-based parallel context: one rank per pool thread

use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::error::{CollateError, Result};

/// Reduction slot shared by every member of a group.
struct Collective {
    /// Completed reductions; a waiter is released when it moves past its own.
    generation: u64,
    arrived: usize,
    acc: u64,
    /// Result of the last completed generation.
    result: u64,
    /// Members whose handle was dropped.
    departed: usize,
    /// Set once a member timed out; every later collective fails.
    broken: Option<String>,
}

struct Shared {
    size: usize,
    state: Mutex<Collective>,
    cond: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Collective> {
        // A panicking rank poisons the lock; the slot itself stays consistent.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// One member of an in-process rank group.
///
/// Handles are created together by [`RayonComm::group`] and each one is
/// moved onto its own thread, usually through [`RayonComm::run`]. Dropping a
/// handle before the group finishes a reduction fails that reduction on
/// every other member instead of stalling it.
pub struct RayonComm {
    rank: usize,
    timeout: Option<Duration>,
    shared: Arc<Shared>,
}

impl RayonComm {
    /// A group of `size` members, one per rank, ordered by rank.
    pub fn group(size: usize, timeout: Option<Duration>) -> Vec<RayonComm> {
        let shared = Arc::new(Shared {
            size,
            state: Mutex::new(Collective {
                generation: 0,
                arrived: 0,
                acc: 0,
                result: 0,
                departed: 0,
                broken: None,
            }),
            cond: Condvar::new(),
        });
        (0..size)
            .map(|rank| RayonComm {
                rank,
                timeout,
                shared: Arc::clone(&shared),
            })
            .collect()
    }

    /// Runs `op` once per rank, each on its own thread of a dedicated pool.
    ///
    /// Results are returned in rank order.
    pub fn run<F, R>(size: usize, timeout: Option<Duration>, op: F) -> Result<Vec<R>>
    where
        F: Fn(RayonComm) -> R + Sync,
        R: Send,
    {
        if size == 0 {
            return Err(CollateError::Backend("group size must be at least 1".into()));
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(size)
            .thread_name(|i| format!("collate-rank-{i}"))
            .build()
            .map_err(|e| CollateError::Backend(e.to_string()))?;
        let members: Vec<Mutex<Option<RayonComm>>> = RayonComm::group(size, timeout)
            .into_iter()
            .map(|comm| Mutex::new(Some(comm)))
            .collect();
        let results = pool.broadcast(|ctx| {
            let comm = members[ctx.index()]
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .take();
            comm.map(&op)
        });
        results
            .into_iter()
            .collect::<Option<Vec<R>>>()
            .ok_or_else(|| CollateError::Backend("a pool thread ran twice".into()))
    }

    /// Bounds every later reduction on this member.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Runs one rank per available CPU.
    pub fn run_on_all_cpus<F, R>(op: F) -> Result<Vec<R>>
    where
        F: Fn(RayonComm) -> R + Sync,
        R: Send,
    {
        Self::run(num_cpus::get(), None, op)
    }

    fn fail(&self, reason: impl Into<String>) -> CollateError {
        CollateError::Negotiation { rank: self.rank, reason: reason.into() }
    }
}

impl super::Comm for RayonComm {
    fn rank(&self) -> usize {
        self.rank
    }
    fn size(&self) -> usize {
        self.shared.size
    }

    fn set_collective_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }

    fn all_reduce_max(&self, x: u64) -> Result<u64> {
        let shared = &*self.shared;
        let mut st = shared.lock();
        if let Some(reason) = &st.broken {
            return Err(self.fail(reason.clone()));
        }
        if st.departed > 0 {
            return Err(self.fail(format!("{} participant(s) left the group", st.departed)));
        }

        let generation = st.generation;
        st.acc = if st.arrived == 0 { x } else { st.acc.max(x) };
        st.arrived += 1;
        if st.arrived == shared.size {
            st.result = st.acc;
            st.arrived = 0;
            st.generation += 1;
            shared.cond.notify_all();
            return Ok(st.result);
        }

        let deadline = self.timeout.map(|t| Instant::now() + t);
        loop {
            // The next generation cannot complete without this rank, so
            // `result` still holds ours.
            if st.generation != generation {
                return Ok(st.result);
            }
            if let Some(reason) = &st.broken {
                return Err(self.fail(reason.clone()));
            }
            if st.departed > 0 {
                return Err(self.fail(format!("{} participant(s) left the group", st.departed)));
            }
            st = match deadline {
                None => shared.cond.wait(st).unwrap_or_else(|e| e.into_inner()),
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        let reason = format!(
                            "timed out waiting for {} of {} ranks",
                            shared.size - st.arrived,
                            shared.size
                        );
                        tracing::warn!(rank = self.rank, "{reason}");
                        st.broken = Some(reason.clone());
                        shared.cond.notify_all();
                        return Err(self.fail(reason));
                    }
                    shared
                        .cond
                        .wait_timeout(st, deadline - now)
                        .unwrap_or_else(|e| e.into_inner())
                        .0
                }
            };
        }
    }
}

impl Drop for RayonComm {
    fn drop(&mut self) {
        let mut st = self.shared.lock();
        st.departed += 1;
        self.shared.cond.notify_all();
    }
}
