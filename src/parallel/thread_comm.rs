//! In-process communicator: each rank is a thread, collectives meet on a
//! shared board guarded by a barrier.
//!
//! Used to run a decomposed mesh inside one test binary. Reductions combine
//! contributions in rank order, so results are deterministic.

use std::sync::{Arc, Barrier, Mutex, MutexGuard};

use super::Comm;

struct Board {
    barrier: Barrier,
    scalars: Mutex<Vec<f64>>,
    arrays: Mutex<Vec<Vec<f64>>>,
    indices: Mutex<Vec<Vec<usize>>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panicking rank already fails the test; keep the others going.
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Clone)]
pub struct ThreadComm {
    rank: usize,
    size: usize,
    board: Arc<Board>,
}

impl ThreadComm {
    /// One handle per rank; move each into its own thread.
    pub fn universe(size: usize) -> Vec<ThreadComm> {
        let size = size.max(1);
        let board = Arc::new(Board {
            barrier: Barrier::new(size),
            scalars: Mutex::new(vec![0.0; size]),
            arrays: Mutex::new(vec![Vec::new(); size]),
            indices: Mutex::new(vec![Vec::new(); size]),
        });
        (0..size)
            .map(|rank| ThreadComm { rank, size, board: Arc::clone(&board) })
            .collect()
    }

    /// Every rank's `local`, indexed by rank. Lengths may differ.
    pub fn all_gather_f64(&self, local: &[f64]) -> Vec<Vec<f64>> {
        lock(&self.board.arrays)[self.rank] = local.to_vec();
        self.board.barrier.wait();
        let all = lock(&self.board.arrays).clone();
        self.board.barrier.wait();
        all
    }
}

impl Comm for ThreadComm {
    fn rank(&self) -> usize {
        self.rank
    }
    fn size(&self) -> usize {
        self.size
    }
    fn barrier(&self) {
        self.board.barrier.wait();
    }
    fn all_reduce(&self, x: f64) -> f64 {
        lock(&self.board.scalars)[self.rank] = x;
        self.board.barrier.wait();
        let sum = lock(&self.board.scalars).iter().sum();
        self.board.barrier.wait();
        sum
    }
    fn all_gather_usize(&self, local: &[usize]) -> Vec<usize> {
        lock(&self.board.indices)[self.rank] = local.to_vec();
        self.board.barrier.wait();
        let all = lock(&self.board.indices).concat();
        self.board.barrier.wait();
        all
    }
}
