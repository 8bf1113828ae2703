//! Collective communication layer for distributed meshes
//!
//! The mesh and assembler only ever talk to the [`Collective`] trait: an
//! all-gather of per-rank counts, pairwise send/receive waves with
//! neighbouring subdomains, a gather of sparse triplets to the solving rank,
//! and a broadcast of the solution increment. [`SerialCollective`] reduces
//! the whole layer to a single rank; [`ThreadCollective`] runs a
//! deterministic in-process group, one rank per thread, which is what the
//! multi-rank tests use. An MPI binding would implement the same trait.

use std::collections::HashMap;
use std::sync::{Arc, Barrier, Condvar, Mutex};

use crate::error::{BlazeError, BlazeResult};
use crate::math::Triplet;

/// Message tags for the pairwise exchanges, mirroring the setup waves.
pub mod tags {
    /// Renumbered node ids for halo copies
    pub const HALO_IDS: u32 = 0;
    /// Global DoF start indices for halo copies
    pub const HALO_NZ_I: u32 = 1;
    /// Triplet gather before factorisation
    pub const GATHER: u32 = 2;
    /// Solution increment broadcast
    pub const BROADCAST: u32 = 3;
}

/// MPI-like collective operations between SPMD ranks.
///
/// All ranks execute the same outer algorithm, so collective calls arrive in
/// the same order on every rank; pairwise calls are matched by `(tag,
/// neighbour)` pairs.
pub trait Collective: Send + Sync {
    fn rank(&self) -> usize;
    fn num_ranks(&self) -> usize;

    /// Gather one integer from every rank, in rank order.
    fn all_gather(&self, value: usize) -> BlazeResult<Vec<usize>>;

    /// Gather one real from every rank, in rank order.
    fn all_gather_f64(&self, value: f64) -> BlazeResult<Vec<f64>>;

    /// Paired send/receive of node ids with a neighbouring rank.
    fn send_recv_ids(
        &self,
        neighbour: usize,
        tag: u32,
        send: &[u32],
        recv_count: usize,
    ) -> BlazeResult<Vec<u32>>;

    /// Paired send/receive of integer payloads with a neighbouring rank.
    fn send_recv_ints(
        &self,
        neighbour: usize,
        tag: u32,
        send: &[i64],
        recv_count: usize,
    ) -> BlazeResult<Vec<i64>>;

    /// Gather triplets on `root`; returns `Some` on the root rank only,
    /// with contributions concatenated in rank order.
    fn gather_triplets(
        &self,
        root: usize,
        local: &[Triplet],
    ) -> BlazeResult<Option<Vec<Triplet>>>;

    /// Broadcast a real vector from `root`; on other ranks the buffer is
    /// replaced by the root's values.
    fn broadcast_values(&self, root: usize, values: &mut Vec<f64>) -> BlazeResult<()>;
}

/// Single-process collective: rank 0 of 1, every operation is local.
#[derive(Debug, Default)]
pub struct SerialCollective;

impl Collective for SerialCollective {
    fn rank(&self) -> usize {
        0
    }

    fn num_ranks(&self) -> usize {
        1
    }

    fn all_gather(&self, value: usize) -> BlazeResult<Vec<usize>> {
        Ok(vec![value])
    }

    fn all_gather_f64(&self, value: f64) -> BlazeResult<Vec<f64>> {
        Ok(vec![value])
    }

    fn send_recv_ids(
        &self,
        neighbour: usize,
        _tag: u32,
        _send: &[u32],
        _recv_count: usize,
    ) -> BlazeResult<Vec<u32>> {
        Err(BlazeError::CollectiveFailure(format!(
            "serial collective has no neighbour rank {neighbour}"
        )))
    }

    fn send_recv_ints(
        &self,
        neighbour: usize,
        _tag: u32,
        _send: &[i64],
        _recv_count: usize,
    ) -> BlazeResult<Vec<i64>> {
        Err(BlazeError::CollectiveFailure(format!(
            "serial collective has no neighbour rank {neighbour}"
        )))
    }

    fn gather_triplets(
        &self,
        _root: usize,
        local: &[Triplet],
    ) -> BlazeResult<Option<Vec<Triplet>>> {
        Ok(Some(local.to_vec()))
    }

    fn broadcast_values(&self, _root: usize, _values: &mut Vec<f64>) -> BlazeResult<()> {
        Ok(())
    }
}

#[derive(Debug, Clone)]
enum Payload {
    Ids(Vec<u32>),
    Ints(Vec<i64>),
    Triplets(Vec<Triplet>),
    Values(Vec<f64>),
}

#[derive(Default)]
struct Mailbox {
    slots: HashMap<(u32, usize, usize), Payload>,
}

struct Shared {
    num_ranks: usize,
    barrier: Barrier,
    int_slots: Mutex<Vec<Option<usize>>>,
    real_slots: Mutex<Vec<Option<f64>>>,
    mailbox: Mutex<Mailbox>,
    mail_cv: Condvar,
}

/// In-process rank group: one `ThreadCollective` per rank, all sharing the
/// same barrier and mailbox. Payload ordering is deterministic because the
/// SPMD algorithm issues collectives in the same order on every rank.
pub struct ThreadCollective {
    rank: usize,
    shared: Arc<Shared>,
}

impl ThreadCollective {
    /// Create a group of `num_ranks` connected collectives, one per rank.
    pub fn group(num_ranks: usize) -> Vec<ThreadCollective> {
        let shared = Arc::new(Shared {
            num_ranks,
            barrier: Barrier::new(num_ranks),
            int_slots: Mutex::new(vec![None; num_ranks]),
            real_slots: Mutex::new(vec![None; num_ranks]),
            mailbox: Mutex::new(Mailbox::default()),
            mail_cv: Condvar::new(),
        });
        (0..num_ranks)
            .map(|rank| ThreadCollective {
                rank,
                shared: Arc::clone(&shared),
            })
            .collect()
    }

    fn deposit(&self, key: (u32, usize, usize), payload: Payload) -> BlazeResult<()> {
        let mut mailbox = self
            .shared
            .mailbox
            .lock()
            .map_err(|_| BlazeError::CollectiveFailure("mailbox poisoned".into()))?;
        // A slot stays occupied until its receiver consumes it, which keeps
        // successive waves with the same tag ordered.
        while mailbox.slots.contains_key(&key) {
            mailbox = self
                .shared
                .mail_cv
                .wait(mailbox)
                .map_err(|_| BlazeError::CollectiveFailure("mailbox poisoned".into()))?;
        }
        mailbox.slots.insert(key, payload);
        self.shared.mail_cv.notify_all();
        Ok(())
    }

    fn take(&self, key: (u32, usize, usize)) -> BlazeResult<Payload> {
        let mut mailbox = self
            .shared
            .mailbox
            .lock()
            .map_err(|_| BlazeError::CollectiveFailure("mailbox poisoned".into()))?;
        loop {
            if let Some(payload) = mailbox.slots.remove(&key) {
                self.shared.mail_cv.notify_all();
                return Ok(payload);
            }
            mailbox = self
                .shared
                .mail_cv
                .wait(mailbox)
                .map_err(|_| BlazeError::CollectiveFailure("mailbox poisoned".into()))?;
        }
    }
}

impl Collective for ThreadCollective {
    fn rank(&self) -> usize {
        self.rank
    }

    fn num_ranks(&self) -> usize {
        self.shared.num_ranks
    }

    fn all_gather(&self, value: usize) -> BlazeResult<Vec<usize>> {
        {
            let mut slots = self
                .shared
                .int_slots
                .lock()
                .map_err(|_| BlazeError::CollectiveFailure("slots poisoned".into()))?;
            slots[self.rank] = Some(value);
        }
        self.shared.barrier.wait();
        let gathered = {
            let mut slots = self
                .shared
                .int_slots
                .lock()
                .map_err(|_| BlazeError::CollectiveFailure("slots poisoned".into()))?;
            let gathered: Vec<usize> = slots
                .iter()
                .map(|s| s.expect("all ranks wrote before the barrier"))
                .collect();
            slots[self.rank] = None;
            gathered
        };
        self.shared.barrier.wait();
        Ok(gathered)
    }

    fn all_gather_f64(&self, value: f64) -> BlazeResult<Vec<f64>> {
        {
            let mut slots = self
                .shared
                .real_slots
                .lock()
                .map_err(|_| BlazeError::CollectiveFailure("slots poisoned".into()))?;
            slots[self.rank] = Some(value);
        }
        self.shared.barrier.wait();
        let gathered = {
            let mut slots = self
                .shared
                .real_slots
                .lock()
                .map_err(|_| BlazeError::CollectiveFailure("slots poisoned".into()))?;
            let gathered: Vec<f64> = slots
                .iter()
                .map(|s| s.expect("all ranks wrote before the barrier"))
                .collect();
            slots[self.rank] = None;
            gathered
        };
        self.shared.barrier.wait();
        Ok(gathered)
    }

    fn send_recv_ids(
        &self,
        neighbour: usize,
        tag: u32,
        send: &[u32],
        recv_count: usize,
    ) -> BlazeResult<Vec<u32>> {
        self.deposit((tag, self.rank, neighbour), Payload::Ids(send.to_vec()))?;
        match self.take((tag, neighbour, self.rank))? {
            Payload::Ids(ids) => {
                if ids.len() != recv_count {
                    return Err(BlazeError::HaloCountMismatch {
                        neighbour,
                        expected: recv_count,
                        got: ids.len(),
                    });
                }
                Ok(ids)
            }
            _ => Err(BlazeError::CollectiveFailure(format!(
                "rank {} received mismatched payload kind from {neighbour}",
                self.rank
            ))),
        }
    }

    fn send_recv_ints(
        &self,
        neighbour: usize,
        tag: u32,
        send: &[i64],
        recv_count: usize,
    ) -> BlazeResult<Vec<i64>> {
        self.deposit((tag, self.rank, neighbour), Payload::Ints(send.to_vec()))?;
        match self.take((tag, neighbour, self.rank))? {
            Payload::Ints(ints) => {
                if ints.len() != recv_count {
                    return Err(BlazeError::HaloCountMismatch {
                        neighbour,
                        expected: recv_count,
                        got: ints.len(),
                    });
                }
                Ok(ints)
            }
            _ => Err(BlazeError::CollectiveFailure(format!(
                "rank {} received mismatched payload kind from {neighbour}",
                self.rank
            ))),
        }
    }

    fn gather_triplets(
        &self,
        root: usize,
        local: &[Triplet],
    ) -> BlazeResult<Option<Vec<Triplet>>> {
        if self.rank == root {
            let mut all = Vec::new();
            for source in 0..self.shared.num_ranks {
                if source == root {
                    all.extend_from_slice(local);
                    continue;
                }
                match self.take((tags::GATHER, source, root))? {
                    Payload::Triplets(triplets) => all.extend(triplets),
                    _ => {
                        return Err(BlazeError::CollectiveFailure(format!(
                            "root received mismatched payload kind from {source}"
                        )))
                    }
                }
            }
            Ok(Some(all))
        } else {
            self.deposit(
                (tags::GATHER, self.rank, root),
                Payload::Triplets(local.to_vec()),
            )?;
            Ok(None)
        }
    }

    fn broadcast_values(&self, root: usize, values: &mut Vec<f64>) -> BlazeResult<()> {
        if self.rank == root {
            for target in 0..self.shared.num_ranks {
                if target == root {
                    continue;
                }
                self.deposit(
                    (tags::BROADCAST, root, target),
                    Payload::Values(values.clone()),
                )?;
            }
            Ok(())
        } else {
            match self.take((tags::BROADCAST, root, self.rank))? {
                Payload::Values(broadcast) => {
                    *values = broadcast;
                    Ok(())
                }
                _ => Err(BlazeError::CollectiveFailure(
                    "broadcast received mismatched payload kind".into(),
                )),
            }
        }
    }
}
