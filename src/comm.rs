//! Thin façade over intra-process (test) or inter-process (MPI) message
//! passing.
//!
//! Messages are *contiguous byte slices*; the halo engine casts its scalar
//! buffers through [`bytemuck`] on the way in and out. All handles are
//! **waitable** but non-blocking -- the engine calls `.wait()` before it
//! trusts that a buffer is ready.

use std::collections::VecDeque;
use std::sync::Arc;
use std::thread::JoinHandle;

use bytes::Bytes;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use parking_lot::Mutex;

use crate::topology::NUM_DIRECTIONS;

/// Typed tag namespace for one exchange.
///
/// Each engine reserves a contiguous block of tags, one per direction, so
/// that traffic from two directions targeting the same peer (e.g. a
/// two-rank periodic axis, where the low and high neighbor coincide) can
/// never be cross-matched.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CommTag(pub u16);

impl CommTag {
    /// Highest admissible base: a full 26-direction block must fit
    /// without wrapping `u16`.
    pub const MAX_BASE: u16 = u16::MAX - NUM_DIRECTIONS as u16;

    /// Panics if `base > MAX_BASE`; a wrapped tag would silently
    /// cross-match another block's traffic.
    pub const fn new(base: u16) -> Self {
        assert!(base <= Self::MAX_BASE, "tag base leaves no room for a direction block");
        Self(base)
    }
    pub fn base(self) -> u16 {
        self.0
    }
    /// Tag for the `i`-th direction within this namespace.
    pub fn offset(self, i: usize) -> u16 {
        debug_assert!(i < NUM_DIRECTIONS);
        self.0 + i as u16
    }
}

/// Non-blocking communication interface (minimal by design).
pub trait Communicator: Send + Sync + 'static {
    /// Handle returned by `isend`.
    type SendHandle: Wait;
    /// Handle returned by `irecv`.
    type RecvHandle: Wait;

    fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> Self::SendHandle;
    fn irecv(&self, peer: usize, tag: u16, buf: &mut [u8]) -> Self::RecvHandle;

    /// This process's rank within the communicator.
    fn rank(&self) -> usize;
}

/// Anything that can be waited on.
///
/// `wait` returns `Some(bytes)` when the backend delivers data out of
/// band (the mailbox backend); backends that write directly into the
/// buffer passed to `irecv` (MPI) return `None` and the caller uses the
/// buffer in place.
pub trait Wait {
    fn wait(self) -> Option<Vec<u8>>;
}

impl Wait for () {
    fn wait(self) -> Option<Vec<u8>> {
        None
    }
}

/// Compile-time no-op comm for topologies without neighbors (serial runs
/// on a non-periodic 1x1x1 grid) and pure serial unit tests.
#[derive(Clone, Debug, Default)]
pub struct NoComm;

impl Communicator for NoComm {
    type SendHandle = ();
    type RecvHandle = ();

    fn isend(&self, _peer: usize, _tag: u16, _buf: &[u8]) {}
    fn irecv(&self, _peer: usize, _tag: u16, _buf: &mut [u8]) {}
    fn rank(&self) -> usize {
        0
    }
}

// --- ThreadComm: intra-process, one "rank" per value ---

type Key = (usize, usize, u16); // (src, dst, tag)
type Queue = Arc<Mutex<VecDeque<Bytes>>>;

/// Process-global mailbox shared by every [`ThreadComm`] in the binary.
/// Tests that use it concurrently must serialize (see `serial_test`).
static MAILBOX: Lazy<DashMap<Key, Queue>> = Lazy::new(DashMap::new);

fn queue(key: Key) -> Queue {
    MAILBOX.entry(key).or_default().clone()
}

/// Drops every queued message. Call between tests sharing the mailbox.
pub fn drain_mailbox() {
    MAILBOX.clear();
}

pub struct LocalHandle {
    slot: Arc<Mutex<Option<Vec<u8>>>>,
    handle: Option<JoinHandle<()>>,
}

impl Wait for LocalHandle {
    fn wait(mut self) -> Option<Vec<u8>> {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        self.slot.lock().take()
    }
}

/// In-process communicator: each value plays one rank, messages travel
/// through a global FIFO mailbox keyed by `(src, dst, tag)`.
///
/// Exists so the exchange protocol can be exercised -- including
/// self-sends on periodic single-rank axes -- without an MPI launcher.
#[derive(Clone, Debug)]
pub struct ThreadComm {
    rank: usize,
}

impl ThreadComm {
    pub fn new(rank: usize) -> Self {
        Self { rank }
    }
}

impl Communicator for ThreadComm {
    type SendHandle = ();
    type RecvHandle = LocalHandle;

    fn isend(&self, peer: usize, tag: u16, buf: &[u8]) {
        queue((self.rank, peer, tag))
            .lock()
            .push_back(Bytes::copy_from_slice(buf));
    }

    fn irecv(&self, peer: usize, tag: u16, buf: &mut [u8]) -> LocalHandle {
        let q = queue((peer, self.rank, tag));
        let slot = Arc::new(Mutex::new(None));
        let slot_clone = slot.clone();
        let want = buf.len();
        let handle = std::thread::spawn(move || {
            loop {
                if let Some(bytes) = q.lock().pop_front() {
                    let n = want.min(bytes.len());
                    *slot_clone.lock() = Some(bytes[..n].to_vec());
                    break;
                }
                std::thread::yield_now();
            }
        });
        LocalHandle {
            slot,
            handle: Some(handle),
        }
    }

    fn rank(&self) -> usize {
        self.rank
    }
}

// --- MPI backend (feature = "mpi-support") ---

#[cfg(feature = "mpi-support")]
mod mpi_backend {
    use super::*;
    use mpi::request::{Request, StaticScope};
    use mpi::topology::SimpleCommunicator;
    use mpi::traits::*;

    /// MPI-backed communicator over a private duplicate of the given
    /// communicator, so engine traffic never matches unrelated traffic
    /// on the parent context.
    pub struct MpiComm {
        comm: SimpleCommunicator,
        rank: usize,
    }

    impl MpiComm {
        pub fn new(parent: &SimpleCommunicator) -> Self {
            let comm = parent.duplicate();
            let rank = comm.rank() as usize;
            Self { comm, rank }
        }
    }

    pub struct MpiHandle(Request<'static, [u8], StaticScope>);

    impl Wait for MpiHandle {
        fn wait(self) -> Option<Vec<u8>> {
            // Data (if any) lands in the buffer given to irecv.
            let _ = self.0.wait();
            None
        }
    }

    impl Communicator for MpiComm {
        type SendHandle = MpiHandle;
        type RecvHandle = MpiHandle;

        fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> MpiHandle {
            // SAFETY: the engine keeps its buffers alive and untouched
            // until the matching wait in `recv`.
            let buf: &'static [u8] = unsafe { std::mem::transmute(buf) };
            let req = self
                .comm
                .process_at_rank(peer as i32)
                .immediate_send_with_tag(StaticScope, buf, tag as i32);
            MpiHandle(req)
        }

        fn irecv(&self, peer: usize, tag: u16, buf: &mut [u8]) -> MpiHandle {
            // SAFETY: as above; the buffer outlives the request.
            let buf: &'static mut [u8] = unsafe { std::mem::transmute(buf) };
            let req = self
                .comm
                .process_at_rank(peer as i32)
                .immediate_receive_into_with_tag(StaticScope, buf, tag as i32);
            MpiHandle(req)
        }

        fn rank(&self) -> usize {
            self.rank
        }
    }
}

#[cfg(feature = "mpi-support")]
pub use mpi_backend::MpiComm;

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn mailbox_round_trip() {
        drain_mailbox();
        let c0 = ThreadComm::new(0);
        let c1 = ThreadComm::new(1);

        let mut recv_buf = [0u8; 4];
        let h = c1.irecv(0, 7, &mut recv_buf);
        c0.isend(1, 7, &[1, 2, 3, 4]);

        let data = h.wait().expect("expected data from rank 0");
        recv_buf.copy_from_slice(&data);
        assert_eq!(&recv_buf, &[1, 2, 3, 4]);
    }

    #[test]
    #[serial]
    fn mailbox_fifo_order() {
        drain_mailbox();
        let c0 = ThreadComm::new(0);
        let c1 = ThreadComm::new(1);

        for i in 0..10u8 {
            c0.isend(1, 9, &[i]);
        }
        let mut out = Vec::new();
        for _ in 0..10 {
            let mut b = [0u8; 1];
            let h = c1.irecv(0, 9, &mut b);
            out.push(h.wait().unwrap()[0]);
        }
        assert_eq!(out, (0u8..10).collect::<Vec<_>>());
    }

    #[test]
    #[serial]
    fn self_send_matches() {
        drain_mailbox();
        let c = ThreadComm::new(3);
        c.isend(3, 11, b"ping");
        let mut b = [0u8; 4];
        let h = c.irecv(3, 11, &mut b);
        assert_eq!(h.wait().unwrap(), b"ping");
    }

    #[test]
    fn tags_offset_from_base() {
        let tag = CommTag::new(0x40);
        assert_eq!(tag.base(), 0x40);
        assert_eq!(tag.offset(25), 0x40 + 25);
        // The last admissible base still fits a whole block.
        assert_eq!(CommTag::new(CommTag::MAX_BASE).offset(25), u16::MAX - 1);
    }

    #[test]
    #[should_panic(expected = "tag base")]
    fn oversized_tag_base_rejected() {
        let _ = CommTag::new(CommTag::MAX_BASE + 1);
    }
}
