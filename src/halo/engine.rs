//! The halo-exchange engine: pack -> non-blocking exchange -> wait -> unpack.

use bytemuck::Pod;

use crate::comm::{CommTag, Communicator, Wait};
use crate::error::HaloError;
use crate::halo::boxes::{self, HaloShape};
use crate::topology::{Direction, NUM_DIRECTIONS, NeighborTable};

/// Index lists and transfer buffers for one of the 26 directions.
struct DirectionLink<T> {
    dir: Direction,
    peer: Option<usize>,
    send_list: Vec<usize>,
    recv_list: Vec<usize>,
    send_buf: Vec<T>,
    recv_buf: Vec<T>,
}

impl<T: Pod> DirectionLink<T> {
    fn build(shape: &HaloShape, neighbors: &NeighborTable, dir: Direction) -> Self {
        let send_list = boxes::send_box(shape, dir);
        let recv_list = boxes::recv_box(shape, dir);
        let send_buf = vec![T::zeroed(); send_list.len()];
        let recv_buf = vec![T::zeroed(); recv_list.len()];
        Self {
            dir,
            peer: neighbors.rank(dir),
            send_list,
            recv_list,
            send_buf,
            recv_buf,
        }
    }

    /// Gather: `buf[n] = field[send_list[n]]`, in list order.
    fn gather(&mut self, field: &[T]) {
        for (slot, &pos) in self.send_buf.iter_mut().zip(&self.send_list) {
            *slot = field[pos];
        }
    }

    /// Scatter: `field[recv_list[n]] = buf[n]`, in list order.
    fn scatter(&self, field: &mut [T]) {
        for (&pos, &value) in self.recv_list.iter().zip(&self.recv_buf) {
            field[pos] = value;
        }
    }
}

/// Handles for the operations of one outstanding exchange.
///
/// Holding this *is* the exchange lock: `send` refuses to start while it
/// exists, and only `recv` consumes it, so an unmatched lock state cannot
/// exist apart from the pending operations themselves.
struct InFlight<C: Communicator> {
    sends: Vec<C::SendHandle>,
    recvs: Vec<(usize, usize, C::RecvHandle)>, // (direction index, peer, handle)
}

/// Asynchronous 26-direction halo exchange for one scalar field.
///
/// Owns the 26 pairs of index lists and transfer buffers, built once at
/// construction and reused every step. The per-step protocol is
/// [`send`](Self::send) (pack + post all transfers), compute on work that
/// needs no ghost data, then [`recv`](Self::recv) (wait + unpack).
///
/// One engine supports exactly one outstanding exchange; independent
/// fields use independent engines (or a controller that serializes
/// send/recv pairs per field).
pub struct HaloExchange<T, C: Communicator> {
    shape: HaloShape,
    neighbors: NeighborTable,
    comm: C,
    tag: CommTag,
    links: Vec<DirectionLink<T>>,
    in_flight: Option<InFlight<C>>,
}

impl<T, C> HaloExchange<T, C>
where
    T: Pod + Send + Sync,
    C: Communicator,
{
    /// Builds all 52 index lists and buffers for the given subdomain.
    ///
    /// `tag` reserves 26 consecutive tags on `comm`; two engines sharing a
    /// communicator must use disjoint tag blocks.
    pub fn new(shape: HaloShape, neighbors: NeighborTable, comm: C, tag: CommTag) -> Self {
        let links: Vec<_> = Direction::ALL
            .iter()
            .map(|&dir| DirectionLink::build(&shape, &neighbors, dir))
            .collect();
        let boundary: usize = links.iter().map(|l| l.send_list.len()).sum();
        log::debug!(
            "rank {}: halo exchange over {:?} cells (width {}), {} boundary cells",
            neighbors.self_rank(),
            shape.padded(),
            shape.width(),
            boundary
        );
        Self {
            shape,
            neighbors,
            comm,
            tag,
            links,
            in_flight: None,
        }
    }

    /// Packs all send buffers from `field` and posts one non-blocking send
    /// and one matching non-blocking receive per resolved direction.
    ///
    /// `field` must not be mutated until the matching [`recv`](Self::recv)
    /// returns. A second `send` without an intervening `recv` is a usage
    /// error and fails before touching any buffer.
    pub fn send(&mut self, field: &[T]) -> Result<(), HaloError> {
        if self.in_flight.is_some() {
            return Err(HaloError::ExchangeInProgress);
        }
        self.check_field(field.len())?;

        pack(&mut self.links, field);

        let comm = &self.comm;
        let tag = self.tag;
        let mut sends = Vec::with_capacity(NUM_DIRECTIONS);
        let mut recvs = Vec::with_capacity(NUM_DIRECTIONS);
        for (di, link) in self.links.iter_mut().enumerate() {
            let Some(peer) = link.peer else { continue };
            // The receive posted here targets the buffer this direction's
            // unpack will read; the peer fills it from its mirrored send
            // list, so positions never travel on the wire.
            sends.push(comm.isend(
                peer,
                tag.offset(link.dir.index()),
                bytemuck::cast_slice(&link.send_buf),
            ));
            recvs.push((
                di,
                peer,
                comm.irecv(
                    peer,
                    tag.offset(link.dir.opposite().index()),
                    bytemuck::cast_slice_mut(&mut link.recv_buf),
                ),
            ));
        }
        log::trace!(
            "rank {}: posted {} sends / {} receives",
            self.neighbors.self_rank(),
            sends.len(),
            recvs.len()
        );
        self.in_flight = Some(InFlight { sends, recvs });
        Ok(())
    }

    /// Waits for every outstanding transfer, then scatters the receive
    /// buffers into the ghost region of `field` and clears the lock.
    ///
    /// Blocks until all peers have delivered; there is no partial
    /// completion and no timeout. Ghost layers of directions without a
    /// neighbor are left untouched.
    pub fn recv(&mut self, field: &mut [T]) -> Result<(), HaloError> {
        self.check_field(field.len())?;
        let InFlight { sends, recvs } = self
            .in_flight
            .take()
            .ok_or(HaloError::NoExchangeInProgress)?;

        for send in sends {
            let _ = send.wait();
        }

        // Drain every receive before reporting an error, so no handle is
        // left dangling on the failure path.
        let mut maybe_err = None;
        for (di, peer, handle) in recvs {
            let link = &mut self.links[di];
            let expected = std::mem::size_of_val(link.recv_buf.as_slice());
            match handle.wait() {
                Some(data) if data.len() == expected => {
                    bytemuck::cast_slice_mut(&mut link.recv_buf).copy_from_slice(&data);
                }
                Some(data) if maybe_err.is_none() => {
                    maybe_err = Some(HaloError::Comm {
                        peer,
                        reason: format!(
                            "direction {:?}: expected {expected} bytes, got {}",
                            link.dir,
                            data.len()
                        )
                        .into(),
                    });
                }
                // In-place backends (MPI) have already filled the buffer.
                _ => {}
            }
        }
        if let Some(err) = maybe_err {
            return Err(err);
        }

        for link in &self.links {
            if link.peer.is_some() {
                link.scatter(field);
            }
        }
        log::trace!("rank {}: exchange complete", self.neighbors.self_rank());
        Ok(())
    }

    fn check_field(&self, len: usize) -> Result<(), HaloError> {
        let expected = self.shape.padded_len();
        if len != expected {
            return Err(HaloError::FieldSizeMismatch { expected, got: len });
        }
        Ok(())
    }

    /// True while a send is outstanding and unmatched.
    pub fn is_exchanging(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn shape(&self) -> &HaloShape {
        &self.shape
    }

    pub fn neighbors(&self) -> &NeighborTable {
        &self.neighbors
    }

    /// Number of cells packed when sending toward `dir`.
    pub fn send_count(&self, dir: Direction) -> usize {
        self.links[dir.index()].send_list.len()
    }

    /// Number of ghost cells filled by data arriving from `dir`.
    pub fn recv_count(&self, dir: Direction) -> usize {
        self.links[dir.index()].recv_list.len()
    }

    /// Ghost-cell indices written by data arriving from `dir`; exposed so
    /// tests and kernels can address one ghost layer directly.
    pub fn recv_indices(&self, dir: Direction) -> &[usize] {
        &self.links[dir.index()].recv_list
    }

    /// Boundary-cell indices packed when sending toward `dir`.
    pub fn send_indices(&self, dir: Direction) -> &[usize] {
        &self.links[dir.index()].send_list
    }
}

#[cfg(feature = "rayon-pack")]
fn pack<T: Pod + Send + Sync>(links: &mut [DirectionLink<T>], field: &[T]) {
    use rayon::prelude::*;
    links.par_iter_mut().for_each(|link| link.gather(field));
}

#[cfg(not(feature = "rayon-pack"))]
fn pack<T: Pod + Send + Sync>(links: &mut [DirectionLink<T>], field: &[T]) {
    for link in links.iter_mut() {
        link.gather(field);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::NoComm;
    use crate::topology::{Periodicity, ProcessGrid};

    fn lone_engine() -> HaloExchange<f64, NoComm> {
        let shape = HaloShape::new([3, 3, 3], 1).unwrap();
        let grid = ProcessGrid::new([1, 1, 1], [0, 0, 0]).unwrap();
        let neighbors = NeighborTable::build(&grid, Periodicity::NONE);
        HaloExchange::new(shape, neighbors, NoComm, CommTag::new(0))
    }

    #[test]
    fn double_send_is_a_usage_error() {
        let mut engine = lone_engine();
        let field = vec![0.0; engine.shape().padded_len()];
        engine.send(&field).unwrap();
        assert_eq!(engine.send(&field), Err(HaloError::ExchangeInProgress));
        assert!(engine.is_exchanging());
    }

    #[test]
    fn recv_without_send_is_a_usage_error() {
        let mut engine = lone_engine();
        let mut field = vec![0.0; engine.shape().padded_len()];
        assert_eq!(engine.recv(&mut field), Err(HaloError::NoExchangeInProgress));
    }

    #[test]
    fn field_size_checked_before_lock() {
        let mut engine = lone_engine();
        let short = vec![0.0; 7];
        assert!(matches!(
            engine.send(&short),
            Err(HaloError::FieldSizeMismatch { .. })
        ));
        assert!(!engine.is_exchanging());
    }

    #[test]
    fn lock_clears_after_matched_pair() {
        let mut engine = lone_engine();
        let mut field = vec![1.0; engine.shape().padded_len()];
        engine.send(&field).unwrap();
        engine.recv(&mut field).unwrap();
        assert!(!engine.is_exchanging());
        // A lone non-periodic rank has no neighbors: nothing was written.
        assert!(field.iter().all(|&v| v == 1.0));
        engine.send(&field).unwrap();
    }
}
