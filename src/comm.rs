//! Communicators: ordered, fixed groups of ranks with the point-to-point
//! operations the collective engines are written against.

use std::sync::Arc;

use crate::error::{CohortError, Result};
use crate::p2p::{PointToPoint, Request, WireTag};
use crate::types::{CollAttr, Rank, Tag};

/// An ordered, fixed-size group of processes over a shared transport.
///
/// Ranks are communicator-local and translate to transport ranks through
/// the membership table. Each communicator carries a context id that is
/// folded into every wire tag, isolating its traffic from other
/// communicators built over the same transport.
///
/// A communicator may carry a two-level hierarchy: a *local* group of
/// co-located ranks and, on each group's representative, the
/// *representatives* group used for the inter-group phase of hierarchical
/// algorithms. See [`Communicator::with_hierarchy`].
pub struct Communicator<T: PointToPoint> {
    transport: Arc<T>,
    context_id: u32,
    /// Communicator rank -> transport rank.
    ranks: Vec<Rank>,
    my_index: Rank,
    local: Option<Box<Communicator<T>>>,
    leaders: Option<Box<Communicator<T>>>,
}

impl<T: PointToPoint> Communicator<T> {
    /// A flat communicator over transport ranks `0..world_size`.
    pub fn new(transport: Arc<T>, world_size: u32, rank: Rank) -> Self {
        Self {
            transport,
            context_id: 0,
            ranks: (0..world_size).collect(),
            my_index: rank,
            local: None,
            leaders: None,
        }
    }

    /// A flat communicator with hierarchy attached.
    ///
    /// `groups` must partition `0..world_size` into consecutive ascending
    /// ranges (so prefix order composes across groups). Each group's
    /// first member is its representative; the representatives group is
    /// materialized only on representative ranks, and only when there is
    /// more than one group. Groups of one rank get no local
    /// sub-communicator.
    pub fn with_hierarchy(
        transport: Arc<T>,
        world_size: u32,
        rank: Rank,
        groups: &[Vec<Rank>],
    ) -> Result<Self> {
        let mut expected: Rank = 0;
        for group in groups {
            if group.is_empty() {
                return Err(CohortError::InvalidHierarchy("empty local group".into()));
            }
            for &r in group {
                if r != expected {
                    return Err(CohortError::InvalidHierarchy(format!(
                        "groups must partition 0..{world_size} into consecutive \
                         ascending ranges; saw rank {r} where {expected} was expected"
                    )));
                }
                expected += 1;
            }
        }
        if expected != world_size {
            return Err(CohortError::InvalidHierarchy(format!(
                "groups cover {expected} ranks, communicator has {world_size}"
            )));
        }

        let (group_index, position) = groups
            .iter()
            .enumerate()
            .find_map(|(gi, g)| g.iter().position(|&r| r == rank).map(|p| (gi, p)))
            .ok_or(CohortError::InvalidRank {
                rank,
                world_size,
            })?;

        let local = (groups[group_index].len() > 1).then(|| {
            Box::new(Communicator {
                transport: Arc::clone(&transport),
                context_id: 1 + group_index as u32,
                ranks: groups[group_index].clone(),
                my_index: position as Rank,
                local: None,
                leaders: None,
            })
        });

        let leaders = (position == 0 && groups.len() > 1).then(|| {
            Box::new(Communicator {
                transport: Arc::clone(&transport),
                context_id: 1 + groups.len() as u32,
                ranks: groups.iter().map(|g| g[0]).collect(),
                my_index: group_index as Rank,
                local: None,
                leaders: None,
            })
        });

        Ok(Self {
            transport,
            context_id: 0,
            ranks: (0..world_size).collect(),
            my_index: rank,
            local,
            leaders,
        })
    }

    pub fn rank(&self) -> Rank {
        self.my_index
    }

    pub fn size(&self) -> u32 {
        self.ranks.len() as u32
    }

    /// The co-located group, when this communicator is hierarchical and
    /// this rank's group has more than one member.
    pub fn local(&self) -> Option<&Communicator<T>> {
        self.local.as_deref()
    }

    /// The representatives group; present only on representative ranks.
    pub fn leaders(&self) -> Option<&Communicator<T>> {
        self.leaders.as_deref()
    }

    fn wire_tag(&self, tag: Tag) -> WireTag {
        (self.context_id as u64) << 16 | tag as u64
    }

    fn translate(&self, rank: Rank) -> Result<Rank> {
        self.ranks
            .get(rank as usize)
            .copied()
            .ok_or(CohortError::InvalidRank {
                rank,
                world_size: self.size(),
            })
    }

    /// Blocking send of a packed payload to `dest`.
    pub async fn send(&self, dest: Rank, tag: Tag, payload: &[u8], attr: CollAttr) -> Result<()> {
        let dest = self.translate(dest)?;
        self.transport.send(dest, self.wire_tag(tag), payload, attr).await
    }

    /// Blocking receive of the next matching payload from `src`.
    pub async fn recv(&self, src: Rank, tag: Tag) -> Result<Vec<u8>> {
        let src = self.translate(src)?;
        self.transport.recv(src, self.wire_tag(tag)).await
    }

    /// Atomic send + receive: both sides progress concurrently, so two
    /// ranks exchanging with each other cannot deadlock.
    pub async fn send_recv(
        &self,
        dest: Rank,
        payload: &[u8],
        src: Rank,
        tag: Tag,
        attr: CollAttr,
    ) -> Result<Vec<u8>> {
        let dest = self.translate(dest)?;
        let src = self.translate(src)?;
        let wire = self.wire_tag(tag);
        let (_, received) = tokio::try_join!(
            self.transport.send(dest, wire, payload, attr),
            self.transport.recv(src, wire),
        )?;
        Ok(received)
    }

    /// Nonblocking send; completes when the returned request is waited.
    pub fn isend(&self, dest: Rank, tag: Tag, payload: Vec<u8>, attr: CollAttr) -> Result<Request> {
        let dest = self.translate(dest)?;
        let wire = self.wire_tag(tag);
        let transport = Arc::clone(&self.transport);
        Ok(Request::from_handle(tokio::spawn(async move {
            transport.send(dest, wire, &payload, attr).await.map(|()| Vec::new())
        })))
    }

    /// Nonblocking receive; the payload is yielded by the request.
    pub fn irecv(&self, src: Rank, tag: Tag) -> Result<Request> {
        let src = self.translate(src)?;
        let wire = self.wire_tag(tag);
        let transport = Arc::clone(&self.transport);
        Ok(Request::from_handle(tokio::spawn(async move {
            transport.recv(src, wire).await
        })))
    }
}
