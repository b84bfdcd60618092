//! Orders incoming L1 blocks into a tree and tracks the canonical head
//! by accumulated work.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use tracing::*;
use velum_state::prelude::*;
use velum_storage::NodeStorage;

use crate::errors::{Error, Result};

struct BlockNode {
    parent: L1BlockId,
    height: u64,
    /// Accumulated work from the tree root.
    weight: u128,
    timestamp: u64,
}

struct BlockTree {
    nodes: HashMap<L1BlockId, BlockNode>,
    head: Option<L1BlockId>,
}

impl BlockTree {
    /// Path from `id` back to the tree root, newest first.
    fn path_to_root(&self, id: L1BlockId) -> Vec<L1BlockId> {
        let mut path = vec![id];
        let mut cur = id;
        while let Some(node) = self.nodes.get(&cur) {
            if !self.nodes.contains_key(&node.parent) {
                break;
            }
            path.push(node.parent);
            cur = node.parent;
        }
        path
    }
}

/// Validates, stores, and orders incoming L1 blocks.  The host feeds
/// blocks in its canonical order, but out-of-order delivery degrades to
/// `AncestorNotFound` rather than corruption.
pub struct L1BlockProcessor {
    storage: Arc<NodeStorage>,
    tree: Mutex<BlockTree>,
    validate_receipts: bool,
    staleness_bound: Duration,
}

impl L1BlockProcessor {
    pub fn new(
        storage: Arc<NodeStorage>,
        validate_receipts: bool,
        staleness_bound: Duration,
    ) -> Result<Self> {
        let mut nodes = HashMap::new();
        let mut head = None;

        // Re-seed the tree from the persisted canonical tip so ingestion
        // can continue after a restart.  Forks across a restart boundary
        // are beyond the host contract.
        if let Some(tip) = storage.l1().get_canonical_tip_blocking()? {
            if let Some(bundle) = storage.l1().get_block_blocking(&tip)? {
                let header = bundle.header();
                nodes.insert(
                    tip,
                    BlockNode {
                        parent: header.parent,
                        height: header.height,
                        weight: header.difficulty as u128,
                        timestamp: header.timestamp,
                    },
                );
                head = Some(tip);
                info!(%tip, height = header.height, "resumed L1 view from stored tip");
            }
        }

        Ok(Self {
            storage,
            tree: Mutex::new(BlockTree { nodes, head }),
            validate_receipts,
            staleness_bound,
        })
    }

    /// Ingests one block, returning what happened to the canonical view.
    pub fn process(&self, bundle: &L1BlockBundle) -> Result<BlockIngestion> {
        let id = bundle.id();

        if self.validate_receipts && !bundle.check_receipts_root() {
            return Err(Error::ReceiptsMismatch(id));
        }

        let mut tree = self.tree.lock();

        if tree.nodes.contains_key(&id) {
            return Err(Error::AlreadyProcessed(id));
        }

        let header = bundle.header();
        let weight = if tree.nodes.is_empty() {
            // first block ever seen is adopted as the tree root
            header.difficulty as u128
        } else {
            let parent = tree
                .nodes
                .get(&header.parent)
                .ok_or(Error::AncestorNotFound(id))?;
            parent.weight + header.difficulty as u128
        };

        self.storage.l1().put_block_blocking(bundle.clone())?;
        tree.nodes.insert(
            id,
            BlockNode {
                parent: header.parent,
                height: header.height,
                weight,
                timestamp: header.timestamp,
            },
        );

        let old_head = tree.head;
        let old_weight = old_head
            .and_then(|h| tree.nodes.get(&h))
            .map(|n| n.weight)
            .unwrap_or(0);

        if weight <= old_weight {
            // heavier chain keeps the head; the new block is just a leaf
            return Ok(BlockIngestion {
                block: id,
                new_head: false,
                fork: None,
            });
        }

        tree.head = Some(id);
        self.storage.l1().set_canonical_tip_blocking(id)?;

        let fork = match old_head {
            Some(old) if old != header.parent => Self::find_fork(&tree, old, id),
            _ => None,
        };

        if let Some(fork) = &fork {
            warn!(
                block = %id,
                ancestor = %fork.common_ancestor,
                abandoned = fork.abandoned.len(),
                adopted = fork.adopted.len(),
                "L1 fork detected"
            );
        }

        Ok(BlockIngestion {
            block: id,
            new_head: true,
            fork,
        })
    }

    /// Computes the fork descriptor between the abandoned head and the
    /// newly adopted one.
    fn find_fork(tree: &BlockTree, old_head: L1BlockId, new_head: L1BlockId) -> Option<ChainFork> {
        let new_path = tree.path_to_root(new_head);
        let new_index: HashMap<L1BlockId, usize> = new_path
            .iter()
            .enumerate()
            .map(|(i, id)| (*id, i))
            .collect();

        let mut abandoned = Vec::new();
        let mut cur = old_head;
        let common_ancestor = loop {
            if let Some(pos) = new_index.get(&cur) {
                break (*pos, cur);
            }
            abandoned.push(cur);
            cur = tree.nodes.get(&cur)?.parent;
            if !tree.nodes.contains_key(&cur) {
                // disjoint trees, nothing sensible to report
                return None;
            }
        };

        let (ancestor_pos, ancestor) = common_ancestor;
        if abandoned.is_empty() {
            // old head is on the new path, plain chain extension
            return None;
        }

        // walk from ancestor (exclusive) out to the new head, oldest first
        let adopted: Vec<L1BlockId> = new_path[..ancestor_pos].iter().rev().copied().collect();
        abandoned.reverse();

        Some(ChainFork {
            common_ancestor: ancestor,
            abandoned,
            adopted,
        })
    }

    pub fn head_id(&self) -> Option<L1BlockId> {
        self.tree.lock().head
    }

    /// Header of the canonical head block, if one exists.
    pub fn get_head(&self) -> Result<Option<L1BlockHeader>> {
        let Some(head) = self.head_id() else {
            return Ok(None);
        };
        let bundle = self
            .storage
            .l1()
            .get_block_blocking(&head)?
            .ok_or(Error::Db(velum_db::errors::DbError::NotFound))?;
        Ok(Some(bundle.header().clone()))
    }

    /// Whether a block sits on the canonical path.
    pub fn is_canonical(&self, id: &L1BlockId) -> bool {
        let tree = self.tree.lock();
        let Some(head) = tree.head else {
            return false;
        };
        tree.path_to_root(head).contains(id)
    }

    /// Healthy when a head exists and its timestamp is within the
    /// staleness bound.
    pub fn health_check(&self) -> bool {
        let tree = self.tree.lock();
        let Some(head) = tree.head.and_then(|h| tree.nodes.get(&h)) else {
            return false;
        };
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        now.saturating_sub(head.timestamp) <= self.staleness_bound.as_secs()
    }
}
