//! Frequency counting and Huffman tree construction.
//!
//! Leaves and merge nodes live in an arena and are referenced by index; the
//! frequency-ordered list of the original pack is reproduced as a doubly
//! linked chain of arena indices bounded by two sentinels.  The build keeps
//! the traversal invariant of the original: frequencies are non-decreasing
//! from the low sentinel to the high sentinel, and a repositioned node always
//! lands ahead of nodes of equal frequency (the scan stops only on a
//! frequency that is not strictly lower).  That stable tie-break is what
//! makes the output byte-for-byte deterministic.

use std::io::Read;
use crate::Error;

/// low sentinel, insertion anchor only, its frequency is never compared
const LO: usize = 0;
/// high sentinel, its frequency backstops every forward scan
const HI: usize = 1;

pub struct Node {
    pub freq: u64,
    /// arena indices of the 0-branch and 1-branch, `None` marks a leaf
    pub kids: Option<[usize;2]>,
    /// byte value, meaningful for leaves only
    pub symbol: u8,
    /// list links, used only while the node is live in the sorted chain
    prev: usize,
    next: usize
}

/// The sentinel-bounded ascending frequency list, populated by `count`
/// and consumed by `build`.
pub struct FreqList {
    arena: Vec<Node>,
    /// map from byte value to leaf index
    leaves: [Option<usize>;256],
    used: usize
}

impl FreqList {
    pub fn new() -> Self {
        let lo = Node { freq: 0, kids: None, symbol: 0, prev: LO, next: HI };
        let hi = Node { freq: u64::MAX, kids: None, symbol: 0, prev: LO, next: HI };
        Self {
            arena: vec![lo,hi],
            leaves: [None;256],
            used: 0
        }
    }
    /// Consume the whole input, tallying every byte.  Returns the input
    /// length, which is also the root frequency of the finished tree.
    pub fn count<R: Read>(&mut self, src: &mut R) -> Result<u64,Error> {
        let mut total: u64 = 0;
        let mut buf = [0u8;4096];
        loop {
            let n = src.read(&mut buf).map_err(Error::Read)?;
            if n == 0 {
                break;
            }
            for &c in &buf[..n] {
                self.tally(c);
            }
            total += n as u64;
        }
        log::debug!("counted {} bytes, {} distinct values",total,self.used);
        Ok(total)
    }
    /// number of distinct byte values seen so far
    pub fn used(&self) -> usize {
        self.used
    }
    /// Snapshot of `(symbol,frequency)` in ascending list order.  Only
    /// meaningful before `build` consumes the list.
    pub fn order(&self) -> Vec<(u8,u64)> {
        let mut ans = Vec::with_capacity(self.used);
        let mut n = self.arena[LO].next;
        while n != HI {
            ans.push((self.arena[n].symbol,self.arena[n].freq));
            n = self.arena[n].next;
        }
        ans
    }
    /// insert node `n` immediately before node `at`
    fn link_before(&mut self, n: usize, at: usize) {
        let prev = self.arena[at].prev;
        self.arena[n].prev = prev;
        self.arena[n].next = at;
        self.arena[prev].next = n;
        self.arena[at].prev = n;
    }
    fn unlink(&mut self, n: usize) {
        let prev = self.arena[n].prev;
        let next = self.arena[n].next;
        self.arena[prev].next = next;
        self.arena[next].prev = prev;
    }
    /// Count one occurrence of `sym`.  A first occurrence links a fresh leaf
    /// right after the low sentinel; otherwise the leaf's frequency is bumped
    /// and the leaf relinked forward if the order was disturbed.
    fn tally(&mut self, sym: u8) {
        match self.leaves[sym as usize] {
            None => {
                let n = self.arena.len();
                self.arena.push(Node { freq: 1, kids: None, symbol: sym, prev: LO, next: HI });
                self.link_before(n,self.arena[LO].next);
                self.leaves[sym as usize] = Some(n);
                self.used += 1;
            },
            Some(p) => {
                self.arena[p].freq += 1;
                let f = self.arena[p].freq;
                if f > self.arena[self.arena[p].next].freq {
                    // scan past the old successor while strictly lower
                    let mut q = self.arena[p].next;
                    loop {
                        q = self.arena[q].next;
                        if self.arena[q].freq >= f {
                            break;
                        }
                    }
                    self.unlink(p);
                    self.link_before(p,q);
                }
            }
        }
    }
    /// Repeatedly merge the two lowest-frequency nodes until one remains.
    /// The merged node's 0-branch is the first of the pair, its 1-branch the
    /// second, and it is re-inserted by scanning forward from the slot the
    /// pair vacated, never from the head.  Consumed nodes keep stale links;
    /// the walk never revisits them.
    pub fn build(mut self) -> Result<HuffTree,Error> {
        if self.used < 2 {
            return Err(Error::TrivialFile);
        }
        let mut p = self.arena[LO].next;
        loop {
            let q = self.arena[p].next;
            if q == HI {
                break;
            }
            let f = self.arena[p].freq + self.arena[q].freq;
            let r = self.arena.len();
            self.arena.push(Node { freq: f, kids: Some([p,q]), symbol: 0, prev: LO, next: HI });
            let mut at = self.arena[q].next;
            while f > self.arena[at].freq {
                at = self.arena[at].next;
            }
            self.link_before(r,at);
            p = self.arena[q].next;
        }
        Ok(HuffTree { arena: self.arena, root: p })
    }
}

/// A finished Huffman tree.  The arena owns every node; the tree is a strict
/// binary tree rooted at `root` and is dropped with the operation that built
/// it.
pub struct HuffTree {
    arena: Vec<Node>,
    root: usize
}

impl HuffTree {
    pub fn root(&self) -> usize {
        self.root
    }
    pub fn node(&self, n: usize) -> &Node {
        &self.arena[n]
    }
    /// root frequency, equal to the input length
    pub fn size(&self) -> u64 {
        self.arena[self.root].freq
    }
}

#[cfg(test)]
fn list_from(slice: &[u8]) -> FreqList {
    let mut list = FreqList::new();
    list.count(&mut std::io::Cursor::new(slice)).unwrap();
    list
}

#[test]
fn counting_is_stable() {
    // A=4 B=3 C=2, ascending order with the tie-break of the original
    let list = list_from("AAAABBBCC".as_bytes());
    assert_eq!(list.used(),3);
    assert_eq!(list.order(),vec![(b'C',2),(b'B',3),(b'A',4)]);
}

#[test]
fn fresh_leaf_becomes_provisional_minimum() {
    // D arrives last and must sit at the head of the list
    let list = list_from("AABBCCD".as_bytes());
    assert_eq!(list.order()[0],(b'D',1));
}

#[test]
fn trivial_input_rejected() {
    assert!(matches!(list_from(b"").build(),Err(Error::TrivialFile)));
    assert!(matches!(list_from(b"xxxxxx").build(),Err(Error::TrivialFile)));
}

#[test]
fn merge_order_drives_tree_shape() {
    let tree = list_from("AAAABBBCC".as_bytes()).build().expect("build failed");
    assert_eq!(tree.size(),9);
    // C and B merge first, A pairs with their parent; A hangs off the
    // 0-branch of the root
    let root = tree.node(tree.root());
    let [zero,one] = root.kids.expect("root must be internal");
    assert_eq!(tree.node(zero).symbol,b'A');
    assert_eq!(tree.node(zero).freq,4);
    assert_eq!(tree.node(one).freq,5);
}

#[test]
fn root_frequency_is_input_length() {
    let tree = list_from("the quick brown fox".as_bytes()).build().expect("build failed");
    assert_eq!(tree.size(),19);
}
