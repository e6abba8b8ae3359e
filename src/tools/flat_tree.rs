//! The flat, relative-offset form of the code tree and its wire encoding.
//!
//! A pre-order flattening stores two signed 16-bit entries per node.  The
//! pair `(0, symbol)` marks a leaf; any other pair holds offsets from the
//! node's own index to its 0-branch and 1-branch.  On the wire each entry is
//! one byte when its unsigned value fits 0–254, otherwise the escape byte
//! `0xFF` followed by the full little endian word.
//!
//! Decoding performs no structural validation, so every entry access during
//! traversal goes through `entry`, which bounds-checks indices derived from
//! stream data instead of indexing blind the way the original did.

use std::io::{Read,Write};
use crate::Error;
use crate::tools::freq_list::HuffTree;
use crate::tools::words::{get_w,put_w};

const ESCAPE: u8 = 0xff;

pub struct FlatTree {
    entries: Vec<i16>
}

impl FlatTree {
    pub fn from_tree(tree: &HuffTree) -> Self {
        let mut entries = Vec::new();
        flatten(tree,tree.root(),&mut entries);
        Self { entries }
    }
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }
    /// bytes the escape-coded entries occupy, the count word not included
    pub fn encoded_size(&self) -> usize {
        self.entries.iter().map(|e| if (*e as u16) < ESCAPE as u16 {1} else {3}).sum()
    }
    /// write the entry count word followed by the escape-coded entries,
    /// returns the encoded entry bytes
    pub fn write_to<W: Write>(&self, snk: &mut W) -> Result<usize,Error> {
        put_w(snk,self.entries.len() as u16)?;
        for &e in &self.entries {
            let u = e as u16;
            if u < ESCAPE as u16 {
                snk.write_all(&[u as u8]).map_err(Error::Write)?;
            } else {
                snk.write_all(&[ESCAPE]).map_err(Error::Write)?;
                put_w(snk,u)?;
            }
        }
        Ok(self.encoded_size())
    }
    /// read the entry count word and that many escape-coded entries
    pub fn read_from<R: Read>(src: &mut R) -> Result<Self,Error> {
        let count = get_w(src)? as usize;
        let mut entries = Vec::with_capacity(count);
        let mut by: [u8;1] = [0];
        for _i in 0..count {
            match src.read_exact(&mut by) {
                Ok(()) => {},
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Err(Error::UnexpectedEndOfStream),
                Err(e) => return Err(Error::Read(e))
            }
            if by[0] == ESCAPE {
                entries.push(get_w(src)? as i16);
            } else {
                entries.push(by[0] as i16);
            }
        }
        Ok(Self { entries })
    }
    /// checked fetch, the index may have been derived from hostile data
    pub fn entry(&self, i: usize) -> Result<i16,Error> {
        self.entries.get(i).copied().ok_or(Error::CorruptTree)
    }
}

fn flatten(tree: &HuffTree, n: usize, entries: &mut Vec<i16>) -> i16 {
    let d = entries.len() as i16;
    entries.push(0);
    entries.push(0);
    match tree.node(n).kids {
        None => {
            entries[d as usize + 1] = tree.node(n).symbol as i16;
        },
        Some([zero,one]) => {
            let z = flatten(tree,zero,entries);
            entries[d as usize] = z - d;
            let o = flatten(tree,one,entries);
            entries[d as usize + 1] = o - d;
        }
    }
    d
}

#[cfg(test)]
fn tree_from(slice: &[u8]) -> FlatTree {
    let mut list = crate::tools::freq_list::FreqList::new();
    list.count(&mut std::io::Cursor::new(slice)).unwrap();
    FlatTree::from_tree(&list.build().expect("build failed"))
}

#[test]
fn flattening_matches_reference() {
    // layout produced by the original pack for AAAABBBCC
    let flat = tree_from(b"AAAABBBCC");
    assert_eq!(flat.entries,vec![2,4,0,b'A' as i16,2,4,0,b'C' as i16,0,b'B' as i16]);
    assert_eq!(flat.encoded_size(),10);
}

#[test]
fn escape_byte_boundary() {
    let flat = FlatTree { entries: vec![254,255,256,-1] };
    let mut buf: Vec<u8> = Vec::new();
    assert_eq!(flat.write_to(&mut buf).unwrap(),1+3+3+3);
    assert_eq!(buf,vec![
        4,0,            // entry count
        254,            // fits a single byte
        0xff,0xff,0x00, // 255 needs the escape form
        0xff,0x00,0x01,
        0xff,0xff,0xff  // negative entries are escaped by unsigned value
    ]);
    let decoded = FlatTree::read_from(&mut std::io::Cursor::new(buf)).unwrap();
    assert_eq!(decoded.entries,flat.entries);
}

#[test]
fn wire_round_trip() {
    let flat = tree_from("I am Sam. Sam I am.\n".as_bytes());
    let mut buf: Vec<u8> = Vec::new();
    flat.write_to(&mut buf).unwrap();
    let decoded = FlatTree::read_from(&mut std::io::Cursor::new(buf)).unwrap();
    assert_eq!(decoded.entries,flat.entries);
}

#[test]
fn out_of_range_entry_is_corrupt() {
    let flat = tree_from(b"AAAABBBCC");
    assert!(flat.entry(9).is_ok());
    assert!(matches!(flat.entry(10),Err(Error::CorruptTree)));
}

#[test]
fn truncated_tree_fails() {
    let buf = vec![10u8,0,2,4];
    assert!(matches!(
        FlatTree::read_from(&mut std::io::Cursor::new(buf)),
        Err(Error::UnexpectedEndOfStream)
    ));
}
