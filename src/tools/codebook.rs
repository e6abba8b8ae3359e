//! Per-symbol codewords derived from a finished Huffman tree.
//!
//! The walk descends the 0-branch before the 1-branch, extending the current
//! bit path as it goes; each leaf records the accumulated path.  Codewords
//! are held in growable bit vectors, so a maximally skewed tree (up to 255
//! bits deep) needs no fixed buffer.

use bit_vec::BitVec;
use crate::tools::freq_list::HuffTree;

pub struct Codebook {
    codes: Vec<Option<BitVec>>
}

impl Codebook {
    pub fn from_tree(tree: &HuffTree) -> Self {
        let mut codes = vec![None;256];
        let mut path = BitVec::new();
        walk(tree,tree.root(),&mut path,&mut codes);
        Self { codes }
    }
    /// codeword for a byte value, `None` if the byte never occurred
    pub fn code(&self, sym: u8) -> Option<&BitVec> {
        self.codes[sym as usize].as_ref()
    }
}

fn walk(tree: &HuffTree, n: usize, path: &mut BitVec, codes: &mut Vec<Option<BitVec>>) {
    let node = tree.node(n);
    match node.kids {
        None => {
            codes[node.symbol as usize] = Some(path.clone());
        },
        Some([zero,one]) => {
            path.push(false);
            walk(tree,zero,path,codes);
            path.pop();
            path.push(true);
            walk(tree,one,path,codes);
            path.pop();
        }
    }
}

#[cfg(test)]
fn book_from(slice: &[u8]) -> Codebook {
    let mut list = crate::tools::freq_list::FreqList::new();
    list.count(&mut std::io::Cursor::new(slice)).unwrap();
    Codebook::from_tree(&list.build().expect("build failed"))
}

#[cfg(test)]
fn code_str(book: &Codebook, sym: u8) -> String {
    book.code(sym).unwrap().iter().map(|b| if b {'1'} else {'0'}).collect()
}

#[test]
fn two_symbols_get_one_bit_each() {
    let book = book_from(b"ababab");
    assert_eq!(book.code(b'a').unwrap().len(),1);
    assert_eq!(book.code(b'b').unwrap().len(),1);
    assert!(book.code(b'c').is_none());
}

#[test]
fn highest_frequency_gets_shortest_code() {
    let book = book_from(b"AAAABBBCC");
    assert_eq!(code_str(&book,b'A'),"0");
    assert_eq!(code_str(&book,b'C'),"10");
    assert_eq!(code_str(&book,b'B'),"11");
}

#[test]
fn codes_are_prefix_free() {
    let book = book_from("I am Sam. Sam I am. I do not like this Sam I am.\n".as_bytes());
    let codes: Vec<String> = (0u16..256)
        .filter_map(|s| book.code(s as u8).map(|_| code_str(&book,s as u8)))
        .collect();
    for a in &codes {
        for b in &codes {
            if a != b {
                assert!(!b.starts_with(a.as_str()),"{} is a prefix of {}",a,b);
            }
        }
    }
}
