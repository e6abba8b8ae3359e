//! Huffman compression in the old Unix `pack` format
//!
//! This produces bit-for-bit the same streams as the original `pack`
//! compressor by Steve Zucker (the "old" algorithm, not the later Szymanski
//! variant), and expands them the way `unpack`/`pcat` did.
//!
//! Wire format, all words 16-bit little endian:
//! * magic `0x1F1F`
//! * uncompressed size as two words, high then low
//!   (a high word above `0x4000` marks the PDP-11 float size encoding,
//!   which is detected and rejected)
//! * tree entry count
//! * escape-coded tree entries
//! * codeword bits packed MSB-first into words
//!
//! Unlike the original, expansion bounds-checks every tree index taken from
//! the stream, so corrupt input fails with an error instead of running off
//! the end of the tree.

use std::io::{Cursor,Read,Write,Seek,SeekFrom,BufReader,BufWriter};
use crate::Error;
use crate::tools::freq_list::FreqList;
use crate::tools::codebook::Codebook;
use crate::tools::flat_tree::FlatTree;
use crate::tools::words::{get_w,put_w,WordReader,WordWriter};

/// 16-bit signature of a packed stream, `<US><US>`
pub const MAGIC: u16 = 0x1f1f;
/// a size high word beyond this marks the PDP-11 float encoding
const MAX_SIZE_HI: u16 = 0x4000;
/// largest input length whose size field a compliant reader will accept
const MAX_SIZE: u64 = (MAX_SIZE_HI as u64) << 16 | 0xffff;

/// Everything the counting pass learns about an input: frequencies, the
/// finished code tree in flat form, and the codebook.  Built once per
/// compression and dropped with it.
pub struct Model {
    /// input length in bytes
    pub size: u64,
    /// number of distinct byte values
    pub used: usize,
    /// `(symbol,frequency)` in ascending frequency order
    order: Vec<(u8,u64)>,
    codes: Codebook,
    flat: FlatTree,
    tree_bytes: usize
}

impl Model {
    /// First pass: count frequencies and derive tree, flat tree and
    /// codebook.  Fails with `TrivialFile` on fewer than 2 distinct values.
    pub fn analyze<R: Read>(src: &mut R) -> Result<Self,Error> {
        let mut list = FreqList::new();
        let size = list.count(src)?;
        if size > MAX_SIZE {
            return Err(Error::FileTooLarge);
        }
        let used = list.used();
        let order = list.order();
        let tree = list.build()?;
        let codes = Codebook::from_tree(&tree);
        let flat = FlatTree::from_tree(&tree);
        let tree_bytes = flat.encoded_size();
        log::debug!("{} tree entries in {} bytes",flat.entry_count(),tree_bytes);
        Ok(Self { size, used, order, codes, flat, tree_bytes })
    }
    /// predicted packed stream size in bytes: payload, tree, and the 8
    /// header bytes (magic, size, entry count)
    pub fn packed_size(&self) -> u64 {
        let bits: u64 = self.order.iter()
            .map(|(s,f)| f * self.codes.code(*s).map(|c| c.len()).unwrap_or(0) as u64)
            .sum();
        (bits + 7) / 8 + self.tree_bytes as u64 + 8
    }
    /// true when packing saves at least one 512-byte disk block
    pub fn saves_blocks(&self) -> bool {
        (self.packed_size() + 511) / 512 < (self.size + 511) / 512
    }
    /// `(symbol,frequency,codeword)` rows for reporting, most frequent first
    pub fn stats(&self) -> Vec<(u8,u64,String)> {
        self.order.iter().rev().map(|(s,f)| {
            let code = match self.codes.code(*s) {
                Some(c) => c.iter().map(|b| if b {'1'} else {'0'}).collect(),
                None => String::new()
            };
            (*s,*f,code)
        }).collect()
    }
    /// Second pass: emit the full pack stream from a source rewound to the
    /// start.  Returns the bytes written.
    pub fn write_stream<R: Read, W: Write>(&self, src: &mut R, snk: &mut W) -> Result<u64,Error> {
        put_w(snk,MAGIC)?;
        put_w(snk,(self.size >> 16) as u16)?;
        put_w(snk,self.size as u16)?;
        let tree_bytes = self.flat.write_to(snk)? as u64;
        let mut writer = WordWriter::new(snk);
        let mut buf = [0u8;4096];
        loop {
            let n = src.read(&mut buf).map_err(Error::Read)?;
            if n == 0 {
                break;
            }
            for &c in &buf[..n] {
                let code = self.codes.code(c).ok_or_else(|| Error::Read(
                    std::io::Error::new(std::io::ErrorKind::InvalidData,"input changed between passes")
                ))?;
                writer.put_code(code)?;
            }
        }
        let payload = writer.finish()?;
        Ok(8 + tree_bytes + payload)
    }
}

/// Main compression function.  Two passes over the input: count, rewind,
/// encode.  Returns (input bytes, output bytes).
pub fn compress<R: Read + Seek, W: Write>(src: &mut R, snk: &mut W) -> Result<(u64,u64),Error> {
    let mut reader = BufReader::new(src);
    let model = Model::analyze(&mut reader)?;
    reader.seek(SeekFrom::Start(0)).map_err(Error::Read)?;
    let mut writer = BufWriter::new(snk);
    let out_size = model.write_stream(&mut reader,&mut writer)?;
    writer.flush().map_err(Error::Write)?;
    Ok((model.size,out_size))
}

/// Main decompression function.  The flat tree drives output directly, one
/// traversal step per payload bit; no node graph is ever rebuilt.  Returns
/// (input bytes, output bytes).
pub fn expand<R: Read, W: Write>(src: &mut R, snk: &mut W) -> Result<(u64,u64),Error> {
    let mut reader = BufReader::new(src);
    let mut writer = BufWriter::new(snk);
    if get_w(&mut reader)? != MAGIC {
        return Err(Error::BadMagic);
    }
    let hi = get_w(&mut reader)?;
    if hi > MAX_SIZE_HI {
        return Err(Error::UnsupportedSizeEncoding);
    }
    let lo = get_w(&mut reader)?;
    let total = (hi as u64) << 16 | lo as u64;
    let flat = FlatTree::read_from(&mut reader)?;
    let mut words = WordReader::new(&mut reader);
    let mut remaining = total;
    let mut tp: usize = 0;
    while remaining > 0 {
        let bit = words.get_bit()?;
        let step = flat.entry(tp + bit as usize)?;
        let next = tp as i64 + step as i64;
        if next < 0 {
            return Err(Error::CorruptTree);
        }
        tp = next as usize;
        if flat.entry(tp)? == 0 {
            writer.write_all(&[flat.entry(tp+1)? as u8]).map_err(Error::Write)?;
            tp = 0;
            remaining -= 1;
        }
    }
    writer.flush().map_err(Error::Write)?;
    Ok((8 + flat.encoded_size() as u64 + words.count(),total))
}

/// Convenience function, calls `compress` with a slice returning a Vec
pub fn compress_slice(slice: &[u8]) -> Result<Vec<u8>,Error> {
    let mut src = Cursor::new(slice);
    let mut ans: Cursor<Vec<u8>> = Cursor::new(Vec::new());
    compress(&mut src,&mut ans)?;
    Ok(ans.into_inner())
}

/// Convenience function, calls `expand` with a slice returning a Vec
pub fn expand_slice(slice: &[u8]) -> Result<Vec<u8>,Error> {
    let mut src = Cursor::new(slice);
    let mut ans: Cursor<Vec<u8>> = Cursor::new(Vec::new());
    expand(&mut src,&mut ans)?;
    Ok(ans.into_inner())
}

#[test]
fn compression_works() {
    let test_data = "AAAABBBCC".as_bytes();
    let pack_str = "1f1f000009000a0002040041020400430042e80f";
    let compressed = compress_slice(test_data).expect("compression failed");
    assert_eq!(compressed,hex::decode(pack_str).unwrap());

    let test_data = "I am Sam. Sam I am. I do not like this Sam I am.\n".as_bytes();
    let pack_str = "1f1f0000310042000214020c020400490204006f002e0204006d00610204\
                    0020020c02040053020400690074021002080204006800650204000a0073\
                    02080204006e00640204006b006c56137634093585a35ee9ef16f7f5f836\
                    76d70935e8a3";
    let compressed = compress_slice(test_data).expect("compression failed");
    assert_eq!(compressed,hex::decode(pack_str.replace(" ","")).unwrap());
}

#[test]
fn invertibility() {
    let test_data = "I am Sam. Sam I am. I do not like this Sam I am.\n".as_bytes();
    let compressed = compress_slice(test_data).expect("compression failed");
    let expanded = expand_slice(&compressed).expect("expansion failed");
    assert_eq!(test_data.to_vec(),expanded);
}

#[test]
fn determinism() {
    let test_data = "the quick brown fox jumps over the lazy dog\n".repeat(11);
    let first = compress_slice(test_data.as_bytes()).expect("compression failed");
    let second = compress_slice(test_data.as_bytes()).expect("compression failed");
    assert_eq!(first,second);
}

#[test]
fn trivial_file_rejected() {
    assert!(matches!(compress_slice(b""),Err(Error::TrivialFile)));
    assert!(matches!(compress_slice(b"aaaaaaa"),Err(Error::TrivialFile)));
}

#[test]
fn all_byte_values() {
    // 256 leaves and 255 internal nodes, the largest tree the format can
    // ever need
    let test_data: Vec<u8> = (0u16..256).map(|c| c as u8).collect();
    let model = Model::analyze(&mut Cursor::new(&test_data)).expect("analysis failed");
    assert_eq!(model.used,256);
    assert_eq!(model.flat.entry_count(),1022);
    let compressed = compress_slice(&test_data).expect("compression failed");
    let expanded = expand_slice(&compressed).expect("expansion failed");
    assert_eq!(test_data,expanded);
}

#[test]
fn predicted_size_tracks_output() {
    // the prediction counts payload bytes, the writer emits whole words,
    // so the two can differ by at most the final padding byte
    let test_data = "sing in me muse and through me tell the story\n".repeat(30);
    let model = Model::analyze(&mut Cursor::new(test_data.as_bytes())).expect("analysis failed");
    let compressed = compress_slice(test_data.as_bytes()).expect("compression failed");
    let diff = compressed.len() as u64 - model.packed_size();
    assert!(diff <= 1,"prediction off by {}",diff);
}

#[test]
fn bad_magic_rejected() {
    let buf = hex::decode("1e1f00000900").unwrap();
    assert!(matches!(expand_slice(&buf),Err(Error::BadMagic)));
}

#[test]
fn float_size_rejected() {
    // any size high word above 0x4000 marks the PDP-11 float encoding;
    // 0x4001 is the lowest such word
    for hi in ["0140","0041"] {
        let buf = hex::decode(format!("1f1f{}000000000000",hi)).unwrap();
        assert!(matches!(expand_slice(&buf),Err(Error::UnsupportedSizeEncoding)),
            "high word {} not rejected",hi);
    }
    // 0x4000 itself is still a plain size, the stream fails later at EOF
    let buf = hex::decode("1f1f0040").unwrap();
    assert!(matches!(expand_slice(&buf),Err(Error::UnexpectedEndOfStream)));
}

#[test]
fn truncated_stream_fails() {
    let compressed = compress_slice(b"AAAABBBCC").expect("compression failed");
    for cut in [1,3,7,9,12,compressed.len()-1] {
        assert!(matches!(
            expand_slice(&compressed[0..cut]),
            Err(Error::UnexpectedEndOfStream)
        ),"cut at {} not detected",cut);
    }
}

#[test]
fn corrupt_tree_fails() {
    // a four-entry tree whose offsets point far outside the entry array
    let mut buf = hex::decode("1f1f00000900").unwrap();
    buf.extend(hex::decode("04007b7b0041").unwrap()); // count and entries
    buf.extend(hex::decode("ffff").unwrap());         // one payload word
    assert!(matches!(expand_slice(&buf),Err(Error::CorruptTree)));
}

#[test]
fn stats_are_most_frequent_first() {
    let model = Model::analyze(&mut Cursor::new(b"AAAABBBCC")).expect("analysis failed");
    let rows = model.stats();
    assert_eq!(rows[0],(b'A',4,"0".to_string()));
    assert_eq!(rows[1],(b'B',3,"11".to_string()));
    assert_eq!(rows[2],(b'C',2,"10".to_string()));
}
