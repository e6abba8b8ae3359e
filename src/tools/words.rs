//! Bit packing into 16-bit little endian words.
//!
//! The old pack payload is a sequence of 16-bit words, each written little
//! endian, with codeword bits filled in from the most significant end.  The
//! same word primitive also carries every header field.

use std::io::{Read,Write};
use crate::Error;

/// read one 16-bit little endian word
pub fn get_w<R: Read>(src: &mut R) -> Result<u16,Error> {
    let mut by: [u8;2] = [0;2];
    match src.read_exact(&mut by) {
        Ok(()) => Ok(u16::from_le_bytes(by)),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Err(Error::UnexpectedEndOfStream),
        Err(e) => Err(Error::Read(e))
    }
}

/// write one 16-bit little endian word
pub fn put_w<W: Write>(snk: &mut W, word: u16) -> Result<(),Error> {
    snk.write_all(&u16::to_le_bytes(word)).map_err(Error::Write)
}

/// Accumulates bits MSB-first into a 16-bit register and flushes each full
/// register as a little endian word.  `finish` left-justifies any partial
/// register, padding the low bits with 0.
pub struct WordWriter<'a,W: Write> {
    snk: &'a mut W,
    word: u16,
    bits: u8,
    count: u64
}

impl <'a,W: Write> WordWriter<'a,W> {
    pub fn new(snk: &'a mut W) -> Self {
        Self {
            snk,
            word: 0,
            bits: 0,
            count: 0
        }
    }
    pub fn put_bit(&mut self, bit: bool) -> Result<(),Error> {
        self.word = self.word << 1 | bit as u16;
        self.bits += 1;
        if self.bits == 16 {
            put_w(self.snk, self.word)?;
            self.word = 0;
            self.bits = 0;
            self.count += 2;
        }
        Ok(())
    }
    /// append a whole codeword
    pub fn put_code(&mut self, code: &bit_vec::BitVec) -> Result<(),Error> {
        for bit in code.iter() {
            self.put_bit(bit)?;
        }
        Ok(())
    }
    /// flush any partial word, returns total payload bytes written
    pub fn finish(mut self) -> Result<u64,Error> {
        if self.bits > 0 {
            put_w(self.snk, self.word << (16 - self.bits))?;
            self.count += 2;
        }
        Ok(self.count)
    }
}

/// Serves bits MSB-first out of a 16-bit register, refilling the register
/// with the next little endian word as needed.  Running out of input is
/// fatal, the format has nothing to resynchronize on.
pub struct WordReader<'a,R: Read> {
    src: &'a mut R,
    word: u16,
    bits: u8,
    count: u64
}

impl <'a,R: Read> WordReader<'a,R> {
    pub fn new(src: &'a mut R) -> Self {
        Self {
            src,
            word: 0,
            bits: 0,
            count: 0
        }
    }
    pub fn get_bit(&mut self) -> Result<bool,Error> {
        if self.bits == 0 {
            self.word = get_w(self.src)?;
            self.bits = 16;
            self.count += 2;
        }
        let bit = self.word & 0x8000 != 0;
        self.word <<= 1;
        self.bits -= 1;
        Ok(bit)
    }
    /// payload bytes consumed so far
    pub fn count(&self) -> u64 {
        self.count
    }
}

#[test]
fn writer_packs_msb_first() {
    let mut buf: Vec<u8> = Vec::new();
    let mut writer = WordWriter::new(&mut buf);
    // 0000 1111 1110 1000 with 2 bits of padding, same shape as the
    // AAAABBBCC payload
    for bit in [false,false,false,false,true,true,true,true,true,true,true,false,true,false] {
        writer.put_bit(bit).unwrap();
    }
    assert_eq!(writer.finish().unwrap(),2);
    assert_eq!(buf,vec![0xe8,0x0f]);
}

#[test]
fn writer_flushes_full_words() {
    let mut buf: Vec<u8> = Vec::new();
    let mut writer = WordWriter::new(&mut buf);
    for i in 0..32 {
        writer.put_bit(i % 2 == 0).unwrap();
    }
    assert_eq!(writer.finish().unwrap(),4);
    assert_eq!(buf,vec![0xaa,0xaa,0xaa,0xaa]);
}

#[test]
fn reader_serves_msb_first() {
    let mut src = std::io::Cursor::new(vec![0xe8,0x0f]);
    let mut reader = WordReader::new(&mut src);
    let mut bits = Vec::new();
    for _i in 0..16 {
        bits.push(reader.get_bit().unwrap() as u8);
    }
    assert_eq!(bits,vec![0,0,0,0,1,1,1,1,1,1,1,0,1,0,0,0]);
    assert_eq!(reader.count(),2);
}

#[test]
fn reader_fails_at_eof() {
    let mut src = std::io::Cursor::new(vec![0xe8]);
    let mut reader = WordReader::new(&mut src);
    assert!(matches!(reader.get_bit(),Err(Error::UnexpectedEndOfStream)));
}
