mod tools;
pub mod pack;

/// Errors arising while packing or unpacking
#[derive(thiserror::Error,Debug)]
pub enum Error {
    /// fewer than 2 distinct byte values, no code can be formed
    #[error("trivial file")]
    TrivialFile,
    /// the uncompressed size does not fit the 32-bit size field
    #[error("file too large")]
    FileTooLarge,
    #[error("old pack signature not found")]
    BadMagic,
    /// the size field carries a PDP-11 32-bit float, which we only detect
    #[error("size as PDP-11 32-bit float not supported")]
    UnsupportedSizeEncoding,
    #[error("EOF in old pack stream")]
    UnexpectedEndOfStream,
    /// a tree entry read from the stream escaped the tree's bounds
    #[error("corrupt code tree")]
    CorruptTree,
    #[error("read error: {0}")]
    Read(std::io::Error),
    #[error("write error: {0}")]
    Write(std::io::Error),
}
