pub mod descriptor;
pub mod stream;

pub use descriptor::{BehaviorHints, RawDescriptor};
pub use stream::{
    Addon, ParsedFile, ParsedStream, Provider, RegexMatched, StreamType, Torrent, Usenet,
};
