mod align;
mod crc32;
mod error;
mod structs;
#[cfg(test)]
mod test_util;
mod writer;

pub use error::Error;
pub use structs::DosDatetime;
pub use writer::Writer;

#[cfg(doctest)]
#[doc = include_str!("../README.md")]
struct ReadMe;
