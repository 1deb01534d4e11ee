//! Playlist processing: parsing, expiry detection, country classification,
//! deduplication and rendering

pub mod classifier;
pub mod dedupe;
pub mod expiry;
pub mod parser;
pub mod writer;

pub use classifier::{CountryClassifier, classify_label};
pub use dedupe::dedupe;
pub use expiry::{extract_expiry, extract_expiry_at};
pub use parser::{ParsedPlaylist, parse, parse_with};
pub use writer::{output_filename, render};
