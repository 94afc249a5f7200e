#![doc(html_root_url = "https://docs.rs/bdpl/0.1.0")]

//! A Blu-ray Disc Movie (BDMV) metadata parser and episode structure
//! analyzer.
//!
//! Given the small binary metadata files of a disc backup (playlists,
//! clip information, the title index, navigation objects, and
//! optionally menu streams), this crate infers which playlists are
//! episodes, in what order, and with what confidence, even when the
//! disc hides the structure behind shared opening and ending segments,
//! a single play-all concatenation, or one long file split only by
//! chapter marks.
//!
//! The entry point is [`analyze`], which takes a [`DiscInput`] of byte
//! buffers and returns a [`DiscAnalysis`]. [`load_disc`] reads the
//! usual `BDMV/` tree into a `DiscInput`; the individual parsers in
//! [`parser`] are also public for callers that only care about one
//! format.
//!
//! The binary layouts are not officially documented; the parsers rely
//! on the third-party file specs in the [lw/BluRay] repository and the
//! [bdinfo/mpls] Wikibooks page.
//!
//! [`analyze`]: analysis/fn.analyze.html
//! [`DiscInput`]: analysis/struct.DiscInput.html
//! [`DiscAnalysis`]: types/struct.DiscAnalysis.html
//! [`load_disc`]: disc/fn.load_disc.html
//! [`parser`]: parser/index.html
//! [lw/BluRay]: https://github.com/lw/BluRay/wiki
//! [bdinfo/mpls]: https://en.wikibooks.org/wiki/User:Bdinfo/mpls
//!
//! # Examples
//! ```no_run
//! # fn main() -> std::io::Result<()> {
//! use std::path::Path;
//!
//! // read the disc's metadata files
//! let input = bdpl::load_disc(Path::new("/discs/MY_SERIES_D1"))?;
//!
//! // run the analysis pipeline
//! let analysis = bdpl::analyze(&input);
//!
//! for episode in &analysis.episodes {
//!     println!(
//!         "episode {}: {} ({:.0}% confidence)",
//!         episode.number,
//!         episode.playlist,
//!         episode.confidence * 100.0
//!     );
//! }
//!
//! // or render the full audit trail
//! print!("{}", bdpl::explain(&analysis));
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod disc;
pub mod error;
pub mod parser;
pub mod reader;
pub mod report;
pub mod types;

pub use analysis::explain::explain;
pub use analysis::{analyze, DiscInput, Hints};
pub use disc::load_disc;
pub use error::ParseError;
pub use report::{build_report, DiscReport};
pub use types::*;
