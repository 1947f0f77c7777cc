//! Brush asset decoding core.
//!
//! Converts painting-software brush files — Photoshop `.abr`, GIMP `.gbr` /
//! `.gih`, Procreate `.brushset`, Clip Studio `.sut` — into host-agnostic
//! [`ParsedBrush`] records: a name, a kind tag, normalized parameters, and
//! decoded 8-bit texture frames. The host decides how to materialize those
//! as native brush assets.
//!
//! ```no_run
//! use brushport::{parse_file, ParseOptions};
//!
//! let out = parse_file("pack.abr", &ParseOptions::default())?;
//! let (imported, skipped) = out.summary();
//! for brush in out {
//!     println!("{} ({} frames)", brush.name, brush.textures.len());
//! }
//! # Ok::<(), brushport::ParseError>(())
//! ```
//!
//! Malformed input loses the narrowest possible scope: a bad brush entry or
//! texture frame becomes a [`Diagnostic`] and the rest of the file still
//! imports; only structural corruption fails the whole file.

pub mod chunk;
pub mod codec;
pub mod detect;
pub mod error;
pub mod formats;
pub mod normalize;
pub mod reader;
pub mod types;

pub use detect::{detect, parse_bytes, parse_file, FormatKind};
pub use error::ParseError;
pub use types::{
    BrushKind, ChannelLayout, Diagnostic, ParamValue, Parameters, ParseOptions, ParseOutput,
    ParsedBrush, TextureFrame,
};
