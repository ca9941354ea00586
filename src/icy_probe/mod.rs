//! Shoutcast/Icecast (ICY) detection over a raw TCP socket.
//!
//! ICY servers answer with `ICY 200 OK` instead of an HTTP status line,
//! which HTTP clients reject, so these streams are checked by hand.

pub mod probe;

pub use probe::probe_icy;
