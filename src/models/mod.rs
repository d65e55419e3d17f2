/*!
Data structures for the BMP, sFlow and NetFlow messages handled by the collector.
*/
mod bgp;
mod bmp;
mod netflow;
mod sflow;

pub use bgp::*;
pub use bmp::*;
pub use netflow::*;
pub use sflow::*;
