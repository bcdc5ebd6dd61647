//! Output module for persisting readings
//!
//! This module handles:
//! - The [`Reading`] record and its `value,timestamp` line format
//! - Appending readings to the CSV log, one scoped write per reading

mod reading;
mod recorder;

pub use reading::Reading;
pub use recorder::{RecordError, Recorder};
