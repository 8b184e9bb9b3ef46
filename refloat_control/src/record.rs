//! Realtime data and the data recorder.

pub mod float16;
pub mod recorder;
pub mod rt_data;
