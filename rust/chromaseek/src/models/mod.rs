pub mod peak;
pub mod sample;
pub mod trace;

pub use peak::{
    Peak,
    PeakClass,
};
pub use sample::Sample;
pub use trace::Trace;
