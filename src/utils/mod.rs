pub mod logging;
pub mod rng;
pub mod time;
pub mod token;
