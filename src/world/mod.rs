// world/ - Ambient force queries
//
// Pure functions of time and droplet state.
// No state, no allocation - just math.

mod wind;

pub use wind::*;
