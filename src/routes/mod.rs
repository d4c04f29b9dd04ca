mod groups;
mod time;

pub use groups::*;
pub use time::*;
