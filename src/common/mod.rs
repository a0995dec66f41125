pub mod labels;
pub mod parse;
pub mod regex_util;
pub mod time;
pub mod types;

pub use labels::*;
pub use time::TimeUnit;
pub use types::*;
