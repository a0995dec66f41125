mod aggregation;
mod arithmetic;
mod context;
mod filter;
mod histogram;
mod rate;
mod sample;
mod sample_family;
mod tag;


pub use aggregation::AggregateFunction;
pub use arithmetic::BinaryOp;
pub use context::*;
pub use filter::{LabelFilterOp, ValueFilterOp};
pub use rate::IRATE_WINDOW_MILLIS;
pub use sample::Sample;
pub use sample_family::{Family, SampleFamily};
pub use tag::{FnRewrite, LabelRewrite, RewriteChain, TagInstruction};
