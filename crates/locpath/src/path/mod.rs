//! Location paths: axes, node tests, predicates, steps and their compilation.

pub mod axis;
pub mod locpath;
pub mod pred;
pub mod step;
pub mod steps;
pub mod test;

pub use axis::{Axis, AxisIter};
pub use locpath::{LocPath, Root};
pub use pred::{Pred, PredPos, PredSimple};
pub use step::{Step, Strategy};
pub use steps::Steps;
pub use test::{NameTest, Principal, Test};
