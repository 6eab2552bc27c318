pub mod icons;
pub mod output;

pub use output::{RunUI, print_status};
