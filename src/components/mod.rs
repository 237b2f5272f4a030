mod common;
mod end;
mod expr_assign;
mod expr_filter;
mod expr_switch;
mod js_filter;
mod js_switch;
mod start;

pub use common::*;
pub use end::*;
pub use expr_assign::*;
pub use expr_filter::*;
pub use expr_switch::*;
pub use js_filter::*;
pub use js_switch::*;
pub use start::*;
