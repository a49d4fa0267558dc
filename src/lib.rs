#[macro_use]
extern crate cfg_if;
#[macro_use]
extern crate derive_more;
#[macro_use]
extern crate serde;

mod adapter;
mod env;
mod error;
mod offset;
mod paginator;
pub mod query;
pub mod templating;

pub use crate::adapter::*;
pub use crate::env::*;
pub use crate::error::*;
pub use crate::offset::*;
pub use crate::paginator::*;
