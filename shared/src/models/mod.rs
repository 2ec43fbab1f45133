//! Domain models for the Mandi Trade Management Platform

mod deal;
mod delivery;
mod dispatch;
mod pack_size;
mod price;
mod stock;
mod user;

pub use deal::*;
pub use delivery::*;
pub use dispatch::*;
pub use pack_size::*;
pub use price::*;
pub use stock::*;
pub use user::*;
