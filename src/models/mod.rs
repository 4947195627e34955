pub mod user;
pub mod account;
pub mod order;

pub use user::CurrentUser;
pub use account::{Account, Holding, Transaction};
pub use order::{InvalidTransition, Order, OrderStatus, Side};
