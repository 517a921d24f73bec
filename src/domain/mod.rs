mod balance;
mod customer;
mod integrity;
mod money;
mod transaction;
mod user;
mod validation;

pub use balance::*;
pub use customer::*;
pub use integrity::*;
pub use money::*;
pub use transaction::*;
pub use user::*;
pub use validation::{FieldError, ValidationError};
