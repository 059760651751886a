// Re-export all model types
pub use self::cart::*;
pub use self::category::*;
pub use self::dish::*;
pub use self::enums::*;
pub use self::errors::*;
pub use self::ids::*;
pub use self::order::*;
pub use self::page::*;
pub use self::setmeal::*;
pub use self::user::*;
pub use self::validation::*;

mod cart;
mod category;
mod dish;
mod enums;
mod errors;
mod ids;
mod order;
mod page;
mod setmeal;
mod user;
mod validation;
