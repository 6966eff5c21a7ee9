pub mod address;
pub mod decimal;
pub mod token;

pub use address::Address;
pub use decimal::MoneyError;
pub use token::Token;
