pub mod balance;
pub mod currency;
pub mod member;
pub mod records;
