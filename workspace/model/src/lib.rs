pub mod account;
pub mod entities;
pub mod password;
pub mod upload;
