pub mod company;
pub mod migrate;
pub mod user;
