pub mod medicine;
pub mod user;
