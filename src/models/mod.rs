pub mod paper;
pub mod question;
pub mod user;
