pub mod company;
pub mod session;
pub mod user;
pub mod workspace;
