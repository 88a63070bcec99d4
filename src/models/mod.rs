pub mod jwt;
pub mod movie;
pub mod refresh_token;
pub mod user;
