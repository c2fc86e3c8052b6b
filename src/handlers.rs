pub mod dishes;
pub mod events;
pub mod health;
pub mod orders;
pub mod upload;
pub mod users;
