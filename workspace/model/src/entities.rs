//! This file serves as the root for all SeaORM entity modules.
//! Users, menu dishes, events and orders (with their line items).

pub mod dish;
pub mod event;
pub mod order;
pub mod order_item;
pub mod user;

pub mod prelude {
    //! A prelude module for easy importing of all entities.
    pub use super::dish::Entity as Dish;
    pub use super::event::Entity as Event;
    pub use super::order::Entity as Order;
    pub use super::order_item::Entity as OrderItem;
    pub use super::user::Entity as User;
}
