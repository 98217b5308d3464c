pub mod customers;
pub mod health;

pub use customers::{delete_customers, list_customers, save_customers};
pub use health::health_check;
