// Domain module: solver-facing models and the solver contract

pub mod interrupt;
pub mod models;
pub mod session;
pub mod solver_service;
pub mod value_objects;

pub use interrupt::*;
pub use models::*;
pub use session::*;
pub use solver_service::*;
pub use value_objects::*;
