pub mod app_state;
pub mod dtos;
pub mod entities;
pub mod enums;

pub use app_state::AppState;
