//! API Routes

pub mod forms;
pub mod health;
pub mod submissions;
