pub mod power;
pub mod physics;
pub mod enemies;
pub mod combo;
pub mod swap;
pub mod bots;
