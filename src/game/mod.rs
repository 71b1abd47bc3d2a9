pub mod constants;
pub mod rng;
pub mod cave;
pub mod state;
pub mod systems;
pub mod game_loop;
pub mod input_cache;
