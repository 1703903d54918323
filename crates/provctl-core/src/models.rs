pub mod cluster;
pub mod event;
pub mod node_pool;
pub mod resource;
pub mod state;
