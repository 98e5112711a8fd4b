pub mod freshness;
pub mod params;

pub use freshness::Scope;
pub use params::{parse_cursor, parse_page_size, parse_player_id, parse_world_id};
