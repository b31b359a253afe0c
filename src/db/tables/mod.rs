//! Database table operations

mod song_table;
mod state_table;
mod user_table;

pub use song_table::SongTable;
pub use state_table::{StateTable, CURRENT_SHUFFLE_INDEX, IS_SHUFFLE_LOCKED};
pub use user_table::UserTable;

#[cfg(test)]
pub use song_table::insert_codes;
