//! SCORINFO scoreboard engine
//! - Parses SCORINFO definition text once into a persistent object graph
//!   (columns, margins, one scoreboard)
//! - Refreshes enabled state, content sizes, and pixel geometry per frame
//!   (memoized by frame stamp), then stable-sorts players and renders
//! - Talks to the host through narrow interfaces: `Canvas` for fonts,
//!   textures, and clipped draws; `CvarStore` for console variables;
//!   `GameState` as a plain-data snapshot of the running game
//! - No globals: the parse output (`ScorinfoSet`) is owned by the caller
//!   and rebuilt wholesale on reparse

pub mod color;
pub mod column;
pub mod context;
pub mod headless;
pub mod margin;
pub mod parser;
pub mod scanner;
pub mod scoreboard;
pub mod value;

pub use color::Color;
pub use column::{
    country_atlas_index, Alignment, ColumnFlags, ColumnId, ColumnRegistry, NativeKind,
};
pub use context::{
    earntype, gametype, Canvas, ClipRect, CvarStore, CvarValue, FontHandle, GameMode, GameState,
    NetworkRole, PlayerSnapshot, TeamSnapshot, TextureHandle, TextureRef, MAX_PLAYERS, MAX_TEAMS,
};
pub use parser::{parse, parse_chunks, ScorinfoSet};
pub use scoreboard::Scoreboard;
pub use value::{CustomDataStore, DataType, PlayerValue};
