//! Host-facing seams: the `Canvas` drawing/measurement interface, console
//! variable access, and the plain-data `GameState` snapshot the scoreboard
//! reads from. The engine never reaches into the host any other way.

use crate::color::Color;
use std::str::FromStr;

/// Fixed player roster size. Slot indices above this are never valid.
pub const MAX_PLAYERS: usize = 64;
/// Upper bound on team count; per-team caches are sized to this.
pub const MAX_TEAMS: usize = 4;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct FontHandle(pub u32);

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct TextureHandle(pub u32);

/// A resolved texture together with the name it was looked up under, so
/// diagnostics and value round-trips don't need backend access.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct TextureRef {
    pub name: String,
    pub handle: TextureHandle,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct ClipRect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

/// Drawing and measurement primitives supplied by the host renderer.
///
/// Lookups are also used at parse time: a `None` from `font`/`texture`
/// aborts the definition load, so implementations should register
/// everything before parsing.
pub trait Canvas {
    fn screen_width(&self) -> i32;
    fn screen_height(&self) -> i32;

    fn font(&self, name: &str) -> Option<FontHandle>;
    fn font_height(&self, font: FontHandle) -> i32;
    /// Pixel width of `text` in `font`. Color escapes do not contribute.
    fn text_width(&self, font: FontHandle, text: &str) -> i32;

    fn texture(&self, name: &str) -> Option<TextureHandle>;
    fn texture_size(&self, texture: TextureHandle) -> (i32, i32);

    fn draw_text(
        &mut self,
        font: FontHandle,
        text: &str,
        x: i32,
        y: i32,
        color: Color,
        alpha: f32,
        clip: Option<ClipRect>,
    );
    fn draw_box(&mut self, x: i32, y: i32, w: i32, h: i32, color: Color, alpha: f32);
    fn draw_texture(
        &mut self,
        texture: TextureHandle,
        x: i32,
        y: i32,
        alpha: f32,
        clip: Option<ClipRect>,
    );
    /// Draws one cell of an atlas texture laid out as a `grid.0` x `grid.1`
    /// grid of equally sized cells, row-major.
    fn draw_texture_cell(
        &mut self,
        texture: TextureHandle,
        x: i32,
        y: i32,
        grid: (u32, u32),
        cell: u32,
        alpha: f32,
    );
}

/// Snapshot of a console variable's current value.
#[derive(Clone, PartialEq, Debug)]
pub enum CvarValue {
    Bool(bool),
    Int(i32),
    Float(f32),
    String(String),
}

impl CvarValue {
    pub fn as_float(&self) -> f32 {
        match self {
            Self::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Self::Int(i) => *i as f32,
            Self::Float(f) => *f,
            Self::String(s) => s.trim().parse().unwrap_or(0.0),
        }
    }

    pub fn is_nonzero(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Int(i) => *i != 0,
            Self::Float(f) => *f != 0.0,
            Self::String(s) => !s.is_empty() && s != "0",
        }
    }

    pub fn as_text(&self) -> String {
        match self {
            Self::Bool(b) => {
                if *b {
                    "true".to_string()
                } else {
                    "false".to_string()
                }
            }
            Self::Int(i) => i.to_string(),
            Self::Float(f) => format!("{f}"),
            Self::String(s) => s.clone(),
        }
    }
}

/// Console variable access. `None` means the variable does not exist,
/// which is a fatal error at parse time and a soft "false" at runtime.
pub trait CvarStore {
    fn get(&self, name: &str) -> Option<CvarValue>;
}

/// Game-type bits: what kind of game is being played. A column's mask must
/// intersect the current game's bits for the column to be usable.
pub mod gametype {
    pub const COOPERATIVE: u32 = 1 << 0;
    pub const DEATHMATCH: u32 = 1 << 1;
    pub const TEAMGAME: u32 = 1 << 2;
    pub const ALL: u32 = COOPERATIVE | DEATHMATCH | TEAMGAME;
}

/// Earn-type bits: which scalar players score in.
pub mod earntype {
    pub const FRAGS: u32 = 1 << 0;
    pub const POINTS: u32 = 1 << 1;
    pub const WINS: u32 = 1 << 2;
    pub const KILLS: u32 = 1 << 3;
    pub const ALL: u32 = FRAGS | POINTS | WINS | KILLS;
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum NetworkRole {
    #[default]
    Offline,
    Client,
    Server,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum GameMode {
    #[default]
    Cooperative,
    Survival,
    Invasion,
    Deathmatch,
    TeamPlay,
    Duel,
    Terminator,
    LastManStanding,
    TeamLastManStanding,
    Possession,
    TeamPossession,
    CaptureTheFlag,
    OneFlagCtf,
    Skulltag,
    Domination,
}

impl GameMode {
    /// Bit for game-mode allow-sets.
    #[inline(always)]
    pub const fn bit(self) -> u32 {
        1 << (self as u32)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Cooperative => "Cooperative",
            Self::Survival => "Survival",
            Self::Invasion => "Invasion",
            Self::Deathmatch => "Deathmatch",
            Self::TeamPlay => "Team Deathmatch",
            Self::Duel => "Duel",
            Self::Terminator => "Terminator",
            Self::LastManStanding => "Last Man Standing",
            Self::TeamLastManStanding => "Team Last Man Standing",
            Self::Possession => "Possession",
            Self::TeamPossession => "Team Possession",
            Self::CaptureTheFlag => "Capture the Flag",
            Self::OneFlagCtf => "One Flag CTF",
            Self::Skulltag => "Skulltag",
            Self::Domination => "Domination",
        }
    }
}

impl FromStr for GameMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cooperative" => Ok(Self::Cooperative),
            "survival" => Ok(Self::Survival),
            "invasion" => Ok(Self::Invasion),
            "deathmatch" => Ok(Self::Deathmatch),
            "teamplay" => Ok(Self::TeamPlay),
            "duel" => Ok(Self::Duel),
            "terminator" => Ok(Self::Terminator),
            "lastmanstanding" => Ok(Self::LastManStanding),
            "teamlms" | "teamlastmanstanding" => Ok(Self::TeamLastManStanding),
            "possession" => Ok(Self::Possession),
            "teampossession" => Ok(Self::TeamPossession),
            "ctf" | "capturetheflag" => Ok(Self::CaptureTheFlag),
            "oneflagctf" => Ok(Self::OneFlagCtf),
            "skulltag" => Ok(Self::Skulltag),
            "domination" => Ok(Self::Domination),
            other => Err(format!("'{other}' is not a recognized game mode")),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct TeamSnapshot {
    pub name: String,
    pub color: Color,
    pub logo: Option<TextureRef>,
    pub score: i32,
    pub frags: i32,
    pub wins: i32,
    pub player_count: u32,
    pub living_count: u32,
}

/// Per-player native statistics, one slot per roster position.
#[derive(Clone, Debug, Default)]
pub struct PlayerSnapshot {
    pub name: String,
    pub team: Option<u8>,
    pub spectator: bool,
    pub bot: bool,

    pub frags: i32,
    pub points: i32,
    pub wins: i32,
    pub kills: i32,
    pub deaths: i32,
    pub secrets: i32,
    pub lives: i32,
    /// Minutes in game.
    pub time: i32,
    pub ping: i32,
    /// A handicap of zero or less reads as "no handicap".
    pub handicap: i32,
    /// Position in the join queue; 0 is the front.
    pub join_queue_position: Option<u8>,
    /// `None` until the player has cast a vote.
    pub vote: Option<bool>,
    pub color: Color,

    pub status_icon: Option<TextureRef>,
    pub ready_icon: Option<TextureRef>,
    pub player_icon: Option<TextureRef>,
    pub artifact_icon: Option<TextureRef>,
    pub bot_skill_icon: Option<TextureRef>,
    pub country_index: Option<u16>,
}

/// Everything the scoreboard reads from the running game, captured as plain
/// data. The host rebuilds or mutates this between frames; the engine never
/// writes to it.
#[derive(Clone, Debug)]
pub struct GameState {
    pub mode: GameMode,
    pub game_type: u32,
    pub earn_type: u32,
    pub intermission: bool,
    pub role: NetworkRole,

    pub players_on_teams: bool,
    pub players_have_lives: bool,
    /// True when the mode revolves around a carryable team item (flag,
    /// skull) rather than bare scores.
    pub use_team_item: bool,

    pub teams: Vec<TeamSnapshot>,
    pub players: Vec<Option<PlayerSnapshot>>,
    pub local_player: Option<usize>,
    pub vote_caller: Option<usize>,

    pub level_name: String,
    pub level_lump: String,
    pub skill_name: String,

    pub frag_limit: i32,
    pub point_limit: i32,
    pub win_limit: i32,
    pub duel_limit: i32,
    /// Seconds; 0 means no time limit.
    pub time_limit: i32,
    pub time_elapsed: i32,
    pub time_remaining: i32,

    /// Client option: tint ping values by latency.
    pub colorize_pings: bool,
    /// Client option: columns with a short name render it instead.
    pub prefer_short_names: bool,
}

impl Default for GameState {
    fn default() -> Self {
        Self {
            mode: GameMode::default(),
            game_type: gametype::COOPERATIVE,
            earn_type: earntype::KILLS,
            intermission: false,
            role: NetworkRole::default(),
            players_on_teams: false,
            players_have_lives: false,
            use_team_item: false,
            teams: Vec::new(),
            players: vec![None; MAX_PLAYERS],
            local_player: None,
            vote_caller: None,
            level_name: String::new(),
            level_lump: String::new(),
            skill_name: String::new(),
            frag_limit: 0,
            point_limit: 0,
            win_limit: 0,
            duel_limit: 0,
            time_limit: 0,
            time_elapsed: 0,
            time_remaining: 0,
            colorize_pings: true,
            prefer_short_names: false,
        }
    }
}

impl GameState {
    #[inline(always)]
    pub fn player(&self, index: usize) -> Option<&PlayerSnapshot> {
        self.players.get(index).and_then(|p| p.as_ref())
    }

    /// Valid and not a spectator.
    #[inline(always)]
    pub fn is_active_player(&self, index: usize) -> bool {
        self.player(index).is_some_and(|p| !p.spectator)
    }

    pub fn active_player_count(&self) -> usize {
        (0..self.players.len())
            .filter(|&i| self.is_active_player(i))
            .count()
    }

    pub fn spectator_count(&self) -> usize {
        self.players
            .iter()
            .flatten()
            .filter(|p| p.spectator)
            .count()
    }

    /// Team indices that currently have at least one active player on them,
    /// ascending.
    pub fn teams_with_players(&self) -> Vec<usize> {
        (0..self.teams.len())
            .filter(|&t| {
                self.players
                    .iter()
                    .flatten()
                    .any(|p| !p.spectator && p.team == Some(t as u8))
            })
            .collect()
    }

    /// Whether a "your place" style rank is meaningful right now: an
    /// individual ranked scalar is being earned and the local player is in
    /// the game.
    pub fn should_show_rank(&self) -> bool {
        if self.players_on_teams {
            return false;
        }
        if self.earn_type & (earntype::FRAGS | earntype::POINTS | earntype::WINS) == 0 {
            return false;
        }
        self.local_player.is_some_and(|i| self.is_active_player(i))
    }

    /// The local player's ranked score in the current earn type.
    pub fn local_score(&self) -> i32 {
        let Some(p) = self.local_player.and_then(|i| self.player(i)) else {
            return 0;
        };
        if self.earn_type & earntype::POINTS != 0 {
            p.points
        } else if self.earn_type & earntype::WINS != 0 {
            p.wins
        } else {
            p.frags
        }
    }

    /// 0-based place of the local player among active players, by the
    /// ranked scalar.
    pub fn local_place(&self) -> usize {
        let own = self.local_score();
        (0..self.players.len())
            .filter(|&i| self.is_active_player(i) && Some(i) != self.local_player)
            .filter_map(|i| self.player(i))
            .filter(|p| {
                let other = if self.earn_type & earntype::POINTS != 0 {
                    p.points
                } else if self.earn_type & earntype::WINS != 0 {
                    p.wins
                } else {
                    p.frags
                };
                other > own
            })
            .count()
    }
}

/// Per-frame read-only inputs bundled so refresh/draw signatures stay flat.
pub struct Inputs<'a> {
    pub game: &'a GameState,
    pub custom: &'a crate::value::CustomDataStore,
    pub cvars: &'a dyn CvarStore,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn game_mode_bits_are_distinct() {
        let modes = [
            GameMode::Cooperative,
            GameMode::Deathmatch,
            GameMode::TeamPlay,
            GameMode::Domination,
        ];
        let mut seen = 0u32;
        for m in modes {
            assert_eq!(seen & m.bit(), 0, "bit collision for {m:?}");
            seen |= m.bit();
        }
    }

    #[test]
    fn game_mode_round_trips_through_names() {
        for m in [
            GameMode::Cooperative,
            GameMode::TeamLastManStanding,
            GameMode::OneFlagCtf,
        ] {
            let lowered = format!("{m:?}").to_ascii_lowercase();
            let reparsed: GameMode = match lowered.as_str() {
                "teamlastmanstanding" => "teamlms".parse().unwrap(),
                "oneflagctf" => "oneflagctf".parse().unwrap(),
                other => other.parse().unwrap(),
            };
            assert_eq!(reparsed, m);
        }
    }

    #[test]
    fn cvar_value_coercions() {
        assert!(CvarValue::Int(3).is_nonzero());
        assert!(!CvarValue::String("0".into()).is_nonzero());
        assert_eq!(CvarValue::Bool(true).as_float(), 1.0);
        assert_eq!(CvarValue::String("2.5".into()).as_float(), 2.5);
    }

    #[test]
    fn local_place_counts_players_ahead() {
        let mut game = GameState {
            earn_type: earntype::FRAGS,
            game_type: gametype::DEATHMATCH,
            ..GameState::default()
        };
        for (i, frags) in [(0usize, 5), (1, 12), (2, 9)] {
            game.players[i] = Some(PlayerSnapshot {
                name: format!("p{i}"),
                frags,
                ..PlayerSnapshot::default()
            });
        }
        game.local_player = Some(2);
        assert_eq!(game.local_place(), 1, "only the 12-frag player is ahead");
        assert!(game.should_show_rank());
    }
}
