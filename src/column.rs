//! The column model: one visual field of per-player data. Data columns wrap
//! a native statistic or custom storage, composite columns pack several data
//! columns into one slot, and the country-flag column indexes a flag atlas.
//! Columns live in a registry arena and reference each other by id.

use crate::color::Color;
use crate::context::{Canvas, ClipRect, FontHandle, GameState, Inputs, NetworkRole, TextureRef};
use crate::value::{DataType, PlayerValue};
use bitflags::bitflags;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

bitflags! {
    #[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
    pub struct ColumnFlags: u32 {
        const INTERMISSION_ONLY        = 1 << 0;
        const NO_INTERMISSION          = 1 << 1;
        const NO_SPECTATORS            = 1 << 2;
        const OFFLINE_ONLY             = 1 << 3;
        const ONLINE_ONLY              = 1 << 4;
        const REQUIRES_TEAMS           = 1 << 5;
        const FORBID_TEAMS             = 1 << 6;
        const REQUIRES_LIVES           = 1 << 7;
        const FORBID_LIVES             = 1 << 8;
        const REQUIRES_TEAM_ITEMS      = 1 << 9;
        const FORBID_TEAM_ITEMS        = 1 << 10;
        const DONT_SHOW_HEADER         = 1 << 11;
        const ALWAYS_USE_SHORTEST_WIDTH = 1 << 12;
        const DISABLE_IF_EMPTY         = 1 << 13;
        const REVERSE_ORDER            = 1 << 14;
        const CVAR_MUST_BE_ZERO        = 1 << 15;
    }
}

/// Flag names accepted by `AddFlag`/`RemoveFlag`, lowercase.
static FLAG_NAMES: &[(&str, ColumnFlags)] = &[
    ("intermissiononly", ColumnFlags::INTERMISSION_ONLY),
    ("nointermission", ColumnFlags::NO_INTERMISSION),
    ("nospectators", ColumnFlags::NO_SPECTATORS),
    ("offlineonly", ColumnFlags::OFFLINE_ONLY),
    ("onlineonly", ColumnFlags::ONLINE_ONLY),
    ("requiresteams", ColumnFlags::REQUIRES_TEAMS),
    ("forbidteams", ColumnFlags::FORBID_TEAMS),
    ("requireslives", ColumnFlags::REQUIRES_LIVES),
    ("forbidlives", ColumnFlags::FORBID_LIVES),
    ("requiresteamitems", ColumnFlags::REQUIRES_TEAM_ITEMS),
    ("forbidteamitems", ColumnFlags::FORBID_TEAM_ITEMS),
    ("dontshowheader", ColumnFlags::DONT_SHOW_HEADER),
    ("alwaysuseshortestwidth", ColumnFlags::ALWAYS_USE_SHORTEST_WIDTH),
    ("disableifempty", ColumnFlags::DISABLE_IF_EMPTY),
    ("reverseorder", ColumnFlags::REVERSE_ORDER),
    ("cvarmustbezero", ColumnFlags::CVAR_MUST_BE_ZERO),
];

pub fn flag_by_name(name: &str) -> Option<ColumnFlags> {
    let lowered = name.to_ascii_lowercase();
    FLAG_NAMES
        .iter()
        .find(|(n, _)| *n == lowered)
        .map(|&(_, f)| f)
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
}

impl Alignment {
    /// Left edge of content of width `content_w` aligned inside
    /// `[box_x, box_x + box_w)`.
    #[inline(always)]
    pub const fn position(self, box_x: i32, box_w: i32, content_w: i32) -> i32 {
        match self {
            Self::Left => box_x,
            Self::Center => box_x + (box_w - content_w) / 2,
            Self::Right => box_x + box_w - content_w,
        }
    }
}

impl std::str::FromStr for Alignment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" => Ok(Self::Left),
            "center" => Ok(Self::Center),
            "right" => Ok(Self::Right),
            other => Err(format!("'{other}' is not a valid alignment")),
        }
    }
}

/// Native statistics a data column can wrap.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum NativeKind {
    Name,
    Time,
    Ping,
    Frags,
    Points,
    Wins,
    Kills,
    Deaths,
    Secrets,
    Lives,
    Handicap,
    JoinQueue,
    Vote,
    PlayerColor,
    StatusIcon,
    ReadyIcon,
    PlayerIcon,
    ArtifactIcon,
    BotSkillIcon,
    CountryFlag,
}

static NATIVE_KINDS: &[(&str, NativeKind)] = &[
    ("name", NativeKind::Name),
    ("time", NativeKind::Time),
    ("ping", NativeKind::Ping),
    ("frags", NativeKind::Frags),
    ("points", NativeKind::Points),
    ("wins", NativeKind::Wins),
    ("kills", NativeKind::Kills),
    ("deaths", NativeKind::Deaths),
    ("secrets", NativeKind::Secrets),
    ("lives", NativeKind::Lives),
    ("handicap", NativeKind::Handicap),
    ("joinqueue", NativeKind::JoinQueue),
    ("vote", NativeKind::Vote),
    ("playercolor", NativeKind::PlayerColor),
    ("statusicon", NativeKind::StatusIcon),
    ("readytogoicon", NativeKind::ReadyIcon),
    ("playericon", NativeKind::PlayerIcon),
    ("artifacticon", NativeKind::ArtifactIcon),
    ("botskillicon", NativeKind::BotSkillIcon),
    ("countryflag", NativeKind::CountryFlag),
];

impl NativeKind {
    pub fn from_name(name: &str) -> Option<Self> {
        let lowered = name.to_ascii_lowercase();
        NATIVE_KINDS
            .iter()
            .find(|(n, _)| *n == lowered)
            .map(|&(_, k)| k)
    }

    pub const fn data_type(self) -> DataType {
        match self {
            Self::Name | Self::Vote => DataType::String,
            Self::Time
            | Self::Ping
            | Self::Frags
            | Self::Points
            | Self::Wins
            | Self::Kills
            | Self::Deaths
            | Self::Secrets
            | Self::Lives
            | Self::Handicap
            | Self::JoinQueue
            | Self::CountryFlag => DataType::Int,
            Self::PlayerColor => DataType::Color,
            Self::StatusIcon
            | Self::ReadyIcon
            | Self::PlayerIcon
            | Self::ArtifactIcon
            | Self::BotSkillIcon => DataType::Texture,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DataSource {
    Native(NativeKind),
    /// Index into the `CustomDataStore`.
    Custom(usize),
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ColumnId(pub usize);

/// Attributes every column kind shares, including the geometry the layout
/// pass computes each frame.
#[derive(Clone, Debug)]
pub struct ColumnShared {
    pub internal_name: String,
    pub display_name: String,
    pub short_name: String,
    pub alignment: Alignment,
    pub flags: ColumnFlags,
    pub cvar: Option<String>,
    /// Bit per `GameMode`; zero means every mode.
    pub game_modes: u32,
    pub game_type_mask: u32,
    pub earn_type_mask: u32,
    /// Fixed width, minimum width, or pure padding depending on flags.
    pub sizing: i32,
    pub shortest_width: i32,
    pub width: i32,
    pub x: i32,
    pub usable: bool,
    pub disabled: bool,
    pub use_short_name: bool,
}

impl ColumnShared {
    pub fn new(internal_name: &str) -> Self {
        Self {
            internal_name: internal_name.to_string(),
            display_name: internal_name.to_string(),
            short_name: String::new(),
            alignment: Alignment::default(),
            flags: ColumnFlags::empty(),
            cvar: None,
            game_modes: 0,
            game_type_mask: crate::context::gametype::ALL,
            earn_type_mask: crate::context::earntype::ALL,
            sizing: 0,
            shortest_width: 0,
            width: 0,
            x: 0,
            usable: false,
            disabled: true,
            use_short_name: false,
        }
    }

    #[inline(always)]
    pub fn header_text(&self) -> &str {
        if self.use_short_name {
            &self.short_name
        } else {
            &self.display_name
        }
    }

    #[inline(always)]
    pub const fn enabled(&self) -> bool {
        !self.disabled
    }
}

#[derive(Clone, Debug)]
pub struct DataColumn {
    pub source: DataSource,
    /// Text columns: character budget (strings) or decimal places (floats).
    pub max_length: Option<usize>,
    pub prefix: String,
    pub suffix: String,
    /// Graphic columns: clip rectangle bounds.
    pub clip_w: Option<i32>,
    pub clip_h: Option<i32>,
    pub true_text: Option<String>,
    pub false_text: Option<String>,
    /// Enclosing composite column, when packed into one.
    pub owner: Option<ColumnId>,
}

impl DataColumn {
    pub fn new(source: DataSource) -> Self {
        Self {
            source,
            max_length: None,
            prefix: String::new(),
            suffix: String::new(),
            clip_w: None,
            clip_h: None,
            true_text: None,
            false_text: None,
            owner: None,
        }
    }
}

/// Flag atlas layout: a 16x16 grid of equally sized cells.
pub const FLAG_ATLAS_GRID: (u32, u32) = (16, 16);

/// ISO 3166 alpha-2 codes in atlas order, row-major. Cell 0 is the
/// "unknown country" placeholder.
static COUNTRY_CODES: &[&str] = &[
    "??", "ar", "at", "au", "be", "br", "ca", "ch", "cl", "cn", "co", "cz", "de", "dk", "es",
    "fi", "fr", "gb", "gr", "hu", "ie", "il", "it", "jp", "kr", "mx", "nl", "no", "nz", "pl",
    "pt", "ro", "ru", "se", "sg", "sk", "tr", "ua", "us", "uy", "ve", "za",
];

/// Atlas cell for a two-letter country code; unknown codes get the
/// placeholder cell.
pub fn country_atlas_index(code: &str) -> u16 {
    let lowered = code.to_ascii_lowercase();
    COUNTRY_CODES
        .iter()
        .position(|c| *c == lowered)
        .unwrap_or(0) as u16
}

#[derive(Clone, Debug)]
pub struct CountryFlagColumn {
    pub data: DataColumn,
    pub atlas: TextureRef,
}

#[derive(Clone, Debug)]
pub struct CompositeColumn {
    pub children: SmallVec<[ColumnId; 8]>,
    pub gap: i32,
}

#[derive(Clone, Debug)]
pub enum ColumnKind {
    Data(DataColumn),
    CountryFlag(CountryFlagColumn),
    Composite(CompositeColumn),
}

#[derive(Clone, Debug)]
pub struct Column {
    pub shared: ColumnShared,
    pub kind: ColumnKind,
}

impl Column {
    /// The wrapped data column, for the two kinds that have one.
    pub fn data(&self) -> Option<&DataColumn> {
        match &self.kind {
            ColumnKind::Data(d) => Some(d),
            ColumnKind::CountryFlag(c) => Some(&c.data),
            ColumnKind::Composite(_) => None,
        }
    }

    pub fn data_mut(&mut self) -> Option<&mut DataColumn> {
        match &mut self.kind {
            ColumnKind::Data(d) => Some(d),
            ColumnKind::CountryFlag(c) => Some(&mut c.data),
            ColumnKind::Composite(_) => None,
        }
    }

    pub fn data_type(&self, inputs: &Inputs) -> DataType {
        match &self.kind {
            ColumnKind::Data(d) => match d.source {
                DataSource::Native(kind) => kind.data_type(),
                DataSource::Custom(idx) => inputs
                    .custom
                    .get(idx)
                    .map_or(DataType::Unknown, |c| c.data_type()),
            },
            ColumnKind::CountryFlag(_) => DataType::Int,
            ColumnKind::Composite(_) => DataType::Unknown,
        }
    }
}

/// Arena of every column the loaded definitions declared, keyed by
/// lowercased internal name. Columns may be registered without being placed
/// on any scoreboard.
#[derive(Clone, Debug, Default)]
pub struct ColumnRegistry {
    columns: Vec<Column>,
    by_name: FxHashMap<String, ColumnId>,
}

/// Latency tint thresholds, in milliseconds.
const PING_GOOD: i32 = 100;
const PING_OK: i32 = 150;
const PING_POOR: i32 = 200;
const PING_GOOD_COLOR: Color = Color::from_hex("#00C000");
const PING_OK_COLOR: Color = Color::from_hex("#FFD700");
const PING_POOR_COLOR: Color = Color::from_hex("#FF8000");
const PING_BAD_COLOR: Color = Color::from_hex("#FF0000");
const QUEUE_FRONT_COLOR: Color = Color::from_hex("#FFD700");
const VOTE_CALLER_COLOR: Color = Color::from_hex("#FFD700");

impl ColumnRegistry {
    pub fn register(&mut self, column: Column) -> Result<ColumnId, String> {
        let key = column.shared.internal_name.to_ascii_lowercase();
        if self.by_name.contains_key(&key) {
            return Err(format!(
                "column '{}' is already defined",
                column.shared.internal_name
            ));
        }
        let id = ColumnId(self.columns.len());
        self.columns.push(column);
        self.by_name.insert(key, id);
        Ok(id)
    }

    pub fn lookup(&self, name: &str) -> Option<ColumnId> {
        self.by_name.get(&name.to_ascii_lowercase()).copied()
    }

    #[inline(always)]
    pub fn get(&self, id: ColumnId) -> &Column {
        &self.columns[id.0]
    }

    #[inline(always)]
    pub fn get_mut(&mut self, id: ColumnId) -> &mut Column {
        &mut self.columns[id.0]
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = ColumnId> {
        (0..self.columns.len()).map(ColumnId)
    }

    /// Precondition for packing a data column into a composite: it must
    /// hide its header, be left-aligned, and not belong to another
    /// composite. Composite columns themselves can never be packed.
    pub fn can_adopt_child(&self, composite: ColumnId, child: ColumnId) -> Result<(), String> {
        let column = self.get(child);
        let name = &column.shared.internal_name;
        let Some(data) = column.data() else {
            return Err(format!("'{name}' is a composite column and cannot be nested"));
        };
        if !column.shared.flags.contains(ColumnFlags::DONT_SHOW_HEADER) {
            return Err(format!(
                "'{name}' must have the 'dontshowheader' flag to join a composite column"
            ));
        }
        if column.shared.alignment != Alignment::Left {
            return Err(format!(
                "'{name}' must be left-aligned to join a composite column"
            ));
        }
        if let Some(owner) = data.owner {
            if owner != composite {
                return Err(format!(
                    "'{name}' already belongs to composite column '{}'",
                    self.get(owner).shared.internal_name
                ));
            }
        }
        Ok(())
    }

    /// Attaches `child` to `composite` after checking the precondition.
    pub fn adopt_child(&mut self, composite: ColumnId, child: ColumnId) -> Result<(), String> {
        self.can_adopt_child(composite, child)?;
        if let Some(data) = self.get_mut(child).data_mut() {
            data.owner = Some(composite);
        }
        let ColumnKind::Composite(comp) = &mut self.get_mut(composite).kind else {
            return Err("adopt_child target is not a composite column".to_string());
        };
        if !comp.children.contains(&child) {
            comp.children.push(child);
        }
        Ok(())
    }

    pub fn detach_child(&mut self, composite: ColumnId, child: ColumnId) {
        if let ColumnKind::Composite(comp) = &mut self.get_mut(composite).kind {
            comp.children.retain(|c| *c != child);
        }
        if let Some(data) = self.get_mut(child).data_mut() {
            if data.owner == Some(composite) {
                data.owner = None;
            }
        }
    }

    /// Session-static gating, evaluated at round start. Composite results
    /// cascade: children of an unusable composite are unusable no matter
    /// what their own gates say.
    pub fn check_usable(&mut self, id: ColumnId, game: &GameState) {
        let usable = compute_usable(&self.get(id).shared, game);
        self.get_mut(id).shared.usable = usable;

        if let ColumnKind::Composite(comp) = &self.get(id).kind {
            let children: SmallVec<[ColumnId; 8]> = comp.children.clone();
            for child in children {
                self.check_usable(child, game);
                if !usable {
                    self.get_mut(child).shared.usable = false;
                }
            }
        }
    }

    /// Per-frame gating: CVar gate, intermission visibility, emptiness.
    pub fn refresh(&mut self, id: ColumnId, inputs: &Inputs) {
        let mut disabled = !self.get(id).shared.usable;

        if !disabled {
            let shared = &self.get(id).shared;
            if let Some(cvar) = &shared.cvar {
                let nonzero = inputs
                    .cvars
                    .get(cvar)
                    .is_some_and(|v| v.is_nonzero());
                let wants_zero = shared.flags.contains(ColumnFlags::CVAR_MUST_BE_ZERO);
                if nonzero == wants_zero {
                    disabled = true;
                }
            }
        }
        if !disabled {
            let flags = self.get(id).shared.flags;
            if flags.contains(ColumnFlags::INTERMISSION_ONLY) && !inputs.game.intermission {
                disabled = true;
            }
            if flags.contains(ColumnFlags::NO_INTERMISSION) && inputs.game.intermission {
                disabled = true;
            }
        }
        if !disabled
            && self.get(id).shared.flags.contains(ColumnFlags::DISABLE_IF_EMPTY)
            && self.get(id).data().is_some()
            && self.all_values_unknown(id, inputs)
        {
            disabled = true;
        }

        {
            let shared = &mut self.get_mut(id).shared;
            shared.disabled = disabled;
            shared.use_short_name =
                inputs.game.prefer_short_names && !shared.short_name.is_empty();
        }

        if let ColumnKind::Composite(comp) = &self.get(id).kind {
            let children: SmallVec<[ColumnId; 8]> = comp.children.clone();
            for child in children {
                self.refresh(child, inputs);
                if disabled {
                    self.get_mut(child).shared.disabled = true;
                }
            }
        }
    }

    fn all_values_unknown(&self, id: ColumnId, inputs: &Inputs) -> bool {
        (0..inputs.game.players.len())
            .filter(|&p| inputs.game.player(p).is_some())
            .all(|p| self.value_for(id, p, inputs).is_unknown())
    }

    /// The live statistic for one player. Unknown for invalid indices and
    /// for statistics whose underlying condition doesn't hold.
    pub fn value_for(&self, id: ColumnId, player: usize, inputs: &Inputs) -> PlayerValue {
        let column = self.get(id);
        let Some(data) = column.data() else {
            return PlayerValue::Unknown;
        };
        let Some(snapshot) = inputs.game.player(player) else {
            return PlayerValue::Unknown;
        };
        match data.source {
            DataSource::Custom(idx) => inputs
                .custom
                .get(idx)
                .map_or(PlayerValue::Unknown, |c| c.value(player)),
            DataSource::Native(kind) => match kind {
                NativeKind::Name => PlayerValue::String(snapshot.name.clone()),
                NativeKind::Time => PlayerValue::Int(snapshot.time),
                NativeKind::Ping => {
                    if snapshot.bot {
                        PlayerValue::Unknown
                    } else {
                        PlayerValue::Int(snapshot.ping)
                    }
                }
                NativeKind::Frags => PlayerValue::Int(snapshot.frags),
                NativeKind::Points => PlayerValue::Int(snapshot.points),
                NativeKind::Wins => PlayerValue::Int(snapshot.wins),
                NativeKind::Kills => PlayerValue::Int(snapshot.kills),
                NativeKind::Deaths => PlayerValue::Int(snapshot.deaths),
                NativeKind::Secrets => PlayerValue::Int(snapshot.secrets),
                NativeKind::Lives => PlayerValue::Int(snapshot.lives),
                NativeKind::Handicap => {
                    if snapshot.handicap > 0 {
                        PlayerValue::Int(snapshot.handicap)
                    } else {
                        PlayerValue::Unknown
                    }
                }
                NativeKind::JoinQueue => snapshot
                    .join_queue_position
                    .map_or(PlayerValue::Unknown, |p| PlayerValue::Int(p as i32)),
                NativeKind::Vote => snapshot.vote.map_or(PlayerValue::Unknown, |v| {
                    PlayerValue::String(if v { "Yes" } else { "No" }.to_string())
                }),
                NativeKind::PlayerColor => PlayerValue::Color(snapshot.color),
                NativeKind::StatusIcon => texture_value(&snapshot.status_icon),
                NativeKind::ReadyIcon => texture_value(&snapshot.ready_icon),
                NativeKind::PlayerIcon => texture_value(&snapshot.player_icon),
                NativeKind::ArtifactIcon => texture_value(&snapshot.artifact_icon),
                NativeKind::BotSkillIcon => texture_value(&snapshot.bot_skill_icon),
                NativeKind::CountryFlag => {
                    PlayerValue::Int(snapshot.country_index.unwrap_or(0) as i32)
                }
            },
        }
    }

    /// Formats a value the way this column displays it: limits applied,
    /// true/false substitution, prefix and suffix attached.
    pub fn format_value(&self, id: ColumnId, value: &PlayerValue) -> String {
        let column = self.get(id);
        let Some(data) = column.data() else {
            return String::new();
        };
        let body = match value {
            PlayerValue::Unknown => return String::new(),
            PlayerValue::Int(v) => v.to_string(),
            PlayerValue::Float(v) => match data.max_length {
                Some(places) => {
                    let scale = 10f32.powi(places as i32);
                    let truncated = (*v * scale).trunc() / scale;
                    format!("{truncated:.places$}")
                }
                None => format!("{v}"),
            },
            PlayerValue::Bool(v) => {
                let text = if *v {
                    data.true_text.as_deref().unwrap_or("True")
                } else {
                    data.false_text.as_deref().unwrap_or("False")
                };
                text.to_string()
            }
            PlayerValue::String(s) => match data.max_length {
                Some(max) if s.chars().count() > max => {
                    let mut cut: String = s.chars().take(max).collect();
                    cut.truncate(cut.trim_end().len());
                    cut.push_str("...");
                    cut
                }
                _ => s.clone(),
            },
            // Graphic payloads have no text form.
            PlayerValue::Color(_) | PlayerValue::Texture(_) => return String::new(),
        };
        format!("{}{body}{}", data.prefix, data.suffix)
    }

    /// On-screen width of one value in this column.
    pub fn value_width(
        &self,
        id: ColumnId,
        value: &PlayerValue,
        canvas: &dyn Canvas,
        row_font: FontHandle,
    ) -> i32 {
        if value.is_unknown() {
            return 0;
        }
        let column = self.get(id);
        match (&column.kind, value) {
            (ColumnKind::CountryFlag(flag), _) => {
                let (w, _) = canvas.texture_size(flag.atlas.handle);
                let cell_w = w / FLAG_ATLAS_GRID.0 as i32;
                column
                    .data()
                    .and_then(|d| d.clip_w)
                    .map_or(cell_w, |clip| cell_w.min(clip))
            }
            (_, PlayerValue::Color(_)) => {
                let data = column.data().expect("color values only occur on data columns");
                data.clip_w.unwrap_or(column.shared.sizing).max(0)
            }
            (_, PlayerValue::Texture(tex)) => {
                let Some(tex) = tex else { return 0 };
                let (w, _) = canvas.texture_size(tex.handle);
                column
                    .data()
                    .and_then(|d| d.clip_w)
                    .map_or(w, |clip| w.min(clip))
            }
            _ => canvas.text_width(row_font, &self.format_value(id, value)),
        }
    }

    /// A child's contribution to its composite's row: value width grown by
    /// the sizing rule that applies to it.
    fn child_slot_width(
        &self,
        child: ColumnId,
        player: usize,
        inputs: &Inputs,
        canvas: &dyn Canvas,
        row_font: FontHandle,
    ) -> i32 {
        let value = self.value_for(child, player, inputs);
        let vw = self.value_width(child, &value, canvas, row_font);
        if vw == 0 {
            return 0;
        }
        let shared = &self.get(child).shared;
        if shared.flags.contains(ColumnFlags::ALWAYS_USE_SHORTEST_WIDTH) {
            vw + shared.sizing
        } else {
            vw.max(shared.sizing)
        }
    }

    /// A composite's full row width for one player: enabled, non-empty
    /// children plus the gaps between them.
    pub fn row_width(
        &self,
        id: ColumnId,
        player: usize,
        inputs: &Inputs,
        canvas: &dyn Canvas,
        row_font: FontHandle,
    ) -> i32 {
        let ColumnKind::Composite(comp) = &self.get(id).kind else {
            return 0;
        };
        let mut total = 0;
        for &child in &comp.children {
            if self.get(child).shared.disabled {
                continue;
            }
            let slot = self.child_slot_width(child, player, inputs, canvas, row_font);
            if slot == 0 {
                continue;
            }
            if total > 0 {
                total += comp.gap;
            }
            total += slot;
        }
        total
    }

    /// Recomputes shortest width and applies the sizing policy. A resulting
    /// width of zero disables the column.
    pub fn update_width(
        &mut self,
        id: ColumnId,
        inputs: &Inputs,
        canvas: &dyn Canvas,
        row_font: FontHandle,
        header_font: FontHandle,
    ) {
        if self.get(id).shared.disabled {
            return;
        }

        let is_composite = matches!(self.get(id).kind, ColumnKind::Composite(_));
        let skip_spectators = self
            .get(id)
            .shared
            .flags
            .contains(ColumnFlags::NO_SPECTATORS);

        let mut content = 0;
        for player in 0..inputs.game.players.len() {
            let Some(snapshot) = inputs.game.player(player) else {
                continue;
            };
            if skip_spectators && snapshot.spectator {
                continue;
            }
            let w = if is_composite {
                self.row_width(id, player, inputs, canvas, row_font)
            } else {
                let value = self.value_for(id, player, inputs);
                self.value_width(id, &value, canvas, row_font)
            };
            content = content.max(w);
        }

        let shared = &self.get(id).shared;
        let mut shortest = content;
        // An empty composite collapses entirely; its header alone cannot
        // hold it open.
        if !(is_composite && content == 0)
            && !shared.flags.contains(ColumnFlags::DONT_SHOW_HEADER)
        {
            shortest = shortest.max(canvas.text_width(header_font, shared.header_text()));
        }

        let width = if shared.flags.contains(ColumnFlags::ALWAYS_USE_SHORTEST_WIDTH) {
            // Sizing acts as padding around the content.
            if shortest == 0 { 0 } else { shortest + shared.sizing }
        } else {
            shortest.max(shared.sizing)
        };

        let shared = &mut self.get_mut(id).shared;
        shared.shortest_width = shortest;
        shared.width = width;
        if width == 0 {
            shared.disabled = true;
        }
    }

    /// Paints one cell. The row color may be overridden per native kind
    /// (latency tint, queue front, vote caller).
    #[allow(clippy::too_many_arguments)]
    pub fn draw_value(
        &mut self,
        id: ColumnId,
        player: usize,
        row_y: i32,
        row_h: i32,
        row_color: Color,
        alpha: f32,
        inputs: &Inputs,
        canvas: &mut dyn Canvas,
        row_font: FontHandle,
    ) {
        if self.get(id).shared.disabled {
            return;
        }
        if let ColumnKind::Composite(_) = self.get(id).kind {
            self.draw_composite_row(
                id, player, row_y, row_h, row_color, alpha, inputs, canvas, row_font,
            );
            return;
        }

        let value = self.value_for(id, player, inputs);
        if value.is_unknown() {
            return;
        }
        let column = self.get(id);
        let shared = &column.shared;
        let (box_x, box_w) = (shared.x, shared.width);

        match (&column.kind, &value) {
            (ColumnKind::CountryFlag(flag), PlayerValue::Int(index)) => {
                let (w, h) = canvas.texture_size(flag.atlas.handle);
                let cell_w = w / FLAG_ATLAS_GRID.0 as i32;
                let cell_h = h / FLAG_ATLAS_GRID.1 as i32;
                let x = shared.alignment.position(box_x, box_w, cell_w);
                let y = row_y + (row_h - cell_h) / 2;
                let cells = FLAG_ATLAS_GRID.0 * FLAG_ATLAS_GRID.1;
                let cell = (*index).clamp(0, cells as i32 - 1) as u32;
                canvas.draw_texture_cell(flag.atlas.handle, x, y, FLAG_ATLAS_GRID, cell, alpha);
            }
            (_, PlayerValue::Color(fill)) => {
                let data = column.data().expect("color values only occur on data columns");
                let w = data.clip_w.unwrap_or(box_w).min(box_w);
                let h = data.clip_h.unwrap_or(row_h).min(row_h);
                let x = shared.alignment.position(box_x, box_w, w);
                let y = row_y + (row_h - h) / 2;
                canvas.draw_box(x, y, w, h, *fill, alpha);
            }
            (_, PlayerValue::Texture(Some(tex))) => {
                let data = column.data().expect("texture values only occur on data columns");
                let (tw, th) = canvas.texture_size(tex.handle);
                let w = data.clip_w.map_or(tw, |c| tw.min(c));
                let h = data.clip_h.map_or(th, |c| th.min(c));
                let x = shared.alignment.position(box_x, box_w, w);
                let y = row_y + (row_h - h) / 2;
                let clip = (w != tw || h != th).then_some(ClipRect { x, y, w, h });
                canvas.draw_texture(tex.handle, x, y, alpha, clip);
            }
            (_, PlayerValue::Texture(None)) => {}
            _ => {
                let text = self.format_value(id, &value);
                if text.is_empty() {
                    return;
                }
                let color = self.override_color(id, player, &value, inputs).unwrap_or(row_color);
                let tw = canvas.text_width(row_font, &text);
                let x = shared.alignment.position(box_x, box_w, tw);
                let y = row_y + (row_h - canvas.font_height(row_font)) / 2;
                let clip = ClipRect {
                    x: box_x,
                    y: row_y,
                    w: box_w,
                    h: row_h,
                };
                canvas.draw_text(row_font, &text, x, y, color, alpha, Some(clip));
            }
        }
    }

    fn override_color(
        &self,
        id: ColumnId,
        player: usize,
        value: &PlayerValue,
        inputs: &Inputs,
    ) -> Option<Color> {
        let data = self.get(id).data()?;
        let DataSource::Native(kind) = data.source else {
            return None;
        };
        match kind {
            NativeKind::Ping if inputs.game.colorize_pings => {
                let ping = value.as_int();
                Some(if ping < PING_GOOD {
                    PING_GOOD_COLOR
                } else if ping < PING_OK {
                    PING_OK_COLOR
                } else if ping < PING_POOR {
                    PING_POOR_COLOR
                } else {
                    PING_BAD_COLOR
                })
            }
            NativeKind::JoinQueue if value.as_int() == 0 => Some(QUEUE_FRONT_COLOR),
            NativeKind::Vote if inputs.game.vote_caller == Some(player) => {
                Some(VOTE_CALLER_COLOR)
            }
            _ => None,
        }
    }

    /// Composite rows paint children inline: each child gets a synthetic
    /// position and width for the duration of its own draw call, then both
    /// are cleared; children never participate in the top-level layout.
    #[allow(clippy::too_many_arguments)]
    fn draw_composite_row(
        &mut self,
        id: ColumnId,
        player: usize,
        row_y: i32,
        row_h: i32,
        row_color: Color,
        alpha: f32,
        inputs: &Inputs,
        canvas: &mut dyn Canvas,
        row_font: FontHandle,
    ) {
        let ColumnKind::Composite(comp) = &self.get(id).kind else {
            return;
        };
        let gap = comp.gap;
        let children: SmallVec<[ColumnId; 8]> = comp.children.clone();
        let mut cursor = self.get(id).shared.x;

        for child in children {
            if self.get(child).shared.disabled {
                continue;
            }
            let slot = self.child_slot_width(child, player, inputs, canvas, row_font);
            if slot == 0 {
                continue;
            }
            {
                let shared = &mut self.get_mut(child).shared;
                shared.x = cursor;
                shared.width = slot;
            }
            self.draw_value(
                child, player, row_y, row_h, row_color, alpha, inputs, canvas, row_font,
            );
            {
                let shared = &mut self.get_mut(child).shared;
                shared.x = 0;
                shared.width = 0;
            }
            cursor += slot + gap;
        }
    }

    pub fn draw_header(
        &self,
        id: ColumnId,
        y: i32,
        header_h: i32,
        color: Color,
        alpha: f32,
        canvas: &mut dyn Canvas,
        header_font: FontHandle,
    ) {
        let shared = &self.get(id).shared;
        if shared.disabled || shared.flags.contains(ColumnFlags::DONT_SHOW_HEADER) {
            return;
        }
        let text = shared.header_text();
        if text.is_empty() {
            return;
        }
        let tw = canvas.text_width(header_font, text);
        let x = shared.alignment.position(shared.x, shared.width, tw);
        let ty = y + (header_h - canvas.font_height(header_font)) / 2;
        canvas.draw_text(header_font, text, x, ty, color, alpha, None);
    }
}

fn texture_value(tex: &Option<TextureRef>) -> PlayerValue {
    match tex {
        Some(t) => PlayerValue::Texture(Some(t.clone())),
        None => PlayerValue::Unknown,
    }
}

fn compute_usable(shared: &ColumnShared, game: &GameState) -> bool {
    if shared.game_modes != 0 && shared.game_modes & game.mode.bit() == 0 {
        return false;
    }
    if shared.game_type_mask & game.game_type == 0 {
        return false;
    }
    if shared.earn_type_mask & game.earn_type == 0 {
        return false;
    }
    let f = shared.flags;
    if f.contains(ColumnFlags::REQUIRES_TEAMS) && !game.players_on_teams {
        return false;
    }
    if f.contains(ColumnFlags::FORBID_TEAMS) && game.players_on_teams {
        return false;
    }
    if f.contains(ColumnFlags::REQUIRES_LIVES) && !game.players_have_lives {
        return false;
    }
    if f.contains(ColumnFlags::FORBID_LIVES) && game.players_have_lives {
        return false;
    }
    if f.contains(ColumnFlags::REQUIRES_TEAM_ITEMS) && !game.use_team_item {
        return false;
    }
    if f.contains(ColumnFlags::FORBID_TEAM_ITEMS) && game.use_team_item {
        return false;
    }
    if f.contains(ColumnFlags::OFFLINE_ONLY) && game.role != NetworkRole::Offline {
        return false;
    }
    if f.contains(ColumnFlags::ONLINE_ONLY) && game.role == NetworkRole::Offline {
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{earntype, gametype, PlayerSnapshot};
    use crate::headless::{HeadlessCanvas, MapCvars};
    use crate::value::CustomDataStore;

    fn data_column(name: &str, kind: NativeKind, flags: ColumnFlags) -> Column {
        let mut shared = ColumnShared::new(name);
        shared.flags = flags;
        Column {
            shared,
            kind: ColumnKind::Data(DataColumn::new(DataSource::Native(kind))),
        }
    }

    fn simple_game(frag_counts: &[i32]) -> GameState {
        let mut game = GameState {
            game_type: gametype::DEATHMATCH,
            earn_type: earntype::FRAGS,
            mode: crate::context::GameMode::Deathmatch,
            ..GameState::default()
        };
        for (i, &frags) in frag_counts.iter().enumerate() {
            game.players[i] = Some(PlayerSnapshot {
                name: format!("Player{i}"),
                frags,
                ..PlayerSnapshot::default()
            });
        }
        game
    }

    #[test]
    fn flag_names_resolve() {
        assert_eq!(
            flag_by_name("DontShowHeader"),
            Some(ColumnFlags::DONT_SHOW_HEADER)
        );
        assert_eq!(flag_by_name("bogus"), None);
    }

    #[test]
    fn country_codes_map_to_atlas_cells() {
        assert_eq!(country_atlas_index("??"), 0);
        assert_eq!(country_atlas_index("DE"), country_atlas_index("de"));
        assert_ne!(country_atlas_index("us"), 0);
        assert_eq!(country_atlas_index("zz"), 0, "unknown code falls back");
    }

    #[test]
    fn composite_rejects_ineligible_children() {
        let mut reg = ColumnRegistry::default();
        let comp = reg
            .register(Column {
                shared: ColumnShared::new("packed"),
                kind: ColumnKind::Composite(CompositeColumn {
                    children: SmallVec::new(),
                    gap: 2,
                }),
            })
            .unwrap();

        // Missing the hidden-header flag.
        let no_flag = reg
            .register(data_column("frags", NativeKind::Frags, ColumnFlags::empty()))
            .unwrap();
        assert!(reg.adopt_child(comp, no_flag).is_err());

        // Wrong alignment.
        let mut right = data_column("deaths", NativeKind::Deaths, ColumnFlags::DONT_SHOW_HEADER);
        right.shared.alignment = Alignment::Right;
        let right = reg.register(right).unwrap();
        assert!(reg.adopt_child(comp, right).is_err());

        // Eligible child adopts fine, but cannot join a second composite.
        let ok = reg
            .register(data_column("wins", NativeKind::Wins, ColumnFlags::DONT_SHOW_HEADER))
            .unwrap();
        reg.adopt_child(comp, ok).unwrap();
        let other = reg
            .register(Column {
                shared: ColumnShared::new("other"),
                kind: ColumnKind::Composite(CompositeColumn {
                    children: SmallVec::new(),
                    gap: 0,
                }),
            })
            .unwrap();
        assert!(reg.adopt_child(other, ok).is_err());
    }

    #[test]
    fn unusable_composite_cascades_to_children() {
        let mut reg = ColumnRegistry::default();
        let comp_id = {
            let mut shared = ColumnShared::new("packed");
            // Only usable in team games.
            shared.flags = ColumnFlags::REQUIRES_TEAMS;
            reg.register(Column {
                shared,
                kind: ColumnKind::Composite(CompositeColumn {
                    children: SmallVec::new(),
                    gap: 0,
                }),
            })
            .unwrap()
        };
        let child = reg
            .register(data_column("frags", NativeKind::Frags, ColumnFlags::DONT_SHOW_HEADER))
            .unwrap();
        reg.adopt_child(comp_id, child).unwrap();

        // A non-team game: the child's own gates would pass, but the parent
        // is hidden, so the child must be too.
        let game = simple_game(&[1, 2]);
        reg.check_usable(comp_id, &game);
        assert!(!reg.get(comp_id).shared.usable);
        assert!(!reg.get(child).shared.usable, "cascade must force children off");
    }

    #[test]
    fn cvar_gate_and_must_be_zero() {
        let mut reg = ColumnRegistry::default();
        let id = reg
            .register(data_column(
                "frags",
                NativeKind::Frags,
                ColumnFlags::CVAR_MUST_BE_ZERO,
            ))
            .unwrap();
        reg.get_mut(id).shared.cvar = Some("sv_awarddamage".to_string());

        let game = simple_game(&[3]);
        let custom = CustomDataStore::default();
        let mut cvars = MapCvars::default();
        cvars.set_int("sv_awarddamage", 1);

        reg.check_usable(id, &game);
        let inputs = Inputs {
            game: &game,
            custom: &custom,
            cvars: &cvars,
        };
        reg.refresh(id, &inputs);
        assert!(
            reg.get(id).shared.disabled,
            "non-zero cvar must disable a must-be-zero column"
        );

        cvars.set_int("sv_awarddamage", 0);
        let inputs = Inputs {
            game: &game,
            custom: &custom,
            cvars: &cvars,
        };
        reg.refresh(id, &inputs);
        assert!(reg.get(id).shared.enabled());
    }

    #[test]
    fn disable_if_empty_and_width_policies() {
        let canvas = HeadlessCanvas::new(640, 480);
        let font = canvas.font("SmallFont").unwrap();
        let mut reg = ColumnRegistry::default();
        let custom = CustomDataStore::default();
        let cvars = MapCvars::default();

        // Nobody has a handicap, so this column empties out.
        let handicap = reg
            .register(data_column(
                "handicap",
                NativeKind::Handicap,
                ColumnFlags::DISABLE_IF_EMPTY,
            ))
            .unwrap();
        // Frags sized wider than its content.
        let frags = {
            let mut c = data_column("frags", NativeKind::Frags, ColumnFlags::empty());
            c.shared.sizing = 40;
            reg.register(c).unwrap()
        };
        // Name pads its shortest width by its sizing.
        let name = {
            let mut c = data_column(
                "name",
                NativeKind::Name,
                ColumnFlags::ALWAYS_USE_SHORTEST_WIDTH,
            );
            c.shared.sizing = 4;
            reg.register(c).unwrap()
        };

        let game = simple_game(&[5, 12]);
        let inputs = Inputs {
            game: &game,
            custom: &custom,
            cvars: &cvars,
        };
        for id in [handicap, frags, name] {
            reg.check_usable(id, &game);
            reg.refresh(id, &inputs);
            reg.update_width(id, &inputs, &canvas, font, font);
        }

        assert!(reg.get(handicap).shared.disabled);
        assert_eq!(reg.get(handicap).shared.width, 0);

        // "frags" header (5 chars * 8px) = 40; values are narrower.
        assert_eq!(reg.get(frags).shared.width, 40);
        assert!(reg.get(frags).shared.width >= reg.get(frags).shared.shortest_width);

        // Longest name "Player0" is 7 chars = 56px, header "name" = 32px;
        // shortest 56, plus 4px sizing-as-padding.
        assert_eq!(reg.get(name).shared.shortest_width, 56);
        assert_eq!(reg.get(name).shared.width, 60);
    }

    #[test]
    fn format_value_applies_limits_and_affixes() {
        let mut reg = ColumnRegistry::default();
        let id = {
            let mut c = data_column("name", NativeKind::Name, ColumnFlags::empty());
            if let Some(d) = c.data_mut() {
                d.max_length = Some(6);
                d.prefix = "[".to_string();
                d.suffix = "]".to_string();
            }
            reg.register(c).unwrap()
        };
        assert_eq!(
            reg.format_value(id, &PlayerValue::String("Abcdefghij".into())),
            "[Abcdef...]"
        );
        assert_eq!(reg.format_value(id, &PlayerValue::Unknown), "");

        let float_col = {
            let mut c = data_column("avg", NativeKind::Frags, ColumnFlags::empty());
            if let Some(d) = c.data_mut() {
                d.max_length = Some(2);
            }
            reg.register(c).unwrap()
        };
        assert_eq!(
            reg.format_value(float_col, &PlayerValue::Float(1.987)),
            "1.98",
            "float precision truncates, not rounds"
        );
    }

    #[test]
    fn ping_override_uses_thresholds() {
        let mut reg = ColumnRegistry::default();
        let id = reg
            .register(data_column("ping", NativeKind::Ping, ColumnFlags::empty()))
            .unwrap();
        let game = {
            let mut g = simple_game(&[0]);
            g.players[0].as_mut().unwrap().ping = 170;
            g
        };
        let custom = CustomDataStore::default();
        let cvars = MapCvars::default();
        let inputs = Inputs {
            game: &game,
            custom: &custom,
            cvars: &cvars,
        };
        let value = reg.value_for(id, 0, &inputs);
        assert_eq!(
            reg.override_color(id, 0, &value, &inputs),
            Some(PING_POOR_COLOR)
        );
    }
}
