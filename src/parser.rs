//! SCORINFO construction entry point: parses definition chunks into the
//! column registry, the custom-data store, and the scoreboard. Everything is
//! resolved and validated here; nothing that parses successfully can fail at
//! render time for a definition-level reason.

use crate::color::{parse_color_or_warn, Color};
use crate::column::{
    flag_by_name, Alignment, Column, ColumnFlags, ColumnId, ColumnKind, ColumnRegistry,
    ColumnShared, CompositeColumn, CountryFlagColumn, DataColumn, DataSource, NativeKind,
};
use crate::context::{
    earntype, gametype, Canvas, CvarStore, CvarValue, FontHandle, GameMode, GameState,
    TextureRef,
};
use crate::margin::{
    BlockCommand, BlockLayout, CompareOp, ConditionalCommand, DrawColorCommand,
    DrawStringCommand, DrawTextureCommand, ElementBase, MarginCommand, MarginKind, Predicate,
    SpecialToken, StringChunk, VerticalAlign,
};
use crate::scanner::{Scanner, Token};
use crate::scoreboard::Scoreboard;
use crate::value::{CustomDataStore, DataType};
use log::warn;
use smallvec::SmallVec;

/// Atlas every country-flag column indexes into.
const FLAG_ATLAS_TEXTURE: &str = "CTRYFLAG";

/// The font every scoreboard starts out with until its block says otherwise.
const DEFAULT_FONT: &str = "SmallFont";

/// Everything one load of SCORINFO definitions produces. Rebuilt wholesale
/// on reparse; the previous set's object graph drops with it.
#[derive(Debug)]
pub struct ScorinfoSet {
    pub registry: ColumnRegistry,
    pub custom: CustomDataStore,
    pub scoreboard: Scoreboard,
}

impl ScorinfoSet {
    /// Renders one frame, refreshing first if this frame hasn't been seen.
    pub fn render(
        &mut self,
        game: &GameState,
        cvars: &dyn CvarStore,
        canvas: &mut dyn Canvas,
        frame: u64,
    ) {
        let inputs = crate::context::Inputs {
            game,
            custom: &self.custom,
            cvars,
        };
        self.scoreboard
            .render(&mut self.registry, &inputs, canvas, frame);
    }

    /// Round or game restart: custom data returns to its defaults and the
    /// session-static column gates are re-evaluated on the next refresh.
    pub fn new_round(&mut self, canvas: &dyn Canvas) {
        self.custom.reset_all(canvas);
        self.scoreboard.invalidate_usability();
    }
}

/// Parses one SCORINFO definition chunk.
pub fn parse(
    src: &str,
    canvas: &dyn Canvas,
    cvars: &dyn CvarStore,
) -> Result<ScorinfoSet, String> {
    parse_chunks(&[src], canvas, cvars)
}

/// Parses every loaded definition chunk additively into one set. Any error
/// aborts the whole load; no partial set is returned.
pub fn parse_chunks(
    chunks: &[&str],
    canvas: &dyn Canvas,
    cvars: &dyn CvarStore,
) -> Result<ScorinfoSet, String> {
    let default_font = canvas
        .font(DEFAULT_FONT)
        .ok_or_else(|| format!("font '{DEFAULT_FONT}' must be registered before parsing"))?;
    let mut parser = Parser {
        canvas,
        cvars,
        registry: ColumnRegistry::default(),
        custom: CustomDataStore::default(),
        scoreboard: Scoreboard::new(default_font),
    };
    for chunk in chunks {
        parser.parse_chunk(chunk)?;
    }
    parser.finish()
}

// Command masks for the named-parameter tables.
const DRAW_STRING: u8 = 1 << 0;
const DRAW_COLOR: u8 = 1 << 1;
const DRAW_TEXTURE: u8 = 1 << 2;
const MULTI_LINE_BLOCK: u8 = 1 << 3;
const ROW_BLOCK: u8 = 1 << 4;
const ELEMENTS: u8 = DRAW_STRING | DRAW_COLOR | DRAW_TEXTURE;
const ALL_COMMANDS: u8 = ELEMENTS | MULTI_LINE_BLOCK | ROW_BLOCK;

const fn command_name(cmd: u8) -> &'static str {
    match cmd {
        DRAW_STRING => "DrawString",
        DRAW_COLOR => "DrawColor",
        DRAW_TEXTURE => "DrawTexture",
        MULTI_LINE_BLOCK => "MultiLineBlock",
        ROW_BLOCK => "RowBlock",
        _ => "margin command",
    }
}

struct ParamSpec {
    name: &'static str,
    /// Which commands may carry this parameter.
    allowed: u8,
    /// Which commands must carry it.
    required: u8,
}

static MARGIN_PARAMS: &[ParamSpec] = &[
    ParamSpec { name: "value", allowed: ELEMENTS, required: ELEMENTS },
    ParamSpec { name: "x", allowed: ALL_COMMANDS, required: 0 },
    ParamSpec { name: "y", allowed: ALL_COMMANDS, required: 0 },
    ParamSpec { name: "horizontalalign", allowed: ALL_COMMANDS, required: 0 },
    ParamSpec { name: "verticalalign", allowed: ALL_COMMANDS, required: 0 },
    ParamSpec { name: "bottompadding", allowed: ALL_COMMANDS, required: 0 },
    ParamSpec { name: "rightpadding", allowed: ALL_COMMANDS, required: 0 },
    ParamSpec { name: "alpha", allowed: ALL_COMMANDS, required: 0 },
    ParamSpec { name: "font", allowed: DRAW_STRING, required: DRAW_STRING },
    ParamSpec { name: "textcolor", allowed: DRAW_STRING, required: 0 },
    ParamSpec { name: "gapsize", allowed: DRAW_STRING, required: 0 },
    ParamSpec { name: "width", allowed: DRAW_COLOR, required: DRAW_COLOR },
    ParamSpec { name: "height", allowed: DRAW_COLOR, required: DRAW_COLOR },
];

/// Scratch for one command's parsed parameter list.
struct ParsedParams {
    seen: u32,
    chunks: SmallVec<[StringChunk; 4]>,
    color: Color,
    texture: Option<TextureRef>,
    x: i32,
    y: i32,
    halign: Alignment,
    valign: VerticalAlign,
    bottom_padding: i32,
    right_padding: i32,
    alpha: f32,
    font: Option<FontHandle>,
    text_color: Color,
    gap_size: i32,
    width: i32,
    height: i32,
}

impl Default for ParsedParams {
    fn default() -> Self {
        Self {
            seen: 0,
            chunks: SmallVec::new(),
            color: Color::WHITE,
            texture: None,
            x: 0,
            y: 0,
            halign: Alignment::default(),
            valign: VerticalAlign::default(),
            bottom_padding: 0,
            right_padding: 0,
            alpha: 1.0,
            font: None,
            text_color: Color::WHITE,
            gap_size: 0,
            width: 0,
            height: 0,
        }
    }
}

impl ParsedParams {
    fn apply_base(&self, base: &mut ElementBase) {
        base.x = self.x;
        base.y = self.y;
        base.halign = self.halign;
        base.valign = self.valign;
        base.bottom_padding = self.bottom_padding;
        base.right_padding = self.right_padding;
        base.alpha = self.alpha;
    }
}

enum TypeSpec {
    Native(NativeKind),
    Custom,
}

/// Per-column scratch while its block parses; turned into a registered
/// `Column` once the closing brace is reached.
struct ColumnBuilder {
    shared: ColumnShared,
    type_spec: Option<TypeSpec>,
    max_length: Option<usize>,
    prefix: String,
    suffix: String,
    clip_w: Option<i32>,
    clip_h: Option<i32>,
    true_text: Option<String>,
    false_text: Option<String>,
    data_type: Option<DataType>,
    default_value: Option<String>,
}

impl ColumnBuilder {
    fn new(name: &str) -> Self {
        Self {
            shared: ColumnShared::new(name),
            type_spec: None,
            max_length: None,
            prefix: String::new(),
            suffix: String::new(),
            clip_w: None,
            clip_h: None,
            true_text: None,
            false_text: None,
            data_type: None,
            default_value: None,
        }
    }
}

struct Parser<'a> {
    canvas: &'a dyn Canvas,
    cvars: &'a dyn CvarStore,
    registry: ColumnRegistry,
    custom: CustomDataStore,
    scoreboard: Scoreboard,
}

impl Parser<'_> {
    fn parse_chunk(&mut self, src: &str) -> Result<(), String> {
        let mut sc = Scanner::new(src);
        while let Some(token) = sc.next_token()? {
            let word = match token {
                Token::Identifier(word) => word,
                other => {
                    return Err(sc.err(format!("expected a block keyword, got {other}")));
                }
            };
            match word.to_ascii_lowercase().as_str() {
                "scoreboard" => self.parse_scoreboard_block(&mut sc)?,
                "column" => self.parse_data_column_block(&mut sc)?,
                "compositecolumn" => self.parse_composite_block(&mut sc)?,
                other => return Err(sc.err(format!("unknown block '{other}'"))),
            }
        }
        Ok(())
    }

    /// Checks that hold across the whole set once every chunk is in.
    fn finish(self) -> Result<ScorinfoSet, String> {
        for &id in &self.scoreboard.rank_order {
            let direct = self.scoreboard.column_order.contains(&id);
            let via_parent = self
                .registry
                .get(id)
                .data()
                .and_then(|d| d.owner)
                .is_some_and(|owner| self.scoreboard.column_order.contains(&owner));
            if !direct && !via_parent {
                return Err(format!(
                    "rank order column '{}' does not appear in the column order",
                    self.registry.get(id).shared.internal_name
                ));
            }
        }
        Ok(ScorinfoSet {
            registry: self.registry,
            custom: self.custom,
            scoreboard: self.scoreboard,
        })
    }

    // ----- shared value helpers ---------------------------------------

    fn font_value(&self, sc: &mut Scanner) -> Result<FontHandle, String> {
        let name = sc.must_get_string()?;
        self.canvas
            .font(&name)
            .ok_or_else(|| sc.err(format!("unknown font '{name}'")))
    }

    fn texture_value(&self, sc: &mut Scanner) -> Result<TextureRef, String> {
        let name = sc.must_get_string()?;
        let handle = self
            .canvas
            .texture(&name)
            .ok_or_else(|| sc.err(format!("unknown texture '{name}'")))?;
        Ok(TextureRef { name, handle })
    }

    fn color_value(&self, sc: &mut Scanner, what: &str) -> Result<Color, String> {
        let text = sc.must_get_string()?;
        Ok(parse_color_or_warn(&text, what))
    }

    fn cvar_name_value(&self, sc: &mut Scanner) -> Result<String, String> {
        let name = sc.must_get_string()?;
        if self.cvars.get(&name).is_none() {
            return Err(sc.err(format!("unknown cvar '{name}'")));
        }
        Ok(name)
    }

    /// `a, b, c` where each item may be quoted or bare.
    fn name_list(&self, sc: &mut Scanner) -> Result<Vec<String>, String> {
        let mut names = vec![sc.must_get_string()?];
        while sc.check_symbol(',')? {
            names.push(sc.must_get_string()?);
        }
        Ok(names)
    }

    fn column_list(&self, sc: &mut Scanner) -> Result<Vec<ColumnId>, String> {
        self.name_list(sc)?
            .into_iter()
            .map(|name| {
                self.registry
                    .lookup(&name)
                    .ok_or_else(|| sc.err(format!("unknown column '{name}'")))
            })
            .collect()
    }

    fn game_mode_mask(&self, sc: &mut Scanner) -> Result<u32, String> {
        let mut mask = 0;
        for name in self.name_list(sc)? {
            let mode: GameMode = name.parse().map_err(|e: String| sc.err(e))?;
            mask |= mode.bit();
        }
        Ok(mask)
    }

    fn game_type_mask(&self, sc: &mut Scanner) -> Result<u32, String> {
        let mut mask = 0;
        for name in self.name_list(sc)? {
            mask |= match name.to_ascii_lowercase().as_str() {
                "cooperative" => gametype::COOPERATIVE,
                "deathmatch" => gametype::DEATHMATCH,
                "teamgame" => gametype::TEAMGAME,
                other => return Err(sc.err(format!("'{other}' is not a game type"))),
            };
        }
        Ok(mask)
    }

    fn earn_type_mask(&self, sc: &mut Scanner) -> Result<u32, String> {
        let mut mask = 0;
        for name in self.name_list(sc)? {
            mask |= match name.to_ascii_lowercase().as_str() {
                "frags" => earntype::FRAGS,
                "points" => earntype::POINTS,
                "wins" => earntype::WINS,
                "kills" => earntype::KILLS,
                other => return Err(sc.err(format!("'{other}' is not an earn type"))),
            };
        }
        Ok(mask)
    }

    // ----- column blocks ----------------------------------------------

    /// Commands both column kinds accept. Returns false when the command
    /// isn't one of them.
    fn generic_column_command(
        &self,
        sc: &mut Scanner,
        command: &str,
        shared: &mut ColumnShared,
    ) -> Result<bool, String> {
        match command {
            "addflag" => {
                for name in self.name_list(sc)? {
                    let flag = flag_by_name(&name)
                        .ok_or_else(|| sc.err(format!("unknown column flag '{name}'")))?;
                    shared.flags |= flag;
                }
            }
            "removeflag" => {
                for name in self.name_list(sc)? {
                    let flag = flag_by_name(&name)
                        .ok_or_else(|| sc.err(format!("unknown column flag '{name}'")))?;
                    shared.flags -= flag;
                }
            }
            "displayname" => {
                let text = sc.must_get_string()?;
                if text.is_empty() {
                    warn!(
                        "column '{}': empty display name ignored",
                        shared.internal_name
                    );
                } else {
                    shared.display_name = text;
                }
            }
            "shortname" => {
                let text = sc.must_get_string()?;
                if text.is_empty() {
                    warn!("column '{}': empty short name ignored", shared.internal_name);
                } else {
                    shared.short_name = text;
                }
            }
            "alignment" => {
                let text = sc.must_get_identifier()?;
                shared.alignment = text.parse().map_err(|e: String| sc.err(e))?;
            }
            "size" => shared.sizing = sc.must_get_number()?.max(0),
            "gamemode" => shared.game_modes = self.game_mode_mask(sc)?,
            "gametype" => shared.game_type_mask = self.game_type_mask(sc)?,
            "earntype" => shared.earn_type_mask = self.earn_type_mask(sc)?,
            "cvar" => shared.cvar = Some(self.cvar_name_value(sc)?),
            _ => return Ok(false),
        }
        Ok(true)
    }

    /// Checks shared to both kinds, run at the closing brace.
    fn validate_shared(&self, sc: &Scanner, shared: &ColumnShared) -> Result<(), String> {
        let name = &shared.internal_name;
        if shared.flags.contains(ColumnFlags::OFFLINE_ONLY)
            && shared.flags.contains(ColumnFlags::ONLINE_ONLY)
        {
            return Err(sc.err(format!(
                "column '{name}' cannot be both offline-only and online-only"
            )));
        }
        if shared.short_name.chars().count() > shared.display_name.chars().count() {
            return Err(sc.err(format!(
                "column '{name}' has a short name longer than its display name"
            )));
        }
        Ok(())
    }

    fn parse_data_column_block(&mut self, sc: &mut Scanner) -> Result<(), String> {
        let name = sc.must_get_string()?;
        sc.must_get_symbol('{')?;
        let mut b = ColumnBuilder::new(&name);

        loop {
            if sc.check_symbol('}')? {
                break;
            }
            let command = sc.must_get_identifier()?.to_ascii_lowercase();
            sc.must_get_symbol('=')?;
            if self.generic_column_command(sc, &command, &mut b.shared)? {
                continue;
            }
            match command.as_str() {
                "type" => {
                    let text = sc.must_get_identifier()?;
                    b.type_spec = if text.eq_ignore_ascii_case("custom") {
                        Some(TypeSpec::Custom)
                    } else {
                        let kind = NativeKind::from_name(&text)
                            .ok_or_else(|| sc.err(format!("unknown column type '{text}'")))?;
                        Some(TypeSpec::Native(kind))
                    };
                }
                "maxlength" => {
                    let n = sc.must_get_number()?;
                    if n < 0 {
                        return Err(sc.err("MaxLength cannot be negative"));
                    }
                    b.max_length = Some(n as usize);
                }
                "prefix" => b.prefix = sc.must_get_string()?,
                "suffix" => b.suffix = sc.must_get_string()?,
                "cliprectwidth" => b.clip_w = Some(sc.must_get_number()?.max(0)),
                "cliprectheight" => b.clip_h = Some(sc.must_get_number()?.max(0)),
                "truetext" => b.true_text = Some(sc.must_get_string()?),
                "falsetext" => b.false_text = Some(sc.must_get_string()?),
                "datatype" => {
                    let text = sc.must_get_identifier()?;
                    b.data_type = Some(text.parse().map_err(|e: String| sc.err(e))?);
                }
                "defaultvalue" => b.default_value = Some(sc.must_get_string()?),
                other => {
                    return Err(sc.err(format!("unknown column command '{other}'")));
                }
            }
        }

        self.finish_data_column(sc, b)
    }

    fn finish_data_column(&mut self, sc: &Scanner, b: ColumnBuilder) -> Result<(), String> {
        let name = b.shared.internal_name.clone();
        let source = match b.type_spec {
            None => return Err(sc.err(format!("column '{name}' has no Type"))),
            Some(TypeSpec::Custom) => {
                let data_type = b
                    .data_type
                    .ok_or_else(|| sc.err(format!("custom column '{name}' needs a DataType")))?;
                let index = self
                    .custom
                    .register(&name, data_type, b.default_value.unwrap_or_default())
                    .map_err(|e| sc.err(e))?;
                DataSource::Custom(index)
            }
            Some(TypeSpec::Native(kind)) => {
                if b.data_type.is_some() || b.default_value.is_some() {
                    return Err(sc.err(format!(
                        "column '{name}': DataType and DefaultValue are only for custom columns"
                    )));
                }
                DataSource::Native(kind)
            }
        };

        self.validate_shared(sc, &b.shared)?;

        // Text columns with no width floor and no padding policy would
        // collapse to nothing; refuse them up front.
        let data_type = match source {
            DataSource::Native(kind) => kind.data_type(),
            DataSource::Custom(index) => self
                .custom
                .get(index)
                .map_or(DataType::Unknown, |c| c.data_type()),
        };
        let is_text = matches!(
            data_type,
            DataType::Int | DataType::Bool | DataType::Float | DataType::String
        ) && !matches!(source, DataSource::Native(NativeKind::CountryFlag));
        if is_text
            && b.shared.sizing == 0
            && !b.shared.flags.contains(ColumnFlags::ALWAYS_USE_SHORTEST_WIDTH)
        {
            return Err(sc.err(format!(
                "column '{name}' needs a Size or the 'alwaysuseshortestwidth' flag"
            )));
        }

        let mut data = DataColumn::new(source);
        data.max_length = b.max_length;
        data.prefix = b.prefix;
        data.suffix = b.suffix;
        data.clip_w = b.clip_w;
        data.clip_h = b.clip_h;
        data.true_text = b.true_text;
        data.false_text = b.false_text;

        let kind = if matches!(source, DataSource::Native(NativeKind::CountryFlag)) {
            let handle = self.canvas.texture(FLAG_ATLAS_TEXTURE).ok_or_else(|| {
                sc.err(format!(
                    "country flag column '{name}' needs the '{FLAG_ATLAS_TEXTURE}' texture"
                ))
            })?;
            ColumnKind::CountryFlag(CountryFlagColumn {
                data,
                atlas: TextureRef {
                    name: FLAG_ATLAS_TEXTURE.to_string(),
                    handle,
                },
            })
        } else {
            ColumnKind::Data(data)
        };

        self.registry
            .register(Column {
                shared: b.shared,
                kind,
            })
            .map_err(|e| sc.err(e))?;
        Ok(())
    }

    fn parse_composite_block(&mut self, sc: &mut Scanner) -> Result<(), String> {
        let name = sc.must_get_string()?;
        sc.must_get_symbol('{')?;
        let mut shared = ColumnShared::new(&name);
        let mut gap = 2;
        let mut children: Vec<ColumnId> = Vec::new();

        loop {
            if sc.check_symbol('}')? {
                break;
            }
            let command = sc.must_get_identifier()?.to_ascii_lowercase();
            sc.must_get_symbol('=')?;
            if self.generic_column_command(sc, &command, &mut shared)? {
                continue;
            }
            match command.as_str() {
                "gapbetweencolumns" => gap = sc.must_get_number()?.max(0),
                "columns" => children = self.column_list(sc)?,
                "addtocolumns" => {
                    for id in self.column_list(sc)? {
                        if !children.contains(&id) {
                            children.push(id);
                        }
                    }
                }
                "removefromcolumns" => {
                    let removed = self.column_list(sc)?;
                    children.retain(|id| !removed.contains(id));
                }
                other => {
                    return Err(sc.err(format!("unknown composite column command '{other}'")));
                }
            }
        }

        self.validate_shared(sc, &shared)?;
        let id = self
            .registry
            .register(Column {
                shared,
                kind: ColumnKind::Composite(CompositeColumn {
                    children: SmallVec::new(),
                    gap,
                }),
            })
            .map_err(|e| sc.err(e))?;
        for child in children {
            self.registry.adopt_child(id, child).map_err(|e| sc.err(e))?;
        }
        Ok(())
    }

    // ----- scoreboard block -------------------------------------------

    fn parse_scoreboard_block(&mut self, sc: &mut Scanner) -> Result<(), String> {
        sc.must_get_symbol('{')?;
        loop {
            if sc.check_symbol('}')? {
                return Ok(());
            }
            let command = sc.must_get_identifier()?.to_ascii_lowercase();
            match command.as_str() {
                // Margin blocks replace that margin's previous command tree.
                "mainheader" => {
                    self.scoreboard.main_header.commands =
                        self.parse_margin_body(sc, MarginKind::MainHeader)?;
                    continue;
                }
                "teamheader" => {
                    self.scoreboard.team_header.commands =
                        self.parse_margin_body(sc, MarginKind::TeamHeader)?;
                    continue;
                }
                "spectatorheader" => {
                    self.scoreboard.spectator_header.commands =
                        self.parse_margin_body(sc, MarginKind::SpectatorHeader)?;
                    continue;
                }
                "footer" => {
                    self.scoreboard.footer.commands =
                        self.parse_margin_body(sc, MarginKind::Footer)?;
                    continue;
                }
                _ => {}
            }

            sc.must_get_symbol('=')?;
            match command.as_str() {
                "headerfont" => self.scoreboard.style.header_font = self.font_value(sc)?,
                "rowfont" => self.scoreboard.style.row_font = self.font_value(sc)?,
                "headercolor" => {
                    self.scoreboard.style.header_color = self.color_value(sc, "the header text")?;
                }
                "rowcolor" => {
                    self.scoreboard.style.row_color = self.color_value(sc, "the row text")?;
                }
                "backgroundcolor" => {
                    self.scoreboard.style.background_color =
                        self.color_value(sc, "the background")?;
                }
                "backgroundamount" => {
                    self.scoreboard.style.background_amount =
                        sc.must_get_float()?.clamp(0.0, 1.0);
                }
                "rowbackgroundlightcolor" => {
                    self.scoreboard.style.row_light_color = self.color_value(sc, "light rows")?;
                }
                "rowbackgrounddarkcolor" => {
                    self.scoreboard.style.row_dark_color = self.color_value(sc, "dark rows")?;
                }
                "localrowbackgroundcolor" => {
                    self.scoreboard.style.local_row_color =
                        self.color_value(sc, "the local player's row")?;
                }
                "rowbackgroundamount" => {
                    self.scoreboard.style.row_background_amount =
                        sc.must_get_float()?.clamp(0.0, 1.0);
                }
                "bordercolor" => {
                    self.scoreboard.style.border_color = self.color_value(sc, "the border")?;
                }
                "bordertexture" => {
                    self.scoreboard.style.border_texture = Some(self.texture_value(sc)?);
                }
                "bordersize" => self.scoreboard.style.border_size = sc.must_get_number()?.max(0),
                "gapbetweencolumns" => {
                    self.scoreboard.style.column_gap = sc.must_get_number()?.max(0);
                }
                "columnpadding" => {
                    self.scoreboard.style.column_padding = sc.must_get_number()?.max(0);
                }
                "gapbetweenrows" => self.scoreboard.style.row_gap = sc.must_get_number()?.max(0),
                "gapbetweenheaderandrows" => {
                    self.scoreboard.style.header_gap = sc.must_get_number()?.max(0);
                }

                "columnorder" => self.scoreboard.column_order = self.column_list(sc)?,
                "addtocolumnorder" => {
                    for id in self.column_list(sc)? {
                        if !self.scoreboard.column_order.contains(&id) {
                            self.scoreboard.column_order.push(id);
                        }
                    }
                }
                "removefromcolumnorder" => {
                    let removed = self.column_list(sc)?;
                    self.scoreboard.column_order.retain(|id| !removed.contains(id));
                }
                "rankorder" => {
                    self.scoreboard.rank_order.clear();
                    for id in self.column_list(sc)? {
                        self.push_rank_column(sc, id)?;
                    }
                }
                "addtorankorder" => {
                    for id in self.column_list(sc)? {
                        self.push_rank_column(sc, id)?;
                    }
                }
                "removefromrankorder" => {
                    let removed = self.column_list(sc)?;
                    self.scoreboard.rank_order.retain(|id| !removed.contains(id));
                }
                other => {
                    return Err(sc.err(format!("unknown scoreboard command '{other}'")));
                }
            }
        }
    }

    fn push_rank_column(&mut self, sc: &Scanner, id: ColumnId) -> Result<(), String> {
        if self.registry.get(id).data().is_none() {
            return Err(sc.err(format!(
                "composite column '{}' cannot be a sort key",
                self.registry.get(id).shared.internal_name
            )));
        }
        if !self.scoreboard.rank_order.contains(&id) {
            self.scoreboard.rank_order.push(id);
        }
        Ok(())
    }

    // ----- margin command trees ---------------------------------------

    fn parse_margin_body(
        &mut self,
        sc: &mut Scanner,
        margin: MarginKind,
    ) -> Result<Vec<MarginCommand>, String> {
        sc.must_get_symbol('{')?;
        let mut commands = Vec::new();
        loop {
            if sc.check_symbol('}')? {
                return Ok(commands);
            }
            let word = sc.must_get_identifier()?.to_ascii_lowercase();
            commands.push(match word.as_str() {
                "drawstring" => self.parse_element(sc, DRAW_STRING, margin)?,
                "drawcolor" => self.parse_element(sc, DRAW_COLOR, margin)?,
                "drawtexture" => self.parse_element(sc, DRAW_TEXTURE, margin)?,
                "multilineblock" => {
                    self.parse_block(sc, BlockLayout::MultiLine, MULTI_LINE_BLOCK, margin)?
                }
                "rowblock" => self.parse_block(sc, BlockLayout::Row, ROW_BLOCK, margin)?,
                other => self.parse_conditional(sc, other, margin)?,
            });
        }
    }

    fn parse_element(
        &mut self,
        sc: &mut Scanner,
        cmd: u8,
        margin: MarginKind,
    ) -> Result<MarginCommand, String> {
        let params = self.parse_params(sc, cmd, margin, true)?;
        Ok(match cmd {
            DRAW_STRING => {
                let font = params
                    .font
                    .ok_or_else(|| sc.err("DrawString is missing its 'font' parameter"))?;
                let mut command =
                    DrawStringCommand::new(params.chunks.clone(), font, params.text_color);
                command.gap_size = params.gap_size;
                params.apply_base(&mut command.base);
                MarginCommand::DrawString(command)
            }
            DRAW_COLOR => {
                let mut command =
                    DrawColorCommand::new(params.color, params.width, params.height);
                params.apply_base(&mut command.base);
                MarginCommand::DrawColor(command)
            }
            _ => {
                let texture = params
                    .texture
                    .clone()
                    .ok_or_else(|| sc.err("DrawTexture is missing its 'value' parameter"))?;
                let mut command = DrawTextureCommand::new(texture);
                params.apply_base(&mut command.base);
                MarginCommand::DrawTexture(command)
            }
        })
    }

    fn parse_block(
        &mut self,
        sc: &mut Scanner,
        layout: BlockLayout,
        cmd: u8,
        margin: MarginKind,
    ) -> Result<MarginCommand, String> {
        let params = self.parse_params(sc, cmd, margin, false)?;
        let children = self.parse_margin_body(sc, margin)?;
        let mut block = BlockCommand::new(layout, children);
        params.apply_base(&mut block.base);
        Ok(MarginCommand::Block(block))
    }

    fn parse_conditional(
        &mut self,
        sc: &mut Scanner,
        word: &str,
        margin: MarginKind,
    ) -> Result<MarginCommand, String> {
        let predicate = match word {
            "ifonlinegame" => Predicate::OnlineGame,
            "ifintermission" => Predicate::Intermission,
            "ifplayersonteams" => Predicate::PlayersOnTeams,
            "ifplayershavelives" => Predicate::PlayersHaveLives,
            "ifshouldshowrank" => Predicate::ShouldShowRank,
            "ifgamemode" => {
                sc.must_get_symbol('(')?;
                let mask = self.game_mode_mask(sc)?;
                sc.must_get_symbol(')')?;
                Predicate::GameMode(mask)
            }
            "ifgametype" => {
                sc.must_get_symbol('(')?;
                let mask = self.game_type_mask(sc)?;
                sc.must_get_symbol(')')?;
                Predicate::GameType(mask)
            }
            "ifearntype" => {
                sc.must_get_symbol('(')?;
                let mask = self.earn_type_mask(sc)?;
                sc.must_get_symbol(')')?;
                Predicate::EarnType(mask)
            }
            "ifcvar" => {
                sc.must_get_symbol('(')?;
                let name = self.cvar_name_value(sc)?;
                let op = parse_compare_op(sc)?;
                let operand = parse_cvar_operand(sc)?;
                sc.must_get_symbol(')')?;
                Predicate::Cvar { name, op, operand }
            }
            other => {
                return Err(sc.err(format!("unknown margin command '{other}'")));
            }
        };
        let true_branch = self.parse_margin_body(sc, margin)?;
        let false_branch = if sc.check_keyword("else")? {
            self.parse_margin_body(sc, margin)?
        } else {
            Vec::new()
        };
        Ok(MarginCommand::Conditional(ConditionalCommand::new(
            predicate,
            true_branch,
            false_branch,
        )))
    }

    /// `( name = value, ... )`. Element commands must carry a list; block
    /// commands may omit it entirely.
    fn parse_params(
        &mut self,
        sc: &mut Scanner,
        cmd: u8,
        margin: MarginKind,
        parens_required: bool,
    ) -> Result<ParsedParams, String> {
        let mut out = ParsedParams::default();
        if parens_required {
            sc.must_get_symbol('(')?;
        } else if !sc.check_symbol('(')? {
            return Ok(out);
        }
        if !sc.check_symbol(')')? {
            loop {
                let name = sc.must_get_identifier()?.to_ascii_lowercase();
                let index = MARGIN_PARAMS
                    .iter()
                    .position(|spec| spec.name == name)
                    .ok_or_else(|| sc.err(format!("unknown parameter '{name}'")))?;
                let spec = &MARGIN_PARAMS[index];
                if spec.allowed & cmd == 0 {
                    return Err(sc.err(format!(
                        "'{name}' is not a parameter of {}",
                        command_name(cmd)
                    )));
                }
                if out.seen & (1 << index) != 0 {
                    return Err(sc.err(format!("duplicate parameter '{name}'")));
                }
                out.seen |= 1 << index;
                sc.must_get_symbol('=')?;
                self.parse_param_value(sc, &name, cmd, margin, &mut out)?;
                if !sc.check_symbol(',')? {
                    sc.must_get_symbol(')')?;
                    break;
                }
            }
        }
        for (index, spec) in MARGIN_PARAMS.iter().enumerate() {
            if spec.required & cmd != 0 && out.seen & (1 << index) == 0 {
                return Err(sc.err(format!(
                    "{} is missing its '{}' parameter",
                    command_name(cmd),
                    spec.name
                )));
            }
        }
        Ok(out)
    }

    fn parse_param_value(
        &mut self,
        sc: &mut Scanner,
        name: &str,
        cmd: u8,
        margin: MarginKind,
        out: &mut ParsedParams,
    ) -> Result<(), String> {
        match name {
            "value" => match cmd {
                DRAW_STRING => out.chunks = self.parse_string_chunks(sc, margin)?,
                DRAW_COLOR => out.color = self.color_value(sc, "a DrawColor command")?,
                _ => out.texture = Some(self.texture_value(sc)?),
            },
            "x" => out.x = sc.must_get_number()?,
            "y" => out.y = sc.must_get_number()?,
            "horizontalalign" => {
                let text = sc.must_get_identifier()?;
                out.halign = text.parse().map_err(|e: String| sc.err(e))?;
            }
            "verticalalign" => {
                let text = sc.must_get_identifier()?;
                out.valign = text.parse().map_err(|e: String| sc.err(e))?;
            }
            "bottompadding" => out.bottom_padding = sc.must_get_number()?.max(0),
            "rightpadding" => out.right_padding = sc.must_get_number()?.max(0),
            "alpha" => out.alpha = sc.must_get_float()?.clamp(0.0, 1.0),
            "font" => out.font = Some(self.font_value(sc)?),
            "textcolor" => out.text_color = self.color_value(sc, "a DrawString command")?,
            "gapsize" => out.gap_size = sc.must_get_number()?.max(0),
            "width" => out.width = sc.must_get_number()?.max(0),
            "height" => out.height = sc.must_get_number()?.max(0),
            _ => unreachable!("parameter names come from the table"),
        }
        Ok(())
    }

    /// A string value: literal and token pieces joined with '+'. Per-team
    /// tokens only resolve inside the team header.
    fn parse_string_chunks(
        &mut self,
        sc: &mut Scanner,
        margin: MarginKind,
    ) -> Result<SmallVec<[StringChunk; 4]>, String> {
        let mut chunks = SmallVec::new();
        loop {
            match sc.must_get_token()? {
                Token::Str(text) => chunks.push(StringChunk::Literal(text)),
                Token::Identifier(word) => {
                    let lowered = word.to_ascii_lowercase();
                    if lowered == "cvar" {
                        sc.must_get_symbol('(')?;
                        let name = self.cvar_name_value(sc)?;
                        sc.must_get_symbol(')')?;
                        chunks.push(StringChunk::Cvar(name));
                    } else if let Some(token) = SpecialToken::from_name(&lowered) {
                        if token.is_per_team() && !margin.is_per_team() {
                            return Err(sc.err(format!(
                                "'{lowered}' is only available inside the TeamHeader margin"
                            )));
                        }
                        chunks.push(StringChunk::Special(token));
                    } else {
                        return Err(sc.err(format!("unknown string value '{word}'")));
                    }
                }
                other => {
                    return Err(sc.err(format!("expected a string value, got {other}")));
                }
            }
            if !sc.check_symbol('+')? {
                return Ok(chunks);
            }
        }
    }
}

fn parse_compare_op(sc: &mut Scanner) -> Result<CompareOp, String> {
    match sc.must_get_token()? {
        Token::Symbol('=') => {
            sc.must_get_symbol('=')?;
            Ok(CompareOp::Eq)
        }
        Token::Symbol('!') => {
            sc.must_get_symbol('=')?;
            Ok(CompareOp::Ne)
        }
        Token::Symbol('<') => Ok(if sc.check_symbol('=')? {
            CompareOp::Le
        } else {
            CompareOp::Lt
        }),
        Token::Symbol('>') => Ok(if sc.check_symbol('=')? {
            CompareOp::Ge
        } else {
            CompareOp::Gt
        }),
        other => Err(sc.err(format!("expected a comparison operator, got {other}"))),
    }
}

fn parse_cvar_operand(sc: &mut Scanner) -> Result<CvarValue, String> {
    Ok(match sc.must_get_token()? {
        Token::Int(v) => CvarValue::Int(v),
        Token::Float(v) => CvarValue::Float(v),
        Token::Str(s) => CvarValue::String(s),
        Token::Identifier(word) => match word.to_ascii_lowercase().as_str() {
            "true" => CvarValue::Bool(true),
            "false" => CvarValue::Bool(false),
            _ => CvarValue::String(word),
        },
        other => return Err(sc.err(format!("expected a cvar value, got {other}"))),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{NetworkRole, PlayerSnapshot};
    use crate::headless::{DrawOp, HeadlessCanvas, MapCvars};

    fn backend() -> (HeadlessCanvas, MapCvars) {
        let mut canvas = HeadlessCanvas::new(640, 480);
        canvas.register_font("BigFont", 10, 14);
        canvas.register_texture("CTRYFLAG", 256, 256);
        canvas.register_texture("SBBORDER", 64, 3);
        let mut cvars = MapCvars::default();
        cvars.set_int("fraglimit", 20);
        cvars.set_bool("cl_showpings", true);
        (canvas, cvars)
    }

    const BASIC_COLUMNS: &str = r#"
        Column "Name"
        {
            Type = Name
            DisplayName = "Name"
            AddFlag = AlwaysUseShortestWidth
            Size = 4
        }
        Column "Frags"
        {
            Type = Frags
            DisplayName = "Frags"
            Alignment = Right
            Size = 40
        }
    "#;

    fn parse_ok(src: &str) -> ScorinfoSet {
        let (canvas, cvars) = backend();
        parse(src, &canvas, &cvars).expect("definition should parse")
    }

    fn parse_err(src: &str) -> String {
        let (canvas, cvars) = backend();
        parse(src, &canvas, &cvars).expect_err("definition should be rejected")
    }

    #[test]
    fn parses_columns_and_scoreboard() {
        let src = format!(
            r#"{BASIC_COLUMNS}
            Scoreboard
            {{
                HeaderFont = "BigFont"
                RowFont = "SmallFont"
                HeaderColor = "Gold"
                BorderSize = 6
                GapBetweenColumns = 8
                ColumnOrder = "Name", "Frags"
                RankOrder = "Frags"
            }}"#
        );
        let set = parse_ok(&src);
        assert_eq!(set.scoreboard.column_order.len(), 2);
        assert_eq!(set.scoreboard.rank_order.len(), 1);
        assert_eq!(set.scoreboard.style.border_size, 6);
        assert_eq!(set.scoreboard.style.column_gap, 8);

        let frags = set.registry.lookup("frags").expect("registered");
        assert_eq!(set.registry.get(frags).shared.sizing, 40);
        assert_eq!(set.registry.get(frags).shared.alignment, Alignment::Right);
    }

    #[test]
    fn column_without_type_is_rejected() {
        let err = parse_err(r#"Column "Mystery" { Size = 10 }"#);
        assert!(err.contains("no Type"), "got: {err}");
    }

    #[test]
    fn zero_size_text_column_is_rejected() {
        let err = parse_err(r#"Column "Kills" { Type = Kills }"#);
        assert!(err.contains("Size"), "got: {err}");
    }

    #[test]
    fn conflicting_network_flags_are_rejected() {
        let err = parse_err(
            r#"Column "Ping"
            {
                Type = Ping
                Size = 30
                AddFlag = OfflineOnly, OnlineOnly
            }"#,
        );
        assert!(err.contains("offline-only"), "got: {err}");
    }

    #[test]
    fn long_short_name_is_rejected() {
        let err = parse_err(
            r#"Column "Frags"
            {
                Type = Frags
                Size = 40
                DisplayName = "Frags"
                ShortName = "Fragcount"
            }"#,
        );
        assert!(err.contains("short name"), "got: {err}");
    }

    #[test]
    fn composite_child_must_hide_its_header() {
        let err = parse_err(
            r#"Column "Deaths"
            {
                Type = Deaths
                Size = 30
            }
            CompositeColumn "Packed"
            {
                Columns = "Deaths"
            }"#,
        );
        assert!(err.contains("dontshowheader"), "got: {err}");
    }

    #[test]
    fn composite_adopts_eligible_children() {
        let set = parse_ok(
            r#"Column "Deaths"
            {
                Type = Deaths
                Size = 30
                AddFlag = DontShowHeader
            }
            Column "Wins"
            {
                Type = Wins
                Size = 30
                AddFlag = DontShowHeader
            }
            CompositeColumn "Packed"
            {
                GapBetweenColumns = 3
                Columns = "Deaths", "Wins"
                AddToColumns = "Wins"
                RemoveFromColumns = "Deaths"
            }"#,
        );
        let packed = set.registry.lookup("packed").unwrap();
        let ColumnKind::Composite(comp) = &set.registry.get(packed).kind else {
            panic!("not a composite");
        };
        assert_eq!(comp.gap, 3);
        assert_eq!(comp.children.len(), 1);
        let wins = set.registry.lookup("wins").unwrap();
        assert_eq!(comp.children[0], wins);
        assert_eq!(set.registry.get(wins).data().unwrap().owner, Some(packed));
    }

    #[test]
    fn unknown_references_abort_the_load() {
        let err = parse_err(r#"Scoreboard { ColumnOrder = "nosuch" }"#);
        assert!(err.contains("unknown column"), "got: {err}");

        let err = parse_err(r#"Scoreboard { RowFont = "NoFont" }"#);
        assert!(err.contains("unknown font"), "got: {err}");

        let err = parse_err(r#"Scoreboard { BorderTexture = "NOSUCH" }"#);
        assert!(err.contains("unknown texture"), "got: {err}");

        let err = parse_err(
            r#"Column "Frags"
            {
                Type = Frags
                Size = 40
                CVar = "sv_nosuchvar"
            }"#,
        );
        assert!(err.contains("unknown cvar"), "got: {err}");
    }

    #[test]
    fn rank_order_must_be_displayed() {
        let err = parse_err(&format!(
            r#"{BASIC_COLUMNS}
            Scoreboard
            {{
                ColumnOrder = "Name"
                RankOrder = "Frags"
            }}"#
        ));
        assert!(err.contains("does not appear"), "got: {err}");
    }

    #[test]
    fn rank_order_member_may_sit_inside_a_composite() {
        let set = parse_ok(
            r#"Column "Frags"
            {
                Type = Frags
                Size = 30
                AddFlag = DontShowHeader
            }
            CompositeColumn "Packed"
            {
                Columns = "Frags"
            }
            Scoreboard
            {
                ColumnOrder = "Packed"
                RankOrder = "Frags"
            }"#,
        );
        assert_eq!(set.scoreboard.rank_order.len(), 1);
    }

    #[test]
    fn composite_cannot_be_a_sort_key() {
        let err = parse_err(
            r#"CompositeColumn "Packed" { }
            Scoreboard
            {
                ColumnOrder = "Packed"
                RankOrder = "Packed"
            }"#,
        );
        assert!(err.contains("sort key"), "got: {err}");
    }

    #[test]
    fn custom_columns_declare_backing_data() {
        let set = parse_ok(
            r#"Column "Medals"
            {
                Type = Custom
                DataType = Int
                DefaultValue = "0"
                Size = 30
            }"#,
        );
        let id = set.registry.lookup("medals").unwrap();
        let data = set.registry.get(id).data().unwrap();
        let DataSource::Custom(index) = data.source else {
            panic!("expected custom backing data");
        };
        assert_eq!(set.custom.get(index).unwrap().data_type(), DataType::Int);

        let err = parse_err(r#"Column "Medals" { Type = Custom Size = 30 }"#);
        assert!(err.contains("DataType"), "got: {err}");
    }

    #[test]
    fn margin_parameters_are_validated_per_command() {
        // width belongs to DrawColor alone.
        let err = parse_err(
            r#"Scoreboard
            {
                MainHeader
                {
                    DrawString( value = "hi", font = "SmallFont", width = 10 )
                }
            }"#,
        );
        assert!(err.contains("not a parameter"), "got: {err}");

        // DrawColor without its mandatory height.
        let err = parse_err(
            r#"Scoreboard
            {
                MainHeader
                {
                    DrawColor( value = "Red", width = 10 )
                }
            }"#,
        );
        assert!(err.contains("'height'"), "got: {err}");

        let err = parse_err(
            r#"Scoreboard
            {
                MainHeader
                {
                    DrawString( value = "a", font = "SmallFont", font = "SmallFont" )
                }
            }"#,
        );
        assert!(err.contains("duplicate"), "got: {err}");
    }

    #[test]
    fn team_tokens_outside_team_header_are_rejected() {
        let err = parse_err(
            r#"Scoreboard
            {
                MainHeader
                {
                    DrawString( value = teamname, font = "SmallFont" )
                }
            }"#,
        );
        assert!(err.contains("TeamHeader"), "got: {err}");
    }

    #[test]
    fn conditionals_parse_with_else_branches() {
        let set = parse_ok(
            r#"Scoreboard
            {
                Footer
                {
                    IfCVar( "fraglimit" > 0 )
                    {
                        DrawString( value = "Frag limit: " + cvar( "fraglimit" ), font = "SmallFont" )
                    }
                    else
                    {
                        DrawString( value = "No limit", font = "SmallFont" )
                    }
                    IfGameMode( Deathmatch, Duel )
                    {
                        DrawColor( value = "Red", width = 8, height = 8 )
                    }
                }
            }"#,
        );
        assert_eq!(set.scoreboard.footer.commands.len(), 2);
        let MarginCommand::Conditional(cond) = &set.scoreboard.footer.commands[0] else {
            panic!("expected a conditional");
        };
        assert_eq!(cond.true_branch.len(), 1);
        assert_eq!(cond.false_branch.len(), 1);
    }

    #[test]
    fn country_flag_column_needs_the_atlas() {
        let src = r#"Column "Flag" { Type = CountryFlag }"#;
        let canvas = HeadlessCanvas::new(640, 480);
        let cvars = MapCvars::default();
        let err = parse(src, &canvas, &cvars).expect_err("atlas is missing");
        assert!(err.contains("CTRYFLAG"), "got: {err}");

        let set = parse_ok(src);
        let id = set.registry.lookup("flag").unwrap();
        assert!(matches!(
            set.registry.get(id).kind,
            ColumnKind::CountryFlag(_)
        ));
    }

    #[test]
    fn chunks_parse_additively() {
        let (canvas, cvars) = backend();
        let set = parse_chunks(
            &[
                BASIC_COLUMNS,
                r#"Scoreboard { ColumnOrder = "Name" RankOrder = "Name" }"#,
                r#"Scoreboard { AddToColumnOrder = "Frags" }"#,
            ],
            &canvas,
            &cvars,
        )
        .expect("additive chunks");
        assert_eq!(set.scoreboard.column_order.len(), 2);
    }

    #[test]
    fn parsed_board_renders_in_rank_order() {
        let src = format!(
            r#"{BASIC_COLUMNS}
            Scoreboard
            {{
                ColumnOrder = "Name", "Frags"
                RankOrder = "Frags"
            }}"#
        );
        let (mut canvas, cvars) = backend();
        let mut set = parse(&src, &canvas, &cvars).unwrap();

        let mut game = GameState {
            mode: GameMode::Deathmatch,
            game_type: gametype::DEATHMATCH,
            earn_type: earntype::FRAGS,
            role: NetworkRole::Client,
            ..GameState::default()
        };
        for (i, frags) in [(0usize, 5), (1, 12), (2, 12)] {
            game.players[i] = Some(PlayerSnapshot {
                name: format!("Player{i}"),
                frags,
                ..PlayerSnapshot::default()
            });
        }

        set.render(&game, &cvars, &mut canvas, 1);

        // The 12-frag pair keeps input order; the 5-frag player is last.
        let sorted: Vec<usize> = set
            .scoreboard
            .sorted_players()
            .iter()
            .copied()
            .filter(|&p| game.player(p).is_some())
            .collect();
        assert_eq!(sorted, vec![1, 2, 0]);

        // Both cells of the winning row made it to the draw list.
        let texts: Vec<&str> = canvas
            .ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert!(texts.contains(&"Player1"));
        assert!(texts.contains(&"12"));
    }

    #[test]
    fn disable_if_empty_column_vanishes_from_layout() {
        let src = r#"
            Column "Name"
            {
                Type = Name
                AddFlag = AlwaysUseShortestWidth
            }
            Column "Handicap"
            {
                Type = Handicap
                Size = 30
                AddFlag = DisableIfEmpty
            }
            Scoreboard
            {
                ColumnOrder = "Name", "Handicap"
                RankOrder = "Name"
            }"#;
        let (mut canvas, cvars) = backend();
        let mut set = parse(src, &canvas, &cvars).unwrap();

        let mut game = GameState::default();
        game.players[0] = Some(PlayerSnapshot {
            name: "Solo".into(),
            ..PlayerSnapshot::default()
        });
        set.render(&game, &cvars, &mut canvas, 1);

        let id = set.registry.lookup("handicap").unwrap();
        assert!(set.registry.get(id).shared.disabled);
        assert_eq!(set.registry.get(id).shared.width, 0);
        let name = set.registry.lookup("name").unwrap();
        assert_eq!(
            set.scoreboard.width(),
            set.registry.get(name).shared.width + 2 + 2 * set.scoreboard.style.border_size,
            "only the name column and fixed overhead remain"
        );
    }

    #[test]
    fn cvar_gate_disables_against_nonzero_value() {
        let src = r#"
            Column "Ping"
            {
                Type = Ping
                Size = 30
                CVar = "cl_showpings"
                AddFlag = CVarMustBeZero
            }
            Scoreboard
            {
                ColumnOrder = "Ping"
                RankOrder = "Ping"
            }"#;
        let (mut canvas, cvars) = backend();
        let mut set = parse(src, &canvas, &cvars).unwrap();

        let mut game = GameState::default();
        game.players[0] = Some(PlayerSnapshot::default());
        set.render(&game, &cvars, &mut canvas, 1);

        let id = set.registry.lookup("ping").unwrap();
        assert!(
            set.registry.get(id).shared.disabled,
            "cl_showpings is true, so a must-be-zero gate fails"
        );
    }
}
