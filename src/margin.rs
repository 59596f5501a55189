//! Margin command interpreter: the small declarative tree that paints
//! scoreboard headers and footers. Element commands measure and draw
//! content, block commands aggregate children, flow-control commands route
//! refresh and draw through one of two pre-parsed branches.

use crate::color::Color;
use crate::column::Alignment;
use crate::context::{
    earntype, Canvas, CvarValue, FontHandle, Inputs, TextureRef, MAX_TEAMS,
};
use smallvec::SmallVec;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MarginKind {
    MainHeader,
    TeamHeader,
    SpectatorHeader,
    Footer,
}

impl MarginKind {
    pub const fn name(self) -> &'static str {
        match self {
            Self::MainHeader => "MainHeader",
            Self::TeamHeader => "TeamHeader",
            Self::SpectatorHeader => "SpectatorHeader",
            Self::Footer => "Footer",
        }
    }

    /// Team headers repeat per team and may use per-team string tokens.
    pub const fn is_per_team(self) -> bool {
        matches!(self, Self::TeamHeader)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum VerticalAlign {
    #[default]
    Top,
    Center,
    Bottom,
}

impl std::str::FromStr for VerticalAlign {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "top" => Ok(Self::Top),
            "center" => Ok(Self::Center),
            "bottom" => Ok(Self::Bottom),
            other => Err(format!("'{other}' is not a valid vertical alignment")),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

/// Content measurements are kept per team slot because team headers refresh
/// once for every populated team; the extra slot holds the team-less case.
#[derive(Clone, Debug)]
struct PerTeam<T> {
    slots: Vec<T>,
}

impl<T: Default + Clone> Default for PerTeam<T> {
    fn default() -> Self {
        Self {
            slots: vec![T::default(); MAX_TEAMS + 1],
        }
    }
}

impl<T: Default + Clone> PerTeam<T> {
    fn index(team: Option<usize>) -> usize {
        match team {
            Some(t) => {
                assert!(t < MAX_TEAMS, "team index {t} out of range");
                t
            }
            None => MAX_TEAMS,
        }
    }

    fn get(&self, team: Option<usize>) -> &T {
        &self.slots[Self::index(team)]
    }

    fn set(&mut self, team: Option<usize>, value: T) {
        self.slots[Self::index(team)] = value;
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct ContentSize {
    w: i32,
    h: i32,
}

/// Running geometry of the margin being refreshed. Elements grow the height
/// so a margin always fits its richest content.
pub struct MarginGeom {
    pub width: i32,
    pub height: i32,
}

impl MarginGeom {
    fn fit(&mut self, needed_height: i32) {
        self.height = self.height.max(needed_height);
    }
}

/// Parameters shared by every margin command.
#[derive(Clone, Debug)]
pub struct ElementBase {
    pub x: i32,
    pub y: i32,
    pub halign: Alignment,
    pub valign: VerticalAlign,
    pub bottom_padding: i32,
    pub right_padding: i32,
    pub alpha: f32,
    sizes: PerTeam<ContentSize>,
}

impl Default for ElementBase {
    fn default() -> Self {
        Self {
            x: 0,
            y: 0,
            halign: Alignment::default(),
            valign: VerticalAlign::default(),
            bottom_padding: 0,
            right_padding: 0,
            alpha: 1.0,
            sizes: PerTeam::default(),
        }
    }
}

impl ElementBase {
    fn store_size(&mut self, team: Option<usize>, w: i32, h: i32, geom: &mut MarginGeom) {
        self.sizes.set(team, ContentSize { w, h });
        if h > 0 {
            geom.fit(self.y + h + self.bottom_padding);
        }
    }

    /// Top-left corner of this command's content inside `rect`.
    fn place(&self, rect: Rect, team: Option<usize>) -> (i32, i32, ContentSize) {
        let size = *self.sizes.get(team);
        let x = match self.halign {
            Alignment::Left => rect.x + self.x,
            Alignment::Center => rect.x + (rect.w - size.w) / 2 + self.x,
            Alignment::Right => rect.x + rect.w - size.w - self.x - self.right_padding,
        };
        let y = match self.valign {
            VerticalAlign::Top => rect.y + self.y,
            VerticalAlign::Center => rect.y + (rect.h - size.h) / 2 + self.y,
            VerticalAlign::Bottom => rect.y + rect.h - size.h - self.y - self.bottom_padding,
        };
        (x, y, size)
    }
}

/// One piece of a margin string value.
#[derive(Clone, Debug, PartialEq)]
pub enum StringChunk {
    Literal(String),
    /// Current value of a console variable.
    Cvar(String),
    Special(SpecialToken),
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SpecialToken {
    GameModeName,
    LevelName,
    LevelLump,
    SkillName,
    FragLimit,
    PointLimit,
    WinLimit,
    DuelLimit,
    TimeLimit,
    PointString,
    PlaceString,
    TimeElapsed,
    TimeRemaining,
    PlayerCount,
    SpectatorCount,
    TeamName,
    TeamPlayerCount,
    TeamLivingCount,
    TeamScore,
    TeamWinCount,
}

static SPECIAL_TOKENS: &[(&str, SpecialToken)] = &[
    ("gamemode", SpecialToken::GameModeName),
    ("levelname", SpecialToken::LevelName),
    ("levellump", SpecialToken::LevelLump),
    ("skillname", SpecialToken::SkillName),
    ("fraglimit", SpecialToken::FragLimit),
    ("pointlimit", SpecialToken::PointLimit),
    ("winlimit", SpecialToken::WinLimit),
    ("duellimit", SpecialToken::DuelLimit),
    ("timelimit", SpecialToken::TimeLimit),
    ("pointstring", SpecialToken::PointString),
    ("placestring", SpecialToken::PlaceString),
    ("timeelapsed", SpecialToken::TimeElapsed),
    ("timeremaining", SpecialToken::TimeRemaining),
    ("playercount", SpecialToken::PlayerCount),
    ("spectatorcount", SpecialToken::SpectatorCount),
    ("teamname", SpecialToken::TeamName),
    ("teamplayercount", SpecialToken::TeamPlayerCount),
    ("teamlivingcount", SpecialToken::TeamLivingCount),
    ("teamscore", SpecialToken::TeamScore),
    ("teamwincount", SpecialToken::TeamWinCount),
];

impl SpecialToken {
    pub fn from_name(name: &str) -> Option<Self> {
        let lowered = name.to_ascii_lowercase();
        SPECIAL_TOKENS
            .iter()
            .find(|(n, _)| *n == lowered)
            .map(|&(_, t)| t)
    }

    /// Tokens only meaningful inside a team-header margin.
    pub const fn is_per_team(self) -> bool {
        matches!(
            self,
            Self::TeamName
                | Self::TeamPlayerCount
                | Self::TeamLivingCount
                | Self::TeamScore
                | Self::TeamWinCount
        )
    }

    fn expand(self, inputs: &Inputs, team: Option<usize>) -> String {
        let game = inputs.game;
        match self {
            Self::GameModeName => game.mode.name().to_string(),
            Self::LevelName => game.level_name.clone(),
            Self::LevelLump => game.level_lump.clone(),
            Self::SkillName => game.skill_name.clone(),
            Self::FragLimit => game.frag_limit.to_string(),
            Self::PointLimit => game.point_limit.to_string(),
            Self::WinLimit => game.win_limit.to_string(),
            Self::DuelLimit => game.duel_limit.to_string(),
            Self::TimeLimit => format_time(game.time_limit),
            Self::PointString => {
                let word = if game.earn_type & earntype::POINTS != 0 {
                    "points"
                } else if game.earn_type & earntype::WINS != 0 {
                    "wins"
                } else if game.earn_type & earntype::KILLS != 0 {
                    "kills"
                } else {
                    "frags"
                };
                format!("{} {word}", game.local_score())
            }
            Self::PlaceString => ordinal(game.local_place() + 1),
            Self::TimeElapsed => format_time(game.time_elapsed),
            Self::TimeRemaining => format_time(game.time_remaining),
            Self::PlayerCount => game.active_player_count().to_string(),
            Self::SpectatorCount => game.spectator_count().to_string(),
            Self::TeamName
            | Self::TeamPlayerCount
            | Self::TeamLivingCount
            | Self::TeamScore
            | Self::TeamWinCount => {
                let team = team.expect("per-team token expanded outside a team margin");
                let Some(snapshot) = game.teams.get(team) else {
                    panic!("per-team token expanded for missing team {team}");
                };
                match self {
                    Self::TeamName => snapshot.name.clone(),
                    Self::TeamPlayerCount => snapshot.player_count.to_string(),
                    Self::TeamLivingCount => snapshot.living_count.to_string(),
                    Self::TeamScore => snapshot.score.to_string(),
                    Self::TeamWinCount => snapshot.wins.to_string(),
                    _ => unreachable!(),
                }
            }
        }
    }
}

fn expand_chunks(chunks: &[StringChunk], inputs: &Inputs, team: Option<usize>) -> String {
    let mut out = String::new();
    for chunk in chunks {
        match chunk {
            StringChunk::Literal(s) => out.push_str(s),
            StringChunk::Cvar(name) => {
                if let Some(v) = inputs.cvars.get(name) {
                    out.push_str(&v.as_text());
                }
            }
            StringChunk::Special(token) => out.push_str(&token.expand(inputs, team)),
        }
    }
    out
}

/// "1st", "2nd", "3rd", "4th", ... with the teens handled.
pub fn ordinal(n: usize) -> String {
    let suffix = match (n % 10, n % 100) {
        (1, 11) | (2, 12) | (3, 13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{n}{suffix}")
}

/// Seconds to "M:SS".
pub fn format_time(seconds: i32) -> String {
    let clamped = seconds.max(0);
    format!("{}:{:02}", clamped / 60, clamped % 60)
}

/// Greedy word wrap against the margin width. A single overlong word gets
/// its own line and is clipped at draw time.
fn wrap_text(canvas: &dyn Canvas, font: FontHandle, text: &str, max_w: i32) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    let mut lines = Vec::new();
    for raw_line in text.split('\n') {
        if max_w <= 0 || canvas.text_width(font, raw_line) <= max_w {
            lines.push(raw_line.to_string());
            continue;
        }
        let mut current = String::new();
        for word in raw_line.split(' ') {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{current} {word}")
            };
            if !current.is_empty() && canvas.text_width(font, &candidate) > max_w {
                lines.push(std::mem::take(&mut current));
                current = word.to_string();
            } else {
                current = candidate;
            }
        }
        if !current.is_empty() {
            lines.push(current);
        }
    }
    lines
}

#[derive(Clone, Debug)]
pub struct DrawStringCommand {
    pub base: ElementBase,
    pub chunks: SmallVec<[StringChunk; 4]>,
    pub font: FontHandle,
    pub text_color: Color,
    /// Extra pixels between wrapped lines.
    pub gap_size: i32,
    lines: PerTeam<Vec<String>>,
}

impl DrawStringCommand {
    pub fn new(
        chunks: SmallVec<[StringChunk; 4]>,
        font: FontHandle,
        text_color: Color,
    ) -> Self {
        Self {
            base: ElementBase::default(),
            chunks,
            font,
            text_color,
            gap_size: 0,
            lines: PerTeam::default(),
        }
    }

    fn refresh(
        &mut self,
        inputs: &Inputs,
        canvas: &dyn Canvas,
        geom: &mut MarginGeom,
        team: Option<usize>,
    ) {
        let text = expand_chunks(&self.chunks, inputs, team);
        let lines = wrap_text(canvas, self.font, &text, geom.width);
        let font_h = canvas.font_height(self.font);
        let w = lines
            .iter()
            .map(|l| canvas.text_width(self.font, l))
            .max()
            .unwrap_or(0);
        let h = if lines.is_empty() {
            0
        } else {
            lines.len() as i32 * font_h + (lines.len() as i32 - 1) * self.gap_size
        };
        self.lines.set(team, lines);
        self.base.store_size(team, w, h, geom);
    }

    fn draw(
        &self,
        canvas: &mut dyn Canvas,
        rect: Rect,
        team: Option<usize>,
        alpha_scale: f32,
    ) {
        let (x, y, size) = self.base.place(rect, team);
        if size.h == 0 {
            return;
        }
        let font_h = canvas.font_height(self.font);
        let mut line_y = y;
        for line in self.lines.get(team) {
            let lw = canvas.text_width(self.font, line);
            let lx = self.base.halign.position(x, size.w, lw);
            canvas.draw_text(
                self.font,
                line,
                lx,
                line_y,
                self.text_color,
                self.base.alpha * alpha_scale,
                None,
            );
            line_y += font_h + self.gap_size;
        }
    }
}

#[derive(Clone, Debug)]
pub struct DrawColorCommand {
    pub base: ElementBase,
    pub color: Color,
    pub box_w: i32,
    pub box_h: i32,
}

impl DrawColorCommand {
    pub fn new(color: Color, box_w: i32, box_h: i32) -> Self {
        Self {
            base: ElementBase::default(),
            color,
            box_w,
            box_h,
        }
    }

    fn refresh(&mut self, geom: &mut MarginGeom, team: Option<usize>) {
        self.base.store_size(team, self.box_w, self.box_h, geom);
    }

    fn draw(&self, canvas: &mut dyn Canvas, rect: Rect, team: Option<usize>, alpha_scale: f32) {
        let (x, y, size) = self.base.place(rect, team);
        if size.w == 0 || size.h == 0 {
            return;
        }
        canvas.draw_box(x, y, size.w, size.h, self.color, self.base.alpha * alpha_scale);
    }
}

#[derive(Clone, Debug)]
pub struct DrawTextureCommand {
    pub base: ElementBase,
    pub texture: TextureRef,
}

impl DrawTextureCommand {
    pub fn new(texture: TextureRef) -> Self {
        Self {
            base: ElementBase::default(),
            texture,
        }
    }

    fn refresh(&mut self, canvas: &dyn Canvas, geom: &mut MarginGeom, team: Option<usize>) {
        let (w, h) = canvas.texture_size(self.texture.handle);
        self.base.store_size(team, w, h, geom);
    }

    fn draw(&self, canvas: &mut dyn Canvas, rect: Rect, team: Option<usize>, alpha_scale: f32) {
        let (x, y, size) = self.base.place(rect, team);
        if size.w == 0 || size.h == 0 {
            return;
        }
        canvas.draw_texture(self.texture.handle, x, y, self.base.alpha * alpha_scale, None);
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BlockLayout {
    /// Children stack top to bottom: width is the max, height the sum.
    MultiLine,
    /// Children run left to right, vertically centered: width is the sum,
    /// height the max.
    Row,
}

#[derive(Clone, Debug)]
pub struct BlockCommand {
    pub base: ElementBase,
    pub layout: BlockLayout,
    pub children: Vec<MarginCommand>,
}

impl BlockCommand {
    pub fn new(layout: BlockLayout, children: Vec<MarginCommand>) -> Self {
        Self {
            base: ElementBase::default(),
            layout,
            children,
        }
    }

    fn refresh(
        &mut self,
        inputs: &Inputs,
        canvas: &dyn Canvas,
        geom: &mut MarginGeom,
        team: Option<usize>,
    ) {
        let mut w = 0;
        let mut h = 0;
        for child in &mut self.children {
            let (cw, ch) = child.refresh(inputs, canvas, geom, team);
            if cw == 0 && ch == 0 {
                continue;
            }
            match self.layout {
                BlockLayout::MultiLine => {
                    w = w.max(cw);
                    h += ch;
                }
                BlockLayout::Row => {
                    w += cw;
                    h = h.max(ch);
                }
            }
        }
        self.base.store_size(team, w, h, geom);
    }

    fn draw(
        &self,
        inputs: &Inputs,
        canvas: &mut dyn Canvas,
        rect: Rect,
        team: Option<usize>,
        alpha_scale: f32,
    ) {
        let (x, y, size) = self.base.place(rect, team);
        if size.w == 0 && size.h == 0 {
            return;
        }
        let alpha_scale = alpha_scale * self.base.alpha;
        match self.layout {
            BlockLayout::MultiLine => {
                let mut cursor = y;
                for child in &self.children {
                    let (cw, ch) = child.size(team);
                    if cw == 0 && ch == 0 {
                        continue;
                    }
                    child.draw(
                        inputs,
                        canvas,
                        Rect {
                            x,
                            y: cursor,
                            w: size.w,
                            h: ch,
                        },
                        team,
                        alpha_scale,
                    );
                    cursor += ch;
                }
            }
            BlockLayout::Row => {
                let mut cursor = x;
                for child in &self.children {
                    let (cw, ch) = child.size(team);
                    if cw == 0 && ch == 0 {
                        continue;
                    }
                    child.draw(
                        inputs,
                        canvas,
                        Rect {
                            x: cursor,
                            y: y + (size.h - ch) / 2,
                            w: cw,
                            h: ch,
                        },
                        team,
                        alpha_scale,
                    );
                    cursor += cw;
                }
            }
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    fn test(self, ord: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering::*;
        match self {
            Self::Eq => ord == Equal,
            Self::Ne => ord != Equal,
            Self::Lt => ord == Less,
            Self::Le => ord != Greater,
            Self::Gt => ord == Greater,
            Self::Ge => ord != Less,
        }
    }
}

#[derive(Clone, Debug)]
pub enum Predicate {
    OnlineGame,
    Intermission,
    PlayersOnTeams,
    PlayersHaveLives,
    ShouldShowRank,
    /// Bit per `GameMode`.
    GameMode(u32),
    GameType(u32),
    EarnType(u32),
    Cvar {
        name: String,
        op: CompareOp,
        operand: CvarValue,
    },
}

impl Predicate {
    pub fn evaluate(&self, inputs: &Inputs) -> bool {
        let game = inputs.game;
        match self {
            Self::OnlineGame => game.role != crate::context::NetworkRole::Offline,
            Self::Intermission => game.intermission,
            Self::PlayersOnTeams => game.players_on_teams,
            Self::PlayersHaveLives => game.players_have_lives,
            Self::ShouldShowRank => game.should_show_rank(),
            Self::GameMode(mask) => mask & game.mode.bit() != 0,
            Self::GameType(mask) => mask & game.game_type != 0,
            Self::EarnType(mask) => mask & game.earn_type != 0,
            Self::Cvar { name, op, operand } => {
                let Some(current) = inputs.cvars.get(name) else {
                    return false;
                };
                let ord = match operand {
                    CvarValue::String(s) => current.as_text().cmp(s),
                    _ => {
                        let lhs = current.as_float();
                        let rhs = operand.as_float();
                        lhs.partial_cmp(&rhs)
                            .unwrap_or(std::cmp::Ordering::Equal)
                    }
                };
                op.test(ord)
            }
        }
    }
}

#[derive(Clone, Debug)]
pub struct ConditionalCommand {
    pub predicate: Predicate,
    pub true_branch: Vec<MarginCommand>,
    pub false_branch: Vec<MarginCommand>,
    taken: bool,
}

impl ConditionalCommand {
    pub fn new(
        predicate: Predicate,
        true_branch: Vec<MarginCommand>,
        false_branch: Vec<MarginCommand>,
    ) -> Self {
        Self {
            predicate,
            true_branch,
            false_branch,
            taken: false,
        }
    }

    fn branch(&self) -> &[MarginCommand] {
        if self.taken {
            &self.true_branch
        } else {
            &self.false_branch
        }
    }

    fn refresh(
        &mut self,
        inputs: &Inputs,
        canvas: &dyn Canvas,
        geom: &mut MarginGeom,
        team: Option<usize>,
    ) -> (i32, i32) {
        self.taken = self.predicate.evaluate(inputs);
        let branch = if self.taken {
            &mut self.true_branch
        } else {
            &mut self.false_branch
        };
        let mut w = 0;
        let mut h = 0;
        for child in branch {
            let (cw, ch) = child.refresh(inputs, canvas, geom, team);
            w = w.max(cw);
            h = h.max(ch);
        }
        (w, h)
    }
}

#[derive(Clone, Debug)]
pub enum MarginCommand {
    DrawString(DrawStringCommand),
    DrawColor(DrawColorCommand),
    DrawTexture(DrawTextureCommand),
    Block(BlockCommand),
    Conditional(ConditionalCommand),
}

impl MarginCommand {
    pub fn base_mut(&mut self) -> Option<&mut ElementBase> {
        match self {
            Self::DrawString(c) => Some(&mut c.base),
            Self::DrawColor(c) => Some(&mut c.base),
            Self::DrawTexture(c) => Some(&mut c.base),
            Self::Block(c) => Some(&mut c.base),
            Self::Conditional(_) => None,
        }
    }

    fn size(&self, team: Option<usize>) -> (i32, i32) {
        match self {
            Self::DrawString(c) => {
                let s = c.base.sizes.get(team);
                (s.w, s.h)
            }
            Self::DrawColor(c) => {
                let s = c.base.sizes.get(team);
                (s.w, s.h)
            }
            Self::DrawTexture(c) => {
                let s = c.base.sizes.get(team);
                (s.w, s.h)
            }
            Self::Block(c) => {
                let s = c.base.sizes.get(team);
                (s.w, s.h)
            }
            Self::Conditional(c) => c
                .branch()
                .iter()
                .map(|child| child.size(team))
                .fold((0, 0), |(w, h), (cw, ch)| (w.max(cw), h.max(ch))),
        }
    }

    fn refresh(
        &mut self,
        inputs: &Inputs,
        canvas: &dyn Canvas,
        geom: &mut MarginGeom,
        team: Option<usize>,
    ) -> (i32, i32) {
        match self {
            Self::DrawString(c) => {
                c.refresh(inputs, canvas, geom, team);
            }
            Self::DrawColor(c) => c.refresh(geom, team),
            Self::DrawTexture(c) => c.refresh(canvas, geom, team),
            Self::Block(c) => c.refresh(inputs, canvas, geom, team),
            Self::Conditional(c) => return c.refresh(inputs, canvas, geom, team),
        }
        self.size(team)
    }

    fn draw(
        &self,
        inputs: &Inputs,
        canvas: &mut dyn Canvas,
        rect: Rect,
        team: Option<usize>,
        alpha_scale: f32,
    ) {
        match self {
            Self::DrawString(c) => c.draw(canvas, rect, team, alpha_scale),
            Self::DrawColor(c) => c.draw(canvas, rect, team, alpha_scale),
            Self::DrawTexture(c) => c.draw(canvas, rect, team, alpha_scale),
            Self::Block(c) => c.draw(inputs, canvas, rect, team, alpha_scale),
            Self::Conditional(c) => {
                for child in c.branch() {
                    child.draw(inputs, canvas, rect, team, alpha_scale);
                }
            }
        }
    }
}

/// One margin of the scoreboard and its command tree. Commands are owned
/// here and dropped wholesale on reparse.
#[derive(Clone, Debug)]
pub struct ScoreMargin {
    pub kind: MarginKind,
    pub width: i32,
    pub height: i32,
    pub commands: Vec<MarginCommand>,
}

impl ScoreMargin {
    pub fn new(kind: MarginKind) -> Self {
        Self {
            kind,
            width: 0,
            height: 0,
            commands: Vec::new(),
        }
    }

    /// Recomputes every command's content and the margin's own size. Team
    /// headers refresh once per populated team and keep the tallest result.
    pub fn refresh(&mut self, inputs: &Inputs, canvas: &dyn Canvas, width: i32) {
        self.width = width.max(0);
        self.height = 0;
        if self.commands.is_empty() || self.width == 0 {
            return;
        }
        let mut geom = MarginGeom {
            width: self.width,
            height: 0,
        };
        if self.kind.is_per_team() {
            for team in inputs.game.teams_with_players() {
                for command in &mut self.commands {
                    command.refresh(inputs, canvas, &mut geom, Some(team));
                }
            }
        } else {
            for command in &mut self.commands {
                command.refresh(inputs, canvas, &mut geom, None);
            }
        }
        self.height = geom.height;
    }

    /// Paints the margin at the given origin. Passing a team to a non-team
    /// margin, or none to the team header, is a caller bug.
    pub fn draw(
        &self,
        inputs: &Inputs,
        canvas: &mut dyn Canvas,
        x: i32,
        y: i32,
        team: Option<usize>,
        alpha: f32,
    ) {
        match (self.kind.is_per_team(), team) {
            (true, None) => panic!("{} margin drawn without a team", self.kind.name()),
            (false, Some(t)) => {
                panic!("{} margin drawn for team {t}", self.kind.name())
            }
            _ => {}
        }
        if self.height == 0 {
            return;
        }
        let rect = Rect {
            x,
            y,
            w: self.width,
            h: self.height,
        };
        for command in &self.commands {
            command.draw(inputs, canvas, rect, team, alpha);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{GameState, NetworkRole, PlayerSnapshot, TeamSnapshot};
    use crate::headless::{HeadlessCanvas, MapCvars};
    use crate::value::CustomDataStore;
    use smallvec::smallvec;

    fn game_with_teams() -> GameState {
        let mut game = GameState {
            players_on_teams: true,
            game_type: crate::context::gametype::TEAMGAME,
            earn_type: crate::context::earntype::POINTS,
            mode: crate::context::GameMode::TeamPlay,
            ..GameState::default()
        };
        game.teams = vec![
            TeamSnapshot {
                name: "Blue".into(),
                score: 3,
                ..TeamSnapshot::default()
            },
            TeamSnapshot {
                name: "Crimson".into(),
                score: 5,
                ..TeamSnapshot::default()
            },
        ];
        for (i, team) in [(0usize, 0u8), (1, 1)] {
            game.players[i] = Some(PlayerSnapshot {
                name: format!("p{i}"),
                team: Some(team),
                ..PlayerSnapshot::default()
            });
        }
        game
    }

    fn string_cmd(canvas: &HeadlessCanvas, chunks: SmallVec<[StringChunk; 4]>) -> DrawStringCommand {
        let font = canvas.font("SmallFont").unwrap();
        DrawStringCommand::new(chunks, font, Color::WHITE)
    }

    #[test]
    fn ordinal_suffixes() {
        assert_eq!(ordinal(1), "1st");
        assert_eq!(ordinal(2), "2nd");
        assert_eq!(ordinal(3), "3rd");
        assert_eq!(ordinal(11), "11th");
        assert_eq!(ordinal(12), "12th");
        assert_eq!(ordinal(22), "22nd");
    }

    #[test]
    fn team_tokens_cache_per_team() {
        let canvas = HeadlessCanvas::new(640, 480);
        let game = game_with_teams();
        let custom = CustomDataStore::default();
        let cvars = MapCvars::default();
        let inputs = Inputs {
            game: &game,
            custom: &custom,
            cvars: &cvars,
        };

        let mut margin = ScoreMargin::new(MarginKind::TeamHeader);
        margin.commands.push(MarginCommand::DrawString(string_cmd(
            &canvas,
            smallvec![StringChunk::Special(SpecialToken::TeamName)],
        )));
        margin.refresh(&inputs, &canvas, 200);

        // Tallest team content wins; both teams have one line of 10px.
        assert_eq!(margin.height, 10);
        let MarginCommand::DrawString(cmd) = &margin.commands[0] else {
            unreachable!()
        };
        assert_eq!(cmd.lines.get(Some(0)), &vec!["Blue".to_string()]);
        assert_eq!(cmd.lines.get(Some(1)), &vec!["Crimson".to_string()]);
    }

    #[test]
    fn multi_line_block_aggregates_and_margin_grows() {
        let canvas = HeadlessCanvas::new(640, 480);
        let game = GameState::default();
        let custom = CustomDataStore::default();
        let cvars = MapCvars::default();
        let inputs = Inputs {
            game: &game,
            custom: &custom,
            cvars: &cvars,
        };

        let children = vec![
            MarginCommand::DrawColor(DrawColorCommand::new(Color::BLACK, 40, 6)),
            MarginCommand::DrawColor(DrawColorCommand::new(Color::WHITE, 24, 8)),
        ];
        let mut margin = ScoreMargin::new(MarginKind::MainHeader);
        margin.commands.push(MarginCommand::Block(BlockCommand::new(
            BlockLayout::MultiLine,
            children,
        )));
        margin.refresh(&inputs, &canvas, 320);

        let (w, h) = margin.commands[0].size(None);
        assert_eq!((w, h), (40, 14), "width is max, height is sum");
        assert_eq!(margin.height, 14);
    }

    #[test]
    fn conditional_routes_refresh_and_draw() {
        let mut canvas = HeadlessCanvas::new(640, 480);
        let game = GameState {
            role: NetworkRole::Client,
            ..GameState::default()
        };
        let custom = CustomDataStore::default();
        let cvars = MapCvars::default();
        let inputs = Inputs {
            game: &game,
            custom: &custom,
            cvars: &cvars,
        };

        let online_box = vec![MarginCommand::DrawColor(DrawColorCommand::new(
            Color::WHITE,
            10,
            10,
        ))];
        let offline_box = vec![MarginCommand::DrawColor(DrawColorCommand::new(
            Color::BLACK,
            99,
            99,
        ))];
        let mut margin = ScoreMargin::new(MarginKind::Footer);
        margin
            .commands
            .push(MarginCommand::Conditional(ConditionalCommand::new(
                Predicate::OnlineGame,
                online_box,
                offline_box,
            )));
        margin.refresh(&inputs, &canvas, 320);
        assert_eq!(margin.height, 10, "only the taken branch contributes");

        margin.draw(&inputs, &mut canvas, 0, 0, None, 1.0);
        assert_eq!(canvas.ops.len(), 1);
        assert!(matches!(
            canvas.ops[0],
            crate::headless::DrawOp::Box { w: 10, h: 10, .. }
        ));
    }

    #[test]
    fn cvar_predicate_operators() {
        let game = GameState::default();
        let custom = CustomDataStore::default();
        let mut cvars = MapCvars::default();
        cvars.set_int("fraglimit", 20);
        let inputs = Inputs {
            game: &game,
            custom: &custom,
            cvars: &cvars,
        };

        let pred = |op, v: i32| Predicate::Cvar {
            name: "fraglimit".into(),
            op,
            operand: CvarValue::Int(v),
        };
        assert!(pred(CompareOp::Gt, 0).evaluate(&inputs));
        assert!(pred(CompareOp::Eq, 20).evaluate(&inputs));
        assert!(!pred(CompareOp::Lt, 20).evaluate(&inputs));
        assert!(pred(CompareOp::Ne, 19).evaluate(&inputs));

        let missing = Predicate::Cvar {
            name: "absent".into(),
            op: CompareOp::Eq,
            operand: CvarValue::Int(0),
        };
        assert!(!missing.evaluate(&inputs), "missing cvar is never true");
    }

    #[test]
    #[should_panic(expected = "drawn without a team")]
    fn team_margin_requires_team() {
        let canvas_game = GameState::default();
        let custom = CustomDataStore::default();
        let cvars = MapCvars::default();
        let inputs = Inputs {
            game: &canvas_game,
            custom: &custom,
            cvars: &cvars,
        };
        let mut canvas = HeadlessCanvas::new(320, 200);
        let mut margin = ScoreMargin::new(MarginKind::TeamHeader);
        margin.height = 5;
        margin.draw(&inputs, &mut canvas, 0, 0, None, 1.0);
    }

    #[test]
    fn wrapping_respects_margin_width() {
        let canvas = HeadlessCanvas::new(640, 480);
        let font = canvas.font("SmallFont").unwrap();
        // 8px per char, 80px budget = 10 chars per line.
        let lines = wrap_text(&canvas, font, "one two three four", 80);
        assert_eq!(lines, vec!["one two", "three four"]);
        assert_eq!(wrap_text(&canvas, font, "", 80), Vec::<String>::new());
    }
}
