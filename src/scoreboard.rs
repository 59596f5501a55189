//! The scoreboard aggregate: owns the column display order, the sort-key
//! order, the four margins, and the global style, and runs the per-frame
//! refresh -> layout -> sort -> render cycle. Refresh and sort happen at
//! most once per frame no matter how often render is called.

use crate::color::Color;
use crate::column::{ColumnFlags, ColumnId, ColumnRegistry};
use crate::context::{Canvas, ClipRect, FontHandle, Inputs, TextureRef};
use crate::margin::{MarginKind, ScoreMargin};
use crate::value::PlayerValue;
use smallvec::SmallVec;
use std::cmp::Ordering;

/// Global styling parsed from the scoreboard block.
#[derive(Clone, Debug)]
pub struct Style {
    pub header_font: FontHandle,
    pub row_font: FontHandle,
    pub header_color: Color,
    pub row_color: Color,

    pub background_color: Color,
    pub background_amount: f32,
    pub row_light_color: Color,
    pub row_dark_color: Color,
    pub local_row_color: Color,
    pub row_background_amount: f32,

    pub border_color: Color,
    pub border_texture: Option<TextureRef>,
    pub border_size: i32,
    pub column_gap: i32,
    pub column_padding: i32,
    pub row_gap: i32,
    /// Vertical gap between the column headers and the first row.
    pub header_gap: i32,
}

impl Style {
    pub fn with_default_font(font: FontHandle) -> Self {
        Self {
            header_font: font,
            row_font: font,
            header_color: Color::from_hex("#FFD700"),
            row_color: Color::WHITE,
            background_color: Color::BLACK,
            background_amount: 0.5,
            row_light_color: Color::from_hex("#404040"),
            row_dark_color: Color::from_hex("#202020"),
            local_row_color: Color::from_hex("#404000"),
            row_background_amount: 0.65,
            border_color: Color::from_hex("#808080"),
            border_texture: None,
            border_size: 4,
            column_gap: 4,
            column_padding: 1,
            row_gap: 1,
            header_gap: 2,
        }
    }
}

/// Fallback height of one horizontal separator line when no border texture
/// is set; three lines are drawn per scoreboard.
const PLAIN_SEPARATOR_HEIGHT: i32 = 2;

#[derive(Debug)]
pub struct Scoreboard {
    pub style: Style,
    pub column_order: Vec<ColumnId>,
    pub rank_order: SmallVec<[ColumnId; 8]>,
    pub main_header: ScoreMargin,
    pub team_header: ScoreMargin,
    pub spectator_header: ScoreMargin,
    pub footer: ScoreMargin,

    sorted: Vec<usize>,
    width: i32,
    height: i32,
    x: i32,
    y: i32,
    last_frame: Option<u64>,
    needs_usability_check: bool,
}

impl Scoreboard {
    pub fn new(default_font: FontHandle) -> Self {
        Self {
            style: Style::with_default_font(default_font),
            column_order: Vec::new(),
            rank_order: SmallVec::new(),
            main_header: ScoreMargin::new(MarginKind::MainHeader),
            team_header: ScoreMargin::new(MarginKind::TeamHeader),
            spectator_header: ScoreMargin::new(MarginKind::SpectatorHeader),
            footer: ScoreMargin::new(MarginKind::Footer),
            sorted: Vec::new(),
            width: 0,
            height: 0,
            x: 0,
            y: 0,
            last_frame: None,
            needs_usability_check: true,
        }
    }

    pub const fn width(&self) -> i32 {
        self.width
    }

    pub const fn height(&self) -> i32 {
        self.height
    }

    pub fn sorted_players(&self) -> &[usize] {
        &self.sorted
    }

    /// Column ids currently enabled and positioned, in display order.
    pub fn enabled_columns<'a>(
        &'a self,
        registry: &'a ColumnRegistry,
    ) -> impl Iterator<Item = ColumnId> + 'a {
        self.column_order
            .iter()
            .copied()
            .filter(|&id| registry.get(id).shared.enabled())
    }

    /// Marks session-static column gates stale; the next refresh re-runs
    /// them. Call at round or game start.
    pub fn invalidate_usability(&mut self) {
        self.needs_usability_check = true;
        self.last_frame = None;
    }

    /// Renders the scoreboard, refreshing first if this frame hasn't been
    /// refreshed yet.
    pub fn render(
        &mut self,
        registry: &mut ColumnRegistry,
        inputs: &Inputs,
        canvas: &mut dyn Canvas,
        frame: u64,
    ) {
        if self.last_frame != Some(frame) {
            self.refresh(registry, inputs, canvas);
            self.last_frame = Some(frame);
        }
        self.draw(registry, inputs, canvas);
    }

    /// Recomputes enabled state, content sizes, pixel geometry, and the
    /// player sort. Safe to call directly for explicit invalidation.
    pub fn refresh(
        &mut self,
        registry: &mut ColumnRegistry,
        inputs: &Inputs,
        canvas: &dyn Canvas,
    ) {
        if self.needs_usability_check {
            for &id in &self.column_order {
                registry.check_usable(id, inputs.game);
            }
            self.needs_usability_check = false;
        }

        for &id in &self.column_order {
            registry.refresh(id, inputs);
            if registry.get(id).shared.enabled() {
                registry.update_width(
                    id,
                    inputs,
                    canvas,
                    self.style.row_font,
                    self.style.header_font,
                );
            }
        }

        self.update_width(registry, canvas);

        let margin_width = (self.width - 2 * self.style.border_size).max(0);
        self.main_header.refresh(inputs, canvas, margin_width);
        self.team_header.refresh(inputs, canvas, margin_width);
        self.spectator_header.refresh(inputs, canvas, margin_width);
        self.footer.refresh(inputs, canvas, margin_width);

        self.update_height(inputs, canvas);
        self.sort_players(registry, inputs);
    }

    /// Packs enabled columns into the screen width: proportional shrink
    /// when over budget, then center and assign positions left to right.
    fn update_width(&mut self, registry: &mut ColumnRegistry, canvas: &dyn Canvas) {
        let active: SmallVec<[ColumnId; 16]> = self.enabled_columns(registry).collect();
        if active.is_empty() {
            self.width = 0;
            self.x = canvas.screen_width() / 2;
            return;
        }

        let n = active.len() as i32;
        let overhead = (n - 1) * self.style.column_gap
            + 2 * self.style.column_padding * n
            + 2 * self.style.border_size;
        let sum_w: i32 = active.iter().map(|&id| registry.get(id).shared.width).sum();
        let sum_short: i32 = active
            .iter()
            .map(|&id| registry.get(id).shared.shortest_width)
            .sum();

        let screen_w = canvas.screen_width();
        let mut total = sum_w + overhead;
        if total > screen_w {
            let floor = sum_short.max(screen_w - overhead);
            if sum_w > floor {
                let mut pairs: Vec<(i32, i32)> = active
                    .iter()
                    .map(|&id| {
                        let s = &registry.get(id).shared;
                        (s.width, s.shortest_width)
                    })
                    .collect();
                proportional_shrink(&mut pairs, sum_w - floor);
                for (&id, &(w, _)) in active.iter().zip(&pairs) {
                    registry.get_mut(id).shared.width = w;
                }
            }
            let new_sum: i32 = active.iter().map(|&id| registry.get(id).shared.width).sum();
            total = new_sum + overhead;
        }

        self.width = total;
        self.x = (screen_w - total) / 2;

        let mut cursor = self.x + self.style.border_size;
        for (i, &id) in active.iter().enumerate() {
            let shared = &mut registry.get_mut(id).shared;
            shared.x = cursor + self.style.column_padding;
            cursor += shared.width + 2 * self.style.column_padding;
            if i + 1 < active.len() {
                cursor += self.style.column_gap;
            }
        }
    }

    fn separator_height(&self, canvas: &dyn Canvas) -> i32 {
        self.style
            .border_texture
            .as_ref()
            .map_or(PLAIN_SEPARATOR_HEIGHT, |t| canvas.texture_size(t.handle).1)
    }

    /// Accumulates the total height top to bottom, then centers it.
    fn update_height(&mut self, inputs: &Inputs, canvas: &dyn Canvas) {
        let game = inputs.game;
        let row_h = canvas.font_height(self.style.row_font);
        let header_h = canvas.font_height(self.style.header_font);
        let separator_h = self.separator_height(canvas);

        let mut h = 2 * self.style.border_size;
        h += self.main_header.height;
        h += 3 * separator_h;
        h += header_h + self.style.header_gap;

        let active = game.active_player_count() as i32;
        h += active * (row_h + self.style.row_gap);

        if game.players_on_teams {
            let teams = game.teams_with_players().len() as i32;
            h += self.team_header.height * teams;
            h += (teams - 1).max(0) * row_h;
        }

        let spectators = game.spectator_count() as i32;
        if spectators > 0 {
            h += row_h;
            h += self.spectator_header.height;
            h += spectators * (row_h + self.style.row_gap);
        }

        h += self.footer.height;

        self.height = h;
        self.y = (canvas.screen_height() - h) / 2;
    }

    fn sort_players(&mut self, registry: &ColumnRegistry, inputs: &Inputs) {
        self.sorted = (0..inputs.game.players.len()).collect();
        let rank_order = &self.rank_order;
        self.sorted.sort_by(|&a, &b| {
            compare_players(registry, rank_order, inputs, a, b)
        });
    }

    fn draw(&mut self, registry: &mut ColumnRegistry, inputs: &Inputs, canvas: &mut dyn Canvas) {
        if self.width == 0 {
            return;
        }
        let style = self.style.clone();
        let game = inputs.game;
        let inner_x = self.x + style.border_size;
        let inner_w = self.width - 2 * style.border_size;
        let row_h = canvas.font_height(style.row_font);
        let header_h = canvas.font_height(style.header_font);

        canvas.draw_box(
            self.x,
            self.y,
            self.width,
            self.height,
            style.background_color,
            style.background_amount,
        );

        let mut cur_y = self.y + style.border_size;

        self.main_header.draw(inputs, canvas, inner_x, cur_y, None, 1.0);
        cur_y += self.main_header.height;
        cur_y += self.draw_separator(canvas, inner_x, cur_y, inner_w);

        for id in self.column_order.clone() {
            if registry.get(id).shared.enabled() {
                registry.draw_header(
                    id,
                    cur_y,
                    header_h,
                    style.header_color,
                    1.0,
                    canvas,
                    style.header_font,
                );
            }
        }
        cur_y += header_h;
        cur_y += self.draw_separator(canvas, inner_x, cur_y, inner_w);
        cur_y += style.header_gap;

        let mut row_parity = 0usize;
        let mut current_team: Option<u8> = None;
        let mut team_blocks_drawn = 0usize;
        let sorted = self.sorted.clone();

        // Active players, already bucketed by team when team separation is
        // on (the comparator guarantees grouping).
        for &player in &sorted {
            let Some(snapshot) = game.player(player) else {
                continue;
            };
            if snapshot.spectator {
                continue;
            }
            if game.players_on_teams && current_team != snapshot.team {
                if team_blocks_drawn > 0 {
                    cur_y += row_h;
                }
                current_team = snapshot.team;
                if let Some(team) = snapshot.team {
                    self.team_header
                        .draw(inputs, canvas, inner_x, cur_y, Some(team as usize), 1.0);
                    cur_y += self.team_header.height;
                }
                team_blocks_drawn += 1;
            }
            self.draw_row(registry, inputs, canvas, player, cur_y, row_h, inner_x, inner_w, row_parity);
            cur_y += row_h + style.row_gap;
            row_parity += 1;
        }

        if game.spectator_count() > 0 {
            cur_y += row_h;
            self.spectator_header.draw(inputs, canvas, inner_x, cur_y, None, 1.0);
            cur_y += self.spectator_header.height;
            for &player in &sorted {
                let Some(snapshot) = game.player(player) else {
                    continue;
                };
                if !snapshot.spectator {
                    continue;
                }
                self.draw_row(registry, inputs, canvas, player, cur_y, row_h, inner_x, inner_w, row_parity);
                cur_y += row_h + style.row_gap;
                row_parity += 1;
            }
        }

        cur_y += self.draw_separator(canvas, inner_x, cur_y, inner_w);
        self.footer.draw(inputs, canvas, inner_x, cur_y, None, 1.0);
    }

    /// Draws one horizontal separator line and returns its height.
    fn draw_separator(&self, canvas: &mut dyn Canvas, x: i32, y: i32, w: i32) -> i32 {
        match &self.style.border_texture {
            Some(texture) => {
                let (_, th) = canvas.texture_size(texture.handle);
                canvas.draw_texture(
                    texture.handle,
                    x,
                    y,
                    1.0,
                    Some(ClipRect { x, y, w, h: th }),
                );
                th
            }
            None => {
                canvas.draw_box(x, y, w, PLAIN_SEPARATOR_HEIGHT, self.style.border_color, 1.0);
                PLAIN_SEPARATOR_HEIGHT
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn draw_row(
        &self,
        registry: &mut ColumnRegistry,
        inputs: &Inputs,
        canvas: &mut dyn Canvas,
        player: usize,
        y: i32,
        row_h: i32,
        inner_x: i32,
        inner_w: i32,
        parity: usize,
    ) {
        let style = &self.style;
        let game = inputs.game;
        // Team games tint rows with the team color; everyone else alternates.
        let team_color = game
            .player(player)
            .filter(|p| game.players_on_teams && !p.spectator)
            .and_then(|p| p.team)
            .and_then(|t| game.teams.get(t as usize))
            .map(|t| t.color);
        let background = if game.local_player == Some(player) {
            style.local_row_color
        } else if let Some(color) = team_color {
            color
        } else if parity % 2 == 0 {
            style.row_light_color
        } else {
            style.row_dark_color
        };
        canvas.draw_box(inner_x, y, inner_w, row_h, background, style.row_background_amount);

        for id in self.column_order.clone() {
            if registry.get(id).shared.enabled() {
                registry.draw_value(
                    id,
                    player,
                    y,
                    row_h,
                    style.row_color,
                    1.0,
                    inputs,
                    canvas,
                    style.row_font,
                );
            }
        }
    }
}

/// Shrinks `(width, shortest_width)` pairs by `required` pixels total,
/// proportionally to each column's slack. Per-column amounts truncate; the
/// remainder is deliberately not redistributed, so the achieved shrink may
/// fall short by a few pixels. No column ever drops below its shortest
/// width.
pub fn proportional_shrink(columns: &mut [(i32, i32)], required: i32) {
    let total_slack: i32 = columns.iter().map(|&(w, s)| (w - s).max(0)).sum();
    if total_slack <= 0 || required <= 0 {
        return;
    }
    let scale = required as f32 / total_slack as f32;
    for (width, shortest) in columns.iter_mut() {
        let slack = (*width - *shortest).max(0);
        if slack == 0 {
            continue;
        }
        let cut = ((slack as f32 * scale) as i32).min(slack);
        *width -= cut;
    }
}

/// The one comparator behind the rank order: invalid slots last, true
/// spectators after players, teams grouped ascending, then the rank-order
/// columns in sequence. Unknown values always lose to known ones. Numeric
/// kinds order descending by default, strings ascending; a column's
/// reverse-order flag flips its contribution.
pub fn compare_players(
    registry: &ColumnRegistry,
    rank_order: &[ColumnId],
    inputs: &Inputs,
    a: usize,
    b: usize,
) -> Ordering {
    let game = inputs.game;
    let (pa, pb) = (game.player(a), game.player(b));
    let (pa, pb) = match (pa, pb) {
        (None, None) => return Ordering::Equal,
        (None, Some(_)) => return Ordering::Greater,
        (Some(_), None) => return Ordering::Less,
        (Some(pa), Some(pb)) => (pa, pb),
    };

    match (pa.spectator, pb.spectator) {
        (true, false) => return Ordering::Greater,
        (false, true) => return Ordering::Less,
        _ => {}
    }

    if game.players_on_teams && !pa.spectator {
        let (ta, tb) = (
            pa.team.map_or(u8::MAX, |t| t),
            pb.team.map_or(u8::MAX, |t| t),
        );
        let ord = ta.cmp(&tb);
        if ord != Ordering::Equal {
            return ord;
        }
    }

    for &id in rank_order {
        let va = registry.value_for(id, a, inputs);
        let vb = registry.value_for(id, b, inputs);
        match (va.is_unknown(), vb.is_unknown()) {
            (true, true) => continue,
            (true, false) => return Ordering::Greater,
            (false, true) => return Ordering::Less,
            (false, false) => {}
        }
        let ord = match (&va, &vb) {
            (PlayerValue::Int(x), PlayerValue::Int(y)) => y.cmp(x),
            (PlayerValue::Float(x), PlayerValue::Float(y)) => {
                y.partial_cmp(x).unwrap_or(Ordering::Equal)
            }
            (PlayerValue::Bool(x), PlayerValue::Bool(y)) => y.cmp(x),
            (PlayerValue::String(x), PlayerValue::String(y)) => {
                let x = crate::color::strip_color_codes(x).to_ascii_lowercase();
                let y = crate::color::strip_color_codes(y).to_ascii_lowercase();
                x.cmp(&y)
            }
            _ => Ordering::Equal,
        };
        let ord = if registry
            .get(id)
            .shared
            .flags
            .contains(ColumnFlags::REVERSE_ORDER)
        {
            ord.reverse()
        } else {
            ord
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::{
        Column, ColumnKind, ColumnShared, DataColumn, DataSource, NativeKind,
    };
    use crate::context::{earntype, gametype, GameMode, GameState, PlayerSnapshot};
    use crate::headless::{HeadlessCanvas, MapCvars};
    use crate::value::CustomDataStore;

    fn native(reg: &mut ColumnRegistry, name: &str, kind: NativeKind) -> ColumnId {
        reg.register(Column {
            shared: ColumnShared::new(name),
            kind: ColumnKind::Data(DataColumn::new(DataSource::Native(kind))),
        })
        .unwrap()
    }

    fn dm_game(frags: &[i32]) -> GameState {
        let mut game = GameState {
            mode: GameMode::Deathmatch,
            game_type: gametype::DEATHMATCH,
            earn_type: earntype::FRAGS,
            ..GameState::default()
        };
        for (i, &f) in frags.iter().enumerate() {
            game.players[i] = Some(PlayerSnapshot {
                name: format!("Player{i}"),
                frags: f,
                ..PlayerSnapshot::default()
            });
        }
        game
    }

    #[test]
    fn shrink_never_violates_shortest_width() {
        let mut cols = vec![(120, 40), (80, 80), (60, 20), (200, 10)];
        let original: i32 = cols.iter().map(|&(w, _)| w).sum();
        let shortest_sum: i32 = cols.iter().map(|&(_, s)| s).sum();
        let required = original - shortest_sum - 25;
        proportional_shrink(&mut cols, required);

        for &(w, s) in &cols {
            assert!(w >= s, "column shrank below its shortest width: {w} < {s}");
        }
        let achieved: i32 = cols.iter().map(|&(w, _)| w).sum();
        // Per-column truncation may leave a few pixels unshrunk, never the
        // other way around.
        assert!(achieved >= original - required);
        assert!(achieved - (original - required) < cols.len() as i32);
        // The fully-slackless column is untouched.
        assert_eq!(cols[1].0, 80);
    }

    #[test]
    fn shrink_is_proportional_and_truncating() {
        // Slack 30 and 10, required 20: exact cuts are 15 and 5.
        let mut cols = vec![(50, 20), (30, 20)];
        proportional_shrink(&mut cols, 20);
        assert_eq!(cols, vec![(35, 20), (25, 20)]);

        // Required 19 over the same slack: scale 0.475 gives raw cuts
        // 14.25 and 4.75, truncated to 14 and 4.
        let mut cols = vec![(50, 20), (30, 20)];
        proportional_shrink(&mut cols, 19);
        assert_eq!(cols, vec![(36, 20), (26, 20)]);
    }

    #[test]
    fn sort_is_stable_and_unknowns_lose() {
        let mut reg = ColumnRegistry::default();
        let frags = native(&mut reg, "frags", NativeKind::Frags);
        // Handicap reads Unknown when zero.
        let handicap = native(&mut reg, "handicap", NativeKind::Handicap);

        let mut game = dm_game(&[5, 12, 12, 7]);
        game.players[3].as_mut().unwrap().handicap = 50;
        let custom = CustomDataStore::default();
        let cvars = MapCvars::default();
        let inputs = Inputs {
            game: &game,
            custom: &custom,
            cvars: &cvars,
        };

        let mut board = Scoreboard::new(FontHandle(0));
        board.rank_order.push(frags);
        board.sort_players(&reg, &inputs);
        let order: Vec<usize> = board
            .sorted_players()
            .iter()
            .copied()
            .filter(|&p| game.player(p).is_some())
            .collect();
        // Two 12-frag players keep their original relative order.
        assert_eq!(order, vec![1, 2, 3, 0]);

        // With handicap as the only key: the one known value wins, ties
        // (all Unknown) preserve input order.
        board.rank_order.clear();
        board.rank_order.push(handicap);
        board.sort_players(&reg, &inputs);
        let order: Vec<usize> = board
            .sorted_players()
            .iter()
            .copied()
            .filter(|&p| game.player(p).is_some())
            .collect();
        assert_eq!(order, vec![3, 0, 1, 2], "known handicap sorts first");
    }

    #[test]
    fn string_sort_is_ascending_and_reversible() {
        let mut reg = ColumnRegistry::default();
        let name = native(&mut reg, "name", NativeKind::Name);
        let mut game = dm_game(&[0, 0, 0]);
        game.players[0].as_mut().unwrap().name = "zeta".into();
        game.players[1].as_mut().unwrap().name = "Alpha".into();
        game.players[2].as_mut().unwrap().name = "mid".into();
        let custom = CustomDataStore::default();
        let cvars = MapCvars::default();
        let inputs = Inputs {
            game: &game,
            custom: &custom,
            cvars: &cvars,
        };

        let mut board = Scoreboard::new(FontHandle(0));
        board.rank_order.push(name);
        board.sort_players(&reg, &inputs);
        let order: Vec<usize> = board
            .sorted_players()
            .iter()
            .copied()
            .filter(|&p| game.player(p).is_some())
            .collect();
        assert_eq!(order, vec![1, 2, 0], "case-insensitive ascending");

        reg.get_mut(name).shared.flags |= ColumnFlags::REVERSE_ORDER;
        board.sort_players(&reg, &inputs);
        let order: Vec<usize> = board
            .sorted_players()
            .iter()
            .copied()
            .filter(|&p| game.player(p).is_some())
            .collect();
        assert_eq!(order, vec![0, 2, 1]);
    }

    #[test]
    fn teams_never_interleave() {
        let mut reg = ColumnRegistry::default();
        let frags = native(&mut reg, "frags", NativeKind::Frags);
        let mut game = dm_game(&[9, 1, 8, 2, 7]);
        game.players_on_teams = true;
        game.game_type = gametype::TEAMGAME;
        game.mode = GameMode::TeamPlay;
        for (i, team) in [(0usize, 1u8), (1, 0), (2, 1), (3, 0), (4, 1)] {
            game.players[i].as_mut().unwrap().team = Some(team);
        }
        let custom = CustomDataStore::default();
        let cvars = MapCvars::default();
        let inputs = Inputs {
            game: &game,
            custom: &custom,
            cvars: &cvars,
        };

        let mut board = Scoreboard::new(FontHandle(0));
        board.rank_order.push(frags);
        board.sort_players(&reg, &inputs);
        let teams: Vec<u8> = board
            .sorted_players()
            .iter()
            .filter_map(|&p| game.player(p))
            .filter_map(|p| p.team)
            .collect();
        assert_eq!(teams, vec![0, 0, 1, 1, 1], "lower team index first, no mixing");

        // Within each team the frag order still holds.
        let frags_in_order: Vec<i32> = board
            .sorted_players()
            .iter()
            .filter_map(|&p| game.player(p))
            .map(|p| p.frags)
            .collect();
        assert_eq!(frags_in_order, vec![2, 1, 9, 8, 7]);
    }

    #[test]
    fn spectators_sort_last() {
        let mut reg = ColumnRegistry::default();
        let frags = native(&mut reg, "frags", NativeKind::Frags);
        let mut game = dm_game(&[3, 100, 4]);
        game.players[1].as_mut().unwrap().spectator = true;
        let custom = CustomDataStore::default();
        let cvars = MapCvars::default();
        let inputs = Inputs {
            game: &game,
            custom: &custom,
            cvars: &cvars,
        };

        let mut board = Scoreboard::new(FontHandle(0));
        board.rank_order.push(frags);
        board.sort_players(&reg, &inputs);
        let order: Vec<usize> = board
            .sorted_players()
            .iter()
            .copied()
            .filter(|&p| game.player(p).is_some())
            .collect();
        assert_eq!(order, vec![2, 0, 1], "spectator last despite top frags");
    }

    #[test]
    fn layout_centers_and_spaces_columns() {
        let canvas = HeadlessCanvas::new(640, 480);
        let font = canvas.font("SmallFont").unwrap();
        let mut reg = ColumnRegistry::default();
        let name = native(&mut reg, "name", NativeKind::Name);
        let frags = native(&mut reg, "frags", NativeKind::Frags);

        let game = dm_game(&[5, 12]);
        let custom = CustomDataStore::default();
        let cvars = MapCvars::default();
        let inputs = Inputs {
            game: &game,
            custom: &custom,
            cvars: &cvars,
        };

        let mut board = Scoreboard::new(font);
        board.style.border_size = 4;
        board.style.column_gap = 4;
        board.style.column_padding = 1;
        board.column_order = vec![name, frags];
        board.rank_order.push(frags);
        board.refresh(&mut reg, &inputs, &canvas);

        let name_w = reg.get(name).shared.width;
        let frags_w = reg.get(frags).shared.width;
        // 2 columns: overhead = 1*gap + 2*padding*2 + 2*border = 4+4+8.
        assert_eq!(board.width(), name_w + frags_w + 16);
        let expected_x = (640 - board.width()) / 2;
        assert_eq!(
            reg.get(name).shared.x,
            expected_x + 4 + 1,
            "first column sits after border plus padding"
        );
        assert_eq!(
            reg.get(frags).shared.x,
            expected_x + 4 + 1 + name_w + 1 + 4 + 1,
            "second column after width, padding pair, and gap"
        );
    }

    #[test]
    fn oversized_layout_shrinks_to_screen() {
        let canvas = HeadlessCanvas::new(200, 480);
        let font = canvas.font("SmallFont").unwrap();
        let mut reg = ColumnRegistry::default();
        let name = native(&mut reg, "name", NativeKind::Name);
        reg.get_mut(name).shared.sizing = 400;

        let game = dm_game(&[1]);
        let custom = CustomDataStore::default();
        let cvars = MapCvars::default();
        let inputs = Inputs {
            game: &game,
            custom: &custom,
            cvars: &cvars,
        };

        let mut board = Scoreboard::new(font);
        board.column_order = vec![name];
        board.refresh(&mut reg, &inputs, &canvas);

        assert!(board.width() <= 200, "must shrink into the screen");
        assert!(
            reg.get(name).shared.width >= reg.get(name).shared.shortest_width,
            "shrink floor is the shortest width"
        );
    }

    #[test]
    fn render_refreshes_once_per_frame() {
        let mut canvas = HeadlessCanvas::new(640, 480);
        let font = canvas.font("SmallFont").unwrap();
        let mut reg = ColumnRegistry::default();
        let name = native(&mut reg, "name", NativeKind::Name);
        let game = dm_game(&[1, 2]);
        let custom = CustomDataStore::default();
        let cvars = MapCvars::default();
        let inputs = Inputs {
            game: &game,
            custom: &custom,
            cvars: &cvars,
        };

        let mut board = Scoreboard::new(font);
        board.column_order = vec![name];
        board.render(&mut reg, &inputs, &mut canvas, 7);
        let first = canvas.ops.len();
        assert!(first > 0);

        // Same frame again: no re-refresh, identical output.
        canvas.clear_ops();
        board.render(&mut reg, &inputs, &mut canvas, 7);
        assert_eq!(canvas.ops.len(), first);
    }
}
