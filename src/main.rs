//! Demo binary: parses a SCORINFO file (or a built-in sample), renders one
//! frame of a deterministic game through the headless backend, and prints
//! the resulting draw list.

use scorinfo::headless::{HeadlessCanvas, MapCvars};
use scorinfo::{
    earntype, gametype, GameMode, GameState, NetworkRole, PlayerSnapshot,
};

const SAMPLE: &str = r#"
// A plain deathmatch board: who you are, how you're doing, how laggy you are.
Column "Name"
{
    Type = Name
    DisplayName = "Name"
    AddFlag = AlwaysUseShortestWidth
    Size = 8
}

Column "Frags"
{
    Type = Frags
    DisplayName = "Frags"
    ShortName = "Frg"
    Alignment = Right
    Size = 48
}

Column "Ping"
{
    Type = Ping
    DisplayName = "Ping"
    Alignment = Right
    Size = 40
    AddFlag = OnlineOnly
}

Scoreboard
{
    HeaderFont = "BigFont"
    RowFont = "SmallFont"
    HeaderColor = "Gold"
    BorderSize = 4
    GapBetweenColumns = 6
    ColumnOrder = "Name", "Frags", "Ping"
    RankOrder = "Frags"

    MainHeader
    {
        MultiLineBlock( horizontalalign = center )
        {
            DrawString( value = gamemode, font = "BigFont", textcolor = "Gold" )
            DrawString( value = levelname, font = "SmallFont" )
            IfCVar( "fraglimit" > 0 )
            {
                DrawString( value = "First to " + cvar( "fraglimit" ) + " frags wins", font = "SmallFont" )
            }
        }
    }

    Footer
    {
        IfShouldShowRank
        {
            DrawString( value = "You are in " + placestring + " place with " + pointstring, font = "SmallFont" )
        }
    }
}
"#;

fn sample_game() -> GameState {
    let mut game = GameState {
        mode: GameMode::Deathmatch,
        game_type: gametype::DEATHMATCH,
        earn_type: earntype::FRAGS,
        role: NetworkRole::Client,
        level_name: "Entryway".to_string(),
        level_lump: "MAP01".to_string(),
        skill_name: "Ultra-Violence".to_string(),
        frag_limit: 20,
        local_player: Some(1),
        ..GameState::default()
    };
    let roster = [
        ("Hissy", 12, 48, false),
        ("Rocketeer", 9, 102, false),
        ("Doomguy", 15, 23, false),
        ("Lurker", 0, 61, true),
    ];
    for (i, (name, frags, ping, spectator)) in roster.into_iter().enumerate() {
        game.players[i] = Some(PlayerSnapshot {
            name: name.to_string(),
            frags,
            ping,
            spectator,
            ..PlayerSnapshot::default()
        });
    }
    game
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .try_init();

    let source = match std::env::args().nth(1) {
        Some(path) => std::fs::read_to_string(path)?,
        None => SAMPLE.to_string(),
    };

    let mut canvas = HeadlessCanvas::new(640, 480);
    canvas.register_font("BigFont", 10, 14);
    canvas.register_texture("CTRYFLAG", 256, 256);
    let mut cvars = MapCvars::default();
    cvars.set_int("fraglimit", 20);

    let mut set = scorinfo::parse(&source, &canvas, &cvars)?;
    let game = sample_game();
    set.render(&game, &cvars, &mut canvas, 0);

    println!(
        "scoreboard {}x{} with {} draw calls",
        set.scoreboard.width(),
        set.scoreboard.height(),
        canvas.ops.len()
    );
    for op in &canvas.ops {
        println!("{op:?}");
    }
    Ok(())
}
