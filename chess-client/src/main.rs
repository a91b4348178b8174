//! 终端前端：输入代数记号（如 `e2 e4`）点击格子，`quit` 退出

use anyhow::Result;
use chess_client::{ClientConfig, Game, Renderer, TileColour};
use protocol::{GameState, RectLayout, RuleError, TileId};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// 以文本方式打印棋盘
struct TerminalRenderer {
    layout: RectLayout,
}

impl TerminalRenderer {
    fn name(&self, tile: TileId) -> String {
        self.layout
            .square_name(tile)
            .unwrap_or_else(|| tile.to_string())
    }

    fn print(&self, state: &GameState) {
        for row in self.layout.render(state.topology()) {
            println!("  {}", row);
        }
        println!("turn {}, player {} to move", state.turn(), state.current_player());
    }
}

impl Renderer for TerminalRenderer {
    fn colour(&mut self, tile: TileId, colour: TileColour) {
        if colour == TileColour::Selected {
            println!("选中 {}", self.name(tile));
        }
    }

    fn draw(&mut self, state: &GameState) {
        self.print(state);
    }

    fn rejected(&mut self, from: TileId, to: TileId, error: &RuleError) {
        println!("{} -> {} 被拒绝: {}", self.name(from), self.name(to), error);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("chess_client=info".parse()?))
        .init();

    info!("拓扑国际象棋客户端启动中...");

    let config = ClientConfig::load();
    let layout = RectLayout::standard();
    let renderer = TerminalRenderer { layout };
    renderer.print(&protocol::standard_game()?.with_limit(config.move_limit));

    let game = Game::from_config(&config, renderer).await?;
    let interrupts = game.interrupts();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    'input: while let Some(line) = lines.next_line().await? {
        for word in line.split_whitespace() {
            if word == "quit" {
                break 'input;
            }
            match layout.square(word) {
                Some(tile) => interrupts.click(tile).await?,
                None => eprintln!("未知格子: {}", word),
            }
        }
    }

    game.shutdown().await?;
    Ok(())
}
