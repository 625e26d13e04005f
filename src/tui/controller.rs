use crate::models::KeybindingsConfig;
use crate::tui::{App, Event, EventHandler, InputHandler, Renderer};
use anyhow::Result;
use crossterm::{
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::io;
use std::time::Duration;

/// TUI应用控制器，负责协调各个组件
pub struct TuiApp {
    app: App,
    input_handler: InputHandler,
    renderer: Renderer,
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
}

impl TuiApp {
    pub fn new(app: App, keybindings: KeybindingsConfig) -> Result<Self> {
        // 设置终端
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;

        Ok(Self {
            app,
            renderer: Renderer::new(&keybindings),
            input_handler: InputHandler::new(keybindings),
            terminal,
        })
    }

    /// 运行主循环；无论循环是否出错都会恢复终端
    pub fn run(&mut self) -> Result<()> {
        let result = self.event_loop();
        self.cleanup()?;
        result
    }

    fn event_loop(&mut self) -> Result<()> {
        let tick_rate = Duration::from_millis(self.app.config.refresh_rate_ms.max(16));
        let events = EventHandler::new(tick_rate);

        while !self.app.should_quit {
            self.terminal.draw(|f| {
                self.renderer.draw(f, &mut self.app);
            })?;

            match events.next()? {
                Event::Input(event) => {
                    let action = self.input_handler.handle_key_event(event);
                    self.app.apply(action);
                }
                Event::Tick => {}
            }
        }
        Ok(())
    }

    // 清理终端设置
    fn cleanup(&mut self) -> Result<()> {
        disable_raw_mode()?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen)?;
        self.terminal.show_cursor()?;
        Ok(())
    }
}
