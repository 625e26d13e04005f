use crate::models::KeybindingsConfig;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};

/// 输入处理器，负责将按键事件映射到应用操作
pub struct InputHandler {
    keybindings: KeybindingsConfig,
}

/// 用户操作类型
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UserAction {
    Quit,
    MoveUp,
    MoveDown,
    Top,
    Bottom,
    JumpToBest,
    None,
}

impl InputHandler {
    pub fn new(keybindings: KeybindingsConfig) -> Self {
        Self { keybindings }
    }

    /// 处理按键事件，返回对应的用户操作
    pub fn handle_key_event(&self, key_event: KeyEvent) -> UserAction {
        // Windows下按键释放也会产生事件
        if key_event.kind != KeyEventKind::Press {
            return UserAction::None;
        }

        match key_event.code {
            KeyCode::Esc => UserAction::Quit,
            KeyCode::Up => UserAction::MoveUp,
            KeyCode::Down => UserAction::MoveDown,
            KeyCode::Home => UserAction::Top,
            KeyCode::End => UserAction::Bottom,
            KeyCode::Char(c) => self.handle_char_key(c),
            _ => UserAction::None,
        }
    }

    /// 处理字符按键；区分大小写，"G" 与 "g" 是不同的键
    fn handle_char_key(&self, c: char) -> UserAction {
        let key_str = c.to_string();
        let action_map = [
            (&self.keybindings.quit, UserAction::Quit),
            (&self.keybindings.up, UserAction::MoveUp),
            (&self.keybindings.down, UserAction::MoveDown),
            (&self.keybindings.top, UserAction::Top),
            (&self.keybindings.bottom, UserAction::Bottom),
            (&self.keybindings.best, UserAction::JumpToBest),
        ];

        action_map
            .into_iter()
            .find(|(key, _)| **key == key_str)
            .map(|(_, action)| action)
            .unwrap_or(UserAction::None)
    }
}
