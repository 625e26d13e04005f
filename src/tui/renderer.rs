use crate::models::KeybindingsConfig;
use crate::tui::App;
use crate::tui::utils::{key_label, parse_color};
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, Wrap},
};

/// TUI渲染器，负责处理所有UI渲染逻辑
pub struct Renderer {
    help: String,
}

impl Renderer {
    pub fn new(keybindings: &KeybindingsConfig) -> Self {
        let help = format!(
            " {}/{} move  {} top  {} bottom  {} best  {}/Esc quit ",
            key_label(&keybindings.up),
            key_label(&keybindings.down),
            key_label(&keybindings.top),
            key_label(&keybindings.bottom),
            key_label(&keybindings.best),
            key_label(&keybindings.quit),
        );
        Self { help }
    }

    /// 从app结构体中读取数据并渲染
    pub fn draw(&self, f: &mut Frame, app: &mut App) {
        let table_proportion = app.config.table_proportion.clamp(10, 90);

        let outer = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints([Constraint::Min(3), Constraint::Length(1)])
            .split(f.area());

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Percentage(table_proportion),
                Constraint::Percentage(100 - table_proportion),
            ])
            .split(outer[0]);

        self.draw_results_table(f, app, chunks[0]);
        self.draw_details(f, app, chunks[1]);

        let help = Paragraph::new(self.help.as_str())
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center);
        f.render_widget(help, outer[1]);
    }

    /// 绘制强度结果表
    fn draw_results_table(&self, f: &mut Frame, app: &mut App, area: Rect) {
        let colors = &app.config.colors;
        let text = Style::default().fg(parse_color(&colors.text));
        let best = Style::default()
            .fg(parse_color(&colors.best))
            .add_modifier(Modifier::BOLD);
        let failed = Style::default().fg(parse_color(&colors.failed));
        let selected = Style::default()
            .fg(parse_color(&colors.selected))
            .add_modifier(Modifier::REVERSED);

        let header = Row::new(["Strength", "BRISQUE", "SSIM", "Status"])
            .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));

        let rows: Vec<Row> = app
            .report
            .results
            .iter()
            .enumerate()
            .map(|(i, r)| {
                let (brisque, ssim, status, style) = match &r.error {
                    None if app.is_best(i) => (
                        format!("{:.2}", r.brisque),
                        format!("{:.4}", r.ssim),
                        "recommended".to_string(),
                        best,
                    ),
                    None => (format!("{:.2}", r.brisque), format!("{:.4}", r.ssim), String::new(), text),
                    Some(reason) => ("N/A".to_string(), "N/A".to_string(), reason.to_string(), failed),
                };
                Row::new([
                    Cell::from(r.strength.to_string()),
                    Cell::from(brisque),
                    Cell::from(ssim),
                    Cell::from(status),
                ])
                .style(style)
            })
            .collect();

        let strength_width = (app.report.decimal_places as u16 + 4).max(8);
        let widths = [
            Constraint::Length(strength_width),
            Constraint::Length(10),
            Constraint::Length(8),
            Constraint::Min(12),
        ];

        let title = format!(
            "Strengths [{} of {} valid]",
            app.report.valid_count(),
            app.report.results.len()
        );
        let table = Table::new(rows, widths)
            .header(header)
            .block(
                Block::default()
                    .title(title)
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Cyan)),
            )
            .row_highlight_style(selected)
            .highlight_symbol("> ");

        f.render_stateful_widget(table, area, &mut app.table_state);
    }

    /// 绘制选中条目的详情面板
    fn draw_details(&self, f: &mut Frame, app: &App, area: Rect) {
        let title = match app.selected_result() {
            Some(r) => format!("Details - Strength {}", r.strength),
            None => "Details".to_string(),
        };
        let lines: Vec<Line> = app.detail_lines().into_iter().map(Line::from).collect();

        let details = Paragraph::new(lines)
            .block(
                Block::default()
                    .title(title)
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Cyan)),
            )
            .wrap(Wrap { trim: true });

        f.render_widget(details, area);
    }
}
