use crate::models::{EntryError, MetricResult, SweepReport, TuiConfig};
use crate::report::NO_RECOMMENDATION;
use crate::tui::input::UserAction;
use ratatui::widgets::TableState;

/// 报告浏览器状态
pub struct App {
    pub report: SweepReport,
    pub config: TuiConfig,
    pub table_state: TableState, // 表格选中行
    pub should_quit: bool,
}

impl App {
    pub fn new(report: SweepReport, config: TuiConfig) -> Self {
        // 初始选中推荐行，没有推荐时选中第一行
        let initial = report.best.or_else(|| (!report.results.is_empty()).then_some(0));
        Self {
            report,
            config,
            table_state: TableState::default().with_selected(initial),
            should_quit: false,
        }
    }

    /// 处理退出操作
    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.table_state.selected()
    }

    /// 获取当前选中的条目
    pub fn selected_result(&self) -> Option<&MetricResult> {
        self.selected_index().and_then(|i| self.report.results.get(i))
    }

    pub fn is_best(&self, index: usize) -> bool {
        self.report.best == Some(index)
    }

    /// 执行一次用户操作
    pub fn apply(&mut self, action: UserAction) {
        let len = self.report.results.len();
        if len == 0 {
            if action == UserAction::Quit {
                self.quit();
            }
            return;
        }

        let current = self.selected_index().unwrap_or(0);
        let next = match action {
            UserAction::Quit => {
                self.quit();
                return;
            }
            UserAction::MoveUp => current.saturating_sub(1),
            UserAction::MoveDown => (current + 1).min(len - 1),
            UserAction::Top => 0,
            UserAction::Bottom => len - 1,
            UserAction::JumpToBest => match self.report.best {
                Some(best) => best,
                None => return,
            },
            UserAction::None => return,
        };
        self.table_state.select(Some(next));
    }

    /// 详情面板的文本行
    pub fn detail_lines(&self) -> Vec<String> {
        let Some(result) = self.selected_result() else {
            return vec!["No strengths in this sweep".to_string()];
        };

        let mut lines = vec![
            format!("Strength:   {}", result.strength),
            format!("Position:   {} of {}", result.index, self.report.results.len()),
        ];
        match &result.error {
            None => {
                lines.push(format!("BRISQUE:    {:.2}", result.brisque));
                lines.push(format!("SSIM:       {:.4}", result.ssim));
            }
            Some(reason) => {
                lines.push("BRISQUE:    N/A".to_string());
                lines.push("SSIM:       N/A".to_string());
                lines.push(format!("Failure:    {}", reason));
                if let EntryError::Processing(detail) = reason {
                    lines.push(format!("Detail:     {}", detail));
                }
            }
        }

        lines.push(String::new());
        match self.report.best_result() {
            None => lines.push(NO_RECOMMENDATION.to_string()),
            Some(_) if self.selected_index() == self.report.best => {
                lines.push(format!("Recommended strength (tie band {}).", self.report.tolerance));
            }
            Some(best) if result.is_valid() => lines.push(format!(
                "BRISQUE {:+.2} vs recommended {}",
                result.brisque - best.brisque,
                best.strength
            )),
            Some(best) => lines.push(format!("Recommended strength: {}", best.strength)),
        }
        lines
    }
}
