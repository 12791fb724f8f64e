use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ledger_recon::{BankTransaction, Discrepancy, Money, ReconciliationResult, SystemTransaction};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Summary,
    UnmatchedSystem,
    UnmatchedBank,
    Discrepancies,
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::Summary => Page::UnmatchedSystem,
            Page::UnmatchedSystem => Page::UnmatchedBank,
            Page::UnmatchedBank => Page::Discrepancies,
            Page::Discrepancies => Page::Summary,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Page::Summary => Page::Discrepancies,
            Page::UnmatchedSystem => Page::Summary,
            Page::UnmatchedBank => Page::UnmatchedSystem,
            Page::Discrepancies => Page::UnmatchedBank,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Page::Summary => "Summary",
            Page::UnmatchedSystem => "Unmatched System",
            Page::UnmatchedBank => "Unmatched Bank",
            Page::Discrepancies => "Discrepancies",
        }
    }
}

pub struct App {
    pub result: ReconciliationResult,
    /// Unmatched bank rows flattened in statement order
    pub bank_rows: Vec<BankTransaction>,
    /// Statement label the bank page is narrowed to
    pub bank_filter: Option<String>,
    pub state: TableState,
    pub current_page: Page,
    pub show_detail: bool,
}

impl App {
    pub fn new(result: ReconciliationResult) -> Self {
        let bank_rows = result.unmatched_bank.values().flatten().cloned().collect();

        Self {
            result,
            bank_rows,
            bank_filter: None,
            state: TableState::default(),
            current_page: Page::Summary,
            show_detail: false,
        }
    }

    pub fn toggle_detail(&mut self) {
        self.show_detail = !self.show_detail;
    }

    /// Number of selectable rows on the current page
    pub fn row_count(&self) -> usize {
        match self.current_page {
            Page::Summary => 0,
            Page::UnmatchedSystem => self.result.unmatched_system.len(),
            Page::UnmatchedBank => self.visible_bank_rows().len(),
            Page::Discrepancies => self.result.discrepancies.len(),
        }
    }

    pub fn visible_bank_rows(&self) -> Vec<&BankTransaction> {
        self.bank_rows
            .iter()
            .filter(|tx| self.bank_filter.as_ref().map_or(true, |label| &tx.bank_label == label))
            .collect()
    }

    /// Cycle the bank page through: all statements, then each label in turn
    pub fn cycle_bank_filter(&mut self) {
        let labels: Vec<&String> = self.result.unmatched_bank.keys().collect();

        self.bank_filter = match &self.bank_filter {
            None => labels.first().map(|l| l.to_string()),
            Some(current) => labels
                .iter()
                .position(|l| *l == current)
                .and_then(|i| labels.get(i + 1))
                .map(|l| l.to_string()),
        };

        self.reset_selection();
    }

    pub fn selected_system(&self) -> Option<&SystemTransaction> {
        self.state.selected().and_then(|i| self.result.unmatched_system.get(i))
    }

    pub fn selected_discrepancy(&self) -> Option<&Discrepancy> {
        self.state.selected().and_then(|i| self.result.discrepancies.get(i))
    }

    pub fn next_page(&mut self) {
        self.current_page = self.current_page.next();
        self.reset_selection();
    }

    pub fn previous_page(&mut self) {
        self.current_page = self.current_page.previous();
        self.reset_selection();
    }

    fn reset_selection(&mut self) {
        self.state.select(if self.row_count() > 0 { Some(0) } else { None });
    }

    pub fn next(&mut self) {
        let len = self.row_count();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) if i >= len - 1 => 0,
            Some(i) => i + 1,
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.row_count();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(0) => len - 1,
            Some(i) => i - 1,
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn page_down(&mut self) {
        let len = self.row_count();
        if len == 0 {
            return;
        }
        let i = self.state.selected().map_or(0, |i| (i + 20).min(len - 1));
        self.state.select(Some(i));
    }

    pub fn page_up(&mut self) {
        if self.row_count() == 0 {
            return;
        }
        let i = self.state.selected().map_or(0, |i| i.saturating_sub(20));
        self.state.select(Some(i));
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("Error: {:?}", err);
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Enter => app.toggle_detail(),
                KeyCode::Tab => {
                    if key.modifiers.contains(KeyModifiers::SHIFT) {
                        app.previous_page();
                    } else {
                        app.next_page();
                    }
                }
                KeyCode::BackTab => app.previous_page(),
                KeyCode::Char('b') if app.current_page == Page::UnmatchedBank => app.cycle_bank_filter(),
                KeyCode::Down | KeyCode::Char('j') => app.next(),
                KeyCode::Up | KeyCode::Char('k') => app.previous(),
                KeyCode::PageDown => app.page_down(),
                KeyCode::PageUp => app.page_up(),
                KeyCode::Home if app.row_count() > 0 => app.state.select(Some(0)),
                KeyCode::End if app.row_count() > 0 => app.state.select(Some(app.row_count() - 1)),
                _ => {}
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with navigation
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    let detail_page = matches!(app.current_page, Page::UnmatchedSystem | Page::Discrepancies);
    let content = if app.show_detail && detail_page {
        let content_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(chunks[1]);

        render_detail_panel(f, content_chunks[1], app);
        content_chunks[0]
    } else {
        chunks[1]
    };

    match app.current_page {
        Page::Summary => render_summary(f, content, app),
        Page::UnmatchedSystem => render_system_table(f, content, app),
        Page::UnmatchedBank => render_bank_table(f, content, app),
        Page::Discrepancies => render_discrepancy_table(f, content, app),
    }

    render_status_bar(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let pages = [Page::Summary, Page::UnmatchedSystem, Page::UnmatchedBank, Page::Discrepancies];

    let mut tab_spans = vec![];
    for (i, page) in pages.iter().enumerate() {
        if i > 0 {
            tab_spans.push(Span::raw(" │ "));
        }

        let style = if *page == app.current_page {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        tab_spans.push(Span::styled(page.title().to_string(), style));
    }

    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("✓ {}", app.result.total_matched),
        Style::default().fg(Color::Green),
    ));
    tab_spans.push(Span::raw("  "));
    tab_spans.push(Span::styled(
        format!("✗ {}", app.result.total_unmatched),
        Style::default().fg(Color::Red),
    ));

    let header = Paragraph::new(vec![Line::from(tab_spans)])
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));

    f.render_widget(header, area);
}

fn header_row(titles: &[&'static str]) -> Row<'static> {
    let cells = titles
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)));

    Row::new(cells).style(Style::default().bg(Color::DarkGray)).height(1)
}

fn amount_color(amount: Money) -> Color {
    if amount.is_negative() {
        Color::Red
    } else {
        Color::Green
    }
}

fn titled_block(title: String) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::White))
        .title(title)
}

fn highlight() -> Style {
    Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD)
}

fn render_summary(f: &mut Frame, area: Rect, app: &App) {
    let result = &app.result;
    let diag = &result.diagnostics;
    let label = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);

    let verdict = if result.is_fully_reconciled() {
        Span::styled("  ✅ Fully reconciled", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD))
    } else {
        Span::styled("  ❌ Open items remain", Style::default().fg(Color::Red).add_modifier(Modifier::BOLD))
    };

    let mut content = vec![
        Line::from(""),
        Line::from(verdict),
        Line::from(""),
        Line::from(vec![Span::styled("  Processed:          ", label), Span::raw(result.total_processed.to_string())]),
        Line::from(vec![
            Span::styled("  Matched:            ", label),
            Span::styled(result.total_matched.to_string(), Style::default().fg(Color::Green)),
        ]),
        Line::from(vec![
            Span::styled("  Unmatched:          ", label),
            Span::styled(result.total_unmatched.to_string(), Style::default().fg(Color::Red)),
        ]),
        Line::from(vec![
            Span::styled("  Total discrepancy:  ", label),
            Span::styled(result.total_discrepancy.to_string(), Style::default().fg(Color::Yellow)),
        ]),
        Line::from(""),
        Line::from("  ─────────────────────────────────────"),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Unmatched system:   ", label),
            Span::raw(result.unmatched_system.len().to_string()),
        ]),
    ];

    for (bank_label, txs) in &result.unmatched_bank {
        content.push(Line::from(vec![
            Span::styled(format!("  {:<20}", bank_label), label),
            Span::raw(txs.len().to_string()),
        ]));
    }

    content.push(Line::from(""));
    content.push(Line::from(vec![
        Span::styled("  Skipped rows:       ", label),
        Span::raw(format!("{} system, {} bank", diag.skipped_system_rows, diag.skipped_bank_rows)),
    ]));

    if !diag.failed_bank_sources.is_empty() {
        content.push(Line::from(vec![
            Span::styled("  Failed statements:  ", label),
            Span::styled(diag.failed_bank_sources.join(", "), Style::default().fg(Color::Red)),
        ]));
    }

    let paragraph = Paragraph::new(content).block(titled_block(" Reconciliation Summary ".to_string()));
    f.render_widget(paragraph, area);
}

fn render_system_table(f: &mut Frame, area: Rect, app: &mut App) {
    let rows = app.result.unmatched_system.iter().map(|tx| {
        Row::new(vec![
            Cell::from(tx.timestamp.format("%Y-%m-%d %H:%M:%S").to_string()),
            Cell::from(truncate(&tx.id, 28)),
            Cell::from(tx.amount.to_string()),
            Cell::from(tx.kind.as_str()),
            Cell::from(tx.signed_amount().to_string()).style(Style::default().fg(amount_color(tx.signed_amount()))),
        ])
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(21),
            Constraint::Length(30),
            Constraint::Length(14),
            Constraint::Length(8),
            Constraint::Length(14),
        ],
    )
    .header(header_row(&["Timestamp", "Transaction", "Amount", "Type", "Signed"]))
    .block(titled_block(format!(" Unmatched System ({}) ", app.result.unmatched_system.len())))
    .highlight_style(highlight())
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn render_bank_table(f: &mut Frame, area: Rect, app: &mut App) {
    let visible = app.visible_bank_rows();
    let title = match &app.bank_filter {
        Some(label) => format!(" Unmatched Bank - {} ({}) ", label, visible.len()),
        None => format!(" Unmatched Bank - all statements ({}) ", visible.len()),
    };

    let rows: Vec<Row> = visible
        .iter()
        .map(|tx| {
            Row::new(vec![
                Cell::from(tx.date.to_string()),
                Cell::from(truncate(&tx.bank_label, 24)),
                Cell::from(truncate(&tx.external_id, 28)),
                Cell::from(tx.amount.to_string()).style(Style::default().fg(amount_color(tx.amount))),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(12),
            Constraint::Length(26),
            Constraint::Length(30),
            Constraint::Length(14),
        ],
    )
    .header(header_row(&["Date", "Statement", "Bank ID", "Amount"]))
    .block(titled_block(title))
    .highlight_style(highlight())
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn render_discrepancy_table(f: &mut Frame, area: Rect, app: &mut App) {
    let rows = app.result.discrepancies.iter().map(|d| {
        Row::new(vec![
            Cell::from(d.date.to_string()),
            Cell::from(truncate(&d.system_id, 20)),
            Cell::from(truncate(&d.bank_id, 20)),
            Cell::from(d.system_amount.to_string()),
            Cell::from(d.bank_amount.to_string()),
            Cell::from(d.difference.to_string()).style(Style::default().fg(Color::Yellow)),
        ])
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(12),
            Constraint::Length(22),
            Constraint::Length(22),
            Constraint::Length(14),
            Constraint::Length(14),
            Constraint::Length(12),
        ],
    )
    .header(header_row(&["Date", "System", "Bank", "System Amt", "Bank Amt", "Diff"]))
    .block(titled_block(format!(
        " Discrepancies - total {} ",
        app.result.total_discrepancy
    )))
    .highlight_style(highlight())
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let selected = app.state.selected().map(|i| i + 1).unwrap_or(0);

    let mut status_spans = vec![Span::styled(
        format!(" Row: {}/{} ", selected, app.row_count()),
        Style::default().fg(Color::Cyan),
    )];

    if app.current_page == Page::UnmatchedBank {
        status_spans.push(Span::raw(" | "));
        status_spans.push(Span::styled("b", Style::default().fg(Color::Yellow)));
        status_spans.push(Span::raw(" Statement"));
    }

    status_spans.push(Span::raw(" | "));
    status_spans.push(Span::styled("Enter", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Details | "));
    status_spans.push(Span::styled("Tab", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Page | "));
    status_spans.push(Span::styled("↑/↓", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Nav | "));
    status_spans.push(Span::styled("q", Style::default().fg(Color::Red)));
    status_spans.push(Span::raw(" Quit"));

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

fn detail_line(name: &'static str, value: String) -> Line<'static> {
    Line::from(vec![
        Span::styled(name, Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        Span::raw(value),
    ])
}

fn render_detail_panel(f: &mut Frame, area: Rect, app: &App) {
    let content = match app.current_page {
        Page::UnmatchedSystem => app.selected_system().map(|tx| {
            vec![
                Line::from(""),
                detail_line("  ID: ", tx.id.clone()),
                Line::from(""),
                detail_line("  Timestamp: ", tx.timestamp.to_string()),
                Line::from(""),
                detail_line("  Type: ", tx.kind.to_string()),
                Line::from(""),
                detail_line("  Amount: ", tx.amount.to_string()),
                detail_line("  Signed: ", tx.signed_amount().to_string()),
            ]
        }),
        Page::Discrepancies => app.selected_discrepancy().map(|d| {
            vec![
                Line::from(""),
                detail_line("  Date: ", d.date.to_string()),
                Line::from(""),
                detail_line("  System ID: ", d.system_id.clone()),
                detail_line("  System Amount: ", d.system_amount.to_string()),
                Line::from(""),
                detail_line("  Statement: ", d.bank_label.clone()),
                detail_line("  Bank ID: ", d.bank_id.clone()),
                detail_line("  Bank Amount: ", d.bank_amount.to_string()),
                Line::from(""),
                Line::from("  ─────────────────────────────────────"),
                Line::from(""),
                Line::from(vec![
                    Span::styled("  Difference: ", Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
                    Span::styled(d.difference.to_string(), Style::default().fg(Color::Yellow)),
                ]),
            ]
        }),
        _ => None,
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Details ");

    let panel = match content {
        Some(mut lines) => {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                "  Press Enter to close",
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )));
            Paragraph::new(lines).block(block)
        }
        None => Paragraph::new("Nothing selected").block(block),
    };

    f.render_widget(panel, area);
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
