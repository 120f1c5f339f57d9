use crate::config::AppConfig;
use crate::error::AppError;
use crate::estimator::estimate;
use crate::models::{CadencePreset, EstimateResult};
use crate::report::format_usd;
use crate::ui::app::{AppState, ConfirmAction, Field, Screen};
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table};
use ratatui::Terminal;
use std::io;
use std::time::Duration;

const COLOR_ACCENT: Color = Color::Cyan;
const COLOR_INFO: Color = Color::Green;
const COLOR_WARN: Color = Color::Yellow;
const COLOR_MUTED: Color = Color::DarkGray;
const COLOR_HEADER: Color = Color::White;

const POLL_INTERVAL: Duration = Duration::from_millis(250);
const MAX_NAME_LEN: usize = 48;
const MAX_NUMBER_LEN: usize = 12;

pub fn run_tui(cfg: &AppConfig) -> Result<(), AppError> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    stdout.execute(EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let loop_result = run_loop(&mut terminal, cfg);

    disable_raw_mode()?;
    terminal.backend_mut().execute(LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    loop_result
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    cfg: &AppConfig,
) -> Result<(), AppError> {
    let mut state = AppState::default();

    while state.running {
        let (products, consulting_hours) = state.snapshot();
        let result = estimate(&cfg.pricing, &products, consulting_hours);
        terminal.draw(|f| render(f, cfg, &state, &result))?;

        if event::poll(POLL_INTERVAL)? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                handle_key(key.code, key.modifiers, &mut state);
            }
        }
    }

    tracing::debug!(products = state.products.len(), "estimator session closed");
    Ok(())
}

fn ask_quit(state: &mut AppState) {
    state.previous_screen = state.screen.clone();
    state.screen = Screen::Confirm(ConfirmAction::Quit);
    state.confirm_selected = 0;
}

fn handle_key(code: KeyCode, modifiers: KeyModifiers, state: &mut AppState) {
    if modifiers.contains(KeyModifiers::CONTROL) && code == KeyCode::Char('c') {
        ask_quit(state);
        return;
    }

    match state.screen.clone() {
        Screen::Estimator => handle_estimator_key(code, modifiers, state),
        Screen::Confirm(action) => match code {
            KeyCode::Left | KeyCode::Right | KeyCode::Tab => {
                state.confirm_selected = 1 - state.confirm_selected.min(1);
            }
            KeyCode::Esc => state.screen = state.previous_screen.clone(),
            KeyCode::Enter => {
                if state.confirm_selected == 1 {
                    confirm(state, action);
                } else {
                    state.screen = state.previous_screen.clone();
                }
            }
            _ => {}
        },
        Screen::ErrorDialog => {
            if matches!(code, KeyCode::Enter | KeyCode::Esc) {
                state.screen = state.previous_screen.clone();
            }
        }
    }
}

fn confirm(state: &mut AppState, action: ConfirmAction) {
    match action {
        ConfirmAction::Quit => state.running = false,
        ConfirmAction::RemoveProduct { id } => {
            if state.remove_product(id) {
                state.status = format!("removed product #{id}");
            }
            state.screen = Screen::Estimator;
        }
    }
}

fn handle_estimator_key(code: KeyCode, modifiers: KeyModifiers, state: &mut AppState) {
    if modifiers.contains(KeyModifiers::CONTROL) {
        match code {
            KeyCode::Char('n') => {
                state.add_product();
                state.status = format!("added product #{}", state.next_id - 1);
            }
            KeyCode::Char('d') => match state.selected_product() {
                Some(product) => {
                    let id = product.id;
                    state.previous_screen = Screen::Estimator;
                    state.screen = Screen::Confirm(ConfirmAction::RemoveProduct { id });
                    state.confirm_selected = 0;
                }
                None => show_error(state, "There is no product to remove.".into()),
            },
            _ => {}
        }
        return;
    }

    match code {
        KeyCode::Esc => ask_quit(state),
        KeyCode::Tab => state.next_field(),
        KeyCode::BackTab => state.previous_field(),
        KeyCode::Up => {
            if state.selected > 0 {
                state.selected -= 1;
            }
            state.settle_field();
        }
        KeyCode::Down => {
            if state.selected + 1 < state.products.len() {
                state.selected += 1;
            }
            state.settle_field();
        }
        KeyCode::Left | KeyCode::Right if state.field == Field::Cadence => {
            let changed = state.selected_product_mut().map(|product| {
                product.cadence = if code == KeyCode::Left {
                    product.cadence.previous()
                } else {
                    product.cadence.next()
                };
                product.cadence
            });
            if let Some(cadence) = changed {
                state.status = format!("cadence set to {}", cadence.label());
            }
            state.settle_field();
        }
        KeyCode::Char(ch) => input_char(state, ch),
        KeyCode::Backspace => backspace_char(state),
        _ => {}
    }
}

fn accepts_number_char(current: &str, ch: char) -> bool {
    if current.len() >= MAX_NUMBER_LEN {
        return false;
    }
    ch.is_ascii_digit() || (ch == '.' && !current.contains('.'))
}

fn push_number_char(target: &mut String, ch: char) {
    if !accepts_number_char(target, ch) {
        return;
    }
    if target == "0" && ch != '.' {
        target.clear();
    }
    target.push(ch);
}

fn input_char(state: &mut AppState, ch: char) {
    match state.field {
        Field::Name => {
            if let Some(product) = state.selected_product_mut() {
                if product.name.chars().count() < MAX_NAME_LEN {
                    product.name.push(ch);
                }
            }
        }
        Field::CustomUnits => {
            if let Some(product) = state.selected_product_mut() {
                push_number_char(&mut product.custom_units, ch);
            }
        }
        Field::ConsultingHours => push_number_char(&mut state.consulting_input, ch),
        Field::Cadence => {}
    }
}

fn backspace_char(state: &mut AppState) {
    match state.field {
        Field::Name => {
            if let Some(product) = state.selected_product_mut() {
                product.name.pop();
            }
        }
        Field::CustomUnits => {
            if let Some(product) = state.selected_product_mut() {
                product.custom_units.pop();
            }
        }
        Field::ConsultingHours => {
            state.consulting_input.pop();
        }
        Field::Cadence => {}
    }
}

fn show_error(state: &mut AppState, message: String) {
    state.error_message = message;
    state.previous_screen = state.screen.clone();
    state.screen = Screen::ErrorDialog;
}

fn render(f: &mut ratatui::Frame, cfg: &AppConfig, state: &AppState, result: &EstimateResult) {
    let size = f.area();
    let compact = size.width < 110;

    let root = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(5),
            Constraint::Min(8),
            Constraint::Length(3),
            Constraint::Length(2),
        ])
        .split(size);

    let header = Paragraph::new(format!(
        " pricing-estimator  ·  {} product(s)  ·  {} ",
        result.product_count, state.status
    ))
    .block(Block::default().borders(Borders::ALL).title(" Session "))
    .style(Style::default().fg(COLOR_HEADER));
    f.render_widget(header, root[0]);

    let kpis = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(34),
            Constraint::Percentage(33),
            Constraint::Percentage(33),
        ])
        .split(root[1]);

    let unit_price = Paragraph::new(format!("{}/model", format_usd(result.selected_unit_price)))
        .block(Block::default().borders(Borders::ALL).title(" Per-model price "))
        .style(Style::default().fg(COLOR_INFO).add_modifier(Modifier::BOLD));
    let all_in = Paragraph::new(format!("{}/mo", format_usd(result.monthly_all_in)))
        .block(Block::default().borders(Borders::ALL).title(if compact {
            " All-in "
        } else {
            " All-in monthly after handoff "
        }))
        .style(
            Style::default()
                .fg(COLOR_ACCENT)
                .add_modifier(Modifier::BOLD),
        );
    let year1 = Paragraph::new(format_usd(result.year1_total))
        .block(Block::default().borders(Borders::ALL).title(" Year-1 total "))
        .style(
            Style::default()
                .fg(COLOR_ACCENT)
                .add_modifier(Modifier::BOLD),
        );
    f.render_widget(unit_price, kpis[0]);
    f.render_widget(all_in, kpis[1]);
    f.render_widget(year1, kpis[2]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(if compact {
            [Constraint::Percentage(55), Constraint::Percentage(45)]
        } else {
            [Constraint::Percentage(60), Constraint::Percentage(40)]
        })
        .split(root[2]);

    render_products(f, body[0], state, result);
    render_breakdown(f, body[1], cfg, result);

    let consulting_active = state.field == Field::ConsultingHours;
    let consulting = Paragraph::new(Line::from(vec![
        Span::styled(
            format!(" {}", state.consulting_input),
            field_style(consulting_active),
        ),
        Span::styled(
            "  hours/month · billed separately, not covered by the platform minimum",
            Style::default().fg(COLOR_MUTED),
        ),
    ]))
    .block(Block::default().borders(Borders::ALL).title(" Consulting "));
    f.render_widget(consulting, root[3]);

    let footer = Paragraph::new(footer_text(state))
        .block(Block::default().borders(Borders::ALL))
        .style(Style::default().fg(COLOR_MUTED));
    f.render_widget(footer, root[4]);

    match &state.screen {
        Screen::Estimator => {}
        Screen::Confirm(action) => render_confirm(f, state, action),
        Screen::ErrorDialog => render_error(f, state),
    }
}

fn field_style(active: bool) -> Style {
    if active {
        Style::default()
            .fg(Color::Black)
            .bg(COLOR_ACCENT)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(COLOR_HEADER)
    }
}

fn render_products(f: &mut ratatui::Frame, area: Rect, state: &AppState, result: &EstimateResult) {
    let rows = state
        .products
        .iter()
        .enumerate()
        .map(|(idx, product)| {
            let selected = idx == state.selected;
            let active = |field: Field| selected && state.field == field;
            let name = if product.name.is_empty() {
                format!("Product {}", idx + 1)
            } else {
                product.name.clone()
            };
            let custom = if product.cadence == CadencePreset::Custom {
                product.custom_units.clone()
            } else {
                "-".to_string()
            };
            let annual = result
                .products
                .get(idx)
                .map(|line| line.annual_units.to_string())
                .unwrap_or_default();

            Row::new(vec![
                Cell::from(if selected { ">" } else { " " }),
                Cell::from(name).style(field_style(active(Field::Name))),
                Cell::from(format!("< {} >", product.cadence.label()))
                    .style(field_style(active(Field::Cadence))),
                Cell::from(custom).style(field_style(active(Field::CustomUnits))),
                Cell::from(annual),
            ])
        })
        .collect::<Vec<_>>();

    let table = Table::new(
        rows,
        [
            Constraint::Length(2),
            Constraint::Percentage(30),
            Constraint::Percentage(34),
            Constraint::Percentage(16),
            Constraint::Percentage(14),
        ],
    )
    .header(
        Row::new(vec!["", "Product", "Model cadence", "Custom/yr", "Annual"]).style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
    )
    .block(Block::default().borders(Borders::ALL).title(" Products "));
    f.render_widget(table, area);
}

fn breakdown_lines(cfg: &AppConfig, result: &EstimateResult) -> Vec<Line<'static>> {
    let fees = &cfg.pricing.constants;
    let heading = |text: &'static str| {
        Line::from(Span::styled(
            text,
            Style::default().add_modifier(Modifier::BOLD),
        ))
    };

    let mut lines = vec![
        heading("Your commitment"),
        Line::from(format!("Total products: {}", result.product_count)),
        Line::from(format!(
            "Total annual models: {} (~{:.1}/mo)",
            result.total_annual_units, result.units_per_month
        )),
        Line::from(format!("Support: {}/mo", format_usd(result.monthly_support))),
        Line::from(""),
        heading("Costs after month 3"),
        Line::from(format!(
            "Avg model cost: {}/mo",
            format_usd(result.avg_monthly_usage_cost)
        )),
    ];

    if result.minimum_applied {
        lines.push(Line::from(Span::styled(
            format!(
                "Platform monthly (minimum applied): {}",
                format_usd(result.platform_monthly)
            ),
            Style::default()
                .fg(COLOR_WARN)
                .add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::from(Span::styled(
            format!(
                "Includes up to {}/mo; overage {}/model for ~{:.1} extra/mo",
                fees.included_units_per_month,
                format_usd(fees.overage_unit_price),
                result.excess_units_per_month
            ),
            Style::default().fg(COLOR_MUTED),
        )));
    } else {
        lines.push(Line::from(format!(
            "Platform monthly: {}",
            format_usd(result.platform_monthly)
        )));
    }

    lines.extend([
        Line::from(format!(
            "Consulting: {}/mo",
            format_usd(result.consulting_monthly)
        )),
        Line::from(""),
        heading("One-time & Year 1"),
        Line::from(format!(
            "Onboarding (months 1-3): {}",
            format_usd(result.onboarding_one_time)
        )),
        Line::from(format!(
            "Estimated Year-1 total: {}",
            format_usd(result.year1_total)
        )),
    ]);
    lines
}

fn render_breakdown(f: &mut ratatui::Frame, area: Rect, cfg: &AppConfig, result: &EstimateResult) {
    let panel = Paragraph::new(breakdown_lines(cfg, result))
        .block(Block::default().borders(Borders::ALL).title(" Estimate "));
    f.render_widget(panel, area);
}

fn footer_text(state: &AppState) -> &'static str {
    match state.screen {
        Screen::Estimator => match state.field {
            Field::Cadence => {
                "Left/Right cadence | Up/Down product | Tab next field | Ctrl+N add | Ctrl+D remove | Esc quit"
            }
            _ => "type to edit | Backspace delete | Up/Down product | Tab next field | Ctrl+N add | Ctrl+D remove | Esc quit",
        },
        Screen::Confirm(_) => "Left/Right choose | Enter confirm | Esc cancel",
        Screen::ErrorDialog => "Enter/Esc close",
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

fn render_confirm(f: &mut ratatui::Frame, state: &AppState, action: &ConfirmAction) {
    let area = centered_rect(56, 34, f.area());
    f.render_widget(Clear, area);

    let (title, message, consequence): (&str, String, &str) = match action {
        ConfirmAction::Quit => (
            "Confirm Quit",
            "Do you want to exit the estimator?".to_string(),
            "Consequence: the current estimate is discarded.",
        ),
        ConfirmAction::RemoveProduct { id } => (
            "Confirm Product Removal",
            format!("Remove product #{id} from the estimate?"),
            "Consequence: its onboarding, support and usage leave the totals.",
        ),
    };

    let cancel_style = if state.confirm_selected == 0 {
        Style::default()
            .fg(Color::Black)
            .bg(Color::Yellow)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };
    let confirm_style = if state.confirm_selected == 1 {
        Style::default()
            .fg(Color::Black)
            .bg(Color::Red)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };

    let content = Paragraph::new(vec![
        Line::from(message),
        Line::from(Span::styled(consequence, Style::default().fg(COLOR_MUTED))),
        Line::from(""),
        Line::from(vec![
            Span::styled("[Cancel (Esc)]", cancel_style),
            Span::raw("   "),
            Span::styled("[Confirm (Enter)]", confirm_style),
        ]),
        Line::from("Use Left/Right to choose"),
    ])
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!(" {} ", title)),
    )
    .alignment(Alignment::Center);

    f.render_widget(content, area);
}

fn render_error(f: &mut ratatui::Frame, state: &AppState) {
    let area = centered_rect(60, 30, f.area());
    f.render_widget(Clear, area);
    let content = Paragraph::new(vec![
        Line::from(state.error_message.clone()),
        Line::from(""),
        Line::from("Press Enter or Esc"),
    ])
    .block(Block::default().borders(Borders::ALL).title(" Error "))
    .style(Style::default().fg(Color::Red));
    f.render_widget(content, area);
}
