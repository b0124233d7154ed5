//! Terminal visualizer for the bounded-tape machine.
//!
//! The UI owns the machine and drives it cooperatively from its tick loop:
//! each tick it drains pending output, steps the machine when auto-run is due,
//! and opens the input dialog whenever the machine suspends on `,`. Faults
//! leave the machine inspectable on screen in its terminal `Error` state.

use std::io;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Position, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};
use tracing::debug;

use crate::interpreter::{Command, Interpreter, ProgramState};
use crate::pacing::StepRate;

// Longest accepted input; nine digits always fit in a u32.
const PROMPT_MAX_DIGITS: usize = 9;

struct App {
    machine: Interpreter,

    // Output pane backlog, one line per `.` command
    output: Vec<String>,
    rx_output: mpsc::Receiver<(usize, u32)>,

    // Auto-run pacing
    running: bool,
    rate: StepRate,
    next_step: Instant,

    // Some(buffer) while the input dialog is open
    prompt: Option<String>,

    show_help: bool,
}

impl App {
    fn new(mut machine: Interpreter, rate: StepRate) -> Self {
        let (tx, rx) = mpsc::channel();
        machine.set_output_sink(move |ptr, value| {
            let _ = tx.send((ptr, value));
        });

        Self {
            machine,
            output: Vec::new(),
            rx_output: rx,
            running: false,
            rate,
            next_step: Instant::now(),
            prompt: None,
            show_help: false,
        }
    }
}

/// Run the visualizer until the user quits. Takes ownership of the machine.
pub fn run(machine: Interpreter, rate: StepRate) -> io::Result<()> {
    // terminal setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let res = run_app(&mut terminal, App::new(machine, rate));

    // restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, mut app: App) -> io::Result<()> {
    let tick_rate = Duration::from_millis(33);

    loop {
        terminal.draw(|f| ui(f, &app))?;

        if event::poll(tick_rate)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press && handle_key(&mut app, key) {
                    break;
                }
            }
        }

        tick(&mut app);
    }

    Ok(())
}

/// One cooperative tick: drain output, open the input dialog on suspension,
/// and fire a due auto-run step.
fn tick(app: &mut App) {
    while let Ok((ptr, value)) = app.rx_output.try_recv() {
        app.output.push(format!("Cell[{ptr}]: {value}"));
    }

    if app.machine.waiting_for_input() && app.prompt.is_none() {
        app.prompt = Some(String::new());
    }

    if app.machine.halted() && app.running {
        debug!("disabling auto-run on halted program");
        app.running = false;
    }

    if app.running && app.machine.can_step() {
        let now = Instant::now();
        if now >= app.next_step {
            // Faults park the machine in Error; the HUD picks that up.
            let _ = app.machine.step();
            app.next_step += app.rate.period();
            if app.next_step < now {
                // Fell behind the schedule (slow terminal); resync instead of bursting
                app.next_step = now + app.rate.period();
            }
        }
    }
}

/// Returns true when the app should quit.
fn handle_key(app: &mut App, key: KeyEvent) -> bool {
    if key.code == KeyCode::Esc {
        if app.show_help {
            app.show_help = false;
            return false;
        }
        return true;
    }

    if key.code == KeyCode::F(1)
        || (key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('h'))
    {
        app.show_help = !app.show_help;
        return false;
    }

    if let Some(buffer) = app.prompt.as_mut() {
        match key.code {
            KeyCode::Char(ch) if ch.is_ascii_digit() => {
                if buffer.len() < PROMPT_MAX_DIGITS {
                    buffer.push(ch);
                }
            }
            KeyCode::Backspace => {
                buffer.pop();
            }
            KeyCode::Enter if !buffer.is_empty() => {
                if let Ok(value) = buffer.parse::<u32>() {
                    let _ = app.machine.read_byte(value);
                    app.prompt = None;
                    app.next_step = Instant::now() + app.rate.period();
                }
            }
            _ => {}
        }
        return false;
    }

    match key.code {
        KeyCode::Char(' ') => {
            app.running = !app.running;
            app.next_step = Instant::now() + app.rate.period();
            if app.machine.halted() {
                debug!("disabling auto-run on halted program");
                app.running = false;
            }
            debug!("setting program auto exec to {}", app.running);
        }
        KeyCode::Tab => {
            app.rate.double();
            app.next_step = Instant::now() + app.rate.period();
        }
        KeyCode::Char('n') => {
            if app.machine.can_step() {
                let _ = app.machine.step();
            }
        }
        KeyCode::Char('q') => return true,
        _ => {}
    }

    false
}

fn ui(f: &mut Frame, app: &App) {
    let size = f.area();

    // Root: vertical layout -> main area + status bar
    let root = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)].as_ref())
        .split(size);

    let main_area = root[0];
    let status_area = root[1];

    // Main area: two columns (left, right)
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(72), Constraint::Percentage(28)].as_ref())
        .split(main_area);

    let left = cols[0];
    let right = cols[1];

    // Left: program (top), tape (middle), output (bottom)
    let left_rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Min(3),
                Constraint::Length(3),
                Constraint::Length(8),
            ]
            .as_ref(),
        )
        .split(left);

    draw_program(f, left_rows[0], app);
    draw_tape(f, left_rows[1], app);
    draw_output(f, left_rows[2], app);
    draw_hud(f, right, app);
    draw_status(f, status_area, app);

    if let Some(buffer) = app.prompt.as_deref() {
        draw_prompt(f, size, buffer);
    }

    if app.show_help {
        draw_help_overlay(f, size);
    }
}

fn command_style(cmd: Command) -> Style {
    let color = match cmd {
        Command::PointerRight => Color::Cyan,
        Command::PointerLeft => Color::Green,
        Command::IncrementCell => Color::LightGreen,
        Command::DecrementCell => Color::Red,
        Command::PrintByte => Color::Yellow,
        Command::ReadByte => Color::Magenta,
        Command::LoopStart | Command::LoopEnd => Color::LightMagenta,
    };
    Style::default().fg(color).add_modifier(Modifier::BOLD)
}

fn draw_program(f: &mut Frame, area: Rect, app: &App) {
    let block = Block::default().title("Program").borders(Borders::ALL);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let mut spans: Vec<Span<'static>> = Vec::with_capacity(app.machine.tape().len().max(1));
    for (i, &cmd) in app.machine.tape().iter().enumerate() {
        let mut style = command_style(cmd);
        if i == app.machine.pc() && !app.machine.halted() {
            style = style.add_modifier(Modifier::REVERSED);
        }
        spans.push(Span::styled(cmd.symbol().to_string(), style));
    }
    if spans.is_empty() {
        spans.push(Span::raw("<no program loaded>"));
    }

    let paragraph = Paragraph::new(Line::from(spans)).wrap(Wrap { trim: false });
    f.render_widget(paragraph, inner);
}

fn draw_tape(f: &mut Frame, area: Rect, app: &App) {
    let cell_count = app.machine.cell_count();
    let block = Block::default()
        .title(format!("Memory ({cell_count} cells)"))
        .borders(Borders::ALL);
    let inner = block.inner(area);
    f.render_widget(block, area);

    // Fixed-width slots sized for the largest representable value; the
    // window stays centered on the pointer, standing in for the camera pan.
    let digits = app.machine.max_value().to_string().len();
    let slot_width = digits + 2;
    let per_row = (inner.width as usize / slot_width).max(1);

    let base = app
        .machine
        .pointer()
        .saturating_sub(per_row / 2)
        .min(cell_count.saturating_sub(per_row));

    let mut spans: Vec<Span<'static>> = Vec::with_capacity(per_row);
    for i in base..(base + per_row).min(cell_count) {
        let value = app.machine.memory()[i];
        let cell_text = format!("[{value:>digits$}]");
        let cell_style = if i == app.machine.pointer() {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD)
        } else if value == 0 {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default().fg(Color::White)
        };
        spans.push(Span::styled(cell_text, cell_style));
    }

    f.render_widget(Paragraph::new(Line::from(spans)), inner);
}

fn draw_output(f: &mut Frame, area: Rect, app: &App) {
    let block = Block::default().title("Output").borders(Borders::ALL);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let paragraph = if app.output.is_empty() {
        Paragraph::new("<no output yet>")
    } else {
        let visible = inner.height as usize;
        let skip = app.output.len().saturating_sub(visible);
        let lines: Vec<Line> = app.output[skip..]
            .iter()
            .map(|entry| Line::raw(entry.clone()))
            .collect();
        Paragraph::new(lines)
    };
    f.render_widget(paragraph, inner);
}

fn draw_hud(f: &mut Frame, area: Rect, app: &App) {
    let block = Block::default().title("Machine").borders(Borders::ALL);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let state = app.machine.state();
    let state_style = match state {
        ProgramState::Error => Style::default().fg(Color::Red),
        ProgramState::Halted => Style::default().fg(Color::Yellow),
        ProgramState::WaitingForInput => Style::default().fg(Color::Magenta),
        _ => Style::default().fg(Color::White),
    };

    let mut lines = vec![
        Line::raw(format!("CPU: {}Hz", app.rate.hertz())),
        Line::from(Span::styled(format!("State: {state}"), state_style)),
    ];
    if !app.machine.state_detail().is_empty() {
        lines.push(Line::from(Span::styled(
            app.machine.state_detail().to_string(),
            state_style,
        )));
    }
    lines.push(Line::raw(format!("Step Count: {}", app.machine.step_count())));
    lines.push(Line::raw(format!("Pointer: {}", app.machine.pointer())));
    lines.push(Line::raw(format!("PC: {}", app.machine.pc())));

    f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), inner);
}

fn draw_status(f: &mut Frame, area: Rect, app: &App) {
    let run_state = if app.running { "Auto-run" } else { "Paused" };
    let status = format!(
        " {} | {} | Space: run  Tab: speed  n: step  q: quit | F1 for Help ",
        app.machine.state(),
        run_state
    );
    let line = Line::from(Span::styled(status, Style::default().fg(Color::White)));
    f.render_widget(Paragraph::new(line), area);
}

fn draw_prompt(f: &mut Frame, area: Rect, buffer: &str) {
    let w = 40.min(area.width.saturating_sub(2));
    let h = 3u16;
    let x = area.x + (area.width.saturating_sub(w)) / 2;
    let y = area.y + (area.height.saturating_sub(h)) / 2;
    let rect = Rect {
        x,
        y,
        width: w,
        height: h,
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red));
    let inner = block.inner(rect);

    f.render_widget(Clear, rect);
    f.render_widget(block, rect);

    let text = format!("Cell Value: {buffer}");
    let cursor_col = text.len() as u16;
    f.render_widget(Paragraph::new(text), inner);
    f.set_cursor_position(Position::new(
        inner.x + cursor_col.min(inner.width.saturating_sub(1)),
        inner.y,
    ));
}

fn draw_help_overlay(f: &mut Frame, area: Rect) {
    let block = Block::default().title("Help").borders(Borders::ALL);

    let w = area.width.saturating_sub(area.width / 4);
    let h = area.height.saturating_sub(area.height / 3);
    let x = area.x + (area.width - w) / 2;
    let y = area.y + (area.height - h) / 2;
    let rect = Rect {
        x,
        y,
        width: w,
        height: h,
    };
    f.render_widget(Clear, rect);
    f.render_widget(block, rect);

    let text = vec![
        Line::raw("Space: toggle auto-run"),
        Line::raw("Tab: double the step rate (wraps 32 -> 1)"),
        Line::raw("n: execute a single step"),
        Line::raw("Input dialog: digits, Backspace, Enter to submit"),
        Line::raw("F1/Ctrl+H: toggle this help"),
        Line::raw("q/Esc: quit"),
    ];
    let inner = Rect {
        x: rect.x + 2,
        y: rect.y + 2,
        width: rect.width.saturating_sub(4),
        height: rect.height.saturating_sub(4),
    };
    f.render_widget(Paragraph::new(text).wrap(Wrap { trim: false }), inner);
}
