mod app;

use anyhow::{Context, Result, bail};
use app::App;
use brace_blocks_config::Config;
use brace_blocks_engine::parsing::outline;
use brace_blocks_engine::{TaggerRegistry, TextBuffer, create_context};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};
use std::{
    env,
    io::{Stdout, stdout},
    path::PathBuf,
    process,
    time::Duration,
};
use tracing_subscriber::EnvFilter;

const SCAN_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Default, PartialEq)]
struct Args {
    dump: bool,
    offset: Option<usize>,
    file: Option<PathBuf>,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Args> {
    let mut parsed = Args::default();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--dump" => parsed.dump = true,
            "--offset" => {
                let value = args.next().context("--offset needs a value")?;
                let offset = value
                    .parse()
                    .with_context(|| format!("invalid offset '{value}'"))?;
                parsed.offset = Some(offset);
            }
            flag if flag.starts_with("--") => bail!("unknown option '{flag}'"),
            _ if parsed.file.is_some() => bail!("only one file may be given"),
            _ => parsed.file = Some(PathBuf::from(arg)),
        }
    }
    Ok(parsed)
}

/// Logs to the configured file, or to stderr when `allow_stderr` is set.
/// `RUST_LOG` overrides the configured filter.
fn init_logging(config: &Config, allow_stderr: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_filter))
        .with_context(|| format!("invalid log filter '{}'", config.log_filter))?;

    if let Some(path) = &config.log_file {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("cannot open log file {}", path.display()))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(std::sync::Mutex::new(file))
            .init();
    } else if allow_stderr {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
    Ok(())
}

/// The outline of `buffer`, followed by the breadcrumb at `offset` if given.
fn dump(buffer: &TextBuffer, width: usize, offset: Option<usize>) -> Result<String> {
    let registry = TaggerRegistry::new();
    let tagger = registry.attach(buffer);
    if !tagger.wait_for_scan(SCAN_TIMEOUT) {
        bail!("scan did not finish within {SCAN_TIMEOUT:?}");
    }
    let tree = tagger.current_tree().context("no block tree was published")?;

    let mut out = outline::render(&tree, width);
    if let Some(offset) = offset {
        let snapshot = buffer.current_snapshot();
        if offset > snapshot.len() {
            bail!("offset {offset} is past the end of the file ({} bytes)", snapshot.len());
        }
        out.push_str("\n\n");
        match tagger.block_at(&snapshot, offset)? {
            Some(block) => out.push_str(&create_context(&block)),
            None => out.push_str(&format!("offset {offset} is outside every block")),
        }
    }
    Ok(out)
}

fn main() -> Result<()> {
    let mut argv = env::args();
    let program = argv.next().unwrap_or_else(|| "brace-blocks".to_string());
    let usage = format!("Usage: {program} [--dump] [--offset N] [FILE]");

    let args = match parse_args(argv) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!("{usage}");
            process::exit(1);
        }
    };

    let config = match Config::load_or_default() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: Failed to load config file: {e}");
            process::exit(1);
        }
    };
    init_logging(&config, args.dump)?;

    let Some(path) = args.file.clone().or_else(|| config.default_file.clone()) else {
        eprintln!("Error: No file provided and no default_file in config");
        eprintln!("{usage}");
        eprintln!("Or set default_file in {}", Config::config_path().display());
        process::exit(1);
    };

    let bytes =
        std::fs::read(&path).with_context(|| format!("cannot read {}", path.display()))?;
    let buffer = TextBuffer::from_bytes(&bytes)
        .with_context(|| format!("{} is not valid UTF-8", path.display()))?;
    tracing::info!(path = %path.display(), bytes = bytes.len(), "opened file");

    if args.dump {
        println!("{}", dump(&buffer, config.preview_width, args.offset)?);
        return Ok(());
    }

    let registry = TaggerRegistry::new();
    let mut app = App::new(path, buffer, &registry);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("{err:?}");
    }

    Ok(())
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    loop {
        app.tick();
        terminal.draw(|f| ui(f, app))?;

        // Poll so finished scans get published without a keypress.
        if !event::poll(Duration::from_millis(50))? {
            continue;
        }
        if let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            let edited = match key.code {
                KeyCode::Char('q') => return Ok(()),
                KeyCode::Down | KeyCode::Char('j') => {
                    app.move_down();
                    Ok(())
                }
                KeyCode::Up | KeyCode::Char('k') => {
                    app.move_up();
                    Ok(())
                }
                KeyCode::Char('o') => app.insert_line(),
                KeyCode::Char('d') => app.delete_line(),
                _ => Ok(()),
            };
            if let Err(err) = edited {
                app.status = format!("edit failed: {err}");
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let crumb_lines = app.breadcrumb.lines().count().max(1) as u16;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(crumb_lines + 2),
                Constraint::Min(0),
                Constraint::Length(1),
            ]
            .as_ref(),
        )
        .split(f.area());

    let crumbs: Vec<Line> = if app.breadcrumb.is_empty() {
        vec![Line::from("(top level)")]
    } else {
        app.breadcrumb.lines().map(|l| Line::from(l.to_string())).collect()
    };
    let header = Paragraph::new(crumbs).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("{} | {}", app.path.display(), app.status)),
    );
    f.render_widget(header, chunks[0]);

    let height = chunks[1].height.saturating_sub(2) as usize;
    let first = app.caret_line.saturating_sub(height / 2);
    let snapshot = app.snapshot();
    let depths = app.gutter_depths(first, height);
    let body: Vec<Line> = depths
        .iter()
        .enumerate()
        .filter_map(|(i, &depth)| {
            let line = snapshot.line_from_line_number(first + i)?;
            let gutter = format!("{:>5} {:<4}", line.number + 1, "│".repeat(depth.min(4)));
            let style = if line.number == app.caret_line {
                Style::default().bg(Color::Yellow).fg(Color::Black)
            } else {
                Style::default()
            };
            Some(Line::from(vec![
                Span::styled(gutter, Style::default().fg(Color::DarkGray)),
                Span::styled(line.text, style),
            ]))
        })
        .collect();
    let text = Paragraph::new(body).block(Block::default().borders(Borders::ALL).title("Text"));
    f.render_widget(text, chunks[1]);

    let help = Paragraph::new(Line::from(vec![
        Span::styled("q", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(": Quit | ↑/k ↓/j: Move | o: Open line | d: Delete line"),
    ]));
    f.render_widget(help, chunks[2]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn args(list: &[&str]) -> Result<Args> {
        parse_args(list.iter().map(|s| s.to_string()))
    }

    #[test]
    fn parses_flags_and_file() {
        assert_eq!(
            args(&["--dump", "--offset", "12", "Program.cs"]).unwrap(),
            Args {
                dump: true,
                offset: Some(12),
                file: Some(PathBuf::from("Program.cs")),
            }
        );
        assert_eq!(args(&[]).unwrap(), Args::default());
    }

    #[test]
    fn rejects_bad_arguments() {
        assert!(args(&["--offset"]).is_err());
        assert!(args(&["--offset", "x"]).is_err());
        assert!(args(&["--verbose"]).is_err());
        assert!(args(&["a.cs", "b.cs"]).is_err());
    }

    #[test]
    fn dump_prints_outline_and_breadcrumb() {
        let text = "namespace N\n{\n    class C { int x; }\n}\n";
        let offset = text.find("int").unwrap();
        let buffer = TextBuffer::from_bytes(text.as_bytes()).unwrap();
        insta::assert_snapshot!(dump(&buffer, 60, Some(offset)).unwrap(), @r"
        1 [12..38) namespace N
          2 [26..36) class C

        namespace N
             class C { int x; }
        ");
    }

    #[test]
    fn dump_reports_offsets_outside_blocks() {
        let buffer = TextBuffer::new("a { }");
        let out = dump(&buffer, 60, Some(0)).unwrap();
        assert!(out.ends_with("offset 0 is outside every block"));
        assert!(dump(&buffer, 60, Some(99)).is_err());
    }
}
