//! All drawing. The `App` owns the state; this module only projects it
//! onto the frame.
use crate::app::{App, BAR_HEIGHT, SETTINGS_GROUPS, Screen};
use crate::logging;
use crate::timefmt::format_time;
use ratatui::{
    layout::Flex,
    prelude::*,
    widgets::{Block, Clear, FrameExt, Gauge, List, ListItem, Paragraph, Tabs, Wrap},
};
use tui_big_text::{BigText, PixelSize};

/// Colors used across every screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Theme {
    pub background: Color,
    pub foreground: Color,
    pub accent: Color,
    pub muted: Color,
}

pub fn draw(frame: &mut Frame, app: &mut App) {
    let theme = app.theme;
    frame.render_widget(
        Block::default().style(Style::default().bg(theme.background).fg(theme.foreground)),
        frame.area(),
    );

    let [content, tab_line] =
        Layout::vertical([Constraint::Min(0), Constraint::Length(1)]).areas(frame.area());

    match app.screen {
        Screen::Library => draw_library(frame, content, app),
        Screen::Browser => frame.render_widget_ref(app.explorer.widget(), content),
        Screen::Settings => draw_settings(frame, content, app),
    }

    draw_tab_line(frame, tab_line, app);

    // the bar floats over the bottom of the content area; screens pad
    // their own scroll regions via the coordinator subscription
    if app.now_playing.bar().is_visible() {
        draw_player_bar(frame, content, app);
    }

    if app.player_screen.is_some() {
        draw_player_screen(frame, app);
    }

    if let Some(message) = app.alerts.front() {
        draw_alert(frame, theme, message);
    }

    if app.show_logs {
        draw_logs(frame, app);
    }
}

fn draw_library(frame: &mut Frame, area: Rect, app: &mut App) {
    let theme = app.theme;
    let [header, mut list_area] =
        Layout::vertical([Constraint::Length(1), Constraint::Min(0)]).areas(area);
    list_area.height = list_area.height.saturating_sub(app.library_bottom_inset);

    let header_text = match &app.search {
        Some(query) => format!(" /{query}▏"),
        None if !app.filter.is_empty() => {
            format!(" Library /{} - {} songs", app.filter, app.visible_songs().len())
        }
        None => format!(" Library - {} songs", app.library.songs().len()),
    };
    frame.render_widget(
        Paragraph::new(header_text).style(Style::default().fg(theme.muted)),
        header,
    );

    let items: Vec<ListItem> = app
        .visible_songs()
        .iter()
        .map(|&index| {
            let song = &app.library.songs()[index];
            ListItem::new(Line::from(vec![
                Span::styled(song.title.clone(), Style::default().fg(theme.foreground)),
                Span::styled(
                    format!("  {}", song.artist_line()),
                    Style::default().fg(theme.muted),
                ),
                Span::styled(
                    format!("  {}", format_time(song.duration)),
                    Style::default().fg(theme.muted),
                ),
            ]))
        })
        .collect();

    let list = List::new(items)
        .highlight_style(
            Style::default()
                .fg(theme.accent)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("» ");
    frame.render_stateful_widget(list, list_area, &mut app.library_list);
}

fn draw_settings(frame: &mut Frame, area: Rect, app: &App) {
    let theme = app.theme;
    let mut inner = area;
    inner.height = inner.height.saturating_sub(app.settings_bottom_inset);

    let mut lines = vec![Line::raw("")];
    let mut row_index = 0;
    for (title, rows) in SETTINGS_GROUPS {
        lines.push(Line::styled(
            format!("  {title}"),
            Style::default().fg(theme.muted),
        ));
        for row in *rows {
            let selected = row_index == app.settings_cursor;
            let marker = if selected { "  › " } else { "    " };
            let style = if selected {
                Style::default()
                    .fg(theme.accent)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(theme.foreground)
            };
            lines.push(Line::from(vec![
                Span::styled(format!("{marker}{}", row.label()), style),
                Span::styled(
                    format!("  {}", app.settings_value(*row)),
                    Style::default().fg(theme.muted),
                ),
            ]));
            row_index += 1;
        }
        lines.push(Line::raw(""));
    }
    frame.render_widget(Paragraph::new(lines), inner);
}

fn draw_tab_line(frame: &mut Frame, area: Rect, app: &App) {
    let theme = app.theme;
    let tabs = Tabs::new(["Library", "Browser", "Settings"])
        .style(Style::default().fg(theme.muted))
        .highlight_style(
            Style::default()
                .fg(theme.accent)
                .add_modifier(Modifier::BOLD),
        )
        .select(match app.screen {
            Screen::Library => 0,
            Screen::Browser => 1,
            Screen::Settings => 2,
        });
    frame.render_widget(tabs, area);
}

fn draw_player_bar(frame: &mut Frame, content: Rect, app: &App) {
    let theme = app.theme;
    let (Some(display), Some(snapshot)) = (app.now_playing.display(), app.now_playing.snapshot())
    else {
        return;
    };
    let height = BAR_HEIGHT.min(content.height);
    let area = Rect {
        x: content.x,
        y: content.y + content.height - height,
        width: content.width,
        height,
    };
    frame.render_widget(Clear, area);

    let glyph = if display.show_pause { "⏸" } else { "▶" };
    let times = format!(
        "{} / {}",
        format_time(snapshot.current_time),
        format_time(snapshot.duration)
    );
    let line = Line::from(vec![
        Span::styled(format!(" {glyph}  "), Style::default().fg(theme.accent)),
        Span::styled(
            display.title.clone(),
            Style::default()
                .fg(theme.foreground)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!("  {times}"), Style::default().fg(theme.muted)),
    ]);
    let bar = Paragraph::new(line).block(
        Block::bordered()
            .border_style(Style::default().fg(theme.accent))
            .style(Style::default().bg(theme.background)),
    );
    frame.render_widget(bar, area);
}

fn draw_player_screen(frame: &mut Frame, app: &App) {
    let theme = app.theme;
    let (Some(snapshot), Some(progress)) = (app.now_playing.snapshot(), app.player_screen.as_ref())
    else {
        return;
    };
    let area = frame.area();
    frame.render_widget(Clear, area);
    let block = Block::bordered()
        .title(" Now Playing ")
        .border_style(Style::default().fg(theme.accent))
        .style(Style::default().bg(theme.background).fg(theme.foreground));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let [_, title_area, artist_area, _, gauge_area, status_area, _, hints_area] =
        Layout::vertical([
            Constraint::Length(1),
            Constraint::Length(4),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .areas(inner);

    // big-text title when it fits, plain bold otherwise
    let title_width = snapshot.title.chars().count() as u16 * 4;
    if title_width <= title_area.width && !snapshot.title.is_empty() {
        let big = BigText::builder()
            .pixel_size(PixelSize::Quadrant)
            .style(Style::default().fg(theme.accent))
            .lines(vec![Line::from(snapshot.title.clone())])
            .build();
        frame.render_widget(big, title_area);
    } else {
        frame.render_widget(
            Paragraph::new(snapshot.title.clone())
                .style(
                    Style::default()
                        .fg(theme.accent)
                        .add_modifier(Modifier::BOLD),
                )
                .centered(),
            title_area,
        );
    }

    frame.render_widget(
        Paragraph::new(snapshot.artist_line())
            .style(Style::default().fg(theme.muted))
            .centered(),
        artist_area,
    );

    let gauge = Gauge::default()
        .block(Block::bordered().border_style(Style::default().fg(theme.muted)))
        .gauge_style(Style::default().fg(theme.accent))
        .ratio(progress.ratio())
        .label(format!(
            "{}  {}",
            progress.elapsed_text(),
            progress.remaining_text()
        ));
    frame.render_widget(gauge, gauge_area);

    let status = if progress.is_dragging() {
        Line::styled(
            "scrubbing: Enter seeks, Esc cancels",
            Style::default().fg(theme.accent),
        )
    } else {
        let on = Style::default().fg(theme.accent);
        let off = Style::default().fg(theme.muted);
        Line::from(vec![
            Span::styled("shuffle", if app.shuffle { on } else { off }),
            Span::styled("   ", off),
            Span::styled("repeat", if app.repeat { on } else { off }),
            Span::styled(format!("   volume {:.0}%", app.volume * 100.), off),
        ])
    };
    frame.render_widget(Paragraph::new(status).centered(), status_area);

    frame.render_widget(
        Paragraph::new("space=play/pause  n/b=next/prev  ←/→=scrub  s=shuffle  r=repeat  esc=close")
            .style(Style::default().fg(theme.muted))
            .centered(),
        hints_area,
    );
}

fn draw_alert(frame: &mut Frame, theme: Theme, message: &str) {
    let area = popup_area(frame.area(), 50, 25);
    frame.render_widget(Clear, area);
    let text = Text::from(vec![
        Line::raw(""),
        Line::from(message.to_string()),
        Line::raw(""),
        Line::styled("(Enter) Okay", Style::default().fg(theme.muted)),
    ]);
    let alert = Paragraph::new(text)
        .wrap(Wrap { trim: true })
        .centered()
        .block(
            Block::bordered()
                .border_style(Style::default().fg(theme.accent))
                .style(Style::default().bg(theme.background).fg(theme.foreground)),
        );
    frame.render_widget(alert, area);
}

fn draw_logs(frame: &mut Frame, app: &App) {
    let theme = app.theme;
    let area = popup_area(frame.area(), 70, 60);
    frame.render_widget(Clear, area);
    let lines = logging::snapshot(&app.log_buffer);
    let visible = area.height.saturating_sub(2) as usize;
    let start = lines.len().saturating_sub(visible);
    let text = if lines.is_empty() {
        "No logs yet.".to_string()
    } else {
        lines[start..].join("\n")
    };
    let logs = Paragraph::new(text)
        .style(Style::default().fg(theme.muted))
        .block(
            Block::bordered()
                .title(" Logs ")
                .border_style(Style::default().fg(theme.muted))
                .style(Style::default().bg(theme.background)),
        );
    frame.render_widget(logs, area);
}

fn popup_area(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let vertical = Layout::vertical([Constraint::Percentage(percent_y)]).flex(Flex::Center);
    let horizontal = Layout::horizontal([Constraint::Percentage(percent_x)]).flex(Flex::Center);
    let [area] = vertical.areas(area);
    let [area] = horizontal.areas(area);
    area
}
