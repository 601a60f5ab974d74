//! Canvas program for the subtitle timeline
//!
//! Renders the whole scene (waveform, ruler, track rows, entries, overlays,
//! label column) and translates raw iced events into [`TimelineInput`]
//! messages via a callback closure. All interaction logic lives in the
//! dispatcher; this program only forwards coordinates and buttons.

use super::input::{CursorHint, PointerButton, PointerModifiers};
use super::layout::{HEADER_HEIGHT, LEFT_COLUMN_MARGIN};
use super::{Timeline, TimelineInput};
use iced::alignment::{Horizontal, Vertical};
use iced::widget::canvas::{self, Event, Frame, Geometry, Path, Program, Stroke, Text};
use iced::{keyboard, mouse, Color, Point, Rectangle, Size, Theme};
use subwave_core::document::SubtitleDocument;
use subwave_core::playback::PlaybackController;

const HEADER_BACK: Color = Color::from_rgba(0.20, 0.20, 0.20, 0.50);
const TICK_COLOR: Color = Color::WHITE;
const LINE_BIG_COLOR: Color = Color::from_rgb(0.60, 0.60, 0.60);
const LINE_MED_COLOR: Color = Color::from_rgb(0.30, 0.30, 0.30);
const RULER_TEXT: Color = Color::WHITE;
const TRACK_LINE_COLOR: Color = Color::from_rgba(0.80, 0.80, 0.80, 0.33);

const LEFT_COLUMN_BACK: Color = Color::from_rgb(0.20, 0.20, 0.20);
const LEFT_COLUMN_SELECTED: Color = Color::from_rgb(0.33, 0.33, 0.33);
const LEFT_COLUMN_OUTLINE: Color = Color::from_rgb(0.33, 0.33, 0.33);
const LEFT_COLUMN_SEPARATOR: Color = Color::from_rgb(0.27, 0.27, 0.27);
const LEFT_COLUMN_TEXT: Color = Color::WHITE;
const SELECTED_TRACK_BACK: Color = Color::from_rgba(0.67, 0.67, 0.67, 0.33);

const ENTRY_BORDER_WIDTH: f32 = 1.0;
const ENTRY_BORDER_WIDTH_FOCUS: f32 = 2.0;
const ENTRY_BACK_OPACITY: f32 = 0.45;
const ENTRY_BACK: Color = Color::from_rgba(0.20, 0.20, 0.20, ENTRY_BACK_OPACITY);
const ENTRY_BORDER: Color = Color::from_rgb(0.60, 0.60, 0.60);
const ENTRY_BORDER_FOCUS: Color = Color::from_rgb(0.85, 0.65, 0.13);
const ENTRY_TEXT: Color = Color::from_rgb(0.90, 0.90, 0.90);
const ENTRY_TEXT_SPLITTING: Color = Color::from_rgb(0.85, 0.65, 0.13);
const INOUT_TEXT: Color = Color::from_rgb(0.56, 0.93, 0.56);

const CURSOR_COLOR: Color = Color::from_rgb(1.00, 0.75, 0.80);
const PENDING_WAVEFORM_COLOR: Color = Color::from_rgba(1.00, 0.10, 0.10, 0.30);
const WAVEFORM_COLOR: Color = Color::from_rgb(0.33, 0.73, 0.73);
const INOUT_AREA_OUTSIDE: Color = Color::from_rgba(0.80, 0.80, 0.80, 0.40);

const BOXSELECT_BACK: Color = Color::from_rgba(0.80, 0.80, 0.80, 0.40);
const BOXSELECT_BORDER: Color = Color::from_rgb(0.80, 0.80, 0.80);
const BOXSELECT_WIDTH: f32 = 1.5;

const ALIGNLINE_COLOR: Color = Color::from_rgb(0.80, 0.80, 0.80);
const ALIGNLINE_WIDTH: f32 = 1.5;

/// Smallest entry box width that still gets its text drawn.
const TEXT_MIN_WIDTH: f64 = 15.0;

/// Scroll distance per wheel "line", matching typical desktop wheel deltas.
const WHEEL_LINE_PX: f64 = 100.0;

fn pt(x: f64, y: f64) -> Point {
    Point::new(x as f32, y as f32)
}

/// Ruler tick ladder for a given horizontal scale: the smallest unit drawn,
/// plus how many of those make a medium and a big tick.
fn tick_units(scale: f64) -> (f64, usize, usize) {
    const UNITS: [f64; 8] = [0.001, 0.01, 0.1, 1.0, 10.0, 60.0, 600.0, 3600.0];
    for i in 0..UNITS.len() - 3 {
        if scale * UNITS[i] > 2.0 {
            return (
                UNITS[i],
                (UNITS[i + 1] / UNITS[i]).round() as usize,
                (UNITS[i + 2] / UNITS[i]).round() as usize,
            );
        }
    }
    (60.0, 10, 60)
}

/// `h:mm:ss.cc`, centisecond precision.
fn format_timestamp(t: f64) -> String {
    let cs = (t.max(0.0) * 100.0).round() as u64;
    let (h, rem) = (cs / 360_000, cs % 360_000);
    let (m, rem) = (rem / 6_000, rem % 6_000);
    let (s, cs) = (rem / 100, rem % 100);
    format!("{h}:{m:02}:{s:02}.{cs:02}")
}

fn pointer_button(button: mouse::Button) -> Option<PointerButton> {
    match button {
        mouse::Button::Left => Some(PointerButton::Primary),
        mouse::Button::Middle => Some(PointerButton::Middle),
        mouse::Button::Right => Some(PointerButton::Secondary),
        _ => None,
    }
}

/// Per-widget interaction bookkeeping the program keeps between events.
#[derive(Debug, Clone, Copy, Default)]
pub struct CanvasState {
    modifiers: PointerModifiers,
    /// Last pointer X in widget coordinates, for releases that arrive after
    /// the cursor left the window.
    last_x: f64,
}

/// Canvas program wiring the timeline state to iced.
///
/// The application constructs one per `view` call and routes the published
/// [`TimelineInput`] back through [`Timeline::interact`].
pub struct TimelineCanvas<'a, Message, F>
where
    F: Fn(TimelineInput) -> Message,
{
    pub timeline: &'a Timeline,
    pub doc: &'a SubtitleDocument,
    pub playback: &'a PlaybackController,
    pub on_input: F,
}

impl<Message, F> Program<Message> for TimelineCanvas<'_, Message, F>
where
    F: Fn(TimelineInput) -> Message,
{
    type State = CanvasState;

    fn update(
        &self,
        state: &mut Self::State,
        event: &Event,
        bounds: Rectangle,
        cursor: mouse::Cursor,
    ) -> Option<canvas::Action<Message>> {
        let publish = |input| Some(canvas::Action::publish((self.on_input)(input)));

        // Keep the view transform in sync with the widget size.
        let view = &self.timeline.view;
        if (bounds.width as f64 - view.width).abs() > 0.5
            || (bounds.height as f64 - view.height).abs() > 0.5
        {
            return publish(TimelineInput::Resized {
                width: bounds.width as f64,
                height: bounds.height as f64,
            });
        }

        match event {
            Event::Mouse(mouse::Event::ButtonPressed(button)) => {
                let button = pointer_button(*button)?;
                let position = cursor.position_in(bounds)?;
                publish(TimelineInput::PointerDown {
                    x: position.x as f64,
                    y: position.y as f64,
                    button,
                    modifiers: state.modifiers,
                })
            }
            Event::Mouse(mouse::Event::CursorMoved { .. }) => {
                let position = cursor.position()?;
                let x = (position.x - bounds.x) as f64;
                let y = (position.y - bounds.y) as f64;
                state.last_x = x;
                // Track drags past the widget edge, but ignore plain hovers
                // outside of it.
                if self.timeline.has_active_action() || cursor.position_in(bounds).is_some() {
                    publish(TimelineInput::PointerMoved { x, y, modifiers: state.modifiers })
                } else {
                    None
                }
            }
            Event::Mouse(mouse::Event::ButtonReleased(button)) => {
                pointer_button(*button)?;
                let x = match cursor.position() {
                    Some(position) => (position.x - bounds.x) as f64,
                    None => state.last_x,
                };
                publish(TimelineInput::PointerUp { x })
            }
            Event::Mouse(mouse::Event::WheelScrolled { delta }) => {
                let position = cursor.position_in(bounds)?;
                let amount = match delta {
                    mouse::ScrollDelta::Lines { y, .. } => -(*y as f64) * WHEEL_LINE_PX,
                    mouse::ScrollDelta::Pixels { y, .. } => -(*y as f64),
                };
                publish(TimelineInput::Wheel {
                    x: position.x as f64,
                    amount,
                    zoom: state.modifiers.command,
                })
            }
            Event::Keyboard(keyboard::Event::ModifiersChanged(modifiers)) => {
                state.modifiers = PointerModifiers {
                    command: modifiers.command(),
                    shift: modifiers.shift(),
                };
                None
            }
            Event::Keyboard(keyboard::Event::KeyPressed {
                key: keyboard::Key::Named(keyboard::key::Named::Escape),
                ..
            }) if self.timeline.has_active_action() => publish(TimelineInput::Interrupt),
            _ => None,
        }
    }

    fn mouse_interaction(
        &self,
        _state: &Self::State,
        bounds: Rectangle,
        cursor: mouse::Cursor,
    ) -> mouse::Interaction {
        if cursor.position_in(bounds).is_none() && !self.timeline.has_active_action() {
            return mouse::Interaction::default();
        }
        match self.timeline.cursor_hint() {
            CursorHint::Default => mouse::Interaction::default(),
            CursorHint::Move => mouse::Interaction::Grab,
            CursorHint::ColResize | CursorHint::ResizeLeft | CursorHint::ResizeRight => {
                mouse::Interaction::ResizingHorizontally
            }
        }
    }

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &iced::Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: mouse::Cursor,
    ) -> Vec<Geometry> {
        let mut frame = Frame::new(renderer, bounds.size());

        self.draw_waveform(&mut frame);
        self.draw_ruler(&mut frame);
        self.draw_tracks(&mut frame);
        self.draw_overlays(&mut frame);
        // Last, so entries scrolled under the label column are covered.
        self.draw_left_column(&mut frame);

        vec![frame.into_geometry()]
    }
}

impl<Message, F> TimelineCanvas<'_, Message, F>
where
    F: Fn(TimelineInput) -> Message,
{
    fn draw_waveform(&self, frame: &mut Frame) {
        let Some(sampler) = self.timeline.sampler() else {
            return;
        };
        let view = &self.timeline.view;
        let tree = sampler.intensity();
        if tree.is_empty() {
            return;
        }

        // Pick the aggregation level that keeps roughly one point per pixel.
        let resolution = sampler.resolution();
        let points_per_pixel = (resolution / view.scale()).max(1.0);
        let step = (1usize << points_per_pixel.log2().floor() as u32)
            .min(tree.len().next_power_of_two());
        let level = tree.level(step);

        let seconds_per_point = step as f64 / resolution;
        let start = ((view.offset() / seconds_per_point).floor().max(0.0)) as usize;
        let end = ((view.visible_end() / seconds_per_point).ceil() as usize).min(level.len());
        if start >= end {
            return;
        }

        let width_v = seconds_per_point * view.scale();
        let half = (view.height - HEADER_HEIGHT) / 2.0;
        let baseline = HEADER_HEIGHT + half;

        // One pass collects amplitudes and fills the not-yet-sampled gaps.
        let mut amps = Vec::with_capacity(end - start);
        let mut gap_start: Option<f64> = None;
        let mut requested = false;
        for (i, value) in level[start..end].iter().enumerate() {
            let x = view.time_to_x((start + i) as f64 * seconds_per_point);
            if value.is_nan() {
                gap_start.get_or_insert(x);
                requested = true;
                amps.push((x, 0.0));
            } else {
                if let Some(gx) = gap_start.take() {
                    frame.fill_rectangle(
                        pt(gx, 0.0),
                        Size::new((x - gx) as f32, view.height as f32),
                        PENDING_WAVEFORM_COLOR,
                    );
                }
                amps.push((x, f64::from(*value) * half));
            }
        }
        let draw_end = view.time_to_x((end - 1) as f64 * seconds_per_point) + width_v;
        if let Some(gx) = gap_start {
            frame.fill_rectangle(
                pt(gx, 0.0),
                Size::new((draw_end - gx) as f32, view.height as f32),
                PENDING_WAVEFORM_COLOR,
            );
        }
        if requested {
            view.request_sampling();
        }

        let outline = Path::new(|b| {
            b.move_to(pt(amps[0].0, baseline));
            for &(x, y) in &amps {
                b.line_to(pt(x, baseline + 0.5 + y));
            }
            b.line_to(pt(draw_end, baseline));
            for &(x, y) in amps.iter().rev() {
                b.line_to(pt(x, baseline - 0.5 - y));
            }
            b.close();
        });
        frame.fill(&outline, WAVEFORM_COLOR);
    }

    fn draw_ruler(&self, frame: &mut Frame) {
        let view = &self.timeline.view;
        frame.fill_rectangle(
            Point::ORIGIN,
            Size::new(view.width as f32, HEADER_HEIGHT as f32),
            HEADER_BACK,
        );

        let (small, n_med, n_big) = tick_units(view.scale());
        let big = small * n_big as f64;
        let start = (view.offset() / big).floor() * big;
        let end = view.visible_end();
        let count = ((end - start) / small).ceil() as usize;

        let tick = |frame: &mut Frame, x: f64, height: f64, color: Color, width: f32| {
            frame.stroke(
                &Path::line(pt(x, 0.0), pt(x, height)),
                Stroke::default().with_color(color).with_width(width),
            );
        };
        for i in 0..count {
            let x = view.time_to_x(start + i as f64 * small);
            let height = if i % n_big == 0 {
                tick(frame, x, view.height, LINE_BIG_COLOR, 0.5);
                HEADER_HEIGHT
            } else if i % n_med == 0 {
                tick(frame, x, view.height, LINE_MED_COLOR, 0.5);
                HEADER_HEIGHT * 0.5
            } else {
                HEADER_HEIGHT * 0.2
            };
            tick(frame, x, height, TICK_COLOR, 0.5);
        }

        let mut t = start;
        while t < end {
            frame.fill_text(Text {
                content: format_timestamp(t),
                position: pt(view.time_to_x(t) + 5.0, HEADER_HEIGHT),
                size: (HEADER_HEIGHT as f32 * 0.8).into(),
                color: RULER_TEXT,
                align_x: Horizontal::Left.into(),
                align_y: Vertical::Bottom.into(),
                ..Text::default()
            });
            t += big;
        }
    }

    fn draw_tracks(&self, frame: &mut Frame) {
        let timeline = self.timeline;
        let view = &timeline.view;
        let layout = &timeline.layout;
        let font_size = timeline.config.font_size as f32;
        let row_height = layout.row_height;
        let shown = layout.shown_tracks();

        if let Some(active) = timeline.active_track() {
            if let Some(row) = layout.row_of(active) {
                frame.fill_rectangle(
                    pt(0.0, layout.row_y(row)),
                    Size::new(view.width as f32, row_height as f32),
                    SELECTED_TRACK_BACK,
                );
            }
        }
        for row in 0..=shown.len() {
            let y = layout.row_y(row);
            frame.stroke(
                &Path::line(pt(0.0, y), pt(view.width, y)),
                Stroke::default().with_color(TRACK_LINE_COLOR).with_width(1.0),
            );
        }

        let split = timeline.split_in_progress();
        for entry in layout.visible_entries(self.doc, view) {
            let back = match entry.label.color() {
                Some([r, g, b]) => Color::from_rgba(r, g, b, ENTRY_BACK_OPACITY),
                None => ENTRY_BACK,
            };
            let (border, border_width) = if timeline.selection().contains(&entry.id) {
                (ENTRY_BORDER_FOCUS, ENTRY_BORDER_WIDTH_FOCUS)
            } else {
                (ENTRY_BORDER, ENTRY_BORDER_WIDTH)
            };

            for b in layout.entry_boxes(view, entry) {
                let shape =
                    Path::rounded_rectangle(pt(b.x, b.y), Size::new(b.w as f32, b.h as f32), 4.0.into());
                frame.fill(&shape, back);
                frame.stroke(
                    &shape,
                    Stroke::default().with_color(border).with_width(border_width),
                );

                if b.w < TEXT_MIN_WIDTH {
                    continue;
                }
                let Some(text) = entry.texts.get(&b.track) else {
                    continue;
                };
                let clip = Rectangle::new(pt(b.x, b.y), Size::new(b.w as f32, b.h as f32));

                let pick = split.filter(|s| s.target == entry.id).and_then(|s| {
                    s.positions.get(&b.track).map(|pos| (s, *pos))
                });
                if let Some((s, pos)) = pick {
                    // Preview of the pending split: both halves plus a
                    // separator at the break position.
                    let separator = (s.break_position - entry.start) / entry.duration() * b.w;
                    let split_at = text
                        .char_indices()
                        .nth(pos)
                        .map(|(byte, _)| byte)
                        .unwrap_or(text.len());
                    let color = if s.current == b.track { ENTRY_TEXT_SPLITTING } else { ENTRY_TEXT };
                    frame.with_clip(clip, |frame| {
                        frame.fill_text(Text {
                            content: text[..split_at].to_owned(),
                            position: pt(separator - 2.0, 4.0),
                            size: font_size.into(),
                            color,
                            align_x: Horizontal::Right.into(),
                            align_y: Vertical::Top.into(),
                            ..Text::default()
                        });
                        frame.fill_text(Text {
                            content: text[split_at..].to_owned(),
                            position: pt(separator + 2.0, 4.0),
                            size: font_size.into(),
                            color,
                            align_x: Horizontal::Left.into(),
                            align_y: Vertical::Top.into(),
                            ..Text::default()
                        });
                        frame.stroke(
                            &Path::line(pt(separator, 4.0), pt(separator, row_height - 4.0)),
                            Stroke::default().with_color(ALIGNLINE_COLOR).with_width(2.0),
                        );
                    });
                } else {
                    let content = text.clone();
                    frame.with_clip(clip, |frame| {
                        frame.fill_text(Text {
                            content,
                            position: pt(4.0, 4.0),
                            size: font_size.into(),
                            color: ENTRY_TEXT,
                            align_x: Horizontal::Left.into(),
                            align_y: Vertical::Top.into(),
                            ..Text::default()
                        });
                    });
                }
            }
        }
    }

    fn draw_overlays(&self, frame: &mut Frame) {
        let timeline = self.timeline;
        let view = &timeline.view;
        let layout = &timeline.layout;

        if let Some(select_box) = timeline.select_box() {
            let shape = Path::rounded_rectangle(
                pt(select_box.x, select_box.y),
                Size::new(select_box.w as f32, select_box.h as f32),
                2.0.into(),
            );
            frame.fill(&shape, BOXSELECT_BACK);
            frame.stroke(
                &shape,
                Stroke::default()
                    .with_color(BOXSELECT_BORDER)
                    .with_width(BOXSELECT_WIDTH),
            );
        }

        if let Some(line) = timeline.alignment_line() {
            let x = view.time_to_x(line.position);
            let path = Path::new(|b| {
                // Brackets open toward rows that are not aligned, closing
                // around each contiguous run of aligned rows.
                for &row in &line.rows {
                    let y1 = layout.row_y(row);
                    let y2 = y1 + layout.row_height;
                    if !line.rows.contains(&row.wrapping_sub(1)) {
                        b.move_to(pt(x - 5.0, y1 - 5.0));
                        b.line_to(pt(x, y1));
                        b.line_to(pt(x + 5.0, y1 - 5.0));
                    }
                    if !line.rows.contains(&(row + 1)) {
                        b.move_to(pt(x - 5.0, y2 + 5.0));
                        b.line_to(pt(x, y2));
                        b.line_to(pt(x + 5.0, y2 + 5.0));
                    }
                }
                b.move_to(pt(x, HEADER_HEIGHT));
                b.line_to(pt(x, view.height));
            });
            frame.stroke(
                &path,
                Stroke::default()
                    .with_color(ALIGNLINE_COLOR)
                    .with_width(ALIGNLINE_WIDTH),
            );
        }

        let x = view.time_to_x(self.playback.position());
        let playhead = Path::new(|b| {
            b.move_to(pt(x + 4.0, 0.0));
            b.line_to(pt(x - 4.0, 0.0));
            b.line_to(pt(x - 1.0, 10.0));
            b.line_to(pt(x - 1.0, view.height));
            b.line_to(pt(x + 1.0, view.height));
            b.line_to(pt(x + 1.0, 10.0));
            b.close();
        });
        frame.fill(&playhead, CURSOR_COLOR);

        let area = &self.playback.play_area;
        if let Some(start) = area.start {
            let end_x = view.time_to_x(start).max(0.0);
            frame.fill_rectangle(
                Point::ORIGIN,
                Size::new(end_x as f32, view.height as f32),
                INOUT_AREA_OUTSIDE,
            );
        }
        if let Some(end) = area.end {
            let start_x = view.time_to_x(end).max(0.0);
            frame.fill_rectangle(
                pt(start_x, 0.0),
                Size::new((view.width - start_x).max(0.0) as f32, view.height as f32),
                INOUT_AREA_OUTSIDE,
            );
        }
        let status = format!(
            "{}{}{}",
            if area.start.is_some() { "IN " } else { "" },
            if area.end.is_some() { "OUT " } else { "" },
            if area.looping { "LOOP " } else { "" },
        );
        if !status.is_empty() {
            frame.fill_text(Text {
                content: status,
                position: pt(view.width - 5.0, HEADER_HEIGHT + 5.0),
                size: (timeline.config.font_size as f32).into(),
                color: INOUT_TEXT,
                align_x: Horizontal::Right.into(),
                align_y: Vertical::Top.into(),
                ..Text::default()
            });
        }
    }

    fn draw_left_column(&self, frame: &mut Frame) {
        let timeline = self.timeline;
        let view = &timeline.view;
        let layout = &timeline.layout;
        let width = view.left_column_width;

        frame.fill_rectangle(
            Point::ORIGIN,
            Size::new(width as f32, view.height as f32),
            LEFT_COLUMN_BACK,
        );
        frame.stroke(
            &Path::line(pt(width, 0.0), pt(width, view.height)),
            Stroke::default().with_color(LEFT_COLUMN_OUTLINE).with_width(1.0),
        );

        let shown = layout.shown_tracks();
        for (row, track) in shown.iter().enumerate() {
            let y = layout.row_y(row);
            if timeline.active_track() == Some(*track) {
                frame.fill_rectangle(
                    pt(0.0, y),
                    Size::new(width as f32, layout.row_height as f32),
                    LEFT_COLUMN_SELECTED,
                );
            }
            if let Some(track) = self.doc.track(*track) {
                frame.fill_text(Text {
                    content: track.name.clone(),
                    position: pt(width - LEFT_COLUMN_MARGIN, y + layout.row_height * 0.5),
                    size: (timeline.config.font_size as f32).into(),
                    color: LEFT_COLUMN_TEXT,
                    align_x: Horizontal::Right.into(),
                    align_y: Vertical::Center.into(),
                    ..Text::default()
                });
            }
        }
        for row in 0..=shown.len() {
            let y = layout.row_y(row);
            frame.stroke(
                &Path::line(pt(0.0, y), pt(width, y)),
                Stroke::default()
                    .with_color(LEFT_COLUMN_SEPARATOR)
                    .with_width(1.0),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_ladder_scales() {
        // Zoomed far out: only the fallback minute grid is usable.
        assert_eq!(tick_units(0.02), (60.0, 10, 60));
        // At 10 px/s a 1 s small tick with 10 s mediums fits.
        assert_eq!(tick_units(10.0), (1.0, 10, 60));
        // Zoomed far in, centisecond ticks.
        assert_eq!(tick_units(300.0), (0.01, 10, 100));
    }

    #[test]
    fn timestamps_format_as_centiseconds() {
        assert_eq!(format_timestamp(0.0), "0:00:00.00");
        assert_eq!(format_timestamp(61.25), "0:01:01.25");
        assert_eq!(format_timestamp(3600.0 + 23.0 * 60.0 + 45.678), "1:23:45.68");
        assert_eq!(format_timestamp(-5.0), "0:00:00.00");
    }

    #[test]
    fn buttons_translate() {
        assert_eq!(pointer_button(mouse::Button::Left), Some(PointerButton::Primary));
        assert_eq!(pointer_button(mouse::Button::Right), Some(PointerButton::Secondary));
        assert_eq!(pointer_button(mouse::Button::Middle), Some(PointerButton::Middle));
        assert_eq!(pointer_button(mouse::Button::Forward), None);
    }
}
