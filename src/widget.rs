use crate::selector::SelectorState;
use crate::theme::{HIGHLIGHT_STYLE, RANGE_STYLE, TODAY_STYLE, WEEKDAY_STYLE};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Style,
    text::Text,
    widgets::{Paragraph, Widget},
};
use time::{format_description::FormatItem, macros::format_description, Date};

static HEADER: &str = "  Mon      Tue      Wed      Thu      Fri      Sat      Sun   ";

static RANGE_FMT: &[FormatItem<'_>] = format_description!(
    "[weekday repr:short], [month repr:short] [day padding:none], [year]"
);

static DAY_FMT: &[FormatItem<'_>] = format_description!("[month repr:short] [day padding:space]");

/// Number of columns per day of week, including the gap before the next day
const DAY_WIDTH: u16 = 9;

/// Width of the strip in columns
const MAIN_WIDTH: u16 = DAY_WIDTH * 7 - 1;

/// Number of lines taken up by the strip: the range, a rule, the weekday
/// names, the days, and another rule
const STRIP_LINES: u16 = 5;

const ACS_HLINE: char = '─';

/// A single row showing the resolved week, with the selected day highlighted
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct WeekStrip {
    state: SelectorState,
    today: Date,
}

impl WeekStrip {
    pub(crate) fn new(state: SelectorState, today: Date) -> WeekStrip {
        WeekStrip { state, today }
    }
}

impl Widget for WeekStrip {
    /*
     * <           Mon, Jun 10, 2024 - Sun, Jun 16, 2024            >
     * ──────────────────────────────────────────────────────────────
     *   Mon      Tue      Wed      Thu      Fri      Sat      Sun
     *  Jun 10   Jun 11  [Jun 12]  Jun 13   Jun 14   Jun 15   Jun 16
     * ──────────────────────────────────────────────────────────────
     */

    fn render(self, area: Rect, buf: &mut Buffer) {
        let area = centered(area, MAIN_WIDTH, STRIP_LINES);
        let week = self.state.week();
        let mut canvas = BufferCanvas::new(area, buf);
        canvas.draw_range(week.start(), week.end());
        canvas.hline(1, 0, ACS_HLINE, MAIN_WIDTH);
        canvas.mvprint(2, 0, HEADER, Some(WEEKDAY_STYLE));
        let highlighted = self.state.highlighted();
        for (i, date) in std::iter::zip(0u16.., week.days()) {
            let label = show(date, DAY_FMT);
            if highlighted == usize::from(i) {
                canvas.draw_day(i, format!("[{label}]"), Some(HIGHLIGHT_STYLE));
            } else if date == self.today {
                canvas.draw_day(i, format!(" {label} "), Some(TODAY_STYLE));
            } else {
                canvas.draw_day(i, format!(" {label} "), None);
            }
        }
        canvas.hline(4, 0, ACS_HLINE, MAIN_WIDTH);
    }
}

/// Returns a `width` × `height` rectangle in the middle of `area`, shrunk to
/// fit if necessary
pub(crate) fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

// Falls back to ISO 8601 if the description cannot be applied
fn show(date: Date, fmt: &[FormatItem<'_>]) -> String {
    date.format(fmt).unwrap_or_else(|_| date.to_string())
}

#[derive(Debug, Eq, PartialEq)]
struct BufferCanvas<'a> {
    area: Rect,
    buf: &'a mut Buffer,
}

impl<'a> BufferCanvas<'a> {
    fn new(area: Rect, buf: &'a mut Buffer) -> Self {
        Self { area, buf }
    }

    fn draw_range(&mut self, start: Date, end: Date) {
        let label = format!("{} - {}", show(start, RANGE_FMT), show(end, RANGE_FMT));
        let width = u16::try_from(label.len()).unwrap_or(u16::MAX);
        self.mvprint(0, 0, "<", None);
        self.mvprint(0, MAIN_WIDTH.saturating_sub(width) / 2, label, Some(RANGE_STYLE));
        self.mvprint(0, MAIN_WIDTH - 1, ">", None);
    }

    fn draw_day(&mut self, column: u16, s: String, style: Option<Style>) {
        self.mvprint(3, DAY_WIDTH * column, s, style);
    }

    fn mvprint<S: AsRef<str>>(&mut self, y: u16, x: u16, s: S, style: Option<Style>) {
        if y < self.area.height && x < self.area.width {
            let text = Text::styled(s.as_ref(), style.unwrap_or_default());
            let width = u16::try_from(text.width()).unwrap_or(u16::MAX);
            // Using a Paragraph lets us truncate text that extends beyond the
            // strip's area, though we need to be sure that the Rect passed to
            // the Paragraph is entirely within the frame lest a panic result.
            Paragraph::new(text).render(
                Rect {
                    x: x + self.area.x,
                    y: y + self.area.y,
                    width: (self.area.width - x).min(width),
                    height: 1,
                },
                self.buf,
            );
        }
    }

    fn hline(&mut self, y: u16, x: u16, ch: char, length: u16) {
        self.mvprint(y, x, String::from(ch).repeat(length.into()), None);
    }
}
