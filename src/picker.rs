use crate::theme::{
    picker::{READY_ENTER_STYLE, UNFILLED_CELL_STYLE},
    BASE_STYLE,
};
use crate::widget::centered;
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Margin, Rect},
    text::{Line, Span, Text},
    widgets::{Block, Clear, StatefulWidget, Widget},
};
use time::{Date, Month};

const OUTER_WIDTH: u16 = 17;
const OUTER_HEIGHT: u16 = 8;
const ENTER_POS: usize = 8;

/// Modal box for entering a date to jump to
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct DatePicker;

impl StatefulWidget for DatePicker {
    type State = DatePickerState;

    /*
     * .................
     * .┌ Go To Date ─┐.
     * .│             │.
     * .│ -YYYY-MM-DD │.
     * .│             │.
     * .│   [ENTER]   │.
     * .└─────────────┘.
     * .................
     */

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        let outer_area = centered(area, OUTER_WIDTH, OUTER_HEIGHT);
        Clear.render(outer_area, buf);
        Block::new().style(BASE_STYLE).render(outer_area, buf);
        let block_area = outer_area.inner(Margin::new(1, 1));
        Block::bordered()
            .title(" Go To Date ")
            .title_alignment(Alignment::Center)
            .render(block_area, buf);
        let text_area = block_area.inner(Margin::new(1, 1));
        state.to_text().render(text_area, buf);
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub(crate) struct DatePickerState {
    negative: bool,
    year: [Option<u8>; 4],
    month: [Option<u8>; 2],
    day: [Option<u8>; 2],
    pos: usize,
}

impl DatePickerState {
    /// Returns a picker filled in with `date`, ready to be confirmed
    pub(crate) fn new(date: Date) -> DatePickerState {
        let year = date.year().unsigned_abs();
        let month = u8::from(date.month());
        let day = date.day();
        DatePickerState {
            negative: date.year() < 0,
            year: [
                digit(year / 1000),
                digit(year / 100),
                digit(year / 10),
                digit(year),
            ],
            month: [Some(month / 10), Some(month % 10)],
            day: [Some(day / 10), Some(day % 10)],
            pos: ENTER_POS,
        }
    }

    fn to_text(self) -> Text<'static> {
        Text::from_iter([
            Line::styled("", BASE_STYLE),
            self.to_line(),
            Line::styled("", BASE_STYLE),
            // Style a span and convert it to a line rather than creating a
            // styled line directly so that only the "[ENTER]" text and not any
            // of its centering padding will be underlined:
            Line::from(Span::styled(
                "[ENTER]",
                if self.pos == ENTER_POS {
                    READY_ENTER_STYLE
                } else {
                    BASE_STYLE
                },
            )),
        ])
        .centered()
    }

    fn to_line(self) -> Line<'static> {
        let mut spans = Vec::new();
        spans.push(Span::styled(
            if self.negative { "-" } else { " " },
            BASE_STYLE,
        ));
        let mut first = true;
        for (fallback, digits) in [
            ("Y", self.year.as_slice()),
            ("M", self.month.as_slice()),
            ("D", self.day.as_slice()),
        ] {
            if !std::mem::replace(&mut first, false) {
                spans.push(Span::styled("-", BASE_STYLE));
            }
            for dg in digits {
                spans.push(match dg {
                    Some(d) => Span::styled(format!("{d}"), BASE_STYLE),
                    None => Span::styled(fallback, UNFILLED_CELL_STYLE),
                });
            }
        }
        Line::from_iter(spans)
    }

    pub(crate) fn handle_input(&mut self, input: DatePickerInput) -> DatePickerOutput {
        match (input, self.pos) {
            (DatePickerInput::Negative, 0) => {
                self.negative = !self.negative;
                DatePickerOutput::Ok
            }
            (DatePickerInput::Positive, 0) => {
                self.negative = false;
                DatePickerOutput::Ok
            }
            (DatePickerInput::Digit(d), ENTER_POS) => {
                // Typing over a complete date starts a fresh one
                *self = DatePickerState::default();
                self.handle_input(DatePickerInput::Digit(d))
            }
            (DatePickerInput::Digit(d), 0..ENTER_POS) => {
                if let Some(cell) = self.cell_mut(self.pos) {
                    *cell = Some(d);
                }
                self.pos += 1;
                DatePickerOutput::Ok
            }
            (DatePickerInput::Backspace, 1..) => {
                self.pos -= 1;
                if let Some(cell) = self.cell_mut(self.pos) {
                    *cell = None;
                }
                DatePickerOutput::Ok
            }
            (DatePickerInput::Enter, ENTER_POS) => match self.date() {
                Some(date) => DatePickerOutput::Confirm(date),
                None => DatePickerOutput::Invalid,
            },
            _ => DatePickerOutput::Invalid,
        }
    }

    fn cell_mut(&mut self, pos: usize) -> Option<&mut Option<u8>> {
        match pos {
            0..4 => self.year.get_mut(pos),
            4..6 => self.month.get_mut(pos - 4),
            6..8 => self.day.get_mut(pos - 6),
            _ => None,
        }
    }

    /// The entered date, if all digits are filled in and they form a real
    /// calendar date
    fn date(&self) -> Option<Date> {
        let mut year = i32::from(number(&self.year)?);
        if self.negative {
            year *= -1;
        }
        let month = Month::try_from(u8::try_from(number(&self.month)?).ok()?).ok()?;
        let day = u8::try_from(number(&self.day)?).ok()?;
        Date::from_calendar_date(year, month, day).ok()
    }
}

fn digit(n: u32) -> Option<u8> {
    u8::try_from(n % 10).ok()
}

fn number(digits: &[Option<u8>]) -> Option<u16> {
    digits
        .iter()
        .try_fold(0u16, |acc, &d| Some(acc * 10 + u16::from(d?)))
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum DatePickerInput {
    Negative,
    Positive,
    Digit(u8),
    Backspace,
    Enter,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum DatePickerOutput {
    Ok,
    Invalid,
    Confirm(Date),
}
