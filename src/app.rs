use crate::help::Help;
use crate::picker::{DatePicker, DatePickerInput, DatePickerOutput, DatePickerState};
use crate::selector::{SelectorState, WeekChanged, WeekObserver, WeekSelector};
use crate::theme::{BASE_STYLE, STATUS_STYLE};
use crate::widget::WeekStrip;
use crossterm::event::{read, KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    backend::Backend,
    buffer::Buffer,
    layout::Rect,
    text::Line,
    widgets::{StatefulWidget, Widget},
    Terminal,
};
use std::io::{self, Write};

/// Remembers the most recent week announced by the selector
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub(crate) struct LastWeek(Option<WeekChanged>);

impl WeekObserver for LastWeek {
    fn week_changed(&mut self, event: WeekChanged, _state: &SelectorState) {
        self.0 = Some(event);
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct App {
    selector: WeekSelector<LastWeek>,
    picker: DatePickerState,
    state: AppState,
}

impl App {
    pub(crate) fn new(mut selector: WeekSelector<LastWeek>) -> App {
        selector.mount();
        App {
            selector,
            picker: DatePickerState::default(),
            state: AppState::Selecting,
        }
    }

    /// Runs the UI until the user quits.  Returns the chosen week, or `None`
    /// if the user aborted with Ctrl-C.
    pub(crate) fn run<B: Backend>(
        mut self,
        terminal: &mut Terminal<B>,
    ) -> io::Result<Option<WeekChanged>> {
        while !self.quitting() {
            self.draw(terminal)?;
            self.handle_input()?;
        }
        Ok(self.chosen_week())
    }

    fn draw<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        terminal.draw(|frame| frame.render_widget(self, frame.area()))?;
        Ok(())
    }

    fn handle_input(&mut self) -> io::Result<()> {
        let normal_modifiers = KeyModifiers::NONE | KeyModifiers::SHIFT;
        if let Some(KeyEvent {
            code, modifiers, ..
        }) = read()?.as_key_press_event()
        {
            if modifiers == KeyModifiers::CONTROL && code == KeyCode::Char('c') {
                self.state = AppState::Aborted;
            } else if !normal_modifiers.contains(modifiers) || !self.handle_key(code) {
                self.beep()?;
            }
        }
        // else: Redraw on resize, and we might as well redraw on other stuff
        // too
        Ok(())
    }

    // Returns `false` if the user pressed an invalid key
    fn handle_key(&mut self, key: KeyCode) -> bool {
        match self.state {
            AppState::Selecting if self.selector.state().overlay_open() => {
                self.handle_picker_key(key)
            }
            AppState::Selecting => match key {
                KeyCode::Char('h') | KeyCode::Left => self.selector.step_backward().is_ok(),
                KeyCode::Char('l') | KeyCode::Right => self.selector.step_forward().is_ok(),
                KeyCode::Char('0') | KeyCode::Home => self.selector.jump_to_today().is_ok(),
                KeyCode::Char('g') => {
                    self.picker = DatePickerState::new(self.selector.state().selected());
                    self.selector.open_overlay();
                    true
                }
                KeyCode::Char('q') | KeyCode::Esc | KeyCode::Enter => {
                    self.state = AppState::Quitting;
                    true
                }
                KeyCode::Char('?') => {
                    self.state = AppState::Helping;
                    true
                }
                _ => false,
            },
            AppState::Helping => {
                self.state = AppState::Selecting;
                true
            }
            AppState::Quitting | AppState::Aborted => false,
        }
    }

    fn handle_picker_key(&mut self, key: KeyCode) -> bool {
        if matches!(key, KeyCode::Char('q' | 'g') | KeyCode::Esc) {
            self.selector.close_overlay();
            return true;
        }
        let input = match key {
            KeyCode::Char('-') => DatePickerInput::Negative,
            KeyCode::Char('+') => DatePickerInput::Positive,
            KeyCode::Char(c) => match c.to_digit(10).and_then(|d| u8::try_from(d).ok()) {
                Some(d) => DatePickerInput::Digit(d),
                None => return false,
            },
            KeyCode::Backspace | KeyCode::Delete => DatePickerInput::Backspace,
            KeyCode::Enter => DatePickerInput::Enter,
            _ => return false,
        };
        match self.picker.handle_input(input) {
            DatePickerOutput::Ok => true,
            DatePickerOutput::Invalid => false,
            DatePickerOutput::Confirm(date) => self.selector.jump_to(date).is_ok(),
        }
    }

    fn beep(&self) -> io::Result<()> {
        io::stdout().write_all(b"\x07")
    }

    fn quitting(&self) -> bool {
        matches!(self.state, AppState::Quitting | AppState::Aborted)
    }

    fn chosen_week(&self) -> Option<WeekChanged> {
        if self.state == AppState::Aborted {
            None
        } else {
            self.selector.observer().0
        }
    }
}

impl Widget for &mut App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        buf.set_style(area, BASE_STYLE);
        let main_area = Rect {
            height: area.height.saturating_sub(1),
            ..area
        };
        let status_area = Rect {
            y: main_area.bottom(),
            height: area.height - main_area.height,
            ..area
        };
        WeekStrip::new(*self.selector.state(), self.selector.today()).render(main_area, buf);
        if let Some(week) = self.selector.observer().0 {
            Line::styled(format!(" Week: {} to {}", week.start, week.end), STATUS_STYLE)
                .render(status_area, buf);
        }
        Line::styled("? for help ", STATUS_STYLE)
            .right_aligned()
            .render(status_area, buf);
        if self.state == AppState::Helping {
            Help(BASE_STYLE).render(area, buf);
        } else if self.selector.state().overlay_open() {
            DatePicker.render(area, buf, &mut self.picker);
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum AppState {
    Selecting,
    Helping,
    Quitting,
    Aborted,
}
