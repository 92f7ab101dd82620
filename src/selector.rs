use crate::week::Week;
use std::fmt;
use thiserror::Error;
use time::{Date, Duration};

/// Notification sent to a [`WeekObserver`] whenever the resolved week changes
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub(crate) struct WeekChanged {
    /// The Monday of the new week
    pub(crate) start: Date,
    /// The Sunday of the new week
    pub(crate) end: Date,
}

impl From<Week> for WeekChanged {
    fn from(week: Week) -> WeekChanged {
        WeekChanged {
            start: week.start(),
            end: week.end(),
        }
    }
}

impl fmt::Display for WeekChanged {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.start, self.end)
    }
}

/// A consumer of [`WeekChanged`] events.
///
/// The observer is called only once the selector's state has been fully
/// updated, and it is passed that state.  A panic raised by the observer
/// propagates out of the selector operation that triggered it, but the
/// selector's state remains consistent.
pub(crate) trait WeekObserver {
    fn week_changed(&mut self, event: WeekChanged, state: &SelectorState);
}

impl WeekObserver for () {
    fn week_changed(&mut self, _event: WeekChanged, _state: &SelectorState) {}
}

impl<O: WeekObserver> WeekObserver for Option<O> {
    fn week_changed(&mut self, event: WeekChanged, state: &SelectorState) {
        if let Some(observer) = self {
            observer.week_changed(event, state);
        }
    }
}

impl<F: FnMut(WeekChanged, &SelectorState)> WeekObserver for F {
    fn week_changed(&mut self, event: WeekChanged, state: &SelectorState) {
        self(event, state);
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
// Invariant: `week == Week::containing(selected)`
pub(crate) struct SelectorState {
    selected: Date,
    week: Week,
    overlay_open: bool,
}

impl SelectorState {
    fn new(selected: Date) -> Result<SelectorState, OutOfTimeError> {
        Ok(SelectorState {
            selected,
            week: resolve(selected)?,
            overlay_open: false,
        })
    }

    pub(crate) fn selected(&self) -> Date {
        self.selected
    }

    pub(crate) fn week(&self) -> Week {
        self.week
    }

    pub(crate) fn overlay_open(&self) -> bool {
        self.overlay_open
    }

    /// Column (Monday = 0) of the highlighted day
    pub(crate) fn highlighted(&self) -> usize {
        debug_assert!(self.week.contains(self.selected), "selection left its week");
        self.week.position(self.selected).unwrap_or_default()
    }
}

/// A selected date together with the Monday-Sunday week containing it,
/// navigable a week at a time or by jumping to an arbitrary date
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct WeekSelector<O> {
    today: Date,
    state: SelectorState,
    /// Monday of the most recently emitted week
    last_emitted: Option<Date>,
    observer: O,
}

impl<O: WeekObserver> WeekSelector<O> {
    pub(crate) fn new(today: Date, observer: O) -> Result<Self, OutOfTimeError> {
        Ok(WeekSelector {
            today,
            state: SelectorState::new(today)?,
            last_emitted: None,
            observer,
        })
    }

    /// Select `date` instead of today before the selector is mounted
    pub(crate) fn start_date(mut self, date: Date) -> Result<Self, OutOfTimeError> {
        self.state = SelectorState::new(date)?;
        Ok(self)
    }

    /// Announce the initial week to the observer.  Only the first call has any
    /// effect.
    pub(crate) fn mount(&mut self) {
        if self.last_emitted.is_none() {
            self.notify();
        }
    }

    pub(crate) fn today(&self) -> Date {
        self.today
    }

    pub(crate) fn state(&self) -> &SelectorState {
        &self.state
    }

    pub(crate) fn observer(&self) -> &O {
        &self.observer
    }

    pub(crate) fn step_backward(&mut self) -> Result<(), OutOfTimeError> {
        self.step(-Duration::WEEK)
    }

    pub(crate) fn step_forward(&mut self) -> Result<(), OutOfTimeError> {
        self.step(Duration::WEEK)
    }

    /// Select `date` and close the overlay.  On failure, nothing changes.
    pub(crate) fn jump_to(&mut self, date: Date) -> Result<(), OutOfTimeError> {
        tracing::debug!(%date, "jumping to date");
        let week = resolve(date)?;
        self.state.overlay_open = false;
        self.commit(date, week);
        Ok(())
    }

    pub(crate) fn jump_to_today(&mut self) -> Result<(), OutOfTimeError> {
        self.jump_to(self.today)
    }

    pub(crate) fn open_overlay(&mut self) {
        self.state.overlay_open = true;
    }

    pub(crate) fn close_overlay(&mut self) {
        self.state.overlay_open = false;
    }

    fn step(&mut self, delta: Duration) -> Result<(), OutOfTimeError> {
        let Some(selected) = self.state.selected.checked_add(delta) else {
            tracing::warn!(from = %self.state.selected, "cannot step beyond the end of time");
            return Err(OutOfTimeError);
        };
        tracing::debug!(from = %self.state.selected, to = %selected, "stepping one week");
        let week = resolve(selected)?;
        self.commit(selected, week);
        Ok(())
    }

    fn commit(&mut self, selected: Date, week: Week) {
        debug_assert!(week.contains(selected), "selected date must lie in its week");
        self.state.selected = selected;
        self.state.week = week;
        self.notify();
    }

    fn notify(&mut self) {
        let week = self.state.week;
        if self.last_emitted != Some(week.start()) {
            self.last_emitted = Some(week.start());
            let event = WeekChanged::from(week);
            tracing::info!(start = %event.start, end = %event.end, "week changed");
            self.observer.week_changed(event, &self.state);
        }
    }
}

fn resolve(date: Date) -> Result<Week, OutOfTimeError> {
    Week::containing(date).ok_or_else(|| {
        tracing::warn!(%date, "week is beyond the end of time");
        OutOfTimeError
    })
}

#[derive(Copy, Clone, Debug, Eq, Error, PartialEq)]
#[error("reached the end of time")]
pub(crate) struct OutOfTimeError;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::week::tests::any_date;
    use proptest::prelude::*;
    use std::cell::Cell;
    use std::panic::{catch_unwind, AssertUnwindSafe};
    use time::macros::date;

    type Seen = Vec<(WeekChanged, SelectorState)>;

    impl WeekObserver for Seen {
        fn week_changed(&mut self, event: WeekChanged, state: &SelectorState) {
            self.push((event, *state));
        }
    }

    fn events(selector: &WeekSelector<Seen>) -> Vec<WeekChanged> {
        selector.observer().iter().map(|&(ev, _)| ev).collect()
    }

    fn week_of(start: Date, end: Date) -> WeekChanged {
        WeekChanged { start, end }
    }

    fn mounted(today: Date) -> WeekSelector<Seen> {
        let mut selector = WeekSelector::new(today, Seen::new()).unwrap();
        selector.mount();
        selector
    }

    #[test]
    fn test_mount() {
        let selector = mounted(date!(2024 - 06 - 12));
        let state = selector.state();
        assert_eq!(state.selected(), date!(2024 - 06 - 12));
        assert_eq!(state.week().start(), date!(2024 - 06 - 10));
        assert_eq!(state.week().end(), date!(2024 - 06 - 16));
        assert_eq!(state.highlighted(), 2);
        assert!(!state.overlay_open());
        assert_eq!(
            events(&selector),
            [week_of(date!(2024 - 06 - 10), date!(2024 - 06 - 16))]
        );
    }

    #[test]
    fn test_mount_twice() {
        let mut selector = mounted(date!(2024 - 06 - 12));
        selector.mount();
        assert_eq!(events(&selector).len(), 1);
    }

    #[test]
    fn test_start_date() {
        let mut selector = WeekSelector::new(date!(2024 - 06 - 12), Seen::new())
            .unwrap()
            .start_date(date!(2023 - 02 - 05))
            .unwrap();
        selector.mount();
        assert_eq!(selector.state().highlighted(), 6);
        assert_eq!(
            events(&selector),
            [week_of(date!(2023 - 01 - 30), date!(2023 - 02 - 05))]
        );
    }

    #[test]
    fn test_navigation_scenario() {
        let mut selector = mounted(date!(2024 - 06 - 12));

        selector.step_forward().unwrap();
        let state = *selector.state();
        assert_eq!(state.week().start(), date!(2024 - 06 - 17));
        assert_eq!(state.week().end(), date!(2024 - 06 - 23));
        assert_eq!(state.selected(), date!(2024 - 06 - 19));
        assert_eq!(state.highlighted(), 2);
        assert_eq!(events(&selector).len(), 2);

        selector.jump_to(date!(2024 - 06 - 21)).unwrap();
        assert_eq!(selector.state().week(), state.week());
        assert_eq!(selector.state().selected(), date!(2024 - 06 - 21));
        assert_eq!(selector.state().highlighted(), 4);
        assert_eq!(events(&selector).len(), 2);

        selector.jump_to(date!(2025 - 01 - 01)).unwrap();
        assert_eq!(selector.state().week().start(), date!(2024 - 12 - 30));
        assert_eq!(
            events(&selector),
            [
                week_of(date!(2024 - 06 - 10), date!(2024 - 06 - 16)),
                week_of(date!(2024 - 06 - 17), date!(2024 - 06 - 23)),
                week_of(date!(2024 - 12 - 30), date!(2025 - 01 - 05)),
            ]
        );
    }

    #[test]
    fn test_step_round_trip() {
        let mut selector = mounted(date!(2024 - 02 - 29));
        let before = *selector.state();
        selector.step_forward().unwrap();
        selector.step_backward().unwrap();
        assert_eq!(*selector.state(), before);
        assert_eq!(
            events(&selector),
            [
                week_of(date!(2024 - 02 - 26), date!(2024 - 03 - 03)),
                week_of(date!(2024 - 03 - 04), date!(2024 - 03 - 10)),
                week_of(date!(2024 - 02 - 26), date!(2024 - 03 - 03)),
            ]
        );
    }

    #[test]
    fn test_rapid_steps_emit_each_week() {
        let mut selector = mounted(date!(2024 - 06 - 12));
        for _ in 0..3 {
            selector.step_backward().unwrap();
        }
        let starts = events(&selector)
            .into_iter()
            .map(|ev| ev.start)
            .collect::<Vec<_>>();
        assert_eq!(
            starts,
            [
                date!(2024 - 06 - 10),
                date!(2024 - 06 - 03),
                date!(2024 - 05 - 27),
                date!(2024 - 05 - 20),
            ]
        );
    }

    #[test]
    fn test_observer_sees_settled_state() {
        let mut selector = mounted(date!(2024 - 06 - 12));
        selector.step_forward().unwrap();
        selector.jump_to(date!(2030 - 07 - 04)).unwrap();
        for (event, state) in selector.observer() {
            assert_eq!(event.start, state.week().start());
            assert_eq!(event.end, state.week().end());
            assert!(state.week().contains(state.selected()));
        }
    }

    #[test]
    fn test_closure_observer() {
        let calls = Cell::new(0);
        let observer = |ev: WeekChanged, state: &SelectorState| {
            assert_eq!(ev.start, state.week().start());
            calls.set(calls.get() + 1);
        };
        let mut selector = WeekSelector::new(date!(2024 - 06 - 12), observer).unwrap();
        selector.mount();
        selector.step_forward().unwrap();
        selector.jump_to(date!(2024 - 06 - 20)).unwrap();
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_optional_observer() {
        let mut selector = WeekSelector::new(date!(2024 - 06 - 12), Some(Seen::new())).unwrap();
        selector.mount();
        selector.step_forward().unwrap();
        selector.jump_to(date!(2024 - 06 - 21)).unwrap();
        let starts = selector
            .observer()
            .iter()
            .flatten()
            .map(|(ev, _)| ev.start)
            .collect::<Vec<_>>();
        assert_eq!(starts, [date!(2024 - 06 - 10), date!(2024 - 06 - 17)]);

        let mut selector = WeekSelector::new(date!(2024 - 06 - 12), None::<Seen>).unwrap();
        selector.mount();
        selector.step_backward().unwrap();
        assert_eq!(selector.state().selected(), date!(2024 - 06 - 05));
        assert!(selector.observer().is_none());
    }

    #[test]
    fn test_panicking_observer_leaves_state_consistent() {
        struct PanicsAfterFirst(usize);

        impl WeekObserver for PanicsAfterFirst {
            fn week_changed(&mut self, _event: WeekChanged, _state: &SelectorState) {
                self.0 += 1;
                assert!(self.0 < 2, "observer failure");
            }
        }

        let mut selector = WeekSelector::new(date!(2024 - 06 - 12), PanicsAfterFirst(0)).unwrap();
        selector.mount();
        let r = catch_unwind(AssertUnwindSafe(|| selector.step_forward()));
        assert!(r.is_err());
        let state = selector.state();
        assert_eq!(state.selected(), date!(2024 - 06 - 19));
        assert_eq!(state.week().start(), date!(2024 - 06 - 17));
        assert_eq!(state.highlighted(), 2);
    }

    #[test]
    fn test_overlay() {
        let mut selector = mounted(date!(2024 - 06 - 12));
        selector.open_overlay();
        assert!(selector.state().overlay_open());
        selector.step_forward().unwrap();
        selector.step_backward().unwrap();
        assert!(selector.state().overlay_open());
        assert_eq!(selector.state().selected(), date!(2024 - 06 - 12));
        selector.close_overlay();
        assert!(!selector.state().overlay_open());
        selector.open_overlay();
        selector.jump_to(date!(2024 - 06 - 14)).unwrap();
        assert!(!selector.state().overlay_open());
        assert_eq!(events(&selector).len(), 3);
    }

    #[test]
    fn test_jump_to_today() {
        let mut selector = mounted(date!(2024 - 06 - 12));
        selector.jump_to(date!(1999 - 12 - 31)).unwrap();
        selector.jump_to_today().unwrap();
        assert_eq!(selector.state().selected(), date!(2024 - 06 - 12));
        assert_eq!(events(&selector).len(), 3);
    }

    #[test]
    fn test_end_of_time() {
        let mut selector = mounted(date!(9999 - 12 - 20));
        selector.open_overlay();
        assert_eq!(selector.step_forward(), Err(OutOfTimeError));
        assert_eq!(selector.jump_to(date!(9999 - 12 - 31)), Err(OutOfTimeError));
        let state = selector.state();
        assert_eq!(state.selected(), date!(9999 - 12 - 20));
        assert!(state.overlay_open());
        assert_eq!(events(&selector).len(), 1);
    }

    #[test]
    fn test_beginning_of_time() {
        let mut selector = mounted(Date::MIN.checked_add(Duration::days(10)).unwrap());
        let r = (0..3).try_for_each(|_| selector.step_backward());
        assert_eq!(r, Err(OutOfTimeError));
        let state = selector.state();
        assert!(state.week().contains(state.selected()));
    }

    #[test]
    fn test_display_event() {
        let ev = week_of(date!(2024 - 06 - 10), date!(2024 - 06 - 16));
        assert_eq!(ev.to_string(), "2024-06-10 2024-06-16");
    }

    #[derive(Clone, Copy, Debug)]
    enum Op {
        Back,
        Forward,
        Jump(Date),
        Open,
        Close,
    }

    fn any_op() -> impl Strategy<Value = Op> {
        prop_oneof![
            Just(Op::Back),
            Just(Op::Forward),
            any_date().prop_map(Op::Jump),
            Just(Op::Open),
            Just(Op::Close),
        ]
    }

    proptest! {
        #[test]
        fn selection_stays_in_resolved_week(
            start in any_date(),
            ops in prop::collection::vec(any_op(), 1..40),
        ) {
            let mut selector = mounted(start);
            for op in ops {
                let before = *selector.state();
                let r = match op {
                    Op::Back => selector.step_backward(),
                    Op::Forward => selector.step_forward(),
                    Op::Jump(d) => selector.jump_to(d),
                    Op::Open => {
                        selector.open_overlay();
                        Ok(())
                    }
                    Op::Close => {
                        selector.close_overlay();
                        Ok(())
                    }
                };
                let state = *selector.state();
                if r.is_err() {
                    prop_assert_eq!(state, before);
                }
                prop_assert_eq!(Week::containing(state.selected()), Some(state.week()));
                prop_assert_eq!(
                    state.week().days().nth(state.highlighted()),
                    Some(state.selected())
                );
                prop_assert_eq!(
                    state.week().days().filter(|&d| d == state.selected()).count(),
                    1
                );
                if matches!(op, Op::Back | Op::Forward) {
                    prop_assert_eq!(state.overlay_open(), before.overlay_open());
                    prop_assert_eq!(state.highlighted(), before.highlighted());
                }
            }
            let evs = events(&selector);
            for pair in evs.windows(2) {
                prop_assert_ne!(pair[0].start, pair[1].start);
            }
            prop_assert_eq!(evs.last().copied(), Some(WeekChanged::from(selector.state().week())));
        }

        #[test]
        fn forward_then_backward_restores_week(start in any_date()) {
            let mut selector = mounted(start);
            let before = selector.state().week();
            prop_assume!(selector.step_forward().is_ok());
            selector.step_backward().unwrap();
            prop_assert_eq!(selector.state().week(), before);
        }
    }
}
