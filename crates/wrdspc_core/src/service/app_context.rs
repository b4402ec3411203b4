//! Application context: theme and writing direction with change
//! subscribers.
//!
//! # Responsibility
//! - Hold presentation-wide state in one explicit object passed to
//!   consumers, instead of ambient globals.
//! - Notify subscribers synchronously on every effective change.
//!
//! # Invariants
//! - Setting a value equal to the current one notifies nobody.
//! - Subscribers run in registration order.

use crate::model::preferences::{TextDirection, Theme};
use log::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextChange {
    Theme(Theme),
    Direction(TextDirection),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&ContextChange)>;

pub struct AppContext {
    theme: Theme,
    direction: TextDirection,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_id: u64,
}

impl AppContext {
    pub fn new(theme: Theme, direction: TextDirection) -> Self {
        Self {
            theme,
            direction,
            listeners: Vec::new(),
            next_id: 0,
        }
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn direction(&self) -> TextDirection {
        self.direction
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&ContextChange) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Returns whether the subscription existed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    /// Returns whether the theme changed.
    pub fn set_theme(&mut self, theme: Theme) -> bool {
        if self.theme == theme {
            return false;
        }
        self.theme = theme;
        debug!("event=theme_change module=context status=ok theme={}", theme);
        self.notify(ContextChange::Theme(theme));
        true
    }

    pub fn toggle_theme(&mut self) -> Theme {
        self.set_theme(self.theme.toggled());
        self.theme
    }

    pub fn set_direction(&mut self, direction: TextDirection) -> bool {
        if self.direction == direction {
            return false;
        }
        self.direction = direction;
        self.notify(ContextChange::Direction(direction));
        true
    }

    fn notify(&mut self, change: ContextChange) {
        for (_, listener) in &mut self.listeners {
            listener(&change);
        }
    }
}

impl Default for AppContext {
    fn default() -> Self {
        Self::new(Theme::default(), TextDirection::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn subscribers_see_effective_changes_only() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut context = AppContext::default();
        let sink = Rc::clone(&seen);
        context.subscribe(move |change| sink.borrow_mut().push(*change));

        assert!(!context.set_theme(Theme::Dark));
        assert_eq!(context.toggle_theme(), Theme::Light);
        context.set_direction(TextDirection::Rtl);

        assert_eq!(
            *seen.borrow(),
            vec![
                ContextChange::Theme(Theme::Light),
                ContextChange::Direction(TextDirection::Rtl),
            ]
        );
    }

    #[test]
    fn unsubscribed_listener_is_not_called() {
        let calls = Rc::new(RefCell::new(0));
        let mut context = AppContext::default();
        let counter = Rc::clone(&calls);
        let id = context.subscribe(move |_| *counter.borrow_mut() += 1);
        assert!(context.unsubscribe(id));
        assert!(!context.unsubscribe(id));
        context.toggle_theme();
        assert_eq!(*calls.borrow(), 0);
    }
}
