//! Visibility coordination for the now-playing bar.
use crossbeam::channel::{Receiver, Sender, unbounded};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarVisibility {
    Hidden,
    Visible,
}

/// Broadcast to subscribers when the bar actually appears or disappears.
/// Screens use this to pad their scrollable content by the bar height.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarEvent {
    Appeared,
    Disappeared,
}

/// A subscriber's end of the registry. Dropping it is enough to stop
/// delivery; `unsubscribe` just removes the dead sender eagerly.
pub struct BarSubscription {
    pub id: usize,
    pub events: Receiver<BarEvent>,
}

/// Decides when the now-playing bar is shown and tells everyone who asked.
///
/// `show` and `hide` are idempotent: only an actual state change emits an
/// event, so calling `show` on an already visible bar notifies nobody.
pub struct BarCoordinator {
    visibility: BarVisibility,
    listeners: Vec<(usize, Sender<BarEvent>)>,
    next_id: usize,
}

impl BarCoordinator {
    pub fn new() -> Self {
        Self {
            visibility: BarVisibility::Hidden,
            listeners: Vec::new(),
            next_id: 0,
        }
    }

    pub fn visibility(&self) -> BarVisibility {
        self.visibility
    }

    pub fn is_visible(&self) -> bool {
        self.visibility == BarVisibility::Visible
    }

    pub fn subscribe(&mut self) -> BarSubscription {
        let (tx, rx) = unbounded();
        let id = self.next_id;
        self.next_id += 1;
        self.listeners.push((id, tx));
        BarSubscription { id, events: rx }
    }

    pub fn unsubscribe(&mut self, id: usize) {
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
    }

    pub fn show(&mut self) {
        if self.visibility == BarVisibility::Visible {
            return;
        }
        self.visibility = BarVisibility::Visible;
        self.notify(BarEvent::Appeared);
    }

    pub fn hide(&mut self) {
        if self.visibility == BarVisibility::Hidden {
            return;
        }
        self.visibility = BarVisibility::Hidden;
        self.notify(BarEvent::Disappeared);
    }

    fn notify(&mut self, event: BarEvent) {
        // prune subscribers whose receiving end is gone
        self.listeners
            .retain(|(_, tx)| tx.send(event).is_ok());
    }
}

impl Default for BarCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn show_twice_emits_one_event() {
        let mut bar = BarCoordinator::new();
        let sub = bar.subscribe();
        bar.show();
        bar.show();
        assert_eq!(sub.events.try_recv(), Ok(BarEvent::Appeared));
        assert!(sub.events.try_recv().is_err());
        assert!(bar.is_visible());
    }

    #[test]
    fn hide_then_show_emits_both_in_order() {
        let mut bar = BarCoordinator::new();
        let sub = bar.subscribe();
        bar.show();
        bar.hide();
        bar.show();
        let events: Vec<_> = sub.events.try_iter().collect();
        assert_eq!(
            events,
            vec![BarEvent::Appeared, BarEvent::Disappeared, BarEvent::Appeared]
        );
    }

    #[test]
    fn hide_while_hidden_is_silent() {
        let mut bar = BarCoordinator::new();
        let sub = bar.subscribe();
        bar.hide();
        assert!(sub.events.try_recv().is_err());
        assert_eq!(bar.visibility(), BarVisibility::Hidden);
    }

    #[test]
    fn unsubscribe_stops_delivery_for_that_listener_only() {
        let mut bar = BarCoordinator::new();
        let first = bar.subscribe();
        let second = bar.subscribe();
        bar.unsubscribe(first.id);
        bar.show();
        assert!(first.events.try_recv().is_err());
        assert_eq!(second.events.try_recv(), Ok(BarEvent::Appeared));
    }

    #[test]
    fn dropped_receivers_are_pruned() {
        let mut bar = BarCoordinator::new();
        let sub = bar.subscribe();
        drop(sub.events);
        bar.show();
        let survivor = bar.subscribe();
        bar.hide();
        assert_eq!(survivor.events.try_recv(), Ok(BarEvent::Disappeared));
    }
}
