use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, warn};

use crate::geometry::Location;
use crate::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventTag(pub u32);

impl EventTag {
    pub const QUIT: EventTag = EventTag(0x100);
    pub const KEY_DOWN: EventTag = EventTag(0x300);
    pub const KEY_UP: EventTag = EventTag(0x301);
    pub const MOUSE_MOTION: EventTag = EventTag(0x400);
    pub const MOUSE_BUTTON_DOWN: EventTag = EventTag(0x401);
    pub const MOUSE_BUTTON_UP: EventTag = EventTag(0x402);
    /// First tag available to games; everything below is platform-reserved.
    pub const USER_EVENT: EventTag = EventTag(0x8000);

    pub fn is_reserved(self) -> bool {
        self < Self::USER_EVENT
    }
}

impl fmt::Display for EventTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}

#[derive(Debug)]
pub struct TagAllocator {
    next: u32,
}

impl Default for TagAllocator {
    fn default() -> Self {
        Self {
            next: EventTag::USER_EVENT.0,
        }
    }
}

impl TagAllocator {
    pub fn allocate(&mut self) -> EventTag {
        let tag = EventTag(self.next);
        self.next = self.next.saturating_add(1);
        tag
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Escape,
    Space,
    Enter,
    Up,
    Down,
    Left,
    Right,
    Char(char),
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventPayload {
    None,
    Key(Key),
    MouseMotion {
        position: Location,
    },
    MouseButton {
        button: MouseButton,
        position: Location,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub tag: EventTag,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(tag: EventTag) -> Self {
        Self {
            tag,
            payload: EventPayload::None,
        }
    }

    pub fn quit() -> Self {
        Self::new(EventTag::QUIT)
    }

    pub fn key_down(key: Key) -> Self {
        Self {
            tag: EventTag::KEY_DOWN,
            payload: EventPayload::Key(key),
        }
    }

    pub fn key_up(key: Key) -> Self {
        Self {
            tag: EventTag::KEY_UP,
            payload: EventPayload::Key(key),
        }
    }

    pub fn key(&self) -> Option<Key> {
        match self.payload {
            EventPayload::Key(key) => Some(key),
            _ => None,
        }
    }

    pub fn position(&self) -> Option<Location> {
        match self.payload {
            EventPayload::MouseMotion { position } | EventPayload::MouseButton { position, .. } => {
                Some(position)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("event tag {tag} already has a callback")]
pub struct DuplicateRegistrationError {
    pub tag: EventTag,
}

pub type EventCallback<C> = Box<dyn FnMut(&Event, &mut C) -> Result<(), EngineError>>;

/// Routes events to at most one callback per tag. `C` is the mutable
/// context callbacks receive.
pub struct EventDispatcher<C> {
    handlers: HashMap<EventTag, EventCallback<C>>,
}

impl<C> Default for EventDispatcher<C> {
    fn default() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }
}

impl<C> EventDispatcher<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, tag: EventTag, callback: F) -> Result<(), DuplicateRegistrationError>
    where
        F: FnMut(&Event, &mut C) -> Result<(), EngineError> + 'static,
    {
        if self.handlers.contains_key(&tag) {
            return Err(DuplicateRegistrationError { tag });
        }
        self.handlers.insert(tag, Box::new(callback));
        Ok(())
    }

    pub fn is_registered(&self, tag: EventTag) -> bool {
        self.handlers.contains_key(&tag)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Invokes bound callbacks in arrival order and returns how many events
    /// were handled. Unbound events are dropped; callback errors are logged.
    pub fn dispatch<I>(&mut self, events: I, ctx: &mut C) -> usize
    where
        I: IntoIterator<Item = Event>,
    {
        let mut handled = 0;
        for event in events {
            let Some(callback) = self.handlers.get_mut(&event.tag) else {
                continue;
            };
            handled += 1;
            if let Err(error) = callback(&event, ctx) {
                warn!(tag = %event.tag, error = %error, "event_callback_failed");
            }
        }
        handled
    }

    pub fn clear(&mut self) {
        self.handlers.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerRepeat {
    Once,
    Times(u32),
    Forever,
}

#[derive(Debug, Clone)]
struct Timer {
    tag: EventTag,
    interval: Duration,
    due: Instant,
    remaining: TimerRepeat,
}

/// Pending input events plus timers that post tagged events when due.
#[derive(Debug, Default)]
pub struct EventQueue {
    pending: VecDeque<Event>,
    timers: Vec<Timer>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: Event) {
        self.pending.push_back(event);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Starts a timer for `tag`, replacing any timer already running for it.
    /// A zero interval only cancels.
    pub fn set_timer(&mut self, tag: EventTag, interval: Duration, repeat: TimerRepeat, now: Instant) {
        self.cancel_timer(tag);
        if interval.is_zero() || repeat == TimerRepeat::Times(0) {
            return;
        }
        debug!(tag = %tag, interval_ms = interval.as_millis() as u64, ?repeat, "timer_set");
        self.timers.push(Timer {
            tag,
            interval,
            due: now + interval,
            remaining: repeat,
        });
    }

    pub fn cancel_timer(&mut self, tag: EventTag) -> bool {
        let before = self.timers.len();
        self.timers.retain(|timer| timer.tag != tag);
        before != self.timers.len()
    }

    pub fn has_timer(&self, tag: EventTag) -> bool {
        self.timers.iter().any(|timer| timer.tag == tag)
    }

    /// Returns due timer events, earliest first, followed by queued events.
    /// A timer fires at most once per poll.
    pub fn poll(&mut self, now: Instant) -> Vec<Event> {
        let mut due: Vec<(Instant, EventTag)> = Vec::new();
        for timer in &mut self.timers {
            if timer.due > now {
                continue;
            }
            due.push((timer.due, timer.tag));
            timer.remaining = match timer.remaining {
                TimerRepeat::Once | TimerRepeat::Times(0 | 1) => TimerRepeat::Times(0),
                TimerRepeat::Times(n) => TimerRepeat::Times(n - 1),
                TimerRepeat::Forever => TimerRepeat::Forever,
            };
            timer.due = (timer.due + timer.interval).max(now);
            if timer.due == now {
                timer.due += timer.interval;
            }
        }
        self.timers
            .retain(|timer| timer.remaining != TimerRepeat::Times(0));
        due.sort_by_key(|(at, _)| *at);

        let mut events: Vec<Event> = due.into_iter().map(|(_, tag)| Event::new(tag)).collect();
        events.extend(self.pending.drain(..));
        events
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::entity::IndexOutOfRangeError;

    #[test]
    fn tag_allocator_starts_above_reserved_range() {
        let mut tags = TagAllocator::default();
        let first = tags.allocate();
        let second = tags.allocate();
        assert_eq!(first, EventTag::USER_EVENT);
        assert_eq!(second, EventTag(first.0 + 1));
        assert!(!first.is_reserved());
        for reserved in [
            EventTag::QUIT,
            EventTag::KEY_DOWN,
            EventTag::KEY_UP,
            EventTag::MOUSE_MOTION,
            EventTag::MOUSE_BUTTON_DOWN,
            EventTag::MOUSE_BUTTON_UP,
        ] {
            assert!(reserved.is_reserved());
        }
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut dispatcher: EventDispatcher<()> = EventDispatcher::new();
        dispatcher
            .register(EventTag::QUIT, |_, _| Ok(()))
            .expect("first registration");
        let error = dispatcher
            .register(EventTag::QUIT, |_, _| Ok(()))
            .expect_err("duplicate");
        assert_eq!(error.tag, EventTag::QUIT);
        assert_eq!(error.to_string(), "event tag 0x0100 already has a callback");
    }

    #[test]
    fn dispatch_runs_in_arrival_order_and_drops_unbound_events() {
        let mut dispatcher: EventDispatcher<Vec<String>> = EventDispatcher::new();
        dispatcher
            .register(EventTag::KEY_DOWN, |event, seen: &mut Vec<String>| {
                seen.push(format!("down:{:?}", event.key()));
                Ok(())
            })
            .expect("register");
        dispatcher
            .register(EventTag::QUIT, |_, seen: &mut Vec<String>| {
                seen.push("quit".to_string());
                Ok(())
            })
            .expect("register");

        let mut seen = Vec::new();
        let handled = dispatcher.dispatch(
            [
                Event::quit(),
                Event::new(EventTag(0x9999)),
                Event::key_down(Key::Space),
            ],
            &mut seen,
        );
        assert_eq!(handled, 2);
        assert_eq!(seen, vec!["quit".to_string(), "down:Some(Space)".to_string()]);
    }

    #[test]
    fn failing_callback_does_not_stop_dispatch() {
        let calls = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&calls);
        let mut dispatcher: EventDispatcher<()> = EventDispatcher::new();
        dispatcher
            .register(EventTag::KEY_UP, |_, _| {
                Err(IndexOutOfRangeError { index: 3, len: 1 }.into())
            })
            .expect("register");
        dispatcher
            .register(EventTag::QUIT, move |_, _| {
                *counter.borrow_mut() += 1;
                Ok(())
            })
            .expect("register");

        dispatcher.dispatch([Event::key_up(Key::Escape), Event::quit()], &mut ());
        assert_eq!(*calls.borrow(), 1);
    }

    #[test]
    fn clear_unbinds_everything() {
        let mut dispatcher: EventDispatcher<()> = EventDispatcher::new();
        dispatcher
            .register(EventTag::QUIT, |_, _| Ok(()))
            .expect("register");
        dispatcher.clear();
        assert!(dispatcher.is_empty());
        assert_eq!(dispatcher.dispatch([Event::quit()], &mut ()), 0);
    }

    #[test]
    fn one_shot_timer_fires_once() {
        let start = Instant::now();
        let tag = EventTag(0x8000);
        let mut queue = EventQueue::new();
        queue.set_timer(tag, Duration::from_millis(100), TimerRepeat::Once, start);

        assert!(queue.poll(start + Duration::from_millis(50)).is_empty());
        assert_eq!(
            queue.poll(start + Duration::from_millis(100)),
            vec![Event::new(tag)]
        );
        assert!(queue.poll(start + Duration::from_secs(5)).is_empty());
        assert!(!queue.has_timer(tag));
    }

    #[test]
    fn repeating_timer_fires_each_interval() {
        let start = Instant::now();
        let tag = EventTag(0x8001);
        let mut queue = EventQueue::new();
        queue.set_timer(tag, Duration::from_millis(500), TimerRepeat::Forever, start);

        let mut fired = 0;
        for step in 1..=10 {
            fired += queue.poll(start + Duration::from_millis(250 * step)).len();
        }
        assert_eq!(fired, 5);
        assert!(queue.has_timer(tag));
    }

    #[test]
    fn counted_timer_stops_after_its_budget() {
        let start = Instant::now();
        let tag = EventTag(0x8002);
        let mut queue = EventQueue::new();
        queue.set_timer(tag, Duration::from_millis(10), TimerRepeat::Times(2), start);

        let mut fired = 0;
        for step in 1..=6 {
            fired += queue.poll(start + Duration::from_millis(10 * step)).len();
        }
        assert_eq!(fired, 2);
    }

    #[test]
    fn timer_events_precede_queued_events_and_cancel_works() {
        let start = Instant::now();
        let early = EventTag(0x8003);
        let late = EventTag(0x8004);
        let mut queue = EventQueue::new();
        queue.set_timer(late, Duration::from_millis(20), TimerRepeat::Once, start);
        queue.set_timer(early, Duration::from_millis(10), TimerRepeat::Once, start);
        queue.push(Event::quit());

        let events = queue.poll(start + Duration::from_millis(30));
        assert_eq!(
            events,
            vec![Event::new(early), Event::new(late), Event::quit()]
        );

        queue.set_timer(early, Duration::from_millis(10), TimerRepeat::Forever, start);
        assert!(queue.cancel_timer(early));
        assert!(!queue.cancel_timer(early));
        assert!(queue.poll(start + Duration::from_secs(1)).is_empty());
    }
}
