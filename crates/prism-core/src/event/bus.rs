// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::panic::{self, AssertUnwindSafe};

/// An event that can travel over an [`EventBus`].
///
/// Listeners subscribe to a [`Event::Kind`] discriminant rather than to the
/// full payload.
pub trait Event: Clone + Send + 'static {
    /// The discriminant listeners subscribe to.
    type Kind: Copy + Eq + Hash + fmt::Debug;

    /// Returns the discriminant of this event.
    fn kind(&self) -> Self::Kind;
}

/// An opaque token returned by [`EventBus::on`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

type Listener<E> = Box<dyn FnMut(&E)>;

/// A synchronous, single-threaded event bus.
///
/// Listeners run in subscription order on the emitting thread. A listener that
/// panics is logged and skipped; the remaining listeners and the emitter are
/// unaffected. Besides callbacks, any number of flume channels can be attached
/// with [`EventBus::channel`] to observe every event.
pub struct EventBus<E: Event> {
    listeners: HashMap<E::Kind, Vec<(ListenerId, Listener<E>)>>,
    taps: Vec<flume::Sender<E>>,
    next_id: u64,
}

impl<E: Event> EventBus<E> {
    /// Creates an empty bus.
    pub fn new() -> Self {
        log::debug!("EventBus initialized.");
        Self {
            listeners: HashMap::new(),
            taps: Vec::new(),
            next_id: 0,
        }
    }

    /// Registers a listener for one kind of event.
    ///
    /// ## Arguments
    /// * `kind` - The event kind to listen for.
    /// * `listener` - The callback invoked with every matching event.
    ///
    /// ## Returns
    /// A [`ListenerId`] that can be passed to [`EventBus::off`].
    pub fn on<F>(&mut self, kind: E::Kind, listener: F) -> ListenerId
    where
        F: FnMut(&E) + 'static,
    {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners
            .entry(kind)
            .or_default()
            .push((id, Box::new(listener)));
        id
    }

    /// Removes a listener. Returns `false` if the id was unknown.
    pub fn off(&mut self, id: ListenerId) -> bool {
        for listeners in self.listeners.values_mut() {
            if let Some(pos) = listeners.iter().position(|(lid, _)| *lid == id) {
                drop(listeners.remove(pos));
                return true;
            }
        }
        false
    }

    /// Returns a receiver that gets a copy of every event emitted from now on.
    pub fn channel(&mut self) -> flume::Receiver<E> {
        let (sender, receiver) = flume::unbounded();
        self.taps.push(sender);
        receiver
    }

    /// Delivers an event to every listener of its kind, then to every channel.
    pub fn emit(&mut self, event: E) {
        let kind = event.kind();
        log::trace!("Emitting {kind:?} event.");

        if let Some(listeners) = self.listeners.get_mut(&kind) {
            for (id, listener) in listeners.iter_mut() {
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| listener(&event)));
                if let Err(payload) = outcome {
                    log::error!(
                        "Listener {:?} for {kind:?} panicked: {}",
                        id,
                        panic_message(payload.as_ref())
                    );
                }
            }
        }

        // Dropped receivers are pruned lazily.
        self.taps.retain(|tap| tap.send(event.clone()).is_ok());
    }

    /// Returns the number of callbacks registered for `kind`.
    pub fn listener_count(&self, kind: E::Kind) -> usize {
        self.listeners.get(&kind).map_or(0, Vec::len)
    }

    /// Drops every listener and channel.
    pub fn clear(&mut self) {
        self.listeners.clear();
        self.taps.clear();
    }
}

impl<E: Event> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Event> fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let listeners: usize = self.listeners.values().map(Vec::len).sum();
        f.debug_struct("EventBus")
            .field("listeners", &listeners)
            .field("channels", &self.taps.len())
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "<non-string panic payload>".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flume::TryRecvError;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// A local, self-contained event enum for testing purposes.
    #[derive(Debug, Clone, PartialEq)]
    enum TestEvent {
        Resized { width: u32, height: u32 },
        Shutdown,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum TestKind {
        Resized,
        Shutdown,
    }

    impl Event for TestEvent {
        type Kind = TestKind;

        fn kind(&self) -> TestKind {
            match self {
                TestEvent::Resized { .. } => TestKind::Resized,
                TestEvent::Shutdown => TestKind::Shutdown,
            }
        }
    }

    #[test]
    fn listeners_only_receive_their_kind() {
        let mut bus = EventBus::<TestEvent>::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        bus.on(TestKind::Resized, move |e| sink.borrow_mut().push(e.clone()));

        bus.emit(TestEvent::Shutdown);
        bus.emit(TestEvent::Resized {
            width: 4,
            height: 2,
        });

        assert_eq!(
            *seen.borrow(),
            vec![TestEvent::Resized {
                width: 4,
                height: 2
            }]
        );
    }

    #[test]
    fn off_removes_listener() {
        let mut bus = EventBus::<TestEvent>::new();
        let count = Rc::new(RefCell::new(0));
        let c = Rc::clone(&count);
        let id = bus.on(TestKind::Shutdown, move |_| *c.borrow_mut() += 1);

        bus.emit(TestEvent::Shutdown);
        assert!(bus.off(id));
        assert_eq!(Rc::strong_count(&count), 1);
        assert!(!bus.off(id));
        bus.emit(TestEvent::Shutdown);

        assert_eq!(*count.borrow(), 1);
        assert_eq!(bus.listener_count(TestKind::Shutdown), 0);
    }

    #[test]
    fn panicking_listener_does_not_stop_others() {
        let mut bus = EventBus::<TestEvent>::new();
        let count = Rc::new(RefCell::new(0));
        let before = Rc::clone(&count);
        let after = Rc::clone(&count);

        bus.on(TestKind::Shutdown, move |_| *before.borrow_mut() += 1);
        bus.on(TestKind::Shutdown, |_| panic!("listener failure"));
        bus.on(TestKind::Shutdown, move |_| *after.borrow_mut() += 1);

        bus.emit(TestEvent::Shutdown);
        bus.emit(TestEvent::Shutdown);

        assert_eq!(*count.borrow(), 4);
    }

    #[test]
    fn channel_receives_every_event() {
        let mut bus = EventBus::<TestEvent>::new();
        let receiver = bus.channel();

        bus.emit(TestEvent::Shutdown);
        bus.emit(TestEvent::Resized {
            width: 1,
            height: 1,
        });

        assert_eq!(receiver.try_recv(), Ok(TestEvent::Shutdown));
        assert!(matches!(
            receiver.try_recv(),
            Ok(TestEvent::Resized { .. })
        ));
        assert_eq!(receiver.try_recv(), Err(TryRecvError::Empty));
    }

    #[test]
    fn dropped_channel_is_pruned() {
        let mut bus = EventBus::<TestEvent>::new();
        drop(bus.channel());
        bus.emit(TestEvent::Shutdown);
        assert!(bus.taps.is_empty());
    }
}
