//! Gesture → action registry.
//!
//! Bindings are registered once at startup through a [`DispatcherBuilder`]
//! and frozen into an [`ActionDispatcher`]; nothing can be added afterwards.
//! Each classified gesture is dispatched exactly once, invoking every
//! handler bound to its `(line, kind)` pair in registration order.
//!
//! Handlers run synchronously on the control loop. Anything slow goes
//! through [`GestureActions`], whose implementation hands it to a
//! background job.

use core::fmt;

use heapless::Vec;

use crate::drivers::button::{Gesture, GestureKind};
use crate::drivers::debounce::LineId;

/// Maximum number of bindings (stack-allocated).
pub const MAX_BINDINGS: usize = 8;

/// What a handler may do to the device.
pub trait GestureActions {
    /// Flip the switch.
    fn toggle(&mut self);
    /// Start the factory-reset sequence.
    fn factory_reset(&mut self);
    /// Record the gesture without acting on it.
    fn log_gesture(&mut self, gesture: &Gesture);
}

/// Handler signature. `param` is the context value given at registration.
pub type Handler = fn(actions: &mut dyn GestureActions, gesture: &Gesture, param: u8);

#[derive(Clone, Copy)]
pub struct Binding {
    pub line: LineId,
    pub kind: GestureKind,
    pub handler: Handler,
    pub param: u8,
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("line", &self.line)
            .field("kind", &self.kind)
            .field("param", &self.param)
            .finish()
    }
}

/// The registry has no free slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryFull;

impl fmt::Display for RegistryFull {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "binding registry full ({} max)", MAX_BINDINGS)
    }
}

impl core::error::Error for RegistryFull {}

#[derive(Default)]
pub struct DispatcherBuilder {
    bindings: Vec<Binding, MAX_BINDINGS>,
}

impl DispatcherBuilder {
    pub fn register(
        &mut self,
        line: LineId,
        kind: GestureKind,
        handler: Handler,
        param: u8,
    ) -> Result<&mut Self, RegistryFull> {
        self.bindings
            .push(Binding {
                line,
                kind,
                handler,
                param,
            })
            .map_err(|_| RegistryFull)?;
        Ok(self)
    }

    pub fn build(self) -> ActionDispatcher {
        ActionDispatcher {
            bindings: self.bindings,
        }
    }
}

/// Immutable registry built at startup.
pub struct ActionDispatcher {
    bindings: Vec<Binding, MAX_BINDINGS>,
}

impl ActionDispatcher {
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::default()
    }

    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    /// Invoke every handler bound to the gesture's `(line, kind)`.
    /// Returns the number of handlers run; zero means the gesture was
    /// unbound and has been ignored.
    pub fn dispatch(&self, gesture: &Gesture, actions: &mut dyn GestureActions) -> usize {
        let mut invoked = 0;
        for b in self
            .bindings
            .iter()
            .filter(|b| b.line == gesture.line && b.kind == gesture.kind)
        {
            (b.handler)(actions, gesture, b.param);
            invoked += 1;
        }
        invoked
    }
}
