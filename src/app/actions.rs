//! Default button bindings for a single-relay plug.
//!
//! | Gesture   | Action                |
//! |-----------|-----------------------|
//! | Single    | toggle the relay      |
//! | Double    | logged only           |
//! | Long      | logged only           |
//! | Very long | factory reset         |

use crate::drivers::button::{Gesture, GestureKind};
use crate::drivers::debounce::LineId;

use super::dispatcher::{ActionDispatcher, GestureActions, RegistryFull};

pub fn toggle_switch(actions: &mut dyn GestureActions, gesture: &Gesture, _param: u8) {
    actions.log_gesture(gesture);
    actions.toggle();
}

pub fn log_only(actions: &mut dyn GestureActions, gesture: &Gesture, _param: u8) {
    actions.log_gesture(gesture);
}

pub fn factory_reset(actions: &mut dyn GestureActions, gesture: &Gesture, _param: u8) {
    actions.log_gesture(gesture);
    actions.factory_reset();
}

/// Build the standard registry for the button on `line`.
pub fn default_dispatcher(line: LineId) -> Result<ActionDispatcher, RegistryFull> {
    let mut b = ActionDispatcher::builder();
    b.register(line, GestureKind::Single, toggle_switch, 0)?
        .register(line, GestureKind::Double, log_only, 0)?
        .register(line, GestureKind::Long, log_only, 0)?
        .register(line, GestureKind::VeryLong, factory_reset, 0)?;
    Ok(b.build())
}
