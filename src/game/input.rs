//! Keyboard and pointer input state machine
//!
//! Left, right and run are level-triggered: they only feed local prediction
//! and ride along in the periodic position message. Jump, guard and crouch
//! also produce an edge message the moment they change.

use crate::ws::protocol::{OutboundMsg, PointerOffset};

/// Logical actions bound to keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    MoveLeft,
    MoveRight,
    Run,
    Crouch,
    Guard,
    Jump,
}

impl Action {
    /// Default key bindings. Key names follow DOM `KeyboardEvent.key`,
    /// matched case-insensitively.
    pub fn from_key(key: &str) -> Option<Self> {
        match key.to_ascii_lowercase().as_str() {
            "arrowleft" | "a" => Some(Self::MoveLeft),
            "arrowright" | "d" => Some(Self::MoveRight),
            "arrowup" | " " | "space" => Some(Self::Jump),
            "w" => Some(Self::Guard),
            "shift" => Some(Self::Run),
            "c" => Some(Self::Crouch),
            _ => None,
        }
    }
}

/// Input events delivered to a session
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    Pressed(Action),
    Released(Action),
    /// Pointer position in screen pixels
    PointerMoved { x: f64, y: f64 },
    /// Viewport resized, in pixels
    Resized { width: u32, height: u32 },
}

/// Held-key flags and the last pointer offset
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InputState {
    pub left: bool,
    pub right: bool,
    pub running: bool,
    pub crouching: bool,
    pub guard: bool,
    pub pointer: PointerOffset,
}

/// Tracks input flags and derives edge messages
#[derive(Debug, Default)]
pub struct InputStateMachine {
    state: InputState,
    jump_held: bool,
}

impl InputStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &InputState {
        &self.state
    }

    /// Key went down. Returns the edge message to send, if any.
    ///
    /// Auto-repeated presses of an already-held key are not edges.
    pub fn press(&mut self, action: Action) -> Option<OutboundMsg> {
        match action {
            Action::MoveLeft => {
                self.state.left = true;
                None
            }
            Action::MoveRight => {
                self.state.right = true;
                None
            }
            Action::Run => {
                self.state.running = true;
                None
            }
            Action::Jump => {
                let edge = !self.jump_held;
                self.jump_held = true;
                edge.then(OutboundMsg::jump)
            }
            Action::Guard => {
                let edge = !self.state.guard;
                self.state.guard = true;
                edge.then_some(OutboundMsg::Guard { guard: true })
            }
            Action::Crouch => {
                let edge = !self.state.crouching;
                self.state.crouching = true;
                edge.then_some(OutboundMsg::Crouch { crouching: true })
            }
        }
    }

    /// Key went up. Returns the edge message to send, if any.
    pub fn release(&mut self, action: Action) -> Option<OutboundMsg> {
        match action {
            Action::MoveLeft => {
                self.state.left = false;
                None
            }
            Action::MoveRight => {
                self.state.right = false;
                None
            }
            Action::Run => {
                self.state.running = false;
                None
            }
            // Jump is an impulse, its release is never sent
            Action::Jump => {
                self.jump_held = false;
                None
            }
            Action::Guard => {
                let edge = self.state.guard;
                self.state.guard = false;
                edge.then_some(OutboundMsg::Guard { guard: false })
            }
            Action::Crouch => {
                let edge = self.state.crouching;
                self.state.crouching = false;
                edge.then_some(OutboundMsg::Crouch { crouching: false })
            }
        }
    }

    /// Pointer moved; `offset` is relative to the local player's sprite.
    /// Every move is reported, unthrottled.
    pub fn pointer_moved(&mut self, offset: PointerOffset) -> OutboundMsg {
        self.state.pointer = offset;
        OutboundMsg::PointerMoved {
            player_mouse_position: offset,
        }
    }
}
