//! Input Capture
//!
//! One [`InputFrame`] per tick per human-controlled combatant. The same
//! frame drives a Local combatant directly and travels to the authority
//! inside an `InputMessage` for a Remote one.

use serde::{Serialize, Deserialize};

use crate::core::vec2::Vec2;

// =============================================================================
// INPUT FRAME
// =============================================================================

/// Raw input state for a single tick.
///
/// Triggers (attack, dash, kick, stance shifts) are edge-triggered: they are
/// set for the one tick they were pressed on. Block is level-triggered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct InputFrame {
    /// Horizontal movement axis, -1 (left) to +1 (right)
    pub move_x: f32,
    /// Vertical movement axis, -1 (up) to +1 (down)
    pub move_y: f32,
    /// Aim point in arena coordinates; facing turns toward it
    pub aim: Vec2,
    /// Action flags (packed bits):
    /// - Bit 0: Attack pressed this tick
    /// - Bit 1: Block held
    /// - Bit 2: Dash pressed this tick
    /// - Bit 3: Kick modifier held with the attack
    /// - Bit 4: Stance up pressed this tick
    /// - Bit 5: Stance down pressed this tick
    pub flags: u8,
}

impl InputFrame {
    /// Attack flag bit
    pub const FLAG_ATTACK: u8 = 0x01;
    /// Block flag bit
    pub const FLAG_BLOCK: u8 = 0x02;
    /// Dash flag bit
    pub const FLAG_DASH: u8 = 0x04;
    /// Kick modifier bit
    pub const FLAG_KICK: u8 = 0x08;
    /// Stance up bit
    pub const FLAG_STANCE_UP: u8 = 0x10;
    /// Stance down bit
    pub const FLAG_STANCE_DOWN: u8 = 0x20;

    /// All edge-triggered bits.
    pub const EDGE_FLAGS: u8 =
        Self::FLAG_ATTACK | Self::FLAG_DASH | Self::FLAG_KICK | Self::FLAG_STANCE_UP | Self::FLAG_STANCE_DOWN;

    /// Create a new empty input frame.
    pub const fn new() -> Self {
        Self {
            move_x: 0.0,
            move_y: 0.0,
            aim: Vec2::ZERO,
            flags: 0,
        }
    }

    /// Create input with movement axes.
    pub fn with_movement(move_x: f32, move_y: f32) -> Self {
        Self {
            move_x,
            move_y,
            ..Self::new()
        }
    }

    /// Builder: set the aim point.
    pub fn aimed_at(mut self, aim: Vec2) -> Self {
        self.aim = aim;
        self
    }

    /// Builder: set flag bits.
    pub fn with_flags(mut self, flags: u8) -> Self {
        self.flags |= flags;
        self
    }

    /// Movement direction, normalized when diagonal.
    ///
    /// Axes are clamped to [-1, 1]; non-finite axes count as zero.
    #[inline]
    pub fn move_direction(&self) -> Vec2 {
        let axis = |v: f32| if v.is_finite() { v.clamp(-1.0, 1.0) } else { 0.0 };
        let dir = Vec2::new(axis(self.move_x), axis(self.move_y));
        if dir.length_squared() > 1.0 {
            dir.normalize()
        } else {
            dir
        }
    }

    /// Check if attack was pressed this tick.
    #[inline]
    pub fn attack_pressed(&self) -> bool {
        self.flags & Self::FLAG_ATTACK != 0
    }

    /// Check if block is held.
    #[inline]
    pub fn block_held(&self) -> bool {
        self.flags & Self::FLAG_BLOCK != 0
    }

    /// Check if dash was pressed this tick.
    #[inline]
    pub fn dash_pressed(&self) -> bool {
        self.flags & Self::FLAG_DASH != 0
    }

    /// Check if the kick modifier accompanies the attack.
    #[inline]
    pub fn kick_held(&self) -> bool {
        self.flags & Self::FLAG_KICK != 0
    }

    /// Check if stance up was pressed this tick.
    #[inline]
    pub fn stance_up_pressed(&self) -> bool {
        self.flags & Self::FLAG_STANCE_UP != 0
    }

    /// Check if stance down was pressed this tick.
    #[inline]
    pub fn stance_down_pressed(&self) -> bool {
        self.flags & Self::FLAG_STANCE_DOWN != 0
    }

    /// Check if input has any movement.
    #[inline]
    pub fn has_movement(&self) -> bool {
        !self.move_direction().is_zero()
    }

    /// Set or clear a flag bit.
    #[inline]
    pub fn set_flag(&mut self, flag: u8, on: bool) {
        if on {
            self.flags |= flag;
        } else {
            self.flags &= !flag;
        }
    }

    /// Copy with the edge-triggered bits cleared.
    ///
    /// What remains (movement, aim, block) keeps applying on later ticks
    /// when no newer frame arrives.
    #[inline]
    pub fn held_only(&self) -> Self {
        Self {
            flags: self.flags & !Self::EDGE_FLAGS,
            ..*self
        }
    }
}

// =============================================================================
// INPUT LATCH
// =============================================================================

/// Accumulates device events between ticks.
///
/// Presses latch until the next [`InputLatch::frame`] call, so a click that
/// starts and ends between two ticks is still seen once.
#[derive(Clone, Debug, Default)]
pub struct InputLatch {
    current: InputFrame,
}

impl InputLatch {
    /// Create an empty latch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the movement axes.
    pub fn set_movement(&mut self, move_x: f32, move_y: f32) {
        self.current.move_x = move_x;
        self.current.move_y = move_y;
    }

    /// Set the aim point.
    pub fn set_aim(&mut self, aim: Vec2) {
        self.current.aim = aim;
    }

    /// Register an edge-triggered press (attack, dash, kick, stance).
    pub fn press(&mut self, flag: u8) {
        self.current.flags |= flag & InputFrame::EDGE_FLAGS;
    }

    /// Update the level-triggered block state.
    pub fn set_block(&mut self, held: bool) {
        self.current.set_flag(InputFrame::FLAG_BLOCK, held);
    }

    /// Frame for this tick; edge triggers reset afterwards.
    pub fn frame(&mut self) -> InputFrame {
        let frame = self.current;
        self.current = frame.held_only();
        frame
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags() {
        let frame = InputFrame::new().with_flags(InputFrame::FLAG_ATTACK | InputFrame::FLAG_BLOCK);
        assert!(frame.attack_pressed());
        assert!(frame.block_held());
        assert!(!frame.dash_pressed());
        assert!(!frame.kick_held());
    }

    #[test]
    fn test_diagonal_normalized() {
        let dir = InputFrame::with_movement(1.0, 1.0).move_direction();
        assert!((dir.length() - 1.0).abs() < 1e-6);

        let partial = InputFrame::with_movement(0.5, 0.0).move_direction();
        assert_eq!(partial, Vec2::new(0.5, 0.0));
    }

    #[test]
    fn test_non_finite_axes_ignored() {
        let frame = InputFrame::with_movement(f32::NAN, f32::INFINITY);
        assert!(!frame.has_movement());
    }

    #[test]
    fn test_held_only_keeps_level_bits() {
        let frame = InputFrame::with_movement(1.0, 0.0)
            .with_flags(InputFrame::FLAG_ATTACK | InputFrame::FLAG_BLOCK | InputFrame::FLAG_DASH);
        let held = frame.held_only();
        assert!(held.block_held());
        assert!(!held.attack_pressed());
        assert!(!held.dash_pressed());
        assert_eq!(held.move_x, 1.0);
    }

    #[test]
    fn test_latch_resets_edges_once() {
        let mut latch = InputLatch::new();
        latch.press(InputFrame::FLAG_ATTACK);
        latch.set_block(true);

        let first = latch.frame();
        assert!(first.attack_pressed());
        assert!(first.block_held());

        let second = latch.frame();
        assert!(!second.attack_pressed());
        assert!(second.block_held());
    }

    #[test]
    fn test_latch_press_ignores_level_bits() {
        let mut latch = InputLatch::new();
        latch.press(InputFrame::FLAG_BLOCK);
        assert!(!latch.frame().block_held());
    }
}
