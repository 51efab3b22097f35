//! Per-frame hand gesture classification
//!
//! Stateless: one hand in, one [`GestureTag`] out. Which physical hand is
//! classified is decided by the controller.

use crate::geometry::is_finger_extended;
use crate::landmarks::{hand, HandLandmarks, HandObservation};
use serde::{Deserialize, Serialize};

/// Discrete gesture recognised in a single frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GestureTag {
    #[default]
    None,
    /// Index finger only
    One,
    /// Index and middle finger, middle to the right of index
    Two,
    /// Open hand, all four fingers extended
    Click,
    /// Thumb raised above its joints, other fingers curled
    ThumbsUp,
    /// Thumb and index pinched together (reported by the click debouncer)
    PinchActive,
}

/// Extension state of the four non-thumb fingers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Fingers {
    index: bool,
    middle: bool,
    ring: bool,
    pinky: bool,
}

impl Fingers {
    fn read(lm: &HandLandmarks) -> Self {
        Self {
            index: is_finger_extended(lm, hand::INDEX_MCP, hand::INDEX_PIP, hand::INDEX_TIP),
            middle: is_finger_extended(lm, hand::MIDDLE_MCP, hand::MIDDLE_PIP, hand::MIDDLE_TIP),
            ring: is_finger_extended(lm, hand::RING_MCP, hand::RING_PIP, hand::RING_TIP),
            pinky: is_finger_extended(lm, hand::PINKY_MCP, hand::PINKY_PIP, hand::PINKY_TIP),
        }
    }
}

/// Classify a hand, or [`GestureTag::None`] when no hand is present
pub fn classify_hand(hand: Option<&HandObservation>) -> GestureTag {
    hand.map(|h| classify(&h.landmarks))
        .unwrap_or(GestureTag::None)
}

/// Classify one hand's landmarks
///
/// Rules are checked in priority order One > Two > Click > ThumbsUp and the
/// first match wins.
pub fn classify(lm: &HandLandmarks) -> GestureTag {
    let f = Fingers::read(lm);

    if f.index && !f.middle && !f.ring && !f.pinky {
        return GestureTag::One;
    }

    // Middle tip must sit right of the index tip; crossed fingers don't count
    if f.index
        && f.middle
        && !f.ring
        && !f.pinky
        && lm[hand::MIDDLE_TIP].x > lm[hand::INDEX_TIP].x
    {
        return GestureTag::Two;
    }

    if f.index && f.middle && f.ring && f.pinky {
        return GestureTag::Click;
    }

    if is_thumbs_up(lm) {
        return GestureTag::ThumbsUp;
    }

    GestureTag::None
}

fn is_thumbs_up(lm: &HandLandmarks) -> bool {
    let thumb_raised = lm[hand::THUMB_TIP].y < lm[hand::THUMB_IP].y
        && lm[hand::THUMB_TIP].y < lm[hand::THUMB_MCP].y;

    let curled = |pip: usize, tip: usize| lm[tip].y > lm[pip].y;

    thumb_raised
        && curled(hand::INDEX_PIP, hand::INDEX_TIP)
        && curled(hand::MIDDLE_PIP, hand::MIDDLE_TIP)
        && curled(hand::RING_PIP, hand::RING_TIP)
        && curled(hand::PINKY_PIP, hand::PINKY_TIP)
}

/// Synthetic hand poses for unit and integration tests
#[doc(hidden)]
pub mod poses {
    use crate::landmarks::{hand, HandLandmarks, Point};

    /// Build a hand with the given fingers (index, middle, ring, pinky) raised
    pub fn hand_with(fingers: [bool; 4]) -> HandLandmarks {
        let mut lm = [Point::new(0.5, 0.7); 21];
        lm[hand::WRIST] = Point::new(0.5, 0.9);
        lm[hand::THUMB_MCP] = Point::new(0.42, 0.72);
        lm[hand::THUMB_IP] = Point::new(0.40, 0.68);
        lm[hand::THUMB_TIP] = Point::new(0.41, 0.70);

        let columns = [
            (hand::INDEX_MCP, 0.45),
            (hand::MIDDLE_MCP, 0.50),
            (hand::RING_MCP, 0.55),
            (hand::PINKY_MCP, 0.60),
        ];
        for (raised, (mcp, x)) in fingers.iter().zip(columns) {
            lm[mcp] = Point::new(x, 0.6);
            if *raised {
                lm[mcp + 1] = Point::new(x, 0.5);
                lm[mcp + 2] = Point::new(x, 0.45);
                lm[mcp + 3] = Point::new(x, 0.4);
            } else {
                lm[mcp + 1] = Point::new(x, 0.55);
                lm[mcp + 2] = Point::new(x, 0.6);
                lm[mcp + 3] = Point::new(x, 0.62);
            }
        }
        lm
    }

    pub fn one() -> HandLandmarks {
        hand_with([true, false, false, false])
    }

    pub fn two() -> HandLandmarks {
        hand_with([true, true, false, false])
    }

    pub fn fist() -> HandLandmarks {
        hand_with([false; 4])
    }

    pub fn thumbs_up() -> HandLandmarks {
        let mut lm = fist();
        lm[hand::THUMB_MCP] = Point::new(0.42, 0.6);
        lm[hand::THUMB_IP] = Point::new(0.42, 0.5);
        lm[hand::THUMB_TIP] = Point::new(0.42, 0.4);
        lm
    }

    /// Fist with the thumb tip on the index tip
    pub fn pinch() -> HandLandmarks {
        let mut lm = fist();
        // Thumb bent over the fist, not raised
        lm[hand::THUMB_IP] = Point::new(0.43, 0.60);
        lm[hand::THUMB_TIP] = lm[hand::INDEX_TIP];
        lm
    }

    /// Index knuckle at the centre, index tip offset by (dx, dy)
    pub fn pointing(dx: f32, dy: f32) -> HandLandmarks {
        let mut lm = [Point::new(0.5, 0.5); 21];
        lm[hand::INDEX_TIP] = Point::new(0.5 + dx, 0.5 + dy);
        lm
    }
}

#[cfg(test)]
mod tests {
    use super::poses::*;
    use super::*;
    use crate::landmarks::{Handedness, Point};

    #[test]
    fn test_one() {
        assert_eq!(classify(&hand_with([true, false, false, false])), GestureTag::One);
    }

    #[test]
    fn test_two_requires_middle_right_of_index() {
        let lm = hand_with([true, true, false, false]);
        assert_eq!(classify(&lm), GestureTag::Two);

        // Crossed fingers: middle tip left of index tip
        let mut crossed = lm;
        crossed[hand::MIDDLE_TIP] = Point::new(0.40, 0.4);
        assert_eq!(classify(&crossed), GestureTag::None);
    }

    #[test]
    fn test_click_open_hand() {
        assert_eq!(classify(&hand_with([true; 4])), GestureTag::Click);
    }

    #[test]
    fn test_thumbs_up() {
        assert_eq!(classify(&thumbs_up()), GestureTag::ThumbsUp);
    }

    #[test]
    fn test_fist_is_none() {
        assert_eq!(classify(&hand_with([false; 4])), GestureTag::None);
    }

    #[test]
    fn test_unmatched_shapes_are_none() {
        assert_eq!(classify(&hand_with([true, true, true, false])), GestureTag::None);
        assert_eq!(classify(&hand_with([false, true, false, false])), GestureTag::None);
    }

    #[test]
    fn test_missing_hand_is_none() {
        assert_eq!(classify_hand(None), GestureTag::None);
    }

    #[test]
    fn test_classification_is_stable() {
        let lm = hand_with([true, true, false, false]);
        let first = classify(&lm);
        for _ in 0..100 {
            assert_eq!(classify(&lm), first);
        }
    }

    #[test]
    fn test_classify_hand_uses_landmarks() {
        let obs = HandObservation::new(thumbs_up(), Handedness::Left, 0.9);
        assert_eq!(classify_hand(Some(&obs)), GestureTag::ThumbsUp);
    }
}
